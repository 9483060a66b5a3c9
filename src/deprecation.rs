//! Runtime deprecation of functions, parameters, types and module attributes.
//!
//! Every annotation carries a removal [`Deadline`] of the form `vMAJOR.MINOR`,
//! validated when the annotation is built, and a suggested fix. Using the
//! deprecated surface reports a [`DeprecationWarning`] according to the active
//! [`DeprecationPolicy`]:
//!
//! - `Warn` logs on every use,
//! - `WarnOnce` logs each distinct message once per process,
//! - `Error` refuses the use with [`DeprecationError::DeprecatedUse`].
//!
//! Warnings are logged through `tracing` on the `yao_sim::deprecation`
//! target. [`capture_deprecations`] collects them instead of relying on a
//! subscriber and allows deprecated use even under `Error`, which is how
//! tests exercise deprecated code paths while the crate itself runs with
//! `Error`.
//!
//! # Example
//! ```
//! use yao_sim::deprecation::{capture_deprecations, deprecated};
//!
//! let old_add = deprecated("v0.4", "Use `add` instead.", "old_add", |(a, b): (i32, i32)| a + b)?;
//! let (sum, warnings) = capture_deprecations(|| old_add.call((1, 2)));
//! assert_eq!(sum?, 3);
//! assert_eq!(warnings.len(), 1);
//! assert!(warnings[0].message.contains("old_add was used but is deprecated"));
//! # Ok::<(), yao_sim::deprecation::DeprecationError>(())
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::panic::Location;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Environment variable holding the process-wide default policy.
pub const DEPRECATION_ENV: &str = "YAO_SIM_DEPRECATION";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeprecationError {
    #[error("deadline should match vX.Y, got {0:?}")]
    InvalidDeadline(String),
    #[error("yao-sim should not use deprecated functionality: {0}")]
    DeprecatedUse(String),
    #[error("unknown deprecation policy {0:?}, expected warn, once or error")]
    UnknownPolicy(String),
}

/// Release in which deprecated functionality disappears.
///
/// Kept exactly as written, so `v01.02` is reported as `v01.02`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Deadline {
    text: String,
    dot: usize,
}

impl Deadline {
    /// Parse `vMAJOR.MINOR`, where both parts are non-empty runs of ASCII digits.
    ///
    /// # Example
    /// ```
    /// use yao_sim::deprecation::Deadline;
    /// assert_eq!(Deadline::parse("v1.2").unwrap().to_string(), "v1.2");
    /// assert_eq!(Deadline::parse("v4294967296.0").unwrap().major(), "4294967296");
    /// assert!(Deadline::parse("1.2").is_err());
    /// assert!(Deadline::parse("v1.2.3").is_err());
    /// ```
    pub fn parse(deadline: &str) -> Result<Self, DeprecationError> {
        let invalid = || DeprecationError::InvalidDeadline(deadline.to_string());
        let rest = deadline.strip_prefix('v').ok_or_else(invalid)?;
        let (major, minor) = rest.split_once('.').ok_or_else(invalid)?;
        if !is_digit_run(major) || !is_digit_run(minor) {
            return Err(invalid());
        }
        Ok(Deadline {
            text: deadline.to_string(),
            dot: 1 + major.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Digits before the dot, as written.
    pub fn major(&self) -> &str {
        &self.text[1..self.dot]
    }

    /// Digits after the dot, as written.
    pub fn minor(&self) -> &str {
        &self.text[self.dot + 1..]
    }
}

fn is_digit_run(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for Deadline {
    type Err = DeprecationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Deadline::parse(s)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// How uses of deprecated functionality are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeprecationPolicy {
    #[default]
    Warn,
    #[serde(alias = "once")]
    WarnOnce,
    Error,
}

impl DeprecationPolicy {
    /// Policy named by [`DEPRECATION_ENV`], `Warn` when unset.
    pub fn from_env() -> Result<Self, DeprecationError> {
        match std::env::var(DEPRECATION_ENV) {
            Ok(value) => value.parse(),
            Err(_) => Ok(DeprecationPolicy::Warn),
        }
    }

    fn encode(self) -> u8 {
        match self {
            DeprecationPolicy::Warn => 1,
            DeprecationPolicy::WarnOnce => 2,
            DeprecationPolicy::Error => 3,
        }
    }

    fn decode(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(DeprecationPolicy::Warn),
            2 => Some(DeprecationPolicy::WarnOnce),
            3 => Some(DeprecationPolicy::Error),
            _ => None,
        }
    }
}

impl FromStr for DeprecationPolicy {
    type Err = DeprecationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(DeprecationPolicy::Warn),
            "once" | "warn_once" => Ok(DeprecationPolicy::WarnOnce),
            "error" => Ok(DeprecationPolicy::Error),
            other => Err(DeprecationError::UnknownPolicy(other.to_string())),
        }
    }
}

const POLICY_UNSET: u8 = 0;

static GLOBAL_POLICY: AtomicU8 = AtomicU8::new(POLICY_UNSET);
static EMITTED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

thread_local! {
    static POLICY_OVERRIDE: Cell<Option<DeprecationPolicy>> = const { Cell::new(None) };
    static CAPTURES: RefCell<Vec<Vec<DeprecationWarning>>> = const { RefCell::new(Vec::new()) };
}

/// Policy in effect on the current thread.
pub fn policy() -> DeprecationPolicy {
    if let Some(policy) = POLICY_OVERRIDE.with(Cell::get) {
        return policy;
    }
    if let Some(policy) = DeprecationPolicy::decode(GLOBAL_POLICY.load(Ordering::Relaxed)) {
        return policy;
    }
    let policy = DeprecationPolicy::from_env().unwrap_or_else(|err| {
        warn!(target: "yao_sim::deprecation", %err, "falling back to the warn policy");
        DeprecationPolicy::Warn
    });
    let _ = GLOBAL_POLICY.compare_exchange(
        POLICY_UNSET,
        policy.encode(),
        Ordering::Relaxed,
        Ordering::Relaxed,
    );
    policy
}

/// Set the process-wide policy. Threads inside [`with_policy`] keep their override.
pub fn set_policy(policy: DeprecationPolicy) {
    GLOBAL_POLICY.store(policy.encode(), Ordering::Relaxed);
}

/// Run `f` with `policy` in effect on the current thread.
pub fn with_policy<R>(policy: DeprecationPolicy, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<DeprecationPolicy>);
    impl Drop for Restore {
        fn drop(&mut self) {
            POLICY_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let _restore = Restore(POLICY_OVERRIDE.with(|cell| cell.replace(Some(policy))));
    f()
}

/// Run `f`, returning the deprecation warnings it emitted on this thread.
///
/// Deprecated use is allowed inside `f` even under [`DeprecationPolicy::Error`].
pub fn capture_deprecations<R>(f: impl FnOnce() -> R) -> (R, Vec<DeprecationWarning>) {
    struct Pop;
    impl Drop for Pop {
        fn drop(&mut self) {
            CAPTURES.with(|captures| {
                captures.borrow_mut().pop();
            });
        }
    }

    CAPTURES.with(|captures| captures.borrow_mut().push(Vec::new()));
    let pop = Pop;
    let result = f();
    let warnings = CAPTURES.with(|captures| captures.borrow_mut().last_mut().map(std::mem::take));
    drop(pop);
    (result, warnings.unwrap_or_default())
}

fn capturing() -> bool {
    CAPTURES.with(|captures| !captures.borrow().is_empty())
}

/// One reported use of deprecated functionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationWarning {
    pub name: String,
    pub deadline: Deadline,
    pub fix: String,
    pub message: String,
    /// Where the deprecated item was used.
    pub location: &'static Location<'static>,
}

/// Validated description of a deprecated item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    name: String,
    deadline: Deadline,
    fix: String,
    message: String,
}

impl Deprecation {
    /// Deprecation of the item called `name`.
    pub fn new(deadline: &str, fix: &str, name: &str) -> Result<Self, DeprecationError> {
        let deadline = Deadline::parse(deadline)?;
        let message = removal_message(&format!("{name} was used but is deprecated."), &deadline, fix);
        Ok(Deprecation {
            name: name.to_string(),
            deadline,
            fix: fix.to_string(),
            message,
        })
    }

    /// Deprecation of the parameter `parameter_desc` of `func_name`.
    pub fn parameter(
        deadline: &str,
        fix: &str,
        func_name: &str,
        parameter_desc: &str,
    ) -> Result<Self, DeprecationError> {
        let deadline = Deadline::parse(deadline)?;
        let message = removal_message(
            &format!("The {parameter_desc} parameter of {func_name} was used but is deprecated."),
            &deadline,
            fix,
        );
        Ok(Deprecation {
            name: format!("{func_name}({parameter_desc})"),
            deadline,
            fix: fix.to_string(),
            message,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn fix(&self) -> &str {
        &self.fix
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Report one use of the deprecated item under the active policy.
    ///
    /// The use site recorded is the first caller outside `#[track_caller]` frames.
    #[track_caller]
    pub fn warn(&self) -> Result<(), DeprecationError> {
        let location = Location::caller();
        let capturing = capturing();
        match policy() {
            DeprecationPolicy::Error if !capturing => {
                return Err(DeprecationError::DeprecatedUse(format!("{} (at {location})", self.message.trim_end())));
            }
            DeprecationPolicy::WarnOnce => {
                let emitted = EMITTED.get_or_init(|| Mutex::new(HashSet::new()));
                let first = emitted
                    .lock()
                    .map(|mut seen| seen.insert(self.message.clone()))
                    .unwrap_or(true);
                if !first {
                    return Ok(());
                }
            }
            _ => {}
        }

        warn!(
            target: "yao_sim::deprecation",
            name = %self.name,
            deadline = %self.deadline,
            %location,
            "{}",
            self.message
        );
        if capturing {
            let warning = DeprecationWarning {
                name: self.name.clone(),
                deadline: self.deadline.clone(),
                fix: self.fix.clone(),
                message: self.message.clone(),
                location,
            };
            CAPTURES.with(|captures| {
                if let Some(top) = captures.borrow_mut().last_mut() {
                    top.push(warning);
                }
            });
        }
        Ok(())
    }
}

fn removal_message(what: &str, deadline: &Deadline, fix: &str) -> String {
    format!("{what}\nIt will be removed in yao-sim {deadline}.\n{fix}\n")
}

/// A function that reports its deprecation every time it is called.
#[derive(Debug, Clone)]
pub struct DeprecatedFn<F> {
    deprecation: Deprecation,
    f: F,
}

/// Deprecate the function `f`, known to callers as `name`.
///
/// The deadline is validated here, not at call time.
pub fn deprecated<F>(deadline: &str, fix: &str, name: &str, f: F) -> Result<DeprecatedFn<F>, DeprecationError> {
    Ok(DeprecatedFn {
        deprecation: Deprecation::new(deadline, fix, name)?,
        f,
    })
}

impl<F> DeprecatedFn<F> {
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> Result<R, DeprecationError>
    where
        F: Fn(A) -> R,
    {
        self.deprecation.warn()?;
        Ok((self.f)(args))
    }

    pub fn deprecation(&self) -> &Deprecation {
        &self.deprecation
    }
}

/// A function with a deprecated way of passing arguments.
///
/// Calls accepted by `matcher` are reported and passed through `rewrite`
/// before reaching the function. Other calls are silent.
#[derive(Debug, Clone)]
pub struct DeprecatedParameterFn<F, M, W> {
    deprecation: Deprecation,
    matcher: M,
    rewrite: W,
    f: F,
}

pub fn deprecated_parameter<F, M, W>(
    deadline: &str,
    fix: &str,
    func_name: &str,
    parameter_desc: &str,
    matcher: M,
    rewrite: W,
    f: F,
) -> Result<DeprecatedParameterFn<F, M, W>, DeprecationError> {
    Ok(DeprecatedParameterFn {
        deprecation: Deprecation::parameter(deadline, fix, func_name, parameter_desc)?,
        matcher,
        rewrite,
        f,
    })
}

impl<F, M, W> DeprecatedParameterFn<F, M, W> {
    #[track_caller]
    pub fn call<A, R>(&self, args: A) -> Result<R, DeprecationError>
    where
        F: Fn(A) -> R,
        M: Fn(&A) -> bool,
        W: Fn(A) -> A,
    {
        let args = if (self.matcher)(&args) {
            self.deprecation.warn()?;
            (self.rewrite)(args)
        } else {
            args
        };
        Ok((self.f)(args))
    }

    pub fn deprecation(&self) -> &Deprecation {
        &self.deprecation
    }
}

/// A type whose construction is deprecated.
#[derive(Debug, Clone)]
pub struct DeprecatedType<C> {
    deprecation: Deprecation,
    docs: String,
    ctor: C,
}

/// Deprecate constructing a type through `ctor`.
///
/// `docs` are prefixed with a notice that the type is deprecated.
pub fn deprecated_type<C>(
    deadline: &str,
    fix: &str,
    name: &str,
    docs: &str,
    ctor: C,
) -> Result<DeprecatedType<C>, DeprecationError> {
    let deprecation = Deprecation::new(deadline, fix, name)?;
    let docs = format!(
        "THIS TYPE IS DEPRECATED.\n\nIT WILL BE REMOVED IN `yao-sim {}`.\n\n{}\n\n{}",
        deprecation.deadline, fix, docs
    );
    Ok(DeprecatedType {
        deprecation,
        docs,
        ctor,
    })
}

impl<C> DeprecatedType<C> {
    #[track_caller]
    pub fn construct<A, T>(&self, args: A) -> Result<T, DeprecationError>
    where
        C: Fn(A) -> T,
    {
        self.deprecation.warn()?;
        Ok((self.ctor)(args))
    }

    pub fn docs(&self) -> &str {
        &self.docs
    }

    pub fn deprecation(&self) -> &Deprecation {
        &self.deprecation
    }
}

/// Named collection of attributes, e.g. the constants a module exports.
#[derive(Debug, Clone, PartialEq)]
pub struct Module<V> {
    pub name: String,
    pub docs: String,
    attributes: BTreeMap<String, V>,
}

impl<V> Module<V> {
    pub fn new(name: impl Into<String>, docs: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            docs: docs.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: V) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.attributes.get(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }
}

/// A [`Module`] some of whose attributes are deprecated.
#[derive(Debug, Clone)]
pub struct DeprecatedModule<V> {
    module: Module<V>,
    deprecated: HashMap<String, Deprecation>,
}

/// Deprecate attributes of `module`; `deprecated` maps attribute names to
/// `(deadline, fix)`.
///
/// # Example
/// ```
/// use yao_sim::deprecation::{Module, capture_deprecations, deprecate_attributes};
///
/// let module = Module::new("units", "unit constants").with_attribute("foo", 1).with_attribute("bar", 2);
/// let wrapped = deprecate_attributes(module, &[("foo", ("v0.6", "use bar instead"))])?;
/// let (_, warnings) = capture_deprecations(|| wrapped.get("bar"));
/// assert!(warnings.is_empty());
/// # Ok::<(), yao_sim::deprecation::DeprecationError>(())
/// ```
pub fn deprecate_attributes<V>(
    module: Module<V>,
    deprecated: &[(&str, (&str, &str))],
) -> Result<DeprecatedModule<V>, DeprecationError> {
    let deprecated = deprecated
        .iter()
        .map(|&(attr, (deadline, fix))| {
            Deprecation::new(deadline, fix, attr).map(|deprecation| (attr.to_string(), deprecation))
        })
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(DeprecatedModule { module, deprecated })
}

impl<V> DeprecatedModule<V> {
    /// Look up an attribute, reporting the use if it is deprecated.
    ///
    /// A deprecated name is reported even when the module no longer has it.
    #[track_caller]
    pub fn get(&self, name: &str) -> Result<Option<&V>, DeprecationError> {
        if let Some(deprecation) = self.deprecated.get(name) {
            deprecation.warn()?;
        }
        Ok(self.module.get(name))
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    pub fn docs(&self) -> &str {
        &self.module.docs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.module.contains(name)
    }

    pub fn is_deprecated(&self, name: &str) -> bool {
        self.deprecated.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_rejects_malformed() {
        for bad in ["invalid", "v1", "v1.", "v.2", "V1.2", "v1.2.3", "v1.x", " v1.2", "v-1.2"] {
            assert_eq!(
                Deadline::parse(bad),
                Err(DeprecationError::InvalidDeadline(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_deadline_accepts_multi_digit() {
        let deadline = Deadline::parse("v10.25").unwrap();
        assert_eq!((deadline.major(), deadline.minor()), ("10", "25"));
        assert_eq!(deadline.as_str(), "v10.25");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("once".parse(), Ok(DeprecationPolicy::WarnOnce));
        assert_eq!(" Error ".parse(), Ok(DeprecationPolicy::Error));
        assert!("loud".parse::<DeprecationPolicy>().is_err());
    }

    #[test]
    fn test_with_policy_restores_override() {
        with_policy(DeprecationPolicy::Error, || {
            with_policy(DeprecationPolicy::WarnOnce, || {
                assert_eq!(policy(), DeprecationPolicy::WarnOnce);
            });
            assert_eq!(policy(), DeprecationPolicy::Error);
        });
    }

    #[test]
    fn test_nested_captures_are_separate() {
        let dep = Deprecation::new("v1.0", "fix", "nested_unit_item").unwrap();
        let ((_, inner), outer) = with_policy(DeprecationPolicy::Warn, || {
            capture_deprecations(|| {
                dep.warn().unwrap();
                capture_deprecations(|| dep.warn().unwrap())
            })
        });
        assert_eq!(inner.len(), 1);
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn test_message_layout() {
        let dep = Deprecation::new("v1.2", "Roll some dice.", "test_func").unwrap();
        assert_eq!(
            dep.message(),
            "test_func was used but is deprecated.\nIt will be removed in yao-sim v1.2.\nRoll some dice.\n"
        );
    }
}
