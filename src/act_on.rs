//! Acting on a simulation state one operation at a time.
//!
//! An [`ActOnArgs`] implementation binds a concrete state representation to
//! the axes the current operation touches, a random source and a measurement
//! log owned by the caller. [`act_on`] dispatches an operation through a
//! chain of strategies; each strategy either applies the operation or reports
//! [`ActOnOutcome::NotImplemented`] so the next one can try.

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::deprecation::DeprecationError;
use crate::gate::GateError;
use crate::operation::Operation;

/// Measurement results keyed by measurement key.
pub type MeasurementLog = HashMap<String, Vec<usize>>;

/// Result of a strategy that may not know how to handle an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActOnOutcome {
    Applied,
    NotImplemented,
}

#[derive(Debug, Error)]
pub enum ActOnError {
    #[error("measurement already logged to key {0:?}")]
    DuplicateMeasurementKey(String),
    #[error("invert mask of length {mask_len} does not match {num_bits} measured bits")]
    InvertMaskLength { mask_len: usize, num_bits: usize },
    #[error("{op} acts on {num_qubits} qubits but {num_axes} axes are in scope")]
    AxesMismatch {
        op: String,
        num_qubits: usize,
        num_axes: usize,
    },
    #[error("qubit {qubit} of {op} is not a qubit of the decomposed operation")]
    UnmappedQubit { op: String, qubit: usize },
    #[error("axes {axes:?} name the same site more than once")]
    DuplicateAxes { axes: Vec<usize> },
    #[error("axis {axis} is out of range for a state with {num_sites} sites")]
    AxisOutOfRange { axis: usize, num_sites: usize },
    #[error("gate matrix size {actual} does not match product of target site dimensions {expected}")]
    GateSizeMismatch { expected: usize, actual: usize },
    #[error("no strategy can act on {0}")]
    CannotActOn(String),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Deprecation(#[from] DeprecationError),
}

/// Bookkeeping shared by every state representation.
///
/// The random source and the measurement log are borrowed from the caller,
/// which keeps them alive across operations.
#[derive(Debug)]
pub struct ActOnContext<'a> {
    axes: Vec<usize>,
    prng: &'a mut StdRng,
    log_of_measurement_results: &'a mut MeasurementLog,
}

impl<'a> ActOnContext<'a> {
    pub fn new(
        axes: impl IntoIterator<Item = usize>,
        prng: &'a mut StdRng,
        log_of_measurement_results: &'a mut MeasurementLog,
    ) -> Self {
        ActOnContext {
            axes: axes.into_iter().collect(),
            prng,
            log_of_measurement_results,
        }
    }

    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn set_axes(&mut self, axes: Vec<usize>) {
        self.axes = axes;
    }

    pub fn prng(&mut self) -> &mut StdRng {
        &mut *self.prng
    }

    pub fn log_of_measurement_results(&mut self) -> &mut MeasurementLog {
        &mut *self.log_of_measurement_results
    }
}

/// State and context for an operation acting on a state representation.
pub trait ActOnArgs {
    /// Axes of the state that correspond to the current operation's qubits.
    fn axes(&self) -> &[usize];

    fn set_axes(&mut self, axes: Vec<usize>);

    fn prng(&mut self) -> &mut StdRng;

    fn log_of_measurement_results(&mut self) -> &mut MeasurementLog;

    /// Measure the current axes of the underlying state.
    fn perform_measurement(&mut self) -> Result<Vec<usize>, ActOnError>;

    /// Strategies the representation offers for operations that cannot act
    /// on it by themselves.
    fn act_on_fallback(&mut self, op: &Operation) -> Result<ActOnOutcome, ActOnError> {
        strat_act_on_from_apply_decompose(op, self)
    }

    /// Measure the current axes and log the outcome under `key`.
    ///
    /// Outcomes below 2 are flipped where `invert_mask` is set. The key must
    /// not be present in the log yet and the mask needs one entry per axis;
    /// both are checked before the state is measured.
    fn measure(&mut self, key: &str, invert_mask: &[bool]) -> Result<(), ActOnError> {
        if self.log_of_measurement_results().contains_key(key) {
            return Err(ActOnError::DuplicateMeasurementKey(key.to_string()));
        }
        if invert_mask.len() != self.axes().len() {
            return Err(ActOnError::InvertMaskLength {
                mask_len: invert_mask.len(),
                num_bits: self.axes().len(),
            });
        }
        let bits = self.perform_measurement()?;
        let corrected = apply_invert_mask(&bits, invert_mask)?;
        debug!(key, ?corrected, "logged measurement");
        self.log_of_measurement_results()
            .insert(key.to_string(), corrected);
        Ok(())
    }
}

/// Fails unless every axis appears once.
pub(crate) fn check_distinct_axes(axes: &[usize]) -> Result<(), ActOnError> {
    let mut seen = HashSet::with_capacity(axes.len());
    if axes.iter().all(|axis| seen.insert(*axis)) {
        Ok(())
    } else {
        Err(ActOnError::DuplicateAxes { axes: axes.to_vec() })
    }
}

/// Flip every outcome below 2 whose mask entry is set.
///
/// # Example
/// ```
/// use yao_sim::act_on::apply_invert_mask;
/// assert_eq!(
///     apply_invert_mask(&[0, 1, 2, 1], &[true, true, true, false]).unwrap(),
///     vec![1, 0, 2, 1]
/// );
/// ```
pub fn apply_invert_mask(bits: &[usize], invert_mask: &[bool]) -> Result<Vec<usize>, ActOnError> {
    if bits.len() != invert_mask.len() {
        return Err(ActOnError::InvertMaskLength {
            mask_len: invert_mask.len(),
            num_bits: bits.len(),
        });
    }
    Ok(bits
        .iter()
        .zip(invert_mask.iter())
        .map(|(&bit, &mask)| bit ^ usize::from(bit < 2 && mask))
        .collect())
}

/// Apply `op` to the state behind `args`.
///
/// The operation's own action is tried first (measurements know how to
/// record themselves), then the representation's fallback strategies.
pub fn act_on<A: ActOnArgs + ?Sized>(op: &Operation, args: &mut A) -> Result<(), ActOnError> {
    debug!(%op, axes = ?args.axes(), "act_on");
    if act_on_self(op, args)? == ActOnOutcome::Applied {
        return Ok(());
    }
    if args.act_on_fallback(op)? == ActOnOutcome::Applied {
        return Ok(());
    }
    Err(ActOnError::CannotActOn(op.to_string()))
}

fn act_on_self<A: ActOnArgs + ?Sized>(op: &Operation, args: &mut A) -> Result<ActOnOutcome, ActOnError> {
    match op {
        Operation::Measure(m) => {
            if m.qubits.len() != args.axes().len() {
                return Err(ActOnError::AxesMismatch {
                    op: op.to_string(),
                    num_qubits: m.qubits.len(),
                    num_axes: args.axes().len(),
                });
            }
            args.measure(&m.key, m.invert_mask())?;
            Ok(ActOnOutcome::Applied)
        }
        _ => Ok(ActOnOutcome::NotImplemented),
    }
}

/// Apply `op` by decomposing it and acting with each piece in turn.
///
/// Sub-operation qubits are translated to axes through the parent's
/// qubit-to-axis map. The parent's axes are restored however the loop ends.
pub fn strat_act_on_from_apply_decompose<A: ActOnArgs + ?Sized>(
    op: &Operation,
    args: &mut A,
) -> Result<ActOnOutcome, ActOnError> {
    let Some(operations) = op.decompose() else {
        return Ok(ActOnOutcome::NotImplemented);
    };
    let qubits = op.qubits();
    if qubits.len() != args.axes().len() {
        return Err(ActOnError::AxesMismatch {
            op: op.to_string(),
            num_qubits: qubits.len(),
            num_axes: args.axes().len(),
        });
    }
    check_distinct_axes(args.axes())?;
    let qubit_map: HashMap<usize, usize> = qubits
        .iter()
        .copied()
        .zip(args.axes().iter().copied())
        .collect();
    debug!(%op, parts = operations.len(), "decomposing");

    let mut guard = AxesGuard::new(args);
    for operation in &operations {
        let axes = operation
            .qubits()
            .into_iter()
            .map(|q| {
                qubit_map.get(&q).copied().ok_or_else(|| ActOnError::UnmappedQubit {
                    op: operation.to_string(),
                    qubit: q,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        trace!(%operation, ?axes, "remapped axes");
        guard.set_axes(axes);
        act_on(operation, &mut *guard)?;
    }
    Ok(ActOnOutcome::Applied)
}

/// Restores the axes an [`ActOnArgs`] had when the guard was created.
pub struct AxesGuard<'g, A: ActOnArgs + ?Sized> {
    args: &'g mut A,
    saved: Option<Vec<usize>>,
}

impl<'g, A: ActOnArgs + ?Sized> AxesGuard<'g, A> {
    pub fn new(args: &'g mut A) -> Self {
        let saved = Some(args.axes().to_vec());
        AxesGuard { args, saved }
    }
}

impl<A: ActOnArgs + ?Sized> Deref for AxesGuard<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        &*self.args
    }
}

impl<A: ActOnArgs + ?Sized> DerefMut for AxesGuard<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        &mut *self.args
    }
}

impl<A: ActOnArgs + ?Sized> Drop for AxesGuard<'_, A> {
    fn drop(&mut self) {
        if let Some(axes) = self.saved.take() {
            trace!(?axes, "restoring axes");
            self.args.set_axes(axes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Replays scripted outcomes regardless of axes.
    struct ScriptedArgs<'a> {
        ctx: ActOnContext<'a>,
        outcomes: Vec<Vec<usize>>,
    }

    impl ActOnArgs for ScriptedArgs<'_> {
        fn axes(&self) -> &[usize] {
            self.ctx.axes()
        }
        fn set_axes(&mut self, axes: Vec<usize>) {
            self.ctx.set_axes(axes)
        }
        fn prng(&mut self) -> &mut StdRng {
            self.ctx.prng()
        }
        fn log_of_measurement_results(&mut self) -> &mut MeasurementLog {
            self.ctx.log_of_measurement_results()
        }
        fn perform_measurement(&mut self) -> Result<Vec<usize>, ActOnError> {
            Ok(self.outcomes.remove(0))
        }
    }

    #[test]
    fn test_measure_applies_mask() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut log = MeasurementLog::new();
        let mut args = ScriptedArgs {
            ctx: ActOnContext::new([0, 1, 2], &mut rng, &mut log),
            outcomes: vec![vec![1, 0, 1]],
        };
        args.measure("m", &[true, true, false]).unwrap();
        assert_eq!(log["m"], vec![0, 1, 1]);
    }

    #[test]
    fn test_qudit_outcome_is_never_flipped() {
        assert_eq!(apply_invert_mask(&[2, 3], &[true, true]).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_duplicate_key_keeps_first_entry() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut log = MeasurementLog::new();
        let mut args = ScriptedArgs {
            ctx: ActOnContext::new([0], &mut rng, &mut log),
            outcomes: vec![vec![1], vec![0]],
        };
        args.measure("m", &[false]).unwrap();
        let err = args.measure("m", &[false]).unwrap_err();
        assert!(matches!(err, ActOnError::DuplicateMeasurementKey(ref k) if k == "m"));
        // the second outcome was never drawn
        assert_eq!(args.outcomes.len(), 1);
        assert_eq!(log["m"], vec![1]);
    }

    #[test]
    fn test_mask_length_mismatch() {
        let err = apply_invert_mask(&[0, 1], &[true]).unwrap_err();
        assert!(matches!(err, ActOnError::InvertMaskLength { mask_len: 1, num_bits: 2 }));
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut log = MeasurementLog::new();
        let mut args = ScriptedArgs {
            ctx: ActOnContext::new([4, 5], &mut rng, &mut log),
            outcomes: vec![],
        };
        {
            let mut guard = AxesGuard::new(&mut args);
            guard.set_axes(vec![9]);
            assert_eq!(guard.axes(), &[9]);
        }
        assert_eq!(args.axes(), &[4, 5]);
    }
}
