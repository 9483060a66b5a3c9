//! Deprecation helpers under the different policies.
//!
//! Warnings go through `tracing` on the `yao_sim::deprecation` target. Try
//! `YAO_SIM_DEPRECATION=once` or `=error` to change the default policy.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yao_sim::deprecation::{
    DeprecationPolicy, Module, capture_deprecations, deprecate_attributes, deprecated, policy, with_policy,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    println!("policy from environment: {:?}\n", policy());

    let old_add = deprecated("v0.5", "Use `a + b` instead.", "old_add", |(a, b): (i32, i32)| a + b)?;

    println!("=== warn once ===");
    with_policy(DeprecationPolicy::WarnOnce, || -> Result<(), Box<dyn std::error::Error>> {
        for i in 0..3 {
            println!("old_add({i}, 1) = {}", old_add.call((i, 1))?);
        }
        Ok(())
    })?;

    println!("\n=== error ===");
    with_policy(DeprecationPolicy::Error, || match old_add.call((1, 1)) {
        Ok(sum) => println!("unexpectedly allowed: {sum}"),
        Err(err) => println!("rejected: {err}"),
    });

    println!("\n=== captured ===");
    let (sum, warnings) = capture_deprecations(|| old_add.call((2, 2)));
    println!("old_add(2, 2) = {}", sum?);
    for warning in &warnings {
        print!("{}", warning.message);
    }

    println!("\n=== module attributes ===");
    let gates = Module::new("gates", "Named gates.")
        .with_attribute("CNOT", "controlled X")
        .with_attribute("CX", "controlled X");
    let gates = deprecate_attributes(gates, &[("CNOT", ("v0.4", "Use CX instead."))])?;
    let (value, warnings) = capture_deprecations(|| gates.get("CNOT"));
    println!("gates.CNOT = {:?} ({} warning)", value?, warnings.len());
    Ok(())
}
