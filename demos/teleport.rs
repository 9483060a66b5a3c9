//! Quantum teleportation with mid-circuit measurement.
//!
//! Alice holds Rx(θ)|0⟩ on qubit 0 and shares a Bell pair (qubits 1, 2) with
//! Bob. She measures in the Bell basis; Bob applies the corrections her
//! outcome calls for and ends up with the original state.
//!
//! Set `RUST_LOG=yao_sim=debug` to watch operations being dispatched and
//! `YAO_SIM_SEED` for a reproducible run.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yao_sim::config::SimConfig;
use yao_sim::measure::probs;
use yao_sim::{Circuit, CircuitError, Gate, MeasurementLog, Simulator, StateVectorArgs, act_on, composite, control, measure, put};

fn teleport_circuit(theta: f64) -> Result<Circuit, CircuitError> {
    let bell_pair = composite(
        "bell_pair",
        vec![1, 2],
        vec![put(vec![1], Gate::H), control(vec![1], vec![2], Gate::X)],
    );
    let bell_measure = composite(
        "bell_measure",
        vec![0, 1],
        vec![
            control(vec![0], vec![1], Gate::X),
            put(vec![0], Gate::H),
            measure("alice", vec![0, 1]),
        ],
    );
    Circuit::new(
        vec![2, 2, 2],
        vec![put(vec![0], Gate::Rx(theta)), bell_pair, bell_measure],
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let theta = 1.234;
    let circuit = teleport_circuit(theta)?;
    println!("=== Teleporting Rx({theta})|0⟩ ===\n");
    println!("{circuit}");

    let config = SimConfig::from_env()?;
    let mut sim = Simulator::from_config(&config);
    let expected = (theta / 2.0).sin().powi(2);

    for shot in 0..4 {
        let mut result = sim.run(&circuit)?;
        let bits = result.measurements["alice"].clone();

        let mut rng = StdRng::seed_from_u64(0);
        let mut log = MeasurementLog::new();
        let mut bob = StateVectorArgs::new(&mut result.state, [2], &mut rng, &mut log);
        if bits[1] == 1 {
            act_on(&put(vec![0], Gate::X), &mut bob)?;
        }
        if bits[0] == 1 {
            act_on(&put(vec![0], Gate::Z), &mut bob)?;
        }

        let p1 = probs(bob.state(), Some(&[2]))[1];
        println!("shot {shot}: alice = {bits:?}, P(bob = 1) = {p1:.6} (expected {expected:.6})");
    }
    Ok(())
}
