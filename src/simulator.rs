//! Operation-by-operation state-vector simulation of a [`Circuit`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::act_on::{ActOnError, MeasurementLog, act_on};
use crate::circuit::Circuit;
use crate::config::SimConfig;
use crate::state::State;
use crate::state_vector::StateVectorArgs;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("initial state has dims {actual:?} but the circuit expects {expected:?}")]
    DimsMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("operation {index} failed: {source}")]
    Operation {
        index: usize,
        #[source]
        source: ActOnError,
    },
}

/// Final state and measurement log of one run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub state: State,
    pub measurements: MeasurementLog,
}

/// Apply every operation of `circuit` to a copy of `initial`.
///
/// Each operation acts with axes equal to its own qubits.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use yao_sim::{Circuit, Gate, State, control, measure, put, simulate};
///
/// let circuit = Circuit::new(
///     vec![2, 2],
///     vec![put(vec![0], Gate::H), control(vec![0], vec![1], Gate::X), measure("m", vec![0, 1])],
/// )?;
/// let mut rng = rand::rngs::StdRng::seed_from_u64(3);
/// let result = simulate(&circuit, &State::zero_state(&[2, 2]), &mut rng)?;
/// let bits = &result.measurements["m"];
/// assert_eq!(bits[0], bits[1]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn simulate(circuit: &Circuit, initial: &State, rng: &mut StdRng) -> Result<SimulationResult, SimulationError> {
    if initial.dims != circuit.dims {
        return Err(SimulationError::DimsMismatch {
            expected: circuit.dims.clone(),
            actual: initial.dims.clone(),
        });
    }

    let mut state = initial.clone();
    let mut measurements = MeasurementLog::new();
    for (index, op) in circuit.operations.iter().enumerate() {
        let mut args = StateVectorArgs::new(&mut state, op.qubits(), &mut *rng, &mut measurements);
        act_on(op, &mut args).map_err(|source| SimulationError::Operation { index, source })?;
    }
    debug!(keys = measurements.len(), "simulation finished");
    Ok(SimulationResult { state, measurements })
}

/// Simulator owning its random source.
#[derive(Debug, Clone)]
pub struct Simulator {
    rng: StdRng,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Simulator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded from `config.seed`, or from entropy when unset. Installs the
    /// configured deprecation policy.
    pub fn from_config(config: &SimConfig) -> Self {
        config.apply_policy();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(seed = ?config.seed, policy = ?config.deprecation_policy, "simulator configured");
        Simulator { rng }
    }

    /// Run from the all-zero state.
    pub fn run(&mut self, circuit: &Circuit) -> Result<SimulationResult, SimulationError> {
        self.run_from(circuit, &State::zero_state(&circuit.dims))
    }

    pub fn run_from(&mut self, circuit: &Circuit, initial: &State) -> Result<SimulationResult, SimulationError> {
        simulate(circuit, initial, &mut self.rng)
    }

    /// Measurement logs of `repetitions` independent runs from the zero state.
    pub fn sample(&mut self, circuit: &Circuit, repetitions: usize) -> Result<Vec<MeasurementLog>, SimulationError> {
        let initial = State::zero_state(&circuit.dims);
        (0..repetitions)
            .map(|_| self.run_from(circuit, &initial).map(|result| result.measurements))
            .collect()
    }
}
