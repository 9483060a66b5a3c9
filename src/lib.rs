pub mod act_on;
pub mod basis_state;
pub mod circuit;
pub mod config;
pub mod deprecation;
pub mod gate;
pub mod index;
pub mod instruct;
pub mod measure;
pub mod operation;
pub mod simulator;
pub mod state;
pub mod state_vector;

pub use act_on::{ActOnArgs, ActOnContext, ActOnError, ActOnOutcome, MeasurementLog, act_on};
pub use basis_state::BasisStateArgs;
pub use circuit::{Circuit, CircuitError};
pub use gate::Gate;
pub use operation::{Operation, PositionedGate, composite, control, measure, put};
pub use simulator::{SimulationResult, Simulator, simulate};
pub use state::State;
pub use state_vector::StateVectorArgs;
