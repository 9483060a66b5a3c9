use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::gate::{Gate, GateError};
use crate::operation::{Operation, PositionedGate};

/// Error types for circuit validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CircuitError {
    #[error("control_configs length ({control_configs_len}) does not match control_locs length ({control_locs_len})")]
    ControlConfigLengthMismatch {
        control_locs_len: usize,
        control_configs_len: usize,
    },
    #[error("location {loc} is out of range (num_sites = {num_sites})")]
    LocOutOfRange { loc: usize, num_sites: usize },
    #[error("locations {repeated:?} appear more than once in {locs:?}")]
    DuplicateLocs { locs: Vec<usize>, repeated: Vec<usize> },
    #[error("target_locs and control_locs overlap at locations: {overlapping:?}")]
    OverlappingLocs { overlapping: Vec<usize> },
    #[error("gate {gate} has no target locations")]
    NoTargets { gate: String },
    #[error("control site at location {loc} has dimension {dim} (must be 2)")]
    ControlSiteNotQubit { loc: usize, dim: usize },
    #[error("named gate target site at location {loc} has dimension {dim} (must be 2)")]
    NamedGateTargetNotQubit { loc: usize, dim: usize },
    #[error("gate matrix size {actual} does not match product of target site dimensions {expected}")]
    MatrixSizeMismatch { expected: usize, actual: usize },
    #[error("measurement key {0:?} is used more than once")]
    DuplicateMeasurementKey(String),
    #[error("{label} declares qubits {declared:?} but its body uses qubit {qubit}")]
    QubitOutsideComposite {
        label: String,
        declared: Vec<usize>,
        qubit: usize,
    },
    #[error(transparent)]
    Gate(#[from] GateError),
}

/// A validated sequence of operations on a register of qudits.
#[derive(Debug, Clone)]
pub struct Circuit {
    /// Local dimension of each site, e.g. `[2, 2, 2]` for 3 qubits.
    pub dims: Vec<usize>,
    pub operations: Vec<Operation>,
}

impl Circuit {
    /// Creates a new Circuit with validation.
    ///
    /// # Errors
    /// Returns a `CircuitError` if any operation does not fit the register
    /// or a measurement key repeats.
    pub fn new(dims: Vec<usize>, operations: Vec<Operation>) -> Result<Self, CircuitError> {
        for op in &operations {
            validate_operation(&dims, op)?;
        }

        let mut keys = HashSet::new();
        for key in operations.iter().flat_map(|op| op.measurement_keys()) {
            if !keys.insert(key) {
                return Err(CircuitError::DuplicateMeasurementKey(key.to_string()));
            }
        }

        Ok(Circuit { dims, operations })
    }

    pub fn num_sites(&self) -> usize {
        self.dims.len()
    }

    pub fn total_dim(&self) -> usize {
        self.dims.iter().product()
    }

    /// All measurement keys in circuit order.
    pub fn measurement_keys(&self) -> Vec<&str> {
        self.operations.iter().flat_map(|op| op.measurement_keys()).collect()
    }
}

fn check_in_range(dims: &[usize], locs: &[usize]) -> Result<(), CircuitError> {
    match locs.iter().find(|&&loc| loc >= dims.len()) {
        Some(&loc) => Err(CircuitError::LocOutOfRange {
            loc,
            num_sites: dims.len(),
        }),
        None => Ok(()),
    }
}

fn check_distinct(locs: &[usize]) -> Result<(), CircuitError> {
    let mut seen = HashSet::new();
    let mut repeated: Vec<usize> = locs.iter().copied().filter(|loc| !seen.insert(*loc)).collect();
    if repeated.is_empty() {
        return Ok(());
    }
    repeated.sort_unstable();
    repeated.dedup();
    Err(CircuitError::DuplicateLocs {
        locs: locs.to_vec(),
        repeated,
    })
}

fn validate_operation(dims: &[usize], op: &Operation) -> Result<(), CircuitError> {
    match op {
        Operation::Gate(pg) => validate_gate(dims, pg),
        Operation::Measure(m) => {
            check_in_range(dims, &m.qubits)?;
            check_distinct(&m.qubits)
        }
        Operation::Composite(c) => {
            check_in_range(dims, &c.qubits)?;
            check_distinct(&c.qubits)?;
            let declared: HashSet<usize> = c.qubits.iter().copied().collect();
            for inner in &c.body {
                if let Some(qubit) = inner.qubits().into_iter().find(|q| !declared.contains(q)) {
                    return Err(CircuitError::QubitOutsideComposite {
                        label: c.label.clone(),
                        declared: c.qubits.clone(),
                        qubit,
                    });
                }
                validate_operation(dims, inner)?;
            }
            Ok(())
        }
    }
}

fn validate_gate(dims: &[usize], pg: &PositionedGate) -> Result<(), CircuitError> {
    if pg.control_configs.len() != pg.control_locs.len() {
        return Err(CircuitError::ControlConfigLengthMismatch {
            control_locs_len: pg.control_locs.len(),
            control_configs_len: pg.control_configs.len(),
        });
    }
    check_in_range(dims, &pg.target_locs)?;
    check_in_range(dims, &pg.control_locs)?;
    check_distinct(&pg.target_locs)?;
    check_distinct(&pg.control_locs)?;

    let target_set: HashSet<usize> = pg.target_locs.iter().copied().collect();
    let mut overlapping: Vec<usize> = pg
        .control_locs
        .iter()
        .copied()
        .filter(|loc| target_set.contains(loc))
        .collect();
    if !overlapping.is_empty() {
        overlapping.sort_unstable();
        return Err(CircuitError::OverlappingLocs { overlapping });
    }

    let Some(&first_target) = pg.target_locs.first() else {
        return Err(CircuitError::NoTargets {
            gate: pg.gate.to_string(),
        });
    };

    for &loc in &pg.control_locs {
        if dims[loc] != 2 {
            return Err(CircuitError::ControlSiteNotQubit { loc, dim: dims[loc] });
        }
    }

    if !matches!(pg.gate, Gate::Custom { .. }) {
        for &loc in &pg.target_locs {
            if dims[loc] != 2 {
                return Err(CircuitError::NamedGateTargetNotQubit { loc, dim: dims[loc] });
            }
        }
    }

    let expected: usize = pg.target_locs.iter().map(|&loc| dims[loc]).product();
    let actual = pg.gate.matrix(dims[first_target])?.nrows();
    if actual != expected {
        return Err(CircuitError::MatrixSizeMismatch { expected, actual });
    }
    Ok(())
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nqubits: {}", self.num_sites())?;
        for op in &self.operations {
            writeln!(f, "  {}", op)?;
        }
        Ok(())
    }
}
