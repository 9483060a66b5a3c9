//! Operations dispatched through [`act_on`](crate::act_on::act_on).
//!
//! Qubit indices of an operation name sites of the register it is applied to.
//! Composite operations refer to the same register, so their decomposition is
//! expressed over a subset of their own qubits.

use std::fmt;

use thiserror::Error;

use crate::gate::Gate;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("invert mask of length {mask_len} is longer than the {num_qubits} measured qubits of {key:?}")]
    InvertMaskTooLong {
        key: String,
        mask_len: usize,
        num_qubits: usize,
    },
}

/// A gate placed at specific locations.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedGate {
    pub gate: Gate,
    pub target_locs: Vec<usize>,
    pub control_locs: Vec<usize>,
    pub control_configs: Vec<bool>,
}

impl PositionedGate {
    pub fn new(
        gate: Gate,
        target_locs: Vec<usize>,
        control_locs: Vec<usize>,
        control_configs: Vec<bool>,
    ) -> Self {
        PositionedGate {
            gate,
            target_locs,
            control_locs,
            control_configs,
        }
    }

    /// Control locations followed by target locations.
    pub fn all_locs(&self) -> Vec<usize> {
        let mut locs = self.control_locs.clone();
        locs.extend(&self.target_locs);
        locs
    }

    /// SWAP as three controlled X gates. Controls of the SWAP are added to
    /// the middle gate only.
    fn decompose_swap(&self) -> Vec<Operation> {
        let (a, b) = (self.target_locs[0], self.target_locs[1]);
        let mut middle_controls = self.control_locs.clone();
        middle_controls.push(a);
        let mut middle_configs = self.control_configs.clone();
        middle_configs.push(true);
        vec![
            Operation::Gate(PositionedGate::new(Gate::X, vec![a], vec![b], vec![true])),
            Operation::Gate(PositionedGate::new(Gate::X, vec![b], middle_controls, middle_configs)),
            Operation::Gate(PositionedGate::new(Gate::X, vec![a], vec![b], vec![true])),
        ]
    }
}

/// Measurement of `qubits` recorded under `key`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementGate {
    pub key: String,
    pub qubits: Vec<usize>,
    invert_mask: Vec<bool>,
}

impl MeasurementGate {
    pub fn new(key: impl Into<String>, qubits: Vec<usize>) -> Self {
        let invert_mask = vec![false; qubits.len()];
        MeasurementGate {
            key: key.into(),
            qubits,
            invert_mask,
        }
    }

    /// Flip the recorded outcome of the qubits whose entry is `true`.
    ///
    /// A short mask is padded with `false`.
    pub fn with_invert_mask(mut self, mask: &[bool]) -> Result<Self, OperationError> {
        if mask.len() > self.qubits.len() {
            return Err(OperationError::InvertMaskTooLong {
                key: self.key,
                mask_len: mask.len(),
                num_qubits: self.qubits.len(),
            });
        }
        self.invert_mask = mask.to_vec();
        self.invert_mask.resize(self.qubits.len(), false);
        Ok(self)
    }

    /// Invert mask with one entry per measured qubit.
    pub fn invert_mask(&self) -> &[bool] {
        &self.invert_mask
    }
}

/// Labelled sequence of operations acting on a declared qubit set.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeOperation {
    pub label: String,
    pub qubits: Vec<usize>,
    pub body: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Gate(PositionedGate),
    Measure(MeasurementGate),
    Composite(CompositeOperation),
}

impl Operation {
    /// Qubits in the order the operation's axes are laid out.
    pub fn qubits(&self) -> Vec<usize> {
        match self {
            Operation::Gate(pg) => pg.all_locs(),
            Operation::Measure(m) => m.qubits.clone(),
            Operation::Composite(c) => c.qubits.clone(),
        }
    }

    /// Equivalent sequence of simpler operations over the same qubits, if any.
    pub fn decompose(&self) -> Option<Vec<Operation>> {
        match self {
            Operation::Gate(pg) if pg.gate == Gate::SWAP && pg.target_locs.len() == 2 => {
                Some(pg.decompose_swap())
            }
            Operation::Composite(c) => Some(c.body.clone()),
            _ => None,
        }
    }

    /// Measurement keys written by this operation, including nested ones.
    pub fn measurement_keys(&self) -> Vec<&str> {
        match self {
            Operation::Gate(_) => Vec::new(),
            Operation::Measure(m) => vec![m.key.as_str()],
            Operation::Composite(c) => c.body.iter().flat_map(|op| op.measurement_keys()).collect(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Gate(pg) if pg.control_locs.is_empty() => {
                write!(f, "{} @ q[{}]", pg.gate, format_locs(&pg.target_locs))
            }
            Operation::Gate(pg) => write!(
                f,
                "C(q[{}]) {} @ q[{}]",
                format_locs(&pg.control_locs),
                pg.gate,
                format_locs(&pg.target_locs)
            ),
            Operation::Measure(m) => write!(f, "M({:?}) @ q[{}]", m.key, format_locs(&m.qubits)),
            Operation::Composite(c) => write!(f, "{} @ q[{}]", c.label, format_locs(&c.qubits)),
        }
    }
}

pub(crate) fn format_locs(locs: &[usize]) -> String {
    locs.iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Place a gate on target locations.
///
/// # Example
/// ```
/// use yao_sim::{Gate, Operation, put};
/// let op = put(vec![0], Gate::H);
/// assert_eq!(op.qubits(), vec![0]);
/// ```
pub fn put(target_locs: Vec<usize>, gate: Gate) -> Operation {
    Operation::Gate(PositionedGate::new(gate, target_locs, vec![], vec![]))
}

/// Place a gate controlled on |1> of every control location.
///
/// # Example
/// ```
/// use yao_sim::{Gate, control};
/// let cnot = control(vec![0], vec![1], Gate::X);
/// assert_eq!(cnot.qubits(), vec![0, 1]);
/// ```
pub fn control(ctrl_locs: Vec<usize>, target_locs: Vec<usize>, gate: Gate) -> Operation {
    let configs = vec![true; ctrl_locs.len()];
    Operation::Gate(PositionedGate::new(gate, target_locs, ctrl_locs, configs))
}

/// Measure `qubits` into `key` without inversion.
pub fn measure(key: impl Into<String>, qubits: Vec<usize>) -> Operation {
    Operation::Measure(MeasurementGate::new(key, qubits))
}

/// Group `body` into a single operation over `qubits`.
pub fn composite(label: impl Into<String>, qubits: Vec<usize>, body: Vec<Operation>) -> Operation {
    Operation::Composite(CompositeOperation {
        label: label.into(),
        qubits,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_mask_is_padded() {
        let m = MeasurementGate::new("m", vec![0, 1, 2])
            .with_invert_mask(&[true])
            .unwrap();
        assert_eq!(m.invert_mask(), &[true, false, false]);
    }

    #[test]
    fn test_invert_mask_too_long() {
        let err = MeasurementGate::new("m", vec![0])
            .with_invert_mask(&[true, true])
            .unwrap_err();
        assert!(matches!(err, OperationError::InvertMaskTooLong { mask_len: 2, num_qubits: 1, .. }));
    }

    #[test]
    fn test_controlled_swap_decomposition_keeps_controls() {
        let fredkin = Operation::Gate(PositionedGate::new(Gate::SWAP, vec![1, 2], vec![0], vec![false]));
        let ops = fredkin.decompose().unwrap();
        assert_eq!(ops.len(), 3);
        match &ops[1] {
            Operation::Gate(pg) => {
                assert_eq!(pg.control_locs, vec![0, 1]);
                assert_eq!(pg.control_configs, vec![false, true]);
                assert_eq!(pg.target_locs, vec![2]);
            }
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_primitive_has_no_decomposition() {
        assert!(put(vec![0], Gate::H).decompose().is_none());
        assert!(measure("m", vec![0]).decompose().is_none());
    }

    #[test]
    fn test_nested_measurement_keys() {
        let op = composite(
            "bell",
            vec![0, 1],
            vec![
                measure("a", vec![0]),
                composite("inner", vec![1], vec![measure("b", vec![1])]),
            ],
        );
        assert_eq!(op.measurement_keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(control(vec![0], vec![1], Gate::X).to_string(), "C(q[0]) X @ q[1]");
        assert_eq!(measure("m", vec![0, 2]).to_string(), "M(\"m\") @ q[0, 2]");
    }
}
