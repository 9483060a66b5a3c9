use ndarray::{Array2, array};
use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};
use thiserror::Error;

/// Errors raised when a gate cannot be materialized for a site dimension.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateError {
    #[error("named gate {gate} only supports d=2, got d={dim}")]
    NamedGateDimension { gate: String, dim: usize },
    #[error("custom gate matrix must be square, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("matrix dimension {size} is not a power of d={dim}")]
    NotAPower { size: usize, dim: usize },
}

/// Quantum gate: named qubit gates plus arbitrary custom matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    X,
    Y,
    Z,
    H,
    S,
    T,
    SWAP,
    /// diag(1, e^(iθ))
    Phase(f64),
    Rx(f64),
    Ry(f64),
    Rz(f64),
    Custom {
        matrix: Array2<Complex64>,
        is_diagonal: bool,
        label: String,
    },
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::X => write!(f, "X"),
            Gate::Y => write!(f, "Y"),
            Gate::Z => write!(f, "Z"),
            Gate::H => write!(f, "H"),
            Gate::S => write!(f, "S"),
            Gate::T => write!(f, "T"),
            Gate::SWAP => write!(f, "SWAP"),
            Gate::Phase(theta) => write!(f, "Phase({:.4})", theta),
            Gate::Rx(theta) => write!(f, "Rx({:.4})", theta),
            Gate::Ry(theta) => write!(f, "Ry({:.4})", theta),
            Gate::Rz(theta) => write!(f, "Rz({:.4})", theta),
            Gate::Custom { label, .. } => write!(f, "{}", label),
        }
    }
}

impl Gate {
    /// Build a custom gate from a square matrix.
    pub fn custom(matrix: Array2<Complex64>, label: impl Into<String>) -> Self {
        let is_diagonal = matrix
            .indexed_iter()
            .all(|((i, j), v)| i == j || v.norm() == 0.0);
        Gate::Custom {
            matrix,
            is_diagonal,
            label: label.into(),
        }
    }

    /// Matrix of the gate for local dimension `d`.
    pub fn matrix(&self, d: usize) -> Result<Array2<Complex64>, GateError> {
        match self {
            Gate::Custom { matrix, .. } => Ok(matrix.clone()),
            _ if d != 2 => Err(GateError::NamedGateDimension {
                gate: self.to_string(),
                dim: d,
            }),
            _ => Ok(self.qubit_matrix()),
        }
    }

    /// Number of sites the gate acts on when every site has dimension `d`.
    pub fn num_sites(&self, d: usize) -> Result<usize, GateError> {
        match self {
            Gate::SWAP => Ok(2),
            Gate::Custom { matrix, .. } => {
                let (rows, cols) = matrix.dim();
                if rows != cols {
                    return Err(GateError::NonSquareMatrix { rows, cols });
                }
                let mut n = 0usize;
                let mut power = 1usize;
                while power < rows && d > 1 {
                    power *= d;
                    n += 1;
                }
                if power != rows {
                    return Err(GateError::NotAPower { size: rows, dim: d });
                }
                Ok(n)
            }
            _ => Ok(1),
        }
    }

    pub fn is_diagonal(&self) -> bool {
        match self {
            Gate::Z | Gate::S | Gate::T | Gate::Phase(_) | Gate::Rz(_) => true,
            Gate::Custom { is_diagonal, .. } => *is_diagonal,
            _ => false,
        }
    }

    /// Adjoint of the gate. For unitaries this is the inverse.
    pub fn dagger(&self) -> Self {
        match self {
            Gate::H | Gate::X | Gate::Y | Gate::Z | Gate::SWAP => self.clone(),
            Gate::S => Gate::Phase(-FRAC_PI_2),
            Gate::T => Gate::Phase(-FRAC_PI_4),
            Gate::Phase(theta) => Gate::Phase(-theta),
            Gate::Rx(theta) => Gate::Rx(-theta),
            Gate::Ry(theta) => Gate::Ry(-theta),
            Gate::Rz(theta) => Gate::Rz(-theta),
            Gate::Custom {
                matrix,
                is_diagonal,
                label,
            } => Gate::Custom {
                matrix: matrix.t().mapv(|c| c.conj()),
                is_diagonal: *is_diagonal,
                label: format!("{}†", label),
            },
        }
    }

    fn qubit_matrix(&self) -> Array2<Complex64> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);

        match self {
            Gate::X => array![[zero, one], [one, zero]],
            Gate::Y => array![[zero, -i], [i, zero]],
            Gate::Z => array![[one, zero], [zero, -one]],
            Gate::H => {
                let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
                array![[s, s], [s, -s]]
            }
            Gate::S => array![[one, zero], [zero, i]],
            Gate::T => array![[one, zero], [zero, Complex64::from_polar(1.0, FRAC_PI_4)]],
            Gate::SWAP => {
                // rows |00>, |01>, |10>, |11>
                let mut m = Array2::zeros((4, 4));
                m[[0, 0]] = one;
                m[[1, 2]] = one;
                m[[2, 1]] = one;
                m[[3, 3]] = one;
                m
            }
            Gate::Phase(theta) => array![[one, zero], [zero, Complex64::from_polar(1.0, *theta)]],
            Gate::Rx(theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new(0.0, -(theta / 2.0).sin());
                array![[c, s], [s, c]]
            }
            Gate::Ry(theta) => {
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new((theta / 2.0).sin(), 0.0);
                array![[c, -s], [s, c]]
            }
            Gate::Rz(theta) => array![
                [Complex64::from_polar(1.0, -theta / 2.0), zero],
                [zero, Complex64::from_polar(1.0, theta / 2.0)]
            ],
            Gate::Custom { matrix, .. } => matrix.clone(),
        }
    }
}
