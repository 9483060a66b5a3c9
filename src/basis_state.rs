//! [`ActOnArgs`] over computational basis states.
//!
//! Only operations that map basis states to basis states act natively: X
//! (with any controls) permutes values and diagonal gates leave them alone.
//! Anything else must decompose into those, which is how SWAP is handled.
//! Named gates only act on sites holding 0 or 1; a larger value means the
//! site is not a qubit and no strategy applies.

use rand::rngs::StdRng;
use tracing::debug;

use crate::act_on::{
    ActOnArgs, ActOnContext, ActOnError, ActOnOutcome, MeasurementLog, check_distinct_axes,
    strat_act_on_from_apply_decompose,
};
use crate::gate::Gate;
use crate::operation::Operation;

/// Acting context over one basis value per site.
#[derive(Debug)]
pub struct BasisStateArgs<'a> {
    ctx: ActOnContext<'a>,
    values: &'a mut Vec<usize>,
}

impl<'a> BasisStateArgs<'a> {
    pub fn new(
        values: &'a mut Vec<usize>,
        axes: impl IntoIterator<Item = usize>,
        prng: &'a mut StdRng,
        log_of_measurement_results: &'a mut MeasurementLog,
    ) -> Self {
        BasisStateArgs {
            ctx: ActOnContext::new(axes, prng, log_of_measurement_results),
            values,
        }
    }

    pub fn values(&self) -> &[usize] {
        self.values.as_slice()
    }

    fn value_at(&self, axis: usize) -> Result<usize, ActOnError> {
        self.values.get(axis).copied().ok_or(ActOnError::AxisOutOfRange {
            axis,
            num_sites: self.values.len(),
        })
    }
}

impl ActOnArgs for BasisStateArgs<'_> {
    fn axes(&self) -> &[usize] {
        self.ctx.axes()
    }

    fn set_axes(&mut self, axes: Vec<usize>) {
        self.ctx.set_axes(axes);
    }

    fn prng(&mut self) -> &mut StdRng {
        self.ctx.prng()
    }

    fn log_of_measurement_results(&mut self) -> &mut MeasurementLog {
        self.ctx.log_of_measurement_results()
    }

    fn perform_measurement(&mut self) -> Result<Vec<usize>, ActOnError> {
        self.ctx
            .axes()
            .iter()
            .map(|&axis| self.value_at(axis))
            .collect()
    }

    fn act_on_fallback(&mut self, op: &Operation) -> Result<ActOnOutcome, ActOnError> {
        if strat_act_on_basis_permutation(op, self)? == ActOnOutcome::Applied {
            return Ok(ActOnOutcome::Applied);
        }
        strat_act_on_from_apply_decompose(op, self)
    }
}

fn strat_act_on_basis_permutation(
    op: &Operation,
    args: &mut BasisStateArgs<'_>,
) -> Result<ActOnOutcome, ActOnError> {
    let Operation::Gate(pg) = op else {
        return Ok(ActOnOutcome::NotImplemented);
    };
    if pg.gate != Gate::X && !pg.gate.is_diagonal() {
        return Ok(ActOnOutcome::NotImplemented);
    }
    let axes = args.axes().to_vec();
    let num_controls = pg.control_locs.len();
    if axes.len() != num_controls + pg.target_locs.len() {
        return Err(ActOnError::AxesMismatch {
            op: op.to_string(),
            num_qubits: num_controls + pg.target_locs.len(),
            num_axes: axes.len(),
        });
    }
    check_distinct_axes(&axes)?;
    let (control_axes, target_axes) = axes.split_at(num_controls);

    let mut triggered = true;
    for (&axis, &config) in control_axes.iter().zip(pg.control_configs.iter()) {
        triggered &= args.value_at(axis)? == usize::from(config);
    }
    // named gates are qubit gates
    let named = !matches!(pg.gate, Gate::Custom { .. });
    for &axis in target_axes {
        if named && args.value_at(axis)? >= 2 {
            return Ok(ActOnOutcome::NotImplemented);
        }
    }
    if triggered && pg.gate == Gate::X {
        for &axis in target_axes {
            args.values[axis] ^= 1;
        }
    }
    debug!(%op, ?axes, triggered, "permuted basis state");
    Ok(ActOnOutcome::Applied)
}
