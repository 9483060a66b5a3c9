//! [`ActOnArgs`] bound to a dense [`State`].

use rand::rngs::StdRng;
use tracing::debug;

use crate::act_on::{
    ActOnArgs, ActOnContext, ActOnError, ActOnOutcome, MeasurementLog, check_distinct_axes,
    strat_act_on_from_apply_decompose,
};
use crate::deprecation::Deprecation;
use crate::instruct::instruct_controlled;
use crate::measure::measure_and_collapse;
use crate::operation::Operation;
use crate::state::State;

/// Acting context over a state vector; axes index `state.dims`.
#[derive(Debug)]
pub struct StateVectorArgs<'a> {
    ctx: ActOnContext<'a>,
    state: &'a mut State,
}

impl<'a> StateVectorArgs<'a> {
    pub fn new(
        state: &'a mut State,
        axes: impl IntoIterator<Item = usize>,
        prng: &'a mut StdRng,
        log_of_measurement_results: &'a mut MeasurementLog,
    ) -> Self {
        StateVectorArgs {
            ctx: ActOnContext::new(axes, prng, log_of_measurement_results),
            state,
        }
    }

    pub fn state(&self) -> &State {
        &*self.state
    }

    /// Store `bits` under `key` without measuring.
    #[track_caller]
    pub fn record_measurement_result(&mut self, key: &str, bits: Vec<usize>) -> Result<(), ActOnError> {
        Deprecation::new(
            "v0.3",
            "Use `ActOnArgs::measure` so the state collapses consistently.",
            "StateVectorArgs::record_measurement_result",
        )?
        .warn()?;
        let log = self.ctx.log_of_measurement_results();
        if log.contains_key(key) {
            return Err(ActOnError::DuplicateMeasurementKey(key.to_string()));
        }
        log.insert(key.to_string(), bits);
        Ok(())
    }

    /// Current axes, each in range and distinct.
    fn checked_axes(&self) -> Result<Vec<usize>, ActOnError> {
        let num_sites = self.state.num_sites();
        let axes = self.ctx.axes();
        if let Some(&axis) = axes.iter().find(|&&axis| axis >= num_sites) {
            return Err(ActOnError::AxisOutOfRange { axis, num_sites });
        }
        check_distinct_axes(axes)?;
        Ok(axes.to_vec())
    }
}

impl ActOnArgs for StateVectorArgs<'_> {
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
        let axes = self.checked_axes()?;
        Ok(measure_and_collapse(&mut *self.state, Some(&axes), self.ctx.prng()))
    }

    fn act_on_fallback(&mut self, op: &Operation) -> Result<ActOnOutcome, ActOnError> {
        if strat_act_on_from_apply_unitary(op, self)? == ActOnOutcome::Applied {
            return Ok(ActOnOutcome::Applied);
        }
        strat_act_on_from_apply_decompose(op, self)
    }
}

/// Multiply the gate's matrix into the state at the current axes.
fn strat_act_on_from_apply_unitary(
    op: &Operation,
    args: &mut StateVectorArgs<'_>,
) -> Result<ActOnOutcome, ActOnError> {
    let Operation::Gate(pg) = op else {
        return Ok(ActOnOutcome::NotImplemented);
    };
    let axes = args.checked_axes()?;
    let num_controls = pg.control_locs.len();
    if axes.len() != num_controls + pg.target_locs.len() {
        return Err(ActOnError::AxesMismatch {
            op: op.to_string(),
            num_qubits: num_controls + pg.target_locs.len(),
            num_axes: axes.len(),
        });
    }
    let (control_axes, target_axes) = axes.split_at(num_controls);

    let dims = &args.state.dims;
    let d = target_axes.first().map_or(2, |&axis| dims[axis]);
    let matrix = pg.gate.matrix(d)?;
    let expected: usize = target_axes.iter().map(|&axis| dims[axis]).product();
    if matrix.nrows() != expected || matrix.ncols() != expected {
        return Err(ActOnError::GateSizeMismatch {
            expected,
            actual: matrix.nrows(),
        });
    }

    debug!(%op, ?axes, "applying unitary");
    instruct_controlled(&mut *args.state, &matrix, target_axes, control_axes, &pg.control_configs);
    Ok(ActOnOutcome::Applied)
}
