use std::panic::{AssertUnwindSafe, catch_unwind};

use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use yao_sim::act_on::{
    ActOnArgs, ActOnContext, ActOnError, ActOnOutcome, MeasurementLog, act_on,
    strat_act_on_from_apply_decompose,
};
use yao_sim::operation::MeasurementGate;
use yao_sim::{Gate, Operation, State, StateVectorArgs, composite, control, measure, put};

/// Records the axes every primitive gate is applied on and fails on demand.
struct RecordingArgs<'a> {
    ctx: ActOnContext<'a>,
    applied: Vec<(String, Vec<usize>)>,
    fail_on: Option<Gate>,
    panic_on: Option<Gate>,
}

impl<'a> RecordingArgs<'a> {
    fn new(axes: Vec<usize>, rng: &'a mut StdRng, log: &'a mut MeasurementLog) -> Self {
        RecordingArgs {
            ctx: ActOnContext::new(axes, rng, log),
            applied: Vec::new(),
            fail_on: None,
            panic_on: None,
        }
    }
}

impl ActOnArgs for RecordingArgs<'_> {
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
        Ok(vec![1; self.axes().len()])
    }

    fn act_on_fallback(&mut self, op: &Operation) -> Result<ActOnOutcome, ActOnError> {
        if let Operation::Gate(pg) = op {
            if op.decompose().is_none() {
                if self.panic_on.as_ref() == Some(&pg.gate) {
                    panic!("injected panic on {}", pg.gate);
                }
                if self.fail_on.as_ref() == Some(&pg.gate) {
                    return Err(ActOnError::CannotActOn(format!("injected failure on {}", op)));
                }
                let axes = self.axes().to_vec();
                self.applied.push((pg.gate.to_string(), axes));
                return Ok(ActOnOutcome::Applied);
            }
        }
        strat_act_on_from_apply_decompose(op, self)
    }
}

fn sample_composite() -> Operation {
    // qubits 5 and 7 of some register, with an inner composite on qubit 7
    composite(
        "block",
        vec![5, 7],
        vec![
            put(vec![7], Gate::H),
            control(vec![7], vec![5], Gate::X),
            composite("inner", vec![7], vec![put(vec![7], Gate::T)]),
        ],
    )
}

#[test]
fn test_decompose_remaps_sub_operation_axes() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![1, 0], &mut rng, &mut log);

    act_on(&sample_composite(), &mut args).unwrap();

    // qubit 5 -> axis 1, qubit 7 -> axis 0
    assert_eq!(
        args.applied,
        vec![
            ("H".to_string(), vec![0]),
            ("X".to_string(), vec![0, 1]),
            ("T".to_string(), vec![0]),
        ]
    );
    assert_eq!(args.axes(), &[1, 0]);
}

#[test]
fn test_decompose_restores_axes_after_failure() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![3, 4], &mut rng, &mut log);
    args.fail_on = Some(Gate::X);

    let err = act_on(&sample_composite(), &mut args).unwrap_err();
    assert!(matches!(err, ActOnError::CannotActOn(ref msg) if msg.contains("injected")));
    assert_eq!(args.applied.len(), 1);
    assert_eq!(args.axes(), &[3, 4]);
}

#[test]
fn test_decompose_restores_axes_after_panic() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![3, 4], &mut rng, &mut log);
    args.panic_on = Some(Gate::T);

    let outcome = catch_unwind(AssertUnwindSafe(|| act_on(&sample_composite(), &mut args)));
    assert!(outcome.is_err());
    assert_eq!(args.axes(), &[3, 4]);
}

#[test]
fn test_decompose_is_not_applicable_to_primitives() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![0], &mut rng, &mut log);

    let outcome = strat_act_on_from_apply_decompose(&put(vec![0], Gate::H), &mut args).unwrap();
    assert_eq!(outcome, ActOnOutcome::NotImplemented);
    assert!(args.applied.is_empty());
}

#[test]
fn test_decompose_rejects_axis_count_mismatch() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![0], &mut rng, &mut log);

    let err = act_on(&sample_composite(), &mut args).unwrap_err();
    assert!(matches!(
        err,
        ActOnError::AxesMismatch {
            num_qubits: 2,
            num_axes: 1,
            ..
        }
    ));
}

#[test]
fn test_decompose_rejects_repeated_axes() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![2, 2], &mut rng, &mut log);

    let err = act_on(&sample_composite(), &mut args).unwrap_err();
    assert!(matches!(err, ActOnError::DuplicateAxes { ref axes } if axes == &[2, 2]));
    assert!(args.applied.is_empty());
    assert_eq!(args.axes(), &[2, 2]);
}

#[test]
fn test_decompose_rejects_foreign_qubit() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = RecordingArgs::new(vec![0], &mut rng, &mut log);

    let op = composite("leaky", vec![0], vec![put(vec![0], Gate::X), put(vec![1], Gate::X)]);
    let err = act_on(&op, &mut args).unwrap_err();
    assert!(matches!(err, ActOnError::UnmappedQubit { qubit: 1, .. }));
    assert_eq!(args.axes(), &[0]);
}

#[test]
fn test_measurement_inside_composite_uses_remapped_axes() {
    let mut state = State::product_state(&[2, 2, 2], &[0, 0, 1]);
    let mut rng = StdRng::seed_from_u64(9);
    let mut log = MeasurementLog::new();
    {
        let op = composite(
            "readout",
            vec![0, 1],
            vec![put(vec![0], Gate::X), measure("pair", vec![1, 0])],
        );
        // register qubits 0,1 live on state axes 2,1
        let mut args = StateVectorArgs::new(&mut state, [2, 1], &mut rng, &mut log);
        act_on(&op, &mut args).unwrap();
        assert_eq!(args.axes(), &[2, 1]);
    }
    // axis 2 started at 1 and was flipped by X
    assert_eq!(log["pair"], vec![0, 0]);
    assert_abs_diff_eq!(state.data[0].norm(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_duplicate_key_inside_composite_keeps_first_and_restores_axes() {
    let mut state = State::zero_state(&[2, 2]);
    let mut rng = StdRng::seed_from_u64(1);
    let mut log = MeasurementLog::new();
    let op = composite(
        "twice",
        vec![0, 1],
        vec![
            measure("m", vec![0]),
            put(vec![0], Gate::X),
            measure("m", vec![0]),
        ],
    );
    {
        let mut args = StateVectorArgs::new(&mut state, [0, 1], &mut rng, &mut log);
        let err = act_on(&op, &mut args).unwrap_err();
        assert!(matches!(err, ActOnError::DuplicateMeasurementKey(ref k) if k == "m"));
        assert_eq!(args.axes(), &[0, 1]);
    }
    assert_eq!(log["m"], vec![0]);
    assert_eq!(log.len(), 1);
}

#[test]
fn test_invert_mask_through_state_vector() {
    let mut state = State::product_state(&[2, 2, 2], &[1, 0, 1]);
    let mut rng = StdRng::seed_from_u64(2);
    let mut log = MeasurementLog::new();
    let op = Operation::Measure(
        MeasurementGate::new("m", vec![0, 1, 2])
            .with_invert_mask(&[true, true, false])
            .unwrap(),
    );
    let mut args = StateVectorArgs::new(&mut state, [0, 1, 2], &mut rng, &mut log);
    act_on(&op, &mut args).unwrap();
    assert_eq!(log["m"], vec![0, 1, 1]);
}

#[test]
fn test_measure_with_short_mask_is_caller_error() {
    // |+>|0>, so a measurement would collapse qubit 0
    let mut state = State::zero_state(&[2, 2]);
    let mut rng = StdRng::seed_from_u64(2);
    let mut log = MeasurementLog::new();
    {
        let mut args = StateVectorArgs::new(&mut state, [0], &mut rng, &mut log);
        act_on(&put(vec![0], Gate::H), &mut args).unwrap();
    }
    let before = state.data.clone();
    {
        let mut args = StateVectorArgs::new(&mut state, [0, 1], &mut rng, &mut log);
        let err = args.measure("m", &[true]).unwrap_err();
        assert!(matches!(err, ActOnError::InvertMaskLength { mask_len: 1, num_bits: 2 }));
    }
    assert!(log.is_empty());
    assert_eq!(state.data, before);
}

#[test]
fn test_qutrit_outcome_is_not_inverted() {
    let mut state = State::product_state(&[3, 2], &[2, 0]);
    let mut rng = StdRng::seed_from_u64(2);
    let mut log = MeasurementLog::new();
    let mut args = StateVectorArgs::new(&mut state, [0, 1], &mut rng, &mut log);
    args.measure("m", &[true, true]).unwrap();
    assert_eq!(log["m"], vec![2, 1]);
}

#[test]
fn test_swap_applies_directly_on_state_vector() {
    let mut state = State::product_state(&[2, 2], &[1, 0]);
    let mut rng = StdRng::seed_from_u64(0);
    let mut log = MeasurementLog::new();
    let mut args = StateVectorArgs::new(&mut state, [0, 1], &mut rng, &mut log);
    act_on(&put(vec![0, 1], Gate::SWAP), &mut args).unwrap();
    assert_abs_diff_eq!(args.state().data[1].norm(), 1.0, epsilon = 1e-12);
}
