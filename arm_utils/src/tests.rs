//! End-to-end cycles against the in-process rig: validate -> solve ->
//! plan -> emit, with the rig's step counters as ground truth.

use std::time::Duration;

use crate::ik::{ArmGeom, IkError, Vec2};
use crate::motion::{CycleError, MotionController, MotionPlan, PlanError, StepDirection};
use crate::stepper::{RigSim, SimPort, StepDriver, StepTiming, RIG_ELBOW_ID, RIG_SHOULDER_ID};

fn controller() -> MotionController {
    MotionController::new(
        ArmGeom::new(125.0, 125.0, 0.1125),
        StepTiming::uniform(Duration::ZERO),
    )
}

fn sim_driver() -> StepDriver<SimPort> {
    StepDriver::new(SimPort::new(RigSim::two_joint()))
}

fn signed(steps: u32, direction: StepDirection) -> i64 {
    match direction {
        StepDirection::Ccw => steps as i64,
        StepDirection::Cw => -(steps as i64),
    }
}

fn rig_net(driver: &StepDriver<SimPort>, id: u8) -> i64 {
    driver
        .port()
        .sim()
        .snapshots()
        .into_iter()
        .find(|s| s.id == id)
        .map(|s| s.net_steps)
        .unwrap_or(0)
}

fn plan_net(plan: &MotionPlan) -> (i64, i64) {
    (
        signed(plan.shoulder.steps, plan.shoulder.direction),
        signed(plan.elbow.steps, plan.elbow.direction),
    )
}

#[test]
fn full_cycle_reaches_rig_with_planned_steps() {
    let mut controller = controller();
    let mut driver = sim_driver();
    let target = Vec2::new(176.7766, 176.7766);

    let plan = controller.goto(&mut driver, target).expect("cycle should run");
    let (shoulder, elbow) = plan_net(&plan);

    assert!(shoulder < 0, "shoulder should swing clockwise");
    assert_eq!(rig_net(&driver, RIG_SHOULDER_ID), shoulder);
    assert_eq!(rig_net(&driver, RIG_ELBOW_ID), elbow);
    assert_eq!(controller.state().hand, target);
}

#[test]
fn settled_second_cycle_is_a_noop() {
    let mut controller = controller();
    let mut driver = sim_driver();
    let target = Vec2::new(100.0, 120.0);

    controller.goto(&mut driver, target).unwrap();
    let shoulder_before = rig_net(&driver, RIG_SHOULDER_ID);
    let elbow_before = rig_net(&driver, RIG_ELBOW_ID);

    let plan = controller.goto(&mut driver, target).unwrap();
    assert!(plan.is_noop(), "second cycle should plan nothing: {:?}", plan);
    assert_eq!(rig_net(&driver, RIG_SHOULDER_ID), shoulder_before);
    assert_eq!(rig_net(&driver, RIG_ELBOW_ID), elbow_before);
}

#[test]
fn target_sequence_accumulates_exactly_on_the_rig() {
    let mut controller = controller();
    let mut driver = sim_driver();

    let mut shoulder_total = 0i64;
    let mut elbow_total = 0i64;
    for &target in &[
        Vec2::new(100.0, 120.0),
        Vec2::new(-80.0, 150.0),
        Vec2::new(0.0, 250.0),
        Vec2::new(200.0, 30.0),
    ] {
        let plan = controller.goto(&mut driver, target).unwrap();
        let (shoulder, elbow) = plan_net(&plan);
        shoulder_total += shoulder;
        elbow_total += elbow;
    }

    assert_eq!(rig_net(&driver, RIG_SHOULDER_ID), shoulder_total);
    assert_eq!(rig_net(&driver, RIG_ELBOW_ID), elbow_total);
}

#[test]
fn out_of_range_target_emits_nothing() {
    let mut controller = controller();
    let mut driver = sim_driver();
    let before = *controller.state();

    let err = controller
        .goto(&mut driver, Vec2::new(-250.0, -10.0))
        .unwrap_err();
    assert_eq!(err, CycleError::Plan(PlanError::OutOfRange));
    assert_eq!(*controller.state(), before);
    assert!(driver.port().sim().snapshots().iter().all(|s| s.pulses == 0));
}

#[test]
fn infeasible_target_emits_nothing() {
    let mut controller = controller();
    let mut driver = sim_driver();
    let before = *controller.state();

    // Inside the workspace box, beyond full reach.
    let err = controller
        .goto(&mut driver, Vec2::new(250.0, 250.0))
        .unwrap_err();
    assert_eq!(err, CycleError::Plan(PlanError::Ik(IkError::Unreachable)));
    assert_eq!(*controller.state(), before);
    assert!(driver.port().sim().snapshots().iter().all(|s| s.pulses == 0));

    // A failed cycle must not poison the next one.
    assert!(controller.goto(&mut driver, Vec2::new(0.0, 250.0)).is_ok());
}

#[test]
fn pose_always_respects_link_lengths_across_cycles() {
    let mut controller = controller();
    let mut driver = sim_driver();
    let geom = *controller.geom();

    for &target in &[
        Vec2::new(60.0, 90.0),
        Vec2::new(-120.0, 80.0),
        Vec2::new(0.0, 250.0),
        Vec2::new(176.7766, 176.7766),
    ] {
        controller.goto(&mut driver, target).unwrap();
        let state = controller.state();
        assert!((state.elbow.norm() - geom.upper).abs() < 1e-6);
        assert!((state.hand.dist(state.elbow) - geom.lower).abs() < 1e-6);
    }
}
