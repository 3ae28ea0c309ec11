//! Headless end-to-end demo: hosts the virtual rig on a pty, drives a
//! scripted target path through the full validate -> solve -> plan ->
//! emit pipeline over that pty, and checks the rig's step counters
//! against what was commanded.

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Duration;

    use arm_utils::ik::{ArmGeom, Vec2};
    use arm_utils::motion::{CycleError, MotionController, StepDirection};
    use arm_utils::stepper::{
        RigHost, SerialPulsePort, StepDriver, StepTiming, RIG_ELBOW_ID, RIG_SHOULDER_ID,
    };
    use log::LevelFilter;

    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .without_timestamps()
        .init()
        .unwrap();

    let host = RigHost::start()?;
    println!("virtual rig on {}", host.slave_path());

    let port = SerialPulsePort::open(host.slave_path(), 115_200)?;
    let mut driver = StepDriver::new(port);

    let geom = ArmGeom::new(125.0, 125.0, 0.1125);
    let mut controller =
        MotionController::new(geom, StepTiming::uniform(Duration::from_micros(200)));

    // Sweep the workspace, with two targets that must be skipped: one
    // outside the workspace box, one inside the box but past full reach.
    let targets = [
        Vec2::new(0.0, 250.0),
        Vec2::new(176.7766, 176.7766),
        Vec2::new(200.0, 30.0),
        Vec2::new(-250.0, -10.0),
        Vec2::new(250.0, 250.0),
        Vec2::new(-80.0, 150.0),
        Vec2::new(0.0, 250.0),
    ];

    let signed = |steps: u32, direction: StepDirection| match direction {
        StepDirection::Ccw => steps as i64,
        StepDirection::Cw => -(steps as i64),
    };

    let mut shoulder_commanded = 0i64;
    let mut elbow_commanded = 0i64;

    for target in targets {
        print!("target ({:.2}, {:.2}): ", target.x, target.y);
        match controller.goto(&mut driver, target) {
            Ok(plan) => {
                shoulder_commanded += signed(plan.shoulder.steps, plan.shoulder.direction);
                elbow_commanded += signed(plan.elbow.steps, plan.elbow.direction);
                let state = controller.state();
                println!(
                    "shoulder {:?} {} / elbow {:?} {} -> hand ({:.2}, {:.2}) elbow ({:.2}, {:.2})",
                    plan.shoulder.direction,
                    plan.shoulder.steps,
                    plan.elbow.direction,
                    plan.elbow.steps,
                    state.hand.x,
                    state.hand.y,
                    state.elbow.x,
                    state.elbow.y
                );
            }
            Err(CycleError::Plan(err)) => println!("skipped ({err:?})"),
            Err(CycleError::Driver(err)) => {
                return Err(format!("driver failure: {err:?}").into());
            }
        }
    }

    // The rig counts what actually came over the wire.
    println!();
    let mut mismatch = false;
    for snapshot in host.snapshots() {
        let (name, commanded) = match snapshot.id {
            RIG_SHOULDER_ID => ("shoulder", shoulder_commanded),
            RIG_ELBOW_ID => ("elbow", elbow_commanded),
            _ => continue,
        };
        let ok = snapshot.net_steps == commanded;
        mismatch |= !ok;
        println!(
            "{}: commanded {} net steps, rig counted {} ({} pulses) {}",
            name,
            commanded,
            snapshot.net_steps,
            snapshot.pulses,
            if ok { "ok" } else { "MISMATCH" }
        );
    }

    if mismatch {
        return Err("rig counters diverged from commanded steps".into());
    }
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("the scara_dreams demo needs the pty-backed rig and only runs on Unix-like systems.");
}
