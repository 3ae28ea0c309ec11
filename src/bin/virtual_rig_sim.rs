#[cfg(unix)]
fn main() -> std::io::Result<()> {
    use std::thread;
    use std::time::Duration;

    use arm_utils::stepper::RigHost;
    use log::LevelFilter;

    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .without_timestamps()
        .init()
        .unwrap();

    let host = RigHost::start()?;

    println!("virtual stepper rig ready.");
    println!("device: {}", host.slave_path());
    println!("joints: shoulder id 1, elbow id 2");
    println!("Press Ctrl-C to stop.");

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

#[cfg(not(unix))]
fn main() {
    eprintln!("virtual_rig_sim is only supported on Unix-like systems.");
}
