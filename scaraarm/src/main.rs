use std::io::BufRead;
use std::time::Duration;

use arm_utils::ik::{ArmGeom, Vec2};
use arm_utils::motion::{CycleError, MotionController};
use arm_utils::stepper::{SerialPulsePort, StepDriver, StepTiming};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serialport::{SerialPortInfo, SerialPortType};

#[derive(Debug, Parser)]
#[command(name = "scaraarm", about = "Two-link SCARA arm stepper client")]
struct Args {
    #[arg(
        long,
        value_name = "PORT",
        help = "Serial port path (e.g. COM6 or /dev/ttyUSB0). If omitted, auto-selects a detected port."
    )]
    port: Option<String>,

    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    #[arg(long, default_value_t = 125.0, help = "Upper arm length (mm)")]
    upper: f64,

    #[arg(long, default_value_t = 125.0, help = "Lower arm length (mm)")]
    lower: f64,

    #[arg(long, default_value_t = 0.1125, help = "Joint degrees per step pulse")]
    degrees_per_step: f64,

    #[arg(long, default_value_t = 5, help = "Inter-pulse delay for both joints (ms)")]
    step_interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one motion cycle to a target coordinate, then print the pose.
    Goto {
        #[arg(long)]
        x: f64,

        #[arg(long)]
        y: f64,
    },

    /// Read "x y" target lines from stdin and run one cycle per line.
    Track,

    /// Host a virtual stepper rig on a pty and print its device path.
    Rig,
}

fn score_port(info: &SerialPortInfo) -> i32 {
    let name = info.port_name.to_ascii_lowercase();
    let mut score = 0i32;

    score += match info.port_type {
        SerialPortType::UsbPort(_) => 40,
        SerialPortType::PciPort => 20,
        SerialPortType::Unknown => 10,
        SerialPortType::BluetoothPort => -30,
    };

    if name.contains("ttyusb")
        || name.contains("ttyacm")
        || name.contains("cu.usb")
        || name.starts_with("com")
    {
        score += 30;
    }
    if name.contains("usb") {
        score += 15;
    }
    if name.contains("bluetooth") {
        score -= 50;
    }

    score
}

fn resolve_port(
    port_arg: Option<String>,
    baud: u32,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(port) = port_arg {
        let trimmed = port.trim();
        if trimmed.is_empty() {
            return Err("port cannot be empty".into());
        }
        return Ok(trimmed.to_string());
    }

    let mut ports = serialport::available_ports()?;
    if ports.is_empty() {
        return Err(
            "no serial ports detected; pass --port explicitly (e.g. --port /dev/ttyUSB0)".into(),
        );
    }

    ports.sort_by(|a, b| {
        score_port(b)
            .cmp(&score_port(a))
            .then_with(|| a.port_name.cmp(&b.port_name))
    });

    let mut attempted = Vec::new();
    for info in ports {
        let port_name = info.port_name;
        match serialport::new(&port_name, baud)
            .timeout(Duration::from_millis(2))
            .open()
        {
            Ok(_) => {
                log::info!("auto-selected serial port {}", port_name);
                return Ok(port_name);
            }
            Err(err) => attempted.push(format!("{port_name}: {err}")),
        }
    }

    let details = attempted.join("; ");
    Err(format!(
        "no usable serial ports detected at baud {baud}; pass --port explicitly. Tried: {details}"
    )
    .into())
}

fn open_controller(
    args: &Args,
) -> Result<(MotionController, StepDriver<SerialPulsePort>), Box<dyn std::error::Error>> {
    if !(args.upper > 0.0) || !(args.lower > 0.0) {
        return Err("arm link lengths must be positive".into());
    }
    if !(args.degrees_per_step > 0.0) {
        return Err("degrees-per-step must be positive".into());
    }

    let port_name = resolve_port(args.port.clone(), args.baud)?;
    let port = SerialPulsePort::open(&port_name, args.baud)?;
    let driver = StepDriver::new(port);

    let geom = ArmGeom::new(args.upper, args.lower, args.degrees_per_step);
    let timing = StepTiming::uniform(Duration::from_millis(args.step_interval_ms));
    Ok((MotionController::new(geom, timing), driver))
}

fn print_pose(controller: &MotionController) {
    let state = controller.state();
    println!(
        "hand ({:.2}, {:.2})  elbow ({:.2}, {:.2})",
        state.hand.x, state.hand.y, state.elbow.x, state.elbow.y
    );
}

fn run_goto(args: &Args, x: f64, y: f64) -> Result<(), Box<dyn std::error::Error>> {
    let (mut controller, mut driver) = open_controller(args)?;

    match controller.goto(&mut driver, Vec2::new(x, y)) {
        Ok(plan) => {
            println!(
                "moved: shoulder {:?} {} steps, elbow {:?} {} steps",
                plan.shoulder.direction, plan.shoulder.steps, plan.elbow.direction, plan.elbow.steps
            );
            print_pose(&controller);
            Ok(())
        }
        Err(CycleError::Plan(err)) => Err(format!("target rejected: {err:?}").into()),
        Err(CycleError::Driver(err)) => Err(format!("driver failure: {err:?}").into()),
    }
}

fn parse_target(line: &str) -> Result<Vec2, String> {
    let mut fields = line.split_whitespace();
    let (Some(x), Some(y), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(format!("expected \"x y\", got {line:?}"));
    };
    let x = x
        .parse::<f64>()
        .map_err(|_| format!("x must be a floating-point number, got {x:?}"))?;
    let y = y
        .parse::<f64>()
        .map_err(|_| format!("y must be a floating-point number, got {y:?}"))?;
    Ok(Vec2::new(x, y))
}

fn run_track(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let (mut controller, mut driver) = open_controller(args)?;

    println!("reading targets from stdin, one \"x y\" pair per line");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let target = match parse_target(&line) {
            Ok(target) => target,
            Err(err) => {
                log::warn!("skipping input: {}", err);
                continue;
            }
        };

        // Rejected targets are already reported by the controller; stay
        // ready for the next line either way.
        if controller.goto(&mut driver, target).is_ok() {
            print_pose(&controller);
        }
    }

    Ok(())
}

#[cfg(unix)]
fn run_rig() -> Result<(), Box<dyn std::error::Error>> {
    use std::thread;

    use arm_utils::stepper::RigHost;

    let host = RigHost::start()?;
    println!("virtual stepper rig running.");
    println!("device: {}", host.slave_path());
    println!("joints: shoulder id 1, elbow id 2");
    println!("Press Ctrl-C to stop.");

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

#[cfg(not(unix))]
fn run_rig() -> Result<(), Box<dyn std::error::Error>> {
    Err("the virtual rig is only supported on Unix-like systems".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .without_timestamps()
        .init()
        .unwrap();

    let args = Args::parse();

    match &args.command {
        Command::Goto { x, y } => {
            let (x, y) = (*x, *y);
            run_goto(&args, x, y)
        }
        Command::Track => run_track(&args),
        Command::Rig => run_rig(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_accepts_two_floats() {
        assert_eq!(parse_target("100 120.5").unwrap(), Vec2::new(100.0, 120.5));
        assert_eq!(parse_target("  -80.0\t150 ").unwrap(), Vec2::new(-80.0, 150.0));
    }

    #[test]
    fn parse_target_rejects_bad_lines() {
        assert!(parse_target("100").is_err());
        assert!(parse_target("100 abc").is_err());
        assert!(parse_target("1 2 3").is_err());
    }
}
