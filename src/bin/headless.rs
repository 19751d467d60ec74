use std::env;
use std::process;

use crossbeam_channel::unbounded;
use log::{error, info};

use chip8_daemon::chip::daemon::{
    ControlMessage, Daemon, DaemonConfig, DaemonEvent, DEFAULT_CLOCK_SPEED,
};

/// Runs a program without a front end until it faults or is rejected. Set
/// `RUST_LOG=trace` to follow every instruction.
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <program> [clock speed]",
            args.first().map(String::as_str).unwrap_or("headless")
        );
        process::exit(2);
    }

    let clock_speed = match args.get(2).map(|arg| arg.parse::<u32>()) {
        Some(Ok(clock_speed)) => clock_speed,
        Some(Err(e)) => {
            eprintln!("Invalid clock speed: {}", e);
            process::exit(2);
        }
        None => DEFAULT_CLOCK_SPEED,
    };

    let rom = match std::fs::read(&args[1]) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("Reading {} failed: {}", args[1], e);
            process::exit(1);
        }
    };

    let (event_sink, events) = unbounded();
    let daemon = match Daemon::new(DaemonConfig {
        clock_speed,
        event_sink: Some(event_sink),
        ..DaemonConfig::default()
    }) {
        Ok(daemon) => daemon,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let runner = daemon.controller();
    let started = daemon.reset().and_then(|_| {
        daemon.send(ControlMessage::load_rom(rom).on_success(move || {
            if let Err(e) = runner.set_running() {
                error!("{}", e);
            }
        }))
    });
    if let Err(e) = started {
        eprintln!("{}", e);
        process::exit(1);
    }

    let mut status = 0;
    for event in events.iter() {
        match event {
            DaemonEvent::Halted(fault) => {
                error!("{}", fault);
                status = 1;
                break;
            }
            DaemonEvent::RomRejected(e) => {
                error!("{}", e);
                status = 1;
                break;
            }
            event => info!("{:?}", event),
        }
    }

    let snapshot = daemon.snapshot();
    info!("{:?}", snapshot);
    if let Err(e) = daemon.shutdown() {
        error!("{}", e);
        status = 1;
    }
    process::exit(status);
}
