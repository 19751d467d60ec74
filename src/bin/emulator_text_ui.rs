use std::collections::VecDeque;
use std::env;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError};
use cursive::{
    event::Key,
    view::{Nameable, Resizable},
    views::{Dialog, LinearLayout, TextView},
    CbSink, Cursive,
};
use log::{error, info};

use chip8_daemon::chip::{
    chip8::{
        cursive_display::{describe_registers, Display},
        Chip8,
    },
    daemon::{
        ControlMessage, Controller, Daemon, DaemonConfig, DaemonEvent, RunState,
        DEFAULT_CLOCK_SPEED,
    },
};

/// The interval in which the UI is refreshed.
const FRAME: Duration = Duration::from_millis(16);

/// Number of lines kept in the instruction log.
const LOG_LINES: usize = 12;

/// Error type for errors that occur during parsing the command line arguments
/// and loading the program based on the arguments.
enum Error {
    InvalidUsage(String),
    InvalidClockSpeed(String),
    InvalidProgram(std::io::Error),
}

/// The options read from the command line.
struct Options {
    rom: Vec<u8>,
    clock_speed: u32,
}

/// Interprets the first argument as path to the program to load and the optional
/// second argument as the clock speed in instructions per second.
fn options_from_args() -> Result<Options, Error> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(Error::InvalidUsage(format!(
            "{} <program> [clock speed]",
            args.first().map(String::as_str).unwrap_or("emulator_text_ui")
        )));
    }

    let clock_speed = match args.get(2) {
        Some(arg) => arg
            .parse()
            .map_err(|_| Error::InvalidClockSpeed(arg.clone()))?,
        None => DEFAULT_CLOCK_SPEED,
    };
    let rom = std::fs::read(&args[1]).map_err(Error::InvalidProgram)?;

    Ok(Options { rom, clock_speed })
}

/// Resets the machine, loads `rom` and starts execution once it is loaded.
fn start(controller: &Controller<Chip8>, rom: Vec<u8>) {
    let runner = controller.clone();
    let message = ControlMessage::load_rom(rom)
        .on_success(move || {
            if let Err(e) = runner.set_running() {
                error!("{}", e);
            }
        })
        .on_error(|e| error!("{}", e));

    if let Err(e) = controller
        .reset()
        .and_then(|_| controller.send(message))
    {
        error!("{}", e);
    }
}

/// Pushes the latest snapshot and the instruction log to the UI until `stop` is
/// disconnected or the UI went away.
fn refresh_loop(
    controller: Controller<Chip8>,
    events: Receiver<DaemonEvent>,
    ui: CbSink,
    stop: Receiver<()>,
) {
    let mut lines = VecDeque::with_capacity(LOG_LINES);
    loop {
        match stop.recv_timeout(FRAME) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => return,
        }

        for event in events.try_iter() {
            let line = match event {
                DaemonEvent::Executed {
                    address,
                    instruction,
                    mnemonic,
                } => format!(
                    "{:03X}  {:04X}  {}",
                    address,
                    instruction.unwrap_or(0),
                    mnemonic.unwrap_or_default()
                ),
                DaemonEvent::Halted(fault) => format!("halted: {}", fault),
                DaemonEvent::RomRejected(e) => format!("rejected: {}", e),
                DaemonEvent::RunStateChanged(run_state) => format!("{:?}", run_state),
                DaemonEvent::ClockSpeedChanged(clock_speed) => format!("{} Hz", clock_speed),
                DaemonEvent::Reset | DaemonEvent::RomLoaded { .. } => continue,
            };
            if lines.len() == LOG_LINES {
                lines.pop_front();
            }
            lines.push_back(line);
        }

        let snapshot = controller.snapshot();
        let registers = describe_registers(&snapshot);
        let log = lines.iter().cloned().collect::<Vec<_>>().join("\n");
        let status = format!(
            "{:?} at {} instructions per second",
            controller.run_state(),
            controller.clock_speed()
        );
        let update = move |s: &mut Cursive| {
            s.call_on_name("screen", |view: &mut Display| view.set_snapshot(snapshot));
            s.call_on_name("registers", |view: &mut TextView| {
                view.set_content(registers)
            });
            s.call_on_name("log", |view: &mut TextView| view.set_content(log));
            s.call_on_name("status", |view: &mut TextView| view.set_content(status));
        };
        if ui.send(Box::new(update)).is_err() {
            return;
        }
    }
}

/// Maps the keyboard to the keypad, i.e.,
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// q w e r  ->  4 5 6 D
/// a s d f      7 8 9 E
/// z x c v      A 0 B F
/// ```
const KEYPAD: [(char, u8); 16] = [
    ('1', 0x1),
    ('2', 0x2),
    ('3', 0x3),
    ('4', 0xC),
    ('q', 0x4),
    ('w', 0x5),
    ('e', 0x6),
    ('r', 0xD),
    ('a', 0x7),
    ('s', 0x8),
    ('d', 0x9),
    ('f', 0xE),
    ('z', 0xA),
    ('x', 0x0),
    ('c', 0xB),
    ('v', 0xF),
];

fn register_callbacks(siv: &mut Cursive, controller: &Controller<Chip8>, rom: Vec<u8>) {
    for (character, key) in KEYPAD.iter().copied() {
        let controller = controller.clone();
        siv.add_global_callback(character, move |_s| {
            if let Err(e) = controller.set_key_down(key) {
                error!("{}", e);
            }
        });
    }

    // Terminals do not report keys going up, so all keys are released at once.
    let c = controller.clone();
    siv.add_global_callback(' ', move |_s| {
        for key in 0..16 {
            if let Err(e) = c.set_key_up(key) {
                error!("{}", e);
                return;
            }
        }
    });

    let c = controller.clone();
    siv.add_global_callback(Key::Up, move |_s| {
        if let Err(e) = c.set_clock_speed(c.clock_speed().saturating_add(100)) {
            error!("{}", e);
        }
    });

    let c = controller.clone();
    siv.add_global_callback(Key::Down, move |_s| {
        if let Err(e) = c.set_clock_speed(c.clock_speed().saturating_sub(100).max(1)) {
            error!("{}", e);
        }
    });

    let c = controller.clone();
    siv.add_global_callback('p', move |_s| {
        let result = match c.run_state() {
            RunState::Running => c.set_paused(),
            _ => c.set_running(),
        };
        if let Err(e) = result {
            error!("{}", e);
        }
    });

    let c = controller.clone();
    siv.add_global_callback(Key::F5, move |_s| start(&c, rom.clone()));

    siv.add_global_callback('~', Cursive::toggle_debug_console);
    siv.add_global_callback(Key::Esc, |s| s.quit());
}

/// Constructs the UI, starts the daemon and the refresh thread.
fn main() {
    let options = match options_from_args() {
        Ok(options) => options,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    cursive::logger::init();
    log::set_max_level(log::LevelFilter::Debug);

    let (event_sink, events) = unbounded();
    let daemon = match Daemon::new(DaemonConfig {
        clock_speed: options.clock_speed,
        trace_instructions: true,
        event_sink: Some(event_sink),
    }) {
        Ok(daemon) => daemon,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    let mut siv = cursive::default();
    siv.add_layer(
        Dialog::around(
            LinearLayout::vertical()
                .child(
                    LinearLayout::horizontal()
                        .child(Display::default().with_name("screen"))
                        .child(TextView::new("").with_name("registers").fixed_width(24)),
                )
                .child(TextView::new("").with_name("log").fixed_height(LOG_LINES))
                .child(TextView::new("").with_name("status")),
        )
        .title("CHIP-8"),
    );
    register_callbacks(&mut siv, &daemon.controller(), options.rom.clone());

    let (stop_sender, stop) = bounded::<()>(0);
    let controller = daemon.controller();
    let ui = siv.cb_sink().clone();
    let refresh = std::thread::spawn(move || refresh_loop(controller, events, ui, stop));

    start(&daemon, options.rom);
    siv.run();

    drop(stop_sender);
    if refresh.join().is_err() {
        error!("The refresh thread panicked.");
    }
    match daemon.shutdown() {
        Ok(()) => info!("Shut down."),
        Err(e) => println!("{}", e),
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidUsage(message) => write!(f, "Usage: {}", message),
            Error::InvalidClockSpeed(arg) => write!(f, "Invalid clock speed: {}", arg),
            Error::InvalidProgram(error) => write!(f, "{}", error),
        }
    }
}
