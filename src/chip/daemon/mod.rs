/// The execution thread.
mod actor;
/// The 60 Hz timer clock.
mod clock;
/// Messages from front ends to the execution thread.
mod message;

#[cfg(test)]
mod tests;

use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use log::{error, info};

use crate::chip::{chip8::Chip8, Chip, Fault, KeyError, LoadRomError};

use actor::Actor;
use message::Message;

pub use message::{ControlKind, ControlMessage, ErrorCallback, MessageError, SuccessCallback};

/// The clock speed used if none is configured, in instructions per second.
pub const DEFAULT_CLOCK_SPEED: u32 = 500;

/// Whether the daemon executes instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Paused,
    Running,
    /// Execution stopped because of the contained fault. Only a reset leaves this
    /// state.
    Halted(Fault),
}

/// Structured notifications about what the execution thread did. They are sent to
/// `DaemonConfig::event_sink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    Reset,
    RomLoaded {
        len: usize,
    },
    RomRejected(LoadRomError),
    RunStateChanged(RunState),
    ClockSpeedChanged(u32),
    /// Sent for every executed instruction if `DaemonConfig::trace_instructions` is
    /// set.
    Executed {
        address: u16,
        instruction: Option<u16>,
        mnemonic: Option<String>,
    },
    Halted(Fault),
}

/// Configures a daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Instructions per second. Values below 1 are treated as 1.
    pub clock_speed: u32,

    /// Whether every executed instruction is reported as `DaemonEvent::Executed`.
    pub trace_instructions: bool,

    /// Receives the events of the daemon. Events are dropped if there is no sink
    /// or the receiving side went away.
    pub event_sink: Option<Sender<DaemonEvent>>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            clock_speed: DEFAULT_CLOCK_SPEED,
            trace_instructions: false,
            event_sink: None,
        }
    }
}

/// Captures errors when talking to a daemon.
#[derive(Debug)]
pub enum DaemonError {
    /// The execution thread could not be started.
    Spawn(std::io::Error),

    /// The execution thread is gone.
    Disconnected,

    /// The execution thread panicked, e.g., in a message callback.
    ExecutionThreadPanicked,

    /// A key outside of the keypad was addressed.
    Key(KeyError),
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DaemonError::Spawn(error) => {
                write!(f, "Starting the execution thread failed: {}", error)
            }
            DaemonError::Disconnected => write!(f, "The execution thread is not running."),
            DaemonError::ExecutionThreadPanicked => write!(f, "The execution thread panicked."),
            DaemonError::Key(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DaemonError::Spawn(error) => Some(error),
            DaemonError::Key(error) => Some(error),
            _ => None,
        }
    }
}

/// The state the execution thread publishes for readers on other threads.
pub(crate) struct Published<S> {
    run_state: RunState,
    clock_speed: u32,
    snapshot: Arc<S>,
}

type Shared<S> = Arc<RwLock<Published<S>>>;

/// A cloneable handle to a running daemon. All writes go through the message queue
/// of the execution thread, reads return the most recently published state.
pub struct Controller<C: Chip> {
    sender: Sender<Message<C::KeyAddress>>,
    published: Shared<C::Snapshot>,
}

impl<C: Chip> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Controller {
            sender: self.sender.clone(),
            published: Arc::clone(&self.published),
        }
    }
}

impl<C: Chip> Controller<C> {
    /// Enqueues a control message. Its callbacks are invoked on the execution thread.
    pub fn send(&self, message: ControlMessage) -> Result<(), DaemonError> {
        self.post(Message::Control(message))
    }

    pub fn reset(&self) -> Result<(), DaemonError> {
        self.send(ControlMessage::reset())
    }

    pub fn load_rom(&self, rom: Vec<u8>) -> Result<(), DaemonError> {
        self.send(ControlMessage::load_rom(rom))
    }

    pub fn set_running(&self) -> Result<(), DaemonError> {
        self.send(ControlMessage::set_running())
    }

    pub fn set_paused(&self) -> Result<(), DaemonError> {
        self.send(ControlMessage::set_paused())
    }

    /// Changes the number of instructions executed per second, starting with the
    /// next instruction.
    pub fn set_clock_speed(&self, clock_speed: u32) -> Result<(), DaemonError> {
        self.post(Message::SetClockSpeed(clock_speed))
    }

    pub fn set_key_down(&self, key: u8) -> Result<(), DaemonError> {
        let key = C::key_address(key).map_err(DaemonError::Key)?;
        self.post(Message::KeyDown(key))
    }

    pub fn set_key_up(&self, key: u8) -> Result<(), DaemonError> {
        let key = C::key_address(key).map_err(DaemonError::Key)?;
        self.post(Message::KeyUp(key))
    }

    /// The most recently published machine state.
    pub fn snapshot(&self) -> Arc<C::Snapshot> {
        Arc::clone(&self.read().snapshot)
    }

    pub fn run_state(&self) -> RunState {
        self.read().run_state
    }

    pub fn clock_speed(&self) -> u32 {
        self.read().clock_speed
    }

    fn post(&self, message: Message<C::KeyAddress>) -> Result<(), DaemonError> {
        self.sender
            .send(message)
            .map_err(|_| DaemonError::Disconnected)
    }

    fn read(&self) -> RwLockReadGuard<'_, Published<C::Snapshot>> {
        self.published.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns a chip and the thread executing it. Dereferences to its `Controller`.
/// Dropping the daemon stops the execution thread and waits for it.
pub struct Daemon<C: Chip = Chip8> {
    controller: Controller<C>,
    thread: Option<JoinHandle<()>>,
}

impl Daemon<Chip8> {
    /// Starts a daemon executing a freshly reset CHIP-8.
    pub fn new(config: DaemonConfig) -> Result<Self, DaemonError> {
        Daemon::spawn(Chip8::new(), config)
    }
}

impl<C: Chip> Daemon<C> {
    /// Moves `chip` to a new execution thread. The daemon starts paused.
    pub fn spawn(chip: C, config: DaemonConfig) -> Result<Self, DaemonError> {
        let (sender, receiver) = unbounded();
        let clock_speed = config.clock_speed.max(1);
        let published = Arc::new(RwLock::new(Published {
            run_state: RunState::Paused,
            clock_speed,
            snapshot: Arc::new(chip.snapshot()),
        }));

        let actor = Actor::new(chip, receiver, Arc::clone(&published), config);
        let thread = thread::Builder::new()
            .name("chip8-daemon".to_string())
            .spawn(move || actor.run())
            .map_err(DaemonError::Spawn)?;
        info!("[daemon] Started at {} instructions per second.", clock_speed);

        Ok(Daemon {
            controller: Controller { sender, published },
            thread: Some(thread),
        })
    }

    pub fn controller(&self) -> Controller<C> {
        self.controller.clone()
    }

    /// Stops the execution thread and waits for it to finish. Queued messages are
    /// processed first.
    pub fn shutdown(mut self) -> Result<(), DaemonError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), DaemonError> {
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return Ok(()),
        };
        // The thread is already gone if it panicked.
        let _ = self.controller.sender.send(Message::Shutdown);
        thread
            .join()
            .map_err(|_| DaemonError::ExecutionThreadPanicked)
    }
}

impl<C: Chip> Deref for Daemon<C> {
    type Target = Controller<C>;

    fn deref(&self) -> &Controller<C> {
        &self.controller
    }
}

impl<C: Chip> Drop for Daemon<C> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("[daemon] {}", e);
        }
    }
}
