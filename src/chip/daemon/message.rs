use crate::chip::{Fault, LoadRomError};

/// Called on the execution thread once a control message was processed.
pub type SuccessCallback = Box<dyn FnOnce() + Send>;

/// Called on the execution thread if a control message could not be processed.
pub type ErrorCallback = Box<dyn FnOnce(MessageError) + Send>;

/// The operation a control message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Reinitializes the machine. Clears a halted daemon back to paused.
    Reset,
    /// Copies the payload into memory at the program address.
    LoadRom,
    /// Starts executing instructions.
    SetRunning,
    /// Stops executing instructions at the current instruction.
    SetPaused,
}

/// A request to the execution thread. Callbacks are invoked on the execution thread
/// after the message was processed.
pub struct ControlMessage {
    pub kind: ControlKind,
    pub payload: Vec<u8>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl ControlMessage {
    pub fn new(kind: ControlKind, payload: Vec<u8>) -> Self {
        ControlMessage {
            kind,
            payload,
            on_success: None,
            on_error: None,
        }
    }

    pub fn reset() -> Self {
        Self::new(ControlKind::Reset, Vec::new())
    }

    pub fn load_rom(rom: Vec<u8>) -> Self {
        Self::new(ControlKind::LoadRom, rom)
    }

    pub fn set_running() -> Self {
        Self::new(ControlKind::SetRunning, Vec::new())
    }

    pub fn set_paused() -> Self {
        Self::new(ControlKind::SetPaused, Vec::new())
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(MessageError) + Send + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Invokes the callback matching `result`.
    pub(super) fn complete(self, result: Result<(), MessageError>) {
        match result {
            Ok(()) => {
                if let Some(callback) = self.on_success {
                    callback();
                }
            }
            Err(error) => {
                if let Some(callback) = self.on_error {
                    callback(error);
                }
            }
        }
    }
}

impl std::fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ControlMessage")
            .field("kind", &self.kind)
            .field("payload_len", &self.payload.len())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything that travels from the front end to the execution thread.
pub(super) enum Message<K> {
    Control(ControlMessage),
    KeyDown(K),
    KeyUp(K),
    SetClockSpeed(u32),
    Shutdown,
}

/// Captures errors when processing a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// The program was rejected. The machine state is unmodified.
    Rom(LoadRomError),

    /// The daemon is halted because of the contained fault and has to be reset
    /// before it can run again.
    Halted(Fault),
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MessageError::Rom(error) => write!(f, "Loading the program failed: {}", error),
            MessageError::Halted(fault) => {
                write!(f, "The daemon is halted and needs a reset: {}", fault)
            }
        }
    }
}

impl std::error::Error for MessageError {}
