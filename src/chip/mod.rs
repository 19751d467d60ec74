pub mod chip8;
pub mod daemon;

/// A machine that can be driven by the [`daemon::Daemon`]. The daemon is the only
/// owner of a `Chip` and calls into it exclusively from its execution thread.
pub trait Chip: Send + 'static {
    /// The type used to address a key of the keypad.
    type KeyAddress: Copy + Send + std::fmt::Debug + 'static;

    /// An immutable copy of the machine state that is handed to readers on other
    /// threads.
    type Snapshot: Send + Sync + 'static;

    /// Reinitializes the whole machine state.
    fn reset(&mut self);

    /// Loads a program at the default program address and returns the number of
    /// bytes loaded. On error the machine state is left unmodified.
    fn load_rom(&mut self, rom: &[u8]) -> Result<usize, LoadRomError>;

    /// Executes the instruction at the program counter.
    fn step(&mut self) -> Result<Execution, Fault>;

    /// Whether the machine is able to execute its next instruction.
    fn execution(&self) -> Execution;

    /// Decrements the delay and sound timers by `ticks`, saturating at 0.
    fn decrement_timers(&mut self, ticks: u32);

    /// Validates a key number given by a front end.
    fn key_address(key: u8) -> Result<Self::KeyAddress, KeyError>;

    fn set_key_down(&mut self, key: Self::KeyAddress);

    fn set_key_up(&mut self, key: Self::KeyAddress);

    /// Returns a best-effort mnemonic for the instruction at `address`.
    fn disassemble(&self, address: u16) -> Option<String>;

    /// The raw instruction word at `address`, if `address` is inside memory.
    fn instruction_at(&self, address: u16) -> Option<u16>;

    /// The address of the next instruction.
    fn program_counter(&self) -> u16;

    fn snapshot(&self) -> Self::Snapshot;
}

/// The suspension state of a machine between two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// The next call to `step` executes the instruction at the program counter.
    Ready,

    /// The machine is suspended in a wait-for-key instruction. It resumes once a key
    /// goes down, which stores the key in register `register`.
    AwaitingKey { register: u8 },
}

/// Conditions that stop forward progress of a machine. A machine that faulted
/// executes nothing until it is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// No handler is registered for `instruction`, found at `address`.
    UnknownOpcode { address: u16, instruction: u16 },

    /// A call at `address` was made while all stack slots were in use.
    StackOverflow { address: u16 },

    /// A return at `address` was made with an empty stack.
    StackUnderflow { address: u16 },

    /// The program counter points outside of memory.
    ProgramCounterOutOfBounds { address: u16 },
}

/// Captures errors when loading a program into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRomError {
    /// The program exceeds the size of the program area.
    TooLarge { len: usize },

    /// The program does not fit into memory starting at `address`.
    OutOfBounds { address: u16, len: usize },
}

/// Captures errors when addressing the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// Keys are numbered 0x0 - 0xF.
    InvalidKey(u8),
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Fault::UnknownOpcode {
                address,
                instruction,
            } => write!(
                f,
                "Unknown opcode {:04X} at address {:03X}.",
                instruction, address
            ),
            Fault::StackOverflow { address } => {
                write!(f, "Stack overflow at address {:03X}.", address)
            }
            Fault::StackUnderflow { address } => {
                write!(f, "Stack underflow at address {:03X}.", address)
            }
            Fault::ProgramCounterOutOfBounds { address } => write!(
                f,
                "Program counter {:04X} points outside of memory.",
                address
            ),
        }
    }
}

impl std::fmt::Display for LoadRomError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LoadRomError::TooLarge { len } => {
                write!(f, "The program is too large ({} bytes).", len)
            }
            LoadRomError::OutOfBounds { address, len } => write!(
                f,
                "A program of {} bytes does not fit into memory at address {:03X}.",
                len, address
            ),
        }
    }
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            KeyError::InvalidKey(key) => write!(f, "There is no key {:X}.", key),
        }
    }
}

impl std::error::Error for Fault {}

impl std::error::Error for LoadRomError {}

impl std::error::Error for KeyError {}
