use crate::chip::{
    chip8::{
        constants::{CHIP8_MEMORY_SIZE, CHIP8_SCREEN_SIZE, CHIP8_STACK_SIZE},
        Chip8, ScreenMode,
    },
    Execution,
};

/// An immutable copy of the CHIP-8 state as it was after some tick of the daemon.
/// Renderers read these instead of the live state.
#[derive(Clone)]
pub struct Snapshot {
    memory: Box<[u8; CHIP8_MEMORY_SIZE]>,
    registers: [u8; 16],
    index: u16,
    program_counter: u16,
    stack_pointer: u8,
    stack: [u16; CHIP8_STACK_SIZE],
    delay_timer: u8,
    sound_timer: u8,
    screen: Box<[bool; CHIP8_SCREEN_SIZE]>,
    screen_mode: ScreenMode,
    keys_down: [bool; 16],
    execution: Execution,
}

impl Snapshot {
    pub(super) fn new(chip: &Chip8) -> Self {
        Snapshot {
            memory: Box::new(chip.memory),
            registers: chip.registers,
            index: chip.index,
            program_counter: chip.program_counter,
            stack_pointer: chip.stack_pointer,
            stack: chip.stack,
            delay_timer: chip.delay_timer,
            sound_timer: chip.sound_timer,
            screen: Box::new(chip.screen),
            screen_mode: chip.screen_mode,
            keys_down: chip.keys_down,
            execution: chip.execution,
        }
    }

    pub fn screen_mode(&self) -> ScreenMode {
        self.screen_mode
    }

    /// Whether the pixel at (x, y) is set, in coordinates of the active screen mode.
    /// Coordinates outside the screen read as unset.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= self.screen_mode.width() || y >= self.screen_mode.height() {
            return false;
        }
        self.screen[self.screen_mode.width() * y + x]
    }

    /// The full screen buffer. It is always sized for the high resolution mode, only
    /// the first `width * height` pixels of the active mode are in use.
    pub fn framebuffer(&self) -> &[bool] {
        &self.screen[..]
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.registers
    }

    /// The value of register V`register`.
    ///
    /// # Panics
    /// In case `register` is not in range 0x0 - 0xF (inclusive).
    pub fn register(&self, register: usize) -> u8 {
        self.registers[register]
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack_pointer(&self) -> u8 {
        self.stack_pointer
    }

    pub fn stack(&self) -> &[u16; CHIP8_STACK_SIZE] {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory[..]
    }

    pub fn key_down(&self, key: usize) -> bool {
        self.keys_down.get(key).copied().unwrap_or(false)
    }

    pub fn execution(&self) -> Execution {
        self.execution
    }

    /// Returns a best-effort mnemonic for the instruction at `address`.
    pub fn disassemble(&self, address: u16) -> Option<String> {
        super::disassemble(&self.memory[..], address)
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("registers", &self.registers)
            .field("index", &self.index)
            .field("program_counter", &self.program_counter)
            .field("stack_pointer", &self.stack_pointer)
            .field("delay_timer", &self.delay_timer)
            .field("sound_timer", &self.sound_timer)
            .field("execution", &self.execution)
            .finish()
    }
}
