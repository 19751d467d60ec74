/// CHIP-8 constants.
pub mod constants;
/// Cursive display output.
pub mod cursive_display;
/// Decoding of opcodes, their dispatch and their execution.
pub mod opcodes;
/// Immutable copies of the CHIP-8 state.
mod snapshot;
/// Convenience functions shared by the opcode handlers.
mod util;


use std::convert::TryFrom;

use ux::u4;

use crate::chip::{
    chip8::{
        constants::{
            CHIP8_CHARSET, CHIP8_CHARSET_LEN, CHIP8_CHARSET_OFFSET, CHIP8_MAX_PROGRAM_SIZE,
            CHIP8_MEMORY_SIZE, CHIP8_PROGRAM_OFFSET, CHIP8_SCREEN_SIZE, CHIP8_STACK_SIZE,
        },
        opcodes::{instruction_set, Flow, Opcode},
    },
    Chip, Execution, Fault, KeyError, LoadRomError,
};

pub use snapshot::Snapshot;

/// The resolution the screen is addressed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    /// CHIP-8 64x32
    LowRes,
    /// SCHIP-8 128x64
    HighRes,
}

impl ScreenMode {
    pub fn width(&self) -> usize {
        match self {
            ScreenMode::LowRes => 64,
            ScreenMode::HighRes => 128,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            ScreenMode::LowRes => 32,
            ScreenMode::HighRes => 64,
        }
    }
}

/// Represents the state of the CHIP-8.
pub struct Chip8 {
    /// 4096 bytes of main memory. The charset lives at the very beginning and
    /// programs are loaded at `CHIP8_PROGRAM_OFFSET`.
    memory: [u8; CHIP8_MEMORY_SIZE],

    /// 16 registers where each can store one byte. VF doubles as the flag register
    /// for carry, borrow and collisions.
    registers: [u8; 16],

    /// An index register
    index: u16,

    /// A program counter
    program_counter: u16,

    /// The screen, always sized for the high resolution mode. Pixels are
    /// addressed as `width * y + x` with the width of the active `screen_mode`.
    screen: [bool; CHIP8_SCREEN_SIZE],

    screen_mode: ScreenMode,

    /// The delay timer, decremented at 60 Hz by whoever drives the chip.
    delay_timer: u8,

    /// The sound timer, decremented at 60 Hz by whoever drives the chip. It is
    /// tracked as a value only.
    sound_timer: u8,

    /// The keys that are currently down.
    keys_down: [bool; 16],

    /// The key that went down most recently and is still down.
    last_key_down: Option<u4>,

    /// A stack of return addresses.
    stack: [u16; CHIP8_STACK_SIZE],

    /// Points at the most recent return address on the stack. 0 if the stack is
    /// empty.
    stack_pointer: u8,

    /// Whether the chip is suspended waiting for a key.
    execution: Execution,
}

impl Chip for Chip8 {
    type KeyAddress = u4;

    type Snapshot = Snapshot;

    fn reset(&mut self) {
        self.memory = [0; CHIP8_MEMORY_SIZE];
        let charset_start = CHIP8_CHARSET_OFFSET as usize;
        let charset_end = (CHIP8_CHARSET_OFFSET + CHIP8_CHARSET_LEN) as usize;
        self.memory[charset_start..charset_end].copy_from_slice(&CHIP8_CHARSET);

        self.registers = [0; 16];
        self.index = 0;
        self.program_counter = CHIP8_PROGRAM_OFFSET;
        self.screen = [false; CHIP8_SCREEN_SIZE];
        self.screen_mode = ScreenMode::LowRes;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keys_down = [false; 16];
        self.last_key_down = None;
        self.stack = [0; CHIP8_STACK_SIZE];
        self.stack_pointer = 0;
        self.execution = Execution::Ready;
    }

    fn load_rom(&mut self, rom: &[u8]) -> Result<usize, LoadRomError> {
        self.load_rom_at(rom, CHIP8_PROGRAM_OFFSET)
    }

    fn step(&mut self) -> Result<Execution, Fault> {
        if self.execution != Execution::Ready {
            return Ok(self.execution);
        }

        let address = self.program_counter;
        let opcode = self.next_instruction()?;
        let handler = instruction_set()
            .resolve(&opcode)
            .ok_or(Fault::UnknownOpcode {
                address,
                instruction: opcode.word(),
            })?;

        match (handler.execute)(self, &opcode.operands())? {
            Flow::Next => self.program_counter = address.wrapping_add(2),
            Flow::Skip => self.program_counter = address.wrapping_add(4),
            Flow::Jump(target) => self.program_counter = target,
            Flow::AwaitKey(register) => self.execution = Execution::AwaitingKey { register },
        }

        Ok(self.execution)
    }

    fn execution(&self) -> Execution {
        self.execution
    }

    fn decrement_timers(&mut self, ticks: u32) {
        let ticks = u8::try_from(ticks).unwrap_or(u8::MAX);
        self.delay_timer = self.delay_timer.saturating_sub(ticks);
        self.sound_timer = self.sound_timer.saturating_sub(ticks);
    }

    fn key_address(key: u8) -> Result<u4, KeyError> {
        if key > 0xF {
            return Err(KeyError::InvalidKey(key));
        }
        Ok(u4::new(key))
    }

    /// A key going down resumes a chip that waits for a key. The key is stored and
    /// execution continues after the wait-for-key instruction.
    fn set_key_down(&mut self, key: u4) {
        let index = usize::from(u8::from(key));
        self.keys_down[index] = true;
        self.last_key_down = Some(key);

        if let Execution::AwaitingKey { register } = self.execution {
            self.registers[register as usize] = u8::from(key);
            self.program_counter = self.program_counter.wrapping_add(2);
            self.execution = Execution::Ready;
        }
    }

    fn set_key_up(&mut self, key: u4) {
        self.keys_down[usize::from(u8::from(key))] = false;
        if self.last_key_down == Some(key) {
            self.last_key_down = None;
        }
    }

    fn disassemble(&self, address: u16) -> Option<String> {
        disassemble(&self.memory, address)
    }

    fn instruction_at(&self, address: u16) -> Option<u16> {
        let address = address as usize;
        let bytes = self.memory.get(address..address + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn program_counter(&self) -> u16 {
        self.program_counter
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self)
    }
}

impl Chip8 {
    /// Constructs a new CHIP-8 in its reset state, i.e., the program counter is set
    /// to 0x200 and the charset is loaded at `CHIP8_CHARSET_OFFSET`. Note that no
    /// program is loaded upon initialization.
    pub fn new() -> Self {
        let mut chip = Chip8 {
            memory: [0; CHIP8_MEMORY_SIZE],
            registers: [0; 16],
            index: 0,
            program_counter: CHIP8_PROGRAM_OFFSET,
            screen: [false; CHIP8_SCREEN_SIZE],
            screen_mode: ScreenMode::LowRes,
            delay_timer: 0,
            sound_timer: 0,
            keys_down: [false; 16],
            last_key_down: None,
            stack: [0; CHIP8_STACK_SIZE],
            stack_pointer: 0,
            execution: Execution::Ready,
        };
        chip.reset();
        chip
    }

    /// Copies `rom` into memory starting at `address`. The program has to be smaller
    /// than the program area and has to end before the last byte of memory.
    pub fn load_rom_at(&mut self, rom: &[u8], address: u16) -> Result<usize, LoadRomError> {
        if rom.len() >= CHIP8_MAX_PROGRAM_SIZE {
            return Err(LoadRomError::TooLarge { len: rom.len() });
        }
        let start = address as usize;
        if start + rom.len() >= CHIP8_MEMORY_SIZE {
            return Err(LoadRomError::OutOfBounds {
                address,
                len: rom.len(),
            });
        }

        self.memory[start..start + rom.len()].copy_from_slice(rom);
        Ok(rom.len())
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

    /// Fetches the instruction the program counter points at.
    fn next_instruction(&self) -> Result<Opcode, Fault> {
        let pc = self.program_counter as usize;
        if pc + 1 >= CHIP8_MEMORY_SIZE {
            return Err(Fault::ProgramCounterOutOfBounds {
                address: self.program_counter,
            });
        }
        Ok(Opcode::new(&[self.memory[pc], self.memory[pc + 1]]))
    }

    /// Keys are addressed by the low nibble of a register value.
    fn is_key_down(&self, key: u8) -> bool {
        self.keys_down[(key & 0xF) as usize]
    }

    /// The key a wait-for-key instruction picks up: the most recent key that is
    /// still down, otherwise the lowest key that is down.
    fn pressed_key(&self) -> Option<u8> {
        self.last_key_down
            .map(u8::from)
            .or_else(|| self.keys_down.iter().position(|down| *down).map(|key| key as u8))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Chip8::new()
    }
}

/// Disassembles the instruction at `address` of `memory`.
pub(crate) fn disassemble(memory: &[u8], address: u16) -> Option<String> {
    let address = address as usize;
    let bytes = memory.get(address..address + 2)?;
    let opcode = Opcode::new(&[bytes[0], bytes[1]]);
    instruction_set()
        .resolve(&opcode)
        .map(|handler| (handler.disassemble)(&opcode.operands()))
}
