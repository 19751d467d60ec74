#[macro_use]
mod macros;
mod arithmetic_and_logic;
mod dispatch;
mod memory_and_timers;
mod program_flow;
mod system;

use std::sync::OnceLock;

use ux::u4;

use crate::chip::{chip8::Chip8, Fault};

pub use dispatch::{DispatchError, DispatchTree};

/// Represents a CHIP-8 opcode. A CHIP-8 opcode is two bytes long and is matched
/// against the registered handlers one nibble at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// The nibbles of the opcode, most significant first.
    nibbles: [u4; 4],
}

impl Opcode {
    /// Constructs a new `Opcode` given its byte representation.
    pub fn new(opcode: &[u8; 2]) -> Opcode {
        Opcode::from_word(u16::from_be_bytes(*opcode))
    }

    pub fn from_word(word: u16) -> Opcode {
        Opcode {
            nibbles: [
                nibble(word >> 12),
                nibble(word >> 8),
                nibble(word >> 4),
                nibble(word),
            ],
        }
    }

    pub fn from_nibbles(nibbles: [u4; 4]) -> Opcode {
        Opcode { nibbles }
    }

    /// The opcode as a 16 bit instruction word.
    pub fn word(&self) -> u16 {
        self.nibbles
            .iter()
            .fold(0, |word, nibble| word << 4 | u16::from(u8::from(*nibble)))
    }

    pub fn nibbles(&self) -> [u4; 4] {
        self.nibbles
    }

    /// Extracts every interpretation of the operand bits. Which of them are
    /// meaningful is up to the handler of the opcode.
    pub fn operands(&self) -> OperandData {
        let word = self.word();
        OperandData {
            nnn: word & 0x0FFF,
            x: ((word >> 8) & 0xF) as u8,
            y: ((word >> 4) & 0xF) as u8,
            kk: (word & 0xFF) as u8,
            n: (word & 0xF) as u8,
        }
    }
}

fn nibble(value: u16) -> u4 {
    u4::new((value & 0xF) as u8)
}

/// The operand data of an opcode, i.e., the bits of an instruction that do not
/// select the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandData {
    /// `[_nnn]` an address.
    pub nnn: u16,
    /// `[_x__]` the register Vx, or the range of registers V0..Vx.
    pub x: u8,
    /// `[__y_]` the register Vy.
    pub y: u8,
    /// `[__kk]` an immediate byte.
    pub kk: u8,
    /// `[___n]` an immediate nibble.
    pub n: u8,
}

impl OperandData {
    /// Operand data of an opcode of the form `[_nnn]`.
    pub fn address(nnn: u16) -> Self {
        Opcode::from_word(nnn & 0x0FFF).operands()
    }

    /// Operand data of an opcode of the form `[_xkk]`.
    pub fn reg_and_value(x: u8, kk: u8) -> Self {
        Opcode::from_word(u16::from(x & 0xF) << 8 | u16::from(kk)).operands()
    }

    /// Operand data of an opcode of the form `[_xyn]`.
    pub fn operands(x: u8, y: u8, n: u8) -> Self {
        Opcode::from_word(u16::from(x & 0xF) << 8 | u16::from(y & 0xF) << 4 | u16::from(n & 0xF))
            .operands()
    }
}

/// One nibble of an instruction encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The nibble has to be exactly this value.
    Nibble(u4),
    /// The nibble carries operand data and matches any value.
    Operand,
}

/// The encoding of an instruction, most significant nibble first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding(pub [Slot; 4]);

impl Encoding {
    /// Assembles an opcode from this encoding. Operand slots are filled with the
    /// nibbles of `operands` at the same position.
    pub fn assemble(&self, operands: &OperandData) -> Opcode {
        let fill = [
            0,
            operands.x,
            operands.y,
            operands.n,
        ];
        let mut nibbles = [u4::new(0); 4];
        for (i, slot) in self.0.iter().enumerate() {
            nibbles[i] = match slot {
                Slot::Nibble(nibble) => *nibble,
                Slot::Operand => u4::new(fill[i] & 0xF),
            };
        }
        Opcode::from_nibbles(nibbles)
    }

    /// Whether `opcode` matches this encoding, ignoring any priorities between
    /// handlers.
    pub fn matches(&self, opcode: &Opcode) -> bool {
        self.0
            .iter()
            .zip(opcode.nibbles().iter())
            .all(|(slot, nibble)| match slot {
                Slot::Nibble(expected) => expected == nibble,
                Slot::Operand => true,
            })
    }
}

/// What the program counter does after an instruction was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next instruction.
    Next,
    /// Skip the next instruction.
    Skip,
    /// Continue at the given address.
    Jump(u16),
    /// Stay at the current instruction until a key goes down. The key is stored in
    /// the given register.
    AwaitKey(u8),
}

pub type ExecuteFn = fn(&mut Chip8, &OperandData) -> Result<Flow, Fault>;

pub type DisassembleFn = fn(&OperandData) -> String;

/// Executes and disassembles all opcodes matching `encoding`.
#[derive(Clone, Copy)]
pub struct OpcodeHandler {
    pub mnemonic: &'static str,
    pub encoding: Encoding,
    pub execute: ExecuteFn,
    pub disassemble: DisassembleFn,
}

impl std::fmt::Debug for OpcodeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("OpcodeHandler")
            .field("mnemonic", &self.mnemonic)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// All handlers of the CHIP-8 instruction set.
pub fn handlers() -> Vec<OpcodeHandler> {
    let mut handlers = system::handlers();
    handlers.extend(program_flow::handlers());
    handlers.extend(arithmetic_and_logic::handlers());
    handlers.extend(memory_and_timers::handlers());
    handlers
}

/// The dispatch tree of the CHIP-8 instruction set. It is built on first use.
pub fn instruction_set() -> &'static DispatchTree {
    static INSTRUCTION_SET: OnceLock<DispatchTree> = OnceLock::new();
    INSTRUCTION_SET.get_or_init(|| {
        let mut tree = DispatchTree::new();
        for handler in handlers() {
            if let Err(e) = tree.insert(handler) {
                // Only reachable if the handler table itself is inconsistent.
                log::error!("[chip8] {}", e);
            }
        }
        tree
    })
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:04X}", self.word())
    }
}
