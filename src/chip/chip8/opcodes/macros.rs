/// Expands to the `Slot` for one nibble of an instruction encoding. An underscore
/// marks a nibble that carries operand data, anything else must be a nibble
/// literal in range 0x0 - 0xF (inclusive).
macro_rules! slot {
    (_) => {
        Slot::Operand
    };
    ($nibble:literal) => {
        Slot::Nibble(ux::u4::new($nibble))
    };
}

/// Constructs an `OpcodeHandler` from a mnemonic, the instruction encoding written
/// as four nibbles (e.g. `[0x8, _, _, 0x4]`), the function executing the
/// instruction and the function disassembling it.
macro_rules! handler {
    ($mnemonic:literal, [$n0:tt, $n1:tt, $n2:tt, $n3:tt], $execute:expr, $disassemble:expr) => {
        OpcodeHandler {
            mnemonic: $mnemonic,
            encoding: Encoding([slot!($n0), slot!($n1), slot!($n2), slot!($n3)]),
            execute: $execute,
            disassemble: $disassemble,
        }
    };
}
