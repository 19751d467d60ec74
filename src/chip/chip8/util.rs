use crate::chip::chip8::opcodes::Flow;

/// Skips the next instruction if `condition` holds.
pub fn skip_if(condition: bool) -> Flow {
    if condition {
        Flow::Skip
    } else {
        Flow::Next
    }
}

/// Wraps `address` into the address space of the main memory.
pub fn memory_address(address: usize) -> usize {
    address % crate::chip::chip8::constants::CHIP8_MEMORY_SIZE
}
