/// Size of the main memory in bytes.
pub const CHIP8_MEMORY_SIZE: usize = 0x1000;

/// Programs are loaded starting at this address.
pub const CHIP8_PROGRAM_OFFSET: u16 = 0x200;

/// Programs must be strictly smaller than this.
pub const CHIP8_MAX_PROGRAM_SIZE: usize = 0xE00;

/// The font table starts at the very beginning of memory.
pub const CHIP8_CHARSET_OFFSET: u16 = 0x0;

pub const CHIP8_CHARSET_LEN: u16 = 0x50; // 80

/// Every glyph of the charset is five bytes tall.
pub const CHIP8_GLYPH_LEN: u16 = 5;

pub const CHIP8_CHARSET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Number of return addresses the stack can hold.
pub const CHIP8_STACK_SIZE: usize = 16;

/// The screen buffer is always sized for the high resolution mode.
pub const CHIP8_SCREEN_WIDTH: usize = 128;

pub const CHIP8_SCREEN_HEIGHT: usize = 64;

pub const CHIP8_SCREEN_SIZE: usize = CHIP8_SCREEN_WIDTH * CHIP8_SCREEN_HEIGHT;

/// The delay and sound timers count down at this rate.
pub const CHIP8_TIMER_FREQUENCY: u32 = 60;
