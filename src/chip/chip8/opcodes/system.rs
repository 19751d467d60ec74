use crate::chip::{
    chip8::{
        constants::CHIP8_SCREEN_SIZE,
        opcodes::{Encoding, Flow, OpcodeHandler, OperandData, Slot},
        util, Chip8,
    },
    Fault,
};

pub(super) fn handlers() -> Vec<OpcodeHandler> {
    vec![
        handler!("SYS", [0x0, _, _, _], sys, |op| format!(
            "SYS {:03X}",
            op.nnn
        )),
        handler!("CLS", [0x0, 0x0, 0xE, 0x0], cls, |_| "CLS".to_string()),
        handler!("DRW", [0xD, _, _, _], drw, |op| format!(
            "DRW V{:X}, V{:X}, {:X}",
            op.x, op.y, op.n
        )),
        handler!("SKP", [0xE, _, 0x9, 0xE], skp, |op| format!(
            "SKP V{:X}",
            op.x
        )),
        handler!("SKNP", [0xE, _, 0xA, 0x1], sknp, |op| format!(
            "SKNP V{:X}",
            op.x
        )),
        handler!("LD Vx, K", [0xF, _, 0x0, 0xA], ld_vx_k, |op| format!(
            "LD V{:X}, K",
            op.x
        )),
    ]
}

/// Machine code routines are not supported; the instruction is ignored.
fn sys(_: &mut Chip8, _: &OperandData) -> Result<Flow, Fault> {
    Ok(Flow::Next)
}

fn cls(state: &mut Chip8, _: &OperandData) -> Result<Flow, Fault> {
    state.screen = [false; CHIP8_SCREEN_SIZE];
    Ok(Flow::Next)
}

/// XORs an `n` byte sprite read from `I` onto the screen at (Vx, Vy). Sprites wrap
/// around the edges of the screen. VF is set if any pixel got erased.
fn drw(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    let width = state.screen_mode.width();
    let height = state.screen_mode.height();

    let x = state.registers[op.x as usize] as usize % width;
    let y = state.registers[op.y as usize] as usize % height;

    state.registers[0xF] = 0;
    for row in 0..op.n as usize {
        let sprite_byte = state.memory[util::memory_address(state.index as usize + row)];

        for column in 0..8 {
            if sprite_byte & (0x80 >> column) == 0 {
                continue;
            }

            let pixel_pos = width * ((y + row) % height) + (x + column) % width;
            if state.screen[pixel_pos] {
                state.registers[0xF] = 1;
            }
            state.screen[pixel_pos] ^= true;
        }
    }
    Ok(Flow::Next)
}

fn skp(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(util::skip_if(state.is_key_down(state.registers[op.x as usize])))
}

fn sknp(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(util::skip_if(!state.is_key_down(state.registers[op.x as usize])))
}

/// Stores the key that is down in Vx. If no key is down, execution is suspended
/// until one goes down.
fn ld_vx_k(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    match state.pressed_key() {
        Some(key) => {
            state.registers[op.x as usize] = key;
            Ok(Flow::Next)
        }
        None => Ok(Flow::AwaitKey(op.x)),
    }
}
