use rand::{thread_rng, Rng};

use crate::chip::{
    chip8::{
        opcodes::{Encoding, Flow, OpcodeHandler, OperandData, Slot},
        Chip8,
    },
    Fault,
};

pub(super) fn handlers() -> Vec<OpcodeHandler> {
    vec![
        handler!("LD Vx, byte", [0x6, _, _, _], ld_vx_kk, |op| format!(
            "LD V{:X}, {:02X}",
            op.x, op.kk
        )),
        handler!("ADD Vx, byte", [0x7, _, _, _], add_vx_kk, |op| format!(
            "ADD V{:X}, {:02X}",
            op.x, op.kk
        )),
        handler!("LD Vx, Vy", [0x8, _, _, 0x0], ld_vx_vy, |op| format!(
            "LD V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("OR", [0x8, _, _, 0x1], or, |op| format!(
            "OR V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("AND", [0x8, _, _, 0x2], and, |op| format!(
            "AND V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("XOR", [0x8, _, _, 0x3], xor, |op| format!(
            "XOR V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("ADD Vx, Vy", [0x8, _, _, 0x4], add_vx_vy, |op| format!(
            "ADD V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("SUB", [0x8, _, _, 0x5], sub, |op| format!(
            "SUB V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("SHR", [0x8, _, _, 0x6], shr, |op| format!(
            "SHR V{:X}",
            op.x
        )),
        handler!("SUBN", [0x8, _, _, 0x7], subn, |op| format!(
            "SUBN V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("SHL", [0x8, _, _, 0xE], shl, |op| format!(
            "SHL V{:X}",
            op.x
        )),
        handler!("RND", [0xC, _, _, _], rnd, |op| format!(
            "RND V{:X}, {:02X}",
            op.x, op.kk
        )),
    ]
}

/// Applies `f` to (Vx, Vy) and stores the result in Vx. If `f` reports a flag it is
/// written to VF after the result.
fn modify_registers(state: &mut Chip8, op: &OperandData, f: fn(u8, u8) -> (u8, Option<bool>)) {
    let (val, flag) = f(
        state.registers[op.x as usize],
        state.registers[op.y as usize],
    );
    state.registers[op.x as usize] = val;
    if let Some(flag) = flag {
        state.registers[0xF] = flag as u8;
    }
}

fn ld_vx_kk(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.registers[op.x as usize] = op.kk;
    Ok(Flow::Next)
}

fn add_vx_kk(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.registers[op.x as usize] = state.registers[op.x as usize].wrapping_add(op.kk);
    Ok(Flow::Next)
}

fn ld_vx_vy(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |_, vy| (vy, None));
    Ok(Flow::Next)
}

fn or(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, vy| (vx | vy, None));
    Ok(Flow::Next)
}

fn and(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, vy| (vx & vy, None));
    Ok(Flow::Next)
}

fn xor(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, vy| (vx ^ vy, None));
    Ok(Flow::Next)
}

/// VF is the carry of the 9 bit sum.
fn add_vx_vy(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, vy| {
        let (result, overflow) = vx.overflowing_add(vy);
        (result, Some(overflow))
    });
    Ok(Flow::Next)
}

/// VF is set iff Vx > Vy.
fn sub(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, vy| (vx.wrapping_sub(vy), Some(vx > vy)));
    Ok(Flow::Next)
}

/// VF is set iff Vy > Vx.
fn subn(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, vy| (vy.wrapping_sub(vx), Some(vy > vx)));
    Ok(Flow::Next)
}

/// VF receives the bit shifted out.
fn shr(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, _| (vx >> 1, Some(vx & 0x1 != 0)));
    Ok(Flow::Next)
}

fn shl(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    modify_registers(state, op, |vx, _| (vx << 1, Some(vx & 0x80 != 0)));
    Ok(Flow::Next)
}

fn rnd(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    let sample: u8 = thread_rng().gen();
    state.registers[op.x as usize] = sample & op.kk;
    Ok(Flow::Next)
}
