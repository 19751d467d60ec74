use crate::chip::{
    chip8::{
        constants::{CHIP8_CHARSET_OFFSET, CHIP8_GLYPH_LEN},
        opcodes::{Encoding, Flow, OpcodeHandler, OperandData, Slot},
        util, Chip8,
    },
    Fault,
};

pub(super) fn handlers() -> Vec<OpcodeHandler> {
    vec![
        handler!("LD I, addr", [0xA, _, _, _], ld_i_nnn, |op| format!(
            "LD I, {:03X}",
            op.nnn
        )),
        handler!("LD Vx, DT", [0xF, _, 0x0, 0x7], ld_vx_dt, |op| format!(
            "LD V{:X}, DT",
            op.x
        )),
        handler!("LD DT, Vx", [0xF, _, 0x1, 0x5], ld_dt_vx, |op| format!(
            "LD DT, V{:X}",
            op.x
        )),
        handler!("LD ST, Vx", [0xF, _, 0x1, 0x8], ld_st_vx, |op| format!(
            "LD ST, V{:X}",
            op.x
        )),
        handler!("ADD I, Vx", [0xF, _, 0x1, 0xE], add_i_vx, |op| format!(
            "ADD I, V{:X}",
            op.x
        )),
        handler!("LD F, Vx", [0xF, _, 0x2, 0x9], ld_f_vx, |op| format!(
            "LD F, V{:X}",
            op.x
        )),
        handler!("LD B, Vx", [0xF, _, 0x3, 0x3], ld_b_vx, |op| format!(
            "LD B, V{:X}",
            op.x
        )),
        handler!("LD [I], Vx", [0xF, _, 0x5, 0x5], ld_mem_vx, |op| format!(
            "LD [I], V{:X}",
            op.x
        )),
        handler!("LD Vx, [I]", [0xF, _, 0x6, 0x5], ld_vx_mem, |op| format!(
            "LD V{:X}, [I]",
            op.x
        )),
    ]
}

fn ld_i_nnn(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.index = op.nnn;
    Ok(Flow::Next)
}

fn ld_vx_dt(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.registers[op.x as usize] = state.delay_timer;
    Ok(Flow::Next)
}

fn ld_dt_vx(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.delay_timer = state.registers[op.x as usize];
    Ok(Flow::Next)
}

fn ld_st_vx(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.sound_timer = state.registers[op.x as usize];
    Ok(Flow::Next)
}

/// VF is not affected.
fn add_i_vx(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    state.index = state
        .index
        .wrapping_add(u16::from(state.registers[op.x as usize]));
    Ok(Flow::Next)
}

/// Points I at the glyph for the digit in Vx.
fn ld_f_vx(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    let character = u16::from(state.registers[op.x as usize]);
    state.index = CHIP8_CHARSET_OFFSET + character * CHIP8_GLYPH_LEN;
    Ok(Flow::Next)
}

/// Stores the hundreds, tens and units of Vx at I, I + 1 and I + 2.
fn ld_b_vx(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    let value = state.registers[op.x as usize];
    let index = state.index as usize;
    state.memory[util::memory_address(index)] = value / 100;
    state.memory[util::memory_address(index + 1)] = value / 10 % 10;
    state.memory[util::memory_address(index + 2)] = value % 10;
    Ok(Flow::Next)
}

/// Stores V0..=Vx in memory starting at I. I is left unchanged.
fn ld_mem_vx(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    for reg in 0..=op.x as usize {
        state.memory[util::memory_address(state.index as usize + reg)] = state.registers[reg];
    }
    Ok(Flow::Next)
}

/// Reads V0..=Vx from memory starting at I. I is left unchanged.
fn ld_vx_mem(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    for reg in 0..=op.x as usize {
        state.registers[reg] = state.memory[util::memory_address(state.index as usize + reg)];
    }
    Ok(Flow::Next)
}
