use crate::chip::{
    chip8::{
        constants::CHIP8_STACK_SIZE,
        opcodes::{Encoding, Flow, OpcodeHandler, OperandData, Slot},
        util, Chip8,
    },
    Fault,
};

pub(super) fn handlers() -> Vec<OpcodeHandler> {
    vec![
        handler!("RET", [0x0, 0x0, 0xE, 0xE], ret, |_| "RET".to_string()),
        handler!("JP", [0x1, _, _, _], jp, |op| format!("JP {:03X}", op.nnn)),
        handler!("CALL", [0x2, _, _, _], call, |op| format!(
            "CALL {:03X}",
            op.nnn
        )),
        handler!("SE Vx, byte", [0x3, _, _, _], se_vx_kk, |op| format!(
            "SE V{:X}, {:02X}",
            op.x, op.kk
        )),
        handler!("SNE Vx, byte", [0x4, _, _, _], sne_vx_kk, |op| format!(
            "SNE V{:X}, {:02X}",
            op.x, op.kk
        )),
        handler!("SE Vx, Vy", [0x5, _, _, 0x0], se_vx_vy, |op| format!(
            "SE V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("SNE Vx, Vy", [0x9, _, _, 0x0], sne_vx_vy, |op| format!(
            "SNE V{:X}, V{:X}",
            op.x, op.y
        )),
        handler!("JP V0, addr", [0xB, _, _, _], jp_v0, |op| format!(
            "JP V0, {:03X}",
            op.nnn
        )),
    ]
}

/// Returns to the address on top of the stack.
fn ret(state: &mut Chip8, _: &OperandData) -> Result<Flow, Fault> {
    if state.stack_pointer == 0 {
        return Err(Fault::StackUnderflow {
            address: state.program_counter,
        });
    }
    let address = state.stack[state.stack_pointer as usize];
    state.stack_pointer -= 1;
    Ok(Flow::Jump(address))
}

fn jp(_: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(Flow::Jump(op.nnn))
}

/// The stack pointer always points at the most recent return address, so slot 0
/// is never written.
fn call(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    if state.stack_pointer as usize + 1 >= CHIP8_STACK_SIZE {
        return Err(Fault::StackOverflow {
            address: state.program_counter,
        });
    }
    state.stack_pointer += 1;
    state.stack[state.stack_pointer as usize] = state.program_counter.wrapping_add(2);
    Ok(Flow::Jump(op.nnn))
}

fn se_vx_kk(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(util::skip_if(state.registers[op.x as usize] == op.kk))
}

fn sne_vx_kk(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(util::skip_if(state.registers[op.x as usize] != op.kk))
}

fn se_vx_vy(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(util::skip_if(
        state.registers[op.x as usize] == state.registers[op.y as usize],
    ))
}

fn sne_vx_vy(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(util::skip_if(
        state.registers[op.x as usize] != state.registers[op.y as usize],
    ))
}

fn jp_v0(state: &mut Chip8, op: &OperandData) -> Result<Flow, Fault> {
    Ok(Flow::Jump(
        op.nnn.wrapping_add(u16::from(state.registers[0])),
    ))
}
