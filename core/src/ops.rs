use rand::RngCore;

use crate::{
    instruction::Instruction,
    state::{MachineState, FONT_BASE, GLYPH_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH},
    Quirks, Result,
};

/// How the engine moves the program counter after a handler ran
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PcUpdate {
    /// Advance to the next instruction
    Advance,
    /// Skip the next instruction
    Skip,
    /// Handler already set pc
    Set,
}

fn skip_if(cond: bool) -> PcUpdate {
    if cond {
        PcUpdate::Skip
    } else {
        PcUpdate::Advance
    }
}

pub fn execute(
    inst: Instruction,
    state: &mut MachineState,
    quirks: &Quirks,
    rng: &mut impl RngCore,
) -> Result<PcUpdate> {
    use Instruction::*;

    let update = match inst {
        Cls => cls(state),
        Ret => ret(state)?,
        Jp { nnn } => jp(state, nnn),
        Call { nnn } => call(state, nnn)?,
        SeImm { x, kk } => skip_if(state.reg(x) == kk),
        SneImm { x, kk } => skip_if(state.reg(x) != kk),
        SeReg { x, y } => skip_if(state.reg(x) == state.reg(y)),
        SneReg { x, y } => skip_if(state.reg(x) != state.reg(y)),
        LdImm { x, kk } => ld_imm(state, x, kk),
        AddImm { x, kk } => add_imm(state, x, kk),
        LdReg { x, y } => ld_reg(state, x, y),
        Or { x, y } => or(state, x, y),
        And { x, y } => and(state, x, y),
        Xor { x, y } => xor(state, x, y),
        AddReg { x, y } => add_reg(state, x, y),
        Sub { x, y } => sub(state, x, y),
        Shr { x, y } => shr(state, x, y, quirks),
        Subn { x, y } => subn(state, x, y),
        Shl { x, y } => shl(state, x, y, quirks),
        LdIndex { nnn } => ld_index(state, nnn),
        JpOffset { x, nnn } => jp_offset(state, x, nnn, quirks),
        Rnd { x, kk } => rnd(state, x, kk, rng),
        Drw { x, y, n } => drw(state, x, y, n),
        Skp { x } => skip_if(state.is_key_pressed(state.reg(x))),
        Sknp { x } => skip_if(!state.is_key_pressed(state.reg(x))),
        LdDelay { x } => ld_delay(state, x),
        WaitKey { x } => wait_key(state, x),
        SetDelay { x } => set_delay(state, x),
        SetSound { x } => set_sound(state, x),
        AddIndex { x } => add_index(state, x),
        LdFont { x } => ld_font(state, x),
        Bcd { x } => bcd(state, x),
        Store { x } => store(state, x, quirks),
        Load { x } => load(state, x, quirks),
    };
    Ok(update)
}

// 00E0: Clear screen
fn cls(state: &mut MachineState) -> PcUpdate {
    state.clear_screen();
    state.draw_flag = true;
    PcUpdate::Advance
}

// 00EE: Return subroutine from stack
fn ret(state: &mut MachineState) -> Result<PcUpdate> {
    let addr = state.pop()?;
    state.jump(addr);
    Ok(PcUpdate::Set)
}

// 1NNN: Jump to memory location NNN
fn jp(state: &mut MachineState, nnn: u16) -> PcUpdate {
    state.jump(nnn);
    PcUpdate::Set
}

// 2NNN: Call subroutine at memory location NNN, return lands after the call
fn call(state: &mut MachineState, nnn: u16) -> Result<PcUpdate> {
    state.push(state.pc.wrapping_add(2))?;
    state.jump(nnn);
    Ok(PcUpdate::Set)
}

// 6XKK: Set register VX to the value KK
fn ld_imm(state: &mut MachineState, x: u8, kk: u8) -> PcUpdate {
    state.set_reg(x, kk);
    PcUpdate::Advance
}

// 7XKK: Add the value KK to VX, carry is not reported
fn add_imm(state: &mut MachineState, x: u8, kk: u8) -> PcUpdate {
    state.set_reg(x, state.reg(x).wrapping_add(kk));
    PcUpdate::Advance
}

// 8XY0: Set register VX to the value of VY
fn ld_reg(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    state.set_reg(x, state.reg(y));
    PcUpdate::Advance
}

// 8XY1
fn or(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    state.set_reg(x, state.reg(x) | state.reg(y));
    PcUpdate::Advance
}

// 8XY2
fn and(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    state.set_reg(x, state.reg(x) & state.reg(y));
    PcUpdate::Advance
}

// 8XY3
fn xor(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    state.set_reg(x, state.reg(x) ^ state.reg(y));
    PcUpdate::Advance
}

// 8XY4: VX = VX + VY, VF = carry
fn add_reg(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    let (res, carry) = state.reg(x).overflowing_add(state.reg(y));
    state.set_reg(x, res);
    state.set_flag(carry);
    PcUpdate::Advance
}

// 8XY5: VX = VX - VY, VF = NOT borrow
fn sub(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    let (vx, vy) = (state.reg(x), state.reg(y));
    state.set_reg(x, vx.wrapping_sub(vy));
    state.set_flag(vx > vy);
    PcUpdate::Advance
}

// 8XY6: Shift VX right by one, VF = bit shifted out
fn shr(state: &mut MachineState, x: u8, y: u8, quirks: &Quirks) -> PcUpdate {
    let src = if quirks.shift_copies_vy {
        state.reg(y)
    } else {
        state.reg(x)
    };
    state.set_reg(x, src >> 1);
    state.set_flag(src & 0x01 == 1);
    PcUpdate::Advance
}

// 8XY7: VX = VY - VX, VF = NOT borrow
fn subn(state: &mut MachineState, x: u8, y: u8) -> PcUpdate {
    let (vx, vy) = (state.reg(x), state.reg(y));
    state.set_reg(x, vy.wrapping_sub(vx));
    state.set_flag(vy > vx);
    PcUpdate::Advance
}

// 8XYE: Shift VX left by one, VF = bit shifted out
fn shl(state: &mut MachineState, x: u8, y: u8, quirks: &Quirks) -> PcUpdate {
    let src = if quirks.shift_copies_vy {
        state.reg(y)
    } else {
        state.reg(x)
    };
    state.set_reg(x, src << 1);
    state.set_flag((src >> 7) & 0x01 == 1);
    PcUpdate::Advance
}

// ANNN: Set index register I to the value NNN
fn ld_index(state: &mut MachineState, nnn: u16) -> PcUpdate {
    state.index = nnn;
    PcUpdate::Advance
}

// BNNN/BXNN: Jump with offset V0, or VX with the CHIP-48 quirk
fn jp_offset(state: &mut MachineState, x: u8, nnn: u16, quirks: &Quirks) -> PcUpdate {
    let offset = if quirks.jump_uses_vx {
        state.reg(x)
    } else {
        state.reg(0)
    };
    state.jump(nnn + offset as u16);
    PcUpdate::Set
}

// CXKK: VX = random byte AND KK
fn rnd(state: &mut MachineState, x: u8, kk: u8, rng: &mut impl RngCore) -> PcUpdate {
    let n = rng.next_u32() as u8;
    state.set_reg(x, n & kk);
    PcUpdate::Advance
}

// DXYN: XOR an N rows tall, 8 pixel wide sprite at I onto the screen at (VX, VY).
// Coordinates wrap around both axes.
fn drw(state: &mut MachineState, x: u8, y: u8, n: u8) -> PcUpdate {
    let ox = state.reg(x) as usize % SCREEN_WIDTH;
    let oy = state.reg(y) as usize % SCREEN_HEIGHT;
    let mut collision = false;

    for row in 0..n as usize {
        let data = state.read_u8(state.index.wrapping_add(row as u16));
        let py = (oy + row) % SCREEN_HEIGHT;

        for column in 0..8 {
            if data & (0x80 >> column) == 0 {
                continue;
            }
            let px = (ox + column) % SCREEN_WIDTH;
            collision |= state.flip_pixel_xy(px, py);
        }
    }

    state.set_flag(collision);
    state.draw_flag = true;
    PcUpdate::Advance
}

// FX07
fn ld_delay(state: &mut MachineState, x: u8) -> PcUpdate {
    state.set_reg(x, state.delay_timer);
    PcUpdate::Advance
}

// FX0A: Block until a key is pressed, pc stays on this instruction meanwhile
fn wait_key(state: &mut MachineState, x: u8) -> PcUpdate {
    match state.pressed_key() {
        Some(key) => {
            state.set_reg(x, key);
            PcUpdate::Advance
        }
        None => {
            state.awaiting_key = Some(x);
            PcUpdate::Set
        }
    }
}

// FX15
fn set_delay(state: &mut MachineState, x: u8) -> PcUpdate {
    state.delay_timer = state.reg(x);
    PcUpdate::Advance
}

// FX18
fn set_sound(state: &mut MachineState, x: u8) -> PcUpdate {
    state.sound_timer = state.reg(x);
    PcUpdate::Advance
}

// FX1E
fn add_index(state: &mut MachineState, x: u8) -> PcUpdate {
    state.index = state.index.wrapping_add(state.reg(x) as u16);
    PcUpdate::Advance
}

// FX29: Point I at the font glyph for the low nibble of VX
fn ld_font(state: &mut MachineState, x: u8) -> PcUpdate {
    state.index = FONT_BASE + (state.reg(x) & 0x0F) as u16 * GLYPH_SIZE;
    PcUpdate::Advance
}

// FX33: Store hundreds, tens and ones of VX at I, I+1, I+2
fn bcd(state: &mut MachineState, x: u8) -> PcUpdate {
    let v = state.reg(x);
    let i = state.index;
    state.write_u8(i, v / 100);
    state.write_u8(i.wrapping_add(1), (v / 10) % 10);
    state.write_u8(i.wrapping_add(2), v % 10);
    PcUpdate::Advance
}

// FX55: Store V0-VX at I..=I+X
fn store(state: &mut MachineState, x: u8, quirks: &Quirks) -> PcUpdate {
    for i in 0..=x {
        let addr = state.index.wrapping_add(i as u16);
        state.write_u8(addr, state.reg(i));
    }

    if quirks.increment_index {
        state.index = state.index.wrapping_add(x as u16 + 1);
    }
    PcUpdate::Advance
}

// FX65: Load V0-VX from I..=I+X
fn load(state: &mut MachineState, x: u8, quirks: &Quirks) -> PcUpdate {
    for i in 0..=x {
        let addr = state.index.wrapping_add(i as u16);
        state.set_reg(i, state.read_u8(addr));
    }

    if quirks.increment_index {
        state.index = state.index.wrapping_add(x as u16 + 1);
    }
    PcUpdate::Advance
}
