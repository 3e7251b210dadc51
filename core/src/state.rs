use serde::{Deserialize, Serialize};

use crate::{Config, Error, Result};

pub const MEMORY_SIZE: usize = 0x1000;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const NUM_REGISTERS: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const NUM_KEYS: usize = 16;

/// Address where ROMs are loaded and execution starts
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

/// Address of the first glyph of the hex font
pub const FONT_BASE: u16 = 0x050;
/// Bytes per hex font glyph
pub const GLYPH_SIZE: u16 = 5;

const ADDRESS_MASK: u16 = (MEMORY_SIZE - 1) as u16;

pub static DEFAULT_FONT: [u8; 80] = [
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

/// Everything the CHIP-8 virtual machine holds between two cycles.
#[derive(Clone, Debug)]
pub struct MachineState {
    /// Memory
    pub memory: Vec<u8>,
    /// Display: 64x32 pixels, one byte per pixel, 0 (off) or 1 (on)
    pub display: Vec<u8>,
    /// Program counter
    pub pc: u16,
    /// Index register
    pub index: u16,
    /// General purpose registers, VF doubles as flags register
    pub regs: [u8; NUM_REGISTERS],
    /// Call stack
    pub stack: [u16; STACK_DEPTH],
    /// Stack pointer, next free stack slot
    pub sp: u8,
    /// Delay Timer
    pub delay_timer: u8,
    /// Sound Timer
    pub sound_timer: u8,
    /// Keypad, true while a key is held down
    pub keypad: [bool; NUM_KEYS],
    /// Display changed since the renderer last cleared this
    pub draw_flag: bool,
    /// Register blocked on FX0A until a key is pressed
    pub awaiting_key: Option<u8>,
}

impl MachineState {
    /// Zeroed machine with `font` copied into low memory and pc at 0x200.
    pub fn new(font: &[u8]) -> Result<MachineState> {
        if font.len() != DEFAULT_FONT.len() {
            return Err(Error::InvalidFont(font.len()));
        }

        let mut memory = vec![0u8; MEMORY_SIZE];
        let font_start = FONT_BASE as usize;
        memory[font_start..font_start + font.len()].copy_from_slice(font);

        Ok(MachineState {
            memory,
            display: vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT],
            pc: PROGRAM_START,
            index: 0,
            regs: [0; NUM_REGISTERS],
            stack: [0; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; NUM_KEYS],
            draw_flag: false,
            awaiting_key: None,
        })
    }

    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.memory[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }

    pub fn read_u8(&self, addr: u16) -> u8 {
        self.memory[(addr & ADDRESS_MASK) as usize]
    }

    pub fn write_u8(&mut self, addr: u16, data: u8) {
        self.memory[(addr & ADDRESS_MASK) as usize] = data;
    }

    /// Big-endian instruction word at `addr`.
    pub fn fetch(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }

    pub fn jump(&mut self, addr: u16) {
        self.pc = addr & ADDRESS_MASK;
    }

    /// Move pc forward by `words` instruction words.
    pub fn advance(&mut self, words: u16) {
        self.jump(self.pc.wrapping_add(2 * words));
    }

    pub fn reg(&self, x: u8) -> u8 {
        self.regs[x as usize]
    }

    pub fn set_reg(&mut self, x: u8, value: u8) {
        self.regs[x as usize] = value;
    }

    /// Write the VF flag register.
    pub fn set_flag(&mut self, flag: bool) {
        self.regs[0xF] = flag as u8;
    }

    pub fn push(&mut self, addr: u16) -> Result<()> {
        let sp = self.sp as usize;
        if sp >= STACK_DEPTH {
            return Err(Error::StackOverflow {
                pc: self.pc,
                depth: STACK_DEPTH,
            });
        }
        self.stack[sp] = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp as usize])
    }

    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keypad[(key & 0xF) as usize]
    }

    /// Lowest pressed key, if any.
    pub fn pressed_key(&self) -> Option<u8> {
        self.keypad.iter().position(|&k| k).map(|k| k as u8)
    }

    pub fn get_pixel_xy(&self, x: usize, y: usize) -> bool {
        self.display[y * SCREEN_WIDTH + x] > 0
    }

    /// XOR a pixel, returns true if it was switched off.
    pub fn flip_pixel_xy(&mut self, x: usize, y: usize) -> bool {
        let pxl = &mut self.display[y * SCREEN_WIDTH + x];
        *pxl ^= 1;
        *pxl == 0
    }

    pub fn clear_screen(&mut self) {
        self.display.iter_mut().for_each(|p| *p = 0);
    }
}

/// Owned copy of the whole machine for external serialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: Config,
    pub cycles: u64,
    pub pc: u16,
    pub index: u16,
    pub regs: [u8; NUM_REGISTERS],
    pub stack: [u16; STACK_DEPTH],
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub keypad: [bool; NUM_KEYS],
    pub draw_flag: bool,
    pub awaiting_key: Option<u8>,
    pub memory: Vec<u8>,
    pub display: Vec<u8>,
}

impl Snapshot {
    pub fn capture(state: &MachineState, config: Config, cycles: u64) -> Snapshot {
        Snapshot {
            config,
            cycles,
            pc: state.pc,
            index: state.index,
            regs: state.regs,
            stack: state.stack,
            sp: state.sp,
            delay_timer: state.delay_timer,
            sound_timer: state.sound_timer,
            keypad: state.keypad,
            draw_flag: state.draw_flag,
            awaiting_key: state.awaiting_key,
            memory: state.memory.clone(),
            display: state.display.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_machine() {
        let state = MachineState::new(&DEFAULT_FONT).unwrap();

        assert_eq!(state.pc, 0x200);
        assert_eq!(state.sp, 0);
        assert_eq!(state.index, 0);
        assert_eq!(&state.memory[0x050..0x0A0], &DEFAULT_FONT[..]);
        assert!(state.memory[0x0A0..].iter().all(|&b| b == 0));
        assert!(state.display.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_invalid_font() {
        let res = MachineState::new(&[0xF0; 10]);
        assert_eq!(res.unwrap_err(), Error::InvalidFont(10));
    }

    #[test]
    fn test_load_rom_limits() {
        let mut state = MachineState::new(&DEFAULT_FONT).unwrap();

        assert!(state.load_rom(&vec![0xAA; MAX_ROM_SIZE]).is_ok());
        assert_eq!(state.memory[0xFFF], 0xAA);

        let err = state.load_rom(&vec![0xAA; MAX_ROM_SIZE + 1]).unwrap_err();
        assert_eq!(
            err,
            Error::RomTooLarge {
                size: 3585,
                max: 3584
            }
        );
    }

    #[test]
    fn test_fetch_wraps_at_end_of_memory() {
        let mut state = MachineState::new(&DEFAULT_FONT).unwrap();
        state.memory[0xFFF] = 0x12;
        state.memory[0x000] = 0x34;

        assert_eq!(state.fetch(0xFFF), 0x1234);
    }

    #[test]
    fn test_advance_stays_in_memory() {
        let mut state = MachineState::new(&DEFAULT_FONT).unwrap();
        state.pc = 0xFFE;

        state.advance(1);
        assert_eq!(state.pc, 0x000);

        state.pc = 0xFFE;
        state.advance(2);
        assert_eq!(state.pc, 0x002);
    }

    #[test]
    fn test_stack_bounds() {
        let mut state = MachineState::new(&DEFAULT_FONT).unwrap();

        assert_eq!(state.pop(), Err(Error::StackUnderflow { pc: 0x200 }));

        for i in 0..STACK_DEPTH as u16 {
            state.push(0x300 + i * 2).unwrap();
        }
        assert_eq!(
            state.push(0x400),
            Err(Error::StackOverflow { pc: 0x200, depth: 16 })
        );
        assert_eq!(state.sp, 16);
        assert_eq!(state.pop(), Ok(0x31E));
    }

    #[test]
    fn test_pressed_key_lowest_first() {
        let mut state = MachineState::new(&DEFAULT_FONT).unwrap();
        assert_eq!(state.pressed_key(), None);

        state.keypad[0xC] = true;
        state.keypad[0x7] = true;
        assert_eq!(state.pressed_key(), Some(0x7));
    }
}
