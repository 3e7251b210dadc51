use std::fmt;

use crate::Quirks;

/// Operand fields of a 16-bit instruction word
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Fields {
    /// First nibble, instruction family
    pub op: u8,
    /// Second nibble, register index
    pub x: u8,
    /// Third nibble, register index
    pub y: u8,
    /// Low byte, 8-bit immediate
    pub kk: u8,
    /// Low nibble, 4-bit immediate
    pub n: u8,
    /// Low 12 bits, address
    pub nnn: u16,
}

impl Fields {
    pub fn decode(word: u16) -> Fields {
        Fields {
            op: (word >> 12) as u8,
            x: ((word >> 8) & 0xF) as u8,
            y: ((word >> 4) & 0xF) as u8,
            kk: (word & 0xFF) as u8,
            n: (word & 0xF) as u8,
            nnn: word & 0xFFF,
        }
    }
}

/// A decoded CHIP-8 instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jp { nnn: u16 },
    /// 2NNN
    Call { nnn: u16 },
    /// 3XKK
    SeImm { x: u8, kk: u8 },
    /// 4XKK
    SneImm { x: u8, kk: u8 },
    /// 5XY0
    SeReg { x: u8, y: u8 },
    /// 6XKK
    LdImm { x: u8, kk: u8 },
    /// 7XKK
    AddImm { x: u8, kk: u8 },
    /// 8XY0
    LdReg { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddReg { x: u8, y: u8 },
    /// 8XY5
    Sub { x: u8, y: u8 },
    /// 8XY6
    Shr { x: u8, y: u8 },
    /// 8XY7
    Subn { x: u8, y: u8 },
    /// 8XYE
    Shl { x: u8, y: u8 },
    /// 9XY0
    SneReg { x: u8, y: u8 },
    /// ANNN
    LdIndex { nnn: u16 },
    /// BNNN
    JpOffset { x: u8, nnn: u16 },
    /// CXKK
    Rnd { x: u8, kk: u8 },
    /// DXYN
    Drw { x: u8, y: u8, n: u8 },
    /// EX9E
    Skp { x: u8 },
    /// EXA1
    Sknp { x: u8 },
    /// FX07
    LdDelay { x: u8 },
    /// FX0A
    WaitKey { x: u8 },
    /// FX15
    SetDelay { x: u8 },
    /// FX18
    SetSound { x: u8 },
    /// FX1E
    AddIndex { x: u8 },
    /// FX29
    LdFont { x: u8 },
    /// FX33
    Bcd { x: u8 },
    /// FX55
    Store { x: u8 },
    /// FX65
    Load { x: u8 },
}

impl Instruction {
    pub fn decode(word: u16) -> Option<Instruction> {
        Instruction::dispatch(Fields::decode(word))
    }

    /// Select the instruction by family, then by `kk` or `n` for the
    /// families that share a first nibble. `None` for unknown opcodes.
    pub fn dispatch(f: Fields) -> Option<Instruction> {
        use Instruction::*;

        let (x, y) = (f.x, f.y);
        let inst = match f.op {
            0x0 => match (f.x, f.kk) {
                (0x0, 0xE0) => Cls,
                (0x0, 0xEE) => Ret,
                _ => return None,
            },
            0x1 => Jp { nnn: f.nnn },
            0x2 => Call { nnn: f.nnn },
            0x3 => SeImm { x, kk: f.kk },
            0x4 => SneImm { x, kk: f.kk },
            0x5 if f.n == 0x0 => SeReg { x, y },
            0x6 => LdImm { x, kk: f.kk },
            0x7 => AddImm { x, kk: f.kk },
            0x8 => match f.n {
                0x0 => LdReg { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddReg { x, y },
                0x5 => Sub { x, y },
                0x6 => Shr { x, y },
                0x7 => Subn { x, y },
                0xE => Shl { x, y },
                _ => return None,
            },
            0x9 if f.n == 0x0 => SneReg { x, y },
            0xA => LdIndex { nnn: f.nnn },
            0xB => JpOffset { x, nnn: f.nnn },
            0xC => Rnd { x, kk: f.kk },
            0xD => Drw { x, y, n: f.n },
            0xE => match f.kk {
                0x9E => Skp { x },
                0xA1 => Sknp { x },
                _ => return None,
            },
            0xF => match f.kk {
                0x07 => LdDelay { x },
                0x0A => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1E => AddIndex { x },
                0x29 => LdFont { x },
                0x33 => Bcd { x },
                0x55 => Store { x },
                0x65 => Load { x },
                _ => return None,
            },
            _ => return None,
        };
        Some(inst)
    }
}

/// Disassembly following the quirks a ROM runs with
#[derive(Clone, Copy, Debug)]
pub struct Disassembly {
    inst: Instruction,
    quirks: Quirks,
}

impl Instruction {
    pub fn disassemble(self, quirks: Quirks) -> Disassembly {
        Disassembly { inst: self, quirks }
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inst {
            Instruction::JpOffset { x, nnn } if self.quirks.jump_uses_vx => {
                write!(f, "JP V{x:X}, 0x{nnn:03x}")
            }
            inst => inst.fmt(f),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp { nnn } => write!(f, "JP 0x{nnn:03x}"),
            Call { nnn } => write!(f, "CALL 0x{nnn:03x}"),
            SeImm { x, kk } => write!(f, "SE V{x:X}, 0x{kk:02x}"),
            SneImm { x, kk } => write!(f, "SNE V{x:X}, 0x{kk:02x}"),
            SeReg { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            LdImm { x, kk } => write!(f, "LD V{x:X}, 0x{kk:02x}"),
            AddImm { x, kk } => write!(f, "ADD V{x:X}, 0x{kk:02x}"),
            LdReg { x, y } => write!(f, "LD V{x:X}, V{y:X}"),
            Or { x, y } => write!(f, "OR V{x:X}, V{y:X}"),
            And { x, y } => write!(f, "AND V{x:X}, V{y:X}"),
            Xor { x, y } => write!(f, "XOR V{x:X}, V{y:X}"),
            AddReg { x, y } => write!(f, "ADD V{x:X}, V{y:X}"),
            Sub { x, y } => write!(f, "SUB V{x:X}, V{y:X}"),
            Shr { x, y } => write!(f, "SHR V{x:X}, V{y:X}"),
            Subn { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            Shl { x, y } => write!(f, "SHL V{x:X}, V{y:X}"),
            SneReg { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            LdIndex { nnn } => write!(f, "LD I, 0x{nnn:03x}"),
            JpOffset { nnn, .. } => write!(f, "JP V0, 0x{nnn:03x}"),
            Rnd { x, kk } => write!(f, "RND V{x:X}, 0x{kk:02x}"),
            Drw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            Skp { x } => write!(f, "SKP V{x:X}"),
            Sknp { x } => write!(f, "SKNP V{x:X}"),
            LdDelay { x } => write!(f, "LD V{x:X}, DT"),
            WaitKey { x } => write!(f, "LD V{x:X}, K"),
            SetDelay { x } => write!(f, "LD DT, V{x:X}"),
            SetSound { x } => write!(f, "LD ST, V{x:X}"),
            AddIndex { x } => write!(f, "ADD I, V{x:X}"),
            LdFont { x } => write!(f, "LD F, V{x:X}"),
            Bcd { x } => write!(f, "LD B, V{x:X}"),
            Store { x } => write!(f, "LD [I], V{x:X}"),
            Load { x } => write!(f, "LD V{x:X}, [I]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let f = Fields::decode(0xD12F);

        assert_eq!(f.op, 0xD);
        assert_eq!(f.x, 0x1);
        assert_eq!(f.y, 0x2);
        assert_eq!(f.kk, 0x2F);
        assert_eq!(f.n, 0xF);
        assert_eq!(f.nnn, 0x12F);
    }

    #[test]
    fn test_dispatch_families() {
        assert_eq!(Instruction::decode(0x00E0), Some(Instruction::Cls));
        assert_eq!(Instruction::decode(0x00EE), Some(Instruction::Ret));
        assert_eq!(
            Instruction::decode(0x2ABC),
            Some(Instruction::Call { nnn: 0xABC })
        );
        assert_eq!(
            Instruction::decode(0x8AB6),
            Some(Instruction::Shr { x: 0xA, y: 0xB })
        );
        assert_eq!(
            Instruction::decode(0x8ABE),
            Some(Instruction::Shl { x: 0xA, y: 0xB })
        );
        assert_eq!(Instruction::decode(0xE3A1), Some(Instruction::Sknp { x: 3 }));
        assert_eq!(Instruction::decode(0xF40A), Some(Instruction::WaitKey { x: 4 }));
        assert_eq!(Instruction::decode(0xF565), Some(Instruction::Load { x: 5 }));
    }

    #[test]
    fn test_dispatch_unknown() {
        for word in [
            0x0123u16, 0x01E0, 0x5121, 0x8128, 0x812F, 0x9121, 0xE19F, 0xF1FF, 0xF100,
        ] {
            assert_eq!(Instruction::decode(word), None, "0x{:04x}", word);
        }
    }

    #[test]
    fn test_every_word_decodes_or_is_unknown() {
        let known = (0..=u16::MAX)
            .filter(|&w| Instruction::decode(w).is_some())
            .count();

        // 0x1-0x4, 0x6, 0x7, 0xA-0xD cover every word, the rest are sparse
        let full = 10 * 0x1000;
        let sparse = 2 + 0x100 * 2 + 0x100 * 9 + 16 * 2 + 16 * 9;
        assert_eq!(known, full + sparse);
    }

    #[test]
    fn test_disassembly() {
        assert_eq!(Instruction::decode(0x6005).unwrap().to_string(), "LD V0, 0x05");
        assert_eq!(Instruction::decode(0x1200).unwrap().to_string(), "JP 0x200");
        assert_eq!(Instruction::decode(0xD125).unwrap().to_string(), "DRW V1, V2, 5");
        assert_eq!(Instruction::decode(0xFA55).unwrap().to_string(), "LD [I], VA");
    }

    #[test]
    fn test_disassembly_follows_jump_quirk() {
        let inst = Instruction::decode(0xB4F0).unwrap();

        assert_eq!(inst.to_string(), "JP V0, 0x4f0");
        assert_eq!(
            inst.disassemble(Quirks::default()).to_string(),
            "JP V0, 0x4f0"
        );
        assert_eq!(
            inst.disassemble(Quirks::for_mode(crate::Chip8Mode::Chip48))
                .to_string(),
            "JP V4, 0x4f0"
        );
        assert_eq!(
            Instruction::Cls.disassemble(Quirks::default()).to_string(),
            "CLS"
        );
    }
}
