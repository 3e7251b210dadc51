use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// CPU cycles per second used when none is configured
pub const DEFAULT_CLOCK_RATE: u32 = 500;

/// Delay and sound timer frequency
pub const TIMER_HZ: u32 = 60;

/// Interpreter generation whose quirks a ROM expects
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chip8Mode {
    /// Original RCA COSMAC VIP interpreter
    CosmacVip,
    /// HP-48 calculator interpreter
    Chip48,
    /// Behaviour shared by most current interpreters
    #[default]
    Modern,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Quirks {
    /// Bitwise shift (8XY6 and 8XYE) quirk: if true VY is copied into VX before shifting (COSMAC VIP)
    pub shift_copies_vy: bool,
    /// Jump with offset (BNNN/BXNN) quirk: jump to the address XNN plus the value in the register VX (CHIP-48),
    /// instead of the address NNN plus the value in the register V0 (COSMAC VIP)
    pub jump_uses_vx: bool,
    /// Store and load memory (FX55/FX65) quirk: advance I by X + 1 after storing or loading registers (legacy)
    pub increment_index: bool,
}

impl Quirks {
    pub fn for_mode(mode: Chip8Mode) -> Quirks {
        match mode {
            Chip8Mode::CosmacVip => Quirks {
                shift_copies_vy: true,
                jump_uses_vx: false,
                increment_index: true,
            },
            Chip8Mode::Chip48 => Quirks {
                shift_copies_vy: false,
                jump_uses_vx: true,
                increment_index: false,
            },
            Chip8Mode::Modern => Quirks::default(),
        }
    }
}

/// Session-start options
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Config {
    /// CPU cycles per second
    pub clock_rate: u32,
    pub quirks: Quirks,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock_rate: DEFAULT_CLOCK_RATE,
            quirks: Quirks::default(),
        }
    }
}

impl Config {
    pub fn new(legacy_mode: bool, clock_rate: u32) -> Result<Config> {
        let config = Config {
            clock_rate,
            quirks: Quirks {
                increment_index: legacy_mode,
                ..Quirks::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Legacy mode is the FX55/FX65 index advance
    pub fn legacy_mode(&self) -> bool {
        self.quirks.increment_index
    }

    pub fn validate(&self) -> Result<()> {
        if self.clock_rate == 0 {
            return Err(Error::InvalidClockRate);
        }
        Ok(())
    }

    /// Number of `step()` calls the host should make per timer tick.
    pub fn cycles_per_tick(&self) -> u32 {
        (self.clock_rate / TIMER_HZ).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_legacy_quirk() {
        let config = Config::new(true, 700).unwrap();

        assert!(config.legacy_mode());
        assert!(config.quirks.increment_index);
        assert!(!config.quirks.shift_copies_vy);
        assert!(!config.quirks.jump_uses_vx);
        assert_eq!(config.clock_rate, 700);
    }

    #[test]
    fn test_zero_clock_rate_rejected() {
        assert_eq!(Config::new(false, 0), Err(Error::InvalidClockRate));
    }

    #[test]
    fn test_cycles_per_tick() {
        assert_eq!(Config::new(false, 500).unwrap().cycles_per_tick(), 8);
        assert_eq!(Config::new(false, 1000).unwrap().cycles_per_tick(), 16);
        assert_eq!(Config::new(false, 30).unwrap().cycles_per_tick(), 1);
    }

    #[test]
    fn test_mode_presets() {
        let vip = Quirks::for_mode(Chip8Mode::CosmacVip);
        assert!(vip.shift_copies_vy && vip.increment_index && !vip.jump_uses_vx);

        let chip48 = Quirks::for_mode(Chip8Mode::Chip48);
        assert!(chip48.jump_uses_vx && !chip48.shift_copies_vy && !chip48.increment_index);

        assert_eq!(Quirks::for_mode(Chip8Mode::Modern), Quirks::default());
    }
}
