// CHIP-8 interpreter core
//
// Useful links:
// * [Guide to making a CHIP-8 emulator](https://tobiasvl.github.io/blog/write-a-chip-8-emulator/)
// * [Cowgod's Chip-8 Technical Reference](http://devernay.free.fr/hacks/chip8/C8TECH10.HTM)
//

use std::time::Duration;

use log::{debug, error, trace, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    instruction::{Fields, Instruction},
    ops::{self, PcUpdate},
    state::{MachineState, Snapshot, DEFAULT_FONT, NUM_KEYS},
    Chip8Mode, Config, Error, Quirks, Result, TIMER_HZ,
};

/// Real time between two delay/sound timer ticks
pub const TIMER_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / TIMER_HZ as u64);

const MAX_TICKS: u128 = u8::MAX as u128 + 1;

/// What a single `step()` did
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    /// An instruction ran to completion
    Executed,
    /// FX0A is blocked, no key is pressed
    AwaitingKey,
    /// No handler for the opcode, skipped over
    UnknownOpcode { addr: u16, opcode: u16 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerEvent {
    /// Sound timer just reached zero
    ToneStop,
}

#[derive(Debug, Default)]
pub struct Chip8Builder {
    /// ROM
    rom: Option<Vec<u8>>,
    /// Font sprite
    font: Option<Vec<u8>>,
    // PRNG Seed
    rng_seed: Option<u64>,
    /// Clock rate and quirks
    config: Config,
}

pub struct Chip8 {
    state: MachineState,
    config: Config,
    /// PRNG Generator
    rng: StdRng,
    /// Real time not yet consumed by timer ticks
    timer_elapsed: Duration,
    /// Executed cycles
    cycles: u64,
    /// Fatal error that halted the session
    fault: Option<Error>,
}

impl Chip8Builder {
    pub fn new() -> Chip8Builder {
        Chip8Builder::default()
    }

    pub fn with_rom(mut self, rom: Vec<u8>) -> Self {
        self.rom = Some(rom);
        self
    }

    pub fn with_font(mut self, font: Vec<u8>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Replace all quirks with the preset of `mode`.
    pub fn with_mode(mut self, mode: Chip8Mode) -> Self {
        self.config.quirks = Quirks::for_mode(mode);
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.config.quirks = quirks;
        self
    }

    pub fn with_legacy_mode(mut self, legacy: bool) -> Self {
        self.config.quirks.increment_index = legacy;
        self
    }

    pub fn with_clock_rate(mut self, clock_rate: u32) -> Self {
        self.config.clock_rate = clock_rate;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Chip8> {
        self.config.validate()?;

        let font = match &self.font {
            Some(font) => &font[..],
            None => &DEFAULT_FONT[..],
        };
        let mut state = MachineState::new(font)?;

        let rom = self.rom.as_ref().ok_or(Error::MissingRom)?;
        state.load_rom(rom)?;

        // Pseudo random number generator
        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        debug!(
            "loaded {} byte ROM, clock rate {} Hz, quirks {:?}",
            rom.len(),
            self.config.clock_rate,
            self.config.quirks
        );

        Ok(Chip8 {
            state,
            config: self.config,
            rng,
            timer_elapsed: Duration::ZERO,
            cycles: 0,
            fault: None,
        })
    }
}

impl Chip8 {
    /// Run one fetch-decode-execute cycle.
    ///
    /// A stack fault halts the session: the error is returned and every later
    /// call returns it again without touching the machine.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        if let Some(x) = self.state.awaiting_key {
            let Some(key) = self.state.pressed_key() else {
                return Ok(StepOutcome::AwaitingKey);
            };
            debug!("key 0x{:x} pressed, V{:X} released from wait", key, x);
            self.state.set_reg(x, key);
            self.state.awaiting_key = None;
            self.state.advance(1);
            self.cycles += 1;
            return Ok(StepOutcome::Executed);
        }

        let pc = self.state.pc;
        let word = self.state.fetch(pc);
        self.cycles += 1;

        let Some(inst) = Instruction::dispatch(Fields::decode(word)) else {
            warn!("unknown opcode 0x{:04x} at 0x{:03x}, skipping", word, pc);
            self.state.advance(1);
            return Ok(StepOutcome::UnknownOpcode { addr: pc, opcode: word });
        };

        trace!(
            "0x{:03x}: {:04x} {}",
            pc,
            word,
            inst.disassemble(self.config.quirks)
        );

        match ops::execute(inst, &mut self.state, &self.config.quirks, &mut self.rng) {
            Ok(PcUpdate::Advance) => self.state.advance(1),
            Ok(PcUpdate::Skip) => self.state.advance(2),
            Ok(PcUpdate::Set) => {}
            Err(err) => {
                error!("halting after {} cycles: {}", self.cycles, err);
                self.fault = Some(err.clone());
                return Err(err);
            }
        }

        if self.state.awaiting_key.is_some() {
            return Ok(StepOutcome::AwaitingKey);
        }
        Ok(StepOutcome::Executed)
    }

    /// Decrement both timers once, as on a 60 Hz tick.
    pub fn step_timer(&mut self) -> Option<TimerEvent> {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);

        if self.state.sound_timer > 0 {
            self.state.sound_timer -= 1;
            if self.state.sound_timer == 0 {
                return Some(TimerEvent::ToneStop);
            }
        }
        None
    }

    /// Let `elapsed` real time pass, ticking the timers once per
    /// `TIMER_PERIOD` boundary crossed.
    pub fn decay_timers(&mut self, elapsed: Duration) -> Option<TimerEvent> {
        self.timer_elapsed = self.timer_elapsed.saturating_add(elapsed);

        let period = TIMER_PERIOD.as_nanos();
        let ticks = self.timer_elapsed.as_nanos() / period;
        self.timer_elapsed = Duration::from_nanos((self.timer_elapsed.as_nanos() % period) as u64);

        // Both 8-bit timers are at zero after MAX_TICKS ticks
        let mut event = None;
        for _ in 0..ticks.min(MAX_TICKS) {
            event = self.step_timer().or(event);
        }
        event
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<()> {
        if key as usize >= NUM_KEYS {
            return Err(Error::InvalidKey(key));
        }
        self.state.keypad[key as usize] = pressed;
        Ok(())
    }

    pub fn set_keypad(&mut self, keypad: [bool; NUM_KEYS]) {
        self.state.keypad = keypad;
    }

    /// 64x32 pixels, row-major, 0 or 1
    pub fn display(&self) -> &[u8] {
        &self.state.display[..]
    }

    pub fn draw_flag(&self) -> bool {
        self.state.draw_flag
    }

    pub fn clear_draw_flag(&mut self) {
        self.state.draw_flag = false;
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The fatal error that halted the session, if any.
    pub fn fault(&self) -> Option<&Error> {
        self.fault.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, self.config, self.cycles)
    }

    /// Disassembly of the instruction at pc.
    pub fn current_instruction(&self) -> (u16, Option<Instruction>) {
        let word = self.state.fetch(self.state.pc);
        (word, Instruction::decode(word))
    }
}
