//! CHIP-8 virtual machine core: machine state, instruction decoding and
//! dispatch, the opcode handlers and the cycle/timer engine.
//!
//! Rendering, input, ROM files and timing are left to the host, which drives
//! the engine with [`Chip8::step`] and [`Chip8::decay_timers`].

mod chip8;
mod config;
mod error;
mod instruction;
mod ops;
mod state;

pub use chip8::{Chip8, Chip8Builder, StepOutcome, TimerEvent, TIMER_PERIOD};
pub use config::{Chip8Mode, Config, Quirks, DEFAULT_CLOCK_RATE, TIMER_HZ};
pub use error::{Error, Result};
pub use instruction::{Disassembly, Fields, Instruction};
pub use state::{
    MachineState, Snapshot, DEFAULT_FONT, FONT_BASE, MAX_ROM_SIZE, MEMORY_SIZE, NUM_KEYS,
    PROGRAM_START, SCREEN_HEIGHT, SCREEN_WIDTH,
};
