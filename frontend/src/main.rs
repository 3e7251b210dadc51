use std::{
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use chip8_vm_core::{
    Chip8, Chip8Builder, Chip8Mode, Config, Quirks, StepOutcome, TimerEvent, DEFAULT_CLOCK_RATE,
    TIMER_PERIOD,
};
use clap::{Parser, ValueEnum};
use log::{info, warn};

mod color;
mod input;
mod render;

use color::{Rgb, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use input::{Keyboard, RawMode};
use render::TerminalRenderer;

/// Where step mode writes the state dump when no --dump path is given
const DEFAULT_DUMP_FILE: &str = "dump.json";

/// Headless CHIP-8 interpreter
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Filepath to Chip-8 ROM file that will be executed
    #[clap(index = 1)]
    rom: PathBuf,

    /// Advance I after FX55/FX65 like the original interpreters
    #[clap(short, long)]
    legacy: bool,

    /// Instructions per second
    #[clap(short = 'r', long, default_value_t = DEFAULT_CLOCK_RATE, value_parser = clap::value_parser!(u32).range(1..))]
    clock_rate: u32,

    /// Quirk preset, --legacy is applied on top
    #[clap(short, long, value_enum, default_value_t = ModeArg::Modern)]
    mode: ModeArg,

    /// Run this many cycles and exit
    #[clap(short, long, conflicts_with = "step", value_parser = clap::value_parser!(u64).range(1..))]
    cycles: Option<u64>,

    /// Execute one instruction per <Enter>
    #[clap(short, long)]
    step: bool,

    /// Write a JSON state dump here when the session ends
    #[clap(long)]
    dump: Option<PathBuf>,

    /// Filepath to font file
    #[clap(long)]
    font: Option<PathBuf>,

    /// PRNG seed
    #[clap(long)]
    seed: Option<u64>,

    /// Foreground Color as HEX 0xAABBFF [default: 0xFFFFFF]
    #[clap(long)]
    foreground: Option<Rgb>,

    /// Background Color as HEX 0xAABBFF [default: 0x000000]
    #[clap(long)]
    background: Option<Rgb>,

    /// Hex key (0-F) held down for the whole session, repeatable
    #[clap(short = 'k', long = "hold-key", value_parser = parse_key)]
    hold_keys: Vec<u8>,

    /// Run as fast as possible instead of at the clock rate
    #[clap(long)]
    unthrottled: bool,

    /// Print debug information
    #[clap(short, long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Vip,
    Chip48,
    Modern,
}

impl From<ModeArg> for Chip8Mode {
    fn from(mode: ModeArg) -> Chip8Mode {
        match mode {
            ModeArg::Vip => Chip8Mode::CosmacVip,
            ModeArg::Chip48 => Chip8Mode::Chip48,
            ModeArg::Modern => Chip8Mode::Modern,
        }
    }
}

fn parse_key(s: &str) -> Result<u8, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u8::from_str_radix(digits, 16)
        .ok()
        .filter(|&k| k < 16)
        .ok_or_else(|| format!("{s:?} is not a keypad key 0-F"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut chip = build(&args)?;
    let mut renderer = TerminalRenderer::new(
        args.foreground.unwrap_or(DEFAULT_FOREGROUND),
        args.background.unwrap_or(DEFAULT_BACKGROUND),
    );

    if args.step {
        run_step_mode(&mut chip, &renderer, &args)
    } else {
        run(&mut chip, &mut renderer, &args)
    }
}

/// Mode preset with --legacy applied on top
fn session_config(args: &Args) -> Config {
    let quirks = Quirks::for_mode(args.mode.into());
    Config {
        clock_rate: args.clock_rate,
        quirks: Quirks {
            increment_index: quirks.increment_index || args.legacy,
            ..quirks
        },
    }
}

fn build(args: &Args) -> Result<Chip8> {
    let rom = fs::read(&args.rom)
        .with_context(|| format!("failed to read ROM file {}", args.rom.display()))?;

    let mut builder = Chip8Builder::new()
        .with_rom(rom)
        .with_config(session_config(args));

    if let Some(font) = &args.font {
        let font_data = fs::read(font)
            .with_context(|| format!("failed to read font file {}", font.display()))?;
        builder = builder.with_font(font_data);
    }

    if let Some(seed) = args.seed {
        builder = builder.with_rng_seed(seed);
    }

    let mut chip = builder.build().context("failed to start emulation session")?;
    for &key in &args.hold_keys {
        chip.set_key(key, true)?;
    }

    let config = chip.config();
    info!(
        "{}: clock rate {} Hz, legacy mode {}, quirks {:?}",
        args.rom.display(),
        config.clock_rate,
        if config.legacy_mode() { "on" } else { "off" },
        config.quirks
    );
    Ok(chip)
}

/// Run one cycle, dumping state before propagating a fatal fault.
fn cycle(chip: &mut Chip8, dump: Option<&Path>) -> Result<StepOutcome> {
    match chip.step() {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            if let Some(path) = dump {
                write_dump(chip, path)?;
            }
            Err(err).context("emulation halted")
        }
    }
}

fn tick_timers(chip: &mut Chip8, elapsed: std::time::Duration) {
    if let Some(TimerEvent::ToneStop) = chip.decay_timers(elapsed) {
        info!("BEEP!");
    }
}

fn finish(chip: &Chip8, args: &Args) -> Result<()> {
    match &args.dump {
        Some(path) => write_dump(chip, path),
        None => Ok(()),
    }
}

fn run(chip: &mut Chip8, renderer: &mut TerminalRenderer, args: &Args) -> Result<()> {
    let per_tick = chip.config().cycles_per_tick();
    let mut cycles_run = 0u64;
    let mut next_frame = Instant::now();

    let raw_mode = match RawMode::enable() {
        Ok(raw_mode) => Some(raw_mode),
        Err(err) => {
            warn!("keyboard input unavailable, only --hold-key keys are down: {}", err);
            None
        }
    };
    let mut keyboard = Keyboard::new(&args.hold_keys);

    loop {
        if raw_mode.is_some() && keyboard.poll()? {
            info!("quit after {} cycles", cycles_run);
            return finish(chip, args);
        }
        chip.set_keypad(keyboard.keypad());

        for _ in 0..per_tick {
            if args.cycles.is_some_and(|limit| cycles_run >= limit) {
                info!("{} cycles completed", cycles_run);
                return finish(chip, args);
            }
            cycle(chip, args.dump.as_deref())?;
            cycles_run += 1;
        }

        tick_timers(chip, TIMER_PERIOD);

        if chip.draw_flag() {
            renderer.draw(&mut io::stdout().lock(), chip.display())?;
            chip.clear_draw_flag();
        }

        // Wait until next frame
        if !args.unthrottled {
            next_frame += TIMER_PERIOD;
            if let Some(delay) = next_frame.checked_duration_since(Instant::now()) {
                std::thread::sleep(delay);
            }
        }
    }
}

fn run_step_mode(chip: &mut Chip8, renderer: &TerminalRenderer, args: &Args) -> Result<()> {
    let per_tick = chip.config().cycles_per_tick();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        let state = chip.state();
        let (word, inst) = chip.current_instruction();
        let quirks = chip.config().quirks;
        let disasm = inst.map_or_else(
            || "???".to_string(),
            |i| i.disassemble(quirks).to_string(),
        );
        println!(
            "cycle {:>10} | 0x{:03x}: {:04x} {:<16} | I=0x{:03x} V={:02x?}",
            chip.cycles(),
            state.pc,
            word,
            disasm,
            state.index,
            state.regs
        );
        println!("Press <Enter> to continue, d to dump state and exit, q to quit");

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        match line.trim() {
            "d" | "D" => {
                let path = args
                    .dump
                    .as_deref()
                    .unwrap_or(Path::new(DEFAULT_DUMP_FILE));
                return write_dump(chip, path);
            }
            "q" | "Q" => return Ok(()),
            _ => {}
        }

        if let StepOutcome::AwaitingKey = cycle(chip, args.dump.as_deref())? {
            warn!("waiting for a key press, hold one with --hold-key");
        }
        tick_timers(chip, TIMER_PERIOD / per_tick);

        if chip.draw_flag() {
            renderer.frame(&mut io::stdout().lock(), chip.display())?;
            chip.clear_draw_flag();
        }
    }
}

fn write_dump(chip: &Chip8, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&chip.snapshot())?;
    fs::write(path, json)
        .with_context(|| format!("failed to write state dump {}", path.display()))?;
    info!("dumped emulator state to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("a"), Ok(0xA));
        assert_eq!(parse_key("0xF"), Ok(0xF));
        assert!(parse_key("10").is_err());
        assert!(parse_key("z").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["chip8-vm", "game.ch8"]).unwrap();

        assert_eq!(args.clock_rate, 500);
        assert_eq!(args.mode, ModeArg::Modern);
        assert!(!args.legacy);
        assert!(args.cycles.is_none());
        assert!(args.hold_keys.is_empty());
    }

    #[test]
    fn test_args_rejected() {
        assert!(Args::try_parse_from(["chip8-vm", "game.ch8", "-r", "0"]).is_err());
        assert!(Args::try_parse_from(["chip8-vm", "game.ch8", "-c", "0"]).is_err());
        assert!(Args::try_parse_from(["chip8-vm", "game.ch8", "-s", "-c", "10"]).is_err());
        assert!(Args::try_parse_from(["chip8-vm"]).is_err());
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "chip8-vm", "game.ch8", "-l", "-r", "1000", "-m", "vip", "-k", "5", "-k", "0xA",
            "--foreground", "0x00FF00",
        ])
        .unwrap();

        assert!(args.legacy);
        assert_eq!(args.clock_rate, 1000);
        assert_eq!(Chip8Mode::from(args.mode), Chip8Mode::CosmacVip);
        assert_eq!(args.hold_keys, vec![5, 0xA]);
        assert_eq!(args.foreground, Some(Rgb::new(0, 255, 0)));
    }

    #[test]
    fn test_session_config() {
        let args = Args::try_parse_from(["chip8-vm", "game.ch8", "-m", "chip48", "-l", "-r", "900"])
            .unwrap();
        let config = session_config(&args);

        assert_eq!(config.clock_rate, 900);
        assert!(config.legacy_mode());
        assert!(config.quirks.jump_uses_vx);
        assert!(!config.quirks.shift_copies_vy);

        let args = Args::try_parse_from(["chip8-vm", "game.ch8", "-m", "vip"]).unwrap();
        let config = session_config(&args);
        assert!(config.legacy_mode());
        assert!(config.quirks.shift_copies_vy);

        let args = Args::try_parse_from(["chip8-vm", "game.ch8"]).unwrap();
        assert_eq!(session_config(&args), Config::default());
    }

    #[test]
    fn test_dump_written() {
        let dir = std::env::temp_dir().join(format!("chip8-vm-dump-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dump.json");
        let mut chip = Chip8Builder::new()
            .with_rom(vec![0x60, 0x05, 0x12, 0x00])
            .build()
            .unwrap();
        chip.step().unwrap();

        write_dump(&chip, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["pc"], 0x202);
        assert_eq!(json["regs"][0], 5);
        assert_eq!(json["config"]["clock_rate"], 500);
        fs::remove_dir_all(&dir).unwrap();
    }
}
