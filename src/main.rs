//! Headless host for the chip8 board.
//!
//! Loads a rom from a file or from an entry of a zip archive and runs it until
//! the board halts, afterwards the cpu state and the screen are printed.
//!
//! ```bash
//! chip8-board roms.zip --entry PONG --steps 2000
//! chip8-board pong.ch8 --disasm 32
//! ```
//!
//! The log output is controlled through `RUST_LOG`, ctrl-c stops the run and
//! still prints the dumps.
use std::{path::PathBuf, sync::atomic::Ordering};

use anyhow::Context;
use chip::{
    audio::Beeper,
    chip8::Board,
    definitions::{cpu, display, timer},
    devices::Screen,
    display::PixelGrid,
    resources::{Rom, RomArchive},
    Halt, Runner, RunnerConfig,
};
use clap::Parser;

/// Will parse an address given either as `0x200` or as `200`, always hex.
fn parse_address(value: &str) -> Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|err| format!("invalid address '{}': {}", value, err))
}

#[doc(hidden)]
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(help = "Path to the rom file or to a zip archive of roms")]
    rom: PathBuf,

    #[arg(short, long, help = "Name of the rom inside of the zip archive")]
    entry: Option<String>,

    #[arg(short, long, value_parser = parse_address, default_value = "0x200", help = "Address the rom is loaded to and started at")]
    origin: u16,

    #[arg(long, default_value_t = cpu::HERTZ, help = "Instructions per second, 0 is unthrottled")]
    cpu_hz: u32,

    #[arg(long, default_value_t = timer::HERTZ, help = "Timer ticks per second, 0 is unthrottled")]
    timer_hz: u32,

    #[arg(long, default_value_t = display::REFRESH_HERTZ, help = "Screen refreshes per second, 0 is unthrottled")]
    refresh_hz: u32,

    #[arg(short, long, help = "Stop after this many instructions")]
    steps: Option<u64>,

    #[arg(short = 'b', long = "break", value_parser = parse_address, help = "Stop once the program counter reaches the address")]
    breakpoints: Vec<u16>,

    #[arg(short, long, value_name = "COUNT", help = "Only print the disassembly of COUNT instructions")]
    disasm: Option<usize>,
}

impl Args {
    fn config(&self) -> RunnerConfig {
        RunnerConfig {
            cpu_hz: self.cpu_hz,
            timer_hz: self.timer_hz,
            refresh_hz: self.refresh_hz,
            step_limit: self.steps,
        }
    }

    fn load_rom(&self) -> anyhow::Result<Rom> {
        let path = self.rom.display();
        match &self.entry {
            Some(entry) => {
                let mut archive = RomArchive::open(&self.rom)
                    .with_context(|| format!("unable to open the archive '{}'", path))?;
                archive
                    .get_file_data_at(entry, self.origin)
                    .with_context(|| format!("unable to extract '{}' from '{}'", entry, path))
            }
            None => Rom::from_path_at(&self.rom, self.origin)
                .with_context(|| format!("unable to read '{}'", path)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = args.load_rom()?;
    let mut board = Board::with_program_start(PixelGrid::new(), Beeper::new(), args.origin);
    board.load_rom(&rom).with_context(|| {
        format!(
            "unable to load '{}' to {:#05X}",
            rom.get_name(),
            args.origin
        )
    })?;

    if let Some(count) = args.disasm {
        print!("{}", board.disassemble(args.origin, count));
        return Ok(());
    }

    let mut runner = Runner::new(args.config());
    for pc in &args.breakpoints {
        runner.add_breakpoint(*pc);
    }

    // ctrl-c breaks the run, the dumps below are still printed
    let interrupt = runner.interrupt_handle();
    ctrlc::set_handler(move || interrupt.store(true, Ordering::SeqCst))
        .context("unable to install the ctrl-c handler")?;

    let halt = runner.run(&mut board, |screen| log::trace!("refresh\n{}", screen.dump()));

    println!("'{}' halted after {} steps: {}", rom.get_name(), runner.steps(), halt);
    println!("{}", board.cpu());
    print!("{}", board.screen().dump());

    if let Halt::Fault(err) = halt {
        return Err(anyhow::Error::new(err).context(format!("'{}' faulted", rom.get_name())));
    }
    Ok(())
}
