use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gameboy_machines::registry;
use gameboy_machines::rom_loader::RomImage;

mod audio;
mod emulator;
mod input;
mod video;

#[derive(Parser)]
#[command(name = "gameboy", about = "Game Boy / Game Boy Color emulator")]
struct Args {
    /// Path to the cartridge ROM image (raw dump)
    #[arg(long)]
    rom: PathBuf,

    /// Pace emulation to a fixed ~59.7 Hz instead of audio back-pressure
    #[arg(long, alias = "fixed_fps")]
    fixed_fps: bool,

    /// Integer window scale factor
    #[arg(long, default_value_t = 3)]
    scale: u32,

    /// Machine to emulate
    #[arg(long, default_value = "gameboy")]
    machine: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Some(entry) = registry::find(&args.machine) else {
        eprintln!("Unknown machine: {}", args.machine);
        eprintln!("Available:");
        for entry in registry::all() {
            eprintln!("  {:10} {}", entry.name, entry.description);
        }
        return ExitCode::FAILURE;
    };

    let rom = match RomImage::load(&args.rom) {
        Ok(rom) => rom,
        Err(err) => {
            eprintln!("Failed to read ROM {}: {err}", args.rom.display());
            return ExitCode::FAILURE;
        }
    };

    let mut machine = match (entry.create)(&rom) {
        Ok(machine) => machine,
        Err(err) => {
            eprintln!("Failed to build machine: {err}");
            return ExitCode::FAILURE;
        }
    };

    let key_map = input::load_key_map(machine.input_map());

    machine.reset();
    emulator::run(machine.as_mut(), &key_map, args.scale, args.fixed_fps);

    // Battery-backed RAM is flushed implicitly on clean exit.
    machine.flush_persistent();

    ExitCode::SUCCESS
}
