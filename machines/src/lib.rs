pub mod gameboy;
pub mod registry;
pub mod rom_loader;

pub use gameboy::{BuildError, GameBoy, Model, SystemBus};
