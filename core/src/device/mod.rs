pub mod apu;
pub mod cartridge;
pub mod cram;
pub mod hdma;
pub mod joypad;
pub mod mem;
pub mod ppu;
pub mod serial;
pub mod timer;
pub mod wram;

pub use apu::Apu;
pub use cartridge::{BOOT_ROM, Cartridge, CartridgeError, MbcKind};
pub use cram::ColorRam;
pub use hdma::Hdma;
pub use joypad::Joypad;
pub use mem::Memory;
pub use ppu::{OamDma, Ppu, PpuBus, PpuEvents, PpuMode};
pub use serial::Serial;
pub use timer::Timer;
pub use wram::WorkRam;
