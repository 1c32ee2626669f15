//! Cartridge: ROM image, memory-bank controller, battery-backed RAM and the
//! boot-ROM overlay bytes.
//!
//! Bank arithmetic follows the MBC1/MBC3/MBC5 register semantics, including
//! the 0→1 remap of the low ROM-bank field and the modulo wrap against the
//! real bank count for oversized selections.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;
pub const VRAM_BANK_SIZE: usize = 0x2000;

/// Writes to cartridge RAM before the content is flushed to disk.
const RAM_WRITE_FLUSH_THRESHOLD: u32 = 500_000;

/// Bootix, a copyright-free DMG boot ROM by Hacktix:
/// https://github.com/Hacktix/Bootix
pub const BOOT_ROM: [u8; 0x100] = [
    0x31, 0xfe, 0xff, 0x21, 0xff, 0x9f, 0xaf, 0x32, 0xcb, 0x7c, 0x20, 0xfa, 0x0e, 0x11, 0x21, 0x26,
    0xff, 0x3e, 0x80, 0x32, 0xe2, 0x0c, 0x3e, 0xf3, 0x32, 0xe2, 0x0c, 0x3e, 0x77, 0x32, 0xe2, 0x11,
    0x04, 0x01, 0x21, 0x10, 0x80, 0x1a, 0xcd, 0xb8, 0x00, 0x1a, 0xcb, 0x37, 0xcd, 0xb8, 0x00, 0x13,
    0x7b, 0xfe, 0x34, 0x20, 0xf0, 0x11, 0xcc, 0x00, 0x06, 0x08, 0x1a, 0x13, 0x22, 0x23, 0x05, 0x20,
    0xf9, 0x21, 0x04, 0x99, 0x01, 0x0c, 0x01, 0xcd, 0xb1, 0x00, 0x3e, 0x19, 0x77, 0x21, 0x24, 0x99,
    0x0e, 0x0c, 0xcd, 0xb1, 0x00, 0x3e, 0x91, 0xe0, 0x40, 0x06, 0x10, 0x11, 0xd4, 0x00, 0x78, 0xe0,
    0x43, 0x05, 0x7b, 0xfe, 0xd8, 0x28, 0x04, 0x1a, 0xe0, 0x47, 0x13, 0x0e, 0x1c, 0xcd, 0xa7, 0x00,
    0xaf, 0x90, 0xe0, 0x43, 0x05, 0x0e, 0x1c, 0xcd, 0xa7, 0x00, 0xaf, 0xb0, 0x20, 0xe0, 0xe0, 0x43,
    0x3e, 0x83, 0xcd, 0x9f, 0x00, 0x0e, 0x27, 0xcd, 0xa7, 0x00, 0x3e, 0xc1, 0xcd, 0x9f, 0x00, 0x11,
    0x8a, 0x01, 0xf0, 0x44, 0xfe, 0x90, 0x20, 0xfa, 0x1b, 0x7a, 0xb3, 0x20, 0xf5, 0x18, 0x49, 0x0e,
    0x13, 0xe2, 0x0c, 0x3e, 0x87, 0xe2, 0xc9, 0xf0, 0x44, 0xfe, 0x90, 0x20, 0xfa, 0x0d, 0x20, 0xf7,
    0xc9, 0x78, 0x22, 0x04, 0x0d, 0x20, 0xfa, 0xc9, 0x47, 0x0e, 0x04, 0xaf, 0xc5, 0xcb, 0x10, 0x17,
    0xc1, 0xcb, 0x10, 0x17, 0x0d, 0x20, 0xf5, 0x22, 0x23, 0x22, 0x23, 0xc9, 0x3c, 0x42, 0xb9, 0xa5,
    0xb9, 0xa5, 0x42, 0x3c, 0x00, 0x54, 0xa8, 0xfc, 0x42, 0x4f, 0x4f, 0x54, 0x49, 0x58, 0x2e, 0x44,
    0x4d, 0x47, 0x20, 0x76, 0x31, 0x2e, 0x32, 0x00, 0x3e, 0xff, 0xc6, 0x01, 0x0b, 0x1e, 0xd8, 0x21,
    0x4d, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3e, 0x01, 0xe0, 0x50,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MbcKind {
    RomOnly,
    Mbc1,
    Mbc3,
    Mbc5,
}

impl MbcKind {
    pub fn from_header(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(MbcKind::RomOnly),
            0x01..=0x03 => Some(MbcKind::Mbc1),
            0x0F..=0x13 => Some(MbcKind::Mbc3),
            0x19..=0x1E => Some(MbcKind::Mbc5),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum CartridgeError {
    /// Image shorter than the 0x150-byte header.
    TooShort(usize),
    /// Header byte 0x147 names a bank controller this emulator lacks.
    UnsupportedMbc(u8),
    /// Header byte 0x148 disagrees with the actual image size.
    BankCountMismatch { header: usize, actual: usize },
    Io(io::Error),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::TooShort(len) => {
                write!(f, "ROM image of {len} bytes is too short to hold a header")
            }
            CartridgeError::UnsupportedMbc(byte) => {
                write!(f, "unsupported bank controller type {byte:#04x}")
            }
            CartridgeError::BankCountMismatch { header, actual } => {
                write!(f, "header declares {header} ROM banks but the image holds {actual}")
            }
            CartridgeError::Io(err) => write!(f, "cartridge I/O error: {err}"),
        }
    }
}

impl std::error::Error for CartridgeError {}

impl From<io::Error> for CartridgeError {
    fn from(err: io::Error) -> Self {
        CartridgeError::Io(err)
    }
}

#[derive(Debug)]
pub struct Cartridge {
    mbc: MbcKind,
    rom_banks: Vec<[u8; ROM_BANK_SIZE]>,
    ram_banks: Vec<[u8; RAM_BANK_SIZE]>,
    vram: [[u8; VRAM_BANK_SIZE]; 2],

    current_rom: u8,
    current_rom_hi: u8,
    current_ram: u8,
    ram_enabled: bool,
    banking_mode: u8,

    rtc: [u8; 5],
    rtc_latch_pending: bool,

    color: bool,
    save_path: Option<PathBuf>,
    ram_write_counter: u32,
}

impl Cartridge {
    /// Build a cartridge from a raw ROM dump, validating the header.
    pub fn from_bytes(image: &[u8]) -> Result<Self, CartridgeError> {
        if image.len() < 0x150 {
            return Err(CartridgeError::TooShort(image.len()));
        }

        let mbc = MbcKind::from_header(image[0x147])
            .ok_or(CartridgeError::UnsupportedMbc(image[0x147]))?;

        let header_banks = 1usize << (image[0x148] + 1);
        let actual_banks = image.len().div_ceil(ROM_BANK_SIZE);
        if header_banks != actual_banks {
            return Err(CartridgeError::BankCountMismatch {
                header: header_banks,
                actual: actual_banks,
            });
        }

        let mut rom_banks = vec![[0u8; ROM_BANK_SIZE]; actual_banks];
        for (index, chunk) in image.chunks(ROM_BANK_SIZE).enumerate() {
            rom_banks[index][..chunk.len()].copy_from_slice(chunk);
        }

        let ram_bank_count = match image[0x149] {
            2 => 1,
            3 => 4,
            4 => 16,
            5 => 8,
            _ => 0,
        };

        Ok(Self {
            mbc,
            rom_banks,
            ram_banks: vec![[0; RAM_BANK_SIZE]; ram_bank_count],
            vram: [[0; VRAM_BANK_SIZE]; 2],
            current_rom: 1,
            current_rom_hi: 0,
            current_ram: 0,
            ram_enabled: false,
            banking_mode: 0,
            rtc: [0; 5],
            rtc_latch_pending: false,
            color: image[0x143] & 0x80 != 0,
            save_path: None,
            ram_write_counter: 0,
        })
    }

    /// Attach the `.save` sidecar: future flushes go there, and an existing
    /// file of exactly the right size replaces the zeroed RAM now. A
    /// wrong-sized file is ignored with a warning.
    pub fn attach_save_file(&mut self, path: &Path) {
        self.save_path = Some(path.to_path_buf());

        let Ok(data) = fs::read(path) else { return };
        if data.len() != self.ram_banks.len() * RAM_BANK_SIZE {
            eprintln!(
                "warning: save file {} has {} bytes, expected {}; ignoring it",
                path.display(),
                data.len(),
                self.ram_banks.len() * RAM_BANK_SIZE,
            );
            return;
        }
        for (bank, chunk) in self.ram_banks.iter_mut().zip(data.chunks(RAM_BANK_SIZE)) {
            bank.copy_from_slice(chunk);
        }
    }

    /// Return the banking registers to their power-on state. ROM, RAM and
    /// VRAM contents are left alone.
    pub fn reset_banking(&mut self) {
        self.current_rom = 1;
        self.current_rom_hi = 0;
        self.current_ram = 0;
        self.ram_enabled = false;
        self.banking_mode = 0;
        self.rtc_latch_pending = false;
    }

    /// Whether the header requests the color tier (byte 0x143).
    pub fn is_color(&self) -> bool {
        self.color
    }

    pub fn rom_bank_count(&self) -> usize {
        self.rom_banks.len()
    }

    pub fn ram_bank_count(&self) -> usize {
        self.ram_banks.len()
    }

    pub fn vram(&self) -> &[[u8; VRAM_BANK_SIZE]; 2] {
        &self.vram
    }

    pub fn read_vram(&self, bank: u8, offset: u16) -> u8 {
        self.vram[(bank & 1) as usize][offset as usize]
    }

    pub fn write_vram(&mut self, bank: u8, offset: u16, data: u8) {
        self.vram[(bank & 1) as usize][offset as usize] = data;
    }

    /// Read in the cartridge's bus windows: ROM 0x0000-0x7FFF and external
    /// RAM 0xA000-0xBFFF. The boot-ROM overlay is decoded by the system bus.
    pub fn read(&self, addr: u16) -> u8 {
        match self.mbc {
            MbcKind::RomOnly => self.rom_only_read(addr),
            MbcKind::Mbc1 => self.mbc1_read(addr),
            MbcKind::Mbc3 => self.mbc3_read(addr),
            MbcKind::Mbc5 => self.mbc5_read(addr),
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match self.mbc {
            MbcKind::RomOnly => {}
            MbcKind::Mbc1 => self.mbc1_write(addr, data),
            MbcKind::Mbc3 => self.mbc3_write(addr, data),
            MbcKind::Mbc5 => self.mbc5_write(addr, data),
        }
    }

    fn rom_only_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.rom_banks[addr as usize / ROM_BANK_SIZE]
                [addr as usize % ROM_BANK_SIZE],
            _ => 0xFF,
        }
    }

    // --- MBC1 ---

    fn mbc1_read(&self, addr: u16) -> u8 {
        let rom_count = self.rom_banks.len();
        match addr {
            // Fixed bank in mode 0; the high-field-selected bank in mode 1.
            0x0000..=0x3FFF => {
                let bank = if self.banking_mode == 0 {
                    0
                } else {
                    ((self.current_ram as usize) << 5) % rom_count
                };
                self.rom_banks[bank][addr as usize % ROM_BANK_SIZE]
            }
            0x4000..=0x7FFF => {
                let bank =
                    (((self.current_ram as usize) << 5) + self.current_rom as usize) % rom_count;
                self.rom_banks[bank][addr as usize % ROM_BANK_SIZE]
            }
            0xA000..=0xBFFF => {
                if self.ram_banks.is_empty() || !self.ram_enabled {
                    return 0xFF;
                }
                let bank = if self.banking_mode == 0 {
                    0
                } else {
                    self.current_ram as usize % self.ram_banks.len()
                };
                self.ram_banks[bank][addr as usize % RAM_BANK_SIZE]
            }
            _ => 0xFF,
        }
    }

    fn mbc1_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.set_ram_enable(data & 0x0F == 0x0A),
            0x2000..=0x3FFF => {
                self.current_rom = if data & 0x1F == 0 { 1 } else { data & 0x1F };
            }
            0x4000..=0x5FFF => self.current_ram = data & 0x03,
            0x6000..=0x7FFF => self.banking_mode = data & 0x01,
            0xA000..=0xBFFF => {
                if self.ram_banks.is_empty() || !self.ram_enabled {
                    return;
                }
                let bank = if self.banking_mode == 0 {
                    0
                } else {
                    self.current_ram as usize % self.ram_banks.len()
                };
                self.ram_banks[bank][addr as usize % RAM_BANK_SIZE] = data;
                self.count_ram_write();
            }
            _ => {}
        }
    }

    // --- MBC3 (+RTC) ---

    fn mbc3_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom_banks[0][addr as usize],
            0x4000..=0x7FFF => {
                let bank = self.current_rom as usize % self.rom_banks.len();
                self.rom_banks[bank][addr as usize % ROM_BANK_SIZE]
            }
            0xA000..=0xBFFF => {
                if !self.ram_enabled {
                    return 0xFF;
                }
                match self.current_ram {
                    0x00..=0x03 => {
                        if self.ram_banks.is_empty() {
                            return 0xFF;
                        }
                        let bank = self.current_ram as usize % self.ram_banks.len();
                        self.ram_banks[bank][addr as usize % RAM_BANK_SIZE]
                    }
                    0x08..=0x0C => self.rtc[(self.current_ram - 0x08) as usize],
                    _ => 0xFF,
                }
            }
            _ => 0xFF,
        }
    }

    fn mbc3_write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.set_ram_enable(data & 0x0F == 0x0A),
            0x2000..=0x3FFF => {
                self.current_rom = if data & 0x7F == 0 { 1 } else { data & 0x7F };
            }
            0x4000..=0x5FFF => self.current_ram = data,
            0x6000..=0x7FFF => {
                // Latch on a 0x00 → 0x01 write sequence.
                if data == 0x01 && self.rtc_latch_pending {
                    self.latch_rtc();
                }
                self.rtc_latch_pending = data == 0x00;
            }
            0xA000..=0xBFFF => {
                if !self.ram_enabled {
                    return;
                }
                match self.current_ram {
                    0x00..=0x03 => {
                        if self.ram_banks.is_empty() {
                            return;
                        }
                        let bank = self.current_ram as usize % self.ram_banks.len();
                        self.ram_banks[bank][addr as usize % RAM_BANK_SIZE] = data;
                        self.count_ram_write();
                    }
                    0x08..=0x0C => self.rtc[(self.current_ram - 0x08) as usize] = data,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Freeze the RTC register file. Synchronizing the registers to host
    /// wall-clock time is out of scope; the latch sequence itself is what
    /// games probe for.
    fn latch_rtc(&mut self) {}

    // --- MBC5 ---

    fn mbc5_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom_banks[0][addr as usize],
            0x4000..=0x7FFF => {
                let selected = self.current_rom as usize | (self.current_rom_hi as usize) << 8;
                let bank = selected % self.rom_banks.len();
                self.rom_banks[bank][addr as usize % ROM_BANK_SIZE]
            }
            0xA000..=0xBFFF => {
                if !self.ram_enabled || self.ram_banks.is_empty() {
                    return 0xFF;
                }
                if (self.current_ram as usize) < self.ram_banks.len() {
                    self.ram_banks[self.current_ram as usize][addr as usize % RAM_BANK_SIZE]
                } else {
                    0xFF
                }
            }
            _ => 0xFF,
        }
    }

    fn mbc5_write(&mut self, addr: u16, data: u8) {
        match addr {
            // MBC5 is strict: exactly 0x0A enables, exactly 0x00 disables.
            0x0000..=0x1FFF => match data {
                0x0A => self.set_ram_enable(true),
                0x00 => self.set_ram_enable(false),
                _ => {}
            },
            0x2000..=0x2FFF => self.current_rom = data,
            0x3000..=0x3FFF => self.current_rom_hi = data & 0x01,
            0x4000..=0x5FFF => self.current_ram = data & 0x0F,
            0xA000..=0xBFFF => {
                if !self.ram_enabled || self.ram_banks.is_empty() {
                    return;
                }
                let bank = self.current_ram as usize % self.ram_banks.len();
                self.ram_banks[bank][addr as usize % RAM_BANK_SIZE] = data;
                self.count_ram_write();
            }
            _ => {}
        }
    }

    // --- Save persistence ---

    fn set_ram_enable(&mut self, enable: bool) {
        let was_enabled = self.ram_enabled;
        self.ram_enabled = enable;
        if was_enabled && !enable {
            self.flush_save_warning();
        }
    }

    fn count_ram_write(&mut self) {
        self.ram_write_counter += 1;
        if self.ram_write_counter > RAM_WRITE_FLUSH_THRESHOLD {
            self.flush_save_warning();
        }
    }

    /// Write all RAM banks to the sidecar. No-op without a save path or RAM.
    pub fn flush_save(&mut self) -> io::Result<()> {
        self.ram_write_counter = 0;
        let Some(path) = &self.save_path else { return Ok(()) };
        if self.ram_banks.is_empty() {
            return Ok(());
        }
        let mut data = Vec::with_capacity(self.ram_banks.len() * RAM_BANK_SIZE);
        for bank in &self.ram_banks {
            data.extend_from_slice(bank);
        }
        fs::write(path, data)
    }

    fn flush_save_warning(&mut self) {
        if let Err(err) = self.flush_save() {
            eprintln!("warning: failed to write save file: {err}");
        }
    }
}
