//! Cartridge image loading and `.save` sidecar path derivation.

use std::io;
use std::path::{Path, PathBuf};

/// A ROM image read from disk, together with the battery-save sidecar path
/// derived from it (`<rom-path>.save`).
pub struct RomImage {
    pub bytes: Vec<u8>,
    pub save_path: PathBuf,
}

impl RomImage {
    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self {
            bytes,
            save_path: save_path_for(path),
        })
    }

    /// Build an image from raw bytes with no backing file (tests).
    pub fn from_bytes(bytes: Vec<u8>, save_path: PathBuf) -> Self {
        Self { bytes, save_path }
    }
}

/// The sidecar keeps the full ROM file name: `game.gb` → `game.gb.save`.
pub fn save_path_for(rom_path: &Path) -> PathBuf {
    let mut name = rom_path.as_os_str().to_os_string();
    name.push(".save");
    PathBuf::from(name)
}
