//! Machine registry for front-end discovery.
//!
//! Each front-end-selectable configuration self-registers via
//! [`inventory::submit!`] with a [`MachineEntry`] containing its CLI name
//! and a factory function, so the front end discovers what it can build
//! without a central list.

use gameboy_core::core::machine::Machine;

use crate::gameboy::BuildError;
use crate::rom_loader::RomImage;

pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "gameboy").
    pub name: &'static str,
    /// One-line description for `--help`-style listings.
    pub description: &'static str,
    /// Factory: construct a Machine from a loaded ROM image.
    pub create: fn(&RomImage) -> Result<Box<dyn Machine>, BuildError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn(&RomImage) -> Result<Box<dyn Machine>, BuildError>,
    ) -> Self {
        Self { name, description, create }
    }
}

inventory::collect!(MachineEntry);

/// All registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
