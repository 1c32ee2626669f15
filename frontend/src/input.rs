use std::collections::HashMap;
use std::path::PathBuf;

use gameboy_core::core::machine::InputButton;
use sdl2::keyboard::Scancode;
use serde::{Deserialize, Serialize};

/// Maps SDL scancodes to machine button IDs.
pub struct KeyMap {
    map: HashMap<Scancode, u8>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Bind a scancode to a machine button ID.
    pub fn bind(&mut self, scancode: Scancode, button_id: u8) {
        self.map.insert(scancode, button_id);
    }

    /// Look up the machine button ID for a scancode.
    pub fn get(&self, scancode: Scancode) -> Option<u8> {
        self.map.get(&scancode).copied()
    }
}

/// On-disk key bindings: button name → SDL scancode name.
#[derive(Serialize, Deserialize)]
struct KeyMapConfig {
    bindings: HashMap<String, String>,
}

impl KeyMapConfig {
    fn default_for(buttons: &[InputButton]) -> Self {
        let mut bindings = HashMap::new();
        for button in buttons {
            if let Some(scancode) = default_scancode(button.name) {
                bindings.insert(button.name.to_string(), scancode.name().to_string());
            }
        }
        Self { bindings }
    }
}

fn default_scancode(button_name: &str) -> Option<Scancode> {
    match button_name {
        "Right" => Some(Scancode::Right),
        "Left" => Some(Scancode::Left),
        "Up" => Some(Scancode::Up),
        "Down" => Some(Scancode::Down),
        "A" => Some(Scancode::X),
        "B" => Some(Scancode::Z),
        "Select" => Some(Scancode::RShift),
        "Start" => Some(Scancode::Return),
        _ => None,
    }
}

fn config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("gameboy").join("keymap.toml"))
}

/// Build the key map from `<config_dir>/gameboy/keymap.toml`, writing the
/// defaults there on first run. Falls back to defaults when the config
/// directory is unavailable or the file does not parse.
pub fn load_key_map(buttons: &[InputButton]) -> KeyMap {
    let config = config_path()
        .and_then(|path| {
            if let Ok(text) = std::fs::read_to_string(&path) {
                match toml::from_str::<KeyMapConfig>(&text) {
                    Ok(config) => return Some(config),
                    Err(err) => {
                        eprintln!("warning: ignoring malformed {}: {err}", path.display());
                        return None;
                    }
                }
            }
            // First run: persist the defaults so they can be edited.
            let config = KeyMapConfig::default_for(buttons);
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(text) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(&path, text);
            }
            Some(config)
        })
        .unwrap_or_else(|| KeyMapConfig::default_for(buttons));

    let mut key_map = KeyMap::new();
    for button in buttons {
        let scancode = config
            .bindings
            .get(button.name)
            .and_then(|name| Scancode::from_name(name))
            .or_else(|| default_scancode(button.name));
        if let Some(scancode) = scancode {
            key_map.bind(scancode, button.id);
        }
    }
    key_map
}
