use std::fmt;

/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "A", "Start").
    pub name: &'static str,
}

/// Events a frame of emulation can surface to the frontend.
#[derive(Default, Debug)]
pub struct FrameEvents {
    /// Bytes the game pushed out of the serial port (debug sink).
    pub serial: Vec<u8>,
}

/// Machine-agnostic interface for emulated systems.
///
/// The frontend is a pure rendering engine that does not know about specific
/// hardware (PPU modes, bank controllers, palette formats). Each machine
/// implements this trait to provide a uniform surface.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Run one frame of emulation (advance the clock by one frame's worth of
    /// cycles). Fatal core errors (invalid opcode) surface here instead of
    /// panicking.
    fn run_frame(&mut self) -> Result<FrameEvents, MachineError>;

    /// Render the current video state into an RGB24 pixel buffer.
    ///
    /// The buffer must be at least `width * height * 3` bytes (from
    /// `display_size()`), left-to-right, top-to-bottom, 3 bytes per pixel.
    fn render_frame(&self, buffer: &mut [u8]);

    /// Handle an input event. `button` is a machine-defined ID from
    /// `input_map()`. Called per-event; each call latches the button state so
    /// that `run_frame()` sees the accumulated input.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// The list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Move buffered audio samples (interleaved L/R, i16) into `buffer`.
    /// Returns the number of samples written.
    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize;

    /// Output sample rate in Hz, or 0 if the machine has no audio.
    fn audio_sample_rate(&self) -> u32;

    /// Flush battery-backed state to disk (clean-exit hook).
    fn flush_persistent(&mut self);

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);
}

/// Fatal machine-level failures. These indicate either a defect in the
/// emulator or a cartridge the emulator refuses to run, never a recoverable
/// in-game condition.
#[derive(Debug)]
pub enum MachineError {
    /// The CPU fetched one of the 11 unused opcodes. Real hardware locks up;
    /// failing loudly is the more useful signal.
    InvalidOpcode { opcode: u8, pc: u16 },
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::InvalidOpcode { opcode, pc } => {
                write!(f, "invalid opcode {opcode:#04x} fetched at {pc:#06x}")
            }
        }
    }
}

impl std::error::Error for MachineError {}
