use sdl2::audio::{AudioQueue, AudioSpecDesired};

/// Stereo interleaved samples per core handoff; the emulator loop blocks
/// while more than [`BACK_PRESSURE_FACTOR`] times this amount is queued,
/// which is what paces the whole machine to real time.
pub const HANDOFF_SAMPLES: usize = 2400;
pub const BACK_PRESSURE_FACTOR: usize = 2;

/// Push-model audio sink over an SDL queue device: `queue`, `queued_size`
/// and `set_paused` are the whole contract the emulator loop needs.
pub struct AudioSink {
    device: AudioQueue<i16>,
}

impl AudioSink {
    /// Open the playback device. Returns `None` when the machine produces
    /// no audio (`sample_rate == 0`).
    pub fn init(sdl_audio: &sdl2::AudioSubsystem, sample_rate: u32) -> Option<Self> {
        if sample_rate == 0 {
            return None;
        }

        let desired_spec = AudioSpecDesired {
            freq: Some(sample_rate as i32),
            channels: Some(2),
            samples: Some(1024),
        };

        let device = sdl_audio
            .open_queue(None, &desired_spec)
            .expect("Failed to open SDL audio device");

        Some(Self { device })
    }

    pub fn queue(&self, samples: &[i16]) {
        let _ = self.device.queue_audio(samples);
    }

    /// Samples (not bytes) currently waiting in the device queue.
    pub fn queued_size(&self) -> usize {
        self.device.size() as usize / std::mem::size_of::<i16>()
    }

    pub fn set_paused(&self, paused: bool) {
        if paused {
            self.device.pause();
        } else {
            self.device.resume();
        }
    }
}
