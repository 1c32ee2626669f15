use std::io::Write;
use std::time::{Duration, Instant};

use gameboy_core::core::machine::Machine;
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use crate::audio::{AudioSink, BACK_PRESSURE_FACTOR, HANDOFF_SAMPLES};
use crate::input::KeyMap;
use crate::video::Video;

/// ~59.7 Hz frame pacing for `--fixed-fps` runs.
const FRAME_DURATION: Duration = Duration::from_nanos(16_742_000);

const MAX_VOLUME: u8 = 10;

pub fn run(machine: &mut dyn Machine, key_map: &KeyMap, scale: u32, fixed_fps: bool) {
    let sdl_context = sdl2::init().expect("Failed to initialize SDL2");
    let sdl_video = sdl_context.video().expect("Failed to init SDL video");
    let sdl_audio = sdl_context.audio().expect("Failed to init SDL audio");

    let (width, height) = machine.display_size();
    let mut video = Video::new(&sdl_video, "Game Boy", width, height, scale);
    let audio = AudioSink::init(&sdl_audio, machine.audio_sample_rate());
    if let Some(audio) = &audio {
        audio.set_paused(false);
    }
    let mut event_pump = sdl_context.event_pump().expect("Failed to get event pump");

    let mut framebuffer = vec![0u8; (width * height * 3) as usize];
    let mut samples = vec![0i16; HANDOFF_SAMPLES];
    let mut volume: u8 = MAX_VOLUME;
    let mut next_frame = Instant::now();

    'main: loop {
        // Poll all pending SDL events, translate to machine input.
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'main,

                Event::KeyDown { scancode: Some(Scancode::Escape), .. } => break 'main,

                // Master volume in tenths, adjusted per key press.
                Event::KeyDown { scancode: Some(Scancode::Equals), repeat: false, .. } => {
                    volume = (volume + 1).min(MAX_VOLUME);
                }
                Event::KeyDown { scancode: Some(Scancode::Minus), repeat: false, .. } => {
                    volume = volume.saturating_sub(1);
                }

                Event::KeyDown { scancode: Some(sc), repeat: false, .. } => {
                    if let Some(button_id) = key_map.get(sc) {
                        machine.set_input(button_id, true);
                    }
                }

                Event::KeyUp { scancode: Some(sc), .. } => {
                    if let Some(button_id) = key_map.get(sc) {
                        machine.set_input(button_id, false);
                    }
                }

                _ => {}
            }
        }

        // Run one frame of emulation.
        let events = match machine.run_frame() {
            Ok(events) => events,
            Err(err) => {
                eprintln!("fatal: {err}");
                break 'main;
            }
        };

        // Serial debug sink goes to stdout (test ROMs report through it).
        if !events.serial.is_empty() {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(&events.serial);
            let _ = stdout.flush();
        }

        machine.render_frame(&mut framebuffer);
        video.present(&framebuffer);

        // Hand finished audio to the host queue, scaled by the volume keys.
        if let Some(audio) = &audio {
            loop {
                let count = machine.fill_audio(&mut samples);
                if count == 0 {
                    break;
                }
                for sample in &mut samples[..count] {
                    *sample = (*sample as i32 * volume as i32 / MAX_VOLUME as i32) as i16;
                }
                audio.queue(&samples[..count]);
            }
        }

        // Pacing: either a fixed ~59.7 Hz clock, or audio back-pressure
        // (block while the host queue is more than 2× the handoff size).
        if fixed_fps {
            next_frame += FRAME_DURATION;
            let now = Instant::now();
            if next_frame > now {
                std::thread::sleep(next_frame - now);
            } else {
                next_frame = now;
            }
        } else if let Some(audio) = &audio {
            while audio.queued_size() > BACK_PRESSURE_FACTOR * HANDOFF_SAMPLES {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    if let Some(audio) = &audio {
        audio.set_paused(true);
    }
}
