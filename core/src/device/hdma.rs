//! VRAM DMA engine (color tier): general-purpose transfers freeze the CPU
//! and move 16 bytes per 32 T-cycles; HBlank-paced transfers move one
//! 16-byte chunk per HBlank. The byte movement itself runs at system-bus
//! level, which is the only component that can read an arbitrary source.

use crate::device::ppu::PpuMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransferMode {
    GeneralPurpose,
    HBlank,
}

pub struct Hdma {
    hdma1: u8,
    hdma2: u8,
    hdma3: u8,
    hdma4: u8,
    hdma5: u8,

    src: u16,
    dst: u16,
    length: u16,
    transferred: u16,
    mode: TransferMode,
    cycles_to_wait: u8,
    chunk_pending: bool,
    waiting_after_chunk: bool,
    transferring: bool,
    prev_ppu_mode: PpuMode,
}

impl Default for Hdma {
    fn default() -> Self {
        Self::new()
    }
}

impl Hdma {
    pub fn new() -> Self {
        Self {
            hdma1: 0,
            hdma2: 0,
            hdma3: 0,
            hdma4: 0,
            hdma5: 0x80, // transfer not active
            src: 0,
            dst: 0,
            length: 0,
            transferred: 0,
            mode: TransferMode::GeneralPurpose,
            cycles_to_wait: 0,
            chunk_pending: false,
            waiting_after_chunk: false,
            transferring: false,
            prev_ppu_mode: PpuMode::OamScan,
        }
    }

    /// Register file offsets 0..=4: HDMA1..HDMA5.
    pub fn read(&self, offset: u16) -> u8 {
        match offset {
            0 => self.hdma1,
            1 => self.hdma2,
            2 => self.hdma3,
            3 => self.hdma4,
            4 => self.hdma5,
            _ => unreachable!("hdma register offset {offset} out of range"),
        }
    }

    pub fn write(&mut self, offset: u16, data: u8) {
        match offset {
            0 => self.hdma1 = data,
            1 => self.hdma2 = data & 0xF0,
            2 => self.hdma3 = data,
            3 => self.hdma4 = data & 0xF0,
            4 => self.write_control(data),
            _ => unreachable!("hdma register offset {offset} out of range"),
        }
    }

    fn write_control(&mut self, data: u8) {
        // Clearing bit 7 mid-transfer cancels an HBlank transfer, leaving
        // the remaining chunk count readable.
        if self.transferring && data & 0x80 == 0 {
            self.transferring = false;
            self.waiting_after_chunk = false;
            self.chunk_pending = false;
            self.hdma5 = 0x80 | self.remaining_chunks_field();
            return;
        }

        self.mode = if data & 0x80 != 0 {
            TransferMode::HBlank
        } else {
            TransferMode::GeneralPurpose
        };
        self.length = ((data & 0x7F) as u16 + 1) * 0x10;
        self.transferred = 0;
        self.src = (self.hdma1 as u16) << 8 | self.hdma2 as u16;
        // The destination always lands in VRAM.
        self.dst = ((self.hdma3 as u16 | 0x80) & 0x9F) << 8 | self.hdma4 as u16;
        self.cycles_to_wait = 32;
        self.chunk_pending = false;
        self.waiting_after_chunk = false;
        self.transferring = true;
        self.hdma5 = self.remaining_chunks_field();
    }

    fn remaining_chunks_field(&self) -> u8 {
        let remaining_chunks = (self.length - self.transferred) / 0x10;
        (remaining_chunks.wrapping_sub(1) as u8) & 0x7F
    }

    /// CPU is held off the bus while HDMA5 bit 7 reads low mid-transfer.
    pub fn cpu_paused(&self) -> bool {
        self.transferring && self.hdma5 & 0x80 == 0
    }

    /// Advance one T-cycle; yields `(src, dst)` for a 16-byte chunk the bus
    /// should copy this cycle.
    pub fn tick(&mut self, ppu_mode: PpuMode) -> Option<(u16, u16)> {
        // Each OAM-scan entry arms one chunk for the following HBlank.
        if self.transferring
            && self.mode == TransferMode::HBlank
            && ppu_mode == PpuMode::OamScan
            && self.prev_ppu_mode != PpuMode::OamScan
        {
            self.chunk_pending = true;
        }
        self.prev_ppu_mode = ppu_mode;

        if !self.transferring {
            return None;
        }

        match self.mode {
            TransferMode::GeneralPurpose => {
                if self.cycles_to_wait > 0 {
                    self.cycles_to_wait -= 1;
                    return None;
                }
                Some(self.take_chunk())
            }
            TransferMode::HBlank => {
                if self.waiting_after_chunk {
                    if self.cycles_to_wait > 0 {
                        self.cycles_to_wait -= 1;
                    } else {
                        self.waiting_after_chunk = false;
                        self.hdma5 |= 0x80;
                    }
                    return None;
                }
                if ppu_mode == PpuMode::HBlank && self.chunk_pending {
                    self.chunk_pending = false;
                    self.hdma5 &= 0x7F;
                    Some(self.take_chunk())
                } else {
                    None
                }
            }
        }
    }

    fn take_chunk(&mut self) -> (u16, u16) {
        let chunk = (self.src + self.transferred, self.dst + self.transferred);
        self.transferred += 0x10;

        if self.transferred == self.length {
            self.transferring = false;
            self.waiting_after_chunk = false;
            self.hdma5 = 0xFF;
        } else {
            self.hdma5 = (self.hdma5 & 0x80) | self.remaining_chunks_field();
            self.cycles_to_wait = 32;
            if self.mode == TransferMode::HBlank {
                self.waiting_after_chunk = true;
            }
        }

        chunk
    }
}
