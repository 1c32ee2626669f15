//! The assembled Game Boy: every addressable component behind a single
//! decoded bus, a fixed-order clock fan-out, and the `Machine` facade the
//! front end drives.

use std::fmt;

use gameboy_core::core::bus::{Bus, BusError, BusMap, Region};
use gameboy_core::core::machine::{FrameEvents, InputButton, Machine, MachineError};
use gameboy_core::cpu::sm83::{ExecError, Sm83};
use gameboy_core::cpu::{Cpu, CpuStateTrait, Sm83State};
use gameboy_core::device::cartridge::{BOOT_ROM, Cartridge, CartridgeError};
use gameboy_core::device::cram::ColorRam;
use gameboy_core::device::joypad::{
    BTN_A, BTN_B, BTN_DOWN, BTN_LEFT, BTN_RIGHT, BTN_SELECT, BTN_START, BTN_UP, Joypad,
};
use gameboy_core::device::ppu::{OamDma, Ppu, PpuBus, SCREEN_HEIGHT, SCREEN_WIDTH};
use gameboy_core::device::{Apu, Hdma, Memory, Serial, Timer, WorkRam};

use crate::registry::MachineEntry;
use crate::rom_loader::RomImage;

pub const BUS_FREQUENCY: u32 = 4_194_304;
const CPU_FREQUENCY: u32 = BUS_FREQUENCY / 4;
const JOYPAD_FREQUENCY: u32 = 1024;

const JOYPAD_PERIOD: u64 = (BUS_FREQUENCY / JOYPAD_FREQUENCY) as u64;

/// Upper bound on T-cycles per `run_frame` call, a hair above the nominal
/// frame so the loop still returns while the LCD is switched off.
const MAX_FRAME_CYCLES: u32 = 90_000;

const AUDIO_SAMPLE_RATE: u32 = 48_000;

// IF/IE bit order: VBlank, LCD-STAT, Timer, Serial, Joypad.
const IF_VBLANK: u8 = 0x01;
const IF_LCD: u8 = 0x02;
const IF_TIMER: u8 = 0x04;
const IF_SERIAL: u8 = 0x08;
const IF_JOYPAD: u8 = 0x10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Model {
    /// Original four-shade hardware (DMG).
    Classic,
    /// Color hardware: VRAM/WRAM banking, palette RAM, HDMA, double speed.
    Color,
}

#[derive(Debug)]
pub enum BuildError {
    Cartridge(CartridgeError),
    Bus(BusError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Cartridge(err) => write!(f, "{err}"),
            BuildError::Bus(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<CartridgeError> for BuildError {
    fn from(err: CartridgeError) -> Self {
        BuildError::Cartridge(err)
    }
}

impl From<BusError> for BuildError {
    fn from(err: BusError) -> Self {
        BuildError::Bus(err)
    }
}

/// Everything on the memory bus. The CPU lives outside, in [`GameBoy`], so
/// it can borrow the whole bus mutably during its step.
pub struct SystemBus {
    model: Model,

    cart: Cartridge,
    wram: WorkRam,
    oam: Memory,
    hram: Memory,
    ppu: Ppu,
    oam_dma: OamDma,
    apu: Apu,
    timer: Timer,
    serial: Serial,
    joypad: Joypad,
    hdma: Hdma,
    cram: ColorRam,

    if_reg: u8,
    ie_reg: u8,
    brom_en: u8,
    vbk: u8,
    svbk: u8,
    key1: u8,

    double_speed: bool,
    cycles: u64,
    frame_ready: bool,

    map: BusMap,
}

impl SystemBus {
    pub fn new(cart: Cartridge, model: Model) -> Result<Self, BusError> {
        let map = Self::build_map(model)?;
        let color = model == Model::Color;
        Ok(Self {
            model,
            cart,
            wram: WorkRam::new(),
            oam: Memory::new(0xA0),
            hram: Memory::new(0x7F),
            ppu: Ppu::new(),
            oam_dma: OamDma::new(),
            apu: Apu::new(color),
            timer: Timer::new(),
            serial: Serial::new(),
            joypad: Joypad::new(),
            hdma: Hdma::new(),
            cram: ColorRam::new(),
            if_reg: 0x01,
            ie_reg: 0x00,
            brom_en: 0,
            vbk: 0,
            svbk: 0,
            key1: 0,
            double_speed: false,
            cycles: 0,
            frame_ready: false,
            map,
        })
    }

    /// Register every component's address range and clock; overlaps and
    /// frequencies that do not divide the bus clock are construction-time
    /// errors.
    fn build_map(model: Model) -> Result<BusMap, BusError> {
        let mut map = BusMap::new(BUS_FREQUENCY);
        map.register(Region::new("CART_ROM", 0x0000, 0x8000, 0))?;
        map.register(Region::new("VRAM", 0x8000, 0x2000, 0))?;
        map.register(Region::new("CART_RAM", 0xA000, 0x2000, 0))?;
        map.register(Region::new("WRAM", 0xC000, 0x2000, 0))?;
        map.register(Region::new("OAM", 0xFE00, 0xA0, 0))?;
        map.register(Region::new("JOYPAD", 0xFF00, 1, JOYPAD_FREQUENCY))?;
        map.register(Region::new("SERIAL", 0xFF01, 2, BUS_FREQUENCY))?;
        map.register(Region::new("TIMER", 0xFF04, 4, BUS_FREQUENCY))?;
        map.register(Region::new("IF_REG", 0xFF0F, 1, 0))?;
        map.register(Region::new("APU", 0xFF10, 0x30, BUS_FREQUENCY))?;
        map.register(Region::new("PPU", 0xFF40, 12, BUS_FREQUENCY))?;
        map.register(Region::new("BROM_EN", 0xFF50, 1, 0))?;
        map.register(Region::new("HRAM", 0xFF80, 0x7F, 0))?;
        map.register(Region::new("IE_REG", 0xFFFF, 1, 0))?;
        map.register(Region::new("CPU", 0x0000, 0, CPU_FREQUENCY))?;
        if model == Model::Color {
            map.register(Region::new("KEY1", 0xFF4D, 1, 0))?;
            map.register(Region::new("VBK", 0xFF4F, 1, 0))?;
            map.register(Region::new("HDMA", 0xFF51, 5, BUS_FREQUENCY))?;
            map.register(Region::new("CRAM", 0xFF68, 4, 0))?;
            map.register(Region::new("SVBK", 0xFF70, 1, 0))?;
        }
        Ok(map)
    }

    pub fn bus_map(&self) -> &BusMap {
        &self.map
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cart
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    /// Drain the serial debug sink directly (tests; the frontend receives
    /// the same bytes through `FrameEvents`).
    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }

    fn color(&self) -> bool {
        self.model == Model::Color
    }

    fn vram_bank(&self) -> u8 {
        if self.color() { self.vbk & 1 } else { 0 }
    }

    /// One T-cycle for every peripheral, in the fixed order that lets the
    /// CPU (stepped afterwards) observe same-tick IF updates.
    fn step_peripherals(&mut self) {
        // OAM DMA moves one byte per M-cycle alongside PPU stepping.
        if let Some((src, oam_offset)) = self.oam_dma.tick() {
            let data = self.read(src);
            self.oam.write(oam_offset, data);
        }

        let events = {
            let SystemBus { ppu, oam, cart, cram, model, .. } = self;
            let ctx = PpuBus {
                oam: oam.as_slice(),
                vram: cart.vram(),
                cram,
                color_mode: *model == Model::Color,
            };
            ppu.step(&ctx)
        };
        if events.vblank_irq {
            self.if_reg |= IF_VBLANK;
        }
        if events.stat_irq {
            self.if_reg |= IF_LCD;
        }
        if events.frame_ready {
            self.frame_ready = true;
        }

        self.apu.step(self.timer.div_high());

        if self.timer.step() {
            self.if_reg |= IF_TIMER;
        }

        if self.color()
            && let Some((src, dst)) = self.hdma.tick(self.ppu.mode())
        {
            for i in 0..0x10u16 {
                let data = self.read(src.wrapping_add(i));
                self.write(dst.wrapping_add(i), data);
            }
        }

        if self.cycles % JOYPAD_PERIOD == 0 && self.joypad.step() {
            self.if_reg |= IF_JOYPAD;
        }

        if self.serial.step() {
            self.if_reg |= IF_SERIAL;
        }
    }

    /// Power-on state for everything except cartridge ROM/RAM contents.
    fn reset(&mut self) {
        let color = self.color();
        self.cart.reset_banking();
        self.wram = WorkRam::new();
        self.oam = Memory::new(0xA0);
        self.hram = Memory::new(0x7F);
        self.ppu = Ppu::new();
        self.oam_dma = OamDma::new();
        self.apu = Apu::new(color);
        self.timer = Timer::new();
        self.serial = Serial::new();
        self.joypad = Joypad::new();
        self.hdma = Hdma::new();
        self.cram = ColorRam::new();
        self.if_reg = 0x01;
        self.ie_reg = 0;
        self.brom_en = 0;
        self.vbk = 0;
        self.svbk = 0;
        self.key1 = 0;
        self.double_speed = false;
        self.cycles = 0;
        self.frame_ready = false;
    }
}

impl Bus for SystemBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // Boot-ROM overlay, visible until software writes 0xFF50.
            0x0000..=0x00FF if self.brom_en == 0 => BOOT_ROM[addr as usize],
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cart.read(addr),
            0x8000..=0x9FFF => self.cart.read_vram(self.vram_bank(), addr - 0x8000),
            0xC000..=0xDFFF => self.wram.read(addr - 0xC000, self.svbk),
            0xFE00..=0xFE9F => self.oam.read(addr - 0xFE00),
            0xFF00 => self.joypad.read(),
            0xFF01..=0xFF02 => self.serial.read(addr - 0xFF01),
            0xFF04..=0xFF07 => self.timer.read(addr - 0xFF04),
            0xFF0F => self.if_reg | 0xE0,
            0xFF10..=0xFF3F => self.apu.read(addr - 0xFF10),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr - 0xFF40),
            0xFF4D if self.color() => {
                (self.double_speed as u8) << 7 | 0x7E | (self.key1 & 0x01)
            }
            0xFF4F if self.color() => self.vbk | 0xFE,
            0xFF50 => self.brom_en,
            0xFF51..=0xFF55 if self.color() => self.hdma.read(addr - 0xFF51),
            0xFF68..=0xFF6B if self.color() => self.cram.read(addr - 0xFF68),
            0xFF70 if self.color() => self.svbk | 0xF8,
            0xFF80..=0xFFFE => self.hram.read(addr - 0xFF80),
            0xFFFF => self.ie_reg,
            // Bus float: unmapped reads are all-ones.
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cart.write(addr, data),
            0x8000..=0x9FFF => {
                let bank = self.vram_bank();
                self.cart.write_vram(bank, addr - 0x8000, data);
            }
            0xC000..=0xDFFF => self.wram.write(addr - 0xC000, data, self.svbk),
            0xFE00..=0xFE9F => self.oam.write(addr - 0xFE00, data),
            0xFF00 => self.joypad.write(data),
            0xFF01..=0xFF02 => self.serial.write(addr - 0xFF01, data),
            0xFF04..=0xFF07 => self.timer.write(addr - 0xFF04, data),
            0xFF0F => self.if_reg = data & 0x1F,
            0xFF10..=0xFF3F => self.apu.write(addr - 0xFF10, data),
            // A DMA-register write also starts the 160-byte OAM copy.
            0xFF46 => {
                let page = data.min(0xDF);
                self.ppu.write_reg(6, page);
                self.oam_dma.start(page);
            }
            0xFF40..=0xFF4B => self.ppu.write_reg(addr - 0xFF40, data),
            0xFF4D if self.color() => self.key1 = data & 0x01,
            0xFF4F if self.color() => self.vbk = data & 0x01,
            0xFF50 => self.brom_en = data,
            0xFF51..=0xFF55 if self.color() => self.hdma.write(addr - 0xFF51, data),
            0xFF68..=0xFF6B if self.color() => self.cram.write(addr - 0xFF68, data),
            0xFF70 if self.color() => self.svbk = data & 0x07,
            0xFF80..=0xFFFE => self.hram.write(addr - 0xFF80, data),
            0xFFFF => self.ie_reg = data,
            // Unmapped writes are dropped.
            _ => {}
        }
    }

    fn dma_halted(&self) -> bool {
        self.color() && self.hdma.cpu_paused()
    }

    fn speed_switch_armed(&self) -> bool {
        self.color() && self.key1 & 0x01 != 0
    }

    fn complete_speed_switch(&mut self) {
        self.double_speed = !self.double_speed;
        self.key1 = 0;
    }
}

const GAMEBOY_INPUT_MAP: &[InputButton] = &[
    InputButton { id: BTN_RIGHT, name: "Right" },
    InputButton { id: BTN_LEFT, name: "Left" },
    InputButton { id: BTN_UP, name: "Up" },
    InputButton { id: BTN_DOWN, name: "Down" },
    InputButton { id: BTN_A, name: "A" },
    InputButton { id: BTN_B, name: "B" },
    InputButton { id: BTN_SELECT, name: "Select" },
    InputButton { id: BTN_START, name: "Start" },
];

/// Game Boy / Game Boy Color (Nintendo, 1989/1998)
///
/// Hardware: Sharp SM83 @ 1.05 MiHz (M-cycles), 160×144 four-shade or
/// 15-bit-color LCD, four-channel PSG, cartridge-side bank controllers.
pub struct GameBoy {
    cpu: Sm83,
    bus: SystemBus,
}

impl GameBoy {
    /// Build from a parsed cartridge. With no forced model, the tier comes
    /// from the cartridge header.
    pub fn new(cart: Cartridge, model: Option<Model>) -> Result<Self, BuildError> {
        let model = model.unwrap_or(if cart.is_color() {
            Model::Color
        } else {
            Model::Classic
        });
        let bus = SystemBus::new(cart, model)?;
        let mut cpu = Sm83::new();
        if model == Model::Color {
            // CGB-aware games probe A == 0x11 at the entry point.
            cpu.a = 0x11;
        }
        Ok(Self { cpu, bus })
    }

    /// Convenience constructor for tests and embedding.
    pub fn from_rom_bytes(bytes: &[u8], model: Option<Model>) -> Result<Self, BuildError> {
        Self::new(Cartridge::from_bytes(bytes)?, model)
    }

    pub fn cpu(&self) -> &Sm83 {
        &self.cpu
    }

    /// Register-file snapshot (debug/tests).
    pub fn cpu_state(&self) -> Sm83State {
        self.cpu.snapshot()
    }

    pub fn cpu_mut(&mut self) -> &mut Sm83 {
        &mut self.cpu
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Advance the whole machine by one T-cycle.
    pub fn tick(&mut self) -> Result<(), ExecError> {
        self.bus.step_peripherals();

        // CPU at M-cycle rate; double speed halves the divisor.
        let divisor = if self.bus.double_speed { 2 } else { 4 };
        if self.bus.cycles % divisor == 0 {
            self.cpu.step(&mut self.bus)?;
        }

        self.bus.cycles += 1;
        Ok(())
    }

    /// Advance by whole M-cycles (4 T-cycles each).
    pub fn step_m_cycles(&mut self, m_cycles: u32) -> Result<(), ExecError> {
        for _ in 0..m_cycles * 4 {
            self.tick()?;
        }
        Ok(())
    }
}

impl Machine for GameBoy {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
    }

    fn run_frame(&mut self) -> Result<FrameEvents, MachineError> {
        self.bus.frame_ready = false;

        // Bounded so the loop still returns while the LCD is off (the PPU
        // only presents the one-shot white frame in that state).
        for _ in 0..MAX_FRAME_CYCLES {
            self.tick().map_err(|err| match err {
                ExecError::InvalidOpcode { opcode, pc } => {
                    MachineError::InvalidOpcode { opcode, pc }
                }
            })?;
            if self.bus.frame_ready {
                break;
            }
        }

        Ok(FrameEvents {
            serial: self.bus.serial.take_output(),
        })
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        for (pixel, out) in self.bus.ppu.framebuffer().iter().zip(buffer.chunks_exact_mut(3)) {
            out[0] = (pixel >> 16) as u8;
            out[1] = (pixel >> 8) as u8;
            out[2] = *pixel as u8;
        }
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        self.bus.joypad.set_pressed(button, pressed);
    }

    fn input_map(&self) -> &[InputButton] {
        GAMEBOY_INPUT_MAP
    }

    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize {
        self.bus.apu.drain_samples(buffer)
    }

    fn audio_sample_rate(&self) -> u32 {
        AUDIO_SAMPLE_RATE
    }

    fn flush_persistent(&mut self) {
        if let Err(err) = self.bus.cart.flush_save() {
            eprintln!("warning: failed to write save file: {err}");
        }
    }

    fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset();
        if self.bus.model == Model::Color {
            self.cpu.a = 0x11;
        }
    }
}

// --- Registry entries ---

fn build(rom: &RomImage, model: Option<Model>) -> Result<Box<dyn Machine>, BuildError> {
    let mut cart = Cartridge::from_bytes(&rom.bytes)?;
    cart.attach_save_file(&rom.save_path);
    Ok(Box::new(GameBoy::new(cart, model)?))
}

fn create_auto(rom: &RomImage) -> Result<Box<dyn Machine>, BuildError> {
    build(rom, None)
}

fn create_dmg(rom: &RomImage) -> Result<Box<dyn Machine>, BuildError> {
    build(rom, Some(Model::Classic))
}

fn create_cgb(rom: &RomImage) -> Result<Box<dyn Machine>, BuildError> {
    build(rom, Some(Model::Color))
}

inventory::submit! {
    MachineEntry::new("gameboy", "Game Boy, tier from the cartridge header", create_auto)
}
inventory::submit! {
    MachineEntry::new("dmg", "Game Boy forced to the classic four-shade tier", create_dmg)
}
inventory::submit! {
    MachineEntry::new("cgb", "Game Boy forced to the color tier", create_cgb)
}
