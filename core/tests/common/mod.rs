use gameboy_core::core::Bus;

/// Flat 64 KiB RAM bus for CPU-level tests. IE/IF live at their usual
/// addresses as plain bytes, which is all the interrupt logic needs.
pub struct TestBus {
    pub mem: Vec<u8>,
}

impl TestBus {
    pub fn new() -> Self {
        Self { mem: vec![0; 0x10000] }
    }

    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        let addr = addr as usize;
        self.mem[addr..addr + bytes.len()].copy_from_slice(bytes);
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }
}
