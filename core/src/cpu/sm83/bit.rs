use crate::core::Bus;
use crate::cpu::sm83::{ExecState, Flag, Sm83};

impl Sm83 {
    /// CB-prefixed rotate/shift/bit family.
    ///
    /// Register forms take 2 M-cycles (prefix fetch + sub-opcode fetch and
    /// execute). (HL) forms take 4 M-cycles for read-modify-write ops and 3
    /// for BIT, which only reads. Entered with the sub-opcode already
    /// latched when the state is `Cb2`.
    pub(crate) fn exec_rsb<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let yyy = (self.opcode >> 3) & 0x07;
        let zzz = self.opcode & 0x07;
        let is_bit = self.opcode & 0xC0 == 0x40;

        if zzz != 6 {
            // Register operand: execute in the sub-opcode fetch cycle.
            self.t8 = self.read_r8(bus, zzz);
            self.state = ExecState::Cb4;
        } else {
            match self.state {
                ExecState::Cb2 => {
                    // BIT never writes back, so it skips the write cycle.
                    self.state = if is_bit { ExecState::Cb4 } else { ExecState::Cb3 };
                    return;
                }
                ExecState::Cb3 => {
                    self.t8 = self.read_r8(bus, zzz);
                    self.state = ExecState::Cb4;
                    return;
                }
                _ => {}
            }
        }

        debug_assert_eq!(self.state, ExecState::Cb4, "invalid state for CB op");

        // For a 3-M-cycle BIT (HL), the final cycle is also the read.
        if is_bit && zzz == 6 {
            self.t8 = self.read_r8(bus, zzz);
        }

        let val = self.t8;

        // Rotates and shifts (block 0) all clear N and H.
        if self.opcode & 0xC0 == 0x00 {
            self.set_flag(Flag::N, false);
            self.set_flag(Flag::H, false);
        }

        match self.opcode {
            // RLC
            op if op & 0xF8 == 0x00 => {
                let res = val << 1 | val >> 7;
                self.set_flag(Flag::C, val & 0x80 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // RRC
            op if op & 0xF8 == 0x08 => {
                let res = val >> 1 | val << 7;
                self.set_flag(Flag::C, val & 0x01 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // RL
            op if op & 0xF8 == 0x10 => {
                let res = val << 1 | self.flag(Flag::C) as u8;
                self.set_flag(Flag::C, val & 0x80 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // RR
            op if op & 0xF8 == 0x18 => {
                let res = val >> 1 | (self.flag(Flag::C) as u8) << 7;
                self.set_flag(Flag::C, val & 0x01 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // SLA
            op if op & 0xF8 == 0x20 => {
                let res = val << 1;
                self.set_flag(Flag::C, val & 0x80 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // SRA — arithmetic: bit 7 is preserved
            op if op & 0xF8 == 0x28 => {
                let res = (val & 0x80) | val >> 1;
                self.set_flag(Flag::C, val & 0x01 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // SWAP
            op if op & 0xF8 == 0x30 => {
                let res = val << 4 | val >> 4;
                self.set_flag(Flag::C, false);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // SRL
            op if op & 0xF8 == 0x38 => {
                let res = val >> 1;
                self.set_flag(Flag::C, val & 0x01 != 0);
                self.set_flag(Flag::Z, res == 0);
                self.write_r8(bus, zzz, res);
            }
            // BIT n — flags only
            op if op & 0xC0 == 0x40 => {
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, true);
                self.set_flag(Flag::Z, val & (1 << yyy) == 0);
            }
            // RES n / SET n — no flags
            _ => {
                let res = if self.opcode & 0x40 != 0 {
                    val | 1 << yyy
                } else {
                    val & !(1 << yyy)
                };
                self.write_r8(bus, zzz, res);
            }
        }

        self.state = ExecState::Fetch;
    }
}
