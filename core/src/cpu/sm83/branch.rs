use crate::core::Bus;
use crate::cpu::sm83::{ExecState, Sm83};

impl Sm83 {
    /// NOP, STOP, HALT, DI, EI.
    pub(crate) fn exec_control_misc<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        match self.opcode {
            0x00 => true, // NOP
            0x10 => {
                self.stop_handler(bus);
                true
            }
            0x76 => {
                self.halt_handler(bus);
                true
            }
            0xF3 => {
                // DI also cancels a not-yet-effective EI.
                self.ime = false;
                self.ei_delay = 0;
                true
            }
            0xFB => {
                self.ei_delay = 2;
                true
            }
            _ => false,
        }
    }

    /// Jumps, calls, returns, restarts.
    pub(crate) fn exec_control_branch<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        match self.opcode {
            // JR i8 — 3 M
            0x18 => self.op_jr(bus, false),
            // JR cc,i8 — 3/2 M
            op if (op & 0xE7) == 0x20 => self.op_jr(bus, true),
            // RET cc — 5/2 M
            op if (op & 0xE7) == 0xC0 => self.op_ret_cc(bus),
            // JP u16 — 4 M; JP cc,u16 — 4/3 M
            0xC3 => self.op_jp(bus, false),
            op if (op & 0xE7) == 0xC2 => self.op_jp(bus, true),
            // CALL u16 — 6 M; CALL cc,u16 — 6/3 M
            0xCD => self.op_call(bus, false),
            op if (op & 0xE7) == 0xC4 => self.op_call(bus, true),
            // RST — 4 M
            op if (op & 0xC7) == 0xC7 => self.op_rst(bus),
            // RET / RETI — 4 M
            0xC9 | 0xD9 => self.op_ret(bus),
            // JP HL — 1 M
            0xE9 => {
                self.pc = self.hl();
                true
            }
            _ => return false,
        }
    }

    fn op_jr<B: Bus + ?Sized>(&mut self, bus: &mut B, conditional: bool) -> bool {
        match self.state {
            ExecState::Fetch => self.state = ExecState::M2,
            ExecState::M2 => {
                let offset = self.fetch(bus);
                self.t16 = offset as i8 as i16 as u16;
                if !conditional || self.jump_condition(self.opcode) {
                    self.state = ExecState::M3;
                } else {
                    self.state = ExecState::Fetch;
                }
            }
            ExecState::M3 => {
                self.pc = self.pc.wrapping_add(self.t16);
                self.state = ExecState::Fetch;
            }
            _ => unreachable!("invalid state for JR"),
        }
        true
    }

    fn op_ret_cc<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        match self.state {
            ExecState::Fetch => self.state = ExecState::M2,
            ExecState::M2 => {
                self.state = if self.jump_condition(self.opcode) {
                    ExecState::M3
                } else {
                    ExecState::Fetch
                };
            }
            ExecState::M3 => {
                self.t16 = bus.read(self.sp) as u16;
                self.sp = self.sp.wrapping_add(1);
                self.state = ExecState::M4;
            }
            ExecState::M4 => {
                self.t16 |= (bus.read(self.sp) as u16) << 8;
                self.sp = self.sp.wrapping_add(1);
                self.state = ExecState::M5;
            }
            ExecState::M5 => {
                self.pc = self.t16;
                self.state = ExecState::Fetch;
            }
            _ => unreachable!("invalid state for RET cc"),
        }
        true
    }

    fn op_jp<B: Bus + ?Sized>(&mut self, bus: &mut B, conditional: bool) -> bool {
        match self.state {
            ExecState::Fetch => self.state = ExecState::M2,
            ExecState::M2 => {
                self.t16 = self.fetch(bus) as u16;
                self.state = ExecState::M3;
            }
            ExecState::M3 => {
                self.t16 |= (self.fetch(bus) as u16) << 8;
                if !conditional || self.jump_condition(self.opcode) {
                    self.state = ExecState::M4;
                } else {
                    self.state = ExecState::Fetch;
                }
            }
            ExecState::M4 => {
                self.pc = self.t16;
                self.state = ExecState::Fetch;
            }
            _ => unreachable!("invalid state for JP"),
        }
        true
    }

    fn op_call<B: Bus + ?Sized>(&mut self, bus: &mut B, conditional: bool) -> bool {
        match self.state {
            ExecState::Fetch => self.state = ExecState::M2,
            ExecState::M2 => {
                self.t16 = self.fetch(bus) as u16;
                self.state = ExecState::M3;
            }
            ExecState::M3 => {
                self.t16 |= (self.fetch(bus) as u16) << 8;
                if !conditional || self.jump_condition(self.opcode) {
                    self.state = ExecState::M4;
                } else {
                    self.state = ExecState::Fetch;
                }
            }
            ExecState::M4 => self.state = ExecState::M5,
            ExecState::M5 => {
                self.sp = self.sp.wrapping_sub(1);
                bus.write(self.sp, (self.pc >> 8) as u8);
                self.state = ExecState::M6;
            }
            ExecState::M6 => {
                self.sp = self.sp.wrapping_sub(1);
                bus.write(self.sp, self.pc as u8);
                self.pc = self.t16;
                self.state = ExecState::Fetch;
            }
            _ => unreachable!("invalid state for CALL"),
        }
        true
    }

    fn op_rst<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        match self.state {
            ExecState::Fetch => self.state = ExecState::M2,
            ExecState::M2 => {
                self.t8 = (self.opcode >> 3) & 0x07;
                self.state = ExecState::M3;
            }
            ExecState::M3 => {
                self.sp = self.sp.wrapping_sub(1);
                bus.write(self.sp, (self.pc >> 8) as u8);
                self.state = ExecState::M4;
            }
            ExecState::M4 => {
                self.sp = self.sp.wrapping_sub(1);
                bus.write(self.sp, self.pc as u8);
                self.pc = self.t8 as u16 * 8;
                self.state = ExecState::Fetch;
            }
            _ => unreachable!("invalid state for RST"),
        }
        true
    }

    fn op_ret<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        match self.state {
            ExecState::Fetch => self.state = ExecState::M2,
            ExecState::M2 => {
                self.t16 = bus.read(self.sp) as u16;
                self.sp = self.sp.wrapping_add(1);
                self.state = ExecState::M3;
            }
            ExecState::M3 => {
                self.t16 |= (bus.read(self.sp) as u16) << 8;
                self.sp = self.sp.wrapping_add(1);
                self.state = ExecState::M4;
            }
            ExecState::M4 => {
                self.pc = self.t16;
                // RETI enables interrupts on the same cycle, without delay.
                if self.opcode == 0xD9 {
                    self.ime = true;
                }
                self.state = ExecState::Fetch;
            }
            _ => unreachable!("invalid state for RET"),
        }
        true
    }
}
