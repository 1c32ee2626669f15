use crate::core::Bus;
use crate::cpu::sm83::{ExecState, Flag, Sm83};

impl Sm83 {
    // --- Flag-updating primitives ---

    fn add_a(&mut self, val: u8, use_carry: bool) {
        let carry = (use_carry && self.flag(Flag::C)) as u8;
        let res = self.a as u16 + val as u16 + carry as u16;
        self.set_flag(Flag::Z, res as u8 == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, (self.a & 0x0F) + (val & 0x0F) + carry > 0x0F);
        self.set_flag(Flag::C, res > 0xFF);
        self.a = res as u8;
    }

    /// SUB/SBC/CP share the borrow flags; CP skips the writeback.
    fn sub_a(&mut self, val: u8, use_carry: bool, writeback: bool) {
        let carry = (use_carry && self.flag(Flag::C)) as u8;
        let res = self.a.wrapping_sub(val).wrapping_sub(carry);
        self.set_flag(Flag::Z, res == 0);
        self.set_flag(Flag::N, true);
        self.set_flag(Flag::H, (self.a & 0x0F) < (val & 0x0F) + carry);
        self.set_flag(Flag::C, (self.a as u16) < val as u16 + carry as u16);
        if writeback {
            self.a = res;
        }
    }

    fn logic_a(&mut self, res: u8, is_and: bool) {
        self.a = res;
        self.set_flag(Flag::Z, res == 0);
        self.set_flag(Flag::N, false);
        self.set_flag(Flag::H, is_and);
        self.set_flag(Flag::C, false);
    }

    /// Dispatch on the yyy field of the 10-yyy-zzz / 11-yyy-110 encodings.
    fn alu_dispatch(&mut self, yyy: u8, val: u8) {
        match yyy {
            0 => self.add_a(val, false),
            1 => self.add_a(val, true),
            2 => self.sub_a(val, false, true),
            3 => self.sub_a(val, true, true),
            4 => self.logic_a(self.a & val, true),
            5 => self.logic_a(self.a ^ val, false),
            6 => self.logic_a(self.a | val, false),
            7 => self.sub_a(val, false, false),
            _ => unreachable!("alu operation index {yyy} out of range"),
        }
    }

    /// INC r / DEC r leave the carry untouched.
    fn inc_dec_x8(&mut self, val: u8) -> u8 {
        if self.opcode & 0x01 != 0 {
            let res = val.wrapping_sub(1);
            self.set_flag(Flag::Z, res == 0);
            self.set_flag(Flag::N, true);
            self.set_flag(Flag::H, val & 0x0F == 0x00);
            res
        } else {
            let res = val.wrapping_add(1);
            self.set_flag(Flag::Z, res == 0);
            self.set_flag(Flag::N, false);
            self.set_flag(Flag::H, val & 0x0F == 0x0F);
            res
        }
    }

    /// 8-bit arithmetic/logic family.
    pub(crate) fn exec_alu8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        let yyy = (self.opcode >> 3) & 0x07;
        let zzz = self.opcode & 0x07;

        match self.opcode {
            // INC/DEC r — 1 M, or 3 M for (HL) (read-modify-write)
            op if (op & 0xC6) == 0x04 => {
                if yyy != 6 {
                    let val = self.read_r8(bus, yyy);
                    let res = self.inc_dec_x8(val);
                    self.write_r8(bus, yyy, res);
                } else {
                    match self.state {
                        ExecState::Fetch => self.state = ExecState::M2,
                        ExecState::M2 => {
                            self.t8 = self.read_r8(bus, yyy);
                            self.state = ExecState::M3;
                        }
                        ExecState::M3 => {
                            let res = self.inc_dec_x8(self.t8);
                            self.write_r8(bus, yyy, res);
                            self.state = ExecState::Fetch;
                        }
                        _ => unreachable!("invalid state for INC/DEC (HL)"),
                    }
                }
            }

            // Accumulator rotates — 1 M, Z always cleared
            0x07 => {
                let a = self.a;
                self.a = a << 1 | a >> 7;
                self.set_f(0);
                self.set_flag(Flag::C, a & 0x80 != 0);
            }
            0x0F => {
                let a = self.a;
                self.a = a >> 1 | a << 7;
                self.set_f(0);
                self.set_flag(Flag::C, a & 0x01 != 0);
            }
            0x17 => {
                let a = self.a;
                self.a = a << 1 | self.flag(Flag::C) as u8;
                self.set_f(0);
                self.set_flag(Flag::C, a & 0x80 != 0);
            }
            0x1F => {
                let a = self.a;
                self.a = a >> 1 | (self.flag(Flag::C) as u8) << 7;
                self.set_f(0);
                self.set_flag(Flag::C, a & 0x01 != 0);
            }

            // DAA — BCD fixup after an addition or subtraction
            0x27 => {
                let mut correction = 0u8;
                if self.flag(Flag::H) || (!self.flag(Flag::N) && self.a & 0x0F > 0x09) {
                    correction |= 0x06;
                }
                if self.flag(Flag::C) || (!self.flag(Flag::N) && self.a > 0x99) {
                    correction |= 0x60;
                    self.set_flag(Flag::C, true);
                }
                self.a = if self.flag(Flag::N) {
                    self.a.wrapping_sub(correction)
                } else {
                    self.a.wrapping_add(correction)
                };
                self.set_flag(Flag::H, false);
                self.set_flag(Flag::Z, self.a == 0);
            }

            0x2F => {
                self.a = !self.a;
                self.set_flag(Flag::N, true);
                self.set_flag(Flag::H, true);
            }
            0x37 => {
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, false);
                self.set_flag(Flag::C, true);
            }
            0x3F => {
                self.set_flag(Flag::N, false);
                self.set_flag(Flag::H, false);
                let c = self.flag(Flag::C);
                self.set_flag(Flag::C, !c);
            }

            // ALU A,r — 1 M, or 2 M for (HL)
            op if (op & 0xC0) == 0x80 => {
                if zzz != 6 {
                    let val = self.read_r8(bus, zzz);
                    self.alu_dispatch(yyy, val);
                } else {
                    match self.state {
                        ExecState::Fetch => self.state = ExecState::M2,
                        ExecState::M2 => {
                            let val = self.read_r8(bus, zzz);
                            self.alu_dispatch(yyy, val);
                            self.state = ExecState::Fetch;
                        }
                        _ => unreachable!("invalid state for ALU (HL)"),
                    }
                }
            }

            // ALU A,u8 — 2 M
            op if (op & 0xC7) == 0xC6 => match self.state {
                ExecState::Fetch => self.state = ExecState::M2,
                ExecState::M2 => {
                    let val = self.fetch(bus);
                    self.alu_dispatch(yyy, val);
                    self.state = ExecState::Fetch;
                }
                _ => unreachable!("invalid state for ALU u8"),
            },

            _ => return false,
        }
        true
    }

    /// 16-bit arithmetic family.
    pub(crate) fn exec_alu16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        match self.opcode {
            // INC rr / DEC rr — 2 M, no flags
            op if (op & 0xC7) == 0x03 => match self.state {
                ExecState::Fetch => self.state = ExecState::M2,
                ExecState::M2 => {
                    let dec = op & 0x08 != 0;
                    let delta = if dec { 0xFFFFu16 } else { 1 };
                    match (op >> 4) & 0x03 {
                        0 => self.set_bc(self.bc().wrapping_add(delta)),
                        1 => self.set_de(self.de().wrapping_add(delta)),
                        2 => self.set_hl(self.hl().wrapping_add(delta)),
                        _ => self.sp = self.sp.wrapping_add(delta),
                    }
                    self.state = ExecState::Fetch;
                }
                _ => unreachable!("invalid state for INC/DEC rr"),
            },

            // ADD HL,rr — 2 M; H from bit 11, C from bit 15, Z untouched
            op if (op & 0xCF) == 0x09 => match self.state {
                ExecState::Fetch => self.state = ExecState::M2,
                ExecState::M2 => {
                    let hl = self.hl();
                    let rhs = match (op >> 4) & 0x03 {
                        0 => self.bc(),
                        1 => self.de(),
                        2 => self.hl(),
                        _ => self.sp,
                    };
                    let sum = hl as u32 + rhs as u32;
                    self.set_flag(Flag::N, false);
                    self.set_flag(Flag::H, (hl & 0x0FFF) + (rhs & 0x0FFF) > 0x0FFF);
                    self.set_flag(Flag::C, sum > 0xFFFF);
                    self.set_hl(sum as u16);
                    self.state = ExecState::Fetch;
                }
                _ => unreachable!("invalid state for ADD HL,rr"),
            },

            // ADD SP,i8 — 4 M; LD HL,SP+i8 — 3 M.
            // Flags come from the unsigned addition of the low bytes.
            0xE8 | 0xF8 => match self.state {
                ExecState::Fetch => self.state = ExecState::M2,
                ExecState::M2 => {
                    self.t8 = self.fetch(bus);
                    self.state = ExecState::M3;
                }
                ExecState::M3 => {
                    self.t16 = self.sp;
                    self.t16b = self.t8 as i8 as i16 as u16;
                    self.set_flag(Flag::Z, false);
                    self.set_flag(Flag::N, false);
                    self.set_flag(Flag::H, (self.t16 & 0x0F) + (self.t16b & 0x0F) > 0x0F);
                    self.set_flag(Flag::C, (self.t16 & 0xFF) + (self.t16b & 0xFF) > 0xFF);
                    if self.opcode == 0xE8 {
                        self.state = ExecState::M4;
                    } else {
                        self.set_hl(self.t16.wrapping_add(self.t16b));
                        self.state = ExecState::Fetch;
                    }
                }
                ExecState::M4 => {
                    self.sp = self.t16.wrapping_add(self.t16b);
                    self.state = ExecState::Fetch;
                }
                _ => unreachable!("invalid state for ADD SP,i8"),
            },

            _ => return false,
        }
        true
    }
}
