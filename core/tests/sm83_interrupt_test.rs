use gameboy_core::core::Bus;
use gameboy_core::cpu::run_instruction;
use gameboy_core::cpu::sm83::{ExecError, Sm83};

mod common;
use common::TestBus;

const IE: usize = 0xFFFF;
const IF: usize = 0xFF0F;

fn step(cpu: &mut Sm83, bus: &mut TestBus) {
    cpu.step(bus).expect("unexpected invalid opcode");
}

// --- Dispatch ---

#[test]
fn test_dispatch_takes_five_m_cycles() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x0200;
    cpu.sp = 0xE000;
    bus.mem[IE] = 0x01;
    bus.mem[IF] = 0x01; // VBlank pending

    for _ in 0..4 {
        step(&mut cpu, &mut bus);
        assert_ne!(cpu.pc, 0x0040, "vector not reached before cycle 5");
    }
    step(&mut cpu, &mut bus);

    assert_eq!(cpu.pc, 0x0040);
    assert!(!cpu.ime, "IME cleared on acceptance");
    assert_eq!(cpu.sp, 0xDFFE);
    assert_eq!(bus.mem[0xDFFF], 0x02);
    assert_eq!(bus.mem[0xDFFE], 0x00);
    assert_eq!(bus.mem[IF], 0x00, "serviced request cleared from IF");
}

#[test]
fn test_priority_lowest_bit_first() {
    // Timer (bit 2) and Joypad (bit 4) pending: Timer wins.
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xE000;
    bus.mem[IE] = 0x1F;
    bus.mem[IF] = 0x14;

    for _ in 0..5 {
        step(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.pc, 0x0050, "timer vector");
    assert_eq!(bus.mem[IF], 0x10, "joypad request still pending");
}

#[test]
fn test_all_vectors() {
    for (bit, vector) in [(0u8, 0x40u16), (1, 0x48), (2, 0x50), (3, 0x58), (4, 0x60)] {
        let mut cpu = Sm83::new();
        let mut bus = TestBus::new();
        cpu.sp = 0xE000;
        bus.mem[IE] = 1 << bit;
        bus.mem[IF] = 1 << bit;

        for _ in 0..5 {
            step(&mut cpu, &mut bus);
        }
        assert_eq!(cpu.pc, vector);
    }
}

#[test]
fn test_cancelled_request_jumps_to_zero() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x0200;
    cpu.sp = 0xE000;
    bus.mem[IE] = 0x01;
    bus.mem[IF] = 0x01;

    // Acceptance plus two idle cycles, then the request disappears before
    // the final choosing cycle.
    step(&mut cpu, &mut bus);
    step(&mut cpu, &mut bus);
    step(&mut cpu, &mut bus);
    bus.mem[IF] = 0x00;
    step(&mut cpu, &mut bus);
    step(&mut cpu, &mut bus);

    assert_eq!(cpu.pc, 0x0000);
    assert!(!cpu.ime);
}

#[test]
fn test_masked_interrupt_not_taken() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    bus.mem[IE] = 0x00;
    bus.mem[IF] = 0x1F;
    bus.load(0, &[0x00, 0x00]);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 1, "no dispatch without matching IE bits");
}

// --- EI delay ---

#[test]
fn test_ei_delay_one_instruction() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.ime = false;
    cpu.sp = 0xE000;
    bus.mem[IE] = 0x01;
    bus.mem[IF] = 0x01;
    bus.load(0, &[0xFB, 0x00, 0x00]); // EI; NOP; NOP

    run_instruction(&mut cpu, &mut bus); // EI
    assert!(!cpu.ime);

    run_instruction(&mut cpu, &mut bus); // NOP still runs with IME clear
    assert!(!cpu.ime);
    assert_eq!(cpu.pc, 2);

    // Dispatch starts on the next cycle, before the second NOP.
    for _ in 0..5 {
        step(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.pc, 0x0040);
}

#[test]
fn test_ei_di_leaves_interrupts_disabled() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.ime = false;
    bus.mem[IE] = 0x01;
    bus.mem[IF] = 0x01;
    bus.load(0, &[0xFB, 0xF3, 0x00, 0x00]); // EI; DI; NOP; NOP

    run_instruction(&mut cpu, &mut bus); // EI
    run_instruction(&mut cpu, &mut bus); // DI cancels the pending enable
    assert!(!cpu.ime);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert!(!cpu.ime, "no dispatch ever happens");
    assert_eq!(cpu.pc, 4);
}

// --- HALT ---

#[test]
fn test_halt_wakes_into_dispatch() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xE000;
    bus.mem[IE] = 0x04;
    bus.load(0x0100, &[0x76, 0x00]); // HALT
    cpu.pc = 0x0100;

    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.halted);

    // Stays asleep until the request arrives.
    for _ in 0..8 {
        step(&mut cpu, &mut bus);
    }
    assert!(cpu.halted);

    bus.mem[IF] = 0x04;
    for _ in 0..5 {
        step(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.pc, 0x0050);
    // The interrupted PC points past the HALT.
    assert_eq!(bus.mem[0xDFFF], 0x01);
    assert_eq!(bus.mem[0xDFFE], 0x01);
}

#[test]
fn test_halt_ime_clear_wakes_without_dispatch() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.ime = false;
    bus.mem[IE] = 0x04;
    bus.load(0x0100, &[0x76, 0x04]); // HALT; INC B
    cpu.pc = 0x0100;

    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.halted);

    bus.mem[IF] = 0x04;
    // The wake cycle re-executes HALT, the next one runs INC B.
    run_instruction(&mut cpu, &mut bus);
    assert!(!cpu.halted);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.b, 1);
    assert_eq!(bus.mem[IF], 0x04, "request not consumed with IME clear");
}

#[test]
fn test_halt_bug_executes_next_byte_twice() {
    // IME clear with a request already pending: HALT does not sleep, and
    // the following byte is fetched twice. `LD A,u8` therefore loads its
    // own opcode.
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.ime = false;
    bus.mem[IE] = 0x04;
    bus.mem[IF] = 0x04;
    bus.load(0x0100, &[0x76, 0x3E, 0x42]); // HALT; LD A,0x3E(!); LD B,D
    cpu.pc = 0x0100;

    run_instruction(&mut cpu, &mut bus);
    assert!(!cpu.halted, "halt bug skips the sleep");

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.a, 0x3E, "operand read repeats the opcode byte");
    assert_eq!(cpu.pc, 0x0102, "0x42 is decoded as the next instruction");

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.b, cpu.d, "0x42 executes as LD B,D");
}

// --- STOP / speed switch ---

struct SwitchBus {
    inner: TestBus,
    armed: bool,
    switched: u32,
}

impl Bus for SwitchBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.inner.read(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.inner.write(addr, data);
    }

    fn speed_switch_armed(&self) -> bool {
        self.armed
    }

    fn complete_speed_switch(&mut self) {
        self.switched += 1;
    }
}

#[test]
fn test_stop_is_noop_when_unarmed() {
    let mut cpu = Sm83::new();
    let mut bus = SwitchBus { inner: TestBus::new(), armed: false, switched: 0 };
    bus.inner.load(0, &[0x10, 0x00]); // STOP

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc, 1);
    assert_eq!(bus.switched, 0);
    assert!(cpu.at_instruction_boundary());
}

#[test]
fn test_stop_speed_switch_waits_2050_cycles() {
    let mut cpu = Sm83::new();
    let mut bus = SwitchBus { inner: TestBus::new(), armed: true, switched: 0 };
    bus.inner.load(0, &[0x10, 0x00]);

    cpu.step(&mut bus).unwrap(); // STOP enters the wait

    for _ in 0..2049 {
        cpu.step(&mut bus).unwrap();
        assert_eq!(bus.switched, 0);
    }
    cpu.step(&mut bus).unwrap();
    assert_eq!(bus.switched, 1, "switch fires after 2050 idle M-cycles");
    assert!(cpu.at_instruction_boundary());
}

// --- Invalid opcodes ---

#[test]
fn test_invalid_opcodes_are_fatal() {
    for opcode in [0xD3u8, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD] {
        let mut cpu = Sm83::new();
        let mut bus = TestBus::new();
        cpu.pc = 0x0150;
        bus.load(0x0150, &[opcode]);

        let err = cpu.step(&mut bus).unwrap_err();
        assert_eq!(err, ExecError::InvalidOpcode { opcode, pc: 0x0150 });
    }
}
