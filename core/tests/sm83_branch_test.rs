use gameboy_core::cpu::run_instruction;
use gameboy_core::cpu::sm83::{Flag, Sm83};

mod common;
use common::TestBus;

// --- JP ---

#[test]
fn test_jp_u16() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x00, 0x50]); // JP 0x5000

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 4, "JP u16 takes 4 M-cycles");
    assert_eq!(cpu.pc, 0x5000);
}

#[test]
fn test_jp_z_taken_and_not_taken() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0);
    cpu.set_flag(Flag::Z, true);
    bus.load(0, &[0xCA, 0x00, 0x30]); // JP Z,0x3000

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.pc, 0x3000);

    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0);
    bus.load(0, &[0xCA, 0x00, 0x30]);

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 3, "not-taken JP cc is one cycle shorter");
    assert_eq!(cpu.pc, 3);
}

#[test]
fn test_jp_hl() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1234);
    bus.load(0, &[0xE9]); // JP HL

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 1);
    assert_eq!(cpu.pc, 0x1234);
}

// --- JR ---

#[test]
fn test_jr_forward_and_backward() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    bus.load(0, &[0x18, 0x10]); // JR +16

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 3);
    assert_eq!(cpu.pc, 0x12);

    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    bus.load(0x100, &[0x18, 0xFE]); // JR -2 (self-loop)

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x100);
}

#[test]
fn test_jr_cc_cycles() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0); // Z clear → NZ true
    bus.load(0, &[0x20, 0x05]); // JR NZ,+5

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 3, "taken JR cc is 3 M-cycles");
    assert_eq!(cpu.pc, 0x07);

    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0);
    cpu.set_flag(Flag::Z, true);
    bus.load(0, &[0x20, 0x05]);

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 2, "not-taken JR cc is 2 M-cycles");
    assert_eq!(cpu.pc, 2);
}

#[test]
fn test_jr_carry_conditions() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0);
    cpu.set_flag(Flag::C, true);
    bus.load(0, &[0x38, 0x02]); // JR C,+2

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x04);

    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0);
    bus.load(0, &[0x30, 0x02]); // JR NC,+2

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.pc, 0x04);
}

// --- CALL / RET ---

#[test]
fn test_call_ret_round_trip() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xE000;
    bus.load(0, &[0xCD, 0x00, 0x40]); // CALL 0x4000
    bus.load(0x4000, &[0xC9]); // RET

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 6, "CALL takes 6 M-cycles");
    assert_eq!(cpu.pc, 0x4000);
    assert_eq!(cpu.sp, 0xDFFE);
    assert_eq!(bus.mem[0xDFFF], 0x00);
    assert_eq!(bus.mem[0xDFFE], 0x03);

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 4, "RET takes 4 M-cycles");
    assert_eq!(cpu.pc, 0x0003);
    assert_eq!(cpu.sp, 0xE000);
}

#[test]
fn test_call_cc_not_taken() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xE000;
    cpu.set_f(0);
    bus.load(0, &[0xDC, 0x00, 0x40]); // CALL C,0x4000 with carry clear

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 3);
    assert_eq!(cpu.pc, 3);
    assert_eq!(cpu.sp, 0xE000, "nothing pushed");
}

#[test]
fn test_ret_cc_cycles() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.sp = 0xDFFE;
    cpu.set_f(0);
    cpu.set_flag(Flag::Z, true);
    bus.mem[0xDFFE] = 0x00;
    bus.mem[0xDFFF] = 0x80;
    bus.load(0, &[0xC8]); // RET Z, taken

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 5, "taken RET cc is 5 M-cycles");
    assert_eq!(cpu.pc, 0x8000);

    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.set_f(0);
    bus.load(0, &[0xC8]); // RET Z, not taken

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 2);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn test_reti_sets_ime() {
    let mut cpu = Sm83::new();
    let mut bus = TestBus::new();
    cpu.ime = false;
    cpu.sp = 0xDFFE;
    bus.mem[0xDFFE] = 0x34;
    bus.mem[0xDFFF] = 0x12;
    bus.load(0, &[0xD9]); // RETI

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.pc, 0x1234);
    assert!(cpu.ime, "RETI enables interrupts without the EI delay");
}

// --- RST ---

#[test]
fn test_rst_vectors() {
    for (opcode, vector) in [
        (0xC7u8, 0x00u16),
        (0xCF, 0x08),
        (0xD7, 0x10),
        (0xDF, 0x18),
        (0xE7, 0x20),
        (0xEF, 0x28),
        (0xF7, 0x30),
        (0xFF, 0x38),
    ] {
        let mut cpu = Sm83::new();
        let mut bus = TestBus::new();
        cpu.pc = 0x0100;
        cpu.sp = 0xE000;
        bus.load(0x0100, &[opcode]);

        let cycles = run_instruction(&mut cpu, &mut bus);
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, vector);
        assert_eq!(bus.mem[0xDFFE], 0x01, "return address pushed");
    }
}
