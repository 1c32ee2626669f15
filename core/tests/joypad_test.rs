use gameboy_core::device::Joypad;
use gameboy_core::device::joypad::{BTN_A, BTN_RIGHT, BTN_START};

#[test]
fn test_idle_matrix_reads_released() {
    let mut joypad = Joypad::new();
    assert_eq!(joypad.read() & 0x0F, 0x0F, "active-low: all released");
}

#[test]
fn test_button_matrix_selection() {
    let mut joypad = Joypad::new();
    joypad.set_pressed(BTN_A, true);

    // D-pad selected: the A press is invisible.
    joypad.write(0x20);
    assert_eq!(joypad.read() & 0x0F, 0x0F);

    // Button matrix selected: bit 0 pulls low.
    joypad.write(0x10);
    assert_eq!(joypad.read() & 0x01, 0x00);
    assert_eq!(joypad.read() & 0x0E, 0x0E, "other buttons stay high");
}

#[test]
fn test_dpad_matrix_selection() {
    let mut joypad = Joypad::new();
    joypad.set_pressed(BTN_RIGHT, true);

    joypad.write(0x20); // select the D-pad half
    assert_eq!(joypad.read() & 0x01, 0x00);
}

#[test]
fn test_press_edge_raises_interrupt_once() {
    let mut joypad = Joypad::new();
    joypad.write(0x10); // buttons selected

    joypad.set_pressed(BTN_START, true);
    assert!(joypad.step(), "released→pressed edge");
    assert!(!joypad.step(), "held key is not a new edge");

    joypad.set_pressed(BTN_START, false);
    assert!(!joypad.step(), "release never interrupts");

    joypad.set_pressed(BTN_START, true);
    assert!(joypad.step());
}

#[test]
fn test_deselected_matrix_never_interrupts() {
    let mut joypad = Joypad::new();
    joypad.write(0x30); // neither half selected

    joypad.set_pressed(BTN_A, true);
    assert!(!joypad.step());
    assert_eq!(joypad.read() & 0x0F, 0x0F);
}

#[test]
fn test_only_select_bits_writable() {
    let mut joypad = Joypad::new();
    joypad.write(0x00);
    assert_eq!(joypad.read() & 0x30, 0x00);
    joypad.write(0xFF);
    assert_eq!(joypad.read() & 0x30, 0x30);
    assert_eq!(joypad.read() & 0x0F, 0x0F, "matrix nibble not writable");
}
