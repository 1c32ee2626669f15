use gameboy_core::core::bus::{BusError, BusMap, Region};

#[test]
fn test_disjoint_regions_register() {
    let mut map = BusMap::new(4_194_304);
    map.register(Region::new("ROM", 0x0000, 0x8000, 0)).unwrap();
    map.register(Region::new("VRAM", 0x8000, 0x2000, 0)).unwrap();
    map.register(Region::new("HRAM", 0xFF80, 0x7F, 0)).unwrap();

    assert_eq!(map.resolve(0x0000), Some("ROM"));
    assert_eq!(map.resolve(0x7FFF), Some("ROM"));
    assert_eq!(map.resolve(0x8000), Some("VRAM"));
    assert_eq!(map.resolve(0xFFFE), Some("HRAM"));
    assert_eq!(map.resolve(0xFFFF), None);
}

#[test]
fn test_overlap_shapes_rejected() {
    // Every way two ranges can intersect must fail.
    let cases: [(u16, u32, u16, u32); 4] = [
        (0x1000, 0x100, 0x0F80, 0x100), // new straddles the left edge
        (0x1000, 0x100, 0x1080, 0x100), // new straddles the right edge
        (0x1000, 0x100, 0x1040, 0x10),  // new inside prev
        (0x1000, 0x100, 0x0F00, 0x400), // new contains prev
    ];

    for (prev_base, prev_size, new_base, new_size) in cases {
        let mut map = BusMap::new(4_194_304);
        map.register(Region::new("PREV", prev_base, prev_size, 0)).unwrap();
        let err = map
            .register(Region::new("NEW", new_base, new_size, 0))
            .unwrap_err();
        assert_eq!(err, BusError::Overlap { a: "PREV", b: "NEW" });
    }
}

#[test]
fn test_adjacent_regions_allowed() {
    let mut map = BusMap::new(4_194_304);
    map.register(Region::new("A", 0x1000, 0x100, 0)).unwrap();
    map.register(Region::new("B", 0x1100, 0x100, 0)).unwrap();
}

#[test]
fn test_non_addressable_components_never_overlap() {
    let mut map = BusMap::new(4_194_304);
    map.register(Region::new("ROM", 0x0000, 0x8000, 0)).unwrap();
    // The CPU declares size 0: same base, no conflict.
    map.register(Region::new("CPU", 0x0000, 0, 1_048_576)).unwrap();
    assert_eq!(map.resolve(0x0000), Some("ROM"));
}

#[test]
fn test_frequency_must_divide_bus_clock() {
    let mut map = BusMap::new(4_194_304);
    map.register(Region::new("TIMER", 0xFF04, 4, 4_194_304)).unwrap();
    map.register(Region::new("JOYPAD", 0xFF00, 1, 1024)).unwrap();

    let err = map
        .register(Region::new("ODD", 0xFF01, 1, 3_000_000))
        .unwrap_err();
    assert!(matches!(err, BusError::BadFrequency { name: "ODD", .. }));

    // Faster than the bus itself is rejected too.
    let err = map
        .register(Region::new("FAST", 0xFF02, 1, 8_388_608))
        .unwrap_err();
    assert!(matches!(err, BusError::BadFrequency { name: "FAST", .. }));
}

#[test]
fn test_passive_components_skip_frequency_check() {
    let mut map = BusMap::new(4_194_304);
    map.register(Region::new("RAM", 0xC000, 0x2000, 0)).unwrap();
}
