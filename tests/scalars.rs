use proptest::prelude::*;
use ssz_view::tree::Root;
use ssz_view::view::{
    BasicTypeDef, BasicView, BoolView, Uint16View, Uint32View, Uint64View, Uint8View, ViewError,
    UINT64_TYPE,
};

#[test]
fn byte_written_to_slot_three_reads_back() {
    let mut base = Root::ZERO;
    for (i, byte) in base.iter_mut().enumerate() {
        *byte = i as u8 ^ 0x5a;
    }
    let updated = Uint8View(200).backing_from_base(&base, 3).unwrap();

    assert_eq!(Uint8View::from_base(&updated, 3).unwrap(), Uint8View(200));
    for i in (0..32).filter(|&i| i != 3) {
        assert_eq!(updated[i], base[i]);
    }
}

#[test]
fn bool_rejects_other_bytes() {
    let mut chunk = Root::ZERO;
    chunk[0] = 2;
    assert!(matches!(
        BoolView::from_base(&chunk, 0),
        Err(ViewError::InvalidBool(2))
    ));
    chunk[1] = 1;
    assert_eq!(BoolView::from_base(&chunk, 1).unwrap(), BoolView(true));
}

#[test]
fn values_are_little_endian() {
    let chunk = Uint32View(0x0403_0201).backing_from_base(&Root::ZERO, 1).unwrap();
    assert_eq!(&chunk[4..8], &[1, 2, 3, 4]);
    assert_eq!(UINT64_TYPE.sub_view_from_backing(&Root::from_u64(77), 0).unwrap(), Uint64View(77));
}

proptest! {
    #[test]
    fn u16_write_touches_only_its_slot(
        base in proptest::array::uniform32(any::<u8>()),
        slot in 0u8..16,
        value in any::<u16>(),
    ) {
        let base = Root(base);
        let updated = Uint16View(value).backing_from_base(&base, slot).unwrap();
        prop_assert_eq!(Uint16View::from_base(&updated, slot).unwrap(), Uint16View(value));
        let start = slot as usize * 2;
        for i in (0..32).filter(|i| !(start..start + 2).contains(i)) {
            prop_assert_eq!(updated[i], base[i]);
        }
    }

    #[test]
    fn neighbouring_u64_slots_are_independent(
        values in proptest::array::uniform4(any::<u64>()),
    ) {
        let mut chunk = Root::ZERO;
        for (slot, value) in values.iter().enumerate() {
            chunk = Uint64View(*value).backing_from_base(&chunk, slot as u8).unwrap();
        }
        for (slot, value) in values.iter().enumerate() {
            prop_assert_eq!(Uint64View::from_base(&chunk, slot as u8).unwrap(), Uint64View(*value));
        }
    }
}
