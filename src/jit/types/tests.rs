//! Tests for JIT types.

use super::*;
use ethereum_types::{Address, U256};

#[test]
fn test_every_key_has_exactly_one_entry_point() {
    let updates: Vec<EnvKey> = EnvKey::ALL
        .iter()
        .copied()
        .filter(|k| k.entry_point() == EntryPoint::Update)
        .collect();
    assert_eq!(updates, vec![EnvKey::SStore, EnvKey::SelfDestruct]);

    for key in EnvKey::ALL {
        assert_eq!(EnvKey::from_raw(key as i32), Some(key));
    }
    assert_eq!(EnvKey::from_raw(4), None);
}

#[test]
fn test_result_shapes() {
    for key in [EnvKey::Address, EnvKey::Caller, EnvKey::Origin, EnvKey::Coinbase] {
        assert_eq!(key.result_shape(), QueryResultShape::Address);
    }
    for key in [EnvKey::GasLimit, EnvKey::Number, EnvKey::Timestamp] {
        assert_eq!(key.result_shape(), QueryResultShape::Numeric);
    }
    assert_eq!(EnvKey::Storage.result_shape(), QueryResultShape::Word);
    assert_eq!(EnvKey::CodeByAddress.result_shape(), QueryResultShape::MemRef);
}

#[test]
fn test_env_word_is_big_endian() {
    let word = EnvWord::from_u256(U256::from(0x0102u64));
    assert_eq!(word.bytes[30], 0x01);
    assert_eq!(word.bytes[31], 0x02);
    assert!(word.bytes[..30].iter().all(|b| *b == 0));
    assert_eq!(word.to_u256(), U256::from(0x0102u64));
}

#[test]
fn test_limb_conversion_matches_u256() {
    let value = U256([1, 2, 3, 0xdead_beef]);
    let bytes = be_bytes_from_limbs(value.0);
    assert_eq!(bytes[0..8], 0xdead_beefu64.to_be_bytes());
    assert_eq!(bytes[24..32], 1u64.to_be_bytes());
    assert_eq!(limbs_from_be_bytes(&bytes), value.0);
}

#[test]
fn test_address_is_right_aligned() {
    let address = Address::repeat_byte(0xab);
    let word = EnvWord::from_address(address);
    assert!(word.bytes[..12].iter().all(|b| *b == 0));
    assert!(word.bytes[12..].iter().all(|b| *b == 0xab));
    assert_eq!(word.to_address(), address);
}

#[test]
fn test_memref_round_trips_through_word() {
    let data = [1u8, 2, 3];
    let memref = EnvMemRef::from_slice(&data);
    let back = EnvWord::from_memref(memref).to_memref();
    assert_eq!(back, memref);
    assert_eq!(unsafe { back.as_slice() }, &data);
}

#[test]
fn test_runtime_data_offsets_are_distinct() {
    let offsets = [
        RuntimeData::GAS_OFFSET,
        RuntimeData::ENV_OFFSET,
        RuntimeData::CALL_DATA_OFFSET,
        RuntimeData::CALL_DATA_SIZE_OFFSET,
        RuntimeData::MEMORY_OFFSET,
        RuntimeData::MEMORY_SIZE_OFFSET,
    ];
    for (i, a) in offsets.iter().enumerate() {
        assert_eq!(a % 8, 0);
        for b in &offsets[i + 1..] {
            assert_ne!(a, b);
        }
    }
}
