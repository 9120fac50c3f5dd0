//! CALLDATALOAD clamping at and around the end of the buffer
mod common;

use common::*;
use ethereum_types::U256;
use evmjit::bytecode::Opcode;
use evmjit::host::MemoryHost;

fn load(call_data: &[u8], index: U256) -> [u8; 32] {
    let chunk = Asm::new().push(index).op(Opcode::CallDataLoad).chunk();
    let mut host = MemoryHost::default();
    let result = Run::with_call_data(call_data).execute(&mut compiler(), &chunk, &mut host);
    assert_eq!(result.stack.len(), 1);
    result.stack[0].to_big_endian()
}

/// Bytes CALLDATALOAD must return for `index` into `data`
fn expected(data: &[u8], index: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    if index < data.len() {
        let n = (data.len() - index).min(32);
        word[..n].copy_from_slice(&data[index..index + n]);
    }
    word
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(1)).collect()
}

#[test]
fn test_load_at_end_is_zero() {
    let data = pattern(40);
    assert_eq!(load(&data, U256::from(40)), [0u8; 32]);
}

#[test]
fn test_single_byte_then_padding() {
    let word = load(&[0xab], U256::zero());
    assert_eq!(word[0], 0xab);
    assert_eq!(&word[1..], &[0u8; 31]);
}

#[test]
fn test_full_word_in_range() {
    let data = pattern(64);
    assert_eq!(load(&data, U256::from(16)), expected(&data, 16));
}

#[test]
fn test_empty_call_data() {
    assert_eq!(load(&[], U256::zero()), [0u8; 32]);
    assert_eq!(load(&[], U256::from(5)), [0u8; 32]);
}

#[test]
fn test_index_above_64_bits_is_zero() {
    let data = pattern(8);
    // Low limb is in range; the index as a whole is not.
    let index = (U256::one() << 64) | U256::from(1);
    assert_eq!(load(&data, index), [0u8; 32]);
    assert_eq!(load(&data, U256::MAX), [0u8; 32]);
}

#[test]
fn test_clamp_grid() {
    for len in [0usize, 1, 31, 32, 33, 63, 64, 100] {
        let data = pattern(len);
        for index in [0usize, 1, 31, 32, 33, len.saturating_sub(1), len, len + 1, len + 40] {
            assert_eq!(
                load(&data, U256::from(index)),
                expected(&data, index),
                "len {} index {}",
                len,
                index
            );
        }
    }
}
