//! Storage access through both dispatch modes
mod common;

use common::*;
use ethereum_types::U256;
use evmjit::bytecode::Opcode;
use evmjit::host::MemoryHost;

#[test]
fn test_sload_converts_big_endian_result() {
    let mut host = MemoryHost::default();
    host.storage.insert(U256::one(), U256::from(5));

    let chunk = Asm::new().push(1u64).op(Opcode::SLoad).chunk();
    let result = run(&chunk, &mut host);

    assert_eq!(result.stack, vec![U256::from(5)]);
}

#[test]
fn test_sload_full_width_key_and_value() {
    let key = U256::MAX - U256::from(7);
    let value = (U256::one() << 255) | U256::from(0x1234_5678u64);
    let mut host = MemoryHost::default();
    host.storage.insert(key, value);

    let chunk = Asm::new().push(key).op(Opcode::SLoad).chunk();
    let result = run(&chunk, &mut host);

    assert_eq!(result.stack, vec![value]);
}

#[test]
fn test_sstore_writes_host_storage() {
    let mut host = MemoryHost::default();
    let value = U256::from(0xdead_beefu64) << 128;

    // value first, key on top
    let chunk = Asm::new()
        .push(value)
        .push(42u64)
        .op(Opcode::SStore)
        .chunk();
    let result = run(&chunk, &mut host);

    assert!(result.stack.is_empty());
    assert_eq!(host.storage.get(&U256::from(42)), Some(&value));
}

#[test]
fn test_missing_slot_reads_zero() {
    let mut host = MemoryHost::default();
    let chunk = Asm::new().push(9u64).op(Opcode::SLoad).chunk();
    assert_eq!(run(&chunk, &mut host).stack, vec![U256::zero()]);
}

#[test]
fn test_dedicated_dispatch_round_trip() {
    let mut host = MemoryHost::default();
    let value = U256::from_dec_str("123456789012345678901234567890").expect("decimal");

    let chunk = Asm::new()
        .push(value)
        .push(1u64)
        .op(Opcode::SStore)
        .push(1u64)
        .op(Opcode::SLoad)
        .chunk();
    let mut compiler = dedicated_compiler();
    let result = Run::default().execute(&mut compiler, &chunk, &mut host);

    assert_eq!(result.stack, vec![value]);
    assert_eq!(host.storage.get(&U256::one()), Some(&value));
    // env_sstore and env_sload only
    assert_eq!(compiler.declared_env_functions(), 2);
}

#[test]
fn test_generic_dispatch_uses_two_entry_points() {
    let mut host = MemoryHost::default();
    let chunk = Asm::new()
        .push(3u64)
        .push(1u64)
        .op(Opcode::SStore)
        .push(1u64)
        .op(Opcode::SLoad)
        .push(1u64)
        .op(Opcode::SLoad)
        .chunk();
    let mut compiler = compiler();
    let result = Run::default().execute(&mut compiler, &chunk, &mut host);

    assert_eq!(result.stack, vec![U256::from(3), U256::from(3)]);
    // evm.update and evm.query
    assert_eq!(compiler.declared_env_functions(), 2);
}
