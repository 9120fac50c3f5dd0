//! Logs, sub-calls, creation, hashing, external code and self-destruct
mod common;

use common::*;
use ethereum_types::{Address, H256, U256};
use evmjit::bytecode::Opcode;
use evmjit::host::abi::keccak256;
use evmjit::host::{CallOutcome, MemoryHost};
use evmjit::jit::CallKind;

fn topic(n: u64) -> U256 {
    (U256::from(n) << 192) | U256::from(n)
}

#[test]
fn test_log2_topics_and_data() {
    let data = b"0123456789";
    // LOG2: [offset, size, topic0, topic1]
    let chunk = Asm::new()
        .push(topic(2))
        .push(topic(1))
        .push(10u64)
        .push(32u64)
        .op(Opcode::Log2)
        .chunk();
    let mut host = MemoryHost::default();
    Run::default()
        .with_memory(32, data)
        .execute(&mut compiler(), &chunk, &mut host);

    assert_eq!(host.logs.len(), 1);
    let log = &host.logs[0];
    assert_eq!(log.topics.len(), 2);
    assert_eq!(log.topics[0], H256(topic(1).to_big_endian()));
    assert_eq!(log.topics[1], H256(topic(2).to_big_endian()));
    assert_eq!(log.data, data.to_vec());
}

#[test]
fn test_log0_and_log4_share_topics_buffer() {
    let chunk = Asm::new()
        .push(0u64)
        .push(0u64)
        .op(Opcode::Log0)
        .push(topic(4))
        .push(topic(3))
        .push(topic(2))
        .push(topic(1))
        .push(4u64)
        .push(0u64)
        .op(Opcode::Log4)
        .chunk();
    let mut host = MemoryHost::default();
    run(&chunk, &mut host);

    assert_eq!(host.logs.len(), 2);
    assert!(host.logs[0].topics.is_empty());
    assert!(host.logs[0].data.is_empty());
    let expected: Vec<H256> = (1..=4).map(|n| H256(topic(n).to_big_endian())).collect();
    assert_eq!(host.logs[1].topics, expected);
    assert_eq!(host.logs[1].data.len(), 4);
}

#[test]
fn test_sha3_of_memory_range() {
    let input = b"hello world";
    let chunk = Asm::new()
        .push(input.len() as u64)
        .push(64u64)
        .op(Opcode::Sha3)
        .chunk();
    let mut host = MemoryHost::default();
    let result = Run::default()
        .with_memory(64, input)
        .execute(&mut compiler(), &chunk, &mut host);

    let hash = keccak256(input);
    assert_eq!(result.stack, vec![U256::from_big_endian(hash.as_bytes())]);
}

fn call_chunk(op: Opcode, with_value: bool) -> evmjit::bytecode::Chunk {
    // [gas, address, (value), in_offset, in_size, out_offset, out_size]
    let mut asm = Asm::new()
        .push(4u64) // out_size
        .push(128u64) // out_offset
        .push(3u64) // in_size
        .push(16u64); // in_offset
    if with_value {
        asm = asm.push(U256::from(1_000u64) << 100);
    }
    asm.push_address(Address::repeat_byte(0xcc))
        .push(50_000u64)
        .op(op)
        .chunk()
}

#[test]
fn test_call_passes_operands() {
    let mut host = MemoryHost {
        call_output: vec![9, 8, 7, 6, 5],
        ..MemoryHost::default()
    };
    let mut run = Run::default().with_memory(16, &[0xa1, 0xa2, 0xa3]);
    let result = run.execute(&mut compiler(), &call_chunk(Opcode::Call, true), &mut host);

    assert_eq!(result.stack, vec![U256::one()]);
    assert_eq!(host.calls.len(), 1);
    let call = &host.calls[0];
    assert_eq!(call.kind, CallKind::Call);
    assert_eq!(call.gas, 50_000);
    assert_eq!(call.address, Address::repeat_byte(0xcc));
    assert_eq!(call.value, Some(U256::from(1_000u64) << 100));
    assert_eq!(call.input, vec![0xa1, 0xa2, 0xa3]);
    assert_eq!(call.output_len, 4);
    assert_eq!(&run.memory[128..133], &[9, 8, 7, 6, 0]);
}

#[test]
fn test_delegatecall_has_no_value() {
    let mut host = MemoryHost::default();
    let result = run(&call_chunk(Opcode::DelegateCall, false), &mut host);

    assert_eq!(result.stack, vec![U256::one()]);
    assert_eq!(host.calls[0].kind, CallKind::DelegateCall);
    assert_eq!(host.calls[0].value, None);
}

#[test]
fn test_failed_call_pushes_zero() {
    let mut host = MemoryHost {
        call_outcome: CallOutcome {
            success: false,
            gas_used: 123,
        },
        ..MemoryHost::default()
    };
    let result = run(&call_chunk(Opcode::CallCode, true), &mut host);

    assert_eq!(result.stack, vec![U256::zero()]);
    assert_eq!(host.calls[0].kind, CallKind::CallCode);
    assert_eq!(result.gas, GAS - 123);
}

#[test]
fn test_call_charges_reported_gas() {
    let mut host = MemoryHost {
        call_outcome: CallOutcome {
            success: true,
            gas_used: 7_000,
        },
        ..MemoryHost::default()
    };
    let result = run(&call_chunk(Opcode::Call, true), &mut host);

    assert_eq!(result.stack, vec![U256::one()]);
    assert_eq!(result.gas, GAS - 7_000);
}

#[test]
fn test_create_returns_address_and_charges_gas() {
    let init = [0x60, 0x00, 0x60, 0x00, 0xf3];
    // CREATE: [value, offset, size]
    let chunk = Asm::new()
        .push(init.len() as u64)
        .push(0u64)
        .push(500u64)
        .op(Opcode::Create)
        .chunk();
    let mut host = MemoryHost {
        create_cost: 32_000,
        ..MemoryHost::default()
    };
    let result = Run::default()
        .with_memory(0, &init)
        .execute(&mut compiler(), &chunk, &mut host);

    assert_eq!(host.creates.len(), 1);
    let create = &host.creates[0];
    assert_eq!(create.endowment, U256::from(500));
    assert_eq!(create.init_code, init.to_vec());
    assert_eq!(
        result.stack,
        vec![U256::from_big_endian(create.address.as_bytes())]
    );
    assert_eq!(result.gas, GAS - 32_000);
}

#[test]
fn test_extcodesize() {
    let account = Address::repeat_byte(0x42);
    let mut host = MemoryHost::default();
    host.code.insert(account, vec![0u8; 77]);

    let chunk = Asm::new()
        .push_address(account)
        .op(Opcode::ExtCodeSize)
        .push_address(Address::repeat_byte(0x43))
        .op(Opcode::ExtCodeSize)
        .chunk();
    let result = run(&chunk, &mut host);

    assert_eq!(result.stack, vec![U256::from(77), U256::zero()]);
}

#[test]
fn test_selfdestruct_ends_execution() {
    let beneficiary = Address::repeat_byte(0xbe);
    let chunk = Asm::new()
        .push_address(beneficiary)
        .op(Opcode::SelfDestruct)
        .push(1u64)
        .push(1u64)
        .op(Opcode::SStore)
        .chunk();
    let mut host = MemoryHost::default();
    let result = run(&chunk, &mut host);

    assert!(result.stack.is_empty());
    assert_eq!(host.selfdestructs, vec![beneficiary]);
    assert!(host.storage.is_empty());
}
