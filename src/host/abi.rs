//! `extern "C"` environment entry points.
//!
//! Signatures mirror [`crate::jit::env::EnvFunc::signature`]: 32-byte words
//! passed or returned by value are [`EnvWord`]s, so the platform C ABI does
//! the struct-return and by-value work on this side.
//!
//! # Safety
//!
//! Every entry point expects `env` to be the handle of a live [`HostEnv`]
//! and every pointer to be valid for the size its parameter implies. Only
//! code generated by this crate is meant to call them.

use std::ffi::c_void;

use cranelift_jit::JITBuilder;
use ethereum_types::{Address, H256};
use sha3::{Digest, Keccak256};
use tracing::{trace, warn};

use super::{CallRequest, HostEnv};
use crate::jit::env::EnvFunc;
use crate::jit::types::{
    CallKind, EnvKey, EnvMemRef, EnvWord, ADDRESS_BYTES, CALL_FAILURE, WORD_BYTES,
};

unsafe fn host_env<'a>(env: *mut c_void) -> &'a mut HostEnv<'a> {
    &mut *env.cast::<HostEnv<'a>>()
}

unsafe fn mut_slice<'a>(memref: EnvMemRef) -> &'a mut [u8] {
    if memref.len == 0 || memref.ptr.is_null() {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(memref.ptr as *mut u8, memref.len as usize)
    }
}

fn address_word(address: Address, fill: u8) -> EnvWord {
    let mut word = EnvWord::from_address(address);
    word.bytes[..(WORD_BYTES - ADDRESS_BYTES) as usize].fill(fill);
    word
}

// =============================================================================
// Generic Entry Points
// =============================================================================

/// `evm.query`
pub unsafe extern "C" fn evm_query(env: *mut c_void, key: i32, arg: EnvWord) -> EnvWord {
    let env = host_env(env);
    let Some(key) = EnvKey::from_raw(key) else {
        warn!(target: "evmjit::host", key, "Unknown query key");
        return EnvWord::zero();
    };
    trace!(target: "evmjit::host", ?key, "query");

    let host = &*env.host;
    let ctx = host.context();
    match key {
        EnvKey::Storage => EnvWord::from_u256(host.storage(arg.to_u256())),
        EnvKey::Address => address_word(ctx.address, env.address_fill),
        EnvKey::Caller => address_word(ctx.caller, env.address_fill),
        EnvKey::Origin => address_word(ctx.origin, env.address_fill),
        EnvKey::Coinbase => address_word(ctx.coinbase, env.address_fill),
        EnvKey::GasLimit => EnvWord::from_numeric(ctx.gas_limit, env.numeric_fill),
        EnvKey::Number => EnvWord::from_numeric(ctx.number, env.numeric_fill),
        EnvKey::Timestamp => EnvWord::from_numeric(ctx.timestamp, env.numeric_fill),
        EnvKey::CodeByAddress => {
            EnvWord::from_memref(EnvMemRef::from_slice(host.code(arg.to_address())))
        }
        EnvKey::Balance => EnvWord::from_u256(host.balance(arg.to_address())),
        EnvKey::BlockHash => EnvWord::from_h256(host.block_hash(arg.to_u256())),
        EnvKey::SStore | EnvKey::SelfDestruct => {
            warn!(target: "evmjit::host", ?key, "Update key passed to query");
            EnvWord::zero()
        }
    }
}

/// `evm.update`
pub unsafe extern "C" fn evm_update(env: *mut c_void, key: i32, a: EnvWord, b: EnvWord) {
    let env = host_env(env);
    match EnvKey::from_raw(key) {
        Some(EnvKey::SStore) => {
            trace!(target: "evmjit::host", "sstore");
            env.host.set_storage(a.to_u256(), b.to_u256());
        }
        Some(EnvKey::SelfDestruct) => {
            trace!(target: "evmjit::host", "selfdestruct");
            env.host.selfdestruct(a.to_address());
        }
        other => warn!(target: "evmjit::host", key, ?other, "Not an update key"),
    }
}

// =============================================================================
// Dedicated Entry Points
// =============================================================================

pub unsafe extern "C" fn env_sload(env: *mut c_void, key: *const EnvWord, out: *mut EnvWord) {
    let env = host_env(env);
    *out = EnvWord::from_u256(env.host.storage((*key).to_u256()));
}

pub unsafe extern "C" fn env_sstore(
    env: *mut c_void,
    key: *const EnvWord,
    value: *const EnvWord,
) {
    let env = host_env(env);
    env.host.set_storage((*key).to_u256(), (*value).to_u256());
}

pub unsafe extern "C" fn env_sha3(data: *const u8, len: u64, out: *mut EnvWord) {
    let input = EnvMemRef { ptr: data, len }.as_slice();
    let digest = Keccak256::digest(input);
    (*out).bytes.copy_from_slice(&digest);
}

pub unsafe extern "C" fn env_balance(out: *mut EnvWord, env: *mut c_void, address: *const EnvWord) {
    let env = host_env(env);
    *out = EnvWord::from_u256(env.host.balance((*address).to_address()));
}

pub unsafe extern "C" fn env_blockhash(
    env: *mut c_void,
    number: *const EnvWord,
    out: *mut EnvWord,
) {
    let env = host_env(env);
    *out = EnvWord::from_h256(env.host.block_hash((*number).to_u256()));
}

pub unsafe extern "C" fn env_create(
    env: *mut c_void,
    gas: *mut i64,
    endowment: *const EnvWord,
    init_code: *const u8,
    init_len: u64,
    out: *mut EnvWord,
) {
    let env = host_env(env);
    let init = EnvMemRef {
        ptr: init_code,
        len: init_len,
    }
    .as_slice();
    let address = env.host.create(&mut *gas, (*endowment).to_u256(), init);
    trace!(target: "evmjit::host", ?address, "create");
    *out = EnvWord::from_address(address);
}

#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn env_call(
    env: *mut c_void,
    kind: i32,
    gas: i64,
    address: *const u8,
    value: *const EnvWord,
    input: *const u8,
    input_len: u64,
    output: EnvMemRef,
) -> i64 {
    let env = host_env(env);
    let Some(kind) = CallKind::from_raw(kind) else {
        warn!(target: "evmjit::host", kind, "Unknown call kind");
        return CALL_FAILURE;
    };

    let address = Address::from_slice(std::slice::from_raw_parts(
        address,
        ADDRESS_BYTES as usize,
    ));
    // The value slot is left unwritten for DELEGATECALL
    let value = kind.has_value().then(|| (*value).to_u256());
    let request = CallRequest {
        kind,
        gas,
        address,
        value,
        input: EnvMemRef {
            ptr: input,
            len: input_len,
        }
        .as_slice(),
    };

    let outcome = env.host.call(request, mut_slice(output));
    trace!(target: "evmjit::host", ?kind, ?address, success = outcome.success, "call");
    if outcome.success {
        outcome.gas_used
    } else {
        outcome.gas_used | CALL_FAILURE
    }
}

pub unsafe extern "C" fn env_log(env: *mut c_void, data: EnvWord, topics: EnvWord) {
    let env = host_env(env);
    let data = data.to_memref().as_slice();
    let topics: Vec<H256> = topics
        .to_memref()
        .as_slice()
        .chunks_exact(WORD_BYTES as usize)
        .map(H256::from_slice)
        .collect();
    trace!(target: "evmjit::host", topics = topics.len(), len = data.len(), "log");
    env.host.log(&topics, data);
}

pub unsafe extern "C" fn env_extcode(env: *mut c_void, address: EnvWord) -> EnvWord {
    let env = host_env(env);
    let code = env.host.code(address.to_address());
    EnvWord::from_memref(EnvMemRef::from_slice(code))
}

// =============================================================================
// Registration
// =============================================================================

/// Symbol name and address of every entry point.
pub fn host_symbols() -> [(&'static str, *const u8); EnvFunc::COUNT] {
    [
        (EnvFunc::Query.symbol(), evm_query as *const u8),
        (EnvFunc::Update.symbol(), evm_update as *const u8),
        (EnvFunc::SLoad.symbol(), env_sload as *const u8),
        (EnvFunc::SStore.symbol(), env_sstore as *const u8),
        (EnvFunc::Sha3.symbol(), env_sha3 as *const u8),
        (EnvFunc::Balance.symbol(), env_balance as *const u8),
        (EnvFunc::Create.symbol(), env_create as *const u8),
        (EnvFunc::Call.symbol(), env_call as *const u8),
        (EnvFunc::Log.symbol(), env_log as *const u8),
        (EnvFunc::BlockHash.symbol(), env_blockhash as *const u8),
        (EnvFunc::ExtCode.symbol(), env_extcode as *const u8),
    ]
}

/// Install the entry points in a JIT symbol table.
pub fn register_symbols(builder: &mut JITBuilder) {
    for (name, ptr) in host_symbols() {
        builder.symbol(name, ptr);
    }
}

/// Keccak-256 of `data`, as `env_sha3` computes it
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}
