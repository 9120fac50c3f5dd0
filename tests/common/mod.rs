//! Test utilities for JIT integration tests
//!
//! Provides a small bytecode assembler and helpers that compile a chunk and
//! run it against a [`MemoryHost`].
#![allow(dead_code)]

use ethereum_types::{Address, U256};
use evmjit::bytecode::{Chunk, Opcode};
use evmjit::config::{EnvDispatch, JitConfig};
use evmjit::host::{HostEnv, MemoryHost};
use evmjit::jit::{Execution, JitCompiler};

/// Bytes of VM memory every test run gets
pub const MEMORY_SIZE: usize = 1024;

pub const GAS: i64 = 1_000_000;

/// Bytecode assembler
#[derive(Debug, Default, Clone)]
pub struct Asm {
    code: Vec<u8>,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    /// PUSHn with the shortest immediate that holds `value`
    pub fn push(mut self, value: impl Into<U256>) -> Self {
        let value = value.into();
        let len = value.bits().div_ceil(8).max(1);
        let bytes = value.to_big_endian();
        self.code.push(Opcode::Push1.to_byte() + (len as u8 - 1));
        self.code.extend_from_slice(&bytes[32 - len..]);
        self
    }

    pub fn push_address(self, address: Address) -> Self {
        self.push(U256::from_big_endian(address.as_bytes()))
    }

    pub fn op(mut self, op: Opcode) -> Self {
        self.code.push(op.to_byte());
        self
    }

    pub fn chunk(self) -> Chunk {
        Chunk::new(self.code)
    }
}

/// Compiler with the default configuration
pub fn compiler() -> JitCompiler {
    JitCompiler::new().expect("Failed to create compiler")
}

pub fn dedicated_compiler() -> JitCompiler {
    JitCompiler::with_config(JitConfig {
        dispatch: EnvDispatch::Dedicated,
        ..JitConfig::default()
    })
    .expect("Failed to create compiler")
}

/// Everything a test run needs besides the host
#[derive(Debug, Clone)]
pub struct Run {
    pub call_data: Vec<u8>,
    pub memory: Vec<u8>,
    pub numeric_fill: u8,
    pub address_fill: u8,
}

impl Default for Run {
    fn default() -> Self {
        Run {
            call_data: Vec::new(),
            memory: vec![0u8; MEMORY_SIZE],
            numeric_fill: 0,
            address_fill: 0,
        }
    }
}

impl Run {
    pub fn with_call_data(call_data: &[u8]) -> Self {
        Run {
            call_data: call_data.to_vec(),
            ..Self::default()
        }
    }

    /// Copy `bytes` into memory at `offset`
    pub fn with_memory(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn execute(
        &mut self,
        compiler: &mut JitCompiler,
        chunk: &Chunk,
        host: &mut MemoryHost,
    ) -> Execution {
        let compiled = compiler.compile(chunk).expect("Compilation failed");
        let mut env = HostEnv::new(host)
            .with_numeric_fill(self.numeric_fill)
            .with_address_fill(self.address_fill);
        unsafe { compiled.execute_in(&mut env, &self.call_data, &mut self.memory, GAS) }
    }
}

/// Compile `chunk` with the default configuration and run it
pub fn run(chunk: &Chunk, host: &mut MemoryHost) -> Execution {
    Run::default().execute(&mut compiler(), chunk, host)
}
