//! evmjit - environment-call bridge for a Cranelift JIT of EVM bytecode
//!
//! Compiled EVM code reaches storage, call data, hashing, logs, sub-calls
//! and contract creation through a fixed set of native host functions. This
//! crate emits those calls for the host target's C calling convention and
//! provides the host side of the ABI.
//!
//! # Architecture
//!
//! 1. **Bytecode** (`bytecode` module)
//!    - Decodes the environment opcodes and the stack plumbing that feeds them
//!
//! 2. **JIT** (`jit` module)
//!    - Translates a chunk to Cranelift IR
//!    - Lowers environment calls per target (struct return, by-value
//!      aggregates, scratch slots, byte-order conversion)
//!
//! 3. **Host** (`host` module)
//!    - `extern "C"` entry points and the [`host::Host`] trait they forward to
//!
//! # Example
//!
//! ```rust,no_run
//! use evmjit::bytecode::Chunk;
//! use evmjit::host::MemoryHost;
//! use evmjit::jit::JitCompiler;
//!
//! // PUSH1 5, PUSH1 1, SSTORE
//! let chunk = Chunk::from_hex("6005600155").unwrap();
//! let mut compiler = JitCompiler::new().unwrap();
//! let compiled = compiler.compile(&chunk).unwrap();
//!
//! let mut host = MemoryHost::default();
//! let mut memory = vec![0u8; 1024];
//! let result = unsafe { compiled.execute(&mut host, &[], &mut memory, 100_000) };
//! assert!(result.stack.is_empty());
//! ```

pub mod bytecode;
pub mod config;
pub mod host;
pub mod jit;

pub use bytecode::{Chunk, Opcode};
pub use config::{EnvDispatch, JitConfig, OptLevel};
pub use host::{Host, HostEnv, MemoryHost, TxContext};
pub use jit::{CompiledChunk, Execution, JitCompiler, JitError, JitResult};
