//! Cranelift JIT Compilation Module
//!
//! Translates EVM bytecode to native code and, in particular, emits every
//! call from generated code into the host environment.
//!
//! # Architecture
//!
//! Generated code keeps 256-bit words as four native-endian `I64` limbs. The
//! host sees words as 32 big-endian bytes, so every value crossing the
//! environment boundary is converted on the way. How those values are passed
//! (by value, split across registers, through hidden pointers) depends on the
//! target and is decided once by a [`CallConvDescriptor`].
//!
//! # Modules
//!
//! - [`types`]: RuntimeData, ABI value layouts, keys, JitError, JitResult
//! - [`codegen`]: Cranelift IR generation helpers
//! - [`frame`]: call-frame and memory accessors
//! - [`env`]: environment call bridge
//! - [`handlers`]: opcode-specific IR generation handlers
//! - [`compiler`]: bytecode-to-Cranelift IR translation

pub mod codegen;
pub mod compiler;
pub mod env;
pub mod frame;
pub mod handlers;
pub mod types;

// Re-export main types
pub use codegen::{CodegenContext, WordValue};
pub use compiler::{can_compile, ChunkFn, CompiledChunk, Execution, JitCompiler};
pub use env::{AbiFamily, CallConvDescriptor, EnvBridge, EnvFunc, EnvFuncTable};
pub use types::{
    CallKind, EnvKey, EnvMemRef, EnvWord, JitError, JitResult, RuntimeData, CALL_FAILURE,
    WORD_BYTES,
};
