//! JIT Type Definitions
//!
//! This module defines the core types shared by generated code and the host:
//! - [`RuntimeData`]: call frame passed to compiled code
//! - [`EnvWord`] and [`EnvMemRef`]: values as they cross the environment ABI
//! - [`EnvKey`], [`CallKind`], [`EntryPoint`]: environment operation tags
//! - [`JitResult`] and [`JitError`]: Result types for JIT operations

mod abi;
mod constants;
mod context;
mod error;

#[cfg(test)]
mod tests;

pub use abi::{be_bytes_from_limbs, limbs_from_be_bytes, EnvMemRef, EnvWord};

pub use constants::{
    CallKind, EntryPoint, EnvKey, QueryResultShape, ADDRESS_BYTES, CALL_FAILURE, MAX_TOPICS,
    MEMREF_BYTES, WORD_BYTES, WORD_LIMBS,
};

pub use context::RuntimeData;

pub use error::{JitError, JitResult};
