//! JIT error types.
//!
//! This module defines [`JitError`] and [`JitResult`] for translation,
//! environment-call emission and code finalization.

use std::fmt;

// =============================================================================
// JitResult and JitError
// =============================================================================

/// Error types for JIT compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JitError {
    /// Bytecode chunk cannot be JIT compiled
    NotCompilable(String),

    /// Cranelift compilation error
    CompilationError(String),

    /// Invalid opcode encountered
    InvalidOpcode(u8),

    /// PUSH immediate runs past the end of the code
    TruncatedPush { offset: usize },

    /// Simulated stack underflow
    StackUnderflow,

    /// An environment call was shaped inconsistently with its declared
    /// signature. This is an internal invariant violation of the translator.
    AbiMismatch {
        func: &'static str,
        param: usize,
        reason: &'static str,
    },

    /// Invalid JIT configuration
    Config(String),
}

impl fmt::Display for JitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitError::NotCompilable(msg) => write!(f, "Not compilable: {}", msg),
            JitError::CompilationError(msg) => write!(f, "Compilation error: {}", msg),
            JitError::InvalidOpcode(op) => write!(f, "Invalid opcode: {:#x}", op),
            JitError::TruncatedPush { offset } => {
                write!(f, "Truncated PUSH immediate at offset {}", offset)
            }
            JitError::StackUnderflow => write!(f, "Stack underflow"),
            JitError::AbiMismatch {
                func,
                param,
                reason,
            } => write!(
                f,
                "ABI mismatch calling {} (parameter {}): {}",
                func, param, reason
            ),
            JitError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for JitError {}

/// Result type for JIT operations
pub type JitResult<T> = Result<T, JitError>;
