//! Opcode handlers for JIT compilation
//!
//! Each handler module compiles one category of opcodes to Cranelift IR.

mod env_ops;
mod stack;

pub use env_ops::compile_env_op;
pub use stack::compile_stack_op;
