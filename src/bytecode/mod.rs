//! EVM bytecode front end.
//!
//! Decodes the subset of instructions the JIT translates: environment
//! operations and the PUSH/POP plumbing that feeds them.

mod chunk;
mod opcodes;

pub use chunk::{Chunk, Instruction, Instructions};
pub use opcodes::Opcode;
