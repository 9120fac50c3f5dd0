//! Bytecode analysis for JIT compilation
//!
//! Checks that a chunk decodes, never underflows the operand stack, and
//! computes how many words its output buffer needs.

use crate::bytecode::Chunk;
use crate::jit::types::{JitError, JitResult};

/// Check if a bytecode chunk can be JIT compiled
pub fn can_compile(chunk: &Chunk) -> bool {
    max_stack_depth(chunk).is_ok()
}

/// Deepest operand stack reached before the first terminator.
pub fn max_stack_depth(chunk: &Chunk) -> JitResult<usize> {
    let mut depth = 0usize;
    let mut max = 0usize;

    for instr in chunk.instructions() {
        let op = instr?.opcode;
        depth = depth
            .checked_sub(op.stack_inputs())
            .ok_or(JitError::StackUnderflow)?;
        depth += op.stack_outputs();
        max = max.max(depth);
        if op.is_terminator() {
            break;
        }
    }

    Ok(max)
}
