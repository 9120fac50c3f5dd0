//! Stack operation handlers for JIT compilation
//!
//! Handles: POP, PUSH1..PUSH32

use crate::bytecode::{Instruction, Opcode};
use crate::jit::codegen::CodegenContext;
use crate::jit::types::{limbs_from_be_bytes, JitError, JitResult};

/// Compile a stack operation opcode to Cranelift IR
pub fn compile_stack_op(
    codegen: &mut CodegenContext<'_, '_>,
    instr: &Instruction<'_>,
) -> JitResult<()> {
    match instr.opcode {
        Opcode::Pop => {
            codegen.pop()?;
        }

        op if op.immediate_size() > 0 => {
            // Right-align the big-endian immediate in a 32-byte word
            let mut bytes = [0u8; 32];
            bytes[32 - instr.immediate.len()..].copy_from_slice(instr.immediate);
            let word = codegen.const_word(limbs_from_be_bytes(&bytes));
            codegen.push(word)?;
        }

        op => {
            return Err(JitError::NotCompilable(format!(
                "{} is not a stack operation",
                op
            )))
        }
    }
    Ok(())
}
