//! Cranelift IR Generation Helpers
//!
//! This module provides helper functions for generating Cranelift IR,
//! abstracting common patterns like 256-bit word handling and the simulated
//! operand stack.

use cranelift::codegen::ir::Endianness;
use cranelift::prelude::*;

use super::types::{JitError, JitResult, WORD_LIMBS};

/// A VM word in generated code: four `I64` limbs, least significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordValue {
    pub limbs: [Value; WORD_LIMBS],
}

impl WordValue {
    pub fn new(limbs: [Value; WORD_LIMBS]) -> Self {
        WordValue { limbs }
    }

    /// Least significant 64 bits
    pub fn low(&self) -> Value {
        self.limbs[0]
    }
}

/// Code generation context wrapping a Cranelift FunctionBuilder
///
/// Provides high-level operations for:
/// - Stack manipulation (push/pop/peek) over 256-bit words
/// - Word constants, loads and stores in the target's byte order
/// - Width changes (truncation, zero-extension, masking)
pub struct CodegenContext<'a, 'b> {
    pub builder: &'a mut FunctionBuilder<'b>,

    /// Pointer to RuntimeData
    rt_ptr: Value,

    /// Simulated stack for values (we track SSA values, not memory)
    value_stack: Vec<WordValue>,

    /// Flag indicating if current block is terminated
    terminated: bool,

    pointer_type: Type,

    endianness: Endianness,
}

impl<'a, 'b> CodegenContext<'a, 'b> {
    /// Create a new codegen context
    pub fn new(
        builder: &'a mut FunctionBuilder<'b>,
        rt_ptr: Value,
        pointer_type: Type,
        endianness: Endianness,
    ) -> Self {
        CodegenContext {
            builder,
            rt_ptr,
            value_stack: Vec::with_capacity(32),
            terminated: false,
            pointer_type,
            endianness,
        }
    }

    // =========================================================================
    // Stack Operations
    // =========================================================================

    /// Push a value onto the simulated stack
    pub fn push(&mut self, val: WordValue) -> JitResult<()> {
        self.value_stack.push(val);
        Ok(())
    }

    /// Pop a value from the simulated stack
    pub fn pop(&mut self) -> JitResult<WordValue> {
        self.value_stack.pop().ok_or(JitError::StackUnderflow)
    }

    /// Peek at the top of the stack without removing
    pub fn peek(&self) -> JitResult<WordValue> {
        self.value_stack
            .last()
            .copied()
            .ok_or(JitError::StackUnderflow)
    }

    /// Get current stack depth
    pub fn stack_depth(&self) -> usize {
        self.value_stack.len()
    }

    /// Stack contents, bottom first
    pub fn stack(&self) -> &[WordValue] {
        &self.value_stack
    }

    /// Check if current block is terminated
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Mark current block as terminated
    pub fn mark_terminated(&mut self) {
        self.terminated = true;
    }

    /// Get the runtime data pointer
    pub fn rt_ptr(&self) -> Value {
        self.rt_ptr
    }

    pub fn pointer_type(&self) -> Type {
        self.pointer_type
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    // =========================================================================
    // Word Constants
    // =========================================================================

    /// Create a word constant from little-endian limbs
    pub fn const_word(&mut self, limbs: [u64; WORD_LIMBS]) -> WordValue {
        let limbs = limbs.map(|l| self.builder.ins().iconst(types::I64, l as i64));
        WordValue::new(limbs)
    }

    pub fn const_u64(&mut self, n: u64) -> WordValue {
        self.const_word([n, 0, 0, 0])
    }

    // =========================================================================
    // Width Changes
    // =========================================================================

    /// Zero-extend an `I64` into a word
    pub fn word_from_i64(&mut self, val: Value) -> WordValue {
        let zero = self.builder.ins().iconst(types::I64, 0);
        WordValue::new([val, zero, zero, zero])
    }

    /// Zero-extend an `I8` boolean into a word
    pub fn word_from_bool(&mut self, flag: Value) -> WordValue {
        let wide = self.builder.ins().uextend(types::I64, flag);
        self.word_from_i64(wide)
    }

    /// Truncate a word to pointer width
    pub fn truncate_to_ptr(&mut self, val: WordValue) -> Value {
        if self.pointer_type == types::I64 {
            val.low()
        } else {
            self.builder.ins().ireduce(self.pointer_type, val.low())
        }
    }

    /// Keep the low 160 bits, zero the rest
    pub fn mask_address(&mut self, val: WordValue) -> WordValue {
        let zero = self.builder.ins().iconst(types::I64, 0);
        let top = self.builder.ins().band_imm(val.limbs[2], 0xFFFF_FFFF);
        WordValue::new([val.limbs[0], val.limbs[1], top, zero])
    }

    /// `I8` flag set when the word's value fits in 64 bits
    pub fn fits_in_u64(&mut self, val: WordValue) -> Value {
        let high = self.builder.ins().bor(val.limbs[1], val.limbs[2]);
        let high = self.builder.ins().bor(high, val.limbs[3]);
        self.builder.ins().icmp_imm(IntCC::Equal, high, 0)
    }

    // =========================================================================
    // Memory
    // =========================================================================

    /// Byte offset of limb `i` within a word stored in native order
    pub fn limb_offset(&self, i: usize) -> i32 {
        match self.endianness {
            Endianness::Little => (8 * i) as i32,
            Endianness::Big => (8 * (WORD_LIMBS - 1 - i)) as i32,
        }
    }

    pub fn load_word(&mut self, ptr: Value, offset: i32, flags: MemFlags) -> WordValue {
        let mut limbs = [ptr; WORD_LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let at = offset + self.limb_offset(i);
            *limb = self.builder.ins().load(types::I64, flags, ptr, at);
        }
        WordValue::new(limbs)
    }

    pub fn store_word(&mut self, val: WordValue, ptr: Value, offset: i32, flags: MemFlags) {
        for (i, limb) in val.limbs.iter().enumerate() {
            let at = offset + self.limb_offset(i);
            self.builder.ins().store(flags, *limb, ptr, at);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift::codegen::ir::{Function, UserFuncName};
    use cranelift::codegen::isa::CallConv;

    fn with_codegen(endianness: Endianness, f: impl FnOnce(&mut CodegenContext<'_, '_>)) {
        let mut sig = Signature::new(CallConv::SystemV);
        sig.params.push(AbiParam::new(types::I64));
        let mut func = Function::with_name_signature(UserFuncName::default(), sig);
        let mut func_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut func, &mut func_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);
        let rt = builder.block_params(entry)[0];
        let mut codegen = CodegenContext::new(&mut builder, rt, types::I64, endianness);
        f(&mut codegen);
        codegen.builder.ins().return_(&[]);
        builder.finalize();
    }

    #[test]
    fn test_limb_offsets_follow_endianness() {
        with_codegen(Endianness::Little, |cg| {
            assert_eq!(
                (0..4).map(|i| cg.limb_offset(i)).collect::<Vec<_>>(),
                vec![0, 8, 16, 24]
            );
        });
        with_codegen(Endianness::Big, |cg| {
            assert_eq!(
                (0..4).map(|i| cg.limb_offset(i)).collect::<Vec<_>>(),
                vec![24, 16, 8, 0]
            );
        });
    }

    #[test]
    fn test_stack_underflow() {
        with_codegen(Endianness::Little, |cg| {
            assert_eq!(cg.pop(), Err(JitError::StackUnderflow));
            let w = cg.const_u64(7);
            cg.push(w).unwrap();
            assert_eq!(cg.stack_depth(), 1);
            assert_eq!(cg.peek().unwrap(), w);
            assert_eq!(cg.pop().unwrap(), w);
        });
    }

    #[test]
    fn test_word_from_i64_zeroes_upper_limbs() {
        with_codegen(Endianness::Little, |cg| {
            let w = cg.const_word([1, 2, 3, 4]);
            let masked = cg.word_from_i64(w.low());
            assert_eq!(masked.low(), w.low());
            assert_eq!(masked.limbs[1], masked.limbs[2]);
            assert_eq!(masked.limbs[2], masked.limbs[3]);
        });
    }
}
