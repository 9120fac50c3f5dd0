//! Call-frame and memory access for generated code.
//!
//! The environment bridge needs four things from the current frame (the
//! environment handle, the gas counter's address, the call data buffer and
//! its length) and one thing from VM memory (the address of a byte offset).
//! Both are expressed as traits so the bridge does not depend on how
//! [`RuntimeData`] is laid out.

use cranelift::prelude::*;

use super::codegen::{CodegenContext, WordValue};
use super::types::RuntimeData;

/// Frame accessors available to environment builders.
pub trait RuntimeManager {
    fn env_ptr(&self, codegen: &mut CodegenContext<'_, '_>) -> Value;

    fn gas_ptr(&self, codegen: &mut CodegenContext<'_, '_>) -> Value;

    fn call_data(&self, codegen: &mut CodegenContext<'_, '_>) -> Value;

    /// Call data length as `I64`
    fn call_data_size(&self, codegen: &mut CodegenContext<'_, '_>) -> Value;
}

/// VM-addressable byte memory.
pub trait MemoryManager {
    /// Native address of the byte at `offset`
    fn byte_ptr(&self, codegen: &mut CodegenContext<'_, '_>, offset: WordValue) -> Value;
}

/// Reads the frame from the `*mut RuntimeData` the compiled function
/// receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameRuntime;

impl FrameRuntime {
    fn field(&self, codegen: &mut CodegenContext<'_, '_>, ty: Type, offset: i32) -> Value {
        let rt = codegen.rt_ptr();
        codegen
            .builder
            .ins()
            .load(ty, MemFlags::trusted().with_readonly(), rt, offset)
    }
}

impl RuntimeManager for FrameRuntime {
    fn env_ptr(&self, codegen: &mut CodegenContext<'_, '_>) -> Value {
        let ptr = codegen.pointer_type();
        self.field(codegen, ptr, RuntimeData::ENV_OFFSET)
    }

    fn gas_ptr(&self, codegen: &mut CodegenContext<'_, '_>) -> Value {
        let rt = codegen.rt_ptr();
        codegen
            .builder
            .ins()
            .iadd_imm(rt, RuntimeData::GAS_OFFSET as i64)
    }

    fn call_data(&self, codegen: &mut CodegenContext<'_, '_>) -> Value {
        let ptr = codegen.pointer_type();
        self.field(codegen, ptr, RuntimeData::CALL_DATA_OFFSET)
    }

    fn call_data_size(&self, codegen: &mut CodegenContext<'_, '_>) -> Value {
        self.field(codegen, types::I64, RuntimeData::CALL_DATA_SIZE_OFFSET)
    }
}

/// Flat memory whose base lives in [`RuntimeData::memory`].
///
/// The embedder sizes the memory up front; offsets are not bounds-checked
/// here.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearMemory;

impl MemoryManager for LinearMemory {
    fn byte_ptr(&self, codegen: &mut CodegenContext<'_, '_>, offset: WordValue) -> Value {
        let ptr = codegen.pointer_type();
        let rt = codegen.rt_ptr();
        let base = codegen.builder.ins().load(
            ptr,
            MemFlags::trusted().with_readonly(),
            rt,
            RuntimeData::MEMORY_OFFSET,
        );
        let offset = codegen.truncate_to_ptr(offset);
        codegen.builder.ins().iadd(base, offset)
    }
}
