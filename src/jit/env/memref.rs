//! Memory reference descriptors.

use cranelift::prelude::*;

use super::slots::ScratchSlots;
use crate::jit::types::JitResult;

/// Byte offset of the length field inside a descriptor
pub const MEMREF_LEN_OFFSET: i32 = 8;

/// A `(pointer, length)` view of a byte range, built for exactly one
/// environment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRef {
    pub ptr: Value,
    /// `I64` byte count
    pub len: Value,
}

impl MemoryRef {
    pub fn new(ptr: Value, len: Value) -> Self {
        MemoryRef { ptr, len }
    }

    /// Write both fields into `slot`.
    pub fn write_into(&self, builder: &mut FunctionBuilder<'_>, slot: Value) {
        builder.ins().store(MemFlags::trusted(), self.ptr, slot, 0);
        builder
            .ins()
            .store(MemFlags::trusted(), self.len, slot, MEMREF_LEN_OFFSET);
    }

    /// Write the descriptor into a fresh scratch slot and return its address.
    pub fn in_scratch_slot(
        &self,
        builder: &mut FunctionBuilder<'_>,
        slots: &mut ScratchSlots,
    ) -> JitResult<Value> {
        let slot = slots.acquire(builder)?;
        self.write_into(builder, slot);
        Ok(slot)
    }

    /// Read a descriptor the host wrote at `addr`.
    pub fn read_from(builder: &mut FunctionBuilder<'_>, pointer_type: Type, addr: Value) -> Self {
        let ptr = builder.ins().load(pointer_type, MemFlags::trusted(), addr, 0);
        let len = builder
            .ins()
            .load(types::I64, MemFlags::trusted(), addr, MEMREF_LEN_OFFSET);
        MemoryRef { ptr, len }
    }
}
