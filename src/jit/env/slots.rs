//! Scratch stack slots for environment-call marshaling.
//!
//! Slots are word-sized and created once. Their address instructions are
//! always placed in the entry block at a tracked allocation point, so a
//! call site inside a loop never emits a fresh allocation. The cursor
//! rewinds after every call; slot contents never survive a call site.

use cranelift::codegen::cursor::{Cursor, FuncCursor};
use cranelift::codegen::ir::Inst;
use cranelift::prelude::*;
use tracing::trace;

use crate::jit::types::{JitError, JitResult, WORD_BYTES};

/// log2 of the alignment of every scratch allocation
const SLOT_ALIGN_SHIFT: u8 = 3;

/// Grow-only pool of word-sized scratch slots with a rewinding cursor.
#[derive(Debug)]
pub struct ScratchSlots {
    pointer_type: Type,

    /// Slot addresses, defined in the entry block
    pool: Vec<Value>,

    cursor: usize,

    /// Last address instruction inserted into the entry block
    alloc_point: Option<Inst>,
}

impl ScratchSlots {
    pub fn new(pointer_type: Type) -> Self {
        ScratchSlots {
            pointer_type,
            pool: Vec::new(),
            cursor: 0,
            alloc_point: None,
        }
    }

    /// Address of the next free slot, growing the pool when every slot is
    /// already in use at this call site.
    pub fn acquire(&mut self, builder: &mut FunctionBuilder<'_>) -> JitResult<Value> {
        if self.cursor == self.pool.len() {
            let addr = self.allocate(builder, WORD_BYTES)?;
            self.pool.push(addr);
            trace!(
                target: "evmjit::jit::env",
                capacity = self.pool.len(),
                "Grew scratch slot pool"
            );
        }
        let addr = self.pool[self.cursor];
        self.cursor += 1;
        Ok(addr)
    }

    /// Marshaling for the current call site is complete.
    pub fn reset_after_call(&mut self) {
        self.cursor = 0;
    }

    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Create a stack slot of `size` bytes and return its address, defined
    /// in the entry block regardless of the builder's current position.
    pub fn allocate(&mut self, builder: &mut FunctionBuilder<'_>, size: u32) -> JitResult<Value> {
        let slot = builder.create_sized_stack_slot(StackSlotData::new(
            StackSlotKind::ExplicitSlot,
            size,
            SLOT_ALIGN_SHIFT,
        ));

        // Blocks enter the layout lazily, on their first instruction.
        if builder.func.layout.entry_block().is_none() {
            builder.ensure_inserted_block();
        }
        let entry = builder.func.layout.entry_block().ok_or_else(|| {
            JitError::CompilationError("Scratch slot requested before entry block".to_string())
        })?;

        let mut pos = FuncCursor::new(&mut *builder.func);
        pos = match self.alloc_point {
            Some(inst) => pos.after_inst(inst),
            None => pos.at_first_insertion_point(entry),
        };
        let addr = pos.ins().stack_addr(self.pointer_type, slot, 0);
        self.alloc_point = pos.func.dfg.value_def(addr).inst().or(self.alloc_point);

        Ok(addr)
    }
}
