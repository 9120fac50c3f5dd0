//! Environment Call Bridge
//!
//! Generated code reaches blockchain state, hashing, sub-calls and logs only
//! through a small set of native host functions. This module emits those
//! calls:
//!
//! - [`table`]: registry of the native symbols and their logical signatures
//! - [`abi`]: per-target calling-convention descriptor and the call adapter
//! - [`slots`]: scratch stack slots reused across call sites
//! - [`endian`]: conversion between native and big-endian words
//! - [`memref`]: `(pointer, length)` descriptors
//! - [`ops`]: one builder per VM operation that needs the environment
//!
//! An [`EnvBridge`] lives for the compilation of one function. The
//! [`EnvFuncTable`] it borrows lives as long as the module it declares into.

pub mod abi;
pub mod endian;
pub mod memref;
pub mod ops;
pub mod slots;
pub mod table;

use cranelift::codegen::ir::{FuncRef, Function};
use cranelift::codegen::isa::TargetFrontendConfig;
use cranelift::prelude::*;
use cranelift_module::Module;

pub use abi::{AbiFamily, ArgPlacement, CallConvDescriptor, EnvArg, EnvReturn, LoweredSignature};
pub use endian::EndianBoundary;
pub use memref::MemoryRef;
pub use slots::ScratchSlots;
pub use table::{EnvFunc, EnvFuncTable, EnvParam, EnvSignature};

use crate::config::EnvDispatch;
use crate::jit::frame::{MemoryManager, RuntimeManager};
use crate::jit::types::JitResult;

/// Emits environment calls for one function under compilation.
pub struct EnvBridge<'m, M: Module> {
    module: &'m mut M,
    table: &'m mut EnvFuncTable,
    runtime: &'m dyn RuntimeManager,
    memory: &'m dyn MemoryManager,

    dispatch: EnvDispatch,
    frontend: TargetFrontendConfig,
    boundary: EndianBoundary,

    slots: ScratchSlots,

    /// Log topics buffer, allocated on first LOG
    topics: Option<Value>,

    /// Imports into the current function, by [`EnvFunc`]
    refs: [Option<FuncRef>; EnvFunc::COUNT],
}

impl<'m, M: Module> EnvBridge<'m, M> {
    pub fn new(
        module: &'m mut M,
        table: &'m mut EnvFuncTable,
        runtime: &'m dyn RuntimeManager,
        memory: &'m dyn MemoryManager,
        dispatch: EnvDispatch,
        frontend: TargetFrontendConfig,
    ) -> Self {
        let boundary = EndianBoundary::new(table.conv().endianness);
        EnvBridge {
            module,
            table,
            runtime,
            memory,
            dispatch,
            frontend,
            boundary,
            slots: ScratchSlots::new(frontend.pointer_type()),
            topics: None,
            refs: [None; EnvFunc::COUNT],
        }
    }

    pub fn slots(&self) -> &ScratchSlots {
        &self.slots
    }

    pub fn dispatch(&self) -> EnvDispatch {
        self.dispatch
    }

    pub fn boundary(&self) -> EndianBoundary {
        self.boundary
    }

    pub fn has_topics_buffer(&self) -> bool {
        self.topics.is_some()
    }

    pub fn pointer_type(&self) -> Type {
        self.frontend.pointer_type()
    }

    /// Import `func` into the function under compilation, declaring it in
    /// the module first if needed.
    fn import(
        &mut self,
        func: &mut Function,
        id: EnvFunc,
    ) -> JitResult<(FuncRef, LoweredSignature)> {
        let declared = self.table.resolve(&mut *self.module, id)?.clone();
        let index = id as usize;
        let func_ref = match self.refs[index] {
            Some(r) => r,
            None => {
                let r = self.module.declare_func_in_func(declared.id, func);
                self.refs[index] = Some(r);
                r
            }
        };
        Ok((func_ref, declared.lowered))
    }
}

#[cfg(test)]
mod tests;
