//! Target calling conventions and the call adapter.
//!
//! A [`CallConvDescriptor`] decides once per target how each logical
//! environment parameter is physically passed. [`EnvBridge::call_with_convention`]
//! rewrites a call site to match: hidden struct-return pointers, aggregates
//! copied into scratch slots, aggregates split into integer registers.

use cranelift::codegen::ir::{ArgumentPurpose, Endianness};
use cranelift::codegen::isa::{CallConv, TargetIsa};
use cranelift::prelude::*;
use cranelift_module::Module;
use smallvec::SmallVec;
use tracing::trace;

use super::memref::MemoryRef;
use super::table::{EnvFunc, EnvParam, EnvSignature};
use super::EnvBridge;
use crate::jit::codegen::{CodegenContext, WordValue};
use crate::jit::types::{JitError, JitResult};

// =============================================================================
// Calling-Convention Descriptor
// =============================================================================

/// Register-assignment rules for aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiFamily {
    /// System V x86-64
    SystemV,
    /// Microsoft x64
    Windows,
    /// AArch64 procedure call standard (including Apple's variant)
    Aapcs64,
    /// RISC-V LP64
    RiscV,
}

/// How one logical parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPlacement {
    /// Scalar in an integer register or stack slot
    Direct(Type),
    /// Pointer supplied by the call site
    Pointer,
    /// Aggregate copied by the caller into the outgoing argument area
    OnStack(u32),
    /// Aggregate passed as `parts` eightbytes, after `padding` unused
    /// registers that push it entirely onto the stack
    Split { parts: u8, padding: u8 },
    /// Aggregate passed as a pointer to a caller-owned copy
    Reference,
}

/// A logical signature lowered for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredSignature {
    pub signature: Signature,
    pub placements: SmallVec<[ArgPlacement; 8]>,
    pub sret: bool,
    pub returns_value: bool,
}

/// Per-target answers to "how is this parameter passed?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallConvDescriptor {
    pub call_conv: CallConv,
    pub family: AbiFamily,
    pub pointer_type: Type,
    pub endianness: Endianness,
    int_arg_regs: u8,
    sret_in_arg_reg: bool,
}

impl CallConvDescriptor {
    pub fn system_v_x64() -> Self {
        CallConvDescriptor {
            call_conv: CallConv::SystemV,
            family: AbiFamily::SystemV,
            pointer_type: types::I64,
            endianness: Endianness::Little,
            int_arg_regs: 6,
            sret_in_arg_reg: true,
        }
    }

    pub fn windows_x64() -> Self {
        CallConvDescriptor {
            call_conv: CallConv::WindowsFastcall,
            family: AbiFamily::Windows,
            pointer_type: types::I64,
            endianness: Endianness::Little,
            int_arg_regs: 4,
            sret_in_arg_reg: true,
        }
    }

    /// AArch64; the struct-return pointer travels in x8.
    pub fn aapcs64(call_conv: CallConv) -> Self {
        CallConvDescriptor {
            call_conv,
            family: AbiFamily::Aapcs64,
            pointer_type: types::I64,
            endianness: Endianness::Little,
            int_arg_regs: 8,
            sret_in_arg_reg: false,
        }
    }

    pub fn riscv64() -> Self {
        CallConvDescriptor {
            call_conv: CallConv::SystemV,
            family: AbiFamily::RiscV,
            pointer_type: types::I64,
            endianness: Endianness::Little,
            int_arg_regs: 8,
            sret_in_arg_reg: true,
        }
    }

    pub fn for_isa(isa: &dyn TargetIsa) -> JitResult<Self> {
        let call_conv = isa.default_call_conv();
        let desc = match (isa.name(), call_conv) {
            ("x64", CallConv::WindowsFastcall) => Self::windows_x64(),
            ("x64", _) => Self::system_v_x64(),
            ("aarch64", cc) => Self::aapcs64(cc),
            ("riscv64", _) => Self::riscv64(),
            (name, cc) => {
                return Err(JitError::CompilationError(format!(
                    "No environment calling convention for {} ({})",
                    name, cc
                )))
            }
        };
        Ok(CallConvDescriptor {
            pointer_type: isa.pointer_type(),
            endianness: isa.endianness(),
            ..desc
        })
    }

    pub fn int_arg_regs(&self) -> u8 {
        self.int_arg_regs
    }

    /// Placement of every parameter of `sig`, in order.
    pub fn place(&self, sig: &EnvSignature) -> SmallVec<[ArgPlacement; 8]> {
        let mut free = self.int_arg_regs;
        if sig.sret && self.sret_in_arg_reg {
            free -= 1;
        }

        sig.params
            .iter()
            .map(|param| match param {
                EnvParam::Env | EnvParam::Ptr => {
                    free = free.saturating_sub(1);
                    ArgPlacement::Pointer
                }
                EnvParam::I32 => {
                    free = free.saturating_sub(1);
                    ArgPlacement::Direct(types::I32)
                }
                EnvParam::I64 => {
                    free = free.saturating_sub(1);
                    ArgPlacement::Direct(types::I64)
                }
                EnvParam::ByVal(size) => self.place_aggregate(*size, &mut free),
            })
            .collect()
    }

    fn place_aggregate(&self, size: u32, free: &mut u8) -> ArgPlacement {
        let parts = size.div_ceil(8) as u8;

        match self.family {
            AbiFamily::Windows => {
                *free = free.saturating_sub(1);
                if matches!(size, 1 | 2 | 4 | 8) {
                    ArgPlacement::Split { parts: 1, padding: 0 }
                } else {
                    ArgPlacement::Reference
                }
            }
            AbiFamily::SystemV => {
                if size <= 16 && parts <= *free {
                    *free -= parts;
                    ArgPlacement::Split { parts, padding: 0 }
                } else {
                    ArgPlacement::OnStack(size)
                }
            }
            AbiFamily::Aapcs64 => {
                if size > 16 {
                    *free = free.saturating_sub(1);
                    ArgPlacement::Reference
                } else if parts <= *free {
                    *free -= parts;
                    ArgPlacement::Split { parts, padding: 0 }
                } else {
                    // Remaining registers are abandoned; later arguments
                    // also go on the stack.
                    let padding = *free;
                    *free = 0;
                    ArgPlacement::Split { parts, padding }
                }
            }
            AbiFamily::RiscV => {
                if size > 16 {
                    *free = free.saturating_sub(1);
                    ArgPlacement::Reference
                } else {
                    // May straddle the last register and the stack
                    *free = free.saturating_sub(parts);
                    ArgPlacement::Split { parts, padding: 0 }
                }
            }
        }
    }

    /// Lower a logical signature to a Cranelift signature for this target.
    pub fn lower(&self, sig: &EnvSignature) -> LoweredSignature {
        let ptr = self.pointer_type;
        let placements = self.place(sig);
        let mut signature = Signature::new(self.call_conv);

        if sig.sret {
            signature
                .params
                .push(AbiParam::special(ptr, ArgumentPurpose::StructReturn));
        }
        for placement in &placements {
            match *placement {
                ArgPlacement::Direct(ty) => signature.params.push(AbiParam::new(ty)),
                ArgPlacement::Pointer | ArgPlacement::Reference => {
                    signature.params.push(AbiParam::new(ptr))
                }
                ArgPlacement::OnStack(size) => signature
                    .params
                    .push(AbiParam::special(ptr, ArgumentPurpose::StructArgument(size))),
                ArgPlacement::Split { parts, padding } => {
                    for _ in 0..(parts + padding) {
                        signature.params.push(AbiParam::new(types::I64));
                    }
                }
            }
        }
        if let Some(ty) = sig.ret {
            signature.returns.push(AbiParam::new(ty));
        }

        LoweredSignature {
            signature,
            placements,
            sret: sig.sret,
            returns_value: sig.ret.is_some(),
        }
    }
}

// =============================================================================
// Call Adapter
// =============================================================================

/// An actual argument at an environment call site.
#[derive(Debug, Clone, Copy)]
pub enum EnvArg {
    Scalar(Value),
    /// Word passed by value; already in the byte order the callee expects
    Word(WordValue),
    /// Descriptor passed by value
    MemRef(MemoryRef),
    /// Pointer to caller-owned memory
    Ptr(Value),
    /// Placeholder for a parameter the operation does not use
    Undef,
}

/// Result of an environment call.
#[derive(Debug, Clone, Copy)]
pub enum EnvReturn {
    Void,
    Value(Value),
    /// Struct-return destination, not dereferenced
    Ptr(Value),
    /// Struct-return destination loaded as a word
    Word(WordValue),
}

impl EnvReturn {
    pub fn value(self, func: EnvFunc) -> JitResult<Value> {
        match self {
            EnvReturn::Value(v) | EnvReturn::Ptr(v) => Ok(v),
            _ => Err(mismatch(func, 0, "expected a scalar or pointer result")),
        }
    }

    pub fn word(self, func: EnvFunc) -> JitResult<WordValue> {
        match self {
            EnvReturn::Word(w) => Ok(w),
            _ => Err(mismatch(func, 0, "expected a word result")),
        }
    }
}

fn mismatch(func: EnvFunc, param: usize, reason: &'static str) -> JitError {
    JitError::AbiMismatch {
        func: func.symbol(),
        param,
        reason,
    }
}

impl<'m, M: Module> EnvBridge<'m, M> {
    /// Emit a call to `func`, shaping `args` to the target convention.
    ///
    /// With struct-return, `deref` selects between the loaded word and the
    /// destination pointer. The scratch cursor is rewound before the call
    /// instruction is emitted.
    pub fn call_with_convention(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        func: EnvFunc,
        args: &[EnvArg],
        deref: bool,
    ) -> JitResult<EnvReturn> {
        let (func_ref, lowered) = self.import(codegen.builder.func, func)?;
        if args.len() != lowered.placements.len() {
            return Err(mismatch(func, args.len(), "wrong number of arguments"));
        }

        let mut actuals: SmallVec<[Value; 12]> = SmallVec::new();
        let sret = if lowered.sret {
            let dest = self.slots.acquire(codegen.builder)?;
            actuals.push(dest);
            Some(dest)
        } else {
            None
        };

        for (param, (arg, placement)) in args.iter().zip(&lowered.placements).enumerate() {
            match *placement {
                ArgPlacement::Direct(ty) => match *arg {
                    EnvArg::Scalar(v) => actuals.push(v),
                    EnvArg::Undef => actuals.push(codegen.builder.ins().iconst(ty, 0)),
                    _ => return Err(mismatch(func, param, "expected a scalar")),
                },
                ArgPlacement::Pointer => match *arg {
                    EnvArg::Ptr(p) => actuals.push(p),
                    EnvArg::Undef => actuals.push(self.slots.acquire(codegen.builder)?),
                    _ => return Err(mismatch(func, param, "expected a pointer")),
                },
                ArgPlacement::OnStack(_) | ArgPlacement::Reference => {
                    let addr = self.materialize(codegen, func, param, *arg)?;
                    actuals.push(addr);
                }
                ArgPlacement::Split { parts, padding } => {
                    let addr = self.materialize(codegen, func, param, *arg)?;
                    for _ in 0..padding {
                        actuals.push(codegen.builder.ins().iconst(types::I64, 0));
                    }
                    for part in 0..parts {
                        let eightbyte = codegen.builder.ins().load(
                            types::I64,
                            MemFlags::trusted(),
                            addr,
                            8 * part as i32,
                        );
                        actuals.push(eightbyte);
                    }
                }
            }
        }

        let slots_used = self.slots.cursor();
        self.slots.reset_after_call();

        let call = codegen.builder.ins().call(func_ref, &actuals);
        trace!(
            target: "evmjit::jit::env::abi",
            symbol = func.symbol(),
            args = actuals.len(),
            slots_used,
            "Emitted environment call"
        );

        Ok(match sret {
            Some(dest) if deref => {
                EnvReturn::Word(codegen.load_word(dest, 0, MemFlags::trusted()))
            }
            Some(dest) => EnvReturn::Ptr(dest),
            None if lowered.returns_value => {
                EnvReturn::Value(codegen.builder.inst_results(call)[0])
            }
            None => EnvReturn::Void,
        })
    }

    /// Address of a caller-owned copy of an aggregate argument.
    fn materialize(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        func: EnvFunc,
        param: usize,
        arg: EnvArg,
    ) -> JitResult<Value> {
        match arg {
            EnvArg::Word(word) => {
                let slot = self.slots.acquire(codegen.builder)?;
                codegen.store_word(word, slot, 0, MemFlags::trusted());
                Ok(slot)
            }
            EnvArg::MemRef(memref) => memref.in_scratch_slot(codegen.builder, &mut self.slots),
            EnvArg::Ptr(p) => Ok(p),
            EnvArg::Undef => self.slots.acquire(codegen.builder),
            EnvArg::Scalar(_) => Err(mismatch(func, param, "expected an aggregate")),
        }
    }
}
