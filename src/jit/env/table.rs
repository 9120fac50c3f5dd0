//! Environment function registry.
//!
//! [`EnvFunc`] is the closed set of native symbols generated code may call.
//! [`EnvFuncTable`] declares each one at most once per compilation unit and
//! remembers the signature it was lowered to for the current target.

use cranelift::prelude::*;
use cranelift_module::{FuncId, Linkage, Module};
use tracing::debug;

use super::abi::{CallConvDescriptor, LoweredSignature};
use crate::jit::types::{JitError, JitResult, MEMREF_BYTES, WORD_BYTES};

/// Native functions generated code calls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvFunc {
    /// Generic read-only entry point, keyed by [`crate::jit::types::EnvKey`]
    Query,
    /// Generic write entry point, keyed by [`crate::jit::types::EnvKey`]
    Update,
    SLoad,
    SStore,
    Sha3,
    Balance,
    Create,
    Call,
    Log,
    BlockHash,
    ExtCode,
}

/// Logical parameter of an environment function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvParam {
    /// Opaque environment handle
    Env,
    I32,
    I64,
    /// Pointer to caller-owned memory
    Ptr,
    /// Aggregate of the given size passed by value
    ByVal(u32),
}

/// Logical signature, before lowering for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvSignature {
    /// Result written through a hidden struct-return pointer
    pub sret: bool,
    pub params: &'static [EnvParam],
    pub ret: Option<Type>,
}

const WORD: EnvParam = EnvParam::ByVal(WORD_BYTES);
const MEMREF: EnvParam = EnvParam::ByVal(MEMREF_BYTES);

impl EnvFunc {
    pub const COUNT: usize = 11;

    pub const ALL: [EnvFunc; EnvFunc::COUNT] = [
        EnvFunc::Query,
        EnvFunc::Update,
        EnvFunc::SLoad,
        EnvFunc::SStore,
        EnvFunc::Sha3,
        EnvFunc::Balance,
        EnvFunc::Create,
        EnvFunc::Call,
        EnvFunc::Log,
        EnvFunc::BlockHash,
        EnvFunc::ExtCode,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            EnvFunc::Query => "evm.query",
            EnvFunc::Update => "evm.update",
            EnvFunc::SLoad => "env_sload",
            EnvFunc::SStore => "env_sstore",
            EnvFunc::Sha3 => "env_sha3",
            EnvFunc::Balance => "env_balance",
            EnvFunc::Create => "env_create",
            EnvFunc::Call => "env_call",
            EnvFunc::Log => "env_log",
            EnvFunc::BlockHash => "env_blockhash",
            EnvFunc::ExtCode => "env_extcode",
        }
    }

    pub const fn signature(self) -> EnvSignature {
        use EnvParam::{Env, Ptr, I32, I64};

        match self {
            EnvFunc::Query => EnvSignature {
                sret: true,
                params: &[Env, I32, WORD],
                ret: None,
            },
            EnvFunc::Update => EnvSignature {
                sret: false,
                params: &[Env, I32, WORD, WORD],
                ret: None,
            },
            EnvFunc::SLoad | EnvFunc::SStore | EnvFunc::BlockHash => EnvSignature {
                sret: false,
                params: &[Env, Ptr, Ptr],
                ret: None,
            },
            EnvFunc::Sha3 => EnvSignature {
                sret: false,
                params: &[Ptr, I64, Ptr],
                ret: None,
            },
            EnvFunc::Balance => EnvSignature {
                sret: false,
                params: &[Ptr, Env, Ptr],
                ret: None,
            },
            EnvFunc::Create => EnvSignature {
                sret: false,
                params: &[Env, Ptr, Ptr, Ptr, I64, Ptr],
                ret: None,
            },
            EnvFunc::Call => EnvSignature {
                sret: false,
                params: &[Env, I32, I64, Ptr, Ptr, Ptr, I64, MEMREF],
                ret: Some(types::I64),
            },
            EnvFunc::Log => EnvSignature {
                sret: false,
                params: &[Env, WORD, WORD],
                ret: None,
            },
            EnvFunc::ExtCode => EnvSignature {
                sret: true,
                params: &[Env, WORD],
                ret: None,
            },
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A declared import and the signature it was lowered to.
#[derive(Debug, Clone)]
pub struct DeclaredEnvFunc {
    pub id: FuncId,
    pub lowered: LoweredSignature,
}

/// Per-compilation-unit registry of environment function declarations.
#[derive(Debug)]
pub struct EnvFuncTable {
    conv: CallConvDescriptor,
    declared: [Option<DeclaredEnvFunc>; EnvFunc::COUNT],
}

impl EnvFuncTable {
    pub fn new(conv: CallConvDescriptor) -> Self {
        EnvFuncTable {
            conv,
            declared: std::array::from_fn(|_| None),
        }
    }

    pub fn conv(&self) -> &CallConvDescriptor {
        &self.conv
    }

    /// The declaration for `func`, created in `module` on first request.
    pub fn resolve<M: Module>(
        &mut self,
        module: &mut M,
        func: EnvFunc,
    ) -> JitResult<&DeclaredEnvFunc> {
        let index = func.index();
        if self.declared[index].is_none() {
            let lowered = self.conv.lower(&func.signature());
            let id = module
                .declare_function(func.symbol(), Linkage::Import, &lowered.signature)
                .map_err(|e| {
                    JitError::CompilationError(format!(
                        "Failed to declare {}: {}",
                        func.symbol(),
                        e
                    ))
                })?;
            debug!(
                target: "evmjit::jit::env",
                symbol = func.symbol(),
                params = lowered.signature.params.len(),
                "Declared environment function"
            );
            self.declared[index] = Some(DeclaredEnvFunc { id, lowered });
        }

        self.declared[index].as_ref().ok_or_else(|| {
            JitError::CompilationError(format!("{} was not declared", func.symbol()))
        })
    }

    /// Number of functions declared so far
    pub fn declared_count(&self) -> usize {
        self.declared.iter().filter(|d| d.is_some()).count()
    }
}
