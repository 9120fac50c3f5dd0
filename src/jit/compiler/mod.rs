//! Bytecode-to-Cranelift JIT Compiler
//!
//! This module translates EVM bytecode chunks into native code using
//! Cranelift. The compilation process:
//!
//! 1. Analyze the chunk (decodes, no stack underflow, output depth)
//! 2. Build Cranelift IR, routing environment opcodes through the
//!    [`EnvBridge`]
//! 3. Generate native code via the Cranelift JIT module
//! 4. Return a [`CompiledChunk`] for direct execution
//!
//! A compiled chunk has the signature
//! `extern "C" fn(*mut RuntimeData, *mut u64) -> i64`: it writes the final
//! operand stack, bottom first and four native limbs per word, to the output
//! buffer and returns the stack depth.

mod analysis;


use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};
use ethereum_types::U256;
use tracing::{debug, trace};

use super::codegen::CodegenContext;
use super::env::{CallConvDescriptor, EnvBridge, EnvFuncTable};
use super::frame::{FrameRuntime, LinearMemory};
use super::handlers;
use super::types::{JitError, JitResult, RuntimeData, WORD_LIMBS};
use crate::bytecode::{Chunk, Opcode};
use crate::config::JitConfig;
use crate::host::{abi, Host, HostEnv};

pub use analysis::{can_compile, max_stack_depth};

/// Native entry point of a compiled chunk
pub type ChunkFn = unsafe extern "C" fn(*mut RuntimeData, *mut u64) -> i64;

/// JIT Compiler for bytecode chunks
///
/// Owns the Cranelift JIT module and the environment function table that
/// declares host imports into it; both live as long as the compiled code.
pub struct JitCompiler {
    module: JITModule,

    /// Environment imports declared in `module`
    table: EnvFuncTable,

    config: JitConfig,

    /// Counter for generating unique function names
    func_counter: u64,
}

/// Native code for one chunk.
///
/// Valid only while the [`JitCompiler`] that produced it is alive.
#[derive(Debug, Clone, Copy)]
pub struct CompiledChunk {
    code: *const u8,
    max_stack: usize,
    scratch_slots: usize,
}

/// Result of running a compiled chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Final operand stack, bottom first
    pub stack: Vec<U256>,
    /// Gas counter after execution
    pub gas: i64,
}

impl JitCompiler {
    /// Create a compiler for the host machine with the default configuration
    pub fn new() -> JitResult<Self> {
        Self::with_config(JitConfig::default())
    }

    pub fn with_config(config: JitConfig) -> JitResult<Self> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("opt_level", config.opt_level.as_setting())
            .map_err(|e| JitError::CompilationError(format!("Failed to set opt_level: {}", e)))?;

        let isa_builder = cranelift_native::builder().map_err(|e| {
            JitError::CompilationError(format!("Failed to create ISA builder: {}", e))
        })?;

        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| JitError::CompilationError(format!("Failed to create ISA: {}", e)))?;

        let conv = CallConvDescriptor::for_isa(isa.as_ref())?;
        debug!(
            target: "evmjit::jit::compiler",
            isa = isa.name(),
            family = ?conv.family,
            endianness = ?conv.endianness,
            "Creating JIT compiler"
        );

        let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        if config.register_host_symbols {
            abi::register_symbols(&mut builder);
        }

        Ok(JitCompiler {
            module: JITModule::new(builder),
            table: EnvFuncTable::new(conv),
            config,
            func_counter: 0,
        })
    }

    pub fn config(&self) -> &JitConfig {
        &self.config
    }

    pub fn call_conv(&self) -> &CallConvDescriptor {
        self.table.conv()
    }

    /// Number of environment functions declared so far
    pub fn declared_env_functions(&self) -> usize {
        self.table.declared_count()
    }

    /// Compile a bytecode chunk to native code
    pub fn compile(&mut self, chunk: &Chunk) -> JitResult<CompiledChunk> {
        let max_stack = max_stack_depth(chunk)?;

        // Generate unique function name
        let func_name = format!("evm_{}_{}", chunk.name(), self.func_counter);
        self.func_counter += 1;

        // fn(*mut RuntimeData, *mut u64) -> i64
        let ptr = self.module.target_config().pointer_type();
        let mut sig = self.module.make_signature();
        sig.params.push(AbiParam::new(ptr));
        sig.params.push(AbiParam::new(ptr));
        sig.returns.push(AbiParam::new(types::I64));

        let func_id = self
            .module
            .declare_function(&func_name, Linkage::Local, &sig)
            .map_err(|e| JitError::CompilationError(format!("Failed to declare function: {}", e)))?;

        let mut ctx = self.module.make_context();
        ctx.func.signature = sig;

        let scratch_slots = self.build_function(&mut ctx, chunk)?;

        if self.config.trace_ir {
            trace!(target: "evmjit::jit::compiler::ir", ir = %ctx.func.display(), "Generated IR");
        }

        self.module
            .define_function(func_id, &mut ctx)
            .map_err(|e| JitError::CompilationError(format!("Failed to define function: {}", e)))?;
        self.module.clear_context(&mut ctx);

        self.module.finalize_definitions().map_err(|e| {
            JitError::CompilationError(format!("Failed to finalize definitions: {}", e))
        })?;

        let code = self.module.get_finalized_function(func_id);
        debug!(
            target: "evmjit::jit::compiler",
            name = %func_name,
            bytes = chunk.len(),
            max_stack,
            scratch_slots,
            "Compiled chunk"
        );

        Ok(CompiledChunk {
            code,
            max_stack,
            scratch_slots,
        })
    }

    /// Build the Cranelift IR for a bytecode chunk. Returns the number of
    /// scratch slots the function ended up with.
    fn build_function(&mut self, ctx: &mut codegen::Context, chunk: &Chunk) -> JitResult<usize> {
        let frontend = self.module.isa().frontend_config();
        let endianness = self.table.conv().endianness;
        let dispatch = self.config.dispatch;

        let mut func_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut func_ctx);

        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);
        builder.seal_block(entry_block);

        let rt_ptr = builder.block_params(entry_block)[0];
        let out_ptr = builder.block_params(entry_block)[1];

        let mut codegen =
            CodegenContext::new(&mut builder, rt_ptr, frontend.pointer_type(), endianness);
        let runtime = FrameRuntime;
        let memory = LinearMemory;
        let mut bridge = EnvBridge::new(
            &mut self.module,
            &mut self.table,
            &runtime,
            &memory,
            dispatch,
            frontend,
        );

        for instr in chunk.instructions() {
            let instr = instr?;
            match instr.opcode {
                Opcode::Stop => codegen.mark_terminated(),
                op if op == Opcode::Pop || op.immediate_size() > 0 => {
                    handlers::compile_stack_op(&mut codegen, &instr)?
                }
                _ => handlers::compile_env_op(&mut bridge, &mut codegen, &instr)?,
            }
            if codegen.is_terminated() {
                break;
            }
        }

        // Spill the final stack to the output buffer
        let stack = codegen.stack().to_vec();
        for (i, word) in stack.iter().enumerate() {
            for (j, limb) in word.limbs.iter().enumerate() {
                let offset = ((i * WORD_LIMBS + j) * 8) as i32;
                codegen
                    .builder
                    .ins()
                    .store(MemFlags::trusted(), *limb, out_ptr, offset);
            }
        }
        let depth = codegen.builder.ins().iconst(types::I64, stack.len() as i64);
        codegen.builder.ins().return_(&[depth]);

        let scratch_slots = bridge.slots().capacity();
        builder.finalize();
        Ok(scratch_slots)
    }
}

impl CompiledChunk {
    /// Words the output buffer must hold
    pub fn max_stack(&self) -> usize {
        self.max_stack
    }

    /// Scratch slots the function allocates
    pub fn scratch_slots(&self) -> usize {
        self.scratch_slots
    }

    pub fn entry(&self) -> ChunkFn {
        // SAFETY: `code` was produced by `compile` with the `ChunkFn` signature
        unsafe { std::mem::transmute::<*const u8, ChunkFn>(self.code) }
    }

    /// Run against `host`.
    ///
    /// # Safety
    /// The compiler that produced this chunk must still be alive and must
    /// have registered the host entry points. `memory` must be large enough
    /// for every memory range the chunk touches.
    pub unsafe fn execute(
        &self,
        host: &mut dyn Host,
        call_data: &[u8],
        memory: &mut [u8],
        gas: i64,
    ) -> Execution {
        let mut env = HostEnv::new(host);
        self.execute_in(&mut env, call_data, memory, gas)
    }

    /// Run with an explicit environment handle.
    ///
    /// # Safety
    /// Same as [`CompiledChunk::execute`].
    pub unsafe fn execute_in(
        &self,
        env: &mut HostEnv<'_>,
        call_data: &[u8],
        memory: &mut [u8],
        gas: i64,
    ) -> Execution {
        let mut rt = RuntimeData::new(env.as_handle(), call_data, memory, gas);
        let mut out = vec![0u64; self.max_stack * WORD_LIMBS];
        let depth = (self.entry())(&mut rt, out.as_mut_ptr());

        let stack = out
            .chunks_exact(WORD_LIMBS)
            .take(depth.max(0) as usize)
            .map(|limbs| U256([limbs[0], limbs[1], limbs[2], limbs[3]]))
            .collect();
        Execution {
            stack,
            gas: rt.gas,
        }
    }
}
