//! Operation builders.
//!
//! One method per VM operation that crosses into the environment. Each
//! shapes its operands, converts words at the boundary, emits the call
//! through [`EnvBridge::call_with_convention`] and post-processes the
//! result into a native-order word.

use cranelift::prelude::*;
use cranelift_module::Module;

use super::abi::EnvArg;
use super::memref::MemoryRef;
use super::table::EnvFunc;
use super::EnvBridge;
use crate::config::EnvDispatch;
use crate::jit::codegen::{CodegenContext, WordValue};
use crate::jit::types::{
    CallKind, EnvKey, JitResult, QueryResultShape, ADDRESS_BYTES, CALL_FAILURE, MAX_TOPICS,
    WORD_BYTES,
};

/// Offset of the 20 address bytes inside a big-endian word
const ADDRESS_OFFSET: i64 = (WORD_BYTES - ADDRESS_BYTES) as i64;

/// Operands of CALL, CALLCODE and DELEGATECALL, in native order.
#[derive(Debug, Clone, Copy)]
pub struct CallOperands {
    pub kind: CallKind,
    pub gas: WordValue,
    pub address: WordValue,
    /// Absent for DELEGATECALL
    pub value: Option<WordValue>,
    pub input_offset: WordValue,
    pub input_size: WordValue,
    pub output_offset: WordValue,
    pub output_size: WordValue,
}

/// Code of an external account as read in place.
#[derive(Debug, Clone, Copy)]
pub struct ExternalCode {
    pub ptr: Value,
    pub size: WordValue,
}

impl<'m, M: Module> EnvBridge<'m, M> {
    fn env_arg(&self, codegen: &mut CodegenContext<'_, '_>) -> EnvArg {
        EnvArg::Ptr(self.runtime.env_ptr(codegen))
    }

    fn key_arg(codegen: &mut CodegenContext<'_, '_>, key: EnvKey) -> EnvArg {
        EnvArg::Scalar(codegen.builder.ins().iconst(types::I32, key as i64))
    }

    fn to_env(&self, codegen: &mut CodegenContext<'_, '_>, word: WordValue) -> WordValue {
        self.boundary.to_env(codegen.builder, word)
    }

    fn to_native(&self, codegen: &mut CodegenContext<'_, '_>, word: WordValue) -> WordValue {
        self.boundary.to_native(codegen.builder, word)
    }

    /// Scratch slot holding `word` in environment order.
    fn env_word_in_slot(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        word: WordValue,
    ) -> JitResult<Value> {
        let word = self.to_env(codegen, word);
        let slot = self.slots.acquire(codegen.builder)?;
        codegen.store_word(word, slot, 0, MemFlags::trusted());
        Ok(slot)
    }

    /// Load an environment-order word the host wrote at `addr`.
    fn load_env_word(&self, codegen: &mut CodegenContext<'_, '_>, addr: Value) -> WordValue {
        let word = codegen.load_word(addr, 0, MemFlags::trusted());
        self.to_native(codegen, word)
    }

    /// Dedicated `(env, in ptr, out ptr)` lookup, or `(out, env, in)` for
    /// balance.
    fn dedicated_lookup(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        func: EnvFunc,
        input: WordValue,
    ) -> JitResult<WordValue> {
        let env = self.env_arg(codegen);
        let input = EnvArg::Ptr(self.env_word_in_slot(codegen, input)?);
        let out = self.slots.acquire(codegen.builder)?;
        let args = if func == EnvFunc::Balance {
            [EnvArg::Ptr(out), env, input]
        } else {
            [env, input, EnvArg::Ptr(out)]
        };
        self.call_with_convention(codegen, func, &args, false)?;
        Ok(self.load_env_word(codegen, out))
    }

    // =========================================================================
    // Storage
    // =========================================================================

    pub fn sload(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        key: WordValue,
    ) -> JitResult<WordValue> {
        match self.dispatch {
            EnvDispatch::Generic => self.query(codegen, EnvKey::Storage, Some(key)),
            EnvDispatch::Dedicated => self.dedicated_lookup(codegen, EnvFunc::SLoad, key),
        }
    }

    pub fn sstore(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        key: WordValue,
        value: WordValue,
    ) -> JitResult<()> {
        let env = self.env_arg(codegen);
        match self.dispatch {
            EnvDispatch::Generic => {
                let key = self.to_env(codegen, key);
                let value = self.to_env(codegen, value);
                let tag = Self::key_arg(codegen, EnvKey::SStore);
                self.call_with_convention(
                    codegen,
                    EnvFunc::Update,
                    &[env, tag, EnvArg::Word(key), EnvArg::Word(value)],
                    false,
                )?;
            }
            EnvDispatch::Dedicated => {
                let key = self.env_word_in_slot(codegen, key)?;
                let value = self.env_word_in_slot(codegen, value)?;
                self.call_with_convention(
                    codegen,
                    EnvFunc::SStore,
                    &[env, EnvArg::Ptr(key), EnvArg::Ptr(value)],
                    false,
                )?;
            }
        }
        Ok(())
    }

    pub fn selfdestruct(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        beneficiary: WordValue,
    ) -> JitResult<()> {
        let env = self.env_arg(codegen);
        let tag = Self::key_arg(codegen, EnvKey::SelfDestruct);
        let beneficiary = self.to_env(codegen, beneficiary);
        self.call_with_convention(
            codegen,
            EnvFunc::Update,
            &[env, tag, EnvArg::Word(beneficiary), EnvArg::Undef],
            false,
        )?;
        Ok(())
    }

    // =========================================================================
    // Call Data
    // =========================================================================

    /// Load 32 bytes of call data starting at `index`, zero-padded past the
    /// end of the buffer.
    pub fn calldataload(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        index: WordValue,
    ) -> JitResult<WordValue> {
        let size = self.runtime.call_data_size(codegen);
        let data = self.runtime.call_data(codegen);
        let ptr_ty = self.pointer_type();

        // Compare at full width before truncating the index.
        let fits = codegen.fits_in_u64(index);
        let below = codegen
            .builder
            .ins()
            .icmp(IntCC::UnsignedLessThan, index.low(), size);
        let in_range = codegen.builder.ins().band(fits, below);
        let start = codegen.builder.ins().select(in_range, index.low(), size);

        let remaining = codegen.builder.ins().isub(size, start);
        let word_bytes = codegen
            .builder
            .ins()
            .iconst(types::I64, WORD_BYTES as i64);
        let copy_len = codegen.builder.ins().umin(remaining, word_bytes);
        let pad_len = codegen.builder.ins().isub(word_bytes, copy_len);

        let slot = self.slots.acquire(codegen.builder)?;
        let start = Self::to_ptr_width(codegen, ptr_ty, start);
        let copy_len = Self::to_ptr_width(codegen, ptr_ty, copy_len);
        let pad_len = Self::to_ptr_width(codegen, ptr_ty, pad_len);

        let src = codegen.builder.ins().iadd(data, start);
        codegen
            .builder
            .call_memcpy(self.frontend, slot, src, copy_len);
        let pad_start = codegen.builder.ins().iadd(slot, copy_len);
        let zero = codegen.builder.ins().iconst(types::I8, 0);
        codegen
            .builder
            .call_memset(self.frontend, pad_start, zero, pad_len);
        self.slots.reset_after_call();

        Ok(self.load_env_word(codegen, slot))
    }

    fn to_ptr_width(codegen: &mut CodegenContext<'_, '_>, ptr_ty: Type, val: Value) -> Value {
        if ptr_ty == types::I64 {
            val
        } else {
            codegen.builder.ins().ireduce(ptr_ty, val)
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Generic query through `evm.query`, post-processed by the key's
    /// result shape.
    pub fn query(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        key: EnvKey,
        arg: Option<WordValue>,
    ) -> JitResult<WordValue> {
        let env = self.env_arg(codegen);
        let tag = Self::key_arg(codegen, key);
        let arg = match arg {
            Some(word) => EnvArg::Word(self.to_env(codegen, word)),
            None => EnvArg::Undef,
        };
        let args = [env, tag, arg];

        match key.result_shape() {
            QueryResultShape::Word => {
                let raw = self
                    .call_with_convention(codegen, EnvFunc::Query, &args, true)?
                    .word(EnvFunc::Query)?;
                Ok(self.to_native(codegen, raw))
            }
            QueryResultShape::Address => {
                let raw = self
                    .call_with_convention(codegen, EnvFunc::Query, &args, true)?
                    .word(EnvFunc::Query)?;
                let native = self.to_native(codegen, raw);
                Ok(codegen.mask_address(native))
            }
            QueryResultShape::Numeric => {
                let dest = self
                    .call_with_convention(codegen, EnvFunc::Query, &args, false)?
                    .value(EnvFunc::Query)?;
                // Only the leading native i64 is defined; the rest of the
                // word is zeroed here rather than trusted.
                let low = codegen
                    .builder
                    .ins()
                    .load(types::I64, MemFlags::trusted(), dest, 0);
                Ok(codegen.word_from_i64(low))
            }
            QueryResultShape::MemRef => {
                let dest = self
                    .call_with_convention(codegen, EnvFunc::Query, &args, false)?
                    .value(EnvFunc::Query)?;
                let memref = MemoryRef::read_from(codegen.builder, self.pointer_type(), dest);
                Ok(codegen.word_from_i64(memref.len))
            }
        }
    }

    pub fn balance(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        address: WordValue,
    ) -> JitResult<WordValue> {
        let address = codegen.mask_address(address);
        match self.dispatch {
            EnvDispatch::Generic => self.query(codegen, EnvKey::Balance, Some(address)),
            EnvDispatch::Dedicated => self.dedicated_lookup(codegen, EnvFunc::Balance, address),
        }
    }

    pub fn blockhash(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        number: WordValue,
    ) -> JitResult<WordValue> {
        match self.dispatch {
            EnvDispatch::Generic => self.query(codegen, EnvKey::BlockHash, Some(number)),
            EnvDispatch::Dedicated => self.dedicated_lookup(codegen, EnvFunc::BlockHash, number),
        }
    }

    /// Fetch an account's code through `env_extcode`; the descriptor is read
    /// in place from the struct-return slot.
    pub fn extcode(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        address: WordValue,
    ) -> JitResult<ExternalCode> {
        let env = self.env_arg(codegen);
        let address = codegen.mask_address(address);
        let address = self.to_env(codegen, address);
        let dest = self
            .call_with_convention(
                codegen,
                EnvFunc::ExtCode,
                &[env, EnvArg::Word(address)],
                false,
            )?
            .value(EnvFunc::ExtCode)?;
        let memref = MemoryRef::read_from(codegen.builder, self.pointer_type(), dest);
        Ok(ExternalCode {
            ptr: memref.ptr,
            size: codegen.word_from_i64(memref.len),
        })
    }

    // =========================================================================
    // Creation, Hashing, Logs
    // =========================================================================

    /// Create a contract from the init code at `offset..offset+size`.
    /// Returns the new address in native order.
    pub fn create(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        endowment: WordValue,
        offset: WordValue,
        size: WordValue,
    ) -> JitResult<WordValue> {
        let out = self.slots.acquire(codegen.builder)?;
        let endowment = self.env_word_in_slot(codegen, endowment)?;
        let env = self.env_arg(codegen);
        let gas = self.runtime.gas_ptr(codegen);
        let init_code = self.memory.byte_ptr(codegen, offset);
        let init_len = size.low();

        self.call_with_convention(
            codegen,
            EnvFunc::Create,
            &[
                env,
                EnvArg::Ptr(gas),
                EnvArg::Ptr(endowment),
                EnvArg::Ptr(init_code),
                EnvArg::Scalar(init_len),
                EnvArg::Ptr(out),
            ],
            false,
        )?;
        Ok(self.load_env_word(codegen, out))
    }

    /// Keccak-256 of `offset..offset+size`.
    pub fn sha3(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        offset: WordValue,
        size: WordValue,
    ) -> JitResult<WordValue> {
        let data = self.memory.byte_ptr(codegen, offset);
        let out = self.slots.acquire(codegen.builder)?;
        self.call_with_convention(
            codegen,
            EnvFunc::Sha3,
            &[
                EnvArg::Ptr(data),
                EnvArg::Scalar(size.low()),
                EnvArg::Ptr(out),
            ],
            false,
        )?;
        Ok(self.load_env_word(codegen, out))
    }

    /// Emit a log of `offset..offset+size` with up to four topics.
    pub fn log(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        offset: WordValue,
        size: WordValue,
        topics: &[WordValue],
    ) -> JitResult<()> {
        debug_assert!(topics.len() <= MAX_TOPICS);

        let buffer = match self.topics {
            Some(buffer) => buffer,
            None => {
                let buffer = self
                    .slots
                    .allocate(codegen.builder, WORD_BYTES * MAX_TOPICS as u32)?;
                self.topics = Some(buffer);
                buffer
            }
        };
        for (i, topic) in topics.iter().take(MAX_TOPICS).enumerate() {
            let topic = self.to_env(codegen, *topic);
            codegen.store_word(topic, buffer, (i as u32 * WORD_BYTES) as i32, MemFlags::trusted());
        }

        let env = self.env_arg(codegen);
        let data_ptr = self.memory.byte_ptr(codegen, offset);
        let data = MemoryRef::new(data_ptr, size.low());
        let topics_len = codegen.builder.ins().iconst(
            types::I64,
            (topics.len().min(MAX_TOPICS) as u32 * WORD_BYTES) as i64,
        );
        let topics = MemoryRef::new(buffer, topics_len);

        self.call_with_convention(
            codegen,
            EnvFunc::Log,
            &[env, EnvArg::MemRef(data), EnvArg::MemRef(topics)],
            false,
        )?;
        Ok(())
    }

    // =========================================================================
    // Sub-calls
    // =========================================================================

    /// Emit a sub-call. Returns the raw `I64` from `env_call`: gas used by
    /// the callee, with the sign bit set on failure.
    pub fn call(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        operands: CallOperands,
    ) -> JitResult<Value> {
        let env = self.env_arg(codegen);
        let kind = codegen
            .builder
            .ins()
            .iconst(types::I32, operands.kind as i64);
        let gas = operands.gas.low();

        let address = codegen.mask_address(operands.address);
        let address_word = self.env_word_in_slot(codegen, address)?;
        let address_ptr = codegen
            .builder
            .ins()
            .iadd_imm(address_word, ADDRESS_OFFSET);

        let value = match operands.value {
            Some(value) if operands.kind.has_value() => {
                EnvArg::Ptr(self.env_word_in_slot(codegen, value)?)
            }
            _ => EnvArg::Undef,
        };

        let input = self.memory.byte_ptr(codegen, operands.input_offset);
        let output_ptr = self.memory.byte_ptr(codegen, operands.output_offset);
        let output = MemoryRef::new(output_ptr, operands.output_size.low());

        let ret = self
            .call_with_convention(
                codegen,
                EnvFunc::Call,
                &[
                    env,
                    EnvArg::Scalar(kind),
                    EnvArg::Scalar(gas),
                    EnvArg::Ptr(address_ptr),
                    value,
                    EnvArg::Ptr(input),
                    EnvArg::Scalar(operands.input_size.low()),
                    EnvArg::MemRef(output),
                ],
                false,
            )?
            .value(EnvFunc::Call)?;
        Ok(ret)
    }

    /// Charge the gas a sub-call reported to the frame's gas counter and
    /// return an `I8` flag set when the call succeeded.
    pub fn settle_call(&self, codegen: &mut CodegenContext<'_, '_>, ret: Value) -> Value {
        let success = codegen
            .builder
            .ins()
            .icmp_imm(IntCC::SignedGreaterThanOrEqual, ret, 0);
        let used = codegen.builder.ins().band_imm(ret, !CALL_FAILURE);

        let gas_ptr = self.runtime.gas_ptr(codegen);
        let gas = codegen
            .builder
            .ins()
            .load(types::I64, MemFlags::trusted(), gas_ptr, 0);
        let gas = codegen.builder.ins().isub(gas, used);
        codegen
            .builder
            .ins()
            .store(MemFlags::trusted(), gas, gas_ptr, 0);
        success
    }
}

