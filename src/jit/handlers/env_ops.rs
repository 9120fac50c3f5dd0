//! Environment operation handlers for JIT compilation
//!
//! Handles: SHA3, ADDRESS, BALANCE, ORIGIN, CALLER, CALLDATALOAD, EXTCODESIZE,
//! BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, GASLIMIT, SLOAD, SSTORE, LOG0..LOG4,
//! CREATE, CALL, CALLCODE, DELEGATECALL, SELFDESTRUCT
//!
//! Operands are popped in EVM order: the first operand is the top of stack.

use cranelift_module::Module;
use smallvec::SmallVec;

use crate::bytecode::{Instruction, Opcode};
use crate::jit::codegen::CodegenContext;
use crate::jit::env::ops::CallOperands;
use crate::jit::env::EnvBridge;
use crate::jit::types::{CallKind, EnvKey, JitError, JitResult, MAX_TOPICS};

/// Compile an opcode that needs the environment.
pub fn compile_env_op<M: Module>(
    bridge: &mut EnvBridge<'_, M>,
    codegen: &mut CodegenContext<'_, '_>,
    instr: &Instruction<'_>,
) -> JitResult<()> {
    match instr.opcode {
        Opcode::Address
        | Opcode::Caller
        | Opcode::Origin
        | Opcode::Coinbase
        | Opcode::GasLimit
        | Opcode::Number
        | Opcode::Timestamp => {
            let key = query_key(instr.opcode)?;
            let result = bridge.query(codegen, key, None)?;
            codegen.push(result)?;
        }

        Opcode::Balance => {
            let address = codegen.pop()?;
            let result = bridge.balance(codegen, address)?;
            codegen.push(result)?;
        }

        Opcode::BlockHash => {
            let number = codegen.pop()?;
            let result = bridge.blockhash(codegen, number)?;
            codegen.push(result)?;
        }

        Opcode::CallDataLoad => {
            let index = codegen.pop()?;
            let result = bridge.calldataload(codegen, index)?;
            codegen.push(result)?;
        }

        Opcode::ExtCodeSize => {
            let address = codegen.pop()?;
            let code = bridge.extcode(codegen, address)?;
            codegen.push(code.size)?;
        }

        Opcode::SLoad => {
            let key = codegen.pop()?;
            let value = bridge.sload(codegen, key)?;
            codegen.push(value)?;
        }

        Opcode::SStore => {
            let key = codegen.pop()?;
            let value = codegen.pop()?;
            bridge.sstore(codegen, key, value)?;
        }

        Opcode::Sha3 => {
            let offset = codegen.pop()?;
            let size = codegen.pop()?;
            let hash = bridge.sha3(codegen, offset, size)?;
            codegen.push(hash)?;
        }

        Opcode::Create => {
            let value = codegen.pop()?;
            let offset = codegen.pop()?;
            let size = codegen.pop()?;
            let address = bridge.create(codegen, value, offset, size)?;
            codegen.push(address)?;
        }

        Opcode::Call | Opcode::CallCode | Opcode::DelegateCall => {
            let kind = match instr.opcode {
                Opcode::Call => CallKind::Call,
                Opcode::CallCode => CallKind::CallCode,
                _ => CallKind::DelegateCall,
            };
            let gas = codegen.pop()?;
            let address = codegen.pop()?;
            let value = if kind.has_value() {
                Some(codegen.pop()?)
            } else {
                None
            };
            let operands = CallOperands {
                kind,
                gas,
                address,
                value,
                input_offset: codegen.pop()?,
                input_size: codegen.pop()?,
                output_offset: codegen.pop()?,
                output_size: codegen.pop()?,
            };
            let ret = bridge.call(codegen, operands)?;
            let success = bridge.settle_call(codegen, ret);
            let success = codegen.word_from_bool(success);
            codegen.push(success)?;
        }

        Opcode::SelfDestruct => {
            let beneficiary = codegen.pop()?;
            bridge.selfdestruct(codegen, beneficiary)?;
            codegen.mark_terminated();
        }

        op => {
            let Some(count) = op.topic_count() else {
                return Err(JitError::NotCompilable(format!(
                    "{} is not an environment operation",
                    op
                )));
            };
            let offset = codegen.pop()?;
            let size = codegen.pop()?;
            let mut topics: SmallVec<[_; MAX_TOPICS]> = SmallVec::new();
            for _ in 0..count {
                topics.push(codegen.pop()?);
            }
            bridge.log(codegen, offset, size, &topics)?;
        }
    }
    Ok(())
}

fn query_key(op: Opcode) -> JitResult<EnvKey> {
    Ok(match op {
        Opcode::Address => EnvKey::Address,
        Opcode::Caller => EnvKey::Caller,
        Opcode::Origin => EnvKey::Origin,
        Opcode::Coinbase => EnvKey::Coinbase,
        Opcode::GasLimit => EnvKey::GasLimit,
        Opcode::Number => EnvKey::Number,
        Opcode::Timestamp => EnvKey::Timestamp,
        op => return Err(JitError::NotCompilable(format!("{} has no query key", op))),
    })
}
