//! In-memory [`Host`] that records every side effect.

use std::collections::HashMap;

use ethereum_types::{Address, H256, U256};
use tracing::debug;

use super::{CallOutcome, CallRequest, Host, TxContext};
use crate::jit::types::CallKind;

/// An emitted log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// A sub-call as the host received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub kind: CallKind,
    pub gas: i64,
    pub address: Address,
    pub value: Option<U256>,
    pub input: Vec<u8>,
    /// Length of the output range compiled code provided
    pub output_len: usize,
}

/// A contract creation as the host received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecord {
    pub endowment: U256,
    pub init_code: Vec<u8>,
    pub gas: i64,
    pub address: Address,
}

/// Host backed by hash maps.
///
/// Calls succeed with `call_outcome` and copy `call_output` into the
/// caller's output range. Created contracts get sequential addresses
/// starting at `0x…0100`.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    pub context: TxContext,
    pub storage: HashMap<U256, U256>,
    pub balances: HashMap<Address, U256>,
    pub block_hashes: HashMap<U256, H256>,
    pub code: HashMap<Address, Vec<u8>>,

    pub call_outcome: CallOutcome,
    pub call_output: Vec<u8>,
    /// Gas charged to the creator on each CREATE
    pub create_cost: i64,

    pub logs: Vec<LogEntry>,
    pub calls: Vec<CallRecord>,
    pub creates: Vec<CreateRecord>,
    pub selfdestructs: Vec<Address>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        MemoryHost {
            context: TxContext::default(),
            storage: HashMap::new(),
            balances: HashMap::new(),
            block_hashes: HashMap::new(),
            code: HashMap::new(),
            call_outcome: CallOutcome {
                success: true,
                gas_used: 0,
            },
            call_output: Vec::new(),
            create_cost: 0,
            logs: Vec::new(),
            calls: Vec::new(),
            creates: Vec::new(),
            selfdestructs: Vec::new(),
        }
    }
}

impl MemoryHost {
    pub fn new(context: TxContext) -> Self {
        MemoryHost {
            context,
            ..Default::default()
        }
    }

    fn next_create_address(&self) -> Address {
        Address::from_low_u64_be(0x100 + self.creates.len() as u64)
    }
}

impl Host for MemoryHost {
    fn context(&self) -> &TxContext {
        &self.context
    }

    fn storage(&self, key: U256) -> U256 {
        self.storage.get(&key).copied().unwrap_or_default()
    }

    fn set_storage(&mut self, key: U256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&key);
        } else {
            self.storage.insert(key, value);
        }
    }

    fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    fn block_hash(&self, number: U256) -> H256 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    fn code(&self, address: Address) -> &[u8] {
        self.code.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }

    fn create(&mut self, gas: &mut i64, endowment: U256, init_code: &[u8]) -> Address {
        let address = self.next_create_address();
        *gas -= self.create_cost;
        debug!(target: "evmjit::host", ?address, len = init_code.len(), "Contract created");
        self.creates.push(CreateRecord {
            endowment,
            init_code: init_code.to_vec(),
            gas: *gas,
            address,
        });
        address
    }

    fn call(&mut self, request: CallRequest<'_>, output: &mut [u8]) -> CallOutcome {
        let n = output.len().min(self.call_output.len());
        output[..n].copy_from_slice(&self.call_output[..n]);
        self.calls.push(CallRecord {
            kind: request.kind,
            gas: request.gas,
            address: request.address,
            value: request.value,
            input: request.input.to_vec(),
            output_len: output.len(),
        });
        self.call_outcome
    }

    fn log(&mut self, topics: &[H256], data: &[u8]) {
        self.logs.push(LogEntry {
            topics: topics.to_vec(),
            data: data.to_vec(),
        });
    }

    fn selfdestruct(&mut self, beneficiary: Address) {
        self.selfdestructs.push(beneficiary);
    }
}
