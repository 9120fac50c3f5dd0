//! Host side of the environment ABI.
//!
//! Compiled code calls the `extern "C"` entry points in [`abi`]; they decode
//! the raw arguments and forward to a [`Host`] reached through the
//! environment handle, a `*mut HostEnv`.

pub mod abi;
mod memory;

use std::ffi::c_void;

use ethereum_types::{Address, H256, U256};

use crate::jit::types::CallKind;

pub use memory::{CallRecord, CreateRecord, LogEntry, MemoryHost};

/// Transaction and block context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxContext {
    pub address: Address,
    pub caller: Address,
    pub origin: Address,
    pub coinbase: Address,
    pub gas_limit: i64,
    pub number: i64,
    pub timestamp: i64,
}

/// A sub-call as requested by compiled code.
#[derive(Debug, Clone, Copy)]
pub struct CallRequest<'a> {
    pub kind: CallKind,
    pub gas: i64,
    pub address: Address,
    /// `None` for DELEGATECALL
    pub value: Option<U256>,
    pub input: &'a [u8],
}

/// Result of a sub-call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub gas_used: i64,
}

/// Blockchain state and side effects available to compiled code.
pub trait Host {
    fn context(&self) -> &TxContext;

    fn storage(&self, key: U256) -> U256;

    fn set_storage(&mut self, key: U256, value: U256);

    fn balance(&self, address: Address) -> U256;

    fn block_hash(&self, number: U256) -> H256;

    /// Code of `address`. The slice must stay valid until the execution
    /// that requested it returns.
    fn code(&self, address: Address) -> &[u8];

    /// Create a contract; `gas` may be charged.
    fn create(&mut self, gas: &mut i64, endowment: U256, init_code: &[u8]) -> Address;

    /// Perform a sub-call, writing return data into `output`.
    fn call(&mut self, request: CallRequest<'_>, output: &mut [u8]) -> CallOutcome;

    fn log(&mut self, topics: &[H256], data: &[u8]);

    fn selfdestruct(&mut self, beneficiary: Address);
}

/// The environment handle compiled code carries.
pub struct HostEnv<'h> {
    pub(crate) host: &'h mut dyn Host,

    /// Byte written past the 64-bit value of numeric query results
    pub(crate) numeric_fill: u8,

    /// Byte written above the 160 bits of address query results
    pub(crate) address_fill: u8,
}

impl<'h> HostEnv<'h> {
    pub fn new(host: &'h mut dyn Host) -> Self {
        HostEnv {
            host,
            numeric_fill: 0,
            address_fill: 0,
        }
    }

    /// Fill the unused bytes of numeric query results with `fill` instead
    /// of zero. Compiled code must not observe the difference.
    pub fn with_numeric_fill(mut self, fill: u8) -> Self {
        self.numeric_fill = fill;
        self
    }

    /// Same as [`HostEnv::with_numeric_fill`] for the 12 bytes above an
    /// address.
    pub fn with_address_fill(mut self, fill: u8) -> Self {
        self.address_fill = fill;
        self
    }

    /// Raw handle stored in [`crate::jit::types::RuntimeData::env`]
    pub fn as_handle(&mut self) -> *mut c_void {
        (self as *mut HostEnv<'h>).cast()
    }
}
