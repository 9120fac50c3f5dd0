//! Word-layout, ABI and environment-key constants.
//!
//! The numeric values of [`EnvKey`] and [`CallKind`] are part of the host
//! ABI: the generated code passes them as `i32` immediates and the host
//! entry points decode them with `from_raw`.

// =============================================================================
// Word Layout
// =============================================================================

/// Bytes in one VM word
pub const WORD_BYTES: u32 = 32;

/// 64-bit limbs in one VM word
pub const WORD_LIMBS: usize = 4;

/// Bytes in an account address
pub const ADDRESS_BYTES: u32 = 20;

/// Bytes of a memory reference descriptor (pointer, length)
pub const MEMREF_BYTES: u32 = 16;

/// Capacity of the per-function log topics buffer
pub const MAX_TOPICS: usize = 4;

/// Sign bit set by the host in a sub-call result when the call failed
pub const CALL_FAILURE: i64 = i64::MIN;

// =============================================================================
// Generic Entry Points
// =============================================================================

/// The two multiplexed host entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Read-only, returns a word through struct-return
    Query,
    /// Write, no return value
    Update,
}

/// Operation key passed to `evm.query` / `evm.update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EnvKey {
    Storage = 0,
    Address = 1,
    Caller = 2,
    Origin = 3,
    Coinbase = 5,
    GasLimit = 7,
    Number = 8,
    Timestamp = 9,
    CodeByAddress = 10,
    Balance = 11,
    BlockHash = 12,

    SStore = 64,
    SelfDestruct = 66,
}

/// How the raw query result is post-processed before it reaches the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResultShape {
    /// Big-endian word converted to native order
    Word,
    /// Big-endian word converted to native order, masked to 160 bits
    Address,
    /// Native 64-bit integer in the low limb, masked to 64 bits
    Numeric,
    /// Memory reference read in place
    MemRef,
}

impl EnvKey {
    pub const ALL: [EnvKey; 13] = [
        EnvKey::Storage,
        EnvKey::Address,
        EnvKey::Caller,
        EnvKey::Origin,
        EnvKey::Coinbase,
        EnvKey::GasLimit,
        EnvKey::Number,
        EnvKey::Timestamp,
        EnvKey::CodeByAddress,
        EnvKey::Balance,
        EnvKey::BlockHash,
        EnvKey::SStore,
        EnvKey::SelfDestruct,
    ];

    /// The entry point that consumes this key. Fixed for the lifetime of the
    /// crate; the host dispatch tables rely on it.
    pub const fn entry_point(self) -> EntryPoint {
        match self {
            EnvKey::SStore | EnvKey::SelfDestruct => EntryPoint::Update,
            _ => EntryPoint::Query,
        }
    }

    pub const fn result_shape(self) -> QueryResultShape {
        match self {
            EnvKey::Address | EnvKey::Caller | EnvKey::Origin | EnvKey::Coinbase => {
                QueryResultShape::Address
            }
            EnvKey::GasLimit | EnvKey::Number | EnvKey::Timestamp => QueryResultShape::Numeric,
            EnvKey::CodeByAddress => QueryResultShape::MemRef,
            _ => QueryResultShape::Word,
        }
    }

    pub fn from_raw(raw: i32) -> Option<EnvKey> {
        Self::ALL.iter().copied().find(|k| *k as i32 == raw)
    }
}

/// Sub-call flavour passed to `env_call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CallKind {
    Call = 0,
    DelegateCall = 1,
    CallCode = 2,
}

impl CallKind {
    pub fn from_raw(raw: i32) -> Option<CallKind> {
        match raw {
            0 => Some(CallKind::Call),
            1 => Some(CallKind::DelegateCall),
            2 => Some(CallKind::CallCode),
            _ => None,
        }
    }

    /// Whether the call transfers value (and so reads the value operand)
    pub fn has_value(self) -> bool {
        !matches!(self, CallKind::DelegateCall)
    }
}
