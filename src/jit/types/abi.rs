//! Values as they cross the environment ABI.
//!
//! [`EnvWord`] is the 32-byte carrier used for every struct-return and
//! by-value word parameter; it holds a big-endian word, a native 64-bit
//! integer in its first eight bytes, or an [`EnvMemRef`], depending on the
//! operation. [`EnvMemRef`] is the (pointer, length) descriptor.

use ethereum_types::{Address, H256, U256};

use super::constants::{ADDRESS_BYTES, WORD_BYTES, WORD_LIMBS};

const ADDRESS_START: usize = (WORD_BYTES - ADDRESS_BYTES) as usize;

/// 32-byte environment word.
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvWord {
    pub bytes: [u8; 32],
}

/// Byte range descriptor passed across the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvMemRef {
    pub ptr: *const u8,
    pub len: u64,
}

impl EnvMemRef {
    pub fn empty() -> Self {
        EnvMemRef {
            ptr: std::ptr::null(),
            len: 0,
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        EnvMemRef {
            ptr: data.as_ptr(),
            len: data.len() as u64,
        }
    }

    /// View the referenced bytes.
    ///
    /// # Safety
    /// `ptr` must be valid for `len` bytes for the returned lifetime.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        if self.len == 0 || self.ptr.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.ptr, self.len as usize)
        }
    }
}

impl EnvWord {
    pub const fn zero() -> Self {
        EnvWord { bytes: [0; 32] }
    }

    pub fn from_u256(value: U256) -> Self {
        EnvWord {
            bytes: be_bytes_from_limbs(value.0),
        }
    }

    pub fn to_u256(&self) -> U256 {
        U256(limbs_from_be_bytes(&self.bytes))
    }

    pub fn from_h256(value: H256) -> Self {
        EnvWord { bytes: value.0 }
    }

    /// Address right-aligned in a big-endian word.
    pub fn from_address(address: Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[ADDRESS_START..].copy_from_slice(address.as_bytes());
        EnvWord { bytes }
    }

    pub fn to_address(&self) -> Address {
        Address::from_slice(&self.bytes[ADDRESS_START..])
    }

    /// Native 64-bit integer in the leading bytes; the remaining bytes are
    /// set to `fill`.
    pub fn from_numeric(value: i64, fill: u8) -> Self {
        let mut bytes = [fill; 32];
        bytes[..8].copy_from_slice(&value.to_ne_bytes());
        EnvWord { bytes }
    }

    pub fn from_memref(memref: EnvMemRef) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&(memref.ptr as usize as u64).to_ne_bytes());
        bytes[8..16].copy_from_slice(&memref.len.to_ne_bytes());
        EnvWord { bytes }
    }

    pub fn to_memref(&self) -> EnvMemRef {
        let mut ptr = [0u8; 8];
        let mut len = [0u8; 8];
        ptr.copy_from_slice(&self.bytes[..8]);
        len.copy_from_slice(&self.bytes[8..16]);
        EnvMemRef {
            ptr: u64::from_ne_bytes(ptr) as usize as *const u8,
            len: u64::from_ne_bytes(len),
        }
    }
}

/// Big-endian bytes of a word given as little-endian limbs.
pub fn be_bytes_from_limbs(limbs: [u64; WORD_LIMBS]) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, limb) in limbs.iter().enumerate() {
        let end = 32 - 8 * i;
        bytes[end - 8..end].copy_from_slice(&limb.to_be_bytes());
    }
    bytes
}

/// Little-endian limbs of a word given as big-endian bytes.
pub fn limbs_from_be_bytes(bytes: &[u8; 32]) -> [u64; WORD_LIMBS] {
    let mut limbs = [0u64; WORD_LIMBS];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let end = 32 - 8 * i;
        let mut chunk = [0u8; 8];
        chunk.copy_from_slice(&bytes[end - 8..end]);
        *limb = u64::from_be_bytes(chunk);
    }
    limbs
}
