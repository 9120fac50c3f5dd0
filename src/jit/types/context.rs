//! Runtime data passed to compiled code.
//!
//! This module defines [`RuntimeData`], the call frame a compiled chunk
//! receives as its first argument.

use std::ffi::c_void;
use std::mem::offset_of;

/// Call frame visible to JIT-compiled code.
///
/// This struct is `#[repr(C)]` so the generated code can address its
/// fields by fixed offsets.
#[repr(C)]
#[derive(Debug)]
pub struct RuntimeData {
    /// Gas counter; its address is handed to the host on contract creation
    pub gas: i64,

    /// Opaque environment handle forwarded to every host entry point
    pub env: *mut c_void,

    /// Call data buffer
    pub call_data: *const u8,

    /// Call data length in bytes
    pub call_data_size: u64,

    /// VM-addressable memory base
    pub memory: *mut u8,

    /// VM-addressable memory size in bytes
    pub memory_size: u64,
}

impl RuntimeData {
    pub const GAS_OFFSET: i32 = offset_of!(RuntimeData, gas) as i32;
    pub const ENV_OFFSET: i32 = offset_of!(RuntimeData, env) as i32;
    pub const CALL_DATA_OFFSET: i32 = offset_of!(RuntimeData, call_data) as i32;
    pub const CALL_DATA_SIZE_OFFSET: i32 = offset_of!(RuntimeData, call_data_size) as i32;
    pub const MEMORY_OFFSET: i32 = offset_of!(RuntimeData, memory) as i32;
    pub const MEMORY_SIZE_OFFSET: i32 = offset_of!(RuntimeData, memory_size) as i32;

    /// Create a frame over borrowed buffers.
    ///
    /// The buffers must outlive every execution that uses this frame.
    pub fn new(env: *mut c_void, call_data: &[u8], memory: &mut [u8], gas: i64) -> Self {
        RuntimeData {
            gas,
            env,
            call_data: call_data.as_ptr(),
            call_data_size: call_data.len() as u64,
            memory: memory.as_mut_ptr(),
            memory_size: memory.len() as u64,
        }
    }
}
