//! Byte-order conversion at the environment boundary.
//!
//! The host ABI carries words big-endian. Every word that crosses it goes
//! through exactly one of [`EndianBoundary::to_env`] or
//! [`EndianBoundary::to_native`] at the crossing point.

use cranelift::codegen::ir::Endianness;
use cranelift::prelude::*;

use crate::jit::codegen::WordValue;

/// Converts words between native order and the environment's big-endian
/// representation for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndianBoundary {
    target: Endianness,
}

impl EndianBoundary {
    pub fn new(target: Endianness) -> Self {
        EndianBoundary { target }
    }

    /// Native-order word to the value whose in-memory image is big-endian.
    pub fn to_env(&self, builder: &mut FunctionBuilder<'_>, word: WordValue) -> WordValue {
        self.byte_reverse(builder, word)
    }

    /// Inverse of [`EndianBoundary::to_env`].
    pub fn to_native(&self, builder: &mut FunctionBuilder<'_>, word: WordValue) -> WordValue {
        self.byte_reverse(builder, word)
    }

    fn byte_reverse(&self, builder: &mut FunctionBuilder<'_>, word: WordValue) -> WordValue {
        match self.target {
            Endianness::Big => word,
            Endianness::Little => {
                let [l0, l1, l2, l3] = word.limbs;
                WordValue::new([
                    builder.ins().bswap(l3),
                    builder.ins().bswap(l2),
                    builder.ins().bswap(l1),
                    builder.ins().bswap(l0),
                ])
            }
        }
    }

    /// Host-side mirror of the conversion on little-endian limbs.
    pub fn reverse_limbs(&self, limbs: [u64; 4]) -> [u64; 4] {
        match self.target {
            Endianness::Big => limbs,
            Endianness::Little => [
                limbs[3].swap_bytes(),
                limbs[2].swap_bytes(),
                limbs[1].swap_bytes(),
                limbs[0].swap_bytes(),
            ],
        }
    }
}
