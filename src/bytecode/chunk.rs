//! Bytecode chunk representation

use super::opcodes::Opcode;
use crate::jit::types::{JitError, JitResult};

/// A straight-line piece of EVM bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    code: Vec<u8>,

    /// Name used in symbol names and diagnostics
    name: String,
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: Opcode,
    /// PUSH immediate, empty for every other opcode
    pub immediate: &'a [u8],
}

impl Chunk {
    pub fn new(code: Vec<u8>) -> Self {
        Chunk {
            code,
            name: "chunk".to_string(),
        }
    }

    pub fn with_name(code: Vec<u8>, name: impl Into<String>) -> Self {
        Chunk {
            code,
            name: name.into(),
        }
    }

    /// Decode hex text, with or without a `0x` prefix.
    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let text = text.trim();
        let text = text.strip_prefix("0x").unwrap_or(text);
        hex::decode(text).map(Chunk::new)
    }

    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    #[inline]
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    #[inline]
    pub fn read_opcode(&self, offset: usize) -> Option<Opcode> {
        self.read_byte(offset).and_then(Opcode::from_byte)
    }

    /// Decode the instruction at `offset`.
    pub fn instruction_at(&self, offset: usize) -> JitResult<Instruction<'_>> {
        let byte = self
            .read_byte(offset)
            .ok_or_else(|| JitError::NotCompilable(format!("offset {} past end", offset)))?;
        let opcode = Opcode::from_byte(byte).ok_or(JitError::InvalidOpcode(byte))?;
        let start = offset + 1;
        let end = start + opcode.immediate_size();
        let immediate = self
            .code
            .get(start..end)
            .ok_or(JitError::TruncatedPush { offset })?;
        Ok(Instruction {
            offset,
            opcode,
            immediate,
        })
    }

    /// Decoded instructions in order; stops after the first error.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            chunk: self,
            offset: 0,
            failed: false,
        }
    }
}

/// Iterator over a chunk's instructions
pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = JitResult<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.chunk.len() {
            return None;
        }
        match self.chunk.instruction_at(self.offset) {
            Ok(instr) => {
                self.offset += 1 + instr.immediate.len();
                Some(Ok(instr))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_push_and_sload() {
        let chunk = Chunk::from_hex("0x600154").unwrap();
        let instrs: Vec<_> = chunk.instructions().collect::<JitResult<_>>().unwrap();
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].opcode, Opcode::Push1);
        assert_eq!(instrs[0].immediate, &[0x01]);
        assert_eq!(instrs[1].offset, 2);
        assert_eq!(instrs[1].opcode, Opcode::SLoad);
    }

    #[test]
    fn test_truncated_push() {
        let chunk = Chunk::new(vec![0x54, 0x61, 0x01]);
        let result: JitResult<Vec<_>> = chunk.instructions().collect();
        assert_eq!(result.unwrap_err(), JitError::TruncatedPush { offset: 1 });
    }

    #[test]
    fn test_invalid_opcode_stops_iteration() {
        let chunk = Chunk::new(vec![0x01, 0x50]);
        let mut iter = chunk.instructions();
        assert_eq!(iter.next(), Some(Err(JitError::InvalidOpcode(0x01))));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_bad_hex() {
        assert!(Chunk::from_hex("0xzz").is_err());
    }
}
