//! EVM opcodes understood by the environment translator.
//!
//! Only the instructions that reach the environment are decoded, plus the
//! stack plumbing needed to feed them operands.

use std::fmt;

/// Decoded opcode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // === Control ===
    /// Halt execution
    Stop = 0x00,

    // === Hashing ===
    /// Keccak-256 of a memory range: [offset, size] -> [hash]
    Sha3 = 0x20,

    // === Environment Queries ===
    Address = 0x30,
    Balance = 0x31,
    Origin = 0x32,
    Caller = 0x33,
    /// [index] -> [32 bytes of call data]
    CallDataLoad = 0x35,
    ExtCodeSize = 0x3b,

    // === Block Queries ===
    BlockHash = 0x40,
    Coinbase = 0x41,
    Timestamp = 0x42,
    Number = 0x43,
    GasLimit = 0x45,

    // === Stack and Storage ===
    Pop = 0x50,
    SLoad = 0x54,
    SStore = 0x55,

    // === Push (immediate of 1..=32 bytes, big-endian) ===
    Push1 = 0x60,
    Push2 = 0x61,
    Push3 = 0x62,
    Push4 = 0x63,
    Push5 = 0x64,
    Push6 = 0x65,
    Push7 = 0x66,
    Push8 = 0x67,
    Push9 = 0x68,
    Push10 = 0x69,
    Push11 = 0x6a,
    Push12 = 0x6b,
    Push13 = 0x6c,
    Push14 = 0x6d,
    Push15 = 0x6e,
    Push16 = 0x6f,
    Push17 = 0x70,
    Push18 = 0x71,
    Push19 = 0x72,
    Push20 = 0x73,
    Push21 = 0x74,
    Push22 = 0x75,
    Push23 = 0x76,
    Push24 = 0x77,
    Push25 = 0x78,
    Push26 = 0x79,
    Push27 = 0x7a,
    Push28 = 0x7b,
    Push29 = 0x7c,
    Push30 = 0x7d,
    Push31 = 0x7e,
    Push32 = 0x7f,

    // === Logs: [offset, size, topic0..topicN] ===
    Log0 = 0xa0,
    Log1 = 0xa1,
    Log2 = 0xa2,
    Log3 = 0xa3,
    Log4 = 0xa4,

    // === System ===
    /// [value, offset, size] -> [address]
    Create = 0xf0,
    /// [gas, address, value, in_offset, in_size, out_offset, out_size] -> [success]
    Call = 0xf1,
    CallCode = 0xf2,
    /// [gas, address, in_offset, in_size, out_offset, out_size] -> [success]
    DelegateCall = 0xf4,
    SelfDestruct = 0xff,
}

impl Opcode {
    pub const ALL: [Opcode; 58] = [
        Opcode::Stop,
        Opcode::Sha3,
        Opcode::Address,
        Opcode::Balance,
        Opcode::Origin,
        Opcode::Caller,
        Opcode::CallDataLoad,
        Opcode::ExtCodeSize,
        Opcode::BlockHash,
        Opcode::Coinbase,
        Opcode::Timestamp,
        Opcode::Number,
        Opcode::GasLimit,
        Opcode::Pop,
        Opcode::SLoad,
        Opcode::SStore,
        Opcode::Push1,
        Opcode::Push2,
        Opcode::Push3,
        Opcode::Push4,
        Opcode::Push5,
        Opcode::Push6,
        Opcode::Push7,
        Opcode::Push8,
        Opcode::Push9,
        Opcode::Push10,
        Opcode::Push11,
        Opcode::Push12,
        Opcode::Push13,
        Opcode::Push14,
        Opcode::Push15,
        Opcode::Push16,
        Opcode::Push17,
        Opcode::Push18,
        Opcode::Push19,
        Opcode::Push20,
        Opcode::Push21,
        Opcode::Push22,
        Opcode::Push23,
        Opcode::Push24,
        Opcode::Push25,
        Opcode::Push26,
        Opcode::Push27,
        Opcode::Push28,
        Opcode::Push29,
        Opcode::Push30,
        Opcode::Push31,
        Opcode::Push32,
        Opcode::Log0,
        Opcode::Log1,
        Opcode::Log2,
        Opcode::Log3,
        Opcode::Log4,
        Opcode::Create,
        Opcode::Call,
        Opcode::CallCode,
        Opcode::DelegateCall,
        Opcode::SelfDestruct,
    ];

    /// Convert a byte to an opcode
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE[byte as usize]
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of immediate bytes following this opcode
    #[inline]
    pub fn immediate_size(self) -> usize {
        match self.to_byte() {
            b @ 0x60..=0x7f => (b - 0x5f) as usize,
            _ => 0,
        }
    }

    /// Number of topics for LOG0..LOG4
    pub fn topic_count(self) -> Option<usize> {
        match self.to_byte() {
            b @ 0xa0..=0xa4 => Some((b - 0xa0) as usize),
            _ => None,
        }
    }

    /// Stack words consumed
    pub fn stack_inputs(self) -> usize {
        match self {
            Self::Stop => 0,
            Self::Address | Self::Origin | Self::Caller | Self::Coinbase => 0,
            Self::Timestamp | Self::Number | Self::GasLimit => 0,
            Self::Balance | Self::CallDataLoad | Self::ExtCodeSize | Self::BlockHash => 1,
            Self::Pop | Self::SLoad | Self::SelfDestruct => 1,
            Self::Sha3 | Self::SStore => 2,
            Self::Create => 3,
            Self::Call | Self::CallCode => 7,
            Self::DelegateCall => 6,
            op => op.topic_count().map_or(0, |topics| 2 + topics),
        }
    }

    /// Stack words produced
    pub fn stack_outputs(self) -> usize {
        match self {
            Self::Stop | Self::Pop | Self::SStore | Self::SelfDestruct => 0,
            op if op.topic_count().is_some() => 0,
            _ => 1,
        }
    }

    /// Whether translation ends after this instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Stop | Self::SelfDestruct)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::Sha3 => "SHA3",
            Self::Address => "ADDRESS",
            Self::Balance => "BALANCE",
            Self::Origin => "ORIGIN",
            Self::Caller => "CALLER",
            Self::CallDataLoad => "CALLDATALOAD",
            Self::ExtCodeSize => "EXTCODESIZE",
            Self::BlockHash => "BLOCKHASH",
            Self::Coinbase => "COINBASE",
            Self::Timestamp => "TIMESTAMP",
            Self::Number => "NUMBER",
            Self::GasLimit => "GASLIMIT",
            Self::Pop => "POP",
            Self::SLoad => "SLOAD",
            Self::SStore => "SSTORE",
            Self::Push1 => "PUSH1",
            Self::Push2 => "PUSH2",
            Self::Push3 => "PUSH3",
            Self::Push4 => "PUSH4",
            Self::Push5 => "PUSH5",
            Self::Push6 => "PUSH6",
            Self::Push7 => "PUSH7",
            Self::Push8 => "PUSH8",
            Self::Push9 => "PUSH9",
            Self::Push10 => "PUSH10",
            Self::Push11 => "PUSH11",
            Self::Push12 => "PUSH12",
            Self::Push13 => "PUSH13",
            Self::Push14 => "PUSH14",
            Self::Push15 => "PUSH15",
            Self::Push16 => "PUSH16",
            Self::Push17 => "PUSH17",
            Self::Push18 => "PUSH18",
            Self::Push19 => "PUSH19",
            Self::Push20 => "PUSH20",
            Self::Push21 => "PUSH21",
            Self::Push22 => "PUSH22",
            Self::Push23 => "PUSH23",
            Self::Push24 => "PUSH24",
            Self::Push25 => "PUSH25",
            Self::Push26 => "PUSH26",
            Self::Push27 => "PUSH27",
            Self::Push28 => "PUSH28",
            Self::Push29 => "PUSH29",
            Self::Push30 => "PUSH30",
            Self::Push31 => "PUSH31",
            Self::Push32 => "PUSH32",
            Self::Log0 => "LOG0",
            Self::Log1 => "LOG1",
            Self::Log2 => "LOG2",
            Self::Log3 => "LOG3",
            Self::Log4 => "LOG4",
            Self::Create => "CREATE",
            Self::Call => "CALL",
            Self::CallCode => "CALLCODE",
            Self::DelegateCall => "DELEGATECALL",
            Self::SelfDestruct => "SELFDESTRUCT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Lookup table for byte -> Opcode conversion
static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < Opcode::ALL.len() {
        let op = Opcode::ALL[i];
        table[op as usize] = Some(op);
        i += 1;
    }
    table
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_round_trips_every_opcode() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op));
        }
        let decoded = (0..=255u8).filter_map(Opcode::from_byte).count();
        assert_eq!(decoded, Opcode::ALL.len());
    }

    #[test]
    fn test_unsupported_bytes() {
        // ADD, MSTORE, JUMP
        for byte in [0x01, 0x52, 0x56] {
            assert_eq!(Opcode::from_byte(byte), None);
        }
    }

    #[test]
    fn test_push_immediates() {
        assert_eq!(Opcode::Push1.immediate_size(), 1);
        assert_eq!(Opcode::Push32.immediate_size(), 32);
        assert_eq!(Opcode::SLoad.immediate_size(), 0);
    }

    #[test]
    fn test_log_arity() {
        assert_eq!(Opcode::Log0.stack_inputs(), 2);
        assert_eq!(Opcode::Log4.stack_inputs(), 6);
        assert_eq!(Opcode::Log2.stack_outputs(), 0);
        assert_eq!(Opcode::Log3.topic_count(), Some(3));
        assert_eq!(Opcode::Call.topic_count(), None);
    }
}
