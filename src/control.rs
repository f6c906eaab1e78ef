//! Reserved control codes of the single-byte code space.
//!
//! These share the 0-255 range with dictionary indices. A reader must check a
//! leading byte against them before treating it as a dictionary token.

pub const LIST_EMPTY: u8 = 0;
pub const STREAM_END: u8 = 2;
pub const DICTIONARY_0: u8 = 236;
pub const DICTIONARY_1: u8 = 237;
pub const DICTIONARY_2: u8 = 238;
pub const DICTIONARY_3: u8 = 239;
pub const LIST_8: u8 = 248;
pub const LIST_16: u8 = 249;
pub const JID_PAIR: u8 = 250;
pub const HEX_8: u8 = 251;
pub const BINARY_8: u8 = 252;
pub const BINARY_20: u8 = 253;
pub const BINARY_32: u8 = 254;
pub const NIBBLE_8: u8 = 255;

/// Upper bound on the character count of a nibble/hex packed string.
pub const PACKED_MAX: usize = 254;
/// Size of the single-byte code space.
pub const SINGLE_BYTE_MAX: usize = 256;

/// Structural markers
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlCode {
    ListEmpty = LIST_EMPTY,
    StreamEnd = STREAM_END,
    Dictionary0 = DICTIONARY_0,
    Dictionary1 = DICTIONARY_1,
    Dictionary2 = DICTIONARY_2,
    Dictionary3 = DICTIONARY_3,
    List8 = LIST_8,
    List16 = LIST_16,
    JidPair = JID_PAIR,
    Hex8 = HEX_8,
    Binary8 = BINARY_8,
    Binary20 = BINARY_20,
    Binary32 = BINARY_32,
    Nibble8 = NIBBLE_8,
}

impl ControlCode {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            LIST_EMPTY => Some(ControlCode::ListEmpty),
            STREAM_END => Some(ControlCode::StreamEnd),
            DICTIONARY_0 => Some(ControlCode::Dictionary0),
            DICTIONARY_1 => Some(ControlCode::Dictionary1),
            DICTIONARY_2 => Some(ControlCode::Dictionary2),
            DICTIONARY_3 => Some(ControlCode::Dictionary3),
            LIST_8 => Some(ControlCode::List8),
            LIST_16 => Some(ControlCode::List16),
            JID_PAIR => Some(ControlCode::JidPair),
            HEX_8 => Some(ControlCode::Hex8),
            BINARY_8 => Some(ControlCode::Binary8),
            BINARY_20 => Some(ControlCode::Binary20),
            BINARY_32 => Some(ControlCode::Binary32),
            NIBBLE_8 => Some(ControlCode::Nibble8),
            _ => None,
        }
    }

    /// Secondary dictionary selected by a `DICTIONARY_n` marker.
    pub fn dictionary_select(self) -> Option<u8> {
        match self {
            ControlCode::Dictionary0
            | ControlCode::Dictionary1
            | ControlCode::Dictionary2
            | ControlCode::Dictionary3 => Some(self as u8 - DICTIONARY_0),
            _ => None,
        }
    }
}

/// What a leading byte means once reserved codes have been ruled out first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ByteClass {
    Control(ControlCode),
    /// Candidate single-byte dictionary index. Still bounds-checked by the resolver.
    Token(u8),
    /// Neither a control code nor inside the dictionary range (240-247, and 1).
    Unassigned(u8),
}

impl ByteClass {
    pub fn classify(byte: u8) -> Self {
        if let Some(code) = ControlCode::from_u8(byte) {
            return ByteClass::Control(code);
        }
        if (crate::token::FIRST_TOKEN_INDEX..DICTIONARY_0).contains(&byte) {
            ByteClass::Token(byte)
        } else {
            ByteClass::Unassigned(byte)
        }
    }
}
