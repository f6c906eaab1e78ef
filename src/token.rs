//! Token dictionary for the binary XML node encoding.
//!
//! Frequently used strings travel as a single byte holding their index into
//! [`SINGLE_BYTE_TOKENS`], or as a `DICTIONARY_n` marker plus one byte indexing
//! [`DOUBLE_BYTE_TOKENS`].

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::control::DICTIONARY_0;
use crate::error::TokenError;

/// First index of the single-byte table that may hold a token.
pub const FIRST_TOKEN_INDEX: u8 = 3;

/// Returned by [`index_of_single_token`] when the string is not in the table.
pub const NOT_FOUND: isize = -1;

/// One entry of the single-byte table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Placeholder below [`FIRST_TOKEN_INDEX`]; never a valid encode/decode target.
    Reserved,
    Token(&'static str),
}

impl Slot {
    pub fn as_token(self) -> Option<&'static str> {
        match self {
            Slot::Reserved => None,
            Slot::Token(t) => Some(t),
        }
    }

    // Reserved slots stand for the empty string in the scan.
    fn matches(self, s: &str) -> bool {
        match self {
            Slot::Reserved => s.is_empty(),
            Slot::Token(t) => t == s,
        }
    }
}

use Slot::{Reserved, Token};

/// Single-byte tokens (3-174)
pub const SINGLE_BYTE_TOKENS: &[Slot] = &[
    Reserved,                   // 0
    Reserved,                   // 1
    Reserved,                   // 2
    Token("200"),               // 3
    Token("400"),               // 4
    Token("404"),               // 5
    Token("500"),               // 6
    Token("501"),               // 7
    Token("502"),               // 8
    Token("add"),               // 9
    Token("after"),             // 10
    Token("archive"),           // 11
    Token("author"),            // 12
    Token("available"),         // 13
    Token("battery"),           // 14
    Token("before"),            // 15
    Token("body"),              // 16
    Token("broadcast"),         // 17
    Token("chat"),              // 18
    Token("clear"),             // 19
    Token("code"),              // 20
    Token("composing"),         // 21
    Token("contacts"),          // 22
    Token("count"),             // 23
    Token("create"),            // 24
    Token("debug"),             // 25
    Token("delete"),            // 26
    Token("demote"),            // 27
    Token("duplicate"),         // 28
    Token("encoding"),          // 29
    Token("error"),             // 30
    Token("false"),             // 31
    Token("filehash"),          // 32
    Token("from"),              // 33
    Token("g.us"),              // 34
    Token("group"),             // 35
    Token("groups_v2"),         // 36
    Token("height"),            // 37
    Token("id"),                // 38
    Token("image"),             // 39
    Token("in"),                // 40
    Token("index"),             // 41
    Token("invis"),             // 42
    Token("item"),              // 43
    Token("jid"),               // 44
    Token("kind"),              // 45
    Token("last"),              // 46
    Token("leave"),             // 47
    Token("live"),              // 48
    Token("log"),               // 49
    Token("media"),             // 50
    Token("message"),           // 51
    Token("mimetype"),          // 52
    Token("missing"),           // 53
    Token("modify"),            // 54
    Token("name"),              // 55
    Token("notification"),      // 56
    Token("notify"),            // 57
    Token("out"),               // 58
    Token("owner"),             // 59
    Token("participant"),       // 60
    Token("paused"),            // 61
    Token("picture"),           // 62
    Token("played"),            // 63
    Token("presence"),          // 64
    Token("preview"),           // 65
    Token("promote"),           // 66
    Token("query"),             // 67
    Token("raw"),               // 68
    Token("read"),              // 69
    Token("receipt"),           // 70
    Token("received"),          // 71
    Token("recipient"),         // 72
    Token("recording"),         // 73
    Token("relay"),             // 74
    Token("remove"),            // 75
    Token("response"),          // 76
    Token("resume"),            // 77
    Token("retry"),             // 78
    Token("s.whatsapp.net"),    // 79
    Token("seconds"),           // 80
    Token("set"),               // 81
    Token("size"),              // 82
    Token("status"),            // 83
    Token("subject"),           // 84
    Token("subscribe"),         // 85
    Token("t"),                 // 86
    Token("text"),              // 87
    Token("to"),                // 88
    Token("true"),              // 89
    Token("type"),              // 90
    Token("unarchive"),         // 91
    Token("unavailable"),       // 92
    Token("url"),               // 93
    Token("user"),              // 94
    Token("value"),             // 95
    Token("web"),               // 96
    Token("width"),             // 97
    Token("mute"),              // 98
    Token("read_only"),         // 99
    Token("admin"),             // 100
    Token("creator"),           // 101
    Token("short"),             // 102
    Token("update"),            // 103
    Token("powersave"),         // 104
    Token("checksum"),          // 105
    Token("epoch"),             // 106
    Token("block"),             // 107
    Token("previous"),          // 108
    Token("409"),               // 109
    Token("replaced"),          // 110
    Token("reason"),            // 111
    Token("spam"),              // 112
    Token("modify_tag"),        // 113
    Token("message_info"),      // 114
    Token("delivery"),          // 115
    Token("emoji"),             // 116
    Token("title"),             // 117
    Token("description"),       // 118
    Token("canonical-url"),     // 119
    Token("matched-text"),      // 120
    Token("star"),              // 121
    Token("unstar"),            // 122
    Token("media_key"),         // 123
    Token("filename"),          // 124
    Token("identity"),          // 125
    Token("unread"),            // 126
    Token("page"),              // 127
    Token("page_count"),        // 128
    Token("search"),            // 129
    Token("media_message"),     // 130
    Token("security"),          // 131
    Token("call_log"),          // 132
    Token("profile"),           // 133
    Token("ciphertext"),        // 134
    Token("invite"),            // 135
    Token("gif"),               // 136
    Token("vcard"),             // 137
    Token("frequent"),          // 138
    Token("privacy"),           // 139
    Token("blacklist"),         // 140
    Token("whitelist"),         // 141
    Token("verify"),            // 142
    Token("location"),          // 143
    Token("document"),          // 144
    Token("elapsed"),           // 145
    Token("revoke_invite"),     // 146
    Token("expiration"),        // 147
    Token("unsubscribe"),       // 148
    Token("disable"),           // 149
    Token("vname"),             // 150
    Token("old_jid"),           // 151
    Token("new_jid"),           // 152
    Token("announcement"),      // 153
    Token("locked"),            // 154
    Token("prop"),              // 155
    Token("label"),             // 156
    Token("color"),             // 157
    Token("call"),              // 158
    Token("offer"),             // 159
    Token("call-id"),           // 160
    Token("quick_reply"),       // 161
    Token("sticker"),           // 162
    Token("pay_t"),             // 163
    Token("accept"),            // 164
    Token("reject"),            // 165
    Token("sticker_pack"),      // 166
    Token("invalid"),           // 167
    Token("canceled"),          // 168
    Token("missed"),            // 169
    Token("connected"),         // 170
    Token("result"),            // 171
    Token("audio"),             // 172
    Token("video"),             // 173
    Token("recent"),            // 174
];

/// Double-byte tokens, addressed by `256 * index1 + index2`. Currently empty.
pub const DOUBLE_BYTE_TOKENS: &[&str] = &[];

// The dictionary must end below the lowest control code above it.
const _: () = assert!(SINGLE_BYTE_TOKENS.len() <= DICTIONARY_0 as usize);
// Four DICTIONARY_n markers, 256 entries each.
const _: () = assert!(DOUBLE_BYTE_TOKENS.len() <= 4 * 256);

/// Resolve a single-byte code to its string.
///
/// Indices 0, 1 and 2 are rejected even though they exist in the table.
pub fn get_single_token(index: usize) -> Result<&'static str, TokenError> {
    if index < FIRST_TOKEN_INDEX as usize {
        return Err(TokenError::OutOfBounds { index });
    }
    SINGLE_BYTE_TOKENS
        .get(index)
        .and_then(|slot| slot.as_token())
        .ok_or(TokenError::OutOfBounds { index })
}

/// Resolve a double-byte code. The error carries the combined index.
pub fn get_double_token(index1: u8, index2: u8) -> Result<&'static str, TokenError> {
    let index = 256 * index1 as usize + index2 as usize;
    DOUBLE_BYTE_TOKENS
        .get(index)
        .copied()
        .ok_or(TokenError::OutOfBounds { index })
}

/// Linear scan for the first slot equal to `token`, or [`NOT_FOUND`].
///
/// The empty string matches the first reserved slot and yields `0`.
pub fn index_of_single_token(token: &str) -> isize {
    SINGLE_BYTE_TOKENS
        .iter()
        .position(|slot| slot.matches(token))
        .map_or(NOT_FOUND, |i| i as isize)
}

/// Encoder-side reverse lookup. Never returns a reserved index.
pub fn single_token_code(token: &str) -> Option<u8> {
    static TOKEN_MAP: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();

    let map = TOKEN_MAP.get_or_init(|| {
        let mut m = HashMap::with_capacity(SINGLE_BYTE_TOKENS.len());
        for (i, token) in single_tokens() {
            // first match wins
            m.entry(token).or_insert(i);
        }
        m
    });

    map.get(token).copied()
}

/// Reverse lookup into the double-byte table as `(index1, index2)`.
pub fn index_of_double_token(token: &str) -> Option<(u8, u8)> {
    let n = DOUBLE_BYTE_TOKENS.iter().position(|t| *t == token)?;
    Some(((n >> 8) as u8, (n & 0xff) as u8))
}

/// All valid single-byte entries with their codes.
pub fn single_tokens() -> impl Iterator<Item = (u8, &'static str)> {
    SINGLE_BYTE_TOKENS
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.as_token().map(|t| (i as u8, t)))
}
