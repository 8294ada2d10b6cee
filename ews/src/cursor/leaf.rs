use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Lexical parsing of leaf values
///
/// Both encodings hand leaves over as text (JSON numbers and booleans are
/// rendered back to their canonical text), so a single parser per type is
/// enough.
pub trait FromLeaf: Sized {
    /// What the lexical form should have looked like, for diagnostics
    const EXPECTED: &'static str;

    fn from_leaf(text: &str) -> Option<Self>;
}

impl FromLeaf for String {
    const EXPECTED: &'static str = "string";

    fn from_leaf(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl FromLeaf for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_leaf(text: &str) -> Option<Self> {
        match text.trim() {
            t if t.eq_ignore_ascii_case("true") || t == "1" => Some(true),
            t if t.eq_ignore_ascii_case("false") || t == "0" => Some(false),
            _ => None,
        }
    }
}

macro_rules! from_leaf_via_parse {
    ($($ty:ty => $expected:literal),+ $(,)?) => {
        $(
            impl FromLeaf for $ty {
                const EXPECTED: &'static str = $expected;

                fn from_leaf(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )+
    };
}

from_leaf_via_parse! {
    i8 => "integer",
    i16 => "integer",
    i32 => "integer",
    i64 => "integer",
    u8 => "unsigned integer",
    u16 => "unsigned integer",
    u32 => "unsigned integer",
    u64 => "unsigned integer",
    usize => "unsigned integer",
    f64 => "number",
}

impl FromLeaf for Vec<u8> {
    const EXPECTED: &'static str = "base64 data";

    fn from_leaf(text: &str) -> Option<Self> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .ok()
    }
}

impl FromLeaf for DateTime<Utc> {
    const EXPECTED: &'static str = "RFC 3339 date-time";

    fn from_leaf(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        // Servers omit the offset for values already expressed in UTC
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl FromLeaf for NaiveDate {
    const EXPECTED: &'static str = "date";

    fn from_leaf(text: &str) -> Option<Self> {
        let text = text.trim();
        let date = text.get(..10)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

/// Implement [`FromLeaf`] for a protocol enum through its `FromStr` impl
macro_rules! from_leaf_via_from_str {
    ($ty:ty, $expected:literal) => {
        impl $crate::cursor::FromLeaf for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_leaf(text: &str) -> Option<Self> {
                text.trim().parse().ok()
            }
        }
    };
}

pub(crate) use from_leaf_via_from_str;
