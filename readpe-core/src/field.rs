use std::fmt;
use std::ops::BitOr;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{LocalResult, TimeZone, Utc};

use crate::error::DecodeError;
use crate::flags::{FlagTable, UNKNOWN_FLAG_MAPPING};

/// Formatting and decoding rules attached to a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rules(u8);

impl Rules {
    pub const NONE: Rules = Rules(0x00);
    /// Print the value as a decimal number.
    pub const AS_DEC: Rules = Rules(0x01);
    /// Print the value as a hexadecimal number.
    pub const AS_HEX: Rules = Rules(0x02);
    /// Print the raw bytes as fixed-width characters.
    pub const AS_CHAR: Rules = Rules(0x04);
    /// Append a UTC calendar rendering of the value.
    pub const WITH_TIME: Rules = Rules(0x08);
    /// Decode the value as a single symbolic name.
    pub const WITH_FLAG: Rules = Rules(0x10);
    /// Decode every set bit as a symbolic name.
    pub const WITH_FLAGS: Rules = Rules(0x20);

    pub const fn union(self, other: Rules) -> Rules {
        Rules(self.0 | other.0)
    }

    pub const fn contains(self, other: Rules) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The rules in `self` that are not in `other`.
    pub const fn without(self, other: Rules) -> Rules {
        Rules(self.0 & !other.0)
    }
}

impl BitOr for Rules {
    type Output = Rules;

    fn bitor(self, rhs: Rules) -> Rules {
        self.union(rhs)
    }
}

/// Storage width of a field inside its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    Word,
    Dword,
    Qword,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::Word => 2,
            Width::Dword => 4,
            Width::Qword => 8,
        }
    }

    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// A decoded little-endian scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Word(u16),
    Dword(u32),
    Qword(u64),
}

impl FieldValue {
    /// A zeroed value of the given width.
    pub const fn zero(width: Width) -> Self {
        match width {
            Width::Word => FieldValue::Word(0),
            Width::Dword => FieldValue::Dword(0),
            Width::Qword => FieldValue::Qword(0),
        }
    }

    pub const fn width(self) -> Width {
        match self {
            FieldValue::Word(_) => Width::Word,
            FieldValue::Dword(_) => Width::Dword,
            FieldValue::Qword(_) => Width::Qword,
        }
    }

    pub fn as_u64(self) -> u64 {
        match self {
            FieldValue::Word(v) => u64::from(v),
            FieldValue::Dword(v) => u64::from(v),
            FieldValue::Qword(v) => v,
        }
    }

    /// The value laid back out in file byte order.
    pub fn to_le_bytes(self) -> Vec<u8> {
        match self {
            FieldValue::Word(v) => v.to_le_bytes().to_vec(),
            FieldValue::Dword(v) => v.to_le_bytes().to_vec(),
            FieldValue::Qword(v) => v.to_le_bytes().to_vec(),
        }
    }
}

impl fmt::LowerHex for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.as_u64(), f)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_u64(), f)
    }
}

/// Static description of one field: where it lives and how it prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Stable lookup key, unique inside its header.
    pub key: &'static str,
    /// Offset relative to the owning header's base.
    pub offset: usize,
    pub width: Width,
    pub description: &'static str,
    pub rules: Rules,
    /// Table used by [`Rules::WITH_FLAG`] and [`Rules::WITH_FLAGS`].
    pub flags: Option<FlagTable>,
}

/// One scalar value inside a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    offset: usize,
    description: String,
    rules: Rules,
    flags: Option<FlagTable>,
    value: FieldValue,
}

impl Field {
    pub fn new(offset: usize, width: Width, description: &str, rules: Rules) -> Self {
        Self {
            offset,
            description: description.trim().to_string(),
            rules,
            flags: None,
            value: FieldValue::zero(width),
        }
    }

    /// Attaches the symbolic table consulted by the flag rules.
    pub fn with_flags(mut self, table: FlagTable) -> Self {
        self.flags = Some(table);
        self
    }

    pub fn from_layout(layout: &FieldLayout) -> Self {
        let field = Self::new(layout.offset, layout.width, layout.description, layout.rules);
        match layout.flags {
            Some(table) => field.with_flags(table),
            None => field,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    pub fn value(&self) -> FieldValue {
        self.value
    }

    pub fn width(&self) -> Width {
        self.value.width()
    }

    /// Copies this field's bytes out of `buffer`, relative to `base`.
    pub fn set_value(&mut self, buffer: &[u8], base: usize) -> Result<(), DecodeError> {
        let width = self.width().bytes();
        let too_short = DecodeError::BufferTooShort {
            offset: base.saturating_add(self.offset),
            width,
            len: buffer.len(),
        };
        let start = base.checked_add(self.offset).ok_or(too_short.clone())?;
        let end = start.checked_add(width).ok_or(too_short.clone())?;
        let bytes = buffer.get(start..end).ok_or(too_short)?;

        self.value = match self.width() {
            Width::Word => FieldValue::Word(LittleEndian::read_u16(bytes)),
            Width::Dword => FieldValue::Dword(LittleEndian::read_u32(bytes)),
            Width::Qword => FieldValue::Qword(LittleEndian::read_u64(bytes)),
        };
        Ok(())
    }

    pub fn validate(&self) -> bool {
        !self.description.is_empty()
    }

    fn hex(&self) -> String {
        match self.value.as_u64() {
            0 => "0".to_string(),
            _ => format!("0x{:x}", self.value),
        }
    }

    /// Raw bytes in file order. Trailing NUL padding is dropped and any
    /// other non-printable byte is escaped.
    fn chars(&self) -> String {
        let bytes = self.value.to_le_bytes();
        let len = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        bytes[..len].escape_ascii().to_string()
    }

    /// Whether the field has a numeric, character or time form to print.
    /// Flag rules only decorate that form.
    pub fn is_displayed(&self) -> bool {
        !self
            .rules
            .without(Rules::WITH_FLAG | Rules::WITH_FLAGS)
            .is_empty()
    }

    fn timestamp(&self) -> Option<String> {
        let secs = i64::try_from(self.value.as_u64()).ok()?;
        match Utc.timestamp_opt(secs, 0) {
            LocalResult::Single(dt) => Some(dt.format("%c %Z").to_string()),
            _ => None,
        }
    }

    /// Formats the value according to its rules.
    ///
    /// Only one numeric form is chosen, in the order hex+char, dec+hex,
    /// dec, hex, char. Time and flag decoding are appended after it.
    pub fn render(&self) -> String {
        let rules = self.rules;
        let mut out = if rules.contains(Rules::AS_HEX | Rules::AS_CHAR) {
            format!("{} ({})", self.hex(), self.chars())
        } else if rules.contains(Rules::AS_DEC | Rules::AS_HEX) {
            format!("{} ({} bytes)", self.hex(), self.value)
        } else if rules.contains(Rules::AS_DEC) {
            self.value.to_string()
        } else if rules.contains(Rules::AS_HEX) {
            self.hex()
        } else if rules.contains(Rules::AS_CHAR) {
            self.chars()
        } else {
            String::new()
        };

        if rules.contains(Rules::WITH_TIME) {
            if let Some(time) = self.timestamp() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(&format!("({})", time));
            }
        }

        if rules.contains(Rules::WITH_FLAG) {
            if let Some(table) = self.flags {
                let name = table.lookup(self.value.as_u64()).unwrap_or_else(|| {
                    log::debug!("no {} entry for {:#x}", table, self.value);
                    UNKNOWN_FLAG_MAPPING
                });
                out.push(' ');
                out.push_str(name);
            }
        }

        out
    }

    /// One entry per set bit, lowest first: the symbolic name, or a
    /// placeholder carrying the raw mask when the bit is not registered.
    pub fn characteristics(&self) -> Vec<String> {
        let Some(table) = self.flags else {
            return Vec::new();
        };
        table
            .decode_mask(self.value.as_u64(), self.width().bits())
            .into_iter()
            .map(|(mask, name)| match name {
                Some(name) => name.to_string(),
                None => format!("{}: 0x{:x}", UNKNOWN_FLAG_MAPPING, mask),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(width: Width, rules: Rules, bytes: &[u8]) -> Field {
        let mut field = Field::new(0, width, "Test", rules);
        field.set_value(bytes, 0).unwrap();
        field
    }

    #[test]
    fn hex_zero_is_plain() {
        let field = parsed(Width::Dword, Rules::AS_HEX, &[0, 0, 0, 0]);
        assert_eq!(field.render(), "0");
    }

    #[test]
    fn hex_and_char() {
        let field = parsed(Width::Word, Rules::AS_HEX | Rules::AS_CHAR, b"MZ");
        assert_eq!(field.render(), "0x5a4d (MZ)");
    }

    #[test]
    fn dec_and_hex_reports_bytes() {
        let field = parsed(Width::Dword, Rules::AS_DEC | Rules::AS_HEX, &[0, 2, 0, 0]);
        assert_eq!(field.render(), "0x200 (512 bytes)");
    }

    #[test]
    fn dec_only() {
        let field = parsed(Width::Word, Rules::AS_DEC, &[0x90, 0x00]);
        assert_eq!(field.render(), "144");
    }

    #[test]
    fn char_only_drops_padding() {
        let field = parsed(Width::Qword, Rules::AS_CHAR, b".text\0\0\0");
        assert_eq!(field.render(), ".text");
    }

    #[test]
    fn char_keeps_all_eight_bytes() {
        let field = parsed(Width::Qword, Rules::AS_CHAR, b".textbss");
        assert_eq!(field.render(), ".textbss");
    }

    #[test]
    fn char_keeps_interior_nul() {
        let field = parsed(Width::Qword, Rules::AS_CHAR, b"a\0b\0c\0\0\0");
        assert_eq!(field.render(), "a\\0b\\0c");
    }

    #[test]
    fn char_escapes_high_bytes() {
        let field = parsed(Width::Qword, Rules::AS_CHAR, &[0x2e, 0xe9, 0xff, 0x80, 0, 0, 0, 0]);
        assert_eq!(field.render(), ".\\xe9\\xff\\x80");
        assert!(field.render().is_ascii());
    }

    #[test]
    fn blank_name_is_still_displayed() {
        let field = parsed(Width::Qword, Rules::AS_CHAR, &[0u8; 8]);
        assert_eq!(field.render(), "");
        assert!(field.is_displayed());
    }

    #[test]
    fn display_needs_a_value_rule() {
        assert!(!parsed(Width::Dword, Rules::NONE, &[0; 4]).is_displayed());
        assert!(!parsed(Width::Word, Rules::WITH_FLAG, &[0; 2]).is_displayed());
        assert!(parsed(Width::Dword, Rules::WITH_TIME, &[0; 4]).is_displayed());
        assert!(parsed(Width::Word, Rules::AS_HEX | Rules::WITH_FLAGS, &[0; 2]).is_displayed());
    }

    #[test]
    fn without_clears_only_named_rules() {
        let rules = Rules::AS_HEX | Rules::WITH_FLAGS;
        assert_eq!(rules.without(Rules::WITH_FLAGS), Rules::AS_HEX);
        assert!(Rules::WITH_FLAG.without(Rules::WITH_FLAG).is_empty());
    }

    #[test]
    fn no_rules_renders_empty() {
        let field = parsed(Width::Dword, Rules::NONE, b"PE\0\0");
        assert_eq!(field.render(), "");
    }

    #[test]
    fn timestamp_in_utc() {
        let field = parsed(Width::Dword, Rules::AS_DEC | Rules::WITH_TIME, &[0, 0, 0, 0]);
        assert_eq!(field.render(), "0 (Thu Jan  1 00:00:00 1970 UTC)");
    }

    #[test]
    fn single_flag_lookup() {
        let mut field = Field::new(0, Width::Word, "Machine", Rules::AS_HEX | Rules::WITH_FLAG)
            .with_flags(FlagTable::CoffMachine);
        field.set_value(&[0x64, 0x86], 0).unwrap();
        assert_eq!(field.render(), "0x8664 IMAGE_FILE_MACHINE_AMD64");

        field.set_value(&[0x34, 0x12], 0).unwrap();
        assert_eq!(field.render(), "0x1234 UNKNOWN FLAG MAPPING");
    }

    #[test]
    fn characteristics_lists_every_set_bit() {
        let mut field = Field::new(0, Width::Dword, "Characteristics", Rules::AS_HEX | Rules::WITH_FLAGS)
            .with_flags(FlagTable::SectionCharacteristics);
        field.set_value(&[0x22, 0, 0, 0], 0).unwrap();
        assert_eq!(
            field.characteristics(),
            vec!["UNKNOWN FLAG MAPPING: 0x2".to_string(), "IMAGE_SCN_CNT_CODE".to_string()]
        );
    }

    #[test]
    fn set_value_honours_base() {
        let mut field = Field::new(2, Width::Word, "Test", Rules::AS_HEX);
        field.set_value(&[0, 0, 0, 0, 0xef, 0xbe], 2).unwrap();
        assert_eq!(field.value(), FieldValue::Word(0xbeef));
    }

    #[test]
    fn set_value_rejects_short_buffer() {
        let mut field = Field::new(0x3c, Width::Dword, "PE header offset", Rules::AS_HEX);
        let err = field.set_value(&[0u8; 0x3e], 0).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BufferTooShort {
                offset: 0x3c,
                width: 4,
                len: 0x3e
            }
        );
    }

    #[test]
    fn set_value_rejects_overflowing_base() {
        let mut field = Field::new(4, Width::Word, "Test", Rules::AS_HEX);
        assert!(field.set_value(&[0u8; 8], usize::MAX).is_err());
    }

    #[test]
    fn description_is_trimmed_and_required() {
        assert_eq!(Field::new(0, Width::Word, "  Name ", Rules::AS_DEC).description(), "Name");
        assert!(!Field::new(0, Width::Word, "   ", Rules::AS_DEC).validate());
        assert!(Field::new(0, Width::Word, "Name", Rules::AS_DEC).validate());
    }
}
