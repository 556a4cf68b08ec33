use goblin::pe::header::DOS_MAGIC;

use crate::field::{FieldLayout, Rules, Width};
use crate::field_map::FieldMap;
use crate::header::Header;

const E_MAGIC: &str = "e_magic";
const E_LFANEW: &str = "e_lfanew";

const fn word(key: &'static str, offset: usize, description: &'static str, rules: Rules) -> FieldLayout {
    FieldLayout {
        key,
        offset,
        width: Width::Word,
        description,
        rules,
        flags: None,
    }
}

/// Layout of `IMAGE_DOS_HEADER`.
///
/// Reference: <http://www.sunshine2k.de/reversing/tuts/tut_pe.htm>
pub static DOS_LAYOUT: &[FieldLayout] = &[
    word(E_MAGIC, 0x00, "Magic number", Rules::AS_HEX.union(Rules::AS_CHAR)),
    word("e_cblp", 0x02, "Bytes in last page", Rules::AS_DEC),
    word("e_cp", 0x04, "Pages in file", Rules::AS_DEC),
    word("e_crlc", 0x06, "Relocations", Rules::AS_DEC),
    word("e_cparhdr", 0x08, "Size of header in paragraphs", Rules::AS_DEC),
    word("e_minalloc", 0x0A, "Minimum extra paragraphs", Rules::AS_DEC),
    word("e_maxalloc", 0x0C, "Maximum extra paragraphs", Rules::AS_DEC),
    word("e_ss", 0x0E, "Initial (relative) SS value", Rules::AS_DEC),
    word("e_sp", 0x10, "Initial SP value", Rules::AS_HEX),
    word("e_ip", 0x14, "Initial IP value", Rules::AS_HEX),
    word("e_cs", 0x16, "Initial (relative) CS value", Rules::AS_HEX),
    word("e_lfarlc", 0x18, "Address of relocation table", Rules::AS_HEX),
    word("e_ovno", 0x1A, "Overlay number", Rules::AS_DEC),
    word("e_oemid", 0x24, "OEM identifier", Rules::AS_DEC),
    word("e_oeminfo", 0x26, "OEM information", Rules::AS_DEC),
    FieldLayout {
        key: E_LFANEW,
        offset: 0x3C,
        width: Width::Dword,
        description: "PE header offset",
        rules: Rules::AS_HEX,
        flags: None,
    },
];

/// The legacy MS-DOS header at offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DosHeader {
    fields: FieldMap,
}

impl DosHeader {
    pub fn new() -> Self {
        Self {
            fields: FieldMap::from_layout(0, DOS_LAYOUT),
        }
    }

    pub fn magic(&self) -> u16 {
        self.fields.value(E_MAGIC).unwrap_or_default() as u16
    }

    /// `e_lfanew`: the file offset of the PE signature.
    pub fn pe_header_offset(&self) -> u32 {
        self.fields.value(E_LFANEW).unwrap_or_default() as u32
    }
}

impl Default for DosHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl Header for DosHeader {
    fn title(&self) -> &'static str {
        "DOS Header"
    }

    fn fields(&self) -> &FieldMap {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    fn check_magic(&self) -> bool {
        self.magic() == DOS_MAGIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(lfanew: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; 0x40];
        bytes[0..2].copy_from_slice(b"MZ");
        bytes[0x02] = 0x90;
        bytes[0x04] = 0x03;
        bytes[0x3C..0x40].copy_from_slice(&lfanew.to_le_bytes());
        bytes
    }

    #[test]
    fn layout_has_sixteen_fields() {
        assert_eq!(DosHeader::new().fields().len(), 16);
        assert_eq!(DosHeader::new().base_offset(), 0);
    }

    #[test]
    fn reads_pe_header_offset() {
        let mut dos = DosHeader::new();
        dos.parse(&stub(0x80)).unwrap();
        assert!(dos.validate());
        assert_eq!(dos.magic(), 0x5A4D);
        assert_eq!(dos.pe_header_offset(), 0x80);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = stub(0x40);
        bytes[0..2].copy_from_slice(b"ZM");
        let mut dos = DosHeader::new();
        dos.parse(&bytes).unwrap();
        assert!(!dos.validate());
    }

    #[test]
    fn truncated_stub_fails_to_parse() {
        let mut dos = DosHeader::new();
        assert!(dos.parse(&stub(0x40)[..0x3E]).is_err());
    }

    #[test]
    fn prints_title_and_rows() {
        let mut dos = DosHeader::new();
        dos.parse(&stub(0x80)).unwrap();
        let mut out = Vec::new();
        dos.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "DOS Header");
        assert_eq!(lines[1], "    Magic number:                     0x5a4d (MZ)");
        assert_eq!(lines[2], "    Bytes in last page:               144");
        assert_eq!(lines[9], "    Initial SP value:                 0");
        assert_eq!(lines[16], "    PE header offset:                 0x80");
        assert_eq!(lines.len(), 17);
    }
}
