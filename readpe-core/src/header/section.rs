use crate::field::{FieldLayout, Rules, Width};
use crate::field_map::FieldMap;
use crate::flags::FlagTable;
use crate::header::Header;

/// Stride between consecutive section table entries.
pub const SIZEOF_SECTION_HEADER: usize = 0x28;

const NAME: &str = "name";
const VIRTUAL_ADDRESS: &str = "virtual_address";
const CHARACTERISTICS: &str = "characteristics";

/// Layout of `IMAGE_SECTION_HEADER`.
pub static SECTION_LAYOUT: &[FieldLayout] = &[
    FieldLayout {
        key: NAME,
        offset: 0x00,
        width: Width::Qword,
        description: "Name",
        rules: Rules::AS_CHAR,
        flags: None,
    },
    FieldLayout {
        key: "virtual_size",
        offset: 0x08,
        width: Width::Dword,
        description: "Virtual Size",
        rules: Rules::AS_DEC.union(Rules::AS_HEX),
        flags: None,
    },
    FieldLayout {
        key: VIRTUAL_ADDRESS,
        offset: 0x0C,
        width: Width::Dword,
        description: "Virtual Address",
        rules: Rules::AS_HEX,
        flags: None,
    },
    FieldLayout {
        key: "size_of_raw_data",
        offset: 0x10,
        width: Width::Dword,
        description: "Size Of Raw Data",
        rules: Rules::AS_DEC.union(Rules::AS_HEX),
        flags: None,
    },
    FieldLayout {
        key: "pointer_to_raw_data",
        offset: 0x14,
        width: Width::Dword,
        description: "Pointer To Raw Data",
        rules: Rules::AS_HEX,
        flags: None,
    },
    FieldLayout {
        key: "number_of_relocations",
        offset: 0x20,
        width: Width::Word,
        description: "Number Of Relocations",
        rules: Rules::AS_HEX,
        flags: None,
    },
    FieldLayout {
        key: CHARACTERISTICS,
        offset: 0x24,
        width: Width::Dword,
        description: "Characteristics",
        rules: Rules::AS_HEX.union(Rules::WITH_FLAGS),
        flags: Some(FlagTable::SectionCharacteristics),
    },
];

/// One entry of the section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    index: usize,
    fields: FieldMap,
}

impl SectionHeader {
    /// The `index`th entry of a section table starting at `table_offset`.
    pub fn new(table_offset: usize, index: usize) -> Self {
        let base = table_offset.saturating_add(index.saturating_mul(SIZEOF_SECTION_HEADER));
        Self {
            index,
            fields: FieldMap::from_layout(base, SECTION_LAYOUT).with_indent("    "),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw 8-byte name, which need not be NUL terminated.
    pub fn name(&self) -> [u8; 8] {
        self.fields.value(NAME).unwrap_or_default().to_le_bytes()
    }

    pub fn virtual_address(&self) -> u32 {
        self.fields.value(VIRTUAL_ADDRESS).unwrap_or_default() as u32
    }

    pub fn characteristics(&self) -> u32 {
        self.fields.value(CHARACTERISTICS).unwrap_or_default() as u32
    }
}

impl Header for SectionHeader {
    fn title(&self) -> &'static str {
        "    Section"
    }

    fn fields(&self) -> &FieldMap {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }
}
