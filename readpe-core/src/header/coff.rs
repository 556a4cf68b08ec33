use goblin::pe::header::PE_MAGIC;

use crate::field::{FieldLayout, Rules, Width};
use crate::field_map::FieldMap;
use crate::flags::FlagTable;
use crate::header::Header;

/// Size of the PE signature plus `IMAGE_FILE_HEADER`.
pub const SIZEOF_COFF_HEADER: usize = 0x18;

const SIGNATURE: &str = "signature";
const MACHINE: &str = "machine";
const NUMBER_OF_SECTIONS: &str = "number_of_sections";
const SIZE_OF_OPTIONAL_HEADER: &str = "size_of_optional_header";

/// Layout of the PE signature followed by `IMAGE_FILE_HEADER`.
pub static COFF_LAYOUT: &[FieldLayout] = &[
    // Checked, never printed.
    FieldLayout {
        key: SIGNATURE,
        offset: 0x00,
        width: Width::Dword,
        description: "coff_signature",
        rules: Rules::NONE,
        flags: None,
    },
    FieldLayout {
        key: MACHINE,
        offset: 0x04,
        width: Width::Word,
        description: "Machine",
        rules: Rules::AS_HEX.union(Rules::WITH_FLAG),
        flags: Some(FlagTable::CoffMachine),
    },
    FieldLayout {
        key: NUMBER_OF_SECTIONS,
        offset: 0x06,
        width: Width::Word,
        description: "Number of Sections",
        rules: Rules::AS_DEC,
        flags: None,
    },
    FieldLayout {
        key: "time_date_stamp",
        offset: 0x08,
        width: Width::Dword,
        description: "Date/time stamp",
        rules: Rules::AS_DEC.union(Rules::WITH_TIME),
        flags: None,
    },
    FieldLayout {
        key: "pointer_to_symbol_table",
        offset: 0x0C,
        width: Width::Dword,
        description: "Symbol Table offset",
        rules: Rules::AS_DEC,
        flags: None,
    },
    FieldLayout {
        key: "number_of_symbols",
        offset: 0x10,
        width: Width::Dword,
        description: "Number of symbols",
        rules: Rules::AS_DEC,
        flags: None,
    },
    FieldLayout {
        key: SIZE_OF_OPTIONAL_HEADER,
        offset: 0x14,
        width: Width::Word,
        description: "Size of optional header",
        rules: Rules::AS_HEX,
        flags: None,
    },
    FieldLayout {
        key: "characteristics",
        offset: 0x16,
        width: Width::Word,
        description: "Characteristics",
        rules: Rules::AS_HEX.union(Rules::WITH_FLAGS),
        flags: Some(FlagTable::CoffCharacteristics),
    },
];

/// The COFF file header, located by the DOS header's `e_lfanew`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoffHeader {
    fields: FieldMap,
}

impl CoffHeader {
    pub fn new(base_offset: usize) -> Self {
        Self {
            fields: FieldMap::from_layout(base_offset, COFF_LAYOUT),
        }
    }

    pub fn signature(&self) -> u32 {
        self.fields.value(SIGNATURE).unwrap_or_default() as u32
    }

    pub fn machine(&self) -> u16 {
        self.fields.value(MACHINE).unwrap_or_default() as u16
    }

    pub fn number_of_sections(&self) -> u16 {
        self.fields.value(NUMBER_OF_SECTIONS).unwrap_or_default() as u16
    }

    pub fn size_of_optional_header(&self) -> u16 {
        self.fields.value(SIZE_OF_OPTIONAL_HEADER).unwrap_or_default() as u16
    }

    /// The section table starts right after the optional header.
    pub fn section_table_offset(&self) -> usize {
        self.fields
            .base_offset()
            .saturating_add(SIZEOF_COFF_HEADER)
            .saturating_add(usize::from(self.size_of_optional_header()))
    }
}

impl Header for CoffHeader {
    fn title(&self) -> &'static str {
        "COFF/File header"
    }

    fn fields(&self) -> &FieldMap {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    fn check_magic(&self) -> bool {
        self.signature() == PE_MAGIC
    }
}
