use std::fmt;

use goblin::pe::characteristic::{
    IMAGE_FILE_32BIT_MACHINE, IMAGE_FILE_AGGRESSIVE_WS_TRIM, IMAGE_FILE_BYTES_REVERSED_HI,
    IMAGE_FILE_BYTES_REVERSED_LO, IMAGE_FILE_DEBUG_STRIPPED, IMAGE_FILE_DLL,
    IMAGE_FILE_EXECUTABLE_IMAGE, IMAGE_FILE_LARGE_ADDRESS_AWARE, IMAGE_FILE_LINE_NUMS_STRIPPED,
    IMAGE_FILE_LOCAL_SYMS_STRIPPED, IMAGE_FILE_NET_RUN_FROM_SWAP, IMAGE_FILE_RELOCS_STRIPPED,
    IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP, IMAGE_FILE_SYSTEM, IMAGE_FILE_UP_SYSTEM_ONLY,
};
use goblin::pe::header::{
    COFF_MACHINE_AM33, COFF_MACHINE_ARM, COFF_MACHINE_ARM64, COFF_MACHINE_ARMNT,
    COFF_MACHINE_EBC, COFF_MACHINE_IA64, COFF_MACHINE_M32R, COFF_MACHINE_MIPS16,
    COFF_MACHINE_MIPSFPU, COFF_MACHINE_MIPSFPU16, COFF_MACHINE_POWERPC, COFF_MACHINE_POWERPCFP,
    COFF_MACHINE_R4000, COFF_MACHINE_SH3, COFF_MACHINE_SH3DSP, COFF_MACHINE_SH4, COFF_MACHINE_SH5,
    COFF_MACHINE_THUMB, COFF_MACHINE_UNKNOWN, COFF_MACHINE_WCEMIPSV2, COFF_MACHINE_X86,
    COFF_MACHINE_X86_64,
};
use goblin::pe::section_table::{
    IMAGE_SCN_CNT_CODE, IMAGE_SCN_CNT_INITIALIZED_DATA, IMAGE_SCN_CNT_UNINITIALIZED_DATA,
    IMAGE_SCN_GPREL, IMAGE_SCN_LNK_COMDAT, IMAGE_SCN_LNK_INFO, IMAGE_SCN_LNK_NRELOC_OVFL,
    IMAGE_SCN_LNK_OTHER, IMAGE_SCN_LNK_REMOVE, IMAGE_SCN_MEM_DISCARDABLE, IMAGE_SCN_MEM_EXECUTE,
    IMAGE_SCN_MEM_LOCKED, IMAGE_SCN_MEM_NOT_CACHED, IMAGE_SCN_MEM_NOT_PAGED,
    IMAGE_SCN_MEM_PRELOAD, IMAGE_SCN_MEM_PURGEABLE, IMAGE_SCN_MEM_READ, IMAGE_SCN_MEM_SHARED,
    IMAGE_SCN_MEM_WRITE, IMAGE_SCN_TYPE_NO_PAD,
};

/// Placeholder emitted when a value or bit has no entry in its table.
pub const UNKNOWN_FLAG_MAPPING: &str = "UNKNOWN FLAG MAPPING";

/// The symbolic tables a field can decode against.
///
/// A field names its table in its static layout, so identically shaped
/// bitfields in different headers can never pick up each other's names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagTable {
    /// Exact-value lookup for `IMAGE_FILE_HEADER.Machine`.
    CoffMachine,
    /// Single-bit lookup for `IMAGE_FILE_HEADER.Characteristics`.
    CoffCharacteristics,
    /// Single-bit lookup for `IMAGE_SECTION_HEADER.Characteristics`.
    SectionCharacteristics,
}

static COFF_MACHINE: &[(u64, &str)] = &[
    (COFF_MACHINE_UNKNOWN as u64, "IMAGE_FILE_MACHINE_UNKNOWN"),
    (COFF_MACHINE_AM33 as u64, "IMAGE_FILE_MACHINE_AM33"),
    (COFF_MACHINE_X86_64 as u64, "IMAGE_FILE_MACHINE_AMD64"),
    (COFF_MACHINE_ARM as u64, "IMAGE_FILE_MACHINE_ARM"),
    (COFF_MACHINE_ARM64 as u64, "IMAGE_FILE_MACHINE_ARM64"),
    (COFF_MACHINE_ARMNT as u64, "IMAGE_FILE_MACHINE_ARMNT"),
    (COFF_MACHINE_EBC as u64, "IMAGE_FILE_MACHINE_EBC"),
    (COFF_MACHINE_X86 as u64, "IMAGE_FILE_MACHINE_I386"),
    (COFF_MACHINE_IA64 as u64, "IMAGE_FILE_MACHINE_IA64"),
    (COFF_MACHINE_M32R as u64, "IMAGE_FILE_MACHINE_M32R"),
    (COFF_MACHINE_MIPS16 as u64, "IMAGE_FILE_MACHINE_MIPS16"),
    (COFF_MACHINE_MIPSFPU as u64, "IMAGE_FILE_MACHINE_MIPSFPU"),
    (COFF_MACHINE_MIPSFPU16 as u64, "IMAGE_FILE_MACHINE_MIPSFPU16"),
    (COFF_MACHINE_POWERPC as u64, "IMAGE_FILE_MACHINE_POWERPC"),
    (COFF_MACHINE_POWERPCFP as u64, "IMAGE_FILE_MACHINE_POWERPCFP"),
    (COFF_MACHINE_R4000 as u64, "IMAGE_FILE_MACHINE_R4000"),
    (COFF_MACHINE_SH3 as u64, "IMAGE_FILE_MACHINE_SH3"),
    (COFF_MACHINE_SH3DSP as u64, "IMAGE_FILE_MACHINE_SH3DSP"),
    (COFF_MACHINE_SH4 as u64, "IMAGE_FILE_MACHINE_SH4"),
    (COFF_MACHINE_SH5 as u64, "IMAGE_FILE_MACHINE_SH5"),
    (COFF_MACHINE_THUMB as u64, "IMAGE_FILE_MACHINE_THUMB"),
    (COFF_MACHINE_WCEMIPSV2 as u64, "IMAGE_FILE_MACHINE_WCEMIPSV2"),
];

static COFF_CHARACTERISTICS: &[(u64, &str)] = &[
    (IMAGE_FILE_RELOCS_STRIPPED as u64, "IMAGE_FILE_RELOCS_STRIPPED"),
    (IMAGE_FILE_EXECUTABLE_IMAGE as u64, "IMAGE_FILE_EXECUTABLE_IMAGE"),
    (IMAGE_FILE_LINE_NUMS_STRIPPED as u64, "IMAGE_FILE_LINE_NUMS_STRIPPED"),
    (IMAGE_FILE_LOCAL_SYMS_STRIPPED as u64, "IMAGE_FILE_LOCAL_SYMS_STRIPPED"),
    (IMAGE_FILE_AGGRESSIVE_WS_TRIM as u64, "IMAGE_FILE_AGGRESSIVE_WS_TRIM"),
    (IMAGE_FILE_LARGE_ADDRESS_AWARE as u64, "IMAGE_FILE_LARGE_ADDRESS_AWARE"),
    (IMAGE_FILE_BYTES_REVERSED_LO as u64, "IMAGE_FILE_BYTES_REVERSED_LO"),
    (IMAGE_FILE_32BIT_MACHINE as u64, "IMAGE_FILE_32BIT_MACHINE"),
    (IMAGE_FILE_DEBUG_STRIPPED as u64, "IMAGE_FILE_DEBUG_STRIPPED"),
    (IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP as u64, "IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP"),
    (IMAGE_FILE_NET_RUN_FROM_SWAP as u64, "IMAGE_FILE_NET_RUN_FROM_SWAP"),
    (IMAGE_FILE_SYSTEM as u64, "IMAGE_FILE_SYSTEM"),
    (IMAGE_FILE_DLL as u64, "IMAGE_FILE_DLL"),
    (IMAGE_FILE_UP_SYSTEM_ONLY as u64, "IMAGE_FILE_UP_SYSTEM_ONLY"),
    (IMAGE_FILE_BYTES_REVERSED_HI as u64, "IMAGE_FILE_BYTES_REVERSED_HI"),
];

// The IMAGE_SCN_ALIGN_* values share a 4-bit sub-field and are not listed.
static SECTION_CHARACTERISTICS: &[(u64, &str)] = &[
    (IMAGE_SCN_TYPE_NO_PAD as u64, "IMAGE_SCN_TYPE_NO_PAD"),
    (IMAGE_SCN_CNT_CODE as u64, "IMAGE_SCN_CNT_CODE"),
    (IMAGE_SCN_CNT_INITIALIZED_DATA as u64, "IMAGE_SCN_CNT_INITIALIZED_DATA"),
    (IMAGE_SCN_CNT_UNINITIALIZED_DATA as u64, "IMAGE_SCN_CNT_UNINITIALIZED_DATA"),
    (IMAGE_SCN_LNK_OTHER as u64, "IMAGE_SCN_LNK_OTHER"),
    (IMAGE_SCN_LNK_INFO as u64, "IMAGE_SCN_LNK_INFO"),
    (IMAGE_SCN_LNK_REMOVE as u64, "IMAGE_SCN_LNK_REMOVE"),
    (IMAGE_SCN_LNK_COMDAT as u64, "IMAGE_SCN_LNK_COMDAT"),
    (IMAGE_SCN_GPREL as u64, "IMAGE_SCN_GPREL"),
    (IMAGE_SCN_MEM_PURGEABLE as u64, "IMAGE_SCN_MEM_PURGEABLE"),
    (IMAGE_SCN_MEM_LOCKED as u64, "IMAGE_SCN_MEM_LOCKED"),
    (IMAGE_SCN_MEM_PRELOAD as u64, "IMAGE_SCN_MEM_PRELOAD"),
    (IMAGE_SCN_LNK_NRELOC_OVFL as u64, "IMAGE_SCN_LNK_NRELOC_OVFL"),
    (IMAGE_SCN_MEM_DISCARDABLE as u64, "IMAGE_SCN_MEM_DISCARDABLE"),
    (IMAGE_SCN_MEM_NOT_CACHED as u64, "IMAGE_SCN_MEM_NOT_CACHED"),
    (IMAGE_SCN_MEM_NOT_PAGED as u64, "IMAGE_SCN_MEM_NOT_PAGED"),
    (IMAGE_SCN_MEM_SHARED as u64, "IMAGE_SCN_MEM_SHARED"),
    (IMAGE_SCN_MEM_EXECUTE as u64, "IMAGE_SCN_MEM_EXECUTE"),
    (IMAGE_SCN_MEM_READ as u64, "IMAGE_SCN_MEM_READ"),
    (IMAGE_SCN_MEM_WRITE as u64, "IMAGE_SCN_MEM_WRITE"),
];

impl FlagTable {
    fn entries(self) -> &'static [(u64, &'static str)] {
        match self {
            FlagTable::CoffMachine => COFF_MACHINE,
            FlagTable::CoffCharacteristics => COFF_CHARACTERISTICS,
            FlagTable::SectionCharacteristics => SECTION_CHARACTERISTICS,
        }
    }

    /// Returns the symbolic name registered for `key`, if any.
    pub fn lookup(self, key: u64) -> Option<&'static str> {
        self.entries()
            .iter()
            .find(|(value, _)| *value == key)
            .map(|(_, name)| *name)
    }

    /// Splits `value` into its set bits, lowest first, pairing each mask with
    /// its symbolic name. Only the low `bits` positions are visited.
    pub fn decode_mask(self, value: u64, bits: u32) -> Vec<(u64, Option<&'static str>)> {
        (0..bits.min(u64::BITS))
            .map(|bit| 1u64 << bit)
            .filter(|mask| value & mask != 0)
            .map(|mask| (mask, self.lookup(mask)))
            .collect()
    }
}

impl fmt::Display for FlagTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagTable::CoffMachine => "coff_machine",
            FlagTable::CoffCharacteristics => "coff_characteristics",
            FlagTable::SectionCharacteristics => "section_characteristics",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_lookup_is_exact() {
        assert_eq!(
            FlagTable::CoffMachine.lookup(0x8664),
            Some("IMAGE_FILE_MACHINE_AMD64")
        );
        assert_eq!(
            FlagTable::CoffMachine.lookup(0x014c),
            Some("IMAGE_FILE_MACHINE_I386")
        );
        assert_eq!(FlagTable::CoffMachine.lookup(0x1234), None);
    }

    #[test]
    fn tables_do_not_share_entries() {
        // 0x20 means different things in each header.
        assert_eq!(
            FlagTable::CoffCharacteristics.lookup(0x20),
            Some("IMAGE_FILE_LARGE_ADDRESS_AWARE")
        );
        assert_eq!(
            FlagTable::SectionCharacteristics.lookup(0x20),
            Some("IMAGE_SCN_CNT_CODE")
        );
        assert_eq!(FlagTable::CoffCharacteristics.lookup(0x8664), None);
    }

    #[test]
    fn dll_bit_is_named() {
        assert_eq!(
            FlagTable::CoffCharacteristics.lookup(0x2000),
            Some("IMAGE_FILE_DLL")
        );
    }

    #[test]
    fn decode_mask_visits_bits_in_order() {
        let bits = FlagTable::SectionCharacteristics.decode_mask(0x6000_0020, 32);
        assert_eq!(
            bits,
            vec![
                (0x20, Some("IMAGE_SCN_CNT_CODE")),
                (0x2000_0000, Some("IMAGE_SCN_MEM_EXECUTE")),
                (0x4000_0000, Some("IMAGE_SCN_MEM_READ")),
            ]
        );
    }

    #[test]
    fn decode_mask_keeps_bit_zero_and_unknown_bits() {
        let bits = FlagTable::CoffCharacteristics.decode_mask(0x0041, 16);
        assert_eq!(
            bits,
            vec![(0x1, Some("IMAGE_FILE_RELOCS_STRIPPED")), (0x40, None)]
        );
    }

    #[test]
    fn decode_mask_respects_width() {
        assert!(FlagTable::CoffCharacteristics
            .decode_mask(0x1_0000, 16)
            .is_empty());
        assert_eq!(
            FlagTable::SectionCharacteristics
                .decode_mask(u64::MAX, 64)
                .len(),
            64
        );
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(
            FlagTable::SectionCharacteristics.to_string(),
            "section_characteristics"
        );
    }
}
