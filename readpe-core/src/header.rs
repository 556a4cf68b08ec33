pub mod coff;
pub mod dos;
pub mod section;

use std::io::{self, Write};

use crate::error::DecodeError;
use crate::field_map::FieldMap;

pub use coff::CoffHeader;
pub use dos::DosHeader;
pub use section::SectionHeader;

/// A fixed-shape PE structure backed by a [`FieldMap`].
pub trait Header: std::fmt::Debug + Send + Sync {
    /// Title line printed above the field listing.
    fn title(&self) -> &'static str;

    fn fields(&self) -> &FieldMap;

    fn fields_mut(&mut self) -> &mut FieldMap;

    /// Structure-specific checks, run once every field is populated.
    fn check_magic(&self) -> bool {
        true
    }

    /// Absolute offset of this structure in the image.
    fn base_offset(&self) -> usize {
        self.fields().base_offset()
    }

    fn parse(&mut self, buffer: &[u8]) -> Result<(), DecodeError> {
        log::debug!("parsing {} at {:#x}", self.title().trim(), self.base_offset());
        self.fields_mut().parse(buffer)
    }

    fn validate(&self) -> bool {
        self.fields().validate() && self.check_magic()
    }

    fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self.title())?;
        self.fields().print(out)
    }
}
