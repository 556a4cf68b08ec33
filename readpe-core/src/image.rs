use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{IoError, RunError, ValidationError};
use crate::header::{CoffHeader, DosHeader, Header, SectionHeader};

/// A PE image held in memory and the headers decoded from it.
#[derive(Debug)]
pub struct ImageReader {
    pub path: PathBuf,
    buffer: Vec<u8>,
    dos_header: Option<DosHeader>,
    coff_header: Option<CoffHeader>,
    section_headers: Vec<SectionHeader>,
}

impl ImageReader {
    /// Reads the whole file at `path` into memory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => IoError::NotFound(path.to_path_buf()),
            _ => IoError::ReadFailure {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|source| IoError::ReadFailure {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("Loaded {} ({} bytes)", path.display(), buffer.len());

        Ok(Self::from_bytes(path, buffer))
    }

    /// Wraps an image that is already in memory.
    pub fn from_bytes<P: Into<PathBuf>>(path: P, buffer: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            buffer,
            dos_header: None,
            coff_header: None,
            section_headers: Vec::new(),
        }
    }

    pub fn file_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn dos_header(&self) -> Option<&DosHeader> {
        self.dos_header.as_ref()
    }

    pub fn coff_header(&self) -> Option<&CoffHeader> {
        self.coff_header.as_ref()
    }

    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.section_headers
    }

    /// Decodes the DOS header, the COFF header and the section table, in
    /// that order, writing the report to `out`.
    ///
    /// Each stage supplies the offset of the next, so the first header that
    /// fails to decode or validate stops the run. Every section is decoded
    /// before any of them is printed.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<(), RunError> {
        self.dos_header = None;
        self.coff_header = None;
        self.section_headers.clear();

        let mut dos = DosHeader::new();
        dos.parse(&self.buffer)?;
        if !dos.validate() {
            return reject(out, ValidationError::DosHeader);
        }
        dos.print(out)?;

        let coff_offset = dos.pe_header_offset() as usize;
        self.dos_header = Some(dos);

        let mut coff = CoffHeader::new(coff_offset);
        coff.parse(&self.buffer)?;
        if !coff.validate() {
            return reject(out, ValidationError::CoffHeader);
        }
        coff.print(out)?;

        let table_offset = coff.section_table_offset();
        let count = usize::from(coff.number_of_sections());
        self.coff_header = Some(coff);
        log::info!("{} section(s) in table at {:#x}", count, table_offset);

        let mut sections = Vec::with_capacity(count);
        for index in 0..count {
            let mut section = SectionHeader::new(table_offset, index);
            section.parse(&self.buffer)?;
            if !section.validate() {
                return reject(out, ValidationError::SectionHeader(index));
            }
            sections.push(section);
        }

        writeln!(out, "Sections")?;
        for section in &sections {
            section.print(out)?;
            writeln!(out)?;
        }
        self.section_headers = sections;

        Ok(())
    }
}

fn reject(out: &mut dyn Write, err: ValidationError) -> Result<(), RunError> {
    log::warn!("validation failed: {:?}", err);
    writeln!(out, "{}", err)?;
    Err(err.into())
}
