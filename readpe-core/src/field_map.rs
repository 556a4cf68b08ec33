use std::io::{self, Write};

use crate::error::DecodeError;
use crate::field::{Field, FieldLayout, Rules};

/// Column width of the `description:` cell.
pub const LABEL_WIDTH: usize = 34;

/// Indentation of each decoded characteristics line.
pub const FLAG_INDENT: usize = 42;

/// An ordered group of named fields sharing one base offset.
///
/// Iteration order is insertion order, which is also display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    base_offset: usize,
    indent: &'static str,
    fields: Vec<(&'static str, Field)>,
}

impl FieldMap {
    pub fn new(base_offset: usize) -> Self {
        Self {
            base_offset,
            indent: "",
            fields: Vec::new(),
        }
    }

    /// Builds a map holding one field per layout entry, in layout order.
    pub fn from_layout(base_offset: usize, layout: &[FieldLayout]) -> Self {
        let mut map = Self::new(base_offset);
        for entry in layout {
            map.insert(entry.key, Field::from_layout(entry));
        }
        map
    }

    /// Nests every label by `indent` inside the label column.
    pub fn with_indent(mut self, indent: &'static str) -> Self {
        self.indent = indent;
        self
    }

    /// Appends `field` under `key`. Returns false, leaving the map
    /// untouched, if the key is already present.
    pub fn insert(&mut self, key: &'static str, field: Field) -> bool {
        if self.get(key).is_some() {
            log::debug!("duplicate field key {key}");
            return false;
        }
        self.fields.push((key, field));
        true
    }

    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, field)| field)
    }

    /// The decoded value of `key`, widened to 64 bits.
    pub fn value(&self, key: &str) -> Option<u64> {
        self.get(key).map(|field| field.value().as_u64())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Field)> {
        self.fields.iter().map(|(key, field)| (*key, field))
    }

    /// Decodes every field from `buffer`, stopping at the first field that
    /// does not fit.
    pub fn parse(&mut self, buffer: &[u8]) -> Result<(), DecodeError> {
        let base = self.base_offset;
        for (_, field) in self.fields.iter_mut() {
            field.set_value(buffer, base)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> bool {
        self.fields.iter().all(|(_, field)| field.validate())
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        for (_, field) in &self.fields {
            if !field.is_displayed() {
                continue;
            }
            let value = field.render();

            let label = format!("{}{}:", self.indent, field.description());
            writeln!(out, "    {:<width$}{}", label, value, width = LABEL_WIDTH)?;

            if field.rules().contains(Rules::WITH_FLAGS) {
                writeln!(out, "    Characteristics names")?;
                for name in field.characteristics() {
                    writeln!(out, "{:indent$}{}", "", name, indent = FLAG_INDENT)?;
                }
            }
        }
        Ok(())
    }
}
