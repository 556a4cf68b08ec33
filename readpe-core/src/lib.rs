pub mod error;
pub mod field;
pub mod field_map;
pub mod flags;
pub mod header;
pub mod image;

pub use error::*;
pub use field::*;
pub use field_map::*;
pub use flags::*;
pub use header::{CoffHeader, DosHeader, Header, SectionHeader};
pub use image::*;
