//! Text extraction and numeric normalization shared by every source adapter.

pub mod number;
pub mod text;

pub use number::{parse_number, parse_scaled, to_number, NumberFormat, RawNumber};
pub use text::{count_occurrences, extract, Anchored};
