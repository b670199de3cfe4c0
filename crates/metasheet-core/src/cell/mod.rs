//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1", "$B$22")

mod address;
mod value;

pub use address::CellAddress;
pub use value::{CellError, CellValue, SharedString};
