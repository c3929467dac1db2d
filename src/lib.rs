//! Core library for the sheet-prices command line application.
//!
//! Prices are read from a spreadsheet, converted into AUD, split from case
//! prices into per-bottle prices and written back next to the originals.
//! Spreadsheet access lives under [`io`], the typed row model in [`model`],
//! the conversion itself in [`normalize`], and the read/normalize/write
//! orchestration in [`sync`].

pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod normalize;
pub mod rates;
pub mod sync;

pub use error::{Result, ToolError};
