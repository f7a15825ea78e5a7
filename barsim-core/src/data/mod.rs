//! Bar data: the source trait the simulation consumes and an in-memory
//! historical implementation.

pub mod align;
pub mod history;
pub mod source;

pub use align::{align_symbols, AlignedData};
pub use history::HistoricalBars;
pub use source::{BarMap, BarSource, SourceError};
