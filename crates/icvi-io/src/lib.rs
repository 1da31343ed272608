//! File I/O, validation, and serialization for the ICVI pipeline.
//!
//! Reads long-format indicator panels into an
//! [`IndicatorTable`](icvi_index::IndicatorTable), harmonizes province names,
//! matches regions against GeoJSON boundaries and writes scores, weights and
//! drill-downs.

mod align;
mod boundary;
mod domain;
mod error;
pub mod provinces;
mod reader;
mod writer;

pub use align::{RegionMatch, match_regions};
pub use boundary::{BoundaryReader, DEFAULT_NAME_PROPERTY};
pub use domain::RunName;
pub use error::IoError;
pub use reader::IndicatorReader;
pub use writer::ResultWriter;
