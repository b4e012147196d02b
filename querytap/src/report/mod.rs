//! Periodic reporting
//!
//! - `snapshot`: sorted, filtered view of the stats registry
//! - `render`: coloured text lines for the terminal
//! - `export`: JSON snapshot for offline analysis

pub mod export;
pub mod render;
pub mod snapshot;
pub mod theme;

pub use export::export_snapshot;
pub use render::render_snapshot;
pub use snapshot::{ReportRow, Reporter, Snapshot, SortKey};
pub use theme::Palette;
