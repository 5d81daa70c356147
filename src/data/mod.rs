/// Data layer: the concrete histogram container behind the source traits.
///
/// Architecture:
/// ```text
///  .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → HistogramFile
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ HistogramFile  │  named StoredHistogram cells (with under/overflow)
///   └───────────────┘
///        │
///        ▼
///   DataFile / BinnedHistogram traits  →  extract, plot
/// ```

pub mod loader;
pub mod model;

pub use loader::{load_file, write_json, write_parquet, HistFileOpener};
pub use model::{AxisSpec, BinAxis, HistogramFile, StoredHistogram};
