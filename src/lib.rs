// Enrollment Insights - Core Library
// CSV upload → summary statistics → 11 charts + insights, for CLI and server

pub mod error;
pub mod table;      // Dataset loader: CSV bytes → typed columnar Table
pub mod summary;    // Descriptive statistics per dataset
pub mod aggregate;  // Grouped sums, pivots, correlation matrix
pub mod insight;    // One deterministic sentence per chart
pub mod render;     // Plotters drawing layer, base64 PNG output
pub mod charts;     // Fixed 11-chart catalog
pub mod pipeline;   // Bytes → AnalysisReport
pub mod storage;    // Uploads directory store
pub mod views;      // HTML assembly

// Re-export commonly used types
pub use aggregate::{
    correlation_matrix, group_sum, grouped_values, pivot_sum,
    Aggregate, CorrelationMatrix, Pivot,
};
pub use charts::{render_catalog, ChartArtifact, ChartKind, CHART_COUNT};
pub use error::{InsightError, Result};
pub use pipeline::{analyze_bytes, AnalysisReport};
pub use render::{Canvas, RenderConfig};
pub use storage::UploadStore;
pub use summary::{CategoricalSummary, DatasetSummary, NumericSummary};
pub use table::{Column, ColumnType, Table};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
