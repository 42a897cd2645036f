// Analysis pipeline - uploaded bytes → summary + 11 chart artifacts
// One linear pass per request; nothing is cached or shared between requests

use crate::charts::{self, ChartArtifact};
use crate::error::Result;
use crate::render::RenderConfig;
use crate::summary::DatasetSummary;
use crate::table::Table;
use serde::Serialize;

/// Everything a response needs: the dataset summary plus the ordered chart
/// artifacts. Computed fresh per request and discarded with the response.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub summary: DatasetSummary,
    pub artifacts: Vec<ChartArtifact>,
}

/// Run the full pipeline over raw CSV bytes.
pub fn analyze_bytes(bytes: &[u8], config: &RenderConfig) -> Result<AnalysisReport> {
    let table = Table::from_csv_bytes(bytes)?;
    log::info!(
        "analyzing dataset: {} rows x {} columns",
        table.row_count(),
        table.column_count()
    );

    let summary = DatasetSummary::from_table(&table);
    let artifacts = charts::render_catalog(&table, config)?;

    Ok(AnalysisReport { summary, artifacts })
}

// ============================================================================
// TESTS
// ============================================================================
