// Fixed chart catalog - 11 charts, exact order and column bindings
// Each entry pairs a rendered image with its insight sentence

use crate::aggregate::{correlation_matrix, group_sum, grouped_values, pivot_sum, Aggregate};
use crate::error::Result;
use crate::insight;
use crate::render::{self, RenderConfig};
use crate::table::Table;
use serde::Serialize;

// ============================================================================
// REQUIRED COLUMNS
// ============================================================================

/// The fixed dataset schema the catalog binds to. The loader accepts any CSV;
/// these names are checked by the aggregation engine when charts run.
pub mod columns {
    pub const YEAR: &str = "Year";
    pub const STUDENTS: &str = "Number_of_Students";
    pub const BRANCH: &str = "Branch";
    pub const CATEGORY: &str = "Category";
    pub const GENDER: &str = "Gender";
}

/// Number of slots in the fixed catalog, treemap included.
pub const CHART_COUNT: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Line,
    LineBySeries,
    Bar,
    StackedBar,
    Pie,
    Box,
    Heatmap,
    Violin,
    Area,
    Treemap,
}

/// One rendered chart plus its paired insight. `image` is a base64 PNG and is
/// `None` only for the treemap slot when that capability is unavailable.
#[derive(Debug, Clone, Serialize)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub title: String,
    pub image: Option<String>,
    pub insight: String,
}

// ============================================================================
// CATALOG EXECUTION
// ============================================================================

/// Run the fixed catalog over a loaded table, in order. Any mandatory chart
/// failure aborts the whole batch; there is no partial-success mode.
pub fn render_catalog(table: &Table, config: &RenderConfig) -> Result<Vec<ChartArtifact>> {
    let mut artifacts = Vec::with_capacity(CHART_COUNT);

    // 1. Line: Year vs sum(Number_of_Students)
    let by_year = group_sum(table, columns::YEAR, columns::STUDENTS)?;
    artifacts.push(ChartArtifact {
        kind: ChartKind::Line,
        title: "Overall Trend".to_string(),
        image: Some(render::line_chart(
            config,
            "Overall Trend",
            columns::YEAR,
            columns::STUDENTS,
            &year_points(&by_year),
        )?),
        insight: insight::overall_trend(&by_year),
    });

    // 2. Line: Year vs sum(Number_of_Students), one series per Branch
    let branches = group_sum(table, columns::BRANCH, columns::STUDENTS)?;
    let mut branch_series = Vec::with_capacity(branches.len());
    for branch in branches.keys() {
        let filtered = filter_rows(table, columns::BRANCH, &branch)?;
        let per_year = group_sum(&filtered, columns::YEAR, columns::STUDENTS)?;
        branch_series.push((branch, year_points(&per_year)));
    }
    artifacts.push(ChartArtifact {
        kind: ChartKind::LineBySeries,
        title: "Trend by Branch".to_string(),
        image: Some(render::multi_line_chart(
            config,
            "Trend by Branch",
            columns::YEAR,
            columns::STUDENTS,
            &branch_series,
        )?),
        insight: insight::trend_by_branch(),
    });

    // 3. Bar: Branch vs sum(Number_of_Students)
    artifacts.push(ChartArtifact {
        kind: ChartKind::Bar,
        title: "Students by Branch".to_string(),
        image: Some(render::bar_chart(
            config,
            "Students by Branch",
            columns::STUDENTS,
            &branches,
        )?),
        insight: insight::students_by_branch(&branches),
    });

    // 4. Bar: Category vs sum(Number_of_Students)
    let categories = group_sum(table, columns::CATEGORY, columns::STUDENTS)?;
    artifacts.push(ChartArtifact {
        kind: ChartKind::Bar,
        title: "Students by Category".to_string(),
        image: Some(render::bar_chart(
            config,
            "Students by Category",
            columns::STUDENTS,
            &categories,
        )?),
        insight: insight::students_by_category(&categories),
    });

    // 5. Stacked bar: Year × Gender
    let year_gender = pivot_sum(table, columns::YEAR, columns::GENDER, columns::STUDENTS)?;
    artifacts.push(ChartArtifact {
        kind: ChartKind::StackedBar,
        title: "Students by Year and Gender".to_string(),
        image: Some(render::stacked_bar_chart(
            config,
            "Students by Year and Gender",
            columns::STUDENTS,
            &year_gender,
        )?),
        insight: insight::students_by_year_and_gender(),
    });

    // 6. Pie: share by Branch
    artifacts.push(ChartArtifact {
        kind: ChartKind::Pie,
        title: "Proportion by Branch".to_string(),
        image: Some(render::pie_chart(config, "Proportion by Branch", &branches)?),
        insight: insight::proportion_by_branch(),
    });

    // 7. Box plot: Branch distributions
    let branch_values = grouped_values(table, columns::BRANCH, columns::STUDENTS)?;
    artifacts.push(ChartArtifact {
        kind: ChartKind::Box,
        title: "Boxplot by Branch".to_string(),
        image: Some(render::box_chart(
            config,
            "Boxplot by Branch",
            columns::STUDENTS,
            &branch_values,
        )?),
        insight: insight::boxplot_by_branch(),
    });

    // 8. Heatmap: Pearson correlation over numeric columns
    let correlations = correlation_matrix(table);
    artifacts.push(ChartArtifact {
        kind: ChartKind::Heatmap,
        title: "Correlation Heatmap".to_string(),
        image: Some(render::heatmap_chart(
            config,
            "Correlation Heatmap",
            &correlations,
        )?),
        insight: insight::correlation_heatmap(),
    });

    // 9. Violin: Gender distributions
    let gender_values = grouped_values(table, columns::GENDER, columns::STUDENTS)?;
    artifacts.push(ChartArtifact {
        kind: ChartKind::Violin,
        title: "Violin Plot by Gender".to_string(),
        image: Some(render::violin_chart(
            config,
            "Violin Plot by Gender",
            columns::STUDENTS,
            &gender_values,
        )?),
        insight: insight::violin_by_gender(),
    });

    // 10. Area: per-year sums with a filled rendering
    artifacts.push(ChartArtifact {
        kind: ChartKind::Area,
        title: "Cumulative Students by Year".to_string(),
        image: Some(render::area_chart(
            config,
            "Cumulative Students by Year",
            columns::YEAR,
            columns::STUDENTS,
            &year_points(&by_year),
        )?),
        insight: insight::cumulative_by_year(),
    });

    // 11. Treemap: optional capability slot
    artifacts.push(treemap_slot(&branches, config)?);

    Ok(artifacts)
}

/// The treemap is the one degradable slot: when the capability is compiled
/// out or disabled at runtime, it becomes an insight with no image instead of
/// failing the request.
fn treemap_slot(branches: &Aggregate, config: &RenderConfig) -> Result<ChartArtifact> {
    if config.treemap_available() {
        #[cfg(feature = "treemap")]
        {
            return Ok(ChartArtifact {
                kind: ChartKind::Treemap,
                title: "Treemap of Branches".to_string(),
                image: Some(render::treemap_chart(
                    config,
                    "Treemap of Branches",
                    branches,
                )?),
                insight: insight::treemap_of_branches(),
            });
        }
    }

    let _ = branches;
    Ok(ChartArtifact {
        kind: ChartKind::Treemap,
        title: "Treemap of Branches".to_string(),
        image: None,
        insight: insight::treemap_unavailable(),
    })
}

// ============================================================================
// HELPERS
// ============================================================================

/// (year, sum) points for the numeric x axis of the line and area charts.
fn year_points(agg: &Aggregate) -> Vec<(f64, f64)> {
    agg.pairs()
        .iter()
        .filter_map(|(key, value)| key.parse::<f64>().ok().map(|year| (year, *value)))
        .collect()
}

/// Row-filtered copy of the table where `column` equals `key`. Used to derive
/// one per-year series per branch.
fn filter_rows(table: &Table, column: &str, key: &str) -> Result<Table> {
    let target = table.require_column(column)?;
    let keep: Vec<usize> = (0..table.row_count())
        .filter(|row| target.label(*row).as_deref() == Some(key))
        .collect();
    Ok(table.select_rows(&keep))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;
    use crate::table::Table;

    const SAMPLE: &str = "\
Year,Number_of_Students,Branch,Category,Gender
2019,120,CSE,General,Male
2019,80,ECE,OBC,Female
2020,150,CSE,General,Female
2020,90,ECE,SC,Male
2021,200,CSE,General,Male
2021,110,ECE,OBC,Female
";

    fn sample_table() -> Table {
        Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_catalog_produces_eleven_ordered_artifacts() {
        let artifacts = render_catalog(&sample_table(), &RenderConfig::detect()).unwrap();
        assert_eq!(artifacts.len(), CHART_COUNT);
        let titles: Vec<&str> = artifacts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Overall Trend",
                "Trend by Branch",
                "Students by Branch",
                "Students by Category",
                "Students by Year and Gender",
                "Proportion by Branch",
                "Boxplot by Branch",
                "Correlation Heatmap",
                "Violin Plot by Gender",
                "Cumulative Students by Year",
                "Treemap of Branches",
            ]
        );
    }

    #[test]
    fn test_mandatory_charts_all_have_images() {
        let artifacts = render_catalog(&sample_table(), &RenderConfig::detect()).unwrap();
        for artifact in artifacts.iter().take(10) {
            assert!(artifact.image.is_some(), "{} missing image", artifact.title);
            assert!(!artifact.insight.is_empty());
        }
    }

    #[test]
    fn test_treemap_disabled_substitutes_insight() {
        let config = RenderConfig::detect().with_treemap(false);
        let artifacts = render_catalog(&sample_table(), &config).unwrap();
        assert_eq!(artifacts.len(), CHART_COUNT);
        assert_eq!(artifacts.iter().filter(|a| a.image.is_some()).count(), 10);

        let treemap = artifacts.last().unwrap();
        assert!(treemap.image.is_none());
        assert!(treemap.insight.starts_with("Treemap not generated:"));
    }

    #[test]
    fn test_missing_year_column_is_fatal() {
        let csv = "Number_of_Students,Branch,Category,Gender\n10,CSE,General,Male\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let err = render_catalog(&table, &RenderConfig::detect()).unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(ref c) if c == "Year"));
    }

    #[test]
    fn test_non_numeric_students_column_is_fatal() {
        let csv = "Year,Number_of_Students,Branch,Category,Gender\n2019,many,CSE,General,Male\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let err = render_catalog(&table, &RenderConfig::detect()).unwrap_err();
        assert!(matches!(err, InsightError::NonNumeric(ref c) if c == columns::STUDENTS));
    }

    #[test]
    fn test_insights_match_extrema() {
        let artifacts = render_catalog(&sample_table(), &RenderConfig::detect()).unwrap();
        // 2021: 310 students, the maximum year total
        assert!(artifacts[0].insight.contains("2021"));
        assert!(artifacts[0].insight.contains("310"));
        // CSE: 470 vs ECE: 280
        assert!(artifacts[2].insight.contains("CSE"));
        assert!(artifacts[2].insight.contains("470"));
    }

    #[test]
    fn test_filter_rows() {
        let filtered = filter_rows(&sample_table(), columns::BRANCH, "CSE").unwrap();
        assert_eq!(filtered.row_count(), 3);
        assert_eq!(filtered.column_count(), 5);
    }
}
