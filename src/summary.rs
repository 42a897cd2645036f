// Summary Computer - dataset-level descriptive statistics
// Numeric describe (count/mean/std/quartiles), categorical describe, missing counts

use crate::aggregate::natural_cmp;
use crate::table::{Column, ColumnType, Table};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// SUMMARY TYPES
// ============================================================================

/// Descriptive statistics for one numeric column. `std` is the sample
/// standard deviation and is NaN when fewer than two values are present;
/// percentiles use linear interpolation.
#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Descriptive statistics for one categorical column.
#[derive(Debug, Clone, Serialize)]
pub struct CategoricalSummary {
    pub name: String,
    pub count: usize,
    pub unique: usize,
    pub top: String,
    pub freq: usize,
}

/// Read-only derived view of a Table, computed fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
    /// Missing-cell count per column; the key set is always the full column
    /// set, zero counts included.
    pub missing: Vec<(String, usize)>,
}

impl DatasetSummary {
    /// The empty shape served before any file has been uploaded.
    pub fn empty() -> Self {
        DatasetSummary {
            row_count: 0,
            column_count: 0,
            columns: Vec::new(),
            numeric: Vec::new(),
            categorical: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn from_table(table: &Table) -> Self {
        let numeric = table
            .columns()
            .iter()
            .filter(|c| c.column_type() == ColumnType::Numeric)
            .map(numeric_summary)
            .collect();

        let categorical = table
            .columns()
            .iter()
            .filter(|c| c.column_type() == ColumnType::Categorical)
            .map(categorical_summary)
            .collect();

        let missing = table
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.missing_count()))
            .collect();

        DatasetSummary {
            row_count: table.row_count(),
            column_count: table.column_count(),
            columns: table.column_names(),
            numeric,
            categorical,
            missing,
        }
    }
}

fn numeric_summary(column: &Column) -> NumericSummary {
    let mut values = column.numeric_values().unwrap_or_default();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    NumericSummary {
        name: column.name.clone(),
        count: values.len(),
        mean: mean(&values),
        std: sample_std(&values),
        min: values.first().copied().unwrap_or(f64::NAN),
        q25: percentile(&values, 0.25),
        median: percentile(&values, 0.5),
        q75: percentile(&values, 0.75),
        max: values.last().copied().unwrap_or(f64::NAN),
    }
}

fn categorical_summary(column: &Column) -> CategoricalSummary {
    let mut freq: HashMap<String, usize> = HashMap::new();
    let mut count = 0usize;
    for row in 0..column.len() {
        if let Some(label) = column.label(row) {
            count += 1;
            *freq.entry(label).or_insert(0) += 1;
        }
    }

    // Most frequent value; ties resolve to the natural-order-first key so the
    // result never depends on hash iteration order.
    let mut entries: Vec<(String, usize)> = freq.into_iter().collect();
    entries.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    let (top, top_freq) = entries
        .iter()
        .fold(("".to_string(), 0usize), |acc, (key, n)| {
            if *n > acc.1 {
                (key.clone(), *n)
            } else {
                acc
            }
        });

    CategoricalSummary {
        name: column.name.clone(),
        count,
        unique: entries.len(),
        top,
        freq: top_freq,
    }
}

// ============================================================================
// STATISTICS HELPERS
// ============================================================================

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1). NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Linear-interpolation percentile over an already sorted slice, q in [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = q * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (idx - lo as f64)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    const SAMPLE: &str = "\
Year,Number_of_Students,Branch,Category,Gender
2019,1,CSE,General,Male
2019,2,ECE,OBC,Female
2020,3,CSE,General,Female
2020,4,ECE,SC,Male
2021,5,CSE,General,Male
";

    #[test]
    fn test_reference_statistics() {
        // [1,2,3,4,5]: mean 3.0, sample std 1.5811, median 3.0
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((mean(&values) - 3.0).abs() < 1e-12);
        assert!((sample_std(&values) - 1.5811388300841898).abs() < 1e-9);
        assert!((percentile(&values, 0.5) - 3.0).abs() < 1e-12);
        assert!((percentile(&values, 0.25) - 2.0).abs() < 1e-12);
        assert!((percentile(&values, 0.75) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.5) - 2.5).abs() < 1e-12);
        assert!((percentile(&values, 0.25) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_summary_shape() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        let summary = DatasetSummary::from_table(&table);

        assert_eq!(summary.row_count, 5);
        assert_eq!(summary.column_count, 5);
        assert_eq!(summary.numeric.len(), 2);
        assert_eq!(summary.categorical.len(), 3);

        // Missing-value mapping covers every column, zero counts included
        let keys: Vec<&str> = summary.missing.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Year", "Number_of_Students", "Branch", "Category", "Gender"]
        );
        assert!(summary.missing.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_numeric_describe_values() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        let summary = DatasetSummary::from_table(&table);
        let students = summary
            .numeric
            .iter()
            .find(|s| s.name == "Number_of_Students")
            .unwrap();

        assert_eq!(students.count, 5);
        assert!((students.mean - 3.0).abs() < 1e-12);
        assert!((students.std - 1.5811388300841898).abs() < 1e-9);
        assert!((students.min - 1.0).abs() < 1e-12);
        assert!((students.median - 3.0).abs() < 1e-12);
        assert!((students.max - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_describe() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        let summary = DatasetSummary::from_table(&table);
        let branch = summary
            .categorical
            .iter()
            .find(|s| s.name == "Branch")
            .unwrap();

        assert_eq!(branch.count, 5);
        assert_eq!(branch.unique, 2);
        assert_eq!(branch.top, "CSE");
        assert_eq!(branch.freq, 3);
    }

    #[test]
    fn test_categorical_top_tie_breaks_by_order() {
        let csv = "G\nB\nA\nB\nA\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let summary = DatasetSummary::from_table(&table);
        // A and B both appear twice; A sorts first
        assert_eq!(summary.categorical[0].top, "A");
        assert_eq!(summary.categorical[0].freq, 2);
    }

    #[test]
    fn test_no_numeric_columns_is_empty_not_error() {
        let csv = "Branch,Gender\nCSE,Male\nECE,Female\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let summary = DatasetSummary::from_table(&table);
        assert!(summary.numeric.is_empty());
        assert_eq!(summary.categorical.len(), 2);
    }

    #[test]
    fn test_missing_counts() {
        let csv = "A,B\n1,x\n,y\n3,\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let summary = DatasetSummary::from_table(&table);
        assert_eq!(
            summary.missing,
            vec![("A".to_string(), 1), ("B".to_string(), 1)]
        );
        // describe counts exclude missing cells
        assert_eq!(summary.numeric[0].count, 2);
        assert_eq!(summary.categorical[0].count, 2);
    }

    #[test]
    fn test_empty_summary_shape() {
        let summary = DatasetSummary::empty();
        assert_eq!(summary.row_count, 0);
        assert_eq!(summary.column_count, 0);
        assert!(summary.columns.is_empty());
        assert!(summary.missing.is_empty());
    }

    #[test]
    fn test_single_value_std_is_nan() {
        assert!(sample_std(&[5.0]).is_nan());
        assert!(mean(&[]).is_nan());
        assert!(percentile(&[], 0.5).is_nan());
    }
}
