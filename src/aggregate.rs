// Aggregation Engine - grouped sums over one or two categorical dimensions
// Ordered output, zero-filled pivots, Pearson correlation matrix

use crate::error::{InsightError, Result};
use crate::table::{Column, Table};
use std::cmp::Ordering;
use std::collections::HashMap;

// ============================================================================
// KEY ORDERING
// ============================================================================

/// Natural ordering for grouping keys: numeric ascending when both keys parse
/// as numbers, lexical otherwise.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

// ============================================================================
// SINGLE-KEY AGGREGATE
// ============================================================================

/// Ordered mapping from group key to reduced value (sum). Rows with a missing
/// key or a missing value do not contribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pairs: Vec<(String, f64)>,
}

impl Aggregate {
    pub fn pairs(&self) -> &[(String, f64)] {
        &self.pairs
    }

    pub fn keys(&self) -> Vec<String> {
        self.pairs.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.pairs.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Entry with the maximum value. Ties resolve to the entry that appears
    /// first in key order (strictly-greater comparison keeps the first).
    pub fn max_entry(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (key, value) in &self.pairs {
            match best {
                Some((_, b)) if *value <= b => {}
                _ => best = Some((key.as_str(), *value)),
            }
        }
        best
    }

    pub fn total(&self) -> f64 {
        self.pairs.iter().map(|(_, v)| v).sum()
    }
}

/// Group `value_col` by `key_col` and sum.
pub fn group_sum(table: &Table, key_col: &str, value_col: &str) -> Result<Aggregate> {
    let keys = table.require_column(key_col)?;
    let values = numeric_column(table, value_col)?;

    let mut sums: HashMap<String, f64> = HashMap::new();
    for row in 0..table.row_count() {
        let (Some(key), Some(value)) = (keys.label(row), values[row]) else {
            continue;
        };
        *sums.entry(key).or_insert(0.0) += value;
    }

    let mut pairs: Vec<(String, f64)> = sums.into_iter().collect();
    pairs.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    Ok(Aggregate { pairs })
}

// ============================================================================
// TWO-KEY PIVOT
// ============================================================================

/// Matrix-shaped two-dimensional aggregate: one row per first-dimension key,
/// one column per second-dimension key, absent combinations filled with zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub row_keys: Vec<String>,
    pub col_keys: Vec<String>,
    /// values[row][col], zero-filled.
    pub values: Vec<Vec<f64>>,
}

impl Pivot {
    pub fn get(&self, row_key: &str, col_key: &str) -> Option<f64> {
        let r = self.row_keys.iter().position(|k| k == row_key)?;
        let c = self.col_keys.iter().position(|k| k == col_key)?;
        Some(self.values[r][c])
    }

    /// Largest row total, used to scale stacked-bar axes.
    pub fn max_row_total(&self) -> f64 {
        self.values
            .iter()
            .map(|row| row.iter().sum::<f64>())
            .fold(0.0, f64::max)
    }
}

/// Group `value_col` by `row_col` × `col_col` and sum into a zero-filled
/// matrix, both dimensions in natural key order.
pub fn pivot_sum(table: &Table, row_col: &str, col_col: &str, value_col: &str) -> Result<Pivot> {
    let rows = table.require_column(row_col)?;
    let cols = table.require_column(col_col)?;
    let values = numeric_column(table, value_col)?;

    let mut sums: HashMap<(String, String), f64> = HashMap::new();
    let mut row_keys: Vec<String> = Vec::new();
    let mut col_keys: Vec<String> = Vec::new();
    for row in 0..table.row_count() {
        let (Some(rk), Some(ck), Some(value)) = (rows.label(row), cols.label(row), values[row])
        else {
            continue;
        };
        if !row_keys.contains(&rk) {
            row_keys.push(rk.clone());
        }
        if !col_keys.contains(&ck) {
            col_keys.push(ck.clone());
        }
        *sums.entry((rk, ck)).or_insert(0.0) += value;
    }

    row_keys.sort_by(|a, b| natural_cmp(a, b));
    col_keys.sort_by(|a, b| natural_cmp(a, b));

    let values = row_keys
        .iter()
        .map(|rk| {
            col_keys
                .iter()
                .map(|ck| {
                    sums.get(&(rk.clone(), ck.clone()))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    Ok(Pivot {
        row_keys,
        col_keys,
        values,
    })
}

// ============================================================================
// DISTRIBUTIONS & CORRELATION
// ============================================================================

/// Raw (not reduced) per-group value distributions, groups in natural key
/// order. Drives the box and violin charts.
pub fn grouped_values(
    table: &Table,
    key_col: &str,
    value_col: &str,
) -> Result<Vec<(String, Vec<f64>)>> {
    let keys = table.require_column(key_col)?;
    let values = numeric_column(table, value_col)?;

    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for row in 0..table.row_count() {
        let (Some(key), Some(value)) = (keys.label(row), values[row]) else {
            continue;
        };
        groups.entry(key).or_default().push(value);
    }

    let mut out: Vec<(String, Vec<f64>)> = groups.into_iter().collect();
    out.sort_by(|a, b| natural_cmp(&a.0, &b.0));
    Ok(out)
}

/// Pairwise Pearson correlation matrix over all numeric columns. Cells fall
/// back to NaN when fewer than two complete row pairs exist or a column has
/// zero variance.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let columns = table.numeric_columns();
    let labels: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let values = columns
        .iter()
        .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
        .collect();

    CorrelationMatrix { labels, values }
}

fn pearson(a: &Column, b: &Column) -> f64 {
    let (Some(xs), Some(ys)) = (a.numeric(), b.numeric()) else {
        return f64::NAN;
    };

    // Pairwise deletion: only rows where both cells are present
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in &pairs {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    if vx == 0.0 || vy == 0.0 {
        return f64::NAN;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

fn numeric_column<'a>(table: &'a Table, name: &str) -> Result<&'a [Option<f64>]> {
    let column = table.require_column(name)?;
    column
        .numeric()
        .ok_or_else(|| InsightError::NonNumeric(name.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn table(csv: &str) -> Table {
        Table::from_csv_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_group_sum_order_independent() {
        let a = table("K,V\nA,10\nB,5\nA,3\n");
        let b = table("K,V\nB,5\nA,3\nA,10\n");
        let agg_a = group_sum(&a, "K", "V").unwrap();
        let agg_b = group_sum(&b, "K", "V").unwrap();
        assert_eq!(agg_a, agg_b);
        assert_eq!(
            agg_a.pairs(),
            &[("A".to_string(), 13.0), ("B".to_string(), 5.0)]
        );
    }

    #[test]
    fn test_group_sum_numeric_keys_sort_ascending() {
        let t = table("Year,V\n2021,1\n2019,2\n2020,3\n");
        let agg = group_sum(&t, "Year", "V").unwrap();
        assert_eq!(agg.keys(), vec!["2019", "2020", "2021"]);
    }

    #[test]
    fn test_group_sum_skips_missing_cells() {
        let t = table("K,V\nA,10\n,7\nA,\nB,2\n");
        let agg = group_sum(&t, "K", "V").unwrap();
        assert_eq!(
            agg.pairs(),
            &[("A".to_string(), 10.0), ("B".to_string(), 2.0)]
        );
    }

    #[test]
    fn test_group_sum_missing_column() {
        let t = table("K,V\nA,1\n");
        let err = group_sum(&t, "Year", "V").unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(ref c) if c == "Year"));
    }

    #[test]
    fn test_group_sum_non_numeric_value_column() {
        let t = table("K,V\nA,x\nB,y\n");
        let err = group_sum(&t, "K", "V").unwrap_err();
        assert!(matches!(err, InsightError::NonNumeric(ref c) if c == "V"));
    }

    #[test]
    fn test_max_entry_tie_keeps_first() {
        let t = table("K,V\nB,5\nA,5\n");
        let agg = group_sum(&t, "K", "V").unwrap();
        let (key, value) = agg.max_entry().unwrap();
        assert_eq!(key, "A");
        assert!((value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_entry_empty() {
        let t = table("K,V\n");
        let agg = group_sum(&t, "K", "V").unwrap();
        assert!(agg.max_entry().is_none());
    }

    #[test]
    fn test_pivot_zero_fills_absent_combinations() {
        let t = table("Year,Gender,V\n2019,Male,10\n2020,Female,20\n");
        let pivot = pivot_sum(&t, "Year", "Gender", "V").unwrap();
        assert_eq!(pivot.row_keys, vec!["2019", "2020"]);
        assert_eq!(pivot.col_keys, vec!["Female", "Male"]);
        assert_eq!(pivot.get("2019", "Female"), Some(0.0));
        assert_eq!(pivot.get("2019", "Male"), Some(10.0));
        assert_eq!(pivot.get("2020", "Female"), Some(20.0));
        assert_eq!(pivot.get("2020", "Male"), Some(0.0));
    }

    #[test]
    fn test_pivot_sums_duplicates() {
        let t = table("Year,Gender,V\n2019,Male,10\n2019,Male,5\n2019,Female,1\n");
        let pivot = pivot_sum(&t, "Year", "Gender", "V").unwrap();
        assert_eq!(pivot.get("2019", "Male"), Some(15.0));
        assert!((pivot.max_row_total() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_grouped_values() {
        let t = table("K,V\nB,1\nA,2\nB,3\n");
        let groups = grouped_values(&t, "K", "V").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "A");
        assert_eq!(groups[0].1, vec![2.0]);
        assert_eq!(groups[1].0, "B");
        assert_eq!(groups[1].1, vec![1.0, 3.0]);
    }

    #[test]
    fn test_correlation_matrix() {
        let t = table("X,Y,L\n1,2,a\n2,4,b\n3,6,c\n");
        let corr = correlation_matrix(&t);
        assert_eq!(corr.labels, vec!["X", "Y"]);
        // Perfectly linear: every cell is 1
        assert!((corr.values[0][0] - 1.0).abs() < 1e-9);
        assert!((corr.values[0][1] - 1.0).abs() < 1e-9);
        assert!((corr.values[1][0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_negative() {
        let t = table("X,Y\n1,6\n2,4\n3,2\n");
        let corr = correlation_matrix(&t);
        assert!((corr.values[0][1] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_zero_variance_is_nan() {
        let t = table("X,Y\n1,5\n2,5\n3,5\n");
        let corr = correlation_matrix(&t);
        assert!(corr.values[0][1].is_nan());
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("CSE", "ECE"), Ordering::Less);
        assert_eq!(natural_cmp("10", "10"), Ordering::Equal);
    }
}
