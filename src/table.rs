// Dataset Loader - CSV bytes → columnar Table
// Explicit column-typing pass: numeric vs categorical, missing cells tracked

use crate::error::{InsightError, Result};

// ============================================================================
// COLUMN TYPES
// ============================================================================

/// Inferred type of a loaded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

/// Typed cell storage. Empty cells are `None` in either representation.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match &self.values {
            ColumnValues::Numeric(_) => ColumnType::Numeric,
            ColumnValues::Text(_) => ColumnType::Categorical,
        }
    }

    /// Number of empty cells in this column.
    pub fn missing_count(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Numeric view of the column, `None` for categorical columns.
    pub fn numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Text(_) => None,
        }
    }

    /// Non-missing numeric values, in row order.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        self.numeric()
            .map(|cells| cells.iter().filter_map(|c| *c).collect())
    }

    /// Display label for a cell, used as a grouping key. Numeric cells are
    /// formatted with integral values rendered without a fraction ("2019",
    /// not "2019.0"). Missing cells yield `None`.
    pub fn label(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            ColumnValues::Text(v) => v.get(row).cloned().flatten(),
        }
    }
}

/// Format a numeric value the way it reads in a label: no trailing ".0" for
/// integral values, up to two decimals otherwise.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// In-memory columnar representation of an uploaded dataset. Created once per
/// request, immutable afterwards. All columns have equal length.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column lookup that fails with the pipeline's missing-column error.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| InsightError::MissingColumn(name.to_string()))
    }

    /// Columns that typed as numeric, in declaration order.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.column_type() == ColumnType::Numeric)
            .collect()
    }

    /// Columns that typed as categorical, in declaration order.
    pub fn categorical_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.column_type() == ColumnType::Categorical)
            .collect()
    }

    /// Row-projected copy of the table, preserving column order and types.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                values: match &column.values {
                    ColumnValues::Numeric(cells) => ColumnValues::Numeric(
                        indices
                            .iter()
                            .map(|&i| cells.get(i).copied().flatten())
                            .collect(),
                    ),
                    ColumnValues::Text(cells) => ColumnValues::Text(
                        indices
                            .iter()
                            .map(|&i| cells.get(i).cloned().flatten())
                            .collect(),
                    ),
                },
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Parse raw uploaded CSV bytes into a typed Table.
    ///
    /// The first record is the header. Rows with a field count different from
    /// the header, or bytes that do not decode as text, fail the whole load.
    /// No schema validation happens here: column names are taken as-is and
    /// checked later by the aggregation engine.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Table> {
        // a UTF-8 BOM would otherwise end up glued to the first header name
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| InsightError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() {
            return Err(InsightError::Parse("no header row".to_string()));
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| InsightError::Parse(format!("record {}: {}", line + 2, e)))?;
            for (col, field) in record.iter().enumerate() {
                let trimmed = field.trim();
                cells[col].push(if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                });
            }
        }

        let row_count = cells.first().map(|c| c.len()).unwrap_or(0);
        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column {
                name,
                values: type_column(raw),
            })
            .collect();

        log::debug!("loaded table: {} rows", row_count);
        Ok(Table { columns, row_count })
    }
}

/// Typing pass: a column is numeric iff it has at least one non-empty cell
/// and every non-empty cell parses as f64. All-empty columns stay categorical.
fn type_column(raw: Vec<Option<String>>) -> ColumnValues {
    let mut any = false;
    let all_numeric = raw.iter().flatten().all(|s| {
        any = true;
        s.parse::<f64>().is_ok()
    });

    if any && all_numeric {
        ColumnValues::Numeric(
            raw.into_iter()
                .map(|cell| cell.and_then(|s| s.parse::<f64>().ok()))
                .collect(),
        )
    } else {
        ColumnValues::Text(raw)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Year,Number_of_Students,Branch,Category,Gender
2019,120,CSE,General,Male
2019,80,ECE,OBC,Female
2020,150,CSE,General,Female
2020,90,ECE,SC,Male
";

    #[test]
    fn test_load_basic_table() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.column_count(), 5);
        assert_eq!(
            table.column_names(),
            vec!["Year", "Number_of_Students", "Branch", "Category", "Gender"]
        );
    }

    #[test]
    fn test_type_inference() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            table.column("Year").unwrap().column_type(),
            ColumnType::Numeric
        );
        assert_eq!(
            table.column("Number_of_Students").unwrap().column_type(),
            ColumnType::Numeric
        );
        assert_eq!(
            table.column("Branch").unwrap().column_type(),
            ColumnType::Categorical
        );
        assert_eq!(table.numeric_columns().len(), 2);
        assert_eq!(table.categorical_columns().len(), 3);
    }

    #[test]
    fn test_missing_cells() {
        let csv = "A,B\n1,x\n,y\n3,\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("A").unwrap().missing_count(), 1);
        assert_eq!(table.column("B").unwrap().missing_count(), 1);
        // A stays numeric despite the gap
        assert_eq!(table.column("A").unwrap().column_type(), ColumnType::Numeric);
    }

    #[test]
    fn test_mixed_column_is_categorical() {
        let csv = "A\n1\ntwo\n3\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(
            table.column("A").unwrap().column_type(),
            ColumnType::Categorical
        );
    }

    #[test]
    fn test_all_empty_column_is_categorical() {
        let csv = "A,B\n1,\n2,\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let b = table.column("B").unwrap();
        assert_eq!(b.column_type(), ColumnType::Categorical);
        assert_eq!(b.missing_count(), 2);
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let csv = "A,B\n1,2\n3\n";
        let err = Table::from_csv_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, InsightError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Year,Branch\n2019,CSE\n");
        let table = Table::from_csv_bytes(&bytes).unwrap();
        assert!(table.column("Year").is_some());
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let bytes = [b'A', b',', b'B', b'\n', 0xff, 0xfe, b',', b'x', b'\n'];
        let err = Table::from_csv_bytes(&bytes).unwrap_err();
        assert!(matches!(err, InsightError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_require_column() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        assert!(table.require_column("Year").is_ok());
        let err = table.require_column("Semester").unwrap_err();
        assert!(matches!(err, InsightError::MissingColumn(ref c) if c == "Semester"));
    }

    #[test]
    fn test_labels_trim_integral_fraction() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        let year = table.column("Year").unwrap();
        assert_eq!(year.label(0), Some("2019".to_string()));

        assert_eq!(format_number(2019.0), "2019");
        assert_eq!(format_number(12.5), "12.50");
    }

    #[test]
    fn test_select_rows() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        let picked = table.select_rows(&[0, 2]);
        assert_eq!(picked.row_count(), 2);
        assert_eq!(picked.column_count(), 5);
        assert_eq!(picked.column("Branch").unwrap().label(1), Some("CSE".to_string()));
        assert_eq!(
            picked.column("Year").unwrap().column_type(),
            ColumnType::Numeric
        );
    }

    #[test]
    fn test_empty_rows_table() {
        let csv = "Year,Number_of_Students\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }
}
