//! CSV data rows addressed by column name

use crate::{LabelError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PRODUCT_NAME: &str = "PRODUCT_NAME";
pub const COLOUR: &str = "COLOUR";
pub const STYLE: &str = "STYLE";
pub const BATCH: &str = "BATCH";
pub const BARCODE: &str = "BARCODE";

/// Columns the renderer reads; any others are carried but ignored
pub const KNOWN_COLUMNS: [&str; 5] = [PRODUCT_NAME, COLOUR, STYLE, BATCH, BARCODE];

/// A parsed CSV table with a header row
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Load a table from a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| LabelError::Data(format!("{}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    /// Parse a table from CSV text
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    /// Parse a table from any CSV source
    ///
    /// Rows may be shorter or longer than the header; missing cells read as
    /// empty. A table without data rows is rejected.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(LabelError::EmptyData);
        }

        let missing: Vec<&str> = KNOWN_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.iter().any(|h| h == c))
            .collect();
        if !missing.is_empty() {
            log::warn!("CSV has no {} column(s); they render empty", missing.join(", "));
        }
        log::debug!("Loaded {} row(s) with columns {:?}", rows.len(), columns);

        Ok(Self { columns, rows })
    }

    /// Header names in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether a column with this exact name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by 1-indexed row number
    pub fn row(&self, number: usize) -> Option<DataRow<'_>> {
        let values = self.rows.get(number.checked_sub(1)?)?;
        Some(DataRow {
            number,
            columns: &self.columns,
            values,
        })
    }
}

/// One data row; values are looked up by column name
#[derive(Debug, Clone, Copy)]
pub struct DataRow<'a> {
    number: usize,
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> DataRow<'a> {
    /// 1-indexed row number within the table
    pub fn number(&self) -> usize {
        self.number
    }

    /// Value of a column; absent columns and missing cells read as ""
    pub fn get(&self, column: &str) -> &'a str {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
PRODUCT_NAME,COLOUR,STYLE,BATCH,BARCODE,NOTES
Crew Tee,Navy,CT-01,B001,400638133393,first
Hoodie,Black,HD-02,B002,,
";

    #[test]
    fn test_parse_sample() {
        let table = DataTable::parse(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().len(), 6);
        assert!(table.has_column(BARCODE));

        let row = table.row(1).unwrap();
        assert_eq!(row.number(), 1);
        assert_eq!(row.get(PRODUCT_NAME), "Crew Tee");
        assert_eq!(row.get(BARCODE), "400638133393");
        assert_eq!(table.row(2).unwrap().get(BARCODE), "");
    }

    #[test]
    fn test_row_numbers_are_one_indexed() {
        let table = DataTable::parse(SAMPLE).unwrap();
        assert!(table.row(0).is_none());
        assert!(table.row(3).is_none());
    }

    #[test]
    fn test_missing_column_reads_empty() {
        let table = DataTable::parse("PRODUCT_NAME\nTee\n").unwrap();
        let row = table.row(1).unwrap();
        assert_eq!(row.get(COLOUR), "");
        assert_eq!(row.get(BARCODE), "");
        assert!(!table.has_column(BARCODE));
    }

    #[test]
    fn test_ragged_rows() {
        let table = DataTable::parse("PRODUCT_NAME,COLOUR,STYLE\nTee\nCap,Red,C1,extra\n").unwrap();
        assert_eq!(table.row(1).unwrap().get(STYLE), "");
        assert_eq!(table.row(2).unwrap().get(STYLE), "C1");
    }

    #[test]
    fn test_bom_is_stripped() {
        let table = DataTable::parse("\u{feff}PRODUCT_NAME,BARCODE\nTee,1\n").unwrap();
        assert!(table.has_column(PRODUCT_NAME));
        assert_eq!(table.row(1).unwrap().get(PRODUCT_NAME), "Tee");
    }

    #[test]
    fn test_header_only_is_empty_data() {
        assert!(matches!(
            DataTable::parse("PRODUCT_NAME,BARCODE\n"),
            Err(LabelError::EmptyData)
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DataTable::from_path("/nonexistent/Data.csv"),
            Err(LabelError::Data(_))
        ));
    }
}
