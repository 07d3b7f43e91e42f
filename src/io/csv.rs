//! Delimited-text readers and writers for matrices and metadata tables
//!
//! Input files are CSV or TSV with the delimiter auto-detected from the
//! header line. The first column always carries the row identifier.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::{Array2, ArrayView2};

use crate::data::{ExpressionMatrix, FeatureAnnotation, SampleMetadata};
use crate::error::{ExpressionError, Result};

/// Render a number so that re-parsing reproduces it exactly; NaN becomes NA
pub(crate) fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NA".to_string()
    } else {
        format!("{}", v)
    }
}

/// Parse a number written by `format_number`
pub(crate) fn parse_number(field: &str) -> Result<f64> {
    let field = field.trim();
    if field.is_empty() || field == "NA" {
        return Ok(f64::NAN);
    }
    field.parse().map_err(|_| ExpressionError::InvalidData {
        reason: format!("non-numeric value '{}'", field),
    })
}

/// Sniff the delimiter from the first line: tab wins over comma
fn detect_delimiter<P: AsRef<Path>>(path: P) -> Result<u8> {
    let file = File::open(path)?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line)?;
    if first_line.contains('\t') {
        Ok(b'\t')
    } else {
        Ok(b',')
    }
}

/// Read an expression matrix.
///
/// Expected format: header row with sample IDs, first column feature IDs.
pub fn read_expression_matrix<P: AsRef<Path>>(path: P) -> Result<ExpressionMatrix> {
    let delimiter = detect_delimiter(&path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(&path)?;

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(ExpressionError::InvalidData {
            reason: "matrix file needs a feature ID column and at least one sample column"
                .to_string(),
        });
    }
    let sample_ids: Vec<String> = headers.iter().skip(1).map(|s| s.trim().to_string()).collect();
    let n_samples = sample_ids.len();

    let mut feature_ids: Vec<String> = Vec::new();
    let mut data: Vec<f64> = Vec::new();

    for record in reader.records() {
        let record = record?;
        if record.len() != n_samples + 1 {
            return Err(ExpressionError::DimensionMismatch {
                expected: format!("{} columns", n_samples + 1),
                got: format!("{} columns", record.len()),
            });
        }
        let feature_id = record[0].trim().to_string();
        for field in record.iter().skip(1) {
            let value: f64 = field.trim().parse().map_err(|_| {
                ExpressionError::InvalidData {
                    reason: format!(
                        "non-numeric value '{}' for feature '{}'",
                        field, feature_id
                    ),
                }
            })?;
            data.push(value);
        }
        feature_ids.push(feature_id);
    }

    if feature_ids.is_empty() {
        return Err(ExpressionError::EmptyData {
            reason: "no features found in matrix file".to_string(),
        });
    }

    let n_features = feature_ids.len();
    let values = Array2::from_shape_vec((n_features, n_samples), data).map_err(|e| {
        ExpressionError::InvalidData {
            reason: format!("could not shape matrix data: {}", e),
        }
    })?;

    ExpressionMatrix::new(values, feature_ids, sample_ids)
}

/// Read a string table: header row of column names, first column row IDs
fn read_string_table<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<String>, Vec<String>, Vec<Vec<String>>)> {
    let delimiter = detect_delimiter(&path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(&path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(ExpressionError::EmptyData {
            reason: "empty table header".to_string(),
        });
    }
    let column_names: Vec<String> = headers.iter().skip(1).map(|s| s.trim().to_string()).collect();

    let mut row_ids: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); column_names.len()];

    for record in reader.records() {
        let record = record?;
        if record.len() != column_names.len() + 1 {
            return Err(ExpressionError::DimensionMismatch {
                expected: format!("{} columns", column_names.len() + 1),
                got: format!("{} columns", record.len()),
            });
        }
        row_ids.push(record[0].trim().to_string());
        for (i, field) in record.iter().skip(1).enumerate() {
            columns[i].push(field.trim().to_string());
        }
    }

    if row_ids.is_empty() {
        return Err(ExpressionError::EmptyData {
            reason: "no rows found in table".to_string(),
        });
    }

    Ok((row_ids, column_names, columns))
}

/// Read sample metadata: first column sample IDs, remaining columns categorical
pub fn read_sample_metadata<P: AsRef<Path>>(path: P) -> Result<SampleMetadata> {
    let (sample_ids, column_names, columns) = read_string_table(path)?;
    let mut metadata = SampleMetadata::new(sample_ids)?;
    for (name, values) in column_names.iter().zip(columns) {
        metadata.add_column(name, values)?;
    }
    Ok(metadata)
}

/// Read a feature annotation table: first column feature IDs
pub fn read_feature_annotation<P: AsRef<Path>>(path: P) -> Result<FeatureAnnotation> {
    let (feature_ids, column_names, columns) = read_string_table(path)?;
    let mut annotation = FeatureAnnotation::new(feature_ids)?;
    for (name, values) in column_names.iter().zip(columns) {
        annotation.add_column(name, values)?;
    }
    Ok(annotation)
}

/// Write a labeled numeric matrix as CSV with a header row
pub fn write_labeled_matrix<P: AsRef<Path>>(
    path: P,
    corner: &str,
    row_labels: &[String],
    col_labels: &[String],
    values: ArrayView2<'_, f64>,
) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;

    let mut header = vec![corner.to_string()];
    header.extend(col_labels.iter().cloned());
    writer.write_record(&header)?;

    for (i, label) in row_labels.iter().enumerate() {
        let mut record = vec![label.clone()];
        record.extend(values.row(i).iter().map(|&v| format_number(v)));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write an expression matrix as CSV
pub fn write_expression_matrix<P: AsRef<Path>>(
    path: P,
    matrix: &ExpressionMatrix,
) -> Result<()> {
    write_labeled_matrix(
        path,
        "feature_id",
        matrix.feature_ids(),
        matrix.sample_ids(),
        matrix.values(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_matrix_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe,s1,s2,s3").unwrap();
        writeln!(file, "f1,1.5,2.5,3.5").unwrap();
        writeln!(file, "f2,4.0,5.0,6.0").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_features(), 2);
        assert_eq!(matrix.sample_ids(), &["s1", "s2", "s3"]);
        assert_eq!(matrix.values()[[0, 1]], 2.5);
    }

    #[test]
    fn test_read_matrix_tsv_autodetect() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe\ts1\ts2").unwrap();
        writeln!(file, "f1\t1.0\t2.0").unwrap();

        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_samples(), 2);
        assert_eq!(matrix.values()[[0, 0]], 1.0);
    }

    #[test]
    fn test_non_numeric_value_names_feature() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "probe,s1,s2").unwrap();
        writeln!(file, "f1,1.0,oops").unwrap();

        let err = read_expression_matrix(file.path()).unwrap_err();
        assert!(err.to_string().contains("f1"), "got: {}", err);
    }

    #[test]
    fn test_read_metadata() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id,group,batch").unwrap();
        writeln!(file, "s1,normal,b1").unwrap();
        writeln!(file, "s2,tumor,b1").unwrap();

        let meta = read_sample_metadata(file.path()).unwrap();
        assert_eq!(meta.sample_ids(), &["s1", "s2"]);
        assert_eq!(meta.value("group", 1), Some("tumor"));
        assert_eq!(meta.column_names(), &["group", "batch"]);
    }

    #[test]
    fn test_matrix_write_read_round_trip() {
        let matrix = ExpressionMatrix::new(
            ndarray::array![[1.25, 2.5], [0.1, 1e-9]],
            vec!["f1".to_string(), "f2".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();

        let file = NamedTempFile::new().unwrap();
        write_expression_matrix(file.path(), &matrix).unwrap();
        let back = read_expression_matrix(file.path()).unwrap();

        assert_eq!(back.feature_ids(), matrix.feature_ids());
        assert_eq!(back.values(), matrix.values());
    }

    #[test]
    fn test_number_round_trip() {
        for v in [0.1, 1.0 / 3.0, 1e-300, -2.5e17, 0.0] {
            assert_eq!(parse_number(&format_number(v)).unwrap(), v);
        }
        assert!(parse_number("NA").unwrap().is_nan());
        assert!(format_number(f64::NAN) == "NA");
    }
}
