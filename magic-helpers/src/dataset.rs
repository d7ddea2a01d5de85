//! Typed datasets and the row loader.
//!
//! The loader receives rows that are already in memory (reading files is the
//! caller's business), tokenizes each one as a CSV record and validates every
//! field. Rows that fail validation are reported to the diagnostics sink and
//! dropped; the run continues with the rows that survived.

use crate::diagnostics::DiagnosticsSink;
use crate::label::{Label, LabelAlphabet};
use crate::{Float, Record};
use csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::Array1;
use thiserror::Error;
use tracing::debug;

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("could not tokenize row: {0}")]
    Tokenize(String),
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid identifier {value:?}")]
    InvalidId { value: String },
    #[error("invalid number {value:?} in column {column}")]
    InvalidNumber { column: usize, value: String },
    #[error("non-finite value {value:?} in column {column}")]
    NonFinite { column: usize, value: String },
    #[error("empty label")]
    EmptyLabel,
}

/// A rejected data row. Recovered locally: the row is skipped.
///
/// `row` is the zero-based position among data rows (the header is not
/// counted).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}: {kind}")]
pub struct ParseError {
    pub row: usize,
    pub raw: String,
    pub kind: ParseErrorKind,
}

/// Errors raised while building or reshaping datasets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("dataset is empty: no row survived parsing ({skipped} rows skipped)")]
    EmptyDataset { skipped: usize },
    #[error("header has {found} fields, expected {expected}")]
    MalformedHeader { expected: usize, found: usize },
    #[error("record {id} has {found} features, expected {expected}")]
    ArityMismatch { id: u64, expected: usize, found: usize },
    #[error("train ratio must lie strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),
    #[error("cannot split {len} records with train ratio {train_ratio}: one side would be empty")]
    InsufficientData { len: usize, train_ratio: f64 },
    #[error("feature column {index} is out of range (dataset has {arity} features)")]
    FeatureOutOfRange { index: usize, arity: usize },
    #[error("unknown feature column {0:?}")]
    UnknownFeature(String),
}

/// How raw rows are tokenized and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Number of feature columns between the id and the label.
    pub n_features: usize,
    /// Whether the first row names the columns.
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            n_features: 10,
            has_header: true,
            delimiter: b',',
        }
    }
}

impl LoaderOptions {
    fn expected_fields(&self) -> usize {
        self.n_features + 2
    }
}

/// An ordered, non-empty collection of records sharing one arity and one
/// label alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<F: Float> {
    records: Vec<Record<Label, F>>,
    alphabet: LabelAlphabet,
    feature_names: Vec<String>,
}

impl<F: Float> Dataset<F> {
    /// Parses `rows` into a dataset.
    ///
    /// Malformed rows are passed to `sink` and skipped.
    ///
    /// # Errors
    ///
    /// Returns `DataError::MalformedHeader` if the header does not have
    /// `n_features + 2` fields and `DataError::EmptyDataset` if no data row
    /// survives.
    pub fn load<I, S, K>(rows: I, options: LoaderOptions, mut sink: K) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        K: DiagnosticsSink,
    {
        let expected = options.expected_fields();
        let mut rows = rows.into_iter();

        let mut feature_names = default_feature_names(options.n_features);
        if options.has_header {
            if let Some(header) = rows.next() {
                let fields = tokenize(header.as_ref(), options.delimiter)
                    .map_err(|_| DataError::MalformedHeader { expected, found: 0 })?;
                if fields.len() != expected {
                    return Err(DataError::MalformedHeader {
                        expected,
                        found: fields.len(),
                    });
                }
                feature_names = fields
                    .iter()
                    .skip(1)
                    .take(options.n_features)
                    .map(normalize_column_name)
                    .collect();
            }
        }

        let mut parsed = Vec::new();
        let mut skipped = 0;
        for (row, raw) in rows.enumerate() {
            let raw = raw.as_ref();
            if raw.trim().is_empty() {
                continue;
            }
            match parse_row::<F>(raw, &options) {
                Ok(values) => parsed.push(values),
                Err(kind) => {
                    skipped += 1;
                    sink.row_skipped(&ParseError {
                        row,
                        raw: raw.to_string(),
                        kind,
                    });
                }
            }
        }

        if parsed.is_empty() {
            return Err(DataError::EmptyDataset { skipped });
        }

        let dataset = Self::assemble(parsed, feature_names)?;
        debug!(
            records = dataset.len(),
            skipped,
            classes = dataset.alphabet.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Builds a dataset from `(id, features, symbol)` triples, with generic
    /// column names.
    ///
    /// # Errors
    ///
    /// Returns `DataError::EmptyDataset` for no input and
    /// `DataError::ArityMismatch` when feature vectors differ in length.
    pub fn from_labelled<I, S>(rows: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = (u64, Array1<F>, S)>,
        S: AsRef<str>,
    {
        let rows: Vec<(u64, Array1<F>, String)> = rows
            .into_iter()
            .map(|(id, features, symbol)| (id, features, symbol.as_ref().to_string()))
            .collect();
        let arity = rows.first().map_or(0, |(_, features, _)| features.len());
        Self::assemble(rows, default_feature_names(arity))
    }

    fn assemble(
        rows: Vec<(u64, Array1<F>, String)>,
        feature_names: Vec<String>,
    ) -> Result<Self, DataError> {
        let Some((_, first, _)) = rows.first() else {
            return Err(DataError::EmptyDataset { skipped: 0 });
        };
        let arity = first.len();
        if let Some((id, features, _)) = rows.iter().find(|(_, f, _)| f.len() != arity) {
            return Err(DataError::ArityMismatch {
                id: *id,
                expected: arity,
                found: features.len(),
            });
        }

        let alphabet = LabelAlphabet::from_symbols(rows.iter().map(|(_, _, s)| s));
        let mut records = Vec::with_capacity(rows.len());
        for (id, features, symbol) in rows {
            // Every symbol went into the alphabet just above.
            if let Some(label) = alphabet.label_of(&symbol) {
                records.push(Record::new(id, features, label));
            }
        }

        Ok(Dataset {
            records,
            alphabet,
            feature_names,
        })
    }

    /// A dataset made of the records at `positions`, in that order.
    pub(crate) fn subset(&self, positions: &[usize]) -> Self {
        Dataset {
            records: positions.iter().map(|&i| self.records[i].clone()).collect(),
            alphabet: self.alphabet.clone(),
            feature_names: self.feature_names.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record<Label, F>] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record<Label, F>> {
        self.records.iter()
    }

    pub fn alphabet(&self) -> &LabelAlphabet {
        &self.alphabet
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// True labels, in record order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.records.iter().map(|r| *r.label())
    }

    /// Symbol of a record's label.
    pub fn symbol_of(&self, record: &Record<Label, F>) -> &str {
        self.alphabet.symbol(*record.label()).unwrap_or("?")
    }

    /// Resolves a column name (as normalized from the header) to its index.
    pub fn feature_index(&self, name: &str) -> Result<usize, DataError> {
        let wanted = normalize_column_name(name);
        self.feature_names
            .iter()
            .position(|n| *n == wanted)
            .ok_or(DataError::UnknownFeature(name.to_string()))
    }

    /// The `(feature_i, feature_j)` coordinates of every record, for plotting.
    pub fn projection(&self, i: usize, j: usize) -> Result<Vec<(F, F)>, DataError> {
        let arity = self.n_features();
        for index in [i, j] {
            if index >= arity {
                return Err(DataError::FeatureOutOfRange { index, arity });
            }
        }
        Ok(self
            .records
            .iter()
            .map(|r| (r.features()[i], r.features()[j]))
            .collect())
    }
}

impl<'a, F: Float> IntoIterator for &'a Dataset<F> {
    type Item = &'a Record<Label, F>;
    type IntoIter = std::slice::Iter<'a, Record<Label, F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn default_feature_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("feature_{i}")).collect()
}

/// Header names in the telescope data look like `fWidth:`.
fn normalize_column_name(name: &str) -> String {
    name.trim().trim_end_matches(':').trim().to_string()
}

fn tokenize(row: &str, delimiter: u8) -> Result<StringRecord, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(row.as_bytes());
    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

fn parse_row<F: Float>(
    raw: &str,
    options: &LoaderOptions,
) -> Result<(u64, Array1<F>, String), ParseErrorKind> {
    let fields =
        tokenize(raw, options.delimiter).map_err(|e| ParseErrorKind::Tokenize(e.to_string()))?;
    let expected = options.expected_fields();
    if fields.len() != expected {
        return Err(ParseErrorKind::FieldCount {
            expected,
            found: fields.len(),
        });
    }

    let id_field = &fields[0];
    let id = id_field
        .parse::<u64>()
        .map_err(|_| ParseErrorKind::InvalidId {
            value: id_field.to_string(),
        })?;

    let mut features = Array1::zeros(options.n_features);
    for column in 1..=options.n_features {
        let field = &fields[column];
        let invalid = || ParseErrorKind::InvalidNumber {
            column,
            value: field.to_string(),
        };
        let value = field.parse::<f64>().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(ParseErrorKind::NonFinite {
                column,
                value: field.to_string(),
            });
        }
        features[column - 1] = F::from_f64(value).ok_or_else(invalid)?;
    }

    let label = &fields[expected - 1];
    if label.is_empty() {
        return Err(ParseErrorKind::EmptyLabel);
    }

    Ok((id, features, label.to_string()))
}
