use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Cell texts of one table row, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RawRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// How a cell's text is coerced once the row has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    /// Day-first date (`05/03/2024`, `05.03.2024`)
    Date,
    /// Trimmed text kept as-is
    Text,
    /// Comma-grouped decimal (`12,345.50`)
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Index of the source cell in the raw row
    pub cell: usize,
    pub kind: FieldKind,
}

/// Layout descriptor: how many cells a data row has and which cell feeds which field.
///
/// Field order here is the output order of every record produced with this layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLayout {
    pub expected_cells: usize,
    pub fields: Vec<FieldSpec>,
}

impl ColumnLayout {
    pub fn schema(&self) -> Schema {
        Schema::new(self.fields.iter().map(|f| f.name).collect())
    }
}

/// Ordered field names of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    fields: Vec<&'static str>,
}

impl Schema {
    pub fn new(fields: Vec<&'static str>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(", "))
    }
}

/// One field of an accepted row, still in text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub text: String,
}

/// A row that matched its layout; coercion happens in `scrape::normalize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub fields: Vec<ParsedField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Date(NaiveDate),
    Number(BigDecimal),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// CSV rendering: ISO dates, plain decimals, empty for Null.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Null => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl NormalizedRecord {
    pub fn new(fields: Vec<(&'static str, FieldValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Matches `schema` exactly: same names, same order.
    pub fn conforms_to(&self, schema: &Schema) -> bool {
        self.fields.len() == schema.len()
            && self.field_names().zip(schema.fields()).all(|(a, b)| a == *b)
    }
}
