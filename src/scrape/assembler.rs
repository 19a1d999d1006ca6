use crate::error::SchemaViolation;
use crate::models::{NormalizedRecord, Schema};

/// Records of one indicator run, in the order the table listed them.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<NormalizedRecord>,
}

impl Dataset {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row plus one line per record; Null fields are left empty.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.schema.fields())?;
        for record in &self.records {
            writer.write_record(record.values().map(|v| v.to_string()))?;
        }
        writer.into_inner().map_err(|e| e.into_error().into())
    }
}

/// Checks every record against `schema` and freezes them into a dataset.
///
/// A mismatch means the layout and the schema disagree, so the whole run is
/// abandoned rather than writing a partial table.
pub fn assemble(records: Vec<NormalizedRecord>, schema: Schema) -> Result<Dataset, SchemaViolation> {
    if let Some((index, record)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| !r.conforms_to(&schema))
    {
        return Err(SchemaViolation {
            index,
            expected: schema.to_string(),
            found: record.field_names().collect::<Vec<_>>().join(", "),
        });
    }

    Ok(Dataset { schema, records })
}
