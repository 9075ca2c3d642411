use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Name of the field holding the logical sheet row number.
pub const ROW_FIELD: &str = "row";

/// Column name to cell value.
pub type RowFields = Map<String, Value>;

/// One document of the projects collection.
///
/// `fields` is open-ended: whatever columns the sheet has pushed so far, plus
/// the `row` number.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRow {
    pub id: String,
    pub fields: RowFields,
}

impl ProjectRow {
    pub fn new(id: impl Into<String>, fields: RowFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// The logical row number, if the document has an integral `row` field.
    ///
    /// A double such as `6.0` counts: MongoDB compares numbers by value, so
    /// `{ row: { $in: [6] } }` returns it.
    pub fn row(&self) -> Option<i64> {
        let value = self.fields.get(ROW_FIELD)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }
}

/// Serializes as a flat `{ "id": ..., ...fields }` object.
impl Serialize for ProjectRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = self.fields.keys().filter(|k| k.as_str() != "id").count();
        let mut map = serializer.serialize_map(Some(extra + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.fields {
            // The document id wins over a sheet column that happens to be named "id".
            if key != "id" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}
