//! Features, attribute rows and the ingested shapefile model.

use std::fmt;
use std::sync::Arc;

use geo::Geometry;
use thiserror::Error;

/// Field names shared by every row of one attribute table.
pub type FieldSchema = Arc<[String]>;

/// A scalar attribute value read from a DBF table.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Character data with trailing padding removed.
    Text(String),
    /// Numeric or floating-point data.
    Number(f64),
    /// Logical data.
    Boolean(bool),
    /// A calendar date formatted as `YYYY-MM-DD`.
    Date(String),
    /// A blank or explicitly unknown value.
    Null,
}

impl AttributeValue {
    /// Whether the value is [`AttributeValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::Date(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Null => Ok(()),
        }
    }
}

/// Errors returned by [`AttributeRow::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeRowError {
    /// The number of values differs from the number of schema fields.
    #[error("attribute row has {values} values for {fields} fields")]
    LengthMismatch {
        /// Number of fields in the schema.
        fields: usize,
        /// Number of values supplied.
        values: usize,
    },
}

/// Attribute values of one feature, keyed by a shared field schema.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use mapmark_core::{AttributeRow, AttributeValue};
///
/// # fn main() -> Result<(), mapmark_core::AttributeRowError> {
/// let schema: Arc<[String]> = Arc::from(vec!["NAME".to_owned()]);
/// let row = AttributeRow::new(schema, vec![AttributeValue::Text("Main St".into())])?;
/// assert_eq!(row.get("NAME"), Some(&AttributeValue::Text("Main St".into())));
/// assert_eq!(row.get("MISSING"), None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    schema: FieldSchema,
    values: Vec<AttributeValue>,
}

impl AttributeRow {
    /// Validate and construct a row for `schema`.
    ///
    /// # Errors
    /// Returns [`AttributeRowError::LengthMismatch`] when `values` does not
    /// supply exactly one value per field.
    pub fn new(schema: FieldSchema, values: Vec<AttributeValue>) -> Result<Self, AttributeRowError> {
        if schema.len() != values.len() {
            return Err(AttributeRowError::LengthMismatch {
                fields: schema.len(),
                values: values.len(),
            });
        }
        Ok(Self { schema, values })
    }

    /// A row with no fields, used when a shapefile has no attribute table.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schema: Arc::from(Vec::new()),
            values: Vec::new(),
        }
    }

    /// Look up a value by field name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.schema
            .iter()
            .position(|field| field == name)
            .and_then(|index| self.values.get(index))
    }

    /// Field names in declaration order.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.schema
    }

    /// Iterate over `(field, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.schema
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of fields in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One geometry paired with its attribute row.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Geometry in the destination projection.
    pub geometry: Geometry<f64>,
    /// Attributes joined by record position.
    pub attributes: AttributeRow,
}

/// Why the default source projection was assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultProjectionReason {
    /// No projection definition was available.
    MissingDefinition,
    /// The definition could not be interpreted.
    Unparsable(String),
    /// The projection file exists but could not be read.
    Unreadable(String),
}

/// Non-fatal conditions reported while ingesting a shapefile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestWarning {
    /// The source projection fell back to a default CRS.
    DefaultProjectionAssumed {
        /// Identifier of the CRS that was assumed.
        default_crs: String,
        /// Why the default was used.
        reason: DefaultProjectionReason,
    },
    /// No attribute table was found; every feature has an empty row.
    MissingAttributes,
    /// A record carried a null shape and was left out.
    NullGeometrySkipped {
        /// Zero-based record position in the shape stream.
        record: usize,
    },
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultProjectionAssumed {
                default_crs,
                reason: DefaultProjectionReason::MissingDefinition,
            } => write!(f, "projection file not found, defaulting to {default_crs}"),
            Self::DefaultProjectionAssumed {
                default_crs,
                reason: DefaultProjectionReason::Unparsable(message),
            } => write!(
                f,
                "projection definition not understood ({message}), defaulting to {default_crs}"
            ),
            Self::DefaultProjectionAssumed {
                default_crs,
                reason: DefaultProjectionReason::Unreadable(message),
            } => write!(
                f,
                "projection file could not be read ({message}), defaulting to {default_crs}"
            ),
            Self::MissingAttributes => f.write_str("attribute table not found, metadata missing"),
            Self::NullGeometrySkipped { record } => {
                write!(f, "record {record} has a null shape and was skipped")
            }
        }
    }
}

/// Features ingested from one shapefile.
///
/// Geometry and attributes are fixed once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Shapefile {
    name: String,
    features: Vec<Feature>,
    field_names: Vec<String>,
    warnings: Vec<IngestWarning>,
}

impl Shapefile {
    /// Assemble an ingested shapefile.
    #[must_use]
    pub const fn new(
        name: String,
        features: Vec<Feature>,
        field_names: Vec<String>,
        warnings: Vec<IngestWarning>,
    ) -> Self {
        Self {
            name,
            features,
            field_names,
            warnings,
        }
    }

    /// Basename of the shapefile, without extension.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Features in record order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Attribute field names in declaration order.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Warnings reported during ingestion.
    #[must_use]
    pub fn warnings(&self) -> &[IngestWarning] {
        &self.warnings
    }

    /// Consume the shapefile, yielding its features.
    #[must_use]
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the shapefile has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn schema(names: &[&str]) -> FieldSchema {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[rstest]
    fn rejects_rows_that_do_not_match_the_schema() {
        let err = AttributeRow::new(schema(&["A", "B"]), vec![AttributeValue::Null])
            .expect_err("length mismatch");
        assert_eq!(
            err,
            AttributeRowError::LengthMismatch {
                fields: 2,
                values: 1
            }
        );
    }

    #[rstest]
    fn iterates_in_declaration_order() {
        let row = AttributeRow::new(
            schema(&["Z", "A"]),
            vec![AttributeValue::Number(1.0), AttributeValue::Boolean(true)],
        )
        .expect("valid row");
        let names: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Z", "A"]);
        assert_eq!(row.len(), 2);
    }

    #[rstest]
    fn empty_row_has_no_fields() {
        let row = AttributeRow::empty();
        assert!(row.is_empty());
        assert!(row.field_names().is_empty());
        assert_eq!(row.get("NAME"), None);
    }

    #[rstest]
    #[case(AttributeValue::Text("Oak".into()), "Oak")]
    #[case(AttributeValue::Number(2.5), "2.5")]
    #[case(AttributeValue::Boolean(false), "false")]
    #[case(AttributeValue::Null, "")]
    fn values_display_as_plain_text(#[case] value: AttributeValue, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[rstest]
    fn default_projection_warning_names_the_crs() {
        let warning = IngestWarning::DefaultProjectionAssumed {
            default_crs: "EPSG:3857".to_owned(),
            reason: DefaultProjectionReason::MissingDefinition,
        };
        assert!(warning.to_string().contains("EPSG:3857"));
    }
}
