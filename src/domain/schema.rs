use crate::domain::account::{ACCOUNT_NUM, BALANCE};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// A field value as seen by the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
}

/// The record shape a schema is checked against: field name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Double,
    Decimal,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Double => "double",
            FieldKind::Decimal => "decimal",
        }
    }

    fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::String, FieldValue::Text(_))
                | (FieldKind::Double | FieldKind::Decimal, FieldValue::Number(_))
        )
    }
}

/// Constraints on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "bsonType")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Property {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            minimum: None,
            maximum: None,
            description: None,
        }
    }
}

/// Declarative collection schema in the `$jsonSchema` style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::accounts()
    }
}

impl Schema {
    /// The schema of the `accounts` collection: both fields required, balance never negative.
    pub fn accounts() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(ACCOUNT_NUM.to_string(), Property::new(FieldKind::String));
        properties.insert(
            BALANCE.to_string(),
            Property {
                kind: FieldKind::Double,
                minimum: Some(Decimal::ZERO),
                maximum: None,
                description: Some("'balance' cannot be less than 0".to_string()),
            },
        );
        Self {
            title: Some("Account Object Validation".to_string()),
            required: vec![ACCOUNT_NUM.to_string(), BALANCE.to_string()],
            properties,
        }
    }

    /// Parses a declaration, either bare or wrapped in `{"$jsonSchema": ...}`
    /// (optionally inside `{"validator": ...}`).
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(raw)?;
        for wrapper in ["validator", "$jsonSchema"] {
            if let Some(inner) = value.get_mut(wrapper).map(serde_json::Value::take) {
                value = inner;
            }
        }
        let schema: Schema = serde_json::from_value(value)?;
        schema.check()?;
        Ok(schema)
    }

    /// Rejects declarations that cannot be satisfied consistently.
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.required {
            if !seen.insert(field.as_str()) {
                return Err(LedgerError::InvalidRequest(format!(
                    "schema lists required field `{field}` twice"
                )));
            }
        }
        for (field, property) in &self.properties {
            if let (Some(min), Some(max)) = (property.minimum, property.maximum)
                && min > max
            {
                return Err(LedgerError::InvalidRequest(format!(
                    "schema field `{field}` has minimum {min} above maximum {max}"
                )));
            }
            if property.kind == FieldKind::String
                && (property.minimum.is_some() || property.maximum.is_some())
            {
                return Err(LedgerError::InvalidRequest(format!(
                    "schema field `{field}` is a string but declares a numeric range"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{field}` must be of type {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
    #[error("field `{field}` value {value} is out of range ({constraint})")]
    OutOfRange {
        field: String,
        value: Decimal,
        constraint: String,
    },
}

/// Checks candidate records against a [`Schema`] before they are admitted to storage.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
}

impl SchemaValidator {
    pub fn new(schema: Schema) -> Result<Self> {
        schema.check()?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn validate(&self, doc: &Document) -> std::result::Result<(), SchemaViolation> {
        for field in &self.schema.required {
            match doc.get(field) {
                None => return Err(SchemaViolation::MissingField(field.clone())),
                Some(FieldValue::Text(text)) if text.is_empty() => {
                    return Err(SchemaViolation::MissingField(field.clone()));
                }
                Some(_) => {}
            }
        }

        for (field, property) in &self.schema.properties {
            let Some(value) = doc.get(field) else {
                continue;
            };
            if !property.kind.accepts(value) {
                return Err(SchemaViolation::TypeMismatch {
                    field: field.clone(),
                    expected: property.kind.name(),
                });
            }
            if let FieldValue::Number(number) = value {
                check_range(field, *number, property)?;
            }
        }
        Ok(())
    }
}

fn check_range(
    field: &str,
    value: Decimal,
    property: &Property,
) -> std::result::Result<(), SchemaViolation> {
    let out_of_range = |bound: String| SchemaViolation::OutOfRange {
        field: field.to_string(),
        value,
        constraint: property.description.clone().unwrap_or(bound),
    };
    if let Some(min) = property.minimum
        && value < min
    {
        return Err(out_of_range(format!("minimum {min}")));
    }
    if let Some(max) = property.maximum
        && value > max
    {
        return Err(out_of_range(format!("maximum {max}")));
    }
    Ok(())
}
