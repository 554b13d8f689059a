//! Untyped import rows and their total normalization into student fields
//!
//! A spreadsheet row (or a JSON request body) arrives as a loose mapping of
//! column name to cell value. Lookups of absent columns yield
//! [`CellValue::Empty`] instead of relying on implicit absence, and
//! normalization never fails: invalid input becomes empty fields that the
//! caller reports through [`StudentFields::missing_fields`].

use crate::models::{StudentFields, IMAGE_COLUMN};
use serde_json::Value;
use std::collections::HashMap;

/// A single untyped cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Text content, if this cell holds a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&Value> for CellValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(text) => CellValue::Text(text.clone()),
            Value::Number(number) => number.as_f64().map_or(CellValue::Empty, CellValue::Number),
            Value::Bool(flag) => CellValue::Bool(*flag),
            Value::Null | Value::Array(_) | Value::Object(_) => CellValue::Empty,
        }
    }
}

/// Image column of a row after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageField {
    /// No usable payload; the default asset applies
    Default,
    /// Raw inline payload to hand to the image materializer
    Payload(String),
}

/// One untyped row keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRow {
    cells: HashMap<String, CellValue>,
}

static EMPTY: CellValue = CellValue::Empty;

impl ImportRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell; column names are trimmed
    pub fn insert(&mut self, column: impl AsRef<str>, value: CellValue) {
        self.cells.insert(column.as_ref().trim().to_string(), value);
    }

    /// Builder form of [`ImportRow::insert`]
    pub fn with(mut self, column: &str, value: CellValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Cell for `column`; absent columns read as `CellValue::Empty`
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY)
    }

    /// True when no cell carries any value
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|cell| match cell {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        })
    }

    /// Build a row from a JSON object; any other JSON value yields `None`
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut row = ImportRow::new();
        for (column, cell) in object {
            row.insert(column, CellValue::from(cell));
        }
        Some(row)
    }

    /// Trimmed text of `column`; absent or non-text cells become ""
    pub fn text(&self, column: &str) -> String {
        self.get(column)
            .as_text()
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }

    /// The six textual student fields, defaulting to empty strings
    pub fn student_fields(&self) -> StudentFields {
        StudentFields {
            name: self.text("name"),
            grade: self.text("grade"),
            dob: self.text("dob"),
            blood_group: self.text("bloodGroup"),
            guardian_contact: self.text("guardianContact"),
            address: self.text("address"),
        }
    }

    /// The image column: a payload when non-blank text, otherwise the default
    pub fn image(&self) -> ImageField {
        match self.get(IMAGE_COLUMN).as_text().map(str::trim) {
            Some(payload) if !payload.is_empty() => ImageField::Payload(payload.to_string()),
            _ => ImageField::Default,
        }
    }
}
