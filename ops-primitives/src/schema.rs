//! Explicit schema descriptions and the standalone validator.
//!
//! Model output and tool parameters are plain JSON. Instead of reflecting on
//! Rust types, each shape is described by an [`ObjectSchema`] that travels with
//! the generation request (rendered through [`ObjectSchema::to_json_schema`])
//! and is enforced afterwards by [`conform`].

use serde_json::{Map, Number, Value, json};

use crate::error::{Error, Result};

/// Type of a single schema field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    /// UTF-8 string.
    String,
    /// Whole number. Integral floats such as `7.0` are accepted and normalised.
    Integer,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Homogeneous array of the inner type.
    Array(Box<FieldType>),
    /// Nested object with its own schema.
    Object(ObjectSchema),
    /// Free-form object mapping strings to arbitrary values.
    Map,
    /// Any JSON value, including `null`.
    Any,
}

impl FieldType {
    /// Shorthand for an array of `item`.
    #[must_use]
    pub fn array_of(item: FieldType) -> Self {
        Self::Array(Box::new(item))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) | Self::Map => "object",
            Self::Any => "any",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            Self::Object(schema) => schema.to_json_schema(),
            Self::Map => json!({ "type": "object", "additionalProperties": true }),
            Self::Any => json!({}),
            scalar => json!({ "type": scalar.label() }),
        }
    }
}

/// Describes one named field of an object.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    name: String,
    description: Option<String>,
    field_type: FieldType,
    required: bool,
    default: Option<Value>,
    choices: Vec<Value>,
    minimum: Option<i64>,
    maximum: Option<i64>,
}

impl FieldSchema {
    fn new(name: impl Into<String>, field_type: FieldType, required: bool) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type,
            required,
            default: None,
            choices: Vec::new(),
            minimum: None,
            maximum: None,
        }
    }

    /// Declares a field that must be present.
    #[must_use]
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, true)
    }

    /// Declares a field that may be omitted.
    #[must_use]
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, false)
    }

    /// Attaches a natural-language description shown to the model.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the value filled in when an optional field is omitted.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restricts the field to an enumerated set of values.
    #[must_use]
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an inclusive lower bound for integer fields.
    #[must_use]
    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Sets an inclusive upper bound for integer fields.
    #[must_use]
    pub fn with_maximum(mut self, maximum: i64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared type.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Returns `true` if the field must be present.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the enumerated choices (empty when unrestricted).
    #[must_use]
    pub fn choices(&self) -> &[Value] {
        &self.choices
    }

    fn to_json_schema(&self) -> Value {
        let mut property = self.field_type.to_json_schema();
        if let Value::Object(map) = &mut property {
            if let Some(description) = &self.description {
                map.insert("description".into(), Value::from(description.clone()));
            }
            if let Some(default) = &self.default {
                map.insert("default".into(), default.clone());
            }
            if !self.choices.is_empty() {
                map.insert("enum".into(), Value::Array(self.choices.clone()));
            }
            if let Some(minimum) = self.minimum {
                map.insert("minimum".into(), Value::from(minimum));
            }
            if let Some(maximum) = self.maximum {
                map.insert("maximum".into(), Value::from(maximum));
            }
        }
        property
    }
}

/// Ordered description of a JSON object.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSchema {
    title: String,
    description: Option<String>,
    fields: Vec<FieldSchema>,
}

impl ObjectSchema {
    /// Creates an empty schema with the supplied title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Attaches a description of the object as a whole.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the schema title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Renders the schema as a JSON-Schema-shaped value.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.to_json_schema()))
            .collect();
        let required: Vec<Value> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| Value::from(field.name.clone()))
            .collect();

        let mut schema = json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
        });
        if let Value::Object(map) = &mut schema {
            if let Some(description) = &self.description {
                map.insert("description".into(), Value::from(description.clone()));
            }
            if !required.is_empty() {
                map.insert("required".into(), Value::Array(required));
            }
        }
        schema
    }
}

/// Validates `value` against `schema`, filling defaults for omitted fields.
///
/// Unknown fields are kept untouched. An optional field explicitly set to
/// `null` is treated as omitted.
///
/// # Errors
///
/// Returns [`Error::SchemaViolation`] naming the path of the first offending
/// field.
pub fn conform(schema: &ObjectSchema, value: Value) -> Result<Value> {
    conform_object(schema, value, "")
}

fn conform_object(schema: &ObjectSchema, value: Value, path: &str) -> Result<Value> {
    let Value::Object(mut map) = value else {
        return Err(Error::violation(
            display_path(path),
            format!("expected object `{}`, found {}", schema.title, kind(&value)),
        ));
    };

    for field in &schema.fields {
        let field_path = join(path, &field.name);
        match map.remove(&field.name) {
            Some(Value::Null) | None if !field.required => {
                if let Some(default) = &field.default {
                    map.insert(field.name.clone(), default.clone());
                }
            }
            None => {
                return Err(Error::violation(field_path, "required field is missing"));
            }
            Some(raw) => {
                let checked = conform_field(field, raw, &field_path)?;
                map.insert(field.name.clone(), checked);
            }
        }
    }

    Ok(Value::Object(map))
}

fn conform_field(field: &FieldSchema, raw: Value, path: &str) -> Result<Value> {
    let value = conform_value(&field.field_type, raw, path)?;

    if !field.choices.is_empty() && !field.choices.contains(&value) {
        return Err(Error::violation(
            path,
            format!("value {value} is not one of {}", Value::Array(field.choices.clone())),
        ));
    }

    if let Some(number) = value.as_i64() {
        if field.minimum.is_some_and(|min| number < min) {
            return Err(Error::violation(
                path,
                format!("{number} is below the minimum of {}", field.minimum.unwrap_or_default()),
            ));
        }
        if field.maximum.is_some_and(|max| number > max) {
            return Err(Error::violation(
                path,
                format!("{number} is above the maximum of {}", field.maximum.unwrap_or_default()),
            ));
        }
    } else if value.is_u64() && field.maximum.is_some() {
        return Err(Error::violation(path, "integer is out of range"));
    }

    Ok(value)
}

fn conform_value(field_type: &FieldType, value: Value, path: &str) -> Result<Value> {
    match (field_type, value) {
        (FieldType::Any, value) => Ok(value),
        (FieldType::String, value @ Value::String(_))
        | (FieldType::Boolean, value @ Value::Bool(_))
        | (FieldType::Number, value @ Value::Number(_))
        | (FieldType::Map, value @ Value::Object(_)) => Ok(value),
        (FieldType::Integer, Value::Number(number)) => normalise_integer(&number)
            .map(Value::Number)
            .ok_or_else(|| Error::violation(path, format!("expected integer, found {number}"))),
        (FieldType::Array(item), Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, element)| conform_value(item, element, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (FieldType::Object(schema), value @ Value::Object(_)) => {
            conform_object(schema, value, path)
        }
        (expected, other) => Err(Error::violation(
            display_path(path),
            format!("expected {}, found {}", expected.label(), kind(&other)),
        )),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn normalise_integer(number: &Number) -> Option<Number> {
    if number.is_i64() || number.is_u64() {
        return Some(number.clone());
    }
    let float = number.as_f64()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15 {
        Some(Number::from(float as i64))
    } else {
        None
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}.{name}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "$" } else { path }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
