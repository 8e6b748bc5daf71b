//! Field introspection for rich components.
//!
//! A component type lists its fields once, in declaration order. Internal
//! fields hold the component's own UI state (label, style, options, ...)
//! and are read back off the raw Discord component. Custom-id fields are the
//! ones encoded into, and parsed back out of, the custom id.

use crate::error::ComponentError;
use crate::parser::AnyParser;
use crate::value::{FromValue, IntoValue, TypeShape, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Component state that is not stored in the custom id.
    Internal,
    /// Encoded into the custom id, in declaration order.
    CustomId,
}

/// One declared field of a component type.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub shape: TypeShape,
    pub kind: FieldKind,
    pub default: Option<Value>,
    /// Parser to use instead of the one the registry would pick.
    pub parser: Option<AnyParser>,
}

impl Field {
    pub fn custom_id(name: &'static str, shape: TypeShape) -> Self {
        Field {
            name,
            shape,
            kind: FieldKind::CustomId,
            default: None,
            parser: None,
        }
    }

    pub fn internal(name: &'static str, shape: TypeShape) -> Self {
        Field {
            kind: FieldKind::Internal,
            ..Field::custom_id(name, shape)
        }
    }

    pub fn with_default(mut self, value: impl IntoValue) -> Self {
        self.default = Some(value.into_value());
        self
    }

    pub fn with_parser(mut self, parser: AnyParser) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn is_custom_id(&self) -> bool {
        self.kind == FieldKind::CustomId
    }
}

/// The fields of `fields` with the given kind, or all of them.
pub fn get_fields(fields: &[Field], kind: Option<FieldKind>) -> Vec<&Field> {
    fields
        .iter()
        .filter(|f| kind.map_or(true, |k| f.kind == k))
        .collect()
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// Field values by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    entries: Vec<(String, Value)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: impl IntoValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Set `name`, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl IntoValue) {
        let value = value.into_value();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Remove `name` and convert it.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, ComponentError> {
        let value = self
            .remove(name)
            .ok_or_else(|| ComponentError::MissingField(name.to_string()))?;

        T::from_value(value).map_err(|actual| ComponentError::FieldType {
            field: name.to_string(),
            expected: T::EXPECTED,
            actual: actual.type_key().to_string(),
        })
    }

    /// Copy every entry of `other` over this one.
    pub fn extend(&mut self, other: FieldValues) {
        for (name, value) in other.entries {
            self.insert(&name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<Field> {
        vec![
            Field::internal("label", TypeShape::optional(TypeShape::str())),
            Field::custom_id("count", TypeShape::int()).with_default(0i64),
            Field::internal("disabled", TypeShape::bool()),
            Field::custom_id("name", TypeShape::str()),
        ]
    }

    #[test]
    fn get_fields_keeps_declaration_order() {
        let fields = fields();
        let custom: Vec<_> = get_fields(&fields, Some(FieldKind::CustomId))
            .iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(custom, ["count", "name"]);

        let internal: Vec<_> = get_fields(&fields, Some(FieldKind::Internal))
            .iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(internal, ["label", "disabled"]);
        assert_eq!(get_fields(&fields, None).len(), 4);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut values = FieldValues::new().with("a", 1i64).with("b", "x");
        values.insert("a", 2i64);
        let names: Vec<_> = values.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(values.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn take_reports_missing_and_mistyped() {
        let mut values = FieldValues::new().with("count", "three");
        assert_eq!(
            values.take::<i64>("missing"),
            Err(ComponentError::MissingField("missing".into()))
        );
        assert_eq!(
            values.take::<i64>("count"),
            Err(ComponentError::FieldType {
                field: "count".into(),
                expected: "int",
                actual: "str".into(),
            })
        );
        assert!(values.is_empty());
    }
}
