//! Parser for enums and flags.
//!
//! Enums are stored by value when every member's value has the same type,
//! since values are usually shorter than names. Enums with mixed value types
//! fall back to storing the member name. Flags are always stored by value.

use std::sync::Arc;

use async_trait::async_trait;

use super::builtins::StringParser;
use super::registry::{ParserClass, ParserRegistry};
use super::{AnyParser, Source, SourcedParser};
use crate::error::ParserError;
use crate::value::{EnumDef, EnumValue, TypeKey, TypeShape, Value};

#[derive(Debug, Clone)]
pub struct EnumParser {
    def: Arc<EnumDef>,
    store_by_value: bool,
    value_parser: AnyParser,
}

impl EnumParser {
    pub const CLASS: ParserClass = ParserClass::new("EnumParser", EnumParser::build);

    /// Build a parser for `def`, choosing the storage mode from its values.
    pub fn new(def: Arc<EnumDef>, registry: &ParserRegistry) -> Result<Self, ParserError> {
        let store_by_value = def.value_type().is_some();
        Self::with_storage(def, store_by_value, registry)
    }

    /// Build a parser with an explicit storage mode.
    pub fn with_storage(
        def: Arc<EnumDef>,
        store_by_value: bool,
        registry: &ParserRegistry,
    ) -> Result<Self, ParserError> {
        if def.flag && !store_by_value {
            return Err(ParserError::InvalidConfig(format!(
                "flag type {} cannot be stored by name",
                def.key
            )));
        }

        let value_parser = if store_by_value {
            let value_type = def.value_type().ok_or_else(|| {
                ParserError::InvalidConfig(format!(
                    "enum {} has members of more than one value type",
                    def.key
                ))
            })?;
            registry.get_parser(&TypeShape::Plain(value_type))?
        } else {
            AnyParser::plain(StringParser)
        };

        Ok(EnumParser {
            def,
            store_by_value,
            value_parser,
        })
    }

    pub fn store_by_value(&self) -> bool {
        self.store_by_value
    }

    fn build(shape: &TypeShape, registry: &ParserRegistry) -> Result<AnyParser, ParserError> {
        match shape {
            TypeShape::Enum(def) => Ok(AnyParser::sourced(EnumParser::new(def.clone(), registry)?)),
            other => Err(ParserError::InvalidConfig(format!(
                "enum parsers need an enum definition, got {:?}",
                other.origin()
            ))),
        }
    }

    fn from_raw(&self, argument: &str, raw: Value) -> Result<Value, ParserError> {
        if !self.store_by_value {
            let Value::Str(name) = raw else {
                return Err(ParserError::invalid_argument(argument, "expected a member name"));
            };
            return self.def.value_of(&name).ok_or_else(|| {
                ParserError::invalid_argument(argument, format!("no member of {}", self.def.key))
            });
        }

        if self.def.flag {
            let Value::Int(bits) = raw else {
                return Err(ParserError::invalid_argument(argument, "expected flag bits"));
            };
            if bits & !self.def.all_bits() != 0 {
                return Err(ParserError::invalid_argument(
                    argument,
                    format!("undefined bits for {}", self.def.key),
                ));
            }
            let name = self.def.member_by_value(&raw).map(|m| m.name.clone());
            return Ok(Value::Enum(EnumValue {
                key: self.def.key,
                name,
                value: Box::new(raw),
            }));
        }

        let member = self.def.member_by_value(&raw).ok_or_else(|| {
            ParserError::invalid_argument(argument, format!("no member of {}", self.def.key))
        })?;
        Ok(Value::Enum(EnumValue {
            key: self.def.key,
            name: Some(member.name.clone()),
            value: Box::new(raw),
        }))
    }
}

#[async_trait]
impl SourcedParser for EnumParser {
    async fn loads(
        &self,
        argument: &str,
        source: Option<&dyn Source>,
    ) -> Result<Value, ParserError> {
        let raw = self.value_parser.try_loads(argument, source).await?;
        self.from_raw(argument, raw)
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        let Value::Enum(member) = value else {
            return Err(ParserError::invalid_value(value, "expected an enum member"));
        };
        if member.key != self.def.key {
            return Err(ParserError::invalid_value(
                value,
                format!("expected a member of {}", self.def.key),
            ));
        }

        if self.store_by_value {
            return self.value_parser.dumps(&member.value);
        }
        match &member.name {
            Some(name) => Ok(name.clone()),
            None => Err(ParserError::invalid_value(value, "member has no name")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![self.def.key]
    }

    fn is_sourced(&self) -> bool {
        self.value_parser.is_sourced()
    }
}
