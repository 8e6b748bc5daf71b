//! Parsers for primitives and the generic containers built from them.

use async_trait::async_trait;
use tracing::trace;

use super::registry::{ParserClass, ParserRegistry};
use super::{AnyParser, Parser, Source, SourcedParser};
use crate::error::ParserError;
use crate::value::{TypeKey, TypeShape, Value};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const DEFAULT_TRUES: [&str; 5] = ["true", "t", "yes", "y", "1"];
const DEFAULT_FALSES: [&str; 5] = ["false", "f", "no", "n", "0"];

// ---------------------------------------------------------------------------
// None
// ---------------------------------------------------------------------------

/// Parser for the unit value `None`.
///
/// Strict parsers only map the empty string to `None` and back. Lenient
/// parsers load anything as `None` and dump anything as `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoneParser {
    pub strict: bool,
}

impl Default for NoneParser {
    fn default() -> Self {
        NoneParser { strict: true }
    }
}

impl NoneParser {
    pub const CLASS: ParserClass = ParserClass::new("NoneParser", |_, _| {
        Ok(AnyParser::plain(NoneParser::default()))
    });

    pub fn lenient() -> Self {
        NoneParser { strict: false }
    }
}

impl Parser for NoneParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        if self.strict && !argument.is_empty() {
            return Err(ParserError::invalid_argument(
                argument,
                "strict none parsers only accept an empty string",
            ));
        }
        Ok(Value::None)
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        if self.strict && !value.is_none() {
            return Err(ParserError::invalid_value(
                value,
                "strict none parsers only dump None",
            ));
        }
        Ok(String::new())
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::NONE]
    }
}

// ---------------------------------------------------------------------------
// Int
// ---------------------------------------------------------------------------

/// Integer parser with a configurable base.
///
/// Defaults to base 36 so numbers take as little of the custom id as
/// possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntParser {
    base: u32,
    signed: bool,
}

impl Default for IntParser {
    fn default() -> Self {
        IntParser {
            base: 36,
            signed: true,
        }
    }
}

impl IntParser {
    pub const CLASS: ParserClass = ParserClass::new("IntParser", |_, _| {
        Ok(AnyParser::plain(IntParser::default()))
    });

    pub fn new(base: u32, signed: bool) -> Result<Self, ParserError> {
        if !(2..=36).contains(&base) {
            return Err(ParserError::InvalidConfig(format!(
                "base must be between 2 and 36, got {base}"
            )));
        }
        Ok(IntParser { base, signed })
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn parse(&self, argument: &str) -> Result<i64, ParserError> {
        let result = i64::from_str_radix(argument, self.base)
            .map_err(|e| ParserError::invalid_argument(argument, e.to_string()))?;

        if !self.signed && result < 0 {
            return Err(ParserError::invalid_argument(
                argument,
                "unsigned numbers cannot be < 0",
            ));
        }
        Ok(result)
    }

    pub fn encode(&self, number: i64) -> Result<String, ParserError> {
        if !self.signed && number < 0 {
            return Err(ParserError::invalid_value(
                number,
                "unsigned numbers cannot be < 0",
            ));
        }

        let magnitude = number.unsigned_abs();
        let digits = match self.base {
            2 => format!("{magnitude:b}"),
            8 => format!("{magnitude:o}"),
            10 => magnitude.to_string(),
            16 => format!("{magnitude:x}"),
            base => {
                let base = u64::from(base);
                let mut rest = magnitude;
                let mut out = Vec::new();
                loop {
                    out.push(DIGITS[(rest % base) as usize]);
                    rest /= base;
                    if rest == 0 {
                        break;
                    }
                }
                out.reverse();
                String::from_utf8_lossy(&out).into_owned()
            }
        };

        Ok(if number < 0 {
            format!("-{digits}")
        } else {
            digits
        })
    }
}

impl Parser for IntParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        self.parse(argument).map(Value::Int)
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match value {
            Value::Int(i) => self.encode(*i),
            Value::Bool(b) => self.encode(i64::from(*b)),
            other => Err(ParserError::invalid_value(other, "expected an int")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::INT]
    }
}

// ---------------------------------------------------------------------------
// Float
// ---------------------------------------------------------------------------

/// Float parser. Whole numbers are dumped without their trailing `.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloatParser;

impl FloatParser {
    pub const CLASS: ParserClass =
        ParserClass::new("FloatParser", |_, _| Ok(AnyParser::plain(FloatParser)));
}

impl Parser for FloatParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        argument
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| ParserError::invalid_argument(argument, e.to_string()))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        let number = match value {
            Value::Float(f) => *f,
            Value::Int(i) => return Ok(i.to_string()),
            other => return Err(ParserError::invalid_value(other, "expected a float")),
        };

        let dumped = format!("{number:?}");
        Ok(match dumped.strip_suffix(".0") {
            Some(whole) => whole.to_string(),
            None => dumped,
        })
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::FLOAT]
    }
}

// ---------------------------------------------------------------------------
// Bool
// ---------------------------------------------------------------------------

/// Bool parser. Dumps to a single `"1"` or `"0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolParser {
    pub trues: Vec<String>,
    pub falses: Vec<String>,
    pub case_sensitive: bool,
}

impl Default for BoolParser {
    fn default() -> Self {
        BoolParser {
            trues: DEFAULT_TRUES.iter().map(|s| s.to_string()).collect(),
            falses: DEFAULT_FALSES.iter().map(|s| s.to_string()).collect(),
            case_sensitive: false,
        }
    }
}

impl BoolParser {
    pub const CLASS: ParserClass = ParserClass::new("BoolParser", |_, _| {
        Ok(AnyParser::plain(BoolParser::default()))
    });

    pub fn new(trues: Vec<String>, falses: Vec<String>, case_sensitive: bool) -> Self {
        BoolParser {
            trues,
            falses,
            case_sensitive,
        }
    }

    fn matches(&self, candidates: &[String], argument: &str) -> bool {
        candidates.iter().any(|c| {
            if self.case_sensitive {
                c == argument
            } else {
                c.eq_ignore_ascii_case(argument)
            }
        })
    }
}

impl Parser for BoolParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        if self.matches(&self.trues, argument) {
            return Ok(Value::Bool(true));
        }
        if self.matches(&self.falses, argument) {
            return Ok(Value::Bool(false));
        }

        Err(ParserError::invalid_argument(
            argument,
            format!(
                "expected any of {:?} for true, or any of {:?} for false",
                self.trues, self.falses
            ),
        ))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match value {
            Value::Bool(true) => Ok("1".to_string()),
            Value::Bool(false) => Ok("0".to_string()),
            other => Err(ParserError::invalid_value(other, "expected a bool")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::BOOL]
    }
}

// ---------------------------------------------------------------------------
// String
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringParser;

impl StringParser {
    pub const CLASS: ParserClass =
        ParserClass::new("StringParser", |_, _| Ok(AnyParser::plain(StringParser)));
}

impl Parser for StringParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        Ok(Value::Str(argument.to_string()))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(ParserError::invalid_value(other, "expected a str")),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::STR]
    }
}

// ---------------------------------------------------------------------------
// Tuple
// ---------------------------------------------------------------------------

/// Fixed-arity tuple parser, one inner parser per position.
///
/// The separator must differ from the component manager's separator.
#[derive(Debug, Clone)]
pub struct TupleParser {
    inner: Vec<AnyParser>,
    sep: String,
}

impl TupleParser {
    pub const CLASS: ParserClass = ParserClass::new("TupleParser", TupleParser::build);

    pub fn new(inner: Vec<AnyParser>) -> Self {
        let inner = if inner.is_empty() {
            vec![AnyParser::plain(StringParser)]
        } else {
            inner
        };
        TupleParser {
            inner,
            sep: ",".to_string(),
        }
    }

    pub fn with_sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    pub fn arity(&self) -> usize {
        self.inner.len()
    }

    fn build(shape: &TypeShape, registry: &ParserRegistry) -> Result<AnyParser, ParserError> {
        let inner = match shape {
            TypeShape::Tuple(elements) => elements
                .iter()
                .map(|e| registry.get_parser(e))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        Ok(AnyParser::sourced(TupleParser::new(inner)))
    }
}

#[async_trait]
impl SourcedParser for TupleParser {
    async fn loads(
        &self,
        argument: &str,
        source: Option<&dyn Source>,
    ) -> Result<Value, ParserError> {
        let parts: Vec<&str> = argument.split(self.sep.as_str()).collect();
        if parts.len() != self.inner.len() {
            return Err(ParserError::Arity {
                expected: self.inner.len(),
                got: parts.len(),
            });
        }

        let mut items = Vec::with_capacity(parts.len());
        for (parser, part) in self.inner.iter().zip(parts) {
            items.push(parser.try_loads(part, source).await?);
        }
        Ok(Value::Tuple(items))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        let items = match value {
            Value::Tuple(items) | Value::List(items) => items,
            other => return Err(ParserError::invalid_value(other, "expected a tuple")),
        };
        if items.len() != self.inner.len() {
            return Err(ParserError::Arity {
                expected: self.inner.len(),
                got: items.len(),
            });
        }

        let dumped = self
            .inner
            .iter()
            .zip(items)
            .map(|(parser, item)| parser.dumps(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dumped.join(&self.sep))
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::TUPLE]
    }

    fn is_sourced(&self) -> bool {
        self.inner.iter().any(AnyParser::is_sourced)
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Variable-length homogeneous collection parser.
///
/// Abstract origins are made concrete on construction: sequences and bare
/// collections become lists, abstract sets become sets. Tuples are rejected.
#[derive(Debug, Clone)]
pub struct CollectionParser {
    inner: AnyParser,
    origin: TypeKey,
    sep: String,
}

impl CollectionParser {
    pub const CLASS: ParserClass = ParserClass::new("CollectionParser", CollectionParser::build);

    pub fn new(inner: AnyParser, origin: TypeKey) -> Result<Self, ParserError> {
        Ok(CollectionParser {
            inner,
            origin: Self::concrete(origin)?,
            sep: ",".to_string(),
        })
    }

    pub fn with_sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    /// The concrete collection type values are built as.
    pub fn origin(&self) -> TypeKey {
        self.origin
    }

    fn concrete(origin: TypeKey) -> Result<TypeKey, ParserError> {
        if origin.is_subtype_of(&TypeKey::TUPLE) {
            return Err(ParserError::InvalidConfig(
                "tuples have a fixed arity, use a TupleParser instead".to_string(),
            ));
        }
        if origin.is_subtype_of(&TypeKey::ABSTRACT_SET) {
            Ok(TypeKey::SET)
        } else {
            Ok(TypeKey::LIST)
        }
    }

    fn build(shape: &TypeShape, registry: &ParserRegistry) -> Result<AnyParser, ParserError> {
        let (origin, element) = match shape {
            TypeShape::Collection { origin, element } => (*origin, element.as_deref()),
            other => (other.origin(), None),
        };
        let inner = match element {
            Some(element) => registry.get_parser(element)?,
            None => AnyParser::plain(StringParser),
        };
        Ok(AnyParser::sourced(CollectionParser::new(inner, origin)?))
    }
}

#[async_trait]
impl SourcedParser for CollectionParser {
    async fn loads(
        &self,
        argument: &str,
        source: Option<&dyn Source>,
    ) -> Result<Value, ParserError> {
        let mut items = Vec::new();
        for part in argument.split(self.sep.as_str()) {
            if part.trim().is_empty() {
                continue;
            }
            let item = self.inner.try_loads(part, source).await?;
            if self.origin == TypeKey::SET && items.contains(&item) {
                continue;
            }
            items.push(item);
        }

        Ok(if self.origin == TypeKey::SET {
            Value::Set(items)
        } else {
            Value::List(items)
        })
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        let items = value
            .as_items()
            .ok_or_else(|| ParserError::invalid_value(value, "expected a collection"))?;

        let dumped = items
            .iter()
            .map(|item| self.inner.dumps(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dumped.join(&self.sep))
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![self.origin]
    }

    fn is_sourced(&self) -> bool {
        self.inner.is_sourced()
    }
}

// ---------------------------------------------------------------------------
// Union
// ---------------------------------------------------------------------------

/// Tries each member parser in order until one succeeds.
///
/// A `None` member makes the union optional: an empty argument loads as
/// `None` without consulting any member, and `None` dumps as `""`.
#[derive(Debug, Clone)]
pub struct UnionParser {
    inner: Vec<AnyParser>,
    optional: bool,
}

impl UnionParser {
    pub const CLASS: ParserClass = ParserClass::new("UnionParser", UnionParser::build);

    /// Members given as `None` stand for the `None` type.
    pub fn new(members: Vec<Option<AnyParser>>) -> Result<Self, ParserError> {
        if members.len() < 2 {
            return Err(ParserError::InvalidConfig(
                "a union requires two or more type arguments".to_string(),
            ));
        }

        let mut optional = false;
        let inner = members
            .into_iter()
            .map(|member| {
                member.unwrap_or_else(|| {
                    optional = true;
                    AnyParser::plain(NoneParser::default())
                })
            })
            .collect();

        Ok(UnionParser { inner, optional })
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    fn build(shape: &TypeShape, registry: &ParserRegistry) -> Result<AnyParser, ParserError> {
        let TypeShape::Union(members) = shape else {
            return Err(ParserError::InvalidConfig(format!(
                "cannot build a union parser for {:?}",
                shape.origin()
            )));
        };

        let members = members
            .iter()
            .map(|member| {
                if *member == TypeShape::none() {
                    Ok(None)
                } else {
                    registry.get_parser(member).map(Some)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AnyParser::sourced(UnionParser::new(members)?))
    }
}

#[async_trait]
impl SourcedParser for UnionParser {
    async fn loads(
        &self,
        argument: &str,
        source: Option<&dyn Source>,
    ) -> Result<Value, ParserError> {
        if argument.is_empty() && self.optional {
            return Ok(Value::None);
        }

        for parser in &self.inner {
            match parser.try_loads(argument, source).await {
                Ok(value) => return Ok(value),
                Err(e) => trace!(argument, error = %e, "union member rejected argument"),
            }
        }
        Err(ParserError::UnionExhausted(argument.to_string()))
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        if value.is_none() && self.optional {
            return Ok(String::new());
        }

        match self.inner.iter().find(|p| p.accepts(value)) {
            Some(parser) => parser.dumps(value),
            None => Err(ParserError::invalid_value(
                value,
                "no member of the union accepts this type",
            )),
        }
    }

    fn default_types(&self) -> Vec<TypeKey> {
        let mut keys = Vec::new();
        for key in self.inner.iter().flat_map(AnyParser::default_types) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn is_sourced(&self) -> bool {
        self.inner.iter().any(AnyParser::is_sourced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;

    fn loads(parser: &impl SourcedParser, argument: &str) -> Result<Value, ParserError> {
        block_on(parser.loads(argument, None))
    }

    #[test]
    fn int_round_trips_in_every_base() {
        for base in 2..=36 {
            let parser = IntParser::new(base, true).unwrap();
            for number in [0, 1, -1, 35, 36, -4096, i64::MAX, i64::MIN] {
                let dumped = parser.encode(number).unwrap();
                assert_eq!(parser.parse(&dumped), Ok(number), "base {base}: {dumped}");
            }
        }
    }

    #[test]
    fn int_default_is_base36() {
        let parser = IntParser::default();
        assert_eq!(parser.dumps(&Value::Int(35)).unwrap(), "z");
        assert_eq!(parser.dumps(&Value::Int(-36)).unwrap(), "-10");
        assert_eq!(parser.loads("Z"), Ok(Value::Int(35)));
    }

    #[test]
    fn int_rejects_bad_config_and_unsigned_negatives() {
        assert!(IntParser::new(1, true).is_err());
        assert!(IntParser::new(37, true).is_err());

        let unsigned = IntParser::new(10, false).unwrap();
        assert!(unsigned.loads("-5").is_err());
        assert!(unsigned.dumps(&Value::Int(-5)).is_err());
        assert_eq!(unsigned.dumps(&Value::Int(42)).unwrap(), "42");
    }

    #[test]
    fn float_strips_trailing_zero() {
        let parser = FloatParser;
        assert_eq!(parser.dumps(&Value::Float(3.0)).unwrap(), "3");
        assert_eq!(parser.dumps(&Value::Float(-0.25)).unwrap(), "-0.25");
        assert_eq!(parser.loads("3"), Ok(Value::Float(3.0)));
        assert_eq!(parser.loads("-0.25"), Ok(Value::Float(-0.25)));
    }

    #[test]
    fn bool_case_handling() {
        let parser = BoolParser::default();
        assert_eq!(parser.loads("YES"), Ok(Value::Bool(true)));
        assert_eq!(parser.loads("0"), Ok(Value::Bool(false)));
        assert!(parser.loads("maybe").is_err());
        assert_eq!(parser.dumps(&Value::Bool(true)).unwrap(), "1");

        let strict = BoolParser::new(vec!["on".into()], vec!["off".into()], true);
        assert!(strict.loads("ON").is_err());
        assert_eq!(strict.loads("off"), Ok(Value::Bool(false)));
    }

    #[test]
    fn none_strict_and_lenient() {
        let strict = NoneParser::default();
        assert_eq!(strict.loads(""), Ok(Value::None));
        assert!(strict.loads("x").is_err());
        assert!(strict.dumps(&Value::Int(0)).is_err());

        let lenient = NoneParser::lenient();
        assert_eq!(lenient.loads("x"), Ok(Value::None));
        assert_eq!(lenient.dumps(&Value::Int(0)).unwrap(), "");
    }

    #[test]
    fn tuple_enforces_arity() {
        let parser = TupleParser::new(vec![
            AnyParser::plain(IntParser::default()),
            AnyParser::plain(StringParser),
        ]);

        assert_eq!(
            loads(&parser, "a,b,c"),
            Err(ParserError::Arity { expected: 2, got: 3 })
        );
        assert_eq!(
            parser.dumps(&Value::Tuple(vec![Value::Int(1)])),
            Err(ParserError::Arity { expected: 2, got: 1 })
        );

        let value = Value::Tuple(vec![Value::Int(71), Value::Str("hi".into())]);
        let dumped = parser.dumps(&value).unwrap();
        assert_eq!(dumped, "1z,hi");
        assert_eq!(loads(&parser, &dumped), Ok(value));
    }

    #[test]
    fn tuple_custom_separator() {
        let parser = TupleParser::new(vec![
            AnyParser::plain(BoolParser::default()),
            AnyParser::plain(FloatParser),
        ])
        .with_sep(";");
        let value = Value::Tuple(vec![Value::Bool(false), Value::Float(1.5)]);
        assert_eq!(parser.dumps(&value).unwrap(), "0;1.5");
        assert_eq!(loads(&parser, "0;1.5"), Ok(value));
    }

    #[test]
    fn collection_skips_blank_parts_and_dedups_sets() {
        let list =
            CollectionParser::new(AnyParser::plain(IntParser::default()), TypeKey::SEQUENCE)
                .unwrap();
        assert_eq!(list.origin(), TypeKey::LIST);
        assert_eq!(
            loads(&list, "1, ,2,1"),
            Ok(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(1)]))
        );
        assert_eq!(loads(&list, ""), Ok(Value::List(vec![])));

        let set =
            CollectionParser::new(AnyParser::plain(IntParser::default()), TypeKey::ABSTRACT_SET)
                .unwrap();
        assert_eq!(set.origin(), TypeKey::SET);
        assert_eq!(
            loads(&set, "1,2,1"),
            Ok(Value::Set(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn collection_round_trip_and_tuple_rejection() {
        let parser =
            CollectionParser::new(AnyParser::plain(StringParser), TypeKey::LIST).unwrap();
        let value = Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]);
        let dumped = parser.dumps(&value).unwrap();
        assert_eq!(dumped, "a,b");
        assert_eq!(loads(&parser, &dumped), Ok(value));

        assert!(matches!(
            CollectionParser::new(AnyParser::plain(StringParser), TypeKey::TUPLE),
            Err(ParserError::InvalidConfig(_))
        ));
    }

    #[test]
    fn union_requires_two_members() {
        assert!(UnionParser::new(vec![Some(AnyParser::plain(StringParser))]).is_err());
    }

    #[test]
    fn optional_union_short_circuits() {
        #[derive(Debug)]
        struct Exploding;
        impl Parser for Exploding {
            fn loads(&self, _: &str) -> Result<Value, ParserError> {
                panic!("inner parser must not be consulted")
            }
            fn dumps(&self, _: &Value) -> Result<String, ParserError> {
                panic!("inner parser must not be consulted")
            }
            fn default_types(&self) -> Vec<TypeKey> {
                vec![TypeKey::INT]
            }
        }

        let parser = UnionParser::new(vec![Some(AnyParser::plain(Exploding)), None]).unwrap();
        assert!(parser.is_optional());
        assert_eq!(loads(&parser, ""), Ok(Value::None));
        assert_eq!(parser.dumps(&Value::None).unwrap(), "");
    }

    #[test]
    fn union_tries_members_in_order() {
        let parser = UnionParser::new(vec![
            Some(AnyParser::plain(IntParser::new(10, true).unwrap())),
            Some(AnyParser::plain(StringParser)),
        ])
        .unwrap();
        assert!(!parser.is_optional());

        assert_eq!(loads(&parser, "12"), Ok(Value::Int(12)));
        assert_eq!(loads(&parser, "abc"), Ok(Value::Str("abc".into())));
        assert_eq!(parser.dumps(&Value::Str("x".into())).unwrap(), "x");
        assert!(parser.dumps(&Value::Float(1.0)).is_err());
    }

    #[test]
    fn union_exhaustion_is_reported() {
        let parser = UnionParser::new(vec![
            Some(AnyParser::plain(IntParser::new(10, true).unwrap())),
            Some(AnyParser::plain(BoolParser::default())),
        ])
        .unwrap();
        assert_eq!(
            loads(&parser, "nope"),
            Err(ParserError::UnionExhausted("nope".to_string()))
        );
    }

    #[test]
    fn optional_zero_survives_round_trip() {
        let parser = UnionParser::new(vec![Some(AnyParser::plain(IntParser::default())), None])
            .unwrap();
        let dumped = parser.dumps(&Value::Int(0)).unwrap();
        assert_eq!(dumped, "0");
        assert_eq!(loads(&parser, &dumped), Ok(Value::Int(0)));
    }
}
