//! The type-key to parser-class registry.
//!
//! Each [`ParserClass`] knows how to build a parser for a [`TypeShape`]. The
//! registry maps type keys to classes in two ways:
//!
//! - an exact table, consulted first;
//! - a list of `(class, keys, priority)` entries, scanned when the exact
//!   table misses. An entry matches when the queried key is a subtype of one
//!   of its keys. The highest priority wins; among equal priorities the entry
//!   registered first wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::builtins::{
    BoolParser, CollectionParser, FloatParser, IntParser, NoneParser, StringParser, TupleParser,
    UnionParser,
};
use super::datetime::{DateParser, DatetimeParser, TimeParser, TimedeltaParser, TimezoneParser};
use super::entity::{
    ChannelParser, GuildParser, MemberParser, MessageParser, SnowflakeParser, UserParser,
};
use super::enums::EnumParser;
use super::AnyParser;
use crate::error::ParserError;
use crate::value::{TypeKey, TypeShape};

/// Builds a parser for a concrete shape, recursing into the registry for
/// member types.
pub type BuildFn = fn(&TypeShape, &ParserRegistry) -> Result<AnyParser, ParserError>;

/// A named parser constructor, the unit the registry stores.
#[derive(Clone, Copy)]
pub struct ParserClass {
    pub name: &'static str,
    pub build: BuildFn,
}

impl ParserClass {
    pub const fn new(name: &'static str, build: BuildFn) -> Self {
        ParserClass { name, build }
    }
}

impl fmt::Debug for ParserClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParserClass").field(&self.name).finish()
    }
}

impl PartialEq for ParserClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug)]
struct Entry {
    class: ParserClass,
    keys: Vec<TypeKey>,
    priority: i32,
}

#[derive(Debug, Default)]
struct Tables {
    exact: HashMap<TypeKey, ParserClass>,
    entries: Vec<Entry>,
}

/// Registry of parser classes keyed by type.
#[derive(Debug, Default)]
pub struct ParserRegistry {
    tables: RwLock<Tables>,
}

impl ParserRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in parser.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// The shared process-wide registry, populated with the built-ins on
    /// first use.
    pub fn global() -> Arc<ParserRegistry> {
        static GLOBAL: OnceLock<Arc<ParserRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ParserRegistry::with_builtins()))
            .clone()
    }

    fn register_builtins(&self) {
        let builtins: [(ParserClass, &[TypeKey]); 20] = [
            (NoneParser::CLASS, &[TypeKey::NONE]),
            (IntParser::CLASS, &[TypeKey::INT]),
            (FloatParser::CLASS, &[TypeKey::FLOAT]),
            (BoolParser::CLASS, &[TypeKey::BOOL]),
            (StringParser::CLASS, &[TypeKey::STR]),
            (TupleParser::CLASS, &[TypeKey::TUPLE]),
            (CollectionParser::CLASS, &[TypeKey::COLLECTION]),
            (UnionParser::CLASS, &[TypeKey::UNION]),
            (DatetimeParser::CLASS, &[TypeKey::DATETIME]),
            (DateParser::CLASS, &[TypeKey::DATE]),
            (TimeParser::CLASS, &[TypeKey::TIME]),
            (TimedeltaParser::CLASS, &[TypeKey::TIMEDELTA]),
            (TimezoneParser::CLASS, &[TypeKey::TIMEZONE]),
            (EnumParser::CLASS, &[TypeKey::ENUM]),
            (SnowflakeParser::CLASS, &[TypeKey::SNOWFLAKE]),
            (UserParser::CLASS, &[TypeKey::USER]),
            (MemberParser::CLASS, &[TypeKey::MEMBER]),
            (ChannelParser::CLASS, &[TypeKey::CHANNEL]),
            (GuildParser::CLASS, &[TypeKey::GUILD]),
            (MessageParser::CLASS, &[TypeKey::MESSAGE]),
        ];

        for (class, keys) in builtins {
            self.register(class, keys, 0, true);
        }
    }

    /// Register `class` as a candidate for every key in `keys`.
    ///
    /// With `force` unset, anything already registered is left alone: exact
    /// entries, and the keys and priority of a class registered before. With
    /// `force` set, the class's keys and priority are replaced. Either way a
    /// class registered again keeps its original position for tie-breaking.
    pub fn register(&self, class: ParserClass, keys: &[TypeKey], priority: i32, force: bool) {
        let mut tables = self.tables.write();

        for key in keys {
            if force || !tables.exact.contains_key(key) {
                tables.exact.insert(*key, class);
            }
        }

        match tables.entries.iter_mut().find(|e| e.class == class) {
            Some(entry) if force => {
                entry.keys = keys.to_vec();
                entry.priority = priority;
            }
            Some(_) => {}
            None => tables.entries.push(Entry {
                class,
                keys: keys.to_vec(),
                priority,
            }),
        }

        debug!(parser = class.name, ?keys, priority, "registered parser");
    }

    /// Find the parser class for `key`.
    pub fn resolve(&self, key: TypeKey) -> Result<ParserClass, ParserError> {
        let tables = self.tables.read();

        if let Some(class) = tables.exact.get(&key) {
            return Ok(*class);
        }

        let mut best: Option<&Entry> = None;
        for entry in &tables.entries {
            if !entry.keys.iter().any(|k| key.is_subtype_of(k)) {
                continue;
            }
            if best.map_or(true, |b| entry.priority > b.priority) {
                best = Some(entry);
            }
        }

        best.map(|e| e.class)
            .ok_or_else(|| ParserError::NoParser(key.name().to_string()))
    }

    /// Build a parser for a field of the given shape.
    pub fn get_parser(&self, shape: &TypeShape) -> Result<AnyParser, ParserError> {
        let class = self.resolve(shape.origin())?;
        (class.build)(shape, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use futures_lite::future::block_on;

    static ANIMAL: TypeKey = TypeKey::new("Animal");
    static DOG: TypeKey = TypeKey::subtype("Dog", &ANIMAL);
    static PUPPY: TypeKey = TypeKey::subtype("Puppy", &DOG);
    static KITTEN: TypeKey = TypeKey::subtype("Kitten", &ANIMAL);

    fn build_str(_: &TypeShape, _: &ParserRegistry) -> Result<AnyParser, ParserError> {
        Ok(AnyParser::plain(StringParser))
    }

    const LOW: ParserClass = ParserClass::new("Low", build_str);
    const HIGH: ParserClass = ParserClass::new("High", build_str);
    const OTHER: ParserClass = ParserClass::new("Other", build_str);

    #[test]
    fn exact_match_wins() {
        let registry = ParserRegistry::new();
        registry.register(HIGH, &[ANIMAL], 10, true);
        registry.register(LOW, &[DOG], 0, true);
        assert_eq!(registry.resolve(DOG).unwrap(), LOW);
    }

    #[test]
    fn highest_priority_wins_on_slow_path() {
        let registry = ParserRegistry::new();
        registry.register(LOW, &[ANIMAL], 0, true);
        registry.register(HIGH, &[DOG], 5, true);
        assert_eq!(registry.resolve(PUPPY).unwrap(), HIGH);
    }

    #[test]
    fn ties_go_to_earliest_registration() {
        let registry = ParserRegistry::new();
        registry.register(OTHER, &[ANIMAL], 1, true);
        registry.register(LOW, &[DOG], 1, true);
        assert_eq!(registry.resolve(PUPPY).unwrap(), OTHER);

        // Re-registering keeps the original position.
        registry.register(OTHER, &[ANIMAL], 1, true);
        assert_eq!(registry.resolve(PUPPY).unwrap(), OTHER);
    }

    #[test]
    fn force_controls_exact_overwrite() {
        let registry = ParserRegistry::new();
        registry.register(LOW, &[DOG], 0, true);
        registry.register(HIGH, &[DOG], 0, false);
        assert_eq!(registry.resolve(DOG).unwrap(), LOW);
        registry.register(HIGH, &[DOG], 0, true);
        assert_eq!(registry.resolve(DOG).unwrap(), HIGH);
    }

    #[test]
    fn unforced_reregistration_keeps_keys_and_priority() {
        let registry = ParserRegistry::new();
        registry.register(HIGH, &[ANIMAL], 5, true);
        registry.register(LOW, &[DOG], 3, true);
        assert_eq!(registry.resolve(PUPPY).unwrap(), HIGH);

        registry.register(HIGH, &[ANIMAL], 0, false);
        assert_eq!(registry.resolve(PUPPY).unwrap(), HIGH);
    }

    #[test]
    fn forced_reregistration_replaces_keys() {
        let registry = ParserRegistry::new();
        registry.register(HIGH, &[ANIMAL], 5, true);
        registry.register(LOW, &[DOG], 3, true);

        registry.register(HIGH, &[DOG], 1, true);
        assert_eq!(registry.resolve(PUPPY).unwrap(), LOW);
        // Animal is no longer among High's keys, so other animals miss.
        assert!(registry.resolve(KITTEN).is_err());
        registry.register(HIGH, &[DOG], 4, true);
        assert_eq!(registry.resolve(PUPPY).unwrap(), HIGH);
    }

    #[test]
    fn unresolvable_type_names_it() {
        let registry = ParserRegistry::new();
        let err = registry.resolve(ANIMAL).unwrap_err();
        assert_eq!(err, ParserError::NoParser("Animal".to_string()));
        assert!(err.to_string().contains("Animal"));
    }

    #[test]
    fn builtins_cover_subtypes() {
        let registry = ParserRegistry::with_builtins();
        assert_eq!(registry.resolve(TypeKey::LIST).unwrap(), CollectionParser::CLASS);
        assert_eq!(registry.resolve(TypeKey::SET).unwrap(), CollectionParser::CLASS);
        assert_eq!(registry.resolve(TypeKey::TUPLE).unwrap(), TupleParser::CLASS);
        assert_eq!(registry.resolve(TypeKey::FLAG).unwrap(), EnumParser::CLASS);
        assert_eq!(registry.resolve(TypeKey::BOOL).unwrap(), BoolParser::CLASS);
    }

    #[test]
    fn get_parser_builds_nested_shapes() {
        let registry = ParserRegistry::with_builtins();
        let shape = TypeShape::tuple(vec![
            TypeShape::int(),
            TypeShape::optional(TypeShape::str()),
            TypeShape::list(TypeShape::bool()),
        ]);
        let parser = registry.get_parser(&shape).unwrap();

        let value = Value::Tuple(vec![
            Value::Int(100),
            Value::None,
            Value::List(vec![Value::Bool(true), Value::Bool(false)]),
        ]);
        assert_eq!(parser.dumps(&value).unwrap(), "2s,,1,0");

        let simple = registry
            .get_parser(&TypeShape::tuple(vec![TypeShape::int(), TypeShape::str()]))
            .unwrap();
        let loaded = block_on(simple.try_loads("2s,abc", None)).unwrap();
        assert_eq!(
            loaded,
            Value::Tuple(vec![Value::Int(100), Value::Str("abc".into())])
        );
    }
}
