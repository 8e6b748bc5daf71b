//! The dynamic value model shared by every parser.
//!
//! A custom-id field is described by a [`TypeShape`] computed once when the
//! component type is declared. Parsers turn strings into [`Value`]s and back;
//! [`FromValue`] / [`IntoValue`] bridge those to plain Rust types inside
//! component constructors.
//!
//! [`TypeKey`] is the registry's notion of a type. Each key may name a parent,
//! which stands in for subclassing when the registry falls back to its slow
//! lookup: a parser registered for `int` also accepts `bool`, a parser
//! registered for `enum` accepts every user enum.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::types::{
    Channel, ComponentEmoji, Guild, GuildMember, Message, SelectOption, Snowflake, User,
};

// ---------------------------------------------------------------------------
// Type keys
// ---------------------------------------------------------------------------

/// Identity of a type as far as the parser registry is concerned.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    name: &'static str,
    parent: Option<&'static TypeKey>,
}

impl TypeKey {
    pub const NONE: TypeKey = TypeKey::new("None");
    pub const INT: TypeKey = TypeKey::new("int");
    pub const BOOL: TypeKey = TypeKey::subtype("bool", &TypeKey::INT);
    pub const FLOAT: TypeKey = TypeKey::new("float");
    pub const STR: TypeKey = TypeKey::new("str");

    pub const COLLECTION: TypeKey = TypeKey::new("Collection");
    pub const SEQUENCE: TypeKey = TypeKey::subtype("Sequence", &TypeKey::COLLECTION);
    pub const LIST: TypeKey = TypeKey::subtype("list", &TypeKey::SEQUENCE);
    pub const ABSTRACT_SET: TypeKey = TypeKey::subtype("AbstractSet", &TypeKey::COLLECTION);
    pub const SET: TypeKey = TypeKey::subtype("set", &TypeKey::ABSTRACT_SET);
    pub const TUPLE: TypeKey = TypeKey::subtype("tuple", &TypeKey::SEQUENCE);
    pub const UNION: TypeKey = TypeKey::new("Union");

    pub const DATETIME: TypeKey = TypeKey::new("datetime");
    pub const DATE: TypeKey = TypeKey::new("date");
    pub const TIME: TypeKey = TypeKey::new("time");
    pub const TIMEDELTA: TypeKey = TypeKey::new("timedelta");
    pub const TIMEZONE: TypeKey = TypeKey::new("timezone");

    pub const ENUM: TypeKey = TypeKey::new("Enum");
    pub const FLAG: TypeKey = TypeKey::subtype("Flag", &TypeKey::ENUM);

    pub const SNOWFLAKE: TypeKey = TypeKey::new("Snowflake");
    pub const USER: TypeKey = TypeKey::subtype("User", &TypeKey::SNOWFLAKE);
    pub const MEMBER: TypeKey = TypeKey::subtype("Member", &TypeKey::SNOWFLAKE);
    pub const CHANNEL: TypeKey = TypeKey::subtype("Channel", &TypeKey::SNOWFLAKE);
    pub const GUILD: TypeKey = TypeKey::subtype("Guild", &TypeKey::SNOWFLAKE);
    pub const MESSAGE: TypeKey = TypeKey::subtype("Message", &TypeKey::SNOWFLAKE);

    pub const JSON: TypeKey = TypeKey::new("json");

    /// A root type with no parent.
    pub const fn new(name: &'static str) -> Self {
        TypeKey { name, parent: None }
    }

    /// A type that the registry treats as a subclass of `parent`.
    pub const fn subtype(name: &'static str, parent: &'static TypeKey) -> Self {
        TypeKey {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static TypeKey> {
        self.parent
    }

    /// Whether `self` is `other` or (transitively) derives from it.
    pub fn is_subtype_of(&self, other: &TypeKey) -> bool {
        let mut current = Some(self);
        while let Some(key) = current {
            if key == other {
                return true;
            }
            current = key.parent;
        }
        false
    }

    /// Abstract collection keys that need a concrete stand-in before values
    /// can be built.
    pub fn is_abstract_collection(&self) -> bool {
        *self == TypeKey::COLLECTION
            || *self == TypeKey::SEQUENCE
            || *self == TypeKey::ABSTRACT_SET
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Type shapes
// ---------------------------------------------------------------------------

/// The declared type of one custom-id field.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    /// A concrete, unparameterised type.
    Plain(TypeKey),
    /// A user enum or flag type.
    Enum(Arc<EnumDef>),
    /// A union of two or more member types; `Plain(NONE)` marks it optional.
    Union(Vec<TypeShape>),
    /// A fixed-arity tuple.
    Tuple(Vec<TypeShape>),
    /// A homogeneous collection. `element` defaults to `str`.
    Collection {
        origin: TypeKey,
        element: Option<Box<TypeShape>>,
    },
}

impl TypeShape {
    /// The registry key this shape resolves its parser class through.
    pub fn origin(&self) -> TypeKey {
        match self {
            TypeShape::Plain(key) => *key,
            TypeShape::Enum(def) => def.key,
            TypeShape::Union(_) => TypeKey::UNION,
            TypeShape::Tuple(_) => TypeKey::TUPLE,
            TypeShape::Collection { origin, .. } => *origin,
        }
    }

    pub fn plain(key: TypeKey) -> Self {
        TypeShape::Plain(key)
    }

    pub fn none() -> Self {
        TypeShape::Plain(TypeKey::NONE)
    }

    pub fn int() -> Self {
        TypeShape::Plain(TypeKey::INT)
    }

    pub fn float() -> Self {
        TypeShape::Plain(TypeKey::FLOAT)
    }

    pub fn bool() -> Self {
        TypeShape::Plain(TypeKey::BOOL)
    }

    pub fn str() -> Self {
        TypeShape::Plain(TypeKey::STR)
    }

    pub fn enumeration(def: Arc<EnumDef>) -> Self {
        TypeShape::Enum(def)
    }

    /// `Optional[inner]`, i.e. `Union[inner, None]`.
    pub fn optional(inner: TypeShape) -> Self {
        TypeShape::Union(vec![inner, TypeShape::none()])
    }

    pub fn union(members: Vec<TypeShape>) -> Self {
        TypeShape::Union(members)
    }

    pub fn tuple(elements: Vec<TypeShape>) -> Self {
        TypeShape::Tuple(elements)
    }

    pub fn list(element: TypeShape) -> Self {
        TypeShape::collection(TypeKey::LIST, element)
    }

    pub fn set(element: TypeShape) -> Self {
        TypeShape::collection(TypeKey::SET, element)
    }

    pub fn collection(origin: TypeKey, element: TypeShape) -> Self {
        TypeShape::Collection {
            origin,
            element: Some(Box::new(element)),
        }
    }

    /// Whether this is a union containing `None`.
    pub fn is_optional(&self) -> bool {
        match self {
            TypeShape::Union(members) => members.iter().any(|m| *m == TypeShape::none()),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One named member of an [`EnumDef`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Value,
}

/// Runtime description of an enum or flag type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub key: TypeKey,
    pub members: Vec<EnumMember>,
    /// Flag enums accept any combination of their members' bits.
    pub flag: bool,
}

impl EnumDef {
    /// Describe a plain enum. `key` should derive from [`TypeKey::ENUM`].
    pub fn new<'a>(key: TypeKey, members: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        EnumDef {
            key,
            members: members
                .into_iter()
                .map(|(name, value)| EnumMember {
                    name: name.to_string(),
                    value,
                })
                .collect(),
            flag: false,
        }
    }

    /// Describe a `bitflags` type as a flag enum.
    pub fn from_flags<F>(key: TypeKey) -> Self
    where
        F: bitflags::Flags,
        F::Bits: Into<i64>,
    {
        EnumDef {
            key,
            members: F::FLAGS
                .iter()
                .map(|flag| EnumMember {
                    name: flag.name().to_string(),
                    value: Value::Int(flag.value().bits().into()),
                })
                .collect(),
            flag: true,
        }
    }

    /// The single type every member value shares, if there is one.
    ///
    /// Flags are always integer-valued.
    pub fn value_type(&self) -> Option<TypeKey> {
        if self.flag {
            return Some(TypeKey::INT);
        }

        let mut members = self.members.iter();
        let first = members.next()?.value.type_key();
        members
            .all(|m| m.value.type_key() == first)
            .then_some(first)
    }

    pub fn member_by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_by_value(&self, value: &Value) -> Option<&EnumMember> {
        self.members.iter().find(|m| &m.value == value)
    }

    /// Union of every member's bits (flag enums only).
    pub fn all_bits(&self) -> i64 {
        self.members
            .iter()
            .filter_map(|m| match m.value {
                Value::Int(bits) => Some(bits),
                _ => None,
            })
            .fold(0, |acc, bits| acc | bits)
    }

    /// The enum value for the member named `name`.
    pub fn value_of(&self, name: &str) -> Option<Value> {
        self.member_by_name(name).map(|m| {
            Value::Enum(EnumValue {
                key: self.key,
                name: Some(m.name.clone()),
                value: Box::new(m.value.clone()),
            })
        })
    }
}

/// An instance of an enum or flag type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub key: TypeKey,
    /// Member name; `None` for flag combinations without a single member.
    pub name: Option<String>,
    pub value: Box<Value>,
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A parsed custom-id field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    DateTime(DateTime<FixedOffset>),
    /// A datetime without timezone information.
    NaiveDateTime(NaiveDateTime),
    Date(NaiveDate),
    Time {
        time: NaiveTime,
        offset: Option<FixedOffset>,
    },
    Duration(TimeDelta),
    Timezone(FixedOffset),
    Enum(EnumValue),
    Snowflake(Snowflake),
    User(User),
    Member(GuildMember),
    Channel(Channel),
    Guild(Guild),
    Message(Box<Message>),
    /// Raw JSON read off a Discord component (select options, emoji).
    Json(serde_json::Value),
}

impl Value {
    /// The registry key of this value's runtime type.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::None => TypeKey::NONE,
            Value::Bool(_) => TypeKey::BOOL,
            Value::Int(_) => TypeKey::INT,
            Value::Float(_) => TypeKey::FLOAT,
            Value::Str(_) => TypeKey::STR,
            Value::Tuple(_) => TypeKey::TUPLE,
            Value::List(_) => TypeKey::LIST,
            Value::Set(_) => TypeKey::SET,
            Value::DateTime(_) | Value::NaiveDateTime(_) => TypeKey::DATETIME,
            Value::Date(_) => TypeKey::DATE,
            Value::Time { .. } => TypeKey::TIME,
            Value::Duration(_) => TypeKey::TIMEDELTA,
            Value::Timezone(_) => TypeKey::TIMEZONE,
            Value::Enum(e) => e.key,
            Value::Snowflake(_) => TypeKey::SNOWFLAKE,
            Value::User(_) => TypeKey::USER,
            Value::Member(_) => TypeKey::MEMBER,
            Value::Channel(_) => TypeKey::CHANNEL,
            Value::Guild(_) => TypeKey::GUILD,
            Value::Message(_) => TypeKey::MESSAGE,
            Value::Json(_) => TypeKey::JSON,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Items of a tuple, list or set.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) | Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// The snowflake id of an entity value, if it has one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Value::Snowflake(id) => Some(id),
            Value::User(user) => Some(&user.id),
            Value::Member(member) => member.user.as_ref().map(|u| u.id.as_str()),
            Value::Channel(channel) => Some(&channel.id),
            Value::Guild(guild) => Some(&guild.id),
            Value::Message(message) => Some(&message.id),
            _ => None,
        }
    }

    /// Convert JSON read off a raw Discord component.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            other => Value::Json(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Conversion of a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion of a [`Value`] back into a Rust value.
///
/// On mismatch the original value is handed back so callers can report it.
pub trait FromValue: Sized {
    /// Human-readable name of the expected type, for error messages.
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

macro_rules! value_variant {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self.into())
            }
        }

        impl FromValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

value_variant!(bool, Bool, "bool");
value_variant!(f64, Float, "float");
value_variant!(String, Str, "str");
value_variant!(DateTime<FixedOffset>, DateTime, "datetime");
value_variant!(NaiveDateTime, NaiveDateTime, "naive datetime");
value_variant!(NaiveDate, Date, "date");
value_variant!(TimeDelta, Duration, "timedelta");
value_variant!(FixedOffset, Timezone, "timezone");
value_variant!(EnumValue, Enum, "enum");
value_variant!(User, User, "user");
value_variant!(GuildMember, Member, "member");
value_variant!(Channel, Channel, "channel");
value_variant!(Guild, Guild, "guild");
value_variant!(serde_json::Value, Json, "json");

/// Discord objects that travel as raw JSON inside component state.
macro_rules! json_value {
    ($ty:ty, $expected:literal) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                serde_json::to_value(self).map_or(Value::None, Value::Json)
            }
        }

        impl FromValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::Json(json) => {
                        serde_json::from_value(json.clone()).map_err(|_| Value::Json(json))
                    }
                    other => Err(other),
                }
            }
        }
    };
}

json_value!(ComponentEmoji, "emoji");
json_value!(SelectOption, "select option");

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(i64::from(b)),
            other => Err(other),
        }
    }
}

impl IntoValue for u8 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl FromValue for u8 {
    const EXPECTED: &'static str = "int in 0..=255";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => u8::try_from(i).map_err(|_| Value::Int(i)),
            other => Err(other),
        }
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for Message {
    fn into_value(self) -> Value {
        Value::Message(Box::new(self))
    }
}

impl FromValue for Message {
    const EXPECTED: &'static str = "message";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Message(message) => Ok(*message),
            other => Err(other),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "collection";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut iter = items.into_iter();
                while let Some(item) = iter.next() {
                    match T::from_value(item) {
                        Ok(converted) => out.push(converted),
                        Err(bad) => {
                            let mut rest = vec![bad];
                            rest.extend(iter);
                            return Err(Value::List(rest));
                        }
                    }
                }
                Ok(out)
            }
            other => Err(other),
        }
    }
}

macro_rules! value_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoValue for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_value(self) -> Value {
                let ($($name,)+) = self;
                Value::Tuple(vec![$($name.into_value()),+])
            }
        }

        impl<$($name: FromValue),+> FromValue for ($($name,)+) {
            const EXPECTED: &'static str = "tuple";

            #[allow(non_snake_case)]
            fn from_value(value: Value) -> Result<Self, Value> {
                let items = match value {
                    Value::Tuple(items) => items,
                    other => return Err(other),
                };
                let snapshot = Value::Tuple(items.clone());
                let mut iter = items.into_iter();
                $(
                    let $name = match iter.next().map($name::from_value) {
                        Some(Ok(v)) => v,
                        _ => return Err(snapshot),
                    };
                )+
                if iter.next().is_some() {
                    return Err(snapshot);
                }
                Ok(($($name,)+))
            }
        }
    };
}

value_tuple!(A, B);
value_tuple!(A, B, C);
value_tuple!(A, B, C, D);
