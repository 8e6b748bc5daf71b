//! Bidirectional converters between custom-id strings and [`Value`]s.
//!
//! Two protocols exist:
//!
//! - [`Parser`]: synchronous, needs nothing beyond the string itself.
//! - [`SourcedParser`]: asynchronous `loads` that may consult a [`Source`]
//!   (the interaction being handled, the bot cache, ...) to resolve state
//!   that cannot be recovered from the string alone.
//!
//! Callers that don't care which kind they hold go through [`AnyParser`] and
//! [`try_loads`]. Parsers for a declared field type come from the
//! [`ParserRegistry`].

pub mod builtins;
pub mod datetime;
pub mod entity;
pub mod enums;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::Bot;
use crate::error::ParserError;
use crate::types::{Guild, Message, User};
use crate::value::{TypeKey, Value};

pub use builtins::{
    BoolParser, CollectionParser, FloatParser, IntParser, NoneParser, StringParser, TupleParser,
    UnionParser,
};
pub use datetime::{
    DateParser, DatetimeParser, Resolution, TimeParser, TimedeltaParser, TimezoneParser,
};
pub use entity::{
    ChannelParser, GuildParser, MemberParser, MessageParser, SnowflakeParser, UserParser,
};
pub use enums::EnumParser;
pub use registry::{ParserClass, ParserRegistry};

// ---------------------------------------------------------------------------
// Protocols
// ---------------------------------------------------------------------------

/// A parser that converts without any outside context.
pub trait Parser: fmt::Debug + Send + Sync {
    /// Load a value from its custom-id string form.
    fn loads(&self, argument: &str) -> Result<Value, ParserError>;

    /// Dump a value into its custom-id string form.
    fn dumps(&self, value: &Value) -> Result<String, ParserError>;

    /// The value types this parser knows how to dump.
    fn default_types(&self) -> Vec<TypeKey>;
}

/// A parser whose `loads` may need a [`Source`].
///
/// Composite parsers (tuples, collections, unions, enums) implement this
/// protocol too so they can forward a source to their members. They report
/// [`is_sourced`](SourcedParser::is_sourced) only when a member does.
#[async_trait]
pub trait SourcedParser: fmt::Debug + Send + Sync {
    async fn loads(&self, argument: &str, source: Option<&dyn Source>)
        -> Result<Value, ParserError>;

    fn dumps(&self, value: &Value) -> Result<String, ParserError>;

    fn default_types(&self) -> Vec<TypeKey>;

    fn is_sourced(&self) -> bool {
        true
    }
}

/// Either kind of parser behind a shared handle.
#[derive(Debug, Clone)]
pub enum AnyParser {
    Plain(Arc<dyn Parser>),
    Sourced(Arc<dyn SourcedParser>),
}

impl AnyParser {
    pub fn plain(parser: impl Parser + 'static) -> Self {
        AnyParser::Plain(Arc::new(parser))
    }

    pub fn sourced(parser: impl SourcedParser + 'static) -> Self {
        AnyParser::Sourced(Arc::new(parser))
    }

    /// Whether `loads` needs a source to succeed.
    pub fn is_sourced(&self) -> bool {
        match self {
            AnyParser::Plain(_) => false,
            AnyParser::Sourced(p) => p.is_sourced(),
        }
    }

    pub fn default_types(&self) -> Vec<TypeKey> {
        match self {
            AnyParser::Plain(p) => p.default_types(),
            AnyParser::Sourced(p) => p.default_types(),
        }
    }

    /// Whether this parser declares support for dumping `value`.
    pub fn accepts(&self, value: &Value) -> bool {
        let key = value.type_key();
        self.default_types()
            .iter()
            .any(|accepted| key.is_subtype_of(accepted))
    }

    pub async fn try_loads(
        &self,
        argument: &str,
        source: Option<&dyn Source>,
    ) -> Result<Value, ParserError> {
        match self {
            AnyParser::Plain(p) => p.loads(argument),
            AnyParser::Sourced(p) => p.loads(argument, source).await,
        }
    }

    pub fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        match self {
            AnyParser::Plain(p) => p.dumps(value),
            AnyParser::Sourced(p) => p.dumps(value),
        }
    }
}

/// Load `argument` with `parser`, passing `source` only if it is needed.
pub async fn try_loads(
    parser: &AnyParser,
    argument: &str,
    source: Option<&dyn Source>,
) -> Result<Value, ParserError> {
    parser.try_loads(argument, source).await
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Context a sourced parser may draw on.
///
/// Every capability is optional. A parser that needs one the source doesn't
/// provide fails with [`ParserError::MissingSource`].
pub trait Source: Send + Sync {
    fn bot(&self) -> Option<&Bot> {
        None
    }

    fn guild_id(&self) -> Option<&str> {
        None
    }

    fn channel_id(&self) -> Option<&str> {
        None
    }

    fn message(&self) -> Option<&Message> {
        None
    }

    fn author(&self) -> Option<&User> {
        None
    }
}

impl Source for () {}

impl Source for Bot {
    fn bot(&self) -> Option<&Bot> {
        Some(self)
    }
}

impl Source for Message {
    fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }

    fn channel_id(&self) -> Option<&str> {
        Some(&self.channel_id)
    }

    fn message(&self) -> Option<&Message> {
        Some(self)
    }

    fn author(&self) -> Option<&User> {
        Some(&self.author)
    }
}

pub(crate) fn require_bot(source: Option<&dyn Source>) -> Result<&Bot, ParserError> {
    source
        .and_then(Source::bot)
        .ok_or(ParserError::MissingSource("bot"))
}

/// Find the guild a source refers to.
///
/// Tries the source's own guild first, then the guild of its message, then
/// the guild of its channel.
pub async fn get_guild_from_source(source: &dyn Source) -> Result<Guild, ParserError> {
    let bot = source.bot().ok_or(ParserError::MissingSource("bot"))?;

    let guild_id = match source.guild_id() {
        Some(id) => Some(id.to_string()),
        None => match source.message().and_then(|m| m.guild_id.clone()) {
            Some(id) => Some(id),
            None => match source.channel_id() {
                Some(channel_id) => bot.channel(channel_id).await.and_then(|c| c.guild_id),
                None => None,
            },
        },
    };

    let guild_id = guild_id.ok_or(ParserError::MissingSource("guild"))?;
    bot.guild(&guild_id)
        .await
        .ok_or(ParserError::NotFound {
            kind: "guild",
            id: guild_id,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::block_on;

    #[test]
    fn try_loads_dispatches_plain() {
        let parser = AnyParser::plain(IntParser::default());
        assert!(!parser.is_sourced());
        assert_eq!(block_on(try_loads(&parser, "z", None)), Ok(Value::Int(35)));
    }

    #[test]
    fn accepts_uses_subtypes() {
        let parser = AnyParser::plain(IntParser::default());
        assert!(parser.accepts(&Value::Int(1)));
        assert!(parser.accepts(&Value::Bool(true)));
        assert!(!parser.accepts(&Value::Str("1".into())));
    }

    #[test]
    fn unit_source_provides_nothing() {
        assert!(require_bot(Some(&())).is_err());
        assert_eq!(require_bot(None).err(), Some(ParserError::MissingSource("bot")));
    }

    #[test]
    fn guild_found_through_channel() {
        let bot = Bot::new();
        block_on(async {
            bot.cache_guild(crate::bot::tests::guild("10", "Home")).await;
            bot.cache_channel(crate::bot::tests::channel("20", Some("10"))).await;
        });

        struct InChannel<'a>(&'a Bot);
        impl Source for InChannel<'_> {
            fn bot(&self) -> Option<&Bot> {
                Some(self.0)
            }
            fn channel_id(&self) -> Option<&str> {
                Some("20")
            }
        }

        let guild = block_on(get_guild_from_source(&InChannel(&bot))).unwrap();
        assert_eq!(guild.name, "Home");

        let err = block_on(get_guild_from_source(&bot)).unwrap_err();
        assert_eq!(err, ParserError::MissingSource("guild"));
    }
}
