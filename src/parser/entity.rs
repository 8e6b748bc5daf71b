//! Parsers for Discord entities referenced by id.
//!
//! Ids are snowflakes compressed through the integer parser. Everything
//! except the bare [`SnowflakeParser`] needs a [`Source`] that can reach the
//! bot's entity cache.

use async_trait::async_trait;

use super::builtins::IntParser;
use super::registry::ParserClass;
use super::{get_guild_from_source, require_bot, AnyParser, Parser, Source, SourcedParser};
use crate::error::ParserError;
use crate::value::{TypeKey, Value};

/// Parser for raw snowflake ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnowflakeParser {
    pub int_parser: IntParser,
}

impl SnowflakeParser {
    pub const CLASS: ParserClass = ParserClass::new("SnowflakeParser", |_, _| {
        Ok(AnyParser::plain(SnowflakeParser::default()))
    });

    fn parse_id(&self, argument: &str) -> Result<String, ParserError> {
        let id = self.int_parser.parse(argument)?;
        if id < 0 {
            return Err(ParserError::invalid_argument(argument, "snowflakes cannot be negative"));
        }
        Ok(id.to_string())
    }

    fn dump_id(&self, value: &Value, key: TypeKey) -> Result<String, ParserError> {
        if !value.type_key().is_subtype_of(&key) {
            return Err(ParserError::invalid_value(value, format!("expected a {key}")));
        }
        let id = value
            .entity_id()
            .ok_or_else(|| ParserError::invalid_value(value, "value has no id"))?;
        let id = id
            .parse::<i64>()
            .map_err(|e| ParserError::invalid_value(id, e.to_string()))?;
        self.int_parser.encode(id)
    }
}

impl Parser for SnowflakeParser {
    fn loads(&self, argument: &str) -> Result<Value, ParserError> {
        self.parse_id(argument).map(Value::Snowflake)
    }

    fn dumps(&self, value: &Value) -> Result<String, ParserError> {
        self.dump_id(value, TypeKey::SNOWFLAKE)
    }

    fn default_types(&self) -> Vec<TypeKey> {
        vec![TypeKey::SNOWFLAKE]
    }
}

fn not_found(kind: &'static str, id: String) -> ParserError {
    ParserError::NotFound { kind, id }
}

/// Declares a sourced entity parser around a lookup body.
macro_rules! entity_parser {
    ($(#[$meta:meta])* $name:ident, $key:expr, |$id:ident, $source:ident| $lookup:block) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub snowflake: SnowflakeParser,
        }

        impl $name {
            pub const CLASS: ParserClass = ParserClass::new(stringify!($name), |_, _| {
                Ok(AnyParser::sourced($name::default()))
            });
        }

        #[async_trait]
        impl SourcedParser for $name {
            async fn loads(
                &self,
                argument: &str,
                $source: Option<&dyn Source>,
            ) -> Result<Value, ParserError> {
                let $id = self.snowflake.parse_id(argument)?;
                $lookup
            }

            fn dumps(&self, value: &Value) -> Result<String, ParserError> {
                self.snowflake.dump_id(value, $key)
            }

            fn default_types(&self) -> Vec<TypeKey> {
                vec![$key]
            }
        }
    };
}

entity_parser!(
    /// Resolves users from the interaction author or the bot cache.
    UserParser,
    TypeKey::USER,
    |id, source| {
        if let Some(author) = source.and_then(Source::author).filter(|a| a.id == id) {
            return Ok(Value::User(author.clone()));
        }
        let bot = require_bot(source)?;
        match bot.user(&id).await {
            Some(user) => Ok(Value::User(user)),
            None => Err(not_found("user", id)),
        }
    }
);

entity_parser!(
    /// Resolves members of the guild the source belongs to.
    MemberParser,
    TypeKey::MEMBER,
    |id, source| {
        let source = source.ok_or(ParserError::MissingSource("guild"))?;
        let guild = get_guild_from_source(source).await?;
        match guild.member(&id) {
            Some(member) => Ok(Value::Member(member.clone())),
            None => Err(not_found("member", id)),
        }
    }
);

entity_parser!(
    ChannelParser,
    TypeKey::CHANNEL,
    |id, source| {
        let bot = require_bot(source)?;
        match bot.channel(&id).await {
            Some(channel) => Ok(Value::Channel(channel)),
            None => Err(not_found("channel", id)),
        }
    }
);

entity_parser!(
    GuildParser,
    TypeKey::GUILD,
    |id, source| {
        let bot = require_bot(source)?;
        match bot.guild(&id).await {
            Some(guild) => Ok(Value::Guild(guild)),
            None => Err(not_found("guild", id)),
        }
    }
);

entity_parser!(
    /// Resolves messages from the source's own message or the bot cache.
    MessageParser,
    TypeKey::MESSAGE,
    |id, source| {
        if let Some(message) = source.and_then(Source::message).filter(|m| m.id == id) {
            return Ok(Value::Message(Box::new(message.clone())));
        }
        let bot = require_bot(source)?;
        match bot.message(&id).await {
            Some(message) => Ok(Value::Message(Box::new(message))),
            None => Err(not_found("message", id)),
        }
    }
);
