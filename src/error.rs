//! Error types for the component layer.
//!
//! - [`ParserError`] - converting a single custom-id field to or from a string
//! - [`ComponentError`] - building a component from its field values
//! - [`ManagerError`] - registration, lookup, custom-id encoding and bot binding
//!
//! Failures raised from inside a component callback or a callback wrapper are
//! plain [`BoxError`]s; those never leave the manager's dispatch entrypoint
//! and are routed through the exception-handler chain instead.

use thiserror::Error;

/// A boxed error type for callback and middleware failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while constructing or running a parser.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    /// No registered parser accepts the requested type.
    #[error("no parser available for type {0:?}")]
    NoParser(String),

    /// A tuple parser received the wrong number of items.
    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    /// The argument could not be converted.
    #[error("invalid argument {argument:?}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// The value handed to `dumps` is not one this parser handles.
    #[error("cannot dump {value}: {reason}")]
    InvalidValue { value: String, reason: String },

    /// A parser was configured with invalid options.
    #[error("invalid parser configuration: {0}")]
    InvalidConfig(String),

    /// A union parser ran out of members to try.
    #[error("failed to parse {0:?} to any type in the union")]
    UnionExhausted(String),

    /// A sourced parser was called without the capability it needs.
    #[error("parser requires a source providing {0}")]
    MissingSource(&'static str),

    /// A sourced parser could not find the referenced entity.
    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },
}

impl ParserError {
    pub(crate) fn invalid_argument(argument: &str, reason: impl Into<String>) -> Self {
        ParserError::InvalidArgument {
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(value: impl std::fmt::Debug, reason: impl Into<String>) -> Self {
        ParserError::InvalidValue {
            value: format!("{value:?}"),
            reason: reason.into(),
        }
    }
}

/// Errors raised while turning field values into a component instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    /// A required field had no value and no default.
    #[error("missing value for field {0:?}")]
    MissingField(String),

    /// A field value had the wrong type.
    #[error("field {field:?} expected {expected}, got {actual}")]
    FieldType {
        field: String,
        expected: &'static str,
        actual: String,
    },

    /// More custom-id parts were supplied than the component declares.
    #[error("component {component:?} takes {expected} custom id fields, got {got}")]
    TooManyParams {
        component: String,
        expected: usize,
        got: usize,
    },

    /// A field's parser failed.
    #[error("field {field:?}: {source}")]
    Parser {
        field: String,
        #[source]
        source: ParserError,
    },
}

/// Errors raised by the component manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    /// Two components claimed the same identifier outside of a reload.
    #[error(
        "cannot register component with duplicate identifier {identifier:?} \
         (original defined in module {original:?}, duplicate defined in module {duplicate:?})"
    )]
    DuplicateIdentifier {
        identifier: String,
        original: String,
        duplicate: String,
    },

    /// The identifier does not belong to a registered component.
    #[error("no component registered with identifier {0:?}")]
    UnknownIdentifier(String),

    /// The component type is not registered to any manager.
    #[error("component {0:?} is not registered to a component manager")]
    NotRegistered(String),

    /// A factory helper found a component of the wrong kind.
    #[error("expected identifier {identifier:?} to point to a {expected} class, got {actual} {type_name}")]
    KindMismatch {
        identifier: String,
        expected: &'static str,
        actual: &'static str,
        type_name: String,
    },

    /// The manager (or any of its parents) is not bound to a bot.
    #[error("component manager {0:?} is not yet registered to a bot")]
    NoBot(String),

    /// `add_to_bot` was called twice.
    #[error("component manager {0:?} is already registered to this bot")]
    AlreadyBound(String),

    /// `remove_from_bot` was called on an unbound manager.
    #[error("component manager {0:?} is not yet registered to this bot")]
    NotBound(String),

    /// The encoded custom id exceeds Discord's limit.
    #[error("custom id {custom_id:?} is {len} characters long, the maximum is {max}")]
    CustomIdTooLong {
        custom_id: String,
        len: usize,
        max: usize,
    },

    /// A dumped field contains the separator and would not decode back.
    #[error("field {field:?} dumps to {value:?}, which contains the separator {sep:?}")]
    SeparatorInField {
        field: String,
        value: String,
        sep: String,
    },

    /// A parsed message refers to the component being invoked, but none was given.
    #[error("no component is currently being invoked")]
    NoCurrentComponent,

    /// An invalid configuration value was supplied.
    #[error("invalid manager configuration: {0}")]
    Config(String),

    /// A parser could not be built or failed.
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// A component could not be built from its fields.
    #[error(transparent)]
    Component(#[from] ComponentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_identifier_names_both_modules() {
        let err = ManagerError::DuplicateIdentifier {
            identifier: "X".to_string(),
            original: "app::a".to_string(),
            duplicate: "app::b".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("\"X\""));
        assert!(message.contains("app::a"));
        assert!(message.contains("app::b"));
    }

    #[test]
    fn parser_error_converts_into_manager_error() {
        let err: ManagerError = ParserError::Arity { expected: 2, got: 3 }.into();
        assert_eq!(err.to_string(), "expected 2 arguments, got 3");
    }

    #[test]
    fn component_error_keeps_parser_source() {
        use std::error::Error as _;

        let err = ComponentError::Parser {
            field: "count".to_string(),
            source: ParserError::UnionExhausted("x".to_string()),
        };
        assert!(err.source().is_some());
    }
}
