//! Stateful Discord components whose state lives in their custom id.
//!
//! A component type declares typed fields; a [`ComponentManager`] encodes
//! them into the component's custom id when it is sent and parses them back
//! when a user interacts with it, then runs the component's callback through
//! the manager tree's middleware and exception handlers.
//!
//! - [`value`] and [`parser`]: the value model and the field parsers
//! - [`fields`] and [`component`]: component declarations
//! - [`manager`]: registration, the custom-id codec and dispatch
//! - [`bot`], [`events`] and [`types`]: the host bot the managers attach to

pub mod bot;
pub mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod fields;
pub mod manager;
pub mod modules;
pub mod parser;
pub mod types;
pub mod value;

pub use bot::Bot;
pub use component::{
    ButtonOverrides, ButtonState, ComponentKind, ComponentSchema, InteractionContext,
    RichComponent, SelectOverrides, SelectState,
};
pub use config::ManagerConfig;
pub use error::{BoxError, ComponentError, ManagerError, ParserError};
pub use fields::{Field, FieldKind, FieldValues};
pub use manager::{
    check_manager, get_manager, CallbackWrapper, ComponentManager, ExceptionHandler,
    ManagerStore, Next,
};
pub use parser::{AnyParser, Parser, ParserRegistry, Source, SourcedParser};
pub use value::{FromValue, IntoValue, TypeKey, TypeShape, Value};
