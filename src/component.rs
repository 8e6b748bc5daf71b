//! Rich components: Discord components whose state lives in their custom id.
//!
//! A component type implements [`RichComponent`] for its runtime behaviour and
//! [`ComponentSchema`] for its declared fields. Registering it with a
//! [`ComponentManager`](crate::manager::ComponentManager) produces a
//! [`ComponentType`], whose [`ComponentFactory`] bridges the field list and
//! the custom-id codec.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::bot::Bot;
use crate::error::{BoxError, ComponentError, ParserError};
use crate::fields::{get_fields, Field, FieldKind, FieldValues};
use crate::manager::ComponentManager;
use crate::modules::ModuleData;
use crate::parser::{AnyParser, ParserRegistry, Source};
use crate::types::{
    Component, ComponentEmoji, Interaction, InteractionCallbackData, InteractionCallbackType,
    InteractionResponse, Message, SelectOption, User, COMPONENT_BUTTON, COMPONENT_STRING_SELECT,
    DEFAULT_BUTTON_STYLE,
};
use crate::value::{TypeKey, TypeShape, Value};

// ---------------------------------------------------------------------------
// Component traits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Button,
    Select,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Button => "button",
            ComponentKind::Select => "select",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live component instance.
#[async_trait]
pub trait RichComponent: Send + Sync + 'static {
    /// The current value of every declared field, internal ones included.
    fn values(&self) -> FieldValues;

    /// Called when a user interacts with this component.
    async fn callback(&mut self, ctx: &mut InteractionContext) -> Result<(), BoxError>;

    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The declared shape of a component type.
pub trait ComponentSchema: RichComponent + Sized {
    const KIND: ComponentKind;

    /// Every field in declaration order.
    fn fields() -> Vec<Field>;

    /// Build an instance from a complete set of field values.
    fn from_values(values: FieldValues) -> Result<Self, ComponentError>;
}

// ---------------------------------------------------------------------------
// Button and select state
// ---------------------------------------------------------------------------

/// The internal fields every button carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonState {
    pub label: Option<String>,
    pub style: u8,
    pub emoji: Option<ComponentEmoji>,
    pub disabled: bool,
}

impl Default for ButtonState {
    fn default() -> Self {
        ButtonState {
            label: None,
            style: DEFAULT_BUTTON_STYLE,
            emoji: None,
            disabled: false,
        }
    }
}

impl ButtonState {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_style(mut self, style: u8) -> Self {
        self.style = style;
        self
    }

    /// Internal field declarations, defaulting to this state.
    pub fn fields(&self) -> Vec<Field> {
        vec![
            Field::internal("label", TypeShape::optional(TypeShape::str()))
                .with_default(self.label.clone()),
            Field::internal("style", TypeShape::int()).with_default(self.style),
            Field::internal("emoji", TypeShape::optional(TypeShape::plain(TypeKey::JSON)))
                .with_default(self.emoji.clone()),
            Field::internal("disabled", TypeShape::bool()).with_default(self.disabled),
        ]
    }

    pub fn from_values(values: &mut FieldValues) -> Result<Self, ComponentError> {
        Ok(ButtonState {
            label: values.take("label")?,
            style: values.take("style")?,
            emoji: values.take("emoji")?,
            disabled: values.take("disabled")?,
        })
    }

    pub fn values(&self) -> FieldValues {
        FieldValues::new()
            .with("label", self.label.clone())
            .with("style", self.style)
            .with("emoji", self.emoji.clone())
            .with("disabled", self.disabled)
    }

    pub fn to_component(&self, custom_id: String) -> Component {
        Component {
            custom_id: Some(custom_id),
            label: self.label.clone(),
            style: Some(self.style),
            emoji: self.emoji.clone(),
            disabled: Some(self.disabled),
            ..Component::empty(COMPONENT_BUTTON)
        }
    }
}

/// The internal fields every select menu carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectState {
    pub placeholder: Option<String>,
    pub min_values: u8,
    pub max_values: u8,
    pub disabled: bool,
    pub options: Vec<SelectOption>,
}

impl Default for SelectState {
    fn default() -> Self {
        SelectState {
            placeholder: None,
            min_values: 1,
            max_values: 1,
            disabled: false,
            options: Vec::new(),
        }
    }
}

impl SelectState {
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn fields(&self) -> Vec<Field> {
        vec![
            Field::internal("placeholder", TypeShape::optional(TypeShape::str()))
                .with_default(self.placeholder.clone()),
            Field::internal("min_values", TypeShape::int()).with_default(self.min_values),
            Field::internal("max_values", TypeShape::int()).with_default(self.max_values),
            Field::internal("disabled", TypeShape::bool()).with_default(self.disabled),
            Field::internal("options", TypeShape::list(TypeShape::plain(TypeKey::JSON)))
                .with_default(self.options.clone()),
        ]
    }

    pub fn from_values(values: &mut FieldValues) -> Result<Self, ComponentError> {
        Ok(SelectState {
            placeholder: values.take("placeholder")?,
            min_values: values.take("min_values")?,
            max_values: values.take("max_values")?,
            disabled: values.take("disabled")?,
            options: values.take("options")?,
        })
    }

    pub fn values(&self) -> FieldValues {
        FieldValues::new()
            .with("placeholder", self.placeholder.clone())
            .with("min_values", self.min_values)
            .with("max_values", self.max_values)
            .with("disabled", self.disabled)
            .with("options", self.options.clone())
    }

    pub fn to_component(&self, custom_id: String) -> Component {
        Component {
            custom_id: Some(custom_id),
            placeholder: self.placeholder.clone(),
            min_values: Some(self.min_values),
            max_values: Some(self.max_values),
            disabled: Some(self.disabled),
            options: self.options.clone(),
            ..Component::empty(COMPONENT_STRING_SELECT)
        }
    }
}

/// Explicit button settings for [`make_button`](ComponentManager::make_button).
#[derive(Debug, Clone, Default)]
pub struct ButtonOverrides {
    pub label: Option<String>,
    pub style: Option<u8>,
    pub emoji: Option<ComponentEmoji>,
    pub disabled: Option<bool>,
}

impl ButtonOverrides {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn style(mut self, style: u8) -> Self {
        self.style = Some(style);
        self
    }

    pub fn emoji(mut self, emoji: ComponentEmoji) -> Self {
        self.emoji = Some(emoji);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub(crate) fn into_values(self) -> FieldValues {
        let mut values = FieldValues::new();
        if let Some(label) = self.label {
            values.insert("label", Some(label));
        }
        if let Some(style) = self.style {
            values.insert("style", style);
        }
        if let Some(emoji) = self.emoji {
            values.insert("emoji", Some(emoji));
        }
        if let Some(disabled) = self.disabled {
            values.insert("disabled", disabled);
        }
        values
    }
}

/// Explicit select settings for [`make_select`](ComponentManager::make_select).
#[derive(Debug, Clone, Default)]
pub struct SelectOverrides {
    pub placeholder: Option<String>,
    pub min_values: Option<u8>,
    pub max_values: Option<u8>,
    pub disabled: Option<bool>,
    pub options: Option<Vec<SelectOption>>,
}

impl SelectOverrides {
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn min_values(mut self, min_values: u8) -> Self {
        self.min_values = Some(min_values);
        self
    }

    pub fn max_values(mut self, max_values: u8) -> Self {
        self.max_values = Some(max_values);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub(crate) fn into_values(self) -> FieldValues {
        let mut values = FieldValues::new();
        if let Some(placeholder) = self.placeholder {
            values.insert("placeholder", Some(placeholder));
        }
        if let Some(min_values) = self.min_values {
            values.insert("min_values", min_values);
        }
        if let Some(max_values) = self.max_values {
            values.insert("max_values", max_values);
        }
        if let Some(disabled) = self.disabled {
            values.insert("disabled", disabled);
        }
        if let Some(options) = self.options {
            values.insert("options", options);
        }
        values
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

type BuildFn = fn(FieldValues) -> Result<Box<dyn RichComponent>, ComponentError>;

fn build_boxed<T: ComponentSchema>(
    values: FieldValues,
) -> Result<Box<dyn RichComponent>, ComponentError> {
    Ok(Box::new(T::from_values(values)?))
}

/// Converts between a component type's fields and custom-id parts.
pub struct ComponentFactory {
    fields: Vec<Field>,
    /// One parser per custom-id field, in field order.
    parsers: Vec<AnyParser>,
    build: BuildFn,
    type_name: &'static str,
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.iter().map(|f| f.name).collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentFactory {
    /// Resolve a parser for every custom-id field of `T`.
    pub fn for_type<T: ComponentSchema>(registry: &ParserRegistry) -> Result<Self, ParserError> {
        let fields = T::fields();
        let parsers = get_fields(&fields, Some(FieldKind::CustomId))
            .into_iter()
            .map(|field| match &field.parser {
                Some(parser) => Ok(parser.clone()),
                None => registry.get_parser(&field.shape),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ComponentFactory {
            fields,
            parsers,
            build: build_boxed::<T>,
            type_name: std::any::type_name::<T>(),
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn parsers(&self) -> &[AnyParser] {
        &self.parsers
    }

    fn custom_id_fields(&self) -> impl Iterator<Item = (&Field, &AnyParser)> {
        self.fields
            .iter()
            .filter(|f| f.is_custom_id())
            .zip(self.parsers.iter())
    }

    /// Dump each custom-id field of `component`, in field order.
    pub fn dump_params(&self, component: &dyn RichComponent) -> Result<Vec<String>, ComponentError> {
        let values = component.values();
        self.custom_id_fields()
            .map(|(field, parser)| {
                let value = values
                    .get(field.name)
                    .ok_or_else(|| ComponentError::MissingField(field.name.to_string()))?;
                parser.dumps(value).map_err(|source| ComponentError::Parser {
                    field: field.name.to_string(),
                    source,
                })
            })
            .collect()
    }

    /// Rebuild a component from parsed custom-id parts.
    ///
    /// `params` fill custom-id fields in order; missing trailing parts fall
    /// back to field defaults. `component_params` supplies everything else,
    /// usually the internal fields read off the raw component.
    pub async fn build_component(
        &self,
        source: Option<&dyn Source>,
        params: &[String],
        component_params: FieldValues,
    ) -> Result<Box<dyn RichComponent>, ComponentError> {
        if params.len() > self.parsers.len() {
            return Err(ComponentError::TooManyParams {
                component: self.type_name.to_string(),
                expected: self.parsers.len(),
                got: params.len(),
            });
        }

        let mut values = component_params;
        for ((field, parser), argument) in self.custom_id_fields().zip(params) {
            let value = parser
                .try_loads(argument, source)
                .await
                .map_err(|source| ComponentError::Parser {
                    field: field.name.to_string(),
                    source,
                })?;
            values.insert(field.name, value);
        }

        self.instantiate(values)
    }

    /// Build a component from `values`, filling gaps with field defaults.
    pub fn instantiate(&self, mut values: FieldValues) -> Result<Box<dyn RichComponent>, ComponentError> {
        for field in &self.fields {
            if !values.contains(field.name) {
                if let Some(default) = &field.default {
                    values.insert(field.name, default.clone());
                }
            }
        }
        (self.build)(values)
    }

    /// Internal field values present on a raw Discord component.
    ///
    /// Unset attributes are skipped so the field defaults apply.
    pub fn internal_values(&self, raw: &Component) -> FieldValues {
        let mut values = FieldValues::new();
        let Ok(json) = serde_json::to_value(raw) else {
            return values;
        };
        for field in get_fields(&self.fields, Some(FieldKind::Internal)) {
            match json.get(field.name) {
                Some(serde_json::Value::Null) | None => {}
                Some(found) => values.insert(field.name, Value::from_json(found.clone())),
            }
        }
        values
    }
}

// ---------------------------------------------------------------------------
// Registered types
// ---------------------------------------------------------------------------

/// A component type as registered with a manager.
#[derive(Debug)]
pub struct ComponentType {
    pub identifier: String,
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub kind: ComponentKind,
    pub module: ModuleData,
    pub factory: ComponentFactory,
    pub(crate) manager: Weak<ComponentManager>,
}

impl ComponentType {
    /// The manager this type was registered on.
    pub fn manager(&self) -> Option<Arc<ComponentManager>> {
        self.manager.upgrade()
    }

    /// The Discord component for `component` under `custom_id`.
    pub fn to_ui_component(
        &self,
        component: &dyn RichComponent,
        custom_id: String,
    ) -> Result<Component, ComponentError> {
        let mut values = component.values();
        Ok(match self.kind {
            ComponentKind::Button => ButtonState::from_values(&mut values)?.to_component(custom_id),
            ComponentKind::Select => SelectState::from_values(&mut values)?.to_component(custom_id),
        })
    }
}

// ---------------------------------------------------------------------------
// Interaction context
// ---------------------------------------------------------------------------

/// Everything a component callback gets to see about its interaction.
#[derive(Debug)]
pub struct InteractionContext {
    pub interaction: Interaction,
    bot: Option<Arc<Bot>>,
    current_component: Option<String>,
    response: Option<InteractionResponse>,
}

impl InteractionContext {
    pub fn new(interaction: Interaction) -> Self {
        InteractionContext {
            interaction,
            bot: None,
            current_component: None,
            response: None,
        }
    }

    pub fn with_bot(mut self, bot: Arc<Bot>) -> Self {
        self.bot = Some(bot);
        self
    }

    pub fn bot(&self) -> Option<&Arc<Bot>> {
        self.bot.as_ref()
    }

    pub fn custom_id(&self) -> Option<&str> {
        self.interaction.custom_id()
    }

    /// Custom id of the component whose callback is running, if any.
    pub fn current_component(&self) -> Option<&str> {
        self.current_component.as_deref()
    }

    pub(crate) fn set_current_component(&mut self, custom_id: Option<String>) {
        self.current_component = custom_id;
    }

    /// Selected values of a select menu interaction.
    pub fn values(&self) -> &[String] {
        self.interaction
            .data
            .as_ref()
            .map(|d| d.values.as_slice())
            .unwrap_or_default()
    }

    pub fn respond(&mut self, response: InteractionResponse) {
        self.response = Some(response);
    }

    /// Reply with a new message.
    pub fn send_message(&mut self, content: impl Into<String>, components: Vec<Component>) {
        self.respond(InteractionResponse {
            kind: InteractionCallbackType::ChannelMessageWithSource,
            data: Some(InteractionCallbackData {
                content: Some(content.into()),
                components: (!components.is_empty()).then_some(components),
                flags: None,
            }),
        });
    }

    /// Edit the message the component is attached to.
    pub fn update_message(&mut self, content: Option<String>, components: Vec<Component>) {
        self.respond(InteractionResponse {
            kind: InteractionCallbackType::UpdateMessage,
            data: Some(InteractionCallbackData {
                content,
                components: Some(components),
                flags: None,
            }),
        });
    }

    pub fn response(&self) -> Option<&InteractionResponse> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<InteractionResponse> {
        self.response.take()
    }
}

impl Source for InteractionContext {
    fn bot(&self) -> Option<&Bot> {
        self.bot.as_deref()
    }

    fn guild_id(&self) -> Option<&str> {
        self.interaction.guild_id.as_deref()
    }

    fn channel_id(&self) -> Option<&str> {
        self.interaction.channel_id.as_deref()
    }

    fn message(&self) -> Option<&Message> {
        self.interaction.message.as_ref()
    }

    fn author(&self) -> Option<&User> {
        self.interaction.author()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{button, string_select};
    use futures_lite::future::block_on;

    /// A button counting its presses in the custom id.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Counter {
        pub button: ButtonState,
        pub count: i64,
        pub owner: Option<String>,
    }

    #[async_trait]
    impl RichComponent for Counter {
        fn values(&self) -> FieldValues {
            let mut values = self.button.values();
            values.insert("count", self.count);
            values.insert("owner", self.owner.clone());
            values
        }

        async fn callback(&mut self, ctx: &mut InteractionContext) -> Result<(), BoxError> {
            self.count += 1;
            ctx.send_message(format!("count {}", self.count), Vec::new());
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl ComponentSchema for Counter {
        const KIND: ComponentKind = ComponentKind::Button;

        fn fields() -> Vec<Field> {
            let mut fields = ButtonState::default().with_label("Count").fields();
            fields.push(Field::custom_id("count", TypeShape::int()).with_default(0i64));
            fields.push(
                Field::custom_id("owner", TypeShape::optional(TypeShape::str()))
                    .with_default(Value::None),
            );
            fields
        }

        fn from_values(mut values: FieldValues) -> Result<Self, ComponentError> {
            Ok(Counter {
                button: ButtonState::from_values(&mut values)?,
                count: values.take("count")?,
                owner: values.take("owner")?,
            })
        }
    }

    /// A select menu with no custom-id fields.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Picker {
        pub select: SelectState,
    }

    #[async_trait]
    impl RichComponent for Picker {
        fn values(&self) -> FieldValues {
            self.select.values()
        }

        async fn callback(&mut self, ctx: &mut InteractionContext) -> Result<(), BoxError> {
            let picked = ctx.values().join(",");
            ctx.send_message(picked, Vec::new());
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl ComponentSchema for Picker {
        const KIND: ComponentKind = ComponentKind::Select;

        fn fields() -> Vec<Field> {
            SelectState::default()
                .with_placeholder("Pick one")
                .with_options(vec![SelectOption::new("a"), SelectOption::new("b")])
                .fields()
        }

        fn from_values(mut values: FieldValues) -> Result<Self, ComponentError> {
            Ok(Picker {
                select: SelectState::from_values(&mut values)?,
            })
        }
    }

    fn factory() -> ComponentFactory {
        ComponentFactory::for_type::<Counter>(&ParserRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn factory_resolves_custom_id_parsers_only() {
        let factory = factory();
        assert_eq!(factory.fields().len(), 6);
        assert_eq!(factory.parsers().len(), 2);
    }

    #[test]
    fn dump_then_build() {
        let factory = factory();
        let counter = Counter {
            button: ButtonState::default().with_label("Count"),
            count: 40,
            owner: Some("ferris".into()),
        };
        let params = factory.dump_params(&counter).unwrap();
        assert_eq!(params, ["14", "ferris"]);

        let built = block_on(factory.build_component(None, &params, FieldValues::new())).unwrap();
        let built = built.as_any().downcast_ref::<Counter>().unwrap();
        assert_eq!(built, &counter);
    }

    #[test]
    fn missing_params_use_defaults() {
        let factory = factory();
        let built = block_on(factory.build_component(None, &[], FieldValues::new())).unwrap();
        let built = built.as_any().downcast_ref::<Counter>().unwrap();
        assert_eq!(built.count, 0);
        assert_eq!(built.owner, None);
        assert_eq!(built.button.label.as_deref(), Some("Count"));
    }

    #[test]
    fn too_many_params_rejected() {
        let params = ["1", "a", "extra"].map(String::from);
        let err = block_on(factory().build_component(None, &params, FieldValues::new()))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ComponentError::TooManyParams {
                expected: 2,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn parse_failures_name_the_field() {
        let params = ["!!".to_string()];
        let err = block_on(factory().build_component(None, &params, FieldValues::new()))
            .err()
            .unwrap();
        assert!(matches!(err, ComponentError::Parser { ref field, .. } if field == "count"));
    }

    #[test]
    fn internal_values_read_off_raw_components() {
        let factory = factory();
        let mut raw = button(4, "Pressed", "Counter|1");
        raw.disabled = Some(true);
        let values = factory.internal_values(&raw);
        assert_eq!(values.get("label"), Some(&Value::Str("Pressed".into())));
        assert_eq!(values.get("style"), Some(&Value::Int(4)));
        assert_eq!(values.get("disabled"), Some(&Value::Bool(true)));
        assert!(!values.contains("emoji"));

        let picker = ComponentFactory::for_type::<Picker>(&ParserRegistry::with_builtins()).unwrap();
        let raw = string_select("Picker", "Choose", vec![SelectOption::new("z")]);
        let built = picker.instantiate(picker.internal_values(&raw)).unwrap();
        let built = built.as_any().downcast_ref::<Picker>().unwrap();
        assert_eq!(built.select.placeholder.as_deref(), Some("Choose"));
        assert_eq!(built.select.options, vec![SelectOption::new("z")]);
    }

    #[test]
    fn context_responses() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "1",
            "application_id": "2",
            "type": 3,
            "data": { "custom_id": "Picker", "component_type": 3, "values": ["a", "b"] },
            "guild_id": "10",
            "channel_id": "20",
            "member": null,
            "user": null,
            "token": "t",
            "message": null,
        }))
        .unwrap();
        let mut ctx = InteractionContext::new(interaction);
        assert_eq!(ctx.values(), ["a", "b"]);
        assert_eq!(Source::guild_id(&ctx), Some("10"));
        assert!(Source::bot(&ctx).is_none());

        ctx.send_message("hi", Vec::new());
        let response = ctx.take_response().unwrap();
        assert_eq!(response.kind, InteractionCallbackType::ChannelMessageWithSource);
        assert!(ctx.response().is_none());
    }
}
