//! Component managers.
//!
//! Managers form a tree by dotted name: `"a.b"` is a child of `"a"`, and every
//! undotted name is a child of the root manager. A component registered on a
//! manager is visible to that manager and all of its ancestors, so binding
//! only the root manager to a bot is enough to dispatch every component.
//!
//! Dispatch runs each ancestor's [`CallbackWrapper`] root first around the
//! component callback. Failures are offered to each ancestor's
//! [`ExceptionHandler`] leaf first until one reports the error handled.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::bot::{Bot, EventListener, ListenerId};
use crate::component::{
    ButtonOverrides, ComponentFactory, ComponentKind, ComponentSchema, ComponentType,
    InteractionContext, RichComponent, SelectOverrides,
};
use crate::config::{ManagerConfig, DEFAULT_COUNT, DEFAULT_SEP};
use crate::error::{BoxError, ManagerError};
use crate::events::COMPONENT_EVENT;
use crate::fields::FieldValues;
use crate::modules::{module_of, ModuleTable};
use crate::parser::{ParserRegistry, Source};
use crate::types::{action_row, Component, Interaction, Message, User};

/// Name of the root manager.
pub const ROOT: &str = "root";

/// Discord's limit on custom id length, in characters.
pub const CUSTOM_ID_MAX_LEN: usize = 100;

/// Separator tried when a custom id doesn't contain the configured one.
const FALLBACK_SEP: &str = ":";

/// Count characters are U+0000 to U+0018, one per component on a message.
const COUNT_CHARS: u8 = 25;

fn count_char(count: u8) -> char {
    char::from(count)
}

fn is_count_char(c: char) -> bool {
    (c as u32) < u32::from(COUNT_CHARS)
}

/// The default identifier for a type: its name without the module path.
fn make_identifier(type_name: &str) -> String {
    type_name.rsplit("::").next().unwrap_or(type_name).to_string()
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// The rest of a dispatch: inner wrappers, then the component callback.
pub struct Next<'a> {
    wrappers: &'a [(Arc<ComponentManager>, Arc<dyn CallbackWrapper>)],
    component: &'a mut dyn RichComponent,
    ctx: &'a mut InteractionContext,
}

impl<'a> Next<'a> {
    pub fn component(&self) -> &dyn RichComponent {
        &*self.component
    }

    pub fn context(&mut self) -> &mut InteractionContext {
        &mut *self.ctx
    }

    /// Run the remaining wrappers and the callback.
    pub fn run(self) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>> {
        Box::pin(async move {
            match self.wrappers.split_first() {
                Some(((manager, wrapper), rest)) => {
                    let next = Next {
                        wrappers: rest,
                        component: self.component,
                        ctx: self.ctx,
                    };
                    wrapper.wrap(manager, next).await
                }
                None => self.component.callback(self.ctx).await,
            }
        })
    }
}

/// Code run around every component callback dispatched through a manager.
///
/// Work before `next.run()` happens on entry, work after it on exit. An
/// error returned at any point is routed to the exception handlers.
#[async_trait]
pub trait CallbackWrapper: Send + Sync {
    async fn wrap(&self, manager: &ComponentManager, next: Next<'_>) -> Result<(), BoxError>;
}

/// Handles an error raised while dispatching a component.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    /// Return `true` if the error is handled and should not be passed on to
    /// the parent manager.
    async fn handle(
        &self,
        manager: &ComponentManager,
        component: &dyn RichComponent,
        ctx: &mut InteractionContext,
        error: &BoxError,
    ) -> bool;
}

// ---------------------------------------------------------------------------
// Manager store
// ---------------------------------------------------------------------------

/// Owns every manager by name, along with the registry and module table
/// they share.
pub struct ManagerStore {
    managers: Mutex<HashMap<String, Arc<ComponentManager>>>,
    registry: Arc<ParserRegistry>,
    modules: Arc<ModuleTable>,
}

impl Default for ManagerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerStore {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ParserRegistry::with_builtins()))
    }

    pub fn with_registry(registry: Arc<ParserRegistry>) -> Self {
        ManagerStore {
            managers: Mutex::new(HashMap::new()),
            registry,
            modules: Arc::new(ModuleTable::new()),
        }
    }

    /// The process-wide store, backed by the global parser registry.
    pub fn global() -> &'static ManagerStore {
        static GLOBAL: OnceLock<ManagerStore> = OnceLock::new();
        GLOBAL.get_or_init(|| ManagerStore::with_registry(ParserRegistry::global()))
    }

    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.registry
    }

    pub fn modules(&self) -> &Arc<ModuleTable> {
        &self.modules
    }

    /// Get a manager by name, creating it and its parents if needed.
    ///
    /// `None` returns the root manager.
    pub fn get_manager(&self, name: Option<&str>) -> Arc<ComponentManager> {
        let name = name.filter(|n| !n.is_empty()).unwrap_or(ROOT);
        let mut managers = self.managers.lock();
        self.get_or_create(&mut managers, name)
    }

    fn get_or_create(
        &self,
        managers: &mut HashMap<String, Arc<ComponentManager>>,
        name: &str,
    ) -> Arc<ComponentManager> {
        if let Some(manager) = managers.get(name) {
            return manager.clone();
        }

        let parent = match (name, name.rsplit_once('.')) {
            (ROOT, _) => None,
            (_, Some((parent, _))) => Some(self.get_or_create(managers, parent)),
            (_, None) => Some(self.get_or_create(managers, ROOT)),
        };

        let manager = Arc::new(ComponentManager {
            name: name.to_string(),
            parent: parent.clone(),
            registry: self.registry.clone(),
            modules: self.modules.clone(),
            state: Mutex::new(ManagerState::default()),
        });
        if let Some(parent) = parent {
            parent.state.lock().children.push(Arc::downgrade(&manager));
        }

        debug!(manager = name, "created component manager");
        managers.insert(name.to_string(), manager.clone());
        manager
    }

    /// Whether a manager named `name` exists. Never creates one.
    pub fn check_manager(&self, name: &str) -> bool {
        self.managers.lock().contains_key(name)
    }

    /// Start a new load of module `name`.
    ///
    /// Components registered from it before the reload become stale unless
    /// they are registered again.
    pub fn reload_module(&self, name: &str) {
        self.modules.reload(name);
    }

    /// Mark module `name` unloaded, making its components stale.
    pub fn unload_module(&self, name: &str) {
        self.modules.unload(name);
    }
}

/// Get a manager from the global store. `None` returns the root manager.
pub fn get_manager(name: Option<&str>) -> Arc<ComponentManager> {
    ManagerStore::global().get_manager(name)
}

/// Whether the global store has a manager named `name`.
pub fn check_manager(name: &str) -> bool {
    ManagerStore::global().check_manager(name)
}

// ---------------------------------------------------------------------------
// Component manager
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ManagerState {
    components: HashMap<String, Arc<ComponentType>>,
    identifiers: HashMap<TypeId, String>,
    children: Vec<Weak<ComponentManager>>,
    count: Option<bool>,
    sep: Option<String>,
    counter: u8,
    bot: Weak<Bot>,
    listeners: Vec<(Weak<Bot>, ListenerId)>,
    callback_wrapper: Option<Arc<dyn CallbackWrapper>>,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
}

pub struct ComponentManager {
    name: String,
    parent: Option<Arc<ComponentManager>>,
    registry: Arc<ParserRegistry>,
    modules: Arc<ModuleTable>,
    state: Mutex<ManagerState>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .finish_non_exhaustive()
    }
}

/// One component of a parsed message.
pub enum MessageComponent {
    Rich(Box<dyn RichComponent>),
    /// The component whose callback is currently running.
    Current,
    /// A component no manager recognises, kept as is.
    Raw(Component),
}

impl fmt::Debug for MessageComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageComponent::Rich(c) => f.debug_tuple("Rich").field(&c.type_name()).finish(),
            MessageComponent::Current => f.write_str("Current"),
            MessageComponent::Raw(c) => f.debug_tuple("Raw").field(&c.custom_id).finish(),
        }
    }
}

/// A message plus the bot, as a parser source.
struct MessageSource<'a> {
    message: &'a Message,
    bot: Option<Arc<Bot>>,
}

impl Source for MessageSource<'_> {
    fn bot(&self) -> Option<&Bot> {
        self.bot.as_deref()
    }

    fn guild_id(&self) -> Option<&str> {
        self.message.guild_id.as_deref()
    }

    fn channel_id(&self) -> Option<&str> {
        Some(&self.message.channel_id)
    }

    fn message(&self) -> Option<&Message> {
        Some(self.message)
    }

    fn author(&self) -> Option<&User> {
        Some(&self.message.author)
    }
}

impl ComponentManager {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ComponentManager>> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> Vec<Arc<ComponentManager>> {
        self.state
            .lock()
            .children
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Every component visible to this manager, by identifier.
    pub fn components(&self) -> HashMap<String, Arc<ComponentType>> {
        self.state.lock().components.clone()
    }

    pub fn component(&self, identifier: &str) -> Option<Arc<ComponentType>> {
        self.state.lock().components.get(identifier).cloned()
    }

    /// The registered type of `T`, if `T` is visible to this manager.
    pub fn component_type<T: 'static>(&self) -> Option<Arc<ComponentType>> {
        self.component_type_of(TypeId::of::<T>())
    }

    fn component_type_of(&self, type_id: TypeId) -> Option<Arc<ComponentType>> {
        let state = self.state.lock();
        let identifier = state.identifiers.get(&type_id)?;
        state.components.get(identifier).cloned()
    }

    pub fn registry(&self) -> &Arc<ParserRegistry> {
        &self.registry
    }

    pub fn counter(&self) -> u8 {
        self.state.lock().counter
    }

    pub fn root(&self) -> &ComponentManager {
        let mut manager = self;
        while let Some(parent) = &manager.parent {
            manager = parent;
        }
        manager
    }

    /// This manager followed by its parents, up to the root.
    pub fn ancestors(&self) -> Vec<&ComponentManager> {
        let mut out = vec![self];
        let mut manager = self;
        while let Some(parent) = &manager.parent {
            out.push(parent);
            manager = parent;
        }
        out
    }

    fn ancestors_arc(self: &Arc<Self>) -> Vec<Arc<ComponentManager>> {
        let mut out = vec![self.clone()];
        while let Some(parent) = out.last().and_then(|m| m.parent.clone()) {
            out.push(parent);
        }
        out
    }

    // -- settings ------------------------------------------------------------

    /// Whether custom ids get a count character, inherited if unset.
    pub fn count(&self) -> bool {
        let own = self.state.lock().count;
        match (own, &self.parent) {
            (Some(count), _) => count,
            (None, Some(parent)) => parent.count(),
            (None, None) => DEFAULT_COUNT,
        }
    }

    /// The custom id separator, inherited if unset.
    pub fn sep(&self) -> String {
        let own = self.state.lock().sep.clone();
        match (own, &self.parent) {
            (Some(sep), _) => sep,
            (None, Some(parent)) => parent.sep(),
            (None, None) => DEFAULT_SEP.to_string(),
        }
    }

    pub fn config(&self, config: ManagerConfig) {
        let mut state = self.state.lock();
        if let Some(count) = config.count {
            state.count = count;
        }
        if let Some(sep) = config.sep {
            state.sep = sep;
        }
    }

    /// The next count character, rotating through all 25.
    pub fn increment(&self) -> char {
        let mut state = self.state.lock();
        let count = state.counter;
        state.counter = (count + 1) % COUNT_CHARS;
        count_char(count)
    }

    // -- custom ids ----------------------------------------------------------

    /// Split a custom id into its bare identifier and its parameters.
    pub fn get_identifier(&self, custom_id: &str) -> (String, Vec<String>) {
        let sep = self.sep();
        let sep = if custom_id.contains(sep.as_str()) {
            sep.as_str()
        } else {
            FALLBACK_SEP
        };

        let mut parts = custom_id.split(sep);
        let mut identifier = parts.next().unwrap_or_default().to_string();
        let params = parts.map(str::to_string).collect();

        if self.count() && identifier.chars().last().is_some_and(is_count_char) {
            identifier.pop();
        }
        (identifier, params)
    }

    /// Encode `component` into a custom id.
    pub fn make_custom_id(&self, component: &dyn RichComponent) -> Result<String, ManagerError> {
        let component_type = self
            .component_type_of(component.as_any().type_id())
            .ok_or_else(|| ManagerError::NotRegistered(component.type_name().to_string()))?;

        let mut identifier = component_type.identifier.clone();
        if self.count() {
            identifier.push(self.increment());
        }

        let sep = self.sep();
        let params = component_type.factory.dump_params(component)?;
        let custom_id_fields = component_type
            .factory
            .fields()
            .iter()
            .filter(|f| f.is_custom_id());
        if let Some((field, value)) = custom_id_fields
            .zip(&params)
            .find(|(_, value)| value.contains(sep.as_str()))
        {
            return Err(ManagerError::SeparatorInField {
                field: field.name.to_string(),
                value: value.clone(),
                sep,
            });
        }

        let mut parts = Vec::with_capacity(params.len() + 1);
        parts.push(identifier);
        parts.extend(params);
        let custom_id = parts.join(&sep);

        let len = custom_id.chars().count();
        if len > CUSTOM_ID_MAX_LEN {
            return Err(ManagerError::CustomIdTooLong {
                custom_id,
                len,
                max: CUSTOM_ID_MAX_LEN,
            });
        }
        Ok(custom_id)
    }

    // -- registration --------------------------------------------------------

    /// Register `T` under its type name.
    pub fn register<T: ComponentSchema>(self: &Arc<Self>) -> Result<Arc<ComponentType>, ManagerError> {
        self.register_with::<T>(None)
    }

    /// Register `T` on this manager and every ancestor.
    ///
    /// Fails if the identifier is already taken, unless the existing
    /// registration comes from an earlier load of the same module.
    pub fn register_with<T: ComponentSchema>(
        self: &Arc<Self>,
        identifier: Option<&str>,
    ) -> Result<Arc<ComponentType>, ManagerError> {
        let type_name = std::any::type_name::<T>();
        let identifier = identifier.map_or_else(|| make_identifier(type_name), str::to_string);
        let module = self.modules.snapshot(module_of(type_name));

        if let Some(existing) = self.root().component(&identifier) {
            if !module.is_reload_of(&existing.module) {
                return Err(ManagerError::DuplicateIdentifier {
                    identifier,
                    original: existing.module.name.clone(),
                    duplicate: module.name,
                });
            }
        }

        let component_type = Arc::new(ComponentType {
            identifier: identifier.clone(),
            type_name,
            type_id: TypeId::of::<T>(),
            kind: T::KIND,
            module,
            factory: ComponentFactory::for_type::<T>(&self.registry)?,
            manager: Arc::downgrade(self),
        });

        for manager in self.ancestors() {
            let mut state = manager.state.lock();
            state
                .components
                .insert(identifier.clone(), component_type.clone());
            state.identifiers.insert(component_type.type_id, identifier.clone());
        }

        debug!(
            manager = %self.name,
            identifier = %identifier,
            component = type_name,
            "registered component"
        );
        Ok(component_type)
    }

    /// Remove `T` from its manager and every ancestor.
    pub fn deregister<T: 'static>(&self) -> Result<(), ManagerError> {
        let component_type = self
            .component_type::<T>()
            .ok_or_else(|| ManagerError::NotRegistered(std::any::type_name::<T>().to_string()))?;
        self.deregister_type(&component_type)
    }

    pub fn deregister_type(&self, component_type: &Arc<ComponentType>) -> Result<(), ManagerError> {
        let owner = component_type
            .manager()
            .ok_or_else(|| ManagerError::NotRegistered(component_type.type_name.to_string()))?;

        let identifier = &component_type.identifier;
        for manager in owner.ancestors() {
            let mut state = manager.state.lock();
            if state
                .components
                .get(identifier)
                .is_some_and(|registered| Arc::ptr_eq(registered, component_type))
            {
                state.components.remove(identifier);
                state.identifiers.remove(&component_type.type_id);
            }
        }

        debug!(
            manager = %owner.name,
            identifier = %identifier,
            "deregistered component"
        );
        Ok(())
    }

    // -- parsing -------------------------------------------------------------

    async fn resolve_raw(
        &self,
        raw: &Component,
        source: Option<&dyn Source>,
    ) -> Result<Option<(Arc<ComponentType>, Box<dyn RichComponent>)>, ManagerError> {
        let Some(custom_id) = raw.custom_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(None);
        };

        let (identifier, params) = self.get_identifier(custom_id);
        let Some(component_type) = self.component(&identifier) else {
            return Ok(None);
        };

        if !self.modules.is_active(&component_type.module) {
            warn!(
                manager = %self.name,
                identifier = %identifier,
                module = %component_type.module.name,
                "evicting component from unloaded module"
            );
            self.deregister_type(&component_type)?;
            return Ok(None);
        }

        let internal = component_type.factory.internal_values(raw);
        let component = component_type
            .factory
            .build_component(source, &params, internal)
            .await?;
        Ok(Some((component_type, component)))
    }

    /// Turn a raw Discord component into a rich component registered to this
    /// manager. `Ok(None)` means the component isn't one of ours.
    pub async fn parse_raw_component(
        &self,
        raw: &Component,
        source: Option<&dyn Source>,
    ) -> Result<Option<Box<dyn RichComponent>>, ManagerError> {
        Ok(self.resolve_raw(raw, source).await?.map(|(_, component)| component))
    }

    /// Parse the component an interaction came from.
    pub async fn parse_message_interaction(
        &self,
        ctx: &InteractionContext,
    ) -> Result<Option<Box<dyn RichComponent>>, ManagerError> {
        match ctx.interaction.component() {
            Some(raw) => self.parse_raw_component(&raw, Some(ctx)).await,
            None => Ok(None),
        }
    }

    /// Parse every component on `message`, row by row.
    ///
    /// When `ctx` has a component mid-invocation, its slot is returned as
    /// [`MessageComponent::Current`] instead of being parsed again.
    pub async fn parse_message_components(
        &self,
        message: &Message,
        ctx: Option<&InteractionContext>,
    ) -> Result<Vec<Vec<MessageComponent>>, ManagerError> {
        let fallback = MessageSource {
            message,
            bot: self.bot().ok(),
        };
        let source: &dyn Source = match ctx {
            Some(ctx) => ctx,
            None => &fallback,
        };

        let mut current = ctx.and_then(InteractionContext::current_component);
        let mut rows = Vec::with_capacity(message.components.len());

        for row in &message.components {
            let mut new_row = Vec::with_capacity(row.components.len());
            for raw in &row.components {
                if current.is_some() && raw.custom_id.as_deref() == current {
                    current = None;
                    new_row.push(MessageComponent::Current);
                    continue;
                }
                new_row.push(match self.parse_raw_component(raw, Some(source)).await? {
                    Some(rich) => MessageComponent::Rich(rich),
                    None => MessageComponent::Raw(raw.clone()),
                });
            }
            rows.push(new_row);
        }
        Ok(rows)
    }

    /// Turn parsed rows back into sendable action rows.
    ///
    /// `current` stands in for [`MessageComponent::Current`].
    pub fn finalise_components(
        &self,
        rows: &[Vec<MessageComponent>],
        current: Option<&dyn RichComponent>,
    ) -> Result<Vec<Component>, ManagerError> {
        rows.iter()
            .map(|row| {
                let components = row
                    .iter()
                    .map(|component| match component {
                        MessageComponent::Rich(rich) => self.as_ui_component(rich.as_ref()),
                        MessageComponent::Current => current
                            .ok_or(ManagerError::NoCurrentComponent)
                            .and_then(|c| self.as_ui_component(c)),
                        MessageComponent::Raw(raw) => Ok(raw.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(action_row(components))
            })
            .collect()
    }

    /// The sendable Discord component for `component`, with a fresh custom id.
    pub fn as_ui_component(&self, component: &dyn RichComponent) -> Result<Component, ManagerError> {
        let component_type = self
            .component_type_of(component.as_any().type_id())
            .ok_or_else(|| ManagerError::NotRegistered(component.type_name().to_string()))?;
        let custom_id = self.make_custom_id(component)?;
        Ok(component_type.to_ui_component(component, custom_id)?)
    }

    // -- dispatch ------------------------------------------------------------

    /// Handle an interaction if it belongs to a component visible to this
    /// manager.
    ///
    /// Returns `Ok(false)` if the component isn't ours. Errors raised by
    /// wrappers or the callback never escape; they go through the exception
    /// handlers instead. Only parsing failures are returned.
    pub async fn invoke_component(
        self: &Arc<Self>,
        ctx: &mut InteractionContext,
    ) -> Result<bool, ManagerError> {
        let Some(raw) = ctx.interaction.component() else {
            return Ok(false);
        };
        let Some((component_type, mut component)) = self.resolve_raw(&raw, Some(&*ctx)).await?
        else {
            return Ok(false);
        };
        let owner = component_type
            .manager()
            .ok_or_else(|| ManagerError::NotRegistered(component_type.type_name.to_string()))?;

        let managers = owner.ancestors_arc();
        let wrappers: Vec<_> = managers
            .iter()
            .rev()
            .filter_map(|m| {
                let wrapper = m.state.lock().callback_wrapper.clone()?;
                Some((m.clone(), wrapper))
            })
            .collect();

        debug!(
            manager = %owner.name,
            identifier = %component_type.identifier,
            "invoking component"
        );

        ctx.set_current_component(raw.custom_id.clone());
        let next = Next {
            wrappers: &wrappers,
            component: component.as_mut(),
            ctx: &mut *ctx,
        };
        let result = next.run().await;

        if let Err(error) = result {
            for manager in &managers {
                if manager.handle_exception(component.as_ref(), ctx, &error).await {
                    break;
                }
            }
        }
        ctx.set_current_component(None);
        Ok(true)
    }

    /// Offer `error` to this manager's exception handler.
    pub async fn handle_exception(
        &self,
        component: &dyn RichComponent,
        ctx: &mut InteractionContext,
        error: &BoxError,
    ) -> bool {
        let handler = self.state.lock().exception_handler.clone();
        match handler {
            Some(handler) => handler.handle(self, component, ctx, error).await,
            None => self.default_exception_handler(component, error),
        }
    }

    fn default_exception_handler(&self, component: &dyn RichComponent, error: &BoxError) -> bool {
        if self.parent.is_some() {
            return false;
        }
        error!(
            manager = %self.name,
            component = component.type_name(),
            error = %error,
            "unhandled exception in component callback"
        );
        true
    }

    pub fn as_callback_wrapper(&self, wrapper: impl CallbackWrapper + 'static) {
        self.state.lock().callback_wrapper = Some(Arc::new(wrapper));
    }

    pub fn as_exception_handler(&self, handler: impl ExceptionHandler + 'static) {
        self.state.lock().exception_handler = Some(Arc::new(handler));
    }

    // -- factory helpers -----------------------------------------------------

    fn lookup_kind(
        &self,
        identifier: &str,
        as_root: bool,
        expected: ComponentKind,
    ) -> Result<Arc<ComponentType>, ManagerError> {
        let manager = if as_root { self.root() } else { self };
        let component_type = manager
            .component(identifier)
            .ok_or_else(|| ManagerError::UnknownIdentifier(identifier.to_string()))?;

        if component_type.kind != expected {
            return Err(ManagerError::KindMismatch {
                identifier: identifier.to_string(),
                expected: expected.as_str(),
                actual: component_type.kind.as_str(),
                type_name: component_type.type_name.to_string(),
            });
        }
        Ok(component_type)
    }

    /// Build the button registered as `identifier`.
    ///
    /// `overrides` take precedence over `values`, which take precedence over
    /// the type's defaults.
    pub fn make_button(
        &self,
        identifier: &str,
        as_root: bool,
        overrides: ButtonOverrides,
        values: FieldValues,
    ) -> Result<Box<dyn RichComponent>, ManagerError> {
        let component_type = self.lookup_kind(identifier, as_root, ComponentKind::Button)?;
        let mut values = values;
        values.extend(overrides.into_values());
        Ok(component_type.factory.instantiate(values)?)
    }

    /// Build the select menu registered as `identifier`.
    pub fn make_select(
        &self,
        identifier: &str,
        as_root: bool,
        overrides: SelectOverrides,
        values: FieldValues,
    ) -> Result<Box<dyn RichComponent>, ManagerError> {
        let component_type = self.lookup_kind(identifier, as_root, ComponentKind::Select)?;
        let mut values = values;
        values.extend(overrides.into_values());
        Ok(component_type.factory.instantiate(values)?)
    }

    // -- bot binding ---------------------------------------------------------

    /// The bot this manager or its nearest bound ancestor is bound to.
    pub fn bot(&self) -> Result<Arc<Bot>, ManagerError> {
        if let Some(bot) = self.state.lock().bot.upgrade() {
            return Ok(bot);
        }
        match &self.parent {
            Some(parent) => parent.bot(),
            None => Err(ManagerError::NoBot(self.name.clone())),
        }
    }

    /// Listen for component interactions on `bot`.
    ///
    /// A manager may listen on several bots; [`bot`](Self::bot) reports the
    /// one bound last.
    pub fn add_to_bot(self: &Arc<Self>, bot: &Arc<Bot>) -> Result<(), ManagerError> {
        let mut state = self.state.lock();
        let bound = state
            .listeners
            .iter()
            .find(|(b, _)| is_bot(b, bot))
            .is_some_and(|(_, id)| bot.has_listener(COMPONENT_EVENT, *id));
        if bound {
            return Err(ManagerError::AlreadyBound(self.name.clone()));
        }

        // Drop bindings to this bot whose listener was removed elsewhere, and
        // bindings to bots that no longer exist.
        state
            .listeners
            .retain(|(b, _)| b.strong_count() > 0 && !is_bot(b, bot));

        let listener = Arc::new(ManagerListener(Arc::downgrade(self)));
        let id = bot.add_listener(COMPONENT_EVENT, listener);
        state.listeners.push((Arc::downgrade(bot), id));
        state.bot = Arc::downgrade(bot);
        debug!(manager = %self.name, "bound to bot");
        Ok(())
    }

    pub fn remove_from_bot(&self, bot: &Bot) -> Result<(), ManagerError> {
        let mut state = self.state.lock();
        let index = state
            .listeners
            .iter()
            .position(|(b, _)| is_bot(b, bot))
            .ok_or_else(|| ManagerError::NotBound(self.name.clone()))?;

        let (_, id) = state.listeners.swap_remove(index);
        if !bot.remove_listener(COMPONENT_EVENT, id) {
            return Err(ManagerError::NotBound(self.name.clone()));
        }
        debug!(manager = %self.name, "unbound from bot");
        Ok(())
    }
}

fn is_bot(bound: &Weak<Bot>, bot: &Bot) -> bool {
    std::ptr::eq(bound.as_ptr(), bot)
}

/// Forwards component interactions from the bot to a manager.
struct ManagerListener(Weak<ComponentManager>);

#[async_trait]
impl EventListener for ManagerListener {
    async fn on_event(&self, bot: &Arc<Bot>, interaction: &Interaction) {
        let Some(manager) = self.0.upgrade() else {
            return;
        };

        let mut ctx = InteractionContext::new(interaction.clone()).with_bot(bot.clone());
        match manager.invoke_component(&mut ctx).await {
            Ok(_) => {
                if let Some(response) = ctx.take_response() {
                    bot.record_response(&interaction.id, response);
                }
            }
            Err(e) => {
                warn!(
                    manager = %manager.name,
                    custom_id = ?interaction.custom_id(),
                    error = %e,
                    "failed to parse component interaction"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
