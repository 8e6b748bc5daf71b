//! The host bot: entity cache, event listeners and gateway intake.
//!
//! The bot owns the state sourced parsers resolve ids against and the
//! listener table component managers bind their dispatch entrypoint to.
//! Gateway payloads go in through [`Bot::handle_payload`], which keeps the
//! cache current and routes interactions to listeners by event name.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_lock::RwLock;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::events::{GatewayEvent, COMPONENT_EVENT, MODAL_EVENT};
use crate::types::*;

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Receives interactions for the event names it is registered under.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, bot: &Arc<Bot>, interaction: &Interaction);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerTable = HashMap<String, Vec<(ListenerId, Arc<dyn EventListener>)>>;

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Cache {
    users: HashMap<Snowflake, User>,
    guilds: HashMap<Snowflake, Guild>,
    channels: HashMap<Snowflake, Channel>,
    messages: HashMap<Snowflake, Message>,
}

pub struct Bot {
    cache: RwLock<Cache>,
    listeners: Mutex<ListenerTable>,
    next_listener: AtomicU64,
    /// The bot's own user (set on READY).
    user: Mutex<Option<User>>,
    /// Interaction responses produced by listeners, by interaction id.
    responses: Mutex<Vec<(Snowflake, InteractionResponse)>>,
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("user", &*self.user.lock())
            .field("events", &self.listeners.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Bot {
    fn default() -> Self {
        Bot {
            cache: RwLock::new(Cache::default()),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            user: Mutex::new(None),
            responses: Mutex::new(Vec::new()),
        }
    }
}

impl Bot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.lock().clone()
    }

    // -- cache ---------------------------------------------------------------

    pub async fn cache_user(&self, user: User) {
        self.cache.write().await.users.insert(user.id.clone(), user);
    }

    /// Cache a guild along with its channels and member users.
    pub async fn cache_guild(&self, guild: Guild) {
        let mut cache = self.cache.write().await;
        for channel in &guild.channels {
            let mut channel = channel.clone();
            channel.guild_id.get_or_insert_with(|| guild.id.clone());
            cache.channels.insert(channel.id.clone(), channel);
        }
        for user in guild.members.iter().filter_map(|m| m.user.as_ref()) {
            cache.users.insert(user.id.clone(), user.clone());
        }
        cache.guilds.insert(guild.id.clone(), guild);
    }

    pub async fn cache_channel(&self, channel: Channel) {
        self.cache.write().await.channels.insert(channel.id.clone(), channel);
    }

    pub async fn cache_message(&self, message: Message) {
        let mut cache = self.cache.write().await;
        cache
            .users
            .insert(message.author.id.clone(), message.author.clone());
        cache.messages.insert(message.id.clone(), message);
    }

    pub async fn user(&self, id: &str) -> Option<User> {
        self.cache.read().await.users.get(id).cloned()
    }

    pub async fn guild(&self, id: &str) -> Option<Guild> {
        self.cache.read().await.guilds.get(id).cloned()
    }

    pub async fn channel(&self, id: &str) -> Option<Channel> {
        self.cache.read().await.channels.get(id).cloned()
    }

    pub async fn message(&self, id: &str) -> Option<Message> {
        self.cache.read().await.messages.get(id).cloned()
    }

    // -- listeners -----------------------------------------------------------

    pub fn add_listener(&self, event: &str, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        debug!(event, listener = id.0, "listener added");
        id
    }

    /// Remove a listener. Returns whether it was registered under `event`.
    pub fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if removed {
            debug!(event, listener = id.0, "listener removed");
        }
        removed
    }

    pub fn has_listener(&self, event: &str, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .get(event)
            .is_some_and(|entries| entries.iter().any(|(existing, _)| *existing == id))
    }

    /// Call every listener of `event`, in registration order.
    pub async fn dispatch(self: &Arc<Self>, event: &str, interaction: &Interaction) {
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .get(event)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        trace!(event, listeners = listeners.len(), "dispatching");
        for listener in listeners {
            listener.on_event(self, interaction).await;
        }
    }

    // -- responses -----------------------------------------------------------

    pub fn record_response(&self, interaction_id: &str, response: InteractionResponse) {
        self.responses
            .lock()
            .push((interaction_id.to_string(), response));
    }

    /// Drain the responses recorded so far.
    pub fn take_responses(&self) -> Vec<(Snowflake, InteractionResponse)> {
        std::mem::take(&mut *self.responses.lock())
    }

    // -- gateway intake ------------------------------------------------------

    /// Handle one raw gateway payload.
    pub async fn handle_payload(self: &Arc<Self>, payload: GatewayPayload) {
        match GatewayEvent::from_payload(payload) {
            GatewayEvent::Ready(ready) => {
                info!(user = %ready.user.tag(), session = %ready.session_id, "bot ready");
                *self.user.lock() = Some(ready.user);
            }

            GatewayEvent::GuildCreate(guild) => {
                debug!(guild = %guild.id, name = %guild.name, "guild cached");
                self.cache_guild(guild).await;
            }

            GatewayEvent::MessageCreate(message) => {
                self.cache_message(message).await;
            }

            GatewayEvent::InteractionCreate(interaction) => {
                let event = match interaction.kind {
                    InteractionType::MessageComponent => COMPONENT_EVENT,
                    InteractionType::ModalSubmit => MODAL_EVENT,
                    other => {
                        trace!(kind = ?other, "ignoring interaction");
                        return;
                    }
                };
                if let Some(message) = &interaction.message {
                    self.cache_message(message.clone()).await;
                }
                self.dispatch(event, &interaction).await;
            }

            GatewayEvent::Unknown {
                event_name, op, ..
            } => {
                trace!(event = ?event_name, op, "unhandled gateway event");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures_lite::future::block_on;
    use serde_json::json;

    pub(crate) fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            username: name.to_string(),
            discriminator: Some("0".to_string()),
            avatar: None,
            bot: false,
            global_name: None,
        }
    }

    pub(crate) fn guild(id: &str, name: &str) -> Guild {
        Guild {
            id: id.to_string(),
            name: name.to_string(),
            icon: None,
            owner_id: None,
            channels: Vec::new(),
            members: Vec::new(),
        }
    }

    pub(crate) fn channel(id: &str, guild_id: Option<&str>) -> Channel {
        Channel {
            id: id.to_string(),
            kind: ChannelType::GuildText,
            guild_id: guild_id.map(str::to_string),
            name: None,
            topic: None,
            position: None,
            parent_id: None,
            nsfw: false,
        }
    }

    pub(crate) fn member(user: User) -> GuildMember {
        GuildMember {
            user: Some(user),
            nick: None,
            roles: Vec::new(),
            joined_at: None,
            deaf: false,
            mute: false,
        }
    }

    /// A component interaction for `custom_id`, optionally on a message.
    pub(crate) fn component_interaction(custom_id: &str, message: Option<Message>) -> Interaction {
        serde_json::from_value(json!({
            "id": "900",
            "application_id": "901",
            "type": 3,
            "data": { "custom_id": custom_id, "component_type": 2 },
            "guild_id": null,
            "channel_id": "20",
            "member": null,
            "user": user("7", "ferris"),
            "token": "tok",
            "message": message,
        }))
        .expect("valid interaction JSON")
    }

    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl EventListener for Recorder {
        async fn on_event(&self, _bot: &Arc<Bot>, interaction: &Interaction) {
            let id = interaction.custom_id().unwrap_or_default().to_string();
            self.0.lock().push(id);
        }
    }

    #[test]
    fn listeners_are_added_and_removed() {
        let bot = Bot::new();
        let id = bot.add_listener(COMPONENT_EVENT, Arc::new(Recorder(Mutex::new(Vec::new()))));
        assert!(bot.has_listener(COMPONENT_EVENT, id));
        assert!(!bot.has_listener(MODAL_EVENT, id));
        assert!(bot.remove_listener(COMPONENT_EVENT, id));
        assert!(!bot.remove_listener(COMPONENT_EVENT, id));
    }

    #[test]
    fn component_interactions_reach_listeners() {
        let bot = Arc::new(Bot::new());
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        bot.add_listener(COMPONENT_EVENT, recorder.clone());

        let payload = GatewayPayload {
            op: 0,
            d: Some(serde_json::to_value(component_interaction("Roll|6", None)).unwrap()),
            s: Some(3),
            t: Some("INTERACTION_CREATE".to_string()),
        };
        block_on(bot.handle_payload(payload));
        assert_eq!(*recorder.0.lock(), ["Roll|6"]);
    }

    #[test]
    fn guild_create_fills_cache() {
        let bot = Arc::new(Bot::new());
        let mut home = guild("10", "Home");
        home.channels.push(channel("20", None));
        home.members.push(member(user("7", "ferris")));

        block_on(bot.handle_payload(GatewayPayload {
            op: 0,
            d: Some(serde_json::to_value(&home).unwrap()),
            s: Some(1),
            t: Some("GUILD_CREATE".to_string()),
        }));

        let channel = block_on(bot.channel("20")).unwrap();
        assert_eq!(channel.guild_id.as_deref(), Some("10"));
        assert_eq!(block_on(bot.user("7")).unwrap().username, "ferris");
        assert_eq!(block_on(bot.guild("10")).unwrap().name, "Home");
    }

    #[test]
    fn responses_drain() {
        let bot = Bot::new();
        bot.record_response(
            "1",
            InteractionResponse {
                kind: InteractionCallbackType::DeferredUpdateMessage,
                data: None,
            },
        );
        assert_eq!(bot.take_responses().len(), 1);
        assert!(bot.take_responses().is_empty());
    }

    static_assertions::assert_impl_all!(Bot: Send, Sync);
}
