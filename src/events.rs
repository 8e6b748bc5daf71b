//! Typed gateway events.
//!
//! Raw dispatch payloads are deserialised into this enum so the bot can
//! pattern-match on strongly-typed data. Only the events the component layer
//! reacts to get their own variant.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::types::*;

/// Listener event fired for button and select interactions.
pub const COMPONENT_EVENT: &str = "on_message_interaction";

/// Listener event fired for modal submits.
pub const MODAL_EVENT: &str = "on_modal_submit";

/// Payload of the READY dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    pub user: User,
    pub session_id: String,
}

/// A fully-parsed event coming off the Discord gateway.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// We've identified; carries the bot's own user.
    Ready(ReadyEvent),

    /// Full guild object, sent lazily after READY.
    GuildCreate(Guild),

    MessageCreate(Message),

    /// A slash command, component interaction or modal submit.
    InteractionCreate(Interaction),

    /// Anything without a typed variant, with its raw data.
    Unknown {
        event_name: Option<String>,
        op: u8,
        data: Option<serde_json::Value>,
    },
}

impl GatewayEvent {
    /// Convert a raw [`GatewayPayload`] into a typed event.
    ///
    /// This never fails; unrecognised or malformed events become
    /// [`GatewayEvent::Unknown`].
    pub fn from_payload(payload: GatewayPayload) -> Self {
        let (0, Some(name), Some(data)) = (payload.op, payload.t.as_deref(), payload.d.as_ref())
        else {
            return GatewayEvent::Unknown {
                event_name: payload.t,
                op: payload.op,
                data: payload.d,
            };
        };

        let parsed = match name {
            "READY" => parse(name, data).map(GatewayEvent::Ready),
            "GUILD_CREATE" => parse(name, data).map(GatewayEvent::GuildCreate),
            "MESSAGE_CREATE" => parse(name, data).map(GatewayEvent::MessageCreate),
            "INTERACTION_CREATE" => parse(name, data).map(GatewayEvent::InteractionCreate),
            _ => None,
        };

        parsed.unwrap_or(GatewayEvent::Unknown {
            event_name: payload.t,
            op: payload.op,
            data: payload.d,
        })
    }

    /// The dispatch name, if this is a dispatch event.
    pub fn name(&self) -> Option<&str> {
        match self {
            GatewayEvent::Ready(_) => Some("READY"),
            GatewayEvent::GuildCreate(_) => Some("GUILD_CREATE"),
            GatewayEvent::MessageCreate(_) => Some("MESSAGE_CREATE"),
            GatewayEvent::InteractionCreate(_) => Some("INTERACTION_CREATE"),
            GatewayEvent::Unknown { event_name, .. } => event_name.as_deref(),
        }
    }
}

fn parse<T: DeserializeOwned>(event: &str, data: &serde_json::Value) -> Option<T> {
    match T::deserialize(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(event, error = %e, "failed to parse gateway payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatch(t: &str, d: serde_json::Value) -> GatewayPayload {
        GatewayPayload {
            op: 0,
            d: Some(d),
            s: Some(1),
            t: Some(t.to_string()),
        }
    }

    #[test]
    fn ready_is_typed() {
        let event = GatewayEvent::from_payload(dispatch(
            "READY",
            json!({
                "user": { "id": "1", "username": "bot", "discriminator": "0", "avatar": null, "bot": true, "global_name": null },
                "session_id": "abc",
            }),
        ));
        match event {
            GatewayEvent::Ready(ready) => {
                assert_eq!(ready.session_id, "abc");
                assert!(ready.user.bot);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_payload_becomes_unknown() {
        let event = GatewayEvent::from_payload(dispatch("GUILD_CREATE", json!({ "id": 5 })));
        assert!(matches!(event, GatewayEvent::Unknown { op: 0, .. }));
        assert_eq!(event.name(), Some("GUILD_CREATE"));
    }

    #[test]
    fn non_dispatch_ops_are_unknown() {
        let event = GatewayEvent::from_payload(GatewayPayload {
            op: 11,
            d: None,
            s: None,
            t: None,
        });
        assert!(matches!(event, GatewayEvent::Unknown { op: 11, event_name: None, .. }));
    }

    #[test]
    fn interaction_create_is_typed() {
        let event = GatewayEvent::from_payload(dispatch(
            "INTERACTION_CREATE",
            json!({
                "id": "10",
                "application_id": "11",
                "type": 3,
                "data": { "custom_id": "Roll|6", "component_type": 2 },
                "guild_id": null,
                "channel_id": "2",
                "member": null,
                "user": null,
                "token": "tok",
                "message": null,
            }),
        ));
        match event {
            GatewayEvent::InteractionCreate(interaction) => {
                assert_eq!(interaction.custom_id(), Some("Roll|6"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
