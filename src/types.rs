//! Typed representations of the Discord objects the component layer touches.
//!
//! These mirror the Discord API docs so gateway payloads can be deserialised
//! without touching `serde_json::Value` in the rest of the codebase. Only the
//! parts needed to route component interactions and resolve custom-id fields
//! are modelled.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Discord IDs are snowflakes transmitted as strings in JSON.
pub type Snowflake = String;

// ---------------------------------------------------------------------------
// Gateway payload (the envelope that wraps every WS message)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayPayload {
    pub op: u8,
    pub d: Option<serde_json::Value>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    pub discriminator: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    pub global_name: Option<String>,
}

impl User {
    /// `Username#Discriminator` or just `Username` for the new username system.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some("0") | None => self.username.clone(),
            Some(disc) => format!("{}#{}", self.username, disc),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum ChannelType {
    GuildText = 0,
    Dm = 1,
    GuildVoice = 2,
    GroupDm = 3,
    GuildCategory = 4,
    GuildAnnouncement = 5,
    AnnouncementThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    GuildStageVoice = 13,
    GuildDirectory = 14,
    GuildForum = 15,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub position: Option<i32>,
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub flags: u32,
    /// Action rows attached to the message.
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Message {
    /// Find a top-level or row-nested component by its custom id.
    pub fn find_component(&self, custom_id: &str) -> Option<&Component> {
        self.components.iter().find_map(|row| {
            if row.custom_id.as_deref() == Some(custom_id) {
                return Some(row);
            }
            row.components
                .iter()
                .find(|c| c.custom_id.as_deref() == Some(custom_id))
        })
    }
}

// ---------------------------------------------------------------------------
// Guild
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<GuildMember>,
}

impl Guild {
    /// Look up a cached member of this guild by user id.
    pub fn member(&self, user_id: &str) -> Option<&GuildMember> {
        self.members
            .iter()
            .find(|m| m.user.as_ref().is_some_and(|u| u.id == user_id))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GuildMember {
    pub user: Option<User>,
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    pub joined_at: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
}

// ---------------------------------------------------------------------------
// Interactions (buttons, select menus, modals)
// ---------------------------------------------------------------------------

/// Top-level interaction received via INTERACTION_CREATE.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub data: Option<InteractionData>,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub member: Option<GuildMember>,
    pub user: Option<User>,
    pub token: String,
    pub message: Option<Message>,
}

impl Interaction {
    /// Convenience: the user who triggered the interaction.
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    /// The developer-defined custom id of the component that was used.
    pub fn custom_id(&self) -> Option<&str> {
        self.data.as_ref()?.custom_id.as_deref()
    }

    /// The raw component this interaction originated from.
    ///
    /// Discord only sends the custom id and component type, so the full
    /// component is looked up on the attached message. If the message isn't
    /// available, a bare component carrying just those two values is
    /// returned.
    pub fn component(&self) -> Option<Component> {
        let data = self.data.as_ref()?;
        let custom_id = data.custom_id.as_deref()?;

        if let Some(found) = self
            .message
            .as_ref()
            .and_then(|m| m.find_component(custom_id))
        {
            return Some(found.clone());
        }

        let mut bare = Component::empty(data.component_type.unwrap_or(COMPONENT_BUTTON));
        bare.custom_id = Some(custom_id.to_string());
        Some(bare)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize_repr, Serialize_repr)]
#[repr(u8)]
pub enum InteractionType {
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    ApplicationCommandAutocomplete = 4,
    ModalSubmit = 5,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InteractionData {
    /// Command / component ID.
    pub id: Option<Snowflake>,
    pub name: Option<String>,
    /// For components: the developer-defined `custom_id`.
    pub custom_id: Option<String>,
    /// Component type (for MESSAGE_COMPONENT interactions).
    pub component_type: Option<u8>,
    /// Selected values from a select menu.
    #[serde(default)]
    pub values: Vec<String>,
    /// Modal submit components.
    #[serde(default)]
    pub components: Vec<Component>,
}

// ---------------------------------------------------------------------------
// Interaction responses (what we send back)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: InteractionCallbackType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionCallbackData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum InteractionCallbackType {
    Pong = 1,
    ChannelMessageWithSource = 4,
    DeferredChannelMessageWithSource = 5,
    DeferredUpdateMessage = 6,
    UpdateMessage = 7,
    ApplicationCommandAutocompleteResult = 8,
    Modal = 9,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionCallbackData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
}

// ---------------------------------------------------------------------------
// Components (buttons, select menus, action rows)
// ---------------------------------------------------------------------------

pub const COMPONENT_ACTION_ROW: u8 = 1;
pub const COMPONENT_BUTTON: u8 = 2;
pub const COMPONENT_STRING_SELECT: u8 = 3;

/// Button style used for buttons that don't set one.
pub const DEFAULT_BUTTON_STYLE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Component {
    /// 1 = ActionRow, 2 = Button, 3 = StringSelect, 4 = TextInput,
    /// 5 = UserSelect, 6 = RoleSelect, 7 = MentionableSelect, 8 = ChannelSelect
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Button style: 1=Primary, 2=Secondary, 3=Success, 4=Danger, 5=Link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_values: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<ComponentEmoji>,
}

impl Component {
    /// A component of the given kind with every optional field unset.
    pub fn empty(kind: u8) -> Self {
        Component {
            kind,
            custom_id: None,
            label: None,
            style: None,
            url: None,
            placeholder: None,
            min_values: None,
            max_values: None,
            options: Vec::new(),
            components: Vec::new(),
            disabled: None,
            emoji: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<ComponentEmoji>,
    #[serde(default)]
    pub default: bool,
}

impl SelectOption {
    /// An option whose label doubles as its value.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        SelectOption {
            value: label.clone(),
            label,
            description: None,
            emoji: None,
            default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ComponentEmoji {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

// ---------------------------------------------------------------------------
// Convenience builders for components
// ---------------------------------------------------------------------------

/// Build an Action Row wrapping other components.
pub fn action_row(components: Vec<Component>) -> Component {
    Component {
        components,
        ..Component::empty(COMPONENT_ACTION_ROW)
    }
}

/// Build a button component.
pub fn button(style: u8, label: impl Into<String>, custom_id: impl Into<String>) -> Component {
    Component {
        custom_id: Some(custom_id.into()),
        label: Some(label.into()),
        style: Some(style),
        ..Component::empty(COMPONENT_BUTTON)
    }
}

/// Build a string select menu component.
pub fn string_select(
    custom_id: impl Into<String>,
    placeholder: impl Into<String>,
    options: Vec<SelectOption>,
) -> Component {
    Component {
        custom_id: Some(custom_id.into()),
        placeholder: Some(placeholder.into()),
        min_values: Some(1),
        max_values: Some(1),
        options,
        ..Component::empty(COMPONENT_STRING_SELECT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_tokens, Token};

    fn make_test_user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "789",
            "username": "alice",
            "discriminator": "0001",
            "avatar": null,
            "global_name": null,
        }))
        .expect("valid user JSON")
    }

    #[test]
    fn user_tag_with_discriminator() {
        assert_eq!(make_test_user().tag(), "alice#0001");
    }

    #[test]
    fn user_tag_new_system() {
        let mut user = make_test_user();
        user.discriminator = Some("0".to_string());
        assert_eq!(user.tag(), "alice");
    }

    #[test]
    fn interaction_type_is_repr_encoded() {
        assert_tokens(&InteractionType::MessageComponent, &[Token::U8(3)]);
        assert_tokens(&InteractionType::ModalSubmit, &[Token::U8(5)]);
    }

    #[test]
    fn button_builder_sets_fields() {
        let b = button(1, "OK", "btn_ok");
        assert_eq!(b.kind, COMPONENT_BUTTON);
        assert_eq!(b.custom_id.as_deref(), Some("btn_ok"));
        assert_eq!(b.label.as_deref(), Some("OK"));
        assert_eq!(b.style, Some(1));
    }

    #[test]
    fn action_row_serialises_without_empty_fields() {
        let row = action_row(vec![button(1, "A", "a")]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], 1);
        assert!(json.get("custom_id").is_none());
        assert_eq!(json["components"][0]["custom_id"], "a");
    }

    #[test]
    fn string_select_builder_sets_options() {
        let s = string_select("pick", "Choose", vec![SelectOption::new("Rust")]);
        assert_eq!(s.kind, COMPONENT_STRING_SELECT);
        assert_eq!(s.options[0].value, "Rust");
    }

    #[test]
    fn interaction_component_found_on_message() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "10",
            "application_id": "11",
            "type": 3,
            "data": { "custom_id": "MyButton|5", "component_type": 2 },
            "guild_id": null,
            "channel_id": "2",
            "member": null,
            "user": make_test_user(),
            "token": "tok",
            "message": {
                "id": "1",
                "channel_id": "2",
                "guild_id": null,
                "author": make_test_user(),
                "timestamp": "2021-01-01T01:01:01+00:00",
                "edited_timestamp": null,
                "components": [action_row(vec![button(3, "Five", "MyButton|5")])],
            },
        }))
        .unwrap();

        let component = interaction.component().unwrap();
        assert_eq!(component.label.as_deref(), Some("Five"));
        assert_eq!(component.style, Some(3));
        assert_eq!(interaction.author().map(User::tag).as_deref(), Some("alice#0001"));
    }

    #[test]
    fn interaction_component_falls_back_to_bare() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "10",
            "application_id": "11",
            "type": 3,
            "data": { "custom_id": "Pick", "component_type": 3 },
            "guild_id": null,
            "channel_id": null,
            "member": null,
            "user": null,
            "token": "tok",
            "message": null,
        }))
        .unwrap();

        let component = interaction.component().unwrap();
        assert_eq!(component.kind, COMPONENT_STRING_SELECT);
        assert_eq!(component.custom_id.as_deref(), Some("Pick"));
        assert!(component.label.is_none());
    }
}
