//! The inbound interaction envelope.
//!
//! Constructed by the transport adapter from a raw platform payload, an
//! [`Interaction`] lives for the duration of one dispatch. The router enriches
//! it in place (guild/user context, normalized actor, decoded component
//! flags, materialized options) before handing it to handlers behind an
//! `Arc`, immutable from then on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::flags::AccessFlags;
use crate::types::id::{
    ApplicationMarker, GuildMarker, Id, InteractionMarker, MessageMarker, UserMarker,
};
use crate::types::permissions::Permissions;
use crate::types::response::Component;

// ---------------------------------------------------------------------------
// Interaction type
// ---------------------------------------------------------------------------

/// The wire type of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum InteractionType {
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    ApplicationCommandAutocomplete = 4,
    ModalSubmit = 5,
    /// A type this crate doesn't know yet. Kept so a new platform type never
    /// fails deserialization.
    #[serde(other)]
    Unknown = 0,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One inbound interaction event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Id<InteractionMarker>,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Id<ApplicationMarker>>,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Id<GuildMarker>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    /// The message this interaction's component is attached to, for component
    /// interactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,

    // Enrichment scratch, attached by the router before dispatch.
    #[serde(skip)]
    pub guild_data: Option<serde_json::Value>,
    #[serde(skip)]
    pub user_data: Option<serde_json::Value>,
}

impl Interaction {
    /// The user who triggered the interaction.
    ///
    /// In a guild context the user is nested inside `member`; in a DM it is
    /// at the top level. This checks both (the router also normalizes the
    /// top-level field early in dispatch).
    pub fn actor(&self) -> Option<&User> {
        self.user
            .as_ref()
            .or_else(|| self.member.as_ref().and_then(|m| m.user.as_ref()))
    }

    /// The id of the interaction that originally produced the governed
    /// message, for component interactions.
    pub fn originating_interaction_id(&self) -> Option<Id<InteractionMarker>> {
        self.message
            .as_ref()
            .and_then(|m| m.interaction.as_ref())
            .map(|mi| mi.id)
    }

    /// The user who invoked the command that produced the governed message.
    pub fn original_invoker(&self) -> Option<Id<UserMarker>> {
        self.message
            .as_ref()
            .and_then(|m| m.interaction.as_ref())
            .and_then(|mi| mi.user.as_ref())
            .map(|u| u.id)
    }
}

// ---------------------------------------------------------------------------
// Data variants
// ---------------------------------------------------------------------------

/// The `data` field of an interaction, shaped by the interaction type.
///
/// Untagged: command payloads carry `name`, component payloads carry
/// `custom_id`, so the variants are unambiguous on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionData {
    ApplicationCommand(CommandData),
    MessageComponent(ComponentData),
}

impl InteractionData {
    pub fn as_command(&self) -> Option<&CommandData> {
        match self {
            Self::ApplicationCommand(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentData> {
        match self {
            Self::MessageComponent(data) => Some(data),
            _ => None,
        }
    }
}

/// Payload of a slash-command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandDataOption>,
    /// Options materialized into a name → value lookup by the router.
    #[serde(skip)]
    pub options_by_name: HashMap<String, CommandOptionValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDataOption {
    pub name: String,
    pub value: CommandOptionValue,
}

/// A command option value. Untagged: the wire carries plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandOptionValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

/// Payload of a component activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentData {
    /// The component's custom id. The router strips the encoded access-flag
    /// suffix in place, leaving the true id.
    pub custom_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Access flags decoded from the raw custom id by the router.
    #[serde(skip)]
    pub flags: AccessFlags,
}

// ---------------------------------------------------------------------------
// Originating message
// ---------------------------------------------------------------------------

/// Reference to the message a component interaction is attached to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: Id<MessageMarker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    /// Present when the message itself was created by an interaction: which
    /// command, and who ran it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<MessageInteractionRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInteractionRef {
    pub id: Id<InteractionMarker>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Id<UserMarker>,
    #[serde(rename = "username")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Guild member data attached to interactions fired inside a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens, Token};

    #[test]
    fn interaction_type_from_wire_value() {
        assert_de_tokens(&InteractionType::ApplicationCommand, &[Token::U8(2)]);
        assert_de_tokens(&InteractionType::MessageComponent, &[Token::U8(3)]);
        assert_de_tokens(&InteractionType::ApplicationCommandAutocomplete, &[
            Token::U8(4),
        ]);
    }

    #[test]
    fn unknown_interaction_type_does_not_fail() {
        assert_de_tokens(&InteractionType::Unknown, &[Token::U8(42)]);
    }

    #[test]
    fn command_interaction_deserializes() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "100",
            "type": 2,
            "token": "tok",
            "guild_id": "200",
            "member": {
                "user": { "id": "300", "username": "alice" },
                "permissions": "8"
            },
            "data": {
                "name": "roll",
                "options": [{ "name": "sides", "value": 20 }]
            }
        }))
        .expect("valid command interaction");

        assert_eq!(interaction.kind, InteractionType::ApplicationCommand);
        let data = interaction.data.as_ref().unwrap().as_command().unwrap();
        assert_eq!(data.name, "roll");
        assert_eq!(data.options.len(), 1);
        assert_eq!(
            data.options[0].value,
            CommandOptionValue::Integer(20),
        );
        assert!(interaction.actor().is_some());
        assert_eq!(interaction.actor().unwrap().id.get(), 300);
    }

    #[test]
    fn component_interaction_deserializes() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "101",
            "type": 3,
            "token": "tok",
            "user": { "id": "300", "username": "alice" },
            "data": { "custom_id": "confirm-e", "values": [] },
            "message": {
                "id": "400",
                "interaction": {
                    "id": "99",
                    "name": "roll",
                    "user": { "id": "301", "username": "bob" }
                }
            }
        }))
        .expect("valid component interaction");

        let data = interaction.data.as_ref().unwrap().as_component().unwrap();
        assert_eq!(data.custom_id, "confirm-e");
        assert!(data.flags.is_empty(), "flags decoded only by the router");
        assert_eq!(
            interaction.originating_interaction_id().map(Id::get),
            Some(99)
        );
        assert_eq!(interaction.original_invoker().map(Id::get), Some(301));
    }

    #[test]
    fn actor_prefers_top_level_user() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "1",
            "type": 2,
            "token": "t",
            "user": { "id": "10", "username": "top" },
            "member": { "user": { "id": "20", "username": "nested" } }
        }))
        .unwrap();
        assert_eq!(interaction.actor().unwrap().id.get(), 10);
    }

    #[test]
    fn actor_falls_back_to_member_user() {
        let interaction: Interaction = serde_json::from_value(serde_json::json!({
            "id": "1",
            "type": 2,
            "token": "t",
            "member": { "user": { "id": "20", "username": "nested" } }
        }))
        .unwrap();
        assert_eq!(interaction.actor().unwrap().id.get(), 20);
    }

    #[test]
    fn option_values_distinguish_scalar_kinds() {
        let options: Vec<CommandDataOption> = serde_json::from_value(serde_json::json!([
            { "name": "flag", "value": true },
            { "name": "count", "value": 3 },
            { "name": "ratio", "value": 0.5 },
            { "name": "word", "value": "hi" }
        ]))
        .unwrap();

        assert_eq!(options[0].value, CommandOptionValue::Boolean(true));
        assert_eq!(options[1].value, CommandOptionValue::Integer(3));
        assert_eq!(options[2].value, CommandOptionValue::Number(0.5));
        assert_eq!(options[3].value, CommandOptionValue::String("hi".into()));
    }
}
