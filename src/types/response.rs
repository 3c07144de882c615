//! Outbound reply shapes: interaction responses, reply payloads, and the
//! minimal embed/component types needed to describe them.
//!
//! [`ReplyPayload`] is the single payload type handlers and UI states produce.
//! Besides the raw wire fields it carries a few convenience fields (`title`,
//! `description`, `footer`, `image`, `color`) that are folded into a
//! synthesized embed by [`ReplyPayload::normalized`] right before sending, so
//! simple handlers never have to build an [`Embed`] by hand.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_repr::{Deserialize_repr, Serialize_repr};

// ---------------------------------------------------------------------------
// Interaction response envelope
// ---------------------------------------------------------------------------

/// An interaction response sent back to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: InteractionCallbackType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ReplyPayload>,
}

impl InteractionResponse {
    /// A response of the given kind with no data, used for deferred
    /// acknowledgements.
    pub fn deferred(kind: InteractionCallbackType) -> Self {
        Self { kind, data: None }
    }

    /// A `CHANNEL_MESSAGE_WITH_SOURCE` response carrying `payload`.
    pub fn message(payload: ReplyPayload) -> Self {
        Self {
            kind: InteractionCallbackType::ChannelMessageWithSource,
            data: Some(payload.normalized()),
        }
    }

    /// An `UPDATE_MESSAGE` response carrying `payload`.
    pub fn update(payload: ReplyPayload) -> Self {
        Self {
            kind: InteractionCallbackType::UpdateMessage,
            data: Some(payload.normalized()),
        }
    }
}

/// The type of callback for an interaction response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum InteractionCallbackType {
    Pong = 1,
    ChannelMessageWithSource = 4,
    DeferredChannelMessageWithSource = 5,
    DeferredUpdateMessage = 6,
    UpdateMessage = 7,
}

// ---------------------------------------------------------------------------
// Response flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Flags on an outbound reply.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResponseFlags: u32 {
        /// Only the invoking user can see the reply.
        const EPHEMERAL = 1 << 6;
    }
}

impl Default for ResponseFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for ResponseFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

struct ResponseFlagsVisitor;

impl<'de> Visitor<'de> for ResponseFlagsVisitor {
    type Value = ResponseFlags;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("response flags as an integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ResponseFlags::from_bits_retain(v as u32))
    }
}

impl<'de> Deserialize<'de> for ResponseFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_u64(ResponseFlagsVisitor)
    }
}

// ---------------------------------------------------------------------------
// Embeds (minimal)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
}

// ---------------------------------------------------------------------------
// Components (minimal, permissive)
// ---------------------------------------------------------------------------

/// The type of a message component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ComponentType {
    ActionRow = 1,
    Button = 2,
    StringSelect = 3,
    TextInput = 4,
    UserSelect = 5,
    RoleSelect = 6,
    MentionableSelect = 7,
    ChannelSelect = 8,
    #[serde(other)]
    Unknown = 0,
}

/// A message component in its wire shape.
///
/// Modeled as one permissive struct rather than a per-type enum: the engine
/// never constructs component trees, it only re-emits what the application
/// sent (flipping `disabled` for the janitor's disable operation), so a
/// lossless pass-through representation is what's needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: ComponentType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

/// Mark every interactive component in `components` as disabled, recursing
/// into action rows.
pub fn disable_components(components: &mut [Component]) {
    for component in components {
        if component.kind != ComponentType::ActionRow {
            component.disabled = Some(true);
        }
        disable_components(&mut component.components);
    }
}

// ---------------------------------------------------------------------------
// Reply payload
// ---------------------------------------------------------------------------

/// The payload of a reply, as produced by handlers and UI states.
///
/// Built with chained setters:
///
/// ```ignore
/// let payload = ReplyPayload::new()
///     .content("Done!")
///     .ephemeral();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<ResponseFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,

    // Convenience fields, folded into an embed by `normalized`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,

    /// Localisation key/value context, consumed by the embedding application.
    /// Never serialized to the platform.
    #[serde(skip)]
    pub context: Option<HashMap<String, String>>,
}

impl ReplyPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, text: impl Into<String>) -> Self {
        self.content = Some(text.into());
        self
    }

    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Mark the reply as visible only to the invoking user.
    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(self.flags.unwrap_or_default() | ResponseFlags::EPHEMERAL);
        self
    }

    /// Append a component row.
    pub fn component_row(mut self, row: Component) -> Self {
        self.components.get_or_insert_with(Vec::new).push(row);
        self
    }

    /// Attach a localisation context entry.
    pub fn context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Fold the convenience fields into a synthesized embed, producing a
    /// wire-ready payload. A no-op when none of them are set.
    pub fn normalized(mut self) -> Self {
        if self.title.is_none()
            && self.description.is_none()
            && self.footer.is_none()
            && self.image.is_none()
            && self.color.is_none()
        {
            return self;
        }

        let embed = Embed {
            title: self.title.take(),
            description: self.description.take(),
            color: self.color.take(),
            footer: self.footer.take().map(|text| EmbedFooter { text }),
            image: self.image.take().map(|url| EmbedImage { url }),
        };
        self.embeds.get_or_insert_with(Vec::new).push(embed);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_type_roundtrip() {
        let ty = InteractionCallbackType::DeferredUpdateMessage;
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "6");
        let parsed: InteractionCallbackType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ty);
    }

    #[test]
    fn payload_builder_sets_fields() {
        let payload = ReplyPayload::new().content("hi").ephemeral();
        assert_eq!(payload.content.as_deref(), Some("hi"));
        assert_eq!(payload.flags, Some(ResponseFlags::EPHEMERAL));
    }

    #[test]
    fn payload_optional_fields_absent_in_json() {
        let json = serde_json::to_string(&ReplyPayload::new().content("x")).unwrap();
        assert!(json.contains("\"content\":\"x\""));
        assert!(!json.contains("embeds"));
        assert!(!json.contains("components"));
        assert!(!json.contains("flags"));
    }

    #[test]
    fn normalized_folds_convenience_fields_into_embed() {
        let payload = ReplyPayload::new()
            .title("Nope!")
            .description("You cannot do this.")
            .normalized();

        assert!(payload.title.is_none());
        assert!(payload.description.is_none());
        let embeds = payload.embeds.unwrap();
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0].title.as_deref(), Some("Nope!"));
        assert_eq!(embeds[0].description.as_deref(), Some("You cannot do this."));
    }

    #[test]
    fn normalized_is_noop_without_convenience_fields() {
        let payload = ReplyPayload::new().content("plain").normalized();
        assert!(payload.embeds.is_none());
    }

    #[test]
    fn context_never_serializes() {
        let payload = ReplyPayload::new()
            .content("x")
            .context_entry("command", "/roll");
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("command"));
    }

    #[test]
    fn disable_components_recurses_into_rows() {
        let mut components = vec![Component {
            kind: ComponentType::ActionRow,
            components: vec![
                Component {
                    kind: ComponentType::Button,
                    components: vec![],
                    custom_id: Some("confirm".into()),
                    label: Some("Confirm".into()),
                    style: Some(1),
                    disabled: None,
                    placeholder: None,
                    url: None,
                    options: None,
                },
                Component {
                    kind: ComponentType::StringSelect,
                    components: vec![],
                    custom_id: Some("pick".into()),
                    label: None,
                    style: None,
                    disabled: Some(false),
                    placeholder: Some("Pick one".into()),
                    url: None,
                    options: Some(vec![]),
                },
            ],
            custom_id: None,
            label: None,
            style: None,
            disabled: None,
            placeholder: None,
            url: None,
            options: None,
        }];

        disable_components(&mut components);

        assert!(components[0].disabled.is_none(), "rows stay untouched");
        assert_eq!(components[0].components[0].disabled, Some(true));
        assert_eq!(components[0].components[1].disabled, Some(true));
    }

    #[test]
    fn unknown_component_type_deserializes() {
        let ty: ComponentType = serde_json::from_str("99").unwrap();
        assert_eq!(ty, ComponentType::Unknown);
    }
}
