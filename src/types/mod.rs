//! Platform data types.
//!
//! A deliberately focused model of the chat platform's interaction wire
//! shapes: typed snowflake ids, the inbound interaction envelope, permission
//! bits, and the outbound response payloads. Only the fields the dispatch
//! engine reads or writes are modeled; everything else stays with the
//! embedding application's own client types.

/// Type-safe ids with marker types.
pub mod id;

/// The inbound interaction envelope and its data variants.
pub mod interaction;

/// Guild permission bits.
pub mod permissions;

/// Outbound responses, reply payloads, embeds, and components.
pub mod response;

// ---------------------------------------------------------------------------
// Convenience re-exports
// ---------------------------------------------------------------------------

pub use self::id::{
    ApplicationMarker, GuildMarker, Id, InteractionMarker, MessageMarker, UserMarker,
};
pub use self::interaction::{
    CommandData, CommandDataOption, CommandOptionValue, ComponentData, Interaction,
    InteractionData, InteractionType, Member, MessageInteractionRef, MessageRef, User,
};
pub use self::permissions::Permissions;
pub use self::response::{
    disable_components, Component, ComponentType, Embed, EmbedFooter, EmbedImage,
    InteractionCallbackType, InteractionResponse, ReplyPayload, ResponseFlags, SelectOption,
};
