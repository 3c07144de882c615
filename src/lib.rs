//! Interaction dispatch and reply-state engine for chat-platform bots.
//!
//! `switchboard` sits between a platform transport and application handler
//! code. It routes inbound interactions (slash commands and message
//! components) to registered handlers, enforces per-component permission
//! flags encoded in the component id, and manages time-boxed reply contexts —
//! scopes of component handlers bound to one sent message, cleaned up by a
//! janitor callback when they expire.
//!
//! The crate owns no I/O. Inbound events arrive as already-parsed
//! [`Interaction`](types::Interaction) values (or raw JSON via
//! [`Router::dispatch_raw`]); outbound replies leave through the
//! [`ReplyTransport`] trait, implemented by the embedding application.
//!
//! ```ignore
//! let router = Router::new(transport, RouterConfig::default());
//! router.register_command("roll", |replyable| {
//!     Box::pin(async move {
//!         replyable.reply(ReplyPayload::new().content("you rolled a 17")).await
//!     })
//! });
//! // per inbound event:
//! router.dispatch_raw(event).await?;
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod flags;
pub mod registry;
pub mod reply;
pub mod router;
pub mod transport;
pub mod types;

/// The error type handlers and transports return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use auth::{Access, DenyReason};
pub use config::{BotOwners, DenialTexts, RouterConfig};
pub use context::{
    DuplicateHandlerId, Janitor, ReplyContext, ReplyContextManager, ReplyScope, TimeoutPolicy,
};
pub use flags::AccessFlags;
pub use registry::{CommandHandler, ComponentHandler, HandlerFuture, HandlerRegistry, UiState};
pub use reply::{InteractiveReply, JanitorEdit, Replyable};
pub use router::{DispatchError, GuildMiddleware, MiddlewareKind, Router, UserMiddleware};
pub use transport::ReplyTransport;

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Router: Clone, Send, Sync);
    assert_impl_all!(HandlerRegistry: Clone, Send, Sync);
    assert_impl_all!(ReplyContextManager: Clone, Send, Sync);
    assert_impl_all!(Replyable: Clone, Send, Sync);
    assert_impl_all!(DispatchError: std::error::Error, Send, Sync);
}
