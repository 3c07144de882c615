//! The dispatch entry point.
//!
//! A [`Router`] owns the handler registry, the reply-context manager, and the
//! configuration, and turns one inbound interaction into at most one initial
//! response. Dispatch order: enrichment middleware, actor normalization, then
//! the type branch — commands resolve through the command registry with a
//! `"<name>_main"` UI-state fallback, components run the authorization
//! evaluator and then resolve scoped context handlers before the global
//! registry and a UI-state fallback of their own.
//!
//! The router never retries a send. Every failure path is catch, best-effort
//! notify, log: a fault in handler code must not crash dispatch, and a
//! second send attempt could double-answer the interaction. The one
//! exception is enrichment middleware, whose failure propagates out of
//! [`Router::dispatch`] — context data is a hard prerequisite for the
//! handlers that requested it.

use std::fmt;
use std::sync::Arc;

use futures_lite::future::Boxed;
use tracing::{debug, warn};

use crate::auth::{self, Access, DenyReason};
use crate::config::RouterConfig;
use crate::context::ReplyContextManager;
use crate::flags;
use crate::registry::{HandlerFuture, HandlerRegistry};
use crate::reply::Replyable;
use crate::transport::ReplyTransport;
use crate::types::id::{GuildMarker, Id, UserMarker};
use crate::types::interaction::{Interaction, InteractionData, InteractionType};
use crate::types::response::ReplyPayload;
use crate::BoxError;

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Fetches guild context for an interaction, called at most once per
/// dispatch. The result lands in `Interaction::guild_data`.
pub type GuildMiddleware =
    Arc<dyn Fn(Id<GuildMarker>) -> Boxed<Result<serde_json::Value, BoxError>> + Send + Sync>;

/// Fetches user context for an interaction, called at most once per dispatch.
pub type UserMiddleware =
    Arc<dyn Fn(Id<UserMarker>) -> Boxed<Result<serde_json::Value, BoxError>> + Send + Sync>;

/// Which enrichment middleware failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareKind {
    Guild,
    User,
}

impl fmt::Display for MiddlewareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Guild => "guild",
            Self::User => "user",
        })
    }
}

/// Errors that escape [`Router::dispatch`]. Everything else is handled
/// inside the router.
#[derive(Debug)]
pub enum DispatchError {
    /// The raw event did not parse as an interaction.
    Decode(serde_json::Error),
    /// An enrichment middleware failed.
    Middleware {
        kind: MiddlewareKind,
        source: BoxError,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "malformed interaction payload: {err}"),
            Self::Middleware { kind, source } => {
                write!(f, "{kind} middleware failed: {source}")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Middleware { source, .. } => Some(&**source),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// The interaction dispatcher. Cheap to clone; clones share the registry,
/// the context index, and the configuration.
#[derive(Clone)]
pub struct Router {
    transport: Arc<dyn ReplyTransport>,
    registry: HandlerRegistry,
    contexts: ReplyContextManager,
    config: Arc<RouterConfig>,
    guild_middleware: Option<GuildMiddleware>,
    user_middleware: Option<UserMiddleware>,
}

impl Router {
    pub fn new(transport: Arc<dyn ReplyTransport>, config: RouterConfig) -> Self {
        let registry = HandlerRegistry::new();
        let contexts = ReplyContextManager::new(transport.clone(), registry.clone());
        Self {
            transport,
            registry,
            contexts,
            config: Arc::new(config),
            guild_middleware: None,
            user_middleware: None,
        }
    }

    pub fn with_guild_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(Id<GuildMarker>) -> Boxed<Result<serde_json::Value, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.guild_middleware = Some(Arc::new(middleware));
        self
    }

    pub fn with_user_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(Id<UserMarker>) -> Boxed<Result<serde_json::Value, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.user_middleware = Some(Arc::new(middleware));
        self
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn contexts(&self) -> &ReplyContextManager {
        &self.contexts
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register a command handler. See [`HandlerRegistry::register_command`].
    pub fn register_command<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Replyable) -> HandlerFuture + Send + Sync + 'static,
    {
        self.registry.register_command(name, handler);
    }

    /// Register a global component handler.
    pub fn register_component<F>(&self, id: impl Into<String>, handler: F)
    where
        F: Fn(Replyable) -> HandlerFuture + Send + Sync + 'static,
    {
        self.registry.register_component(id, handler);
    }

    /// Register a UI-state producer.
    pub fn register_ui_state<F>(&self, name: impl Into<String>, state: F)
    where
        F: Fn(Arc<Interaction>, Vec<String>) -> Boxed<Result<ReplyPayload, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register_ui_state(name, state);
    }

    /// Parse a raw event payload and dispatch it.
    pub async fn dispatch_raw(&self, raw: serde_json::Value) -> Result<(), DispatchError> {
        let interaction = serde_json::from_value(raw).map_err(DispatchError::Decode)?;
        self.dispatch(interaction).await
    }

    /// Dispatch one inbound interaction.
    pub async fn dispatch(&self, mut interaction: Interaction) -> Result<(), DispatchError> {
        if let (Some(guild_id), Some(middleware)) =
            (interaction.guild_id, &self.guild_middleware)
        {
            match middleware(guild_id).await {
                Ok(data) => interaction.guild_data = Some(data),
                Err(source) => {
                    return Err(DispatchError::Middleware {
                        kind: MiddlewareKind::Guild,
                        source,
                    })
                }
            }
        }

        // DM interactions carry a top-level user, guild interactions nest it
        // inside the member. Normalize so everything downstream reads one
        // place.
        if interaction.user.is_none() {
            interaction.user = interaction.member.as_ref().and_then(|m| m.user.clone());
        }

        if let Some(middleware) = &self.user_middleware {
            if let Some(user_id) = interaction.user.as_ref().map(|u| u.id) {
                match middleware(user_id).await {
                    Ok(data) => interaction.user_data = Some(data),
                    Err(source) => {
                        return Err(DispatchError::Middleware {
                            kind: MiddlewareKind::User,
                            source,
                        })
                    }
                }
            }
        }

        match interaction.kind {
            InteractionType::ApplicationCommand => {
                self.on_command(interaction).await;
                Ok(())
            }
            InteractionType::MessageComponent => {
                self.on_component(interaction).await;
                Ok(())
            }
            kind => {
                warn!(interaction = %interaction.id, ?kind, "unroutable interaction type");
                Ok(())
            }
        }
    }

    // -- command path ------------------------------------------------------

    async fn on_command(&self, mut interaction: Interaction) {
        let name = match interaction.data.as_mut() {
            Some(InteractionData::ApplicationCommand(data)) => {
                data.options_by_name = data
                    .options
                    .iter()
                    .map(|o| (o.name.clone(), o.value.clone()))
                    .collect();
                data.name.clone()
            }
            _ => {
                warn!(interaction = %interaction.id, "command interaction without command data");
                return;
            }
        };

        let interaction = Arc::new(interaction);
        let replyable = self.replyable(interaction);

        if let Some(handler) = self.registry.resolve_command(&name) {
            if let Err(error) = handler(replyable.clone()).await {
                warn!(command = %name, %error, "command handler failed");
                self.send_failure(&replyable, &name).await;
            }
            return;
        }

        let state_name = format!("{name}_main");
        if self.registry.resolve_ui_state(&state_name).is_some() {
            if let Err(error) = replyable.render_state(&state_name, Vec::new()).await {
                warn!(command = %name, %error, "command UI state failed");
                self.send_failure(&replyable, &name).await;
            }
            return;
        }

        warn!(command = %name, "no handler or UI state for command");
        if let Err(error) = replyable.defer(false).await {
            warn!(command = %name, %error, "failed to acknowledge unhandled command");
        }
    }

    /// Best-effort generic failure reply after a handler fault: a deferred
    /// ephemeral message. A failure here is logged and swallowed.
    async fn send_failure(&self, replyable: &Replyable, command: &str) {
        let payload = ReplyPayload::new()
            .content(self.config.texts.interaction_failed.clone())
            .ephemeral();
        if let Err(error) = replyable.defer_with(payload).await {
            warn!(command = %command, %error, "failed to send failure reply");
        }
    }

    // -- component path ----------------------------------------------------

    async fn on_component(&self, mut interaction: Interaction) {
        let (custom_id, access_flags) = match interaction.data.as_mut() {
            Some(InteractionData::MessageComponent(data)) => {
                let (id, decoded) = flags::decode(&data.custom_id);
                data.custom_id = id.clone();
                data.flags = decoded;
                (id, decoded)
            }
            _ => {
                warn!(interaction = %interaction.id, "component interaction without component data");
                return;
            }
        };

        let interaction = Arc::new(interaction);
        let Some(actor) = interaction.actor().map(|u| u.id) else {
            warn!(interaction = %interaction.id, "component interaction without actor");
            return;
        };
        let replyable = self.replyable(interaction.clone());

        // A member payload without permission bits reads as no permissions,
        // never as "not in a guild".
        let access = auth::evaluate(
            actor,
            access_flags,
            interaction.original_invoker(),
            interaction.member.as_ref().map(|m| m.permissions.unwrap_or_default()),
            self.config.bot_owners.contains(actor),
        );
        if let Access::Denied(reason) = access {
            debug!(component = %custom_id, ?reason, "component activation denied");
            self.send_denial(&replyable, &interaction, reason).await;
            return;
        }

        // A trigger policy closes the context before handler resolution, so
        // the scoped lookup comes up empty and the activation continues down
        // the global fallback chain like any other unscoped component.
        if let Some(key) = interaction.originating_interaction_id() {
            if let Some(context) = self.contexts.lookup(key) {
                if let Some(context) = self.contexts.apply_policy(context).await {
                    if let Some(handler) = context.resolve(&custom_id) {
                        if let Err(error) = handler(replyable).await {
                            warn!(
                                component = %custom_id,
                                context_id = %context.context_id(),
                                %error,
                                "scoped component handler failed"
                            );
                        }
                        return;
                    }
                }
            }
        }

        if let Some(handler) = self.registry.resolve_component(&custom_id) {
            if let Err(error) = handler(replyable).await {
                warn!(component = %custom_id, %error, "component handler failed");
            }
            return;
        }

        if self.registry.resolve_ui_state(&custom_id).is_some() {
            if let Err(error) = replyable.render_state(&custom_id, Vec::new()).await {
                warn!(component = %custom_id, %error, "component UI state failed");
            }
            return;
        }

        warn!(component = %custom_id, "no handler for component");
        if let Err(error) = replyable.defer_update().await {
            warn!(component = %custom_id, %error, "failed to acknowledge unhandled component");
        }
    }

    async fn send_denial(
        &self,
        replyable: &Replyable,
        interaction: &Interaction,
        reason: DenyReason,
    ) {
        let texts = &self.config.texts;
        let title = if reason == DenyReason::NotOwner {
            &texts.not_owned_title
        } else {
            &texts.not_permitted_title
        };
        let mut payload = ReplyPayload::new()
            .title(title.clone())
            .description(texts.for_reason(reason).to_string())
            .ephemeral();

        // Ownership denials carry the original command and its invoker so
        // the embedding application can localise "run /x yourself".
        if reason == DenyReason::NotOwner {
            if let Some(origin) = interaction.message.as_ref().and_then(|m| m.interaction.as_ref())
            {
                payload = payload.context_entry("command", origin.name.clone());
                if let Some(user) = &origin.user {
                    payload = payload.context_entry("owner", user.name.clone());
                }
            }
        }

        if let Err(error) = replyable.reply(payload).await {
            warn!(?reason, %error, "failed to send denial reply");
        }
    }

    fn replyable(&self, interaction: Arc<Interaction>) -> Replyable {
        Replyable::new(
            interaction,
            self.transport.clone(),
            self.registry.clone(),
            self.contexts.clone(),
            self.config.clone(),
        )
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .field("contexts", &self.contexts)
            .field("guild_middleware", &self.guild_middleware.is_some())
            .field("user_middleware", &self.user_middleware.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
