//! The reply surface handed to handlers.
//!
//! A [`Replyable`] wraps one enriched interaction together with everything
//! needed to answer it: the transport, the handler registry, the reply-context
//! manager, and the router config. It enforces the one-response rule — an
//! interaction gets at most one initial response, later attempts are dropped
//! with a warning — and stages the interactive-reply flow:
//!
//! ```ignore
//! replyable
//!     .reply_interactive(payload)
//!     .await?
//!     .with_timeout(Duration::from_secs(60), TimeoutPolicy::Restart, Some(janitor))
//!     .await
//!     .on("confirm", confirm_handler)?
//!     .on("page_$n", page_handler)?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::RouterConfig;
use crate::context::{Janitor, ReplyContextManager, ReplyScope, TimeoutPolicy};
use crate::registry::HandlerRegistry;
use crate::transport::ReplyTransport;
use crate::types::interaction::{CommandOptionValue, Interaction, InteractionType};
use crate::types::response::{
    disable_components, Component, InteractionCallbackType, InteractionResponse, ReplyPayload,
};
use crate::BoxError;

// ---------------------------------------------------------------------------
// Replyable
// ---------------------------------------------------------------------------

/// The per-dispatch reply capability passed to command and component
/// handlers. Cheap to clone; clones share the answered latch.
#[derive(Clone)]
pub struct Replyable {
    interaction: Arc<Interaction>,
    transport: Arc<dyn ReplyTransport>,
    registry: HandlerRegistry,
    contexts: ReplyContextManager,
    config: Arc<RouterConfig>,
    answered: Arc<AtomicBool>,
}

impl Replyable {
    pub(crate) fn new(
        interaction: Arc<Interaction>,
        transport: Arc<dyn ReplyTransport>,
        registry: HandlerRegistry,
        contexts: ReplyContextManager,
        config: Arc<RouterConfig>,
    ) -> Self {
        Self {
            interaction,
            transport,
            registry,
            contexts,
            config,
            answered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The enriched interaction being answered.
    pub fn interaction(&self) -> &Arc<Interaction> {
        &self.interaction
    }

    /// A command option by name, for command handlers.
    pub fn option(&self, name: &str) -> Option<&CommandOptionValue> {
        self.interaction
            .data
            .as_ref()
            .and_then(|d| d.as_command())
            .and_then(|c| c.options_by_name.get(name))
    }

    /// The selected values of the activated component, for select handlers.
    pub fn component_values(&self) -> &[String] {
        self.interaction
            .data
            .as_ref()
            .and_then(|d| d.as_component())
            .map(|c| c.values.as_slice())
            .unwrap_or(&[])
    }

    /// Send a new message in response.
    pub async fn reply(&self, payload: ReplyPayload) -> Result<(), BoxError> {
        self.send(InteractionResponse::message(payload)).await
    }

    /// Rewrite the message the activated component is attached to.
    pub async fn update(&self, payload: ReplyPayload) -> Result<(), BoxError> {
        self.send(InteractionResponse::update(payload)).await
    }

    /// Acknowledge now, answer later via the followup endpoints.
    pub async fn defer(&self, ephemeral: bool) -> Result<(), BoxError> {
        let mut response =
            InteractionResponse::deferred(InteractionCallbackType::DeferredChannelMessageWithSource);
        if ephemeral {
            response.data = Some(ReplyPayload::new().ephemeral());
        }
        self.send(response).await
    }

    /// Acknowledge a component activation without changing the message.
    pub async fn defer_update(&self) -> Result<(), BoxError> {
        self.send(InteractionResponse::deferred(
            InteractionCallbackType::DeferredUpdateMessage,
        ))
        .await
    }

    /// Deferred acknowledgement carrying a payload, used for the router's
    /// fault reply.
    pub(crate) async fn defer_with(&self, payload: ReplyPayload) -> Result<(), BoxError> {
        let mut response =
            InteractionResponse::deferred(InteractionCallbackType::DeferredChannelMessageWithSource);
        response.data = Some(payload.normalized());
        self.send(response).await
    }

    /// Render a registered UI state and send it as the response: an update
    /// for component activations, a new message otherwise.
    pub async fn render_state(&self, name: &str, args: Vec<String>) -> Result<(), BoxError> {
        let state = self
            .registry
            .resolve_ui_state(name)
            .ok_or_else(|| BoxError::from(format!("no UI state named {name:?}")))?;
        let payload = state(self.interaction.clone(), args).await?;
        if self.interaction.kind == InteractionType::MessageComponent {
            self.update(payload).await
        } else {
            self.reply(payload).await
        }
    }

    /// Send a reply whose components should be governed by a timed reply
    /// context. Returns the staged [`InteractiveReply`] holding a snapshot of
    /// the sent components for the eventual janitor.
    pub async fn reply_interactive(
        &self,
        payload: ReplyPayload,
    ) -> Result<InteractiveReply, BoxError> {
        let payload = payload.normalized();
        let components = payload.components.clone().unwrap_or_default();
        let response = if self.interaction.kind == InteractionType::MessageComponent {
            InteractionResponse::update(payload)
        } else {
            InteractionResponse::message(payload)
        };
        self.send(response).await?;
        Ok(InteractiveReply {
            replyable: self.clone(),
            components,
        })
    }

    async fn send(&self, response: InteractionResponse) -> Result<(), BoxError> {
        if self.answered.swap(true, Ordering::SeqCst) {
            warn!(
                interaction = %self.interaction.id,
                "interaction already answered, dropping response"
            );
            return Ok(());
        }
        let result = self
            .transport
            .create_response(self.interaction.id, &self.interaction.token, &response)
            .await;
        if result.is_err() {
            // Nothing reached the platform; the interaction is still open.
            self.answered.store(false, Ordering::SeqCst);
        }
        result
    }
}

impl std::fmt::Debug for Replyable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replyable")
            .field("interaction", &self.interaction.id)
            .field("answered", &self.answered.load(Ordering::SeqCst))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Interactive replies
// ---------------------------------------------------------------------------

/// A sent interactive reply, waiting for its timeout attachment.
pub struct InteractiveReply {
    replyable: Replyable,
    components: Vec<Component>,
}

impl InteractiveReply {
    /// Attach a timed reply context to the sent message. Replaces any context
    /// already governing it, running that context's janitor first.
    pub async fn with_timeout(
        self,
        timeout: Duration,
        policy: TimeoutPolicy,
        janitor: Option<Janitor>,
    ) -> ReplyScope {
        self.replyable
            .contexts
            .create(
                self.replyable.interaction.clone(),
                self.components,
                timeout,
                policy,
                janitor,
            )
            .await
    }

    /// Like [`with_timeout`](Self::with_timeout), using the configured
    /// default policy (or [`TimeoutPolicy::Noop`] when none is configured).
    pub async fn with_default_timeout(
        self,
        timeout: Duration,
        janitor: Option<Janitor>,
    ) -> ReplyScope {
        let policy = self
            .replyable
            .config
            .default_timeout_policy
            .unwrap_or(TimeoutPolicy::Noop);
        self.with_timeout(timeout, policy, janitor).await
    }
}

// ---------------------------------------------------------------------------
// Janitor edit capability
// ---------------------------------------------------------------------------

/// The narrow capability a janitor gets over the message it cleans up: edit
/// the original reply by interaction token, nothing else.
pub struct JanitorEdit {
    interaction: Arc<Interaction>,
    components: Vec<Component>,
    transport: Arc<dyn ReplyTransport>,
    registry: HandlerRegistry,
}

impl JanitorEdit {
    pub(crate) fn new(
        interaction: Arc<Interaction>,
        components: Vec<Component>,
        transport: Arc<dyn ReplyTransport>,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            interaction,
            components,
            transport,
            registry,
        }
    }

    /// The interaction that produced the governed message.
    pub fn interaction(&self) -> &Arc<Interaction> {
        &self.interaction
    }

    /// Edit the governed message with an arbitrary payload.
    pub async fn edit(&self, payload: ReplyPayload) -> Result<(), BoxError> {
        let application_id = self
            .interaction
            .application_id
            .ok_or_else(|| BoxError::from("interaction carries no application id"))?;
        self.transport
            .edit_original_response(application_id, &self.interaction.token, &payload.normalized())
            .await
    }

    /// Re-emit the components the reply was sent with, every interactive one
    /// marked disabled.
    pub async fn disable_components(&self) -> Result<(), BoxError> {
        let mut components = self.components.clone();
        disable_components(&mut components);
        let mut payload = ReplyPayload::new();
        payload.components = Some(components);
        self.edit(payload).await
    }

    /// Strip all components off the governed message.
    pub async fn remove_components(&self) -> Result<(), BoxError> {
        let mut payload = ReplyPayload::new();
        payload.components = Some(Vec::new());
        self.edit(payload).await
    }

    /// Render a registered UI state into the governed message.
    pub async fn render_state(&self, name: &str, args: Vec<String>) -> Result<(), BoxError> {
        let state = self
            .registry
            .resolve_ui_state(name)
            .ok_or_else(|| BoxError::from(format!("no UI state named {name:?}")))?;
        let payload = state(self.interaction.clone(), args).await?;
        self.edit(payload).await
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::transport::testing::RecordingTransport;
    use crate::types::response::ComponentType;

    pub(crate) fn dummy_interaction(id: u64) -> Interaction {
        serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "type": 2,
            "application_id": "500",
            "token": "tok",
            "user": { "id": "300", "username": "alice" },
            "data": { "name": "roll" }
        }))
        .expect("valid fixture")
    }

    pub(crate) fn replyable_for(
        interaction: Interaction,
        transport: Arc<RecordingTransport>,
    ) -> Replyable {
        let registry = HandlerRegistry::new();
        let contexts = ReplyContextManager::new(transport.clone(), registry.clone());
        Replyable::new(
            Arc::new(interaction),
            transport,
            registry,
            contexts,
            Arc::new(RouterConfig::default()),
        )
    }

    pub(crate) fn replyable_with(transport: Arc<RecordingTransport>) -> Replyable {
        replyable_for(dummy_interaction(77), transport)
    }

    pub(crate) fn dummy_replyable() -> Replyable {
        replyable_with(Arc::new(RecordingTransport::new()))
    }

    /// An action row holding a single button with the given custom id.
    pub(crate) fn button_row(custom_id: &str) -> Component {
        Component {
            kind: ComponentType::ActionRow,
            components: vec![Component {
                kind: ComponentType::Button,
                components: vec![],
                custom_id: Some(custom_id.to_string()),
                label: Some("Go".into()),
                style: Some(1),
                disabled: None,
                placeholder: None,
                url: None,
                options: None,
            }],
            custom_id: None,
            label: None,
            style: None,
            disabled: None,
            placeholder: None,
            url: None,
            options: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
