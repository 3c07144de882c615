//! Process-wide handler registry.
//!
//! Three independent mappings: command name → command handler, component id →
//! component handler, and state name → UI-state producer. Registration is
//! last-writer-wins with a warning rather than an error, so reloadable
//! handler sets can re-register freely.
//!
//! The registry is a cheap-clone handle (internals behind `Arc`); the router,
//! reply contexts, and janitors all hold clones of the same instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_lite::future::Boxed;
use tracing::warn;

use crate::reply::Replyable;
use crate::types::interaction::Interaction;
use crate::types::response::ReplyPayload;
use crate::BoxError;

// ---------------------------------------------------------------------------
// Handler types
// ---------------------------------------------------------------------------

/// The future a handler returns.
pub type HandlerFuture = Boxed<Result<(), BoxError>>;

/// Handles one slash-command invocation.
pub type CommandHandler = Arc<dyn Fn(Replyable) -> HandlerFuture + Send + Sync>;

/// Handles one component activation.
pub type ComponentHandler = Arc<dyn Fn(Replyable) -> HandlerFuture + Send + Sync>;

/// A named, parametrized producer of a reply payload, used as the fallback
/// renderer for commands (`"<name>_main"`) and components without an explicit
/// handler.
pub type UiState =
    Arc<dyn Fn(Arc<Interaction>, Vec<String>) -> Boxed<Result<ReplyPayload, BoxError>> + Send + Sync>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RegistryInner {
    commands: Mutex<HashMap<String, CommandHandler>>,
    components: Mutex<HashMap<String, ComponentHandler>>,
    ui_states: Mutex<HashMap<String, UiState>>,
}

/// The handler lookup tables. Cheap to clone.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<RegistryInner>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a slash command. Overwrites (with a warning)
    /// any handler previously registered under the same name.
    pub fn register_command<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Replyable) -> HandlerFuture + Send + Sync + 'static,
    {
        let name = name.into();
        let previous = self
            .inner
            .commands
            .lock()
            .unwrap()
            .insert(name.clone(), Arc::new(handler));
        if previous.is_some() {
            warn!(command = %name, "command handler assigned twice, overriding");
        }
    }

    /// Register a handler for a component id. Overwrites with a warning.
    pub fn register_component<F>(&self, id: impl Into<String>, handler: F)
    where
        F: Fn(Replyable) -> HandlerFuture + Send + Sync + 'static,
    {
        let id = id.into();
        let previous = self
            .inner
            .components
            .lock()
            .unwrap()
            .insert(id.clone(), Arc::new(handler));
        if previous.is_some() {
            warn!(component = %id, "component handler assigned twice, overriding");
        }
    }

    /// Register a UI-state producer. Overwrites with a warning.
    pub fn register_ui_state<F>(&self, name: impl Into<String>, state: F)
    where
        F: Fn(Arc<Interaction>, Vec<String>) -> Boxed<Result<ReplyPayload, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let previous = self
            .inner
            .ui_states
            .lock()
            .unwrap()
            .insert(name.clone(), Arc::new(state));
        if previous.is_some() {
            warn!(state = %name, "UI state already exists, overriding");
        }
    }

    pub fn resolve_command(&self, name: &str) -> Option<CommandHandler> {
        self.inner.commands.lock().unwrap().get(name).cloned()
    }

    pub fn resolve_component(&self, id: &str) -> Option<ComponentHandler> {
        self.inner.components.lock().unwrap().get(id).cloned()
    }

    pub fn resolve_ui_state(&self, name: &str) -> Option<UiState> {
        self.inner.ui_states.lock().unwrap().get(name).cloned()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("commands", &self.inner.commands.lock().unwrap().len())
            .field("components", &self.inner.components.lock().unwrap().len())
            .field("ui_states", &self.inner.ui_states.lock().unwrap().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
