//! Per-message reply contexts.
//!
//! When a handler sends an interactive reply it can attach a time-boxed scope
//! of component handlers to that one message. The scope owns exactly one live
//! expiry timer; when the timer fires (or the scope is closed explicitly) a
//! janitor callback gets a narrow edit capability over the governed message
//! and the scope is discarded.
//!
//! Contexts are indexed by the originating interaction id — the identifier
//! the platform echoes back inside a component's `message.interaction`, and
//! the only stable key both the replying side and the activating side can
//! observe. At most one live context exists per governed message; creating a
//! second one replaces the first after running its cleanup.
//!
//! Concurrency: the index mutex is never held across an await, and removal
//! from the index is the single atomic decision between a firing timer and a
//! concurrent cancellation — whichever takes the entry runs the janitor, the
//! other sees nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_lite::future::Boxed;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::registry::{ComponentHandler, HandlerFuture, HandlerRegistry};
use crate::reply::JanitorEdit;
use crate::transport::ReplyTransport;
use crate::types::id::{Id, InteractionMarker};
use crate::types::interaction::Interaction;
use crate::types::response::Component;

// ---------------------------------------------------------------------------
// Policy & janitor
// ---------------------------------------------------------------------------

/// What happens to the timer when a qualifying component interaction arrives
/// for a governed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Reschedule expiry for the full timeout again.
    Restart,
    /// Cancel the timer permanently; the context lives until explicitly
    /// cleared.
    Remove,
    /// Run the janitor immediately, as if the timer had fired.
    Trigger,
    /// Leave the timer untouched.
    Noop,
}

/// Cleanup callback run when a context expires or is closed.
pub type Janitor = Arc<dyn Fn(JanitorEdit) -> Boxed<()> + Send + Sync>;

/// Returned by [`ReplyScope::on`] when a handler id or pattern is registered
/// twice on the same scope.
#[derive(Debug, Clone)]
pub struct DuplicateHandlerId {
    id: String,
}

impl fmt::Display for DuplicateHandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler already registered for id {:?}", self.id)
    }
}

impl std::error::Error for DuplicateHandlerId {}

// ---------------------------------------------------------------------------
// Slotted id patterns
// ---------------------------------------------------------------------------

/// A component-id pattern with `$`-slots.
///
/// Underscore-separated segments; a segment starting with `$` matches any
/// single non-empty segment, every other segment matches literally. So
/// `"page_$n"` matches `"page_3"` but not `"page"` or `"page_3_extra"`.
#[derive(Debug, Clone)]
struct IdPattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

#[derive(Debug, Clone)]
enum PatternSegment {
    Literal(String),
    Slot,
}

impl IdPattern {
    fn is_slotted(id: &str) -> bool {
        id.contains('$')
    }

    fn parse(raw: &str) -> Self {
        let segments = raw
            .split('_')
            .map(|seg| {
                if seg.starts_with('$') {
                    PatternSegment::Slot
                } else {
                    PatternSegment::Literal(seg.to_string())
                }
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    fn matches(&self, id: &str) -> bool {
        let parts: Vec<&str> = id.split('_').collect();
        if parts.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(parts)
            .all(|(segment, part)| match segment {
                PatternSegment::Literal(lit) => lit == part,
                PatternSegment::Slot => !part.is_empty(),
            })
    }
}

struct SlottedHandler {
    pattern: IdPattern,
    handler: ComponentHandler,
}

// ---------------------------------------------------------------------------
// Context state
// ---------------------------------------------------------------------------

pub(crate) struct ContextState {
    context_id: String,
    key: Id<InteractionMarker>,
    interaction: Arc<Interaction>,
    /// Snapshot of the components the interactive reply was sent with, for
    /// the janitor's disable operation.
    components: Vec<Component>,
    timeout: Duration,
    policy: TimeoutPolicy,
    janitor: Option<Janitor>,
    handlers: Mutex<HashMap<String, ComponentHandler>>,
    slotted: Mutex<Vec<SlottedHandler>>,
    /// The single live expiry timer. Replaced, never stacked.
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// A read handle on a live reply context.
#[derive(Clone)]
pub struct ReplyContext {
    state: Arc<ContextState>,
}

impl ReplyContext {
    /// Opaque id of this context, for logging.
    pub fn context_id(&self) -> &str {
        &self.state.context_id
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.state.policy
    }

    /// Resolve a scoped handler: exact match first, then slotted patterns in
    /// registration order, first match wins.
    pub fn resolve(&self, custom_id: &str) -> Option<ComponentHandler> {
        if let Some(handler) = self.state.handlers.lock().unwrap().get(custom_id) {
            return Some(handler.clone());
        }
        self.state
            .slotted
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.pattern.matches(custom_id))
            .map(|s| s.handler.clone())
    }
}

impl fmt::Debug for ReplyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyContext")
            .field("context_id", &self.state.context_id)
            .field("key", &self.state.key)
            .field("policy", &self.state.policy)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Tracks the live reply context of every governed message. Cheap to clone.
#[derive(Clone)]
pub struct ReplyContextManager {
    contexts: Arc<Mutex<HashMap<Id<InteractionMarker>, Arc<ContextState>>>>,
    transport: Arc<dyn ReplyTransport>,
    registry: HandlerRegistry,
}

impl ReplyContextManager {
    pub(crate) fn new(transport: Arc<dyn ReplyTransport>, registry: HandlerRegistry) -> Self {
        Self {
            contexts: Arc::new(Mutex::new(HashMap::new())),
            transport,
            registry,
        }
    }

    /// Allocate a context for the reply produced by `interaction` and arm its
    /// timer. Replaces (and cleans up) any context already governing the same
    /// message.
    pub(crate) async fn create(
        &self,
        interaction: Arc<Interaction>,
        components: Vec<Component>,
        timeout: Duration,
        policy: TimeoutPolicy,
        janitor: Option<Janitor>,
    ) -> ReplyScope {
        let key = interaction.id;

        let replaced = self.contexts.lock().unwrap().remove(&key);
        if let Some(old) = replaced {
            if let Some(timer) = old.timer.lock().unwrap().take() {
                timer.abort();
            }
            debug!(context_id = %old.context_id, "replacing live reply context");
            self.run_janitor(&old).await;
        }

        let state = Arc::new(ContextState {
            context_id: format!("{:016x}", rand::random::<u64>()),
            key,
            interaction,
            components,
            timeout,
            policy,
            janitor,
            handlers: Mutex::new(HashMap::new()),
            slotted: Mutex::new(Vec::new()),
            timer: Mutex::new(None),
        });
        self.contexts.lock().unwrap().insert(key, state.clone());
        self.arm_timer(&state);

        ReplyScope {
            manager: self.clone(),
            state,
        }
    }

    /// The live context governing `key`'s reply message, if any.
    pub fn lookup(&self, key: Id<InteractionMarker>) -> Option<ReplyContext> {
        self.contexts
            .lock()
            .unwrap()
            .get(&key)
            .map(|state| ReplyContext {
                state: state.clone(),
            })
    }

    /// Apply the context's timeout policy to a qualifying component
    /// interaction. Returns the context for handler resolution, or `None`
    /// when the policy discarded it.
    pub(crate) async fn apply_policy(&self, context: ReplyContext) -> Option<ReplyContext> {
        match context.state.policy {
            TimeoutPolicy::Restart => {
                self.arm_timer(&context.state);
                Some(context)
            }
            TimeoutPolicy::Remove => {
                if let Some(timer) = context.state.timer.lock().unwrap().take() {
                    timer.abort();
                }
                Some(context)
            }
            TimeoutPolicy::Trigger => {
                self.trigger_now(context.state.key).await;
                None
            }
            TimeoutPolicy::Noop => Some(context),
        }
    }

    /// Close a context right now: cancel its timer, run the janitor, discard.
    /// Idempotent — a second call on an already-discarded context is a no-op.
    pub async fn trigger_now(&self, key: Id<InteractionMarker>) {
        let Some(state) = self.contexts.lock().unwrap().remove(&key) else {
            return;
        };
        if let Some(timer) = state.timer.lock().unwrap().take() {
            timer.abort();
        }
        self.run_janitor(&state).await;
    }

    /// Natural expiry, called from the timer task.
    async fn expire(&self, key: Id<InteractionMarker>) {
        let Some(state) = self.contexts.lock().unwrap().remove(&key) else {
            // Cancelled or triggered between the sleep elapsing and now.
            return;
        };
        // This *is* the timer task; just drop the handle, never abort it.
        state.timer.lock().unwrap().take();
        debug!(context_id = %state.context_id, "reply context timed out");
        self.run_janitor(&state).await;
    }

    /// Start (or restart) the context's single timer for its full timeout.
    fn arm_timer(&self, state: &Arc<ContextState>) {
        let manager = self.clone();
        let key = state.key;
        let delay = state.timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.expire(key).await;
        });
        if let Some(old) = state.timer.lock().unwrap().replace(handle) {
            old.abort();
        }
    }

    async fn run_janitor(&self, state: &ContextState) {
        if let Some(janitor) = &state.janitor {
            let edit = JanitorEdit::new(
                state.interaction.clone(),
                state.components.clone(),
                self.transport.clone(),
                self.registry.clone(),
            );
            janitor(edit).await;
        }
    }
}

impl fmt::Debug for ReplyContextManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyContextManager")
            .field("live", &self.contexts.lock().unwrap().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Scope builder
// ---------------------------------------------------------------------------

/// The staged builder returned after attaching a timeout to an interactive
/// reply. Each `on` call consumes and returns the scope, so handler
/// registration chains; registering the same id twice fails.
pub struct ReplyScope {
    manager: ReplyContextManager,
    state: Arc<ContextState>,
}

impl ReplyScope {
    /// Register a component handler scoped to this context.
    ///
    /// `id` is either an exact component id or a slotted pattern (any
    /// `$`-segment, see the module docs). Slotted patterns are evaluated in
    /// registration order after exact matches.
    pub fn on<F>(self, id: &str, handler: F) -> Result<Self, DuplicateHandlerId>
    where
        F: Fn(crate::reply::Replyable) -> HandlerFuture + Send + Sync + 'static,
    {
        if IdPattern::is_slotted(id) {
            let mut slotted = self.state.slotted.lock().unwrap();
            if slotted.iter().any(|s| s.pattern.raw == id) {
                drop(slotted);
                return Err(DuplicateHandlerId { id: id.to_string() });
            }
            slotted.push(SlottedHandler {
                pattern: IdPattern::parse(id),
                handler: Arc::new(handler),
            });
        } else {
            let mut handlers = self.state.handlers.lock().unwrap();
            if handlers.contains_key(id) {
                drop(handlers);
                return Err(DuplicateHandlerId { id: id.to_string() });
            }
            handlers.insert(id.to_string(), Arc::new(handler));
        }
        Ok(self)
    }

    /// Opaque id of the underlying context, for logging.
    pub fn context_id(&self) -> &str {
        &self.state.context_id
    }

    /// Close the scope now, as if the timeout had expired.
    pub async fn trigger_janitor(self) {
        self.manager.trigger_now(self.state.key).await;
    }
}

impl fmt::Debug for ReplyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyScope")
            .field("context_id", &self.state.context_id)
            .field("key", &self.state.key)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
