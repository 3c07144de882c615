//! Router configuration: bot owners, denial message templates, and the
//! default reply-context timeout policy.

use std::fmt;
use std::sync::Arc;

use crate::auth::DenyReason;
use crate::context::TimeoutPolicy;
use crate::types::id::{Id, UserMarker};

// ---------------------------------------------------------------------------
// Bot owners
// ---------------------------------------------------------------------------

/// The set of actors who bypass every permission-flag check.
#[derive(Clone, Default)]
pub enum BotOwners {
    /// Nobody is an owner.
    #[default]
    None,
    /// A fixed list of user ids.
    Ids(Vec<Id<UserMarker>>),
    /// An arbitrary membership predicate.
    Predicate(Arc<dyn Fn(Id<UserMarker>) -> bool + Send + Sync>),
}

impl BotOwners {
    pub fn contains(&self, id: Id<UserMarker>) -> bool {
        match self {
            Self::None => false,
            Self::Ids(ids) => ids.contains(&id),
            Self::Predicate(f) => f(id),
        }
    }
}

impl fmt::Debug for BotOwners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("BotOwners::None"),
            Self::Ids(ids) => f.debug_tuple("BotOwners::Ids").field(ids).finish(),
            Self::Predicate(_) => f.write_str("BotOwners::Predicate(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Denial texts
// ---------------------------------------------------------------------------

/// Message templates for denial and failure replies, one per deny reason plus
/// the generic failure text. Localisation happens in the embedding
/// application; these are the fallback strings.
#[derive(Debug, Clone)]
pub struct DenialTexts {
    pub not_owned_title: String,
    pub not_owned_description: String,
    pub not_permitted_title: String,
    pub not_permitted_generic: String,
    pub not_permitted_bot_admin: String,
    pub not_permitted_guild_admin: String,
    pub not_permitted_manage_server: String,
    pub not_permitted_manage_messages: String,
    pub interaction_failed: String,
}

impl Default for DenialTexts {
    fn default() -> Self {
        Self {
            not_owned_title: "Nope!".into(),
            not_owned_description:
                "You cannot interact with this widget as you did not create it. \
                 Run the command yourself to get an interactable widget."
                    .into(),
            not_permitted_title: "No permission!".into(),
            not_permitted_generic: "You cannot do this.".into(),
            not_permitted_bot_admin: "Only bot admins can do this.".into(),
            not_permitted_guild_admin: "Only server admins can do this.".into(),
            not_permitted_manage_server:
                "Only people with the \"Manage Server\" permission can do this.".into(),
            not_permitted_manage_messages:
                "Only people with the \"Manage Messages\" permission can do this.".into(),
            interaction_failed:
                "We are very sorry but an error occured while processing your command. \
                 Please try again."
                    .into(),
        }
    }
}

impl DenialTexts {
    /// The description template for a deny reason.
    pub fn for_reason(&self, reason: DenyReason) -> &str {
        match reason {
            DenyReason::NotBotAdmin => &self.not_permitted_bot_admin,
            DenyReason::NotOwner => &self.not_owned_description,
            DenyReason::NotGuildAdmin => &self.not_permitted_guild_admin,
            DenyReason::NotManageServer => &self.not_permitted_manage_server,
            DenyReason::NotManageMessages => &self.not_permitted_manage_messages,
        }
    }
}

// ---------------------------------------------------------------------------
// Router config
// ---------------------------------------------------------------------------

/// Configuration for a [`Router`](crate::router::Router).
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    pub bot_owners: BotOwners,
    pub texts: DenialTexts,
    /// Policy applied by [`with_default_timeout`] when a reply context is
    /// attached without an explicit policy.
    ///
    /// [`with_default_timeout`]: crate::reply::InteractiveReply::with_default_timeout
    pub default_timeout_policy: Option<TimeoutPolicy>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
