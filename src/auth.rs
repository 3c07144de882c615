//! Authorization evaluator for component interactions.
//!
//! A pure decision function: given the actor, the access flags decoded from
//! the component id, and the recorded invoker of the original command, decide
//! whether the activation is allowed and, if not, why. The evaluator has no
//! side effects — the router is responsible for turning a denial into an
//! ephemeral reply.

use crate::flags::AccessFlags;
use crate::types::id::{Id, UserMarker};
use crate::types::permissions::Permissions;

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied(DenyReason),
}

/// Why an activation was denied. Each reason maps to one configured message
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotBotAdmin,
    NotOwner,
    NotGuildAdmin,
    NotManageServer,
    NotManageMessages,
}

/// Evaluate an activation. First match wins:
///
/// 1. A configured bot owner bypasses every other rule.
/// 2. `BOT_ADMIN` is a deny-unless-owner marker, not a grantable permission.
/// 3. Without `EVERYONE`, the component belongs to whoever invoked the
///    original command.
/// 4. Outside a guild there is no member or permission concept, so the
///    remaining guild-only flags are vacuously satisfied.
/// 5–7. Guild permission flags, checked against the member's computed bits
///    (administrators implicitly hold the manage-* permissions).
pub fn evaluate(
    actor: Id<UserMarker>,
    flags: AccessFlags,
    original_invoker: Option<Id<UserMarker>>,
    member_permissions: Option<Permissions>,
    is_bot_owner: bool,
) -> Access {
    if is_bot_owner {
        return Access::Allowed;
    }

    if flags.contains(AccessFlags::BOT_ADMIN) {
        return Access::Denied(DenyReason::NotBotAdmin);
    }

    if !flags.contains(AccessFlags::EVERYONE) {
        if let Some(invoker) = original_invoker {
            if invoker != actor {
                return Access::Denied(DenyReason::NotOwner);
            }
        }
    }

    let Some(permissions) = member_permissions else {
        return Access::Allowed;
    };

    if flags.contains(AccessFlags::GUILD_ADMIN) && !permissions.is_admin() {
        return Access::Denied(DenyReason::NotGuildAdmin);
    }
    if flags.contains(AccessFlags::MANAGE_SERVER) && !permissions.can_manage_guild() {
        return Access::Denied(DenyReason::NotManageServer);
    }
    if flags.contains(AccessFlags::MANAGE_MESSAGES) && !permissions.can_manage_messages() {
        return Access::Denied(DenyReason::NotManageMessages);
    }

    Access::Allowed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ACTOR: Id<UserMarker> = Id::new(1);
    const INVOKER: Id<UserMarker> = Id::new(2);

    #[test]
    fn bot_owner_is_allowed_for_all_flag_subsets() {
        for bits in 0u8..32 {
            let flags = AccessFlags::from_bits_truncate(bits);
            let access = evaluate(ACTOR, flags, Some(INVOKER), Some(Permissions::empty()), true);
            assert_eq!(access, Access::Allowed, "subset {bits:05b} denied an owner");
        }
    }

    #[test]
    fn bot_admin_flag_denies_even_guild_admins() {
        let access = evaluate(
            ACTOR,
            AccessFlags::BOT_ADMIN | AccessFlags::EVERYONE,
            None,
            Some(Permissions::ADMINISTRATOR),
            false,
        );
        assert_eq!(access, Access::Denied(DenyReason::NotBotAdmin));
    }

    #[test]
    fn missing_everyone_denies_non_invoker_with_full_permissions() {
        let access = evaluate(
            ACTOR,
            AccessFlags::empty(),
            Some(INVOKER),
            Some(Permissions::all()),
            false,
        );
        assert_eq!(access, Access::Denied(DenyReason::NotOwner));
    }

    #[test]
    fn invoker_passes_ownership_check() {
        let access = evaluate(ACTOR, AccessFlags::empty(), Some(ACTOR), None, false);
        assert_eq!(access, Access::Allowed);
    }

    #[test]
    fn unknown_invoker_skips_ownership_check() {
        // No recorded original invoker: nothing to compare against.
        let access = evaluate(ACTOR, AccessFlags::empty(), None, None, false);
        assert_eq!(access, Access::Allowed);
    }

    #[test]
    fn guild_flags_vacuous_outside_guild() {
        let flags =
            AccessFlags::EVERYONE | AccessFlags::GUILD_ADMIN | AccessFlags::MANAGE_MESSAGES;
        let access = evaluate(ACTOR, flags, Some(INVOKER), None, false);
        assert_eq!(access, Access::Allowed);
    }

    #[test]
    fn guild_admin_flag_checked_before_manage_messages() {
        // Actor lacks both; the admin check fires first.
        let flags =
            AccessFlags::EVERYONE | AccessFlags::GUILD_ADMIN | AccessFlags::MANAGE_MESSAGES;
        let access = evaluate(ACTOR, flags, Some(INVOKER), Some(Permissions::empty()), false);
        assert_eq!(access, Access::Denied(DenyReason::NotGuildAdmin));
    }

    #[test]
    fn manage_server_denied_without_bit() {
        let flags = AccessFlags::EVERYONE | AccessFlags::MANAGE_SERVER;
        let access = evaluate(
            ACTOR,
            flags,
            None,
            Some(Permissions::SEND_MESSAGES),
            false,
        );
        assert_eq!(access, Access::Denied(DenyReason::NotManageServer));
    }

    #[test]
    fn admin_bit_satisfies_manage_flags() {
        let flags = AccessFlags::EVERYONE
            | AccessFlags::GUILD_ADMIN
            | AccessFlags::MANAGE_SERVER
            | AccessFlags::MANAGE_MESSAGES;
        let access = evaluate(
            ACTOR,
            flags,
            None,
            Some(Permissions::ADMINISTRATOR),
            false,
        );
        assert_eq!(access, Access::Allowed);
    }

    #[test]
    fn manage_messages_denied_without_bit() {
        let flags = AccessFlags::EVERYONE | AccessFlags::MANAGE_MESSAGES;
        let access = evaluate(
            ACTOR,
            flags,
            None,
            Some(Permissions::MANAGE_GUILD),
            false,
        );
        assert_eq!(access, Access::Denied(DenyReason::NotManageMessages));
    }

    #[test]
    fn plain_everyone_component_is_allowed() {
        let access = evaluate(
            ACTOR,
            AccessFlags::EVERYONE,
            Some(INVOKER),
            Some(Permissions::empty()),
            false,
        );
        assert_eq!(access, Access::Allowed);
    }
}
