//! Guild permission bitflags.
//!
//! Discord sends a member's computed permissions as a decimal string
//! (`"2147483647"`), so the serde impls here parse and emit strings rather
//! than numbers. Only the bits the dispatch engine actually inspects are
//! named; unknown bits are retained so re-serialization is lossless.

use std::fmt;

use bitflags::bitflags;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// A member's guild permission bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u64 {
        const CREATE_INSTANT_INVITE = 1 << 0;
        const KICK_MEMBERS = 1 << 1;
        const BAN_MEMBERS = 1 << 2;
        const ADMINISTRATOR = 1 << 3;
        const MANAGE_CHANNELS = 1 << 4;
        const MANAGE_GUILD = 1 << 5;
        const VIEW_CHANNEL = 1 << 10;
        const SEND_MESSAGES = 1 << 11;
        const MANAGE_MESSAGES = 1 << 13;

        const _ = !0;
    }
}

impl Permissions {
    /// Whether the administrator bit is set.
    pub fn is_admin(self) -> bool {
        self.contains(Self::ADMINISTRATOR)
    }

    /// Whether the member can manage the guild. Administrators implicitly can.
    pub fn can_manage_guild(self) -> bool {
        self.is_admin() || self.contains(Self::MANAGE_GUILD)
    }

    /// Whether the member can manage messages. Administrators implicitly can.
    pub fn can_manage_messages(self) -> bool {
        self.is_admin() || self.contains(Self::MANAGE_MESSAGES)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.bits())
    }
}

struct PermissionsVisitor;

impl<'de> Visitor<'de> for PermissionsVisitor {
    type Value = Permissions;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("permission bits as a string or integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Permissions::from_bits_retain(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map(Permissions::from_bits_retain)
            .map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PermissionsVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_decimal_string() {
        let perms: Permissions = serde_json::from_str("\"8\"").unwrap();
        assert!(perms.is_admin());
    }

    #[test]
    fn serializes_to_decimal_string() {
        let perms = Permissions::ADMINISTRATOR | Permissions::MANAGE_MESSAGES;
        let json = serde_json::to_string(&perms).unwrap();
        assert_eq!(json, format!("\"{}\"", (1u64 << 3) | (1 << 13)));
    }

    #[test]
    fn unknown_bits_survive_roundtrip() {
        let raw = "\"1152921504606846975\"";
        let perms: Permissions = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&perms).unwrap(), raw);
    }

    #[test]
    fn admin_implies_manage_helpers() {
        let admin = Permissions::ADMINISTRATOR;
        assert!(admin.can_manage_guild());
        assert!(admin.can_manage_messages());
        assert!(!admin.contains(Permissions::MANAGE_GUILD));
    }

    #[test]
    fn manage_bits_without_admin() {
        let perms = Permissions::MANAGE_GUILD | Permissions::SEND_MESSAGES;
        assert!(!perms.is_admin());
        assert!(perms.can_manage_guild());
        assert!(!perms.can_manage_messages());
    }
}
