//! Access-flag codec for component custom ids.
//!
//! A component's custom id may carry an access-control tag set encoded as a
//! suffix: `id + "-" + one character per flag`. [`decode`] is total — any
//! string splits into an id and a (possibly empty) flag set, and characters
//! outside the alphabet are ignored so newer encoders never break older
//! decoders.

use bitflags::bitflags;

bitflags! {
    /// The access-control tag set a component id can carry.
    ///
    /// Absence of [`EVERYONE`](Self::EVERYONE) means only the user who
    /// invoked the original command may activate the component.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u8 {
        /// Anyone may activate the component, not just the original invoker.
        const EVERYONE = 1 << 0;
        /// Deny unless the actor is a configured bot owner.
        const BOT_ADMIN = 1 << 1;
        /// Requires the administrator permission.
        const GUILD_ADMIN = 1 << 2;
        /// Requires the manage-server permission.
        const MANAGE_SERVER = 1 << 3;
        /// Requires the manage-messages permission.
        const MANAGE_MESSAGES = 1 << 4;
    }
}

impl Default for AccessFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// The fixed single-character alphabet, one entry per flag.
const ALPHABET: [(char, AccessFlags); 5] = [
    ('a', AccessFlags::GUILD_ADMIN),
    ('b', AccessFlags::MANAGE_MESSAGES),
    ('c', AccessFlags::MANAGE_SERVER),
    ('d', AccessFlags::BOT_ADMIN),
    ('e', AccessFlags::EVERYONE),
];

fn flag_char(flag: AccessFlags) -> Option<char> {
    ALPHABET
        .iter()
        .find(|(_, f)| *f == flag)
        .map(|(c, _)| *c)
}

fn char_flag(c: char) -> Option<AccessFlags> {
    ALPHABET
        .iter()
        .find(|(fc, _)| *fc == c)
        .map(|(_, f)| *f)
}

/// Encode `flags` into a custom id. Returns `id` unchanged when `flags` is
/// empty.
pub fn encode(id: &str, flags: AccessFlags) -> String {
    if flags.is_empty() {
        return id.to_string();
    }

    let mut out = String::with_capacity(id.len() + 1 + flags.bits().count_ones() as usize);
    out.push_str(id);
    out.push('-');
    for flag in flags.iter() {
        if let Some(c) = flag_char(flag) {
            out.push(c);
        }
    }
    out
}

/// Decode a raw custom id into `(id, flags)`.
///
/// Splits at the first `-`; everything before it is the true id, everything
/// after is scanned character by character. Unknown characters (including
/// further `-` separators) are discarded; duplicates collapse. Never fails.
pub fn decode(raw: &str) -> (String, AccessFlags) {
    let Some((id, tail)) = raw.split_once('-') else {
        return (raw.to_string(), AccessFlags::empty());
    };

    let mut flags = AccessFlags::empty();
    for c in tail.chars() {
        if let Some(flag) = char_flag(c) {
            flags |= flag;
        }
    }
    (id.to_string(), flags)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_empty_flags_leaves_id_unchanged() {
        assert_eq!(encode("confirm", AccessFlags::empty()), "confirm");
    }

    #[test]
    fn encode_appends_suffix() {
        let encoded = encode(
            "confirm",
            AccessFlags::GUILD_ADMIN | AccessFlags::MANAGE_MESSAGES,
        );
        assert_eq!(encoded, "confirm-ab");
    }

    #[test]
    fn decode_without_separator_yields_empty_set() {
        let (id, flags) = decode("confirm");
        assert_eq!(id, "confirm");
        assert!(flags.is_empty());
    }

    #[test]
    fn decode_splits_at_first_separator() {
        let (id, flags) = decode("confirm-ea");
        assert_eq!(id, "confirm");
        assert_eq!(flags, AccessFlags::EVERYONE | AccessFlags::GUILD_ADMIN);
    }

    #[test]
    fn decode_ignores_unknown_characters() {
        let (id, flags) = decode("confirm-z9a-e");
        assert_eq!(id, "confirm");
        assert_eq!(flags, AccessFlags::GUILD_ADMIN | AccessFlags::EVERYONE);
    }

    #[test]
    fn decode_collapses_duplicates() {
        let (_, flags) = decode("x-aaa");
        assert_eq!(flags, AccessFlags::GUILD_ADMIN);
    }

    #[test]
    fn roundtrip_over_all_subsets() {
        // All 32 subsets of the 5-flag vocabulary.
        for bits in 0u8..32 {
            let flags = AccessFlags::from_bits_truncate(bits);
            let (id, decoded) = decode(&encode("widget_confirm", flags));
            assert_eq!(id, "widget_confirm");
            assert_eq!(decoded, flags, "subset {bits:05b} failed to roundtrip");
        }
    }

    #[test]
    fn alphabet_is_stable() {
        assert_eq!(decode("x-a").1, AccessFlags::GUILD_ADMIN);
        assert_eq!(decode("x-b").1, AccessFlags::MANAGE_MESSAGES);
        assert_eq!(decode("x-c").1, AccessFlags::MANAGE_SERVER);
        assert_eq!(decode("x-d").1, AccessFlags::BOT_ADMIN);
        assert_eq!(decode("x-e").1, AccessFlags::EVERYONE);
    }
}
