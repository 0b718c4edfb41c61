//! Collection Permission Codec
//!
//! A collection name may end with a `_DDD_` suffix holding three octal-style
//! digits for the owner, group (account) and everyone tiers, for example
//! `tasks_760_`. Bit `4` grants read, bit `2` grants write. Names without a
//! valid suffix use `owner=7, group=4, everyone=0`. Names starting with
//! `pub_` are fully open.
//!
//! Everything here is a pure function of the collection name.

use serde::{Deserialize, Serialize};

const READ_BIT: u8 = 4;
const WRITE_BIT: u8 = 2;
const PUBLIC_PREFIX: &str = "pub_";

/// Access tier required to see or change a document.
///
/// Variants are ordered by permissiveness: `Owner < Group < Everyone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Only the document owner within its account
    Owner,
    /// Any user of the owning account
    Group,
    /// Any authenticated subscriber
    Everyone,
}

/// Decoded owner/group/everyone bit flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionBits {
    pub owner: u8,
    pub group: u8,
    pub everyone: u8,
}

impl Default for PermissionBits {
    fn default() -> Self {
        Self {
            owner: 7,
            group: 4,
            everyone: 0,
        }
    }
}

impl PermissionBits {
    /// Decode the trailing `_DDD_` suffix of a collection name.
    ///
    /// Malformed or missing suffixes yield the default triple.
    pub fn decode_suffix(name: &str) -> Self {
        Self::parse_suffix(name).unwrap_or_default()
    }

    fn parse_suffix(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        let suffix = bytes.get(bytes.len().checked_sub(5)?..)?;
        match suffix {
            [b'_', o, g, e, b'_'] if [o, g, e].iter().all(|d| d.is_ascii_digit()) => Some(Self {
                owner: o - b'0',
                group: g - b'0',
                everyone: e - b'0',
            }),
            _ => None,
        }
    }

    /// Most permissive tier whose bits satisfy `test`, `Owner` otherwise
    fn most_permissive(&self, test: fn(u8) -> bool) -> PermissionLevel {
        [
            (PermissionLevel::Everyone, self.everyone),
            (PermissionLevel::Group, self.group),
        ]
        .into_iter()
        .filter(|(_, bits)| test(*bits))
        .map(|(level, _)| level)
        .max()
        .unwrap_or(PermissionLevel::Owner)
    }
}

pub fn can_read(bits: u8) -> bool {
    bits & READ_BIT != 0
}

pub fn can_write(bits: u8) -> bool {
    bits & WRITE_BIT != 0
}

/// True iff the collection is always fully open
pub fn is_public_collection(name: &str) -> bool {
    name.starts_with(PUBLIC_PREFIX)
}

/// Tier a subscriber must satisfy to read documents of `name`
pub fn read_permission(name: &str) -> PermissionLevel {
    if is_public_collection(name) {
        return PermissionLevel::Everyone;
    }
    PermissionBits::decode_suffix(name).most_permissive(can_read)
}

/// Tier a caller must satisfy to modify documents of `name`
pub fn write_permission(name: &str) -> PermissionLevel {
    if is_public_collection(name) {
        return PermissionLevel::Everyone;
    }
    PermissionBits::decode_suffix(name).most_permissive(can_write)
}

/// Collection name with the permission suffix removed (`tasks_760_` -> `tasks`)
pub fn base_name(name: &str) -> &str {
    match PermissionBits::parse_suffix(name) {
        Some(_) => &name[..name.len() - 5],
        None => name,
    }
}
