//! Module grants and their compact token form.
//!
//! A grant is a module id plus a 32-bit permission mask. On the wire it
//! travels as a single string: the bare module id when the mask is 0, or the
//! module id, one space and the mask in unpadded uppercase hex (`"orders 1A"`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ACTION_NONE: i32 = 0;
pub const ACTION_READ: i32 = 1;
pub const ACTION_WRITE: i32 = 2;
pub const ACTION_APPROVE: i32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Privilege {
    pub module_id: String,
    pub permissions: i32,
}

impl Privilege {
    pub fn new(module_id: impl Into<String>, permissions: i32) -> Self {
        Self { module_id: module_id.into(), permissions }
    }

    pub fn encode(&self) -> String {
        encode(&self.module_id, self.permissions)
    }
}

/// `moduleId` when `mask` is 0, otherwise `"moduleId HEX"`
pub fn encode(module_id: &str, mask: i32) -> String {
    if mask == ACTION_NONE {
        module_id.to_string()
    } else {
        format!("{} {:X}", module_id, mask)
    }
}

/// Inverse of [`encode`]. A mask that is not valid hex decodes to 0 instead
/// of failing; callers that care must validate the token first.
pub fn decode(token: &str) -> Privilege {
    let mut parts = token.split(' ');
    let module_id = parts.next().unwrap_or_default();
    let permissions = parts
        .next()
        .and_then(|hex| i64::from_str_radix(hex, 16).ok())
        .map(|n| n as i32)
        .unwrap_or(ACTION_NONE);
    Privilege::new(module_id, permissions)
}

/// True when a mask set grants `action`. A mask of 0 means unrestricted
/// access to the module.
pub fn allows(masks: &[i32], action: i32) -> bool {
    if masks.is_empty() {
        return false;
    }
    if masks.contains(&ACTION_NONE) {
        return true;
    }
    let merged = masks.iter().fold(0, |acc, m| acc | m);
    merged & action == action
}

/// Collapse one user's grants into a single grant per module, ordered by module id
pub fn merge(privileges: impl IntoIterator<Item = Privilege>) -> Vec<Privilege> {
    let mut merged: std::collections::BTreeMap<String, i32> = std::collections::BTreeMap::new();
    for p in privileges {
        merged
            .entry(p.module_id)
            .and_modify(|m| {
                if *m != ACTION_NONE {
                    *m = if p.permissions == ACTION_NONE { ACTION_NONE } else { *m | p.permissions };
                }
            })
            .or_insert(p.permissions);
    }
    merged.into_iter().map(|(module_id, permissions)| Privilege { module_id, permissions }).collect()
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Privilege {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(decode(s))
    }
}

impl Serialize for Privilege {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Privilege {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(decode(&token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mask_encodes_bare_module() {
        assert_eq!(encode("catalog", 0), "catalog");
        assert_eq!(encode("orders", 26), "orders 1A");
        assert_eq!(encode("orders", 255), "orders FF");
    }

    #[test]
    fn decode_inverts_encode() {
        for (module, mask) in [("a", 0), ("b", 1), ("orders", 26), ("big", i32::MAX), ("x.y-z", 0x7F00_0000)] {
            assert_eq!(decode(&encode(module, mask)), Privilege::new(module, mask));
        }
    }

    #[test]
    fn negative_masks_survive_round_trip() {
        let token = encode("all", -1);
        assert_eq!(token, "all FFFFFFFF");
        assert_eq!(decode(&token).permissions, -1);
    }

    #[test]
    fn bad_hex_decodes_to_no_permission() {
        assert_eq!(decode("orders zz"), Privilege::new("orders", 0));
        assert_eq!(decode("orders "), Privilege::new("orders", 0));
        assert_eq!(decode("orders 1a"), Privilege::new("orders", 26));
    }

    #[test]
    fn serializes_as_token_strings() {
        let list = vec![Privilege::new("catalog", 0), Privilege::new("orders", 26)];
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!(["catalog", "orders 1A"]));
        let back: Vec<Privilege> = serde_json::from_value(json).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn checks_actions_against_masks() {
        assert!(allows(&[ACTION_READ | ACTION_WRITE], ACTION_WRITE));
        assert!(allows(&[ACTION_READ, ACTION_WRITE], ACTION_READ | ACTION_WRITE));
        assert!(!allows(&[ACTION_READ], ACTION_WRITE));
        assert!(allows(&[ACTION_READ, ACTION_NONE], ACTION_APPROVE));
        assert!(!allows(&[], ACTION_READ));
    }

    #[test]
    fn merges_grants_per_module() {
        let merged = merge(vec![
            Privilege::new("job", 1),
            Privilege::new("article", 2),
            Privilege::new("job", 2),
            Privilege::new("role", 1),
            Privilege::new("role", 0),
        ]);
        assert_eq!(
            merged,
            vec![Privilege::new("article", 2), Privilege::new("job", 3), Privilege::new("role", 0)]
        );
    }
}
