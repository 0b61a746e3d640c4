//! Group membership and token issuance rights

use crate::config::{ConfigError, SessionConfig};
use std::collections::{BTreeSet, HashMap};

/// Membership table loaded from `GROUP_MEMBERS`.
///
/// Members are matched on the provider subject or on the email address the
/// provider reported. Members of the admin group may issue tokens for any
/// group; everyone else only for groups they belong to.
#[derive(Debug, Clone, Default)]
pub struct GroupPolicy {
    admin_group_id: i32,
    members: HashMap<String, BTreeSet<i32>>,
}

impl GroupPolicy {
    pub fn new(admin_group_id: i32) -> Self {
        Self {
            admin_group_id,
            members: HashMap::new(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        if config.admin_group_id <= 0 {
            return Err(ConfigError::Invalid {
                name: "ADMIN_GROUP_ID",
                reason: format!("group id {} must be positive", config.admin_group_id),
            });
        }
        let mut policy = Self::new(config.admin_group_id);
        for (group_id, member) in parse_members(&config.group_members)? {
            policy.add_member(group_id, member);
        }
        Ok(policy)
    }

    pub fn add_member(&mut self, group_id: i32, member: impl Into<String>) {
        self.members
            .entry(member.into())
            .or_default()
            .insert(group_id);
    }

    pub fn admin_group_id(&self) -> i32 {
        self.admin_group_id
    }

    /// Groups the identity belongs to, sorted and without duplicates
    pub fn groups_for(&self, sub: &str, email: Option<&str>) -> Vec<i32> {
        let mut groups = BTreeSet::new();
        for key in std::iter::once(sub).chain(email) {
            if let Some(found) = self.members.get(key) {
                groups.extend(found.iter().copied());
            }
        }
        groups.into_iter().collect()
    }

    pub fn is_admin(&self, groups: &[i32]) -> bool {
        groups.contains(&self.admin_group_id)
    }

    /// Whether an identity holding `groups` may mint a token for `group_id`
    pub fn may_issue(&self, groups: &[i32], group_id: i32) -> bool {
        self.is_admin(groups) || groups.contains(&group_id)
    }
}

/// Parse `1=alice@example.org,bob;2=carol` into `(group, member)` pairs
fn parse_members(raw: &str) -> Result<Vec<(i32, String)>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "GROUP_MEMBERS",
        reason,
    };

    let mut pairs = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (group, members) = entry
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected 'group=members', got '{entry}'")))?;
        let group_id: i32 = group
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a group id", group.trim())))?;
        if group_id <= 0 {
            return Err(invalid(format!("group id {group_id} must be positive")));
        }
        for member in members.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            pairs.push((group_id, member.to_string()));
        }
    }
    Ok(pairs)
}
