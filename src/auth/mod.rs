use std::collections::BTreeSet;

use crate::database::models::Role;

/// The global wildcard, granting every permission
pub const WILDCARD: &str = "*";

/// Union of the permission strings held by an identity's roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: BTreeSet<String>,
}

impl PermissionSet {
    pub fn new<I, S>(granted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: granted.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_roles(roles: &[Role]) -> Self {
        Self::new(roles.iter().flat_map(|role| role.permissions.iter().cloned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }

    /// True when any granted permission covers any of `required`.
    ///
    /// A grant ending in `.*` covers everything that starts with the text
    /// before it. This is a plain string prefix, so `users.*` also covers
    /// `users2.edit`.
    pub fn allows<S: AsRef<str>>(&self, required: &[S]) -> bool {
        if self.granted.contains(WILDCARD) {
            return true;
        }

        self.granted.iter().any(|grant| {
            let prefix = grant.strip_suffix(".*").unwrap_or(grant);
            required.iter().any(|r| r.as_ref().starts_with(prefix))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_wildcard_allows_anything() {
        let set = PermissionSet::new(["*"]);
        assert!(set.allows(&["users.delete"]));
        assert!(set.allows(&["anything.at.all"]));
        assert!(set.allows::<&str>(&[]));
    }

    #[test]
    fn trailing_wildcard_covers_its_prefix() {
        let set = PermissionSet::new(["users.*"]);
        assert!(set.allows(&["users.delete"]));
        assert!(set.allows(&["users.roles.assign"]));
        assert!(!set.allows(&["roles.delete"]));
    }

    #[test]
    fn exact_grant_does_not_cover_siblings() {
        let set = PermissionSet::new(["users.view"]);
        assert!(!set.allows(&["users.delete"]));
        assert!(set.allows(&["users.view"]));
    }

    #[test]
    fn prefix_match_is_not_segment_aware() {
        // existing contract: the stripped grant is compared as raw text
        let set = PermissionSet::new(["users.*"]);
        assert!(set.allows(&["users2.edit"]));

        let set = PermissionSet::new(["a.b.*"]);
        assert!(set.allows(&["a.bc.delete"]));
    }

    #[test]
    fn any_required_permission_is_enough() {
        let set = PermissionSet::new(["roles.view"]);
        assert!(set.allows(&["users.view", "roles.view"]));
    }

    #[test]
    fn empty_grant_set_denies() {
        let set = PermissionSet::default();
        assert!(!set.allows(&["users.view"]));
    }

    #[test]
    fn union_across_roles() {
        let mut admin: Role = serde_json::from_value(serde_json::json!({
            "name": "Admin", "permissions": ["users.*"]
        }))
        .unwrap();
        admin.permissions.push("roles.view".into());
        let viewer: Role = serde_json::from_value(serde_json::json!({
            "name": "Viewer", "permissions": ["organizations.view"]
        }))
        .unwrap();

        let set = PermissionSet::from_roles(&[admin, viewer]);
        assert_eq!(set.iter().count(), 3);
        assert!(set.allows(&["organizations.view"]));
        assert!(!set.allows(&["organizations.delete"]));
    }
}
