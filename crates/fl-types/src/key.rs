//! Type-prefixed store keys.
//!
//! Records of different schemas live in one flat key-value namespace, so each
//! key starts with a prefix naming the schema it holds:
//!
//! - `user:<email>` for users
//! - `project:<name-or-id>` for projects (both schema versions)
//! - `like:<project>:<user_email>` for project likes
//! - `update:<project>:<seq>` for project updates
//! - `update-seq:<project>` for the per-project update counter
//!
//! Keys outside these prefixes belong to the generic write/read path.

use std::fmt;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

const USER_PREFIX: &str = "user:";
const PROJECT_PREFIX: &str = "project:";
const LIKE_PREFIX: &str = "like:";
const UPDATE_PREFIX: &str = "update:";
const UPDATE_SEQ_PREFIX: &str = "update-seq:";

/// Prefixes owned by structured records. Generic writes may not use them.
pub const RESERVED_PREFIXES: &[&str] = &[
    USER_PREFIX,
    PROJECT_PREFIX,
    LIKE_PREFIX,
    UPDATE_PREFIX,
    UPDATE_SEQ_PREFIX,
];

/// Returns `true` if `key` falls inside a record namespace.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// The store key identifying one record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKey {
    User { email: String },
    Project { name: String },
    ProjectLike { project: String, user_email: String },
    ProjectUpdate { project: String, seq: u64 },
    /// Counter holding the last allocated update sequence for a project.
    UpdateSequence { project: String },
}

impl RecordKey {
    pub fn user(email: impl Into<String>) -> Self {
        Self::User {
            email: email.into(),
        }
    }

    pub fn project(name: impl Into<String>) -> Self {
        Self::Project { name: name.into() }
    }

    pub fn project_like(project: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self::ProjectLike {
            project: project.into(),
            user_email: user_email.into(),
        }
    }

    pub fn project_update(project: impl Into<String>, seq: u64) -> Self {
        Self::ProjectUpdate {
            project: project.into(),
            seq,
        }
    }

    pub fn update_sequence(project: impl Into<String>) -> Self {
        Self::UpdateSequence {
            project: project.into(),
        }
    }

    /// The full key string written to the store.
    pub fn canonical(&self) -> String {
        match self {
            Self::User { email } => format!("{USER_PREFIX}{email}"),
            Self::Project { name } => format!("{PROJECT_PREFIX}{name}"),
            Self::ProjectLike {
                project,
                user_email,
            } => format!("{LIKE_PREFIX}{project}{KEY_SEPARATOR}{user_email}"),
            Self::ProjectUpdate { project, seq } => {
                format!("{UPDATE_PREFIX}{project}{KEY_SEPARATOR}{seq}")
            }
            Self::UpdateSequence { project } => format!("{UPDATE_SEQ_PREFIX}{project}"),
        }
    }

    /// Parse a canonical key back into its identity.
    ///
    /// Returns `None` for keys outside the record namespaces or with
    /// malformed segments.
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(project) = key.strip_prefix(UPDATE_SEQ_PREFIX) {
            return non_empty(project).map(Self::update_sequence);
        }
        if let Some(email) = key.strip_prefix(USER_PREFIX) {
            return non_empty(email).map(Self::user);
        }
        if let Some(name) = key.strip_prefix(PROJECT_PREFIX) {
            return non_empty(name).map(Self::project);
        }
        if let Some(rest) = key.strip_prefix(LIKE_PREFIX) {
            let (project, user_email) = rest.split_once(KEY_SEPARATOR)?;
            return Some(Self::project_like(non_empty(project)?, non_empty(user_email)?));
        }
        if let Some(rest) = key.strip_prefix(UPDATE_PREFIX) {
            let (project, seq) = rest.rsplit_once(KEY_SEPARATOR)?;
            let seq = seq.parse().ok()?;
            return Some(Self::project_update(non_empty(project)?, seq));
        }
        None
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn non_empty(segment: &str) -> Option<&str> {
    (!segment.is_empty()).then_some(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(RecordKey::user("a@x.com").canonical(), "user:a@x.com");
        assert_eq!(RecordKey::project("P1").canonical(), "project:P1");
        assert_eq!(
            RecordKey::project_like("P1", "a@x.com").canonical(),
            "like:P1:a@x.com"
        );
        assert_eq!(RecordKey::project_update("P1", 3).canonical(), "update:P1:3");
        assert_eq!(RecordKey::update_sequence("P1").canonical(), "update-seq:P1");
    }

    #[test]
    fn display_matches_canonical() {
        let key = RecordKey::project_like("P1", "b@x.com");
        assert_eq!(key.to_string(), key.canonical());
    }

    #[test]
    fn reserved_prefixes_are_detected() {
        assert!(is_reserved_key("user:a@x.com"));
        assert!(is_reserved_key("project:"));
        assert!(is_reserved_key("update-seq:P1"));
        assert!(!is_reserved_key("hello_world"));
        assert!(!is_reserved_key("users"));
        assert!(!is_reserved_key("a@x.com"));
    }

    #[test]
    fn parse_rejects_foreign_and_malformed_keys() {
        assert_eq!(RecordKey::parse("hello_world"), None);
        assert_eq!(RecordKey::parse("user:"), None);
        assert_eq!(RecordKey::parse("like:P1"), None);
        assert_eq!(RecordKey::parse("like::a@x.com"), None);
        assert_eq!(RecordKey::parse("update:P1:latest"), None);
    }

    #[test]
    fn parse_distinguishes_update_counter_from_update() {
        assert_eq!(
            RecordKey::parse("update-seq:P1"),
            Some(RecordKey::update_sequence("P1"))
        );
        assert_eq!(
            RecordKey::parse("update:P1:12"),
            Some(RecordKey::project_update("P1", 12))
        );
    }

    proptest! {
        #[test]
        fn separator_free_segments_parse_back(
            project in "[A-Za-z0-9 _.@-]{1,24}",
            email in "[a-z0-9._-]{1,12}@[a-z]{1,8}\\.com",
            seq in any::<u64>(),
        ) {
            let keys = [
                RecordKey::user(email.clone()),
                RecordKey::project(project.clone()),
                RecordKey::project_like(project.clone(), email),
                RecordKey::project_update(project.clone(), seq),
                RecordKey::update_sequence(project),
            ];
            for key in keys {
                prop_assert_eq!(RecordKey::parse(&key.canonical()), Some(key));
            }
        }
    }
}
