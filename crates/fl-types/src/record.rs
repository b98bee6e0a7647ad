//! Persisted record schemas.
//!
//! Records are stored as JSON objects tagged with `docType`. Decoding always
//! goes through [`Record::decode`], which branches on the tag, so a value
//! written as one schema can never be silently read back as another.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::RecordKey;

/// A registered account.
///
/// The three-field form comes from `init_user`; the optional credentials
/// and contact fields are only populated by `init_user_extended`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl User {
    pub fn key(&self) -> RecordKey {
        RecordKey::user(&self.email)
    }
}

/// A funding campaign created through `init_project_extended`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub postdate: String,
    pub enddate: String,
    pub minfund: i64,
    pub maxfund: i64,
    pub sponsor_email: String,
    pub status: String,
    /// Sum of all pledges applied so far. Always `0` at creation.
    #[serde(default)]
    pub pledge_amount: i64,
}

impl Project {
    pub fn key(&self) -> RecordKey {
        RecordKey::project(&self.name)
    }
}

/// A funding campaign created through the four-argument `init_project`.
///
/// Shares the `project:` namespace with [`Project`], keyed by `project_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyProject {
    pub project_id: String,
    pub name: String,
    pub owner_email: String,
    pub money_goal: i64,
    #[serde(default)]
    pub money_donated: i64,
}

impl LegacyProject {
    pub fn key(&self) -> RecordKey {
        RecordKey::project(&self.project_id)
    }
}

/// One user's like of a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLike {
    pub project_name: String,
    pub user_email: String,
}

impl ProjectLike {
    pub fn key(&self) -> RecordKey {
        RecordKey::project_like(&self.project_name, &self.user_email)
    }
}

/// A dated progress note posted on a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub project_name: String,
    /// Position of this update in the project's update stream, starting at 1.
    pub seq: u64,
    pub date: String,
    pub text: String,
}

impl ProjectUpdate {
    pub fn key(&self) -> RecordKey {
        RecordKey::project_update(&self.project_name, self.seq)
    }
}

/// The discriminant of a [`Record`], as stored in `docType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    User,
    Project,
    LegacyProject,
    ProjectLike,
    ProjectUpdate,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::LegacyProject => "legacy_project",
            Self::ProjectLike => "project_like",
            Self::ProjectUpdate => "project_update",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any structured record the chaincode persists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "docType", rename_all = "snake_case")]
pub enum Record {
    User(User),
    Project(Project),
    LegacyProject(LegacyProject),
    ProjectLike(ProjectLike),
    ProjectUpdate(ProjectUpdate),
}

impl Record {
    /// Serialize to the stored JSON representation.
    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Encode(e.to_string()))
    }

    /// Parse stored bytes, branching on the `docType` tag.
    pub fn decode(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Decode(e.to_string()))
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::User(_) => RecordKind::User,
            Self::Project(_) => RecordKind::Project,
            Self::LegacyProject(_) => RecordKind::LegacyProject,
            Self::ProjectLike(_) => RecordKind::ProjectLike,
            Self::ProjectUpdate(_) => RecordKind::ProjectUpdate,
        }
    }

    /// The key this record is stored under.
    pub fn key(&self) -> RecordKey {
        match self {
            Self::User(u) => u.key(),
            Self::Project(p) => p.key(),
            Self::LegacyProject(p) => p.key(),
            Self::ProjectLike(l) => l.key(),
            Self::ProjectUpdate(u) => u.key(),
        }
    }

    /// Returns `true` for either project schema.
    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project(_) | Self::LegacyProject(_))
    }

    /// Total pledged so far, for either project schema.
    pub fn pledged(&self) -> Option<i64> {
        match self {
            Self::Project(p) => Some(p.pledge_amount),
            Self::LegacyProject(p) => Some(p.money_donated),
            _ => None,
        }
    }

    /// Add `amount` to a project's pledged total and return the new total.
    ///
    /// Returns `Ok(None)` if this record is not a project.
    pub fn add_pledge(&mut self, amount: i64) -> Result<Option<i64>, TypeError> {
        let total = match self {
            Self::Project(p) => &mut p.pledge_amount,
            Self::LegacyProject(p) => &mut p.money_donated,
            _ => return Ok(None),
        };
        *total = total.checked_add(amount).ok_or(TypeError::PledgeOverflow {
            current: *total,
            amount,
        })?;
        Ok(Some(*total))
    }
}

impl From<User> for Record {
    fn from(user: User) -> Self {
        Self::User(user)
    }
}

impl From<Project> for Record {
    fn from(project: Project) -> Self {
        Self::Project(project)
    }
}

impl From<LegacyProject> for Record {
    fn from(project: LegacyProject) -> Self {
        Self::LegacyProject(project)
    }
}

impl From<ProjectLike> for Record {
    fn from(like: ProjectLike) -> Self {
        Self::ProjectLike(like)
    }
}

impl From<ProjectUpdate> for Record {
    fn from(update: ProjectUpdate) -> Self {
        Self::ProjectUpdate(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn ann() -> User {
        User {
            email: "a@x.com".into(),
            firstname: "Ann".into(),
            lastname: "Lee".into(),
            password: None,
            ccn: None,
            phone: None,
        }
    }

    fn campaign() -> Project {
        Project {
            name: "P1".into(),
            description: "desc".into(),
            postdate: "2024-01-01".into(),
            enddate: "2024-02-01".into(),
            minfund: 100,
            maxfund: 500,
            sponsor_email: "sponsor@x.com".into(),
            status: "open".into(),
            pledge_amount: 0,
        }
    }

    #[test]
    fn user_encodes_with_doc_type_and_without_absent_fields() {
        let bytes = Record::from(ann()).encode().unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["docType"], "user");
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["firstname"], "Ann");
        assert_eq!(json["lastname"], "Lee");
        assert!(json.get("password").is_none());
        assert!(json.get("ccn").is_none());
    }

    #[test]
    fn decode_hand_written_user_document() {
        let doc = br#"{"docType":"user","email":"a@x.com","firstname":"Ann","lastname":"Lee"}"#;
        let record = Record::decode(doc).unwrap();
        assert_eq!(record, Record::User(ann()));
        assert_eq!(record.kind(), RecordKind::User);
        assert_eq!(record.key(), RecordKey::user("a@x.com"));
    }

    #[test]
    fn decode_rejects_missing_or_unknown_doc_type() {
        let untagged = br#"{"email":"a@x.com","firstname":"Ann","lastname":"Lee"}"#;
        assert!(matches!(Record::decode(untagged), Err(TypeError::Decode(_))));

        let unknown = br#"{"docType":"marble","color":"blue"}"#;
        assert!(matches!(Record::decode(unknown), Err(TypeError::Decode(_))));
    }

    #[test]
    fn decode_rejects_raw_bytes() {
        assert!(Record::decode(b"hello").is_err());
    }

    #[test]
    fn project_tag_keeps_schemas_apart() {
        let bytes = Record::from(campaign()).encode().unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["docType"], "project");
        assert_eq!(json["pledge_amount"], 0);

        let legacy = LegacyProject {
            project_id: "p-7".into(),
            name: "Garden".into(),
            owner_email: "o@x.com".into(),
            money_goal: 900,
            money_donated: 0,
        };
        let record = Record::decode(&Record::from(legacy.clone()).encode().unwrap()).unwrap();
        assert_eq!(record.kind(), RecordKind::LegacyProject);
        assert_eq!(record.key(), RecordKey::project("p-7"));
        assert_eq!(record, Record::LegacyProject(legacy));
    }

    #[test]
    fn add_pledge_accumulates_on_both_project_schemas() {
        let mut record = Record::from(campaign());
        assert_eq!(record.add_pledge(50).unwrap(), Some(50));
        assert_eq!(record.add_pledge(25).unwrap(), Some(75));
        assert_eq!(record.pledged(), Some(75));

        let mut legacy = Record::from(LegacyProject {
            project_id: "p-7".into(),
            name: "Garden".into(),
            owner_email: "o@x.com".into(),
            money_goal: 900,
            money_donated: 10,
        });
        assert_eq!(legacy.add_pledge(5).unwrap(), Some(15));
    }

    #[test]
    fn add_pledge_ignores_non_projects() {
        let mut record = Record::from(ann());
        assert_eq!(record.add_pledge(5).unwrap(), None);
        assert_eq!(record.pledged(), None);
        assert!(!record.is_project());
    }

    #[test]
    fn add_pledge_reports_overflow_without_mutating() {
        let mut project = campaign();
        project.pledge_amount = i64::MAX - 1;
        let mut record = Record::from(project);
        let err = record.add_pledge(2).unwrap_err();
        assert_eq!(
            err,
            TypeError::PledgeOverflow {
                current: i64::MAX - 1,
                amount: 2
            }
        );
        assert_eq!(record.pledged(), Some(i64::MAX - 1));
    }

    #[test]
    fn update_and_like_keys_are_composite() {
        let like = ProjectLike {
            project_name: "P1".into(),
            user_email: "b@x.com".into(),
        };
        assert_eq!(Record::from(like).key().canonical(), "like:P1:b@x.com");

        let update = ProjectUpdate {
            project_name: "P1".into(),
            seq: 2,
            date: "2024-01-05".into(),
            text: "halfway".into(),
        };
        assert_eq!(Record::from(update).key().canonical(), "update:P1:2");
    }
}
