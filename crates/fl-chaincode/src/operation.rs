//! Operation catalogue and argument validation.
//!
//! Each named operation declares its positional parameters. [`validate`]
//! checks the argument count, then the content of each argument, and only
//! then builds a typed [`Operation`]. Nothing in this module touches the
//! store, so a call rejected here can never have mutated state.
//!
//! Content rules:
//! - Money fields parse as base-10 `i64` and must not be negative. Pledges
//!   must be strictly positive. A parse failure is always an error, never a
//!   silent zero.
//! - Identity fields (emails, project names and ids) must be non-empty and
//!   must not contain the key separator `:`, since they become key segments.
//! - Generic keys must be non-empty and outside every record namespace.
//! - Nothing is trimmed, escaped or length-limited.

use std::fmt;

use fl_types::{
    is_reserved_key, LegacyProject, Project, ProjectLike, RecordKey, User, KEY_SEPARATOR,
};

use crate::error::{ChaincodeError, ChaincodeResult};

/// Every operation the dispatcher understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Init,
    Write,
    Read,
    InitUser,
    InitUserExtended,
    InitProject,
    InitProjectExtended,
    InitProjectLikes,
    InitProjectUpdates,
    InitPledge,
}

impl OperationKind {
    pub const ALL: [OperationKind; 10] = [
        Self::Init,
        Self::Write,
        Self::Read,
        Self::InitUser,
        Self::InitUserExtended,
        Self::InitProject,
        Self::InitProjectExtended,
        Self::InitProjectLikes,
        Self::InitProjectUpdates,
        Self::InitPledge,
    ];

    /// The name callers invoke this operation by.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Write => "write",
            Self::Read => "read",
            Self::InitUser => "init_user",
            Self::InitUserExtended => "init_user_extended",
            Self::InitProject => "init_project",
            Self::InitProjectExtended => "init_project_extended",
            Self::InitProjectLikes => "init_project_likes",
            Self::InitProjectUpdates => "init_project_updates",
            Self::InitPledge => "init_pledge",
        }
    }

    /// Positional parameter names, in order.
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            Self::Init => &["bootstrap_value"],
            Self::Write => &["key", "value"],
            Self::Read => &["key"],
            Self::InitUser => &["email", "firstname", "lastname"],
            Self::InitUserExtended => &[
                "email",
                "firstname",
                "lastname",
                "password",
                "ccn",
                "phone",
            ],
            Self::InitProject => &["project_id", "name", "owner_email", "money_goal"],
            Self::InitProjectExtended => &[
                "name",
                "description",
                "postdate",
                "enddate",
                "minfund",
                "maxfund",
                "sponsor_email",
                "status",
            ],
            Self::InitProjectLikes => &["project_name", "user_email"],
            Self::InitProjectUpdates => &["project_name", "date", "text"],
            Self::InitPledge => &["project_name", "pledge_amount"],
        }
    }

    /// Exact number of arguments required.
    pub fn arity(&self) -> usize {
        self.params().len()
    }

    /// Look up an operation by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Returns `true` for operations that never write.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which argument layout a user was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserForm {
    /// `email, firstname, lastname`
    Legacy,
    /// Legacy fields plus `password, ccn, phone`.
    Extended,
}

/// A project about to be created, in either schema version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectDraft {
    Legacy(LegacyProject),
    Extended(Project),
}

impl ProjectDraft {
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Legacy(p) => p.key(),
            Self::Extended(p) => p.key(),
        }
    }

    /// Email of the user responsible for the project.
    pub fn sponsor_email(&self) -> &str {
        match self {
            Self::Legacy(p) => &p.owner_email,
            Self::Extended(p) => &p.sponsor_email,
        }
    }
}

/// A validated operation, ready to execute against a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Init {
        value: String,
    },
    Write {
        key: String,
        value: String,
    },
    Read {
        key: String,
    },
    InitUser {
        form: UserForm,
        user: User,
    },
    InitProject(ProjectDraft),
    InitProjectLike(ProjectLike),
    InitProjectUpdate {
        project_name: String,
        date: String,
        text: String,
    },
    InitPledge {
        project_name: String,
        amount: i64,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Init { .. } => OperationKind::Init,
            Self::Write { .. } => OperationKind::Write,
            Self::Read { .. } => OperationKind::Read,
            Self::InitUser {
                form: UserForm::Legacy,
                ..
            } => OperationKind::InitUser,
            Self::InitUser {
                form: UserForm::Extended,
                ..
            } => OperationKind::InitUserExtended,
            Self::InitProject(ProjectDraft::Legacy(_)) => OperationKind::InitProject,
            Self::InitProject(ProjectDraft::Extended(_)) => OperationKind::InitProjectExtended,
            Self::InitProjectLike(_) => OperationKind::InitProjectLikes,
            Self::InitProjectUpdate { .. } => OperationKind::InitProjectUpdates,
            Self::InitPledge { .. } => OperationKind::InitPledge,
        }
    }
}

/// Check arity and content of `args` for `kind` and build the operation.
pub fn validate<A: AsRef<str>>(kind: OperationKind, args: &[A]) -> ChaincodeResult<Operation> {
    if args.len() != kind.arity() {
        return Err(ChaincodeError::Arity {
            operation: kind.name(),
            expected: kind.arity(),
            got: args.len(),
        });
    }
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();

    let op = match kind {
        OperationKind::Init => Operation::Init {
            value: args[0].to_string(),
        },
        OperationKind::Write => Operation::Write {
            key: generic_key(args[0])?,
            value: args[1].to_string(),
        },
        OperationKind::Read => Operation::Read {
            key: non_empty("key", args[0])?,
        },
        OperationKind::InitUser => Operation::InitUser {
            form: UserForm::Legacy,
            user: User {
                email: identity("email", args[0])?,
                firstname: args[1].to_string(),
                lastname: args[2].to_string(),
                password: None,
                ccn: None,
                phone: None,
            },
        },
        OperationKind::InitUserExtended => Operation::InitUser {
            form: UserForm::Extended,
            user: User {
                email: identity("email", args[0])?,
                firstname: args[1].to_string(),
                lastname: args[2].to_string(),
                password: Some(args[3].to_string()),
                ccn: Some(args[4].to_string()),
                phone: Some(args[5].to_string()),
            },
        },
        OperationKind::InitProject => Operation::InitProject(ProjectDraft::Legacy(LegacyProject {
            project_id: identity("project_id", args[0])?,
            name: args[1].to_string(),
            owner_email: identity("owner_email", args[2])?,
            money_goal: money("money_goal", args[3])?,
            money_donated: 0,
        })),
        OperationKind::InitProjectExtended => {
            Operation::InitProject(ProjectDraft::Extended(Project {
                name: identity("name", args[0])?,
                description: args[1].to_string(),
                postdate: args[2].to_string(),
                enddate: args[3].to_string(),
                minfund: money("minfund", args[4])?,
                maxfund: money("maxfund", args[5])?,
                sponsor_email: identity("sponsor_email", args[6])?,
                status: args[7].to_string(),
                pledge_amount: 0,
            }))
        }
        OperationKind::InitProjectLikes => Operation::InitProjectLike(ProjectLike {
            project_name: identity("project_name", args[0])?,
            user_email: identity("user_email", args[1])?,
        }),
        OperationKind::InitProjectUpdates => Operation::InitProjectUpdate {
            project_name: identity("project_name", args[0])?,
            date: args[1].to_string(),
            text: args[2].to_string(),
        },
        OperationKind::InitPledge => {
            let project_name = identity("project_name", args[0])?;
            let amount = money("pledge_amount", args[1])?;
            if amount == 0 {
                return Err(ChaincodeError::content(
                    "pledge_amount",
                    "must be greater than zero",
                ));
            }
            Operation::InitPledge {
                project_name,
                amount,
            }
        }
    };
    Ok(op)
}

fn non_empty(field: &'static str, value: &str) -> ChaincodeResult<String> {
    if value.is_empty() {
        return Err(ChaincodeError::content(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn identity(field: &'static str, value: &str) -> ChaincodeResult<String> {
    let value = non_empty(field, value)?;
    if value.contains(KEY_SEPARATOR) {
        return Err(ChaincodeError::content(
            field,
            format!("must not contain {KEY_SEPARATOR:?}"),
        ));
    }
    Ok(value)
}

fn generic_key(value: &str) -> ChaincodeResult<String> {
    let key = non_empty("key", value)?;
    if is_reserved_key(&key) {
        return Err(ChaincodeError::content(
            "key",
            format!("{key:?} falls inside a record namespace"),
        ));
    }
    Ok(key)
}

fn money(field: &'static str, value: &str) -> ChaincodeResult<i64> {
    let amount: i64 = value
        .parse()
        .map_err(|e| ChaincodeError::content(field, format!("{value:?} is not an integer: {e}")))?;
    if amount < 0 {
        return Err(ChaincodeError::content(field, "must not be negative"));
    }
    Ok(amount)
}
