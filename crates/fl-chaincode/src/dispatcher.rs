use fl_store::KvStore;
use fl_types::{ProjectLike, ProjectUpdate, Record, RecordKey, User};
use tracing::{debug, warn};

use crate::config::ChaincodeConfig;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::handlers;
use crate::operation::{validate, Operation, OperationKind};

/// Entry point mapping operation names and positional arguments onto
/// handlers over a [`KvStore`].
///
/// Calls are synchronous and independent. The chaincode keeps no state of
/// its own beyond its configuration; everything lives in the store.
pub struct Chaincode<S> {
    store: S,
    config: ChaincodeConfig,
}

impl<S: KvStore> Chaincode<S> {
    /// Create a chaincode over `store` with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ChaincodeConfig::default())
    }

    pub fn with_config(store: S, config: ChaincodeConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ChaincodeConfig {
        &self.config
    }

    /// Run a named operation.
    ///
    /// Returns the raw stored bytes for `read` and `None` for every write.
    pub fn invoke<A: AsRef<str>>(
        &self,
        operation: &str,
        args: &[A],
    ) -> ChaincodeResult<Option<Vec<u8>>> {
        let kind = OperationKind::from_name(operation).ok_or_else(|| {
            warn!(operation, "invoke did not find operation");
            ChaincodeError::UnknownOperation(operation.to_string())
        })?;
        self.dispatch(kind, args)
    }

    /// Run a named read-only operation. Write operations are unknown here.
    pub fn query<A: AsRef<str>>(&self, operation: &str, args: &[A]) -> ChaincodeResult<Vec<u8>> {
        let kind = OperationKind::from_name(operation)
            .filter(OperationKind::is_query)
            .ok_or_else(|| {
                warn!(operation, "query did not find operation");
                ChaincodeError::UnknownOperation(operation.to_string())
            })?;
        let payload = self.dispatch(kind, args)?;
        Ok(payload.unwrap_or_default())
    }

    fn dispatch<A: AsRef<str>>(
        &self,
        kind: OperationKind,
        args: &[A],
    ) -> ChaincodeResult<Option<Vec<u8>>> {
        debug!(operation = kind.name(), args = args.len(), "starting operation");
        let result = validate(kind, args).and_then(|op| self.execute(op));
        match &result {
            Ok(_) => debug!(operation = kind.name(), "operation complete"),
            Err(e) => debug!(operation = kind.name(), error = %e, "operation rejected"),
        }
        result
    }

    /// Execute an already-validated operation.
    pub fn execute(&self, operation: Operation) -> ChaincodeResult<Option<Vec<u8>>> {
        let store = &self.store;
        match operation {
            Operation::Init { value } => handlers::init(store, &self.config, &value)?,
            Operation::Write { key, value } => handlers::write(store, &key, &value)?,
            Operation::Read { key } => return handlers::read(store, &key).map(Some),
            Operation::InitUser { form, user } => handlers::init_user(store, form, user)?,
            Operation::InitProject(draft) => handlers::init_project(store, &self.config, draft)?,
            Operation::InitProjectLike(like) => handlers::init_project_like(store, like)?,
            Operation::InitProjectUpdate {
                project_name,
                date,
                text,
            } => {
                handlers::init_project_update(store, &self.config, project_name, date, text)?;
            }
            Operation::InitPledge {
                project_name,
                amount,
            } => {
                handlers::apply_pledge(store, &self.config, &project_name, amount)?;
            }
        }
        Ok(None)
    }

    // ---- Typed reads ----

    /// Decode whatever record is stored at `key`.
    pub fn record(&self, key: &str) -> ChaincodeResult<Record> {
        handlers::load_record(&self.store, key)
    }

    pub fn user(&self, email: &str) -> ChaincodeResult<User> {
        let key = RecordKey::user(email).canonical();
        match self.record(&key)? {
            Record::User(u) => Ok(u),
            other => Err(mismatch(&key, "user", &other)),
        }
    }

    /// The project at `name`, in whichever schema it was created with.
    pub fn project(&self, name: &str) -> ChaincodeResult<Record> {
        let key = RecordKey::project(name).canonical();
        let record = self.record(&key)?;
        if !record.is_project() {
            return Err(mismatch(&key, "project", &record));
        }
        Ok(record)
    }

    pub fn project_like(&self, project: &str, user_email: &str) -> ChaincodeResult<ProjectLike> {
        let key = RecordKey::project_like(project, user_email).canonical();
        match self.record(&key)? {
            Record::ProjectLike(l) => Ok(l),
            other => Err(mismatch(&key, "project_like", &other)),
        }
    }

    pub fn project_update(&self, project: &str, seq: u64) -> ChaincodeResult<ProjectUpdate> {
        let key = RecordKey::project_update(project, seq).canonical();
        match self.record(&key)? {
            Record::ProjectUpdate(u) => Ok(u),
            other => Err(mismatch(&key, "project_update", &other)),
        }
    }

    /// Highest update sequence number the project's counter has reached.
    pub fn update_count(&self, project: &str) -> ChaincodeResult<u64> {
        handlers::read_counter(&self.store, &RecordKey::update_sequence(project).canonical())
    }

    /// All updates posted on `project`, oldest first.
    ///
    /// Missing numbers up to the counter are skipped, and updates stored
    /// past a counter that has not caught up yet are included.
    pub fn project_updates(&self, project: &str) -> ChaincodeResult<Vec<ProjectUpdate>> {
        let count = self.update_count(project)?;
        let mut updates = Vec::new();
        let mut seq: u64 = 0;
        loop {
            seq += 1;
            match self.project_update(project, seq) {
                Ok(update) => updates.push(update),
                Err(ChaincodeError::NotFound { .. }) if seq <= count => {}
                Err(ChaincodeError::NotFound { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(updates)
    }
}

fn mismatch(key: &str, expected: &str, found: &Record) -> ChaincodeError {
    ChaincodeError::corrupt(key, format!("expected {expected}, found {}", found.kind()))
}
