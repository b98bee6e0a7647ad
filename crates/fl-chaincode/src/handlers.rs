//! Operation handlers.
//!
//! Every handler receives an already-validated operation payload. Existence
//! checks go through exactly two helpers with fixed polarity:
//!
//! - [`put_new`] for create-only writes: a populated key is `AlreadyExists`.
//! - [`update_existing`] for read-modify-write: an empty key is `NotFound`.
//!
//! Both write through `compare_and_swap`, so the check and the write are one
//! step for adapters with an atomic conditional write.

use fl_store::{KvStore, StoreError};
use fl_types::{ProjectLike, ProjectUpdate, Record, RecordKey, TypeError, User};
use tracing::{debug, warn};

use crate::config::ChaincodeConfig;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::operation::{ProjectDraft, UserForm};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn encode(key: &str, record: &Record) -> ChaincodeResult<Vec<u8>> {
    record.encode().map_err(|e| {
        ChaincodeError::Store(StoreError::Serialization(format!("{key}: {e}")))
    })
}

fn decode(key: &str, bytes: &[u8]) -> ChaincodeResult<Record> {
    Record::decode(bytes).map_err(|e| ChaincodeError::corrupt(key, e.to_string()))
}

/// Write `record` at its key only if the key is currently empty.
pub(crate) fn put_new<S: KvStore + ?Sized>(store: &S, record: &Record) -> ChaincodeResult<()> {
    let key = record.key().canonical();
    let bytes = encode(&key, record)?;
    if !store.compare_and_swap(&key, None, &bytes)? {
        debug!(%key, "create rejected: key already populated");
        return Err(ChaincodeError::AlreadyExists { key });
    }
    Ok(())
}

/// Read and decode the record at `key`.
pub(crate) fn load_record<S: KvStore + ?Sized>(store: &S, key: &str) -> ChaincodeResult<Record> {
    let bytes = store.get(key)?.ok_or_else(|| ChaincodeError::NotFound {
        key: key.to_string(),
    })?;
    decode(key, &bytes)
}

/// Optimistic read-modify-write of the record at `key`.
///
/// `modify` is re-run on a fresh read whenever another writer got in between
/// the read and the compare-and-swap. Gives up with
/// [`StoreError::Contention`] after `max_attempts` lost races.
pub(crate) fn update_existing<S, F>(
    store: &S,
    key: &str,
    max_attempts: u32,
    mut modify: F,
) -> ChaincodeResult<Record>
where
    S: KvStore + ?Sized,
    F: FnMut(&mut Record) -> ChaincodeResult<()>,
{
    for attempt in 1..=max_attempts {
        let current = store.get(key)?.ok_or_else(|| ChaincodeError::NotFound {
            key: key.to_string(),
        })?;
        let mut record = decode(key, &current)?;
        modify(&mut record)?;
        let bytes = encode(key, &record)?;
        if store.compare_and_swap(key, Some(current.as_slice()), &bytes)? {
            return Ok(record);
        }
        warn!(%key, attempt, "concurrent write detected; retrying");
    }
    Err(StoreError::Contention {
        key: key.to_string(),
        attempts: max_attempts,
    }
    .into())
}

/// Last value of the decimal counter at `key`, or 0 if it was never set.
pub(crate) fn read_counter<S: KvStore + ?Sized>(store: &S, key: &str) -> ChaincodeResult<u64> {
    match store.get(key)? {
        None => Ok(0),
        Some(bytes) => parse_counter(key, &bytes),
    }
}

fn parse_counter(key: &str, bytes: &[u8]) -> ChaincodeResult<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| ChaincodeError::corrupt(key, "counter is not a decimal integer"))
}

/// Move the counter at `key` up to at least `value`. Never lowers it.
pub(crate) fn raise_counter<S: KvStore + ?Sized>(
    store: &S,
    key: &str,
    value: u64,
    max_attempts: u32,
) -> ChaincodeResult<()> {
    for attempt in 1..=max_attempts {
        let current = store.get(key)?;
        if let Some(bytes) = &current {
            if parse_counter(key, bytes)? >= value {
                return Ok(());
            }
        }
        if store.compare_and_swap(key, current.as_deref(), value.to_string().as_bytes())? {
            return Ok(());
        }
        warn!(%key, attempt, "concurrent counter bump detected; retrying");
    }
    Err(StoreError::Contention {
        key: key.to_string(),
        attempts: max_attempts,
    }
    .into())
}

// ---------------------------------------------------------------------------
// Generic key-value
// ---------------------------------------------------------------------------

pub(crate) fn init<S: KvStore + ?Sized>(
    store: &S,
    config: &ChaincodeConfig,
    value: &str,
) -> ChaincodeResult<()> {
    store.put(&config.bootstrap_key, value.as_bytes())?;
    debug!(key = %config.bootstrap_key, "bootstrap value written");
    Ok(())
}

pub(crate) fn write<S: KvStore + ?Sized>(store: &S, key: &str, value: &str) -> ChaincodeResult<()> {
    store.put(key, value.as_bytes())?;
    Ok(())
}

pub(crate) fn read<S: KvStore + ?Sized>(store: &S, key: &str) -> ChaincodeResult<Vec<u8>> {
    store.get(key)?.ok_or_else(|| ChaincodeError::NotFound {
        key: key.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub(crate) fn init_user<S: KvStore + ?Sized>(
    store: &S,
    form: UserForm,
    user: User,
) -> ChaincodeResult<()> {
    let email = user.email.clone();
    put_new(store, &Record::User(user))?;
    debug!(%email, ?form, "user created");
    Ok(())
}

pub(crate) fn init_project<S: KvStore + ?Sized>(
    store: &S,
    config: &ChaincodeConfig,
    draft: ProjectDraft,
) -> ChaincodeResult<()> {
    if config.require_registered_sponsor {
        let sponsor = RecordKey::user(draft.sponsor_email()).canonical();
        if !store.contains(&sponsor)? {
            return Err(ChaincodeError::NotFound { key: sponsor });
        }
    }
    let key = draft.key();
    let record = match draft {
        ProjectDraft::Legacy(p) => Record::LegacyProject(p),
        ProjectDraft::Extended(p) => Record::Project(p),
    };
    put_new(store, &record)?;
    debug!(%key, kind = %record.kind(), "project created");
    Ok(())
}

pub(crate) fn init_project_like<S: KvStore + ?Sized>(
    store: &S,
    like: ProjectLike,
) -> ChaincodeResult<()> {
    let record = Record::ProjectLike(like);
    let key = record.key().canonical();
    store.put(&key, &encode(&key, &record)?)?;
    debug!(%key, "project like stored");
    Ok(())
}

pub(crate) fn init_project_update<S: KvStore + ?Sized>(
    store: &S,
    config: &ChaincodeConfig,
    project_name: String,
    date: String,
    text: String,
) -> ChaincodeResult<ProjectUpdate> {
    let counter = RecordKey::update_sequence(&project_name).canonical();
    let mut update = ProjectUpdate {
        project_name,
        seq: read_counter(store, &counter)?,
        date,
        text,
    };

    // The record slot is claimed first; the counter only ever trails it.
    let mut claimed = false;
    for attempt in 1..=config.max_cas_retries {
        update.seq = update
            .seq
            .checked_add(1)
            .ok_or_else(|| ChaincodeError::corrupt(&counter, "counter overflow"))?;
        match put_new(store, &Record::ProjectUpdate(update.clone())) {
            Ok(()) => {
                claimed = true;
                break;
            }
            Err(ChaincodeError::AlreadyExists { key }) => {
                warn!(%key, attempt, "update slot taken; trying the next one");
            }
            Err(e) => return Err(e),
        }
    }
    if !claimed {
        return Err(StoreError::Contention {
            key: counter,
            attempts: config.max_cas_retries,
        }
        .into());
    }

    if let Err(e) = raise_counter(store, &counter, update.seq, config.max_cas_retries) {
        // The update is stored; the counter may lag behind it.
        warn!(key = %counter, seq = update.seq, error = %e, "update counter not advanced");
    }
    debug!(project = %update.project_name, seq = update.seq, "project update stored");
    Ok(update)
}

/// Add `amount` to the project's pledged total. Returns the new total.
pub(crate) fn apply_pledge<S: KvStore + ?Sized>(
    store: &S,
    config: &ChaincodeConfig,
    project_name: &str,
    amount: i64,
) -> ChaincodeResult<i64> {
    let key = RecordKey::project(project_name).canonical();
    let record = update_existing(store, &key, config.max_cas_retries, |record| {
        match record.add_pledge(amount) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(ChaincodeError::corrupt(
                &key,
                format!("expected a project, found {}", record.kind()),
            )),
            Err(e @ TypeError::PledgeOverflow { .. }) => {
                Err(ChaincodeError::content("pledge_amount", e.to_string()))
            }
            Err(e) => Err(ChaincodeError::corrupt(&key, e.to_string())),
        }
    })?;
    let total = record.pledged().unwrap_or_default();
    debug!(%key, amount, total, "pledge applied");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use fl_store::{InMemoryKvStore, StoreResult};
    use fl_types::Project;

    use super::*;

    fn project(name: &str) -> Project {
        Project {
            name: name.into(),
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

    /// Store whose first `conflicts` compare-and-swaps lose to a simulated
    /// concurrent writer.
    struct RacingStore {
        inner: InMemoryKvStore,
        conflicts: AtomicU32,
    }

    impl RacingStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryKvStore::new(),
                conflicts: AtomicU32::new(conflicts),
            }
        }
    }

    impl KvStore for RacingStore {
        fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            self.inner.put(key, value)
        }

        fn compare_and_swap(
            &self,
            key: &str,
            expected: Option<&[u8]>,
            value: &[u8],
        ) -> StoreResult<bool> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.compare_and_swap(key, expected, value)
        }
    }

    #[test]
    fn put_new_rejects_populated_key_and_keeps_value() {
        let store = InMemoryKvStore::new();
        let first = Record::Project(project("P1"));
        put_new(&store, &first).unwrap();

        let mut second = project("P1");
        second.description = "other".into();
        let err = put_new(&store, &Record::Project(second)).unwrap_err();
        assert!(matches!(err, ChaincodeError::AlreadyExists { ref key } if key == "project:P1"));

        assert_eq!(load_record(&store, "project:P1").unwrap(), first);
    }

    #[test]
    fn load_record_distinguishes_missing_from_corrupt() {
        let store = InMemoryKvStore::new();
        assert!(matches!(
            load_record(&store, "user:a@x.com"),
            Err(ChaincodeError::NotFound { .. })
        ));

        store.put("user:a@x.com", b"not json").unwrap();
        assert!(matches!(
            load_record(&store, "user:a@x.com"),
            Err(ChaincodeError::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[test]
    fn update_existing_retries_lost_races() {
        let store = RacingStore::new(2);
        store
            .inner
            .put("project:P1", &Record::Project(project("P1")).encode().unwrap())
            .unwrap();

        let mut calls = 0;
        let record = update_existing(&store, "project:P1", 3, |r| {
            calls += 1;
            r.add_pledge(10).unwrap();
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(record.pledged(), Some(10));
        assert_eq!(load_record(&store, "project:P1").unwrap().pledged(), Some(10));
    }

    #[test]
    fn update_existing_reports_contention() {
        let store = RacingStore::new(5);
        store
            .inner
            .put("project:P1", &Record::Project(project("P1")).encode().unwrap())
            .unwrap();

        let err = update_existing(&store, "project:P1", 3, |_| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Store(StoreError::Contention { attempts: 3, .. })
        ));
        assert_eq!(load_record(&store, "project:P1").unwrap().pledged(), Some(0));
    }

    #[test]
    fn update_existing_propagates_modify_error_without_writing() {
        let store = InMemoryKvStore::new();
        let original = Record::Project(project("P1")).encode().unwrap();
        store.put("project:P1", &original).unwrap();

        let err = update_existing(&store, "project:P1", 3, |_| {
            Err(ChaincodeError::content("pledge_amount", "nope"))
        })
        .unwrap_err();
        assert!(matches!(err, ChaincodeError::Content { .. }));
        assert_eq!(store.get("project:P1").unwrap(), Some(original));
    }

    fn post_update<S: KvStore>(store: &S, text: &str) -> ChaincodeResult<ProjectUpdate> {
        init_project_update(
            store,
            &ChaincodeConfig::default(),
            "P1".into(),
            "2024-01-05".into(),
            text.into(),
        )
    }

    #[test]
    fn updates_are_numbered_from_one() {
        let store = InMemoryKvStore::new();
        assert_eq!(post_update(&store, "a").unwrap().seq, 1);
        assert_eq!(post_update(&store, "b").unwrap().seq, 2);
        assert_eq!(store.get("update-seq:P1").unwrap(), Some(b"2".to_vec()));
        assert_eq!(read_counter(&store, "update-seq:P2").unwrap(), 0);
    }

    #[test]
    fn counter_never_moves_backwards() {
        let store = InMemoryKvStore::new();
        raise_counter(&store, "update-seq:P1", 5, 3).unwrap();
        raise_counter(&store, "update-seq:P1", 2, 3).unwrap();
        assert_eq!(read_counter(&store, "update-seq:P1").unwrap(), 5);
    }

    #[test]
    fn counter_raise_survives_a_lost_race() {
        let store = RacingStore::new(1);
        raise_counter(&store, "update-seq:P1", 1, 2).unwrap();
        assert_eq!(read_counter(&store, "update-seq:P1").unwrap(), 1);
    }

    #[test]
    fn update_skips_slots_claimed_ahead_of_the_counter() {
        let store = InMemoryKvStore::new();
        // A writer stored update 1 but never advanced the counter.
        post_update(&store, "first").unwrap();
        store.put("update-seq:P1", b"0").unwrap();

        let second = post_update(&store, "second").unwrap();
        assert_eq!(second.seq, 2);
        assert_eq!(read_counter(&store, "update-seq:P1").unwrap(), 2);
    }

    /// Store whose first compare-and-swap on an `update:` record key fails.
    struct FailingOnceStore {
        inner: InMemoryKvStore,
        failed: std::sync::atomic::AtomicBool,
    }

    impl KvStore for FailingOnceStore {
        fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            self.inner.put(key, value)
        }

        fn compare_and_swap(
            &self,
            key: &str,
            expected: Option<&[u8]>,
            value: &[u8],
        ) -> StoreResult<bool> {
            if key.starts_with("update:") && !self.failed.swap(true, Ordering::SeqCst) {
                return Err(StoreError::Backend("transient".into()));
            }
            self.inner.compare_and_swap(key, expected, value)
        }
    }

    #[test]
    fn failed_update_write_leaves_counter_untouched() {
        let store = FailingOnceStore {
            inner: InMemoryKvStore::new(),
            failed: std::sync::atomic::AtomicBool::new(false),
        };

        let err = post_update(&store, "lost").unwrap_err();
        assert!(matches!(err, ChaincodeError::Store(StoreError::Backend(_))));
        assert!(store.inner.is_empty().unwrap());

        assert_eq!(post_update(&store, "kept").unwrap().seq, 1);
        assert_eq!(read_counter(&store, "update-seq:P1").unwrap(), 1);
    }

    #[test]
    fn update_claims_give_up_after_max_attempts() {
        let store = InMemoryKvStore::new();
        for seq in 1..=3 {
            let taken = Record::ProjectUpdate(ProjectUpdate {
                project_name: "P1".into(),
                seq,
                date: "d".into(),
                text: "t".into(),
            });
            put_new(&store, &taken).unwrap();
        }
        let config = ChaincodeConfig {
            max_cas_retries: 3,
            ..Default::default()
        };
        let err = init_project_update(&store, &config, "P1".into(), "d".into(), "t".into())
            .unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Store(StoreError::Contention { attempts: 3, .. })
        ));
    }

    #[test]
    fn corrupt_counter_is_reported() {
        let store = InMemoryKvStore::new();
        store.put("update-seq:P1", b"seven").unwrap();
        assert!(matches!(
            read_counter(&store, "update-seq:P1"),
            Err(ChaincodeError::Store(StoreError::Corrupt { .. }))
        ));
        assert!(matches!(
            post_update(&store, "x"),
            Err(ChaincodeError::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[test]
    fn pledge_on_non_project_record_is_corrupt() {
        let store = InMemoryKvStore::new();
        let user = Record::User(User {
            email: "a@x.com".into(),
            firstname: "Ann".into(),
            lastname: "Lee".into(),
            password: None,
            ccn: None,
            phone: None,
        });
        // Simulate a misfiled record under a project key.
        store.put("project:P1", &user.encode().unwrap()).unwrap();

        let err = apply_pledge(&store, &ChaincodeConfig::default(), "P1", 5).unwrap_err();
        assert!(matches!(err, ChaincodeError::Store(StoreError::Corrupt { .. })));
    }

    #[test]
    fn pledge_overflow_is_content_error() {
        let store = InMemoryKvStore::new();
        let mut p = project("P1");
        p.pledge_amount = i64::MAX;
        put_new(&store, &Record::Project(p)).unwrap();

        let err = apply_pledge(&store, &ChaincodeConfig::default(), "P1", 1).unwrap_err();
        assert!(matches!(
            err,
            ChaincodeError::Content {
                field: "pledge_amount",
                ..
            }
        ));
    }
}
