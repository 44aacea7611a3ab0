use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKey {
    Auth,
    AddSubject,
    Mark { subject_id: String, date: NaiveDate },
    DeleteSubject(String),
    ResetSubject(String),
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKey::Auth => write!(f, "sign-in"),
            OperationKey::AddSubject => write!(f, "add subject"),
            OperationKey::Mark { subject_id, date } => {
                write!(f, "marking {subject_id} on {date}")
            }
            OperationKey::DeleteSubject(id) => write!(f, "deleting {id}"),
            OperationKey::ResetSubject(id) => write!(f, "resetting {id}"),
        }
    }
}

/// Operations currently in flight, keyed per target.
#[derive(Debug, Clone, Default)]
pub struct BusySet {
    inner: Arc<Mutex<HashSet<OperationKey>>>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`; `None` if an operation on it is already running.
    pub fn try_begin(&self, key: OperationKey) -> Option<BusyGuard> {
        if self.keys().insert(key.clone()) {
            Some(BusyGuard {
                set: self.clone(),
                key,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.keys().contains(key)
    }

    /// A delete or reset of this subject is running.
    pub fn subject_locked(&self, subject_id: &str) -> bool {
        let keys = self.keys();
        keys.contains(&OperationKey::DeleteSubject(subject_id.to_string()))
            || keys.contains(&OperationKey::ResetSubject(subject_id.to_string()))
    }

    pub fn pending_marks(&self, subject_id: &str) -> HashSet<NaiveDate> {
        self.keys()
            .iter()
            .filter_map(|key| match key {
                OperationKey::Mark { subject_id: id, date } if id == subject_id => Some(*date),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<OperationKey>> {
        // a panic while holding this lock cannot leave the set half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases its key when dropped, whatever the outcome of the operation.
#[derive(Debug)]
pub struct BusyGuard {
    set: BusySet,
    key: OperationKey,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.set.keys().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn same_key_is_exclusive_until_released() {
        let busy = BusySet::new();
        let key = OperationKey::Mark {
            subject_id: "s1".into(),
            date: day(1),
        };
        let guard = busy.try_begin(key.clone()).expect("first claim");
        assert!(busy.try_begin(key.clone()).is_none());
        assert!(busy.contains(&key));

        drop(guard);
        assert!(!busy.contains(&key));
        assert!(busy.try_begin(key).is_some());
    }

    #[test]
    fn different_targets_run_independently() {
        let busy = BusySet::new();
        let _a = busy
            .try_begin(OperationKey::Mark {
                subject_id: "s1".into(),
                date: day(1),
            })
            .unwrap();
        let _b = busy
            .try_begin(OperationKey::Mark {
                subject_id: "s1".into(),
                date: day(2),
            })
            .unwrap();
        let _c = busy.try_begin(OperationKey::ResetSubject("s2".into())).unwrap();

        assert_eq!(busy.len(), 3);
        assert_eq!(busy.pending_marks("s1").len(), 2);
        assert!(busy.subject_locked("s2"));
        assert!(!busy.subject_locked("s1"));
    }
}
