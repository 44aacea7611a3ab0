use crate::models::{AttendanceRecord, AttendanceStatus, Identity, Subject};
use crate::stats::{AggregateStats, aggregate};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// subject id -> date -> status, mirroring the attendance documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceCache {
    subjects: BTreeMap<String, BTreeMap<NaiveDate, AttendanceStatus>>,
}

impl AttendanceCache {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = AttendanceRecord>,
    {
        let mut cache = Self::default();
        for record in records {
            cache.set(&record.subject_id, record.date, record.status);
        }
        cache
    }

    pub fn set(&mut self, subject_id: &str, date: NaiveDate, status: AttendanceStatus) {
        self.subjects
            .entry(subject_id.to_string())
            .or_default()
            .insert(date, status);
    }

    pub fn status(&self, subject_id: &str, date: NaiveDate) -> Option<AttendanceStatus> {
        self.subjects.get(subject_id)?.get(&date).copied()
    }

    /// Keep the subject with an empty record set.
    pub fn clear_subject(&mut self, subject_id: &str) {
        self.subjects.insert(subject_id.to_string(), BTreeMap::new());
    }

    pub fn remove_subject(&mut self, subject_id: &str) {
        self.subjects.remove(subject_id);
    }

    pub fn stats(&self, subject_id: &str) -> AggregateStats {
        match self.subjects.get(subject_id) {
            Some(days) => aggregate(days.values().copied()),
            None => AggregateStats::default(),
        }
    }

    pub fn clear(&mut self) {
        self.subjects.clear();
    }
}

/// Everything the signed-in session holds in memory.
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    pub identity: Option<Identity>,
    pub subjects: Vec<Subject>,
    pub attendance: AttendanceCache,
    /// Bumped whenever the session is replaced or cleared.
    pub epoch: u64,
}

impl LocalState {
    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id == subject_id)
    }

    pub fn replace(&mut self, identity: Identity, subjects: Vec<Subject>, attendance: AttendanceCache) {
        self.identity = Some(identity);
        self.subjects = subjects;
        self.attendance = attendance;
        self.epoch += 1;
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.subjects.clear();
        self.attendance.clear();
        self.epoch += 1;
    }

    pub fn remove_subject(&mut self, subject_id: &str) {
        self.subjects.retain(|subject| subject.id != subject_id);
        self.attendance.remove_subject(subject_id);
    }
}
