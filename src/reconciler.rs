//! Keeps the in-memory session state in step with the document store.
//!
//! Every mutation writes to the store first and only touches local state once
//! the store accepted the write. A failed write leaves local state as it was.
//! Local state is (re)built from the store whenever the identity changes.
//! A reload waits for mutations already in flight, and a mutation that
//! completes after the session changed leaves the new session alone.

use crate::busy::{BusyGuard, BusySet, OperationKey};
use crate::cache::{AttendanceCache, LocalState};
use crate::calendar::{MonthRef, month_grid};
use crate::confirm::{ConfirmKind, PendingAction};
use crate::errors::TrackerError;
use crate::models::{
    ATTENDANCE, AttendanceDocument, AttendanceStatus, CalendarCell, Identity, MonthView,
    NewSubjectRequest, SUBJECTS, Subject, SubjectDocument, USERS, UserProfile, date_key,
    record_key,
};
use crate::session::SessionPhase;
use crate::stats::AggregateStats;
use crate::store::{DocumentStore, WriteBatch, to_document};
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{error, info, warn};

pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    state: Mutex<LocalState>,
    /// Mutations hold it shared; a reload holds it exclusively.
    loading: RwLock<()>,
    busy: BusySet,
    phase: watch::Sender<SessionPhase>,
}

/// Who a mutation runs for, and which session it started in.
struct Owner {
    uid: String,
    epoch: u64,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Initializing);
        Self {
            store,
            state: Mutex::new(LocalState::default()),
            loading: RwLock::new(()),
            busy: BusySet::new(),
            phase,
        }
    }

    pub fn busy(&self) -> &BusySet {
        &self.busy
    }

    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    pub fn current_phase(&self) -> SessionPhase {
        self.phase.borrow().clone()
    }

    /// Handle one identity notification: load the new session or clear it.
    pub async fn apply_identity(&self, identity: Option<Identity>) {
        let Some(identity) = identity else {
            self.clear().await;
            self.phase.send_replace(SessionPhase::SignedOut);
            return;
        };

        let uid = identity.uid.clone();
        self.phase.send_replace(SessionPhase::Loading { uid: uid.clone() });
        match self.bootstrap(identity).await {
            Ok(()) => {
                self.phase.send_replace(SessionPhase::Ready { uid });
            }
            Err(err) => {
                error!(%uid, error = %err, "session bootstrap failed");
                self.clear().await;
                self.phase.send_replace(SessionPhase::Failed {
                    uid,
                    message: err.to_string(),
                });
            }
        }
    }

    /// Replace local state with everything `identity` owns in the store.
    pub async fn bootstrap(&self, identity: Identity) -> Result<(), TrackerError> {
        let _loading = self.loading.write().await;
        let owner = Value::String(identity.uid.clone());

        let subject_docs = self
            .store
            .query_eq(SUBJECTS, "ownerId", &owner)
            .await
            .map_err(TrackerError::Load)?;
        let mut dated = Vec::with_capacity(subject_docs.len());
        for doc in &subject_docs {
            let data: SubjectDocument = doc.decode(SUBJECTS).map_err(TrackerError::Load)?;
            dated.push((data.created_at, subject_from(doc.id.clone(), data)));
        }
        dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        let subjects: Vec<Subject> = dated.into_iter().map(|(_, subject)| subject).collect();

        let attendance_docs = self
            .store
            .query_eq(ATTENDANCE, "ownerId", &owner)
            .await
            .map_err(TrackerError::Load)?;
        let mut records = Vec::with_capacity(attendance_docs.len());
        for doc in &attendance_docs {
            let data: AttendanceDocument = doc.decode(ATTENDANCE).map_err(TrackerError::Load)?;
            records.push(data.record());
        }

        let mut state = self.state.lock().await;
        info!(
            uid = %identity.uid,
            subjects = subjects.len(),
            records = records.len(),
            "session loaded"
        );
        state.replace(identity, subjects, AttendanceCache::from_records(records));
        Ok(())
    }

    pub async fn clear(&self) {
        self.state.lock().await.clear();
    }

    /// Create the user's profile document on first sign-in.
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<(), TrackerError> {
        let auth_err = |err: crate::store::StoreError| TrackerError::Auth(err.to_string());
        if self.store.get(USERS, &identity.uid).await.map_err(auth_err)?.is_some() {
            return Ok(());
        }

        let profile = UserProfile {
            name: identity.display_name.clone(),
            email: identity.email.clone(),
            created_at: Utc::now(),
        };
        let doc = to_document(&profile).map_err(auth_err)?;
        self.store.set(USERS, &identity.uid, doc).await.map_err(auth_err)?;
        info!(uid = %identity.uid, "created user profile");
        Ok(())
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.lock().await.identity.clone()
    }

    pub async fn subjects(&self) -> Result<Vec<(Subject, AggregateStats)>, TrackerError> {
        let state = self.state.lock().await;
        if state.identity.is_none() {
            return Err(TrackerError::NotSignedIn);
        }
        Ok(state
            .subjects
            .iter()
            .map(|subject| (subject.clone(), state.attendance.stats(&subject.id)))
            .collect())
    }

    /// Aggregate for one subject; unknown or deleted subjects have no records.
    pub async fn stats(&self, subject_id: &str) -> AggregateStats {
        self.state.lock().await.attendance.stats(subject_id)
    }

    #[cfg(test)]
    pub async fn status_on(&self, subject_id: &str, date: NaiveDate) -> Option<AttendanceStatus> {
        self.state.lock().await.attendance.status(subject_id, date)
    }

    pub async fn month_view(
        &self,
        subject_id: &str,
        month: MonthRef,
    ) -> Result<MonthView, TrackerError> {
        let state = self.state.lock().await;
        if state.identity.is_none() {
            return Err(TrackerError::NotSignedIn);
        }
        let subject = state
            .subject(subject_id)
            .cloned()
            .ok_or_else(|| TrackerError::subject_not_found(subject_id))?;

        let pending = self.busy.pending_marks(subject_id);
        let cells = month_grid(month)
            .into_iter()
            .map(|cell| match cell {
                Some(date) => CalendarCell {
                    date: Some(date_key(date)),
                    day: Some(date.day()),
                    status: state.attendance.status(subject_id, date),
                    pending: pending.contains(&date),
                },
                None => CalendarCell {
                    date: None,
                    day: None,
                    status: None,
                    pending: false,
                },
            })
            .collect();

        Ok(MonthView {
            stats: state.attendance.stats(subject_id).view(),
            subject,
            month,
            label: month.label(),
            previous: month.previous(),
            next: month.next(),
            cells,
        })
    }

    pub async fn add_subject(&self, request: NewSubjectRequest) -> Result<Subject, TrackerError> {
        let name = request.name.trim();
        let code = request.code.trim();
        if name.is_empty() || code.is_empty() {
            return Err(TrackerError::Invalid("subject name and code are required".into()));
        }
        let credits = request.credits.filter(|credits| *credits > 0).unwrap_or(1);

        let _loading = self.loading.read().await;
        let owner = self.owner().await?;
        let _guard = self.begin(OperationKey::AddSubject)?;

        let document = SubjectDocument {
            owner_id: owner.uid.clone(),
            name: name.to_string(),
            code: code.to_string(),
            credits,
            created_at: Utc::now(),
        };
        let body = to_document(&document).map_err(TrackerError::write("add subject"))?;
        let id = self
            .store
            .add(SUBJECTS, body)
            .await
            .map_err(TrackerError::write("add subject"))
            .inspect_err(|err| error!(error = %err, "add subject failed"))?;

        let subject = subject_from(id, document);
        let mut state = self.state.lock().await;
        if state.epoch == owner.epoch {
            state.subjects.push(subject.clone());
            state.attendance.clear_subject(&subject.id);
        }
        info!(subject_id = %subject.id, code = %subject.code, "subject added");
        Ok(subject)
    }

    /// Record `status` for the subject on `date`, replacing any earlier mark.
    pub async fn mark(
        &self,
        subject_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<AggregateStats, TrackerError> {
        let _loading = self.loading.read().await;
        let owner = self.owned_subject(subject_id).await?;
        let key = OperationKey::Mark {
            subject_id: subject_id.to_string(),
            date,
        };
        let _guard = self.begin(key)?;
        if self.busy.subject_locked(subject_id) {
            return Err(TrackerError::Busy(format!("changing subject {subject_id}")));
        }

        let document = AttendanceDocument {
            owner_id: owner.uid.clone(),
            subject_id: subject_id.to_string(),
            date,
            status,
            updated_at: Utc::now(),
        };
        let body = to_document(&document).map_err(TrackerError::write("mark attendance"))?;
        self.store
            .set(ATTENDANCE, &record_key(subject_id, date), body)
            .await
            .map_err(TrackerError::write("mark attendance"))
            .inspect_err(|err| error!(%subject_id, %date, error = %err, "mark failed"))?;

        let mut state = self.state.lock().await;
        if state.epoch != owner.epoch {
            info!(%subject_id, %date, "attendance marked after the session changed");
            return Ok(AggregateStats::default());
        }
        state.attendance.set(subject_id, date, status);
        info!(%subject_id, %date, ?status, "attendance marked");
        Ok(state.attendance.stats(subject_id))
    }

    /// Check the target exists and build the request for a confirmation.
    pub async fn pending_action(
        &self,
        kind: ConfirmKind,
        subject_id: &str,
    ) -> Result<PendingAction, TrackerError> {
        let owner = self.owned_subject(subject_id).await?;
        Ok(PendingAction {
            kind,
            subject_id: subject_id.to_string(),
            owner_id: owner.uid,
        })
    }

    /// Run a destructive action the user has confirmed.
    pub async fn execute(&self, action: &PendingAction) -> Result<(), TrackerError> {
        let current = self.owner().await?;
        if current.uid != action.owner_id {
            return Err(TrackerError::Invalid(
                "confirmation belongs to a different session".into(),
            ));
        }
        match action.kind {
            ConfirmKind::DeleteSubject => self.delete_subject(&action.subject_id).await,
            ConfirmKind::ResetSubject => self.reset_subject(&action.subject_id).await,
        }
    }

    /// Remove the subject document and all of its attendance in one batch.
    pub async fn delete_subject(&self, subject_id: &str) -> Result<(), TrackerError> {
        let _loading = self.loading.read().await;
        let owner = self.owned_subject(subject_id).await?;
        let _guard = self.begin_destructive(ConfirmKind::DeleteSubject, subject_id)?;

        let removed = self
            .purge_attendance(subject_id, true)
            .await
            .map_err(TrackerError::write("delete subject"))
            .inspect_err(|err| error!(%subject_id, error = %err, "delete subject failed"))?;

        let mut state = self.state.lock().await;
        if state.epoch == owner.epoch {
            state.remove_subject(subject_id);
        }
        info!(%subject_id, records = removed, "subject deleted");
        Ok(())
    }

    /// Drop every attendance record of the subject, keeping the subject.
    pub async fn reset_subject(&self, subject_id: &str) -> Result<(), TrackerError> {
        let _loading = self.loading.read().await;
        let owner = self.owned_subject(subject_id).await?;
        let _guard = self.begin_destructive(ConfirmKind::ResetSubject, subject_id)?;

        let removed = self
            .purge_attendance(subject_id, false)
            .await
            .map_err(TrackerError::write("reset attendance"))
            .inspect_err(|err| error!(%subject_id, error = %err, "reset failed"))?;

        let mut state = self.state.lock().await;
        if state.epoch == owner.epoch {
            state.attendance.clear_subject(subject_id);
        }
        info!(%subject_id, records = removed, "attendance reset");
        Ok(())
    }

    async fn purge_attendance(
        &self,
        subject_id: &str,
        with_subject: bool,
    ) -> Result<usize, crate::store::StoreError> {
        let records = self
            .store
            .query_eq(ATTENDANCE, "subjectId", &Value::String(subject_id.to_string()))
            .await?;

        let mut batch = WriteBatch::new();
        if with_subject {
            batch.delete(SUBJECTS, subject_id);
        }
        for record in &records {
            batch.delete(ATTENDANCE, &record.id);
        }
        self.store.commit(batch).await?;
        Ok(records.len())
    }

    async fn owner(&self) -> Result<Owner, TrackerError> {
        let state = self.state.lock().await;
        let identity = state.identity.as_ref().ok_or(TrackerError::NotSignedIn)?;
        Ok(Owner {
            uid: identity.uid.clone(),
            epoch: state.epoch,
        })
    }

    async fn owned_subject(&self, subject_id: &str) -> Result<Owner, TrackerError> {
        let state = self.state.lock().await;
        let identity = state.identity.as_ref().ok_or(TrackerError::NotSignedIn)?;
        if state.subject(subject_id).is_none() {
            return Err(TrackerError::subject_not_found(subject_id));
        }
        Ok(Owner {
            uid: identity.uid.clone(),
            epoch: state.epoch,
        })
    }

    fn begin(&self, key: OperationKey) -> Result<BusyGuard, TrackerError> {
        let label = key.to_string();
        self.busy.try_begin(key).ok_or_else(|| {
            warn!(operation = %label, "rejected duplicate submission");
            TrackerError::Busy(label)
        })
    }

    /// Claim a delete or reset of the subject; refused while any other
    /// operation on that subject is running.
    fn begin_destructive(
        &self,
        kind: ConfirmKind,
        subject_id: &str,
    ) -> Result<BusyGuard, TrackerError> {
        let delete = OperationKey::DeleteSubject(subject_id.to_string());
        let reset = OperationKey::ResetSubject(subject_id.to_string());
        let (key, other) = match kind {
            ConfirmKind::DeleteSubject => (delete, reset),
            ConfirmKind::ResetSubject => (reset, delete),
        };
        if self.busy.contains(&other) {
            return Err(TrackerError::Busy(other.to_string()));
        }

        let guard = self.begin(key)?;
        if !self.busy.pending_marks(subject_id).is_empty() {
            return Err(TrackerError::Busy(format!("marking {subject_id}")));
        }
        Ok(guard)
    }
}

fn subject_from(id: String, document: SubjectDocument) -> Subject {
    Subject {
        id,
        owner_id: document.owner_id,
        name: document.name,
        code: document.code,
        credits: document.credits,
    }
}
