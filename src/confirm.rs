use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmKind {
    DeleteSubject,
    ResetSubject,
}

impl ConfirmKind {
    pub fn prompt(self) -> &'static str {
        match self {
            ConfirmKind::DeleteSubject => {
                "Are you sure you want to delete this subject? This action cannot be undone."
            }
            ConfirmKind::ResetSubject => {
                "Are you sure you want to reset all attendance records for this subject? This action cannot be undone."
            }
        }
    }

    /// Shown to the user when the confirmed action fails.
    pub fn failure_alert(self) -> &'static str {
        match self {
            ConfirmKind::DeleteSubject => "Failed to delete subject. Please try again.",
            ConfirmKind::ResetSubject => "Failed to reset attendance. Please try again.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: ConfirmKind,
    pub subject_id: String,
    pub owner_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationTicket {
    pub token: Uuid,
    pub kind: ConfirmKind,
    pub subject_id: String,
    pub message: &'static str,
}

/// Destructive actions waiting for an explicit yes or no.
#[derive(Debug, Default)]
pub struct Confirmations {
    pending: Mutex<HashMap<Uuid, PendingAction>>,
}

impl Confirmations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, action: PendingAction) -> ConfirmationTicket {
        let token = Uuid::new_v4();
        let ticket = ConfirmationTicket {
            token,
            kind: action.kind,
            subject_id: action.subject_id.clone(),
            message: action.kind.prompt(),
        };
        self.pending().insert(token, action);
        ticket
    }

    /// Tokens are single use: answering, yes or no, consumes them.
    pub fn take(&self, token: &Uuid) -> Option<PendingAction> {
        self.pending().remove(token)
    }

    /// Drop every outstanding request, e.g. on sign-out.
    pub fn clear(&self) {
        self.pending().clear();
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, PendingAction>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
