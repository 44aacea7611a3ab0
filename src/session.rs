use crate::errors::TrackerError;
use crate::models::{Identity, SignInRequest};
use crate::reconciler::Reconciler;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    /// No identity notification handled yet.
    Initializing,
    SignedOut,
    Loading { uid: String },
    Ready { uid: String },
    Failed { uid: String, message: String },
}

impl SessionPhase {
    /// True once the notification for `uid` (or for sign-out, when `None`)
    /// has been fully handled.
    pub fn settled_for(&self, uid: Option<&str>) -> bool {
        match (self, uid) {
            (SessionPhase::SignedOut, None) => true,
            (SessionPhase::Ready { uid: current }, Some(uid))
            | (SessionPhase::Failed { uid: current, .. }, Some(uid)) => current == uid,
            _ => false,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, request: &SignInRequest) -> Result<Identity, TrackerError>;

    async fn sign_out(&self) -> Result<(), TrackerError>;

    fn current(&self) -> Option<Identity>;

    /// Yields the current identity right away, then every change.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Identity provider that trusts the name and email it is given and derives
/// a stable uid from the email.
#[derive(Debug)]
pub struct LocalIdentityProvider {
    current: watch::Sender<Option<Identity>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }
}

pub fn uid_for_email(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{normalized}").as_bytes())
        .simple()
        .to_string()
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty() && !part.contains('@'))
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, request: &SignInRequest) -> Result<Identity, TrackerError> {
        let display_name = request.display_name.trim();
        let email = request.email.trim();
        if display_name.is_empty() {
            return Err(TrackerError::Auth("display name is required".into()));
        }
        if !valid_email(email) {
            return Err(TrackerError::Auth(format!("'{email}' is not a valid email")));
        }

        let identity = Identity {
            uid: uid_for_email(email),
            display_name: display_name.to_string(),
            email: email.to_string(),
        };
        info!(uid = %identity.uid, "signed in");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), TrackerError> {
        if let Some(previous) = self.current.send_replace(None) {
            info!(uid = %previous.uid, "signed out");
        }
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        let mut rx = self.current.subscribe();
        rx.mark_changed();
        rx
    }
}

/// Re-run the session bootstrap on every identity notification. The newest
/// notification wins; the task ends when the provider goes away.
pub fn spawn_identity_listener(
    mut identity: watch::Receiver<Option<Identity>>,
    tracker: Arc<Reconciler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while identity.changed().await.is_ok() {
            let current = identity.borrow_and_update().clone();
            debug!(signed_in = current.is_some(), "identity changed");
            tracker.apply_identity(current).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str) -> SignInRequest {
        SignInRequest {
            display_name: name.into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn subscription_fires_with_current_state_first() {
        let provider = LocalIdentityProvider::new();
        let mut rx = provider.subscribe();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), None);

        let identity = provider.sign_in(&request("Ada", "ada@example.com")).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&identity));

        provider.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn uid_is_stable_per_email() {
        let provider = LocalIdentityProvider::new();
        let a = provider.sign_in(&request("Ada", "Ada@Example.com")).await.unwrap();
        let b = provider.sign_in(&request("Ada L", " ada@example.com ")).await.unwrap();
        assert_eq!(a.uid, b.uid);
        assert_ne!(a.uid, uid_for_email("grace@example.com"));
    }

    #[tokio::test]
    async fn rejects_bad_credentials() {
        let provider = LocalIdentityProvider::new();
        for (name, email) in [("", "a@b.io"), ("Ada", "not-an-email"), ("Ada", "a@b")] {
            let err = provider.sign_in(&request(name, email)).await.unwrap_err();
            assert!(matches!(err, TrackerError::Auth(_)), "{name} {email}");
        }
        assert!(provider.current().is_none());
    }

    #[test]
    fn phase_settles_only_for_matching_uid() {
        let ready = SessionPhase::Ready { uid: "u1".into() };
        assert!(ready.settled_for(Some("u1")));
        assert!(!ready.settled_for(Some("u2")));
        assert!(!ready.settled_for(None));
        assert!(SessionPhase::SignedOut.settled_for(None));
        assert!(!SessionPhase::Loading { uid: "u1".into() }.settled_for(Some("u1")));
    }
}
