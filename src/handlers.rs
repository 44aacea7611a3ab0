use crate::busy::OperationKey;
use crate::calendar::MonthRef;
use crate::confirm::{ConfirmKind, ConfirmationTicket};
use crate::errors::{AppError, TrackerError};
use crate::models::{
    CalendarQuery, ConfirmRequest, ConfirmationOutcome, MarkRequest, MarkResponse, MonthView,
    NewSubjectRequest, SessionResponse, SignInRequest, StatsView, SubjectStatsResponse,
    ThemePreference, date_key,
};
use crate::session::SessionPhase;
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
};
use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tracing::{error, warn};
use uuid::Uuid;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let theme = state.preferences.theme().await;
    Html(render_index(theme.dark_mode))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(session_response(&state).await)
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let _guard = state
        .tracker
        .busy()
        .try_begin(OperationKey::Auth)
        .ok_or_else(|| TrackerError::Busy(OperationKey::Auth.to_string()))?;

    let mut phase = state.tracker.phase();
    let identity = state
        .identity
        .sign_in(&payload)
        .await
        .inspect_err(|err| warn!("sign-in rejected: {err}"))?;
    if let Err(err) = state.tracker.ensure_profile(&identity).await {
        warn!(uid = %identity.uid, "profile setup failed, signing out: {err}");
        state.identity.sign_out().await?;
        settle(&mut phase, None).await?;
        return Err(err.into());
    }

    if let SessionPhase::Failed { message, .. } = settle(&mut phase, Some(&identity.uid)).await? {
        return Err(AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        });
    }

    Ok(Json(session_response(&state).await))
}

pub async fn sign_out(State(state): State<AppState>) -> Result<Json<SessionResponse>, AppError> {
    let mut phase = state.tracker.phase();
    state.identity.sign_out().await?;
    state.confirmations.clear();
    settle(&mut phase, None).await?;

    Ok(Json(session_response(&state).await))
}

pub async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectStatsResponse>>, AppError> {
    let subjects = state.tracker.subjects().await?;
    Ok(Json(
        subjects
            .into_iter()
            .map(|(subject, stats)| SubjectStatsResponse {
                subject,
                stats: stats.view(),
            })
            .collect(),
    ))
}

pub async fn add_subject(
    State(state): State<AppState>,
    Json(payload): Json<NewSubjectRequest>,
) -> Result<(StatusCode, Json<SubjectStatsResponse>), AppError> {
    let subject = state.tracker.add_subject(payload).await?;
    let stats = state.tracker.stats(&subject.id).await;
    Ok((
        StatusCode::CREATED,
        Json(SubjectStatsResponse {
            subject,
            stats: stats.view(),
        }),
    ))
}

pub async fn subject_stats(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<StatsView>, AppError> {
    if state.tracker.identity().await.is_none() {
        return Err(TrackerError::NotSignedIn.into());
    }
    Ok(Json(state.tracker.stats(&subject_id).await.view()))
}

pub async fn calendar(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthView>, AppError> {
    let today = MonthRef::containing(Local::now().date_naive());
    let month = MonthRef::new(
        query.year.unwrap_or(today.year),
        query.month.unwrap_or(today.month),
    )
    .ok_or_else(|| AppError::bad_request("year and month must name a calendar month"))?;

    Ok(Json(state.tracker.month_view(&subject_id, month).await?))
}

pub async fn mark(
    State(state): State<AppState>,
    Path((subject_id, date)): Path<(String, String)>,
    Json(payload): Json<MarkRequest>,
) -> Result<Json<MarkResponse>, AppError> {
    let date = parse_date(&date)?;
    let stats = state
        .tracker
        .mark(&subject_id, date, payload.status)
        .await?;

    Ok(Json(MarkResponse {
        subject_id,
        date: date_key(date),
        status: payload.status,
        stats: stats.view(),
    }))
}

pub async fn request_delete(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ConfirmationTicket>, AppError> {
    request_confirmation(&state, ConfirmKind::DeleteSubject, &subject_id).await
}

pub async fn request_reset(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<ConfirmationTicket>, AppError> {
    request_confirmation(&state, ConfirmKind::ResetSubject, &subject_id).await
}

pub async fn confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ConfirmationOutcome>, AppError> {
    let token = Uuid::parse_str(&token)
        .map_err(|_| AppError::bad_request("confirmation token is malformed"))?;
    let action = state
        .confirmations
        .take(&token)
        .ok_or_else(|| AppError::not_found("confirmation not found or already answered"))?;

    if payload.confirm {
        if let Err(err) = state.tracker.execute(&action).await {
            error!(subject_id = %action.subject_id, "confirmed action failed: {err}");
            let status = AppError::from(err).status;
            return Err(AppError {
                status,
                message: action.kind.failure_alert().to_string(),
            });
        }
    }

    Ok(Json(ConfirmationOutcome {
        action: action.kind,
        subject_id: action.subject_id,
        executed: payload.confirm,
    }))
}

pub async fn get_theme(State(state): State<AppState>) -> Json<ThemePreference> {
    Json(state.preferences.theme().await)
}

pub async fn toggle_theme(
    State(state): State<AppState>,
) -> Result<Json<ThemePreference>, AppError> {
    Ok(Json(state.preferences.toggle_dark_mode().await?))
}

async fn request_confirmation(
    state: &AppState,
    kind: ConfirmKind,
    subject_id: &str,
) -> Result<Json<ConfirmationTicket>, AppError> {
    let action = state.tracker.pending_action(kind, subject_id).await?;
    Ok(Json(state.confirmations.request(action)))
}

/// Wait until the listener has handled the identity change published after
/// `phase` was subscribed. Phases left over from earlier changes are skipped.
async fn settle(
    phase: &mut watch::Receiver<SessionPhase>,
    uid: Option<&str>,
) -> Result<SessionPhase, AppError> {
    loop {
        phase.changed().await.map_err(AppError::internal)?;
        let current = phase.borrow_and_update().clone();
        if current.settled_for(uid) {
            return Ok(current);
        }
    }
}

async fn session_response(state: &AppState) -> SessionResponse {
    SessionResponse {
        phase: state.tracker.current_phase(),
        user: state.tracker.identity().await,
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("'{raw}' is not a YYYY-MM-DD date")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::reconciler::Reconciler;
    use crate::session::{IdentityProvider, LocalIdentityProvider, spawn_identity_listener};
    use crate::testing::FlakyStore;
    use std::sync::Arc;

    async fn app_with(store: Arc<FlakyStore>) -> AppState {
        let tracker = Arc::new(Reconciler::new(store));
        let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new());
        spawn_identity_listener(identity.subscribe(), tracker.clone());
        let mut phase = tracker.phase();
        phase
            .wait_for(|current| *current == SessionPhase::SignedOut)
            .await
            .unwrap();

        let prefs = std::env::temp_dir()
            .join(format!("attendance_handlers_{}.json", std::process::id()));
        AppState::new(tracker, identity, Preferences::load(prefs).await)
    }

    fn ada() -> Json<SignInRequest> {
        Json(SignInRequest {
            display_name: "Ada".into(),
            email: "ada@example.com".into(),
        })
    }

    #[tokio::test]
    async fn sign_in_retry_reports_its_own_outcome() {
        let store = Arc::new(FlakyStore::new());
        let state = app_with(store.clone()).await;

        FlakyStore::set_flag(&store.fail_queries, true);
        let err = sign_in(State(state.clone()), ada()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(state.tracker.current_phase(), SessionPhase::Failed { .. }));

        FlakyStore::set_flag(&store.fail_queries, false);
        let Json(session) = sign_in(State(state.clone()), ada()).await.unwrap();
        assert!(matches!(session.phase, SessionPhase::Ready { .. }));
        assert_eq!(session.user.map(|user| user.email), Some("ada@example.com".into()));
    }

    #[tokio::test]
    async fn failed_profile_write_signs_back_out() {
        let store = Arc::new(FlakyStore::new());
        let state = app_with(store.clone()).await;

        FlakyStore::set_flag(&store.fail_writes, true);
        let err = sign_in(State(state.clone()), ada()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(state.tracker.current_phase(), SessionPhase::SignedOut);
        assert!(state.identity.current().is_none());
        assert!(state.tracker.identity().await.is_none());

        FlakyStore::set_flag(&store.fail_writes, false);
        assert!(sign_in(State(state.clone()), ada()).await.is_ok());
    }
}
