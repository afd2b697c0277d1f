use crate::errors::{AppError, StoreError};
use crate::models::{Credentials, FeedbackForm, MoodForm, MoodSummary};
use crate::session::{removal_cookie, session_cookie, CurrentUser, SESSION_COOKIE};
use crate::state::AppState;
use crate::stats::build_summary;
use crate::storage::{Store, StoreResult};
use crate::ui::{render_admin, render_dashboard, render_login, render_register};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MIN_INTENSITY: i64 = 1;
pub const MAX_INTENSITY: i64 = 10;

/// Runs a store call off the async runtime. The outer error is a failed join;
/// the inner result is the store's own.
async fn run_store<F, T>(state: &AppState, f: F) -> Result<StoreResult<T>, AppError>
where
    F: FnOnce(&Store) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|err| {
            error!("spawn_blocking join error: {err}");
            AppError::internal(err)
        })
}

pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Redirect {
    match CurrentUser::from_jar(&jar, &state.sessions).await {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

pub async fn register_page() -> Html<String> {
    Html(render_register(None))
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<Credentials>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        let page = render_register(Some("Username and password are required."));
        return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
    }

    let username = username.to_string();
    let password = form.password;
    match run_store(&state, move |store| store.register(&username, &password)).await? {
        Ok(identity) => {
            info!(user_id = identity.id, username = %identity.username, "registered user");
            Ok(Redirect::to("/login").into_response())
        }
        Err(StoreError::DuplicateUsername) => {
            let page = render_register(Some("That username is already taken."));
            Ok((StatusCode::CONFLICT, Html(page)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn login_page() -> Html<String> {
    Html(render_login(None))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<Credentials>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    let password = form.password;
    match run_store(&state, move |store| store.authenticate(&username, &password)).await? {
        Ok(identity) => {
            info!(user_id = identity.id, username = %identity.username, "user logged in");
            let token = state.sessions.create(identity).await;
            Ok((jar.add(session_cookie(token)), Redirect::to("/dashboard")).into_response())
        }
        Err(StoreError::InvalidCredentials) => {
            let page = render_login(Some("Invalid username or password."));
            Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(identity) = state.sessions.remove(cookie.value()).await {
            info!(user_id = identity.id, "user logged out");
        }
    }
    (jar.remove(removal_cookie()), Redirect::to("/login"))
}

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let user_id = user.id;
    let moods = run_store(&state, move |store| store.moods_for_user(user_id)).await??;
    let summary = build_summary(&moods);
    let is_admin = state.is_admin(&user.username);
    Ok(Html(render_dashboard(&user, &summary, &moods, is_admin)))
}

pub async fn submit_mood(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<MoodForm>,
) -> Result<Redirect, AppError> {
    let (emotion, intensity) = validate_mood(&form)?;
    let emotion = emotion.to_string();
    let note = form.note.trim().to_string();
    let feedback = form
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string);

    let user_id = user.id;
    let (entry, feedback) = run_store(&state, move |store| {
        let entry = store.append_mood(user_id, &emotion, intensity, &note)?;
        let feedback = feedback
            .map(|content| store.append_feedback(user_id, &content))
            .transpose()?;
        Ok((entry, feedback))
    })
    .await??;

    info!(user_id, mood_id = entry.id, emotion = %entry.emotion, "recorded mood");
    if let Some(feedback) = feedback {
        info!(user_id, feedback_id = feedback.id, "recorded feedback");
    }

    Ok(Redirect::to("/dashboard"))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, AppError> {
    let content = form.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::bad_request("feedback must not be empty"));
    }

    let user_id = user.id;
    let feedback = run_store(&state, move |store| store.append_feedback(user_id, &content)).await??;
    info!(user_id = user.id, feedback_id = feedback.id, "recorded feedback");
    Ok(Redirect::to("/dashboard"))
}

pub async fn admin(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    if !state.is_admin(&user.username) {
        warn!(user_id = user.id, username = %user.username, "denied admin access");
        return Err(AppError::forbidden("Access denied"));
    }

    let (moods, feedback) =
        run_store(&state, |store| Ok((store.all_moods()?, store.all_feedback()?))).await??;
    Ok(Html(render_admin(&moods, &feedback)))
}

pub async fn get_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MoodSummary>, AppError> {
    let user_id = user.id;
    let moods = run_store(&state, move |store| store.moods_for_user(user_id)).await??;
    Ok(Json(build_summary(&moods)))
}

fn validate_mood(form: &MoodForm) -> Result<(&str, i64), AppError> {
    let emotion = form.emotion.trim();
    if emotion.is_empty() {
        return Err(AppError::bad_request("emotion must not be empty"));
    }

    let intensity = form
        .intensity
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request("intensity must be a whole number"))?;
    if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
        return Err(AppError::bad_request(format!(
            "intensity must be between {MIN_INTENSITY} and {MAX_INTENSITY}"
        )));
    }

    Ok((emotion, intensity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(emotion: &str, intensity: &str) -> MoodForm {
        MoodForm {
            emotion: emotion.into(),
            intensity: intensity.into(),
            note: String::new(),
            feedback: None,
        }
    }

    #[test]
    fn accepts_trimmed_emotion_and_bounds() {
        assert_eq!(validate_mood(&form(" Calm ", "1")).unwrap(), ("Calm", 1));
        assert_eq!(validate_mood(&form("Happy", " 10")).unwrap(), ("Happy", 10));
    }

    #[test]
    fn open_label_set_is_allowed() {
        assert_eq!(validate_mood(&form("Nostalgic", "6")).unwrap(), ("Nostalgic", 6));
    }

    #[test]
    fn rejects_bad_intensity() {
        for raw in ["0", "11", "-3", "five", "7.5", ""] {
            let err = validate_mood(&form("Calm", raw)).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "intensity {raw:?}");
        }
    }

    #[test]
    fn rejects_blank_emotion() {
        let err = validate_mood(&form("   ", "5")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    fn state() -> AppState {
        let config = crate::config::Config::from_lookup(|_| None);
        AppState::new(config, Store::open_in_memory().expect("in-memory store"))
    }

    #[tokio::test]
    async fn store_calls_run_on_blocking_pool() {
        let state = state();
        let identity = run_store(&state, |store| store.register("ana", "pw"))
            .await
            .unwrap()
            .unwrap();

        let moods = run_store(&state, move |store| {
            store.append_mood(identity.id, "Calm", 4, "")?;
            store.moods_for_user(identity.id)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(moods.len(), 1);

        let duplicate = run_store(&state, |store| store.register("ana", "other"))
            .await
            .unwrap();
        assert!(matches!(duplicate, Err(StoreError::DuplicateUsername)));
    }

    #[tokio::test]
    async fn panicking_store_call_becomes_internal_error() {
        let state = state();
        let err = run_store(&state, |_store| -> StoreResult<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
