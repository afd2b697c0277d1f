use crate::models::Identity;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

/// In-memory map from session token to the identity that logged in with it.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Identity>>>,
}

impl SessionStore {
    pub async fn create(&self, identity: Identity) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.lock().await.insert(token.clone(), identity);
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<Identity> {
        self.sessions.lock().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) -> Option<Identity> {
        self.sessions.lock().await.remove(token)
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// The authenticated caller. Handlers that take this argument redirect
/// anonymous requests to `/login`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl CurrentUser {
    pub async fn from_jar(jar: &CookieJar, sessions: &SessionStore) -> Option<Self> {
        let token = jar.get(SESSION_COOKIE)?.value();
        sessions.resolve(token).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        CurrentUser::from_jar(&jar, &state.sessions)
            .await
            .ok_or_else(|| Redirect::to("/login"))
    }
}
