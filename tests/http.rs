use once_cell::sync::Lazy;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Client, Response, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    dominant_emotion: Option<String>,
    color: String,
    negative_streak: usize,
    streak_alert: Option<String>,
    chart_labels: Vec<String>,
    chart_intensities: Vec<i64>,
}

struct TestServer {
    base_url: String,
    admin_username: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static USER_SEQ: AtomicU32 = AtomicU32::new(0);

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn unique_db_path() -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("mood_tracker_http_{}_{}.db", std::process::id(), nanos()));
    path.to_string_lossy().to_string()
}

fn unique_username(prefix: &str) -> String {
    let seq = USER_SEQ.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{}_{seq}", nanos() % 1_000_000)
}

fn client() -> Client {
    Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("build client")
}

async fn wait_until_ready(base_url: &str) {
    let client = client();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/login")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let admin_username = unique_username("admin");
    let child = Command::new(env!("CARGO_BIN_EXE_mood_tracker"))
        .env("PORT", port.to_string())
        .env("MOOD_DB_PATH", unique_db_path())
        .env("MOOD_ADMIN_USER", &admin_username)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        admin_username,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

fn location(resp: &Response) -> Option<&str> {
    resp.headers().get(LOCATION).and_then(|value| value.to_str().ok())
}

fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn register(server: &TestServer, username: &str, password: &str) -> Response {
    client()
        .post(format!("{}/register", server.base_url))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .unwrap()
}

async fn login(server: &TestServer, username: &str, password: &str) -> Response {
    client()
        .post(format!("{}/login", server.base_url))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .unwrap()
}

/// Registers a fresh account and returns its session cookie.
async fn signed_in(server: &TestServer, username: &str) -> String {
    let resp = register(server, username, "secret").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/login"));

    let resp = login(server, username, "secret").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/dashboard"));
    session_cookie(&resp).expect("session cookie")
}

async fn post_mood(server: &TestServer, cookie: &str, emotion: &str, intensity: &str) -> Response {
    client()
        .post(format!("{}/dashboard", server.base_url))
        .header(COOKIE, cookie)
        .form(&[
            ("emotion", emotion),
            ("intensity", intensity),
            ("note", "from test"),
        ])
        .send()
        .await
        .unwrap()
}

async fn post_mood_with_feedback(server: &TestServer, cookie: &str, feedback: &str) -> Response {
    client()
        .post(format!("{}/dashboard", server.base_url))
        .header(COOKIE, cookie)
        .form(&[
            ("emotion", "Okay"),
            ("intensity", "5"),
            ("note", ""),
            ("feedback", feedback),
        ])
        .send()
        .await
        .unwrap()
}

async fn post_feedback(server: &TestServer, cookie: &str, content: &str) -> Response {
    client()
        .post(format!("{}/feedback", server.base_url))
        .header(COOKIE, cookie)
        .form(&[("content", content)])
        .send()
        .await
        .unwrap()
}

// Rows in the admin feedback table owned by `username`.
fn feedback_rows_for(admin_html: &str, username: &str) -> usize {
    let (_, feedback_section) = admin_html
        .split_once("All feedback")
        .expect("feedback section");
    feedback_section.matches(&format!("<tr><td>{username}</td>")).count()
}

async fn get(server: &TestServer, path: &str, cookie: Option<&str>) -> Response {
    let mut request = client().get(format!("{}{path}", server.base_url));
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn http_recorded_moods_drive_summary() {
    let server = shared_server().await;
    let cookie = signed_in(&server, &unique_username("ana")).await;

    for (emotion, intensity) in [("Happy", "8"), ("Sad", "4"), ("Lonely", "3"), ("Sad", "2")] {
        let resp = post_mood(&server, &cookie, emotion, intensity).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), Some("/dashboard"));
    }

    let summary: SummaryResponse = get(&server, "/api/summary", Some(&cookie))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(summary.dominant_emotion.as_deref(), Some("Sad"));
    assert_eq!(summary.color, "#EEF2F7");
    assert_eq!(summary.negative_streak, 3);
    assert!(summary.streak_alert.is_some());
    assert_eq!(summary.chart_intensities, vec![8, 4, 3, 2]);
    assert_eq!(summary.chart_labels.len(), 4);

    let resp = get(&server, "/dashboard", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("streak-alert"));
    assert!(html.contains("from test"));
}

#[tokio::test]
async fn http_new_account_has_empty_summary() {
    let server = shared_server().await;
    let cookie = signed_in(&server, &unique_username("new")).await;

    let summary: SummaryResponse = get(&server, "/api/summary", Some(&cookie))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(summary.dominant_emotion, None);
    assert_eq!(summary.color, "#f2f4f8");
    assert_eq!(summary.streak_alert, None);
    assert!(summary.chart_intensities.is_empty());
}

#[tokio::test]
async fn http_duplicate_registration_is_rejected() {
    let server = shared_server().await;
    let username = unique_username("dup");

    let first = register(&server, &username, "original").await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    let second = register(&server, &username, "replacement").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert!(second.text().await.unwrap().contains("already taken"));

    assert_eq!(login(&server, &username, "original").await.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        login(&server, &username, "replacement").await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn http_protected_pages_redirect_to_login() {
    let server = shared_server().await;
    for path in ["/dashboard", "/admin", "/api/summary"] {
        let resp = get(&server, path, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&resp), Some("/login"), "{path}");
    }

    let resp = get(&server, "/dashboard", Some("session=not-a-real-token")).await;
    assert_eq!(location(&resp), Some("/login"));
}

#[tokio::test]
async fn http_logout_ends_session() {
    let server = shared_server().await;
    let cookie = signed_in(&server, &unique_username("bye")).await;
    let resp = get(&server, "/", Some(&cookie)).await;
    assert_eq!(location(&resp), Some("/dashboard"));

    let resp = get(&server, "/logout", Some(&cookie)).await;
    assert_eq!(location(&resp), Some("/login"));

    let resp = get(&server, "/dashboard", Some(&cookie)).await;
    assert_eq!(location(&resp), Some("/login"));
}

#[tokio::test]
async fn http_invalid_intensity_is_rejected() {
    let server = shared_server().await;
    let cookie = signed_in(&server, &unique_username("bad")).await;

    for intensity in ["0", "11", "lots"] {
        let resp = post_mood(&server, &cookie, "Calm", intensity).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{intensity}");
    }

    let summary: SummaryResponse = get(&server, "/api/summary", Some(&cookie))
        .await
        .json()
        .await
        .unwrap();
    assert!(summary.chart_intensities.is_empty());
}

#[tokio::test]
async fn http_admin_view_is_restricted() {
    let server = shared_server().await;

    let regular = signed_in(&server, &unique_username("reg")).await;
    let resp = get(&server, "/admin", Some(&regular)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.text().await.unwrap(), "Access denied");

    let writer_name = unique_username("writer");
    let writer = signed_in(&server, &writer_name).await;
    post_mood(&server, &writer, "Grateful", "9").await;
    let resp = post_feedback(&server, &writer, "charts are lovely").await;
    assert_eq!(location(&resp), Some("/dashboard"));

    let resp = post_mood_with_feedback(&server, &writer, "hello from the dashboard").await;
    assert_eq!(location(&resp), Some("/dashboard"));

    let quiet_name = unique_username("quiet");
    let quiet = signed_in(&server, &quiet_name).await;
    let resp = post_mood_with_feedback(&server, &quiet, "   ").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let admin = signed_in(&server, &server.admin_username).await;
    let resp = get(&server, "/admin", Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains(&writer_name));
    assert!(html.contains("Grateful"));
    assert!(html.contains("charts are lovely"));
    assert!(html.contains("hello from the dashboard"));
    assert_eq!(feedback_rows_for(&html, &writer_name), 2);
    assert_eq!(feedback_rows_for(&html, &quiet_name), 0);
    assert!(html.contains(&quiet_name), "mood row is still recorded");
}

#[tokio::test]
async fn http_blank_feedback_is_rejected() {
    let server = shared_server().await;
    let cookie = signed_in(&server, &unique_username("blank")).await;

    for content in ["", "   "] {
        let resp = post_feedback(&server, &cookie, content).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{content:?}");
    }

    let resp = post_feedback(&server, &cookie, " thanks ").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}
