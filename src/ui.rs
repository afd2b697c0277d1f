use crate::models::{FeedbackEntry, Identity, MoodEntry, MoodSummary, Owned};
use crate::stats::known_emotions;
use chrono::{DateTime, Utc};

/// Escapes text for HTML bodies and attributes. Braces are escaped too so
/// user text can never be mistaken for a template placeholder.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '{' => escaped.push_str("&#123;"),
            '}' => escaped.push_str("&#125;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}

fn page(title: &str, background: &str, body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", title)
        .replace("{{BACKGROUND}}", background)
        .replace("{{BODY}}", body)
}

fn notice_html(notice: Option<&str>) -> String {
    notice
        .map(|text| format!(r#"<p class="notice">{}</p>"#, escape_html(text)))
        .unwrap_or_default()
}

pub fn render_login(notice: Option<&str>) -> String {
    let body = AUTH_FORM_HTML
        .replace("{{HEADING}}", "Welcome back")
        .replace("{{ACTION}}", "/login")
        .replace("{{SUBMIT}}", "Log in")
        .replace(
            "{{SWITCH}}",
            r#"No account yet? <a href="/register">Register</a>"#,
        )
        .replace("{{NOTICE}}", &notice_html(notice));
    page("Log in", crate::stats::DEFAULT_COLOR, &body)
}

pub fn render_register(notice: Option<&str>) -> String {
    let body = AUTH_FORM_HTML
        .replace("{{HEADING}}", "Create an account")
        .replace("{{ACTION}}", "/register")
        .replace("{{SUBMIT}}", "Register")
        .replace(
            "{{SWITCH}}",
            r#"Already registered? <a href="/login">Log in</a>"#,
        )
        .replace("{{NOTICE}}", &notice_html(notice));
    page("Register", crate::stats::DEFAULT_COLOR, &body)
}

pub fn render_dashboard(
    user: &Identity,
    summary: &MoodSummary,
    moods: &[MoodEntry],
    is_admin: bool,
) -> String {
    let admin_link = if is_admin {
        r#"<a href="/admin">Admin</a>"#
    } else {
        ""
    };

    let alert = summary
        .streak_alert
        .as_deref()
        .map(|text| format!(r#"<p class="alert" id="streak-alert">{}</p>"#, escape_html(text)))
        .unwrap_or_default();

    let dominant = summary
        .dominant_emotion
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "No data yet".to_string());

    let options: String = known_emotions()
        .map(|emotion| format!(r#"<option value="{emotion}">{emotion}</option>"#))
        .collect();

    let histogram = if summary.histogram.is_empty() {
        r#"<p class="hint">No moods recorded yet.</p>"#.to_string()
    } else {
        let max = summary
            .histogram
            .iter()
            .map(|entry| entry.count)
            .max()
            .unwrap_or(1);
        summary
            .histogram
            .iter()
            .map(|entry| {
                let width = entry.count * 100 / max;
                format!(
                    r#"<div class="bar-row"><span class="bar-label">{}</span><span class="bar" style="width: {width}%"></span><span class="bar-count">{}</span></div>"#,
                    escape_html(&entry.emotion),
                    entry.count
                )
            })
            .collect()
    };

    let history = if moods.is_empty() {
        r#"<tr><td colspan="4" class="hint">Nothing here yet.</td></tr>"#.to_string()
    } else {
        moods
            .iter()
            .map(|mood| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    format_time(&mood.timestamp),
                    escape_html(&mood.emotion),
                    mood.intensity,
                    escape_html(&mood.note)
                )
            })
            .collect()
    };

    let body = DASHBOARD_HTML
        .replace("{{ADMIN_LINK}}", admin_link)
        .replace("{{ALERT}}", &alert)
        .replace("{{DOMINANT}}", &dominant)
        .replace("{{ENTRIES}}", &moods.len().to_string())
        .replace("{{STREAK}}", &summary.negative_streak.to_string())
        .replace("{{ADVICE}}", &escape_html(&summary.advice))
        .replace("{{OPTIONS}}", &options)
        .replace("{{HISTOGRAM}}", &histogram)
        .replace("{{HISTORY}}", &history)
        .replace("{{USERNAME}}", &escape_html(&user.username));

    page("Dashboard", &summary.color, &body)
}

pub fn render_admin(moods: &[Owned<MoodEntry>], feedback: &[Owned<FeedbackEntry>]) -> String {
    let mood_rows: String = moods
        .iter()
        .map(|row| {
            let mood = &row.record;
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                owner_name(&row.owner, mood.user_id),
                format_time(&mood.timestamp),
                escape_html(&mood.emotion),
                mood.intensity,
                escape_html(&mood.note)
            )
        })
        .collect();

    let feedback_rows: String = feedback
        .iter()
        .map(|row| {
            let entry = &row.record;
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                owner_name(&row.owner, entry.user_id),
                format_time(&entry.timestamp),
                escape_html(&entry.content)
            )
        })
        .collect();

    let body = ADMIN_HTML
        .replace("{{MOOD_COUNT}}", &moods.len().to_string())
        .replace("{{FEEDBACK_COUNT}}", &feedback.len().to_string())
        .replace("{{MOOD_ROWS}}", &mood_rows)
        .replace("{{FEEDBACK_ROWS}}", &feedback_rows);

    page("Admin", crate::stats::DEFAULT_COLOR, &body)
}

fn owner_name(owner: &Option<Identity>, user_id: i64) -> String {
    match owner {
        Some(identity) => escape_html(&identity.username),
        None => format!("unknown user #{user_id}"),
    }
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Mood Tracker</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: {{BACKGROUND}};
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
      transition: background 400ms ease;
    }

    .app {
      width: min(920px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      align-items: baseline;
      justify-content: space-between;
      gap: 12px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    nav a, .switch a {
      color: var(--accent-2);
      font-weight: 600;
      margin-left: 14px;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat, .card {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    form {
      display: grid;
      gap: 12px;
    }

    label {
      display: grid;
      gap: 6px;
      font-weight: 500;
    }

    input, select, textarea {
      font: inherit;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
      background: white;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 14px 20px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
      box-shadow: 0 10px 24px rgba(255, 107, 74, 0.3);
    }

    button.secondary {
      background: var(--accent-2);
      box-shadow: 0 10px 24px rgba(47, 72, 88, 0.3);
    }

    .notice {
      margin: 0;
      color: #c63b2b;
    }

    .alert {
      margin: 0;
      padding: 16px 18px;
      border-radius: 18px;
      background: #fff1ec;
      border: 1px solid rgba(255, 107, 74, 0.35);
      color: #8a3320;
    }

    .hint {
      margin: 0;
      color: #6f6a65;
      font-size: 0.9rem;
    }

    .columns {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(280px, 1fr));
      gap: 16px;
    }

    .bar-row {
      display: grid;
      grid-template-columns: 110px 1fr 32px;
      align-items: center;
      gap: 10px;
    }

    .bar {
      height: 10px;
      border-radius: 999px;
      background: var(--accent);
    }

    .bar-count {
      text-align: right;
      color: #6b645d;
    }

    #chart {
      width: 100%;
      height: 240px;
      display: block;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: white;
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: #7a746d;
      font-size: 11px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.95rem;
    }

    th, td {
      text-align: left;
      padding: 8px 10px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
      vertical-align: top;
    }

    th {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #8b857d;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
    }
  </style>
</head>
<body>
  <main class="app">
{{BODY}}
  </main>
</body>
</html>
"#;

const AUTH_FORM_HTML: &str = r#"    <header>
      <h1>{{HEADING}}</h1>
    </header>
    {{NOTICE}}
    <form method="post" action="{{ACTION}}">
      <label>Username
        <input name="username" autocomplete="username" required />
      </label>
      <label>Password
        <input name="password" type="password" required />
      </label>
      <button type="submit">{{SUBMIT}}</button>
    </form>
    <p class="hint switch">{{SWITCH}}</p>
"#;

const DASHBOARD_HTML: &str = r#"    <header>
      <h1>Hi, {{USERNAME}}</h1>
      <nav>{{ADMIN_LINK}}<a href="/logout">Log out</a></nav>
    </header>

    {{ALERT}}

    <section class="panel">
      <div class="stat">
        <span class="label">Most frequent</span>
        <span class="value" id="dominant">{{DOMINANT}}</span>
      </div>
      <div class="stat">
        <span class="label">Entries</span>
        <span class="value" id="entries">{{ENTRIES}}</span>
      </div>
      <div class="stat">
        <span class="label">Low streak</span>
        <span class="value" id="streak">{{STREAK}}</span>
      </div>
    </section>
    <p class="hint">{{ADVICE}}</p>

    <section class="columns">
      <div class="card">
        <h2>How are you feeling?</h2>
        <form method="post" action="/dashboard">
          <label>Emotion
            <select name="emotion" required>{{OPTIONS}}</select>
          </label>
          <label>Intensity (1-10)
            <input name="intensity" type="number" min="1" max="10" value="5" required />
          </label>
          <label>Note
            <textarea name="note" rows="3"></textarea>
          </label>
          <label>Feedback for us (optional)
            <textarea name="feedback" rows="2"></textarea>
          </label>
          <button type="submit">Save mood</button>
        </form>
      </div>
      <div class="card">
        <h2>Emotion counts</h2>
        {{HISTOGRAM}}
        <h2>Send feedback</h2>
        <form method="post" action="/feedback">
          <textarea name="content" rows="3" required></textarea>
          <button class="secondary" type="submit">Send</button>
        </form>
      </div>
    </section>

    <section class="card">
      <h2>Intensity over time</h2>
      <svg id="chart" viewBox="0 0 600 240" aria-label="Mood intensity chart" role="img"></svg>
    </section>

    <section class="card">
      <h2>History</h2>
      <table>
        <thead><tr><th>When</th><th>Emotion</th><th>Intensity</th><th>Note</th></tr></thead>
        <tbody>{{HISTORY}}</tbody>
      </table>
    </section>

    <script>
      const chartEl = document.getElementById('chart');

      const renderLineChart = (labels, values) => {
        if (!values.length) {
          chartEl.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
          return;
        }

        const width = 600;
        const height = 240;
        const paddingX = 40;
        const paddingY = 30;
        const top = 20;
        const min = 0;
        const max = Math.max(10, ...values);

        const xStep = values.length > 1 ? (width - paddingX * 2) / (values.length - 1) : 0;
        const scaleY = (height - top - paddingY) / (max - min);
        const x = (index) => paddingX + index * xStep;
        const y = (value) => height - paddingY - (value - min) * scaleY;

        const path = values
          .map((value, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(value).toFixed(2)}`)
          .join(' ');

        let grid = '';
        for (let tick = 0; tick <= max; tick += 2) {
          grid += `<line class="chart-grid" x1="${paddingX}" y1="${y(tick)}" x2="${width - paddingX}" y2="${y(tick)}" />`;
          grid += `<text class="chart-label" x="${paddingX - 10}" y="${y(tick) + 4}" text-anchor="end">${tick}</text>`;
        }

        const labelEvery = Math.max(1, Math.ceil(labels.length / 10));
        const xLabels = labels
          .map((label, index) => index % labelEvery === 0
            ? `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${label}</text>`
            : '')
          .join('');

        const circles = values
          .map((value, index) => `<circle class="chart-point" cx="${x(index)}" cy="${y(value)}" r="4" />`)
          .join('');

        chartEl.innerHTML = `${grid}<path class="chart-line" d="${path}" />${circles}${xLabels}`;
      };

      fetch('/api/summary')
        .then((res) => {
          if (!res.ok) {
            throw new Error('Unable to load summary');
          }
          return res.json();
        })
        .then((summary) => renderLineChart(summary.chart_labels, summary.chart_intensities))
        .catch(() => renderLineChart([], []));
    </script>
"#;

const ADMIN_HTML: &str = r#"    <header>
      <h1>Admin</h1>
      <nav><a href="/dashboard">Dashboard</a><a href="/logout">Log out</a></nav>
    </header>

    <section class="card">
      <h2>All moods ({{MOOD_COUNT}})</h2>
      <table>
        <thead><tr><th>User</th><th>When</th><th>Emotion</th><th>Intensity</th><th>Note</th></tr></thead>
        <tbody>{{MOOD_ROWS}}</tbody>
      </table>
    </section>

    <section class="card">
      <h2>All feedback ({{FEEDBACK_COUNT}})</h2>
      <table>
        <thead><tr><th>User</th><th>When</th><th>Feedback</th></tr></thead>
        <tbody>{{FEEDBACK_ROWS}}</tbody>
      </table>
    </section>
"#;
