//! Homepage HTML.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use shotit_core::ScreenshotStats;
use shotit_core::analytics::public_path;

/// Inputs for [`render_homepage`].
#[derive(Debug, Clone, Default)]
pub struct HomepageData {
    pub public_host: String,
    pub hero_url: String,
    pub top: Vec<ScreenshotStats>,
    pub recent: Vec<ScreenshotStats>,
}

const MODIFIERS: &[(&str, &str)] = &[
    ("@full", "Full page screenshot"),
    ("@mobile", "Mobile viewport (390 × 844)"),
    ("@social", "Social preview (1200 × 630)"),
    ("@refresh", "Force fresh capture (once per day)"),
    ("@YYYY-MM-DD", "Latest capture on or before a date"),
];

const STYLE: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      font-family: 'IBM Plex Mono', 'SF Mono', 'Menlo', 'Consolas', monospace;
      background: #fafafa;
      color: #111;
      line-height: 1.6;
      -webkit-font-smoothing: antialiased;
    }
    .container { max-width: 720px; margin: 0 auto; padding: 80px 24px; }
    .site-name { font-size: 13px; font-weight: 500; letter-spacing: 2px; text-transform: uppercase; margin-bottom: 48px; }
    .hero-url { font-size: 18px; margin-bottom: 32px; word-break: break-all; }
    .hero-url a { color: inherit; text-decoration: none; }
    .hero-url a:hover { text-decoration: underline; }
    .screenshot-frame { margin-bottom: 48px; }
    .screenshot-frame a { display: block; }
    .screenshot-frame img { width: 100%; height: auto; display: block; border: 2px solid #111; }
    .tagline { font-size: 15px; margin-bottom: 8px; }
    .subtext { font-size: 14px; color: #666; margin-bottom: 48px; }
    .section-title { font-size: 12px; font-weight: 500; letter-spacing: 1.5px; text-transform: uppercase; margin-bottom: 16px; color: #666; }
    .code-block { background: #f0f0f0; border: 1px solid #ddd; padding: 14px 18px; font-size: 14px; margin-bottom: 48px; overflow-x: auto; }
    .modifiers, .leaderboard { margin-bottom: 48px; }
    .modifier, .entry { display: flex; gap: 24px; font-size: 14px; padding: 8px 0; border-bottom: 1px solid #eee; }
    .modifier:last-child, .entry:last-child { border-bottom: none; }
    .modifier-name { font-weight: 500; min-width: 140px; }
    .modifier-desc, .entry-meta { color: #666; }
    .entry a { color: inherit; word-break: break-all; flex: 1; }
    .empty { font-size: 14px; color: #888; }
    .example { font-size: 14px; margin-bottom: 48px; }
    .example-label { color: #666; margin-bottom: 8px; }
    hr { border: none; border-top: 1px solid #ddd; margin: 48px 0; }
    .footer { font-size: 13px; color: #888; }
    @media (max-width: 600px) {
      .container { padding: 48px 20px; }
      .hero-url { font-size: 16px; }
      .modifier, .entry { flex-direction: column; gap: 4px; }
      .modifier-name { min-width: auto; }
    }
"#;

/// Render the full homepage document.
pub fn render_homepage(data: &HomepageData) -> String {
    let host = &data.public_host;
    let hero_path = public_path(&data.hero_url, "");
    let hero_display = format!("{host}{hero_path}");

    let modifiers: String = MODIFIERS
        .iter()
        .map(|(name, desc)| {
            format!(
                r#"<div class="modifier"><span class="modifier-name">{}</span><span class="modifier-desc">{}</span></div>"#,
                text(name),
                text(desc)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>ScreenshotIt</title>
  <meta name="description" content="Screenshot any webpage via URL. No API keys. No SDK. No dashboard.">
  <style>{STYLE}</style>
</head>
<body>
  <div class="container">
    <div class="site-name">ScreenshotIt</div>

    <div class="hero-url"><a href="{hero_href}">{hero_display_text}</a></div>

    <div class="screenshot-frame">
      <a href="{hero_url_attr}" target="_blank" rel="noopener">
        <img src="{hero_href}" alt="Screenshot of {hero_alt}" loading="lazy">
      </a>
    </div>

    <p class="tagline">The URL is the API.</p>
    <p class="subtext">No keys. No SDK. No dashboard.</p>

    <div class="section-title">Embed anywhere</div>
    <div class="code-block">![](https://{hero_display_text})</div>

    <div class="section-title">Modifiers</div>
    <div class="modifiers">{modifiers}</div>

    <div class="example">
      <div class="example-label">Combine them:</div>
      <div>{host_text}/example.com@full@mobile</div>
    </div>

    <div class="section-title">Most viewed</div>
    {top}

    <div class="section-title">Recently captured</div>
    {recent}

    <hr>

    <div class="footer">Self-hosted. Cached forever.</div>
  </div>
</body>
</html>"#,
        hero_href = attr(&hero_path),
        hero_display_text = text(&hero_display),
        hero_url_attr = attr(&data.hero_url),
        hero_alt = attr(hero_path.trim_start_matches('/')),
        host_text = text(host),
        top = leaderboard(&data.top, view_count),
        recent = leaderboard(&data.recent, |s| s.created_at.clone().unwrap_or_default()),
    )
}

fn view_count(stats: &ScreenshotStats) -> String {
    match stats.access_count {
        1 => "1 view".to_string(),
        n => format!("{n} views"),
    }
}

fn leaderboard(rows: &[ScreenshotStats], meta: impl Fn(&ScreenshotStats) -> String) -> String {
    if rows.is_empty() {
        return r#"<div class="leaderboard"><p class="empty">Nothing here yet.</p></div>"#.to_string();
    }

    let entries: String = rows
        .iter()
        .map(|row| {
            let path = row.public_path();
            format!(
                r#"<div class="entry"><a href="{}">{}</a><span class="entry-meta">{}</span></div>"#,
                attr(&path),
                text(&path),
                text(&meta(row))
            )
        })
        .collect();

    format!(r#"<div class="leaderboard">{entries}</div>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(target_url: &str, modifiers: &str, access_count: i64) -> ScreenshotStats {
        ScreenshotStats {
            storage_key: format!("screenshots/{target_url}/default/latest.webp"),
            target_url: target_url.into(),
            modifiers: modifiers.into(),
            access_count,
            created_count: 1,
            created_at: Some("2026-01-28T12:00:00.000Z".into()),
            last_created_at: None,
            last_accessed_at: None,
        }
    }

    fn data() -> HomepageData {
        HomepageData {
            public_host: "screenshotit.app".into(),
            hero_url: "https://linear.app".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hero_and_embed() {
        let html = render_homepage(&data());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<img src="/linear.app""#));
        assert!(html.contains("![](https://screenshotit.app/linear.app)"));
        assert!(html.contains(r#"href="https://linear.app""#));
    }

    #[test]
    fn test_lists_modifiers() {
        let html = render_homepage(&data());
        for name in ["@full", "@mobile", "@social", "@refresh", "@YYYY-MM-DD"] {
            assert!(html.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_empty_leaderboards() {
        let html = render_homepage(&data());
        assert_eq!(html.matches("Nothing here yet.").count(), 2);
    }

    #[test]
    fn test_leaderboard_links() {
        let data = HomepageData {
            top: vec![stats("https://example.com/docs", "full,mobile", 42)],
            recent: vec![stats("https://example.org", "", 0)],
            ..data()
        };
        let html = render_homepage(&data);
        assert!(html.contains(r#"<a href="/example.com/docs@full@mobile">"#));
        assert!(html.contains("42 views"));
        assert!(html.contains(r#"<a href="/example.org">"#));
        assert!(html.contains("2026-01-28T12:00:00.000Z"));
    }

    #[test]
    fn test_escapes_stored_text() {
        let data = HomepageData { top: vec![stats("https://evil.com/<script>\"", "", 1)], ..data() };
        let html = render_homepage(&data);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
