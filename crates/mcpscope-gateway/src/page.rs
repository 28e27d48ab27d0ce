//! Pages shown in the browser after a CLI login redirect.

const STYLE: &str = r#"body { font-family: system-ui, -apple-system, sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #0f172a; color: #e2e8f0; }
    main { text-align: center; padding: 2rem; }
    h1.ok { color: #34d399; }
    h1.fail { color: #f87171; }
    p { color: #94a3b8; }
    pre { color: #fecaca; font-family: monospace; margin-top: 1rem; padding: 1rem; background: rgba(248,113,113,0.1); border-radius: 0.5rem; white-space: pre-wrap; }"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>mcpscope - {title}</title>
  <style>
    {STYLE}
  </style>
</head>
<body>
  <main>
{body}
  </main>
</body>
</html>"#
    )
}

/// Shown once the callback has been handed to the waiting login.
pub fn signed_in() -> String {
    page(
        "Signed in",
        r#"    <h1 class="ok">Authorization received</h1>
    <p>You can close this window and return to the terminal.</p>"#,
    )
}

/// Shown when the provider reported an error or the callback was unusable.
pub fn failed(error: &str) -> String {
    page(
        "Sign-in failed",
        &format!(
            r#"    <h1 class="fail">Authorization failed</h1>
    <p>The terminal has been notified.</p>
    <pre>{}</pre>"#,
            escape(error)
        ),
    )
}

/// Shown when nothing is waiting for a callback.
pub fn idle() -> String {
    page(
        "Gateway",
        r#"    <h1 class="ok">mcpscope gateway</h1>
    <p>No login is in progress.</p>"#,
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_failed_page_escapes_error() {
        let html = failed("<b>denied</b>");
        assert!(html.contains("&lt;b&gt;denied&lt;/b&gt;"));
        assert!(!html.contains("<b>denied"));
    }

    #[test]
    fn test_pages_are_documents() {
        for html in [signed_in(), idle(), failed("x")] {
            assert!(html.starts_with("<!DOCTYPE html>"));
            assert!(html.contains("mcpscope"));
        }
    }
}
