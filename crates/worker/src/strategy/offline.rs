//! Self-contained page served when the shell cannot be reached.

use bytes::Bytes;

use crate::fetch::Response;

/// Content type of the offline page.
pub const OFFLINE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Render the offline page. Inline styles only, no external references.
pub fn document(app_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{app_name} - Offline</title>
<style>
body{{font-family:Arial,sans-serif;background:#667eea;color:white;display:flex;flex-direction:column;align-items:center;justify-content:center;height:100vh;margin:0;text-align:center;padding:20px;}}
.card{{background:rgba(255,255,255,0.15);border-radius:16px;padding:32px;max-width:340px;}}
h2{{margin:0 0 12px;}}p{{opacity:.9;line-height:1.5;}}
button{{margin-top:20px;padding:12px 24px;border-radius:8px;border:none;background:white;color:#667eea;font-weight:700;font-size:16px;cursor:pointer;}}
</style></head>
<body><div class="card">
<div style="font-size:48px">&#128244;</div>
<h2>You are offline</h2>
<p>{app_name} needs to load once with an internet connection to work offline.<br><br>Connect to Wi-Fi or mobile data and reload the page.</p>
<button onclick="location.reload()">Retry</button>
</div></body></html>"#
    )
}

/// The offline page as a synthesized `200 OK` response.
pub fn response(app_name: &str) -> Response {
    Response {
        url: String::new(),
        status: 200,
        status_text: "OK".to_string(),
        headers: vec![("content-type".to_string(), OFFLINE_CONTENT_TYPE.to_string())],
        body: Bytes::from(document(app_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_is_self_contained() {
        let html = document("AQUANEV");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("AQUANEV"));
        assert!(!html.contains("src="));
        assert!(!html.contains("href="));
        assert!(!html.contains("http"));
    }

    #[test]
    fn test_response_headers() {
        let response = response("AQUANEV");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(response.text(), document("AQUANEV"));
    }
}
