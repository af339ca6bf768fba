use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};

use super::format_timestamp;
use crate::auth::Identity;
use crate::error::Error;

/// Camera state recorded once at session start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraHealth {
    Working,
    BlackScreen,
    Failed,
}

impl CameraHealth {
    pub fn message(&self) -> &'static str {
        match self {
            CameraHealth::Working => "Camera is working normally.",
            CameraHealth::BlackScreen => "Black screen detected!",
            CameraHealth::Failed => "Camera failed to initialize!",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CameraHealth::Working)
    }
}

impl fmt::Display for CameraHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub fn render_status_page(
    identity: &Identity,
    health: CameraHealth,
    checked_at: &DateTime<Local>,
    self_href: &str,
) -> String {
    let color = if health.is_ok() { "green" } else { "red" };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Webcam Status</title>
</head>
<body style="font-family:sans-serif; text-align:center;">
    <h1>Webcam Monitoring System</h1>
    <p style="font-size:20px;">User: <b>{user}</b></p>
    <p style="font-size:22px; color:{color};">{status}</p>
    <p>Last Checked: {checked}</p>
    <a href="{href}"><button style="padding:10px;font-size:16px;">Refresh</button></a>
</body>
</html>
"#,
        user = escape_html(identity.as_str()),
        color = color,
        status = health.message(),
        checked = format_timestamp(checked_at),
        href = escape_html(self_href),
    )
}

/// Overwrite `path` with the status page.
pub fn write_status_page(
    path: &Path,
    identity: &Identity,
    health: CameraHealth,
    checked_at: &DateTime<Local>,
) -> Result<(), Error> {
    let href = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "status.html".to_string());
    let page = render_status_page(identity, health, checked_at, &href);
    std::fs::write(path, page).map_err(|e| Error::sink(path, e))?;
    log::info!("status page written to {}", path.display());
    Ok(())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_page_is_green() {
        let page = render_status_page(
            &Identity::new("admin"),
            CameraHealth::Working,
            &Local::now(),
            "status.html",
        );
        assert!(page.contains("color:green;\">Camera is working normally."));
        assert!(page.contains("<b>admin</b>"));
        assert!(page.contains("href=\"status.html\""));
    }

    #[test]
    fn failures_are_red() {
        for health in [CameraHealth::BlackScreen, CameraHealth::Failed] {
            let page = render_status_page(&Identity::new("admin"), health, &Local::now(), "s.html");
            assert!(page.contains("color:red;"));
            assert!(page.contains(health.message()));
        }
    }

    #[test]
    fn identity_is_escaped() {
        let page = render_status_page(
            &Identity::new("<script>&"),
            CameraHealth::Working,
            &Local::now(),
            "status.html",
        );
        assert!(page.contains("&lt;script&gt;&amp;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn write_links_to_own_file_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("camera.html");
        write_status_page(&path, &Identity::new("ops"), CameraHealth::Failed, &Local::now())?;
        let page = std::fs::read_to_string(&path)?;
        assert!(page.contains("href=\"camera.html\""));
        assert!(page.contains("Camera failed to initialize!"));
        Ok(())
    }
}
