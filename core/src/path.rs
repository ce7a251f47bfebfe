//! URL helpers shared by the request handlers.

use std::time::Duration;

/// Replace every path segment equal to `secret` with `*****`.
pub fn mask_secret_path(raw: &str, secret: &str) -> String {
    if secret.is_empty() {
        return raw.to_string();
    }
    raw.split('/')
        .map(|segment| if segment == secret { "*****" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

/// Render `d` truncated to its largest non-zero whole unit (`h`, `m` or `s`).
/// Anything under a second renders as `"0s"`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (hours, minutes) = (secs / 3600, secs / 60);
    if hours != 0 {
        format!("{hours}h")
    } else if minutes != 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}
