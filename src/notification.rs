//! Desktop notification when watched jobs finish

use crate::api::ResourceKind;
use crate::config::Config;

/// Notification text for `finished` jobs of `kind`
fn summary_for(kind: ResourceKind, finished: usize) -> (String, String) {
    let summary = "All jobs finished".to_string();
    let body = if finished == 1 {
        format!("1 {} job completed", kind.label().to_lowercase())
    } else {
        format!("{} {} jobs completed", finished, kind.label().to_lowercase())
    };
    (summary, body)
}

/// Send the "all done" notification if enabled
pub fn notify_all_done(config: &Config, kind: ResourceKind, finished: usize) {
    if !config.notifications.enabled {
        return;
    }

    let (summary, body) = summary_for(kind, finished);

    // Fire and forget, don't block on errors
    if let Err(e) = send_notification(&summary, &body) {
        tracing::warn!("Failed to send desktop notification: {}", e);
    }
}

fn send_notification(summary: &str, body: &str) -> Result<(), notify_rust::error::Error> {
    use notify_rust::Notification;

    Notification::new()
        .summary(summary)
        .body(body)
        .appname("genwatch")
        .icon("emblem-default")
        .timeout(notify_rust::Timeout::Milliseconds(5000))
        .show()?;
    Ok(())
}
