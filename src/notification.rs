/// Fire-and-forget transient messages ("Copied to clipboard", "AI: processing failed").
pub trait Notifier {
    fn notify(&self, body: &str);
}

/// Desktop notification via the platform notification service.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, body: &str) {
        send(body);
    }
}

pub fn send(body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname("cropmark")
        .summary("cropmark")
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}
