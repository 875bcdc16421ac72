//! Desktop notifications through `notify-send`

use async_trait::async_trait;
use focus_host_api::{HostError, HostResult, Notification, Notifier};
use tokio::process::Command;
use tracing::debug;

const NOTIFY_PROGRAM: &str = "notify-send";

/// Sends each notification as a `notify-send` invocation
pub struct DesktopNotifier {
    program: String,
    app_name: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::with_program(NOTIFY_PROGRAM)
    }

    /// Use another `notify-send` compatible program
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            app_name: "focusd".into(),
        }
    }

    /// Arguments for one notification
    pub fn args(&self, notification: &Notification) -> Vec<String> {
        vec![
            format!("--app-name={}", self.app_name),
            format!("--urgency={}", urgency(notification.priority)),
            notification.title.clone(),
            notification.message.clone(),
        ]
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn urgency(priority: u8) -> &'static str {
    match priority {
        0 => "low",
        1 => "normal",
        _ => "critical",
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, notification: &Notification) -> HostResult<()> {
        let status = Command::new(&self.program)
            .args(self.args(notification))
            .status()
            .await
            .map_err(|e| HostError::NotifyFailed(format!("{}: {}", self.program, e)))?;

        if !status.success() {
            return Err(HostError::NotifyFailed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        debug!(title = %notification.title, "Notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(priority: u8) -> Notification {
        Notification {
            title: "Focus session complete".into(),
            message: "Time for a break!".into(),
            priority,
        }
    }

    #[test]
    fn args_map_priority_to_urgency() {
        let notifier = DesktopNotifier::new();
        assert_eq!(
            notifier.args(&notification(2)),
            vec![
                "--app-name=focusd",
                "--urgency=critical",
                "Focus session complete",
                "Time for a break!",
            ]
        );
        assert!(notifier.args(&notification(0)).contains(&"--urgency=low".to_string()));
    }

    #[tokio::test]
    async fn failing_program_reports_notify_failed() {
        let notifier = DesktopNotifier::with_program("false");
        assert!(matches!(
            notifier.notify(&notification(2)).await,
            Err(HostError::NotifyFailed(_))
        ));
    }

    #[tokio::test]
    async fn missing_program_reports_notify_failed() {
        let notifier = DesktopNotifier::with_program("/nonexistent/notify-send");
        assert!(matches!(
            notifier.notify(&notification(1)).await,
            Err(HostError::NotifyFailed(_))
        ));
    }

    #[tokio::test]
    async fn successful_program() {
        let notifier = DesktopNotifier::with_program("true");
        notifier.notify(&notification(2)).await.unwrap();
    }
}
