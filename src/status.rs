//! Badge labels and colours for the enums the service reports.

use colored::*;

use crate::models::{ChannelStatus, Role, TaskStatus, TopUpStatus, UserStatus};

pub fn task_status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "Pending",
        TaskStatus::Uploading => "Uploading",
        TaskStatus::Processing => "Transcribing",
        TaskStatus::Completed => "Completed",
        TaskStatus::Failed => "Failed",
        TaskStatus::Cancelled => "Cancelled",
        TaskStatus::Unknown => "Unknown",
    }
}

pub fn task_status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::Uploading | TaskStatus::Processing => Color::Blue,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Cancelled | TaskStatus::Unknown => Color::White,
    }
}

pub fn task_status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "⋯",
        TaskStatus::Uploading => "↑",
        TaskStatus::Processing => "↻",
        TaskStatus::Completed => "✓",
        TaskStatus::Failed => "✗",
        TaskStatus::Cancelled => "■",
        TaskStatus::Unknown => "?",
    }
}

pub fn task_status_badge(status: TaskStatus) -> ColoredString {
    format!("{} {}", task_status_icon(status), task_status_label(status))
        .color(task_status_color(status))
}

/// One-line explanation shown on the task detail view.
pub fn task_status_description(status: TaskStatus, error_message: Option<&str>) -> String {
    match status {
        TaskStatus::Pending => "Task created, waiting to be processed...".to_string(),
        TaskStatus::Uploading => "Uploading the file to the server...".to_string(),
        TaskStatus::Processing => "Transcribing, please wait...".to_string(),
        TaskStatus::Completed => "Transcription finished, the result can be previewed and downloaded".to_string(),
        TaskStatus::Failed => error_message
            .filter(|msg| !msg.is_empty())
            .unwrap_or("An error occurred during transcription")
            .to_string(),
        TaskStatus::Cancelled => "The task was cancelled".to_string(),
        TaskStatus::Unknown => "Unknown status".to_string(),
    }
}

/// Progress is only meaningful while the server is working on the task.
pub fn progress_visible(status: TaskStatus) -> bool {
    status.is_active()
}

pub fn channel_status_badge(status: ChannelStatus) -> ColoredString {
    match status {
        ChannelStatus::Enabled => "Enabled".green(),
        ChannelStatus::ManuallyDisabled => "Disabled".white(),
        ChannelStatus::AutoDisabled => "Auto-disabled".red(),
        ChannelStatus::Unknown(_) => "Unknown".normal(),
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Root => "Super admin",
        Role::Admin => "Admin",
        Role::Common => "User",
        Role::Guest => "Unknown role",
    }
}

pub fn role_badge(role: Role) -> ColoredString {
    match role {
        Role::Root => role_label(role).red(),
        Role::Admin => role_label(role).yellow(),
        Role::Common | Role::Guest => role_label(role).normal(),
    }
}

pub fn user_status_badge(status: UserStatus) -> ColoredString {
    match status {
        UserStatus::Enabled => "Active".green(),
        UserStatus::Disabled => "Banned".red(),
        UserStatus::Unknown(_) => "Unknown".normal(),
    }
}

pub fn topup_status_badge(status: TopUpStatus) -> ColoredString {
    match status {
        TopUpStatus::Pending => "Pending".yellow(),
        TopUpStatus::Success => "Paid".green(),
        TopUpStatus::Failed => "Failed".red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_has_a_label() {
        for status in TaskStatus::ALL {
            assert_ne!(task_status_label(status), "Unknown");
        }
    }

    #[test]
    fn test_failed_description_uses_error_message() {
        assert_eq!(
            task_status_description(TaskStatus::Failed, Some("engine timeout")),
            "engine timeout"
        );
        assert_eq!(
            task_status_description(TaskStatus::Failed, Some("")),
            "An error occurred during transcription"
        );
    }

    #[test]
    fn test_progress_visible_only_while_active() {
        assert!(progress_visible(TaskStatus::Processing));
        assert!(progress_visible(TaskStatus::Uploading));
        assert!(!progress_visible(TaskStatus::Pending));
        assert!(!progress_visible(TaskStatus::Completed));
    }

    #[test]
    fn test_colors() {
        assert_eq!(task_status_color(TaskStatus::Failed), Color::Red);
        assert_eq!(task_status_color(TaskStatus::Processing), Color::Blue);
        assert_eq!(role_label(Role::from_level(100)), "Super admin");
    }

    #[test]
    fn test_topup_record_badge() {
        let record: crate::models::TopUpRecord = serde_json::from_str(
            r#"{"trade_no": "T123", "amount": 5000, "money": 5.0, "status": "success"}"#,
        )
        .unwrap();
        assert_eq!(record.status, TopUpStatus::Success);
        assert!(topup_status_badge(record.status).to_string().contains("Paid"));
    }
}
