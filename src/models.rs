use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Go encodes empty slices as `null`; treat that the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::Uploading,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// The server never moves a task out of these states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Uploading | TaskStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Uploading => "uploading",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Srt,
    Txt,
    Vtt,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Srt => "srt",
            OutputFormat::Txt => "txt",
            OutputFormat::Vtt => "vtt",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
        }
    }
}

/// Queue priority, sent as its integer value (1..=4).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(from = "i32", into = "i32")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        match value {
            1 => Priority::Low,
            3 => Priority::High,
            4 => Priority::Urgent,
            _ => Priority::Normal,
        }
    }
}

impl From<Priority> for i32 {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Low => 1,
            Priority::Normal => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

/// Role thresholds only decide what the client offers; the server enforces access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Guest,
    Common,
    Admin,
    Root,
}

impl Role {
    pub const COMMON: i32 = 1;
    pub const ADMIN: i32 = 10;
    pub const ROOT: i32 = 100;

    pub fn from_level(level: i32) -> Self {
        if level >= Self::ROOT {
            Role::Root
        } else if level >= Self::ADMIN {
            Role::Admin
        } else if level >= Self::COMMON {
            Role::Common
        } else {
            Role::Guest
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Enabled,
    Disabled,
    Unknown(i32),
}

impl From<i32> for UserStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => UserStatus::Enabled,
            2 => UserStatus::Disabled,
            other => UserStatus::Unknown(other),
        }
    }
}

impl From<UserStatus> for i32 {
    fn from(value: UserStatus) -> Self {
        match value {
            UserStatus::Enabled => 1,
            UserStatus::Disabled => 2,
            UserStatus::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Enabled,
    ManuallyDisabled,
    AutoDisabled,
    Unknown(i32),
}

impl From<i32> for ChannelStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => ChannelStatus::Enabled,
            2 => ChannelStatus::ManuallyDisabled,
            3 => ChannelStatus::AutoDisabled,
            other => ChannelStatus::Unknown(other),
        }
    }
}

impl From<ChannelStatus> for i32 {
    fn from(value: ChannelStatus) -> Self {
        match value {
            ChannelStatus::Enabled => 1,
            ChannelStatus::ManuallyDisabled => 2,
            ChannelStatus::AutoDisabled => 3,
            ChannelStatus::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: i32,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub used_quota: i64,
    #[serde(default)]
    pub request_count: i64,
    #[serde(default)]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub created_time: i64,
    #[serde(default)]
    pub updated_time: i64,
}

impl User {
    pub fn role_kind(&self) -> Role {
        Role::from_level(self.role)
    }

    pub fn status_kind(&self) -> UserStatus {
        UserStatus::from(self.status)
    }

    pub fn is_admin(&self) -> bool {
        self.role_kind() >= Role::Admin
    }
}

/// Fields an admin (or the user, for their own profile) may change.
#[derive(Debug, Serialize, Clone, Default)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// A configured transcription engine. The backend calls these channels.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub channel_type: i32,
    #[serde(default)]
    pub engine_type: i32,
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_file_size: i64,
    #[serde(default)]
    pub max_duration: i64,
    #[serde(default)]
    pub supported_formats: String,
    #[serde(default)]
    pub supported_languages: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub created_time: i64,
}

impl Channel {
    pub fn status_kind(&self) -> ChannelStatus {
        ChannelStatus::from(self.status)
    }

    pub fn formats(&self) -> Vec<String> {
        split_list(&self.supported_formats)
    }

    pub fn languages(&self) -> Vec<String> {
        split_list(&self.supported_languages)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Partial channel body for create and update calls. Unset fields are omitted.
#[derive(Debug, Serialize, Clone, Default)]
pub struct ChannelForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_formats: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_languages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineType {
    pub id: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineTestResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix seconds of the test run.
    #[serde(default)]
    pub test_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_disabled: Option<bool>,
}

impl EngineTestResult {
    pub fn tested_at(&self) -> Option<DateTime<Utc>> {
        if self.test_time > 0 {
            DateTime::from_timestamp(self.test_time, 0)
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct BatchStatusUpdate {
    pub channel_ids: Vec<i64>,
    pub status: i32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BatchStatusResult {
    pub updated_count: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TranscriptionTask {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<i64>,
    #[serde(default)]
    pub channel_id: i64,

    pub original_filename: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub enable_timestamps: bool,
    #[serde(default)]
    pub enable_speaker: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub quality: QualityLevel,
    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,

    #[serde(default)]
    pub quota_cost: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_duration: Option<i64>,
    #[serde(default)]
    pub billing_type: String,

    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
}

impl TranscriptionTask {
    /// Error text the server attached, or a code-derived message.
    pub fn failure_reason(&self) -> Option<String> {
        match (&self.error_message, &self.error_code) {
            (Some(message), _) if !message.is_empty() => Some(message.clone()),
            (_, Some(code)) if !code.is_empty() => {
                Some(crate::error::error_message(code).to_string())
            }
            _ => None,
        }
    }

    /// Name a downloaded result is saved under.
    pub fn result_file_name(&self) -> String {
        format!("{}.{}", self.original_filename, self.output_format.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopUpStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TopUpRecord {
    #[serde(default)]
    pub id: i64,
    pub trade_no: String,
    pub amount: i64,
    pub money: f64,
    pub status: TopUpStatus,
    #[serde(default)]
    pub created_time: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TopUpResult {
    pub quota: i64,
    #[serde(default)]
    pub is_gift: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PaymentOrder {
    pub url: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TranscriptionStats {
    #[serde(default)]
    pub total_tasks: i64,
    #[serde(default)]
    pub completed_tasks: i64,
    #[serde(default)]
    pub failed_tasks: i64,
    #[serde(default)]
    pub processing_tasks: i64,
    #[serde(default)]
    pub total_duration: i64,
    #[serde(default)]
    pub total_file_size: i64,
    #[serde(default)]
    pub total_quota_cost: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SystemStats {
    #[serde(default)]
    pub total_tasks: i64,
    #[serde(default)]
    pub total_users: i64,
    #[serde(default)]
    pub total_duration: i64,
    #[serde(default)]
    pub total_file_size: i64,
    #[serde(default)]
    pub today_tasks: i64,
    #[serde(default)]
    pub today_duration: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupportedLanguage {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormatCategory {
    Audio,
    Video,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SupportedFormat {
    pub extension: String,
    pub mime_type: String,
    pub category: FormatCategory,
}

/// The `{success, message, data}` envelope every JSON endpoint returns.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// One page of a list endpoint.
///
/// The list field is called `tasks` on every endpoint, users included. That
/// is the backend's naming and it is kept as-is on the wire; use [`items`]
/// when the element type is not a task.
///
/// [`items`]: Paginated::items
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paginated<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub tasks: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl<T> Paginated<T> {
    pub fn items(&self) -> &[T] {
        &self.tasks
    }

    pub fn total_pages(&self) -> u32 {
        crate::pagination::total_pages(self.total, self.page_size)
    }
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct TaskListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Admin listing only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct UserListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptionRequest {
    pub file: PathBuf,
    pub language: Option<String>,
    pub model_name: Option<String>,
    pub enable_timestamps: Option<bool>,
    pub enable_speaker: Option<bool>,
    pub output_format: Option<OutputFormat>,
    pub quality: Option<QualityLevel>,
    pub priority: Option<Priority>,
    /// Seconds, when the caller knows it.
    pub duration: Option<i64>,
}

impl TranscriptionRequest {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Multipart text fields in the order the upload form sends them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(language) = &self.language {
            fields.push(("language", language.clone()));
        }
        if let Some(model_name) = &self.model_name {
            fields.push(("model_name", model_name.clone()));
        }
        if let Some(enable_timestamps) = self.enable_timestamps {
            fields.push(("enable_timestamps", enable_timestamps.to_string()));
        }
        if let Some(enable_speaker) = self.enable_speaker {
            fields.push(("enable_speaker", enable_speaker.to_string()));
        }
        if let Some(output_format) = self.output_format {
            fields.push(("output_format", output_format.as_str().to_string()));
        }
        if let Some(quality) = self.quality {
            fields.push(("quality", quality.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            fields.push(("priority", i32::from(priority).to_string()));
        }
        if let Some(duration) = self.duration {
            fields.push(("duration", duration.to_string()));
        }
        fields
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoginData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AccessToken {
    pub access_token: String,
}
