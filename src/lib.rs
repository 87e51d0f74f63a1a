mod account;
mod admin;
mod analytics;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod pagination;
mod poller;
mod session;
mod status;
mod tasks;
mod utils;

// Re-export types needed for the public API
pub use account::Profile;
pub use admin::{engine_type_name, Overview, BUILTIN_ENGINE_TYPES};
pub use analytics::TaskAnalytics;
pub use cli::{
    AdminCommand, Args, Command, EngineCommand, EngineFields, ListArgs, TaskCommand,
    TopUpCommand, UploadArgs, UserCommand,
};
pub use client::{ApiClient, LoginRedirect, PromptLogin};
pub use config::Config;
pub use error::{error_message, ApiError};
pub use models::*;
pub use pagination::{
    filter_tasks_by_filename, filter_users, page_summary, paginate, total_pages, PageCursor,
    DEFAULT_PAGE_SIZE,
};
pub use poller::{interrupt_signal, print_task_line, ProgressBarObserver, TaskObserver};
pub use session::Session;
pub use status::*;
pub use tasks::PreviewFormat;
pub use utils::{
    collect_media_files, estimate_transcription_cost, file_extension, format_date,
    format_duration, format_file_size, is_audio_file, is_file_size_valid, is_supported_file,
    is_video_file, mime_type_for, render_task_markdown, save_task_result,
};
