use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{
    ChannelForm, OutputFormat, Priority, QualityLevel, TaskStatus, TranscriptionRequest,
};
use crate::tasks::PreviewFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Transcription service client", long_about = None)]
#[command(after_help = "Examples:
  transcribe login --username alice --password secret
  transcribe upload meeting.mp3 --language en --format srt --wait
  transcribe upload ./recordings/ --recursive
  transcribe tasks list --status completed
  transcribe tasks download 42 --output ./results
  transcribe admin engines list")]
pub struct Args {
    /// Service base URL, overriding the config file
    #[arg(long, global = true)]
    pub service_url: Option<String>,

    /// Show detailed output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the access token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        /// Code sent by `verify-email`
        #[arg(long)]
        code: Option<String>,
    },
    /// Send an email verification code
    VerifyEmail { email: String },
    /// Log out and forget the stored token
    Logout,
    /// Show the current user, quota and usage, or change your own details
    Profile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Generate a new API access token
    Token {
        /// Use the new token for this client from now on
        #[arg(long)]
        save: bool,
    },
    /// Upload a media file (or a directory of them) for transcription
    Upload(UploadArgs),
    /// Estimate the quota a file will cost
    Estimate {
        file: PathBuf,
        /// Duration in seconds, if known
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Manage your transcription tasks
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// List supported languages
    Languages,
    /// List supported file formats
    Formats,
    /// Quota top-up and payment
    #[command(subcommand)]
    Topup(TopUpCommand),
    /// Administration (admin role required)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(ClapArgs, Debug)]
pub struct UploadArgs {
    /// Path to a media file or a directory of media files
    pub path: PathBuf,

    /// Process directory recursively (only valid with directory input)
    #[arg(short, long)]
    pub recursive: bool,

    /// Language code, or "auto"
    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum)]
    pub quality: Option<QualityLevel>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Include timestamps in the result
    #[arg(long)]
    pub timestamps: Option<bool>,

    /// Label speakers in the result
    #[arg(long)]
    pub speaker: Option<bool>,

    /// Media duration in seconds, used for billing
    #[arg(long)]
    pub duration: Option<i64>,

    /// Wait for each task to finish
    #[arg(short, long)]
    pub wait: bool,

    /// With --wait, save finished results into this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Default)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = crate::pagination::DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    /// Only show tasks whose file name contains this text
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List tasks
    List(ListArgs),
    /// Show one task
    Show { id: i64 },
    /// Follow a task until it finishes (Ctrl-C cancels it)
    Watch { id: i64 },
    /// Cancel a task
    Cancel { id: i64 },
    /// Delete a task
    Delete { id: i64 },
    /// Download the result file
    Download {
        id: i64,
        /// Output format, defaults to the task's own
        #[arg(long)]
        format: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the result
    Preview {
        id: i64,
        #[arg(long, value_enum, default_value = "text")]
        format: PreviewFormat,
    },
    /// Your usage totals
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum TopUpCommand {
    /// Redeem a top-up code
    Redeem { code: String },
    /// Start an online payment
    Pay {
        #[arg(long)]
        amount: i64,
        #[arg(long, default_value = "alipay")]
        method: String,
    },
    /// Show the price of a top-up amount
    Price {
        #[arg(long)]
        amount: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// System stats plus recent tasks
    Dashboard,
    /// Detailed usage statistics over recent tasks
    Stats,
    /// All users' tasks
    Tasks {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        username: Option<String>,
    },
    /// Delete any user's task
    DeleteTask { id: i64 },
    /// Transcription engines
    #[command(subcommand)]
    Engines(EngineCommand),
    /// User accounts
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(ClapArgs, Debug, Default)]
pub struct EngineFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub engine_type: Option<i32>,
    /// API key for the engine
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long)]
    pub base_url: Option<String>,
    /// Bytes
    #[arg(long)]
    pub max_file_size: Option<i64>,
    /// Seconds
    #[arg(long)]
    pub max_duration: Option<i64>,
    /// Comma-separated extensions
    #[arg(long)]
    pub formats: Option<String>,
    /// Comma-separated language codes
    #[arg(long)]
    pub languages: Option<String>,
    #[arg(long)]
    pub weight: Option<i32>,
    /// 1 enabled, 2 disabled
    #[arg(long)]
    pub status: Option<i32>,
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum EngineCommand {
    List,
    /// Engine types the service supports
    Types,
    Create(EngineFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: EngineFields,
    },
    Delete { id: i64 },
    /// Run the server-side connectivity test
    Test { id: i64 },
    Enable {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Disable {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = crate::pagination::DEFAULT_PAGE_SIZE)]
        page_size: u32,
        /// Server-side keyword
        #[arg(long)]
        keyword: Option<String>,
        /// Filter the fetched page by username or email
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: i64 },
    Update {
        id: i64,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// 1 user, 10 admin, 100 super admin
        #[arg(long)]
        role: Option<i32>,
        /// 1 active, 2 banned
        #[arg(long)]
        status: Option<i32>,
        #[arg(long)]
        quota: Option<i64>,
        #[arg(long)]
        group: Option<String>,
    },
    Delete { id: i64 },
}

impl UploadArgs {
    /// Upload form for one file, carrying the options given on the command line.
    pub fn request_for(&self, file: PathBuf) -> TranscriptionRequest {
        TranscriptionRequest {
            file,
            language: self.language.clone(),
            model_name: self.model.clone(),
            enable_timestamps: self.timestamps,
            enable_speaker: self.speaker,
            output_format: self.format,
            quality: self.quality,
            priority: self.priority,
            duration: self.duration,
        }
    }
}

impl From<EngineFields> for ChannelForm {
    fn from(fields: EngineFields) -> Self {
        ChannelForm {
            name: fields.name,
            engine_type: fields.engine_type,
            key: fields.key,
            base_url: fields.base_url,
            max_file_size: fields.max_file_size,
            max_duration: fields.max_duration,
            supported_formats: fields.formats,
            supported_languages: fields.languages,
            weight: fields.weight,
            status: fields.status,
            group: fields.group,
        }
    }
}

pub fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::ALL
        .iter()
        .copied()
        .find(|status| status.as_str() == value.to_lowercase())
        .ok_or_else(|| {
            let names: Vec<_> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown status '{}', expected one of: {}", value, names.join(", "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let args = Args::parse_from([
            "transcribe", "upload", "talk.mp3", "--format", "srt", "--priority", "high", "--wait",
        ]);
        match args.command {
            Command::Upload(upload) => {
                assert_eq!(upload.format, Some(OutputFormat::Srt));
                assert_eq!(upload.priority, Some(Priority::High));
                assert!(upload.wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_engine_fields_map_to_form() {
        let args = Args::parse_from([
            "transcribe", "admin", "engines", "update", "3", "--weight", "7", "--formats", "mp3,wav",
        ]);
        let Command::Admin(AdminCommand::Engines(EngineCommand::Update { id, fields })) = args.command
        else {
            panic!("expected engines update");
        };
        let form = ChannelForm::from(fields);
        assert_eq!(id, 3);
        assert_eq!(form.weight, Some(7));
        assert_eq!(form.supported_formats.as_deref(), Some("mp3,wav"));
        assert!(form.name.is_none());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Completed"), Ok(TaskStatus::Completed));
        assert!(parse_status("archived").is_err());
    }
}
