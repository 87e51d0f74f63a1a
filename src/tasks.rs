//! Task endpoints of the signed-in user, plus the public language and format lists.

use anyhow::{Context, Result};
use reqwest::{multipart, Method};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::client::ApiClient;
use crate::models::{
    FormatCategory, Paginated, SupportedFormat, SupportedLanguage, TaskListParams,
    TranscriptionRequest, TranscriptionStats, TranscriptionTask,
};
use crate::utils::{
    file_extension, format_file_size, is_file_size_valid, is_supported_file, mime_type_for,
    save_task_result,
};

const TASKS_PATH: &str = "/user/self/transcription/tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PreviewFormat {
    /// Plain transcript text
    Text,
    /// Raw JSON result document
    Json,
}

impl PreviewFormat {
    fn as_str(self) -> &'static str {
        match self {
            PreviewFormat::Text => "text",
            PreviewFormat::Json => "json",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PreviewText {
    #[serde(default)]
    text: String,
}

/// Languages arrive either as a list or as a `code -> name` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LanguageList {
    List(Vec<SupportedLanguage>),
    Map(HashMap<String, String>),
}

impl From<LanguageList> for Vec<SupportedLanguage> {
    fn from(value: LanguageList) -> Self {
        match value {
            LanguageList::List(list) => list,
            LanguageList::Map(map) => {
                let mut languages: Vec<_> = map
                    .into_iter()
                    .map(|(code, name)| SupportedLanguage { code, name })
                    .collect();
                languages.sort_by(|a, b| a.code.cmp(&b.code));
                languages
            }
        }
    }
}

/// Formats arrive either as a list or grouped by category.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FormatList {
    List(Vec<SupportedFormat>),
    Grouped {
        #[serde(default)]
        audio: Vec<String>,
        #[serde(default)]
        video: Vec<String>,
    },
}

impl From<FormatList> for Vec<SupportedFormat> {
    fn from(value: FormatList) -> Self {
        match value {
            FormatList::List(list) => list,
            FormatList::Grouped { audio, video } => {
                let tagged = audio
                    .into_iter()
                    .map(|ext| (ext, FormatCategory::Audio))
                    .chain(video.into_iter().map(|ext| (ext, FormatCategory::Video)));

                let mut formats: Vec<SupportedFormat> = Vec::new();
                for (extension, category) in tagged {
                    // mp4 is listed under both groups
                    if formats.iter().any(|f| f.extension == extension) {
                        continue;
                    }
                    formats.push(SupportedFormat {
                        mime_type: mime_type_for(&format!("file.{}", extension)),
                        extension,
                        category,
                    });
                }
                formats
            }
        }
    }
}

impl ApiClient {
    /// Uploads a media file and creates a transcription task.
    pub async fn create_task(&self, request: &TranscriptionRequest) -> Result<TranscriptionTask> {
        let path = &request.file;
        if !path.exists() {
            anyhow::bail!("File does not exist: {}", path.display());
        }

        let file_name = path
            .file_name()
            .context("Invalid file name")?
            .to_str()
            .context("Invalid file name encoding")?;

        if !is_supported_file(file_name) {
            anyhow::bail!(
                "Unsupported file format: .{}",
                file_extension(file_name)
            );
        }

        let file_size = tokio::fs::metadata(path)
            .await
            .context("Failed to read media file")?
            .len();
        let max_size = self.config().max_upload_size;
        if !is_file_size_valid(file_size, max_size) {
            anyhow::bail!(
                "File is too large ({}), the limit is {}",
                format_file_size(file_size),
                format_file_size(max_size)
            );
        }

        let file_content = tokio::fs::read(path)
            .await
            .context("Failed to read media file")?;

        let mut form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(file_content)
                .file_name(file_name.to_string())
                .mime_str(&mime_type_for(file_name))
                .context("Invalid MIME type")?,
        );
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }

        log::info!("Uploading {} for transcription", path.display());
        let upload = self
            .request(Method::POST, TASKS_PATH)
            .multipart(form)
            .timeout(self.config().upload_timeout());

        let task = self
            .call(upload)
            .await
            .context("Failed to create transcription task")?;
        Ok(task)
    }

    pub async fn list_tasks(&self, params: &TaskListParams) -> Result<Paginated<TranscriptionTask>> {
        let request = self.request(Method::GET, TASKS_PATH).query(params);
        let page = self.call(request).await.context("Failed to list tasks")?;
        Ok(page)
    }

    pub async fn get_task(&self, id: i64) -> Result<TranscriptionTask> {
        let request = self.request(Method::GET, &format!("{}/{}", TASKS_PATH, id));
        let task = self
            .call(request)
            .await
            .with_context(|| format!("Failed to get task {}", id))?;
        Ok(task)
    }

    pub async fn cancel_task(&self, id: i64) -> Result<()> {
        let request = self.request(Method::PUT, &format!("{}/{}/cancel", TASKS_PATH, id));
        self.call_unit(request)
            .await
            .with_context(|| format!("Failed to cancel task {}", id))?;
        Ok(())
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("{}/{}", TASKS_PATH, id));
        self.call_unit(request)
            .await
            .with_context(|| format!("Failed to delete task {}", id))?;
        Ok(())
    }

    /// Result file bytes in `format`. The server falls back to json when the
    /// query is missing, so it is always sent.
    pub async fn download_result(&self, id: i64, format: &str) -> Result<Vec<u8>> {
        let request = self
            .request(Method::GET, &format!("{}/{}/download", TASKS_PATH, id))
            .query(&[("format", format)]);
        let bytes = self
            .call_bytes(request)
            .await
            .with_context(|| format!("Failed to download result of task {}", id))?;
        Ok(bytes)
    }

    /// Downloads the result into `dir` as `<original_filename>.<format>`.
    /// `format` defaults to the task's own output format.
    pub async fn save_result(
        &self,
        task: &TranscriptionTask,
        format: Option<&str>,
        dir: &Path,
    ) -> Result<PathBuf> {
        let format = format.unwrap_or(task.output_format.as_str());
        let content = self.download_result(task.id, format).await?;
        save_task_result(&content, dir, &format!("{}.{}", task.original_filename, format))
    }

    pub async fn preview_result(&self, id: i64, format: PreviewFormat) -> Result<String> {
        let request = self
            .request(Method::GET, &format!("{}/{}/preview", TASKS_PATH, id))
            .query(&[("format", format.as_str())]);

        let preview = match format {
            PreviewFormat::Text => self
                .call::<PreviewText>(request)
                .await
                .map(|preview| preview.text),
            PreviewFormat::Json => self.call_text(request).await,
        };
        let preview = preview.with_context(|| format!("Failed to preview task {}", id))?;
        Ok(preview)
    }

    pub async fn user_stats(&self) -> Result<TranscriptionStats> {
        let request = self.request(Method::GET, "/user/self/transcription/stats");
        let stats = self
            .call(request)
            .await
            .context("Failed to get transcription stats")?;
        Ok(stats)
    }

    pub async fn supported_languages(&self) -> Result<Vec<SupportedLanguage>> {
        let request = self.request(Method::GET, "/transcription/languages");
        let languages: LanguageList = self
            .call(request)
            .await
            .context("Failed to get supported languages")?;
        Ok(languages.into())
    }

    pub async fn supported_formats(&self) -> Result<Vec<SupportedFormat>> {
        let request = self.request(Method::GET, "/transcription/formats");
        let formats: FormatList = self
            .call(request)
            .await
            .context("Failed to get supported formats")?;
        Ok(formats.into())
    }
}
