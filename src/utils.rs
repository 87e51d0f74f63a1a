use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use crate::models::TranscriptionTask;

const AUDIO_EXTENSIONS: [&str; 8] = ["mp3", "wav", "m4a", "flac", "aac", "ogg", "wma", "amr"];
const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

const COST_PER_MINUTE: i64 = 100;

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let sizes = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < sizes.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    // two decimals, trailing zeros dropped
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, sizes[unit])
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

pub fn is_audio_file(filename: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&file_extension(filename).as_str())
}

pub fn is_video_file(filename: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&file_extension(filename).as_str())
}

pub fn is_supported_file(filename: &str) -> bool {
    is_audio_file(filename) || is_video_file(filename)
}

pub fn is_supported_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(is_supported_file)
        .unwrap_or(false)
}

pub fn mime_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub fn is_file_size_valid(file_size: u64, max_size: u64) -> bool {
    file_size <= max_size
}

/// Quota a transcription is expected to cost: 100 per started minute.
///
/// Without a known duration, one minute per whole MB is assumed, at least one minute.
pub fn estimate_transcription_cost(file_size: u64, duration: Option<u64>) -> i64 {
    let duration = match duration {
        Some(seconds) if seconds > 0 => seconds,
        _ => (file_size / (1024 * 1024) * 60).max(60),
    };
    let minutes = duration.div_ceil(60) as i64;
    minutes * COST_PER_MINUTE
}

pub fn collect_media_files(path: &PathBuf, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_supported_path(path) {
            files.push(path.clone());
        }
    } else if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && is_supported_path(&path) {
                files.push(path);
            } else if recursive && path.is_dir() {
                files.extend(collect_media_files(&path, true)?);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Writes a downloaded result into `dir`, keeping only the last component of `file_name`.
pub fn save_task_result(content: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf> {
    let file_name = Path::new(file_name)
        .file_name()
        .context("Invalid result file name")?
        .to_owned();
    let output_path = dir.join(file_name);

    std::fs::write(&output_path, content)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(output_path)
}

pub fn render_task_markdown(task: &TranscriptionTask) -> String {
    let mut markdown = String::new();

    if let Some(text) = &task.result_text {
        markdown.push_str(text);
        markdown.push_str("\n\n---\n\n");
    }

    markdown.push_str("## Transcription Task\n\n");
    markdown.push_str(&format!("- **Task:** #{}\n", task.id));
    markdown.push_str(&format!("- **Source File:** {}\n", task.original_filename));
    markdown.push_str(&format!(
        "- **File Size:** {}\n",
        format_file_size(task.file_size.max(0) as u64)
    ));
    if let Some(duration) = task.duration {
        markdown.push_str(&format!(
            "- **Duration:** {}\n",
            format_duration(duration.max(0) as u64)
        ));
    }
    let language = task
        .detected_language
        .as_deref()
        .filter(|lang| !lang.is_empty())
        .unwrap_or(&task.language);
    markdown.push_str(&format!("- **Language:** {}\n", language));
    if let Some(score) = task.confidence_score {
        markdown.push_str(&format!("- **Confidence:** {:.1}%\n", score * 100.0));
    }
    markdown.push_str(&format!("- **Quota Cost:** {}\n", task.quota_cost));
    markdown.push_str(&format!("- **Created:** {}\n", format_date(&task.created_at)));
    if let Some(completed_at) = &task.completed_at {
        markdown.push_str(&format!("- **Completed:** {}\n", format_date(completed_at)));
    }

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_task() -> TranscriptionTask {
        serde_json::from_value(serde_json::json!({
            "id": 12,
            "original_filename": "interview.wav",
            "file_size": 1536,
            "duration": 3661,
            "language": "auto",
            "detected_language": "en",
            "output_format": "txt",
            "status": "completed",
            "progress": 100,
            "result_text": "Hello there.",
            "confidence_score": 0.934,
            "quota_cost": 6200,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:05:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024 * 5 + 1024 * 300), "5.29 MB");
        assert_eq!(format_file_size(1024u64.pow(4)), "1024 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3661), "1:01:01");
    }

    #[test]
    fn test_supported_files() {
        let test_files = vec![
            ("a.mp3", true),
            ("talk.M4A", true),
            ("clip.webm", true),
            ("movie.mkv", true),
            ("voice.amr", true),
            ("a.exe", false),
            ("notes.txt", false),
            ("mp3", false),
            ("archive.mp3.zip", false),
        ];

        for (file, expected) in test_files {
            assert_eq!(is_supported_file(file), expected, "Failed for file: {}", file);
        }
    }

    #[test]
    fn test_audio_video_split() {
        assert!(is_audio_file("x.flac"));
        assert!(!is_video_file("x.flac"));
        assert!(is_video_file("x.mov"));
        assert_eq!(file_extension("no_extension"), "");
        assert_eq!(file_extension("Report.Final.WAV"), "wav");
    }

    #[test]
    fn test_estimate_transcription_cost() {
        assert_eq!(estimate_transcription_cost(0, Some(125)), 300);
        assert_eq!(estimate_transcription_cost(0, Some(60)), 100);
        assert_eq!(estimate_transcription_cost(0, Some(61)), 200);
        // 3 MB without duration: three minutes
        assert_eq!(estimate_transcription_cost(3 * 1024 * 1024, None), 300);
        // small files are billed at least one minute
        assert_eq!(estimate_transcription_cost(1000, None), 100);
    }

    #[test]
    fn test_mime_type_fallback() {
        assert_eq!(mime_type_for("a.mp3"), "audio/mpeg");
        assert_eq!(mime_type_for("a.unknownext"), "application/octet-stream");
    }

    #[test]
    fn test_file_size_limit() {
        assert!(is_file_size_valid(100, 100));
        assert!(!is_file_size_valid(101, 100));
    }

    #[test]
    fn test_collect_media_files() {
        let temp_dir = tempdir().unwrap();
        let base_path = temp_dir.path();

        std::fs::write(base_path.join("test1.mp3"), "dummy").unwrap();
        std::fs::write(base_path.join("test2.mp4"), "dummy").unwrap();
        std::fs::write(base_path.join("test3.txt"), "dummy").unwrap();

        let sub_dir = base_path.join("subdir");
        std::fs::create_dir(&sub_dir).unwrap();
        std::fs::write(sub_dir.join("test4.wav"), "dummy").unwrap();

        let files = collect_media_files(&base_path.to_path_buf(), false).unwrap();
        assert_eq!(files.len(), 2, "Should find 2 media files in base directory");

        let files = collect_media_files(&base_path.to_path_buf(), true).unwrap();
        assert_eq!(files.len(), 3, "Should find 3 media files in total");

        let single_file = base_path.join("test1.mp3");
        let files = collect_media_files(&single_file, false).unwrap();
        assert_eq!(files, vec![single_file]);
    }

    #[test]
    fn test_save_task_result() {
        let temp_dir = tempdir().unwrap();
        let task = sample_task();

        let output_path =
            save_task_result(b"Hello there.", temp_dir.path(), &task.result_file_name()).unwrap();
        assert_eq!(output_path.file_name().unwrap(), "interview.wav.txt");
        assert_eq!(output_path.parent().unwrap(), temp_dir.path());
        assert_eq!(std::fs::read_to_string(output_path).unwrap(), "Hello there.");

        let escaped = save_task_result(b"x", temp_dir.path(), "../../etc/evil.srt").unwrap();
        assert_eq!(escaped, temp_dir.path().join("evil.srt"));
    }

    #[test]
    fn test_render_task_markdown() {
        let content = render_task_markdown(&sample_task());
        assert!(content.starts_with("Hello there."));
        assert!(content.contains("## Transcription Task"));
        assert!(content.contains("- **Source File:** interview.wav"));
        assert!(content.contains("- **File Size:** 1.5 KB"));
        assert!(content.contains("- **Duration:** 1:01:01"));
        assert!(content.contains("- **Language:** en"));
        assert!(content.contains("- **Confidence:** 93.4%"));
    }
}
