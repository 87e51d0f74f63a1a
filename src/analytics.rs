//! Usage figures derived from a page of recent tasks.

use chrono::{DateTime, Datelike, Duration, Local, TimeZone};
use std::collections::HashMap;

use crate::models::{TaskStatus, TranscriptionTask};
use crate::utils::file_extension;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskAnalytics {
    pub today: usize,
    pub week: usize,
    pub month: usize,
    pub status_counts: HashMap<TaskStatus, usize>,
    /// Percentage of completed tasks, one decimal.
    pub success_rate: f64,
    pub avg_file_size: f64,
    pub total_duration: i64,
    /// Top five extensions, most frequent first.
    pub popular_formats: Vec<(String, usize)>,
}

impl TaskAnalytics {
    pub fn compute(tasks: &[TranscriptionTask], now: DateTime<Local>) -> Self {
        let today = start_of_day(now);
        let week = today - Duration::days(7);
        let month = now
            .date_naive()
            .with_day(1)
            .and_then(|first| first.and_hms_opt(0, 0, 0))
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .unwrap_or(today);

        let created_since = |since: DateTime<Local>| {
            tasks
                .iter()
                .filter(|task| task.created_at.with_timezone(&Local) >= since)
                .count()
        };

        let mut status_counts = HashMap::new();
        for task in tasks {
            *status_counts.entry(task.status).or_insert(0) += 1;
        }

        let success_rate = if tasks.is_empty() {
            0.0
        } else {
            let completed = status_counts.get(&TaskStatus::Completed).copied().unwrap_or(0);
            (completed as f64 / tasks.len() as f64 * 1000.0).round() / 10.0
        };

        let avg_file_size = if tasks.is_empty() {
            0.0
        } else {
            tasks.iter().map(|task| task.file_size as f64).sum::<f64>() / tasks.len() as f64
        };

        Self {
            today: created_since(today),
            week: created_since(week),
            month: created_since(month),
            status_counts,
            success_rate,
            avg_file_size,
            total_duration: tasks.iter().filter_map(|task| task.duration).sum(),
            popular_formats: popular_formats(tasks, 5),
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}

fn start_of_day(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .unwrap_or(now)
}

fn popular_formats(tasks: &[TranscriptionTask], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        let ext = file_extension(&task.original_filename);
        let ext = if ext.is_empty() { "unknown".to_string() } else { ext };
        *counts.entry(ext).or_insert(0) += 1;
    }

    let mut formats: Vec<_> = counts.into_iter().collect();
    // ties break alphabetically so the order is stable
    formats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    formats.truncate(limit);
    formats
}
