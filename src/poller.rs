use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;

use crate::client::ApiClient;
use crate::models::{TaskStatus, TranscriptionTask};
use crate::status::{task_status_badge, task_status_label};

/// Receives every task snapshot a watch fetches.
pub trait TaskObserver {
    fn on_update(&mut self, task: &TranscriptionTask);

    fn on_finish(&mut self, _task: &TranscriptionTask) {}
}

/// Terminal progress bar driven by the task's `progress` field.
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        Self { bar }
    }
}

impl TaskObserver for ProgressBarObserver {
    fn on_update(&mut self, task: &TranscriptionTask) {
        self.bar.set_position(task.progress.min(100) as u64);
        self.bar.set_message(task_status_label(task.status));
    }

    fn on_finish(&mut self, task: &TranscriptionTask) {
        self.bar.finish_with_message(task_status_badge(task.status).to_string());
    }
}

impl ApiClient {
    /// Polls a task until it reaches a terminal status. Ctrl-C cancels the task.
    pub async fn wait_for_task(
        &self,
        id: i64,
        observer: &mut dyn TaskObserver,
    ) -> Result<TranscriptionTask> {
        self.watch_task_until(id, observer, interrupt_signal(tokio::signal::ctrl_c()))
            .await
    }

    /// Polls a task until it finishes or `stop` resolves, in which case the
    /// task is cancelled on the server.
    pub async fn watch_task_until<F>(
        &self,
        id: i64,
        observer: &mut dyn TaskObserver,
        stop: F,
    ) -> Result<TranscriptionTask>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.config().poll_interval());
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => {
                    log::info!("Watch of task {} interrupted, cancelling", id);
                    if let Err(e) = self.cancel_task(id).await {
                        anyhow::bail!("Watch interrupted; cancelling task {} failed: {:#}", id, e);
                    }
                    anyhow::bail!("Task {} cancelled by user", id);
                }
                _ = interval.tick() => {
                    let task = self.get_task(id).await?;
                    observer.on_update(&task);

                    match task.status {
                        TaskStatus::Completed => {
                            observer.on_finish(&task);
                            return Ok(task);
                        }
                        TaskStatus::Failed => {
                            observer.on_finish(&task);
                            let reason = task
                                .failure_reason()
                                .unwrap_or_else(|| "no reason given".to_string());
                            anyhow::bail!("Transcription failed: {}", reason);
                        }
                        TaskStatus::Cancelled => {
                            observer.on_finish(&task);
                            anyhow::bail!("Task {} was cancelled", id);
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

/// Resolves once `signal` fires. A signal that could not be registered never
/// resolves, so it cannot cancel a task on its own.
pub async fn interrupt_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        log::warn!("Could not listen for Ctrl-C, watch runs until the task finishes: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Prints a single status line for tasks that are not being watched.
pub fn print_task_line(task: &TranscriptionTask) {
    let progress = if task.status.is_active() {
        format!(" {}%", task.progress)
    } else {
        String::new()
    };
    println!(
        "{} #{} {}{}",
        task_status_badge(task.status),
        task.id,
        task.original_filename.bold(),
        progress
    );
}
