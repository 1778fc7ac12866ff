//! Registry of in-flight and finished validation runs.
//!
//! Tasks are created when a batch launches, updated under the map's
//! per-key exclusive access as items complete, and finalized exactly
//! once. Finished tasks stay queryable until explicitly pruned.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use ytdlp_extractor::StreamExtractor;

use super::{ChannelValidator, ProgressEvent, ValidationResult, ValidationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TaskProgress {
    pub total: usize,
    pub validated: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// State of one batch validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationTask {
    pub id: String,
    pub state: TaskState,
    pub progress: TaskProgress,
    pub results: Vec<ValidationResult>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Explicit task registry (no module-level globals).
#[derive(Default)]
pub struct ValidationTaskStore {
    tasks: DashMap<String, ValidationTask>,
}

impl ValidationTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running task and return its id.
    pub fn create(&self, total: usize) -> String {
        let id = Uuid::new_v4().to_string();
        let task = ValidationTask {
            id: id.clone(),
            state: TaskState::Running,
            progress: TaskProgress {
                total,
                ..TaskProgress::default()
            },
            results: Vec::new(),
            error_message: None,
            started_at: Utc::now(),
        };
        self.tasks.insert(id.clone(), task);
        id
    }

    /// Snapshot of a task's current state.
    pub fn get(&self, id: &str) -> Option<ValidationTask> {
        self.tasks.get(id).map(|task| task.value().clone())
    }

    pub fn record_progress(&self, id: &str, event: &ProgressEvent) {
        if let Some(mut task) = self.tasks.get_mut(id) {
            task.progress.validated = event.validated;
            match event.status {
                ValidationStatus::Valid => task.progress.succeeded += 1,
                _ => task.progress.failed += 1,
            }
        }
    }

    pub fn complete(&self, id: &str, results: Vec<ValidationResult>) {
        if let Some(mut task) = self.tasks.get_mut(id) {
            task.state = TaskState::Completed;
            task.results = results;
        }
    }

    pub fn fail(&self, id: &str, message: impl Into<String>) {
        if let Some(mut task) = self.tasks.get_mut(id) {
            task.state = TaskState::Failed;
            task.error_message = Some(message.into());
        }
    }

    /// Evict finished tasks older than `max_age`; running tasks are never
    /// evicted. Returns how many were removed.
    pub fn prune_finished(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };

        let before = self.tasks.len();
        self.tasks.retain(|_, task| {
            task.state == TaskState::Running
                || Utc::now().signed_duration_since(task.started_at) < max_age
        });
        before - self.tasks.len()
    }

    /// Launch a background validation run over `urls`, returning the task
    /// id immediately. Progress streams into the store as items complete.
    pub fn spawn<E>(
        self: &Arc<Self>,
        validator: Arc<ChannelValidator<E>>,
        urls: Vec<String>,
    ) -> String
    where
        E: StreamExtractor + 'static,
    {
        let id = self.create(urls.len());
        let store = Arc::clone(self);
        let task_id = id.clone();

        tokio::spawn(async move {
            info!(
                "validation task {task_id} started for {} channels",
                urls.len()
            );

            let progress_store = Arc::clone(&store);
            let progress_id = task_id.clone();
            let observer =
                move |event: ProgressEvent| progress_store.record_progress(&progress_id, &event);

            let results = validator.validate_many(&urls, Some(&observer)).await;
            store.complete(&task_id, results);
            info!("validation task {task_id} completed");
        });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(url: &str, status: ValidationStatus) -> ValidationResult {
        ValidationResult {
            url: url.to_string(),
            status,
            error_message: None,
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn test_task_lifecycle() {
        let store = ValidationTaskStore::new();
        let id = store.create(2);

        let task = store.get(&id).unwrap();
        assert_eq!(task.state, TaskState::Running);
        assert_eq!(task.progress.total, 2);
        assert_eq!(task.progress.validated, 0);

        store.record_progress(
            &id,
            &ProgressEvent {
                total: 2,
                validated: 1,
                current: "https://a".to_string(),
                status: ValidationStatus::Valid,
            },
        );
        store.record_progress(
            &id,
            &ProgressEvent {
                total: 2,
                validated: 2,
                current: "https://b".to_string(),
                status: ValidationStatus::Error,
            },
        );

        let task = store.get(&id).unwrap();
        assert_eq!(task.progress.validated, 2);
        assert_eq!(task.progress.succeeded, 1);
        assert_eq!(task.progress.failed, 1);

        store.complete(
            &id,
            vec![
                sample_result("https://a", ValidationStatus::Valid),
                sample_result("https://b", ValidationStatus::Error),
            ],
        );
        let task = store.get(&id).unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.results.len(), 2);
    }

    #[test]
    fn test_fail_records_message() {
        let store = ValidationTaskStore::new();
        let id = store.create(1);
        store.fail(&id, "extractor unavailable");

        let task = store.get(&id).unwrap();
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.error_message.as_deref(), Some("extractor unavailable"));
    }

    #[test]
    fn test_prune_keeps_running_tasks() {
        let store = ValidationTaskStore::new();
        let running = store.create(1);
        let finished = store.create(1);
        store.complete(&finished, Vec::new());

        let removed = store.prune_finished(Duration::ZERO);
        assert_eq!(removed, 1);
        assert!(store.get(&running).is_some());
        assert!(store.get(&finished).is_none());
    }

    #[test]
    fn test_unknown_task_updates_are_ignored() {
        let store = ValidationTaskStore::new();
        store.record_progress(
            "missing",
            &ProgressEvent {
                total: 1,
                validated: 1,
                current: "https://a".to_string(),
                status: ValidationStatus::Valid,
            },
        );
        store.complete("missing", Vec::new());
        assert!(store.get("missing").is_none());
    }
}
