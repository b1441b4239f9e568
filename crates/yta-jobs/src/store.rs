//! Job persistence (spec.md §4.3.1): one JSON file per job under `jobs_dir`,
//! written via a temp-file-then-rename sequence for crash safety, with a
//! per-job-id lock map to serialize concurrent writers within one process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;
use yta_models::{Job, JobId, JobStatus};

use crate::error::{ApiError, ApiResult};

/// Atomically write `contents` to `path` via a sibling temp file and rename,
/// duplicated here because `yta_storage`'s equivalent helper is private to
/// that crate.
async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

/// Per-job-id lock map. Per SPEC_FULL.md's concurrency decision, concurrent
/// `Execute` calls on the same job are last-writer-wins; this guard only
/// prevents torn writes within one process, not cross-process races.
pub struct JobStore {
    jobs_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JobStore {
    pub async fn new(jobs_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let jobs_dir = jobs_dir.into();
        tokio::fs::create_dir_all(&jobs_dir).await?;
        Ok(Self {
            jobs_dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn path_for(&self, job_id: &str) -> PathBuf {
        self.jobs_dir.join(format!("{job_id}.json"))
    }

    async fn lock_for(&self, job_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(job_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    pub async fn create(&self, job: Job) -> ApiResult<Job> {
        let lock = self.lock_for(job.job_id.as_str()).await;
        let _guard = lock.lock().await;
        self.write(&job).await?;
        Ok(job)
    }

    async fn write(&self, job: &Job) -> ApiResult<()> {
        let text = serde_json::to_string_pretty(job)?;
        write_atomic(&self.path_for(job.job_id.as_str()), &text).await?;
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> ApiResult<Job> {
        let path = self.path_for(job_id);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| ApiError::not_found(format!("job {job_id} not found")))?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::internal(format!("corrupt job file {job_id}: {e}")))
    }

    /// List jobs sorted by `created_at` descending. Malformed files are
    /// skipped and logged rather than failing the whole listing.
    pub async fn list(&self, status_filter: Option<JobStatus>, limit: Option<usize>) -> ApiResult<Vec<Job>> {
        let mut entries = tokio::fs::read_dir(&self.jobs_dir).await?;
        let mut jobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable job file");
                    continue;
                }
            };
            match serde_json::from_str::<Job>(&text) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed job file");
                }
            }
        }

        if let Some(status) = status_filter {
            jobs.retain(|j| j.status == status);
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    /// Replace the stored job with `job`, serializing concurrent writers for
    /// the same id.
    pub async fn save(&self, job: Job) -> ApiResult<Job> {
        let lock = self.lock_for(job.job_id.as_str()).await;
        let _guard = lock.lock().await;
        self.write(&job).await?;
        Ok(job)
    }

    pub async fn delete(&self, job_id: &str) -> ApiResult<()> {
        let path = self.path_for(job_id);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|_| ApiError::not_found(format!("job {job_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use yta_models::JobType;

    async fn store() -> (JobStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (store, _dir) = store().await;
        let job = Job::new(JobType::VideoDownload, vec!["u".into()], StdHashMap::new());
        let id = job.job_id.as_str().to_string();
        store.create(job).await.unwrap();

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.job_id.as_str(), id);
    }

    #[tokio::test]
    async fn get_missing_job_errors() {
        let (store, _dir) = store().await;
        let err = store.get("does-not-exist").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_sorts_by_created_at_descending_and_skips_garbage() {
        let (store, dir) = store().await;
        let older = Job::new(JobType::VideoDownload, vec![], StdHashMap::new());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = Job::new(JobType::VideoDownload, vec![], StdHashMap::new());
        store.create(older.clone()).await.unwrap();
        store.create(newer.clone()).await.unwrap();

        tokio::fs::write(dir.path().join("garbage.json"), "{not json")
            .await
            .unwrap();

        let jobs = store.list(None, None).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_id, newer.job_id);
        assert_eq!(jobs[1].job_id, older.job_id);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (store, _dir) = store().await;
        let pending = Job::new(JobType::VideoDownload, vec![], StdHashMap::new());
        let failed = Job::new(JobType::VideoDownload, vec![], StdHashMap::new()).fail("boom");
        store.create(pending).await.unwrap();
        store.create(failed.clone()).await.unwrap();

        let only_failed = store.list(Some(JobStatus::Failed), None).await.unwrap();
        assert_eq!(only_failed.len(), 1);
        assert_eq!(only_failed[0].job_id, failed.job_id);
    }

    #[tokio::test]
    async fn save_overwrites_existing_job() {
        let (store, _dir) = store().await;
        let job = Job::new(JobType::VideoDownload, vec![], StdHashMap::new());
        let id = job.job_id.as_str().to_string();
        store.create(job.clone()).await.unwrap();

        let running = job.start();
        store.save(running).await.unwrap();

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Running);
    }
}
