//! Playlist expansion and batched execution (spec.md §4.3.3): fetch playlist
//! metadata, create one child `VIDEO_DOWNLOAD` job per entry, execute the
//! children under bounded concurrency, and persist results.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use yta_models::{extract_playlist_id, Job, JobProgress, JobType};

use crate::execute::execute_video_job;
use crate::state::AppState;
use crate::workplan::submit_failure_plan;

const CHUNK_SIZE: usize = 25;
const LARGE_PLAYLIST_THRESHOLD: usize = 100;
const CHUNK_CONCURRENCY_CEILING: usize = 10;
const DEFAULT_MAX_CONCURRENT: usize = 3;

#[derive(Debug, Clone, Serialize)]
struct ChildJobOutcome {
    job_id: String,
    video_id: String,
    title: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PlaylistResults {
    playlist_job_id: String,
    playlist_id: String,
    total_jobs: usize,
    successful: usize,
    failed: usize,
    children: Vec<ChildJobOutcome>,
}

pub async fn execute_playlist_job(state: &AppState, job: Job) -> Job {
    let job = job.start();
    if let Err(e) = state.jobs.save(job.clone()).await {
        warn!(job_id = %job.job_id, error = %e, "failed to persist RUNNING transition");
    }

    let url = match job.urls.first() {
        Some(u) => u.clone(),
        None => return finish_failed(state, job, "playlist job has no urls".to_string()).await,
    };

    let playlist_id = match extract_playlist_id(&url) {
        Ok(id) => id,
        Err(e) => {
            return finish_failed(state, job, format!("invalid playlist url: {e}")).await;
        }
    };

    let playlist = match state.metadata.get_playlist_metadata(&playlist_id).await {
        Ok(p) => p,
        Err(e) => return finish_failed(state, job, format!("playlist not found: {e}")).await,
    };

    let entries: Vec<_> = playlist
        .videos
        .iter()
        .filter(|v| !v.video_id.trim().is_empty())
        .collect();

    let total = entries.len();
    let is_large = total >= LARGE_PLAYLIST_THRESHOLD;

    // Child job creation: preserve playlist position order.
    let mut outcomes: Vec<ChildJobOutcome> = Vec::with_capacity(total);
    let mut children: Vec<(String, Job)> = Vec::with_capacity(total);
    for chunk in entries.chunks(CHUNK_SIZE) {
        let chunk_concurrency = chunk.len().min(CHUNK_CONCURRENCY_CEILING).max(1);
        let semaphore = Arc::new(Semaphore::new(chunk_concurrency));
        let mut handles = Vec::with_capacity(chunk.len());
        for entry in chunk {
            let semaphore = Arc::clone(&semaphore);
            let video_id = entry.video_id.clone();
            let title = entry.title.clone();
            let job_store = Arc::clone(&state.jobs);
            let url = format!("https://www.youtube.com/watch?v={video_id}");
            let quality = job.quality();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let mut options = HashMap::new();
                options.insert("quality".to_string(), serde_json::json!(quality));
                let child = Job::new(JobType::VideoDownload, vec![url], options);
                let outcome = match job_store.create(child.clone()).await {
                    Ok(saved) => ChildJobOutcome {
                        job_id: saved.job_id.as_str().to_string(),
                        video_id: video_id.clone(),
                        title,
                        status: "created".to_string(),
                        error: None,
                    },
                    Err(e) => ChildJobOutcome {
                        job_id: child.job_id.as_str().to_string(),
                        video_id: video_id.clone(),
                        title,
                        status: "failed".to_string(),
                        error: Some(e.to_string()),
                    },
                };
                (outcome, child)
            }));
        }
        for handle in handles {
            if let Ok((outcome, child)) = handle.await {
                outcomes.push(outcome.clone());
                if outcome.status == "created" {
                    children.push((outcome.video_id.clone(), child));
                }
            }
        }
    }

    // Bounded-concurrency execution. Large playlists raise the ceiling but
    // never exceed it.
    let max_concurrent = if is_large {
        state.config.playlist_max_concurrent_ceiling
    } else {
        DEFAULT_MAX_CONCURRENT.min(state.config.playlist_max_concurrent_ceiling)
    };
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let progress_interval = ((total as f64) / 20.0).ceil() as u64;
    let progress_interval = progress_interval.max(1);
    let completed = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let successful_count = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let failed_count = Arc::new(std::sync::atomic::AtomicU64::new(0));

    write_progress(state, &job, total as u64, 0, 0, 0).await;

    let mut handles = Vec::with_capacity(children.len());
    for (video_id, child) in children {
        let semaphore = Arc::clone(&semaphore);
        let state = state.clone();
        let job_id = job.job_id.as_str().to_string();
        let completed = Arc::clone(&completed);
        let successful_count = Arc::clone(&successful_count);
        let failed_count = Arc::clone(&failed_count);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let executed = execute_video_job(&state, child).await;
            let ok = matches!(executed.status, yta_models::JobStatus::Completed);
            if ok {
                successful_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            } else {
                failed_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
            let done = completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if done % progress_interval == 0 || done as usize == total {
                if let Ok(parent) = state.jobs.get(&job_id).await {
                    let progress = JobProgress {
                        total: total as u64,
                        completed: done,
                        successful: successful_count.load(std::sync::atomic::Ordering::SeqCst),
                        failed: failed_count.load(std::sync::atomic::Ordering::SeqCst),
                        eta_seconds: None,
                    };
                    let _ = state.jobs.save(parent.with_progress(progress)).await;
                }
            }
            let _ = executed;
            (video_id, ok)
        }));
    }

    let mut executed_outcomes: HashMap<String, bool> = HashMap::new();
    for handle in handles {
        if let Ok((video_id, ok)) = handle.await {
            executed_outcomes.insert(video_id, ok);
        }
    }

    // Merge execution outcomes back into the creation-ordered outcome list.
    for outcome in outcomes.iter_mut() {
        if outcome.status != "created" {
            continue;
        }
        match executed_outcomes.get(&outcome.video_id) {
            Some(true) => outcome.status = "completed".to_string(),
            Some(false) => outcome.status = "failed".to_string(),
            None => {}
        }
    }

    let successful = successful_count.load(std::sync::atomic::Ordering::SeqCst) as usize;
    let failed = failed_count.load(std::sync::atomic::Ordering::SeqCst) as usize
        + outcomes.iter().filter(|o| o.status == "failed" && o.error.is_some()).count();

    let final_progress = JobProgress {
        total: total as u64,
        completed: total as u64,
        successful: successful_count.load(std::sync::atomic::Ordering::SeqCst),
        failed: failed_count.load(std::sync::atomic::Ordering::SeqCst),
        eta_seconds: None,
    };

    let results = PlaylistResults {
        playlist_job_id: job.job_id.as_str().to_string(),
        playlist_id,
        total_jobs: outcomes.len(),
        successful,
        failed,
        children: outcomes,
    };
    persist_results(state, &results).await;

    let job = job.with_progress(final_progress);
    if failed == 0 {
        finish_completed(state, job).await
    } else {
        let job = job.fail(format!("{failed} of {} child downloads failed", results.total_jobs));
        persist(state, job).await
    }
}

async fn write_progress(state: &AppState, job: &Job, total: u64, completed: u64, successful: u64, failed: u64) {
    let progress = JobProgress {
        total,
        completed,
        successful,
        failed,
        eta_seconds: None,
    };
    let _ = state.jobs.save(job.clone().with_progress(progress)).await;
}

async fn persist_results(state: &AppState, results: &PlaylistResults) {
    let text = match serde_json::to_string_pretty(results) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to serialize playlist results");
            return;
        }
    };
    let path = std::path::Path::new(&state.config.playlist_results_dir)
        .join(format!("playlist_{}.json", results.playlist_job_id));
    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!(error = %e, "failed to create playlist results dir");
            return;
        }
    }
    if let Err(e) = tokio::fs::write(&path, text).await {
        warn!(error = %e, "failed to persist playlist results");
    }
    info!(path = %path.display(), "persisted playlist results");
}

async fn finish_completed(state: &AppState, job: Job) -> Job {
    persist(state, job.complete()).await
}

async fn finish_failed(state: &AppState, job: Job, error: String) -> Job {
    let job = persist(state, job.fail(error.clone())).await;
    submit_failure_plan(&state.storage, &job, &error).await;
    job
}

async fn persist(state: &AppState, job: Job) -> Job {
    match state.jobs.save(job.clone()).await {
        Ok(saved) => saved,
        Err(e) => {
            warn!(job_id = %job.job_id, error = %e, "failed to persist terminal job state");
            job
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_interval_is_ceil_of_total_over_twenty() {
        let total = 234.0_f64;
        let interval = (total / 20.0).ceil() as u64;
        assert_eq!(interval, 12);
        assert_eq!(interval.max(1), 12);
    }

    #[test]
    fn progress_interval_never_zero_for_small_playlists() {
        let total = 3.0_f64;
        let interval = ((total / 20.0).ceil() as u64).max(1);
        assert_eq!(interval, 1);
    }

    #[test]
    fn chunk_concurrency_is_capped_at_ceiling() {
        let chunk_len = 25usize;
        let chunk_concurrency = chunk_len.min(CHUNK_CONCURRENCY_CEILING).max(1);
        assert_eq!(chunk_concurrency, CHUNK_CONCURRENCY_CEILING);
    }

    #[test]
    fn playlist_results_serialize_with_child_outcomes() {
        let results = PlaylistResults {
            playlist_job_id: "job-1".to_string(),
            playlist_id: "PL123".to_string(),
            total_jobs: 2,
            successful: 1,
            failed: 1,
            children: vec![
                ChildJobOutcome {
                    job_id: "c1".to_string(),
                    video_id: "v1".to_string(),
                    title: "one".to_string(),
                    status: "completed".to_string(),
                    error: None,
                },
                ChildJobOutcome {
                    job_id: "c2".to_string(),
                    video_id: "v2".to_string(),
                    title: "two".to_string(),
                    status: "failed".to_string(),
                    error: Some("timeout".to_string()),
                },
            ],
        };
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["total_jobs"], 2);
        assert!(json["children"][1]["error"].is_string());
        assert!(json["children"][0].get("error").is_none());
    }
}
