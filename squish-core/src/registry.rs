//! Job bookkeeping: stable ids, status transitions, progress, and
//! cancellation flags.
//!
//! The registry owns one [`JobState`] per input path. Status transitions are
//! enforced so a terminal job can never come back to life, progress is
//! monotone while a job is processing, and removal of an in-flight job is
//! only allowed once its cancellation has been requested.

use crate::error::{CoreError, CoreResult};
use crate::media::MediaKind;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stable identifier for a job, assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Ready,
    Queued,
    Processing,
    Done,
    Cancelled,
    Error,
    Unsupported,
}

impl JobStatus {
    /// Terminal states never transition again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::Cancelled | Self::Error | Self::Unsupported
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{name}")
    }
}

/// Cloneable cancellation flag shared between the registry and a running job.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The running job observes the flag at its next
    /// checkpoint.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot of one queued file.
#[derive(Debug, Clone)]
pub struct JobState {
    pub id: JobId,
    pub path: PathBuf,
    /// Classification at add time; `None` means the type is unrecognized.
    pub kind: Option<MediaKind>,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub cancel: CancelHandle,
    pub output: Option<PathBuf>,
    /// Human-readable detail for Error/Unsupported states.
    pub message: Option<String>,
}

fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::{Cancelled, Done, Error, Processing, Queued, Ready, Unsupported};
    match from {
        Ready => matches!(to, Queued | Cancelled | Error | Unsupported),
        Queued => matches!(to, Processing | Cancelled | Error | Unsupported),
        Processing => matches!(to, Done | Cancelled | Error | Unsupported),
        _ => false,
    }
}

/// Ordered collection of jobs for one run.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: BTreeMap<JobId, JobState>,
    next_id: u64,
}

impl JobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file as a new Ready job. A path that already has a live
    /// (non-terminal) job is rejected.
    pub fn add(&mut self, path: &Path) -> CoreResult<JobId> {
        if self
            .jobs
            .values()
            .any(|job| !job.status.is_terminal() && job.path == path)
        {
            return Err(CoreError::Registry(format!(
                "{} is already queued",
                path.display()
            )));
        }

        let id = JobId(self.next_id);
        self.next_id += 1;
        self.jobs.insert(
            id,
            JobState {
                id,
                path: path.to_path_buf(),
                kind: MediaKind::classify(path),
                status: JobStatus::Ready,
                progress_percent: 0,
                cancel: CancelHandle::new(),
                output: None,
                message: None,
            },
        );
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: JobId) -> Option<&JobState> {
        self.jobs.get(&id)
    }

    /// Jobs in insertion order.
    pub fn jobs(&self) -> impl Iterator<Item = &JobState> {
        self.jobs.values()
    }

    #[must_use]
    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.keys().copied().collect()
    }

    /// Moves a job to a new status, enforcing the lifecycle. Entering
    /// Cancelled resets progress to zero.
    pub fn set_status(&mut self, id: JobId, status: JobStatus) -> CoreResult<()> {
        let job = self.job_mut(id)?;
        if !can_transition(job.status, status) {
            return Err(CoreError::Registry(format!(
                "invalid transition {} -> {} for job {id}",
                job.status, status
            )));
        }
        log::debug!("job {id}: {} -> {}", job.status, status);
        job.status = status;
        if status == JobStatus::Cancelled {
            job.progress_percent = 0;
        }
        Ok(())
    }

    /// Records progress for a Processing job. Values never go backwards and
    /// are capped at 100.
    pub fn set_progress(&mut self, id: JobId, percent: u8) -> CoreResult<()> {
        let job = self.job_mut(id)?;
        if job.status != JobStatus::Processing {
            return Err(CoreError::Registry(format!(
                "job {id} is {} and cannot report progress",
                job.status
            )));
        }
        let percent = percent.min(100);
        if percent > job.progress_percent {
            job.progress_percent = percent;
        }
        Ok(())
    }

    pub fn set_output(&mut self, id: JobId, output: PathBuf) -> CoreResult<()> {
        self.job_mut(id)?.output = Some(output);
        Ok(())
    }

    pub fn set_message(&mut self, id: JobId, message: impl Into<String>) -> CoreResult<()> {
        self.job_mut(id)?.message = Some(message.into());
        Ok(())
    }

    /// The cancellation flag shared with the job's worker.
    #[must_use]
    pub fn cancel_handle(&self, id: JobId) -> Option<CancelHandle> {
        self.jobs.get(&id).map(|job| job.cancel.clone())
    }

    /// Flags a job for cancellation. Terminal jobs are left untouched.
    pub fn request_cancel(&mut self, id: JobId) -> CoreResult<()> {
        let job = self.job_mut(id)?;
        if !job.status.is_terminal() {
            job.cancel.request();
        }
        Ok(())
    }

    /// Removes a job. A Processing job can only be removed after its
    /// cancellation has been requested.
    pub fn remove(&mut self, id: JobId) -> CoreResult<JobState> {
        let Some(job) = self.jobs.remove(&id) else {
            return Err(CoreError::Registry(format!("unknown job {id}")));
        };
        if job.status == JobStatus::Processing && !job.cancel.is_requested() {
            let message = format!("job {id} is processing; request cancellation before removal");
            self.jobs.insert(id, job);
            return Err(CoreError::Registry(message));
        }
        Ok(job)
    }

    fn job_mut(&mut self, id: JobId) -> CoreResult<&mut JobState> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| CoreError::Registry(format!("unknown job {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_one_job() -> (JobRegistry, JobId) {
        let mut registry = JobRegistry::new();
        let id = registry.add(Path::new("/tmp/clip.mp4")).unwrap();
        (registry, id)
    }

    #[test]
    fn test_add_assigns_ids_in_order() {
        let mut registry = JobRegistry::new();
        let a = registry.add(Path::new("/tmp/a.mp4")).unwrap();
        let b = registry.add(Path::new("/tmp/b.png")).unwrap();
        assert!(a < b);

        let paths: Vec<_> = registry.jobs().map(|j| j.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/b.png")]);
    }

    #[test]
    fn test_duplicate_live_path_rejected() {
        let (mut registry, id) = registry_with_one_job();
        assert!(registry.add(Path::new("/tmp/clip.mp4")).is_err());

        // A terminal job frees the path for re-adding.
        registry.set_status(id, JobStatus::Queued).unwrap();
        registry.set_status(id, JobStatus::Cancelled).unwrap();
        assert!(registry.add(Path::new("/tmp/clip.mp4")).is_ok());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let (mut registry, id) = registry_with_one_job();
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Ready);

        registry.set_status(id, JobStatus::Queued).unwrap();
        registry.set_status(id, JobStatus::Processing).unwrap();
        registry.set_status(id, JobStatus::Done).unwrap();

        // Terminal states are final.
        assert!(registry.set_status(id, JobStatus::Queued).is_err());
        assert!(registry.set_status(id, JobStatus::Processing).is_err());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let (mut registry, id) = registry_with_one_job();
        assert!(registry.set_status(id, JobStatus::Done).is_err());
        assert!(registry.set_status(id, JobStatus::Processing).is_err());

        registry.set_status(id, JobStatus::Queued).unwrap();
        assert!(registry.set_status(id, JobStatus::Done).is_err());
    }

    #[test]
    fn test_progress_is_monotone_and_capped() {
        let (mut registry, id) = registry_with_one_job();
        assert!(registry.set_progress(id, 10).is_err()); // not processing yet

        registry.set_status(id, JobStatus::Queued).unwrap();
        registry.set_status(id, JobStatus::Processing).unwrap();

        registry.set_progress(id, 30).unwrap();
        registry.set_progress(id, 20).unwrap(); // ignored, never backwards
        assert_eq!(registry.get(id).unwrap().progress_percent, 30);

        registry.set_progress(id, 150).unwrap();
        assert_eq!(registry.get(id).unwrap().progress_percent, 100);
    }

    #[test]
    fn test_cancellation_resets_progress() {
        let (mut registry, id) = registry_with_one_job();
        registry.set_status(id, JobStatus::Queued).unwrap();
        registry.set_status(id, JobStatus::Processing).unwrap();
        registry.set_progress(id, 60).unwrap();

        registry.request_cancel(id).unwrap();
        assert!(registry.cancel_handle(id).unwrap().is_requested());

        registry.set_status(id, JobStatus::Cancelled).unwrap();
        assert_eq!(registry.get(id).unwrap().progress_percent, 0);
    }

    #[test]
    fn test_remove_rules() {
        let (mut registry, id) = registry_with_one_job();
        registry.set_status(id, JobStatus::Queued).unwrap();
        registry.set_status(id, JobStatus::Processing).unwrap();

        // Removing an in-flight job without cancelling is refused, and the
        // job survives the attempt.
        assert!(registry.remove(id).is_err());
        assert!(registry.get(id).is_some());

        registry.request_cancel(id).unwrap();
        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_cancel_terminal_job_is_noop() {
        let (mut registry, id) = registry_with_one_job();
        registry.set_status(id, JobStatus::Queued).unwrap();
        registry.set_status(id, JobStatus::Cancelled).unwrap();

        registry.request_cancel(id).unwrap();
        assert!(!registry.cancel_handle(id).unwrap().is_requested());
    }

    #[test]
    fn test_kind_classification_on_add() {
        let mut registry = JobRegistry::new();
        let video = registry.add(Path::new("/tmp/clip.webm")).unwrap();
        let unknown = registry.add(Path::new("/tmp/data.bin")).unwrap();
        assert_eq!(registry.get(video).unwrap().kind, Some(MediaKind::Video));
        assert_eq!(registry.get(unknown).unwrap().kind, None);
    }
}
