//! Bounded worker pool for running independent tasks side by side.
//!
//! Every line is validated before the first process starts. Each task runs
//! on tokio's blocking pool while holding a semaphore permit, so at most
//! `workers` children exist at once. Outcomes come back over a channel
//! tagged with their submission index and are put back in submission order,
//! whatever order the children finish in.

use crate::error::{Error, Result};
use crate::runner::{execute, parse_task, ProcessLauncher, TaskResult};
use crate::task::Task;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

/// Run `lines` with at most `workers` in flight.
///
/// The outer error covers what is checked up front (worker count, malformed
/// lines); nothing has been launched when it is returned. Otherwise there is
/// one outcome per line, in submission order: a task that could not be
/// started fails on its own and the others keep their results.
#[instrument(skip_all, fields(tasks = lines.len(), workers = workers))]
pub async fn run_parallel<L, S>(
    launcher: Arc<L>,
    lines: &[S],
    workers: usize,
) -> Result<Vec<Result<TaskResult>>>
where
    L: ProcessLauncher + 'static,
    S: AsRef<str>,
{
    if workers == 0 {
        return Err(Error::invalid_argument("worker count must be at least 1")
            .with_operation("pool::run_parallel"));
    }

    let tasks = lines
        .iter()
        .enumerate()
        .map(|(index, line)| parse_task(index, line.as_ref()))
        .collect::<Result<Vec<Task>>>()
        .map_err(|e| e.with_operation("pool::run_parallel"))?;

    let total = tasks.len();
    let semaphore = Arc::new(Semaphore::new(workers.min(total.max(1))));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<TaskResult>)>();
    let mut running = JoinSet::new();

    for (index, task) in tasks.into_iter().enumerate() {
        let permit = Arc::clone(&semaphore).acquire_owned().await.map_err(|e| {
            Error::unexpected("worker pool semaphore closed")
                .with_operation("pool::run_parallel")
                .set_source(e)
        })?;
        let launcher = Arc::clone(&launcher);
        let tx = tx.clone();

        debug!(index, "dispatching task");
        running.spawn_blocking(move || {
            let _permit = permit;
            let outcome = execute(launcher.as_ref(), &task).map_err(|e| {
                e.with_operation("pool::run_parallel")
                    .with_context("index", index.to_string())
            });
            // the receiver outlives every worker
            let _ = tx.send((index, outcome));
        });
    }
    drop(tx);

    while let Some(joined) = running.join_next().await {
        if let Err(e) = joined {
            warn!(err = %e, "pool worker did not finish");
        }
    }

    let mut slots: Vec<Option<Result<TaskResult>>> = (0..total).map(|_| None).collect();
    while let Some((index, outcome)) = rx.recv().await {
        slots[index] = Some(outcome);
    }

    Ok(slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(Error::unexpected("worker exited without reporting a result")
                    .with_operation("pool::run_parallel")
                    .with_context("index", index.to_string()))
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runner::tests::RecordingLauncher;
    use crate::runner::{ProcessOutput, SystemLauncher};
    use crate::task::CommandSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many launches overlap
    #[derive(Default)]
    struct GaugeLauncher {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ProcessLauncher for GaugeLauncher {
        fn launch(&self, _command: &CommandSpec) -> Result<ProcessOutput> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(ProcessOutput {
                code: 0,
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        }
    }

    fn ok_results(outcomes: Vec<Result<TaskResult>>) -> Vec<TaskResult> {
        outcomes.into_iter().map(|o| o.unwrap()).collect()
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let launcher = Arc::new(RecordingLauncher::default());
        let lines: Vec<String> = (0..20).map(|i| format!("say {}", i)).collect();

        let results = ok_results(run_parallel(Arc::clone(&launcher), &lines[..], 4).await.unwrap());

        assert_eq!(results.len(), 20);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.task(), lines[i]);
            assert_eq!(result.stdout(), format!("{}\n", i));
        }
        assert_eq!(launcher.launched.lock().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let launcher = Arc::new(GaugeLauncher::default());
        let lines = ["a", "b", "c", "d", "e", "f"];

        let outcomes = run_parallel(Arc::clone(&launcher), &lines, 2).await.unwrap();

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.is_ok()));
        let peak = launcher.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak was {}", peak);
    }

    #[tokio::test]
    async fn test_invalid_line_rejected_before_any_launch() {
        let launcher = Arc::new(RecordingLauncher::default());
        let err = run_parallel(Arc::clone(&launcher), &["say a", "   ", "say b"], 2)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidTask);
        assert_eq!(err.context_value("index"), Some("1"));
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let launcher = Arc::new(RecordingLauncher::default());
        let err = run_parallel(launcher, &["say a"], 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_spawn_failure_keeps_other_results() {
        for workers in [1, 3] {
            let launcher = Arc::new(RecordingLauncher::default());
            let outcomes = run_parallel(
                Arc::clone(&launcher),
                &["say a", "missing x", "say b"],
                workers,
            )
            .await
            .unwrap();

            assert_eq!(outcomes.len(), 3);
            assert_eq!(outcomes[0].as_ref().unwrap().stdout(), "a\n");
            let err = outcomes[1].as_ref().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SpawnFailed);
            assert_eq!(err.context_value("index"), Some("1"));
            assert_eq!(outcomes[2].as_ref().unwrap().stdout(), "b\n");
            assert_eq!(launcher.launched.lock().unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let launcher = Arc::new(RecordingLauncher::default());
        let lines: [&str; 0] = [];
        assert!(run_parallel(launcher, &lines, 2).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_processes_keep_order() {
        let lines = ["sh -c 'sleep 0.2; echo slow'", "echo fast", "false"];
        let results = ok_results(
            run_parallel(Arc::new(SystemLauncher::new()), &lines, 3)
                .await
                .unwrap(),
        );

        assert_eq!(results[0].stdout(), "slow\n");
        assert_eq!(results[1].stdout(), "fast\n");
        assert_eq!(results[2].returncode(), 1);
    }
}
