//! Bounded worker pool for login verification.
//!
//! Checking a certificate chain and running ECDH cost a few milliseconds
//! of CPU each. Doing that on the connection task would stall its I/O,
//! and spawning a thread per login would let a flood of clients exhaust
//! the machine. Instead, logins run on Tokio's blocking pool behind a
//! semaphore: when every permit is taken, the next login is refused
//! straight away with [`SessionError::LoginBusy`].

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::SessionError;

/// Default number of logins verified at once.
pub const DEFAULT_MAX_CONCURRENT_LOGINS: usize = 32;

#[derive(Debug, Clone)]
pub struct LoginPool {
    permits: Arc<Semaphore>,
}

impl Default for LoginPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_LOGINS)
    }
}

impl LoginPool {
    /// Creates a pool that runs at most `max_concurrent` jobs at a time.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Runs `job` on the blocking pool.
    ///
    /// If the caller stops waiting (its session went away), the job still
    /// finishes but its result is dropped.
    ///
    /// # Errors
    /// - [`SessionError::LoginBusy`] if no permit is free.
    /// - [`SessionError::Internal`] if the job panicked.
    pub async fn run<F, T>(&self, job: F) -> Result<T, SessionError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| SessionError::LoginBusy)?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| SessionError::Internal(format!("login worker failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let pool = LoginPool::new(2);
        let value = pool.run(|| 6 * 7).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_when_full_is_busy() {
        let pool = LoginPool::new(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        let busy_pool = pool.clone();
        let first = tokio::spawn(async move {
            busy_pool
                .run(move || {
                    let _ = started_tx.send(());
                    let _ = release_rx.recv();
                })
                .await
        });

        started_rx.await.expect("first job started");
        assert!(matches!(
            pool.run(|| ()).await,
            Err(SessionError::LoginBusy)
        ));

        release_tx.send(()).expect("release");
        first.await.expect("join").expect("first job ok");
        assert!(pool.run(|| ()).await.is_ok(), "permit returned after the job");
    }

    #[tokio::test]
    async fn test_run_panicking_job_is_internal_error() {
        let pool = LoginPool::new(1);
        let result = pool.run(|| panic!("boom")).await;
        assert!(matches!(result, Err(SessionError::Internal(_))));
        assert!(pool.run(|| ()).await.is_ok(), "permit returned after the panic");
    }
}
