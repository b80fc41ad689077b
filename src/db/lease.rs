//! Lease state machine and leak-detection watchdog for explicitly acquired
//! connections.
//!
//! A [`Lease`] is either *leased* (it owns the resource and a running
//! [`LeakWatchdog`]) or *released*. `release()` is the only transition and
//! happens at most once; dropping a leased lease performs it implicitly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::errors::AppError;

/// Last statement run on a leased connection, shared with its watchdog.
pub type LastStatement = Arc<Mutex<Option<String>>>;

/// Scheduled warning for a lease that outlives its expected window. Firing
/// only logs; the connection is never reclaimed.
#[derive(Debug)]
pub struct LeakWatchdog {
    task: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl LeakWatchdog {
    /// Arm a watchdog on the current Tokio runtime.
    pub fn arm(lease_id: u64, timeout: Duration, last_statement: LastStatement) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            flag.store(true, Ordering::SeqCst);
            let last = last_statement
                .lock()
                .ok()
                .and_then(|guard| guard.clone())
                .unwrap_or_else(|| "<none>".to_string());
            tracing::warn!(
                lease_id,
                timeout_ms = timeout.as_millis() as u64,
                last_statement = %last,
                "Database client has been checked out longer than the leak timeout"
            );
        });
        Self {
            task: Some(task),
            fired,
        }
    }

    /// Cancel the pending warning. Returns `true` if it had not fired yet.
    pub fn disarm(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                !self.fired.load(Ordering::SeqCst)
            }
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for LeakWatchdog {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Exclusive ownership of a pooled resource between acquisition and release.
#[derive(Debug)]
pub struct Lease<C> {
    id: u64,
    resource: Option<C>,
    watchdog: LeakWatchdog,
}

impl<C> Lease<C> {
    pub fn new(id: u64, resource: C, timeout: Duration, last_statement: LastStatement) -> Self {
        Self {
            id,
            resource: Some(resource),
            watchdog: LeakWatchdog::arm(id, timeout, last_statement),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }

    /// Whether the leak warning has already been logged for this lease.
    pub fn leak_reported(&self) -> bool {
        self.watchdog.has_fired()
    }

    pub fn get_mut(&mut self) -> Result<&mut C, AppError> {
        self.resource.as_mut().ok_or(AppError::ConnectionReleased)
    }

    /// Leased -> released. Disarms the watchdog and drops the resource,
    /// which hands it back to its owner. A second call fails.
    pub fn release(&mut self) -> Result<(), AppError> {
        let resource = self.resource.take().ok_or(AppError::ConnectionReleased)?;
        self.watchdog.disarm();
        drop(resource);
        tracing::trace!(lease_id = self.id, "Lease released");
        Ok(())
    }
}

impl<C> Drop for Lease<C> {
    fn drop(&mut self) {
        if self.resource.is_some() {
            tracing::debug!(lease_id = self.id, "Lease dropped without explicit release");
            let _ = self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts how many times it has been handed back.
    #[derive(Debug)]
    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn no_statement() -> LastStatement {
        Arc::new(Mutex::new(None))
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_fires_after_timeout() {
        let watchdog = LeakWatchdog::arm(1, Duration::from_millis(5000), no_statement());

        tokio::time::sleep(Duration::from_millis(4999)).await;
        assert!(!watchdog.has_fired());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(watchdog.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_watchdog_stays_silent() {
        let mut watchdog = LeakWatchdog::arm(2, Duration::from_millis(5000), no_statement());
        assert!(watchdog.disarm());
        assert!(!watchdog.is_armed());

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert!(!watchdog.has_fired());
        assert!(!watchdog.disarm());
    }

    #[tokio::test(start_paused = true)]
    async fn release_happens_exactly_once() {
        let returned = Arc::new(AtomicUsize::new(0));
        let mut lease = Lease::new(
            3,
            Tracked(returned.clone()),
            Duration::from_millis(5000),
            no_statement(),
        );

        assert!(lease.get_mut().is_ok());
        lease.release().unwrap();
        assert_eq!(returned.load(Ordering::SeqCst), 1);
        assert!(lease.is_released());

        let err = lease.release().unwrap_err();
        assert!(err.is_released());
        assert!(lease.get_mut().unwrap_err().is_released());

        drop(lease);
        assert_eq!(returned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn release_cancels_leak_warning() {
        let mut lease = Lease::new(4, (), Duration::from_millis(5000), no_statement());
        tokio::time::sleep(Duration::from_millis(1000)).await;
        lease.release().unwrap();

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert!(!lease.leak_reported());
    }

    #[tokio::test(start_paused = true)]
    async fn unreleased_lease_is_reported_but_kept() {
        let returned = Arc::new(AtomicUsize::new(0));
        let statement: LastStatement = Arc::new(Mutex::new(Some("BEGIN".to_string())));
        let mut lease = Lease::new(
            5,
            Tracked(returned.clone()),
            Duration::from_millis(5000),
            statement,
        );

        tokio::time::sleep(Duration::from_millis(5001)).await;
        assert!(lease.leak_reported());
        assert!(!lease.is_released());
        assert!(lease.get_mut().is_ok());
        assert_eq!(returned.load(Ordering::SeqCst), 0);

        lease.release().unwrap();
        assert_eq!(returned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drop_releases_leased_resource() {
        let returned = Arc::new(AtomicUsize::new(0));
        {
            let _lease = Lease::new(
                6,
                Tracked(returned.clone()),
                Duration::from_millis(5000),
                no_statement(),
            );
        }
        assert_eq!(returned.load(Ordering::SeqCst), 1);
    }
}
