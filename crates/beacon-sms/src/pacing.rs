//! Rate-limit policy applied around a transport.
//!
//! Providers throttle bursts, so consecutive sends are spaced by a minimum
//! interval. The spacing is shared by every caller of the same
//! [`PacedTransport`], so two SOS dispatches running at once still respect it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::{SmsError, SmsReceipt, SmsTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min_interval: Duration,
}

impl Pacing {
    /// At most one send start per `interval`.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            min_interval: interval,
        }
    }

    pub fn unpaced() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

pub struct PacedTransport<T> {
    inner: T,
    pacing: Pacing,
    last_start: Mutex<Option<Instant>>,
    /// Slots claimed through `wait_turn` and not yet used by a send.
    granted: AtomicUsize,
}

impl<T> PacedTransport<T> {
    pub fn new(inner: T, pacing: Pacing) -> Self {
        Self {
            inner,
            pacing,
            last_start: Mutex::new(None),
            granted: AtomicUsize::new(0),
        }
    }

    /// Wait for the next send slot and claim it. With a deadline, gives up
    /// without claiming when the slot would open at or after it.
    async fn claim_slot(&self, deadline: Option<Instant>) -> bool {
        let mut last = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, self.last_start.lock()).await {
                Ok(guard) => guard,
                Err(_) => return false,
            },
            None => self.last_start.lock().await,
        };

        if let Some(previous) = *last {
            let ready_at = previous + self.pacing.min_interval;
            if deadline.is_some_and(|deadline| ready_at >= deadline) {
                return false;
            }
            let now = Instant::now();
            if ready_at > now {
                debug!(wait_ms = (ready_at - now).as_millis() as u64, "pacing SMS send");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
        true
    }

    fn take_granted(&self) -> bool {
        self.granted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<T: SmsTransport> SmsTransport for PacedTransport<T> {
    async fn send(&self, recipient: &str, text: &str) -> Result<SmsReceipt, SmsError> {
        if !self.pacing.min_interval.is_zero() && !self.take_granted() {
            self.claim_slot(None).await;
        }
        self.inner.send(recipient, text).await
    }

    async fn wait_turn(&self, deadline: Instant) -> bool {
        if self.pacing.min_interval.is_zero() {
            return true;
        }
        if !self.claim_slot(Some(deadline)).await {
            return false;
        }
        self.granted.fetch_add(1, Ordering::AcqRel);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent_at: StdMutex<Vec<Instant>>,
    }

    #[async_trait]
    impl SmsTransport for Recorder {
        async fn send(&self, _recipient: &str, _text: &str) -> Result<SmsReceipt, SmsError> {
            self.sent_at.lock().unwrap().push(Instant::now());
            Ok(SmsReceipt {
                provider_ref: None,
                detail: "ok".into(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_consecutive_sends() {
        let recorder = Arc::new(Recorder::default());
        let paced = PacedTransport::new(recorder.clone(), Pacing::fixed(Duration::from_millis(800)));

        let start = Instant::now();
        for n in ["1", "2", "3"] {
            paced.send(n, "help").await.unwrap();
        }

        let sent_at = recorder.sent_at.lock().unwrap().clone();
        assert_eq!(sent_at.len(), 3);
        assert_eq!(sent_at[0], start, "first send is not delayed");
        assert!(sent_at[1] - sent_at[0] >= Duration::from_millis(800));
        assert!(sent_at[2] - sent_at[1] >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_once_interval_has_passed() {
        let recorder = Arc::new(Recorder::default());
        let paced = PacedTransport::new(recorder.clone(), Pacing::fixed(Duration::from_millis(500)));

        paced.send("1", "help").await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        let before = Instant::now();
        paced.send("2", "help").await.unwrap();

        let sent_at = recorder.sent_at.lock().unwrap().clone();
        assert_eq!(sent_at[1], before);
    }

    #[tokio::test(start_paused = true)]
    async fn unpaced_transport_never_sleeps() {
        let recorder = Arc::new(Recorder::default());
        let paced = PacedTransport::new(recorder.clone(), Pacing::unpaced());

        let start = Instant::now();
        paced.send("1", "help").await.unwrap();
        paced.send("2", "help").await.unwrap();

        assert!(recorder.sent_at.lock().unwrap().iter().all(|at| *at == start));
    }

    #[tokio::test(start_paused = true)]
    async fn granted_turn_sends_without_waiting_again() {
        let recorder = Arc::new(Recorder::default());
        let paced = PacedTransport::new(recorder.clone(), Pacing::fixed(Duration::from_secs(1)));
        let start = Instant::now();

        paced.send("1", "help").await.unwrap();
        assert!(paced.wait_turn(start + Duration::from_secs(5)).await);
        let granted_at = Instant::now();
        assert_eq!(granted_at, start + Duration::from_secs(1));

        paced.send("2", "help").await.unwrap();
        let sent_at = recorder.sent_at.lock().unwrap().clone();
        assert_eq!(sent_at[1], granted_at);
    }

    #[tokio::test(start_paused = true)]
    async fn turn_is_refused_past_the_deadline() {
        let recorder = Arc::new(Recorder::default());
        let paced = PacedTransport::new(recorder.clone(), Pacing::fixed(Duration::from_secs(2)));
        let start = Instant::now();

        paced.send("1", "help").await.unwrap();
        assert!(!paced.wait_turn(start + Duration::from_secs(1)).await);
        assert_eq!(Instant::now(), start, "a refused turn does not sleep");

        // Nothing was claimed, so the next send still waits for its slot.
        paced.send("2", "help").await.unwrap();
        let sent_at = recorder.sent_at.lock().unwrap().clone();
        assert_eq!(sent_at[1], start + Duration::from_secs(2));
    }
}
