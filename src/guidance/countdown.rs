//! One-second-resolution countdown timer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Countdown resolution.
pub const TICK: Duration = Duration::from_secs(1);

struct Armed {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Decrementing timer bound to a step's duration.
///
/// While armed, a background task calls `on_tick` once per elapsed second
/// with the new remaining value and `on_expire` once when it reaches zero,
/// then finishes. [`cancel`](Self::cancel) stops delivery without expiring.
#[derive(Default)]
pub struct CountdownTimer {
    armed: Option<Armed>,
}

impl CountdownTimer {
    /// Creates an unarmed timer.
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Starts counting down from `duration_seconds`.
    ///
    /// The first tick lands `first_tick` from now (capped at [`TICK`]) and
    /// later ticks follow one second apart. Arming with zero delivers
    /// `on_expire` right away without any tick. Callers cancel before
    /// re-arming; a timer found still armed is cancelled here and a warning
    /// is logged.
    pub fn arm<T, E>(
        &mut self,
        duration_seconds: u32,
        first_tick: Duration,
        on_tick: T,
        on_expire: E,
    ) where
        T: Fn(u32) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        if self.is_armed() {
            warn!("countdown re-armed while active; cancelling previous countdown");
        }
        self.cancel();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let first = Instant::now() + first_tick.min(TICK);

        let handle = tokio::spawn(async move {
            let mut on_expire = Some(on_expire);
            if duration_seconds == 0 {
                if !token.is_cancelled() {
                    if let Some(expire) = on_expire.take() {
                        expire();
                    }
                }
                return;
            }

            let mut ticker = tokio::time::interval_at(first, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let mut remaining = duration_seconds;

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    _ = ticker.tick() => {
                        remaining = remaining.saturating_sub(1);
                        on_tick(remaining);
                        if remaining == 0 {
                            if let Some(expire) = on_expire.take() {
                                expire();
                            }
                            return;
                        }
                    }
                }
            }
        });

        self.armed = Some(Armed { cancel, handle });
    }

    /// Stops delivery without firing `on_expire`. No-op when not armed.
    pub fn cancel(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.cancel.cancel();
            armed.handle.abort();
        }
    }

    /// Whether a countdown task is still running.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|armed| !armed.handle.is_finished())
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicU32, Ordering};

    use proptest::prelude::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, Arc<AtomicU32>) {
        (Arc::new(Mutex::new(Vec::new())), Arc::new(AtomicU32::new(0)))
    }

    fn arm_recording(
        timer: &mut CountdownTimer,
        secs: u32,
        ticks: &Arc<Mutex<Vec<u32>>>,
        expired: &Arc<AtomicU32>,
    ) {
        arm_after(timer, secs, TICK, ticks, expired);
    }

    fn arm_after(
        timer: &mut CountdownTimer,
        secs: u32,
        first_tick: Duration,
        ticks: &Arc<Mutex<Vec<u32>>>,
        expired: &Arc<AtomicU32>,
    ) {
        let ticks = Arc::clone(ticks);
        let expired = Arc::clone(expired);
        timer.arm(
            secs,
            first_tick,
            move |remaining| ticks.lock().unwrap().push(remaining),
            move || {
                expired.fetch_add(1, Ordering::SeqCst);
            },
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_each_second_then_expires_once() {
        let (ticks, expired) = recorder();
        let mut timer = CountdownTimer::new();
        arm_recording(&mut timer, 3, &ticks, &expired);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![2, 1]);
        assert_eq!(expired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_expiry() {
        let (ticks, expired) = recorder();
        let mut timer = CountdownTimer::new();
        arm_recording(&mut timer, 2, &ticks, &expired);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*ticks.lock().unwrap(), vec![1]);
        assert_eq!(expired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_when_unarmed_is_noop() {
        let mut timer = CountdownTimer::new();
        timer.cancel();
        timer.cancel();
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_expires_without_ticks() {
        let (ticks, expired) = recorder();
        let mut timer = CountdownTimer::new();
        arm_recording(&mut timer, 0, &ticks, &expired);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(ticks.lock().unwrap().is_empty());
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_countdown() {
        let (ticks, expired) = recorder();
        let mut timer = CountdownTimer::new();
        arm_recording(&mut timer, 10, &ticks, &expired);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        arm_recording(&mut timer, 1, &ticks, &expired);
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(*ticks.lock().unwrap(), vec![9, 0]);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_first_tick_then_whole_seconds() {
        let (ticks, expired) = recorder();
        let mut timer = CountdownTimer::new();
        arm_after(&mut timer, 3, Duration::from_millis(200), &ticks, &expired);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![2]);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![2, 1]);
        assert_eq!(expired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![2, 1, 0]);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_first_tick_fires_immediately() {
        let (ticks, expired) = recorder();
        let mut timer = CountdownTimer::new();
        arm_after(&mut timer, 5, Duration::ZERO, &ticks, &expired);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![4]);
    }

    proptest! {
        #[test]
        fn ticks_count_down_to_zero_then_expire_once(secs in 1u32..40) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();
            let (ticks, expired) = runtime.block_on(async {
                let (ticks, expired) = recorder();
                let mut timer = CountdownTimer::new();
                arm_recording(&mut timer, secs, &ticks, &expired);
                tokio::time::sleep(Duration::from_secs(u64::from(secs) + 5)).await;
                let seen = ticks.lock().unwrap().clone();
                (seen, expired.load(Ordering::SeqCst))
            });

            let expected: Vec<u32> = (0..secs).rev().collect();
            prop_assert_eq!(ticks, expected);
            prop_assert_eq!(expired, 1);
        }
    }
}
