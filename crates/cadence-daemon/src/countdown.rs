use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type TickCallback = Box<dyn FnMut(Duration) + Send + 'static>;
type FinishCallback = Box<dyn FnOnce() + Send + 'static>;

struct Callbacks {
    on_tick: TickCallback,
    on_finish: FinishCallback,
}

/// One-shot countdown delivering periodic ticks and a single finish.
///
/// `on_tick` fires right away with the full remaining time and then once per
/// interval with strictly decreasing values; `on_finish` fires once when the
/// deadline passes. Both run on a tokio worker, not on the caller's task.
pub struct Countdown {
    millis_in_future: Duration,
    interval: Duration,
    callbacks: Option<Callbacks>,
    cancel: CancellationToken,
}

impl Countdown {
    pub fn new(
        millis_in_future: Duration,
        interval: Duration,
        on_tick: impl FnMut(Duration) + Send + 'static,
        on_finish: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            millis_in_future,
            interval,
            callbacks: Some(Callbacks {
                on_tick: Box::new(on_tick),
                on_finish: Box::new(on_finish),
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the countdown task. A second call is a no-op.
    pub fn start(&mut self) {
        let Some(callbacks) = self.callbacks.take() else {
            return;
        };

        if self.cancel.is_cancelled() {
            return;
        }

        let interval = if self.interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.interval
        };

        tokio::spawn(run(
            self.millis_in_future,
            interval,
            callbacks,
            self.cancel.clone(),
        ));
    }

    /// Stops further callbacks. Idempotent, also after natural completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    millis_in_future: Duration,
    interval: Duration,
    callbacks: Callbacks,
    cancel: CancellationToken,
) {
    let Callbacks {
        mut on_tick,
        on_finish,
    } = callbacks;

    let started = Instant::now();
    let deadline = started + millis_in_future;
    let mut next_tick = started;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        on_tick(remaining);

        next_tick += interval;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("countdown cancelled");
                return;
            }
            _ = sleep_until(next_tick.min(deadline)) => {}
        }
    }

    if !cancel.is_cancelled() {
        on_finish();
    }
}
