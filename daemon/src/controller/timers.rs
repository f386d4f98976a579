//! Cancellable one-shot timers that post back into the controller
//!
//! Each arm gets a fresh sequence number carried by the posted input. A
//! timer that already fired cannot be recalled from the input queue, so the
//! controller claims an expiry with `fire` and drops it unless the sequence
//! still matches the armed slot.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::input::ControllerInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Commit after a quiet period following a final result
    Silence,
    /// Backoff before the next delivery attempt
    Retry,
    /// Pause between playback end and capture resume
    Settle,
}

struct Slot {
    seq: u64,
    handle: JoinHandle<()>,
}

/// One slot per timer kind; arming a slot replaces whatever was there
pub(crate) struct Timers {
    tx: mpsc::Sender<ControllerInput>,
    next_seq: u64,
    silence: Option<Slot>,
    retry: Option<Slot>,
    settle: Option<Slot>,
}

impl Timers {
    pub fn new(tx: mpsc::Sender<ControllerInput>) -> Self {
        Self {
            tx,
            next_seq: 0,
            silence: None,
            retry: None,
            settle: None,
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<Slot> {
        match kind {
            TimerKind::Silence => &mut self.silence,
            TimerKind::Retry => &mut self.retry,
            TimerKind::Settle => &mut self.settle,
        }
    }

    /// Post the input built from the new sequence number after `delay`,
    /// replacing any timer of the same kind
    pub fn arm<F>(&mut self, kind: TimerKind, delay: Duration, input: F) -> u64
    where
        F: FnOnce(u64) -> ControllerInput,
    {
        self.next_seq += 1;
        let seq = self.next_seq;
        let input = input(seq);
        let tx = self.tx.clone();

        let slot = self.slot(kind);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        debug!(
            ?kind,
            seq,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "timer armed"
        );
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(input).await;
        });
        *slot = Some(Slot { seq, handle });
        seq
    }

    /// Claim an expiry. False when the slot was re-armed or disarmed after
    /// the timer with `seq` was set.
    pub fn fire(&mut self, kind: TimerKind, seq: u64) -> bool {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|armed| armed.seq == seq) {
            *slot = None;
            return true;
        }
        debug!(?kind, seq, "discarding superseded timer");
        false
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        if let Some(armed) = self.slot(kind).take() {
            armed.handle.abort();
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Silence => self.silence.is_some(),
            TimerKind::Retry => self.retry.is_some(),
            TimerKind::Settle => self.settle.is_some(),
        }
    }

    pub fn armed_count(&self) -> usize {
        [&self.silence, &self.retry, &self.settle]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn cancel_all(&mut self) {
        for kind in [TimerKind::Silence, TimerKind::Retry, TimerKind::Settle] {
            self.disarm(kind);
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Generation;

    fn silence(generation: u64) -> impl FnOnce(u64) -> ControllerInput {
        move |seq| ControllerInput::SilenceElapsed {
            generation: Generation::new(generation),
            seq,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_posts_input() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = Timers::new(tx);

        let armed = timers.arm(TimerKind::Settle, Duration::from_millis(500), |seq| {
            ControllerInput::SettleElapsed {
                generation: Generation::new(3),
                seq,
            }
        });
        assert!(timers.is_armed(TimerKind::Settle));

        let input = rx.recv().await.unwrap();
        assert!(matches!(
            input,
            ControllerInput::SettleElapsed { generation, seq }
                if generation == Generation::new(3) && seq == armed
        ));
        assert!(timers.fire(TimerKind::Settle, armed));
        assert!(!timers.is_armed(TimerKind::Settle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = Timers::new(tx);

        for n in 0..3 {
            timers.arm(TimerKind::Silence, Duration::from_millis(100), silence(n));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        let input = rx.try_recv().unwrap();
        assert!(matches!(
            input,
            ControllerInput::SilenceElapsed { generation, .. } if generation == Generation::new(2)
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_after_expiry_supersedes_queued_input() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = Timers::new(tx);

        let first = timers.arm(TimerKind::Silence, Duration::from_millis(100), silence(1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        // Already queued; re-arming cannot recall it
        let second = timers.arm(TimerKind::Silence, Duration::from_millis(100), silence(1));
        let queued = rx.try_recv().unwrap();
        assert!(matches!(queued, ControllerInput::SilenceElapsed { seq, .. } if seq == first));
        assert!(!timers.fire(TimerKind::Silence, first));
        assert!(timers.is_armed(TimerKind::Silence));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(timers.fire(TimerKind::Silence, second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = Timers::new(tx);

        let armed = timers.arm(TimerKind::Retry, Duration::from_millis(1000), |seq| {
            ControllerInput::RetryDue {
                generation: Generation::new(1),
                seq,
            }
        });
        timers.cancel_all();
        assert_eq!(timers.armed_count(), 0);
        assert!(!timers.fire(TimerKind::Retry, armed));

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(rx.try_recv().is_err());
    }
}
