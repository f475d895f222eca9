use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::{
    select,
    sync::{mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;

/// What the sampler keeps from the failures it sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Keep one failure, chosen uniformly at random.
    #[default]
    Sample,
    /// Count failures and drop them.
    Discard,
}

/// Single-slot reservoir: after `n` offers, each offered value is the sample with
/// probability `1/n`, whatever the arrival order.
#[derive(Debug)]
pub struct Reservoir<E> {
    seen: u64,
    sample: Option<E>,
}

impl<E> Default for Reservoir<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Reservoir<E> {
    pub fn new() -> Self {
        Self {
            seen: 0,
            sample: None,
        }
    }

    pub fn offer<R: Rng>(&mut self, item: E, rng: &mut R) {
        self.seen += 1;
        if rng.gen_range(0..self.seen) == 0 {
            self.sample = Some(item);
        }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn sample(&self) -> Option<&E> {
        self.sample.as_ref()
    }

    pub fn into_sample(self) -> Option<E> {
        self.sample
    }
}

/// Waits for `expected` failures and delivers the sampled one. Delivers nothing if the scope
/// is cancelled first, which happens when a success wins the race.
pub(super) async fn process_item_responses<E>(
    expected: usize,
    mode: FailureMode,
    mut failure_receiver: mpsc::Receiver<E>,
    sample_sender: oneshot::Sender<Option<E>>,
    scope: CancellationToken,
) {
    let mut rng = StdRng::from_entropy();
    let mut reservoir = Reservoir::new();
    let mut discarded = 0usize;
    for _ in 0..expected {
        select! {
            biased;
            _ = scope.cancelled() => {
                tracing::trace!(seen = reservoir.seen(), discarded, "sampler cancelled");
                return;
            }
            failure = failure_receiver.recv() => match failure {
                Some(err) => match mode {
                    FailureMode::Sample => reservoir.offer(err, &mut rng),
                    FailureMode::Discard => discarded += 1,
                },
                None => return,
            },
        }
    }
    let _ = sample_sender.send(reservoir.into_sample());
}
