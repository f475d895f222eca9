mod dispatch;
mod error;
mod sampler;
mod worker;

use std::time::Duration;

use futures::Future;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

pub use error::RaceError;
pub use sampler::{FailureMode, Reservoir};

/// Settings for a race. The defaults run one worker per item, sample the failures and never
/// time out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Race {
    concurrency: usize,
    failure_mode: FailureMode,
    timeout: Option<Duration>,
}

impl Race {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers applying the checker. `0` means one worker per item.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Report [`RaceError::NotFound`] instead of a sampled checker error when every check fails.
    pub fn discard_errors(mut self) -> Self {
        self.failure_mode = FailureMode::Discard;
        self
    }

    /// Give up with [`RaceError::TimedOut`] once `timeout` has elapsed.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the first non-error result of `checker` applied to each of `items`.
    ///
    /// Checks run concurrently on the configured number of workers. As soon as one succeeds,
    /// `cancel` fires, or the deadline passes, every outstanding check is cancelled and the
    /// race returns. If all of the checks fail, one of their errors is returned, chosen
    /// uniformly at random.
    ///
    /// `checker` receives a child of `cancel` that is cancelled when the race is decided.
    /// Checker futures still running at that point are dropped.
    pub async fn run<Items, I, T, E, F, Fut>(
        self,
        cancel: &CancellationToken,
        items: Items,
        checker: F,
    ) -> Result<T, RaceError<E>>
    where
        Items: IntoIterator<Item = I>,
        Items::IntoIter: ExactSizeIterator + Send + 'static,
        F: Fn(CancellationToken, I) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        I: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let items = items.into_iter();
        let length = items.len();
        if length == 0 {
            return Err(RaceError::EmptyInput);
        }
        let concurrent = match self.concurrency {
            0 => length,
            concurrency => concurrency.min(length),
        };
        tracing::debug!(items = length, workers = concurrent, "starting race");

        let scope = cancel.child_token();
        let _cancel_on_exit = scope.clone().drop_guard();
        let mut tasks = JoinSet::new();
        let (item_sender, item_receiver) = async_channel::bounded::<I>(1);
        let (success_sender, mut success_receiver) = mpsc::channel::<T>(1);
        let (failure_sender, failure_receiver) = mpsc::channel::<E>(1);
        let (sample_sender, sample_receiver) = oneshot::channel::<Option<E>>();

        for _ in 0..concurrent {
            tasks.spawn(worker::process_item_requests(
                async_channel::Receiver::clone(&item_receiver),
                F::clone(&checker),
                mpsc::Sender::clone(&success_sender),
                mpsc::Sender::clone(&failure_sender),
                scope.clone(),
            ));
        }
        drop(success_sender);
        drop(failure_sender);
        tasks.spawn(dispatch::send_item_requests(
            items,
            item_sender,
            scope.clone(),
        ));
        tasks.spawn(sampler::process_item_responses(
            length,
            self.failure_mode,
            failure_receiver,
            sample_sender,
            scope.clone(),
        ));

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(sample_receiver);

        // The sampler closes without a result only when a worker died before reporting, so keep
        // joining tasks until the dead worker shows up.
        let mut sampler_closed = false;
        let outcome = loop {
            select! {
                biased;
                _ = scope.cancelled() => break Err(RaceError::Cancelled),
                _ = &mut deadline => {
                    break Err(RaceError::TimedOut(self.timeout.unwrap_or_default()));
                }
                Some(value) = success_receiver.recv() => break Ok(value),
                Some(joined) = tasks.join_next() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            std::panic::resume_unwind(err.into_panic());
                        }
                    }
                }
                sampled = &mut sample_receiver, if !sampler_closed => match sampled {
                    Ok(Some(err)) => break Err(RaceError::AllFailed(err)),
                    Ok(None) => break Err(RaceError::NotFound),
                    Err(_) => sampler_closed = true,
                },
            }
        };
        scope.cancel();
        match &outcome {
            Ok(_) => tracing::debug!("race won by a successful check"),
            Err(err) => tracing::debug!(cancelled = err.is_cancelled(), "race lost"),
        }
        outcome
    }
}

/// Shorthand for `Race::new().concurrency(concurrency).run(cancel, items, checker)`.
///
/// If the list of items is empty, it returns [`RaceError::EmptyInput`].
/// If all of the results are errors, it returns a random error from the error results.
/// If `concurrency` is 0, then it will create `len(items)` workers.
pub async fn race<Items, I, T, E, F, Fut>(
    cancel: &CancellationToken,
    items: Items,
    concurrency: usize,
    checker: F,
) -> Result<T, RaceError<E>>
where
    Items: IntoIterator<Item = I>,
    Items::IntoIter: ExactSizeIterator + Send + 'static,
    F: Fn(CancellationToken, I) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    I: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Race::new()
        .concurrency(concurrency)
        .run(cancel, items, checker)
        .await
}
