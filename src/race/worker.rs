use futures::Future;
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;

/// Pulls items until the queue closes or the scope is cancelled. The first `Ok` is offered to
/// `success_sender` and ends the worker; every `Err` goes to the sampler.
pub(super) async fn process_item_requests<I, T, E, F, Fut>(
    item_receiver: async_channel::Receiver<I>,
    checker: F,
    success_sender: mpsc::Sender<T>,
    failure_sender: mpsc::Sender<E>,
    scope: CancellationToken,
) where
    F: Fn(CancellationToken, I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    loop {
        let item = select! {
            biased;
            _ = scope.cancelled() => return,
            item = item_receiver.recv() => match item {
                Ok(item) => item,
                Err(_) => return,
            },
        };
        let check = checker(scope.clone(), item);
        let outcome = select! {
            biased;
            _ = scope.cancelled() => return,
            outcome = check => outcome,
        };
        match outcome {
            Ok(value) => {
                select! {
                    biased;
                    _ = scope.cancelled() => {}
                    _ = success_sender.send(value) => {}
                }
                return;
            }
            Err(err) => {
                select! {
                    biased;
                    _ = scope.cancelled() => return,
                    sent = failure_sender.send(err) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }
}
