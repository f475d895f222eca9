use tokio::select;
use tokio_util::sync::CancellationToken;

/// Feeds `items` to the workers in order. Returning drops `item_sender`, which closes the
/// queue so idle workers exit once it is drained.
pub(super) async fn send_item_requests<Iter, I>(
    items: Iter,
    item_sender: async_channel::Sender<I>,
    scope: CancellationToken,
) where
    Iter: Iterator<Item = I>,
{
    for item in items {
        select! {
            biased;
            _ = scope.cancelled() => {
                tracing::trace!("dispatcher cancelled");
                return;
            }
            send_response = item_sender.send(item) => {
                if send_response.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_items_in_order_then_closes() {
        let (item_sender, item_receiver) = async_channel::bounded::<u32>(8);
        send_item_requests(vec![3, 1, 2].into_iter(), item_sender, CancellationToken::new()).await;
        let mut received = Vec::new();
        while let Ok(item) = item_receiver.recv().await {
            received.push(item);
        }
        assert_eq!(received, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn stops_when_cancelled_while_blocked() {
        let (item_sender, item_receiver) = async_channel::bounded::<u32>(1);
        let scope = CancellationToken::new();
        let dispatcher = tokio::spawn(send_item_requests(
            0..100u32,
            item_sender,
            scope.clone(),
        ));
        assert_eq!(item_receiver.recv().await, Ok(0));
        scope.cancel();
        dispatcher.await.unwrap();
        // At most the item already buffered before cancellation is left behind.
        assert!(item_receiver.len() <= 1);
        while item_receiver.recv().await.is_ok() {}
        assert!(item_receiver.is_closed());
    }
}
