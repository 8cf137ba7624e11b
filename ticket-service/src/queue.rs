//! Bounded FIFO intake queue between the gateway and the fulfillment stage.
//!
//! Producers never wait: [`IntakeQueue::offer`] either enqueues immediately
//! or reports [`AdmissionError::QueueFull`]. Shedding at admission is the only
//! overload protection in the pipeline.

use shared::{AdmissionResult, TicketRequest};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AdmissionError, ConfigError};

/// Producer handle. Cheap to clone; one per gateway worker is fine.
#[derive(Clone, Debug)]
pub struct IntakeQueue {
    sender: mpsc::Sender<TicketRequest>,
}

/// The single consuming end, owned by the fulfillment stage.
#[derive(Debug)]
pub struct QueueReceiver {
    receiver: mpsc::Receiver<TicketRequest>,
}

impl IntakeQueue {
    pub fn bounded(capacity: usize) -> Result<(IntakeQueue, QueueReceiver), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        let (sender, receiver) = mpsc::channel(capacity);
        Ok((IntakeQueue { sender }, QueueReceiver { receiver }))
    }

    pub fn offer(&self, request: TicketRequest) -> Result<(), AdmissionError> {
        match self.sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(AdmissionError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(AdmissionError::Closed),
        }
    }

    pub fn submit(&self, resource_id: Uuid, requester_id: &str) -> AdmissionResult {
        match self.offer(TicketRequest::new(resource_id, requester_id)) {
            Ok(()) => AdmissionResult::Accepted,
            Err(e) => {
                warn!(%resource_id, requester_id, "Request rejected at admission: {}", e);
                AdmissionResult::Rejected
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Number of admitted requests not yet taken by the consumer.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

impl QueueReceiver {
    /// Waits for the next request. `None` once every [`IntakeQueue`] handle is
    /// gone and the buffer has been drained.
    pub async fn take(&mut self) -> Option<TicketRequest> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_a_config_error() {
        assert!(matches!(
            IntakeQueue::bounded(0),
            Err(ConfigError::ZeroQueueCapacity)
        ));
    }

    #[tokio::test]
    async fn sheds_load_once_full() {
        let (queue, _receiver) = IntakeQueue::bounded(2).unwrap();
        let resource_id = Uuid::new_v4();

        assert_eq!(queue.submit(resource_id, "a"), AdmissionResult::Accepted);
        assert_eq!(queue.submit(resource_id, "b"), AdmissionResult::Accepted);
        assert_eq!(queue.pending(), 2);
        assert_eq!(
            queue.offer(TicketRequest::new(resource_id, "c")),
            Err(AdmissionError::QueueFull)
        );
        assert_eq!(queue.pending(), 2);
    }

    #[tokio::test]
    async fn take_frees_a_slot_in_fifo_order() {
        let (queue, mut receiver) = IntakeQueue::bounded(2).unwrap();
        let resource_id = Uuid::new_v4();
        queue.submit(resource_id, "first");
        queue.submit(resource_id, "second");

        let head = receiver.take().await.unwrap();
        assert_eq!(head.requester_id, "first");
        assert_eq!(queue.submit(resource_id, "third"), AdmissionResult::Accepted);

        assert_eq!(receiver.take().await.unwrap().requester_id, "second");
        assert_eq!(receiver.take().await.unwrap().requester_id, "third");
    }

    #[tokio::test]
    async fn closed_once_producers_are_dropped() {
        let (queue, mut receiver) = IntakeQueue::bounded(4).unwrap();
        queue.submit(Uuid::new_v4(), "last");
        drop(queue);

        assert!(receiver.take().await.is_some());
        assert!(receiver.take().await.is_none());
    }

    #[tokio::test]
    async fn offer_fails_after_consumer_is_gone() {
        let (queue, receiver) = IntakeQueue::bounded(4).unwrap();
        drop(receiver);
        assert_eq!(
            queue.offer(TicketRequest::new(Uuid::new_v4(), "late")),
            Err(AdmissionError::Closed)
        );
    }
}
