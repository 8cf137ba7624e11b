use std::time::Duration;

use shared::{FulfillmentEvent, TicketRequest};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::error::FulfillmentError;
use crate::models::Reservation;
use crate::queue::QueueReceiver;
use crate::store::{StoreTransaction, TicketStore};

const EVENT_BUFFER: usize = 1024;

/// Single consumer of the intake queue.
///
/// Requests are processed strictly one after another, each inside its own
/// store transaction. Running one stage per queue is what keeps two attempts
/// from both decrementing the same last unit.
pub struct FulfillmentStage<S> {
    store: S,
    processing_delay: Duration,
    events: broadcast::Sender<FulfillmentEvent>,
}

impl<S: TicketStore> FulfillmentStage<S> {
    pub fn new(store: S, processing_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { store, processing_delay, events }
    }

    /// Outcome events for every processed request, emitted after the
    /// transaction has ended.
    pub fn subscribe(&self) -> broadcast::Receiver<FulfillmentEvent> {
        self.events.subscribe()
    }

    pub async fn run(&self, mut queue: QueueReceiver) {
        info!("Fulfillment stage started, waiting for requests");

        while let Some(request) = queue.take().await {
            self.process(request).await;

            if !self.processing_delay.is_zero() {
                tokio::time::sleep(self.processing_delay).await;
            }
        }

        info!("Intake queue closed and drained, fulfillment stage stopping");
    }

    /// Performs exactly one reservation attempt. Never retries.
    pub async fn process(&self, request: TicketRequest) -> FulfillmentEvent {
        let event = match self.reserve(&request).await {
            Ok(remaining) => {
                info!(
                    requester_id = %request.requester_id,
                    resource_id = %request.resource_id,
                    remaining,
                    "Ticket sold"
                );
                FulfillmentEvent::success(&request, remaining)
            }
            Err(e) => {
                match &e {
                    FulfillmentError::ResourceNotFound(_) | FulfillmentError::SoldOut(_) => warn!(
                        requester_id = %request.requester_id,
                        resource_id = %request.resource_id,
                        "Reservation refused: {}", e
                    ),
                    FulfillmentError::Persistence(_) => error!(
                        requester_id = %request.requester_id,
                        resource_id = %request.resource_id,
                        "Reservation failed: {}", e
                    ),
                }
                FulfillmentEvent::failed(&request, e.outcome(), e.to_string())
            }
        };

        // No subscribers is fine; tracing already has the outcome.
        let _ = self.events.send(event.clone());
        event
    }

    async fn reserve(&self, request: &TicketRequest) -> Result<i32, FulfillmentError> {
        let mut tx = self.store.begin().await?;

        match Self::reserve_within(&mut tx, request).await {
            Ok(remaining) => {
                tx.commit().await?;
                Ok(remaining)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Rollback failed for requester {}: {}", request.requester_id, rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn reserve_within(tx: &mut S::Tx, request: &TicketRequest) -> Result<i32, FulfillmentError> {
        let mut resource = tx
            .get_resource(request.resource_id)
            .await?
            .ok_or(FulfillmentError::ResourceNotFound(request.resource_id))?;

        if resource.is_sold_out() {
            return Err(FulfillmentError::SoldOut(resource.id));
        }

        resource.available_quota -= 1;
        tx.save_resource(&resource).await?;

        let reservation = Reservation::success(resource.id, request.requester_id.clone());
        tx.create_reservation(&reservation).await?;

        Ok(resource.available_quota)
    }
}
