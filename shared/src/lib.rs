use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A purchase request waiting in the intake queue. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub resource_id: Uuid,
    pub requester_id: String,
}

/// What the gateway tells the caller: queued or shed. Says nothing about fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionResult {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentOutcome {
    Success,
    NotFound,
    SoldOut,
    CommitFailed,
}

/// Emitted once per dequeued request, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentEvent {
    pub requester_id: String,
    pub resource_id: Uuid,
    pub outcome: FulfillmentOutcome,
    pub remaining_quota: Option<i32>,
    pub reason: Option<String>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyRequest {
    #[serde(alias = "event_id")]
    pub resource_id: Uuid,
    #[serde(alias = "user_id")]
    pub requester_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub id: Uuid,
    pub name: String,
    pub total_quota: i32,
    pub available_quota: i32,
    pub version: i32,
    pub reserved: i64,
}

impl TicketRequest {
    pub fn new(resource_id: Uuid, requester_id: impl Into<String>) -> Self {
        Self {
            resource_id,
            requester_id: requester_id.into(),
        }
    }
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Success => "SUCCESS",
        }
    }
}

impl FulfillmentEvent {
    pub fn success(request: &TicketRequest, remaining_quota: i32) -> Self {
        Self {
            requester_id: request.requester_id.clone(),
            resource_id: request.resource_id,
            outcome: FulfillmentOutcome::Success,
            remaining_quota: Some(remaining_quota),
            reason: None,
            processed_at: Utc::now(),
        }
    }

    pub fn failed(request: &TicketRequest, outcome: FulfillmentOutcome, reason: String) -> Self {
        Self {
            requester_id: request.requester_id.clone(),
            resource_id: request.resource_id,
            outcome,
            remaining_quota: None,
            reason: Some(reason),
            processed_at: Utc::now(),
        }
    }
}

impl BuyResponse {
    pub fn pending() -> Self {
        Self {
            status: "pending".to_string(),
            message: "Request queued for processing".to_string(),
        }
    }
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_request_accepts_legacy_field_names() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"event_id": "{}", "user_id": "alice"}}"#, id);
        let request: BuyRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(request.resource_id, id);
        assert_eq!(request.requester_id, "alice");
    }

    #[test]
    fn outcomes_serialize_in_upper_snake_case() {
        let json = serde_json::to_string(&FulfillmentOutcome::CommitFailed).unwrap();
        assert_eq!(json, r#""COMMIT_FAILED""#);
        assert_eq!(ReservationStatus::Success.as_str(), "SUCCESS");
    }

    #[test]
    fn failed_event_carries_reason_but_no_quota() {
        let request = TicketRequest::new(Uuid::new_v4(), "bob");
        let event = FulfillmentEvent::failed(&request, FulfillmentOutcome::SoldOut, "sold out".into());
        assert_eq!(event.remaining_quota, None);
        assert_eq!(event.reason.as_deref(), Some("sold out"));
        assert_eq!(event.requester_id, "bob");
    }
}
