//! Admission-controlled ticket fulfillment.
//!
//! Requests enter through a bounded [`queue::IntakeQueue`] that sheds load
//! when full, and a single [`worker::FulfillmentStage`] drains it, performing
//! one atomic check-decrement-record transaction per request against a
//! [`store::TicketStore`].

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod schema;
pub mod store;
pub mod worker;
