use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use shared::{ReservationStatus, ResourceStatus};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::resources)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub total_quota: i32,
    pub available_quota: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::reservations)]
pub struct Reservation {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub requester_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(name: impl Into<String>, total_quota: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            total_quota,
            available_quota: total_quota,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_quota <= 0
    }

    pub fn status(&self, reserved: i64) -> ResourceStatus {
        ResourceStatus {
            id: self.id,
            name: self.name.clone(),
            total_quota: self.total_quota,
            available_quota: self.available_quota,
            version: self.version,
            reserved,
        }
    }
}

impl Reservation {
    pub fn success(resource_id: Uuid, requester_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id,
            requester_id: requester_id.into(),
            status: ReservationStatus::Success.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReservationStatus::Success.as_str()
    }
}
