//! Master user reference list
//!
//! Read-only from the core's perspective; maps an email to the maximum
//! number of tickets that identity may ever hold for an event.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MasterUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub quota: i32,
}

impl MasterUser {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
