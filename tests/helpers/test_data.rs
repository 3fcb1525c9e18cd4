//! Test data generation utilities

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::FirstName;
use fake::Fake;
use uuid::Uuid;

use QueueBuddy::models::request::{CreateRequestInput, RequestSource};

/// Unique lower-case email, safe for dedup-sensitive tests
pub fn unique_email() -> String {
    let local: String = Uuid::new_v4().to_string()[..8].to_string();
    format!("{}@example.com", local)
}

/// Random-looking but plausible email from the fake generator
pub fn fake_email() -> String {
    let email: String = SafeEmail().fake();
    email.to_lowercase()
}

pub fn fake_name() -> String {
    FirstName().fake()
}

pub fn request_input(event_id: i64, email: &str, source: Option<RequestSource>) -> CreateRequestInput {
    CreateRequestInput {
        event_id,
        email: email.to_string(),
        name: fake_name(),
        wa: Some("+62081234".to_string()),
        source,
    }
}
