use chrono::Duration;
use sheetchart_api::auth::issue_token;
use uuid::Uuid;

/// Signing secret shared by the test app and issued tokens.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

pub struct TestUser {
    pub user_id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// A fresh owner with a valid one-hour token.
pub fn test_user() -> TestUser {
    let user_id = Uuid::new_v4();
    let token =
        issue_token(TEST_JWT_SECRET, user_id, Duration::hours(1)).expect("Failed to issue token");
    TestUser { user_id, token }
}

/// A token for a fresh owner that expired a minute ago.
pub fn expired_token() -> String {
    issue_token(TEST_JWT_SECRET, Uuid::new_v4(), Duration::minutes(-1))
        .expect("Failed to issue token")
}
