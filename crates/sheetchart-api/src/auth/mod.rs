pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::issue_token;
pub use middleware::{auth_middleware, AuthState};
pub use models::{JwtClaims, OwnerContext};
