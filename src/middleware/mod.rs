pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{authenticate, authorize, ensure_owner, extract_token, send_token_response, TOKEN_COOKIE};
pub use rate_limit::{rate_limit, RateLimiter};
pub use response::{ApiResponse, Payload};
