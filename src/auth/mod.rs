//! Cookie based session authentication.
//!
//! Log-in verifies the password against its bcrypt hash and stores the user
//! ID and an expiry in an encrypted private cookie jar. The [auth_guard]
//! middleware validates the cookies on every protected route, injects the
//! [crate::user::UserID] as a request extension, and extends the session on
//! activity.

mod cookie;
mod log_in;
mod log_out;
mod middleware;

pub use cookie::{
    COOKIE_EXPIRY, COOKIE_USER_ID, DEFAULT_COOKIE_DURATION, invalidate_auth_cookie,
    set_auth_cookie,
};
pub use log_in::log_in_endpoint;
pub use log_out::log_out_endpoint;
pub use middleware::{AuthState, auth_guard};
