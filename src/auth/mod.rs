//! Credential handling: password digests, access tokens, and the bearer-token extractor.

mod extract;
mod password;
mod token;

pub use extract::{bearer_token, CurrentUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenError, TokenService};
