/// Authentication module
///
/// Token signing/validation, password hashing, the session cookie policy
/// and the token authority that ties them to the user store.

mod authority;
mod claims;
mod cookies;
mod jwt;
mod password;

pub use authority::TokenAuthority;
pub use authority::TokenPair;
pub use claims::{AccessClaims, RefreshClaims};
pub use cookies::{CookiePolicy, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use jwt::{
    generate_access_token, generate_refresh_token, validate_access_token, validate_refresh_token,
};
pub use password::{digest_password, hash_password, validate_password_strength, verify_password};
