/// Session cookie policy
///
/// The token pair travels as two `HttpOnly` cookies. `Secure` is only set in
/// production so the service can be exercised over plain HTTP locally.

use actix_web::cookie::Cookie;

use crate::auth::TokenPair;
use crate::configuration::Environment;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self::new(environment.is_production())
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Cookies carrying a freshly issued pair
    pub fn session_cookies(&self, pair: &TokenPair) -> [Cookie<'static>; 2] {
        [
            self.build(ACCESS_TOKEN_COOKIE, pair.access_token.clone()),
            self.build(REFRESH_TOKEN_COOKIE, pair.refresh_token.clone()),
        ]
    }

    /// Removal cookies for both tokens
    pub fn cleared_cookies(&self) -> [Cookie<'static>; 2] {
        [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE].map(|name| {
            let mut cookie = self.build(name, String::new());
            cookie.make_removal();
            cookie
        })
    }

    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn test_local_cookies_are_http_only_but_not_secure() {
        let policy = CookiePolicy::for_environment(Environment::Local);
        let [access, refresh] = policy.session_cookies(&pair());

        assert_eq!(access.name(), "accessToken");
        assert_eq!(access.value(), "access");
        assert_eq!(refresh.name(), "refreshToken");
        assert_eq!(refresh.value(), "refresh");
        for cookie in [&access, &refresh] {
            assert_eq!(cookie.http_only(), Some(true));
            assert_ne!(cookie.secure(), Some(true));
        }
    }

    #[test]
    fn test_production_cookies_are_secure() {
        let policy = CookiePolicy::for_environment(Environment::Production);
        for cookie in policy.session_cookies(&pair()) {
            assert_eq!(cookie.secure(), Some(true));
            assert_eq!(cookie.http_only(), Some(true));
        }
    }

    #[test]
    fn test_cleared_cookies_expire_immediately() {
        let policy = CookiePolicy::new(true);
        for cookie in policy.cleared_cookies() {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.http_only(), Some(true));
            assert!(cookie.max_age().is_some());
        }
    }
}
