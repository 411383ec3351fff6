use std::time::Duration;

use crate::config::Config;

pub const ACCESS_COOKIE_NAME: &str = "access_token";
pub const ACCESS_COOKIE_PATH: &str = "/";

/// `Set-Cookie` value carrying a freshly issued access token.
pub fn access_cookie(token: &str, config: &Config) -> String {
    let max_age = Duration::from_secs(config.jwt_expiration_hours * 60 * 60);
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax",
        ACCESS_COOKIE_NAME,
        token,
        ACCESS_COOKIE_PATH,
        max_age.as_secs()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the access token.
pub fn clear_access_cookie(config: &Config) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; HttpOnly; SameSite=Lax",
        ACCESS_COOKIE_NAME, ACCESS_COOKIE_PATH
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
