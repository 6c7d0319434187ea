//! HTTP Basic credentials for Kodi's web server.

use base64::{engine::general_purpose, Engine as _};

/// Builds the `Authorization` header value for `username:password`.
pub fn basic_auth_value(username: &str, password: &str) -> String {
    let token = general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {token}")
}
