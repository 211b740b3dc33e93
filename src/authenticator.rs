//! Header normalization applied to every outgoing request.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::warn;

use crate::request::RequestBody;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Prepares `headers` for dispatch. Pure mutation, no I/O.
///
/// Multipart bodies lose any content-type so the transport can set the
/// boundary; everything else defaults to JSON. A present credential is
/// attached as a bearer token unless an authorization header is already set.
pub fn authenticate(headers: &mut HeaderMap, body: &RequestBody, credential: Option<&str>) {
    if body.is_form() {
        headers.remove(CONTENT_TYPE);
    } else if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }

    if headers.contains_key(AUTHORIZATION) {
        return;
    }
    if let Some(token) = credential {
        match bearer(token) {
            Some(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("credential is not a valid header value; sending unauthenticated"),
        }
    }
}

pub fn bearer(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}
