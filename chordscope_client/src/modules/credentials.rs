use crate::modules::store::{KeyValueStore, StoreError, ACCESS_TOKEN_KEY};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::{debug, warn};

/// Adds `Authorization: Bearer <token>` when a token is present.
///
/// An absent or empty token leaves the request untouched; the server decides
/// whether the endpoint needs authentication.
pub fn attach_bearer(mut request: Request, token: Option<&str>) -> Request {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        debug!(url = %request.url(), "no access token stored; sending without authorization");
        return request;
    };

    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(_) => {
            warn!(url = %request.url(), "stored token is not a valid header value; sending without authorization");
        }
    }
    request
}

pub fn stored_access_token(store: &dyn KeyValueStore) -> Result<Option<String>, StoreError> {
    Ok(store.get(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty()))
}
