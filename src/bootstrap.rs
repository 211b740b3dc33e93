//! One-shot consumption of a `token` query parameter on the landing URL.

use reqwest::Url;
use tracing::info;
use url::form_urlencoded;

use crate::errors::Error;
use crate::navigation::Navigator;
use crate::token::TokenStore;

pub const TOKEN_PARAM: &str = "token";

/// Stores the `token` query parameter (if any) and returns `location` without
/// it, other parameters kept in order. The navigator is asked to show the
/// cleaned URL only when something was stripped.
pub fn consume_token_param(
    location: &str,
    tokens: &TokenStore,
    navigator: &dyn Navigator,
) -> Result<Url, Error> {
    let mut url = Url::parse(location)
        .map_err(|e| Error::Config(format!("Invalid location '{location}': {e}")))?;

    // other parameters are kept as their raw segments so their encoding survives
    let mut token = None;
    let rebuilt = {
        let query = url.query().unwrap_or_default().to_string();
        let mut kept = Vec::new();
        for segment in query.split('&') {
            match form_urlencoded::parse(segment.as_bytes()).next() {
                Some((key, value)) if key == TOKEN_PARAM => {
                    token.get_or_insert_with(|| value.into_owned());
                }
                _ => kept.push(segment),
            }
        }
        kept.join("&")
    };

    let Some(token) = token else {
        return Ok(url);
    };
    url.set_query((!rebuilt.is_empty()).then_some(rebuilt.as_str()));

    if !token.is_empty() {
        tokens.set(Some(token));
    }
    info!(url = %url, "bootstrap.token_consumed");
    navigator.replace_location(&url);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::RecordingNavigator;
    use crate::token::MemoryStorage;

    fn store() -> TokenStore {
        TokenStore::new("subak_access_token", Box::new(MemoryStorage::new()))
    }

    #[test]
    fn strips_token_and_keeps_other_params() {
        let tokens = store();
        let nav = RecordingNavigator::new();
        let url = consume_token_param("https://app/?token=xyz&foo=1", &tokens, &nav).unwrap();
        assert_eq!(tokens.get().as_deref(), Some("xyz"));
        assert_eq!(url.as_str(), "https://app/?foo=1");
        assert_eq!(nav.replaced(), vec![url]);
    }

    #[test]
    fn token_only_query_is_removed_entirely() {
        let tokens = store();
        let nav = RecordingNavigator::new();
        let url = consume_token_param("https://app/lockers?token=abc", &tokens, &nav).unwrap();
        assert_eq!(url.as_str(), "https://app/lockers");
        assert_eq!(tokens.get().as_deref(), Some("abc"));
    }

    #[test]
    fn other_params_keep_their_original_encoding() {
        let tokens = store();
        let nav = RecordingNavigator::new();
        let url = consume_token_param(
            "https://app/search?q=a%20b&token=xyz&flag&name=%ED%95%9C",
            &tokens,
            &nav,
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://app/search?q=a%20b&flag&name=%ED%95%9C");
        assert_eq!(tokens.get().as_deref(), Some("xyz"));
    }

    #[test]
    fn encoded_token_key_is_recognized() {
        let tokens = store();
        let nav = RecordingNavigator::new();
        let url = consume_token_param("https://app/?t%6Fken=a%2Bb&x=1", &tokens, &nav).unwrap();
        assert_eq!(url.as_str(), "https://app/?x=1");
        assert_eq!(tokens.get().as_deref(), Some("a+b"));
    }

    #[test]
    fn untouched_without_token() {
        let tokens = store();
        let nav = RecordingNavigator::new();
        let url = consume_token_param("https://app/?foo=1", &tokens, &nav).unwrap();
        assert_eq!(url.as_str(), "https://app/?foo=1");
        assert_eq!(tokens.get(), None);
        assert!(nav.replaced().is_empty());
    }

    #[test]
    fn rejects_unparseable_location() {
        let tokens = store();
        let nav = RecordingNavigator::new();
        let err = consume_token_param("not a url", &tokens, &nav).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
