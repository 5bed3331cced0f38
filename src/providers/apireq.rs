//! A utility module with helpers for making and parsing API requests.

mod error;
mod event_stream;
mod provider;
mod stream_ext;

use std::time::Duration;

pub(crate) use error::Error as ReqwestError;
pub(crate) use error::ErrorKind as ReqwestErrorKind;
pub(crate) use event_stream::Error as EventStreamError;
pub(crate) use event_stream::EventStream;
pub(crate) use reqwest::Url;
pub(crate) use stream_ext::ReqwestResponseStreamExt;

/// Builds a client whose requests give up after `timeout`.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ReqwestError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Appends `path` to the API base. Unlike [`Url::join`], the path of the base is kept,
/// so `http://localhost:1234/v1` and `models` give `http://localhost:1234/v1/models`.
pub(crate) fn endpoint(api_base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = api_base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');

    Url::parse(&format!("{}/{}", base, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("http://localhost:1234/v1").unwrap();
        assert_eq!(
            endpoint(&base, "models").unwrap().as_str(),
            "http://localhost:1234/v1/models"
        );

        let base = Url::parse("http://localhost:11434/").unwrap();
        assert_eq!(
            endpoint(&base, "/api/tags").unwrap().as_str(),
            "http://localhost:11434/api/tags"
        );
    }
}
