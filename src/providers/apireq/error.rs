//! Wrapper around Reqwest's error type that classifies the failure up front so callers
//! can match on it exhaustively.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    ConnectFailed,
    TimedOut,
    DecodingFailed,
    BuildFailed,
    RedirectPolicyViolated,
    Other,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: reqwest::Error,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // A timed out connect attempt reports both flags, timeouts win
        let kind = if err.is_timeout() {
            ErrorKind::TimedOut
        } else if err.is_connect() {
            ErrorKind::ConnectFailed
        } else if err.is_decode() {
            ErrorKind::DecodingFailed
        } else if err.is_builder() {
            ErrorKind::BuildFailed
        } else if err.is_redirect() {
            ErrorKind::RedirectPolicyViolated
        } else {
            ErrorKind::Other
        };

        Error { kind, source: err }
    }
}

impl Error {
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            ErrorKind::ConnectFailed => "connection failed",
            ErrorKind::TimedOut => "timed out",
            ErrorKind::DecodingFailed => "decoding failed",
            ErrorKind::BuildFailed => "invalid request",
            ErrorKind::RedirectPolicyViolated => "redirect policy violated",
            ErrorKind::Other => "request failed",
        };

        match self.source.url() {
            Some(url) => write!(f, "{} ({})", what, url),
            None => write!(f, "{}", what),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}
