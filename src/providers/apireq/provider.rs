//! Conversions between request-level errors and provider error types

use crate::providers::apireq::{EventStreamError, ReqwestError, ReqwestErrorKind};
use crate::providers::{Error, ErrorKind};

impl From<EventStreamError> for Error {
    fn from(value: EventStreamError) -> Self {
        let kind = match &value {
            EventStreamError::Deserialization { .. }
            | EventStreamError::UnsupportedField(_)
            | EventStreamError::ResponseExceededBuffer => ErrorKind::UnexpectedResponse,
            EventStreamError::StreamFailed(err) => kind_of(err),
        };

        Error::from_source(kind, Box::new(value))
    }
}

impl From<ReqwestError> for Error {
    fn from(value: ReqwestError) -> Self {
        Error::from_source(kind_of(&value), Box::new(value))
    }
}

fn kind_of(err: &ReqwestError) -> ErrorKind {
    match err.kind() {
        ReqwestErrorKind::ConnectFailed => ErrorKind::Connection,
        ReqwestErrorKind::TimedOut => ErrorKind::TimedOut,
        ReqwestErrorKind::DecodingFailed | ReqwestErrorKind::RedirectPolicyViolated => {
            ErrorKind::UnexpectedResponse
        }
        ReqwestErrorKind::BuildFailed => ErrorKind::BadRequest,
        ReqwestErrorKind::Other => ErrorKind::UnspecifiedError,
    }
}
