use super::EventStream;
use futures_util::Stream;
use std::marker::Unpin;

pub(crate) trait ReqwestResponseStreamExt {
    /// Parses the body as a stream of server-sent JSON events.
    fn event_stream(
        self,
    ) -> EventStream<impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin>;
}

impl ReqwestResponseStreamExt for reqwest::Response {
    fn event_stream(
        self,
    ) -> EventStream<impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin> {
        EventStream::new(self.bytes_stream())
    }
}
