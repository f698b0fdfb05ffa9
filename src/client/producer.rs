use std::net::TcpStream;

use crate::{
    ClientConfig,
    protocol::{
        Connection, ProduceResponse, Response, Stream, TransportError, build_produce,
        build_produce_batch,
    },
};

use super::{ClientError, Operation, Reply, connect, round_trip, unexpected};

/// Appends messages to topics over one dedicated connection.
pub struct Producer<S: Stream = TcpStream> {
    connection: Connection<S>,
}

impl Producer<TcpStream> {
    pub fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(connect(config)?))
    }
}

impl<S: Stream> Producer<S> {
    pub fn new(connection: Connection<S>) -> Self {
        Self { connection }
    }

    /// Append one message; the timestamp is taken from the local clock.
    pub fn produce(
        &mut self,
        topic_name: &str,
        key: &[u8],
        value: &[u8],
    ) -> Result<Reply<ProduceResponse>, ClientError> {
        let frame = build_produce(topic_name, key, value);
        self.send(topic_name, frame)
    }

    /// Append all `records` in one request. The returned offset is that of the last message.
    ///
    /// A batch too large for a single frame fails before anything is sent and leaves the
    /// connection usable.
    pub fn produce_batch<I, K, V>(
        &mut self,
        topic_name: &str,
        records: I,
    ) -> Result<Reply<ProduceResponse>, ClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let frame = build_produce_batch(topic_name, records);
        self.send(topic_name, frame)
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        self.connection.close().map_err(ClientError::Close)
    }

    fn send(
        &mut self,
        topic_name: &str,
        frame: Result<Vec<u8>, TransportError>,
    ) -> Result<Reply<ProduceResponse>, ClientError> {
        match round_trip(&mut self.connection, Operation::Produce, topic_name, frame)? {
            Response::Produce(resp) => Ok(Reply::Answered(resp)),
            Response::Invalid(invalid) => Ok(Reply::Rejected(invalid)),
            other => Err(unexpected(
                Operation::Produce,
                topic_name,
                "ProduceResponse",
                &other,
            )),
        }
    }
}
