use std::{net::TcpStream, time::Duration};

use log::debug;

use crate::{
    ClientConfig,
    config::deadline,
    protocol::{ConsumeResponse, Connection, Response, Stream, build_consume},
};

use super::{ClientError, Operation, Reply, connect, round_trip, unexpected};

/// Reads messages for a consumer group over one dedicated connection.
pub struct Consumer<S: Stream = TcpStream> {
    connection: Connection<S>,
    /// How long the broker may hold a consume request open, in milliseconds.
    timeout: u32,
}

impl Consumer<TcpStream> {
    /// Connect and remember `timeout` as the poll window sent with every consume request.
    ///
    /// A configured read deadline is extended by `timeout` so a broker that waits out the
    /// full window is not reported as a timeout.
    pub fn connect(config: &ClientConfig, timeout: Duration) -> Result<Self, ClientError> {
        let connection = connect(config)?;
        if let Some(read_timeout) = deadline(config.read_timeout) {
            let extended = read_timeout.saturating_add(timeout);
            connection
                .set_read_timeout(Some(extended))
                .map_err(|cause| ClientError::Connect {
                    address: config.address(),
                    cause,
                })?;
            debug!("read deadline extended to {extended:?}");
        }
        Ok(Self::new(connection, timeout))
    }
}

impl<S: Stream> Consumer<S> {
    pub fn new(connection: Connection<S>, timeout: Duration) -> Self {
        Self {
            connection,
            timeout: u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX),
        }
    }

    /// Fetch the messages `consumer_group` has not seen yet.
    ///
    /// An empty topic answers with `success == false` and no messages.
    pub fn consume(
        &mut self,
        topic_name: &str,
        consumer_group: &str,
    ) -> Result<Reply<ConsumeResponse>, ClientError> {
        let frame = build_consume(topic_name, consumer_group, self.timeout);
        match round_trip(&mut self.connection, Operation::Consume, topic_name, frame)? {
            Response::Consume(resp) => Ok(Reply::Answered(resp)),
            Response::Invalid(invalid) => Ok(Reply::Rejected(invalid)),
            other => Err(unexpected(
                Operation::Consume,
                topic_name,
                "ConsumeResponse",
                &other,
            )),
        }
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        self.connection.close().map_err(ClientError::Close)
    }
}
