use std::{
    io::{self, ErrorKind, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::{debug, trace, warn};
use thiserror::Error;

use crate::config::{ClientConfig, deadline};

use super::{
    Response,
    frame::{self, LENGTH_PREFIX_SIZE},
    parse_response,
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("frame payload of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("failed to write frame: {0}")]
    Write(#[source] io::Error),
    #[error("timed out waiting for a response")]
    Timeout,
    #[error("failed to encode envelope: {0}")]
    Serialize(#[from] bincode::error::EncodeError),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] bincode::error::DecodeError),
    #[error("received envelope case {0} where a response was expected")]
    UnknownVariant(String),
    #[error("connection is closed or was abandoned after an earlier failure")]
    Unusable,
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Byte stream a [`Connection`] can own.
pub trait Stream: Read + Write {
    /// Release the underlying resource. Called once by [`Connection::close`].
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            // The peer may already have gone away; the socket is released either way.
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            res => res,
        }
    }
}

/// One long-lived connection to the broker.
///
/// The wire format carries no request identifiers, so only one request may be in
/// flight at a time. [`Connection::request`] takes `&mut self` and performs the whole
/// send-then-receive exchange, which makes interleaving two requests impossible.
///
/// Any failure after the request has been handed to the connection leaves the stream
/// in an unknown framing state; the stream is shut down at once and further requests
/// fail with [`TransportError::Unusable`].
pub struct Connection<S: Stream = TcpStream> {
    stream: Option<S>,
    broken: bool,
}

impl Connection<TcpStream> {
    /// Eagerly open a TCP connection to the configured broker.
    pub fn connect(config: &ClientConfig) -> io::Result<Self> {
        let address = config.address();
        let target = (config.host.as_str(), config.port);
        let stream = match deadline(config.connect_timeout) {
            Some(timeout) => connect_timeout(target, &address, timeout)?,
            None => TcpStream::connect(target)?,
        };
        stream.set_read_timeout(deadline(config.read_timeout))?;
        stream.set_write_timeout(deadline(config.write_timeout))?;
        stream.set_nodelay(true)?;

        debug!("connected to {address}");
        Ok(Self::new(stream))
    }

    /// Replace the read deadline applied to [`Connection::request`].
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match &self.stream {
            Some(stream) => stream.set_read_timeout(deadline(timeout)),
            None => Err(io::Error::new(ErrorKind::NotConnected, "connection closed")),
        }
    }
}

impl<S: Stream> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            broken: false,
        }
    }

    /// Send one framed request and block until its response has been read and parsed.
    pub fn request(&mut self, frame: &[u8]) -> Result<Response, TransportError> {
        if self.broken {
            return Err(TransportError::Unusable);
        }

        let res = self.exchange(frame);
        if let Err(err) = &res {
            warn!("abandoning connection: {err}");
            self.broken = true;
            if let Err(e) = self.close() {
                debug!("failed to shut down abandoned connection: {e}");
            }
        }
        res
    }

    /// Whether [`Connection::request`] may still be called.
    pub fn is_usable(&self) -> bool {
        self.stream.is_some() && !self.broken
    }

    /// Release the stream. Calling this more than once is a no-op.
    pub fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.take() {
            Some(mut stream) => {
                debug!("closing connection");
                stream.shutdown()?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<Response, TransportError> {
        self.send_request(frame)?;
        let payload = self.receive_response()?;
        parse_response(&payload)
    }

    fn send_request(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Unusable)?;
        frame::write_frame(stream, frame)?;
        trace!("sent frame of {} bytes", frame.len());
        Ok(())
    }

    fn receive_response(&mut self) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Unusable)?;
        let payload = frame::read_frame(stream)?;
        trace!(
            "received frame of {} bytes",
            payload.len() + LENGTH_PREFIX_SIZE
        );
        Ok(payload)
    }
}

impl<S: Stream> Drop for Connection<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("failed to shut down connection on drop: {e}");
        }
    }
}

fn connect_timeout(
    target: impl ToSocketAddrs,
    address: &str,
    timeout: Duration,
) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in target.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("'{address}' did not resolve to any address"),
        )
    }))
}
