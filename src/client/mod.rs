//! Role wrappers over a single broker connection.
//!
//! Each wrapper owns exactly one [`Connection`] and turns one method call into one
//! request/response exchange: build the request, perform the round trip, and project the
//! fields of the response the caller cares about.
//!
//! - [`Producer`]: append messages to a topic.
//! - [`Consumer`]: read the next messages of a topic for a consumer group.
//! - [`TopicManager`]: create, describe, delete and list topics.
//!
//! Wrappers are not meant to be shared between threads; open one per thread instead; each
//! gets its own TCP connection.
//!
//! # Outcomes
//!
//! A method returns `Err` only for transport, framing and protocol failures. A broker that
//! understood the request but refused it still produces `Ok`: either a response with
//! `success == false`, or [`Reply::Rejected`] when the broker could not parse the envelope.
use std::{fmt, io};

use log::debug;
use thiserror::Error;

use crate::protocol::{Connection, InvalidResponse, Response, Stream, TransportError};

mod consumer;
mod producer;
mod topic;

#[cfg(test)]
pub(crate) mod broker;

pub use consumer::Consumer;
pub use producer::Producer;
pub use topic::{TopicDescription, TopicListing, TopicManager, TopicStatus};

/// Operation a role wrapper was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateTopic,
    DescribeTopic,
    DeleteTopic,
    ListTopics,
    Produce,
    Consume,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateTopic => "create topic",
            Operation::DescribeTopic => "describe topic",
            Operation::DeleteTopic => "delete topic",
            Operation::ListTopics => "list topics",
            Operation::Produce => "produce",
            Operation::Consume => "consume",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {address}: {cause}")]
    Connect {
        address: String,
        #[source]
        cause: io::Error,
    },

    #[error("[{operation}][{topic}]: {cause}")]
    Request {
        operation: Operation,
        topic: String,
        #[source]
        cause: TransportError,
    },

    #[error("[{operation}][{topic}]: expected {expected}, broker answered with {received}")]
    UnexpectedResponse {
        operation: Operation,
        topic: String,
        expected: String,
        received: String,
    },

    #[error("failed to close connection: {0}")]
    Close(#[source] TransportError),
}

impl ClientError {
    /// The transport failure behind this error, if there is one.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ClientError::Request { cause, .. } | ClientError::Close(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Answer of a broker that received the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// The broker answered with the response kind matching the request.
    Answered(T),
    /// The broker could not parse the request envelope.
    Rejected(InvalidResponse),
}

impl<T> Reply<T> {
    pub fn answered(self) -> Option<T> {
        match self {
            Reply::Answered(value) => Some(value),
            Reply::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Reply::Rejected(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Reply<U> {
        match self {
            Reply::Answered(value) => Reply::Answered(f(value)),
            Reply::Rejected(invalid) => Reply::Rejected(invalid),
        }
    }
}

/// Perform one exchange on `connection`, attaching `operation` and `topic` to any failure.
pub(crate) fn round_trip<S: Stream>(
    connection: &mut Connection<S>,
    operation: Operation,
    topic: &str,
    frame: Result<Vec<u8>, TransportError>,
) -> Result<Response, ClientError> {
    let wrap = |cause| ClientError::Request {
        operation,
        topic: topic.to_string(),
        cause,
    };

    let frame = frame.map_err(wrap)?;
    debug!("[{operation}][{topic}] sending {} byte frame", frame.len());
    let resp = connection.request(&frame).map_err(wrap)?;
    debug!("[{operation}][{topic}] received {}", resp.kind());
    Ok(resp)
}

pub(crate) fn unexpected(
    operation: Operation,
    topic: &str,
    expected: &str,
    received: &Response,
) -> ClientError {
    ClientError::UnexpectedResponse {
        operation,
        topic: topic.to_string(),
        expected: expected.to_string(),
        received: received.kind().to_string(),
    }
}

pub(crate) fn connect(config: &crate::ClientConfig) -> Result<Connection, ClientError> {
    Connection::connect(config).map_err(|cause| ClientError::Connect {
        address: config.address(),
        cause,
    })
}
