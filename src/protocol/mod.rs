//! Client side of the LucidMQ wire protocol.
//!
//! This module defines how requests for the broker are built, framed, written to a single
//! TCP connection, and how the broker's answer is read back and interpreted. It is the only
//! place that knows about bytes on the wire; the role wrappers in [`client`](crate::client)
//! sit on top of it and deal in typed values only.
//!
//! # Overview
//!
//! A request travels through the layers below in order, and its response comes back the
//! same way in reverse:
//!
//! 1. A request builder ([`build_topic_create`], [`build_produce`], ...) constructs the
//!    request case of an [`Envelope`], serializes it and frames it.
//! 2. [`Connection::request`] writes the frame and blocks until one response frame is read.
//! 3. [`parse_response`] decodes the payload and hands back the active [`Response`] case.
//!
//! # Key Components
//!
//! - [`Envelope`]: Closed tagged union carrying exactly one request or response.
//! - [`Connection`]: Owns one stream and allows a single outstanding request at a time.
//! - [`TransportError`]: Every way a framing, encoding or I/O step can fail.
//!
//! # Binary Format
//!
//! - Each frame begins with a 2-byte little-endian payload length, so a payload is at most
//!   [`MAX_PAYLOAD_SIZE`] bytes.
//! - The payload is the envelope encoded with `bincode`, using big-endian fixed-width
//!   integers. Each case carries an explicit `u32` tag and a length-delimited body, so
//!   fields can be appended without breaking older peers (see [`Envelope`]).
//!
//! There are no request identifiers and no server-initiated messages: responses are matched
//! to requests purely by order.
//!
//! # See Also
//!
//! - [`client`](crate::client): Producer, consumer and topic manager wrappers.
mod envelope;
mod frame;
mod request;
mod response;
mod transport;

pub use envelope::{
    ConsumeRequest, ConsumeResponse, Envelope, InvalidResponse, Message, PLACEHOLDER_TOPIC,
    ProduceRequest, ProduceResponse, TopicDetails, TopicOperation, TopicRequest, TopicResponse,
    TopicSummary,
};
pub use frame::{MAX_PAYLOAD_SIZE, encode_frame, read_frame, write_frame};
pub use request::{
    build_consume, build_produce, build_produce_batch, build_topic_create, build_topic_delete,
    build_topic_describe, build_topic_list_all,
};
pub use response::{Response, parse_response};

#[cfg(test)]
pub(crate) use request::now_millis;
pub use transport::{Connection, Stream, TransportError};
