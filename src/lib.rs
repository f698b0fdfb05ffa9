pub mod cli;
pub mod client;
pub mod config;
pub mod protocol;

pub use client::{ClientError, Consumer, Operation, Producer, Reply, TopicManager};
pub use config::ClientConfig;
pub use protocol::{Connection, Envelope, Response, TransportError};
