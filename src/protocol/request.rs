use std::time::{SystemTime, UNIX_EPOCH};

use super::{
    envelope::{
        ConsumeRequest, Envelope, Message, PLACEHOLDER_TOPIC, ProduceRequest, TopicOperation,
        TopicRequest,
    },
    frame::encode_frame,
    transport::TransportError,
};

pub fn build_topic_describe(topic_name: &str) -> Result<Vec<u8>, TransportError> {
    topic_request(topic_name, TopicOperation::Describe)
}

pub fn build_topic_create(topic_name: &str) -> Result<Vec<u8>, TransportError> {
    topic_request(topic_name, TopicOperation::Create)
}

pub fn build_topic_delete(topic_name: &str) -> Result<Vec<u8>, TransportError> {
    topic_request(topic_name, TopicOperation::Delete)
}

pub fn build_topic_list_all() -> Result<Vec<u8>, TransportError> {
    topic_request(PLACEHOLDER_TOPIC, TopicOperation::All)
}

/// Frame a single message produce request, stamped with the current wall-clock time.
pub fn build_produce(
    topic_name: &str,
    key: &[u8],
    value: &[u8],
) -> Result<Vec<u8>, TransportError> {
    build_produce_batch(topic_name, [(key, value)])
}

/// Frame a produce request carrying every `(key, value)` pair in order.
///
/// Each message is stamped as it is added, so timestamps within a batch never decrease.
/// Fails with [`TransportError::FrameTooLarge`] if the batch does not fit in one frame.
pub fn build_produce_batch<I, K, V>(
    topic_name: &str,
    records: I,
) -> Result<Vec<u8>, TransportError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let messages = records
        .into_iter()
        .map(|(key, value)| Message {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
            timestamp: now_millis(),
        })
        .collect();

    frame(Envelope::ProduceRequest(ProduceRequest {
        topic_name: topic_name.to_string(),
        messages,
    }))
}

pub fn build_consume(
    topic_name: &str,
    consumer_group: &str,
    timeout: u32,
) -> Result<Vec<u8>, TransportError> {
    frame(Envelope::ConsumeRequest(ConsumeRequest {
        topic_name: topic_name.to_string(),
        consumer_group: consumer_group.to_string(),
        timeout,
    }))
}

fn topic_request(topic_name: &str, operation: TopicOperation) -> Result<Vec<u8>, TransportError> {
    frame(Envelope::TopicRequest(TopicRequest {
        topic_name: topic_name.to_string(),
        operation,
    }))
}

fn frame(envelope: Envelope) -> Result<Vec<u8>, TransportError> {
    encode_frame(&envelope.to_bytes()?)
}

/// Milliseconds since the unix epoch; a clock set before the epoch reads as 0.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
