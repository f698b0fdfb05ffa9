use std::net::TcpStream;

use crate::{
    ClientConfig,
    protocol::{
        Connection, PLACEHOLDER_TOPIC, Response, Stream, TopicDetails, TopicResponse, TopicSummary,
        TransportError, build_topic_create, build_topic_delete, build_topic_describe,
        build_topic_list_all,
    },
};

use super::{ClientError, Operation, Reply, connect, round_trip, unexpected};

/// Outcome of a topic create or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStatus {
    pub success: bool,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub success: bool,
    pub topic_name: String,
    pub max_segment_bytes: u64,
    pub max_retention_bytes: u64,
    pub consumer_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListing {
    pub success: bool,
    pub topics: Vec<TopicSummary>,
}

/// Administers topics over one dedicated connection.
pub struct TopicManager<S: Stream = TcpStream> {
    connection: Connection<S>,
}

impl TopicManager<TcpStream> {
    pub fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(connect(config)?))
    }
}

impl<S: Stream> TopicManager<S> {
    pub fn new(connection: Connection<S>) -> Self {
        Self { connection }
    }

    /// `success` is false if the topic already exists.
    pub fn create_topic(&mut self, topic_name: &str) -> Result<Reply<TopicStatus>, ClientError> {
        let frame = build_topic_create(topic_name);
        self.send(Operation::CreateTopic, topic_name, frame, |resp| {
            (resp.details == TopicDetails::Create).then(|| status(resp))
        })
    }

    /// `success` is false if there was no such topic.
    pub fn delete_topic(&mut self, topic_name: &str) -> Result<Reply<TopicStatus>, ClientError> {
        let frame = build_topic_delete(topic_name);
        self.send(Operation::DeleteTopic, topic_name, frame, |resp| {
            (resp.details == TopicDetails::Delete).then(|| status(resp))
        })
    }

    pub fn describe_topic(
        &mut self,
        topic_name: &str,
    ) -> Result<Reply<TopicDescription>, ClientError> {
        let frame = build_topic_describe(topic_name);
        self.send(Operation::DescribeTopic, topic_name, frame, |resp| {
            match resp.details {
                TopicDetails::Describe {
                    max_segment_bytes,
                    max_retention_bytes,
                    consumer_groups,
                } => Some(TopicDescription {
                    success: resp.success,
                    topic_name: resp.topic_name,
                    max_segment_bytes,
                    max_retention_bytes,
                    consumer_groups,
                }),
                _ => None,
            }
        })
    }

    pub fn all_topics(&mut self) -> Result<Reply<TopicListing>, ClientError> {
        let frame = build_topic_list_all();
        self.send(Operation::ListTopics, PLACEHOLDER_TOPIC, frame, |resp| {
            match resp.details {
                TopicDetails::All { topics } => Some(TopicListing {
                    success: resp.success,
                    topics,
                }),
                _ => None,
            }
        })
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        self.connection.close().map_err(ClientError::Close)
    }

    /// Round trip that only accepts a topic response `project` recognises as an answer
    /// to `operation`.
    fn send<T>(
        &mut self,
        operation: Operation,
        topic_name: &str,
        frame: Result<Vec<u8>, TransportError>,
        project: impl FnOnce(TopicResponse) -> Option<T>,
    ) -> Result<Reply<T>, ClientError> {
        match round_trip(&mut self.connection, operation, topic_name, frame)? {
            Response::Topic(resp) => {
                let received = resp.details.operation();
                project(resp).map(Reply::Answered).ok_or_else(|| {
                    ClientError::UnexpectedResponse {
                        operation,
                        topic: topic_name.to_string(),
                        expected: format!("TopicResponse for {operation}"),
                        received: format!("TopicResponse({received:?})"),
                    }
                })
            }
            Response::Invalid(invalid) => Ok(Reply::Rejected(invalid)),
            other => Err(unexpected(operation, topic_name, "TopicResponse", &other)),
        }
    }
}

fn status(resp: TopicResponse) -> TopicStatus {
    TopicStatus {
        success: resp.success,
        topic_name: resp.topic_name,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        client::{
            Consumer, Producer,
            broker::{Canned, FakeBroker},
        },
        protocol::{Envelope, ProduceResponse},
    };

    fn manager() -> (FakeBroker, TopicManager) {
        let broker = FakeBroker::spawn();
        let manager = TopicManager::connect(&broker.config()).unwrap();
        (broker, manager)
    }

    #[test]
    fn create_then_delete_topic() {
        let (_broker, mut topics) = manager();

        assert!(topics.create_topic("t1").unwrap().answered().unwrap().success);

        let deleted = topics.delete_topic("t1").unwrap().answered().unwrap();
        assert_eq!(
            deleted,
            TopicStatus {
                success: true,
                topic_name: "t1".to_string()
            }
        );

        let missing = topics.delete_topic("t1").unwrap().answered().unwrap();
        assert!(!missing.success);
    }

    #[test]
    fn describe_topic_lists_consumer_groups() {
        let (broker, mut topics) = manager();
        topics.create_topic("t1").unwrap();
        let mut consumer = Consumer::connect(&broker.config(), Duration::ZERO).unwrap();
        consumer.consume("t1", "g2").unwrap();
        consumer.consume("t1", "g1").unwrap();

        let description = topics.describe_topic("t1").unwrap().answered().unwrap();
        assert!(description.success);
        assert_eq!(description.topic_name, "t1");
        assert!(description.max_segment_bytes > 0);
        assert!(description.max_retention_bytes > 0);
        assert_eq!(description.consumer_groups, vec!["g1", "g2"]);
    }

    #[test]
    fn describe_missing_topic() {
        let (_broker, mut topics) = manager();

        let description = topics.describe_topic("nope").unwrap().answered().unwrap();
        assert!(!description.success);
        assert!(description.consumer_groups.is_empty());
    }

    #[test]
    fn all_topics_lists_every_topic() {
        let (broker, mut topics) = manager();
        topics.create_topic("b").unwrap();
        topics.create_topic("a").unwrap();
        Producer::connect(&broker.config())
            .unwrap()
            .produce("a", b"k", b"v")
            .unwrap();

        let listing = topics.all_topics().unwrap().answered().unwrap();
        assert!(listing.success);
        let names: Vec<&str> = listing
            .topics
            .iter()
            .map(|t| t.topic_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn empty_topic_name_is_rejected() {
        let (_broker, mut topics) = manager();

        let reply = topics.create_topic("").unwrap();
        match reply {
            Reply::Rejected(invalid) => assert!(!invalid.error_message.is_empty()),
            other => panic!("expected rejection, got {other:?}"),
        }

        // A rejection is an answer; the connection stays in sync.
        assert!(topics.create_topic("t1").unwrap().answered().unwrap().success);
    }

    #[test]
    fn describe_answered_with_create_details() {
        let canned = Canned::new(Envelope::TopicResponse(TopicResponse {
            success: true,
            topic_name: "t1".to_string(),
            details: TopicDetails::Create,
        }));
        let mut topics = TopicManager::new(Connection::new(canned));

        let err = topics.describe_topic("t1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "[describe topic][t1]: expected TopicResponse for describe topic, \
             broker answered with TopicResponse(Create)"
        );
    }

    #[test]
    fn list_answered_with_produce_response() {
        let canned = Canned::new(Envelope::ProduceResponse(ProduceResponse {
            success: true,
            topic_name: "t1".to_string(),
            offset: 0,
            error_message: None,
        }));
        let mut topics = TopicManager::new(Connection::new(canned));

        let err = topics.all_topics().unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedResponse {
                operation: Operation::ListTopics,
                ..
            }
        ));
    }
}
