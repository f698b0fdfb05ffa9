//! In-process broker double used to exercise the role wrappers over real sockets.
use std::{
    collections::{BTreeMap, HashMap},
    io::{self, Cursor, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

use log::{info, warn};

use crate::{
    ClientConfig,
    protocol::{
        ConsumeRequest, ConsumeResponse, Envelope, InvalidResponse, Message, ProduceRequest,
        ProduceResponse, Stream, TopicDetails, TopicOperation, TopicRequest, TopicResponse,
        TopicSummary, TransportError, encode_frame, read_frame, write_frame,
    },
};

const MAX_SEGMENT_BYTES: u64 = 1024;
const MAX_RETENTION_BYTES: u64 = 4096;

#[derive(Default)]
struct Topic {
    messages: Vec<Message>,
    /// Next offset to hand out, per consumer group.
    groups: HashMap<String, usize>,
}

type Topics = Arc<Mutex<BTreeMap<String, Topic>>>;

pub(crate) struct FakeBroker {
    address: SocketAddr,
}

impl FakeBroker {
    /// Listen on an ephemeral local port and serve every connection on its own thread.
    pub(crate) fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let topics: Topics = Arc::default();

        thread::spawn(move || {
            info!("listening at {address}");
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let handle = Arc::clone(&topics);
                        thread::spawn(move || {
                            if let Err(e) = handle_connection(stream, handle) {
                                warn!("connection failed: {e}");
                            }
                        });
                    }
                    Err(e) => warn!("broken connection: {e:?}"),
                }
            }
        });

        Self { address }
    }

    pub(crate) fn config(&self) -> ClientConfig {
        ClientConfig::new(self.address.ip().to_string(), self.address.port())
    }
}

/// Stream that replays one canned response and discards writes.
pub(crate) struct Canned(Cursor<Vec<u8>>);

impl Canned {
    pub(crate) fn new(envelope: Envelope) -> Self {
        Self(Cursor::new(encode_frame(&envelope.to_bytes().unwrap()).unwrap()))
    }

    /// A peer that hangs up without answering.
    pub(crate) fn empty() -> Self {
        Self(Cursor::new(vec![]))
    }
}

impl Read for Canned {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for Canned {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for Canned {}

fn handle_connection(mut stream: TcpStream, topics: Topics) -> Result<(), TransportError> {
    loop {
        let payload = match read_frame(&mut stream) {
            Ok(payload) => payload,
            Err(TransportError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        let resp = match Envelope::from_bytes(&payload) {
            Ok(Envelope::TopicRequest(req)) => handle_topic(&topics, req),
            Ok(Envelope::ProduceRequest(req)) => handle_produce(&topics, req),
            Ok(Envelope::ConsumeRequest(req)) => handle_consume(&topics, req),
            Ok(other) => invalid(format!("{} is not a request", other.kind())),
            Err(e) => invalid(e.to_string()),
        };

        write_frame(&mut stream, &encode_frame(&resp.to_bytes()?)?)?;
    }
}

fn invalid(error_message: String) -> Envelope {
    Envelope::InvalidResponse(InvalidResponse { error_message })
}

fn handle_topic(topics: &Topics, req: TopicRequest) -> Envelope {
    if req.topic_name.is_empty() {
        return invalid("topic name must not be empty".to_string());
    }

    let mut topics = topics.lock().unwrap();
    let name = req.topic_name;
    let (success, details) = match req.operation {
        TopicOperation::Create => {
            let created = !topics.contains_key(&name);
            if created {
                topics.insert(name.clone(), Topic::default());
            }
            (created, TopicDetails::Create)
        }
        TopicOperation::Delete => (topics.remove(&name).is_some(), TopicDetails::Delete),
        TopicOperation::Describe => match topics.get(&name) {
            Some(topic) => (
                true,
                TopicDetails::Describe {
                    max_segment_bytes: MAX_SEGMENT_BYTES,
                    max_retention_bytes: MAX_RETENTION_BYTES,
                    consumer_groups: consumer_groups(topic),
                },
            ),
            None => (
                false,
                TopicDetails::Describe {
                    max_segment_bytes: 0,
                    max_retention_bytes: 0,
                    consumer_groups: vec![],
                },
            ),
        },
        TopicOperation::All => (
            true,
            TopicDetails::All {
                topics: topics
                    .iter()
                    .map(|(name, topic)| TopicSummary {
                        topic_name: name.clone(),
                        consumer_groups: consumer_groups(topic),
                    })
                    .collect(),
            },
        ),
    };

    Envelope::TopicResponse(TopicResponse {
        success,
        topic_name: name,
        details,
    })
}

fn consumer_groups(topic: &Topic) -> Vec<String> {
    let mut groups: Vec<String> = topic.groups.keys().cloned().collect();
    groups.sort();
    groups
}

fn handle_produce(topics: &Topics, req: ProduceRequest) -> Envelope {
    let mut topics = topics.lock().unwrap();
    let resp = match topics.get_mut(&req.topic_name) {
        Some(topic) if !req.messages.is_empty() => {
            topic.messages.extend(req.messages);
            ProduceResponse {
                success: true,
                topic_name: req.topic_name,
                offset: (topic.messages.len() - 1) as u64,
                error_message: None,
            }
        }
        Some(_) => ProduceResponse {
            success: false,
            topic_name: req.topic_name,
            offset: 0,
            error_message: Some("no messages to produce".to_string()),
        },
        None => ProduceResponse {
            success: false,
            topic_name: req.topic_name,
            offset: 0,
            error_message: Some("topic does not exist".to_string()),
        },
    };
    Envelope::ProduceResponse(resp)
}

fn handle_consume(topics: &Topics, req: ConsumeRequest) -> Envelope {
    let mut topics = topics.lock().unwrap();
    let resp = match topics.get_mut(&req.topic_name) {
        Some(topic) => {
            let start = topic.groups.entry(req.consumer_group).or_default();
            let messages = topic.messages[*start..].to_vec();
            *start = topic.messages.len();
            ConsumeResponse {
                success: !messages.is_empty(),
                topic_name: req.topic_name,
                messages,
                error_message: None,
            }
        }
        None => ConsumeResponse {
            success: false,
            topic_name: req.topic_name,
            messages: vec![],
            error_message: Some("topic does not exist".to_string()),
        },
    };
    Envelope::ConsumeResponse(resp)
}
