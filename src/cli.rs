//! CLI utilities for LucidMQ.
//!
//! Argument definitions and output rendering for the `lucidmq` binary. Each invocation opens
//! one role wrapper, performs a single operation and prints the projected response.
use std::{fmt::Write, time::Duration};

use clap::{Parser, Subcommand};

use crate::{
    ClientConfig, ClientError, Consumer, Producer, Reply, TopicManager,
    client::{TopicDescription, TopicListing, TopicStatus},
    protocol::{ConsumeResponse, InvalidResponse, ProduceResponse},
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Broker host name or IP address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Broker port
    #[arg(long, default_value_t = 6969)]
    pub port: u16,
    /// Give up on a response after this many milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout_ms: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.host.clone(), self.port);
        match self.read_timeout_ms {
            Some(ms) => config.with_read_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create, describe, delete or list topics
    #[command(subcommand)]
    Topic(TopicCommand),
    /// Append one message to a topic
    Produce {
        topic: String,
        key: String,
        value: String,
    },
    /// Read the messages a consumer group has not seen yet
    Consume {
        topic: String,
        group: String,
        /// How long the broker may wait for new messages
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum TopicCommand {
    Create { name: String },
    Describe { name: String },
    Delete { name: String },
    /// List every topic with its consumer groups
    List,
}

/// Run `command` against the broker described by `config` and render the answer.
pub fn execute(command: &Command, config: &ClientConfig) -> Result<String, ClientError> {
    match command {
        Command::Topic(topic) => {
            let mut manager = TopicManager::connect(config)?;
            let out = match topic {
                TopicCommand::Create { name } => {
                    render(manager.create_topic(name)?, |s| render_status("Create", s))
                }
                TopicCommand::Describe { name } => {
                    render(manager.describe_topic(name)?, render_description)
                }
                TopicCommand::Delete { name } => {
                    render(manager.delete_topic(name)?, |s| render_status("Delete", s))
                }
                TopicCommand::List => render(manager.all_topics()?, render_listing),
            };
            manager.close()?;
            Ok(out)
        }
        Command::Produce { topic, key, value } => {
            let mut producer = Producer::connect(config)?;
            let out = render(
                producer.produce(topic, key.as_bytes(), value.as_bytes())?,
                render_produce,
            );
            producer.close()?;
            Ok(out)
        }
        Command::Consume {
            topic,
            group,
            timeout_ms,
        } => {
            let mut consumer = Consumer::connect(config, Duration::from_millis(*timeout_ms))?;
            let out = render(consumer.consume(topic, group)?, render_consume);
            consumer.close()?;
            Ok(out)
        }
    }
}

fn render<T>(reply: Reply<T>, f: impl FnOnce(&T) -> String) -> String {
    match reply {
        Reply::Answered(value) => f(&value),
        Reply::Rejected(invalid) => render_invalid(&invalid),
    }
}

fn render_status(action: &str, status: &TopicStatus) -> String {
    format!(
        "Topic {action} Response ------------\nTopic Name: {}\nStatus: {}\n",
        status.topic_name, status.success
    )
}

fn render_description(description: &TopicDescription) -> String {
    format!(
        "Topic Describe Response ------------\nTopic Name: {}\nStatus: {}\n\
         Max segment bytes: {}, max retention bytes: {}, consumer groups: {:?}\n",
        description.topic_name,
        description.success,
        description.max_segment_bytes,
        description.max_retention_bytes,
        description.consumer_groups
    )
}

fn render_listing(listing: &TopicListing) -> String {
    let mut s = format!(
        "Topic List Response ------------\nStatus: {}\n",
        listing.success
    );
    for topic in &listing.topics {
        let _ = writeln!(
            s,
            "Topic Name: {}, consumer groups: {:?}",
            topic.topic_name, topic.consumer_groups
        );
    }
    s
}

fn render_produce(resp: &ProduceResponse) -> String {
    let mut s = format!(
        "Produce Response ------------\nTopic Name: {}\nStatus: {}\nLast offset: {}\n",
        resp.topic_name, resp.success, resp.offset
    );
    if let Some(err) = &resp.error_message {
        let _ = writeln!(s, "Error: {err}");
    }
    s
}

fn render_consume(resp: &ConsumeResponse) -> String {
    let mut s = format!(
        "Consume Response ------------\nTopic Name: {}\nStatus: {}\n",
        resp.topic_name, resp.success
    );
    for msg in &resp.messages {
        let _ = writeln!(
            s,
            "Key: {}, Value: {}, Timestamp: {}",
            String::from_utf8_lossy(&msg.key),
            String::from_utf8_lossy(&msg.value),
            msg.timestamp
        );
    }
    if let Some(err) = &resp.error_message {
        let _ = writeln!(s, "Error: {err}");
    }
    s
}

fn render_invalid(invalid: &InvalidResponse) -> String {
    format!(
        "Invalid Response ------------\nError: {}\n",
        invalid.error_message
    )
}
