//! Envelope schema shared by requests and responses.
//!
//! An [`Envelope`] is a closed tagged union: exactly one request or response case is
//! active per message.
//!
//! # Schema evolution
//!
//! Every case, record and union arm is written as an explicit `u32` tag (unions only)
//! followed by a length-delimited body holding its fields in declaration order:
//!
//! ```text
//! +-----------+-------------------+------------------------------------+
//! | tag (u32) | body length (u64) | field 0 | field 1 | ... | field n  |
//! +-----------+-------------------+------------------------------------+
//! ```
//!
//! A reader skips fields it does not know at the end of a body, and fields missing from
//! the end of a body read as their default value. Fields may only be appended, and tags
//! are never reused. An envelope tag this client does not know is reported as
//! [`TransportError::UnknownVariant`].
use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration, Fixint, Limit},
    de::Decoder,
    decode_from_slice,
    enc::Encoder,
    encode_into_std_write, encode_to_vec,
    error::{AllowedEnumVariants, DecodeError, EncodeError},
};

use super::{frame::MAX_PAYLOAD_SIZE, transport::TransportError};

/// Topic name sent with [`TopicOperation::All`], which does not target a single topic.
pub const PLACEHOLDER_TOPIC: &str = "placeholder";

const TAG_SIZE: usize = size_of::<u32>();

type WireConfig = Configuration<BigEndian, Fixint, Limit<MAX_PAYLOAD_SIZE>>;

fn wire_config() -> WireConfig {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
        .with_limit::<MAX_PAYLOAD_SIZE>()
}

/// Collects the fields of one record body.
#[derive(Default)]
struct RecordWriter {
    body: Vec<u8>,
}

impl RecordWriter {
    fn field<T: Encode>(&mut self, value: &T) -> Result<(), EncodeError> {
        encode_into_std_write(value, &mut self.body, wire_config())?;
        Ok(())
    }

    fn finish<E: Encoder>(self, encoder: &mut E) -> Result<(), EncodeError> {
        self.body.encode(encoder)
    }
}

/// Reads the fields of one record body in order.
struct RecordReader {
    body: Vec<u8>,
    pos: usize,
}

impl RecordReader {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let body = <Vec<u8> as Decode<D::Context>>::decode(decoder)?;
        Ok(Self { body, pos: 0 })
    }

    /// Next field, or its default once the body is exhausted.
    fn field<T: Decode<()> + Default>(&mut self) -> Result<T, DecodeError> {
        let rest = &self.body[self.pos..];
        if rest.is_empty() {
            return Ok(T::default());
        }
        let (value, read) = decode_from_slice(rest, wire_config())?;
        self.pos += read;
        Ok(value)
    }
}

/// Declares a struct encoded as a single record body.
macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$field_meta:meta])* pub $field:ident: $ty:ty, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $( $(#[$field_meta])* pub $field: $ty, )*
        }

        impl Encode for $name {
            fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
                let mut body = RecordWriter::default();
                $( body.field(&self.$field)?; )*
                body.finish(encoder)
            }
        }

        impl<Context> Decode<Context> for $name {
            fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
                let mut body = RecordReader::decode(decoder)?;
                Ok(Self {
                    $( $field: body.field()?, )*
                })
            }
        }
    };
}

record! {
    /// A single record as stored by the broker.
    pub struct Message {
        pub key: Vec<u8>,
        pub value: Vec<u8>,
        /// Wall-clock milliseconds since the unix epoch, assigned when the request was built.
        pub timestamp: u64,
    }
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode, PartialEq, Eq)]
pub enum TopicOperation {
    #[default]
    Describe,
    Create,
    Delete,
    All,
}

record! {
    pub struct TopicRequest {
        pub topic_name: String,
        pub operation: TopicOperation,
    }
}

record! {
    pub struct ProduceRequest {
        pub topic_name: String,
        pub messages: Vec<Message>,
    }
}

record! {
    pub struct ConsumeRequest {
        pub topic_name: String,
        pub consumer_group: String,
        /// How long the broker may wait for new messages, in milliseconds.
        pub timeout: u32,
    }
}

record! {
    pub struct TopicSummary {
        pub topic_name: String,
        pub consumer_groups: Vec<String>,
    }
}

/// Operation specific part of a [`TopicResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicDetails {
    Describe {
        max_segment_bytes: u64,
        max_retention_bytes: u64,
        consumer_groups: Vec<String>,
    },
    Create,
    Delete,
    All {
        topics: Vec<TopicSummary>,
    },
}

impl TopicDetails {
    pub fn operation(&self) -> TopicOperation {
        match self {
            TopicDetails::Describe { .. } => TopicOperation::Describe,
            TopicDetails::Create => TopicOperation::Create,
            TopicDetails::Delete => TopicOperation::Delete,
            TopicDetails::All { .. } => TopicOperation::All,
        }
    }
}

/// The first arm with every field at its default, as an empty body decodes.
impl Default for TopicDetails {
    fn default() -> Self {
        TopicDetails::Describe {
            max_segment_bytes: 0,
            max_retention_bytes: 0,
            consumer_groups: Vec::new(),
        }
    }
}

impl Encode for TopicDetails {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let mut body = RecordWriter::default();
        let tag: u32 = match self {
            TopicDetails::Describe {
                max_segment_bytes,
                max_retention_bytes,
                consumer_groups,
            } => {
                body.field(max_segment_bytes)?;
                body.field(max_retention_bytes)?;
                body.field(consumer_groups)?;
                0
            }
            TopicDetails::Create => 1,
            TopicDetails::Delete => 2,
            TopicDetails::All { topics } => {
                body.field(topics)?;
                3
            }
        };
        tag.encode(encoder)?;
        body.finish(encoder)
    }
}

impl<Context> Decode<Context> for TopicDetails {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let tag = <u32 as Decode<Context>>::decode(decoder)?;
        let mut body = RecordReader::decode(decoder)?;
        match tag {
            0 => Ok(TopicDetails::Describe {
                max_segment_bytes: body.field()?,
                max_retention_bytes: body.field()?,
                consumer_groups: body.field()?,
            }),
            1 => Ok(TopicDetails::Create),
            2 => Ok(TopicDetails::Delete),
            3 => Ok(TopicDetails::All {
                topics: body.field()?,
            }),
            found => Err(DecodeError::UnexpectedVariant {
                type_name: "TopicDetails",
                allowed: &AllowedEnumVariants::Range { min: 0, max: 3 },
                found,
            }),
        }
    }
}

record! {
    pub struct TopicResponse {
        pub success: bool,
        pub topic_name: String,
        pub details: TopicDetails,
    }
}

record! {
    pub struct ProduceResponse {
        pub success: bool,
        pub topic_name: String,
        /// Offset of the last message written.
        pub offset: u64,
        pub error_message: Option<String>,
    }
}

record! {
    pub struct ConsumeResponse {
        pub success: bool,
        pub topic_name: String,
        pub messages: Vec<Message>,
        pub error_message: Option<String>,
    }
}

record! {
    /// Sent by the broker when it could not make sense of the incoming envelope.
    pub struct InvalidResponse {
        pub error_message: String,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    TopicRequest(TopicRequest),
    ProduceRequest(ProduceRequest),
    ConsumeRequest(ConsumeRequest),
    TopicResponse(TopicResponse),
    ProduceResponse(ProduceResponse),
    ConsumeResponse(ConsumeResponse),
    InvalidResponse(InvalidResponse),
}

impl Envelope {
    const TOPIC_REQUEST: u32 = 0;
    const PRODUCE_REQUEST: u32 = 1;
    const CONSUME_REQUEST: u32 = 2;
    const TOPIC_RESPONSE: u32 = 3;
    const PRODUCE_RESPONSE: u32 = 4;
    const CONSUME_RESPONSE: u32 = 5;
    const INVALID_RESPONSE: u32 = 6;

    /// Name of the active case, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::TopicRequest(_) => "TopicRequest",
            Envelope::ProduceRequest(_) => "ProduceRequest",
            Envelope::ConsumeRequest(_) => "ConsumeRequest",
            Envelope::TopicResponse(_) => "TopicResponse",
            Envelope::ProduceResponse(_) => "ProduceResponse",
            Envelope::ConsumeResponse(_) => "ConsumeResponse",
            Envelope::InvalidResponse(_) => "InvalidResponse",
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransportError> {
        let bytes = match self {
            Envelope::TopicRequest(case) => encode_case(Self::TOPIC_REQUEST, case)?,
            Envelope::ProduceRequest(case) => encode_case(Self::PRODUCE_REQUEST, case)?,
            Envelope::ConsumeRequest(case) => encode_case(Self::CONSUME_REQUEST, case)?,
            Envelope::TopicResponse(case) => encode_case(Self::TOPIC_RESPONSE, case)?,
            Envelope::ProduceResponse(case) => encode_case(Self::PRODUCE_RESPONSE, case)?,
            Envelope::ConsumeResponse(case) => encode_case(Self::CONSUME_RESPONSE, case)?,
            Envelope::InvalidResponse(case) => encode_case(Self::INVALID_RESPONSE, case)?,
        };
        Ok(bytes)
    }

    /// Decode an envelope that must span all of `bytes`.
    ///
    /// A well-formed envelope whose tag is unknown fails with
    /// [`TransportError::UnknownVariant`]; anything structurally broken is
    /// [`TransportError::MalformedEnvelope`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransportError> {
        let ((tag, body), read): ((u32, Vec<u8>), usize) =
            decode_from_slice(bytes, wire_config())?;
        if read != bytes.len() {
            return Err(DecodeError::Other("trailing bytes after envelope").into());
        }

        let case = &bytes[TAG_SIZE..];
        let envelope = match tag {
            Self::TOPIC_REQUEST => Envelope::TopicRequest(decode_case(case)?),
            Self::PRODUCE_REQUEST => Envelope::ProduceRequest(decode_case(case)?),
            Self::CONSUME_REQUEST => Envelope::ConsumeRequest(decode_case(case)?),
            Self::TOPIC_RESPONSE => Envelope::TopicResponse(decode_case(case)?),
            Self::PRODUCE_RESPONSE => Envelope::ProduceResponse(decode_case(case)?),
            Self::CONSUME_RESPONSE => Envelope::ConsumeResponse(decode_case(case)?),
            Self::INVALID_RESPONSE => Envelope::InvalidResponse(decode_case(case)?),
            found => {
                return Err(TransportError::UnknownVariant(format!(
                    "tag {found} ({} byte body)",
                    body.len()
                )));
            }
        };
        Ok(envelope)
    }
}

fn encode_case<T: Encode>(tag: u32, case: &T) -> Result<Vec<u8>, EncodeError> {
    encode_to_vec((tag, case), wire_config())
}

fn decode_case<T: Decode<()>>(bytes: &[u8]) -> Result<T, DecodeError> {
    let (case, _) = decode_from_slice(bytes, wire_config())?;
    Ok(case)
}
