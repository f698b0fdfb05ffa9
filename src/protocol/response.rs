use super::{
    envelope::{ConsumeResponse, Envelope, InvalidResponse, ProduceResponse, TopicResponse},
    transport::TransportError,
};

/// Response cases a broker may answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Topic(TopicResponse),
    Produce(ProduceResponse),
    Consume(ConsumeResponse),
    Invalid(InvalidResponse),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Topic(_) => "TopicResponse",
            Response::Produce(_) => "ProduceResponse",
            Response::Consume(_) => "ConsumeResponse",
            Response::Invalid(_) => "InvalidResponse",
        }
    }
}

impl TryFrom<Envelope> for Response {
    type Error = TransportError;

    fn try_from(value: Envelope) -> Result<Self, Self::Error> {
        match value {
            Envelope::TopicResponse(resp) => Ok(Response::Topic(resp)),
            Envelope::ProduceResponse(resp) => Ok(Response::Produce(resp)),
            Envelope::ConsumeResponse(resp) => Ok(Response::Consume(resp)),
            Envelope::InvalidResponse(resp) => Ok(Response::Invalid(resp)),
            request @ (Envelope::TopicRequest(_)
            | Envelope::ProduceRequest(_)
            | Envelope::ConsumeRequest(_)) => {
                Err(TransportError::UnknownVariant(request.kind().to_string()))
            }
        }
    }
}

/// Decode a frame payload into the response case it carries.
pub fn parse_response(payload: &[u8]) -> Result<Response, TransportError> {
    Envelope::from_bytes(payload)?.try_into()
}
