//! Protobuf codec for the agent service.
//!
//! Same wire format as tonic's `ProstCodec`, but a message that fails to decode
//! is reported as `InvalidArgument` instead of `Internal`.

use bytes::{Buf, Bytes};
use prost::{DecodeError, Message};
use std::marker::PhantomData;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::Status;

#[derive(Debug, Clone, Copy)]
pub struct AgentCodec<T, U> {
    _pd: PhantomData<(T, U)>,
}

impl<T, U> Default for AgentCodec<T, U> {
    fn default() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<T, U> Codec for AgentCodec<T, U>
where
    T: Message + Send + 'static,
    U: Message + Default + Send + 'static,
{
    type Encode = T;
    type Decode = U;

    type Encoder = AgentEncoder<T>;
    type Decoder = AgentDecoder<U>;

    fn encoder(&mut self) -> Self::Encoder {
        AgentEncoder(PhantomData)
    }

    fn decoder(&mut self) -> Self::Decoder {
        AgentDecoder(PhantomData)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentEncoder<T>(PhantomData<T>);

impl<T: Message> Encoder for AgentEncoder<T> {
    type Item = T;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, buf: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(buf)
            .map_err(|e| Status::internal(format!("Encode message fail, err:{}", e)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentDecoder<U>(PhantomData<U>);

impl<U: Message + Default> Decoder for AgentDecoder<U> {
    type Item = U;
    type Error = Status;

    fn decode(&mut self, buf: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(buf).map(Some)
    }
}

/// Serializes a message with the rules used on the wire.
pub fn encode_message<M: Message>(msg: &M) -> Bytes {
    Bytes::from(msg.encode_to_vec())
}

/// Parses a message, classifying malformed input as `InvalidArgument`.
pub fn decode_message<M, B>(buf: B) -> Result<M, Status>
where
    M: Message + Default,
    B: Buf,
{
    M::decode(buf).map_err(decode_error)
}

fn decode_error(e: DecodeError) -> Status {
    Status::invalid_argument(format!("Malformed message, err:{}", e))
}
