//! Snappy + protobuf framing of remote read messages
//!
//! Remote read bodies use the snappy block format (not the framed
//! stream format) around a single protobuf message.

use super::models::{ReadRequest, ReadResponse};
use prost::Message;
use thiserror::Error;

/// Errors decoding or encoding a remote read body
#[derive(Error, Debug)]
pub enum CodecError {
    /// Body is not valid snappy block data
    #[error("Snappy error: {0}")]
    Snappy(#[from] snap::Error),

    /// Decompressed body is not a valid protobuf message
    #[error("Protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),
}

/// Decompress and decode a remote read request body
pub fn decode_read_request(body: &[u8]) -> Result<ReadRequest, CodecError> {
    let decompressed = snap::raw::Decoder::new().decompress_vec(body)?;
    let request = ReadRequest::decode(decompressed.as_slice())?;

    tracing::debug!(
        compressed = body.len(),
        decompressed = decompressed.len(),
        queries = request.queries.len(),
        "Decoded read request"
    );

    Ok(request)
}

/// Encode and compress a remote read response body
pub fn encode_read_response(response: &ReadResponse) -> Result<Vec<u8>, CodecError> {
    let encoded = response.encode_to_vec();
    let compressed = snap::raw::Encoder::new().compress_vec(&encoded)?;
    Ok(compressed)
}

/// Encode and compress a remote read request body (client side)
pub fn encode_read_request(request: &ReadRequest) -> Result<Vec<u8>, CodecError> {
    let encoded = request.encode_to_vec();
    let compressed = snap::raw::Encoder::new().compress_vec(&encoded)?;
    Ok(compressed)
}

/// Decompress and decode a remote read response body (client side)
pub fn decode_read_response(body: &[u8]) -> Result<ReadResponse, CodecError> {
    let decompressed = snap::raw::Decoder::new().decompress_vec(body)?;
    Ok(ReadResponse::decode(decompressed.as_slice())?)
}
