// Chunked JSON streaming utilities
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

pub const CHUNK_ENCODING_HEADER: &str = "x-chunk-encoding";

/// Stream items as newline delimited JSON.
///
/// With `compress`, every item is Brotli compressed on its own and framed by a
/// 4 byte big-endian length instead of a newline. Content-Encoding is not set
/// since the HTTP body as a whole is not a Brotli stream.
pub fn chunked_json_stream<S, T>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let byte_stream = stream.then(move |item| async move { serialize_chunk(item, compress).await });

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache");
    if compress {
        response = response.header(CHUNK_ENCODING_HEADER, "br");
    }

    response
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn serialize_chunk<T: Serialize>(item: T, compress: bool) -> Result<Bytes, std::io::Error> {
    let mut line = serde_json::to_vec(&item)?;

    if !compress {
        line.push(b'\n');
        return Ok(Bytes::from(line));
    }

    let mut encoder = BrotliEncoder::new(std::io::Cursor::new(line));
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;

    let mut chunk = BytesMut::with_capacity(4 + compressed.len());
    chunk.put_u32(compressed.len() as u32);
    chunk.put_slice(&compressed);
    Ok(chunk.freeze())
}

/// Streaming response fed by a broadcast receiver. Ends when the sender side is gone.
pub fn stream_from_broadcast<T>(rx: broadcast::Receiver<T>, compress: bool) -> impl IntoResponse
where
    T: Serialize + Clone + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut updates = BroadcastStream::new(rx);
        while let Some(update) = updates.next().await {
            match update {
                Ok(item) => yield item,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("Stream client lagged behind, skipped {} updates", skipped);
                }
            }
        }
    };

    match chunked_json_stream(stream, compress) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
