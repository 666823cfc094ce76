use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;
use tokio_util::io::SyncIoBridge;

use crate::transport::BodyReader;

/// Declared `Content-Encoding` of a response. Only gzip and brotli are
/// decompressed; any other value passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    Gzip,
    Brotli,
    #[default]
    Identity,
}

impl ContentEncoding {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("gzip") => ContentEncoding::Gzip,
            Some(v) if v.eq_ignore_ascii_case("br") => ContentEncoding::Brotli,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Brotli => "br",
            ContentEncoding::Identity => "identity",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("read did not complete within {0:?}")]
    Timeout(Duration),
    #[error("failed to decode {encoding} body: {message}")]
    Corrupt {
        encoding: &'static str,
        message: String,
    },
    #[error("decoded body exceeds {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("decoder task failed: {0}")]
    Task(String),
}

/// Async reader wrapper that fails any single read which stays pending for
/// longer than `deadline`. The timer starts when a read first returns
/// pending and is cleared once that read completes. A timed-out read is not
/// retried.
pub struct DeadlineReader<R> {
    inner: R,
    deadline: Duration,
    timer: Option<Pin<Box<Sleep>>>,
}

impl<R> DeadlineReader<R> {
    pub fn new(inner: R, deadline: Duration) -> Self {
        Self {
            inner,
            deadline,
            timer: None,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for DeadlineReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if let Poll::Ready(result) = Pin::new(&mut this.inner).poll_read(cx, buf) {
            this.timer = None;
            return Poll::Ready(result);
        }

        let deadline = this.deadline;
        let timer = this
            .timer
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(deadline)));
        match timer.as_mut().poll(cx) {
            Poll::Ready(()) => {
                this.timer = None;
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("read did not complete within {deadline:?}"),
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Wrap a raw (possibly compressed) reader in the decompressor matching the
/// declared encoding.
pub fn decoding_reader<R: Read + Send + 'static>(
    raw: R,
    encoding: ContentEncoding,
) -> Box<dyn Read + Send> {
    match encoding {
        ContentEncoding::Gzip => Box::new(flate2::read::MultiGzDecoder::new(raw)),
        ContentEncoding::Brotli => Box::new(brotli::Decompressor::new(raw, 4096)),
        ContentEncoding::Identity => Box::new(raw),
    }
}

/// Stream `body` through the decoder for `encoding`, with every underlying
/// read bounded by `read_deadline`, and collect at most `max_bytes` of output.
///
/// The decompressors are blocking readers, so decoding runs on the blocking
/// pool and pulls the async body through a [`SyncIoBridge`]. Must be called
/// from within a tokio runtime.
pub async fn decode_body(
    body: BodyReader,
    encoding: ContentEncoding,
    read_deadline: Duration,
    max_bytes: u64,
) -> Result<Vec<u8>, DecodeError> {
    let handle = tokio::runtime::Handle::current();
    let reader = DeadlineReader::new(body, read_deadline);

    let task = tokio::task::spawn_blocking(move || {
        let bridge = SyncIoBridge::new_with_handle(reader, handle);
        let mut decoded = decoding_reader(bridge, encoding).take(max_bytes.saturating_add(1));
        let mut out = Vec::new();
        decoded
            .read_to_end(&mut out)
            .map_err(|err| map_read_error(err, encoding, read_deadline))?;
        if out.len() as u64 > max_bytes {
            return Err(DecodeError::TooLarge { max_bytes });
        }
        Ok(out)
    });

    task.await
        .map_err(|err| DecodeError::Task(err.to_string()))?
}

fn map_read_error(err: io::Error, encoding: ContentEncoding, deadline: Duration) -> DecodeError {
    if err.kind() == io::ErrorKind::TimedOut {
        return DecodeError::Timeout(deadline);
    }
    DecodeError::Corrupt {
        encoding: encoding.as_str(),
        message: err.to_string(),
    }
}
