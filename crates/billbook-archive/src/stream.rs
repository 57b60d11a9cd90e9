//! # Streaming Transport
//!
//! Connects the assembler's [`AsyncWrite`] sink to an HTTP response body.
//!
//! The encoder writes into a [`ChannelWriter`]; every write becomes one
//! chunk on a bounded channel, so a slow client slows the encoder down
//! instead of growing a buffer. The response side reads the same channel
//! through [`ArchiveBodyStream`].
//!
//! Two signals cross the channel in the other direction:
//!
//! - a fatal assembler error is delivered as an `Err` item, which makes the
//!   HTTP layer abort the connection instead of ending the body cleanly;
//! - dropping the body stream (client disconnect) cancels the export's
//!   [`CancellationToken`], so no further files are fetched.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncWrite, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard, PollSender};

use crate::assembler::{ArchiveAssembler, ArchiveError, ArchiveSummary, ExportBundle};
use crate::fetch::EvidenceFetcher;

/// Buffer in front of the channel so small encoder writes leave as larger chunks.
const WRITE_BUFFER_BYTES: usize = 64 * 1024;

type Chunk = Result<Bytes, io::Error>;

/// Bounded channel between the encoder and the response body.
pub fn archive_channel(capacity: usize) -> (ChannelWriter, ArchiveBodyStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let writer = ChannelWriter {
        abort: tx.clone(),
        sender: PollSender::new(tx),
    };
    let body = ArchiveBodyStream {
        _cancel_on_drop: None,
        receiver: rx,
    };
    (writer, body)
}

/// [`AsyncWrite`] half of [`archive_channel`].
pub struct ChannelWriter {
    sender: PollSender<Chunk>,
    abort: mpsc::Sender<Chunk>,
}

impl ChannelWriter {
    /// Handle that can fail the stream after the writer is gone.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            sender: self.abort.clone(),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer went away")
}

impl AsyncWrite for ChannelWriter {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        ready!(self.sender.poll_reserve(cx)).map_err(|_| closed())?;
        self.sender
            .send_item(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| closed())?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.sender.close();
        Poll::Ready(Ok(()))
    }
}

/// Fails the body stream with an error item.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    sender: mpsc::Sender<Chunk>,
}

impl AbortHandle {
    /// Push `err` to the consumer. A no-op if the consumer is gone.
    pub async fn abort(&self, err: &ArchiveError) {
        let _ = self.sender.send(Err(io::Error::other(err.to_string()))).await;
    }
}

/// Response half of [`archive_channel`]: a stream of archive chunks.
#[derive(Debug)]
pub struct ArchiveBodyStream {
    // dropped first, so the export sees cancellation before the closed channel
    _cancel_on_drop: Option<DropGuard>,
    receiver: mpsc::Receiver<Chunk>,
}

impl ArchiveBodyStream {
    /// Cancel `token` when this stream is dropped.
    pub fn cancel_on_drop(mut self, token: CancellationToken) -> Self {
        self._cancel_on_drop = Some(token.drop_guard());
        self
    }
}

impl Stream for ArchiveBodyStream {
    type Item = Chunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Chunk>> {
        self.receiver.poll_recv(cx)
    }
}

/// Streaming settings for [`spawn_export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Chunks buffered between encoder and client.
    pub channel_capacity: usize,
    /// Upper bound on the whole export.
    pub deadline: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            channel_capacity: crate::config::DEFAULT_CHANNEL_CAPACITY,
            deadline: None,
        }
    }
}

/// A running export.
#[derive(Debug)]
pub struct ExportTask {
    /// Download filename, e.g. `ACME_2567-03.zip`.
    pub file_name: String,
    /// Archive bytes as they are produced.
    pub body: ArchiveBodyStream,
    /// Resolves when the archive is complete or aborted.
    pub handle: JoinHandle<Result<ArchiveSummary, ArchiveError>>,
}

/// Start assembling `bundle` on a background task and return its byte stream.
///
/// The caller can start sending the response immediately. On any fatal
/// error, including the deadline, the stream yields an error item so the
/// download is visibly truncated rather than silently short.
pub fn spawn_export<F>(assembler: Arc<ArchiveAssembler<F>>, bundle: ExportBundle, options: StreamOptions) -> ExportTask
where
    F: EvidenceFetcher + 'static,
{
    let (writer, body) = archive_channel(options.channel_capacity);
    let abort = writer.abort_handle();
    let cancel = CancellationToken::new();
    let body = body.cancel_on_drop(cancel.clone());
    let file_name = bundle.file_name();

    let handle = tokio::spawn(async move {
        let sink = BufWriter::with_capacity(WRITE_BUFFER_BYTES, writer);
        drive(&*assembler, &bundle, sink, &cancel, options.deadline, &abort).await
    });

    ExportTask {
        file_name,
        body,
        handle,
    }
}

/// Run one export into `sink` under an optional deadline. Any failure
/// other than cancellation is pushed to the consumer through `abort`.
async fn drive<F, W>(
    assembler: &ArchiveAssembler<F>,
    bundle: &ExportBundle,
    sink: W,
    cancel: &CancellationToken,
    deadline: Option<Duration>,
    abort: &AbortHandle,
) -> Result<ArchiveSummary, ArchiveError>
where
    F: EvidenceFetcher,
    W: AsyncWrite + Unpin + Send,
{
    let run = assembler.assemble(bundle, sink, cancel);
    let result = match deadline {
        Some(deadline) => match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(ArchiveError::DeadlineExceeded {
                    secs: deadline.as_secs(),
                })
            }
        },
        None => run.await,
    };
    if let Err(err) = &result {
        if !matches!(err, ArchiveError::Cancelled) {
            tracing::error!(archive = %bundle.file_name(), error = %err, "aborting archive stream");
        }
        abort.abort(err).await;
    }
    result
}
