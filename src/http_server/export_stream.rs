//! Streaming archive bodies
//!
//! The archive is written on the blocking pool into a [`ChannelWriter`];
//! the response body drains the channel. If the client disconnects the
//! channel closes, the next write fails and the export aborts.

use std::io::{self, Write};

use axum::body::{Body, Bytes};
use futures_util::stream;
use tokio::sync::mpsc;

use crate::export::{ExportPlan, ExportResult};

const CHUNK_SIZE: usize = 16 * 1024;
const CHANNEL_DEPTH: usize = 8;

type Chunk = Result<Bytes, io::Error>;

/// `Write` adapter that forwards buffered chunks into a bounded channel.
pub struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
    buffer: Vec<u8>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<Chunk>) -> Self {
        Self {
            tx,
            buffer: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buffer, Vec::with_capacity(CHUNK_SIZE)));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "export receiver closed"))
    }

    /// Terminates the body with an error instead of a clean end.
    pub fn fail(self, message: String) {
        let _ = self.tx.blocking_send(Err(io::Error::new(io::ErrorKind::Other, message)));
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

/// Starts writing `plan` in the background and returns the body that streams it.
pub fn archive_body(plan: ExportPlan) -> Body {
    streamed_body(move |writer| plan.write_to(writer).map(|_| ()))
}

/// Runs `produce` on the blocking pool; an error ends the body with an error
/// chunk rather than a clean end of stream.
fn streamed_body<F>(produce: F) -> Body
where
    F: FnOnce(&mut ChannelWriter) -> ExportResult<()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter::new(tx);
        if let Err(e) = produce(&mut writer) {
            writer.fail(e.to_string());
        }
    });

    let chunks = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) });
    Body::from_stream(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportError;
    use axum::body::to_bytes;
    use futures_util::StreamExt;

    #[test]
    fn test_closed_receiver_fails_write() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut writer = ChannelWriter::new(tx);
        writer.write_all(&[0u8; CHUNK_SIZE]).unwrap_err();
    }

    #[test]
    fn test_flush_sends_partial_chunk() {
        let (tx, mut rx) = mpsc::channel(2);
        let mut writer = ChannelWriter::new(tx);
        writer.write_all(b"abc").unwrap();
        assert!(rx.try_recv().is_err());
        writer.flush().unwrap();
        assert_eq!(rx.try_recv().unwrap().unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn test_failed_write_ends_body_with_error() {
        let body = streamed_body(|writer| {
            writer
                .write_all(&[b'x'; CHUNK_SIZE])
                .map_err(|e| ExportError::io("adding _study_definition.json", e))?;
            Err(ExportError::io(
                "adding AE_v1.0.0.csv",
                io::Error::new(io::ErrorKind::Other, "disk gone"),
            ))
        });

        let chunks: Vec<_> = body.into_data_stream().collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().unwrap().len(), CHUNK_SIZE);
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn test_plan_streams_complete_archive() {
        use crate::storage::{ManualScheduler, MemoryBackend, Snapshot, StateStore};
        use crate::study::Study;
        use std::sync::Arc;

        let mut snapshot = Snapshot::new();
        snapshot.studies.insert("S1".into(), Study::new("S1", vec![]));
        let state = StateStore::new(snapshot, Arc::new(MemoryBackend::new()), Arc::new(ManualScheduler::new()));
        let plan = crate::export::ExportPipeline::new(state).prepare("S1").unwrap();
        let expected = plan.to_bytes().unwrap();

        let bytes = to_bytes(archive_body(plan), usize::MAX).await.unwrap();
        assert_eq!(bytes.to_vec(), expected);
    }
}
