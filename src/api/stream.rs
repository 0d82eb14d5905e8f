use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use super::range::{ByteRange, BUF_SIZE};

pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

const PROGRESS_EVERY: Duration = Duration::from_secs(10);

#[async_trait]
pub trait ByteSink: Send {
    /// An error means the receiver is gone for good
    async fn send(&mut self, chunk: Bytes) -> io::Result<()>;

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Feeds an HTTP response body; channel backpressure is the client's read speed
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ByteSink for ChannelSink {
    async fn send(&mut self, chunk: Bytes) -> io::Result<()> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client closed the connection"))
    }
}

pub struct StreamSession<P> {
    path: PathBuf,
    range: ByteRange,
    live: bool,
    probe: P,
}

impl<P> StreamSession<P>
where
    P: Fn() -> bool + Send,
{
    pub fn new(path: impl Into<PathBuf>, range: ByteRange, live: bool, probe: P) -> Self {
        Self {
            path: path.into(),
            range,
            live,
            probe,
        }
    }

    /// Copy the interval into the sink, following the tail while the file
    /// is still being written. Liveness is re-checked only on an empty read
    pub async fn run(mut self, sink: &mut dyn ByteSink) -> io::Result<u64> {
        let target = self.range.byte_count();
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.range.start)).await?;

        let mut buf = vec![0u8; BUF_SIZE as usize];
        let mut counted: u64 = 0;
        let mut progress_at = Instant::now() + PROGRESS_EVERY;

        while counted < target || self.live {
            let want = if self.live {
                // The interval end is stale while recording; keep reading
                // full buffers past it.
                BUF_SIZE as usize
            } else {
                // A finished file must not deliver past the advertised
                // Content-Length.
                target.saturating_sub(counted).min(BUF_SIZE) as usize
            };

            let n = file.read(&mut buf[..want]).await?;
            if n == 0 {
                self.live = (self.probe)();
                if self.live {
                    sleep(POLL_INTERVAL).await;
                    continue;
                }
                break;
            }

            counted += n as u64;
            sink.send(Bytes::copy_from_slice(&buf[..n])).await?;

            if Instant::now() >= progress_at {
                tracing::debug!(path = %self.path.display(), bytes = counted, "still streaming");
                progress_at = Instant::now() + PROGRESS_EVERY;
            }
        }

        sink.flush().await?;
        tracing::debug!(path = %self.path.display(), bytes = counted, "stream finished");
        Ok(counted)
    }
}
