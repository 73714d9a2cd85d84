use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use common::{serialize_record, Attempt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// Sender half of the live-update channel; carries the exact JSON line
/// written to the audit log.
pub type FeedSender = mpsc::UnboundedSender<String>;
pub type FeedReceiver = mpsc::UnboundedReceiver<String>;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to encode attempt: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("audit log write failed: {0}")]
    Sink(#[from] std::io::Error),
}

/// Audit log file name for a service started on `date`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("honeypot-{}.log", date.format("%Y-%m-%d"))
}

/// Open (creating if needed) today's audit log in append mode.
pub async fn open_daily_log(dir: &Path, date: NaiveDate) -> std::io::Result<(tokio::fs::File, PathBuf)> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(log_file_name(date));
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    Ok((file, path))
}

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Single owner of the audit log. Each record is written, flushed and then
/// published under one lock, so log order and feed order agree.
pub struct Recorder {
    sink: Mutex<Sink>,
    feed: Option<FeedSender>,
    fatal: mpsc::UnboundedSender<RecordError>,
}

impl Recorder {
    pub fn new<W>(sink: W, feed: Option<FeedSender>, fatal: mpsc::UnboundedSender<RecordError>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            sink: Mutex::new(Box::new(sink)),
            feed,
            fatal,
        }
    }

    pub async fn record(&self, attempt: &Attempt) -> Result<(), RecordError> {
        let mut line = serialize_record(attempt)?;
        let mut sink = self.sink.lock().await;
        line.push('\n');
        if let Err(e) = write_line(&mut *sink, &line).await {
            error!(error = %e, "audit log is unwritable");
            let _ = self.fatal.send(RecordError::Sink(std::io::Error::new(e.kind(), e.to_string())));
            return Err(e.into());
        }
        line.pop();
        if let Some(feed) = &self.feed {
            if feed.send(line).is_err() {
                debug!("live view is gone; attempt only logged");
            }
        }
        Ok(())
    }
}

async fn write_line(sink: &mut Sink, line: &str) -> std::io::Result<()> {
    sink.write_all(line.as_bytes()).await?;
    sink.flush().await
}
