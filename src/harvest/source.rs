//! URL input source and the feeder that pushes it into the task queue

use crate::harvest::outcome::HarvestCounters;
use crate::harvest::worker::Task;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use url::Url;

/// Classification of one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// A fetchable URL, trimmed but otherwise as written
    Url(String),

    /// Empty line or `#` comment
    Blank,

    /// Not a usable http(s) URL
    Invalid(String),
}

/// Parses one line of the URL list
///
/// The URL text itself becomes the storage key, so it is not normalized;
/// `Url` is only used to reject lines that cannot be fetched.
pub fn parse_line(line: &str) -> InputLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return InputLine::Blank;
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => InputLine::Url(trimmed.to_string()),
        Ok(url) => InputLine::Invalid(format!("unsupported scheme '{}'", url.scheme())),
        Err(e) => InputLine::Invalid(e.to_string()),
    }
}

/// Decodes one raw input line and classifies it
///
/// A line that is not valid UTF-8 is invalid on its own and does not affect
/// the lines around it.
pub fn decode_line(raw: &[u8]) -> InputLine {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_line(line),
        Err(e) => InputLine::Invalid(format!("not valid UTF-8 ({})", e)),
    }
}

/// Line counts for a URL list, used by `--dry-run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputScan {
    pub urls: usize,
    pub blank: usize,
    pub invalid: Vec<(usize, String)>,
}

/// Classifies every line of a URL list file without fetching anything
pub fn scan_input(path: &Path) -> std::io::Result<InputScan> {
    let content = std::fs::read(path)?;
    Ok(scan_lines(&content))
}

fn scan_lines(content: &[u8]) -> InputScan {
    let mut scan = InputScan::default();
    if content.is_empty() {
        return scan;
    }

    let content = content.strip_suffix(b"\n").unwrap_or(content);
    for (idx, line) in content.split(|b| *b == b'\n').enumerate() {
        match decode_line(line) {
            InputLine::Url(_) => scan.urls += 1,
            InputLine::Blank => scan.blank += 1,
            InputLine::Invalid(reason) => scan.invalid.push((idx + 1, reason)),
        }
    }
    scan
}

/// Reads `source` line by line and sends each URL to the queue
///
/// Blocks on `send` while the queue is full. Duplicate lines are forwarded
/// as-is. The queue closes when `tx` is dropped on return, which lets the
/// workers drain and exit.
///
/// # Returns
///
/// * `Ok(n)` - Number of URLs enqueued
/// * `Err(io::Error)` - Reading the source failed part way through
pub async fn feed<R>(
    mut source: R,
    tx: mpsc::Sender<Task>,
    counters: Arc<HarvestCounters>,
) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut line_no = 0;
    let mut sent = 0;

    loop {
        buf.clear();
        if source.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;

        let url = match decode_line(&buf) {
            InputLine::Url(url) => url,
            InputLine::Blank => continue,
            InputLine::Invalid(reason) => {
                tracing::warn!(
                    "Ignoring line {}: {} ({})",
                    line_no,
                    String::from_utf8_lossy(&buf).trim(),
                    reason
                );
                counters.record_invalid();
                continue;
            }
        };

        tracing::debug!("Enqueuing URL: {}", url);
        if tx.send(Task { url, line: line_no }).await.is_err() {
            tracing::warn!("Task queue closed, stopping feeder at line {}", line_no);
            break;
        }
        counters.record_enqueued();
        sent += 1;
    }

    tracing::debug!("Feeder finished after {} lines, {} URLs enqueued", line_no, sent);
    Ok(sent)
}
