//! Playback snapshots read from newline-delimited JSON.
//!
//! Each line replaces the current snapshot:
//!
//! ```text
//! {"state":"playing","media_type":"Movie","title":"Arrival","progress":60,"duration":6960}
//! null
//! ```
//!
//! `null` or a blank line means nothing is playing. Lines that fail to parse
//! are logged and ignored. When the input ends, nothing is playing.

use models::PlaybackSnapshot;
use presence_core::presence::PlaybackSource;

use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, stdin};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// [`PlaybackSource`] fed by a line reader, stdin by default.
///
/// A background task keeps the latest line parsed; `poll` never blocks on
/// input.
#[derive(Debug)]
pub struct StdinPlaybackSource {
    latest: watch::Receiver<Option<PlaybackSnapshot>>,
    reader: JoinHandle<()>,
}

impl StdinPlaybackSource {
    /// Read snapshots from the process's standard input.
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, latest) = watch::channel(None);
        let reader = tokio::spawn(read_snapshots(reader, tx));
        Self { latest, reader }
    }

    /// Wait until the next line has been applied. Returns `false` once input ended.
    pub async fn changed(&mut self) -> bool {
        self.latest.changed().await.is_ok()
    }
}

impl Default for StdinPlaybackSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StdinPlaybackSource {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl PlaybackSource for StdinPlaybackSource {
    async fn poll(&mut self) -> Option<PlaybackSnapshot> {
        self.latest.borrow_and_update().clone()
    }
}

/// Parse one input line. `Err` carries the parser message.
pub fn parse_line(line: &str) -> Result<Option<PlaybackSnapshot>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<Option<PlaybackSnapshot>>(trimmed).map_err(|e| e.to_string())
}

async fn read_snapshots<R>(reader: R, tx: watch::Sender<Option<PlaybackSnapshot>>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_line(&line) {
                Ok(snapshot) => {
                    debug!("Playback input: {snapshot:?}");
                    tx.send_replace(snapshot);
                }
                Err(e) => warn!("Ignoring malformed playback line: {e}"),
            },
            Ok(None) => {
                info!("Playback input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read playback input: {e}");
                break;
            }
        }
    }

    tx.send_replace(None);
}
