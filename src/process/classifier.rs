//! # Output classifier: tee the child's output and watch for the shutdown marker.
//!
//! Consumes the live stdout stream of a child process, mirrors every raw
//! line into a durable sink (the per-run log file), and scans each line for
//! the marker printed when an admin executes the in-process `shutdown`
//! command over the server's remote console:
//!
//! ```text
//! [2024-01-01][server]: ClientID=7 rcon='shutdown'
//! ```
//!
//! ## Rules
//! - First match wins: once the marker is seen the verdict is latched and
//!   later lines are mirrored but no longer scanned.
//! - The stream is **always** drained to EOF, match or not: the child's
//!   stdout pipe must be fully read or a chatty server would block on a
//!   full pipe buffer and never exit.
//! - Lines are mirrored as raw bytes; scanning uses a lossy UTF-8 view, so
//!   binary garbage in the stream is persisted verbatim and never panics.
//! - A sink write failure stops mirroring but not draining or scanning.

use std::io;
use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::warn;

/// What the classifier concluded once the stream was drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The shutdown marker was observed.
    Marker {
        /// Actor identifier captured from the marker line (logging only).
        actor: String,
    },
    /// Stream closed without a marker.
    Eof,
}

/// Marker printed by the server when an admin runs `shutdown` via rcon.
fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[.+\]\[.+\]: .+=(\d+) rcon='shutdown'$").expect("static pattern")
    })
}

/// Drains `reader` to EOF, mirroring every line into `sink` and scanning
/// for the shutdown marker until the first match.
///
/// Returns a read error as-is; the caller treats that the same as EOF
/// without a marker. Sink errors only disable mirroring.
pub async fn classify<R, W>(mut reader: R, sink: &mut W) -> io::Result<Verdict>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut verdict = Verdict::Eof;
    let mut sink_alive = true;
    let mut line = Vec::with_capacity(256);

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }

        if sink_alive {
            if let Err(e) = sink.write_all(&line).await {
                warn!(error = %e, "log sink write failed; output no longer mirrored");
                sink_alive = false;
            }
        }

        if verdict == Verdict::Eof {
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            if let Some(caps) = marker_pattern().captures(text) {
                verdict = Verdict::Marker {
                    actor: caps[1].to_string(),
                };
            }
        }
    }

    if sink_alive {
        let _ = sink.flush().await;
    }
    Ok(verdict)
}

/// Runs [`classify`] on its own task so the stream drains concurrently with
/// the wait for process exit. The run is reconciled only after this handle
/// is joined.
pub fn spawn<R, W>(reader: R, mut sink: W) -> JoinHandle<io::Result<Verdict>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move { classify(reader, &mut sink).await })
}
