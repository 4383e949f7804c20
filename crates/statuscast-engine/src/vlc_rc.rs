//! VLC remote-control text interface over TCP (`vlc --extraintf rc --rc-host host:port`).
//!
//! The protocol is line oriented: one command per line, and every reply
//! (the connect greeting included) ends with the interactive `> ` prompt.
//! Reading up to the prompt keeps commands and replies in step. VLC also
//! prints asynchronous `status change:` notifications, which are skipped.

use std::io::ErrorKind;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use statuscast_core::error::EngineError;
use statuscast_core::models::{PlaybackState, PlaybackStatus, UNKNOWN_MS};
use statuscast_core::traits::{MediaEngine, SeekTarget, StatusSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace};

use crate::loading::LoadingTracker;
use crate::media::filename_from_uri;

static RE_NEW_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\( new input: (.+) \)$").unwrap());
static RE_STATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\( state (\w+) \)$").unwrap());

const PROMPT: &[u8] = b"> ";

/// Remote-control client. Connects on first use and again after any failure.
pub struct VlcRcEngine {
    addr: String,
    timeout: Duration,
    conn: Option<RcConnection>,
    loading: LoadingTracker,
}

struct RcConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// One `status` exchange, before interpretation.
#[derive(Debug, Default, PartialEq)]
struct RcStatus {
    input: Option<String>,
    state: String,
    time_ms: Option<i64>,
    length_ms: Option<i64>,
    title: String,
}

fn is_notification(line: &str) -> bool {
    line.starts_with("status change:")
}

fn io_error(e: std::io::Error) -> EngineError {
    match e.kind() {
        ErrorKind::UnexpectedEof => EngineError::Unavailable("VLC closed the RC connection".into()),
        _ => EngineError::Unavailable(format!("VLC RC connection: {e}")),
    }
}

/// Media times are non-negative seconds that still fit once scaled to ms.
fn seconds_to_ms(seconds: i64) -> Option<i64> {
    if seconds < 0 {
        return None;
    }
    seconds.checked_mul(1000)
}

impl RcConnection {
    /// Connect and discard the greeting printed before the first prompt.
    async fn open(addr: &str) -> Result<Self, EngineError> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            EngineError::Unavailable(format!("cannot reach VLC RC interface at {addr}: {e}"))
        })?;
        stream.set_nodelay(true).ok();
        let (read, writer) = stream.into_split();
        let mut conn = Self {
            reader: BufReader::new(read),
            writer,
        };
        let greeting = conn.until_prompt().await?;
        trace!(greeting = %greeting.join(" / "), "RC greeting");
        Ok(conn)
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        trace!(command, "RC send");
        self.writer
            .write_all(format!("{command}\n").as_bytes())
            .await
            .map_err(io_error)?;
        self.writer.flush().await.map_err(io_error)
    }

    /// Lines received before the next prompt, notifications removed.
    async fn until_prompt(&mut self) -> Result<Vec<String>, EngineError> {
        let mut lines = Vec::new();
        let mut line = Vec::new();
        loop {
            let byte = self.reader.read_u8().await.map_err(io_error)?;
            if byte == b'\n' {
                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches('\r')
                    .to_string();
                trace!(line = %text, "RC recv");
                if !is_notification(&text) {
                    lines.push(text);
                }
                line.clear();
            } else {
                line.push(byte);
                if line == PROMPT {
                    return Ok(lines);
                }
            }
        }
    }

    /// Send `command` and collect its whole reply.
    async fn exchange(&mut self, command: &str) -> Result<Vec<String>, EngineError> {
        self.send(command).await?;
        self.until_prompt().await
    }

    /// First reply line, empty when VLC printed nothing.
    async fn reply(&mut self, command: &str) -> Result<String, EngineError> {
        let lines = self.exchange(command).await?;
        Ok(lines.into_iter().next().unwrap_or_default())
    }

    /// Numeric reply; VLC answers with an empty line when nothing is loaded.
    async fn number(&mut self, command: &str) -> Result<Option<i64>, EngineError> {
        let line = self.reply(command).await?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        line.parse().map(Some).map_err(|_| {
            EngineError::QueryFailed(format!("expected a number from `{command}`, got {line:?}"))
        })
    }

    /// A media time reply in seconds, converted to milliseconds.
    async fn millis(&mut self, command: &str) -> Result<Option<i64>, EngineError> {
        let Some(seconds) = self.number(command).await? else {
            return Ok(None);
        };
        seconds_to_ms(seconds).map(Some).ok_or_else(|| {
            EngineError::QueryFailed(format!("`{command}` answered {seconds}, not a media time"))
        })
    }

    async fn status(&mut self) -> Result<RcStatus, EngineError> {
        let mut input = None;
        let mut state = None;
        for line in self.exchange("status").await? {
            if let Some(caps) = RE_NEW_INPUT.captures(&line) {
                input = Some(caps[1].to_string());
            } else if let Some(caps) = RE_STATE.captures(&line) {
                state = Some(caps[1].to_string());
            }
        }
        let state = state
            .ok_or_else(|| EngineError::QueryFailed("`status` reply has no state line".into()))?;

        let time_ms = self.millis("get_time").await?;
        let length_ms = self.millis("get_length").await?;
        let title = if input.is_some() {
            self.reply("get_title").await?
        } else {
            String::new()
        };

        Ok(RcStatus {
            input,
            state,
            time_ms,
            length_ms,
            title,
        })
    }
}

impl VlcRcEngine {
    pub fn new(host: &str, port: u16, timeout: Duration, loading: LoadingTracker) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            timeout,
            conn: None,
            loading,
        }
    }

    async fn connection(&mut self) -> Result<&mut RcConnection, EngineError> {
        if self.conn.is_none() {
            let conn = timeout(self.timeout, RcConnection::open(&self.addr))
                .await
                .map_err(|_| {
                    EngineError::Unavailable(format!("connecting to {} timed out", self.addr))
                })??;
            debug!(addr = %self.addr, "Connected to VLC RC interface");
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| EngineError::Unavailable("no RC connection".into()))
    }

    /// Drop the connection on any failure so the next call reconnects.
    fn settle<T>(
        &mut self,
        result: Result<Result<T, EngineError>, tokio::time::error::Elapsed>,
    ) -> Result<T, EngineError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.conn = None;
                Err(e)
            }
            Err(_) => {
                self.conn = None;
                Err(EngineError::Unavailable(format!(
                    "VLC RC did not answer within {:?}",
                    self.timeout
                )))
            }
        }
    }

    async fn fetch_status(&mut self) -> Result<RcStatus, EngineError> {
        let limit = self.timeout;
        let conn = self.connection().await?;
        let result = timeout(limit, conn.status()).await;
        self.settle(result)
    }

    async fn number(&mut self, command: &str) -> Result<Option<i64>, EngineError> {
        let limit = self.timeout;
        let conn = self.connection().await?;
        let result = timeout(limit, conn.number(command)).await;
        self.settle(result)
    }

    async fn millis(&mut self, command: &str) -> Result<Option<i64>, EngineError> {
        let limit = self.timeout;
        let conn = self.connection().await?;
        let result = timeout(limit, conn.millis(command)).await;
        self.settle(result)
    }

    /// Send a command and wait for its prompt. VLC's rejection text becomes
    /// a command error; the connection stays usable.
    async fn command(&mut self, command: &str) -> Result<(), EngineError> {
        let limit = self.timeout;
        let conn = self.connection().await?;
        let result = timeout(limit, conn.exchange(command)).await;
        let lines = self.settle(result).map_err(|e| match e {
            EngineError::QueryFailed(msg) => EngineError::Command(msg),
            other => other,
        })?;
        match lines.into_iter().find(|l| l.starts_with("Unknown command")) {
            Some(rejection) => Err(EngineError::Command(rejection)),
            None => Ok(()),
        }
    }

    fn to_status(&mut self, raw: RcStatus, now: Instant) -> PlaybackStatus {
        let raw_state = match raw.state.as_str() {
            "playing" => PlaybackState::Playing,
            "paused" => PlaybackState::Paused,
            "stopped" => PlaybackState::Stopped,
            "opening" | "buffering" => PlaybackState::Loading,
            other => {
                debug!(state = other, "Unrecognized VLC state");
                PlaybackState::Unknown
            }
        };

        let Some(input) = raw.input else {
            self.loading.observe(raw_state, 0, 0, now);
            return PlaybackStatus {
                state: raw_state,
                ..PlaybackStatus::no_media()
            };
        };

        let position_ms = raw.time_ms.unwrap_or(UNKNOWN_MS);
        let duration_ms = raw.length_ms.unwrap_or(UNKNOWN_MS);
        let (state, is_loading) = self.loading.observe(raw_state, position_ms, duration_ms, now);

        PlaybackStatus {
            state,
            position_ms,
            duration_ms,
            title: raw.title,
            filename: filename_from_uri(&input),
            is_loading,
        }
    }
}

impl StatusSource for VlcRcEngine {
    async fn query_status(&mut self) -> Result<PlaybackStatus, EngineError> {
        let raw = self.fetch_status().await?;
        Ok(self.to_status(raw, Instant::now()))
    }
}

impl MediaEngine for VlcRcEngine {
    async fn open(&mut self, path: &str) -> Result<(), EngineError> {
        if path.contains(['\n', '\r']) {
            return Err(EngineError::Command("path contains a line break".into()));
        }
        self.command(&format!("add {path}")).await?;
        self.loading.begin(Instant::now());
        Ok(())
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        self.command("play").await
    }

    /// `pause` toggles in the RC protocol, so only send it while playing.
    async fn pause(&mut self) -> Result<(), EngineError> {
        if self.number("is_playing").await? == Some(1) {
            self.command("pause").await?;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.command("stop").await?;
        self.loading.cancel();
        Ok(())
    }

    async fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        let current_ms = match target {
            SeekTarget::Relative(_) => self.millis("get_time").await?.unwrap_or(UNKNOWN_MS),
            SeekTarget::Absolute(_) => 0,
        };
        let seconds = target.resolve(current_ms) / 1000;
        self.command(&format!("seek {seconds}")).await
    }
}
