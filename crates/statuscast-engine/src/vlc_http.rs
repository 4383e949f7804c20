//! VLC web interface (`vlc --extraintf http --http-password ...`).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use statuscast_core::error::EngineError;
use statuscast_core::models::{PlaybackState, PlaybackStatus, NO_MEDIA, UNKNOWN_MS};
use statuscast_core::traits::{MediaEngine, SeekTarget, StatusSource};
use tokio::time::Instant;
use tracing::debug;

use crate::loading::LoadingTracker;
use crate::media::{filename_from_uri, path_to_mrl};

const STATUS_PATH: &str = "/requests/status.json";

/// Client for VLC's `status.json` endpoint.
pub struct VlcHttpEngine {
    base_url: String,
    password: String,
    http: Client,
    loading: LoadingTracker,
}

#[derive(Debug, Deserialize)]
struct VlcStatus {
    state: String,
    /// Whole seconds.
    #[serde(default)]
    time: i64,
    /// Whole seconds; `-1` or `0` when unknown.
    #[serde(default)]
    length: i64,
    /// Fraction of the media played, finer grained than `time`.
    #[serde(default)]
    position: f64,
    information: Option<VlcInformation>,
}

#[derive(Debug, Deserialize)]
struct VlcInformation {
    category: VlcCategory,
}

#[derive(Debug, Deserialize)]
struct VlcCategory {
    meta: Option<VlcMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct VlcMeta {
    filename: Option<String>,
    title: Option<String>,
}

impl VlcHttpEngine {
    pub fn new(
        base_url: &str,
        password: &str,
        timeout: Duration,
        loading: LoadingTracker,
    ) -> Result<Self, EngineError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| EngineError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            password: password.to_string(),
            http,
            loading,
        })
    }

    async fn request(&self, query: &[(&str, &str)]) -> Result<VlcStatus, EngineError> {
        let resp = self
            .http
            .get(format!("{}{STATUS_PATH}", self.base_url))
            .basic_auth("", Some(&self.password))
            .query(query)
            .send()
            .await
            .map_err(request_error)?;

        let resp = Self::check_response(resp)?;
        resp.json()
            .await
            .map_err(|e| EngineError::QueryFailed(format!("unexpected status.json: {e}")))
    }

    fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, EngineError> {
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED => Err(EngineError::QueryFailed(
                "VLC rejected the password (engine.http.password)".into(),
            )),
            s => Err(EngineError::QueryFailed(format!("VLC returned HTTP {s}"))),
        }
    }

    async fn command(&self, query: &[(&str, &str)]) -> Result<(), EngineError> {
        self.request(query).await.map(|_| ()).map_err(|e| match e {
            EngineError::QueryFailed(msg) => EngineError::Command(msg),
            other => other,
        })
    }

    fn to_status(&mut self, raw: VlcStatus, now: Instant) -> PlaybackStatus {
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

        let duration_ms = if raw.length < 0 {
            UNKNOWN_MS
        } else {
            raw.length.saturating_mul(1000)
        };
        let position_ms = if raw.length > 0 && raw.position > 0.0 {
            (raw.position * duration_ms as f64).round() as i64
        } else {
            raw.time.max(0).saturating_mul(1000)
        };

        let (state, is_loading) = self.loading.observe(raw_state, position_ms, duration_ms, now);

        let (title, filename) = match raw.information.and_then(|i| i.category.meta) {
            Some(meta) => (
                meta.title.unwrap_or_default(),
                meta.filename
                    .map(|f| filename_from_uri(&f))
                    .unwrap_or_default(),
            ),
            None => (NO_MEDIA.to_string(), NO_MEDIA.to_string()),
        };

        PlaybackStatus {
            state,
            position_ms,
            duration_ms,
            title,
            filename,
            is_loading,
        }
    }
}

fn request_error(e: reqwest::Error) -> EngineError {
    if e.is_connect() || e.is_timeout() {
        EngineError::Unavailable(e.to_string())
    } else {
        EngineError::QueryFailed(e.to_string())
    }
}

impl StatusSource for VlcHttpEngine {
    async fn query_status(&mut self) -> Result<PlaybackStatus, EngineError> {
        let raw = self.request(&[]).await?;
        Ok(self.to_status(raw, Instant::now()))
    }
}

impl MediaEngine for VlcHttpEngine {
    async fn open(&mut self, path: &str) -> Result<(), EngineError> {
        let mrl = path_to_mrl(path);
        debug!(%mrl, "Opening via VLC HTTP");
        self.command(&[("command", "in_play"), ("input", &mrl)]).await?;
        self.loading.begin(Instant::now());
        Ok(())
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        self.command(&[("command", "pl_forceresume")]).await
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.command(&[("command", "pl_forcepause")]).await
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.command(&[("command", "pl_stop")]).await?;
        self.loading.cancel();
        Ok(())
    }

    async fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        let current_ms = match target {
            SeekTarget::Relative(_) => self.query_status().await?.position_ms,
            SeekTarget::Absolute(_) => 0,
        };
        let seconds = (target.resolve(current_ms) / 1000).to_string();
        self.command(&[("command", "seek"), ("val", &seconds)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const PLAYING_JSON: &str = r#"{
        "fullscreen": false, "apiversion": 3, "time": 12, "volume": 256,
        "length": 245, "state": "playing", "version": "3.0.20", "position": 0.05,
        "information": {"chapter": 0, "category": {"meta": {
            "filename": "song.mp3", "title": "Song", "artist": "Someone"
        }}}
    }"#;

    const STOPPED_JSON: &str = r#"{"apiversion": 3, "time": 0, "length": 0, "state": "stopped", "position": 0}"#;

    /// Serve `responses` in order, one per connection, returning each request head.
    async fn fake_vlc(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (code, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                requests.push(String::from_utf8_lossy(&buf).into_owned());
                let reply = format!(
                    "HTTP/1.1 {code} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });
        (url, handle)
    }

    fn engine(url: &str) -> VlcHttpEngine {
        VlcHttpEngine::new(url, "secret", Duration::from_secs(2), LoadingTracker::default()).unwrap()
    }

    #[tokio::test]
    async fn test_query_maps_playing_status() {
        let (url, server) = fake_vlc(vec![(200, PLAYING_JSON)]).await;
        let status = engine(&url).query_status().await.unwrap();

        assert_eq!(status.state, PlaybackState::Playing);
        assert_eq!(status.duration_ms, 245_000);
        assert_eq!(status.position_ms, 12_250);
        assert_eq!(status.title, "Song");
        assert_eq!(status.filename, "song.mp3");
        assert!(!status.is_loading);

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /requests/status.json"));
        // base64(":secret")
        assert!(requests[0].contains("OnNlY3JldA=="));
    }

    #[tokio::test]
    async fn test_stopped_without_media() {
        let (url, _server) = fake_vlc(vec![(200, STOPPED_JSON)]).await;
        let status = engine(&url).query_status().await.unwrap();
        assert_eq!(status, PlaybackStatus::no_media());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (url, _server) = fake_vlc(vec![(401, "")]).await;
        let err = engine(&url).query_status().await.unwrap_err();
        assert!(matches!(err, EngineError::QueryFailed(msg) if msg.contains("password")));
    }

    #[tokio::test]
    async fn test_not_running_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = engine(&url).query_status().await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_open_sends_in_play_and_marks_loading() {
        let opening = r#"{"time": 0, "length": 0, "state": "opening", "position": 0}"#;
        let (url, server) = fake_vlc(vec![(200, STOPPED_JSON), (200, opening)]).await;
        let mut vlc = engine(&url);

        vlc.open("/music/a b.mp3").await.unwrap();
        let status = vlc.query_status().await.unwrap();
        assert_eq!(status.state, PlaybackState::Loading);
        assert!(status.is_loading);

        let requests = server.await.unwrap();
        assert!(requests[0].contains("command=in_play"));
        assert!(requests[0].contains("input=file%3A%2F%2F%2Fmusic%2Fa%2520b.mp3"));
    }

    #[tokio::test]
    async fn test_relative_seek_uses_current_position() {
        let (url, server) = fake_vlc(vec![(200, PLAYING_JSON), (200, PLAYING_JSON)]).await;
        engine(&url).seek(SeekTarget::Relative(10_000)).await.unwrap();

        let requests = server.await.unwrap();
        assert!(requests[1].contains("command=seek"));
        assert!(requests[1].contains("val=22"));
    }
}
