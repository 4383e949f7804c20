//! Human-readable rendering of a status, for console presentation.

use crate::models::{PlaybackStatus, NO_MEDIA};

/// Format milliseconds as `H:MM:SS.mmm`, or `M:SS.mmm` under an hour.
/// Unknown (negative) times render as `--:--:--`.
pub fn format_time_ms(time_ms: i64) -> String {
    if time_ms < 0 {
        return "--:--:--".into();
    }
    let ms = time_ms % 1000;
    let total_secs = time_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}.{ms:03}")
    } else {
        format!("{mins}:{secs:02}.{ms:03}")
    }
}

/// One-line summary, e.g. `Playing - 0:12.345 / 1:38.765 (12.5%) | song.mp3`.
pub fn status_line(status: &PlaybackStatus) -> String {
    let mut state = status.state.to_string();
    if status.is_loading {
        state.push_str(" (loading)");
    }
    let current = format_time_ms(status.position_ms);

    if let Some(progress) = status.progress_percent() {
        format!(
            "{state} - {current} / {} ({progress:.1}%) | {}",
            format_time_ms(status.duration_ms),
            status.filename
        )
    } else if !status.filename.is_empty() && status.filename != NO_MEDIA {
        format!("{state} - {current} | {}", status.filename)
    } else {
        format!("{state} - Ready to load media")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaybackState;

    #[test]
    fn test_format_under_an_hour() {
        assert_eq!(format_time_ms(0), "0:00.000");
        assert_eq!(format_time_ms(12_345), "0:12.345");
        assert_eq!(format_time_ms(98_765), "1:38.765");
    }

    #[test]
    fn test_format_over_an_hour() {
        assert_eq!(format_time_ms(3_600_000), "1:00:00.000");
        assert_eq!(format_time_ms(3_723_004), "1:02:03.004");
    }

    #[test]
    fn test_format_unknown() {
        assert_eq!(format_time_ms(-1), "--:--:--");
    }

    #[test]
    fn test_line_with_progress() {
        let status = PlaybackStatus {
            state: PlaybackState::Playing,
            position_ms: 25_000,
            duration_ms: 100_000,
            title: "Song".into(),
            filename: "song.mp3".into(),
            is_loading: false,
        };
        assert_eq!(
            status_line(&status),
            "Playing - 0:25.000 / 1:40.000 (25.0%) | song.mp3"
        );
    }

    #[test]
    fn test_line_without_duration() {
        let status = PlaybackStatus {
            state: PlaybackState::Paused,
            position_ms: 1_500,
            duration_ms: 0,
            title: String::new(),
            filename: "radio.m3u".into(),
            is_loading: true,
        };
        assert_eq!(status_line(&status), "Paused (loading) - 0:01.500 | radio.m3u");
    }

    #[test]
    fn test_line_no_media() {
        assert_eq!(
            status_line(&PlaybackStatus::no_media()),
            "Stopped - Ready to load media"
        );
    }
}
