mod status;

pub use status::{PlaybackState, PlaybackStatus, NO_MEDIA, UNKNOWN_MS};
