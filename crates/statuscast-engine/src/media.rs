//! Helpers for the media locators engines hand back.

/// Last path component of a URI or path, percent-decoded.
///
/// Handles `file://` URIs, plain POSIX and Windows paths, and network
/// URLs. Anything that decodes to an empty name falls back to the input.
pub fn filename_from_uri(uri: &str) -> String {
    let trimmed = uri.trim();
    let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let decoded = percent_decode(path).unwrap_or_else(|| path.to_string());

    let name = decoded
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("");

    if name.is_empty() {
        trimmed.to_string()
    } else {
        name.to_string()
    }
}

/// Turn a local path into an MRL the engine accepts. URIs pass through.
pub fn path_to_mrl(path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }

    let normalized = path.replace('\\', "/");
    let mut mrl = String::from("file://");
    if !normalized.starts_with('/') {
        mrl.push('/');
    }
    for ch in normalized.chars() {
        match ch {
            ' ' => mrl.push_str("%20"),
            '%' => mrl.push_str("%25"),
            '#' => mrl.push_str("%23"),
            '?' => mrl.push_str("%3F"),
            _ => mrl.push(ch),
        }
    }
    mrl
}

/// Simple percent-decoding for paths.
pub(crate) fn percent_decode(s: &str) -> Option<String> {
    let mut result = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                result.push(byte);
                i += 3;
                continue;
            }
        }
        result.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(result).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri() {
        assert_eq!(
            filename_from_uri("file:///home/user/Music/My%20Song.mp3"),
            "My Song.mp3"
        );
    }

    #[test]
    fn test_windows_path() {
        assert_eq!(filename_from_uri("C:\\Videos\\clip.mkv"), "clip.mkv");
        assert_eq!(filename_from_uri("file:///C:/Videos/clip%20two.mkv"), "clip two.mkv");
    }

    #[test]
    fn test_plain_name_unchanged() {
        assert_eq!(filename_from_uri("song.mp3"), "song.mp3");
    }

    #[test]
    fn test_http_url_drops_query() {
        assert_eq!(
            filename_from_uri("http://radio.example/live/stream.aac?token=abc"),
            "stream.aac"
        );
    }

    #[test]
    fn test_trailing_slash() {
        assert_eq!(filename_from_uri("http://radio.example/live/"), "live");
    }

    #[test]
    fn test_percent_decode_edge() {
        assert_eq!(percent_decode("100%").as_deref(), Some("100%"));
        assert_eq!(percent_decode("a%2").as_deref(), Some("a%2"));
        assert_eq!(percent_decode("a%zz").as_deref(), Some("a%zz"));
        assert_eq!(percent_decode("%41%42").as_deref(), Some("AB"));
    }

    #[test]
    fn test_path_to_mrl() {
        assert_eq!(path_to_mrl("/music/a b.mp3"), "file:///music/a%20b.mp3");
        assert_eq!(path_to_mrl("C:\\music\\a.mp3"), "file:///C:/music/a.mp3");
        assert_eq!(
            path_to_mrl("http://radio.example/live"),
            "http://radio.example/live"
        );
    }
}
