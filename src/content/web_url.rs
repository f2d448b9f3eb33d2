//! Validation and normalization of user-entered content URLs.

use url::Url;

use super::ContentError;

/// Validates a URL typed into the URL picker. Only absolute http(s) URLs are
/// accepted.
///
/// # Errors
///
/// Returns [`ContentError::InvalidUrl`] with a user-facing reason.
pub fn validate_web_url(input: &str) -> Result<Url, ContentError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|_| {
        ContentError::invalid_url(trimmed, "Please enter a URL, e.g. \"https://www.example.com\"")
    })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        "http" | "https" => Err(ContentError::invalid_url(trimmed, "The URL has no host name")),
        _ => Err(ContentError::invalid_url(
            trimmed,
            "Please use a URL that starts with \"http\" or \"https\"",
        )),
    }
}

/// Extracts the video id from a YouTube URL.
///
/// Recognizes `youtube.com/watch?v=`, `youtube.com/embed/`,
/// `youtube.com/shorts/`, `youtube.com/live/` and `youtu.be/` forms.
#[must_use]
pub fn youtube_video_id(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());

    let id = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Extracts a JSTOR article id from a stable URL, a `10.2307/` DOI, or a bare
/// numeric id.
#[must_use]
pub fn jstor_article_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(trimmed.to_string());
    }
    if trimmed.starts_with("10.") && trimmed.contains('/') {
        return Some(trimmed.to_string());
    }

    let url = Url::parse(trimmed).ok()?;
    let host = url.host_str()?.trim_start_matches("www.");
    if host != "jstor.org" {
        return None;
    }
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["stable", "pdf", file, ..] if is_numeric(file.trim_end_matches(".pdf")) => {
            Some(file.trim_end_matches(".pdf").to_string())
        }
        ["stable", id, ..] if is_numeric(id) => Some((*id).to_string()),
        ["stable", prefix, suffix, ..] if prefix.starts_with("10.") => {
            Some(format!("{prefix}/{suffix}"))
        }
        _ => None,
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
