//! LTI content-item manifest for a selected [`Content`].
//!
//! The launch form posts the manifest back to the LMS. It holds one
//! `LtiLinkItem` whose `url` is this application's launch URL with the content
//! encoded in the query string. [`parse_content_item_url`] reverses that
//! encoding.

use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use super::{Content, ContentError};

/// JSON-LD context of a content-item manifest.
pub const CONTENT_ITEM_CONTEXT: &str = "http://purl.imsglobal.org/ctx/lti/v1/ContentItem";

/// Media type of an LTI link item.
pub const LTI_LINK_MEDIA_TYPE: &str = "application/vnd.ims.lti.v1.ltilink";

/// Hidden form fields submitted with the content selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormFields {
    /// Serialized content-item manifest.
    pub content_items: String,
    /// Document URL for URL content; absent for Canvas files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

/// What a launch URL in a manifest points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItemTarget {
    /// A document URL.
    Url(String),
    /// A Canvas file id.
    CanvasFile(String),
}

/// Builds the content-item manifest for `content`.
///
/// `extra_params` are appended to the launch URL after the content parameters.
#[must_use]
pub fn content_item_for_content(
    launch_url: &Url,
    content: &Content,
    extra_params: &[(String, String)],
) -> Value {
    let mut url = launch_url.clone();
    let title = {
        let mut query = url.query_pairs_mut();
        let title = match content {
            Content::Url { url: document, name } => {
                query.append_pair("url", document);
                name.clone()
            }
            Content::File { file } => {
                query.append_pair("canvas_file", "true");
                query.append_pair("file_id", &file.id);
                Some(file.display_name.clone())
            }
        };
        query.extend_pairs(extra_params);
        title
    };

    let mut item = json!({
        "@type": "LtiLinkItem",
        "mediaType": LTI_LINK_MEDIA_TYPE,
        "url": url.as_str(),
    });
    if let Some(title) = title {
        item["title"] = Value::String(title);
    }

    json!({
        "@context": CONTENT_ITEM_CONTEXT,
        "@graph": [item],
    })
}

/// Serializes the manifest and document URL for the launch form.
#[must_use]
pub fn form_fields(
    launch_url: &Url,
    content: &Content,
    extra_params: &[(String, String)],
) -> FormFields {
    let document_url = match content {
        Content::Url { url, .. } => Some(url.clone()),
        Content::File { .. } => None,
    };
    FormFields {
        content_items: content_item_for_content(launch_url, content, extra_params).to_string(),
        document_url,
    }
}

/// Recovers the selected content from a manifest's launch URL.
///
/// # Errors
///
/// Returns [`ContentError::InvalidUrl`] when the manifest has no link item or
/// its URL carries neither a document URL nor a Canvas file id.
pub fn parse_content_item_url(manifest: &Value) -> Result<ContentItemTarget, ContentError> {
    let launch = manifest
        .get("@graph")
        .and_then(|graph| graph.get(0))
        .and_then(|item| item.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| ContentError::invalid_url("", "manifest has no link item URL"))?;
    let url = Url::parse(launch)
        .map_err(|_| ContentError::invalid_url(launch, "link item URL is not absolute"))?;

    let mut document = None;
    let mut canvas_file = false;
    let mut file_id = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "url" => document = Some(value.into_owned()),
            "canvas_file" => canvas_file = value == "true",
            "file_id" => file_id = Some(value.into_owned()),
            _ => {}
        }
    }

    match (document, canvas_file, file_id) {
        (Some(document), _, _) => Ok(ContentItemTarget::Url(document)),
        (None, true, Some(id)) => Ok(ContentItemTarget::CanvasFile(id)),
        _ => Err(ContentError::invalid_url(
            launch,
            "link item URL does not identify any content",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::files::FileEntry;

    fn launch_url() -> Url {
        Url::parse("https://lms.example.com/lti_launches").unwrap()
    }

    #[test]
    fn test_url_content_manifest_round_trip() {
        let content = Content::url("https://x");
        let manifest = content_item_for_content(&launch_url(), &content, &[]);

        assert_eq!(manifest["@context"], CONTENT_ITEM_CONTEXT);
        let item = &manifest["@graph"][0];
        assert_eq!(item["@type"], "LtiLinkItem");
        assert_eq!(item["mediaType"], LTI_LINK_MEDIA_TYPE);

        let reparsed: Value =
            serde_json::from_str(&form_fields(&launch_url(), &content, &[]).content_items)
                .unwrap();
        assert_eq!(
            parse_content_item_url(&reparsed).unwrap(),
            ContentItemTarget::Url("https://x".to_string())
        );
    }

    #[test]
    fn test_url_with_query_survives_encoding() {
        let document = "https://example.com/doc?a=1&b=two words";
        let manifest = content_item_for_content(&launch_url(), &Content::url(document), &[]);
        assert_eq!(
            parse_content_item_url(&manifest).unwrap(),
            ContentItemTarget::Url(document.to_string())
        );
    }

    #[test]
    fn test_canvas_file_manifest() {
        let content = Content::File {
            file: FileEntry::file("42", "Syllabus.pdf"),
        };
        let fields = form_fields(&launch_url(), &content, &[]);
        assert_eq!(fields.document_url, None);

        let manifest: Value = serde_json::from_str(&fields.content_items).unwrap();
        let item_url = manifest["@graph"][0]["url"].as_str().unwrap();
        assert!(item_url.contains("canvas_file=true"), "got: {item_url}");
        assert!(item_url.contains("file_id=42"), "got: {item_url}");
        assert_eq!(manifest["@graph"][0]["title"], "Syllabus.pdf");
        assert_eq!(
            parse_content_item_url(&manifest).unwrap(),
            ContentItemTarget::CanvasFile("42".to_string())
        );
    }

    #[test]
    fn test_extra_params_follow_content_params() {
        let extra = vec![("group_set".to_string(), "7".to_string())];
        let manifest = content_item_for_content(&launch_url(), &Content::url("https://x"), &extra);
        let item_url = manifest["@graph"][0]["url"].as_str().unwrap();
        assert!(item_url.ends_with("url=https%3A%2F%2Fx&group_set=7"), "got: {item_url}");
    }

    #[test]
    fn test_document_url_field_for_url_content() {
        let fields = form_fields(&launch_url(), &Content::url("https://x"), &[]);
        assert_eq!(fields.document_url.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_parse_rejects_manifest_without_content() {
        let manifest = json!({"@context": CONTENT_ITEM_CONTEXT, "@graph": []});
        assert!(parse_content_item_url(&manifest).is_err());

        let manifest = json!({"@graph": [{"url": "https://lms.example.com/lti_launches"}]});
        assert!(parse_content_item_url(&manifest).is_err());
    }
}
