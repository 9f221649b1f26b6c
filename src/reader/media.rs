//! Media RSS extension elements (`media:*` namespace).
//!
//! The same physical asset can surface as `media:content`,
//! `media:thumbnail`, `media:peerLink`, or sit one level down inside a
//! `media:group`; the collectors here flatten item-level and group-level
//! elements so adapters can union everything and deduplicate by URL.
//!
//! Specs: <https://www.rssboard.org/media-rss>

use serde::Deserialize;

/// `media:content`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MediaContent {
    #[serde(rename = "@url", default)]
    pub url: String,
    #[serde(rename = "@type", default)]
    pub content_type: String,
    #[serde(rename = "@fileSize", default)]
    pub file_size: String,
    #[serde(rename = "@medium", default)]
    pub medium: String,
}

impl MediaContent {
    /// Explicit type attribute, else a wildcard derived from the coarse
    /// `medium` hint, else the octet-stream default.
    pub fn mime_type(&self) -> String {
        if !self.content_type.is_empty() {
            return self.content_type.clone();
        }
        match self.medium.as_str() {
            "image" => "image/*".to_string(),
            "video" => "video/*".to_string(),
            "audio" => "audio/*".to_string(),
            _ => "application/octet-stream".to_string(),
        }
    }

    pub fn size(&self) -> i64 {
        self.file_size.parse().unwrap_or(0)
    }
}

/// `media:thumbnail`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MediaThumbnail {
    #[serde(rename = "@url", default)]
    pub url: String,
}

impl MediaThumbnail {
    pub fn mime_type(&self) -> String {
        "image/*".to_string()
    }

    pub fn size(&self) -> i64 {
        0
    }
}

/// `media:peerLink`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MediaPeerLink {
    #[serde(rename = "@href", default)]
    pub url: String,
    #[serde(rename = "@type", default)]
    pub link_type: String,
}

impl MediaPeerLink {
    pub fn mime_type(&self) -> String {
        if !self.link_type.is_empty() {
            return self.link_type.clone();
        }
        "application/octet-stream".to_string()
    }

    pub fn size(&self) -> i64 {
        0
    }
}

/// `media:category`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MediaCategory {
    #[serde(rename = "@label", default)]
    pub label: String,
}

/// `media:description`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MediaDescription {
    #[serde(rename = "@type", default)]
    pub description_type: String,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl MediaDescription {
    /// The description as HTML: html-typed payloads pass through, plain text
    /// gets its newlines converted.
    pub fn html(&self) -> String {
        if self.description_type == "html" {
            return self.text.clone();
        }
        self.text.replace('\n', "<br>")
    }
}

/// First non-empty description, item-level before group-level.
pub fn first_description(
    item_level: &[MediaDescription],
    groups: &[MediaGroup],
) -> String {
    for description in item_level {
        let html = description.html();
        if !html.is_empty() {
            return html;
        }
    }
    for group in groups {
        for description in &group.descriptions {
            let html = description.html();
            if !html.is_empty() {
                return html;
            }
        }
    }
    String::new()
}

/// `media:group`, a container repeating the same child elements.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MediaGroup {
    #[serde(rename = "media:content", default)]
    pub contents: Vec<MediaContent>,
    #[serde(rename = "media:thumbnail", default)]
    pub thumbnails: Vec<MediaThumbnail>,
    #[serde(rename = "media:peerLink", default)]
    pub peer_links: Vec<MediaPeerLink>,
    #[serde(rename = "media:description", default)]
    pub descriptions: Vec<MediaDescription>,
}

/// All `media:content` elements, item-level first, then group-level.
pub fn all_contents<'a>(
    item_level: &'a [MediaContent],
    groups: &'a [MediaGroup],
) -> Vec<&'a MediaContent> {
    let mut all: Vec<&MediaContent> = item_level.iter().collect();
    for group in groups {
        all.extend(group.contents.iter());
    }
    all
}

/// All `media:thumbnail` elements, item-level first, then group-level.
pub fn all_thumbnails<'a>(
    item_level: &'a [MediaThumbnail],
    groups: &'a [MediaGroup],
) -> Vec<&'a MediaThumbnail> {
    let mut all: Vec<&MediaThumbnail> = item_level.iter().collect();
    for group in groups {
        all.extend(group.thumbnails.iter());
    }
    all
}

/// All `media:peerLink` elements, item-level first, then group-level.
pub fn all_peer_links<'a>(
    item_level: &'a [MediaPeerLink],
    groups: &'a [MediaGroup],
) -> Vec<&'a MediaPeerLink> {
    let mut all: Vec<&MediaPeerLink> = item_level.iter().collect();
    for group in groups {
        all.extend(group.peer_links.iter());
    }
    all
}

/// Non-empty labels of `media:category` elements.
pub fn category_labels(categories: &[MediaCategory]) -> Vec<String> {
    categories
        .iter()
        .map(|c| c.label.trim())
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
