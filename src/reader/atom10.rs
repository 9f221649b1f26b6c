//! Atom 1.0 adapter (RFC 4287), with Media RSS extensions.
//!
//! Specs:
//! <https://tools.ietf.org/html/rfc4287>
//! <https://validator.w3.org/feed/docs/atom.html>

use serde::Deserialize;

use crate::model::{Enclosure, Entry, Feed};
use crate::reader::parser::ParseError;
use crate::reader::{atom, date, identity, media, scrub, urls};

/// Decodes an Atom 1.0 document and builds the canonical feed.
pub fn parse(base_url: &str, document: &str) -> Result<Feed, ParseError> {
    let wire: Atom10Feed =
        quick_xml::de::from_str(document).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(wire.build_feed(base_url))
}

#[derive(Debug, Default, Deserialize)]
struct Atom10Feed {
    #[serde(default)]
    title: Atom10Text,
    #[serde(rename = "author", default)]
    authors: Vec<atom::AtomPerson>,
    #[serde(default)]
    icon: String,
    #[serde(rename = "link", default)]
    links: Vec<atom::AtomLink>,
    #[serde(rename = "entry", default)]
    entries: Vec<Atom10Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Atom10Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: Atom10Text,
    #[serde(default)]
    published: String,
    #[serde(default)]
    updated: String,
    #[serde(rename = "link", default)]
    links: Vec<atom::AtomLink>,
    #[serde(default)]
    summary: Atom10Text,
    #[serde(default)]
    content: Atom10Text,
    #[serde(rename = "author", default)]
    authors: Vec<atom::AtomPerson>,
    #[serde(rename = "category", default)]
    categories: Vec<Atom10Category>,
    #[serde(rename = "media:content", default)]
    media_contents: Vec<media::MediaContent>,
    #[serde(rename = "media:thumbnail", default)]
    media_thumbnails: Vec<media::MediaThumbnail>,
    #[serde(rename = "media:peerLink", default)]
    media_peer_links: Vec<media::MediaPeerLink>,
    #[serde(rename = "media:group", default)]
    media_groups: Vec<media::MediaGroup>,
    #[serde(rename = "media:description", default)]
    media_descriptions: Vec<media::MediaDescription>,
}

#[derive(Debug, Default, Deserialize)]
struct Atom10Category {
    #[serde(rename = "@term", default)]
    term: String,
    #[serde(rename = "@label", default)]
    label: String,
}

/// An Atom text construct.
///
/// `type="xhtml"` wraps the payload in a `div` whose markup the decoder does
/// not preserve; only its character data survives, which is enough for the
/// fallback chains (the next candidate takes over when it comes out empty).
#[derive(Debug, Default, Deserialize)]
struct Atom10Text {
    #[serde(rename = "$text", default)]
    value: String,
}

impl Atom10Text {
    fn as_str(&self) -> &str {
        self.value.trim()
    }
}

impl Atom10Feed {
    fn build_feed(&self, base_url: &str) -> Feed {
        let mut feed = Feed::default();

        let self_link = atom::first_link_with_relation(&self.links, "self")
            .map(|link| link.href.trim().to_string())
            .unwrap_or_default();
        feed.feed_url = urls::absolute_url(base_url, &self_link).unwrap_or(self_link);

        let site_link = atom::original_link(&self.links);
        feed.site_url = urls::absolute_url(base_url, &site_link).unwrap_or(site_link);

        feed.title = html_escape::decode_html_entities(self.title.as_str()).into_owned();
        if feed.title.is_empty() {
            feed.title = feed.site_url.clone();
        }

        feed.icon_url = self.icon.trim().to_string();

        let feed_author = atom::join_person_names(&self.authors);

        for wire_entry in &self.entries {
            let mut entry = wire_entry.build_entry();

            if let Ok(absolute) = urls::absolute_url(&feed.site_url, &entry.url) {
                entry.url = absolute;
            }
            if entry.author.is_empty() {
                entry.author = feed_author.clone();
            }
            if entry.title.is_empty() {
                entry.title = scrub::truncate_html(&entry.content, 100);
            }
            if entry.title.is_empty() {
                entry.title = entry.url.clone();
            }

            feed.entries.push(entry);
        }

        feed
    }
}

impl Atom10Entry {
    fn build_entry(&self) -> Entry {
        let mut entry = Entry::new();
        entry.url = atom::original_link(&self.links);
        entry.date = self.entry_date();
        entry.author = atom::join_person_names(&self.authors);
        entry.hash = identity::entry_hash([self.id.as_str(), entry.url.as_str()]);
        entry.content = self.entry_content();
        entry.title = html_escape::decode_html_entities(self.title.as_str()).into_owned();
        entry.enclosures = self.entry_enclosures();
        entry.comments_url = self.entry_comments_url();
        entry.tags = self.entry_categories();
        entry
    }

    /// The published date is the original creation date (YouTube keeps it
    /// stable while bumping `updated` on every metadata change).
    fn entry_date(&self) -> chrono::DateTime<chrono::Utc> {
        let value = if !self.published.is_empty() {
            &self.published
        } else {
            &self.updated
        };

        if !value.is_empty() {
            match date::parse(value) {
                Ok(parsed) => return parsed,
                Err(err) => {
                    tracing::debug!(date = %value, id = %self.id, error = %err, "Unparseable Atom entry date");
                }
            }
        }

        chrono::Utc::now()
    }

    fn entry_content(&self) -> String {
        let content = self.content.as_str();
        if !content.is_empty() {
            return content.to_string();
        }

        let summary = self.summary.as_str();
        if !summary.is_empty() {
            return summary.to_string();
        }

        media::first_description(&self.media_descriptions, &self.media_groups)
    }

    fn entry_enclosures(&self) -> Vec<Enclosure> {
        let mut enclosures = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let mut push = |url: &str, mime_type: String, size: i64| {
            if !url.is_empty() && seen.insert(url.to_string()) {
                enclosures.push(Enclosure {
                    url: url.to_string(),
                    mime_type,
                    size,
                    ..Default::default()
                });
            }
        };

        for thumbnail in media::all_thumbnails(&self.media_thumbnails, &self.media_groups) {
            push(&thumbnail.url, thumbnail.mime_type(), thumbnail.size());
        }

        for link in &self.links {
            if link.rel.eq_ignore_ascii_case("enclosure") {
                push(&link.href, link.link_type.clone(), link.size());
            }
        }

        for content in media::all_contents(&self.media_contents, &self.media_groups) {
            push(&content.url, content.mime_type(), content.size());
        }

        for peer_link in media::all_peer_links(&self.media_peer_links, &self.media_groups) {
            push(&peer_link.url, peer_link.mime_type(), peer_link.size());
        }

        enclosures
    }

    /// `rel="replies"` comment links, HTML/XHTML documents only (RFC 4685);
    /// the default type of an atom:link is application/atom+xml, which is a
    /// comment *feed*, not a comment page.
    fn entry_comments_url(&self) -> String {
        if let Some(link) = atom::first_link_with_relation_and_type(
            &self.links,
            "replies",
            &["text/html", "application/xhtml+xml"],
        ) {
            if urls::is_absolute_url(link.href.trim()) {
                return link.href.trim().to_string();
            }
        }
        String::new()
    }

    fn entry_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|category| {
                let label = category.label.trim();
                if !label.is_empty() {
                    label.to_string()
                } else {
                    category.term.trim().to_string()
                }
            })
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}
