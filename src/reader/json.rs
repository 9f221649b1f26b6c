//! JSON Feed adapter, v1 and v1.1.
//!
//! Specs:
//! <https://www.jsonfeed.org/version/1.1/>
//! <https://www.jsonfeed.org/version/1/>

use serde::Deserialize;

use crate::model::{Enclosure, Entry, Feed};
use crate::reader::parser::ParseError;
use crate::reader::{date, identity, scrub, urls};

/// Decodes a JSON Feed document and builds the canonical feed.
pub fn parse(base_url: &str, document: &str) -> Result<Feed, ParseError> {
    let wire: JsonFeed =
        serde_json::from_str(document).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(wire.build_feed(base_url))
}

#[derive(Debug, Default, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    title: String,
    #[serde(default)]
    home_page_url: String,
    #[serde(default)]
    feed_url: String,
    #[serde(rename = "icon", default)]
    icon_url: String,
    #[serde(rename = "favicon", default)]
    favicon_url: String,
    /// v1.1 plural form.
    #[serde(default)]
    authors: Vec<JsonAuthor>,
    /// v1 singular form, deprecated but still common.
    #[serde(default)]
    author: JsonAuthor,
    #[serde(default)]
    items: Vec<JsonItem>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct JsonAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct JsonItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content_html: String,
    #[serde(default)]
    content_text: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    date_published: String,
    #[serde(default)]
    date_modified: String,
    #[serde(default)]
    authors: Vec<JsonAuthor>,
    #[serde(default)]
    author: JsonAuthor,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    attachments: Vec<JsonAttachment>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonAttachment {
    #[serde(default)]
    url: String,
    #[serde(default)]
    mime_type: String,
    #[serde(rename = "size_in_bytes", default)]
    size: i64,
}

impl JsonFeed {
    fn build_feed(&self, base_url: &str) -> Feed {
        let mut feed = Feed::default();
        feed.title = self.title.trim().to_string();
        feed.feed_url = self.feed_url.trim().to_string();
        feed.site_url = self.home_page_url.trim().to_string();

        if feed.feed_url.is_empty() {
            feed.feed_url = base_url.trim().to_string();
        }
        if feed.site_url.is_empty() {
            feed.site_url = feed.feed_url.clone();
        }

        if let Ok(absolute) = urls::absolute_url(base_url, &feed.feed_url) {
            feed.feed_url = absolute;
        }
        if let Ok(absolute) = urls::absolute_url(base_url, &feed.site_url) {
            feed.site_url = absolute;
        }

        if feed.title.is_empty() {
            feed.title = feed.site_url.clone();
        }

        for icon_url in [&self.favicon_url, &self.icon_url] {
            let icon_url = icon_url.trim();
            if !icon_url.is_empty() {
                if let Ok(absolute) = urls::absolute_url(&feed.site_url, icon_url) {
                    feed.icon_url = absolute;
                    break;
                }
            }
        }

        for item in &self.items {
            feed.entries
                .push(item.build_entry(&feed.site_url, &self.authors, &self.author));
        }

        feed
    }
}

impl JsonItem {
    fn build_entry(
        &self,
        site_url: &str,
        feed_authors: &[JsonAuthor],
        feed_author: &JsonAuthor,
    ) -> Entry {
        let mut entry = Entry::new();
        entry.title = self.title.trim().to_string();
        entry.url = self.url.trim().to_string();

        if let Ok(absolute) = urls::absolute_url(site_url, &entry.url) {
            entry.url = absolute;
        }

        // Microblog items habitually omit titles.
        if entry.title.is_empty() {
            for value in [&self.summary, &self.content_text, &self.content_html] {
                if !value.is_empty() {
                    entry.title = scrub::truncate_html(value, 100);
                    break;
                }
            }
        }
        if entry.title.is_empty() {
            entry.title = entry.url.clone();
        }

        for value in [&self.content_html, &self.content_text, &self.summary] {
            let value = value.trim();
            if !value.is_empty() {
                entry.content = value.to_string();
                break;
            }
        }

        for value in [&self.date_published, &self.date_modified] {
            let value = value.trim();
            if !value.is_empty() {
                match date::parse(value) {
                    Ok(parsed) => {
                        entry.date = parsed;
                        break;
                    }
                    Err(err) => {
                        tracing::debug!(date = %value, url = %entry.url, error = %err, "Unparseable JSON feed date");
                    }
                }
            }
        }

        entry.author = self.entry_author(feed_authors, feed_author);
        entry.hash = identity::entry_hash([
            self.id.trim(),
            entry.url.as_str(),
            format!("{}{}{}", self.title, self.content_html, self.content_text).as_str(),
        ]);
        entry.tags = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        for attachment in &self.attachments {
            let attachment_url = attachment.url.trim();
            if attachment_url.is_empty() {
                continue;
            }
            if let Ok(absolute) = urls::absolute_url(site_url, attachment_url) {
                entry.enclosures.push(Enclosure {
                    url: absolute,
                    mime_type: attachment.mime_type.clone(),
                    size: attachment.size,
                    ..Default::default()
                });
            }
        }

        entry
    }

    /// All author names across the v1/v1.1 feed- and item-level fields,
    /// deduplicated and joined.
    fn entry_author(&self, feed_authors: &[JsonAuthor], feed_author: &JsonAuthor) -> String {
        let mut names: Vec<String> = feed_authors
            .iter()
            .chain(self.authors.iter())
            .chain([&self.author, feed_author])
            .map(|author| author.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        names.sort();
        names.dedup();
        names.join(", ")
    }
}
