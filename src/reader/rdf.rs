//! RDF / RSS 1.0 adapter, with Dublin Core extensions.
//!
//! RSS 1.0 keeps its items as siblings of the channel, not inside it, and
//! leans on Dublin Core for dates and authorship.
//!
//! Specs: <https://web.resource.org/rss/1.0/spec>

use serde::Deserialize;

use crate::model::{Entry, Feed};
use crate::reader::parser::ParseError;
use crate::reader::{date, identity, scrub, urls};

/// Decodes an RDF document and builds the canonical feed.
pub fn parse(base_url: &str, document: &str) -> Result<Feed, ParseError> {
    let wire: RdfFeed =
        quick_xml::de::from_str(document).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(wire.build_feed(base_url))
}

#[derive(Debug, Default, Deserialize)]
struct RdfFeed {
    #[serde(default)]
    channel: RdfChannel,
    #[serde(rename = "item", default)]
    items: Vec<RdfItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RdfChannel {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "dc:creator", default)]
    dc_creator: String,
}

#[derive(Debug, Default, Deserialize)]
struct RdfItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "dc:title", default)]
    dc_title: String,
    #[serde(rename = "dc:creator", default)]
    dc_creator: String,
    #[serde(rename = "dc:date", default)]
    dc_date: String,
    #[serde(rename = "content:encoded", default)]
    content_encoded: String,
}

impl RdfFeed {
    fn build_feed(&self, base_url: &str) -> Feed {
        let mut feed = Feed::default();
        feed.title = scrub::strip_tags(&self.channel.title);
        feed.feed_url = base_url.to_string();
        feed.site_url = urls::absolute_url(base_url, self.channel.link.trim())
            .unwrap_or_else(|_| self.channel.link.trim().to_string());

        if feed.title.is_empty() {
            feed.title = feed.site_url.clone();
        }

        let feed_author = scrub::strip_tags(self.channel.dc_creator.trim());

        for item in &self.items {
            let mut entry = item.build_entry();

            if entry.author.is_empty() {
                entry.author = feed_author.clone();
            }

            if entry.url.is_empty() {
                entry.url = feed.site_url.clone();
            } else if let Ok(absolute) = urls::absolute_url(&feed.site_url, &entry.url) {
                entry.url = absolute;
            }

            feed.entries.push(entry);
        }

        feed
    }
}

impl RdfItem {
    fn build_entry(&self) -> Entry {
        let mut entry = Entry::new();
        entry.title = self.entry_title();
        entry.author = scrub::strip_tags(self.dc_creator.trim());
        entry.url = self.link.trim().to_string();
        entry.content = self.entry_content();
        entry.hash = self.entry_hash();
        entry.date = self.entry_date();

        if entry.title.is_empty() {
            entry.title = entry.url.clone();
        }
        entry
    }

    fn entry_title(&self) -> String {
        for title in [&self.title, &self.dc_title] {
            let title = title.trim();
            if !title.is_empty() {
                return html_escape::decode_html_entities(title).into_owned();
            }
        }
        String::new()
    }

    fn entry_content(&self) -> String {
        if !self.content_encoded.is_empty() {
            return self.content_encoded.clone();
        }
        self.description.clone()
    }

    /// Without GUIDs, the link is the best identity; a link-less item hashes
    /// its title+description composite, even when that composite is empty.
    fn entry_hash(&self) -> String {
        let value = if !self.link.is_empty() {
            self.link.clone()
        } else {
            format!("{}{}", self.title, self.description)
        };
        identity::hash_value(&value)
    }

    fn entry_date(&self) -> chrono::DateTime<chrono::Utc> {
        if !self.dc_date.is_empty() {
            match date::parse(&self.dc_date) {
                Ok(parsed) => return parsed,
                Err(err) => {
                    tracing::debug!(date = %self.dc_date, link = %self.link, error = %err, "Unparseable RDF item date");
                }
            }
        }
        chrono::Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_feed() {
        let data = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.org/">
    <title>Meerkat</title>
    <link>https://example.org/</link>
  </channel>
  <item rdf:about="https://example.org/item1">
    <title>XML: A Disruptive Technology</title>
    <link>https://example.org/item1</link>
    <description>XML is placing increasingly heavy loads...</description>
    <dc:creator>Simon St.Laurent</dc:creator>
    <dc:date>2000-01-02T12:00:00Z</dc:date>
  </item>
</rdf:RDF>"#;
        let feed = parse("https://example.org/rss.rdf", data).unwrap();
        assert_eq!(feed.title, "Meerkat");
        assert_eq!(feed.feed_url, "https://example.org/rss.rdf");
        assert_eq!(feed.site_url, "https://example.org/");
        assert_eq!(feed.entries.len(), 1);

        let entry = &feed.entries[0];
        assert_eq!(entry.title, "XML: A Disruptive Technology");
        assert_eq!(entry.author, "Simon St.Laurent");
        assert_eq!(entry.date.to_rfc3339(), "2000-01-02T12:00:00+00:00");
        assert_eq!(entry.hash, identity::hash_value("https://example.org/item1"));
    }

    #[test]
    fn test_item_without_anything_still_hashes() {
        let data = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel><title>T</title><link>https://example.org/</link></channel>
  <item></item>
</rdf:RDF>"#;
        let feed = parse("https://example.org/rss.rdf", data).unwrap();
        let entry = &feed.entries[0];
        // Empty composite still yields a deterministic hash.
        assert_eq!(entry.hash, identity::hash_value(""));
        assert_eq!(entry.url, "https://example.org/");
    }

    #[test]
    fn test_relative_item_link_resolves_against_site() {
        let data = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel><title>T</title><link>https://example.org/news/</link></channel>
  <item><title>A</title><link>/story/1</link></item>
</rdf:RDF>"#;
        let feed = parse("https://example.org/rss.rdf", data).unwrap();
        assert_eq!(feed.entries[0].url, "https://example.org/story/1");
    }
}
