//! Atom 0.3 adapter: the pre-RFC dialect still served by long-abandoned
//! blogs. Same skeleton as Atom 1.0, but dates live in issued/modified/
//! created and text constructs carry a `mode` attribute.
//!
//! Specs: <https://datatracker.ietf.org/doc/html/draft-ietf-atompub-format-03>

use serde::Deserialize;

use crate::model::{Entry, Feed};
use crate::reader::parser::ParseError;
use crate::reader::{atom, date, identity, scrub, urls};

/// Decodes an Atom 0.3 document and builds the canonical feed.
pub fn parse(base_url: &str, document: &str) -> Result<Feed, ParseError> {
    let wire: Atom03Feed =
        quick_xml::de::from_str(document).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(wire.build_feed(base_url))
}

#[derive(Debug, Default, Deserialize)]
struct Atom03Feed {
    #[serde(default)]
    title: Atom03Text,
    #[serde(rename = "link", default)]
    links: Vec<atom::AtomLink>,
    #[serde(rename = "author", default)]
    author: atom::AtomPerson,
    #[serde(rename = "entry", default)]
    entries: Vec<Atom03Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Atom03Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: Atom03Text,
    #[serde(rename = "link", default)]
    links: Vec<atom::AtomLink>,
    #[serde(default)]
    issued: String,
    #[serde(default)]
    modified: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    author: atom::AtomPerson,
    #[serde(default)]
    content: Atom03Text,
    #[serde(default)]
    summary: Atom03Text,
}

/// An Atom 0.3 content construct.
///
/// `mode="base64"` payloads are treated as opaque and come out empty, which
/// sends the fallback chain to the next candidate; the mode is extinct in
/// practice and no crate in this stack decodes it.
#[derive(Debug, Default, Deserialize)]
struct Atom03Text {
    #[serde(rename = "@mode", default)]
    mode: String,
    #[serde(rename = "$text", default)]
    value: String,
}

impl Atom03Text {
    fn as_str(&self) -> &str {
        if self.mode == "base64" {
            return "";
        }
        self.value.trim()
    }
}

impl Atom03Feed {
    fn build_feed(&self, base_url: &str) -> Feed {
        let mut feed = Feed::default();

        let self_link = atom::first_link_with_relation(&self.links, "self")
            .map(|link| link.href.trim().to_string())
            .unwrap_or_default();
        let feed_url = if self_link.is_empty() {
            base_url.to_string()
        } else {
            self_link
        };
        feed.feed_url = urls::absolute_url(base_url, &feed_url).unwrap_or(feed_url);

        let site_link = atom::original_link(&self.links);
        feed.site_url = urls::absolute_url(base_url, &site_link).unwrap_or(site_link);

        feed.title = html_escape::decode_html_entities(self.title.as_str()).into_owned();
        if feed.title.is_empty() {
            feed.title = feed.site_url.clone();
        }

        let feed_author = self.author.display_name();

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

impl Atom03Entry {
    fn build_entry(&self) -> Entry {
        let mut entry = Entry::new();
        entry.url = atom::original_link(&self.links);
        entry.date = self.entry_date();
        entry.author = self.author.display_name();
        entry.hash = identity::entry_hash([self.id.as_str(), entry.url.as_str()]);
        entry.content = self.entry_content();
        entry.title = html_escape::decode_html_entities(self.title.as_str()).into_owned();
        entry
    }

    fn entry_date(&self) -> chrono::DateTime<chrono::Utc> {
        let value = [&self.issued, &self.modified, &self.created]
            .into_iter()
            .find(|v| !v.is_empty());

        if let Some(value) = value {
            match date::parse(value) {
                Ok(parsed) => return parsed,
                Err(err) => {
                    tracing::debug!(date = %value, id = %self.id, error = %err, "Unparseable Atom 0.3 entry date");
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
        self.summary.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_feed() {
        let data = r#"<?xml version="1.0" encoding="utf-8"?>
<feed version="0.3" xmlns="http://purl.org/atom/ns#">
  <title>dive into mark</title>
  <link rel="alternate" type="text/html" href="http://diveintomark.org/"/>
  <modified>2003-12-13T18:30:02Z</modified>
  <author><name>Mark Pilgrim</name></author>
  <entry>
    <title>Atom 0.3 snapshot</title>
    <link rel="alternate" type="text/html" href="http://diveintomark.org/2003/12/13/atom03"/>
    <id>tag:diveintomark.org,2003:3.2397</id>
    <issued>2003-12-13T08:29:29-04:00</issued>
    <summary type="text/plain">This is a test</summary>
  </entry>
</feed>"#;
        let feed = parse("http://diveintomark.org/feed.atom", data).unwrap();
        assert_eq!(feed.title, "dive into mark");
        assert_eq!(feed.site_url, "http://diveintomark.org/");
        assert_eq!(feed.entries.len(), 1);

        let entry = &feed.entries[0];
        assert_eq!(entry.title, "Atom 0.3 snapshot");
        assert_eq!(entry.author, "Mark Pilgrim");
        assert_eq!(entry.content, "This is a test");
        assert_eq!(
            entry.hash,
            identity::hash_value("tag:diveintomark.org,2003:3.2397")
        );
    }

    #[test]
    fn test_issued_preferred_over_modified() {
        let data = r#"<feed version="0.3" xmlns="http://purl.org/atom/ns#">
  <title>T</title>
  <entry>
    <id>x</id><title>E</title>
    <issued>2003-12-13T08:29:29Z</issued>
    <modified>2005-01-01T00:00:00Z</modified>
  </entry>
</feed>"#;
        let feed = parse("http://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].date.to_rfc3339(), "2003-12-13T08:29:29+00:00");
    }

    #[test]
    fn test_base64_content_degrades_to_summary() {
        let data = r#"<feed version="0.3" xmlns="http://purl.org/atom/ns#">
  <title>T</title>
  <entry>
    <id>x</id><title>E</title>
    <content mode="base64">PGI+YmFzZTY0PC9iPg==</content>
    <summary>fallback text</summary>
  </entry>
</feed>"#;
        let feed = parse("http://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].content, "fallback text");
    }
}
