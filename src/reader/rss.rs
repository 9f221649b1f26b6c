//! RSS 2.0 adapter, including the Dublin Core, iTunes, GooglePlay,
//! Media RSS, and FeedBurner extension namespaces.
//!
//! Specs: <https://www.rssboard.org/rss-specification>

use serde::Deserialize;

use crate::model::{Enclosure, Entry, Feed};
use crate::reader::parser::ParseError;
use crate::reader::{atom, date, identity, itunes, media, scrub, urls};

/// Decodes an RSS document and builds the canonical feed.
pub fn parse(base_url: &str, document: &str) -> Result<Feed, ParseError> {
    let wire: RssFeed =
        quick_xml::de::from_str(document).map_err(|e| ParseError::Malformed(e.to_string()))?;
    Ok(wire.build_feed(base_url))
}

#[derive(Debug, Default, Deserialize)]
struct RssFeed {
    #[serde(default)]
    channel: RssChannel,
}

#[derive(Debug, Default, Deserialize)]
struct RssChannel {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    image: Option<RssImage>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
    #[serde(rename = "managingEditor", default)]
    managing_editor: String,
    #[serde(rename = "webMaster", default)]
    webmaster: String,
    #[serde(default)]
    ttl: String,
    #[serde(rename = "atom:link", default)]
    atom_links: Vec<atom::AtomLink>,
    #[serde(rename = "itunes:author", default)]
    itunes_author: String,
    #[serde(rename = "itunes:owner", default)]
    itunes_owner: Option<itunes::ItunesOwner>,
    #[serde(rename = "itunes:category", default)]
    itunes_categories: Vec<itunes::ItunesCategory>,
    #[serde(rename = "googleplay:author", default)]
    googleplay_author: String,
    #[serde(rename = "googleplay:category", default)]
    googleplay_category: Option<GooglePlayCategory>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Default, Deserialize)]
struct RssImage {
    #[serde(default)]
    url: String,
}

/// `googleplay:category` carries its value in a `text` attribute.
#[derive(Debug, Default, Deserialize)]
struct GooglePlayCategory {
    #[serde(rename = "@text", default)]
    text: String,
}

/// An `atom:author` embedded in an RSS item; children keep the atom prefix.
#[derive(Debug, Default, Deserialize)]
struct RssAtomAuthor {
    #[serde(rename = "atom:name", default)]
    name: String,
    #[serde(rename = "atom:email", default)]
    email: String,
}

impl RssAtomAuthor {
    fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            self.name.trim()
        } else {
            self.email.trim()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RssGuid {
    #[serde(rename = "@isPermaLink", default)]
    is_permalink: Option<String>,
    #[serde(rename = "$text", default)]
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct RssEnclosure {
    #[serde(rename = "@url", default)]
    url: String,
    #[serde(rename = "@type", default)]
    mime_type: String,
    #[serde(rename = "@length", default)]
    length: String,
}

impl RssEnclosure {
    fn size(&self) -> i64 {
        self.length.parse().unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RssItem {
    #[serde(default)]
    guid: Option<RssGuid>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    comments: String,
    #[serde(rename = "enclosure", default)]
    enclosure_links: Vec<RssEnclosure>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
    // Dublin Core + content module
    #[serde(rename = "dc:creator", default)]
    dc_creator: String,
    #[serde(rename = "dc:date", default)]
    dc_date: String,
    #[serde(rename = "dc:title", default)]
    dc_title: String,
    #[serde(rename = "content:encoded", default)]
    content_encoded: String,
    // iTunes
    #[serde(rename = "itunes:author", default)]
    itunes_author: String,
    #[serde(rename = "itunes:subtitle", default)]
    itunes_subtitle: String,
    #[serde(rename = "itunes:summary", default)]
    itunes_summary: String,
    // GooglePlay
    #[serde(rename = "googleplay:author", default)]
    googleplay_author: String,
    #[serde(rename = "googleplay:description", default)]
    googleplay_description: String,
    // FeedBurner rewrites the native link/enclosure URLs and stashes the
    // originals in its own namespace.
    #[serde(rename = "atom:author", default)]
    atom_author: RssAtomAuthor,
    #[serde(rename = "feedburner:origLink", default)]
    feedburner_link: String,
    #[serde(rename = "feedburner:origEnclosureLink", default)]
    feedburner_enclosure_link: String,
    #[serde(rename = "atom:link", default)]
    atom_links: Vec<atom::AtomLink>,
    // Media RSS
    #[serde(rename = "media:content", default)]
    media_contents: Vec<media::MediaContent>,
    #[serde(rename = "media:thumbnail", default)]
    media_thumbnails: Vec<media::MediaThumbnail>,
    #[serde(rename = "media:peerLink", default)]
    media_peer_links: Vec<media::MediaPeerLink>,
    #[serde(rename = "media:group", default)]
    media_groups: Vec<media::MediaGroup>,
    #[serde(rename = "media:category", default)]
    media_categories: Vec<media::MediaCategory>,
}

impl RssFeed {
    fn build_feed(&self, base_url: &str) -> Feed {
        let mut feed = Feed::default();

        let site_url = self.channel.link.trim();
        feed.site_url =
            urls::absolute_url(base_url, site_url).unwrap_or_else(|_| site_url.to_string());

        let self_link = self.self_link();
        let feed_url = if self_link.is_empty() {
            base_url
        } else {
            self_link.as_str()
        };
        feed.feed_url =
            urls::absolute_url(base_url, feed_url).unwrap_or_else(|_| feed_url.to_string());

        feed.title =
            html_escape::decode_html_entities(self.channel.title.trim()).into_owned();
        if feed.title.is_empty() {
            feed.title = feed.site_url.clone();
        }

        if let Some(image) = &self.channel.image {
            feed.icon_url = image.url.trim().to_string();
        }
        feed.ttl = self.channel.ttl.parse().unwrap_or(0);

        let feed_author = self.feed_author();
        let feed_tags = self.feed_tags();

        for item in &self.channel.items {
            let mut entry = item.build_entry(&feed.site_url);

            if entry.author.is_empty() {
                entry.author = feed_author.clone();
            }

            entry.tags.extend(feed_tags.iter().cloned());
            dedup_tags(&mut entry.tags);

            feed.entries.push(entry);
        }

        feed
    }

    /// `atom:link rel="self"` on the channel, when the feed carries one.
    fn self_link(&self) -> String {
        atom::first_link_with_relation(&self.channel.atom_links, "self")
            .map(|link| link.href.trim().to_string())
            .unwrap_or_default()
    }

    fn feed_author(&self) -> String {
        let owner = self
            .channel
            .itunes_owner
            .as_ref()
            .map(itunes::ItunesOwner::display_name)
            .unwrap_or_default();

        let author = [
            &self.channel.itunes_author,
            &self.channel.googleplay_author,
            &owner,
            &self.channel.managing_editor,
            &self.channel.webmaster,
        ]
        .into_iter()
        .find(|value| !value.trim().is_empty())
        .map(|s| s.as_str())
        .unwrap_or_default();

        scrub::strip_tags(author.trim())
    }

    /// Channel-level categories shared by every entry: plain RSS categories,
    /// iTunes categories (with subcategories), GooglePlay category.
    fn feed_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .channel
            .categories
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        tags.extend(itunes::category_texts(&self.channel.itunes_categories));
        if let Some(category) = &self.channel.googleplay_category {
            if !category.text.is_empty() {
                tags.push(category.text.clone());
            }
        }
        tags
    }
}

impl RssItem {
    fn build_entry(&self, site_url: &str) -> Entry {
        let mut entry = Entry::new();
        entry.url = self.entry_url();
        entry.comments_url = self.entry_comments_url();
        entry.date = self.entry_date();
        entry.author = self.entry_author();
        entry.hash = self.entry_hash();
        entry.content = self.entry_content();
        entry.title = self.entry_title();
        entry.enclosures = self.entry_enclosures(site_url);
        entry.tags = self.entry_tags();

        // Relative entry URLs resolve against the site URL, not the feed URL.
        if entry.url.is_empty() {
            entry.url = site_url.to_string();
        } else if let Ok(absolute) = urls::absolute_url(site_url, &entry.url) {
            entry.url = absolute;
        }

        if entry.title.is_empty() {
            entry.title = scrub::truncate_html(&entry.content, 100);
        }
        if entry.title.is_empty() {
            entry.title = entry.url.clone();
        }

        entry
    }

    fn entry_url(&self) -> String {
        for link in [&self.feedburner_link, &self.link] {
            if !link.trim().is_empty() {
                return link.trim().to_string();
            }
        }

        for link in &self.atom_links {
            if !link.href.is_empty()
                && (link.rel.eq_ignore_ascii_case("alternate") || link.rel.is_empty())
            {
                return link.href.trim().to_string();
            }
        }

        // isPermaLink defaults to true; a false value means the guid is not
        // assumed to be a URL to anything in particular.
        if let Some(guid) = &self.guid {
            match guid.is_permalink.as_deref() {
                Some("true") | None => return guid.data.trim().to_string(),
                _ => {}
            }
        }

        String::new()
    }

    fn entry_comments_url(&self) -> String {
        let comments_url = self.comments.trim();
        if !comments_url.is_empty() && urls::is_absolute_url(comments_url) {
            return comments_url.to_string();
        }
        String::new()
    }

    fn entry_date(&self) -> chrono::DateTime<chrono::Utc> {
        let value = if !self.dc_date.is_empty() {
            &self.dc_date
        } else {
            &self.pub_date
        };

        if !value.is_empty() {
            match date::parse(value) {
                Ok(parsed) => return parsed,
                Err(err) => {
                    tracing::debug!(date = %value, error = %err, "Unparseable RSS item date");
                }
            }
        }

        chrono::Utc::now()
    }

    fn entry_author(&self) -> String {
        let atom_author = self.atom_author.display_name();
        let author = [
            self.googleplay_author.as_str(),
            self.itunes_author.as_str(),
            self.dc_creator.as_str(),
            atom_author,
            self.author.as_str(),
        ]
        .into_iter()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_default();

        scrub::strip_tags(author.trim())
    }

    fn entry_hash(&self) -> String {
        let guid = self
            .guid
            .as_ref()
            .map(|g| g.data.trim())
            .unwrap_or_default();
        identity::entry_hash([guid, self.entry_url().as_str()])
    }

    fn entry_title(&self) -> String {
        let title = if !self.dc_title.is_empty() {
            &self.dc_title
        } else {
            &self.title
        };
        html_escape::decode_html_entities(title.trim()).into_owned()
    }

    fn entry_content(&self) -> String {
        for value in [
            &self.content_encoded,
            &self.description,
            &self.googleplay_description,
            &self.itunes_summary,
            &self.itunes_subtitle,
        ] {
            if !value.is_empty() {
                return value.clone();
            }
        }
        String::new()
    }

    fn entry_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .categories
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        tags.extend(media::category_labels(&self.media_categories));
        tags
    }

    fn entry_enclosures(&self, site_url: &str) -> Vec<Enclosure> {
        let mut enclosures = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let mut push = |url: &str, mime_type: String, size: i64| {
            if url.is_empty() {
                return;
            }
            let resolved = urls::absolute_url(site_url, url).unwrap_or_else(|_| url.to_string());
            if seen.insert(resolved.clone()) {
                enclosures.push(Enclosure {
                    url: resolved,
                    mime_type,
                    size,
                    ..Default::default()
                });
            }
        };

        for thumbnail in media::all_thumbnails(&self.media_thumbnails, &self.media_groups) {
            push(&thumbnail.url, thumbnail.mime_type(), thumbnail.size());
        }

        for enclosure in &self.enclosure_links {
            let mut enclosure_url = enclosure.url.clone();

            // FeedBurner rewrites enclosure URLs through its tracker; prefer
            // the original when it points at the same file.
            if !self.feedburner_enclosure_link.is_empty() {
                let filename = self
                    .feedburner_enclosure_link
                    .rsplit('/')
                    .next()
                    .unwrap_or_default();
                if !filename.is_empty() && enclosure_url.contains(filename) {
                    enclosure_url = self.feedburner_enclosure_link.clone();
                }
            }

            push(&enclosure_url, enclosure.mime_type.clone(), enclosure.size());
        }

        for content in media::all_contents(&self.media_contents, &self.media_groups) {
            push(&content.url, content.mime_type(), content.size());
        }

        for peer_link in media::all_peer_links(&self.media_peer_links, &self.media_groups) {
            push(&peer_link.url, peer_link.mime_type(), peer_link.size());
        }

        enclosures
    }
}

/// Order-preserving tag dedup.
fn dedup_tags(tags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    tags.retain(|tag| seen.insert(tag.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_feed() {
        let data = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <link>https://example.org/</link>
    <item>
      <title>First</title>
      <link>https://example.org/first</link>
      <guid>post-1</guid>
      <pubDate>Tue, 03 Jun 2003 09:39:21 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

        let feed = parse("https://example.org/feed.xml", data).unwrap();
        assert_eq!(feed.title, "Example Feed");
        assert_eq!(feed.site_url, "https://example.org/");
        assert_eq!(feed.feed_url, "https://example.org/feed.xml");
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title, "First");
        assert_eq!(feed.entries[0].url, "https://example.org/first");
        assert!(!feed.entries[0].hash.is_empty());
    }

    #[test]
    fn test_self_link_becomes_feed_url() {
        let data = r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>T</title>
    <link>https://example.org/</link>
    <atom:link rel="self" href="https://example.org/rss.xml"/>
  </channel>
</rss>"#;
        let feed = parse("https://fetch.example.org/x", data).unwrap();
        assert_eq!(feed.feed_url, "https://example.org/rss.xml");
    }

    #[test]
    fn test_guid_permalink_used_as_url() {
        let data = r#"<rss version="2.0"><channel>
  <title>T</title><link>https://example.org/</link>
  <item><guid isPermaLink="true">https://example.org/from-guid</guid></item>
  <item><guid isPermaLink="false">not-a-url</guid></item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].url, "https://example.org/from-guid");
        // Non-permalink guid falls back to the site URL.
        assert_eq!(feed.entries[1].url, "https://example.org/");
    }

    #[test]
    fn test_hash_prefers_guid_over_url() {
        let a = r#"<rss version="2.0"><channel><title>T</title><link>https://example.org/</link>
  <item><guid>stable-guid</guid><link>https://example.org/a</link></item>
</channel></rss>"#;
        let b = r#"<rss version="2.0"><channel><title>T</title><link>https://example.org/</link>
  <item><guid>stable-guid</guid><link>https://example.org/a?utm_source=feed</link></item>
</channel></rss>"#;
        let feed_a = parse("https://example.org/feed", a).unwrap();
        let feed_b = parse("https://example.org/feed", b).unwrap();
        assert_eq!(feed_a.entries[0].hash, feed_b.entries[0].hash);
    }

    #[test]
    fn test_entry_without_title_uses_content_then_url() {
        let data = r#"<rss version="2.0"><channel><title>T</title><link>https://example.org/</link>
  <item><link>https://example.org/a</link><description>Some description text</description></item>
  <item><link>https://example.org/b</link></item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].title, "Some description text");
        assert_eq!(feed.entries[1].title, "https://example.org/b");
    }

    #[test]
    fn test_feedburner_original_link_wins() {
        let data = r#"<rss version="2.0" xmlns:feedburner="http://rssnamespace.org/feedburner/ext/1.0">
<channel><title>T</title><link>https://example.org/</link>
  <item>
    <link>https://feedproxy.google.com/~r/x/y</link>
    <feedburner:origLink>https://example.org/real</feedburner:origLink>
  </item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].url, "https://example.org/real");
    }

    #[test]
    fn test_enclosure_dedup_across_constructs() {
        let data = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
<channel><title>T</title><link>https://example.org/</link>
  <item>
    <guid>g</guid>
    <enclosure url="https://example.org/a.mp3" type="audio/mpeg" length="123"/>
    <media:content url="https://example.org/a.mp3" type="audio/mpeg"/>
  </item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].enclosures.len(), 1);
        assert_eq!(feed.entries[0].enclosures[0].size, 123);
    }

    #[test]
    fn test_media_medium_wildcard_mime() {
        let data = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
<channel><title>T</title><link>https://example.org/</link>
  <item><guid>g</guid><media:content url="https://example.org/pic" medium="image"/></item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].enclosures[0].mime_type, "image/*");
    }

    #[test]
    fn test_dublin_core_fields() {
        let data = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel><title>T</title><link>https://example.org/</link>
  <item>
    <title>X</title>
    <dc:creator>Jane Author</dc:creator>
    <dc:date>2019-01-26T08:02:28Z</dc:date>
    <content:encoded><![CDATA[<p>Full body</p>]]></content:encoded>
    <description>short</description>
  </item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        let entry = &feed.entries[0];
        assert_eq!(entry.author, "Jane Author");
        assert_eq!(entry.content, "<p>Full body</p>");
        assert_eq!(entry.date.to_rfc3339(), "2019-01-26T08:02:28+00:00");
    }

    #[test]
    fn test_feed_author_fallback_for_entries() {
        let data = r#"<rss version="2.0"><channel>
  <title>T</title><link>https://example.org/</link>
  <managingEditor>editor@example.org</managingEditor>
  <item><title>X</title><guid>g</guid></item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].author, "editor@example.org");
    }

    #[test]
    fn test_atom_author_fallback_in_rss_item() {
        let data = r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel><title>T</title><link>https://example.org/</link>
  <item>
    <title>X</title><guid>g</guid>
    <atom:author><atom:name>Atom Person</atom:name></atom:author>
  </item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].author, "Atom Person");
    }

    #[test]
    fn test_channel_categories_become_tags() {
        let data = r#"<rss version="2.0"><channel>
  <title>T</title><link>https://example.org/</link>
  <category>News</category>
  <item><guid>g</guid><category>News</category><category>Tech</category></item>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.entries[0].tags, vec!["News", "Tech"]);
    }

    #[test]
    fn test_ttl_parsed() {
        let data = r#"<rss version="2.0"><channel>
  <title>T</title><link>https://example.org/</link><ttl>90</ttl>
</channel></rss>"#;
        let feed = parse("https://example.org/feed", data).unwrap();
        assert_eq!(feed.ttl, 90);
    }

    #[test]
    fn test_malformed_document_errors() {
        assert!(parse("https://example.org/", "<rss><channel>").is_err());
    }
}
