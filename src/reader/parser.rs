//! Feed parsing entry point.
//!
//! `parse_feed` is the whole public contract: raw bytes in, canonical
//! [`Feed`](crate::model::Feed) out. Format selection is the detector's job;
//! each format has its own adapter and they never see each other's input.

use thiserror::Error;

use crate::model::Feed;
use crate::reader::detector::{detect_feed_format, AtomVersion, FeedFormat};
use crate::reader::{atom03, atom10, json, rdf, rss, xml};

/// A parse failure, format-agnostic to the caller.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is neither JSON nor any recognized XML feed dialect.
    #[error("unsupported feed format")]
    UnknownFormat,
    /// The document matched a format but its structure is broken.
    #[error("unable to parse feed: {0}")]
    Malformed(String),
    /// The document declares a charset nothing can transcode.
    #[error(transparent)]
    Decode(#[from] xml::DecodeError),
}

/// Parses a raw feed body fetched from `base_url` into a canonical feed.
///
/// Structurally invalid documents yield an error; missing optional fields
/// never do; adapters degrade them through their fallback chains.
pub fn parse_feed(base_url: &str, body: &[u8]) -> Result<Feed, ParseError> {
    // JSON never goes through the XML shim.
    if first_meaningful_byte(body) == Some(b'{') {
        let document = String::from_utf8_lossy(body);
        return json::parse(base_url, &document);
    }

    let document = xml::decode_document(body)?;
    match detect_feed_format(&document) {
        FeedFormat::Rss => rss::parse(base_url, &document),
        FeedFormat::Atom(AtomVersion::V10) => atom10::parse(base_url, &document),
        FeedFormat::Atom(AtomVersion::V03) => atom03::parse(base_url, &document),
        FeedFormat::Rdf => rdf::parse(base_url, &document),
        FeedFormat::Json => json::parse(base_url, &document),
        FeedFormat::Unknown => Err(ParseError::UnknownFormat),
    }
}

fn first_meaningful_byte(body: &[u8]) -> Option<u8> {
    body.iter().find(|b| !b.is_ascii_whitespace()).copied()
}
