//! Feed ingestion: detection, decoding, parsing, and lifecycle handling.
//!
//! The path a raw body takes:
//!
//! 1. [`xml`] cleans up encodings, illegal characters, and HTML entities
//! 2. [`detector`] classifies the document without fully parsing it
//! 3. one of [`rss`], [`atom10`], [`atom03`], [`json`], [`rdf`] decodes it
//!    into the canonical model, with [`identity`] supplying the dedup hash
//! 4. [`processor`] applies the feed's filter rules
//! 5. [`handler`] orchestrates the whole fetch → parse → merge lifecycle
//!
//! [`date`], [`scrub`], [`urls`], [`media`], [`itunes`], and [`atom`] are the
//! shared helpers the adapters lean on.

pub mod atom;
pub mod atom03;
pub mod atom10;
pub mod date;
pub mod detector;
pub mod handler;
pub mod icon;
pub mod identity;
pub mod itunes;
pub mod json;
pub mod media;
pub mod parser;
pub mod processor;
pub mod rdf;
pub mod rss;
pub mod scrub;
pub mod urls;
pub mod xml;
