//! Atom link and person constructs shared by both Atom dialects and by the
//! RSS adapter (many RSS feeds embed `atom:link rel="self"`).

use serde::Deserialize;

use crate::reader::scrub;

/// An `atom:link` (or plain Atom `link`) element.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AtomLink {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@rel", default)]
    pub rel: String,
    #[serde(rename = "@type", default)]
    pub link_type: String,
    #[serde(rename = "@length", default)]
    pub length: String,
}

impl AtomLink {
    pub fn size(&self) -> i64 {
        self.length.parse().unwrap_or(0)
    }
}

/// First link whose `rel` matches, case-insensitively.
pub fn first_link_with_relation<'a>(links: &'a [AtomLink], rel: &str) -> Option<&'a AtomLink> {
    links.iter().find(|link| link.rel.eq_ignore_ascii_case(rel))
}

/// First link matching `rel` with one of the given media types.
pub fn first_link_with_relation_and_type<'a>(
    links: &'a [AtomLink],
    rel: &str,
    types: &[&str],
) -> Option<&'a AtomLink> {
    links.iter().find(|link| {
        link.rel.eq_ignore_ascii_case(rel) && types.contains(&link.link_type.as_str())
    })
}

/// The "alternate"/home-page link: `rel="alternate"` preferred, a rel-less
/// link accepted (the Atom default relation is alternate).
pub fn original_link(links: &[AtomLink]) -> String {
    for link in links {
        if link.rel.eq_ignore_ascii_case("alternate") || link.rel.is_empty() {
            return link.href.trim().to_string();
        }
    }
    String::new()
}

/// An Atom person construct (`author`, `contributor`).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AtomPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl AtomPerson {
    pub fn display_name(&self) -> String {
        let value = if !self.name.trim().is_empty() {
            &self.name
        } else {
            &self.email
        };
        scrub::strip_tags(value.trim())
    }
}

/// Joins the non-empty person names with a comma, preserving order.
pub fn join_person_names(persons: &[AtomPerson]) -> String {
    let names: Vec<String> = persons
        .iter()
        .map(AtomPerson::display_name)
        .filter(|name| !name.is_empty())
        .collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(rel: &str, href: &str) -> AtomLink {
        AtomLink {
            href: href.to_string(),
            rel: rel.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_original_link_prefers_alternate() {
        let links = vec![
            link("self", "https://example.org/feed"),
            link("alternate", "https://example.org/"),
        ];
        assert_eq!(original_link(&links), "https://example.org/");
    }

    #[test]
    fn test_original_link_accepts_rel_less() {
        let links = vec![link("", "https://example.org/")];
        assert_eq!(original_link(&links), "https://example.org/");
    }

    #[test]
    fn test_first_link_with_relation_case_insensitive() {
        let links = vec![link("SELF", "https://example.org/feed")];
        assert_eq!(
            first_link_with_relation(&links, "self").unwrap().href,
            "https://example.org/feed"
        );
    }

    #[test]
    fn test_join_person_names() {
        let persons = vec![
            AtomPerson {
                name: "Alice".into(),
                email: String::new(),
            },
            AtomPerson {
                name: String::new(),
                email: "bob@example.org".into(),
            },
        ];
        assert_eq!(join_person_names(&persons), "Alice, bob@example.org");
    }
}
