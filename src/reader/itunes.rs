//! iTunes podcast extension elements (`itunes:*` namespace).
//!
//! Specs: <https://help.apple.com/itc/podcasts_connect/#/itcb54353390>

use serde::Deserialize;

/// `itunes:category`, with one optional nested subcategory level.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ItunesCategory {
    #[serde(rename = "@text", default)]
    pub text: String,
    #[serde(rename = "itunes:category")]
    pub subcategory: Option<Box<ItunesCategory>>,
}

/// Category texts flattened with their subcategories.
pub fn category_texts(categories: &[ItunesCategory]) -> Vec<String> {
    let mut texts = Vec::new();
    for category in categories {
        if !category.text.is_empty() {
            texts.push(category.text.clone());
        }
        if let Some(sub) = &category.subcategory {
            if !sub.text.is_empty() {
                texts.push(sub.text.clone());
            }
        }
    }
    texts
}

/// `itunes:owner`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ItunesOwner {
    #[serde(rename = "itunes:name", default)]
    pub name: String,
    #[serde(rename = "itunes:email", default)]
    pub email: String,
}

impl ItunesOwner {
    /// Owner display name: name preferred, email as fallback.
    pub fn display_name(&self) -> String {
        let name = if !self.name.is_empty() {
            &self.name
        } else {
            &self.email
        };
        name.trim().to_string()
    }
}
