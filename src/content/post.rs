//! Post models

use serde::{Deserialize, Serialize};

use super::RichText;
use crate::store::Document;

/// Fields shown in the post listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// Full post body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostData {
    pub title: String,
    pub banner: Banner,
    pub author: String,
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// A heading followed by its rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    pub heading: String,
    pub body: RichText,
}

/// A post as it appears in listings and navigation
pub type PostSummary = Document<SummaryData>;

/// A post with its whole content
pub type PostDetail = Document<PostData>;

/// Fields requested for listings
pub fn summary_fields(doc_type: &str) -> Vec<String> {
    ["title", "subtitle", "author"]
        .iter()
        .map(|f| format!("{}.{}", doc_type, f))
        .collect()
}

impl<T> Document<T> {
    /// Whether the document was republished after its first publication
    pub fn is_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }

    /// Route of the post's detail page
    pub fn path(&self) -> Option<String> {
        self.uid.as_deref().map(crate::helpers::post_path)
    }
}
