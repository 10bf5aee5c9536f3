//! Document envelope and search response shapes

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::StoreError;

/// A document as returned by the store, generic over its `data` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T = serde_json::Value> {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, with = "publication_date")]
    pub first_publication_date: Option<DateTime<Utc>>,
    #[serde(default, with = "publication_date")]
    pub last_publication_date: Option<DateTime<Utc>>,
    pub data: T,
}

/// A document whose data has not been decoded yet
pub type RawDocument = Document<serde_json::Value>;

impl RawDocument {
    /// Decode `data` into a typed payload
    pub fn decode<T: DeserializeOwned>(self) -> Result<Document<T>, StoreError> {
        Ok(Document {
            data: serde_json::from_value(self.data)?,
            id: self.id,
            uid: self.uid,
            doc_type: self.doc_type,
            first_publication_date: self.first_publication_date,
            last_publication_date: self.last_publication_date,
        })
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T = serde_json::Value> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub results_size: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    pub results: Vec<Document<T>>,
}

fn first_page() -> u32 {
    1
}

/// Publication timestamps come as `2021-03-25T19:25:28+0000`, which is not
/// RFC 3339, so both spellings are accepted.
mod publication_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const PRISMIC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, PRISMIC_FORMAT))
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(PRISMIC_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_prismic_dates() {
        let json = r#"{
            "id": "YF1",
            "uid": "como-utilizar-hooks",
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-25T19:25:28+00:00",
            "data": {"title": "Como utilizar Hooks"}
        }"#;
        let doc: RawDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(
            doc.first_publication_date,
            Some(Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap())
        );
        assert_eq!(
            doc.last_publication_date,
            Some(Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap())
        );
    }

    #[test]
    fn test_null_dates() {
        let json = r#"{"id": "a", "type": "posts", "first_publication_date": null, "data": {}}"#;
        let doc: RawDocument = serde_json::from_str(json).unwrap();
        assert!(doc.first_publication_date.is_none());
        assert!(doc.last_publication_date.is_none());
        assert!(doc.uid.is_none());
    }

    #[test]
    fn test_rejects_garbage_date() {
        let json = r#"{"id": "a", "type": "posts", "first_publication_date": "yesterday", "data": {}}"#;
        assert!(serde_json::from_str::<RawDocument>(json).is_err());
    }

    #[test]
    fn test_decode_data() {
        #[derive(Deserialize)]
        struct Title {
            title: String,
        }

        let json = r#"{"id": "a", "type": "posts", "data": {"title": "Hello"}}"#;
        let doc: RawDocument = serde_json::from_str(json).unwrap();
        let typed = doc.decode::<Title>().unwrap();
        assert_eq!(typed.data.title, "Hello");
        assert_eq!(typed.id, "a");
    }

    #[test]
    fn test_search_response_defaults() {
        let json = r#"{"results": [], "next_page": null}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.page, 1);
        assert!(response.next_page.is_none());
    }
}
