//! Search query builder
//!
//! A [`Query`] is a plain description of a Prismic search. It is turned into
//! the API's query-string parameters unmodified by [`Query::to_params`].

use serde::{Deserialize, Serialize};

/// Filter applied to documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// `[at(path, "value")]`: exact match on a field
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    fn to_query(&self) -> String {
        match self {
            Predicate::At { path, value } => {
                format!("[at({}, \"{}\")]", path, value.replace('"', "\\\""))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    fn to_query(&self) -> String {
        match self.direction {
            Direction::Asc => self.field.clone(),
            Direction::Desc => format!("{} desc", self.field),
        }
    }
}

/// A search over the repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    /// Field projection, `type.field`
    pub fetch: Vec<String>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
    pub orderings: Vec<Ordering>,
    /// Only return documents that come after this document id
    pub after: Option<String>,
}

impl Query {
    /// Query every document of a custom type
    pub fn by_type(doc_type: &str) -> Self {
        Self::default().filter(Predicate::at("document.type", doc_type))
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.orderings.push(Ordering {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    /// The `q` parameter
    pub fn predicate_string(&self) -> String {
        let inner: String = self.predicates.iter().map(Predicate::to_query).collect();
        format!("[{}]", inner)
    }

    /// Query-string parameters, without `ref` and `access_token`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.predicate_string())];

        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if !self.orderings.is_empty() {
            let orderings: Vec<_> = self.orderings.iter().map(Ordering::to_query).collect();
            params.push(("orderings", format!("[{}]", orderings.join(","))));
        }
        if let Some(after) = &self.after {
            params.push(("after", after.clone()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_string() {
        let query = Query::by_type("posts");
        assert_eq!(query.predicate_string(), r#"[[at(document.type, "posts")]]"#);

        let query = Query::by_type("posts").filter(Predicate::at("my.posts.uid", "a-b"));
        assert_eq!(
            query.predicate_string(),
            r#"[[at(document.type, "posts")][at(my.posts.uid, "a-b")]]"#
        );
    }

    #[test]
    fn test_to_params() {
        let query = Query::by_type("posts")
            .fetch(["posts.title", "posts.author"])
            .page_size(1)
            .order_by("document.first_publication_date", Direction::Desc)
            .after("YF1");
        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("q", r#"[[at(document.type, "posts")]]"#.to_string()),
                ("fetch", "posts.title,posts.author".to_string()),
                ("pageSize", "1".to_string()),
                ("orderings", "[document.first_publication_date desc]".to_string()),
                ("after", "YF1".to_string()),
            ]
        );
    }

    #[test]
    fn test_ascending_ordering() {
        let query = Query::by_type("posts").order_by("document.first_publication_date", Direction::Asc);
        let params = query.to_params();
        assert!(params.contains(&("orderings", "[document.first_publication_date]".to_string())));
    }
}
