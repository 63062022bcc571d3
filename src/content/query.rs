//! Query predicates and options in Prismic query syntax

use std::fmt;

use serde_json::Value;

use super::document::RawDocument;

/// A single filter of a search query
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals value
    At(String, String),
    /// Field equals any of the values
    Any(String, Vec<String>),
    /// Field differs from value
    Not(String, String),
}

impl Predicate {
    pub fn at(path: &str, value: &str) -> Self {
        Predicate::At(path.to_string(), value.to_string())
    }

    pub fn any(path: &str, values: &[&str]) -> Self {
        Predicate::Any(
            path.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        )
    }

    pub fn not(path: &str, value: &str) -> Self {
        Predicate::Not(path.to_string(), value.to_string())
    }

    /// Documents of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// Evaluate against a document held in memory
    ///
    /// Understands `document.id`, `document.type`, `document.tags`,
    /// `my.<type>.uid` and `my.<type>.<field>` for string fields.
    pub fn matches(&self, doc: &RawDocument) -> bool {
        match self {
            Predicate::At(path, value) => field_values(doc, path).iter().any(|v| v == value),
            Predicate::Any(path, values) => field_values(doc, path)
                .iter()
                .any(|v| values.iter().any(|w| w == v)),
            Predicate::Not(path, value) => !field_values(doc, path).iter().any(|v| v == value),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At(path, value) => write!(f, "[at({}, {})]", path, quote(value)),
            Predicate::Not(path, value) => write!(f, "[not({}, {})]", path, quote(value)),
            Predicate::Any(path, values) => {
                let list: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "[any({}, [{}])]", path, list.join(", "))
            }
        }
    }
}

/// Render a predicate list as the `q` query parameter
pub fn render_predicates(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn field_values(doc: &RawDocument, path: &str) -> Vec<String> {
    match path {
        "document.id" => vec![doc.id.clone()],
        "document.type" => vec![doc.doc_type.clone()],
        "document.tags" => doc.tags.clone(),
        _ => {
            let mut parts = path.splitn(3, '.');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("my"), Some(doc_type), Some(field)) if doc_type == doc.doc_type => {
                    data_field(doc, field).into_iter().collect()
                }
                _ => Vec::new(),
            }
        }
    }
}

/// Read a string-valued field of `my.<type>.<field>`
pub(crate) fn data_field(doc: &RawDocument, field: &str) -> Option<String> {
    let data = &doc.data;
    match field {
        "uid" => doc.uid.clone(),
        "title" => data.title.clone(),
        "subtitle" => data.subtitle.clone(),
        "author" => data.author.clone(),
        other => match data.extra.get(other) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
    }
}

/// Sort direction of an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort key of a query, e.g. `my.post.date desc`
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }

    /// Parse `field` or `field desc` / `field asc`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('[').trim_end_matches(']').trim();
        let mut parts = s.split_whitespace();
        let field = parts.next()?;
        let direction = match parts.next() {
            None | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(_) => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{}", self.field),
            Direction::Desc => write!(f, "{} desc", self.field),
        }
    }
}

/// Options of a search query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub orderings: Vec<Ordering>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
    /// Field projection, e.g. `post.title`
    pub fetch: Vec<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
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

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Query-string pairs, without `ref`, `q` and `access_token`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.orderings.is_empty() {
            let list: Vec<String> = self.orderings.iter().map(|o| o.to_string()).collect();
            params.push(("orderings", format!("[{}]", list.join(","))));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::document::DocumentData;

    fn post(uid: &str) -> RawDocument {
        RawDocument {
            id: format!("id-{}", uid),
            uid: Some(uid.to_string()),
            doc_type: "post".to_string(),
            tags: vec!["react".to_string()],
            first_publication_date: None,
            last_publication_date: None,
            lang: None,
            data: DocumentData {
                author: Some("Danilo Vieira".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_render_predicates() {
        let q = render_predicates(&[
            Predicate::document_type("post"),
            Predicate::any("document.tags", &["react", "rust"]),
        ]);
        assert_eq!(
            q,
            r#"[[at(document.type, "post")][any(document.tags, ["react", "rust"])]]"#
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(
            Predicate::at("my.post.uid", "a\"b").to_string(),
            r#"[at(my.post.uid, "a\"b")]"#
        );
    }

    #[test]
    fn test_matches() {
        let doc = post("hooks");
        assert!(Predicate::document_type("post").matches(&doc));
        assert!(!Predicate::document_type("page").matches(&doc));
        assert!(Predicate::at("my.post.uid", "hooks").matches(&doc));
        assert!(Predicate::at("my.post.author", "Danilo Vieira").matches(&doc));
        assert!(Predicate::any("document.tags", &["vue", "react"]).matches(&doc));
        assert!(Predicate::not("my.post.uid", "other").matches(&doc));
        assert!(!Predicate::at("my.page.uid", "hooks").matches(&doc));
    }

    #[test]
    fn test_ordering_parse_and_display() {
        let ordering = Ordering::parse("[my.post.date desc]").unwrap();
        assert_eq!(ordering, Ordering::desc("my.post.date"));
        assert_eq!(ordering.to_string(), "my.post.date desc");
        assert_eq!(Ordering::parse("document.first_publication_date").unwrap().direction, Direction::Asc);
        assert!(Ordering::parse("my.post.date sideways").is_none());
    }

    #[test]
    fn test_options_to_params() {
        let options = QueryOptions::new()
            .order_by(Ordering::desc("my.post.date"))
            .page_size(1)
            .fetch(["post.title", "post.author"]);
        assert_eq!(
            options.to_params(),
            vec![
                ("orderings", "[my.post.date desc]".to_string()),
                ("pageSize", "1".to_string()),
                ("fetch", "post.title,post.author".to_string()),
            ]
        );
    }
}
