//! Query parameters
//!
//! Builds the query string for collection and single-resource reads.
//! Filter, sort, include, search and view values are opaque here; they are
//! forwarded as given.

use crate::pagination::PageRequest;

/// Filter on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    pub field: String,
    pub values: Vec<String>,
}

impl ResourceFilter {
    pub fn new(field: &str, values: Vec<String>) -> Self {
        Self {
            field: field.to_string(),
            values,
        }
    }

    /// Parse `field=value[,value...]`
    pub fn parse(spec: &str) -> Option<Self> {
        let (field, values) = spec.split_once('=')?;
        if field.is_empty() {
            return None;
        }
        Some(Self::new(
            field,
            values.split(',').map(str::to_string).collect(),
        ))
    }
}

/// Sort key; descending keys are sent with a `-` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Asc(String),
    Desc(String),
}

impl SortKey {
    fn render(&self) -> String {
        match self {
            SortKey::Asc(field) => field.clone(),
            SortKey::Desc(field) => format!("-{}", field),
        }
    }
}

/// Read parameters for a request, minus pagination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<ResourceFilter>,
    sort: Vec<SortKey>,
    include: Vec<String>,
    fields: Vec<(String, Vec<String>)>,
    search: Option<String>,
    view: Option<String>,
    extra: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, value: &str) -> Self {
        self.filters
            .push(ResourceFilter::new(field, vec![value.to_string()]));
        self
    }

    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    /// Side-load a relationship path (e.g. `author` or `comments.author`)
    pub fn include(mut self, path: &str) -> Self {
        self.include.push(path.to_string());
        self
    }

    /// Sparse fieldset for one type
    pub fn fields(mut self, resource_type: &str, fields: &[&str]) -> Self {
        self.fields.push((
            resource_type.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_string());
        self
    }

    pub fn view(mut self, view: &str) -> Self {
        self.view = Some(view.to_string());
        self
    }

    /// Arbitrary passthrough parameter
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }

    /// Query pairs in a stable order
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        for filter in &self.filters {
            pairs.push((format!("filter[{}]", filter.field), filter.values.join(",")));
        }

        if !self.sort.is_empty() {
            let sort: Vec<String> = self.sort.iter().map(SortKey::render).collect();
            pairs.push(("sort".to_string(), sort.join(",")));
        }

        if !self.include.is_empty() {
            pairs.push(("include".to_string(), self.include.join(",")));
        }

        for (resource_type, fields) in &self.fields {
            pairs.push((format!("fields[{}]", resource_type), fields.join(",")));
        }

        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }

        if let Some(view) = &self.view {
            pairs.push(("view".to_string(), view.clone()));
        }

        pairs.extend(self.extra.iter().cloned());
        pairs
    }

    /// Query pairs plus the page window
    pub fn to_pairs_with_page(&self, page: &PageRequest) -> Vec<(String, String)> {
        let mut pairs = self.to_pairs();
        pairs.extend(page.query_pairs());
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_empty_query_has_no_pairs() {
        assert!(Query::new().to_pairs().is_empty());
    }

    #[test]
    fn test_full_query_renders_in_order() {
        let query = Query::new()
            .filter("status", "published")
            .with_filter(ResourceFilter::new(
                "tag",
                vec!["rust".to_string(), "web".to_string()],
            ))
            .sort(SortKey::Desc("created".to_string()))
            .sort(SortKey::Asc("title".to_string()))
            .include("author")
            .include("comments.author")
            .fields("people", &["name", "email"])
            .search("paging")
            .view("summary")
            .param("locale", "en");

        assert_eq!(
            query.to_pairs(),
            vec![
                pair("filter[status]", "published"),
                pair("filter[tag]", "rust,web"),
                pair("sort", "-created,title"),
                pair("include", "author,comments.author"),
                pair("fields[people]", "name,email"),
                pair("search", "paging"),
                pair("view", "summary"),
                pair("locale", "en"),
            ]
        );
    }

    #[test]
    fn test_page_pairs_are_appended() {
        let pairs = Query::new()
            .include("author")
            .to_pairs_with_page(&PageRequest::new(10, Some(5)));
        assert_eq!(
            pairs,
            vec![
                pair("include", "author"),
                pair("page[offset]", "10"),
                pair("page[limit]", "5"),
            ]
        );
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            ResourceFilter::parse("status=open,closed"),
            Some(ResourceFilter::new(
                "status",
                vec!["open".to_string(), "closed".to_string()]
            ))
        );
        assert_eq!(ResourceFilter::parse("status"), None);
        assert_eq!(ResourceFilter::parse("=open"), None);
    }
}
