use crate::ordering::SortOrder;

/// PostgREST query-string builder.
///
/// Values are kept as ordered key/value pairs and URL-encoded by reqwest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestQuery {
    pairs: Vec<(String, String)>,
}

impl RestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns)
    }

    pub fn eq(self, column: &str, value: &str) -> Self {
        self.push(column, format!("eq.{value}"))
    }

    /// `or=(a,b)` over already formatted conditions such as `owner_id.eq."x"`.
    pub fn or(self, conditions: &[String]) -> Self {
        self.push("or", format!("({})", conditions.join(",")))
    }

    pub fn order(self, column: &str, order: SortOrder) -> Self {
        self.push("order", format!("{column}.{order}"))
    }

    pub fn limit(self, limit: u32) -> Self {
        self.push("limit", limit.to_string())
    }

    pub fn offset(self, offset: u32) -> Self {
        self.push("offset", offset.to_string())
    }

    pub fn embedded_order(self, resource: &str, column: &str, order: SortOrder) -> Self {
        self.push(format!("{resource}.order"), format!("{column}.{order}"))
    }

    pub fn embedded_limit(self, resource: &str, limit: u32) -> Self {
        self.push(format!("{resource}.limit"), limit.to_string())
    }

    pub fn embedded_eq(self, resource: &str, column: &str, value: &str) -> Self {
        self.push(format!("{resource}.{column}"), format!("eq.{value}"))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Double-quote a value for use inside PostgREST logic trees and lists.
pub fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn quoted_list(values: &[String]) -> String {
    let inner: Vec<String> = values.iter().map(|v| quoted(v)).collect();
    format!("({})", inner.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_listing_query() {
        let query = RestQuery::new()
            .select("id,title")
            .eq("owner_id", "u1")
            .order("created_at", SortOrder::Desc)
            .limit(20)
            .offset(0)
            .embedded_order("last", "index", SortOrder::Desc)
            .embedded_limit("last", 1);

        assert_eq!(query.get("owner_id"), Some("eq.u1"));
        assert_eq!(query.get("order"), Some("created_at.desc"));
        assert_eq!(query.get("last.order"), Some("index.desc"));
        assert_eq!(query.get("last.limit"), Some("1"));
        assert_eq!(query.pairs().len(), 7);
    }

    #[test]
    fn test_or_with_quoted_ids() {
        let ids = vec!["a".to_string(), "b\"c".to_string()];
        let query = RestQuery::new().or(&[
            format!("owner_id.eq.{}", quoted("u1")),
            format!("id.in.{}", quoted_list(&ids)),
        ]);
        assert_eq!(
            query.get("or"),
            Some(r#"(owner_id.eq."u1",id.in.("a","b\"c"))"#)
        );
    }
}
