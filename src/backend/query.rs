use super::BackendKind;
use crate::conf::BenchConfig;

/// Logical query classes run against both stores. Each class is one
/// benchmark category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClass {
    Simple,
    TextSearch,
    Aggregation,
    Join,
}

impl QueryClass {
    pub const ALL: [QueryClass; 4] = [
        QueryClass::Simple,
        QueryClass::TextSearch,
        QueryClass::Aggregation,
        QueryClass::Join,
    ];

    pub fn category(self) -> &'static str {
        match self {
            QueryClass::Simple => "simple_queries",
            QueryClass::TextSearch => "text_search",
            QueryClass::Aggregation => "aggregations",
            QueryClass::Join => "joins",
        }
    }

    pub fn test_name(self, kind: BackendKind) -> &'static str {
        match (kind, self) {
            (BackendKind::Document, QueryClass::Simple) => "mongodb_find",
            (BackendKind::Document, QueryClass::TextSearch) => "mongodb_text_search",
            (BackendKind::Document, QueryClass::Aggregation) => "mongodb_aggregation",
            (BackendKind::Document, QueryClass::Join) => "mongodb_lookup",
            (BackendKind::Relational, QueryClass::Simple) => "postgres_select",
            (BackendKind::Relational, QueryClass::TextSearch) => "postgres_text_search",
            (BackendKind::Relational, QueryClass::Aggregation) => "postgres_aggregation",
            (BackendKind::Relational, QueryClass::Join) => "postgres_join",
        }
    }
}

/// Values plugged into the query templates.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub target: i32,
    pub search_term: String,
    pub limit: i64,
}

impl From<&BenchConfig> for QueryParams {
    fn from(config: &BenchConfig) -> Self {
        Self {
            target: config.target,
            search_term: config.search_term.clone(),
            limit: config.limit,
        }
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams::from(&BenchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_per_backend() {
        let mut names: Vec<&str> = QueryClass::ALL
            .iter()
            .flat_map(|c| [c.test_name(BackendKind::Document), c.test_name(BackendKind::Relational)])
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_default_params() {
        let params = QueryParams::default();
        assert_eq!(params.target, 4);
        assert_eq!(params.search_term, "love");
        assert_eq!(params.limit, 100);
    }
}
