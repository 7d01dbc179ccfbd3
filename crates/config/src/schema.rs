#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Reject every mutation. Default: true.
    pub disable_mutations: bool,
    /// Root query names allowed on top of those derived from content types.
    pub additional_queries: Vec<String>,
    /// Post types exposed through GraphQL.
    pub post_types: Vec<ContentTypeConfig>,
    /// Taxonomies exposed through GraphQL.
    pub taxonomies: Vec<ContentTypeConfig>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            disable_mutations: true,
            additional_queries: Vec::new(),
            post_types: Vec::new(),
            taxonomies: Vec::new(),
        }
    }
}

impl SchemaConfig {
    /// Whether a root query allow-list was configured at all.
    pub fn has_allowed_queries(&self) -> bool {
        !(self.additional_queries.is_empty() && self.post_types.is_empty() && self.taxonomies.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentTypeConfig {
    /// Name of the single item query, e.g. `post`
    pub single_name: String,
    /// Name of the list query, e.g. `posts`
    pub plural_name: String,
}
