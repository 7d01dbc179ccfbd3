use std::collections::BTreeSet;

use query_guard_config::{ContentTypeConfig, SchemaConfig};

/// Queries of data types that are always exposed. Each also comes with its plural form.
const BUILT_IN_QUERIES: &[&str] = &["menu", "menuItem", "user"];

/// A content type exposed through GraphQL, identified by its query names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub single_name: String,
    pub plural_name: String,
}

impl ContentType {
    pub fn new(single_name: impl Into<String>, plural_name: impl Into<String>) -> Self {
        ContentType {
            single_name: single_name.into(),
            plural_name: plural_name.into(),
        }
    }
}

impl From<&ContentTypeConfig> for ContentType {
    fn from(config: &ContentTypeConfig) -> Self {
        ContentType::new(&config.single_name, &config.plural_name)
    }
}

/// Collects the exposed content types from which the root query allow-list is derived.
#[derive(Debug, Clone, Default)]
pub struct RootFieldFilterBuilder {
    post_types: Vec<ContentType>,
    taxonomies: Vec<ContentType>,
    additional_queries: Vec<String>,
}

impl From<&SchemaConfig> for RootFieldFilterBuilder {
    fn from(config: &SchemaConfig) -> Self {
        RootFieldFilterBuilder {
            post_types: config.post_types.iter().map(Into::into).collect(),
            taxonomies: config.taxonomies.iter().map(Into::into).collect(),
            additional_queries: config.additional_queries.clone(),
        }
    }
}

impl RootFieldFilterBuilder {
    #[must_use]
    pub fn post_type(mut self, post_type: ContentType) -> Self {
        self.post_types.push(post_type);
        self
    }

    #[must_use]
    pub fn taxonomy(mut self, taxonomy: ContentType) -> Self {
        self.taxonomies.push(taxonomy);
        self
    }

    #[must_use]
    pub fn additional_query(mut self, name: impl Into<String>) -> Self {
        self.additional_queries.push(name.into());
        self
    }

    /// Nothing was declared, root fields are not filtered unless the allow-list is amended.
    pub fn is_empty(&self) -> bool {
        self.post_types.is_empty() && self.taxonomies.is_empty() && self.additional_queries.is_empty()
    }

    /// Single and plural queries of every post type and taxonomy, `<single>By` lookups of
    /// post types, the built-in queries and the additional ones.
    pub fn allowed_queries(&self) -> BTreeSet<String> {
        let content_types = self.post_types.iter().chain(&self.taxonomies);

        let mut allowed = content_types
            .flat_map(|content_type| [content_type.single_name.clone(), content_type.plural_name.clone()])
            .collect::<BTreeSet<_>>();

        allowed.extend(
            self.post_types
                .iter()
                .map(|post_type| format!("{}By", post_type.single_name)),
        );

        for built_in in BUILT_IN_QUERIES {
            allowed.insert(built_in.to_string());
            allowed.insert(format!("{built_in}s"));
        }

        allowed.extend(self.additional_queries.iter().cloned());

        allowed
    }

    pub fn finish(self) -> RootFieldFilter {
        RootFieldFilter {
            allowed: self.allowed_queries(),
        }
    }
}

/// Allow-list of root query fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFieldFilter {
    allowed: BTreeSet<String>,
}

impl RootFieldFilter {
    pub fn builder() -> RootFieldFilterBuilder {
        RootFieldFilterBuilder::default()
    }

    pub fn from_allowed_queries<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RootFieldFilter {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allowed_queries(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    /// Introspection fields are never filtered.
    pub fn is_allowed(&self, name: &str) -> bool {
        name.starts_with("__") || self.allowed.contains(name)
    }

    /// Keeps the root fields of a schema that may be queried.
    pub fn retain<I, S>(&self, root_fields: I) -> Vec<S>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        root_fields
            .into_iter()
            .filter(|name| self.is_allowed(name.as_ref()))
            .collect()
    }
}
