#![allow(unused_crate_dependencies)]

use indoc::indoc;
use query_guard::{
    query_cost::{Cost, CostPolicy},
    ContentType, FieldCostHook, GuardError, OperationKind, OperationReport, QueryGuard, RootFieldFilter,
};
use query_guard_config::{Config, CostScope};
use rstest::rstest;
use serde_json::{json, Map, Value};

fn validate(guard: &QueryGuard, query: &str) -> Result<OperationReport, GuardError> {
    guard.validate(query, None, &Map::new())
}

fn variables(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn cost_and_depth(result: Result<OperationReport, GuardError>) -> (Cost, usize) {
    let report = result.unwrap();
    (report.cost, report.depth)
}

#[rstest]
#[case::free_pagination(r#"{ posts(first: 10) { nodes { id title } } }"#, 3, 1)]
#[case::known_arguments(r#"{ posts(after: "x", first: 50, id: "x") { nodes { id } } }"#, 2, 1)]
#[case::single_restricted_predicate(r#"{ posts(where: {orderby: {field: DATE}}) { nodes { id } } }"#, 2, 1)]
#[case::lookup_by_id(r#"{ post(id: "cG9zdDox") { title } }"#, 1, 0)]
#[case::lookup_by_alias(r#"{ page(pageId: 2) { title } }"#, 1, 0)]
#[case::typename(r#"{ __typename }"#, 1, 0)]
#[case::nested_arguments_are_not_classified(r#"{ posts { nodes { comments(unknown: 1) { nodes { id } } } } }"#, 4, 3)]
#[case::inline_fragment(r#"{ posts { ... on RootQueryToPostConnection { nodes { id } } } }"#, 2, 1)]
#[case::two_root_fields(r#"{ posts(last: 5) { nodes { id } } menus { nodes { id name } } }"#, 5, 1)]
fn admitted(#[case] query: &str, #[case] cost: Cost, #[case] depth: usize) {
    let guard = QueryGuard::default();

    assert_eq!((cost, depth), cost_and_depth(validate(&guard, query)));
}

#[rstest]
#[case::page_too_large(r#"{ posts(first: 100) { nodes { id } } }"#)]
#[case::unknown_argument(r#"{ posts(offset: 10) { nodes { id } } }"#)]
#[case::unknown_predicate(r#"{ posts(where: {unknown: true}) { nodes { id } } }"#)]
#[case::combined_predicates(r#"{ posts(where: {orderby: {field: DATE}, name: "test"}) { nodes { id } } }"#)]
#[case::costly_field_next_to_free_one(r#"{ post(id: "1") { title } users(first: 51) { nodes { id } } }"#)]
fn rejected_by_arguments(#[case] query: &str) {
    let result = validate(&QueryGuard::default(), query);

    assert!(
        matches!(result, Err(GuardError::QueryTooComplex { cost, max_cost: 1000 }) if cost >= 100_000),
        "{result:?}"
    );
}

#[test]
fn rejection_messages() {
    let guard = QueryGuard::builder()
        .with_policy(CostPolicy::builder().with_max_depth(2))
        .finish();

    let too_complex = validate(&guard, "{ posts(first: 500) { nodes { id } } }").unwrap_err();
    let too_deep = validate(&guard, "{ posts { nodes { author { node { name } } } } }").unwrap_err();

    insta::assert_snapshot!(&too_complex.to_string(), @"Query is too complex. Max query cost is 1000 but got 100000.");
    insta::assert_snapshot!(&too_deep.to_string(), @"Query is nested too deep. Max query depth is 2 but got 3.");
    assert!(too_complex.is_limit_exceeded());
    assert!(too_deep.is_limit_exceeded());
}

#[test]
fn field_count_is_bounded_by_max_cost() {
    let guard = QueryGuard::builder()
        .with_policy(CostPolicy::builder().with_max_cost(3))
        .finish();

    assert_eq!(
        Err(GuardError::QueryTooComplex { cost: 4, max_cost: 3 }),
        validate(&guard, "{ posts { nodes { id title slug } } }")
    );
    assert_eq!((3, 1), cost_and_depth(validate(&guard, "{ posts { nodes { id title } } }")));
}

#[test]
fn depth_limit_is_inclusive() {
    let guard = QueryGuard::builder()
        .with_policy(CostPolicy::builder().with_max_depth(3))
        .finish();

    let query = "{ posts { nodes { author { node { name } } } } }";

    assert_eq!(3, validate(&guard, query).unwrap().depth);
    assert!(matches!(
        validate(&guard, "{ posts { nodes { author { node { avatar { url } } } } } }"),
        Err(GuardError::QueryTooDeep { depth: 4, max_depth: 3 })
    ));
}

#[test]
fn default_depth_limit() {
    let nested = |levels: usize| format!("{{ {} id {} }}", "a { ".repeat(levels), "} ".repeat(levels));

    assert_eq!(11, validate(&QueryGuard::default(), &nested(12)).unwrap().depth);
    assert_eq!(
        Err(GuardError::QueryTooDeep { depth: 12, max_depth: 11 }),
        validate(&QueryGuard::default(), &nested(13))
    );
}

#[test]
fn all_fields_scope() {
    let guard = QueryGuard::builder().with_scope(CostScope::AllFields).finish();

    assert!(matches!(
        validate(&guard, "{ posts { nodes { comments(unknown: 1) { nodes { id } } } } }"),
        Err(GuardError::QueryTooComplex { cost: 100_000, .. })
    ));

    // Fields with free arguments add nothing of their own.
    assert_eq!((0, 1), cost_and_depth(validate(&guard, "{ posts { nodes { id } } }")));
}

#[rstest]
#[case::default_value(json!({}), Some(2))]
#[case::small_page(json!({"count": 20}), Some(2))]
#[case::coerced_string(json!({"count": "20"}), Some(2))]
#[case::large_page(json!({"count": 500}), None)]
fn page_size_from_variables(#[case] vars: Value, #[case] expected_cost: Option<Cost>) {
    let guard = QueryGuard::default();
    let query = indoc! {r#"
        query Posts($count: Int = 10) {
            posts(first: $count) {
                nodes { id }
            }
        }
    "#};

    let result = guard.validate(query, None, &variables(vars));

    assert_eq!(expected_cost, result.ok().map(|report| report.cost));
}

#[rstest]
#[case::no_filter(json!({}), true)]
#[case::null_filter(json!({"filter": null}), true)]
#[case::single_predicate(json!({"filter": {"search": "rust"}}), true)]
#[case::combined_predicates(json!({"filter": {"search": "rust", "orderby": {"field": "DATE"}}}), false)]
fn filter_clause_from_variables(#[case] vars: Value, #[case] admitted: bool) {
    let guard = QueryGuard::default();
    let query = indoc! {r#"
        query Search($filter: RootQueryToPostConnectionWhereArgs) {
            posts(where: $filter) {
                nodes { id }
            }
        }
    "#};

    assert_eq!(admitted, guard.validate(query, None, &variables(vars)).is_ok());
}

#[test]
fn variables_nested_in_filter_objects() {
    let guard = QueryGuard::default();
    let query = indoc! {r#"
        query Search($term: String!) {
            posts(where: {search: $term}) {
                nodes { id }
            }
        }
    "#};

    let report = guard.validate(query, Some("Search"), &variables(json!({"term": "rust"}))).unwrap();

    assert_eq!(Some("Search".to_string()), report.operation_name);
    assert_eq!(2, report.cost);
}

#[test]
fn schema_ready_amendment() {
    let query = r#"{ posts(where: {orderby: {field: DATE}, name: "test"}) { nodes { id } } }"#;

    let guard = QueryGuard::builder()
        .on_schema_ready(|policy| {
            policy.amend_filter_arg_lists(None::<Vec<String>>, Some(["orderby"]));
        })
        .finish();

    assert_eq!((2, 1), cost_and_depth(validate(&guard, query)));
    assert!(validate(&QueryGuard::default(), query).is_err());
    assert!(guard.policy().rules().filter_clause().whitelisted().contains("orderby"));
}

#[test]
fn schema_ready_hooks_run_in_order() {
    let guard = QueryGuard::builder()
        .on_schema_ready(|policy| {
            policy.amend_filter_arg_lists(Some(["status"]), None::<Vec<String>>);
        })
        .on_schema_ready(|policy| {
            policy.amend_filter_arg_lists(Some(["author"]), None::<Vec<String>>);
        })
        .finish();

    assert!(validate(&guard, r#"{ posts(where: {author: 1}) { nodes { id } } }"#).is_ok());
    assert!(validate(&guard, r#"{ posts(where: {status: DRAFT}) { nodes { id } } }"#).is_err());
}

#[test]
fn mutations_are_disabled_by_default() {
    let query = "mutation { createPost(input: {title: \"x\"}) { clientMutationId } }";

    assert_eq!(Err(GuardError::MutationsDisabled), validate(&QueryGuard::default(), query));

    let guard = QueryGuard::builder().with_disabled_mutations(false).finish();
    let report = validate(&guard, query).unwrap();

    assert_eq!(OperationKind::Mutation, report.operation_type);
    assert_eq!((2, 0), (report.cost, report.depth));
}

fn wordpress_guard() -> QueryGuard {
    QueryGuard::builder()
        .with_root_fields(
            RootFieldFilter::builder()
                .post_type(ContentType::new("post", "posts"))
                .taxonomy(ContentType::new("category", "categories")),
        )
        .finish()
}

#[rstest]
#[case::plural(r#"{ posts { nodes { id } } }"#, true)]
#[case::lookup(r#"{ postBy(slug: "hello-world") { title } }"#, true)]
#[case::taxonomy(r#"{ categories { nodes { name } } }"#, true)]
#[case::built_in(r#"{ menuItems { nodes { label } } }"#, true)]
#[case::introspection(r#"{ __schema { types { name } } }"#, true)]
#[case::plugins(r#"{ plugins { nodes { name } } }"#, false)]
#[case::settings(r#"{ allSettings { generalSettingsTitle } }"#, false)]
#[case::through_fragment(r#"query { ...Root } fragment Root on RootQuery { plugins { nodes { id } } }"#, false)]
fn root_field_allow_list(#[case] query: &str, #[case] allowed: bool) {
    let result = validate(&wordpress_guard(), query);

    if allowed {
        assert!(result.is_ok(), "{result:?}");
    } else {
        assert!(matches!(result, Err(GuardError::RootFieldNotAllowed { .. })), "{result:?}");
    }
}

#[test]
fn root_fields_are_not_filtered_without_allow_list() {
    let guard = QueryGuard::default();

    assert!(guard.root_fields().is_none());
    assert!(validate(&guard, "{ plugins { nodes { name } } }").is_ok());
}

#[test]
fn allowed_queries_amendment() {
    let guard = QueryGuard::builder()
        .on_allowed_queries(|allowed| {
            allowed.insert("viewer".to_string());
        })
        .finish();

    assert!(validate(&guard, "{ viewer { id } }").is_ok());
    assert!(validate(&guard, "{ menus { nodes { id } } }").is_ok());
    assert_eq!(
        Err(GuardError::RootFieldNotAllowed {
            name: "posts".to_string()
        }),
        validate(&guard, "{ posts { nodes { id } } }")
    );
}

#[test]
fn fragments() {
    let guard = QueryGuard::default();
    let query = indoc! {r#"
        query {
            posts(first: 5) { ...Nodes }
        }

        fragment Nodes on RootQueryToPostConnection {
            nodes { id }
        }
    "#};

    assert_eq!((2, 1), cost_and_depth(validate(&guard, query)));
}

#[test]
fn fragments_spread_more_than_once() {
    let guard = QueryGuard::default();
    let query = indoc! {r#"
        query {
            posts { ...Twice }
        }

        fragment Twice on RootQueryToPostConnection {
            ...Nodes
            ...Nodes
        }

        fragment Nodes on RootQueryToPostConnection {
            nodes { id title }
        }
    "#};

    assert_eq!((6, 1), cost_and_depth(validate(&guard, query)));
}

/// Every fragment spreads the next one twice, doubling the cost at each level.
fn fragment_fan_out(levels: usize) -> String {
    let mut document = String::from("query { posts { ...F0 } }\n");

    for level in 0..levels {
        let next = level + 1;
        document.push_str(&format!(
            "fragment F{level} on RootQueryToPostConnection {{ ...F{next} ...F{next} }}\n"
        ));
    }

    document.push_str(&format!("fragment F{levels} on RootQueryToPostConnection {{ pageInfo {{ total }} }}\n"));
    document
}

#[test]
fn fragment_fan_out_is_measured_once_per_fragment() {
    let guard = QueryGuard::default();

    assert_eq!((16, 1), cost_and_depth(validate(&guard, &fragment_fan_out(3))));

    let result = validate(&guard, &fragment_fan_out(60));
    assert!(
        matches!(result, Err(GuardError::QueryTooComplex { cost, max_cost: 1000 }) if cost == 1 << 61),
        "{result:?}"
    );
}

fn nested_inline_fragments(levels: usize) -> String {
    format!("{{ {} id {} }}", "... { ".repeat(levels), "} ".repeat(levels))
}

fn fragment_spread_chain(levels: usize) -> String {
    let mut document = String::from("query { ...F0 }\n");

    for level in 0..levels {
        let next = level + 1;
        document.push_str(&format!("fragment F{level} on RootQuery {{ ...F{next} }}\n"));
    }

    document.push_str(&format!("fragment F{levels} on RootQuery {{ __typename }}\n"));
    document
}

#[rstest]
#[case::inline_fragments(nested_inline_fragments(10_000))]
#[case::fragment_spreads(fragment_spread_chain(1_000))]
fn selection_nesting_is_bounded(#[case] query: String) {
    let error = validate(&QueryGuard::default(), &query).unwrap_err();

    assert_eq!(
        GuardError::SelectionsTooDeep {
            nesting: 257,
            max_nesting: 256
        },
        error
    );
    assert!(error.is_limit_exceeded());
}

#[test]
fn moderate_selection_nesting_is_admitted() {
    assert_eq!((0, 0), cost_and_depth(validate(&QueryGuard::default(), &nested_inline_fragments(200))));
    assert_eq!((1, 0), cost_and_depth(validate(&QueryGuard::default(), &fragment_spread_chain(200))));
}

#[test]
fn fragment_cycle() {
    let query = indoc! {r#"
        query { posts { ...A } }
        fragment A on RootQueryToPostConnection { ...B }
        fragment B on RootQueryToPostConnection { ...A }
    "#};

    let error = validate(&QueryGuard::default(), query).unwrap_err();

    insta::assert_snapshot!(&error.to_string(), @"Fragment cycle detected: A, B, A");
}

#[test]
fn unknown_fragment() {
    assert_eq!(
        Err(GuardError::UnknownFragment {
            name: "Missing".to_string()
        }),
        validate(&QueryGuard::default(), "{ posts { ...Missing } }")
    );
}

#[test]
fn operation_selection() {
    let guard = QueryGuard::default();
    let document = indoc! {r#"
        query A { posts { nodes { id } } }
        query B { post(id: "1") { title } }
    "#};

    assert_eq!(Err(GuardError::OperationNameRequired), validate(&guard, document));
    assert_eq!(
        Err(GuardError::UnknownOperation { name: "C".to_string() }),
        guard.validate(document, Some("C"), &Map::new())
    );

    let report = guard.validate(document, Some("B"), &Map::new()).unwrap();
    assert_eq!(Some("B"), report.operation_name.as_deref());
    assert_eq!(1, report.cost);

    assert_eq!(
        Err(GuardError::MissingOperation),
        validate(&guard, "fragment F on Post { id }")
    );
}

#[test]
fn parse_error() {
    let result = validate(&QueryGuard::default(), "{ posts(first: ) }");

    assert!(matches!(result, Err(GuardError::Parse(_))), "{result:?}");
}

struct TenPerField;

impl FieldCostHook for TenPerField {
    fn field_cost(&self, children_cost: Cost, _arguments: &Map<String, Value>) -> Cost {
        children_cost + 10
    }
}

#[test]
fn custom_cost_hook() {
    let guard = QueryGuard::builder().with_cost_hook(TenPerField).finish();

    assert_eq!((12, 1), cost_and_depth(validate(&guard, "{ posts(offset: 5) { nodes { id } } }")));
}

#[test]
fn built_from_config() {
    let config = Config::from_toml(indoc! {r#"
        [query_cost]
        max_cost = 500
        max_depth = 3
        whitelisted_where_args = ["status"]
        id_aliases = ["bookId"]

        [[schema.post_types]]
        single_name = "book"
        plural_name = "books"
    "#})
    .unwrap();

    let guard = query_guard::QueryGuardBuilder::from(&config).finish();

    assert_eq!(500, guard.policy().max_cost());
    assert!(validate(&guard, r#"{ books(where: {status: PUBLISH, search: "x"}) { nodes { id } } }"#).is_ok());
    assert!(validate(&guard, r#"{ book(bookId: 4) { title } }"#).is_ok());
    assert!(validate(&guard, r#"{ posts { nodes { id } } }"#).is_err());
    assert_eq!(
        Err(GuardError::QueryTooComplex {
            cost: 50_000,
            max_cost: 500
        }),
        validate(&guard, r#"{ books(first: 60) { nodes { id } } }"#)
    );
}

#[test]
fn report_serialization() {
    let report = validate(&QueryGuard::default(), "{ posts { nodes { id } } }").unwrap();

    assert_eq!(
        json!({"operation_name": null, "operation_type": "query", "cost": 2, "depth": 1}),
        serde_json::to_value(report).unwrap()
    );
}

#[test]
fn shared_between_threads() {
    let guard = QueryGuard::default();
    let queries = [
        "{ posts(first: 10) { nodes { id } } }",
        "{ posts(first: 100) { nodes { id } } }",
    ];

    let results = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|i| {
                let guard = guard.clone();
                let query = queries[i % 2];
                scope.spawn(move || validate(&guard, query).is_ok())
            })
            .collect::<Vec<_>>();

        handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>()
    });

    assert_eq!(vec![true, false, true, false, true, false, true, false], results);
}
