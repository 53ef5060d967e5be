//! End-to-end tests of the node interface and connections, executed against
//! the in-memory storage adapter.

use std::sync::Arc;

use async_graphql::{Request, Variables};
use serde_json::{json, Value};

use waypoint_core::ids::GlobalId;
use waypoint_core::ports::PaginationConfig;
use waypoint_graphql::{build_node_registry, build_schema, WaypointSchema};
use waypoint_storage::MemoryRepositories;

fn schema_with(repos: Arc<MemoryRepositories>) -> WaypointSchema {
    let registry = Arc::new(build_node_registry(Arc::clone(&repos)).unwrap());
    build_schema(repos, registry, PaginationConfig::default())
}

async fn run(schema: &WaypointSchema, query: &str, vars: Value) -> Value {
    let request = Request::new(query).variables(Variables::from_json(vars));
    let response = schema.execute(request).await;
    serde_json::to_value(&response).unwrap()
}

/// Run a query that must succeed and return its data.
async fn data(schema: &WaypointSchema, query: &str, vars: Value) -> Value {
    let out = run(schema, query, vars).await;
    assert!(out.get("errors").is_none(), "unexpected errors: {}", out);
    out["data"].clone()
}

/// Run a query that must fail and return the first error code.
async fn error_code(schema: &WaypointSchema, query: &str, vars: Value) -> String {
    let out = run(schema, query, vars).await;
    out["errors"][0]["extensions"]["code"]
        .as_str()
        .unwrap_or_else(|| panic!("no error code in {}", out))
        .to_string()
}

/// Create users named `names` in order and return their global IDs.
async fn create_users(schema: &WaypointSchema, names: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        let out = data(
            schema,
            "mutation($name: String!) { createUser(input: { name: $name }) { id name } }",
            json!({ "name": name }),
        )
        .await;
        assert_eq!(out["createUser"]["name"], *name);
        ids.push(out["createUser"]["id"].as_str().unwrap().to_string());
    }
    ids
}

async fn create_video(schema: &WaypointSchema, name: &str) -> String {
    let out = data(
        schema,
        "mutation($name: String!) { createVideo(input: { name: $name }) { id } }",
        json!({ "name": name }),
    )
    .await;
    out["createVideo"]["id"].as_str().unwrap().to_string()
}

fn names(connection: &Value) -> Vec<String> {
    connection["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["node"]["name"].as_str().unwrap().to_string())
        .collect()
}

const USERS_PAGE: &str = r#"
    query($first: Int, $after: Cursor, $last: Int, $before: Cursor, $order: UserOrder) {
        users(first: $first, after: $after, last: $last, before: $before, orderBy: $order) {
            totalCount
            edges { cursor node { id name } }
            pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
        }
    }
"#;

// =============================================================================
// Node interface
// =============================================================================

// Test critique: le scénario de référence (U1..U4, node, nodes, filtre par ID)
#[tokio::test]
async fn test_reference_scenario() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let ids = create_users(&schema, &["U1", "U2", "U3", "U4"]).await;

    let out = data(&schema, "{ users { totalCount edges { node { id } } } }", json!({})).await;
    assert_eq!(out["users"]["totalCount"], 4);
    let listed: Vec<&str> = out["users"]["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["node"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, ids.iter().map(String::as_str).collect::<Vec<_>>());

    let out = data(
        &schema,
        "query($id: ID!) { users(first: 1, where: { id: $id }) { totalCount } }",
        json!({ "id": ids[0] }),
    )
    .await;
    assert_eq!(out["users"]["totalCount"], 1);

    let out = data(
        &schema,
        "query($id: ID!) { node(id: $id) { ... on User { name } } }",
        json!({ "id": ids[0] }),
    )
    .await;
    assert_eq!(out["node"], json!({ "name": "U1" }));

    let out = data(
        &schema,
        "query($ids: [ID!]!) { nodes(ids: $ids) { ... on User { name } } }",
        json!({ "ids": [ids[0], ids[1]] }),
    )
    .await;
    assert_eq!(out["nodes"], json!([{ "name": "U1" }, { "name": "U2" }]));
}

#[tokio::test]
async fn test_global_id_encodes_type_and_key() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let ids = create_users(&schema, &["U1"]).await;

    let gid = GlobalId::decode(&ids[0]).unwrap();
    assert_eq!(gid.type_tag(), "User");
    assert_eq!(gid, GlobalId::new("User", 1i64));
}

// Test critique: nodes garde l'ordre et met null aux positions invalides
#[tokio::test]
async fn test_nodes_mixed_types_preserve_order() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let users = create_users(&schema, &["U1", "U2"]).await;
    let video = create_video(&schema, "V1").await;
    let ghost = GlobalId::new("Ghost", 1i64).encode();
    let missing = GlobalId::new("User", 42i64).encode();

    let out = data(
        &schema,
        r#"query($ids: [ID!]!) {
            nodes(ids: $ids) {
                __typename
                id
                ... on User { name }
                ... on Video { name }
            }
        }"#,
        json!({ "ids": [users[1], "not an id", video, ghost, users[0], missing] }),
    )
    .await;

    let nodes = out["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 6);
    assert_eq!(nodes[0]["name"], "U2");
    assert_eq!(nodes[0]["__typename"], "User");
    assert!(nodes[1].is_null());
    assert_eq!(nodes[2]["__typename"], "Video");
    assert_eq!(nodes[2]["id"], video.as_str());
    assert!(nodes[3].is_null());
    assert_eq!(nodes[4]["name"], "U1");
    assert!(nodes[5].is_null());
}

#[tokio::test]
async fn test_node_error_codes() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let query = "query($id: ID!) { node(id: $id) { id } }";

    let code = error_code(&schema, query, json!({ "id": "%%%" })).await;
    assert_eq!(code, "INVALID_ID");

    let ghost = GlobalId::new("Ghost", 1i64).encode();
    let code = error_code(&schema, query, json!({ "id": ghost })).await;
    assert_eq!(code, "UNKNOWN_TYPE");

    // Une clé UUID sous le type User est invalide
    let wrong_kind = GlobalId::new("User", uuid::Uuid::nil()).encode();
    let code = error_code(&schema, query, json!({ "id": wrong_kind })).await;
    assert_eq!(code, "INVALID_ID");
}

// Test critique: un objet supprimé donne null, pas une erreur
#[tokio::test]
async fn test_deleted_node_resolves_to_null() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let ids = create_users(&schema, &["U1"]).await;

    let out = data(
        &schema,
        "mutation($id: ID!) { deleteUser(id: $id) }",
        json!({ "id": ids[0] }),
    )
    .await;
    assert_eq!(out["deleteUser"], true);

    let out = data(
        &schema,
        "query($id: ID!) { node(id: $id) { id } }",
        json!({ "id": ids[0] }),
    )
    .await;
    assert!(out["node"].is_null());
}

// =============================================================================
// Connections
// =============================================================================

// Test critique: pas de chevauchement ni de trou entre les pages
#[tokio::test]
async fn test_forward_pages_have_no_overlap_or_gap() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    create_users(&schema, &["U1", "U2", "U3", "U4", "U5"]).await;

    let page1 = data(&schema, USERS_PAGE, json!({ "first": 2 })).await;
    assert_eq!(names(&page1["users"]), vec!["U1", "U2"]);
    assert_eq!(page1["users"]["pageInfo"]["hasNextPage"], true);
    assert_eq!(page1["users"]["pageInfo"]["hasPreviousPage"], false);

    let after = page1["users"]["pageInfo"]["endCursor"].clone();
    let page2 = data(&schema, USERS_PAGE, json!({ "first": 2, "after": after })).await;
    assert_eq!(names(&page2["users"]), vec!["U3", "U4"]);
    assert_eq!(page2["users"]["pageInfo"]["hasPreviousPage"], true);

    let after = page2["users"]["pageInfo"]["endCursor"].clone();
    let page3 = data(&schema, USERS_PAGE, json!({ "first": 2, "after": after })).await;
    assert_eq!(names(&page3["users"]), vec!["U5"]);
    assert_eq!(page3["users"]["pageInfo"]["hasNextPage"], false);

    // totalCount ne dépend pas de la fenêtre
    for page in [&page1, &page2, &page3] {
        assert_eq!(page["users"]["totalCount"], 5);
    }
}

// Test critique: la pagination arrière rend les arêtes dans l'ordre déclaré
#[tokio::test]
async fn test_backward_pages_keep_ascending_order() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    create_users(&schema, &["U1", "U2", "U3", "U4", "U5"]).await;

    let tail = data(&schema, USERS_PAGE, json!({ "last": 2 })).await;
    assert_eq!(names(&tail["users"]), vec!["U4", "U5"]);
    assert_eq!(tail["users"]["pageInfo"]["hasPreviousPage"], true);
    assert_eq!(tail["users"]["pageInfo"]["hasNextPage"], false);

    let before = tail["users"]["pageInfo"]["startCursor"].clone();
    let prev = data(&schema, USERS_PAGE, json!({ "last": 3, "before": before })).await;
    assert_eq!(names(&prev["users"]), vec!["U1", "U2", "U3"]);
    assert_eq!(prev["users"]["pageInfo"]["hasPreviousPage"], false);
    assert_eq!(prev["users"]["pageInfo"]["hasNextPage"], true);
    assert_eq!(prev["users"]["totalCount"], 5);

    // Le dernier curseur de la page précédente pointe sur U3
    let edges = prev["users"]["edges"].as_array().unwrap();
    assert_eq!(prev["users"]["pageInfo"]["endCursor"], edges[2]["cursor"]);
}

#[tokio::test]
async fn test_ordering_by_name_desc_with_ties() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    create_users(&schema, &["bob", "alice", "carol", "alice"]).await;
    let order = json!({ "field": "NAME", "direction": "DESC" });

    let page1 = data(&schema, USERS_PAGE, json!({ "first": 2, "order": order })).await;
    assert_eq!(names(&page1["users"]), vec!["carol", "bob"]);

    let after = page1["users"]["pageInfo"]["endCursor"].clone();
    let page2 = data(
        &schema,
        USERS_PAGE,
        json!({ "first": 2, "after": after, "order": order }),
    )
    .await;
    assert_eq!(names(&page2["users"]), vec!["alice", "alice"]);
    assert_eq!(page2["users"]["pageInfo"]["hasNextPage"], false);

    // Égalité sur le nom: l'ID décide, dans le sens déclaré
    let ids: Vec<GlobalId> = page2["users"]["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| GlobalId::decode(e["node"]["id"].as_str().unwrap()).unwrap())
        .collect();
    assert_eq!(ids, vec![GlobalId::new("User", 4i64), GlobalId::new("User", 2i64)]);
}

#[tokio::test]
async fn test_where_filters() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let ids = create_users(&schema, &["anna", "annabel", "bob", "hanna"]).await;

    let query = r#"query($where: UserWhereInput) {
        users(where: $where) { totalCount edges { node { name } } }
    }"#;

    let out = data(&schema, query, json!({ "where": { "nameHasPrefix": "anna" } })).await;
    assert_eq!(names(&out["users"]), vec!["anna", "annabel"]);

    let out = data(&schema, query, json!({ "where": { "nameContains": "nn" } })).await;
    assert_eq!(out["users"]["totalCount"], 3);

    let out = data(
        &schema,
        query,
        json!({ "where": { "idIn": [ids[3], ids[0]], "not": { "name": "anna" } } }),
    )
    .await;
    assert_eq!(names(&out["users"]), vec!["hanna"]);

    let out = data(
        &schema,
        query,
        json!({ "where": { "or": [{ "name": "bob" }, { "idNEQ": ids[0], "nameHasPrefix": "a" }] } }),
    )
    .await;
    assert_eq!(names(&out["users"]), vec!["annabel", "bob"]);

    // Un ID de vidéo n'est pas accepté dans un filtre sur les utilisateurs
    let video = create_video(&schema, "V1").await;
    let code = error_code(&schema, query, json!({ "where": { "id": video } })).await;
    assert_eq!(code, "INVALID_ID");
}

#[tokio::test]
async fn test_videos_connection() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    for name in ["clip-b", "clip-a", "talk"] {
        create_video(&schema, name).await;
    }

    let out = data(
        &schema,
        r#"{
            videos(first: 5, where: { nameHasPrefix: "clip" }, orderBy: { field: NAME }) {
                totalCount
                edges { node { name } }
                pageInfo { hasNextPage hasPreviousPage }
            }
        }"#,
        json!({}),
    )
    .await;
    assert_eq!(out["videos"]["totalCount"], 2);
    assert_eq!(names(&out["videos"]), vec!["clip-a", "clip-b"]);
    assert_eq!(out["videos"]["pageInfo"]["hasNextPage"], false);
}

#[tokio::test]
async fn test_first_zero_returns_count_only() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    create_users(&schema, &["U1", "U2"]).await;

    let out = data(&schema, USERS_PAGE, json!({ "first": 0 })).await;
    assert_eq!(out["users"]["totalCount"], 2);
    assert_eq!(out["users"]["edges"], json!([]));
    assert!(out["users"]["pageInfo"]["startCursor"].is_null());
    assert!(out["users"]["pageInfo"]["endCursor"].is_null());
    assert_eq!(out["users"]["pageInfo"]["hasNextPage"], true);
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let repos = Arc::new(MemoryRepositories::new());
    let registry = Arc::new(build_node_registry(Arc::clone(&repos)).unwrap());
    let schema = build_schema(
        repos,
        registry,
        PaginationConfig {
            default_page_size: 2,
            max_page_size: 3,
        },
    );
    create_users(&schema, &["U1", "U2", "U3", "U4"]).await;

    let out = data(&schema, USERS_PAGE, json!({})).await;
    assert_eq!(names(&out["users"]), vec!["U1", "U2"]);

    let out = data(&schema, USERS_PAGE, json!({ "first": 1000 })).await;
    assert_eq!(names(&out["users"]), vec!["U1", "U2", "U3"]);
    assert_eq!(out["users"]["pageInfo"]["hasNextPage"], true);
}

// =============================================================================
// Argument errors
// =============================================================================

#[tokio::test]
async fn test_pagination_argument_errors() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    create_users(&schema, &["U1"]).await;

    let code = error_code(&schema, USERS_PAGE, json!({ "first": 1, "last": 1 })).await;
    assert_eq!(code, "CONFLICTING_ARGUMENTS");

    let code = error_code(&schema, USERS_PAGE, json!({ "first": -1 })).await;
    assert_eq!(code, "INVALID_ARGUMENT");

    let code = error_code(&schema, USERS_PAGE, json!({ "after": "garbage" })).await;
    assert_eq!(code, "INVALID_CURSOR");
}

// Test critique: un curseur émis sous un autre ordre est refusé
#[tokio::test]
async fn test_cursor_from_other_order_is_rejected() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    create_users(&schema, &["U1", "U2"]).await;

    let by_name = json!({ "field": "NAME" });
    let page = data(&schema, USERS_PAGE, json!({ "first": 1, "order": by_name })).await;
    let cursor = page["users"]["pageInfo"]["endCursor"].clone();

    let code = error_code(&schema, USERS_PAGE, json!({ "first": 1, "after": cursor })).await;
    assert_eq!(code, "INVALID_CURSOR");
}

// Test critique: un curseur n'est pas un ID et inversement
#[tokio::test]
async fn test_cursor_and_id_are_not_interchangeable() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let ids = create_users(&schema, &["U1"]).await;

    let page = data(&schema, USERS_PAGE, json!({ "first": 1 })).await;
    let cursor = page["users"]["edges"][0]["cursor"].as_str().unwrap().to_string();
    assert_ne!(cursor, ids[0]);

    let code = error_code(
        &schema,
        "query($id: ID!) { node(id: $id) { id } }",
        json!({ "id": cursor }),
    )
    .await;
    assert_eq!(code, "INVALID_ID");

    let code = error_code(&schema, USERS_PAGE, json!({ "after": ids[0] })).await;
    assert_eq!(code, "INVALID_CURSOR");
}

#[tokio::test]
async fn test_create_user_validation() {
    let schema = schema_with(Arc::new(MemoryRepositories::new()));
    let code = error_code(
        &schema,
        r#"mutation { createUser(input: { name: "  " }) { id } }"#,
        json!({}),
    )
    .await;
    assert_eq!(code, "VALIDATION");
}
