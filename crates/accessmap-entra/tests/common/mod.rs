//! Shared setup and data factories for the backend integration tests.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use accessmap_entra::{ApiClient, CloudEnvironment, EntraConfig, EntraCredentials, TokenCache};

pub const TENANT: &str = "tenant-1";
pub const SUBSCRIPTION: &str = "sub-1";

/// Starts a mock server with the token endpoint mounted and returns a
/// client wired to it for Graph, login, and ARM alike.
pub async fn setup() -> (MockServer, EntraConfig, Arc<ApiClient>) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response()))
        .mount(&server)
        .await;

    let mut config = EntraConfig::new(TENANT, SUBSCRIPTION);
    config.cloud = CloudEnvironment::Custom {
        graph_endpoint: server.uri(),
        login_endpoint: server.uri(),
        arm_endpoint: server.uri(),
    };

    let token_cache = Arc::new(TokenCache::new(
        EntraCredentials::new("client-1", "secret-1"),
        &config.cloud,
        TENANT.to_string(),
    ));
    let client = Arc::new(ApiClient::new(token_cache).unwrap());

    (server, config, client)
}

pub fn token_response() -> Value {
    json!({
        "access_token": "test-access-token",
        "token_type": "Bearer",
        "expires_in": 3600
    })
}

pub fn guid(n: u8) -> String {
    format!("00000000-0000-0000-0000-0000000000{n:02x}")
}

/// Wraps items in a Graph OData page.
pub fn odata_page(items: Vec<Value>, next_link: Option<String>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Wraps items in an ARM page.
pub fn arm_page(items: Vec<Value>, next_link: Option<String>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["nextLink"] = json!(link);
    }
    response
}

pub fn group_ref(id: &str) -> Value {
    json!({ "id": id })
}

pub fn group_summary(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "displayName": name,
        "description": format!("Security group {name}")
    })
}

pub fn role_assignment(id: &str, principal_id: &str, role_definition_id: &str) -> Value {
    json!({
        "id": format!("/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleAssignments/{id}"),
        "properties": {
            "principalId": principal_id,
            "principalType": "Group",
            "roleDefinitionId": role_definition_id,
            "scope": format!("/subscriptions/{SUBSCRIPTION}")
        }
    })
}

pub fn role_definition_id(name: &str) -> String {
    format!("/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleDefinitions/{name}")
}

pub fn role_definition(role_name: &str) -> Value {
    json!({
        "properties": {
            "roleName": role_name,
            "type": "BuiltInRole"
        }
    })
}

pub fn api_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}
