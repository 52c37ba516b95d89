mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{error_of, TestServer};

async fn admin_id(server: &TestServer) -> Result<String> {
    let body: Value = server.get("/authentication/me").await?.json().await?;
    Ok(body["item"]["id"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn create_role_generates_identifier() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .post("/roles", &json!({ "name": "Admin", "description": "Full access" }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    let item = &body["item"];
    assert_eq!(item["name"], "Admin");
    assert_eq!(item["description"], "Full access");
    assert!(Uuid::parse_str(item["id"].as_str().unwrap()).is_ok());
    assert!(item["createdAt"].is_string());
    Ok(())
}

#[tokio::test]
async fn create_discards_client_identifier() -> Result<()> {
    let server = TestServer::spawn().await?;
    let supplied = Uuid::new_v4().to_string();

    let item = server
        .create("/roles", json!({ "id": supplied, "name": "Editor" }))
        .await?;
    let id = item["id"].as_str().unwrap();

    assert_ne!(id, supplied);
    assert_ne!(id, Uuid::nil().to_string());
    Ok(())
}

#[tokio::test]
async fn create_rejects_invalid_body() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.post("/roles", &json!({ "description": "no name" })).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let (error, message) = error_of(res).await?;
    assert_eq!(error, "Bad Request");
    assert_eq!(message, "Invalid request body.");
    Ok(())
}

#[tokio::test]
async fn get_one_finds_and_misses() -> Result<()> {
    let server = TestServer::spawn().await?;
    let item = server.create("/roles", json!({ "name": "Support" })).await?;

    let res = server.get(&format!("/roles/{}", item["id"].as_str().unwrap())).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["item"]["name"], "Support");

    let res = server.get(&format!("/roles/{}", Uuid::new_v4())).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let (_, message) = error_of(res).await?;
    assert_eq!(message, "The role was not found.");

    let res = server.get("/roles/not-a-uuid").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn list_paginates_twenty_five_rows() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = admin_id(&server).await?;

    for i in 0..25 {
        server
            .create("/organizations", json!({ "name": format!("Org {:02}", i), "ownerId": owner }))
            .await?;
    }

    let body: Value = server
        .get("/organizations?page=1&pageSize=10")
        .await?
        .json()
        .await?;
    assert_eq!(
        body["pagination"],
        json!({
            "count": 25,
            "pages": 3,
            "pageSize": 10,
            "currentPage": 1,
            "nextPage": 2,
            "previousPage": 1
        })
    );
    assert_eq!(body["items"].as_array().unwrap().len(), 10);

    let body: Value = server.get("/organizations?page=3&pageSize=10").await?.json().await?;
    assert_eq!(body["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["nextPage"], 3);
    assert_eq!(body["pagination"]["previousPage"], 2);

    let body: Value = server.get("/organizations?page=7").await?.json().await?;
    assert_eq!(body["pagination"]["currentPage"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 5);

    let body: Value = server.get("/organizations?disablePagination=true").await?.json().await?;
    assert_eq!(body["items"].as_array().unwrap().len(), 25);
    assert_eq!(body["pagination"]["count"], 25);
    Ok(())
}

#[tokio::test]
async fn empty_list_has_one_page() -> Result<()> {
    let server = TestServer::spawn().await?;

    let body: Value = server.get("/organizations").await?.json().await?;
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["pagination"]["count"], 0);
    assert_eq!(body["pagination"]["pages"], 1);
    Ok(())
}

#[tokio::test]
async fn list_searches_named_columns() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create("/roles", json!({ "name": "Billing Admin" })).await?;
    server
        .create("/roles", json!({ "name": "Reader", "description": "read-only billing views" }))
        .await?;
    server.create("/roles", json!({ "name": "Writer" })).await?;

    let body: Value = server
        .get("/roles?searchTerm=BILLING&searchColumn=name")
        .await?
        .json()
        .await?;
    assert_eq!(body["pagination"]["count"], 1);
    assert_eq!(body["items"][0]["name"], "Billing Admin");

    let body: Value = server
        .get("/roles?searchTerm=billing&searchColumn=name&searchColumn=description")
        .await?
        .json()
        .await?;
    assert_eq!(body["pagination"]["count"], 2);
    Ok(())
}

#[tokio::test]
async fn preload_loads_relations() -> Result<()> {
    let server = TestServer::spawn().await?;
    let id = admin_id(&server).await?;

    let body: Value = server.get(&format!("/users/{}?preload=ROLES", id)).await?.json().await?;
    assert_eq!(body["item"]["roles"][0]["name"], "admin role");

    let body: Value = server.get(&format!("/users/{}?preload=roles.users", id)).await?.json().await?;
    assert_eq!(body["item"]["roles"][0]["users"][0]["username"], "admin");

    let body: Value = server.get("/users?preload[]=roles").await?.json().await?;
    assert!(body["items"][0]["roles"].is_array());

    let res = server.get(&format!("/users/{}?preload=teams", id)).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_echoes_the_request_body() -> Result<()> {
    let server = TestServer::spawn().await?;
    let item = server.create("/roles", json!({ "name": "Support" })).await?;
    let path = format!("/roles/{}", item["id"].as_str().unwrap());

    let res = server.put(&path, &json!({ "description": "Tier 1" })).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "item": { "description": "Tier 1" } }));

    let body: Value = server.get(&path).await?.json().await?;
    assert_eq!(body["item"]["name"], "Support");
    assert_eq!(body["item"]["description"], "Tier 1");
    Ok(())
}

#[tokio::test]
async fn update_maps_wire_names_to_columns() -> Result<()> {
    let server = TestServer::spawn().await?;
    let id = admin_id(&server).await?;

    let res = server.put(&format!("/users/{}", id), &json!({ "mfaEnabled": true })).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = server.get(&format!("/users/{}", id)).await?.json().await?;
    assert_eq!(body["item"]["mfaEnabled"], true);
    Ok(())
}

#[tokio::test]
async fn update_with_unknown_field_is_a_storage_failure() -> Result<()> {
    let server = TestServer::spawn().await?;
    let item = server.create("/roles", json!({ "name": "Support" })).await?;

    let res = server
        .put(&format!("/roles/{}", item["id"].as_str().unwrap()), &json!({ "mfaEnabled": true }))
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let (error, _) = error_of(res).await?;
    assert_eq!(error, "Internal Server Error");
    Ok(())
}

#[tokio::test]
async fn update_rejects_system_fields_and_missing_rows() -> Result<()> {
    let server = TestServer::spawn().await?;
    let item = server.create("/roles", json!({ "name": "Support" })).await?;

    let res = server
        .put(
            &format!("/roles/{}", item["id"].as_str().unwrap()),
            &json!({ "id": Uuid::new_v4() }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .put(&format!("/roles/{}", Uuid::new_v4()), &json!({ "name": "Ghost" }))
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_row() -> Result<()> {
    let server = TestServer::spawn().await?;
    let item = server.create("/roles", json!({ "name": "Temporary" })).await?;
    let path = format!("/roles/{}", item["id"].as_str().unwrap());

    let res = server.delete(&path).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.bytes().await?.is_empty());

    assert_eq!(server.get(&path).await?.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.delete(&path).await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn huge_page_size_is_one_page() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.create("/roles", json!({ "name": "One" })).await?;
    server.create("/roles", json!({ "name": "Two" })).await?;

    let res = server.get(&format!("/roles?pageSize={}&page=3", i64::MAX)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["pagination"]["pages"], 1);
    assert_eq!(body["pagination"]["currentPage"], 1);
    // the seeded admin role plus the two above
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    Ok(())
}

#[tokio::test]
async fn update_with_mistyped_values_leaves_the_row_intact() -> Result<()> {
    let server = TestServer::spawn().await?;
    let cookie = server.login_as("typist", &["users.*"]).await?;
    let me: Value = server.get_as("/authentication/me", &cookie).await?.json().await?;
    let path = format!("/users/{}", me["item"]["id"].as_str().unwrap());

    for body in [json!({ "mfaEnabled": "yes" }), json!({ "name": null })] {
        let res = server.put(&path, &body).await?;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let res = server.get_as("/authentication/me", &cookie).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["item"]["name"], "typist");
    assert_eq!(body["item"]["mfaEnabled"], false);
    Ok(())
}

#[tokio::test]
async fn deleting_a_role_drops_every_membership() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = admin_id(&server).await?;
    let org = server
        .create("/organizations", json!({ "name": "Acme", "ownerId": owner }))
        .await?;
    let org_id = org["id"].as_str().unwrap();

    let res = server
        .post(&format!("/organizations/assign-role/{}", org_id), &json!({ "name": "Auditor" }))
        .await?;
    let role: Value = res.json().await?;
    let role = role["item"].clone();

    let res = server.delete(&format!("/roles/{}", role["id"].as_str().unwrap())).await?;
    assert_eq!(res.status(), StatusCode::OK);

    // bring the same role back through another parent
    let user = server
        .create("/users", json!({ "name": "Kit", "username": "kit" }))
        .await?;
    let res = server
        .post(&format!("/users/assign-role/{}", user["id"].as_str().unwrap()), &role)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = server
        .get(&format!("/organizations/{}/list-roles", org_id))
        .await?
        .json()
        .await?;
    assert_eq!(body["pagination"]["count"], 0);
    Ok(())
}

#[tokio::test]
async fn owner_of_an_organization_cannot_be_deleted() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server
        .create("/users", json!({ "name": "Olive", "username": "olive" }))
        .await?;
    let owner_id = owner["id"].as_str().unwrap();
    let org = server
        .create("/organizations", json!({ "name": "Acme", "ownerId": owner_id }))
        .await?;

    let res = server.delete(&format!("/users/{}", owner_id)).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = server
        .get(&format!("/organizations/{}?preload=owner", org["id"].as_str().unwrap()))
        .await?
        .json()
        .await?;
    assert_eq!(body["item"]["owner"]["username"], "olive");
    Ok(())
}
