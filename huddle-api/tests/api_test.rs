/// Integration tests for the Huddle API
///
/// These tests drive the full router (auth middleware, handlers, error
/// mapping) over the in-memory store:
/// - Accounts and tokens
/// - Group and game lifecycle
/// - Join requests and role checks
/// - Cascade delete and leaving
/// - Password reset by email

mod common;

use axum::http::StatusCode;
use common::{TestContext, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new();
    let jane = ctx.register("Jane").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "JANE@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["token"].is_string());

    let (status, body) = ctx.get("/api/v1/auth/me", Some(&jane.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_bad_login() {
    let ctx = TestContext::new();
    ctx.register("Jane").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "jane@example.com", "password": "Wr0ng@Password" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "", "email": "nope", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "name"]);

    ctx.register("Jane").await;
    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "Jane", "email": "jane@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email is already registered");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized to access this route");

    let (status, _) = ctx.get("/api/v1/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send(
            "POST",
            "/api/v1/groups",
            None,
            Some(json!({ "name": "Chess Club", "description": "Weekly blitz" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Listing stays public
    let (status, _) = ctx.get("/api/v1/groups", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_fetch_group() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;

    let (status, body) = ctx.get(&format!("/api/v1/groups/{group_id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["name"], "Chess Club");
    assert_eq!(data["slug"], "chess-club");
    assert_eq!(data["photo"], "no-photo.jpg");
    assert_eq!(data["users"].as_array().unwrap().len(), 1);
    assert_eq!(data["users"][0]["user"], owner.id.to_string());
    assert_eq!(data["users"][0]["role"], "creator");
    assert!(data["requests"].as_array().unwrap().is_empty());

    let (_, body) = ctx.get("/api/v1/auth/groups", Some(&owner.token)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["group"], group_id);
    assert_eq!(body["data"][0]["role"], "creator");

    let (status, body) = ctx
        .get(&format!("/api/v1/auth/groups/{group_id}"), Some(&owner.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["group"], group_id);
}

#[tokio::test]
async fn test_missing_group_is_not_found() {
    let ctx = TestContext::new();
    let missing = uuid::Uuid::new_v4();

    let (status, body) = ctx.get(&format!("/api/v1/groups/{missing}"), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["message"], format!("Group not found with id of {missing}"));
}

#[tokio::test]
async fn test_duplicate_join_request_conflicts() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let jane = ctx.register("Jane").await;
    let base = format!("/api/v1/groups/{}", ctx.create_group(&owner, "Chess Club").await);

    ctx.request_join(&base, &jane).await;

    let (status, body) = ctx
        .send(
            "POST",
            &format!("{base}/request"),
            Some(&jane.token),
            Some(json!({ "message": "Please?" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already made request");

    let (_, body) = ctx.get(&format!("{base}/request"), Some(&owner.token)).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_accept_request_makes_member() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let jane = ctx.register("Jane").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;
    let base = format!("/api/v1/groups/{group_id}");

    let request_id = ctx.request_join(&base, &jane).await;

    let (status, body) = ctx
        .get(&format!("{base}/request/{request_id}"), Some(&owner.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"], jane.id.to_string());

    let (status, body) = ctx
        .send("PUT", &format!("{base}/request/{request_id}"), Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"], jane.id.to_string());
    assert_eq!(body["data"]["role"], "user");

    let (status, body) = ctx
        .get(&format!("{base}/users/{}", jane.id), Some(&owner.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "user");

    let (_, body) = ctx.get("/api/v1/auth/groups", Some(&jane.token)).await;
    assert_eq!(body["data"][0]["group"], group_id);

    let (_, body) = ctx.get(&format!("{base}/request"), Some(&owner.token)).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_plain_member_cannot_moderate() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let member = ctx.register("Member").await;
    let outsider = ctx.register("Outsider").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;
    let base = format!("/api/v1/groups/{group_id}");

    ctx.join(&base, &member, &owner).await;
    let request_id = ctx.request_join(&base, &outsider).await;

    let attempts = [
        ("GET", format!("{base}/request"), None),
        ("PUT", format!("{base}/request/{request_id}"), None),
        ("DELETE", format!("{base}/request/{request_id}"), None),
        ("DELETE", format!("{base}/users/{}", owner.id), None),
        ("PUT", base.clone(), Some(json!({ "name": "Hijacked" }))),
        ("DELETE", base.clone(), None),
    ];

    for (method, uri, body) in attempts {
        let (status, response) = ctx.send(method, &uri, Some(&member.token), body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}: {response}");
        assert_eq!(
            response["message"],
            "User must be a creator or moderator of the group"
        );
    }

    // A non-member is told it isn't part of the group
    let (status, body) = ctx.get(&format!("{base}/request"), Some(&outsider.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User is not part of the group");
}

#[tokio::test]
async fn test_deny_twice_is_not_found() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let jane = ctx.register("Jane").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;
    let game_id = ctx.create_game(&owner, &group_id, "Friday blitz").await;
    let base = format!("/api/v1/games/{game_id}");

    let request_id = ctx.request_join(&base, &jane).await;
    let uri = format!("{base}/request/{request_id}");

    let (status, _) = ctx.send("DELETE", &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.send("DELETE", &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Request not found");

    let (_, body) = ctx.get(&format!("{base}/users"), Some(&owner.token)).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_game_lifecycle() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let host = ctx.register("Host").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;

    let game_id = ctx.create_game(&host, &group_id, "Friday blitz").await;

    let (status, body) = ctx
        .get(&format!("/api/v1/games/{game_id}"), Some(&host.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["group"], group_id);
    assert_eq!(body["data"]["users"][0]["role"], "creator");

    let (_, body) = ctx.get(&format!("/api/v1/groups/{group_id}/games"), None).await;
    assert_eq!(body["count"], 1);

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/api/v1/games/{game_id}"),
            Some(&host.token),
            Some(json!({ "title": "Saturday blitz" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Saturday blitz");
    assert_eq!(body["data"]["description"], "Bring snacks");

    let (status, _) = ctx
        .send("DELETE", &format!("/api/v1/games/{game_id}"), Some(&host.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx.get("/api/v1/auth/games", Some(&host.token)).await;
    assert_eq!(body["count"], 0);

    let (status, _) = ctx
        .get(&format!("/api/v1/games/{game_id}"), Some(&host.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_game_in_missing_group() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/api/v1/groups/{missing}/games"),
            Some(&owner.token),
            Some(json!({ "title": "Orphan", "description": "No group" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("No group with the id of {missing}"));
}

#[tokio::test]
async fn test_delete_group_cascades() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;
    let g1 = ctx.create_game(&owner, &group_id, "Friday blitz").await;
    let g2 = ctx.create_game(&owner, &group_id, "Sunday classical").await;

    for user in [&alice, &bob] {
        ctx.join(&format!("/api/v1/groups/{group_id}"), user, &owner).await;
        ctx.join(&format!("/api/v1/games/{g1}"), user, &owner).await;
        ctx.join(&format!("/api/v1/games/{g2}"), user, &owner).await;
    }

    let (status, _) = ctx
        .send("DELETE", &format!("/api/v1/groups/{group_id}"), Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    for game_id in [&g1, &g2] {
        let (status, _) = ctx
            .get(&format!("/api/v1/games/{game_id}"), Some(&owner.token))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    for user in [&owner, &alice, &bob] {
        let (_, groups) = ctx.get("/api/v1/auth/groups", Some(&user.token)).await;
        let (_, games) = ctx.get("/api/v1/auth/games", Some(&user.token)).await;
        assert_eq!(groups["count"], 0);
        assert_eq!(games["count"], 0);
    }
}

#[tokio::test]
async fn test_remove_member_and_leave() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    let alice = ctx.register("Alice").await;
    let bob = ctx.register("Bob").await;
    let group_id = ctx.create_group(&owner, "Chess Club").await;
    let game_id = ctx.create_game(&owner, &group_id, "Friday blitz").await;
    let group_base = format!("/api/v1/groups/{group_id}");
    let game_base = format!("/api/v1/games/{game_id}");

    for user in [&alice, &bob] {
        ctx.join(&group_base, user, &owner).await;
        ctx.join(&game_base, user, &owner).await;
    }

    let (status, body) = ctx
        .send(
            "DELETE",
            &format!("{group_base}/users/{}", alice.id),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, games) = ctx.get("/api/v1/auth/games", Some(&alice.token)).await;
    assert_eq!(games["count"], 0);

    let (status, _) = ctx
        .send(
            "DELETE",
            &format!("/api/v1/auth/groups/{group_id}"),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, groups) = ctx.get("/api/v1/auth/groups", Some(&bob.token)).await;
    let (_, games) = ctx.get("/api/v1/auth/games", Some(&bob.token)).await;
    assert_eq!(groups["count"], 0);
    assert_eq!(games["count"], 0);

    let (_, members) = ctx.get(&format!("{game_base}/users"), Some(&owner.token)).await;
    assert_eq!(members["count"], 1);
}

#[tokio::test]
async fn test_group_pagination() {
    let ctx = TestContext::new();
    let owner = ctx.register("Owner").await;
    for i in 0..3 {
        ctx.create_group(&owner, &format!("Club {i}")).await;
    }

    let (status, body) = ctx.get("/api/v1/groups?page=1&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["next"]["page"], 2);
    assert!(body["pagination"].get("prev").is_none());

    let (_, body) = ctx.get("/api/v1/groups?page=2&limit=2", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["pagination"]["prev"]["page"], 1);
    assert!(body["pagination"].get("next").is_none());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let ctx = TestContext::new();
    ctx.register("Jane").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({ "email": "jane@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Email sent");

    let token = ctx.mailer.last_token().expect("Reset email should be sent");
    assert!(ctx.mailer.sent.lock().unwrap()[0]
        .body
        .contains(&format!("{}/api/v1/auth/resetpassword/", ctx.config.api.public_url)));

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/api/v1/auth/resetpassword/{token}"),
            None,
            Some(json!({ "password": "N3w@Password!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = ctx
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "jane@example.com", "password": "N3w@Password!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/api/v1/auth/resetpassword/{token}"),
            None,
            Some(json!({ "password": "An0ther@Password" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "There is no user with that email");
    assert!(ctx.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_details_and_password() {
    let ctx = TestContext::new();
    let jane = ctx.register("Jane").await;

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/v1/auth/updatedetails",
            Some(&jane.token),
            Some(json!({ "name": "Jane Smith" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Jane Smith");

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/v1/auth/updatepassword",
            Some(&jane.token),
            Some(json!({ "currentPassword": "Wr0ng@Password", "newPassword": "N3w@Password!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/v1/auth/updatepassword",
            Some(&jane.token),
            Some(json!({ "currentPassword": PASSWORD, "newPassword": "N3w@Password!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_missing_body_field_is_validation_error() {
    let ctx = TestContext::new();
    let jane = ctx.register("Jane").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/groups",
            Some(&jane.token),
            Some(json!({ "name": "Chess" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "description");
    assert_eq!(body["message"], "description is required");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!("not an object")),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_invalid_ids_are_bad_request() {
    let ctx = TestContext::new();
    let jane = ctx.register("Jane").await;

    let (status, body) = ctx.get("/api/v1/groups/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "bad_request");

    let group_id = ctx.create_group(&jane, "Chess Club").await;
    let (status, body) = ctx
        .get(
            &format!("/api/v1/groups/{group_id}/request/not-a-uuid"),
            Some(&jane.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_invalid_page_query_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/v1/groups?page=first", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_forgot_password_normalizes_email() {
    let ctx = TestContext::new();
    ctx.register("Jane").await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/v1/auth/forgotpassword",
            None,
            Some(json!({ "email": "  Jane@Example.com " })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], "Email sent");
    assert!(ctx.mailer.last_token().is_some());
}
