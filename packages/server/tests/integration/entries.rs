use serde_json::json;

use crate::common::{TestApp, routes};

mod auth {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ENTRIES).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_MISSING");
        assert!(res.body["error"].is_string());
    }

    #[tokio::test]
    async fn non_bearer_header_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_header(routes::ENTRIES, "Basic dXNlcjpwYXNz").await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let app = TestApp::spawn().await;
        let forged = journal_server::utils::jwt::sign(
            "some-other-secret",
            "alice",
            None,
            chrono::Duration::hours(1),
        )
        .unwrap();

        let res = app.get_with_token(routes::ENTRIES, &forged).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let app = TestApp::spawn().await;
        let expired = journal_server::utils::jwt::sign(
            crate::common::TEST_SECRET,
            "alice",
            None,
            chrono::Duration::hours(-2),
        )
        .unwrap();

        let res = app.get_with_token(routes::ENTRIES, &expired).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn every_entry_route_requires_a_token() {
        let app = TestApp::spawn().await;
        let id = uuid::Uuid::now_v7().to_string();

        let res = app.get_without_token(&routes::entry(&id)).await;
        assert_eq!(res.status, 401);

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::polish(&id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 401);

        let res = app
            .client
            .delete(format!("http://{}{}", app.addr, routes::entry(&id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 401);
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn creates_entry_owned_by_caller() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        let res = app
            .post_with_token(
                routes::ENTRIES,
                &json!({ "raw_text": "Walked to the harbour." }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["owner_id"], "alice");
        assert_eq!(res.body["raw_text"], "Walked to the harbour.");
        assert!(res.body["polished_text"].is_null());
        assert_eq!(res.body["photos"], json!([]));
        assert!(res.body["date"].is_string());
        uuid::Uuid::parse_str(&res.id()).unwrap();
    }

    #[tokio::test]
    async fn owner_in_body_is_ignored() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        let res = app
            .post_with_token(
                routes::ENTRIES,
                &json!({ "raw_text": "mine", "owner_id": "mallory" }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["owner_id"], "alice");
    }

    #[tokio::test]
    async fn explicit_date_is_kept() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        let res = app
            .post_with_token(
                routes::ENTRIES,
                &json!({ "raw_text": "back-dated", "date": "2024-03-01T08:30:00Z" }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201);
        let date: chrono::DateTime<chrono::Utc> =
            serde_json::from_value(res.body["date"].clone()).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-01T08:30:00+00:00");
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        for body in [json!({ "raw_text": "" }), json!({ "raw_text": "   \n" })] {
            let res = app.post_with_token(routes::ENTRIES, &body, &token).await;
            assert_eq!(res.status, 400);
            assert_eq!(res.code(), "VALIDATION_ERROR");
        }

        let listed = app.get_with_token(routes::ENTRIES, &token).await;
        assert!(listed.entries().is_empty());
    }

    #[tokio::test]
    async fn missing_text_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        let res = app
            .post_with_token(routes::ENTRIES, &json!({ "date": "2024-03-01T00:00:00Z" }), &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod get {
    use super::*;

    #[tokio::test]
    async fn owner_can_fetch_entry() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");
        let id = app.create_entry(&token, "hello", None).await;

        let res = app.get_with_token(&routes::entry(&id), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.id(), id);
        assert_eq!(res.body["raw_text"], "hello");
    }

    #[tokio::test]
    async fn foreign_entry_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.token("alice");
        let bob = app.token("bob");
        let id = app.create_entry(&alice, "private", None).await;

        let res = app.get_with_token(&routes::entry(&id), &bob).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");

        let res = app.get_with_token(&routes::entry("not-a-uuid"), &token).await;
        assert_eq!(res.status, 400);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn edit_replaces_text_and_clears_polish() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");
        let id = app.create_entry(&token, "first draft", None).await;

        let polished = app.post_with_token(&routes::polish(&id), &json!({}), &token).await;
        assert_eq!(polished.status, 200);
        assert!(polished.body["polished_text"].is_string());

        let res = app
            .patch_with_token(&routes::entry(&id), &json!({ "raw_text": "second draft" }), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["raw_text"], "second draft");
        assert!(res.body["polished_text"].is_null());

        let fetched = app.get_with_token(&routes::entry(&id), &token).await;
        assert_eq!(fetched.body["raw_text"], "second draft");
        assert!(fetched.body["polished_text"].is_null());

        let listed = app.get_with_token(routes::ENTRIES, &token).await;
        assert_eq!(listed.status, 200);
        let row = listed
            .entries()
            .into_iter()
            .find(|e| e["id"] == id.as_str())
            .expect("edited entry is listed");
        assert_eq!(row["raw_text"], "second draft");
        assert!(row["polished_text"].is_null());
    }

    #[tokio::test]
    async fn blank_edit_leaves_entry_untouched() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");
        let id = app.create_entry(&token, "keep me", None).await;
        app.post_with_token(&routes::polish(&id), &json!({}), &token).await;

        let res = app
            .patch_with_token(&routes::entry(&id), &json!({ "raw_text": "  " }), &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");

        let fetched = app.get_with_token(&routes::entry(&id), &token).await;
        assert_eq!(fetched.body["raw_text"], "keep me");
        assert_eq!(fetched.body["polished_text"], "<p>keep me</p>");
    }

    #[tokio::test]
    async fn foreign_edit_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.token("alice");
        let bob = app.token("bob");
        let id = app.create_entry(&alice, "original", None).await;

        let res = app
            .patch_with_token(&routes::entry(&id), &json!({ "raw_text": "hijacked" }), &bob)
            .await;
        assert_eq!(res.status, 404);

        let fetched = app.get_with_token(&routes::entry(&id), &alice).await;
        assert_eq!(fetched.body["raw_text"], "original");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_entry() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");
        let id = app.create_entry(&token, "short-lived", None).await;

        let res = app.delete_with_token(&routes::entry(&id), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["success"], true);

        let fetched = app.get_with_token(&routes::entry(&id), &token).await;
        assert_eq!(fetched.status, 404);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let app = TestApp::spawn().await;
        let token = app.token("alice");
        let id = app.create_entry(&token, "twice", None).await;

        let first = app.delete_with_token(&routes::entry(&id), &token).await;
        let second = app.delete_with_token(&routes::entry(&id), &token).await;
        assert_eq!(first.status, 200);
        assert_eq!(second.status, 200);
        assert_eq!(second.body["success"], true);

        let unknown = uuid::Uuid::now_v7().to_string();
        let third = app.delete_with_token(&routes::entry(&unknown), &token).await;
        assert_eq!(third.status, 200);
    }

    #[tokio::test]
    async fn foreign_delete_reports_success_but_keeps_entry() {
        let app = TestApp::spawn().await;
        let alice = app.token("alice");
        let bob = app.token("bob");
        let id = app.create_entry(&alice, "not yours", None).await;

        let res = app.delete_with_token(&routes::entry(&id), &bob).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["success"], true);

        let fetched = app.get_with_token(&routes::entry(&id), &alice).await;
        assert_eq!(fetched.status, 200);
    }
}
