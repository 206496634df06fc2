//! End-to-end API tests: the real router over an in-memory SQLite database

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use foodgram_common::{
    auth::JwtManager, config::AppConfig, db::DbPool, media::FsImageStore, Repository,
};
use foodgram_gateway::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::ServiceExt;

// 1x1 transparent PNG
const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

struct TestApp {
    router: Router,
    jwt: Arc<JwtManager>,
    repo: Repository,
    media: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    fn error_code(&self) -> String {
        self.json()["error"]["code"].as_str().unwrap().to_string()
    }
}

async fn app() -> TestApp {
    let media = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.database.min_connections = 1;
    config.media.root = media.path().to_string_lossy().into_owned();

    let db = DbPool::new(&config.database).await.unwrap();
    db.migrate().await.unwrap();

    let repo = Repository::new(db.clone());
    repo.import_tags(vec![
        ("Breakfast".into(), "breakfast".into()),
        ("Lunch".into(), "lunch".into()),
    ])
    .await
    .unwrap();
    repo.import_ingredients(vec![
        ("flour".into(), "g".into()),
        ("milk".into(), "ml".into()),
    ])
    .await
    .unwrap();

    let jwt = Arc::new(JwtManager::new("test-secret", 3600));
    let state = AppState {
        images: Arc::new(FsImageStore::from_config(&config.media)),
        config: Arc::new(config),
        db,
        jwt: jwt.clone(),
        metrics: None,
    };

    TestApp {
        router: create_router(state),
        jwt,
        repo,
        media,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        Reply { status, headers, body }
    }

    /// Register a user and return (id, token)
    async fn user(&self, username: &str) -> (i64, String) {
        let reply = self
            .send(
                Method::POST,
                "/api/users",
                None,
                Some(json!({
                    "email": format!("{}@example.com", username),
                    "username": username,
                    "first_name": "Test",
                    "last_name": "User",
                    "password": "s3cret-password",
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let id = reply.json()["id"].as_i64().unwrap();
        let token = self.jwt.generate_token(id as i32).unwrap();
        (id, token)
    }

    async fn ids(&self) -> (i32, i32, i32, i32) {
        let tags = self.repo.list_tags().await.unwrap();
        let ingredients = self.repo.list_ingredients(None).await.unwrap();
        let flour = ingredients.iter().find(|i| i.name == "flour").unwrap().id;
        let milk = ingredients.iter().find(|i| i.name == "milk").unwrap().id;
        (tags[0].id, tags[1].id, flour, milk)
    }

    async fn recipe_payload(&self, name: &str) -> Value {
        let (breakfast, _, flour, milk) = self.ids().await;
        json!({
            "name": name,
            "text": "Whisk, rest, fry.",
            "cooking_time": 20,
            "image": PNG,
            "tags": [breakfast],
            "ingredients": [
                {"id": flour, "amount": 200},
                {"id": milk, "amount": 300},
            ],
        })
    }
}

#[tokio::test]
async fn health_and_catalogue() {
    let app = app().await;

    let reply = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "healthy");

    let reply = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = app.send(Method::GET, "/api/tags", None, None).await;
    assert_eq!(reply.json().as_array().unwrap().len(), 2);

    let reply = app.send(Method::GET, "/api/ingredients?name=FL", None, None).await;
    let found = reply.json();
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["measurement_unit"], "g");

    let reply = app.send(Method::GET, "/api/tags/999", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authentication_is_required_for_writes() {
    let app = app().await;
    let payload = app.recipe_payload("Pancakes").await;

    let reply = app.send(Method::POST, "/api/recipes", None, Some(payload)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.error_code(), "UNAUTHENTICATED");

    let reply = app.send(Method::GET, "/api/recipes", Some("not-a-jwt"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.send(Method::GET, "/api/recipes/download_shopping_cart", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_recipe_reports_every_field() {
    let app = app().await;
    let (_, token) = app.user("chef").await;

    let reply = app
        .send(
            Method::POST,
            "/api/recipes",
            Some(&token),
            Some(json!({
                "name": "Nothing",
                "text": "Empty",
                "cooking_time": 0,
                "image": PNG,
                "tags": [],
                "ingredients": [],
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let body = reply.json();
    let details = &body["error"]["details"];
    assert_eq!(details["cooking_time"][0]["code"], "INVALID_QUANTITY");
    assert_eq!(details["tags"][0]["code"], "MISSING_FIELD");
    assert_eq!(details["ingredients"][0]["code"], "MISSING_FIELD");

    // Nothing was stored
    let images = app.media.path().join("recipes/images");
    assert!(!images.exists() || std::fs::read_dir(images).unwrap().next().is_none());
}

#[tokio::test]
async fn duplicate_ingredients_are_rejected() {
    let app = app().await;
    let (_, token) = app.user("chef").await;
    let (breakfast, _, flour, _) = app.ids().await;

    let reply = app
        .send(
            Method::POST,
            "/api/recipes",
            Some(&token),
            Some(json!({
                "name": "Double flour",
                "text": "Twice",
                "cooking_time": 5,
                "image": PNG,
                "tags": [breakfast],
                "ingredients": [{"id": flour, "amount": 5}, {"id": flour, "amount": 3}],
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["details"]["ingredients"][0]["code"], "DUPLICATE_REFERENCE");

    let reply = app.send(Method::GET, "/api/recipes", None, None).await;
    assert_eq!(reply.json()["count"], 0);
}

#[tokio::test]
async fn recipe_lifecycle() {
    let app = app().await;
    let (chef_id, token) = app.user("chef").await;
    let payload = app.recipe_payload("Pancakes").await;

    let reply = app.send(Method::POST, "/api/recipes", Some(&token), Some(payload.clone())).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let created = reply.json();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["author"]["id"], chef_id);
    assert_eq!(created["is_favorited"], false);
    assert_eq!(created["ingredients"].as_array().unwrap().len(), 2);
    let image = created["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("/media/recipes/images/"));
    let file = app.media.path().join(image.trim_start_matches("/media/"));
    assert!(file.exists());

    // Same name again
    let reply = app.send(Method::POST, "/api/recipes", Some(&token), Some(payload)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "ALREADY_EXISTS");

    let reply = app.send(Method::GET, "/api/recipes?tags=breakfast", None, None).await;
    assert_eq!(reply.json()["count"], 1);
    let reply = app.send(Method::GET, "/api/recipes?tags=lunch", None, None).await;
    assert_eq!(reply.json()["count"], 0);

    let reply = app.send(Method::GET, &format!("/api/recipes/{}/get-link", id), None, None).await;
    assert_eq!(reply.json()["short-link"], "http://localhost:8080/s/pancakes");

    let reply = app.send(Method::GET, "/s/pancakes", None, None).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(
        reply.headers[header::LOCATION].to_str().unwrap(),
        format!("/api/recipes/{}", id)
    );

    // Update keeps the uploaded image when its reference is sent back
    let (_, lunch, flour, _) = app.ids().await;
    let reply = app
        .send(
            Method::PATCH,
            &format!("/api/recipes/{}", id),
            Some(&token),
            Some(json!({
                "name": "Thin pancakes",
                "text": "Thinner.",
                "cooking_time": 25,
                "image": image,
                "tags": [lunch],
                "ingredients": [{"id": flour, "amount": 150}],
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.json();
    assert_eq!(updated["name"], "Thin pancakes");
    assert_eq!(updated["image"], image.as_str());
    assert_eq!(updated["tags"][0]["slug"], "lunch");
    assert_eq!(updated["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(updated["ingredients"][0]["amount"], 150);

    let reply = app.send(Method::DELETE, &format!("/api/recipes/{}", id), Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(!file.exists());

    let reply = app.send(Method::GET, &format!("/api/recipes/{}", id), None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_author_may_change_a_recipe() {
    let app = app().await;
    let (_, chef) = app.user("chef").await;
    let (_, guest) = app.user("guest").await;
    let payload = app.recipe_payload("Porridge").await;

    let reply = app.send(Method::POST, "/api/recipes", Some(&chef), Some(payload.clone())).await;
    let id = reply.json()["id"].as_i64().unwrap();
    let uri = format!("/api/recipes/{}", id);

    let reply = app.send(Method::PATCH, &uri, Some(&guest), Some(payload)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.send(Method::DELETE, &uri, Some(&guest), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.send(Method::DELETE, "/api/recipes/9999", Some(&guest), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorites_cart_and_shopping_list() {
    let app = app().await;
    let (_, chef) = app.user("chef").await;
    let (_, reader) = app.user("reader").await;

    let first = app.recipe_payload("Crepes").await;
    let reply = app.send(Method::POST, "/api/recipes", Some(&chef), Some(first)).await;
    let first_id = reply.json()["id"].as_i64().unwrap();

    let second = app.recipe_payload("Waffles").await;
    let reply = app.send(Method::POST, "/api/recipes", Some(&chef), Some(second)).await;
    let second_id = reply.json()["id"].as_i64().unwrap();

    let favorite = format!("/api/recipes/{}/favorite", first_id);
    let reply = app.send(Method::POST, &favorite, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.json()["name"], "Crepes");

    let reply = app.send(Method::POST, &favorite, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "ALREADY_EXISTS");

    let reply = app.send(Method::GET, "/api/recipes?is_favorited=1", Some(&reader), None).await;
    assert_eq!(reply.json()["count"], 1);
    assert_eq!(reply.json()["results"][0]["is_favorited"], true);

    let reply = app.send(Method::DELETE, &favorite, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let reply = app.send(Method::DELETE, &favorite, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.send(Method::POST, "/api/recipes/9999/favorite", Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    // Empty cart renders an empty list
    let reply = app.send(Method::GET, "/api/recipes/download_shopping_cart", Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "");

    for id in [first_id, second_id] {
        let reply = app
            .send(Method::POST, &format!("/api/recipes/{}/shopping_cart", id), Some(&reader), None)
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let reply = app.send(Method::GET, "/api/recipes/download_shopping_cart", Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    assert_eq!(
        reply.headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
        "attachment; filename=\"shopping.txt\""
    );
    assert_eq!(reply.text(), "flour: 400, g\nmilk: 600, ml\n");
}

#[tokio::test]
async fn subscriptions() {
    let app = app().await;
    let (chef_id, chef) = app.user("chef").await;
    let (reader_id, reader) = app.user("reader").await;

    for name in ["Soup", "Stew"] {
        let payload = app.recipe_payload(name).await;
        let reply = app.send(Method::POST, "/api/recipes", Some(&chef), Some(payload)).await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    let reply = app
        .send(Method::POST, &format!("/api/users/{}/subscribe", reader_id), Some(&reader), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.error_code(), "SELF_REFERENCE");

    let subscribe = format!("/api/users/{}/subscribe", chef_id);
    let reply = app
        .send(Method::POST, &format!("{}?recipes_limit=1", subscribe), Some(&reader), None)
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let body = reply.json();
    assert_eq!(body["username"], "chef");
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 2);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 1);

    let reply = app.send(Method::POST, &subscribe, Some(&reader), None).await;
    assert_eq!(reply.error_code(), "ALREADY_EXISTS");

    let reply = app.send(Method::GET, "/api/users/subscriptions", Some(&reader), None).await;
    assert_eq!(reply.json()["count"], 1);
    assert_eq!(reply.json()["results"][0]["recipes"].as_array().unwrap().len(), 2);

    let reply = app.send(Method::GET, &format!("/api/users/{}", chef_id), Some(&reader), None).await;
    assert_eq!(reply.json()["is_subscribed"], true);
    let reply = app.send(Method::GET, &format!("/api/users/{}", chef_id), None, None).await;
    assert_eq!(reply.json()["is_subscribed"], false);

    let reply = app.send(Method::DELETE, &subscribe, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let reply = app.send(Method::DELETE, &subscribe, Some(&reader), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn accounts() {
    let app = app().await;
    let (id, token) = app.user("chef").await;

    let reply = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["id"], id);
    assert!(reply.json().get("password_hash").is_none());

    let reply = app
        .send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({
                "email": "other@example.com",
                "username": "chef",
                "first_name": "A",
                "last_name": "B",
                "password": "long-enough-1",
            })),
        )
        .await;
    assert_eq!(reply.error_code(), "ALREADY_EXISTS");

    let reply = app
        .send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({
                "email": "broken",
                "username": "me",
                "first_name": "A",
                "last_name": "B",
                "password": "short",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let details = reply.json()["error"]["details"].clone();
    assert!(details.get("email").is_some());
    assert!(details.get("username").is_some());
    assert!(details.get("password").is_some());

    let reply = app
        .send(
            Method::POST,
            "/api/users/set_password",
            Some(&token),
            Some(json!({"current_password": "wrong-password", "new_password": "brand-new-pass"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .send(
            Method::POST,
            "/api/users/set_password",
            Some(&token),
            Some(json!({"current_password": "s3cret-password", "new_password": "brand-new-pass"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let user = assert_ok!(app.repo.get_user(id as i32).await);
    assert!(foodgram_common::auth::verify_password("brand-new-pass", &user.password_hash));

    let reply = app.send(Method::GET, "/api/users?limit=1", None, None).await;
    let page = reply.json();
    assert_eq!(page["count"], 1);
    assert!(page["next"].is_null());
}

#[tokio::test]
async fn recipes_cannot_adopt_another_users_image() {
    let app = app().await;
    let (_, victim) = app.user("victim").await;
    let (_, thief) = app.user("thief").await;

    let payload = app.recipe_payload("Borscht").await;
    let reply = app.send(Method::POST, "/api/recipes", Some(&victim), Some(payload)).await;
    let stolen = reply.json()["image"].as_str().unwrap().to_string();
    let file = app.media.path().join(stolen.trim_start_matches("/media/"));

    let mut payload = app.recipe_payload("Copycat").await;
    payload["image"] = json!(stolen);
    let reply = app.send(Method::POST, "/api/recipes", Some(&thief), Some(payload)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["details"]["image"][0]["code"], "INVALID_FORMAT");

    // The thief's own recipe cannot switch to it either
    let payload = app.recipe_payload("Own dish").await;
    let reply = app.send(Method::POST, "/api/recipes", Some(&thief), Some(payload)).await;
    let own_id = reply.json()["id"].as_i64().unwrap();
    let mut update = app.recipe_payload("Own dish").await;
    update["image"] = json!(stolen);
    let reply = app
        .send(Method::PATCH, &format!("/api/recipes/{}", own_id), Some(&thief), Some(update))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.send(Method::DELETE, &format!("/api/recipes/{}", own_id), Some(&thief), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(file.exists());
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let app = app().await;
    let (_, token) = app.user("chef").await;
    let (breakfast, _, flour, _) = app.ids().await;

    let reply = app
        .send(
            Method::POST,
            "/api/recipes",
            Some(&token),
            Some(json!({
                "name": "No amount",
                "text": "How much?",
                "cooking_time": 5,
                "image": PNG,
                "tags": [breakfast],
                "ingredients": [{"id": flour}],
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["details"]["ingredients"][0]["code"], "INVALID_QUANTITY");

    let mut payload = app.recipe_payload("Someday").await;
    payload["cooking_time"] = json!("soon");
    let reply = app.send(Method::POST, "/api/recipes", Some(&token), Some(payload.clone())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["details"]["cooking_time"][0]["code"], "INVALID_FORMAT");

    // Authentication is checked before the body
    let reply = app.send(Method::POST, "/api/recipes", None, Some(payload)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("username=chef"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"]["details"]["non_field_errors"].is_array());
}

#[tokio::test]
async fn avatars() {
    let app = app().await;
    let (_, token) = app.user("chef").await;

    let reply = app
        .send(Method::PUT, "/api/users/me/avatar", None, Some(json!({"avatar": PNG})))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app
        .send(Method::PUT, "/api/users/me/avatar", Some(&token), Some(json!({"avatar": " "})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"]["details"]["avatar"][0]["code"], "MISSING_FIELD");

    let reply = app
        .send(Method::PUT, "/api/users/me/avatar", Some(&token), Some(json!({"avatar": PNG})))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let first = reply.json()["avatar"].as_str().unwrap().to_string();
    assert!(first.starts_with("/media/users/avatars/"));
    let first_file = app.media.path().join(first.trim_start_matches("/media/"));
    assert!(first_file.exists());

    let reply = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(reply.json()["avatar"], first.as_str());

    // A replacement discards the previous file
    let reply = app
        .send(Method::PUT, "/api/users/me/avatar", Some(&token), Some(json!({"avatar": PNG})))
        .await;
    let second = reply.json()["avatar"].as_str().unwrap().to_string();
    let second_file = app.media.path().join(second.trim_start_matches("/media/"));
    assert!(!first_file.exists());
    assert!(second_file.exists());

    let reply = app.send(Method::DELETE, "/api/users/me/avatar", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(!second_file.exists());

    let reply = app.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert!(reply.json()["avatar"].is_null());

    let reply = app.send(Method::DELETE, "/api/users/me/avatar", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
