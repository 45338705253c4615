use actix_web::http::header;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use shelfware::api;
use shelfware::config::Config;
use shelfware::db::Database;

fn test_config() -> Config {
    Config {
        port: 0,
        database_path: ":memory:".into(),
        token_secret: "integration-test-secret".into(),
        client_url: "http://localhost:3000".into(),
        production: false,
    }
}

async fn test_db() -> Database {
    let db = Database::new(":memory:").unwrap();
    db.create_schema().await.unwrap();
    db
}

macro_rules! init_app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($db.clone()))
                .app_data(web::Data::new(test_config()))
                .configure(api::configure),
        )
        .await
    };
}

fn register_body(email: &str) -> Value {
    json!({
        "firstName": "Test",
        "lastName": "Reader",
        "email": email,
        "password": "hunter2",
        "confirmPassword": "hunter2",
    })
}

fn review_body(isbn: &str, rating: i64) -> Value {
    json!({
        "isbn": isbn,
        "title": "The Odyssey",
        "author": "Homer",
        "rating": rating,
        "review": "Long trip, good dog.",
    })
}

/// Extracts the `access_token=...` pair from a Set-Cookie header, if any.
fn session_cookie(resp: &actix_web::dev::ServiceResponse) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("access_token="))
        .map(|v| v.split(';').next().unwrap_or(v).to_string())
}

#[actix_web::test]
async fn register_sets_cookie_and_me_works() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("ada@example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let cookie = session_cookie(&resp).expect("register must set a session cookie");
    assert_ne!(cookie, "access_token=");

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["firstName"], "Test");

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/me")
            .insert_header((header::COOKIE, cookie))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "ada@example.com");
}

#[actix_web::test]
async fn duplicate_registration_is_rejected() {
    let db = test_db().await;
    let app = init_app!(db);

    let first = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("dup@example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), 200);

    let second = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("dup@example.com"))
            .to_request(),
    )
    .await;
    assert_eq!(second.status(), 400);
    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["message"], "User already exists");
}

#[actix_web::test]
async fn register_validates_payload() {
    let db = test_db().await;
    let app = init_app!(db);

    let mut bad = register_body("not-an-email");
    bad["confirmPassword"] = json!("mismatch");
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(bad)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));
}

#[actix_web::test]
async fn login_with_wrong_password_sets_no_cookie() {
    let db = test_db().await;
    let app = init_app!(db);

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("ada@example.com"))
            .to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "ada@example.com", "password": "wrong"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    assert!(session_cookie(&resp).is_none());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid password");
}

#[actix_web::test]
async fn login_with_unknown_email_is_404() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "ghost@example.com", "password": "pw"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn login_with_correct_password_succeeds() {
    let db = test_db().await;
    let app = init_app!(db);

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("ada@example.com"))
            .to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "ada@example.com", "password": "hunter2"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);
    assert!(session_cookie(&resp).is_some());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User logged in");
}

#[actix_web::test]
async fn protected_routes_require_a_session() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
    assert_eq!(resp.status(), 401);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/reviews")
            .set_json(review_body("123", 4))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 401);

    // A garbage token is rejected rather than treated as missing.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/me")
            .insert_header((header::COOKIE, "access_token=bogus"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn listing_with_no_reviews_is_404() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/reviews").to_request()).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No reviews found.");
}

#[actix_web::test]
async fn review_lifecycle_over_http() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("ada@example.com"))
            .to_request(),
    )
    .await;
    let cookie = session_cookie(&resp).unwrap();

    // Create.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/reviews")
            .insert_header((header::COOKIE, cookie.clone()))
            .set_json(review_body("9780140449136", 4))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    // Anonymous listing sees the review, not marked as the viewer's own.
    let resp = test::call_service(&app, test::TestRequest::get().uri("/reviews").to_request()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let listed = &body["reviews"][0];
    assert_eq!(listed["isbn"], "9780140449136");
    assert_eq!(listed["isReviewGiven"], false);
    assert_eq!(listed["book"]["totalReviews"], 1);
    assert_eq!(listed["book"]["averageRating"], 4.0);
    let review_id = listed["id"].as_i64().unwrap();

    // The author sees it flagged as their own.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/reviews")
            .insert_header((header::COOKIE, cookie.clone()))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reviews"][0]["isReviewGiven"], true);

    // Update changes the aggregate by the rating delta.
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/reviews/{review_id}"))
            .insert_header((header::COOKIE, cookie.clone()))
            .set_json(json!({
                "title": "The Odyssey",
                "author": "Homer",
                "rating": 2,
                "review": "On reflection, too much sailing.",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/reviews/{review_id}"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["review"]["rating"], 2);
    assert_eq!(body["review"]["book"]["totalRating"], 2);
    assert_eq!(body["review"]["book"]["totalReviews"], 1);

    // Delete, then the review is gone.
    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/reviews/{review_id}"))
            .insert_header((header::COOKIE, cookie.clone()))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/reviews/{review_id}"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn only_the_author_may_delete() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("author@example.com"))
            .to_request(),
    )
    .await;
    let author_cookie = session_cookie(&resp).unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("other@example.com"))
            .to_request(),
    )
    .await;
    let other_cookie = session_cookie(&resp).unwrap();

    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/reviews")
            .insert_header((header::COOKIE, author_cookie))
            .set_json(review_body("111", 4))
            .to_request(),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/reviews").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    let review_id = body["reviews"][0]["id"].as_i64().unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/reviews/{review_id}"))
            .insert_header((header::COOKIE, other_cookie))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn create_review_validates_rating_range() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/register")
            .set_json(register_body("ada@example.com"))
            .to_request(),
    )
    .await;
    let cookie = session_cookie(&resp).unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/reviews")
            .insert_header((header::COOKIE, cookie))
            .set_json(review_body("123", 6))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]
        .as_array()
        .is_some_and(|e| e.iter().any(|f| f["field"] == "rating")));
}

#[actix_web::test]
async fn logout_clears_the_session_cookie() {
    let db = test_db().await;
    let app = init_app!(db);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/logout").to_request()).await;
    assert_eq!(resp.status(), 200);
    let cleared = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("access_token="))
        .expect("logout must reset the cookie")
        .to_string();
    assert!(cleared.starts_with("access_token=;"));
}
