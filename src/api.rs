use actix_web::{web, HttpResponse};
use log::info;
use serde_json::json;

use crate::auth::{clear_session_cookie, issue_token, session_cookie, AuthUser, MaybeAuthUser};
use crate::config::Config;
use crate::db::{Database, NewReview, ReviewChanges};
use crate::error::AppError;
use crate::validations::{
    check, CreateReviewPayload, LoginPayload, RegisterPayload, UpdateReviewPayload,
};

/// Wires every route onto the app; shared between `main` and the
/// integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/logout").route(web::post().to(logout)))
        .service(web::resource("/me").route(web::get().to(me)))
        .service(
            web::resource("/reviews")
                .route(web::get().to(list_reviews))
                .route(web::post().to(create_review)),
        )
        .service(
            web::resource("/reviews/{id}")
                .route(web::get().to(get_review))
                .route(web::put().to(update_review))
                .route(web::delete().to(delete_review)),
        );
}

async fn index(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header(("Location", config.client_url.clone()))
        .finish()
}

pub async fn login(
    db: web::Data<Database>,
    config: web::Data<Config>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
    check(&*payload)?;

    let user = db
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(AppError::NotFound("User not found."))?;

    let valid = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(AppError::InvalidPassword);
    }

    let token = issue_token(user.id, &user.email, &config.token_secret)?;
    let profile = db.user_profile(user.id).await?;
    info!("User {} logged in", user.id);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, config.production))
        .json(json!({
            "success": true,
            "message": "User logged in",
            "user": profile,
        })))
}

pub async fn register(
    db: web::Data<Database>,
    config: web::Data<Config>,
    payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
    check(&*payload)?;

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let user_id = db
        .create_user(
            &payload.email,
            &password_hash,
            &payload.first_name,
            &payload.last_name,
        )
        .await?;

    let token = issue_token(user_id, &payload.email, &config.token_secret)?;
    let profile = db.user_profile(user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, config.production))
        .json(json!({
            "success": true,
            "message": "User registered",
            "user": profile,
        })))
}

pub async fn logout() -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().cookie(clear_session_cookie()).json(json!({
        "success": true,
        "message": "Logout successfully",
    })))
}

pub async fn me(user: AuthUser, db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let profile = db.user_profile(user.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": profile,
    })))
}

pub async fn list_reviews(
    viewer: MaybeAuthUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let reviews = db.list_reviews(viewer.0.map(|claims| claims.id)).await?;
    if reviews.is_empty() {
        return Err(AppError::NotFound("No reviews found."));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "reviews": reviews,
    })))
}

pub async fn get_review(
    path: web::Path<i64>,
    viewer: MaybeAuthUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    let review = db
        .get_review(path.into_inner(), viewer.0.map(|claims| claims.id))
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "review": review,
    })))
}

pub async fn create_review(
    user: AuthUser,
    db: web::Data<Database>,
    payload: web::Json<CreateReviewPayload>,
) -> Result<HttpResponse, AppError> {
    check(&*payload)?;

    let payload = payload.into_inner();
    db.create_review(
        user.0.id,
        &NewReview {
            isbn: payload.isbn,
            title: payload.title,
            author: payload.author,
            rating: payload.rating,
            review: payload.review,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review created successfully.",
    })))
}

pub async fn update_review(
    user: AuthUser,
    path: web::Path<i64>,
    db: web::Data<Database>,
    payload: web::Json<UpdateReviewPayload>,
) -> Result<HttpResponse, AppError> {
    check(&*payload)?;

    let payload = payload.into_inner();
    db.update_review(
        path.into_inner(),
        user.0.id,
        &ReviewChanges {
            title: payload.title,
            author: payload.author,
            rating: payload.rating,
            review: payload.review,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review updated successfully.",
    })))
}

pub async fn delete_review(
    user: AuthUser,
    path: web::Path<i64>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    db.delete_review(path.into_inner(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review deleted successfully.",
    })))
}
