use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    auth::Authenticated,
    avatar::{self, AVATAR_CONTENT_TYPE},
    error::AppError,
    models::{
        user::normalize_email, AuthResponse, LoginRequest, NewUser, SignupRequest, UserChanges,
        UserPatch,
    },
    store::UserStore,
};

/// Create an account
///
/// Validates the payload, stores the user together with its first session token and
/// returns both. A taken e-mail yields a 400 with the `duplicate_key` code.
///
/// ## Responses:
/// - `201 Created`: `{ user, token }`.
/// - `400 Bad Request`: validation failure or duplicate e-mail.
#[post("")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    let request = payload.into_inner().normalized();
    request.validate()?;

    let id = Uuid::new_v4();
    let token = state.auth.sign(id)?;
    let user = state
        .store
        .create_user(
            NewUser {
                id,
                name: request.name,
                email: request.email,
                password_hash: state.auth.hash(&request.password)?,
                age: request.age.unwrap_or(0),
            },
            &token,
        )
        .await?;

    log::info!("user {} signed up", user.id);
    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Log in
///
/// Appends a fresh token to the user's active set; earlier sessions stay valid.
/// Unknown e-mail and wrong password produce the same 400.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let email = normalize_email(&payload.email);
    let user = state
        .auth
        .check_credentials(&email, payload.password.trim())
        .await?;
    let token = state.auth.issue_token(user.id).await?;

    log::info!("user {} logged in", user.id);
    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// End the current session. Other sessions of the same user are untouched.
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    state.auth.revoke(auth.user.id, &auth.token).await?;
    log::info!("user {} logged out", auth.user.id);
    Ok(HttpResponse::Ok().finish())
}

/// End every session of the authenticated user.
#[post("/logout-all")]
pub async fn logout_all(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    state.auth.revoke_all(auth.user.id).await?;
    log::info!("user {} logged out of all sessions", auth.user.id);
    Ok(HttpResponse::Ok().finish())
}

pub async fn get_profile(auth: Authenticated) -> impl Responder {
    HttpResponse::Ok().json(auth.user)
}

/// Update the authenticated user's profile
///
/// Only `name`, `email`, `password` and `age` are accepted; any other key is rejected
/// before anything is written. A new password is re-hashed.
pub async fn update_profile(
    state: web::Data<AppState>,
    auth: Authenticated,
    payload: web::Json<UserPatch>,
) -> Result<impl Responder, AppError> {
    let patch = payload.into_inner().normalized();
    patch.validate()?;

    let password_hash = match &patch.password {
        Some(password) => Some(state.auth.hash(password)?),
        None => None,
    };
    let changes = UserChanges {
        name: patch.name,
        email: patch.email,
        password_hash,
        age: patch.age,
    };
    let user = state
        .store
        .update_user(auth.user.id, changes)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete the account and, in the same transaction, every task it owns.
pub async fn delete_profile(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let user = state
        .store
        .delete_user(auth.user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    log::info!("user {} deleted their account", user.id);
    Ok(HttpResponse::Ok().json(user))
}

/// Upload an avatar
///
/// Accepts a multipart `avatar` field (jpg, jpeg or png, bounded size). The image is
/// fully buffered and validated, normalised to a square PNG, and only then stored.
pub async fn upload_avatar(
    state: web::Data<AppState>,
    auth: Authenticated,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let policy = state.avatars;
    let raw = avatar::read_upload(payload, policy).await?;
    let normalized = web::block(move || avatar::normalize(&raw, policy.dimension)).await??;

    state
        .store
        .set_avatar(auth.user.id, Some(normalized))
        .await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn delete_avatar(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    state.store.set_avatar(auth.user.id, None).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Public avatar fetch. 404 when the user does not exist or has no avatar.
#[get("/{id}/avatar")]
pub async fn get_avatar(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let bytes = state
        .store
        .avatar(user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;
    Ok(HttpResponse::Ok()
        .content_type(AVATAR_CONTENT_TYPE)
        .body(bytes))
}
