//! Shared application state and the extractor configuration every `App` needs.

use actix_web::{web, HttpRequest};
use std::sync::Arc;

use crate::auth::{AuthService, TokenSigner};
use crate::avatar::AvatarPolicy;
use crate::config::Config;
use crate::error::AppError;
use crate::store::Store;

/// Maximum accepted JSON body.
pub const JSON_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub avatars: AvatarPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jwt_secret: &str, bcrypt_cost: u32, avatars: AvatarPolicy) -> Self {
        let auth = AuthService::new(store.clone(), TokenSigner::new(jwt_secret), bcrypt_cost);
        Self {
            store,
            auth,
            avatars,
        }
    }

    pub fn from_config(store: Arc<dyn Store>, config: &Config) -> Self {
        Self::new(
            store,
            &config.jwt_secret,
            config.bcrypt_cost,
            AvatarPolicy {
                max_bytes: config.avatar_max_bytes,
                dimension: config.avatar_dimension,
            },
        )
    }
}

/// JSON bodies that fail to parse become `ValidationError`/`UnknownField`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req: &HttpRequest| AppError::from(err).into())
}

/// A malformed id in the path is reported exactly like a missing resource.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req: &HttpRequest| AppError::NotFound("Not found".into()).into())
}
