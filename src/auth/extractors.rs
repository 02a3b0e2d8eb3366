use actix_web::dev::Payload;
use actix_web::{http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::app::AppState;
use crate::error::AppError;
use crate::models::User;

/// The caller's identity, resolved from `Authorization: Bearer <token>`.
///
/// Handlers that require authentication take this as an argument; extraction fails
/// with `AppError::Unauthorized` (uniform 401 body) when the header is missing, the
/// token does not verify, or it is no longer in the user's active set.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    /// The exact token used for this request; logout revokes only this one.
    pub token: String,
}

impl FromRequest for Authenticated {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(AppError::Unauthorized)?;
            let state = state.ok_or_else(|| {
                log::error!("AppState is not registered; refusing to authenticate");
                AppError::Unauthorized
            })?;
            let user = state.auth.authenticate(&token).await?;
            Ok(Authenticated { user, token })
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}
