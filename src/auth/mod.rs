//! Credential & token service.
//!
//! Passwords are bcrypt hashes; sessions are signed tokens that are only honoured
//! while they are present in the owner's active token set, so logout is a removal.

pub mod extractors;
pub mod password;
pub mod token;

use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;
use crate::store::{Store, UserStore};

pub use extractors::Authenticated;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenSigner};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    signer: TokenSigner,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, signer: TokenSigner, bcrypt_cost: u32) -> Self {
        Self {
            store,
            signer,
            bcrypt_cost,
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash_password(password, self.bcrypt_cost)
    }

    /// Signs a token without recording it. Signup stores it with the new user.
    pub fn sign(&self, user_id: Uuid) -> Result<String, AppError> {
        self.signer.sign(user_id)
    }

    /// Signs a token and appends it to the user's active set.
    pub async fn issue_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = self.signer.sign(user_id)?;
        self.store.push_token(user_id, &token).await?;
        Ok(token)
    }

    /// Looks the user up by e-mail and checks the password.
    ///
    /// Unknown e-mail and wrong password fail identically.
    pub async fn check_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    /// Resolves a bearer token to its user. The signature must verify and the token
    /// must still be active; every failure is `Unauthorized`.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = self.signer.verify(token)?;
        match self.store.find_user_by_token(claims.sub, token).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                log::debug!("token for user {} is not active", claims.sub);
                Err(AppError::Unauthorized)
            }
            Err(e) => {
                log::error!("token lookup failed: {}", e);
                Err(AppError::Unauthorized)
            }
        }
    }

    pub async fn revoke(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        self.store.remove_token(user_id, token).await?;
        Ok(())
    }

    pub async fn revoke_all(&self, user_id: Uuid) -> Result<(), AppError> {
        self.store.clear_tokens(user_id).await?;
        Ok(())
    }
}
