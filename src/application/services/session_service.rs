//! Session Core
//!
//! Creates, rotates, revokes, and enumerates refresh-token-backed sessions.
//! A refresh token is single-use: Refresh validates the session and revokes
//! it with a compare-and-set inside one scoped transaction, so two
//! concurrent exchanges of the same token produce exactly one new pair.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    DeviceContext, RoleCode, Session, SessionRepository, User, UserRepository,
};
use crate::infrastructure::database::{DbSession, StoreError, Transactor};

use super::token_authority::{TokenAuthority, Tokens};

/// Session core errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("role code cannot be empty")]
    EmptyRoleCode,

    #[error("token cannot be empty")]
    EmptyToken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user is inactive")]
    UserInactive,

    #[error("role not found")]
    RoleNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired or revoked")]
    SessionExpired,

    #[error("cannot generate tokens")]
    CannotGenerateTokens,

    #[error("cannot revoke session")]
    CannotRevokeSession,

    #[error("cannot update session")]
    CannotUpdateSession,

    #[error("cannot register user")]
    CannotRegisterUser,

    #[error("cannot fetch sessions")]
    CannotFetchSessions,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Session core: registration, login, rotation, revocation.
pub struct SessionService<U, S, TM> {
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    tokens: Arc<TokenAuthority>,
    tx: TM,
    hasher_cost: u32,
    refresh_ttl: Duration,
}

impl<U, S, TM> SessionService<U, S, TM>
where
    U: UserRepository,
    S: SessionRepository,
    TM: Transactor,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        tokens: Arc<TokenAuthority>,
        tx: TM,
        hasher_cost: u32,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            tokens,
            tx,
            hasher_cost,
            refresh_ttl: Duration::seconds(refresh_ttl_secs as i64),
        }
    }

    /// Hash a password with Argon2id at the configured iteration count.
    fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let params = Params::new(Params::DEFAULT_M_COST, self.hasher_cost, 1, None)
            .map_err(|_| SessionError::CannotRegisterUser)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing failed");
                SessionError::CannotRegisterUser
            })
    }

    /// Verify a password against its hash (parameters travel in the hash).
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Mint a token pair and persist the session row that backs the refresh
    /// token. Runs on the caller's transaction.
    async fn mint_session(
        &self,
        db: &DbSession,
        user: &User,
        device: DeviceContext,
    ) -> Result<Tokens, SessionError> {
        let session_id = Uuid::new_v4();
        let tokens = self
            .tokens
            .generate(user, session_id)
            .map_err(|_| SessionError::CannotGenerateTokens)?;

        let session = Session::new(
            session_id,
            user.id,
            self.tokens.hash_token(&tokens.refresh_token),
            device,
            Utc::now() + self.refresh_ttl,
        );
        self.session_repo.create(db, &session).await?;

        Ok(tokens)
    }

    /// Register a new user with one role, minting the first session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role_code: &str,
        device: DeviceContext,
    ) -> Result<Tokens, SessionError> {
        if email.is_empty() {
            return Err(SessionError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(SessionError::EmptyPassword);
        }
        if role_code.is_empty() {
            return Err(SessionError::EmptyRoleCode);
        }
        let role = RoleCode::parse(role_code).ok_or(SessionError::RoleNotFound)?;

        tracing::info!(email, role = %role, "register started");

        let db = DbSession::root();
        let result: Result<Tokens, SessionError> = self
            .tx
            .in_tx(&db, move |db| async move {
                let password_hash = self.hash_password(password)?;

                let mut user = self
                    .user_repo
                    .create(&db, &User::new(email.to_owned(), password_hash))
                    .await
                    .map_err(|e| match e {
                        StoreError::UserAlreadyExists => SessionError::UserAlreadyExists,
                        other => SessionError::Storage(other),
                    })?;

                self.user_repo
                    .attach_role(&db, user.id, role_code)
                    .await
                    .map_err(|e| match e {
                        StoreError::NotFound => SessionError::RoleNotFound,
                        other => SessionError::Storage(other),
                    })?;
                user.roles = vec![role];

                self.mint_session(&db, &user, device).await
            })
            .await;

        result.map_err(|e| match e {
            SessionError::Storage(err) => {
                tracing::error!(email, error = %err, "registration failed");
                SessionError::CannotRegisterUser
            }
            other => other,
        })
    }

    /// Authenticate with credentials and mint a new session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: DeviceContext,
    ) -> Result<Tokens, SessionError> {
        if email.is_empty() {
            return Err(SessionError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(SessionError::EmptyPassword);
        }

        let db = DbSession::root();
        self.tx
            .in_tx(&db, move |db| async move {
                let user = self
                    .user_repo
                    .find_by_email(&db, email)
                    .await?
                    .ok_or(SessionError::UserNotFound)?;

                if !self.verify_password(password, &user.password_hash) {
                    return Err(SessionError::InvalidCredentials);
                }
                if !user.is_active {
                    return Err(SessionError::InvalidCredentials);
                }

                self.mint_session(&db, &user, device).await
            })
            .await
    }

    /// Exchange a refresh token for a new pair, rotating the session.
    ///
    /// The validity check and the revocation run in one transaction; the
    /// revocation is a compare-and-set on `revoked = false`, so of two
    /// concurrent exchanges exactly one wins.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device: DeviceContext,
    ) -> Result<Tokens, SessionError> {
        if refresh_token.is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let claims = self
            .tokens
            .parse_refresh(refresh_token)
            .map_err(|_| SessionError::InvalidRefreshToken)?;

        let db = DbSession::root();
        self.tx
            .in_tx(&db, move |db| async move {
                let session = self
                    .session_repo
                    .find_by_id(&db, claims.session_id)
                    .await?
                    .ok_or(SessionError::SessionNotFound)?;

                if session.token_hash != self.tokens.hash_token(refresh_token) {
                    return Err(SessionError::InvalidRefreshToken);
                }
                if session.revoked || session.is_expired() {
                    return Err(SessionError::SessionExpired);
                }

                let user = self
                    .user_repo
                    .find_by_id(&db, session.user_id)
                    .await?
                    .ok_or(SessionError::UserNotFound)?;
                if !user.is_active {
                    return Err(SessionError::UserInactive);
                }

                self.session_repo
                    .touch(&db, session.id)
                    .await
                    .map_err(|_| SessionError::CannotUpdateSession)?;

                // rotation: consume the old session exactly once
                let consumed = self
                    .session_repo
                    .revoke_if_active(&db, session.id)
                    .await
                    .map_err(|_| SessionError::CannotRevokeSession)?;
                if !consumed {
                    return Err(SessionError::InvalidRefreshToken);
                }

                self.mint_session(&db, &user, device).await
            })
            .await
    }

    /// Revoke the session a refresh token points at. Idempotent: revoking an
    /// absent or already-revoked session succeeds; only a token that fails
    /// cryptographic parsing is an error.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        let claims = self
            .tokens
            .parse_refresh(refresh_token)
            .map_err(|_| SessionError::InvalidRefreshToken)?;

        let db = DbSession::root();
        self.session_repo
            .revoke(&db, claims.session_id)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %claims.session_id, error = %e, "logout failed");
                SessionError::CannotRevokeSession
            })
    }

    /// List a user's sessions for display.
    pub async fn get_user_sessions(
        &self,
        user_id: Uuid,
        only_active: bool,
    ) -> Result<Vec<Session>, SessionError> {
        let db = DbSession::root();

        let user = self
            .user_repo
            .find_by_id(&db, user_id)
            .await?
            .ok_or(SessionError::UserNotFound)?;
        if !user.is_active {
            return Err(SessionError::UserInactive);
        }

        self.session_repo
            .list_by_user(&db, user_id, only_active)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "failed to list sessions");
                SessionError::CannotFetchSessions
            })
    }

    /// Revoke one session by id (self-service or administrative).
    pub async fn revoke_session(&self, session_id: Uuid) -> Result<(), SessionError> {
        let db = DbSession::root();
        self.session_repo.revoke(&db, session_id).await.map_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "failed to revoke session");
            SessionError::CannotRevokeSession
        })
    }

    /// Fetch a user's profile by id.
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, SessionError> {
        let db = DbSession::root();
        self.user_repo
            .find_by_id(&db, user_id)
            .await?
            .ok_or(SessionError::UserNotFound)
    }
}
