//! Token Authority
//!
//! Issues and verifies the platform's bearer tokens. RS256 when an RSA key
//! pair is configured, HS256 with per-kind secrets otherwise. The refresh
//! token's `jti` claim equals the session id it is bound to, which is what
//! lets the session core treat the token as a session handle.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::domain::entities::User;

/// Token pair handed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer (the application name)
    pub iss: String,
    /// Subject: user id
    pub sub: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Token id
    pub jti: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

/// Refresh token claims. `jti` and `session_id` carry the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iss: String,
    /// Subject: user id
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    /// Equals `session_id`
    pub jti: Uuid,
    pub session_id: Uuid,
}

/// Token errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing key configuration invalid: {0}")]
    KeyConfiguration(String),

    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

enum KeyMaterial {
    Rs256 {
        encoding: EncodingKey,
        decoding: DecodingKey,
    },
    Hs256 {
        access_encoding: EncodingKey,
        access_decoding: DecodingKey,
        refresh_encoding: EncodingKey,
        refresh_decoding: DecodingKey,
    },
}

impl KeyMaterial {
    fn algorithm(&self) -> Algorithm {
        match self {
            Self::Rs256 { .. } => Algorithm::RS256,
            Self::Hs256 { .. } => Algorithm::HS256,
        }
    }
}

/// Issues and verifies access/refresh tokens.
pub struct TokenAuthority {
    keys: KeyMaterial,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenAuthority {
    /// Build from configuration. Key material is a startup requirement; a
    /// configuration without either an RSA pair or both HMAC secrets is
    /// fatal.
    pub fn from_settings(settings: &AuthSettings, issuer: String) -> Result<Self, TokenError> {
        let keys = match (&settings.private_key_pem, &settings.public_key_pem) {
            (Some(private_pem), Some(public_pem)) => KeyMaterial::Rs256 {
                encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes())
                    .map_err(|e| TokenError::KeyConfiguration(e.to_string()))?,
                decoding: DecodingKey::from_rsa_pem(public_pem.as_bytes())
                    .map_err(|e| TokenError::KeyConfiguration(e.to_string()))?,
            },
            (Some(_), None) => {
                return Err(TokenError::KeyConfiguration(
                    "auth.private_key_pem set without auth.public_key_pem".into(),
                ))
            }
            (None, _) => {
                let access = settings.access_token_secret.as_deref().ok_or_else(|| {
                    TokenError::KeyConfiguration(
                        "neither auth.private_key_pem nor auth.access_token_secret set".into(),
                    )
                })?;
                let refresh = settings.refresh_token_secret.as_deref().ok_or_else(|| {
                    TokenError::KeyConfiguration("auth.refresh_token_secret not set".into())
                })?;
                KeyMaterial::Hs256 {
                    access_encoding: EncodingKey::from_secret(access.as_bytes()),
                    access_decoding: DecodingKey::from_secret(access.as_bytes()),
                    refresh_encoding: EncodingKey::from_secret(refresh.as_bytes()),
                    refresh_decoding: DecodingKey::from_secret(refresh.as_bytes()),
                }
            }
        };

        let access_ttl = Duration::seconds(settings.access_token_ttl as i64);
        let refresh_ttl = Duration::seconds(settings.refresh_token_ttl as i64);

        Ok(Self {
            keys,
            issuer,
            access_ttl,
            refresh_ttl,
        })
    }

    /// Mint an access/refresh pair bound to `session_id`.
    pub fn generate(&self, user: &User, session_id: Uuid) -> Result<Tokens, TokenError> {
        let now = Utc::now();
        let header = Header::new(self.keys.algorithm());

        let access_claims = AccessClaims {
            iss: self.issuer.clone(),
            sub: user.id,
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            email: user.email.clone(),
            roles: user.roles.iter().map(|r| r.to_string()).collect(),
        };

        let access_key = match &self.keys {
            KeyMaterial::Rs256 { encoding, .. } => encoding,
            KeyMaterial::Hs256 {
                access_encoding, ..
            } => access_encoding,
        };
        let access_token = encode(&header, &access_claims, access_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        let refresh_claims = RefreshClaims {
            iss: self.issuer.clone(),
            sub: user.id,
            exp: (now + self.refresh_ttl).timestamp(),
            iat: now.timestamp(),
            jti: session_id,
            session_id,
        };

        let refresh_key = match &self.keys {
            KeyMaterial::Rs256 { encoding, .. } => encoding,
            KeyMaterial::Hs256 {
                refresh_encoding, ..
            } => refresh_encoding,
        };
        let refresh_token = encode(&header, &refresh_claims, refresh_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(Tokens {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.num_seconds(),
            token_type: "Bearer".into(),
        })
    }

    /// Verify an access token's signature, expiry, and issuer.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let key = match &self.keys {
            KeyMaterial::Rs256 { decoding, .. } => decoding,
            KeyMaterial::Hs256 {
                access_decoding, ..
            } => access_decoding,
        };
        self.decode_claims(token, key)
    }

    /// Verify a refresh token's signature, expiry, and issuer.
    pub fn parse_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let key = match &self.keys {
            KeyMaterial::Rs256 { decoding, .. } => decoding,
            KeyMaterial::Hs256 {
                refresh_decoding, ..
            } => refresh_decoding,
        };
        self.decode_claims(token, key)
    }

    fn decode_claims<C: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<C, TokenError> {
        let mut validation = Validation::new(self.keys.algorithm());
        validation.set_issuer(&[&self.issuer]);

        decode::<C>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// SHA-256 digest of a raw token, lowercase hex. This is what sessions
    /// store instead of the token itself.
    pub fn hash_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hs256_settings() -> AuthSettings {
        AuthSettings {
            private_key_pem: None,
            public_key_pem: None,
            access_token_secret: Some("access-secret-for-tests".into()),
            refresh_token_secret: Some("refresh-secret-for-tests".into()),
            access_token_ttl: 900,
            refresh_token_ttl: 604_800,
        }
    }

    fn authority() -> TokenAuthority {
        TokenAuthority::from_settings(&hs256_settings(), "coworking-server".into())
            .expect("hs256 settings are valid")
    }

    fn sample_user() -> User {
        use crate::domain::entities::RoleCode;
        let mut user = User::new("a@b.c".into(), "hash".into());
        user.roles = vec![RoleCode::Student];
        user
    }

    #[test]
    fn refresh_jti_equals_session_id() {
        let authority = authority();
        let session_id = Uuid::new_v4();
        let tokens = authority.generate(&sample_user(), session_id).unwrap();

        let claims = authority.parse_refresh(&tokens.refresh_token).unwrap();
        assert_eq!(claims.jti, session_id);
        assert_eq!(claims.session_id, session_id);
    }

    #[test]
    fn access_token_round_trip_carries_identity() {
        let authority = authority();
        let user = sample_user();
        let tokens = authority.generate(&user, Uuid::new_v4()).unwrap();

        let claims = authority.verify_access(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@b.c");
        assert_eq!(claims.roles, vec!["student".to_string()]);
        assert_eq!(claims.iss, "coworking-server");
    }

    #[test]
    fn access_and_refresh_keys_are_distinct() {
        let authority = authority();
        let tokens = authority.generate(&sample_user(), Uuid::new_v4()).unwrap();

        // a refresh token must not pass as an access token and vice versa
        assert!(authority.verify_access(&tokens.refresh_token).is_err());
        assert!(authority.parse_refresh(&tokens.access_token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let authority = authority();
        let tokens = authority.generate(&sample_user(), Uuid::new_v4()).unwrap();

        let mut tampered = tokens.refresh_token.clone();
        let flipped = if tampered.ends_with('A') { 'B' } else { 'A' };
        tampered.pop();
        tampered.push(flipped);
        assert!(matches!(
            authority.parse_refresh(&tampered),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let minting =
            TokenAuthority::from_settings(&hs256_settings(), "some-other-issuer".into()).unwrap();
        let verifying = authority();

        let tokens = minting.generate(&sample_user(), Uuid::new_v4()).unwrap();
        assert!(verifying.parse_refresh(&tokens.refresh_token).is_err());
    }

    #[test]
    fn hash_token_is_lowercase_hex_sha256() {
        let authority = authority();
        assert_eq!(
            authority.hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_key_material_is_rejected() {
        let settings = AuthSettings {
            private_key_pem: None,
            public_key_pem: None,
            access_token_secret: None,
            refresh_token_secret: None,
            access_token_ttl: 900,
            refresh_token_ttl: 604_800,
        };
        assert!(matches!(
            TokenAuthority::from_settings(&settings, "x".into()),
            Err(TokenError::KeyConfiguration(_))
        ));
    }
}
