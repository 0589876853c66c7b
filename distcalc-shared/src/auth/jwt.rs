//! JWT access/refresh token issuance and verification.
//!
//! Mirrors the original authenticator's design: separate access and refresh
//! signing keys, a `jti` claim present only on refresh tokens, and a
//! token-type marker so an access token can never be replayed as a refresh
//! token. Signed with RS256 (`jsonwebtoken` + an RSA keypair generated at
//! startup via the `rsa` crate) rather than the original's ECDSA ES256 — see
//! `DESIGN.md` for that substitution.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AuthError;

const ISSUER: &str = "orchestrator";
const RSA_KEY_BITS: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// The `jti` embedded in the refresh token, for blacklist bookkeeping.
    pub refresh_jti: String,
}

/// Issues and verifies access/refresh token pairs for a fixed pair of RSA
/// keys and TTLs.
pub struct Authenticator {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl Authenticator {
    /// Generates a fresh RSA keypair for access and refresh tokens. Called
    /// once at startup when no PEM key material is supplied via config; a
    /// failure here is a startup failure (non-zero exit).
    pub fn generate(access_ttl_secs: u64, refresh_ttl_secs: u64) -> Result<Self, AuthError> {
        let mut rng = rand::thread_rng();

        let access_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;
        let refresh_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;

        Self::from_keys(access_key, refresh_key, access_ttl_secs, refresh_ttl_secs)
    }

    fn from_keys(
        access_key: RsaPrivateKey,
        refresh_key: RsaPrivateKey,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Result<Self, AuthError> {
        let access_priv_pem = access_key
            .to_pkcs1_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;
        let access_pub_pem = access_key
            .to_public_key()
            .to_pkcs1_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;
        let refresh_priv_pem = refresh_key
            .to_pkcs1_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;
        let refresh_pub_pem = refresh_key
            .to_public_key()
            .to_pkcs1_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;

        Ok(Self {
            access_encoding: EncodingKey::from_rsa_pem(access_priv_pem.as_bytes())
                .map_err(|e| AuthError::KeyMaterial(e.to_string()))?,
            access_decoding: DecodingKey::from_rsa_pem(access_pub_pem.as_bytes())
                .map_err(|e| AuthError::KeyMaterial(e.to_string()))?,
            refresh_encoding: EncodingKey::from_rsa_pem(refresh_priv_pem.as_bytes())
                .map_err(|e| AuthError::KeyMaterial(e.to_string()))?,
            refresh_decoding: DecodingKey::from_rsa_pem(refresh_pub_pem.as_bytes())
                .map_err(|e| AuthError::KeyMaterial(e.to_string()))?,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    /// Issues and signs a fresh access/refresh pair for `user_id`.
    pub fn issue_tokens(&self, user_id: &str) -> Result<TokenPair, AuthError> {
        let now = now_secs();
        let refresh_jti = Uuid::now_v7().to_string();

        let access_claims = Claims {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
            token_type: TokenType::Access,
            jti: None,
        };
        let refresh_claims = Claims {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
            token_type: TokenType::Refresh,
            jti: Some(refresh_jti.clone()),
        };

        let access_token = encode(&Header::new(jsonwebtoken::Algorithm::RS256), &access_claims, &self.access_encoding)
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;
        let refresh_token = encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &refresh_claims,
            &self.refresh_encoding,
        )
        .map_err(|e| AuthError::KeyMaterial(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_jti,
        })
    }

    /// Verifies a token assumed to be an access token; fails with
    /// `WrongTokenType` if it is actually a refresh token (and vice versa
    /// for [`Self::verify_refresh`]).
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token, &self.access_decoding)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token, &self.refresh_decoding)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    fn decode(&self, token: &str, key: &DecodingKey) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::generate(900, 604_800).unwrap()
    }

    #[test]
    fn issues_a_verifiable_access_token() {
        let auth = authenticator();
        let pair = auth.issue_tokens("user-1").unwrap();
        let claims = auth.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.jti.is_none());
    }

    #[test]
    fn refresh_token_carries_a_jti() {
        let auth = authenticator();
        let pair = auth.issue_tokens("user-1").unwrap();
        let claims = auth.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(claims.jti.as_deref(), Some(pair.refresh_jti.as_str()));
    }

    #[test]
    fn access_token_cannot_be_verified_as_refresh() {
        let auth = authenticator();
        let pair = auth.issue_tokens("user-1").unwrap();
        let err = auth.verify_refresh(&pair.access_token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken | AuthError::WrongTokenType));
    }

    #[test]
    fn refresh_token_cannot_be_verified_as_access() {
        let auth = authenticator();
        let pair = auth.issue_tokens("user-1").unwrap();
        let err = auth.verify_access(&pair.refresh_token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken | AuthError::WrongTokenType));
    }
}
