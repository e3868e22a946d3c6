use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::users::{Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
};

/// Issues and checks HS256 bearer tokens. Holds no session state: a token is
/// valid exactly when its signature checks out and it has not expired.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Checks signature and expiry and returns the subject id.
    pub fn decode(&self, token: &str) -> AppResult<Uuid> {
        let decoded = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            tracing::debug!(error = %err, "bearer token rejected");
            AppError::InvalidToken
        })?;

        Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::InvalidToken)
    }

    /// Decodes the token and resolves its subject to a stored user.
    pub async fn verify<C>(&self, conn: &C, token: &str) -> AppResult<UserModel>
    where
        C: ConnectionTrait,
    {
        let user_id = self.decode(token)?;
        Users::find_by_id(user_id)
            .one(conn)
            .await?
            .ok_or(AppError::UnknownSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_to_subject() {
        let tokens = TokenService::new(b"unit-test-secret", Duration::minutes(30));
        let user_id = Uuid::new_v4();

        let token = tokens.issue(user_id).unwrap();

        assert_eq!(tokens.decode(&token).unwrap(), user_id);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new(b"secret-a", Duration::minutes(30));
        let verifier = TokenService::new(b"secret-b", Duration::minutes(30));

        let token = issuer.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(verifier.decode(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(b"unit-test-secret", Duration::minutes(-10));

        let token = tokens.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(tokens.decode(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn tampered_or_garbage_tokens_are_rejected() {
        let tokens = TokenService::new(b"unit-test-secret", Duration::minutes(30));
        let victim = tokens.issue(Uuid::new_v4()).unwrap();
        let attacker = tokens.issue(Uuid::new_v4()).unwrap();

        // Attacker's claims under the victim's signature.
        let victim_parts: Vec<&str> = victim.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.split('.').collect();
        let tampered = format!(
            "{}.{}.{}",
            victim_parts[0], attacker_parts[1], victim_parts[2]
        );

        assert!(matches!(tokens.decode(&tampered), Err(AppError::InvalidToken)));
        assert!(matches!(tokens.decode("not-a-jwt"), Err(AppError::InvalidToken)));
    }
}
