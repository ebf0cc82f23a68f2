//! Registration, login, bearer authentication and email verification.

use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::entities::{Account, NewAccount};
use crate::domain::repositories::AccountRepository;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// bcrypt silently truncates longer inputs.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const MIN_PASSWORD_CHARS: usize = 8;

const VERIFICATION_TOKEN_BYTES: usize = 32;

/// JWT payload. `sub` is the account id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Secrets and policy for [`AuthService`].
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_signing_secret: String,
    pub access_token_ttl: TimeDelta,
    pub verification_token_ttl: TimeDelta,
    pub password_hash_cost: u32,
    /// Lower-cased addresses promoted to superuser at registration.
    pub superuser_emails: Vec<String>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_signing_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("verification_token_ttl", &self.verification_token_ttl)
            .field("password_hash_cost", &self.password_hash_cost)
            .field("superuser_emails", &self.superuser_emails)
            .finish()
    }
}

/// An issued bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Result of a successful registration.
///
/// The verification token is never returned to the client.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub verification_token: String,
}

pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    settings: AuthSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(accounts: Arc<dyn AccountRepository>, settings: AuthSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.jwt_secret.as_bytes());
        Self {
            accounts,
            settings,
            encoding_key,
            decoding_key,
        }
    }

    /// Registers an account and issues an email verification token.
    ///
    /// The email is trimmed and lower-cased; superuser status comes from
    /// [`AuthSettings::superuser_emails`].
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a malformed email or a password outside
    ///   `MIN_PASSWORD_CHARS` characters to `MAX_PASSWORD_BYTES` bytes
    /// - [`AppError::Conflict`] if the email is already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<Registration, AppError> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(
                "Email already registered",
                json!({ "email": email }),
            ));
        }

        let password_hash = self.hash_password(password).await?;
        let is_superuser = self.settings.superuser_emails.iter().any(|e| *e == email);

        let account = self
            .accounts
            .create(NewAccount {
                email,
                password_hash,
                is_superuser,
            })
            .await?;

        info!(
            account_id = account.id,
            is_superuser = account.is_superuser,
            "Account registered"
        );

        let verification_token = self.issue_verification_token(account.id).await?;
        Ok(Registration {
            account,
            verification_token,
        })
    }

    /// Checks credentials and mints an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] for an unknown email, a wrong
    /// password or an inactive account. The message does not say which.
    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken, AppError> {
        let email = email.trim().to_lowercase();
        let Some(account) = self.accounts.find_by_email(&email).await? else {
            return Err(bad_credentials());
        };

        if !self.verify_password(password, &account.password_hash).await? || !account.is_active {
            debug!(account_id = account.id, "Login rejected");
            return Err(bad_credentials());
        }

        let access_token = self.issue_access_token(&account, Utc::now())?;
        info!(account_id = account.id, "Access token issued");

        Ok(AccessToken {
            access_token,
            token_type: "bearer",
        })
    }

    /// Resolves a bearer token to an active account.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is malformed, expired,
    /// signed with another key, or names a missing or inactive account.
    pub async fn authenticate(&self, token: &str) -> Result<Account, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                invalid_token()
            })?
            .claims;

        let account_id: i64 = claims.sub.parse().map_err(|_| invalid_token())?;

        match self.accounts.find_by_id(account_id).await? {
            Some(account) if account.is_active => Ok(account),
            Some(_) => Err(AppError::unauthorized(
                "Unauthorized",
                json!({ "reason": "Account is inactive" }),
            )),
            None => Err(invalid_token()),
        }
    }

    /// Creates a single-use verification token for `account_id`.
    ///
    /// Only the HMAC of the token is stored. Delivery is out of band; the
    /// raw token is written to the debug log.
    pub async fn issue_verification_token(&self, account_id: i64) -> Result<String, AppError> {
        let mut bytes = [0u8; VERIFICATION_TOKEN_BYTES];
        getrandom::fill(&mut bytes).map_err(|e| {
            AppError::internal("Random source unavailable", json!({ "error": e.to_string() }))
        })?;
        let token = hex::encode(bytes);

        let expires_at = Utc::now() + self.settings.verification_token_ttl;
        self.accounts
            .store_verification_token(account_id, &self.hash_token(&token)?, expires_at)
            .await?;

        debug!(account_id, token = %token, "Verification token issued");
        Ok(token)
    }

    /// Consumes a verification token and marks its account verified.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the token is unknown, already
    /// used or expired.
    pub async fn verify_email(&self, token: &str) -> Result<Account, AppError> {
        let invalid = || {
            AppError::bad_request(
                "Invalid or expired verification token",
                json!({}),
            )
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(invalid());
        }

        let Some(account_id) = self
            .accounts
            .consume_verification_token(&self.hash_token(token)?, Utc::now())
            .await?
        else {
            return Err(invalid());
        };

        if !self.accounts.mark_verified(account_id).await? {
            warn!(account_id, "Verification token outlived its account");
            return Err(invalid());
        }

        info!(account_id, "Email verified");
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(invalid)
    }

    fn issue_access_token(&self, account: &Account, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: account.id.to_string(),
            exp: (now + self.settings.access_token_ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            AppError::internal("Failed to sign access token", json!({ "error": e.to_string() }))
        })
    }

    /// Returns a 64-character lowercase hex HMAC-SHA256 of `token`.
    fn hash_token(&self, token: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.settings.token_signing_secret.as_bytes())
            .map_err(|e| AppError::internal("Invalid signing key", json!({ "error": e.to_string() })))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        let cost = self.settings.password_hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal("Hashing task failed", json!({ "error": e.to_string() })))?
            .map_err(|e| AppError::internal("Password hashing failed", json!({ "error": e.to_string() })))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::internal("Hashing task failed", json!({ "error": e.to_string() })))?;

        // A corrupt stored hash is a failed login, not a server error.
        Ok(verified.unwrap_or(false))
    }
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::bad_request("Invalid email address", json!({ "field": "email" })));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::bad_request(
            "Password too long",
            json!({ "field": "password", "max_bytes": MAX_PASSWORD_BYTES }),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::bad_request(
            "Password too short",
            json!({ "field": "password", "min_chars": MIN_PASSWORD_CHARS }),
        ));
    }
    Ok(())
}

fn bad_credentials() -> AppError {
    AppError::unauthorized("Incorrect email or password", json!({}))
}

fn invalid_token() -> AppError {
    AppError::unauthorized(
        "Unauthorized",
        json!({ "reason": "Invalid or expired token" }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::MemoryStore;

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "test-jwt-secret".to_string(),
            token_signing_secret: "test-signing-secret".to_string(),
            access_token_ttl: TimeDelta::minutes(30),
            verification_token_ttl: TimeDelta::hours(24),
            password_hash_cost: 4,
            superuser_emails: vec!["admin@example.com".to_string()],
        }
    }

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AuthService::new(store.clone(), settings()), store)
    }

    #[tokio::test]
    async fn test_register_lowercases_email_and_hashes_password() {
        let (service, _) = service();

        let registration = service
            .register("  Alice@Example.COM ", "correct horse")
            .await
            .unwrap();

        let account = registration.account;
        assert_eq!(account.email, "alice@example.com");
        assert!(account.is_active);
        assert!(!account.is_superuser);
        assert!(!account.is_verified);
        assert_ne!(account.password_hash, "correct horse");
        assert!(account.password_hash.starts_with("$2"));
        assert_eq!(registration.verification_token.len(), 64);
    }

    #[tokio::test]
    async fn test_register_promotes_configured_superuser() {
        let (service, _) = service();

        let account = service
            .register("ADMIN@example.com", "password123")
            .await
            .unwrap()
            .account;

        assert!(account.is_superuser);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let (service, _) = service();
        service.register("bob@example.com", "password123").await.unwrap();

        let err = service
            .register("BOB@example.com", "password456")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (service, _) = service();
        let too_long = "x".repeat(73);

        for (email, password) in [
            ("not-an-email", "password123"),
            ("a@b", "password123"),
            ("carol@example.com", "short"),
            ("carol@example.com", too_long.as_str()),
        ] {
            let err = service.register(email, password).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{email}");
        }
    }

    #[tokio::test]
    async fn test_login_and_authenticate_round_trip() {
        let (service, _) = service();
        let account = service
            .register("dave@example.com", "password123")
            .await
            .unwrap()
            .account;

        let token = service.login("Dave@Example.com", "password123").await.unwrap();
        assert_eq!(token.token_type, "bearer");

        let authenticated = service.authenticate(&token.access_token).await.unwrap();
        assert_eq!(authenticated.id, account.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let (service, _) = service();
        service.register("erin@example.com", "password123").await.unwrap();

        let err = service.login("erin@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        let err = service.login("nobody@example.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_authenticate() {
        let (service, store) = service();
        let account = service
            .register("frank@example.com", "password123")
            .await
            .unwrap()
            .account;
        let token = service.login("frank@example.com", "password123").await.unwrap();

        store.set_active(account.id, false).await.unwrap();

        let err = service.authenticate(&token.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
        assert!(service.login("frank@example.com", "password123").await.is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_tampered_and_expired_tokens() {
        let (service, _) = service();
        let account = service
            .register("gina@example.com", "password123")
            .await
            .unwrap()
            .account;

        assert!(service.authenticate("not.a.jwt").await.is_err());

        let other = AuthService::new(
            Arc::new(MemoryStore::new()),
            AuthSettings {
                jwt_secret: "another-secret".to_string(),
                ..settings()
            },
        );
        let foreign = other.issue_access_token(&account, Utc::now()).unwrap();
        assert!(service.authenticate(&foreign).await.is_err());

        let stale = service
            .issue_access_token(&account, Utc::now() - TimeDelta::hours(2))
            .unwrap();
        let err = service.authenticate(&stale).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_verify_email_is_single_use() {
        let (service, _) = service();
        let registration = service
            .register("hank@example.com", "password123")
            .await
            .unwrap();

        let verified = service
            .verify_email(&registration.verification_token)
            .await
            .unwrap();
        assert!(verified.is_verified);

        let err = service
            .verify_email(&registration.verification_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_verify_email_rejects_expired_token() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthService::new(
            store,
            AuthSettings {
                verification_token_ttl: TimeDelta::seconds(-1),
                ..settings()
            },
        );
        let registration = service
            .register("ivy@example.com", "password123")
            .await
            .unwrap();

        assert!(service.verify_email(&registration.verification_token).await.is_err());
    }

    #[test]
    fn test_hash_token_depends_on_secret() {
        let (a, _) = service();
        let b = AuthService::new(
            Arc::new(MemoryStore::new()),
            AuthSettings {
                token_signing_secret: "secret-b".to_string(),
                ..settings()
            },
        );

        assert_eq!(a.hash_token("token").unwrap(), a.hash_token("token").unwrap());
        assert_eq!(a.hash_token("token").unwrap().len(), 64);
        assert_ne!(a.hash_token("token").unwrap(), b.hash_token("token").unwrap());
    }
}
