/// Identity provider
///
/// Owns user registration, credential checks and bearer-token issuance. It is
/// the only component that turns a raw token into an [`Identity`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::auth::identity::IdentityProvider;
/// use taskboard_shared::auth::password::HashParams;
/// use taskboard_shared::store::InMemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = IdentityProvider::new(
///     Arc::new(InMemoryStore::new()),
///     "a-secret-of-at-least-thirty-two-bytes!!",
///     HashParams::default(),
/// );
///
/// let user = provider
///     .register("ada@example.com", "Ada Lovelace", "analytical", "analytical")
///     .await?;
/// let tokens = provider.issue_tokens(&user)?;
/// let identity = provider.verify(&tokens.access_token)?;
/// assert_eq!(identity.user_id, user.id);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::jwt::{JwtError, TokenSigner, TokenType};
use super::middleware::{AuthError, Identity};
use super::password::{check_password_policy, hash_password, verify_password, HashParams};
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{normalize_email, CreateUser, User};
use crate::store::{ResourceStore, StoreError};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Access and refresh token pair returned on registration and login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Registration, login and token verification
#[derive(Clone)]
pub struct IdentityProvider {
    store: Arc<dyn ResourceStore>,
    signer: TokenSigner,
    hash_params: HashParams,
}

impl IdentityProvider {
    pub fn new(store: Arc<dyn ResourceStore>, jwt_secret: &str, hash_params: HashParams) -> Self {
        Self {
            store,
            signer: TokenSigner::new(jwt_secret),
            hash_params,
        }
    }

    /// Registers a new user
    ///
    /// # Errors
    ///
    /// `ServiceError::Validation` on:
    /// - `fullname` when the display name is blank
    /// - `email` when malformed or already registered
    /// - `repeated_password` when the passwords differ
    /// - `password` when the password policy is not met
    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        repeated_password: &str,
    ) -> ServiceResult<User> {
        let email = normalize_email(email);
        let display_name = display_name.trim();

        if display_name.is_empty() {
            return Err(ServiceError::validation("fullname", "This field may not be blank."));
        }
        if !looks_like_email(&email) {
            return Err(ServiceError::validation("email", "Enter a valid email address."));
        }
        if password != repeated_password {
            return Err(ServiceError::validation(
                "repeated_password",
                "Passwords do not match.",
            ));
        }
        check_password_policy(password)
            .map_err(|message| ServiceError::validation("password", message))?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .store
            .insert_user(CreateUser {
                email,
                display_name: display_name.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::Conflict(_) => email_taken(),
                other => ServiceError::Store(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Checks an email/password pair
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthenticated("Invalid credentials")` for an
    /// unknown email and for a wrong password alike.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("Login attempt for unknown email");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        let matches = verify_password(password, &user.password_hash).map_err(|e| {
            error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            ServiceError::Internal("Password verification failed".to_string())
        })?;

        if !matches {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user)
    }

    /// Issues an access/refresh token pair for a user
    pub fn issue_tokens(&self, user: &User) -> ServiceResult<TokenPair> {
        let access_token = self
            .signer
            .issue(user.id, TokenType::Access)
            .map_err(internal_token_error)?;
        let refresh_token = self
            .signer
            .issue(user.id, TokenType::Refresh)
            .map_err(internal_token_error)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: TokenType::Access.lifetime().num_seconds(),
        })
    }

    /// Turns an access token into an identity
    ///
    /// Refresh tokens are rejected.
    pub fn verify(&self, bearer_token: &str) -> Result<Identity, AuthError> {
        let claims = self
            .signer
            .validate(bearer_token, TokenType::Access)
            .map_err(|e| match e {
                JwtError::Expired => AuthError::Expired,
                other => AuthError::InvalidToken(other.to_string()),
            })?;

        Ok(Identity::new(claims.sub))
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthenticated` if the refresh token is invalid,
    /// expired or an access token.
    pub fn refresh(&self, refresh_token: &str) -> ServiceResult<String> {
        self.signer.refresh(refresh_token).map_err(|e| match e {
            JwtError::Encode(_) => internal_token_error(e),
            other => ServiceError::Unauthenticated(other.to_string()),
        })
    }

    async fn hash(&self, password: &str) -> ServiceResult<String> {
        let password = password.to_string();
        let params = self.hash_params;

        tokio::task::spawn_blocking(move || hash_password(&password, &params))
            .await
            .map_err(|e| ServiceError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Password hashing failed");
                ServiceError::Internal("Password hashing failed".to_string())
            })
    }
}

fn email_taken() -> ServiceError {
    ServiceError::validation("email", "A user with this email already exists.")
}

fn internal_token_error(err: JwtError) -> ServiceError {
    error!(error = %err, "Token signing failed");
    ServiceError::Internal("Token signing failed".to_string())
}

/// Minimal shape check: one `@` with a non-empty local part and a dotted domain
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const SECRET: &str = "identity-test-secret-at-least-32-bytes";

    fn provider() -> IdentityProvider {
        IdentityProvider::new(
            Arc::new(InMemoryStore::new()),
            SECRET,
            HashParams::insecure_fast(),
        )
    }

    fn validation_field(err: ServiceError) -> String {
        match err {
            ServiceError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let provider = provider();
        let user = provider
            .register(" Ada@Example.com ", "Ada", "analytical", "analytical")
            .await
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let provider = provider();

        let err = provider
            .register("ada@example.com", "Ada", "analytical", "different")
            .await
            .unwrap_err();
        assert_eq!(validation_field(err), "repeated_password");

        let err = provider
            .register("ada@example.com", "Ada", "12345678", "12345678")
            .await
            .unwrap_err();
        assert_eq!(validation_field(err), "password");

        let err = provider
            .register("not-an-email", "Ada", "analytical", "analytical")
            .await
            .unwrap_err();
        assert_eq!(validation_field(err), "email");

        let err = provider
            .register("ada@example.com", "  ", "analytical", "analytical")
            .await
            .unwrap_err();
        assert_eq!(validation_field(err), "fullname");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_case_insensitive() {
        let provider = provider();
        provider
            .register("ada@example.com", "Ada", "analytical", "analytical")
            .await
            .unwrap();

        let err = provider
            .register("ADA@example.com", "Ada", "analytical", "analytical")
            .await
            .unwrap_err();
        assert_eq!(validation_field(err), "email");
    }

    #[tokio::test]
    async fn test_authenticate_errors_are_indistinguishable() {
        let provider = provider();
        provider
            .register("ada@example.com", "Ada", "analytical", "analytical")
            .await
            .unwrap();

        let wrong_password = provider
            .authenticate("ada@example.com", "wrong-password")
            .await
            .unwrap_err();
        let unknown_email = provider
            .authenticate("bob@example.com", "analytical")
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, ServiceError::Unauthenticated(_)));
        assert!(provider.authenticate("ADA@example.com", "analytical").await.is_ok());
    }

    #[tokio::test]
    async fn test_tokens_verify_and_refresh() {
        let provider = provider();
        let user = provider
            .register("ada@example.com", "Ada", "analytical", "analytical")
            .await
            .unwrap();

        let tokens = provider.issue_tokens(&user).unwrap();
        assert_eq!(provider.verify(&tokens.access_token).unwrap().user_id, user.id);
        assert!(matches!(
            provider.verify(&tokens.refresh_token),
            Err(AuthError::InvalidToken(_))
        ));

        let access = provider.refresh(&tokens.refresh_token).unwrap();
        assert_eq!(provider.verify(&access).unwrap().user_id, user.id);
        assert!(matches!(
            provider.refresh(&tokens.access_token),
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@@b.co"));
        assert!(!looks_like_email("a@.co"));
    }
}
