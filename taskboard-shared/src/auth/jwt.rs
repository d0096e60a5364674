/// Bearer token signing and validation
///
/// Tokens are HS256 JWTs carrying the user ID as subject and a token type.
/// Access tokens authenticate API requests; refresh tokens can only be
/// exchanged for a new access token.
///
/// # Token Lifetimes
///
/// - **Access**: 24 hours
/// - **Refresh**: 30 days
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{TokenSigner, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let signer = TokenSigner::new("a-secret-of-at-least-thirty-two-bytes!!");
/// let user_id = Uuid::new_v4();
///
/// let token = signer.issue(user_id, TokenType::Access)?;
/// let claims = signer.validate(&token, TokenType::Access)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim written into and required on every token
pub const ISSUER: &str = "taskboard";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    Encode(String),

    /// Signature, issuer or format check failed
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is valid but of the other type
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (24 hours)
    Access,

    /// Refresh token (30 days)
    Refresh,
}

impl TokenType {
    /// Gets the lifetime for this token type
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Issuer - always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Access or refresh
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims expiring after the default lifetime for `token_type`
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::expiring_in(user_id, token_type, token_type.lifetime())
    }

    /// Creates claims with an explicit lifetime
    ///
    /// A negative `expires_in` yields already-expired claims.
    pub fn expiring_in(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }
}

/// Signs and validates tokens with one HS256 secret
///
/// Keys are derived once at construction.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Creates a signer for `secret`
    ///
    /// The secret should be at least 32 bytes; `Config` enforces this for
    /// the server.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs claims into a compact JWT
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Encode` if serialization or signing fails.
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }

    /// Issues a fresh token of the given type for a user
    pub fn issue(&self, user_id: Uuid, token_type: TokenType) -> Result<String, JwtError> {
        self.sign(&Claims::new(user_id, token_type))
    }

    /// Validates a token and checks its type
    ///
    /// # Errors
    ///
    /// - `JwtError::Expired` if `exp` has passed
    /// - `JwtError::WrongType` if the token is of the other type
    /// - `JwtError::Invalid` for any signature, issuer or format failure
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.token_type != expected {
            return Err(JwtError::WrongType {
                expected: expected.as_str(),
                actual: data.claims.token_type.as_str(),
            });
        }

        Ok(data.claims)
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// # Errors
    ///
    /// Fails if the refresh token is invalid, expired or an access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, JwtError> {
        let claims = self.validate(refresh_token, TokenType::Refresh)?;
        self.issue(claims.sub, TokenType::Access)
    }
}
