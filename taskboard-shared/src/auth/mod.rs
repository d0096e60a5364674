/// Authentication and authorization
///
/// # Modules
///
/// - [`identity`]: Registration, login and bearer-token verification
/// - [`jwt`]: HS256 access and refresh tokens
/// - [`password`]: Argon2id hashing and the password policy
/// - [`middleware`]: The per-request [`middleware::Identity`] and header parsing
/// - [`authorization`]: Pure permission decisions over boards, tasks and comments
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{check_password_policy, hash_password, verify_password, HashParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// check_password_policy("user_password")?;
/// let hash = hash_password("user_password", &HashParams::insecure_fast())?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
