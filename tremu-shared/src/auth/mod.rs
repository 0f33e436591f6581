/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access and refresh token generation and validation
/// - [`middleware`]: bearer token extraction into an [`middleware::AuthContext`]
/// - [`authorization`]: board membership and role checks
///
/// # Example
///
/// ```no_run
/// use tremu_shared::auth::password::{hash_password, verify_password};
/// use tremu_shared::auth::jwt::{create_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("kanban2024")?;
/// assert!(verify_password("kanban2024", &hash)?);
///
/// let token = create_token(&Claims::new(1, TokenType::Access), "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
