use crate::error::{AppError, Result};
use crate::models::user::{NewUser, User};
use crate::repositories::user::UserRepository;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// Verified against when an email is unknown, so a miss costs the same Argon2
/// run as a wrong password. Parameters must track the constants above.
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=3,p=6$c2Vzc2lvbmdhdGVkdW1teQ$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-formatted hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.try_fill_bytes(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a hash.
///
/// # Returns
///
/// A `Result` containing `true` if the password is valid, `false` otherwise.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    tracing::debug!("Password verification completed");
    Ok(result)
}

/// Registers a new user.
///
/// # Arguments
///
/// * `users` - The user repository.
/// * `username` - The optional username.
/// * `email` - The user's email address.
/// * `password` - The plaintext password.
///
/// # Returns
///
/// A `Result` containing the created `User`.
pub async fn register_user(
    users: &dyn UserRepository,
    username: Option<String>,
    email: String,
    password: &str,
) -> Result<User> {
    tracing::debug!("🔐 Creating user: {}", email);
    let password_hash = hash_password(password)?;

    let user = users
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Authenticates a user by email and password.
///
/// Unknown emails and wrong passwords produce the same error. Disabled
/// accounts are refused only after the password checks out.
pub async fn authenticate_user(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<User> {
    tracing::debug!("🔐 Authenticating user: {}", email);

    let Some(user) = users.find_by_email(email).await? else {
        verify_password(password, DUMMY_PASSWORD_HASH)?;
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    };

    if !verify_password(password, &user.password)? {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    if user.disabled {
        return Err(AppError::AccountDisabled);
    }

    tracing::info!("✅ User authenticated: {}", user.id);

    Ok(user)
}
