use regex::Regex;
use shared::{BakeryError, BakeryResult, NewUser};
use std::sync::LazyLock;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Compiled once on first use.
static EMAIL_REGEX: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN));

pub fn hash_password(password: &str) -> BakeryResult<String> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// A stored hash that does not parse never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn is_valid_email(email: &str) -> BakeryResult<bool> {
    let re = EMAIL_REGEX
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Invalid email pattern: {}", e))?;
    Ok(re.is_match(email))
}

/// Checks a registration request before anything is hashed or stored.
pub fn validate_new_user(user: &NewUser) -> BakeryResult<()> {
    let required = [
        ("username", &user.username),
        ("password", &user.password),
        ("name", &user.name),
        ("email", &user.email),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(BakeryError::invalid_input(format!("{} is required", field)));
        }
    }
    if !is_valid_email(user.email.trim())? {
        return Err(BakeryError::InvalidEmail(user.email.clone()));
    }
    Ok(())
}
