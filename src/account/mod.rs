/// Account domain model
pub mod manager;

pub use manager::AccountManager;

use crate::auth::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub code_hash: Option<String>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Projection safe to return to clients. Never exposes hashes or
    /// the refresh token.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            verified: self.verified,
            role: self.role.as_str().to_string(),
            created_at: self.created_at,
        }
    }
}

/// Client-facing account projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub verified: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Alphabet for one-time codes. Excludes 'O' and '0' to avoid
/// transcription mistakes.
pub const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNPQRSTUVWXYZ123456789";

/// Length of emailed verification and reset codes.
pub const CODE_LENGTH: usize = 4;

/// Generate a one-time code.
pub fn generate_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
            assert!(!code.contains('O'));
            assert!(!code.contains('0'));
        }
    }
}
