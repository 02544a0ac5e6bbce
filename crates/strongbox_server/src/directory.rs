//! The credential directory.

use std::sync::Arc;
use strongbox_core::{CancelToken, DirectoryError, DirectoryResult, User, UserStore};
use tracing::debug;

/// Cost parameter of the password hash. Build-time constant; raising
/// it only affects newly stored hashes.
pub const HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// A syntactically valid hash that no password verifies against.
/// Authentication runs a verification against it when the login is
/// unknown, so the two failure modes take the same time.
const BURN_HASH: &str = "$2a$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

/// Registration and authentication over a [`UserStore`].
///
/// Passwords are hashed with an adaptive cost function before they
/// reach the backend; the backend only ever sees hashes.
pub struct Directory {
    backend: Arc<dyn UserStore>,
}

impl Directory {
    /// Creates a directory over a credential backend.
    pub fn new(backend: Arc<dyn UserStore>) -> Self {
        Self { backend }
    }

    /// Registers a new user.
    pub fn register(&self, ctx: &CancelToken, login: &str, password: &str) -> DirectoryResult<User> {
        let login = login.trim();
        if login.is_empty() {
            return Err(DirectoryError::EmptyLogin);
        }

        let hash = bcrypt::hash(password, HASH_COST)
            .map_err(|e| DirectoryError::transient(format!("hashing a password: {e}")))?;

        let user = self.backend.add_user(ctx, login, &hash)?;
        debug!(login, "user registered");
        Ok(user)
    }

    /// Authenticates a user.
    ///
    /// An unknown login and a wrong password are indistinguishable to
    /// the caller, in message and in timing.
    pub fn authenticate(
        &self,
        ctx: &CancelToken,
        login: &str,
        password: &str,
    ) -> DirectoryResult<User> {
        let login = login.trim();
        if login.is_empty() {
            return Err(DirectoryError::UnknownUser);
        }

        match self.backend.user_by_login(ctx, login)? {
            Some(user) => {
                if bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
                    Ok(user)
                } else {
                    Err(DirectoryError::UnknownUser)
                }
            }
            None => {
                let _ = bcrypt::verify(password, BURN_HASH);
                Err(DirectoryError::UnknownUser)
            }
        }
    }
}
