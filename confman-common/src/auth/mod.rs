//! Credential primitives shared by the service and its tooling
//!
//! Pure functions plus the one database operation that needs them (loading
//! the token secret). No HTTP framework dependencies: the server wraps these
//! in its own middleware and handlers.

pub mod codes;
pub mod password;
pub mod token;

pub use codes::{generate_code, Channel};
pub use password::PasswordHasher;
pub use token::{load_token_secret, Claims, TokenAuthority};
