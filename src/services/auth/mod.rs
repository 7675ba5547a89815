/*
 * Responsibility
 * - credentials (bcrypt), session tokens (HS256 JWT), token -> identity resolution
 */
pub mod password;
pub mod session;
pub mod token;

pub use password::PasswordHasher;
pub use session::{Identity, Session, SessionResolver};
pub use token::TokenService;
