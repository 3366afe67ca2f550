mod middleware;
mod password;
mod service;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireAuth};
pub use password::{generate_random_password, hash_password, verify_password};
pub use service::{AuthService, Identity, parse_basic_credentials};
pub use token::{Claims, TokenSigner};
