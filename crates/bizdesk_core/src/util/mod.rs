//! Request-scoped helper functions.
//!
//! Small, dependency-light helpers shared by services and the CLI:
//! client IP extraction, random tokens, base64, recursive JSON search,
//! project key generation and clock access.

pub mod clock;
pub mod encoding;
pub mod ip;
pub mod project_key;
pub mod random;
pub mod search;

pub use clock::{date_start_epoch_ms, now_epoch_ms, today};
pub use encoding::{base64_decode, base64_encode};
pub use ip::client_ip;
pub use project_key::{generate_project_key, unique_project_key};
pub use random::{random_number, random_password, random_string};
pub use search::{search_recursive, PathSegment};
