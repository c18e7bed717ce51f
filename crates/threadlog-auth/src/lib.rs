pub mod bearer;
pub mod client;
pub mod cookie;
pub mod error;
pub mod identity;
pub mod types;

pub use bearer::{extract_bearer, read_cookie, resolve_access_token};
pub use client::{AuthSettings, SupabaseAuth, TokenVerifier};
pub use cookie::{AppEnv, CookiePolicy, SameSite, REFRESH_COOKIE};
pub use error::{AuthError, Result};
pub use identity::{Identity, ProfileMeta};
pub use types::{Session, UpstreamReply};
