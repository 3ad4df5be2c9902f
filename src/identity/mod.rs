//! Identity and session management: user records, the identity store and
//! the cookie-token session manager that rehydrates the current user.
//! Keep the public surface thin and split implementation across sub-modules.

mod user;
mod store;
mod session;

pub use user::{CurrentUser, SessionState, User, UserId};
pub use store::{IdentityResolver, IdentityStore};
pub use session::{Session, SessionManager, SessionPolicy, SessionToken};
pub(crate) use session::gen_token;
