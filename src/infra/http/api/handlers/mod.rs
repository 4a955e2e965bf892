//! API handlers organized by resource.

mod articles;
mod auth;
mod categories;
mod languages;
mod public;
mod system;
mod users;

pub use articles::*;
pub use auth::*;
pub use categories::*;
pub use languages::*;
pub use public::*;
pub use system::*;
pub use users::*;
