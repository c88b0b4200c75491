//! User persistence: the `users` table behind a narrow repository trait.

mod models;
mod store;

pub use models::{Role, User};
pub use store::{SqliteUserStore, UserStore, UserStoreError};
