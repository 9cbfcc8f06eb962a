//! Storage layer for the tracking backend.
//!
//! [`TrackingStore`] covers products, users, sessions and tags, and extends
//! [`ActivationStore`] for unlock keys. Two implementations:
//!
//! - [`MemoryStore`]: everything behind one mutex; tests and local runs
//! - [`SqliteStore`]: a SQLite file; activation runs in an `IMMEDIATE`
//!   transaction so concurrent redemptions serialize on the database lock

mod error;
mod memory;
mod models;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{Product, Session, Tag, User, DEFAULT_SHARD};
pub use sqlite::SqliteStore;

use danceparty_crypto::Handle;
use danceparty_keys::ActivationStore;
use danceparty_types::Environment;

/// Lookups and inserts used by the request handlers.
pub trait TrackingStore: ActivationStore {
    /// Inserts a product. Handles are unique.
    fn insert_product(&self, product: Product) -> StoreResult<()>;

    /// Finds a product by client credentials.
    fn find_product(
        &self,
        code: &str,
        password: &str,
        env: Environment,
    ) -> StoreResult<Option<Product>>;

    /// Finds a product by handle.
    fn find_product_by_handle(&self, handle: &Handle) -> StoreResult<Option<Product>>;

    /// Finds a user by handle.
    fn find_user(&self, handle: &Handle) -> StoreResult<Option<User>>;

    /// Returns the stored user with `user.user_handle`, inserting `user` if
    /// there is none. The flag is true when the user was created.
    fn find_or_create_user(&self, user: User) -> StoreResult<(User, bool)>;

    /// Inserts a session. Handles are unique.
    fn insert_session(&self, session: Session) -> StoreResult<()>;

    /// Finds a session by handle.
    fn find_session(&self, handle: &Handle) -> StoreResult<Option<Session>>;

    /// Appends a telemetry tag.
    fn insert_tag(&self, tag: Tag) -> StoreResult<()>;

    /// Lists the tags of a session in insertion order.
    fn list_tags(&self, session: &Handle) -> StoreResult<Vec<Tag>>;
}
