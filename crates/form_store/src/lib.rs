//! Client-side store for one editable record: dirty tracking against the
//! last-persisted snapshot, partial saves and typed change events.

pub mod error;
pub mod shared;
pub mod transport;

pub use error::StoreError;
pub use shared::config::{load_config, StoreConfig};
pub use shared::state::{
    FormStateStore, PathAddressable, PathStatus, Persistable, SaveFailure, SaveTicket, StoreEvent,
};
pub use transport::{PersistenceTransport, ReqwestTransport};
