pub mod capabilities;
pub mod comparison;
pub mod events;
pub mod form_state_manager;
pub mod path_status;
pub mod snapshot;

pub use capabilities::{PathAddressable, Persistable};
pub use events::{SaveFailure, StoreEvent, SubscriptionId};
pub use form_state_manager::{FormStateStore, RequestRecord, SaveTicket};
pub use path_status::PathStatus;
pub use snapshot::Snapshot;
