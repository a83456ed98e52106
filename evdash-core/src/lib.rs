//! Core of the event dashboard.
//!
//! - `event`: the event record and its instant normalization
//! - `store`: the [`EventStore`] contract with local, remote and memory adapters
//! - `filter`: narrowing the list by name, location and date range
//! - `view`: which screen is shown and the transitions between screens
//! - `controller`: [`Dashboard`], which ties the above together

pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod event;
pub mod filter;
pub mod store;
pub mod view;

pub use config::{DashboardConfig, StoreConfig};
pub use controller::{Dashboard, Failure, Pending};
pub use error::{DashError, DashResult, ErrorKind};
pub use event::{EventDraft, EventForm, EventId, EventRecord};
pub use filter::{DateRange, FilterSpec, apply_filter};
pub use store::{
    EventStore, LocalStore, MemoryStore, Publisher, RemoteStore, Snapshot, Subscription, Watermark,
};
pub use view::{ViewIntent, ViewState};
