//! Service registry: on-disk JSON keyed by service name, reconciled
//! against the live OS on every read-side command.

pub mod disk;
pub mod model;
pub mod reconcile;

pub use disk::ServiceRegistry;
pub use model::{HealthState, RegistryEntry, ServiceStatus};
pub use reconcile::reconcile;
