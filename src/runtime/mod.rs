//! Turns a `Service` plus its detection and assigned port into a concrete
//! [`descriptor::RuntimeDescriptor`].

pub mod builder;
pub mod descriptor;
pub mod python_interpreter;

pub use descriptor::{HealthCheckKind, HealthCheckPolicy, RuntimeDescriptor};
