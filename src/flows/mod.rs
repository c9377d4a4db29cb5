//! Authorization Flows

pub mod authorization;
pub mod registrar;

pub use authorization::{AuthorizationFlow, FlowOptions};
pub use registrar::DynamicRegistrar;
