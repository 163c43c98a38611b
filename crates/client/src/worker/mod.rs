//! Persistent tier: a versioned, cross-session cache in front of the network.
//!
//! [`CacheWorker`] answers requests from two named stores in
//! [`swapnav_core::CacheDb`] and reaches upstream through [`Network`].
//! [`WorkerRegistration`] is the entry point processes use to get an active
//! worker.

pub mod generation;
pub mod lifecycle;
pub mod network;
pub mod registration;
pub mod request;

pub use generation::CacheGeneration;
pub use lifecycle::{CacheWorker, FetchDecision, LifecycleState, ResponseSource, WorkerConfig};
pub use network::Network;
pub use registration::{RegistrationState, WorkerRegistration};
pub use request::{Destination, RequestClass, RequestMode, WorkerRequest, WorkerResponse};
