//! tapgrid-register — announce this service to the grid simulator.
//!
//! On startup the control service posts its own reachable URL to the
//! simulator's registration endpoint. From then on the simulator drives
//! all traffic: it calls `/calculateControl/` every cycle and polls
//! `/heartbeat/` for liveness.
//!
//! # Protocol
//!
//! ```text
//! POST {simulator_url}/api/register/task
//! {"studenttask_url": "http://host.docker.internal:7777/"}
//!
//! 200             → Registered
//! other status    → Rejected(status), not retried
//! connect/timeout → retried with exponential backoff, then error
//! ```

pub mod client;
pub mod error;
pub mod registrar;

pub use client::registration_uri;
pub use error::RegisterError;
pub use registrar::{Backoff, Registrar, RegistrationOutcome, TaskRegistrationInfo};
