//! Host CPU metrics plugin for a topology collector.
//!
//! The plugin serves two routes over a local Unix socket: `GET /report`
//! returns a topology snapshot carrying the active CPU metric (iowait or
//! idle percentage, read from `iostat -c`), and `POST /control` lets the
//! collector toggle which of the two metrics is active. All mutable state
//! lives in a single core task; the HTTP layer reaches it through message
//! passing only.

pub mod config;
pub mod http;
pub mod mode;
pub mod plugin;
pub mod report;
pub mod sampler;
pub mod socket;
