//! Node-side tooling for the masternode budget engine: configuration
//! loading, logging setup, and offline inspection commands over a state file.

pub mod cli;
pub mod config_loader;
pub mod logging;
pub mod state;

pub use config_loader::{LoggingConfig, NetworkConfig, NodeConfig};
pub use state::{ChainState, LoadedState, NodeState};
