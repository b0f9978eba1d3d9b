pub mod config;
pub mod logging;
pub mod node;

pub use config::LedgerConfig;
pub use node::LedgerNode;
