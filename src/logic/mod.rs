pub mod coordinator;
pub mod monitor;
pub mod rules;

pub use coordinator::AlertCoordinator;
pub use monitor::{check_connections, MonitorService, PlotReport};
pub use rules::engine::recommend;
