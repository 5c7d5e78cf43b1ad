//! CLI command handling

mod commands;
mod graph;
mod logging;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use graph::{GraphArgs, run_graph};
pub use logging::init_logging;
