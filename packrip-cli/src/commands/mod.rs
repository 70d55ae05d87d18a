pub mod config;
pub mod rip;
pub mod run;
pub mod viewer;

pub use config::{handle_config_command, ConfigCommands};
pub use rip::handle_rip_command;
pub use run::{handle_run_command, RunArgs};
pub use viewer::{handle_viewer_command, ViewerCommands};
