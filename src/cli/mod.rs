//! Command-line interface for the settlement engine.

mod check;
mod command;
mod markets;
mod run;

pub use command::{Cli, Commands};

pub use check::execute as check_config;
pub use markets::execute as list_markets;
pub use run::{build_engine, execute as run_loop, execute_once as run_once};
