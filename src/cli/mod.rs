pub mod args;
pub mod command;

pub use args::Cli;
pub use command::Runner;
