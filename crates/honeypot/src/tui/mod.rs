pub mod draw;
pub mod events;
mod run;
pub mod state;

pub use run::run_console;
