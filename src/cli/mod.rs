//! CLI command handling

pub mod check;
pub mod output;
pub mod run;

pub use check::*;
pub use output::*;
pub use run::*;
pub use send_test::*;
