pub mod config;
pub mod errors;
pub mod evaluation;
pub mod invocation;
pub mod metric;

pub use config::*;
pub use errors::*;
pub use evaluation::*;
pub use invocation::*;
pub use metric::*;
