pub mod error;
pub mod format;
pub mod metrics;
pub mod model;
pub mod ports;
pub mod present;
pub mod validate;

pub use error::*;
pub use format::*;
pub use metrics::*;
pub use model::*;
pub use ports::*;
pub use present::*;
pub use validate::*;
