//! Late-bound parameter resolution and environment configuration for the
//! workflow orchestration core (spec §4.2, §6).

pub mod env;
pub mod error;
pub mod fallback;
pub mod resolver;

pub use env::Settings;
pub use error::{ConfigError, ConfigResult};
pub use fallback::{resolve_param_with_fallback, UpstreamSource};
pub use resolver::{resolve_parameters, ParamValue};
