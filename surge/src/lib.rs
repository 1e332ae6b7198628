//! Load generator.
//!
//! Drives concurrent or rate-limited calls into a target, collects one
//! [RequestOutcome](surge_core::RequestOutcome) per call and publishes a
//! [TestSummary](surge_core::TestSummary) once every call has reported.
pub mod generator;
pub mod server;
pub mod target;

pub(crate) mod dispatch;

pub use generator::LoadGenerator;
pub use surge_core::{ConfigError, ErrorCategory, TestConfig, TestMode, TestSummary};

pub mod prelude {
    pub use crate::generator::LoadGenerator;
    pub use crate::target::{coordinator_target, Call};
    pub use surge_core::{CallReport, ErrorCategory, TestConfig, TestMode, TestSummary};
}
