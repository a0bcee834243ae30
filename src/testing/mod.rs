//! Testing utilities for possession integrations
//!
//! - [`TestPrincipal`]: a principal with adjustable capabilities
//! - [`RecordingListener`]: captures dispatched events
//! - Alba-style HTTP scenarios (feature `http`) that follow the session cookie
//!   across requests

mod fixtures;
#[cfg(feature = "http")]
mod scenario;

pub use fixtures::{RecordingListener, TestPrincipal, fake};
#[cfg(feature = "http")]
pub use scenario::{Scenario, ScenarioAssert, get, post};
