//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the camera uploads core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast capability validation
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other modules depend on. It
//! establishes the logging conventions, dependency-injection configuration,
//! and event broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, MaintenanceEvent, UploadEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
