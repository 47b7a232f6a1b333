//! Core domain types for the Vigil security-event storage services.

pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod indicator;
pub mod log;
pub mod summary;

pub use config::{
    EncryptionConfig, QueryConfig, RepairConfig, RetryConfig, VigilConfig,
};
pub use error::{CoreError, CoreResult};
pub use event::Event;
pub use ids::DocumentId;
pub use indicator::{
    Confidence, IndicatorPayload, IndicatorStatus, IndicatorType, IndicatorValue, ThreatIndicator,
};
pub use log::{LogEntry, Severity};
pub use summary::SummaryCounter;
