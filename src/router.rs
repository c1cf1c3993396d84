//! Intent routing: rules, statistical model, gate and dispatch.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod gate;
pub mod model;
pub mod persist;
pub mod rules;
pub mod training_data;

pub use config::RouterConfig;
pub use dispatch::{
    DEFAULT_FALLBACK_MESSAGE, DEFAULT_INTENT, DispatchContext, IntentHandler, NO_HANDLER,
    RouteResult,
};
pub use engine::{Router, static_response};
pub use gate::{GateConfig, GateOverrides, MarginFallback, RejectReason, RouteSignals};
pub use model::TrainingExample;
pub use persist::ArtifactInfo;
pub use rules::RuleSource;
pub use training_data::IntentsFile;
