//! # intent-router
//!
//! A hybrid rule-based and statistical intent router. An utterance is
//! normalized, checked against ordered regex rules and, when no rule fires,
//! classified by a calibrated linear model over TF-IDF features. A gate
//! combining probability, decision margin and nearest-example similarity
//! decides between the predicted intent and a fallback.
//!
//! ## Features
//!
//! - Pure Rust linear SVM with Platt calibration
//! - Rules that work before any training
//! - Concurrent routing over immutable, swappable snapshots
//! - Checksummed, atomically written artifacts
//!
//! ```
//! use intent_router::router::{DispatchContext, Router};
//!
//! let mut router = Router::new();
//! router.add_intent("greeting", ["hello", "hi there"], |_: &DispatchContext| {
//!     "Hello!".to_string()
//! });
//! router.add_intent("pricing", ["how much does it cost"], |_: &DispatchContext| {
//!     "It is free.".to_string()
//! });
//! router.train().unwrap();
//!
//! let result = router.route("xyzxyz123").unwrap();
//! assert_eq!(result.intent, "default");
//! ```

pub mod analysis;
pub mod cli;
pub mod error;
pub mod ml;
pub mod router;

pub mod prelude {
    pub use crate::error::{Result, RouterError};
    pub use crate::router::{
        DispatchContext, GateOverrides, IntentHandler, RouteResult, Router, RouterConfig,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
