//! reserveai-core: claims-triangle statistics, outlier detection and the
//! staged analysis workflow.

pub mod config;
pub mod eda;
pub mod engine;
pub mod error;
pub mod event;
pub mod export;
pub mod frame;
pub mod llm;
pub mod outlier;
pub mod prompts;
pub mod rng;
pub mod sample;
pub mod schema;
pub mod session;
pub mod summary;
pub mod triangle;
pub mod types;
pub mod viz;

pub use engine::WorkflowEngine;
pub use error::{TriangleError, TriangleResult};
pub use frame::Frame;
pub use session::{SessionContext, Stage};
pub use triangle::{normalize, NormalizedTriangle};
