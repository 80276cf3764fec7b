//! Scaffold Core - Views and Logs for a Minimal MVC App
//!
//! # Guarantees
//! 1. A page is a view rendered inside a layout, never one without the other
//! 2. Names a view defines are visible to its layout
//! 3. Partial template output never escapes a failed render
//! 4. One log call, one complete line
//! 5. Debug logs stay out of production

pub mod scope;
pub mod templates;
pub mod capture;
pub mod engine;
pub mod view;
pub mod dump;
pub mod log;
pub mod config;

pub use scope::{VariableScope, CONTENT_KEY};
pub use templates::{TemplateSource, FsTemplateSource, MemoryTemplateSource};
pub use capture::CaptureRegion;
pub use engine::{TemplateEngine, TemplateEnv, MarkupEngine, EngineError, escape_html};
pub use view::{LayoutView, ViewConfig, RequestContext, RenderError};
pub use log::{Log, LogError, Severity, RuntimeMode, ModeFlag, Identity, Payload};
pub use config::{AppConfig, ConfigError};

pub const SCAFFOLD_VERSION: &str = env!("CARGO_PKG_VERSION");
