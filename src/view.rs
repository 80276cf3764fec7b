//! Layout View - Two-Pass Rendering
//!
//! The view stage renders the page-specific template and captures its
//! output. The layout stage then renders the page shell with that output
//! bound to `_content_`. Only a fully rendered layout reaches the response.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::capture::CaptureRegion;
use crate::engine::{EngineError, TemplateEngine, TemplateEnv};
use crate::scope::VariableScope;
use crate::templates::TemplateSource;

#[cfg(feature = "test-hooks")]
use std::cell::Cell;

// Counted per thread.
#[cfg(feature = "test-hooks")]
thread_local! {
    static EXTRACT_CALL_COUNT: Cell<u32> = const { Cell::new(0) };
}

#[cfg(feature = "test-hooks")]
pub fn get_extract_call_count() -> u32 {
    EXTRACT_CALL_COUNT.with(Cell::get)
}

#[cfg(feature = "test-hooks")]
pub fn reset_extract_call_count() {
    EXTRACT_CALL_COUNT.with(|count| count.set(0));
}

pub const DEFAULT_LAYOUT: &str = "default";
pub const DEFAULT_EXT: &str = ".html";
pub const LAYOUTS_DIR: &str = "layouts";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Invalid view name: {0:?}")]
    InvalidViewName(String),

    #[error("Failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error executing {}: {source}", path.display())]
    Execution {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub views_dir: PathBuf,
    pub layout: String,
    /// File extension including the leading dot.
    pub ext: String,
}

impl ViewConfig {
    pub fn new(views_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
            layout: DEFAULT_LAYOUT.to_string(),
            ext: DEFAULT_EXT.to_string(),
        }
    }
}

/// The request-handling side of a render: which controller and action are
/// running, and the response body being accumulated.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub controller: String,
    pub action: String,
    pub output: String,
}

impl RequestContext {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
            output: String::new(),
        }
    }
}

pub struct LayoutView {
    config: ViewConfig,
    vars: VariableScope,
    source: Box<dyn TemplateSource>,
    engine: Box<dyn TemplateEngine>,
}

impl LayoutView {
    pub fn new(
        config: ViewConfig,
        source: Box<dyn TemplateSource>,
        engine: Box<dyn TemplateEngine>,
    ) -> Self {
        Self {
            config,
            vars: VariableScope::new(),
            source,
            engine,
        }
    }

    /// Bind a variable for the next render.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name, value);
    }

    pub fn vars(&self) -> &VariableScope {
        &self.vars
    }

    pub fn layout(&self) -> &str {
        &self.config.layout
    }

    pub fn set_layout(&mut self, layout: impl Into<String>) {
        self.config.layout = layout.into();
    }

    /// Resolve the view template for `action`. A bare name is looked up
    /// under the controller's directory; a slash-qualified path is taken
    /// relative to the views root as is.
    pub fn view_path(&self, controller: &str, action: &str) -> Result<PathBuf, RenderError> {
        let relative = if action.contains('/') {
            action.trim_start_matches('/').to_string()
        } else {
            format!("{}/{}", controller, action)
        };
        if !is_contained(&relative) {
            return Err(RenderError::InvalidViewName(action.to_string()));
        }
        Ok(self.config.views_dir.join(format!("{}{}", relative, self.config.ext)))
    }

    pub fn layout_path(&self) -> PathBuf {
        self.config
            .views_dir
            .join(LAYOUTS_DIR)
            .join(format!("{}{}", self.config.layout, self.config.ext))
    }

    /// Render `action` (default: the context's action) inside the layout and
    /// append the result to `ctx.output`. On any error the output is left
    /// untouched.
    pub fn render(&mut self, ctx: &mut RequestContext, action: Option<&str>) -> Result<(), RenderError> {
        let action = action.unwrap_or(ctx.action.as_str());
        let view_path = self.view_path(&ctx.controller, action)?;
        tracing::debug!(
            controller = %ctx.controller,
            action,
            view = %view_path.display(),
            "rendering view"
        );

        let mut vars = std::mem::take(&mut self.vars);
        let content = self.extract(&view_path, &mut vars);
        self.vars = vars;

        self.compose(ctx, content?)
    }

    fn compose(&self, ctx: &mut RequestContext, content: String) -> Result<(), RenderError> {
        let layout_path = self.layout_path();
        let mut layout_scope = self.vars.with_content(content);
        let page = self.extract(&layout_path, &mut layout_scope)?;

        tracing::debug!(layout = %layout_path.display(), bytes = page.len(), "layout rendered");
        ctx.output.push_str(&page);
        Ok(())
    }

    /// Execute one template against `scope` and return its captured output.
    /// On success `scope` is replaced with every name the template left
    /// defined, minus housekeeping bindings.
    pub fn extract(&self, path: &Path, scope: &mut VariableScope) -> Result<String, RenderError> {
        #[cfg(feature = "test-hooks")]
        EXTRACT_CALL_COUNT.with(|count| count.set(count.get() + 1));

        if !self.source.exists(path) {
            return Err(RenderError::TemplateNotFound(path.to_path_buf()));
        }
        let code = self.source.load(path).map_err(|source| RenderError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut env = TemplateEnv::for_template(path, scope);
        let mut capture = CaptureRegion::begin(path);
        self.engine
            .execute(&code, &mut env, &mut capture)
            .map_err(|source| RenderError::Execution {
                path: path.to_path_buf(),
                source,
            })?;

        *scope = env.defined_vars();
        Ok(capture.finish())
    }
}

fn is_contained(relative: &str) -> bool {
    relative
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
