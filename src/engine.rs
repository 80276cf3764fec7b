//! Template Execution
//!
//! A template runs against an explicit binding environment and writes into
//! whatever output it is handed. Engines are pluggable through
//! [`TemplateEngine`]; [`MarkupEngine`] is the one the scaffold ships with.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::scope::VariableScope;

/// Housekeeping binding holding the path of the running template.
pub const TEMPLATE_BINDING: &str = "__template__";
/// Housekeeping binding holding the scope the template was entered with.
pub const SCOPE_BINDING: &str = "__scope__";

const HOUSEKEEPING: [&str; 2] = [TEMPLATE_BINDING, SCOPE_BINDING];

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Output error")]
    Output(#[from] fmt::Error),
}

pub trait TemplateEngine {
    /// Run `source` against `env`, writing produced text to `out`. Bindings
    /// the template introduces or rebinds are left in `env`.
    fn execute(
        &self,
        source: &str,
        env: &mut TemplateEnv,
        out: &mut dyn fmt::Write,
    ) -> Result<(), EngineError>;
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names bound while a template runs.
#[derive(Debug, Clone, Default)]
pub struct TemplateEnv {
    bindings: IndexMap<String, Value>,
}

impl TemplateEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment for one template run: housekeeping names first, then
    /// every scope entry that does not collide with them.
    pub fn for_template(path: &Path, scope: &VariableScope) -> Self {
        let mut env = Self::new();
        env.set(TEMPLATE_BINDING, Value::String(path.display().to_string()));
        env.set(SCOPE_BINDING, scope.to_value());
        env.bind_scope(scope);
        env
    }

    /// Bind each scope entry unless the name is already bound or is not a
    /// usable identifier. First writer wins. Returns the skipped names.
    pub fn bind_scope(&mut self, scope: &VariableScope) -> Vec<String> {
        let mut skipped = vec![];
        for (name, value) in scope.iter() {
            if !is_identifier(name) || self.bindings.contains_key(name) {
                tracing::trace!(name, "scope entry not bound");
                skipped.push(name.to_string());
                continue;
            }
            self.bindings.insert(name.to_string(), value.clone());
        }
        skipped
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bind or rebind `name` unconditionally.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Snapshot of every defined name except the housekeeping bindings.
    pub fn defined_vars(&self) -> VariableScope {
        self.bindings
            .iter()
            .filter(|(name, _)| !HOUSEKEEPING.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Text form of a bound value as it appears in template output.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Minimal markup engine.
///
/// - `{{ name }}` writes the binding HTML-escaped
/// - `{{ name | raw }}` writes it unescaped
/// - `{% set name = expr %}` rebinds `name`; `expr` is a JSON literal or a
///   bound identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupEngine;

impl MarkupEngine {
    pub fn new() -> Self {
        Self
    }

    fn output(&self, expr: &str, env: &TemplateEnv, out: &mut dyn fmt::Write) -> Result<(), EngineError> {
        let (name, filter) = match expr.split_once('|') {
            Some((name, filter)) => (name.trim(), Some(filter.trim())),
            None => (expr.trim(), None),
        };
        if !is_identifier(name) {
            return Err(EngineError::Syntax(format!("`{}` is not a variable name", name)));
        }
        let value = env
            .get(name)
            .ok_or_else(|| EngineError::UndefinedVariable(name.to_string()))?;
        let text = display_value(value);

        match filter {
            None => out.write_str(&escape_html(&text))?,
            Some("raw") => out.write_str(&text)?,
            Some(other) => return Err(EngineError::Syntax(format!("unknown filter `{}`", other))),
        }
        Ok(())
    }

    fn directive(&self, body: &str, env: &mut TemplateEnv) -> Result<(), EngineError> {
        let body = body.trim();
        let assignment = body
            .strip_prefix("set")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .ok_or_else(|| EngineError::Syntax(format!("unknown directive `{}`", body)))?;
        let (name, expr) = assignment
            .split_once('=')
            .ok_or_else(|| EngineError::Syntax("`set` needs `name = value`".to_string()))?;
        let (name, expr) = (name.trim(), expr.trim());
        if !is_identifier(name) {
            return Err(EngineError::Syntax(format!("`{}` is not a variable name", name)));
        }

        let value = match serde_json::from_str::<Value>(expr) {
            Ok(literal) => literal,
            Err(_) if is_identifier(expr) => env
                .get(expr)
                .cloned()
                .ok_or_else(|| EngineError::UndefinedVariable(expr.to_string()))?,
            Err(e) => return Err(EngineError::Syntax(format!("bad value `{}`: {}", expr, e))),
        };
        env.set(name, value);
        Ok(())
    }
}

impl TemplateEngine for MarkupEngine {
    fn execute(
        &self,
        source: &str,
        env: &mut TemplateEnv,
        out: &mut dyn fmt::Write,
    ) -> Result<(), EngineError> {
        let mut rest = source;
        while let Some(start) = next_tag(rest) {
            let (text, tag) = rest.split_at(start);
            out.write_str(text)?;

            let (close, is_output) = if tag.starts_with("{{") { ("}}", true) } else { ("%}", false) };
            let end = tag[2..]
                .find(close)
                .map(|i| i + 2)
                .ok_or_else(|| EngineError::Syntax(format!("unterminated `{}` tag", &tag[..2])))?;
            let inner = &tag[2..end];
            if is_output {
                self.output(inner, env, out)?;
            } else {
                self.directive(inner, env)?;
            }
            rest = &tag[end + close.len()..];
        }
        out.write_str(rest)?;
        Ok(())
    }
}

fn next_tag(text: &str) -> Option<usize> {
    match (text.find("{{"), text.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(source: &str, env: &mut TemplateEnv) -> Result<String, EngineError> {
        let mut out = String::new();
        MarkupEngine::new().execute(source, env, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_output_escapes_unless_raw() {
        let mut env = TemplateEnv::new();
        env.set("msg", json!("<b>&</b>"));
        assert_eq!(run("[{{ msg }}]", &mut env).unwrap(), "[&lt;b&gt;&amp;&lt;/b&gt;]");
        assert_eq!(run("[{{msg|raw}}]", &mut env).unwrap(), "[<b>&</b>]");
    }

    #[test]
    fn test_set_binds_literal_and_copies() {
        let mut env = TemplateEnv::new();
        env.set("a", json!(7));
        let out = run(r#"{% set title = "Home" %}{% set b = a %}{{ title }}-{{ b }}"#, &mut env).unwrap();
        assert_eq!(out, "Home-7");
        assert_eq!(env.get("title"), Some(&json!("Home")));
        assert_eq!(env.get("b"), Some(&json!(7)));
    }

    #[test]
    fn test_display_of_scalars() {
        let mut env = TemplateEnv::new();
        env.set("t", json!(true));
        env.set("f", json!(false));
        env.set("n", Value::Null);
        env.set("x", json!(1.5));
        assert_eq!(run("{{t}}|{{f}}|{{n}}|{{x}}", &mut env).unwrap(), "1|||1.5");
    }

    #[test]
    fn test_errors() {
        let mut env = TemplateEnv::new();
        assert!(matches!(run("{{ missing }}", &mut env), Err(EngineError::UndefinedVariable(n)) if n == "missing"));
        assert!(matches!(run("{{ open", &mut env), Err(EngineError::Syntax(_))));
        assert!(matches!(run("a {%} b", &mut env), Err(EngineError::Syntax(_))));
        assert!(matches!(run("a {{} b", &mut env), Err(EngineError::Syntax(_))));
        assert!(matches!(run("{% loop %}", &mut env), Err(EngineError::Syntax(_))));
        assert!(matches!(run("{% set 9x = 1 %}", &mut env), Err(EngineError::Syntax(_))));
        env.set("v", json!(1));
        assert!(matches!(run("{{ v | upper }}", &mut env), Err(EngineError::Syntax(_))));
    }

    #[test]
    fn test_bind_scope_skips_housekeeping_and_invalid_names() {
        let scope: VariableScope = [
            (TEMPLATE_BINDING, json!("spoofed")),
            ("bad-name", json!(1)),
            ("ok", json!(2)),
        ]
        .into_iter()
        .collect();

        let env = TemplateEnv::for_template(Path::new("views/x.html"), &scope);
        assert_eq!(env.get(TEMPLATE_BINDING), Some(&json!("views/x.html")));
        assert!(!env.is_bound("bad-name"));
        assert_eq!(env.get("ok"), Some(&json!(2)));

        let defined = env.defined_vars();
        assert!(!defined.contains(TEMPLATE_BINDING));
        assert!(!defined.contains(SCOPE_BINDING));
        assert_eq!(defined.len(), 1);
    }

    #[test]
    fn test_escape_html_quotes() {
        assert_eq!(escape_html(r#"a"b'c"#), "a&quot;b&#039;c");
    }
}
