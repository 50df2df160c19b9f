//! Execution context
//!
//! A [`Context`] carries the optional error-log sink, an opaque user-data
//! handle and the plugin chain. It is a cheap shared handle: objects created
//! with a context keep a clone of it, and a context can be read from many
//! threads at once. Changing the error log needs `&mut Context`; the change
//! applies to that handle and to objects created from it afterwards.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{Error, ErrorKind};
use crate::handle::Duplicable;

/// Error-log sink, invoked synchronously when an operation fails
pub type ErrorLog = Arc<dyn Fn(&str, ErrorKind) + Send + Sync>;

/// Extra parametric curve families
///
/// Type ids follow the built-in numbering: positive ids are forward
/// curves, negative ids their inverses. Built-in ids are 1 through 5.
pub trait ParametricCurvePlugin: Send + Sync {
    /// Curve type ids handled by this plugin
    fn curve_types(&self) -> &[i32];

    /// Number of parameters `curve_type` takes
    fn param_count(&self, curve_type: i32) -> usize;

    /// Evaluate `curve_type` at `x`
    fn evaluate(&self, curve_type: i32, params: &[f64], x: f64) -> f64;
}

#[derive(Clone, Default)]
struct ContextInner {
    error_log: Option<ErrorLog>,
    user_data: Option<Arc<dyn Any + Send + Sync>>,
    curve_plugins: Vec<Arc<dyn ParametricCurvePlugin>>,
}

/// Execution environment shared by profiles, curves, pipelines and
/// transforms
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// A context with no log, user data or plugins
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Install the error-log sink
    pub fn set_error_log<F>(&mut self, log: F)
    where
        F: Fn(&str, ErrorKind) + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.inner).error_log = Some(Arc::new(log));
    }

    pub fn clear_error_log(&mut self) {
        Arc::make_mut(&mut self.inner).error_log = None;
    }

    pub fn has_error_log(&self) -> bool {
        self.inner.error_log.is_some()
    }

    /// User data, if present and of type `T`
    pub fn user_data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.user_data.as_deref()?.downcast_ref::<T>()
    }

    /// Copy of this context with a different user-data handle
    pub fn duplicate_with_user_data<T: Any + Send + Sync>(&self, data: T) -> Self {
        let mut inner = (*self.inner).clone();
        inner.user_data = Some(Arc::new(data));
        Self {
            inner: Arc::new(inner),
        }
    }

    /// First registered plugin that handles `curve_type`
    pub fn curve_plugin(&self, curve_type: i32) -> Option<Arc<dyn ParametricCurvePlugin>> {
        self.inner
            .curve_plugins
            .iter()
            .find(|p| p.curve_types().contains(&curve_type))
            .cloned()
    }

    pub fn plugin_count(&self) -> usize {
        self.inner.curve_plugins.len()
    }

    /// Log `err` and hand it to the error-log sink
    pub fn signal(&self, err: &Error) {
        if let Some(log) = &self.inner.error_log {
            log(&err.to_string(), err.kind());
        }
    }
}

/// Log `err` and pass it to the context's sink, returning it for `?`
pub(crate) fn report(ctx: Option<&Context>, err: Error) -> Error {
    warn!(kind = ?err.kind(), "{}", err);
    if let Some(ctx) = ctx {
        ctx.signal(&err);
    }
    err
}

impl Duplicable for Context {
    fn duplicate(&self) -> Self {
        Self {
            inner: Arc::new((*self.inner).clone()),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("error_log", &self.inner.error_log.is_some())
            .field("user_data", &self.inner.user_data.is_some())
            .field("curve_plugins", &self.inner.curve_plugins.len())
            .finish()
    }
}

/// Builder for [`Context`]
#[derive(Default)]
pub struct ContextBuilder {
    inner: ContextInner,
}

impl ContextBuilder {
    pub fn with_error_log<F>(mut self, log: F) -> Self
    where
        F: Fn(&str, ErrorKind) + Send + Sync + 'static,
    {
        self.inner.error_log = Some(Arc::new(log));
        self
    }

    pub fn with_user_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.inner.user_data = Some(Arc::new(data));
        self
    }

    /// Append a curve plugin; earlier plugins win on overlapping ids
    pub fn with_curve_plugin<P: ParametricCurvePlugin + 'static>(mut self, plugin: P) -> Self {
        self.inner.curve_plugins.push(Arc::new(plugin));
        self
    }

    pub fn build(self) -> Context {
        Context {
            inner: Arc::new(self.inner),
        }
    }
}
