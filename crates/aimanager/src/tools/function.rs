use anyhow::{anyhow, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::signature::Signature;

pub type ImmediateFn = dyn Fn(ToolArgs) -> Result<Value> + Send + Sync;
pub type DeferredFn = dyn Fn(ToolArgs) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// How a tool runs. The tag is fixed at registration so the invoker never has to guess.
#[derive(Clone)]
pub enum ToolHandler {
    /// Runs to completion on the calling task
    Immediate(Arc<ImmediateFn>),
    /// Returns a future the invoker awaits
    Deferred(Arc<DeferredFn>),
}

impl ToolHandler {
    pub async fn call(&self, args: ToolArgs) -> Result<Value> {
        match self {
            ToolHandler::Immediate(f) => f(args),
            ToolHandler::Deferred(f) => f(args).await,
        }
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolHandler::Immediate(_) => f.write_str("Immediate"),
            ToolHandler::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Arguments bound to a tool's signature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    pub(super) values: Map<String, Value>,
    pub(super) varargs: Vec<Value>,
    pub(super) extra: Map<String, Value>,
}

impl ToolArgs {
    /// Deserializes a bound parameter into `T`
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| anyhow!("argument `{}` is not bound", name))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("argument `{}` has an unexpected type", name))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Surplus positional arguments collected by a variadic parameter
    pub fn varargs(&self) -> &[Value] {
        &self.varargs
    }

    /// Surplus keyword arguments collected by a variadic parameter
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// A callable that can be registered as a tool
#[derive(Debug, Clone)]
pub struct ToolFunction {
    name: String,
    doc: Option<String>,
    signature: Signature,
    handler: ToolHandler,
}

impl ToolFunction {
    pub fn immediate<N, F>(name: N, signature: Signature, f: F) -> Self
    where
        N: Into<String>,
        F: Fn(ToolArgs) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            signature,
            handler: ToolHandler::Immediate(Arc::new(f)),
        }
    }

    pub fn deferred<N, F, Fut>(name: N, signature: Signature, f: F) -> Self
    where
        N: Into<String>,
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            signature,
            handler: ToolHandler::Deferred(Arc::new(move |args| f(args).boxed())),
        }
    }

    /// Attach documentation, used as the advertised description unless one is given at
    /// registration
    pub fn with_doc<S: Into<String>>(mut self, doc: S) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn handler(&self) -> &ToolHandler {
        &self.handler
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.handler, ToolHandler::Deferred(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_handlers_run_by_kind() -> Result<()> {
        let immediate = ToolFunction::immediate("double", Signature::new().arg::<i64>("n"), |args| {
            Ok(json!(args.get::<i64>("n")? * 2))
        });
        let deferred = ToolFunction::deferred("later", Signature::new(), |_| async {
            tokio::task::yield_now().await;
            Ok::<Value, anyhow::Error>(json!("done"))
        });
        assert!(!immediate.is_deferred());
        assert!(deferred.is_deferred());

        let mut args = ToolArgs::default();
        args.values.insert("n".to_string(), json!(21));
        assert_eq!(immediate.handler().call(args).await?, json!(42));
        assert_eq!(deferred.handler().call(ToolArgs::default()).await?, json!("done"));
        Ok(())
    }

    #[test]
    fn test_get_reports_type_mismatch() {
        let mut args = ToolArgs::default();
        args.values.insert("n".to_string(), json!("not a number"));
        let err = args.get::<i64>("n").unwrap_err();
        assert!(err.to_string().contains("`n`"));
        assert!(args.get::<i64>("missing").is_err());
    }
}
