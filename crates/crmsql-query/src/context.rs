//! Per-compilation state.

use crmsql_core::{SchemaError, SchemaErrorKind, Value};
use crmsql_schema::DataModel;

/// State shared by every node while one query tree compiles.
///
/// Holds the bound parameters in the order their `?` placeholders appear in
/// the statement text, and the first schema error met. One context belongs
/// to exactly one compilation.
#[derive(Debug)]
pub struct StatementCreationContext<'a> {
    model: &'a DataModel,
    params: Vec<Value>,
    error: Option<SchemaError>,
}

impl<'a> StatementCreationContext<'a> {
    pub fn new(model: &'a DataModel) -> Self {
        Self {
            model,
            params: Vec::new(),
            error: None,
        }
    }

    pub fn model(&self) -> &'a DataModel {
        self.model
    }

    /// Append a parameter and return its placeholder.
    pub fn bind(&mut self, value: Value) -> &'static str {
        self.params.push(value);
        "?"
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Record a schema problem. Compilation carries on; only the first
    /// problem is kept, every one is logged.
    pub fn set_error(&mut self, kind: SchemaErrorKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?kind, %message, "query compilation problem");
        if self.error.is_none() {
            self.error = Some(SchemaError { kind, message });
        }
    }

    pub fn error(&self) -> Option<&SchemaError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_parts(self) -> (Vec<Value>, Option<SchemaError>) {
        (self.params, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_error_and_param_order() {
        let model = DataModel::new();
        let mut ctx = StatementCreationContext::new(&model);
        assert_eq!(ctx.bind(Value::Int(1)), "?");
        ctx.bind(Value::from("x"));
        ctx.set_error(SchemaErrorKind::LinkNotFound, "no link from KP to FI");
        ctx.set_error(SchemaErrorKind::FieldNotFound, "F9 unknown");

        assert!(ctx.has_error());
        let (params, error) = ctx.into_parts();
        assert_eq!(params, vec![Value::Int(1), Value::from("x")]);
        let error = error.unwrap();
        assert_eq!(error.kind, SchemaErrorKind::LinkNotFound);
        assert_eq!(error.message, "no link from KP to FI");
    }
}
