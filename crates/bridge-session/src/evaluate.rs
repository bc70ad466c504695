//! Expression evaluation with classified failures.

use thiserror::Error;

use crate::channel::{Availability, ChannelError, ValueRef};

/// Why an evaluation produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationFailure {
    /// The request carried no expression.
    #[error("no expression supplied")]
    NoExpression,
    /// The expression is not valid in the frame.
    #[error("invalid expression")]
    InvalidExpression,
    /// The debuggee cannot produce the value right now.
    #[error("value not available")]
    NotAvailable,
    /// No frame to evaluate in.
    #[error("no active frame")]
    NoActiveFrame,
    /// The evaluator's own message.
    #[error("{0}")]
    Literal(String),
}

impl From<ChannelError> for EvaluationFailure {
    fn from(err: ChannelError) -> Self {
        EvaluationFailure::Literal(err.to_string())
    }
}

/// Validate and evaluate `expression`, then wait for the result.
///
/// `frame` is `None` when the request named no live frame. `validate`
/// and `evaluate` run against that frame.
pub fn evaluate_expression<F, V, E>(
    expression: Option<&str>,
    frame: Option<&F>,
    validate: V,
    evaluate: E,
) -> Result<ValueRef, EvaluationFailure>
where
    V: FnOnce(&F, &str) -> bool,
    E: FnOnce(&F, &str) -> Result<ValueRef, ChannelError>,
{
    let expression = match expression.map(str::trim) {
        Some(expr) if !expr.is_empty() => expr,
        _ => return Err(EvaluationFailure::NoExpression),
    };
    let frame = frame.ok_or(EvaluationFailure::NoActiveFrame)?;

    if !validate(frame, expression) {
        return Err(EvaluationFailure::InvalidExpression);
    }

    let value = evaluate(frame, expression)?;
    value.wait_ready();
    match value.availability() {
        Availability::Available => Ok(value),
        Availability::NotAvailable => Err(EvaluationFailure::NotAvailable),
        Availability::Error(message) => Err(EvaluationFailure::Literal(message)),
    }
}
