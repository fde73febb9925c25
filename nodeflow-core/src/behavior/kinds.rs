//! Built-in node kinds.

use serde_json::json;

use super::{EvalContext, Fields, NodeBehavior, PortBuilder};
use crate::error::EvaluationFault;
use crate::types::ValueType;

/// Sums two numeric inputs. An unconnected or empty input counts as zero.
#[derive(Debug, Default, Clone)]
pub struct Add;

impl Add {
    pub const KIND: &'static str = "ADD";

    pub fn new() -> Self {
        Self
    }
}

impl NodeBehavior for Add {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn initialize(&mut self, ports: &mut PortBuilder<'_>) {
        ports.input(ValueType::Numeric);
        ports.input(ValueType::Numeric);
        ports.output(ValueType::Numeric);
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), EvaluationFault> {
        let lhs = ctx.input_numeric(0)?.unwrap_or(0.0);
        let rhs = ctx.input_numeric(1)?.unwrap_or(0.0);
        let sum = lhs + rhs;
        if !sum.is_finite() {
            return Err(EvaluationFault::failed(format!(
                "sum of {lhs} and {rhs} is not finite"
            )));
        }

        ctx.set_output(0, sum)?;
        ctx.set_aux("result", json!(sum));
        Ok(())
    }
}

/// A numeric source whose value is supplied from outside the graph.
///
/// The literal arrives through `set_external_data` under the `"value"` field,
/// either as a JSON number or as text holding one. It is parsed when the
/// node evaluates, so a bad literal surfaces as an evaluation fault rather
/// than being rejected at entry.
#[derive(Debug, Default, Clone)]
pub struct Constant {
    literal: Option<serde_json::Value>,
}

impl Constant {
    pub const KIND: &'static str = "CONSTANT";

    pub fn new() -> Self {
        Self::default()
    }

    /// A constant preloaded with `value`.
    pub fn with_value(value: f64) -> Self {
        Self {
            literal: Some(json!(value)),
        }
    }

    fn parse_literal(&self) -> Result<f64, EvaluationFault> {
        let malformed = |reason: String| EvaluationFault::MalformedParameter {
            field: "value".to_string(),
            reason,
        };

        let value = match &self.literal {
            None => return Ok(0.0),
            Some(serde_json::Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| malformed(format!("{n} is not representable as f64"))),
            Some(serde_json::Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .map_err(|e| malformed(format!("{text:?}: {e}"))),
            Some(other) => Err(malformed(format!("expected a number, got {other}"))),
        }?;

        // NaN and infinities parse from text but have no JSON form.
        if !value.is_finite() {
            return Err(malformed(format!("{value} is not a finite number")));
        }
        Ok(value)
    }
}

impl NodeBehavior for Constant {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn initialize(&mut self, ports: &mut PortBuilder<'_>) {
        ports.output(ValueType::Numeric);
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), EvaluationFault> {
        let value = self.parse_literal()?;
        ctx.set_output(0, value)?;
        ctx.set_aux("result", json!(value));
        Ok(())
    }

    fn set_external_data(&mut self, fields: &Fields) {
        if let Some(value) = fields.get("value") {
            self.literal = Some(value.clone());
        }
    }
}
