//! Expression evaluation
//!
//! The host engine owns the real expression language. This module defines the
//! seam (`Evaluator`) that `Context::eval` delegates to, plus `ElEvaluator`,
//! a small evaluator covering what definition documents use:
//!
//! - `${name}` resolves to the typed value of `name`
//! - `text ${a} more ${b}` interpolates into a string
//! - `${a == 'x' && !b}` evaluates comparisons and boolean logic
//!
//! Strings without `${` evaluate to themselves.

pub mod ast;
pub mod parser;

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::errors::{BridgeError, BridgeResult};
use crate::values::Val;
use ast::{BinaryOp, Expr};

pub use parser::parse_expression;

/// Variable scope an expression is evaluated against
pub type Scope = BTreeMap<String, Val>;

/// Host expression evaluator
pub trait Evaluator: Send + Sync {
    fn eval(&self, expression: &str, scope: &Scope) -> BridgeResult<Val>;

    /// Evaluate every template string nested inside `value`
    fn eval_value(&self, value: &Val, scope: &Scope) -> BridgeResult<Val> {
        match value {
            Val::Str(s) => self.eval(s, scope),
            Val::List(items) => Ok(Val::List(
                items
                    .iter()
                    .map(|v| self.eval_value(v, scope))
                    .collect::<BridgeResult<_>>()?,
            )),
            Val::Set(items) => Ok(Val::Set(
                items
                    .iter()
                    .map(|v| self.eval_value(v, scope))
                    .collect::<BridgeResult<_>>()?,
            )),
            Val::Map(map) => Ok(Val::Map(
                map.iter()
                    .map(|(k, v)| -> BridgeResult<(String, Val)> {
                        Ok((k.clone(), self.eval_value(v, scope)?))
                    })
                    .collect::<BridgeResult<_>>()?,
            )),
            other => Ok(other.clone()),
        }
    }
}

/* ===================== Templates ===================== */

/// One piece of a template string
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(String),
}

/// Split a template into literal text and `${...}` bodies
///
/// Braces inside quoted strings do not close an expression.
pub fn split_template(template: &str) -> BridgeResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let body_start = start + 2;
        let end = find_closing_brace(&rest[body_start..]).ok_or_else(|| {
            BridgeError::expression(template, "Unclosed template expression")
        })?;
        segments.push(Segment::Expr(
            rest[body_start..body_start + end].trim().to_string(),
        ));
        rest = &rest[body_start + end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    Ok(segments)
}

fn find_closing_brace(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(ch),
            (None, '}') => return Some(idx),
            _ => {}
        }
    }
    None
}

/* ===================== Reference Evaluator ===================== */

#[derive(Debug, Clone, Copy, Default)]
pub struct ElEvaluator;

impl ElEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for ElEvaluator {
    fn eval(&self, expression: &str, scope: &Scope) -> BridgeResult<Val> {
        let segments = split_template(expression)?;

        // A lone ${...} keeps the type of its result
        if let [Segment::Expr(body)] = segments.as_slice() {
            let expr = parse_expression(body)?;
            return eval_expr(&expr, scope, expression);
        }

        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(body) => {
                    let expr = parse_expression(body)?;
                    out.push_str(&eval_expr(&expr, scope, expression)?.to_string());
                }
            }
        }
        Ok(Val::Str(out))
    }
}

/// Evaluate a parsed expression against a scope
///
/// `source` is only used for error reporting.
pub fn eval_expr(expr: &Expr, scope: &Scope, source: &str) -> BridgeResult<Val> {
    match expr {
        Expr::Lit { v } => Ok(v.clone()),

        Expr::Ident { name } => scope
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::expression(source, format!("Unknown variable '{}'", name))),

        Expr::Member { object, property } => match eval_expr(object, scope, source)? {
            Val::Map(map) => Ok(map.get(property).cloned().unwrap_or(Val::Null)),
            other => Err(BridgeError::expression(
                source,
                format!("Cannot read property '{}' of {}", property, other.kind()),
            )),
        },

        Expr::Not { operand } => Ok(Val::Bool(!eval_expr(operand, scope, source)?.is_truthy())),

        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let l = eval_expr(left, scope, source)?;
                if !l.is_truthy() {
                    return Ok(Val::Bool(false));
                }
                Ok(Val::Bool(eval_expr(right, scope, source)?.is_truthy()))
            }
            BinaryOp::Or => {
                let l = eval_expr(left, scope, source)?;
                if l.is_truthy() {
                    return Ok(Val::Bool(true));
                }
                Ok(Val::Bool(eval_expr(right, scope, source)?.is_truthy()))
            }
            BinaryOp::Eq => {
                let (l, r) = (eval_expr(left, scope, source)?, eval_expr(right, scope, source)?);
                Ok(Val::Bool(values_equal(&l, &r)))
            }
            BinaryOp::Ne => {
                let (l, r) = (eval_expr(left, scope, source)?, eval_expr(right, scope, source)?);
                Ok(Val::Bool(!values_equal(&l, &r)))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (l, r) = (eval_expr(left, scope, source)?, eval_expr(right, scope, source)?);
                let ordering = compare(&l, &r).ok_or_else(|| {
                    BridgeError::expression(
                        source,
                        format!("Cannot compare {} with {}", l.kind(), r.kind()),
                    )
                })?;
                let result = match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Val::Bool(result))
            }
        },
    }
}

/// Numbers compare by value across widths; UUIDs compare with their text
fn values_equal(l: &Val, r: &Val) -> bool {
    match (l, r) {
        (Val::Uuid(u), Val::Str(s)) | (Val::Str(s), Val::Uuid(u)) => u.to_string() == *s,
        _ => match (integral(l), integral(r)) {
            (Some(a), Some(b)) => a == b,
            _ => match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => l == r,
            },
        },
    }
}

fn compare(l: &Val, r: &Val) -> Option<Ordering> {
    match (l, r) {
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        _ => match (integral(l), integral(r)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
        },
    }
}

/// Exact view of Int/Long; f64 only when a `Num` is involved
fn integral(v: &Val) -> Option<i64> {
    match v {
        Val::Int(i) => Some(i64::from(*i)),
        Val::Long(l) => Some(*l),
        _ => None,
    }
}
