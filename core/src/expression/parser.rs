//! PEST-based parser for `${...}` expression bodies

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinaryOp, Expr};
use crate::errors::{BridgeError, BridgeResult};
use crate::values::Val;

#[derive(Parser)]
#[grammar = "expression/el.pest"]
struct ElParser;

/// Parse one expression body (the text between `${` and `}`)
pub fn parse_expression(source: &str) -> BridgeResult<Expr> {
    let mut pairs = ElParser::parse(Rule::expression, source)
        .map_err(|e| BridgeError::expression(source, e.to_string()))?;

    // expression = { SOI ~ or_expr ~ EOI }
    let root = pairs
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| BridgeError::expression(source, "empty expression"))?;

    build_expr(root, source)
}

fn build_error(source: &str, pair: &Pair<Rule>) -> BridgeError {
    BridgeError::expression(
        source,
        format!("Unexpected expression rule: {:?}", pair.as_rule()),
    )
}

fn build_expr(pair: Pair<Rule>, source: &str) -> BridgeResult<Expr> {
    match pair.as_rule() {
        Rule::or_expr | Rule::and_expr | Rule::cmp_expr => build_binary_chain(pair, source),
        Rule::unary => {
            // unary = { not_op* ~ member }
            let mut nots = 0;
            let mut operand = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::not_op => nots += 1,
                    _ => operand = Some(build_expr(inner, source)?),
                }
            }
            let mut expr =
                operand.ok_or_else(|| BridgeError::expression(source, "missing operand"))?;
            for _ in 0..nots {
                expr = Expr::Not {
                    operand: Box::new(expr),
                };
            }
            Ok(expr)
        }
        Rule::member => {
            // member = { primary ~ ("." ~ identifier)* }
            let mut inner = pair.into_inner();
            let primary = inner
                .next()
                .ok_or_else(|| BridgeError::expression(source, "missing primary"))?;
            let mut expr = build_expr(primary, source)?;
            for property in inner {
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: property.as_str().to_string(),
                };
            }
            Ok(expr)
        }
        Rule::primary | Rule::literal => {
            let err = build_error(source, &pair);
            let inner = pair.into_inner().next().ok_or(err)?;
            build_expr(inner, source)
        }
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),
        Rule::null_lit => Ok(Expr::Lit { v: Val::Null }),
        Rule::boolean => Ok(Expr::Lit {
            v: Val::Bool(pair.as_str() == "true"),
        }),
        Rule::number => build_number(pair.as_str(), source),
        Rule::string => {
            // string = { quote ~ content ~ quote }
            let content = pair
                .into_inner()
                .next()
                .map(|c| c.as_str().to_string())
                .unwrap_or_default();
            Ok(Expr::Lit { v: Val::Str(content) })
        }
        _ => Err(build_error(source, &pair)),
    }
}

/// Fold `a op b op c` left to right
fn build_binary_chain(pair: Pair<Rule>, source: &str) -> BridgeResult<Expr> {
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| BridgeError::expression(source, "missing operand"))?;
    let mut expr = build_expr(first, source)?;

    while let Some(op_pair) = inner.next() {
        let op = build_op(&op_pair, source)?;
        let right = inner
            .next()
            .ok_or_else(|| BridgeError::expression(source, "missing right operand"))?;
        expr = Expr::Binary {
            op,
            left: Box::new(expr),
            right: Box::new(build_expr(right, source)?),
        };
    }

    Ok(expr)
}

fn build_op(pair: &Pair<Rule>, source: &str) -> BridgeResult<BinaryOp> {
    let op = match pair.as_str() {
        "||" => BinaryOp::Or,
        "&&" => BinaryOp::And,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        _ => return Err(build_error(source, pair)),
    };
    Ok(op)
}

/// Integers keep their width tag; anything with a fraction is a Number
fn build_number(text: &str, source: &str) -> BridgeResult<Expr> {
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            let v = match i32::try_from(i) {
                Ok(small) => Val::Int(small),
                Err(_) => Val::Long(i),
            };
            return Ok(Expr::Lit { v });
        }
    }
    text.parse::<f64>()
        .map(|n| Expr::Lit { v: Val::Num(n) })
        .map_err(|e| {
            BridgeError::expression(source, format!("Failed to parse number '{}': {}", text, e))
        })
}
