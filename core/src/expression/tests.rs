//! Tests for template splitting, parsing and evaluation

use super::*;
use maplit::btreemap;
use uuid::Uuid;

fn scope() -> Scope {
    btreemap! {
        "name".to_string() => Val::from("world"),
        "count".to_string() => Val::Int(5),
        "ratio".to_string() => Val::Num(5.0),
        "enabled".to_string() => Val::Bool(true),
        "cfg".to_string() => Val::Map(btreemap! {
            "region".to_string() => Val::from("eu"),
        }),
    }
}

fn eval(expression: &str) -> BridgeResult<Val> {
    ElEvaluator::new().eval(expression, &scope())
}

#[test]
fn test_split_template() {
    let segments = split_template("Step ${ a } of ${b}").unwrap();
    assert_eq!(
        segments,
        vec![
            Segment::Text("Step ".to_string()),
            Segment::Expr("a".to_string()),
            Segment::Text(" of ".to_string()),
            Segment::Expr("b".to_string()),
        ]
    );
}

#[test]
fn test_split_template_quoted_brace() {
    let segments = split_template("${x == '}'}").unwrap();
    assert_eq!(segments, vec![Segment::Expr("x == '}'".to_string())]);
}

#[test]
fn test_unclosed_template() {
    let err = split_template("oops ${name").unwrap_err();
    assert_eq!(err.code(), "Expression");
}

#[test]
fn test_parse_precedence() {
    let expr = parse_expression("a == 1 || b && !c").unwrap();
    let Expr::Binary { op: BinaryOp::Or, right, .. } = expr else {
        panic!("expected || at the root");
    };
    assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
}

#[test]
fn test_parse_literals() {
    assert_eq!(parse_expression("42").unwrap(), Expr::Lit { v: Val::Int(42) });
    assert_eq!(
        parse_expression("6000000000").unwrap(),
        Expr::Lit { v: Val::Long(6_000_000_000) }
    );
    assert_eq!(parse_expression("1.5").unwrap(), Expr::Lit { v: Val::Num(1.5) });
    assert_eq!(parse_expression("\"hi\"").unwrap(), Expr::Lit { v: Val::from("hi") });
    assert_eq!(parse_expression("null").unwrap(), Expr::Lit { v: Val::Null });
    assert_eq!(
        parse_expression("trueValue").unwrap(),
        Expr::Ident { name: "trueValue".to_string() }
    );
}

#[test]
fn test_parse_error() {
    assert!(parse_expression("a ==").is_err());
    assert!(parse_expression("").is_err());
}

#[test]
fn test_plain_string_is_itself() {
    assert_eq!(eval("no templates here").unwrap(), Val::from("no templates here"));
    assert_eq!(eval("").unwrap(), Val::from(""));
}

#[test]
fn test_lone_expression_keeps_type() {
    assert_eq!(eval("${count}").unwrap(), Val::Int(5));
    assert_eq!(eval("${enabled}").unwrap(), Val::Bool(true));
    assert_eq!(eval("${cfg.region}").unwrap(), Val::from("eu"));
    assert_eq!(eval("${cfg.missing}").unwrap(), Val::Null);
}

#[test]
fn test_interpolation() {
    assert_eq!(
        eval("Hello ${name}, you have ${count} items").unwrap(),
        Val::from("Hello world, you have 5 items")
    );
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("${name == 'world'}").unwrap(), Val::Bool(true));
    assert_eq!(eval("${name != \"world\"}").unwrap(), Val::Bool(false));
    assert_eq!(eval("${count == ratio}").unwrap(), Val::Bool(true));
    assert_eq!(eval("${count >= 5 && count < 6}").unwrap(), Val::Bool(true));
    assert_eq!(eval("${'a' < 'b'}").unwrap(), Val::Bool(true));
    assert_eq!(eval("${!enabled || (count > 10)}").unwrap(), Val::Bool(false));
}

#[test]
fn test_wide_integers_compare_exactly() {
    // 2^53 + 1 and 2^53 collapse to the same f64
    let scope = btreemap! {
        "a".to_string() => Val::Long(9_007_199_254_740_993),
        "b".to_string() => Val::Long(9_007_199_254_740_992),
        "small".to_string() => Val::Int(7),
        "wide".to_string() => Val::Long(7),
    };
    let el = ElEvaluator::new();

    assert_eq!(el.eval("${a == b}", &scope).unwrap(), Val::Bool(false));
    assert_eq!(el.eval("${a != b}", &scope).unwrap(), Val::Bool(true));
    assert_eq!(el.eval("${a > b}", &scope).unwrap(), Val::Bool(true));
    assert_eq!(el.eval("${b < a}", &scope).unwrap(), Val::Bool(true));
    assert_eq!(el.eval("${small == wide}", &scope).unwrap(), Val::Bool(true));
    assert_eq!(el.eval("${small <= wide}", &scope).unwrap(), Val::Bool(true));
}

#[test]
fn test_uuid_equals_its_text() {
    let id = Uuid::new_v4();
    let scope = btreemap! { "id".to_string() => Val::Uuid(id) };
    let expr = format!("${{id == '{}'}}", id);

    assert_eq!(ElEvaluator::new().eval(&expr, &scope).unwrap(), Val::Bool(true));
}

#[test]
fn test_unknown_variable() {
    let err = eval("${missing == 'x'}").unwrap_err();
    assert!(err.to_string().contains("Unknown variable 'missing'"));
}

#[test]
fn test_incomparable_values() {
    assert!(eval("${cfg < 3}").is_err());
    assert!(eval("${count.field}").is_err());
}

#[test]
fn test_eval_value_recurses() {
    let value = Val::Map(btreemap! {
        "greeting".to_string() => Val::from("hi ${name}"),
        "items".to_string() => Val::List(vec![Val::from("${count}"), Val::Int(1)]),
    });

    let evaluated = ElEvaluator::new().eval_value(&value, &scope()).unwrap();
    assert_eq!(
        evaluated,
        Val::Map(btreemap! {
            "greeting".to_string() => Val::from("hi world"),
            "items".to_string() => Val::List(vec![Val::Int(5), Val::Int(1)]),
        })
    );
}
