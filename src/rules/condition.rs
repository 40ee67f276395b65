//! Declarative comparison tree for decision rules
//!
//! Conditions are data, not code: they are either written as a tree in the
//! rules YAML or parsed once at load time from a small comparison language
//! (`score >= 80`, `60 <= score < 80`, `final_score in [7, 8]`, joined by
//! `and` / `or` with parentheses). Evaluation is a pure walk of the tree.

use crate::error::ConfigError;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{alpha1, alphanumeric1, char, multispace0, satisfy},
    combinator::{all_consuming, map, not, opt, recognize, value, verify},
    multi::{many0_count, separated_list0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// Comparison tree over named numeric fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Eq {
        field: String,
        value: f64,
    },
    In {
        field: String,
        values: Vec<f64>,
    },
    Range {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default = "default_true")]
        min_inclusive: bool,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default = "default_true")]
        max_inclusive: bool,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

/// Named values a condition is evaluated against.
/// A field that is absent or `None` fails every comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreContext {
    values: BTreeMap<String, Option<f64>>,
}

impl ScoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: Option<f64>) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    pub fn set(&mut self, field: &str, value: Option<f64>) {
        self.values.insert(field.to_string(), value);
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }
}

impl Condition {
    /// Evaluate against a context. `And([])` is true, `Or([])` is false.
    pub fn evaluate(&self, ctx: &ScoreContext) -> bool {
        match self {
            Condition::Eq { field, value } => ctx.get(field).map_or(false, |v| v == *value),
            Condition::In { field, values } => {
                ctx.get(field).map_or(false, |v| values.iter().any(|x| *x == v))
            }
            Condition::Range {
                field,
                min,
                min_inclusive,
                max,
                max_inclusive,
            } => match ctx.get(field) {
                None => false,
                Some(v) => {
                    let ok_min = match min {
                        None => true,
                        Some(m) if *min_inclusive => v >= *m,
                        Some(m) => v > *m,
                    };
                    let ok_max = match max {
                        None => true,
                        Some(m) if *max_inclusive => v <= *m,
                        Some(m) => v < *m,
                    };
                    ok_min && ok_max
                }
            },
            Condition::And(all) => all.iter().all(|c| c.evaluate(ctx)),
            Condition::Or(any) => any.iter().any(|c| c.evaluate(ctx)),
        }
    }

    /// Every field name the condition reads
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Eq { field, .. }
            | Condition::In { field, .. }
            | Condition::Range { field, .. } => out.push(field),
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }

    /// Reject any field not in `known`
    pub fn check_fields(&self, known: &[&str]) -> Result<(), ConfigError> {
        for field in self.fields() {
            if !known.contains(&field) {
                return Err(ConfigError::UnknownField(field.to_string()));
            }
        }
        Ok(())
    }

    /// Parse the textual comparison form
    pub fn parse(expr: &str) -> Result<Condition, ConfigError> {
        match all_consuming(or_expr)(expr) {
            Ok((_, condition)) => Ok(condition),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let rest = e.input.trim();
                let reason = if rest.is_empty() {
                    "unexpected end of expression".to_string()
                } else {
                    format!("cannot parse at '{rest}'")
                };
                Err(ConfigError::Condition {
                    expr: expr.to_string(),
                    reason,
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(ConfigError::Condition {
                expr: expr.to_string(),
                reason: "incomplete expression".to_string(),
            }),
        }
    }
}

/// A condition as written in YAML: either an expression string or a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Expr(String),
    Tree(Condition),
}

impl ConditionSpec {
    pub fn compile(&self) -> Result<Condition, ConfigError> {
        match self {
            ConditionSpec::Expr(expr) => Condition::parse(expr),
            ConditionSpec::Tree(tree) => Ok(tree.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Op {
    /// The same comparison with operands swapped (`5 < x` is `x > 5`)
    fn flipped(self) -> Op {
        match self {
            Op::Lt => Op::Gt,
            Op::Le => Op::Ge,
            Op::Gt => Op::Lt,
            Op::Ge => Op::Le,
            Op::Eq => Op::Eq,
        }
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Case-insensitive keyword not followed by more identifier characters
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(satisfy(is_ident_char)))
}

fn field_name(input: &str) -> IResult<&str, &str> {
    verify(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |word: &str| !matches!(word.to_ascii_lowercase().as_str(), "and" | "or" | "in"),
    )(input)
}

fn cmp_op(input: &str) -> IResult<&str, Op> {
    alt((
        value(Op::Le, tag("<=")),
        value(Op::Ge, tag(">=")),
        value(Op::Eq, tag("==")),
        value(Op::Lt, tag("<")),
        value(Op::Gt, tag(">")),
    ))(input)
}

/// `[1, 2, 3]` or `(1, 2, 3)`
fn value_list(input: &str) -> IResult<&str, Vec<f64>> {
    let items = || separated_list0(ws(char(',')), ws(double));
    alt((
        delimited(ws(char('[')), items(), ws(char(']'))),
        delimited(ws(char('(')), items(), ws(char(')'))),
    ))(input)
}

/// `field op number` or `field in [..]`
fn field_first(input: &str) -> IResult<&str, Condition> {
    let (input, field) = ws(field_name)(input)?;
    alt((
        map(preceded(ws(keyword("in")), value_list), move |values| Condition::In {
            field: field.to_string(),
            values,
        }),
        map(pair(ws(cmp_op), ws(double)), move |(op, rhs)| {
            comparison(field.to_string(), op, rhs)
        }),
    ))(input)
}

/// `number op field`, optionally closed as `number op field op number`
fn number_first(input: &str) -> IResult<&str, Condition> {
    let (input, (lhs, op1, field)) = tuple((ws(double), ws(cmp_op), ws(field_name)))(input)?;
    let (input, upper) = opt(pair(ws(cmp_op), ws(double)))(input)?;
    let field = field.to_string();
    let condition = match upper {
        None => comparison(field, op1.flipped(), lhs),
        Some((op2, rhs)) => match (op1, op2) {
            (Op::Lt | Op::Le, Op::Lt | Op::Le) => Condition::Range {
                field,
                min: Some(lhs),
                min_inclusive: op1 == Op::Le,
                max: Some(rhs),
                max_inclusive: op2 == Op::Le,
            },
            _ => Condition::And(vec![
                comparison(field.clone(), op1.flipped(), lhs),
                comparison(field, op2, rhs),
            ]),
        },
    };
    Ok((input, condition))
}

fn atom(input: &str) -> IResult<&str, Condition> {
    alt((
        delimited(ws(char('(')), or_expr, ws(char(')'))),
        field_first,
        number_first,
    ))(input)
}

fn joined(mut parts: Vec<Condition>, combine: fn(Vec<Condition>) -> Condition) -> Condition {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        combine(parts)
    }
}

fn and_expr(input: &str) -> IResult<&str, Condition> {
    map(
        separated_list1(ws(alt((keyword("and"), tag("&&")))), atom),
        |parts| joined(parts, Condition::And),
    )(input)
}

fn or_expr(input: &str) -> IResult<&str, Condition> {
    map(
        separated_list1(ws(alt((keyword("or"), tag("||")))), and_expr),
        |parts| joined(parts, Condition::Or),
    )(input)
}

fn comparison(field: String, op: Op, value: f64) -> Condition {
    let range = |min: Option<f64>, min_inclusive: bool, max: Option<f64>, max_inclusive: bool| {
        Condition::Range {
            field: field.clone(),
            min,
            min_inclusive,
            max,
            max_inclusive,
        }
    };
    match op {
        Op::Ge => range(Some(value), true, None, true),
        Op::Gt => range(Some(value), false, None, true),
        Op::Le => range(None, true, Some(value), true),
        Op::Lt => range(None, true, Some(value), false),
        Op::Eq => Condition::Eq {
            field: field.clone(),
            value,
        },
    }
}
