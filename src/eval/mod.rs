//! Expression evaluator for reasoning-step verification.
//!
//! Evaluates the symbolic arithmetic expressions the model attaches to each
//! reasoning step (`+ - * / ^`, grouping, a handful of common functions) to
//! a scalar result. The result is stringified with `f64`'s native `Display`
//! formatting; comparability against stated results is handled downstream
//! by the normalizer, not by rounding here.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, char, multispace0},
    combinator::{all_consuming, map, opt},
    multi::fold_many0,
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use crate::error::EvalError;

/// Intermediate AST produced by the parser.
#[derive(Debug, Clone)]
enum ExprNode {
    Number(f64),
    Neg(Box<ExprNode>),
    Add(Box<ExprNode>, Box<ExprNode>),
    Sub(Box<ExprNode>, Box<ExprNode>),
    Mul(Box<ExprNode>, Box<ExprNode>),
    Div(Box<ExprNode>, Box<ExprNode>),
    Pow(Box<ExprNode>, Box<ExprNode>),
    Func(String, Box<ExprNode>),
}

impl ExprNode {
    /// Reduce the node to a scalar. `expression` is threaded through for
    /// error reporting only.
    fn eval(&self, expression: &str) -> Result<f64, EvalError> {
        match self {
            ExprNode::Number(n) => Ok(*n),
            ExprNode::Neg(inner) => Ok(-inner.eval(expression)?),
            ExprNode::Add(a, b) => Ok(a.eval(expression)? + b.eval(expression)?),
            ExprNode::Sub(a, b) => Ok(a.eval(expression)? - b.eval(expression)?),
            ExprNode::Mul(a, b) => Ok(a.eval(expression)? * b.eval(expression)?),
            ExprNode::Div(a, b) => Ok(a.eval(expression)? / b.eval(expression)?),
            ExprNode::Pow(a, b) => Ok(a.eval(expression)?.powf(b.eval(expression)?)),
            ExprNode::Func(name, arg) => {
                let x = arg.eval(expression)?;
                match name.as_str() {
                    "sqrt" => Ok(x.sqrt()),
                    "cbrt" => Ok(x.cbrt()),
                    "abs" => Ok(x.abs()),
                    "round" => Ok(x.round()),
                    "floor" => Ok(x.floor()),
                    "ceil" => Ok(x.ceil()),
                    _ => Err(EvalError::UnknownFunction {
                        name: name.clone(),
                        expression: expression.to_string(),
                    }),
                }
            }
        }
    }
}

fn parse_number(input: &str) -> IResult<&str, ExprNode> {
    map(double, ExprNode::Number)(input)
}

fn parse_function(input: &str) -> IResult<&str, ExprNode> {
    map(
        pair(
            alpha1,
            delimited(
                preceded(multispace0, char('(')),
                parse_expr,
                preceded(multispace0, char(')')),
            ),
        ),
        |(name, arg): (&str, ExprNode)| ExprNode::Func(name.to_string(), Box::new(arg)),
    )(input)
}

fn parse_parens(input: &str) -> IResult<&str, ExprNode> {
    delimited(
        char('('),
        parse_expr,
        preceded(multispace0, char(')')),
    )(input)
}

fn parse_atom(input: &str) -> IResult<&str, ExprNode> {
    preceded(
        multispace0,
        alt((parse_function, parse_number, parse_parens)),
    )(input)
}

/// Power is right-associative; the exponent re-enters through `parse_unary`
/// so both `2^3^2` and `2^-3` parse as expected.
fn parse_power(input: &str) -> IResult<&str, ExprNode> {
    let (rest, base) = parse_atom(input)?;
    let (rest, exponent) = opt(preceded(
        preceded(multispace0, char('^')),
        parse_unary,
    ))(rest)?;
    Ok(match exponent {
        Some(exp) => (rest, ExprNode::Pow(Box::new(base), Box::new(exp))),
        None => (rest, base),
    })
}

fn parse_unary(input: &str) -> IResult<&str, ExprNode> {
    alt((
        map(
            preceded(preceded(multispace0, char('-')), parse_unary),
            |inner| ExprNode::Neg(Box::new(inner)),
        ),
        parse_power,
    ))(input)
}

fn parse_term(input: &str) -> IResult<&str, ExprNode> {
    let (rest, first) = parse_unary(input)?;
    fold_many0(
        pair(
            preceded(multispace0, alt((tag("*"), tag("/"), tag("×"), tag("÷")))),
            parse_unary,
        ),
        move || first.clone(),
        |acc, (op, rhs)| match op {
            "*" | "×" => ExprNode::Mul(Box::new(acc), Box::new(rhs)),
            _ => ExprNode::Div(Box::new(acc), Box::new(rhs)),
        },
    )(rest)
}

fn parse_expr(input: &str) -> IResult<&str, ExprNode> {
    let (rest, first) = parse_term(input)?;
    fold_many0(
        pair(
            preceded(multispace0, alt((char('+'), char('-')))),
            parse_term,
        ),
        move || first.clone(),
        |acc, (op, rhs)| match op {
            '+' => ExprNode::Add(Box::new(acc), Box::new(rhs)),
            _ => ExprNode::Sub(Box::new(acc), Box::new(rhs)),
        },
    )(rest)
}

/// Evaluate an arithmetic expression to its decimal string form.
///
/// Returns an [`EvalError`] for malformed input, unknown functions, and
/// results that are not finite (division by zero, square roots of negative
/// numbers). The caller is expected to recover by treating the result as a
/// guaranteed mismatch rather than propagating the failure.
pub fn evaluate(expression: &str) -> Result<String, EvalError> {
    let (_, node) = all_consuming(terminated(parse_expr, multispace0))(expression)
        .map_err(|_| EvalError::Malformed {
            expression: expression.to_string(),
        })?;

    let value = node.eval(expression)?;
    if !value.is_finite() {
        return Err(EvalError::NonFinite {
            expression: expression.to_string(),
        });
    }
    Ok(value.to_string())
}
