//! Template expressions
//!
//! Grammar:
//!
//! ```text
//! expr    := term ('+' term)*
//! term    := '(' expr ')' | $F{name} | $P{name} | $V{name}
//!          | "string" | number | true | false | null
//! ```
//!
//! `+` adds when both operands are numbers and concatenates otherwise.

use crate::value::{Parameters, Record, Value};
use crate::{Result, TemplateError};
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while1},
    character::complete::{char, digit1, multispace0, none_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    error::ParseError,
    multi::fold_many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// Built-in report variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// Current page number (1-based)
    PageNumber,
    /// Number of pages
    PageCount,
    /// Number of records processed so far
    ReportCount,
}

impl Variable {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PAGE_NUMBER" => Some(Variable::PageNumber),
            "PAGE_COUNT" => Some(Variable::PageCount),
            "REPORT_COUNT" => Some(Variable::ReportCount),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Variable::PageNumber => "PAGE_NUMBER",
            Variable::PageCount => "PAGE_COUNT",
            Variable::ReportCount => "REPORT_COUNT",
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Field(String),
    Parameter(String),
    Variable(Variable),
    Literal(Value),
    Add(Box<Expression>, Box<Expression>),
}

/// Values visible to an expression during evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Current record, `None` outside the detail section of an empty report
    pub record: Option<&'a Record>,
    pub parameters: &'a Parameters,
    pub page_number: i32,
    pub page_count: i32,
    pub report_count: i32,
}

impl Expression {
    /// Parse an expression
    ///
    /// Blank input parses to a `null` literal.
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Ok(Expression::Literal(Value::Null));
        }

        all_consuming(expression)(trimmed)
            .map(|(_, expr)| expr)
            .map_err(|e| TemplateError::ExpressionError {
                expression: trimmed.to_string(),
                message: match e {
                    nom::Err::Error(err) | nom::Err::Failure(err) => {
                        format!("unexpected input at `{}`", err.input)
                    }
                    nom::Err::Incomplete(_) => "incomplete input".to_string(),
                },
            })
    }

    /// Evaluate against the current record, parameters and variables
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Value {
        match self {
            Expression::Field(name) => ctx
                .record
                .and_then(|record| record.get(name))
                .cloned()
                .unwrap_or(Value::Null),
            Expression::Parameter(name) => {
                ctx.parameters.get(name).cloned().unwrap_or(Value::Null)
            }
            Expression::Variable(var) => Value::Int(match var {
                Variable::PageNumber => ctx.page_number,
                Variable::PageCount => ctx.page_count,
                Variable::ReportCount => ctx.report_count,
            }),
            Expression::Literal(value) => value.clone(),
            Expression::Add(lhs, rhs) => add(lhs.evaluate(ctx), rhs.evaluate(ctx)),
        }
    }

    /// Names of the fields referenced by this expression
    pub fn field_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.visit(&mut |expr| {
            if let Expression::Field(name) = expr {
                refs.push(name.as_str());
            }
        });
        refs
    }

    /// Names of the parameters referenced by this expression
    pub fn parameter_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.visit(&mut |expr| {
            if let Expression::Parameter(name) = expr {
                refs.push(name.as_str());
            }
        });
        refs
    }

    /// Whether the expression reads a variable
    pub fn uses_variable(&self, variable: Variable) -> bool {
        let mut found = false;
        self.visit(&mut |expr| {
            if *expr == Expression::Variable(variable) {
                found = true;
            }
        });
        found
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expression)) {
        f(self);
        if let Expression::Add(lhs, rhs) = self {
            lhs.visit(f);
            rhs.visit(f);
        }
    }
}

fn add(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => Value::Null,
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .unwrap_or(Value::Long(a as i64 + b as i64)),
        (a @ (Value::Int(_) | Value::Long(_)), b @ (Value::Int(_) | Value::Long(_))) => {
            let as_long = |v: &Value| match v {
                Value::Int(i) => *i as i64,
                Value::Long(l) => *l,
                _ => 0,
            };
            Value::Long(as_long(&a).saturating_add(as_long(&b)))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            Value::Float(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0))
        }
        (a, b) => Value::Text(format!("{a}{b}")),
    }
}

fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

fn expression(input: &str) -> IResult<&str, Expression> {
    let (input, first) = term(input)?;
    fold_many0(
        preceded(char('+'), term),
        move || first.clone(),
        |lhs, rhs| Expression::Add(Box::new(lhs), Box::new(rhs)),
    )(input)
}

fn term(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        delimited(char('('), expression, char(')')),
        map(|i| reference("$F{", i), |name| Expression::Field(name.to_string())),
        map(|i| reference("$P{", i), |name| Expression::Parameter(name.to_string())),
        map_res(|i| reference("$V{", i), |name| {
            Variable::from_name(name)
                .map(Expression::Variable)
                .ok_or("unknown variable")
        }),
        map(string_literal, |s| Expression::Literal(Value::Text(s))),
        map(number_literal, Expression::Literal),
        value(Expression::Literal(Value::Bool(true)), tag("true")),
        value(Expression::Literal(Value::Bool(false)), tag("false")),
        value(Expression::Literal(Value::Null), tag("null")),
    )))(input)
}

/// `$X{name}` with the name trimmed
fn reference<'a>(prefix: &'static str, input: &'a str) -> IResult<&'a str, &'a str> {
    map(
        delimited(tag(prefix), take_while1(|c: char| c != '}'), char('}')),
        str::trim,
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        value(String::new(), tag("\"\"")),
        delimited(
            char('"'),
            escaped_transform(
                none_of("\"\\"),
                '\\',
                alt((
                    value('\n', char('n')),
                    value('\t', char('t')),
                    value('\\', char('\\')),
                    value('"', char('"')),
                )),
            ),
            char('"'),
        ),
    ))(input)
}

fn number_literal(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        |digits: &str| -> std::result::Result<Value, std::num::ParseFloatError> {
            if digits.contains('.') {
                return digits.parse::<f64>().map(Value::Float);
            }
            match digits.parse::<i64>() {
                Ok(v) => Ok(i32::try_from(v).map(Value::Int).unwrap_or(Value::Long(v))),
                Err(_) => digits.parse::<f64>().map(Value::Float),
            }
        },
    )(input)
}
