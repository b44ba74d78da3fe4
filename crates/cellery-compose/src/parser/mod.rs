//! `.cell` file parser built on `nom`.
//!
//! Transforms raw `.cell` text into an AST through lexing and
//! recursive-descent parsing. Static analysis lives in [`validator`] and runs
//! when the AST is turned into a model.

pub mod ast;
pub mod lexer;
pub mod validator;

use std::collections::HashSet;

use cellery_common::error::{CelleryError, Result};

use self::ast::{
    CellFile, ComponentDecl, DependsDecl, EnvDecl, EnvValueDecl, IngressDecl, MetricDecl,
    MetricTargetDecl, ScalingDecl,
};
use self::lexer::Token;

/// Cursor into a token stream for recursive-descent parsing.
struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s.clone()),
            other => Err(parse_err(format!("expected identifier, got {other:?}"))),
        }
    }

    /// Identifier or string literal, as accepted for map keys and contexts.
    fn expect_name(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Identifier(s) | Token::StringLiteral(s)) => Ok(s.clone()),
            other => Err(parse_err(format!(
                "expected identifier or string literal, got {other:?}"
            ))),
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(parse_err(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::StringLiteral(s)) => Ok(s.clone()),
            other => Err(parse_err(format!("expected string literal, got {other:?}"))),
        }
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.advance() {
            Some(Token::Integer(n)) => Ok(*n),
            other => Err(parse_err(format!("expected integer, got {other:?}"))),
        }
    }

    fn expect_bool(&mut self) -> Result<bool> {
        match self.advance() {
            Some(Token::True) => Ok(true),
            Some(Token::False) => Ok(false),
            other => Err(parse_err(format!("expected true or false, got {other:?}"))),
        }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Fails with a block-specific message when the input ends before `}`.
    fn ensure_open(&self, block: &str) -> Result<()> {
        if self.at_end() {
            return Err(parse_err(format!("unexpected end of input inside {block}")));
        }
        Ok(())
    }
}

const fn parse_err(message: String) -> CelleryError {
    CelleryError::Syntax { message }
}

fn skip_optional_comma(cursor: &mut TokenCursor<'_>) {
    if cursor.peek() == Some(&Token::Comma) {
        let _ = cursor.advance();
    }
}

/// Parses a `.cell` file from its source text.
///
/// # Errors
///
/// Returns [`CelleryError::Syntax`] if the input cannot be tokenized or
/// does not follow the grammar.
pub fn parse_cell(input: &str) -> Result<CellFile> {
    tracing::info!("parsing .cell input");
    let tokens = lexer::tokenize(input)?;
    let mut cursor = TokenCursor::new(&tokens);
    parse_file(&mut cursor)
}

fn parse_file(cursor: &mut TokenCursor<'_>) -> Result<CellFile> {
    let mut file = CellFile::default();

    while let Some(tok) = cursor.peek() {
        match tok {
            Token::Component => file.components.push(parse_component(cursor)?),
            other => {
                return Err(parse_err(format!(
                    "expected COMPONENT at top level, got {other:?}"
                )));
            }
        }
    }

    Ok(file)
}

fn parse_component(cursor: &mut TokenCursor<'_>) -> Result<ComponentDecl> {
    cursor.expect_token(&Token::Component)?;
    let name = cursor.expect_name()?;
    cursor.expect_token(&Token::BraceOpen)?;

    let mut assigned = HashSet::new();
    let mut comp = ComponentDecl {
        name,
        ..ComponentDecl::default()
    };

    while cursor.peek() != Some(&Token::BraceClose) {
        cursor.ensure_open("COMPONENT block")?;
        match cursor.peek() {
            Some(Token::Depends) => comp.depends.push(parse_depends(cursor)?),
            Some(Token::Ingress) => comp.ingresses.push(parse_ingress(cursor)?),
            _ => parse_property(cursor, &mut comp, &mut assigned)?,
        }
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(comp)
}

/// Properties that may be assigned at most once per component.
const SINGLE_ASSIGNMENT: &[&str] = &["image", "source", "labels", "env"];

fn parse_property(
    cursor: &mut TokenCursor<'_>,
    comp: &mut ComponentDecl,
    assigned: &mut HashSet<String>,
) -> Result<()> {
    let key = cursor.expect_identifier()?;
    cursor.expect_token(&Token::Equals)?;

    if SINGLE_ASSIGNMENT.contains(&key.as_str()) && !assigned.insert(key.clone()) {
        return Err(CelleryError::validation(format!(
            "component \"{}\" assigns `{key}` more than once",
            comp.name
        )));
    }

    match key.as_str() {
        "image" => comp.image = Some(cursor.expect_string()?),
        "source" => comp.source = Some(cursor.expect_string()?),
        "port" => comp.ports.push(port_value(cursor.expect_integer()?)?),
        "ports" => comp.ports.extend(parse_port_list(cursor)?),
        "labels" => comp.labels = parse_string_map(cursor, "labels block")?,
        "env" => comp.env = parse_env_block(cursor)?,
        "autoscale" => comp.scaling.push(parse_autoscale(cursor)?),
        "scale_to_zero" => comp.scaling.push(parse_scale_to_zero(cursor)?),
        _ => {
            return Err(parse_err(format!("unknown component property: {key}")));
        }
    }

    Ok(())
}

fn port_value(val: i64) -> Result<u16> {
    u16::try_from(val).map_err(|_| parse_err(format!("port value out of range: {val}")))
}

fn parse_port_list(cursor: &mut TokenCursor<'_>) -> Result<Vec<u16>> {
    cursor.expect_token(&Token::BracketOpen)?;
    let mut items = Vec::new();

    while cursor.peek() != Some(&Token::BracketClose) {
        cursor.ensure_open("list")?;
        items.push(port_value(cursor.expect_integer()?)?);
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BracketClose)?;
    Ok(items)
}

fn parse_string_map(cursor: &mut TokenCursor<'_>, block: &str) -> Result<Vec<(String, String)>> {
    cursor.expect_token(&Token::BraceOpen)?;
    let mut entries = Vec::new();

    while cursor.peek() != Some(&Token::BraceClose) {
        cursor.ensure_open(block)?;
        let key = cursor.expect_name()?;
        cursor.expect_token(&Token::Equals)?;
        let value = cursor.expect_string()?;
        entries.push((key, value));
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(entries)
}

fn parse_env_block(cursor: &mut TokenCursor<'_>) -> Result<Vec<EnvDecl>> {
    cursor.expect_token(&Token::BraceOpen)?;
    let mut entries = Vec::new();

    while cursor.peek() != Some(&Token::BraceClose) {
        cursor.ensure_open("env block")?;
        let name = cursor.expect_name()?;
        cursor.expect_token(&Token::Equals)?;
        let value = parse_env_value(cursor)?;
        entries.push(EnvDecl { name, value });
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(entries)
}

fn parse_env_value(cursor: &mut TokenCursor<'_>) -> Result<EnvValueDecl> {
    match cursor.advance() {
        Some(Token::StringLiteral(s)) => Ok(EnvValueDecl::Literal(s.clone())),
        Some(Token::Identifier(func)) if func == "host" => {
            cursor.expect_token(&Token::ParenOpen)?;
            let target = cursor.expect_name()?;
            cursor.expect_token(&Token::ParenClose)?;
            Ok(EnvValueDecl::Host(target))
        }
        other => Err(parse_err(format!(
            "expected string literal or host(...) as env value, got {other:?}"
        ))),
    }
}

fn parse_autoscale(cursor: &mut TokenCursor<'_>) -> Result<ScalingDecl> {
    cursor.expect_token(&Token::BraceOpen)?;
    let (mut min, mut max, mut overridable) = (None, None, None);
    let mut metrics = Vec::new();

    while cursor.peek() != Some(&Token::BraceClose) {
        cursor.ensure_open("autoscale block")?;
        let key = cursor.expect_identifier()?;
        cursor.expect_token(&Token::Equals)?;
        match key.as_str() {
            "min" => min = Some(cursor.expect_integer()?),
            "max" => max = Some(cursor.expect_integer()?),
            "overridable" => overridable = Some(cursor.expect_bool()?),
            "cpu" | "memory" => metrics.push(MetricDecl {
                resource: key,
                target: parse_metric_target(cursor)?,
            }),
            _ => {
                return Err(parse_err(format!("unknown autoscale property: {key}")));
            }
        }
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(ScalingDecl::Autoscale {
        min,
        max,
        metrics,
        overridable,
    })
}

fn parse_metric_target(cursor: &mut TokenCursor<'_>) -> Result<MetricTargetDecl> {
    match cursor.advance() {
        Some(Token::StringLiteral(s)) => Ok(MetricTargetDecl::AverageValue(s.clone())),
        Some(Token::Integer(n)) => Ok(MetricTargetDecl::AverageUtilization(*n)),
        other => Err(parse_err(format!(
            "expected quantity string or utilization percentage, got {other:?}"
        ))),
    }
}

fn parse_scale_to_zero(cursor: &mut TokenCursor<'_>) -> Result<ScalingDecl> {
    cursor.expect_token(&Token::BraceOpen)?;
    let (mut min, mut max, mut concurrency, mut overridable) = (None, None, None, None);

    while cursor.peek() != Some(&Token::BraceClose) {
        cursor.ensure_open("scale_to_zero block")?;
        let key = cursor.expect_identifier()?;
        cursor.expect_token(&Token::Equals)?;
        match key.as_str() {
            "min" => min = Some(cursor.expect_integer()?),
            "max" => max = Some(cursor.expect_integer()?),
            "concurrency" => concurrency = Some(cursor.expect_integer()?),
            "overridable" => overridable = Some(cursor.expect_bool()?),
            _ => {
                return Err(parse_err(format!("unknown scale_to_zero property: {key}")));
            }
        }
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(ScalingDecl::ScaleToZero {
        min,
        max,
        concurrency,
        overridable,
    })
}

fn parse_depends(cursor: &mut TokenCursor<'_>) -> Result<DependsDecl> {
    cursor.expect_token(&Token::Depends)?;
    match cursor.advance() {
        Some(Token::Component) => Ok(DependsDecl::Component(cursor.expect_name()?)),
        Some(Token::Cell) => {
            let alias = cursor.expect_name()?;
            cursor.expect_token(&Token::Equals)?;
            let image = cursor.expect_string()?;
            Ok(DependsDecl::Cell { alias, image })
        }
        other => Err(parse_err(format!(
            "expected COMPONENT or CELL after DEPENDS, got {other:?}"
        ))),
    }
}

fn parse_ingress(cursor: &mut TokenCursor<'_>) -> Result<IngressDecl> {
    cursor.expect_token(&Token::Ingress)?;
    let context = cursor.expect_name()?;
    let global = if cursor.peek() == Some(&Token::Global) {
        let _ = cursor.advance();
        true
    } else {
        false
    };
    cursor.expect_token(&Token::BraceOpen)?;

    let mut ingress = IngressDecl {
        context,
        global,
        definitions: Vec::new(),
    };

    while cursor.peek() != Some(&Token::BraceClose) {
        cursor.ensure_open("INGRESS block")?;
        let method = cursor.expect_identifier()?;
        let path = cursor.expect_string()?;
        ingress.definitions.push((method, path));
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(ingress)
}
