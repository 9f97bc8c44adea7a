//! Chumsky grammars for the expressions embedded in directive lines

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::directive::ast::{ContextBinding, ForeachClause};
use crate::directive::lexer::{lex, lex_strict, Token};
use crate::error::{ExpressionError, Span};

fn variable<'a, I>() -> impl Parser<'a, I, String, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! { Token::Variable(name) => name }.labelled("variable")
}

fn quoted_key<'a, I>() -> impl Parser<'a, I, String, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! { Token::Str(s) => s }
        .labelled("quoted key")
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
}

fn foreach_parser<'a, I>() -> impl Parser<'a, I, ForeachClause, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let binding = variable()
        .then_ignore(just(Token::As))
        .then(variable().then_ignore(just(Token::FatArrow)).or_not())
        .then(variable())
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    just(Token::Foreach)
        .ignore_then(binding)
        .map(|((list, key), item)| ForeachClause { list, key, item })
        .then_ignore(any().repeated())
}

fn binding_parser<'a, I>() -> impl Parser<'a, I, ContextBinding, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let this = select! { Token::Variable(name) if name == "this" => () };
    let component = select! { Token::Ident(name) if name == "_component" => () };

    variable()
        .then_ignore(just(Token::Equals))
        .then_ignore(this)
        .then_ignore(just(Token::Arrow))
        .then_ignore(component)
        .then(quoted_key())
        .map(|(variable, component)| ContextBinding {
            variable,
            component,
        })
        .then_ignore(any().repeated())
}

fn index_parser<'a, I>() -> impl Parser<'a, I, (String, String), extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    variable().then(quoted_key()).then_ignore(end())
}

/// Parse the `foreach (...)` clause of a loop declaration line
///
/// Returns `Ok(None)` when the line has no `foreach` keyword token.
/// Error spans are relative to `line`.
pub fn parse_foreach(line: &str) -> Result<Option<ForeachClause>, Vec<ExpressionError>> {
    let tokens: Vec<(Token, Span)> = lex(line)
        .skip_while(|(tok, _)| *tok != Token::Foreach)
        .collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    let len = line.len();
    let token_stream = Stream::from_iter(
        tokens
            .into_iter()
            .map(|(tok, span)| (tok, SimpleSpan::from(span))),
    )
    .map((len..len).into(), |(t, s): (_, _)| (t, s));

    foreach_parser()
        .parse(token_stream)
        .into_result()
        .map(Some)
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Find a `$var = $this->_component['name']` binding anywhere in `line`
pub fn find_context_binding(line: &str) -> Option<ContextBinding> {
    let tokens: Vec<(Token, Span)> = lex(line).collect();
    let len = line.len();

    (0..tokens.len())
        .filter(|&start| matches!(tokens[start].0, Token::Variable(_)))
        .find_map(|start| {
            let token_stream = Stream::from_iter(
                tokens[start..]
                    .iter()
                    .cloned()
                    .map(|(tok, span)| (tok, SimpleSpan::from(span))),
            )
            .map((len..len).into(), |(t, s): (_, _)| (t, s));

            binding_parser().parse(token_stream).into_result().ok()
        })
}

/// Parse an item expression of the exact form `$var['field']`
///
/// Returns the variable name (without `$`) and the field.
pub fn parse_index(expr: &str) -> Option<(String, String)> {
    let tokens = lex_strict(expr)?;
    let len = expr.len();
    let token_stream = Stream::from_iter(
        tokens
            .into_iter()
            .map(|(tok, span)| (tok, SimpleSpan::from(span))),
    )
    .map((len..len).into(), |(t, s): (_, _)| (t, s));

    index_parser().parse(token_stream).into_result().ok()
}
