//! Lexer for the expressions embedded in directive lines using logos

use logos::Logos;

use crate::error::Span;

fn unquote(lex: &mut logos::Lexer<'_, Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("foreach")]
    Foreach,
    #[token("as")]
    As,

    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,
    #[token("=")]
    Equals,

    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,

    // `$name`, stored without the sigil
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Variable(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    #[regex(r"'([^'\\]|\\.)*'", unquote)]
    Str(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
}

/// Tokenize leniently, dropping anything the lexer does not recognise
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

/// Tokenize strictly; `None` if any character is not part of a token
pub fn lex_strict(input: &str) -> Option<Vec<(Token, Span)>> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| tok.ok().map(|t| (t, span)))
        .collect()
}
