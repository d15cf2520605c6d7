//! Tokenizer for annotation strings.

use logos::Logos;

use crate::errors::UnsupportedAnnotationError;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum Token {
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("|")]
    Pipe,
    #[token("-")]
    Minus,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#"'([^'\\\n]|\\.)*'|"([^"\\\n]|\\.)*""#, |lex| unquote(lex.slice()))]
    Str(String),

    #[regex(r#"b'([^'\\\n]|\\.)*'|b"([^"\\\n]|\\.)*""#, |lex| unquote(&lex.slice()[1..]).into_bytes())]
    Bytes(Vec<u8>),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Strip the quotes and resolve backslash escapes.
fn unquote(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Tokenize an annotation string.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, UnsupportedAnnotationError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(UnsupportedAnnotationError::new(
                    source,
                    format!("unexpected character(s) {:?}", lexer.slice()),
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_subscripted_union() {
        let tokens = tokenize("Dict[str, 'Node'] | None").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Dict".into()),
                Token::LBracket,
                Token::Ident("str".into()),
                Token::Comma,
                Token::Str("Node".into()),
                Token::RBracket,
                Token::Pipe,
                Token::Ident("None".into()),
            ]
        );
    }

    #[test]
    fn test_ellipsis_is_one_token() {
        let tokens = tokenize("Tuple[int, ...]").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Tuple".into()),
                Token::LBracket,
                Token::Ident("int".into()),
                Token::Comma,
                Token::Ellipsis,
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_bytes_and_escapes() {
        let tokens = tokenize(r#"b'ab' "x\"y""#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Bytes(b"ab".to_vec()), Token::Str("x\"y".into())]
        );
    }

    #[test]
    fn test_bad_character_is_reported() {
        let err = tokenize("List[int] @ x").unwrap_err();
        assert!(err.to_string().contains("unexpected character"));
    }
}
