//! Recursive-descent parser for annotation strings.
//!
//! ```text
//! union     := postfix ('|' postfix)*
//! postfix   := atom ('.' IDENT | '[' items ']')*
//! items     := union (',' union)* ','?
//! atom      := IDENT | STR | BYTES | '-'? INT | '...'
//!            | '[' items? ']' | '(' items? ')'
//! ```

use super::lexer::{tokenize, Token};
use crate::errors::UnsupportedAnnotationError;

/// Parsed annotation expression.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnExpr {
    Name(String),
    Attr(Box<AnnExpr>, String),
    /// `base[a, b]`; a single index is not wrapped in a tuple.
    Subscript(Box<AnnExpr>, Vec<AnnExpr>),
    /// `a | b | c`
    Union(Vec<AnnExpr>),
    /// `[a, b]`, as in the argument list of `Callable`.
    List(Vec<AnnExpr>),
    /// `()` or `(a, b)`.
    Tuple(Vec<AnnExpr>),
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Ellipsis,
}

/// Parse an annotation string.
pub fn parse_annotation(source: &str) -> Result<AnnExpr, UnsupportedAnnotationError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.union()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error(&format!("unexpected trailing {extra:?}")));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), UnsupportedAnnotationError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}")))
        }
    }

    #[cold]
    fn error(&self, reason: &str) -> UnsupportedAnnotationError {
        UnsupportedAnnotationError::new(self.source, reason)
    }

    fn union(&mut self) -> Result<AnnExpr, UnsupportedAnnotationError> {
        let first = self.postfix()?;
        if self.peek() != Some(&Token::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat(&Token::Pipe) {
            members.push(self.postfix()?);
        }
        Ok(AnnExpr::Union(members))
    }

    fn postfix(&mut self) -> Result<AnnExpr, UnsupportedAnnotationError> {
        let mut expr = self.atom()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(attr)) => expr = AnnExpr::Attr(Box::new(expr), attr),
                    _ => return Err(self.error("expected a name after '.'")),
                }
            } else if self.eat(&Token::LBracket) {
                let items = self.items(&Token::RBracket)?;
                if items.is_empty() {
                    return Err(self.error("empty subscript"));
                }
                expr = AnnExpr::Subscript(Box::new(expr), items);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated items up to and including `close`.
    fn items(&mut self, close: &Token) -> Result<Vec<AnnExpr>, UnsupportedAnnotationError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            if !items.is_empty() {
                self.expect(&Token::Comma)?;
                if self.eat(close) {
                    break;
                }
            }
            items.push(rtg_ir::ensure_sufficient_stack(|| self.union())?);
        }
        Ok(items)
    }

    fn atom(&mut self) -> Result<AnnExpr, UnsupportedAnnotationError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(AnnExpr::Name(name)),
            Some(Token::Str(s)) => Ok(AnnExpr::Str(s)),
            Some(Token::Bytes(b)) => Ok(AnnExpr::Bytes(b)),
            Some(Token::Int(n)) => Ok(AnnExpr::Int(n)),
            Some(Token::Minus) => match self.advance() {
                Some(Token::Int(n)) => Ok(AnnExpr::Int(-n)),
                _ => Err(self.error("expected an integer after '-'")),
            },
            Some(Token::Ellipsis) => Ok(AnnExpr::Ellipsis),
            Some(Token::LBracket) => Ok(AnnExpr::List(self.items(&Token::RBracket)?)),
            Some(Token::LParen) => {
                let trailing_comma_or_empty = |p: &Self, start: usize| {
                    p.pos == start + 1 || p.tokens.get(p.pos - 2) == Some(&Token::Comma)
                };
                let start = self.pos;
                let mut items = self.items(&Token::RParen)?;
                if items.len() == 1 && !trailing_comma_or_empty(self, start) {
                    return Ok(items.swap_remove(0));
                }
                Ok(AnnExpr::Tuple(items))
            }
            Some(other) => Err(self.error(&format!("unexpected {other:?}"))),
            None => Err(self.error("unexpected end of annotation")),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(n: &str) -> AnnExpr {
        AnnExpr::Name(n.to_string())
    }

    #[test]
    fn test_parse_nested_subscripts() {
        let expr = parse_annotation("Dict[str, List[int]]").unwrap();
        assert_eq!(
            expr,
            AnnExpr::Subscript(
                Box::new(name("Dict")),
                vec![
                    name("str"),
                    AnnExpr::Subscript(Box::new(name("List")), vec![name("int")]),
                ],
            )
        );
    }

    #[test]
    fn test_parse_dotted_union() {
        let expr = parse_annotation("typing.Any | None").unwrap();
        assert_eq!(
            expr,
            AnnExpr::Union(vec![
                AnnExpr::Attr(Box::new(name("typing")), "Any".into()),
                name("None"),
            ])
        );
    }

    #[test]
    fn test_parse_callable_and_literals() {
        let expr = parse_annotation("Callable[[int, 'x'], Literal[-1, b'z']]").unwrap();
        let AnnExpr::Subscript(_, items) = expr else {
            panic!("expected subscript");
        };
        assert_eq!(
            items[0],
            AnnExpr::List(vec![name("int"), AnnExpr::Str("x".into())])
        );
        assert_eq!(
            items[1],
            AnnExpr::Subscript(
                Box::new(name("Literal")),
                vec![AnnExpr::Int(-1), AnnExpr::Bytes(b"z".to_vec())],
            )
        );
    }

    #[test]
    fn test_parens() {
        assert_eq!(parse_annotation("()").unwrap(), AnnExpr::Tuple(vec![]));
        assert_eq!(parse_annotation("(int)").unwrap(), name("int"));
        assert_eq!(
            parse_annotation("(int,)").unwrap(),
            AnnExpr::Tuple(vec![name("int")])
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_annotation("List[").is_err());
        assert!(parse_annotation("List[]").is_err());
        assert!(parse_annotation("int int").is_err());
        assert!(parse_annotation("").is_err());
    }
}
