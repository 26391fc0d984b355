/// Condition expression parser.
/// Produces an [`Expr`] tree; field references are resolved per row at
/// evaluation time, not here.
use crate::ast::Expr;
use crate::lexer::{self, Spanned, Token};

mod expressions;

/// A condition that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    /// Character offset into the condition text.
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ParseError {
            message: message.into(),
            offset,
        }
    }
}

/// Parse a condition string into an expression tree.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let tokens = lexer::lex(src)?;
    let mut p = Parser::new(&tokens);
    if p.peek() == &Token::Eof {
        return Err(p.err("empty expression"));
    }
    let expr = p.parse_expr()?;
    if p.peek() != &Token::Eof {
        return Err(p.err(format!("unexpected trailing {}", describe(p.peek()))));
    }
    Ok(expr)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

/// Deepest expression tree the parser builds. Evaluation walks the tree
/// recursively, so this also bounds evaluator stack use.
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    /// Upper bound on the depth of the tree built so far.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Account for one more tree level, failing past [`MAX_DEPTH`].
    fn deepen(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.err("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let depth = self.depth;
        self.deepen()?;
        let result = f(self)?;
        self.depth = depth;
        Ok(result)
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let i = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    fn cur_offset(&self) -> usize {
        self.cur().offset
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ParseError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {}", what, describe(self.peek()))))
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.cur_offset())
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn is_word_at(&self, ahead: usize, w: &str) -> bool {
        matches!(self.peek_at(ahead), Token::Word(x) if x == w)
    }
}

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "true", "false", "null", "True", "False", "None",
];

fn is_keyword(w: &str) -> bool {
    KEYWORDS.contains(&w)
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("'{}'", w),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(n) => format!("number {}", n),
        Token::Float(f) => format!("number {}", f),
        Token::LParen => "'('".to_owned(),
        Token::RParen => "')'".to_owned(),
        Token::LBracket => "'['".to_owned(),
        Token::RBracket => "']'".to_owned(),
        Token::Comma => "','".to_owned(),
        Token::Eq => "'=='".to_owned(),
        Token::Neq => "'!='".to_owned(),
        Token::Lt => "'<'".to_owned(),
        Token::Lte => "'<='".to_owned(),
        Token::Gt => "'>'".to_owned(),
        Token::Gte => "'>='".to_owned(),
        Token::Plus => "'+'".to_owned(),
        Token::Minus => "'-'".to_owned(),
        Token::Star => "'*'".to_owned(),
        Token::Slash => "'/'".to_owned(),
        Token::Percent => "'%'".to_owned(),
        Token::Eof => "end of expression".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithOp, Builtin, CmpOp, Literal};

    fn field(name: &str) -> Box<Expr> {
        Box::new(Expr::Field(name.to_owned()))
    }

    #[test]
    fn parses_simple_comparison() {
        assert_eq!(
            parse("amount > 0").unwrap(),
            Expr::Compare {
                first: field("amount"),
                rest: vec![(CmpOp::Gt, Expr::Literal(Literal::Int(0)))],
            }
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a or b and c").unwrap();
        match expr {
            Expr::Or(l, r) => {
                assert_eq!(*l, Expr::Field("a".into()));
                assert!(matches!(*r, Expr::And(_, _)));
            }
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        let expr = parse("a + b * 2 == 7").unwrap();
        let Expr::Compare { first, .. } = expr else {
            panic!("expected comparison");
        };
        match *first {
            Expr::Arith {
                op: ArithOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Arith {
                    op: ArithOp::Mul,
                    ..
                }
            )),
            other => panic!("expected Add, got {:?}", other),
        }
    }

    #[test]
    fn chained_and_membership_comparisons() {
        let expr = parse("0 <= rate < 1").unwrap();
        assert!(matches!(expr, Expr::Compare { ref rest, .. } if rest.len() == 2));

        let expr = parse("status not in ['a', 'b']").unwrap();
        assert!(
            matches!(expr, Expr::Compare { ref rest, .. } if rest[0].0 == CmpOp::NotIn)
        );

        let expr = parse("closed_at is not None").unwrap();
        assert!(
            matches!(expr, Expr::Compare { ref rest, .. } if rest[0].0 == CmpOp::IsNot)
        );
    }

    #[test]
    fn builtin_calls_check_arity() {
        assert_eq!(
            parse("len(name) > 0").unwrap().fields(),
            vec!["name"]
        );
        assert!(matches!(
            parse("coalesce(a, b, 0)").unwrap(),
            Expr::Call {
                func: Builtin::Coalesce,
                ..
            }
        ));
        let err = parse("lower(a, b)").unwrap_err();
        assert!(err.message.contains("lower"));
        let err = parse("frobnicate(a)").unwrap_err();
        assert!(err.message.contains("unknown function"));
    }

    #[test]
    fn triple_equals_fails() {
        let err = parse("x ===").unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn dangling_operator_fails_at_end() {
        let err = parse("amount >").unwrap_err();
        assert_eq!(err.offset, 8);
        assert!(err.message.contains("end of expression"));
    }

    #[test]
    fn trailing_tokens_fail() {
        let err = parse("a == 1 2").unwrap_err();
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn empty_fails() {
        assert!(parse("   ").is_err());
    }

    #[test]
    fn keywords_are_not_fields() {
        assert!(parse("in == 1").is_err());
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let src = format!("{}a{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = parse(&src).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
        assert_eq!(err.offset, MAX_DEPTH);
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let src = vec!["a"; 5_000].join(" and ");
        assert_eq!(parse(&src).unwrap_err().message, "expression nested too deeply");
        let src = format!("{}1", "-".repeat(5_000));
        assert_eq!(parse(&src).unwrap_err().message, "expression nested too deeply");
        let src = vec!["x"; 5_000].join(" + ");
        assert!(parse(&src).is_err());
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let src = format!("{}a{} > 0", "(".repeat(20), ")".repeat(20));
        assert!(parse(&src).is_ok());
        let src = vec!["a > 0"; 40].join(" and ");
        assert!(parse(&src).is_ok());
    }
}
