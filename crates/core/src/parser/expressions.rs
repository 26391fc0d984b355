use super::{describe, is_keyword, ParseError, Parser};
use crate::ast::{ArithOp, Builtin, CmpOp, Expr, Literal};
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Boolean structure ---------------------------------------

    /// Entry point for every nested expression: parenthesized groups,
    /// list items and call arguments.
    pub(super) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_or_expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_and_expr()?;
        while self.is_word("or") {
            self.deepen()?;
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_not_expr()?;
        while self.is_word("and") {
            self.deepen()?;
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.is_word("not") {
            self.advance();
            let e = self.nested(Self::parse_not_expr)?;
            return Ok(Expr::Not(Box::new(e)));
        }
        self.parse_compare_expr()
    }

    // -- Comparisons ---------------------------------------------

    fn parse_compare_expr(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.parse_compare_op() {
            let right = self.parse_sum()?;
            rest.push((op, right));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        Ok(Expr::Compare {
            first: Box::new(first),
            rest,
        })
    }

    /// Consume a comparison operator if one is next.
    fn parse_compare_op(&mut self) -> Option<CmpOp> {
        let tok = self.peek().clone();
        let op = match tok {
            Token::Eq => CmpOp::Eq,
            Token::Neq => CmpOp::Neq,
            Token::Lt => CmpOp::Lt,
            Token::Lte => CmpOp::Lte,
            Token::Gt => CmpOp::Gt,
            Token::Gte => CmpOp::Gte,
            Token::Word(w) if w == "in" => CmpOp::In,
            Token::Word(w) if w == "not" && self.is_word_at(1, "in") => {
                self.advance();
                CmpOp::NotIn
            }
            Token::Word(w) if w == "is" => {
                if self.is_word_at(1, "not") {
                    self.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    // -- Arithmetic ----------------------------------------------

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Sub,
                _ => break,
            };
            self.deepen()?;
            self.advance();
            let right = self.parse_product()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => ArithOp::Mul,
                Token::Slash => ArithOp::Div,
                Token::Percent => ArithOp::Mod,
                _ => break,
            };
            self.deepen()?;
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                let e = self.nested(Self::parse_unary)?;
                Ok(Expr::Neg(Box::new(e)))
            }
            Token::Plus => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            _ => self.parse_primary(),
        }
    }

    // -- Atoms ---------------------------------------------------

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            Token::Int(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(n)))
            }
            Token::Float(f) => {
                let value: f64 = f
                    .parse()
                    .map_err(|_| self.err(format!("invalid float '{}'", f)))?;
                self.advance();
                Ok(Expr::Literal(Literal::Float(value)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Token::Word(w) if w == "true" || w == "True" => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Token::Word(w) if w == "false" || w == "False" => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Token::Word(w) if w == "null" || w == "None" => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Token::Word(w) if is_keyword(&w) => {
                Err(self.err(format!("unexpected keyword '{}'", w)))
            }
            Token::Word(name) => {
                if self.peek_at(1) == &Token::LParen {
                    return self.parse_call(name);
                }
                self.advance();
                Ok(Expr::Field(name))
            }
            Token::LParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(e)
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_items(Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            other => Err(self.err(format!("expected value, got {}", describe(&other)))),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        let offset = self.cur_offset();
        let func = Builtin::from_name(&name)
            .ok_or_else(|| ParseError::new(format!("unknown function '{}'", name), offset))?;
        self.advance(); // name
        self.advance(); // '('
        let args = self.parse_items(Token::RParen, "')'")?;

        let (min, max) = func.arity();
        let ok = args.len() >= min && max.map_or(true, |m| args.len() <= m);
        if !ok {
            let expected = match max {
                Some(m) if m == min => format!("{}", min),
                Some(m) => format!("{} to {}", min, m),
                None => format!("at least {}", min),
            };
            return Err(ParseError::new(
                format!(
                    "{}() takes {} argument(s), got {}",
                    func.name(),
                    expected,
                    args.len()
                ),
                offset,
            ));
        }
        Ok(Expr::Call { func, args })
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    /// A trailing comma is allowed.
    fn parse_items(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while self.peek() != &close {
            items.push(self.parse_expr()?);
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(close, what)?;
        Ok(items)
    }
}
