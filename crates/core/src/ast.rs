/// Condition expression tree produced by the parser.
/// No type checking is done here -- values are only known per row.

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

/// Functions callable from a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Abs,
    Lower,
    Upper,
    Coalesce,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "len" => Some(Builtin::Len),
            "abs" => Some(Builtin::Abs),
            "lower" => Some(Builtin::Lower),
            "upper" => Some(Builtin::Upper),
            "coalesce" => Some(Builtin::Coalesce),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Lower => "lower",
            Builtin::Upper => "upper",
            Builtin::Coalesce => "coalesce",
        }
    }

    /// `(min, max)` argument count; `None` max means variadic.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Builtin::Coalesce => (1, None),
            _ => (1, Some(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Reference to a result column by name.
    Field(String),
    List(Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `first op1 e1 op2 e2 ...`, true when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Call {
        func: Builtin,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Column names referenced anywhere in the expression, in first-use order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::List(items) | Expr::Call { args: items, .. } => {
                for item in items {
                    item.collect_fields(out);
                }
            }
            Expr::Neg(e) | Expr::Not(e) => e.collect_fields(out),
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
            Expr::Arith { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Expr::Compare { first, rest } => {
                first.collect_fields(out);
                for (_, e) in rest {
                    e.collect_fields(out);
                }
            }
        }
    }
}
