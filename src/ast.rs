//! Formula AST produced by the recursive-descent parser (spec §4.4).

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ref(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Call(String, Vec<Arg>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Expr),
    /// `A1:B3`, recognized only as a function argument; expands row-major
    /// to individual cell references regardless of directionality.
    Range(String, String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ref(id) => write!(f, "{}", id),
            Expr::Neg(e) => write!(f, "-{}", e),
            Expr::Add(a, b) => write!(f, "({}+{})", a, b),
            Expr::Sub(a, b) => write!(f, "({}-{})", a, b),
            Expr::Mul(a, b) => write!(f, "({}*{})", a, b),
            Expr::Div(a, b) => write!(f, "({}/{})", a, b),
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match arg {
                        Arg::Value(e) => write!(f, "{}", e)?,
                        Arg::Range(a, b) => write!(f, "{}:{}", a, b)?,
                    }
                }
                write!(f, ")")
            }
        }
    }
}
