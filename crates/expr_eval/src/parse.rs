use crate::{Evaluated, ExprError};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Ident(String),
    And,
    Or,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    Literal(Evaluated),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

pub(crate) fn parse(text: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExprError::Syntax(format!(
            "unexpected token after expression: {token:?}"
        ))),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '0'..='9' => tokens.push(number(&mut chars)?),
            '.' => {
                chars.next();
                if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                    let mut text = String::from("0.");
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() {
                            text.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| ExprError::Syntax(format!("invalid number: {text}")))?;
                    tokens.push(Token::Float(value));
                } else {
                    tokens.push(Token::Dot);
                }
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match name.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Ident(name),
                });
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Eq);
                } else {
                    return Err(ExprError::Syntax(
                        "assignment is not an expression".to_string(),
                    ));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    return Err(ExprError::Syntax("unexpected character '!'".to_string()));
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' | '\'' => return Err(ExprError::Unsupported("string literal")),
            other => {
                return Err(ExprError::Syntax(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }

    Ok(tokens)
}

fn number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<Token, ExprError> {
    let mut text = String::new();
    let mut is_float = false;

    while let Some(&d) = chars.peek() {
        if d.is_ascii_digit() {
            text.push(d);
            chars.next();
        } else if d == '.' && !is_float {
            is_float = true;
            text.push(d);
            chars.next();
        } else {
            break;
        }
    }

    if is_float {
        let value = text
            .parse::<f64>()
            .map_err(|_| ExprError::Syntax(format!("invalid number: {text}")))?;
        Ok(Token::Float(value))
    } else {
        match text.parse::<i64>() {
            Ok(value) => Ok(Token::Int(value)),
            // Too large for a machine integer; carry it as a float.
            Err(_) => text
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExprError::Syntax(format!("invalid number: {text}"))),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let first = self.and_expr()?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&Token::Or) {
            operands.push(self.and_expr()?);
        }
        Ok(Expr::Or(operands))
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let first = self.comparison()?;
        if self.peek() != Some(&Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&Token::And) {
            operands.push(self.comparison()?);
        }
        Ok(Expr::And(operands))
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::Ne) => CompareOp::Ne,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn sum(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Pos, Box::new(self.unary()?)))
            }
            _ => self.power(),
        }
    }

    // Exponentiation binds tighter than unary minus on its left and is
    // right-associative, so the exponent re-enters through unary().
    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if self.eat(&Token::DoubleStar) {
            let exponent = self.unary()?;
            Ok(Expr::Binary(
                BinaryOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ))
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        let expr = match self.next() {
            Some(Token::Int(value)) => Expr::Literal(Evaluated::Int(value)),
            Some(Token::Float(value)) => Expr::Literal(Evaluated::Float(value)),
            Some(Token::Ident(name)) => Expr::Var(name),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                if self.peek() == Some(&Token::Comma) {
                    return Err(ExprError::Unsupported("tuple literal"));
                }
                if !self.eat(&Token::RParen) {
                    return Err(ExprError::Syntax("missing closing parenthesis".to_string()));
                }
                inner
            }
            Some(Token::LBracket) => return Err(ExprError::Unsupported("collection literal")),
            Some(token) => {
                return Err(ExprError::Syntax(format!("unexpected token: {token:?}")));
            }
            None => {
                return Err(ExprError::Syntax("empty expression".to_string()));
            }
        };

        // Postfix constructs are outside the grammar; name the construct kind.
        match self.peek() {
            Some(Token::LParen) if matches!(expr, Expr::Var(_)) => {
                Err(ExprError::Unsupported("function call"))
            }
            Some(Token::LBracket) => Err(ExprError::Unsupported("indexing")),
            Some(Token::Dot) => Err(ExprError::Unsupported("attribute access")),
            _ => Ok(expr),
        }
    }
}

pub(crate) fn free_variables(expr: &Expr, out: &mut std::collections::BTreeSet<String>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Var(name) => {
            out.insert(name.clone());
        }
        Expr::Unary(_, inner) => free_variables(inner, out),
        Expr::Binary(_, left, right) => {
            free_variables(left, out);
            free_variables(right, out);
        }
        Expr::Compare(first, rest) => {
            free_variables(first, out);
            for (_, operand) in rest {
                free_variables(operand, out);
            }
        }
        Expr::And(operands) | Expr::Or(operands) => {
            for operand in operands {
                free_variables(operand, out);
            }
        }
    }
}
