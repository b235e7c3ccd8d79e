//! Tokenizer, recursive-descent parser and tree evaluator for arithmetic
//! expressions.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/" | "%") unary)*
//! unary   := ("+" | "-") unary | power
//! power   := primary ("**" unary)?
//! primary := NUMBER | NAME | NAME "(" args ")" | "(" expr ")"
//! ```
//!
//! `**` is right-associative and binds tighter than a unary sign on its left,
//! so `-2 ** 2` is `-4`. Names resolve only against the whitelisted math
//! namespace below; `math.` qualified names are accepted as aliases.

use super::EvaluationError;

// ---------------------------------------------------------------------------
// Whitelisted namespace
// ---------------------------------------------------------------------------

/// Named constants resolvable inside an expression.
const CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
];

/// Functions resolvable inside an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Abs,
    Exp,
    Log,
    Log10,
    Log2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Floor,
    Ceil,
    Pow,
    Degrees,
    Radians,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "sqrt" => Self::Sqrt,
            "abs" | "fabs" => Self::Abs,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "log10" => Self::Log10,
            "log2" => Self::Log2,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "pow" => Self::Pow,
            "degrees" => Self::Degrees,
            "radians" => Self::Radians,
            _ => return None,
        };
        Some(f)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Log2 => "log2",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Pow => "pow",
            Self::Degrees => "degrees",
            Self::Radians => "radians",
        }
    }

    /// Accepted argument counts (inclusive range).
    fn arity(self) -> (usize, usize) {
        match self {
            Self::Log => (1, 2),
            Self::Pow => (2, 2),
            _ => (1, 1),
        }
    }

    fn apply(self, args: &[f64]) -> Result<f64, EvaluationError> {
        let x = args[0];
        let domain = || EvaluationError::Domain(self.name().to_string());
        let value = match self {
            Self::Sqrt => {
                if x < 0.0 {
                    return Err(domain());
                }
                x.sqrt()
            }
            Self::Abs => x.abs(),
            Self::Exp => x.exp(),
            Self::Log => {
                if x <= 0.0 {
                    return Err(domain());
                }
                match args.get(1) {
                    Some(&base) if base <= 0.0 || base == 1.0 => return Err(domain()),
                    Some(&base) => x.ln() / base.ln(),
                    None => x.ln(),
                }
            }
            Self::Log10 | Self::Log2 => {
                if x <= 0.0 {
                    return Err(domain());
                }
                if self == Self::Log10 {
                    x.log10()
                } else {
                    x.log2()
                }
            }
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin | Self::Acos => {
                if !(-1.0..=1.0).contains(&x) {
                    return Err(domain());
                }
                if self == Self::Asin {
                    x.asin()
                } else {
                    x.acos()
                }
            }
            Self::Atan => x.atan(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Pow => power(x, args[1])?,
            Self::Degrees => x.to_degrees(),
            Self::Radians => x.to_radians(),
        };
        Ok(value)
    }
}

/// Resolve a (possibly `math.`-qualified) name to its bare form.
fn bare_name(name: &str) -> &str {
    name.strip_prefix("math.").unwrap_or(name)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    position: usize,
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, EvaluationError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Scientific notation only when an exponent digit follows.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal.parse::<f64>().map_err(|_| EvaluationError::Syntax {
                message: format!("invalid number literal '{}'", literal),
                position: start,
            })?;
            tokens.push(Spanned {
                token: Token::Number(value),
                position: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            tokens.push(Spanned {
                token: Token::Name(name),
                position: start,
            });
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Power
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => {
                return Err(EvaluationError::Syntax {
                    message: format!("unexpected character '{}'", other),
                    position: start,
                })
            }
        };
        i += 1;
        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Evaluate the tree.
    pub fn eval(&self) -> Result<f64, EvaluationError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Neg(inner) => Ok(-inner.eval()?),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval()?;
                let b = rhs.eval()?;
                match op {
                    BinaryOp::Add => Ok(a + b),
                    BinaryOp::Sub => Ok(a - b),
                    BinaryOp::Mul => Ok(a * b),
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return Err(EvaluationError::DivisionByZero);
                        }
                        Ok(a / b)
                    }
                    BinaryOp::Mod => {
                        if b == 0.0 {
                            return Err(EvaluationError::DivisionByZero);
                        }
                        // Result takes the sign of the divisor.
                        Ok(a - b * (a / b).floor())
                    }
                    BinaryOp::Pow => power(a, b),
                }
            }
            Expr::Call { function, args } => {
                let values = args.iter().map(Expr::eval).collect::<Result<Vec<_>, _>>()?;
                function.apply(&values)
            }
        }
    }
}

fn power(base: f64, exponent: f64) -> Result<f64, EvaluationError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvaluationError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvaluationError::Domain("pow".to_string()));
    }
    Ok(base.powf(exponent))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest nesting of signs, parentheses, exponents and calls accepted.
const MAX_DEPTH: usize = 256;

/// Longest token stream accepted; bounds the depth of flat operator chains.
const MAX_TOKENS: usize = 4096;

/// Parse an expression string into a tree without evaluating it.
pub fn parse(input: &str) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvaluationError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EvaluationError::Syntax {
            message: "expression too long".to_string(),
            position: 0,
        });
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.chars().count(),
        depth: 0,
    };
    let expr = parser.expr()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(EvaluationError::Syntax {
            message: format!("unexpected token {:?}", extra.token),
            position: extra.position,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvaluationError> {
        let position = self.position();
        match self.advance() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(EvaluationError::Syntax {
                message: format!("expected {:?}, found {:?}", expected, t),
                position,
            }),
            None => Err(EvaluationError::Syntax {
                message: format!("expected {:?}, found end of input", expected),
                position,
            }),
        }
    }

    fn expr(&mut self) -> Result<Expr, EvaluationError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, EvaluationError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    // Every recursive path (sign, `**`, parentheses, call arguments) passes
    // through here, so this is the one place depth is counted.
    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvaluationError::Syntax {
                message: "expression nested too deeply".to_string(),
                position: self.position(),
            });
        }
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<Expr, EvaluationError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, EvaluationError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Power) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => self.name(name),
            Some(t) => Err(EvaluationError::Syntax {
                message: format!("unexpected token {:?}", t),
                position,
            }),
            None => Err(EvaluationError::Syntax {
                message: "unexpected end of input".to_string(),
                position,
            }),
        }
    }

    fn name(&mut self, name: String) -> Result<Expr, EvaluationError> {
        let bare = bare_name(&name);

        if self.peek() == Some(&Token::LParen) {
            let function =
                Function::lookup(bare).ok_or_else(|| EvaluationError::UnknownName(name.clone()))?;
            self.advance();
            let mut args = Vec::new();
            if self.peek() != Some(&Token::RParen) {
                args.push(self.expr()?);
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    args.push(self.expr()?);
                }
            }
            self.expect(Token::RParen)?;

            let (min, max) = function.arity();
            if args.len() < min || args.len() > max {
                return Err(EvaluationError::Arity {
                    function: function.name().to_string(),
                    found: args.len(),
                });
            }
            return Ok(Expr::Call { function, args });
        }

        CONSTANTS
            .iter()
            .find(|(constant, _)| *constant == bare)
            .map(|(_, value)| Expr::Number(*value))
            .ok_or(EvaluationError::UnknownName(name))
    }
}
