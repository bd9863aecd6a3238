//! Integrands written as text, e.g. `a * exp(-x^2)`.
//!
//! Expressions are tokenised, parsed into an [`Expr`] tree, and compiled to
//! [`Bytecode`] for a small stack machine that runs over any [`Scalar`].

use crate::traits::{lit, Integrand, Scalar};
use anyhow::{anyhow, bail, Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;

/// OpCodes for the stack machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant.
    LoadConst(f64),
    /// Pushes the integration variable.
    LoadVar,
    /// Pushes a parameter (by index).
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    Neg,
    /// Pops top value, pushes the function applied to it.
    Call(Function),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "exp" => Some(Self::Exp),
            "ln" | "log" => Some(Self::Ln),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    fn apply<T: Scalar>(self, a: T) -> T {
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Exp => a.exp(),
            Self::Ln => a.ln(),
            Self::Sqrt => a.sqrt(),
            Self::Abs => a.abs(),
        }
    }
}

/// A compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stack machine for evaluating compiled expressions.
///
/// Compiled bytecode is always balanced, so every pop has a matching push.
/// Hand-built bytecode that underflows the stack or names a missing parameter
/// yields NaN.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(bytecode: &Bytecode, var: T, params: &[T], stack: &mut Vec<T>) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(lit(val)),
                OpCode::LoadVar => stack.push(var),
                OpCode::LoadParam(idx) => {
                    stack.push(params.get(idx).copied().unwrap_or_else(T::nan));
                }
                OpCode::Neg => {
                    let a = pop(stack);
                    stack.push(-a);
                }
                OpCode::Call(func) => {
                    let a = pop(stack);
                    stack.push(func.apply(a));
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    stack.push(match op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    });
                }
            }
        }

        pop(stack)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

// --- AST & Parser ---

/// Deepest accepted nesting of parentheses, calls, unary minus and exponents.
pub const MAX_NESTING: usize = 128;

/// Longest accepted expression, in tokens. Bounds the depth of operator chains.
pub const MAX_TOKENS: usize = 2048;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Neg(Box<Expr>),
    Call(String, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Parses an expression into an AST.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        bail!("Expression is empty.");
    }
    if tokens.len() > MAX_TOKENS {
        bail!(
            "Expression is too long: {} tokens, at most {MAX_TOKENS} allowed.",
            tokens.len()
        );
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_sum()?;
    if let Some(token) = parser.peek() {
        bail!("Unexpected trailing token {token:?}.");
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else if (d == 'e' || d == 'E') && !num_str.contains(['e', 'E']) {
                    // Only an exponent when digits follow; `2e` stays a number then `e`.
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    let signed = matches!(lookahead.peek(), Some(&'+') | Some(&'-'));
                    if signed {
                        lookahead.next();
                    }
                    if !matches!(lookahead.peek(), Some(ch) if ch.is_ascii_digit()) {
                        break;
                    }
                    num_str.push(d);
                    chars.next();
                    if signed {
                        num_str.extend(chars.next());
                    }
                } else {
                    break;
                }
            }
            let value = num_str
                .parse::<f64>()
                .with_context(|| format!("Invalid number literal '{num_str}'."))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => bail!("Unexpected character '{c}' in expression."),
            };
            tokens.push(token);
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => bail!("Expected ')'."),
        }
    }

    // sum := product (('+' | '-') product)*
    fn parse_sum(&mut self) -> Result<Expr> {
        let mut left = self.parse_product()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_product()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // product := unary (('*' | '/') unary)*
    fn parse_product(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // unary := '-' unary | power
    //
    // Every recursive path passes through here, so this is where depth is counted.
    fn parse_unary(&mut self) -> Result<Expr> {
        if self.depth >= MAX_NESTING {
            bail!("Expression is nested more than {MAX_NESTING} levels deep.");
        }
        self.depth += 1;
        let expr = if let Some(Token::Minus) = self.peek() {
            self.consume();
            self.parse_unary().map(|expr| Expr::Neg(Box::new(expr)))
        } else {
            self.parse_power()
        };
        self.depth -= 1;
        expr
    }

    // power := primary ('^' unary)?   (right associative, -x^2 == -(x^2))
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_sum()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Symbol(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_sum()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(token) => bail!("Unexpected token {token:?}."),
            None => bail!("Unexpected end of expression."),
        }
    }
}

// --- Compiler ---

/// Compiles an [`Expr`] into [`Bytecode`], resolving the integration variable
/// and parameter names. `pi` and `e` are built in unless shadowed.
pub struct Compiler {
    pub variable: Option<String>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(variable: Option<&str>, param_names: &[String]) -> Self {
        let param_map = param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self {
            variable: variable.map(str::to_string),
            param_map,
        }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Symbol(name) => ops.push(self.resolve(name)?),
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Pow => OpCode::Pow,
                });
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(name, arg) => {
                let func =
                    Function::lookup(name).ok_or_else(|| anyhow!("Unknown function: {name}"))?;
                self.compile_recursive(arg, ops)?;
                ops.push(OpCode::Call(func));
            }
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<OpCode> {
        if self.variable.as_deref() == Some(name) {
            return Ok(OpCode::LoadVar);
        }
        if let Some(&idx) = self.param_map.get(name) {
            return Ok(OpCode::LoadParam(idx));
        }
        match name {
            "pi" => Ok(OpCode::LoadConst(std::f64::consts::PI)),
            "e" => Ok(OpCode::LoadConst(std::f64::consts::E)),
            _ => bail!("Unknown variable or parameter: {name}"),
        }
    }
}

// --- ExpressionIntegrand ---

/// An [`Integrand`] backed by compiled bytecode.
///
/// The evaluation stack lives in a `RefCell` to avoid allocating per sample,
/// which makes this type `!Sync`.
#[derive(Debug)]
pub struct ExpressionIntegrand<T: Scalar> {
    bytecode: Bytecode,
    params: Vec<T>,
    stack: RefCell<Vec<T>>,
}

impl<T: Scalar> ExpressionIntegrand<T> {
    fn new(bytecode: Bytecode, params: Vec<T>) -> Self {
        Self {
            bytecode,
            params,
            stack: RefCell::new(Vec::with_capacity(32)),
        }
    }

    /// Parses and compiles `expression` in the single variable `variable`.
    /// `param_names` and `params` are matched by position.
    pub fn compile(
        expression: &str,
        variable: &str,
        param_names: &[String],
        params: Vec<T>,
    ) -> Result<Self> {
        if param_names.len() != params.len() {
            bail!(
                "Parameter count mismatch. Expected {} values, got {}.",
                param_names.len(),
                params.len()
            );
        }
        if param_names.iter().any(|name| name == variable) {
            bail!("Parameter '{variable}' shadows the integration variable.");
        }
        let parsed = parse(expression)
            .with_context(|| format!("Failed to parse integrand '{expression}'."))?;
        let bytecode = Compiler::new(Some(variable), param_names).compile(&parsed)?;
        Ok(Self::new(bytecode, params))
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    pub fn params(&self) -> &[T] {
        &self.params
    }
}

impl<T: Scalar> Integrand<T> for ExpressionIntegrand<T> {
    fn evaluate(&self, x: T) -> T {
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.bytecode, x, &self.params, &mut stack)
    }

    fn sample(&self, points: &[T]) -> Vec<T> {
        let mut stack = self.stack.borrow_mut();
        points
            .iter()
            .map(|&x| VM::execute(&self.bytecode, x, &self.params, &mut stack))
            .collect()
    }
}

/// Evaluates an expression with no variables, e.g. `-pi/2`.
pub fn evaluate_constant(expression: &str) -> Result<f64> {
    let parsed = parse(expression)
        .with_context(|| format!("Failed to parse constant '{expression}'."))?;
    let bytecode = Compiler::new(None, &[]).compile(&parsed)?;
    let mut stack = Vec::new();
    Ok(VM::execute(&bytecode, f64::NAN, &[], &mut stack))
}

#[cfg(test)]
mod tests {
    use super::{
        evaluate_constant, parse, BinaryOp, Bytecode, ExpressionIntegrand, Expr, OpCode, VM,
        MAX_NESTING, MAX_TOKENS,
    };
    use crate::traits::Integrand;
    use std::f64::consts::PI;

    fn integrand(expression: &str) -> ExpressionIntegrand<f64> {
        ExpressionIntegrand::compile(expression, "x", &[], vec![])
            .expect("expression should compile")
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(integrand("1 + 2 * x").evaluate(3.0), 7.0);
        assert_eq!(integrand("(1 + 2) * x").evaluate(3.0), 9.0);
        assert_eq!(integrand("x - 1 - 1").evaluate(3.0), 1.0);
        assert_eq!(integrand("2 ^ 3 ^ 2").evaluate(0.0), 512.0);
        assert_eq!(integrand("-x^2").evaluate(3.0), -9.0);
        assert_eq!(integrand("x / 2 / 2").evaluate(8.0), 2.0);
        assert_eq!(integrand("2^-1").evaluate(0.0), 0.5);
    }

    #[test]
    fn functions_and_constants() {
        assert!((integrand("sin(pi / 2)").evaluate(0.0) - 1.0).abs() < 1e-15);
        assert!((integrand("ln(e)").evaluate(0.0) - 1.0).abs() < 1e-15);
        assert_eq!(integrand("sqrt(abs(x))").evaluate(-16.0), 4.0);
        assert!((integrand("exp(-x^2)").evaluate(1.0) - (-1.0_f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn number_literals_accept_exponents() {
        assert_eq!(integrand("1e-3 * x").evaluate(2.0), 2e-3);
        assert_eq!(integrand("2.5E2").evaluate(0.0), 250.0);
        assert!((integrand("2*e").evaluate(0.0) - 2.0 * std::f64::consts::E).abs() < 1e-15);
    }

    #[test]
    fn parameters_resolve_by_position() {
        let names = vec!["a".to_string(), "b".to_string()];
        let f = ExpressionIntegrand::compile("a * x + b", "x", &names, vec![2.0, -1.0])
            .expect("expression should compile");
        assert_eq!(f.params(), &[2.0, -1.0]);
        assert!(f.bytecode().ops.contains(&OpCode::LoadParam(1)));
        assert_eq!(f.sample(&[0.0, 1.0, 2.0]), vec![-1.0, 1.0, 3.0]);
    }

    #[test]
    fn parameters_shadow_builtin_constants() {
        let names = vec!["e".to_string()];
        let f = ExpressionIntegrand::compile("e * x", "x", &names, vec![3.0])
            .expect("expression should compile");
        assert_eq!(f.evaluate(2.0), 6.0);
    }

    #[test]
    fn compile_rejects_bad_input() {
        let cases = [
            ("x + missing", "unknown variable"),
            ("gamma(x)", "unknown function"),
            ("1 +", "failed to parse"),
            ("(x", "failed to parse"),
            ("x x", "failed to parse"),
            ("x # 2", "failed to parse"),
            ("", "failed to parse"),
        ];
        for (expression, needle) in cases {
            let err = ExpressionIntegrand::<f64>::compile(expression, "x", &[], vec![])
                .expect_err("invalid expression should fail");
            let message = format!("{err:#}").to_lowercase();
            assert!(
                message.contains(needle),
                "expected \"{needle}\" for {expression:?}, got \"{message}\""
            );
        }
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let negations = format!("{}x", "-".repeat(10_000));
        assert!(ExpressionIntegrand::<f64>::compile(&negations, "x", &[], vec![]).is_err());

        let depth = 500;
        let parens = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        let err = parse(&parens).expect_err("too deep");
        assert!(err.to_string().contains("nested"), "{err}");

        let calls = format!("{}x{}", "sin(".repeat(depth), ")".repeat(depth));
        assert!(parse(&calls).is_err());

        let exponents = vec!["x"; depth].join("^");
        assert!(parse(&exponents).is_err());

        let depth = MAX_NESTING / 2;
        let parens = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(integrand(&parens).evaluate(3.0), 3.0);
    }

    #[test]
    fn long_operator_chains_are_capped() {
        let terms = MAX_TOKENS / 2;
        let sum = vec!["x"; terms].join("+");
        assert_eq!(integrand(&sum).evaluate(1.0), terms as f64);

        let sum = vec!["x"; MAX_TOKENS].join("+");
        let err = parse(&sum).expect_err("too long");
        assert!(err.to_string().contains("too long"), "{err}");
    }

    #[test]
    fn missing_parameters_evaluate_to_nan() {
        let bytecode = Bytecode {
            ops: vec![OpCode::LoadVar, OpCode::LoadParam(3), OpCode::Add],
        };
        let mut stack = Vec::new();
        assert!(VM::execute(&bytecode, 1.0_f64, &[2.0], &mut stack).is_nan());
    }

    #[test]
    fn compile_rejects_parameter_mismatch() {
        let names = vec!["a".to_string()];
        assert!(ExpressionIntegrand::<f64>::compile("a * x", "x", &names, vec![]).is_err());
        let names = vec!["x".to_string()];
        assert!(ExpressionIntegrand::<f64>::compile("x", "x", &names, vec![1.0]).is_err());
    }

    #[test]
    fn parse_builds_expected_tree() {
        let expr = parse("-t^2").expect("should parse");
        assert_eq!(
            expr,
            Expr::Neg(Box::new(Expr::Binary(
                Box::new(Expr::Symbol("t".to_string())),
                BinaryOp::Pow,
                Box::new(Expr::Number(2.0)),
            )))
        );
    }

    #[test]
    fn evaluate_constant_handles_bounds() {
        let value = evaluate_constant("-pi/2").expect("constant should evaluate");
        assert!((value + PI / 2.0).abs() < 1e-15);
        assert!(evaluate_constant("x + 1").is_err());
    }

    #[test]
    fn expressions_evaluate_in_single_precision() {
        let f = ExpressionIntegrand::<f32>::compile("x * x + 1", "x", &[], vec![])
            .expect("expression should compile");
        assert_eq!(f.evaluate(2.0), 5.0);
    }
}
