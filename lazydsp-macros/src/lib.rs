use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{LitStr, parse_macro_input};

/// Builds a `RationalExpr` from a transfer-function literal.
///
/// The literal is parsed at compile time, so a malformed expression is a
/// compile error. The expansion evaluates to
/// `Result<RationalExpr, lazydsp::Error>` because dividing by an expression
/// that cancels to zero is still only detected when it runs.
///
/// # Format
///
/// The grammar is the one `lazydsp::filters::parse_expr` accepts:
/// - numbers such as `0.5`, `2e-3`, with a `j` suffix for imaginary values
/// - `z`, the z-transform variable, so `z^-1` is the one-sample delay
/// - `+`, `-`, `*`, `/` and parentheses
/// - integer powers, written `^-1` or `^(-1)`
///
/// # Examples
///
/// ```ignore
/// use lazydsp::tf;
///
/// // One-pole lowpass
/// let lowpass = tf!("0.1 / (1 - 0.9*z^-1)")?;
///
/// // Comb filter
/// let comb = tf!("1 - z^-8")?;
/// ```
#[proc_macro]
pub fn tf(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LitStr);
    let text = input.value();

    match parse_tf(&text) {
        Ok(node) => {
            let body = node.to_tokens();
            let expanded = quote! {
                {
                    fn build() -> ::core::result::Result<
                        ::lazydsp::filters::RationalExpr,
                        ::lazydsp::Error,
                    > {
                        ::core::result::Result::Ok(#body)
                    }
                    build()
                }
            };
            TokenStream::from(expanded)
        }
        Err(e) => {
            let error_msg = format!("Invalid transfer function '{}': {}", text, e);
            let expanded = quote! {
                compile_error!(#error_msg)
            };
            TokenStream::from(expanded)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number { re: f64, im: f64 },
    Z,
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Pow(Box<Node>, i32),
}

impl Node {
    fn to_tokens(&self) -> TokenStream2 {
        match self {
            Node::Number { re, im } => quote! {
                ::lazydsp::filters::RationalExpr::constant(::lazydsp::Sample::new(#re, #im))
            },
            Node::Z => quote! { ::lazydsp::filters::RationalExpr::z() },
            Node::Neg(inner) => {
                let inner = inner.to_tokens();
                quote! { (-(#inner)) }
            }
            Node::Add(a, b) => {
                let (a, b) = (a.to_tokens(), b.to_tokens());
                quote! { ((#a) + (#b)) }
            }
            Node::Sub(a, b) => {
                let (a, b) = (a.to_tokens(), b.to_tokens());
                quote! { ((#a) - (#b)) }
            }
            Node::Mul(a, b) => {
                let (a, b) = (a.to_tokens(), b.to_tokens());
                quote! { ((#a) * (#b)) }
            }
            Node::Div(a, b) => {
                let (a, b) = (a.to_tokens(), b.to_tokens());
                quote! { ((#a) / (#b))? }
            }
            Node::Pow(base, exponent) => {
                let base = base.to_tokens();
                quote! { (#base).powi(#exponent)? }
            }
        }
    }
}

fn parse_tf(s: &str) -> Result<Node, String> {
    let mut parser = Parser { input: s, pos: 0 };
    let node = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos < s.len() {
        return Err(format!("unexpected trailing input at byte {}", parser.pos));
    }
    Ok(node)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> String {
        format!("{} at byte {}", message, self.pos)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Node, String> {
        let mut acc = self.term()?;
        loop {
            if self.eat(b'+') {
                acc = Node::Add(Box::new(acc), Box::new(self.term()?));
            } else if self.eat(b'-') {
                acc = Node::Sub(Box::new(acc), Box::new(self.term()?));
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<Node, String> {
        let mut acc = self.unary()?;
        loop {
            if self.eat(b'*') {
                acc = Node::Mul(Box::new(acc), Box::new(self.unary()?));
            } else if self.eat(b'/') {
                acc = Node::Div(Box::new(acc), Box::new(self.unary()?));
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<Node, String> {
        if self.eat(b'-') {
            Ok(Node::Neg(Box::new(self.unary()?)))
        } else if self.eat(b'+') {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<Node, String> {
        let base = self.primary()?;
        if !self.eat(b'^') {
            return Ok(base);
        }
        let exponent = if self.eat(b'(') {
            let exponent = self.integer()?;
            if !self.eat(b')') {
                return Err(self.error("expected ')' after exponent"));
            }
            exponent
        } else {
            self.integer()?
        };
        Ok(Node::Pow(Box::new(base), exponent))
    }

    fn integer(&mut self) -> Result<i32, String> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let digits = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits {
            return Err(self.error("expected an integer exponent"));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| format!("exponent out of range at byte {}", start))
    }

    fn primary(&mut self) -> Result<Node, String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr()?;
                if !self.eat(b')') {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(b'z') => {
                self.pos += 1;
                Ok(Node::Z)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(_) => Err(self.error("expected a number, 'z' or '('")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn number(&mut self) -> Result<Node, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let literal = &self.input[start..self.pos];
        let value: f64 = literal
            .parse()
            .map_err(|_| format!("invalid number '{}' at byte {}", literal, start))?;
        if !value.is_finite() {
            return Err(format!("number '{}' at byte {} overflows", literal, start));
        }
        if self.peek() == Some(b'j') {
            self.pos += 1;
            Ok(Node::Number { re: 0.0, im: value })
        } else {
            Ok(Node::Number { re: value, im: 0.0 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(re: f64) -> Box<Node> {
        Box::new(Node::Number { re, im: 0.0 })
    }

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_tf("z^-1").unwrap(), Node::Pow(Box::new(Node::Z), -1));
        assert_eq!(
            parse_tf("z^(-2)").unwrap(),
            Node::Pow(Box::new(Node::Z), -2)
        );
        assert_eq!(parse_tf(" z ").unwrap(), Node::Z);
    }

    #[test]
    fn test_precedence() {
        // 1 + 2*z is 1 + (2*z)
        let parsed = parse_tf("1 + 2*z").unwrap();
        assert_eq!(
            parsed,
            Node::Add(num(1.0), Box::new(Node::Mul(num(2.0), Box::new(Node::Z))))
        );

        // -z^2 is -(z^2)
        let parsed = parse_tf("-z^2").unwrap();
        assert_eq!(parsed, Node::Neg(Box::new(Node::Pow(Box::new(Node::Z), 2))));
    }

    #[test]
    fn test_division_is_left_associative() {
        let parsed = parse_tf("1 / 2 / z").unwrap();
        assert_eq!(
            parsed,
            Node::Div(Box::new(Node::Div(num(1.0), num(2.0))), Box::new(Node::Z))
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_tf("2.5e-1").unwrap(), *num(0.25));
        assert_eq!(parse_tf("3j").unwrap(), Node::Number { re: 0.0, im: 3.0 });
        assert!(parse_tf("1e999").is_err());
    }

    #[test]
    fn test_errors() {
        assert!(parse_tf("").is_err());
        assert!(parse_tf("1 +").is_err());
        assert!(parse_tf("(1 - z").is_err());
        assert!(parse_tf("z^x").is_err());
        assert!(parse_tf("1 2").is_err());
        assert!(parse_tf("y").is_err());
    }

    #[test]
    fn test_division_expands_to_fallible_code() {
        let tokens = parse_tf("1 / z").unwrap().to_tokens().to_string();
        assert!(
            tokens.contains('?'),
            "division must propagate errors: {tokens}"
        );
        let tokens = parse_tf("1 + z").unwrap().to_tokens().to_string();
        assert!(!tokens.contains('?'));
    }
}
