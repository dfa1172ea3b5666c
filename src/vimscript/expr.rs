//! Expression parsing over a single logical script line.

use super::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::error::{Result, ScriptError, ScriptErrorKind};
use crate::key::{keys_to_text, parse_keys};

/// Scope letters accepted before `:` in a variable name.
const SCOPES: &str = "gslavbwt";

/// A read position in one logical line. Offsets are bytes.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '#'
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    pub fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consumes `word` only when it is not followed by a name character.
    pub fn eat_word(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if rest.starts_with(word) && !rest[word.len()..].starts_with(is_name_char) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    /// True at the end of the command: end of line or `|`.
    pub fn at_command_end(&self) -> bool {
        matches!(self.peek(), None | Some('|'))
    }

    pub fn take_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&f) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    pub fn invalid(&self) -> ScriptError {
        ScriptErrorKind::InvalidExpression(self.rest().trim_end().to_string()).into()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else if c == ')' {
            Err(ScriptErrorKind::MissingParen.into())
        } else {
            Err(self.invalid())
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.skip_ws();
        let cond = self.parse_or()?;
        self.skip_ws();
        if self.peek() == Some('?') {
            self.bump();
            let then = self.parse_expr()?;
            self.expect(':')?;
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)));
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.eat("||") {
                return Ok(lhs);
            }
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_compare()?;
        loop {
            self.skip_ws();
            if !self.eat("&&") {
                return Ok(lhs);
            }
            let rhs = self.parse_compare()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        const SYMBOLS: [(&str, CompareOp); 8] = [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            (">=", CompareOp::Ge),
            ("<=", CompareOp::Le),
            ("=~", CompareOp::Match),
            ("!~", CompareOp::NoMatch),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
        ];
        for (symbol, op) in SYMBOLS {
            if self.eat(symbol) {
                return Some(op);
            }
        }
        for (word, op) in [("isnot", CompareOp::IsNot), ("is", CompareOp::Is)] {
            let rest = self.rest();
            if rest.starts_with(word)
                && !rest[word.len()..].starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
            {
                self.pos += word.len();
                return Some(op);
            }
        }
        None
    }

    fn parse_compare(&mut self) -> Result<Expr> {
        let lhs = self.parse_additive()?;
        self.skip_ws();
        let Some(op) = self.compare_op() else {
            return Ok(lhs);
        };
        let ignore_case = match self.peek() {
            Some('#') => {
                self.bump();
                Some(false)
            }
            Some('?') => {
                self.bump();
                Some(true)
            }
            _ => None,
        };
        let rhs = self.parse_additive()?;
        Ok(Expr::Compare {
            op,
            ignore_case,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            let rest = self.rest();
            let op = if rest.starts_with("..") && !rest.starts_with("..=") {
                self.pos += 2;
                BinaryOp::Concat
            } else if rest.starts_with('.') && !rest.starts_with(".=") {
                self.pos += 1;
                BinaryOp::Concat
            } else if rest.starts_with('+') && !rest.starts_with("+=") {
                self.pos += 1;
                BinaryOp::Add
            } else if rest.starts_with('-') && !rest.starts_with("-=") && !rest.starts_with("->") {
                self.pos += 1;
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            let rest = self.rest();
            let op = match rest.chars().next() {
                Some('*') if !rest.starts_with("*=") => BinaryOp::Mul,
                Some('/') if !rest.starts_with("/=") => BinaryOp::Div,
                Some('%') if !rest.starts_with("%=") => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_ws();
        let op = match self.peek() {
            Some('!') => UnaryOp::Not,
            Some('-') => UnaryOp::Neg,
            Some('+') => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.bump();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    /// A primary followed by `[]`, `()`, `.key` and `->` suffixes.
    pub fn parse_postfix(&mut self) -> Result<Expr> {
        self.skip_ws();
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some('[') => {
                    self.bump();
                    expr = self.parse_subscript(expr)?;
                }
                Some('(') => {
                    self.bump();
                    let args = self.parse_args()?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                Some('.')
                    if self.peek_nth(1).is_some_and(is_name_start)
                        && !matches!(expr, Expr::Number(_) | Expr::Float(_)) =>
                {
                    self.bump();
                    let key = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    expr = Expr::Dot(Box::new(expr), key.to_string());
                }
                _ => {
                    let save = self.pos;
                    self.skip_ws();
                    if !self.eat("->") {
                        self.pos = save;
                        return Ok(expr);
                    }
                    let name = if self.peek() == Some('{') {
                        self.parse_primary()?
                    } else {
                        let name = self.scan_name();
                        if name.is_empty() {
                            return Err(self.invalid());
                        }
                        Expr::Name(name)
                    };
                    if self.bump() != Some('(') {
                        return Err(self.invalid());
                    }
                    let args = self.parse_args()?;
                    expr = Expr::Method {
                        base: Box::new(expr),
                        name: Box::new(name),
                        args,
                    };
                }
            }
        }
    }

    fn parse_subscript(&mut self, base: Expr) -> Result<Expr> {
        self.skip_ws();
        let start = if self.peek() == Some(':') {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.skip_ws();
        if self.peek() == Some(':') {
            self.bump();
            self.skip_ws();
            let end = if self.peek() == Some(']') {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(']')?;
            return Ok(Expr::Slice(Box::new(base), start, end));
        }
        self.expect(']')?;
        match start {
            Some(index) => Ok(Expr::Index(Box::new(base), index)),
            None => Err(self.invalid()),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {
                    self.skip_ws();
                    if self.peek() == Some(')') {
                        self.bump();
                        return Ok(args);
                    }
                }
                Some(')') => return Ok(args),
                _ => return Err(ScriptErrorKind::MissingParen.into()),
            }
        }
    }

    /// A variable or function name including its scope, `<SID>` or
    /// `<SNR>12_` prefix. Empty when no name starts here.
    pub fn scan_name(&mut self) -> String {
        let start = self.pos;
        for prefix in ["<SID>", "<sid>"] {
            if self.eat(prefix) {
                let name = self.take_while(is_name_char);
                return format!("<SID>{name}");
            }
        }
        if self.rest().starts_with("<SNR>") {
            self.pos += 5;
            self.take_while(is_name_char);
            return self.text[start..self.pos].to_string();
        }
        if !self.peek().is_some_and(is_name_start) {
            return String::new();
        }
        if let (Some(scope), Some(':')) = (self.peek(), self.peek_nth(1))
            && SCOPES.contains(scope)
            && self.peek_nth(2).is_some_and(|c| is_name_char(c) || c.is_ascii_digit())
        {
            self.pos += 2;
        }
        self.take_while(is_name_char);
        self.text[start..self.pos].to_string()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(self.invalid());
        };
        match c {
            '0'..='9' => self.parse_number(),
            '"' => self.parse_double_quoted().map(Expr::String),
            '\'' => self.parse_single_quoted().map(Expr::String),
            '[' => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    if self.peek() == Some(']') {
                        self.bump();
                        return Ok(Expr::List(items));
                    }
                    items.push(self.parse_expr()?);
                    self.skip_ws();
                    match self.bump() {
                        Some(',') => {}
                        Some(']') => return Ok(Expr::List(items)),
                        _ => {
                            return Err(ScriptErrorKind::InvalidExpression(
                                "E697: Missing end of List ']'".to_string(),
                            )
                            .into());
                        }
                    }
                }
            }
            '#' if self.peek_nth(1) == Some('{') => {
                self.pos += 2;
                self.parse_dict(true)
            }
            '{' => {
                if let Some(lambda) = self.try_lambda()? {
                    return Ok(lambda);
                }
                self.bump();
                self.parse_dict(false)
            }
            '(' => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            '&' => {
                self.bump();
                let mut name = String::new();
                if let (Some(scope @ ('l' | 'g')), Some(':')) = (self.peek(), self.peek_nth(1)) {
                    name.push(scope);
                    name.push(':');
                    self.pos += 2;
                }
                let opt = self.take_while(|c| c.is_ascii_alphanumeric());
                if opt.is_empty() {
                    return Err(self.invalid());
                }
                name.push_str(opt);
                Ok(Expr::Option(name))
            }
            '@' => {
                self.bump();
                let reg = self.bump().ok_or_else(|| self.invalid())?;
                Ok(Expr::Register(reg))
            }
            '$' => {
                self.bump();
                let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                Ok(Expr::Name(format!("${name}")))
            }
            _ => {
                let name = self.scan_name();
                if name.is_empty() {
                    return Err(self.invalid());
                }
                Ok(Expr::Name(name))
            }
        }
    }

    fn parse_number(&mut self) -> Result<Expr> {
        let rest = self.rest();
        let lower: String = rest.chars().take(2).collect::<String>().to_ascii_lowercase();
        let radix = match lower.as_str() {
            "0x" => Some(16),
            "0b" => Some(2),
            "0o" => Some(8),
            _ => None,
        };
        if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_digit(radix));
            return i64::from_str_radix(digits, radix)
                .map(Expr::Number)
                .map_err(|_| self.invalid());
        }
        let start = self.pos;
        let int = self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
            let save = self.pos;
            if matches!(self.peek(), Some('e' | 'E')) {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                    self.pos = save;
                }
            }
            let text = &self.text[start..self.pos];
            return text.parse::<f64>().map(Expr::Float).map_err(|_| self.invalid());
        }
        let octal = int.len() > 1 && int.starts_with('0') && int.chars().all(|c| ('0'..='7').contains(&c));
        let value = if octal {
            i64::from_str_radix(&int[1..], 8)
        } else {
            int.parse::<i64>()
        };
        value.map(Expr::Number).map_err(|_| self.invalid())
    }

    fn parse_single_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.bump();
                    out.push('\'');
                }
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
                None => {
                    return Err(ScriptErrorKind::MissingQuote(self.text[start..].to_string()).into());
                }
            }
        }
    }

    fn parse_double_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ScriptErrorKind::MissingQuote(self.text[start..].to_string()).into());
            };
            match c {
                '"' => return Ok(out),
                '\\' => self.parse_escape(&mut out),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) {
        let Some(c) = self.bump() else {
            out.push('\\');
            return;
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'e' => out.push('\x1b'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            'x' | 'X' | 'u' | 'U' => {
                let max = match c {
                    'x' | 'X' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits = {
                    let start = self.pos;
                    let mut n = 0;
                    while n < max && self.peek().is_some_and(|d| d.is_ascii_hexdigit()) {
                        self.bump();
                        n += 1;
                    }
                    &self.text[start..self.pos]
                };
                match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push(c),
                }
            }
            '<' => {
                let rest = self.rest();
                match rest.find('>') {
                    Some(close) if close > 0 && !rest[..close].contains(['<', ' ', '"']) => {
                        let notation = format!("<{}>", &rest[..close]);
                        let keys = parse_keys(&notation);
                        out.push_str(&keys_to_text(&keys));
                        self.pos += close + 1;
                    }
                    _ => out.push('<'),
                }
            }
            other => out.push(other),
        }
    }

    fn parse_dict(&mut self, literal_keys: bool) -> Result<Expr> {
        let missing = || -> ScriptError {
            ScriptErrorKind::InvalidExpression("E723: Missing end of Dictionary '}'".to_string()).into()
        };
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Expr::Dict(entries));
            }
            let key = if literal_keys {
                let key = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                if key.is_empty() {
                    return Err(self.invalid());
                }
                Expr::String(key.to_string())
            } else {
                self.parse_expr()?
            };
            self.skip_ws();
            if self.bump() != Some(':') {
                return Err(ScriptErrorKind::InvalidExpression(
                    "E720: Missing colon in Dictionary".to_string(),
                )
                .into());
            }
            let value = self.parse_expr()?;
            entries.push((key, value));
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(Expr::Dict(entries)),
                _ => return Err(missing()),
            }
        }
    }

    /// `{a, b -> expr}`. Returns `None` when the brace opens a Dictionary.
    fn try_lambda(&mut self) -> Result<Option<Expr>> {
        let save = self.pos;
        self.bump();
        let mut params = Vec::new();
        loop {
            self.skip_ws();
            if self.eat("->") {
                break;
            }
            let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
                self.pos = save;
                return Ok(None);
            }
            params.push(name.to_string());
            self.skip_ws();
            if self.peek() == Some(',') {
                self.bump();
            } else if !self.rest().starts_with("->") {
                self.pos = save;
                return Ok(None);
            }
        }
        let body = self.parse_expr()?;
        self.expect('}')?;
        Ok(Some(Expr::Lambda(params, Box::new(body))))
    }
}

/// Parses a complete expression such as the rhs of an `<expr>` mapping.
pub fn parse_expression(text: &str) -> Result<Expr> {
    let mut cursor = Cursor::new(text);
    let expr = cursor.parse_expr()?;
    cursor.skip_ws();
    if !cursor.at_end() {
        return Err(ScriptErrorKind::TrailingCharacters(cursor.rest().to_string()).into());
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn num(n: i64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(BinaryOp::Add, num(1), Box::new(Expr::Binary(BinaryOp::Mul, num(2), num(3))))
        );
    }

    #[test]
    fn comparison_with_case_suffix() {
        let expr = parse_expression("a ==? 'B'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Eq,
                ignore_case: Some(true),
                lhs: Box::new(Expr::Name("a".into())),
                rhs: Box::new(Expr::String("B".into())),
            }
        );
        assert!(matches!(
            parse_expression("x isnot y").unwrap(),
            Expr::Compare { op: CompareOp::IsNot, .. }
        ));
    }

    #[test]
    fn numbers_in_every_base() {
        assert_eq!(parse_expression("0x1f").unwrap(), Expr::Number(31));
        assert_eq!(parse_expression("017").unwrap(), Expr::Number(15));
        assert_eq!(parse_expression("0b11").unwrap(), Expr::Number(3));
        assert_eq!(parse_expression("1.5e2").unwrap(), Expr::Float(150.0));
    }

    #[test]
    fn key_notation_in_double_quotes() {
        assert_eq!(
            parse_expression(r#""ihi\<Esc>""#).unwrap(),
            Expr::String("ihi\x1b".to_string())
        );
        assert_eq!(parse_expression(r#""a\tb\x41""#).unwrap(), Expr::String("a\tbA".into()));
        assert_eq!(parse_expression("'it''s'").unwrap(), Expr::String("it's".into()));
    }

    #[test]
    fn dot_member_versus_concatenation() {
        assert_eq!(
            parse_expression("d.key").unwrap(),
            Expr::Dot(Box::new(Expr::Name("d".into())), "key".into())
        );
        assert!(matches!(
            parse_expression("'a' . 'b'").unwrap(),
            Expr::Binary(BinaryOp::Concat, ..)
        ));
        assert!(matches!(
            parse_expression("a .. b").unwrap(),
            Expr::Binary(BinaryOp::Concat, ..)
        ));
    }

    #[test]
    fn lambdas_and_dicts() {
        assert_eq!(
            parse_expression("{a, b -> a + b}").unwrap(),
            Expr::Lambda(
                vec!["a".into(), "b".into()],
                Box::new(Expr::Binary(
                    BinaryOp::Add,
                    Box::new(Expr::Name("a".into())),
                    Box::new(Expr::Name("b".into()))
                ))
            )
        );
        assert_eq!(
            parse_expression("{'k': 1}").unwrap(),
            Expr::Dict(vec![(Expr::String("k".into()), Expr::Number(1))])
        );
        assert_eq!(
            parse_expression("#{k: 1}").unwrap(),
            Expr::Dict(vec![(Expr::String("k".into()), Expr::Number(1))])
        );
    }

    #[test]
    fn scoped_names_slices_and_methods() {
        assert_eq!(parse_expression("a:000").unwrap(), Expr::Name("a:000".into()));
        assert_eq!(parse_expression("<SID>Foo").unwrap(), Expr::Name("<SID>Foo".into()));
        assert!(matches!(parse_expression("l[1:]").unwrap(), Expr::Slice(_, Some(_), None)));
        assert!(matches!(
            parse_expression("[1, 2]->len()").unwrap(),
            Expr::Method { .. }
        ));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            parse_expression("\"abc").unwrap_err().kind,
            ScriptErrorKind::MissingQuote(_)
        ));
        assert!(matches!(
            parse_expression("foo(1").unwrap_err().kind,
            ScriptErrorKind::MissingParen
        ));
        assert!(matches!(
            parse_expression("1 2").unwrap_err().kind,
            ScriptErrorKind::TrailingCharacters(_)
        ));
    }
}
