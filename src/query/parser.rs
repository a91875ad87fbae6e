//! Query string parser.
//!
//! Grammar:
//!
//! ```text
//! condition := path [ ("==" | "=" | "^=") value ]
//! path      := ["$" ["."]] segment ( "." key | "[" quoted "]" )*
//! segment   := key | "[" quoted "]"
//! value     := quoted | bare text up to the end of input
//! ```

use super::ast::{Condition, FieldPath, Op};
use crate::error::{Error, Result};

/// Parser for field paths and conditions.
pub struct Parser {
    input: Vec<char>,
    position: usize,
}

impl Parser {
    /// Creates a new parser for the given query string.
    pub fn new(query: &str) -> Self {
        Self {
            input: query.chars().collect(),
            position: 0,
        }
    }

    /// Parses a complete condition such as `kind == epiphany-cluster`.
    pub fn parse_condition(query: &str) -> Result<Condition> {
        let mut parser = Parser::new(query);
        parser.skip_whitespace();
        let path = parser.parse_path()?;
        parser.skip_whitespace();

        let op = match (parser.peek(), parser.peek_at(1)) {
            (None, _) => Op::Exists,
            (Some('^'), Some('=')) => {
                parser.position += 2;
                Op::StartsWith(parser.parse_value()?)
            }
            (Some('='), Some('=')) => {
                parser.position += 2;
                Op::Equals(parser.parse_value()?)
            }
            (Some('='), _) => {
                parser.position += 1;
                Op::Equals(parser.parse_value()?)
            }
            (Some(c), _) => {
                return Err(Error::query(
                    parser.position,
                    format!("expected '==', '=' or '^=', found '{}'", c),
                ))
            }
        };

        Ok(Condition::new(path, op))
    }

    /// Parses a field path such as `azepi.config` and requires it to span
    /// the whole input.
    pub fn parse_field_path(query: &str) -> Result<FieldPath> {
        let mut parser = Parser::new(query);
        parser.skip_whitespace();
        let path = parser.parse_path()?;
        parser.skip_whitespace();
        match parser.peek() {
            None => Ok(path),
            Some(c) => Err(Error::query(
                parser.position,
                format!("unexpected '{}' after path", c),
            )),
        }
    }

    fn parse_path(&mut self) -> Result<FieldPath> {
        let mut path = FieldPath::default();

        if self.peek() == Some('$') {
            self.next();
            if self.peek() == Some('.') {
                self.next();
            }
        }

        // First segment has no leading dot
        match self.peek() {
            Some('[') => path.push(self.parse_bracket()?),
            Some(_) => path.push(self.parse_key()?),
            None => return Err(Error::query(self.position, "expected a field name")),
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.next();
                    path.push(self.parse_key()?);
                }
                Some('[') => path.push(self.parse_bracket()?),
                _ => break,
            }
        }

        Ok(path)
    }

    /// Parses a bare key: everything up to a delimiter.
    fn parse_key(&mut self) -> Result<String> {
        let start = self.position;
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            self.next();
        }
        if self.position == start {
            return Err(Error::query(self.position, "expected a field name"));
        }
        Ok(self.input[start..self.position].iter().collect())
    }

    /// Parses `['key']` or `["key"]`.
    fn parse_bracket(&mut self) -> Result<String> {
        self.expect('[')?;
        let key = match self.peek() {
            Some(quote @ ('\'' | '"')) => self.parse_quoted(quote)?,
            _ => {
                return Err(Error::query(
                    self.position,
                    "expected a quoted key inside brackets",
                ))
            }
        };
        self.expect(']')?;
        Ok(key)
    }

    fn parse_value(&mut self) -> Result<String> {
        self.skip_whitespace();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                let value = self.parse_quoted(quote)?;
                self.skip_whitespace();
                if let Some(c) = self.peek() {
                    return Err(Error::query(
                        self.position,
                        format!("unexpected '{}' after quoted value", c),
                    ));
                }
                Ok(value)
            }
            Some(_) => {
                let rest: String = self.input[self.position..].iter().collect();
                self.position = self.input.len();
                Ok(rest.trim_end().to_string())
            }
            None => Err(Error::query(self.position, "expected a value")),
        }
    }

    /// Parses a quoted string; a backslash escapes the next character.
    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.next() {
                Some('\\') => match self.next() {
                    Some(c) => out.push(c),
                    None => return Err(Error::query(self.position, "unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(Error::query(self.position, "unterminated string")),
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.next();
                Ok(())
            }
            Some(c) => Err(Error::query(
                self.position,
                format!("expected '{}', found '{}'", expected, c),
            )),
            None => Err(Error::query(
                self.position,
                format!("expected '{}', found end of input", expected),
            )),
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    /// Returns the next character and advances position.
    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '.' | '[' | ']' | '=' | '^' | '\'' | '"') || c.is_whitespace()
}

impl FieldPath {
    /// Parses dotted/bracket notation, e.g. `azbi.output['vm_names.value']`.
    ///
    /// # Example
    ///
    /// ```
    /// use docquery::query::FieldPath;
    ///
    /// let path = FieldPath::parse("azepi.config").unwrap();
    /// assert_eq!(path.segments(), &["azepi".to_string(), "config".to_string()]);
    /// ```
    pub fn parse(query: &str) -> Result<Self> {
        Parser::parse_field_path(query)
    }
}

impl Condition {
    /// Parses a condition expression, e.g. `kind ^= configuration/`.
    pub fn parse(query: &str) -> Result<Self> {
        Parser::parse_condition(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(path: &FieldPath) -> Vec<&str> {
        path.segments().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_parse_simple_path() {
        let path = FieldPath::parse("specification.cloud.k8s_as_cloud_service").unwrap();
        assert_eq!(keys(&path), vec!["specification", "cloud", "k8s_as_cloud_service"]);
    }

    #[test]
    fn test_parse_root_prefix() {
        let path = FieldPath::parse("$.azepi.config").unwrap();
        assert_eq!(keys(&path), vec!["azepi", "config"]);
    }

    #[test]
    fn test_parse_bracket_keys() {
        let path = FieldPath::parse("azbi.output['private_ips.value']").unwrap();
        assert_eq!(keys(&path), vec!["azbi", "output", "private_ips.value"]);

        let path = FieldPath::parse("[\"rg_name.value\"]").unwrap();
        assert_eq!(keys(&path), vec!["rg_name.value"]);
    }

    #[test]
    fn test_display_parse_round_trip() {
        let original = FieldPath::from_keys(&["azbi", "output", "it's.odd"]);
        let reparsed = FieldPath::parse(&original.to_string()).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn test_parse_path_errors() {
        assert!(matches!(FieldPath::parse(""), Err(Error::Query { .. })));
        assert!(matches!(FieldPath::parse("a..b"), Err(Error::Query { .. })));
        assert!(matches!(FieldPath::parse("a['b'"), Err(Error::Query { .. })));
        assert!(matches!(FieldPath::parse("a[b]"), Err(Error::Query { .. })));
        assert!(matches!(FieldPath::parse("a b"), Err(Error::Query { .. })));
    }

    #[test]
    fn test_parse_condition_equals() {
        let cond = Condition::parse("kind == epiphany-cluster").unwrap();
        assert_eq!(keys(&cond.path), vec!["kind"]);
        assert_eq!(cond.op, Op::Equals("epiphany-cluster".to_string()));

        let cond = Condition::parse("kind=configuration/applications").unwrap();
        assert_eq!(cond.op, Op::Equals("configuration/applications".to_string()));
    }

    #[test]
    fn test_parse_condition_prefix() {
        let cond = Condition::parse("kind ^= 'configuration/'").unwrap();
        assert_eq!(cond.op, Op::StartsWith("configuration/".to_string()));
    }

    #[test]
    fn test_parse_condition_exists() {
        let cond = Condition::parse("specification.applications").unwrap();
        assert_eq!(cond.op, Op::Exists);
    }

    #[test]
    fn test_parse_condition_quoted_value_with_spaces() {
        let cond = Condition::parse("title == \"Epiphany cluster Config\"").unwrap();
        assert_eq!(cond.op, Op::Equals("Epiphany cluster Config".to_string()));
    }

    #[test]
    fn test_parse_condition_errors() {
        assert!(Condition::parse("kind ==").is_err());
        assert!(Condition::parse("kind ! x").is_err());
        assert!(Condition::parse("kind == 'a' b").is_err());
        assert!(Condition::parse("kind == 'open").is_err());
    }

    #[test]
    fn test_error_reports_position() {
        match Condition::parse("kind ! x") {
            Err(Error::Query { position, .. }) => assert_eq!(position, 5),
            other => panic!("Expected query error, got {:?}", other),
        }
    }
}
