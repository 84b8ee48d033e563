//! A parser for the openCypher subset the compiler emits.
//!
//! Supported forms, each optionally terminated by `;`:
//!
//! ```text
//! CREATE (n:L1:L2 {k: v, ...})
//! MERGE (n:L {k: v, ...})
//! MATCH (a {..}), (b {..}) [MATCH ...] CREATE (a)-[:TYPE {..}]->(b)
//! CREATE CONSTRAINT [name] [IF NOT EXISTS] FOR (n:L) REQUIRE n.p IS UNIQUE
//! ```
//!
//! Keywords are case-insensitive. Property values are strings (single or
//! double quoted), numbers, booleans or `null`.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkPattern {
    pub source: String,
    pub target: String,
    pub link_type: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateNode(NodePattern),
    MergeNode(NodePattern),
    CreateLink {
        matches: Vec<NodePattern>,
        link: LinkPattern,
    },
    CreateConstraint {
        name: Option<String>,
        if_not_exists: bool,
        label: String,
        property: String,
    },
}

pub fn parse_statement(input: &str) -> Result<Statement, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let statement = parser.statement()?;
    parser.eat(&Token::Semicolon);
    parser.expect_end()?;
    Ok(statement)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Dot,
    Dash,
    Arrow,
    Semicolon,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => single(&mut chars, Token::LParen),
            ')' => single(&mut chars, Token::RParen),
            '{' => single(&mut chars, Token::LBrace),
            '}' => single(&mut chars, Token::RBrace),
            '[' => single(&mut chars, Token::LBracket),
            ']' => single(&mut chars, Token::RBracket),
            ':' => single(&mut chars, Token::Colon),
            ',' => single(&mut chars, Token::Comma),
            '.' => single(&mut chars, Token::Dot),
            ';' => single(&mut chars, Token::Semicolon),
            '-' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '>').is_some() {
                    Token::Arrow
                } else {
                    Token::Dash
                }
            }
            '"' | '\'' => {
                chars.next();
                Token::Str(string_literal(&mut chars, c, offset)?)
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some((_, d)) =
                    chars.next_if(|&(_, d)| d.is_ascii_digit() || d == '.')
                {
                    text.push(d);
                }
                if let Some((_, e)) = chars.next_if(|&(_, e)| e == 'e' || e == 'E') {
                    text.push(e);
                    if let Some((_, sign)) = chars.next_if(|&(_, s)| s == '+' || s == '-') {
                        text.push(sign);
                    }
                    while let Some((_, d)) = chars.next_if(|&(_, d)| d.is_ascii_digit()) {
                        text.push(d);
                    }
                }
                Token::Number(text)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some((_, d)) =
                    chars.next_if(|&(_, d)| d.is_ascii_alphanumeric() || d == '_')
                {
                    text.push(d);
                }
                Token::Ident(text)
            }
            other => {
                return Err(ParseError::new(
                    offset,
                    format!("Unexpected character '{}'", other),
                ));
            }
        };
        tokens.push((offset, token));
    }

    Ok(tokens)
}

fn single<I: Iterator<Item = (usize, char)>>(
    chars: &mut std::iter::Peekable<I>,
    token: Token,
) -> Token {
    chars.next();
    token
}

fn string_literal<I: Iterator<Item = (usize, char)>>(
    chars: &mut std::iter::Peekable<I>,
    quote: char,
    start: usize,
) -> Result<String, ParseError> {
    let mut value = String::new();
    loop {
        let Some((offset, c)) = chars.next() else {
            return Err(ParseError::new(start, "Unterminated string literal"));
        };
        match c {
            c if c == quote => return Ok(value),
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    return Err(ParseError::new(start, "Unterminated string literal"));
                };
                match escaped {
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'b' => value.push('\u{8}'),
                    'f' => value.push('\u{c}'),
                    'u' => {
                        let hex: String = (0..4)
                            .filter_map(|_| chars.next())
                            .map(|(_, h)| h)
                            .collect();
                        let decoded = u32::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == 4)
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                ParseError::new(
                                    offset,
                                    format!("Invalid unicode escape \\u{}", hex),
                                )
                            })?;
                        value.push(decoded);
                    }
                    other => {
                        return Err(ParseError::new(
                            offset,
                            format!("Invalid escape sequence \\{}", other),
                        ));
                    }
                }
            }
            c => value.push(c),
        }
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.offset(), message)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("Expected {:?}", token)))
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("Unexpected trailing input {:?}", token))),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.at_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("Expected {}", keyword)))
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        if self.at_keyword("MATCH") {
            return self.match_create();
        }
        if self.at_keyword("MERGE") {
            self.pos += 1;
            return Ok(Statement::MergeNode(self.node_pattern()?));
        }
        self.keyword("CREATE")?;
        if self.at_keyword("CONSTRAINT") {
            self.pos += 1;
            return self.constraint();
        }
        let node = self.node_pattern()?;
        if matches!(self.peek(), Some(Token::Dash)) {
            return Err(self.error("Creating a relationship requires MATCH"));
        }
        Ok(Statement::CreateNode(node))
    }

    fn match_create(&mut self) -> Result<Statement, ParseError> {
        let mut matches = Vec::new();
        while self.at_keyword("MATCH") {
            self.pos += 1;
            loop {
                let pattern = self.node_pattern()?;
                if pattern.variable.is_none() {
                    return Err(self.error("MATCH patterns need a variable"));
                }
                matches.push(pattern);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        self.keyword("CREATE")?;
        self.expect(Token::LParen)?;
        let source = self.identifier()?;
        self.expect(Token::RParen)?;
        self.expect(Token::Dash)?;
        self.expect(Token::LBracket)?;
        if matches!(self.peek(), Some(Token::Ident(_))) {
            // relationship variable, unused
            self.pos += 1;
        }
        self.expect(Token::Colon)?;
        let link_type = self.identifier()?;
        let properties = if matches!(self.peek(), Some(Token::LBrace)) {
            self.properties()?
        } else {
            Map::new()
        };
        self.expect(Token::RBracket)?;
        self.expect(Token::Arrow)?;
        self.expect(Token::LParen)?;
        let target = self.identifier()?;
        self.expect(Token::RParen)?;

        for variable in [&source, &target] {
            if !matches
                .iter()
                .any(|m| m.variable.as_deref() == Some(variable.as_str()))
            {
                return Err(self.error(format!("Variable `{}` not defined", variable)));
            }
        }

        Ok(Statement::CreateLink {
            matches,
            link: LinkPattern {
                source,
                target,
                link_type,
                properties,
            },
        })
    }

    fn constraint(&mut self) -> Result<Statement, ParseError> {
        let name = if self.at_keyword("IF") || self.at_keyword("FOR") {
            None
        } else {
            Some(self.identifier()?)
        };

        let if_not_exists = if self.at_keyword("IF") {
            self.pos += 1;
            self.keyword("NOT")?;
            self.keyword("EXISTS")?;
            true
        } else {
            false
        };

        self.keyword("FOR")?;
        let pattern = self.node_pattern()?;
        let (Some(variable), [label]) = (pattern.variable, pattern.labels.as_slice()) else {
            return Err(self.error("Constraint pattern needs a variable and exactly one label"));
        };
        let label = label.clone();

        self.keyword("REQUIRE")?;
        let owner = self.identifier()?;
        if owner != variable {
            return Err(self.error(format!("Variable `{}` not defined", owner)));
        }
        self.expect(Token::Dot)?;
        let property = self.identifier()?;
        self.keyword("IS")?;
        self.keyword("UNIQUE")?;

        Ok(Statement::CreateConstraint {
            name,
            if_not_exists,
            label,
            property,
        })
    }

    fn node_pattern(&mut self) -> Result<NodePattern, ParseError> {
        self.expect(Token::LParen)?;
        let mut pattern = NodePattern::default();

        if matches!(self.peek(), Some(Token::Ident(_))) {
            pattern.variable = Some(self.identifier()?);
        }
        while self.eat(&Token::Colon) {
            pattern.labels.push(self.identifier()?);
        }
        if matches!(self.peek(), Some(Token::LBrace)) {
            pattern.properties = self.properties()?;
        }

        self.expect(Token::RParen)?;
        Ok(pattern)
    }

    fn properties(&mut self) -> Result<Map<String, Value>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut properties = Map::new();
        if self.eat(&Token::RBrace) {
            return Ok(properties);
        }
        loop {
            let key = self.identifier()?;
            self.expect(Token::Colon)?;
            let value = self.value()?;
            properties.insert(key, value);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(properties)
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let negative = self.eat(&Token::Dash);
        let token = self.peek().cloned();
        match token {
            Some(Token::Number(text)) => {
                let value = number(&text, negative)
                    .ok_or_else(|| self.error(format!("Invalid number {}", text)))?;
                self.pos += 1;
                Ok(value)
            }
            _ if negative => Err(self.error("Expected number after '-'")),
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Value::String(s))
            }
            Some(Token::Ident(word)) => {
                let value = match word.to_ascii_lowercase().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => return Err(self.error(format!("Unexpected identifier {}", word))),
                };
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error("Expected a value")),
        }
    }
}

fn number(text: &str, negative: bool) -> Option<Value> {
    let signed = if negative {
        format!("-{}", text)
    } else {
        text.to_string()
    };
    if !text.contains(['.', 'e', 'E'])
        && let Ok(integer) = signed.parse::<i64>()
    {
        return Some(Value::Number(integer.into()));
    }
    let float: f64 = signed.parse().ok()?;
    Number::from_f64(float).map(Value::Number)
}
