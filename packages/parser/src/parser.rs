use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};
use serde_json::{Map, Number, Value};

/// Recursive-descent parser producing `serde_json` values
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    source_len: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
        })
    }

    /// Parse a member list with optional surrounding braces
    pub fn parse_attribute(&mut self) -> ParseResult<Map<String, Value>> {
        let members = if self.check(&Token::LBrace) && self.braces_span_input() {
            self.advance();
            let members = self.parse_members(true)?;
            self.expect(Token::RBrace)?;
            members
        } else {
            self.parse_members(false)?
        };

        self.expect_end()?;
        Ok(members)
    }

    /// Parse exactly one value
    pub fn parse_single_value(&mut self) -> ParseResult<Value> {
        let value = self.parse_value()?;
        self.expect_end()?;
        Ok(value)
    }

    /// `{a: 1}, b: 2` must not be mistaken for a braced member list
    fn braces_span_input(&self) -> bool {
        let mut depth = 0usize;
        for (index, (token, _)) in self.tokens.iter().enumerate().skip(self.pos) {
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return index == self.tokens.len() - 1;
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn parse_members(&mut self, braced: bool) -> ParseResult<Map<String, Value>> {
        let mut members = Map::new();

        loop {
            if self.is_at_end() || (braced && self.check(&Token::RBrace)) {
                break;
            }

            let key = self.parse_key()?;
            self.expect(Token::Colon)?;
            let value = self.parse_value()?;
            members.insert(key, value);

            if !self.match_token(&Token::Comma) {
                break;
            }
        }

        Ok(members)
    }

    fn parse_key(&mut self) -> ParseResult<String> {
        let pos = self.peek_pos();
        match self.advance() {
            Some((Token::Ident(name), _)) => Ok(name.to_string()),
            Some((Token::Number(n), _)) => Ok(n.to_string()),
            Some((Token::String(s), _)) | Some((Token::SingleQuoteString(s), _)) => {
                unescape(s, pos)
            }
            Some((Token::True, _)) => Ok("true".to_string()),
            Some((Token::False, _)) => Ok("false".to_string()),
            Some((Token::Null, _)) => Ok("null".to_string()),
            Some((token, _)) => Err(ParseError::unexpected_token(pos, "key", token.to_string())),
            None => Err(ParseError::unexpected_eof(pos)),
        }
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        let pos = self.peek_pos();
        let token = match self.advance() {
            Some((token, _)) => token.clone(),
            None => return Err(ParseError::unexpected_eof(pos)),
        };

        match token {
            Token::LBrace => {
                let members = self.parse_members(true)?;
                self.expect(Token::RBrace)?;
                Ok(Value::Object(members))
            }
            Token::LBracket => self.parse_array(),
            Token::True => Ok(Value::Bool(true)),
            Token::False => Ok(Value::Bool(false)),
            Token::Null => Ok(Value::Null),
            Token::Ident(word) => Ok(Value::String(word.to_string())),
            Token::String(s) | Token::SingleQuoteString(s) => Ok(Value::String(unescape(s, pos)?)),
            Token::Number(n) => parse_number(n, pos),
            other => Err(ParseError::unexpected_token(pos, "value", other.to_string())),
        }
    }

    fn parse_array(&mut self) -> ParseResult<Value> {
        let mut items = Vec::new();

        loop {
            if self.check(&Token::RBracket) {
                break;
            }
            items.push(self.parse_value()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }

        self.expect(Token::RBracket)?;
        Ok(Value::Array(items))
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_pos(&self) -> usize {
        self.peek()
            .map(|(_, span)| span.start)
            .unwrap_or(self.source_len)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        match self.peek() {
            Some((t, _)) => std::mem::discriminant(t) == std::mem::discriminant(token),
            None => false,
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(&token) {
            self.advance();
            return Ok(());
        }
        let pos = self.peek_pos();
        match self.peek() {
            Some((found, _)) => Err(ParseError::unexpected_token(
                pos,
                token.to_string(),
                found.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(pos)),
        }
    }

    fn expect_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                "end of input",
                token.to_string(),
            )),
        }
    }
}

fn parse_number(literal: &str, pos: usize) -> ParseResult<Value> {
    if let Ok(integer) = literal.parse::<i64>() {
        return Ok(Value::Number(integer.into()));
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| ParseError::invalid_number(pos, literal))
}

fn unescape(raw: &str, pos: usize) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::invalid_escape(pos, format!("\\u{}", hex)))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => return Err(ParseError::invalid_escape(pos, "\\")),
        }
    }

    Ok(out)
}

/// Parse an attribute value into its member map
pub fn parse_attribute(source: &str) -> ParseResult<Map<String, Value>> {
    Parser::new(source)?.parse_attribute()
}

/// Parse a single relaxed value (`items`, `{target: items}`, `[1, 2]`, `'text'`)
pub fn parse_value(source: &str) -> ParseResult<Value> {
    Parser::new(source)?.parse_single_value()
}
