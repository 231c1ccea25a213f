// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tokenizer for FEEL expressions
//!
//! Produces zero-copy tokens for names and numbers. String and temporal
//! literals are unescaped while scanning. Keywords are recognized through a
//! compile-time perfect hash table.

use phf::phf_map;
use unicode_xid::UnicodeXID;

use super::error::{ParseError, ParseResult};
use super::span::Spanned;

/// Token of a FEEL expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Number literal, parsed on demand (e.g. `42`, `3.14`, `.5`)
    Number(&'input str),
    /// String literal with escapes resolved
    String(String),
    /// Temporal literal `@"..."` with escapes resolved
    TemporalLiteral(String),
    /// Name part; multi-word names are assembled by the parser
    Name(&'input str),

    // Keywords
    True,
    False,
    Null,
    And,
    Or,
    Not,
    If,
    Then,
    Else,
    For,
    In,
    Return,
    Some,
    Every,
    Satisfies,
    Between,
    Instance,
    Of,

    // Operators and punctuation
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `?`, the implicit input of a unary test
    Question,
}

static KEYWORD_TABLE: phf::Map<&'static str, Token<'static>> = phf_map! {
    "true" => Token::True,
    "false" => Token::False,
    "null" => Token::Null,
    "and" => Token::And,
    "or" => Token::Or,
    "not" => Token::Not,
    "if" => Token::If,
    "then" => Token::Then,
    "else" => Token::Else,
    "for" => Token::For,
    "in" => Token::In,
    "return" => Token::Return,
    "some" => Token::Some,
    "every" => Token::Every,
    "satisfies" => Token::Satisfies,
    "between" => Token::Between,
    "instance" => Token::Instance,
    "of" => Token::Of,
};

impl<'input> Token<'input> {
    /// Source text of a word token (name or keyword)
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Name(name) => Some(name),
            Token::True => Some("true"),
            Token::False => Some("false"),
            Token::Null => Some("null"),
            Token::And => Some("and"),
            Token::Or => Some("or"),
            Token::Not => Some("not"),
            Token::If => Some("if"),
            Token::Then => Some("then"),
            Token::Else => Some("else"),
            Token::For => Some("for"),
            Token::In => Some("in"),
            Token::Return => Some("return"),
            Token::Some => Some("some"),
            Token::Every => Some("every"),
            Token::Satisfies => Some("satisfies"),
            Token::Between => Some("between"),
            Token::Instance => Some("instance"),
            Token::Of => Some("of"),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        if let Some(word) = self.word() {
            return word.to_string();
        }
        match self {
            Token::Number(n) => n.to_string(),
            Token::String(s) => format!("{s:?}"),
            Token::TemporalLiteral(s) => format!("@{s:?}"),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::StarStar => "**".into(),
            Token::Slash => "/".into(),
            Token::Equal => "=".into(),
            Token::NotEqual => "!=".into(),
            Token::LessThan => "<".into(),
            Token::LessThanOrEqual => "<=".into(),
            Token::GreaterThan => ">".into(),
            Token::GreaterThanOrEqual => ">=".into(),
            Token::Dot => ".".into(),
            Token::DotDot => "..".into(),
            Token::Comma => ",".into(),
            Token::Colon => ":".into(),
            Token::LeftParen => "(".into(),
            Token::RightParen => ")".into(),
            Token::LeftBracket => "[".into(),
            Token::RightBracket => "]".into(),
            Token::LeftBrace => "{".into(),
            Token::RightBrace => "}".into(),
            Token::Question => "?".into(),
            _ => String::new(),
        }
    }
}

/// Tokenizer over a FEEL expression
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'input str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn is_name_start(c: char) -> bool {
        c == '_' || c.is_xid_start()
    }

    fn is_name_continue(c: char) -> bool {
        c == '_' || c == '?' || c.is_xid_continue()
    }

    fn skip_whitespace_and_comments(&mut self) -> ParseResult<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if trimmed.starts_with("/*") {
                let start = self.pos;
                match trimmed[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(ParseError::UnclosedComment { position: start }),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_number(&mut self) -> Token<'input> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut pos = self.pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
        self.pos = pos;
        Token::Number(&self.input[start..pos])
    }

    fn scan_name(&mut self) -> &'input str {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|(_, c)| !Self::is_name_continue(*c))
            .map_or(self.rest().len(), |(i, _)| i);
        self.pos += len;
        &self.input[start..self.pos]
    }

    fn scan_string(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut out = String::new();
        let mut chars = self.rest().char_indices();

        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => {
                    let escape_pos = self.pos + offset;
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        '\\' => out.push('\\'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => {
                            let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                            let decoded = Some(&hex)
                                .filter(|h| h.len() == 4 && h.chars().all(|c| c.is_ascii_hexdigit()))
                                .and_then(|h| u32::from_str_radix(h, 16).ok())
                                .and_then(char::from_u32);
                            match decoded {
                                Some(c) => out.push(c),
                                None => {
                                    return Err(ParseError::InvalidEscape {
                                        sequence: format!("\\u{hex}"),
                                        position: escape_pos,
                                    });
                                }
                            }
                        }
                        other => {
                            return Err(ParseError::InvalidEscape {
                                sequence: format!("\\{other}"),
                                position: escape_pos,
                            });
                        }
                    }
                }
                c => out.push(c),
            }
        }

        Err(ParseError::UnclosedString { position: start })
    }

    fn operator(&mut self, c: char) -> ParseResult<Token<'input>> {
        let next = self.peek_byte_at(1);
        let (token, len) = match (c, next) {
            ('*', Some(b'*')) => (Token::StarStar, 2),
            ('*', _) => (Token::Star, 1),
            ('!', Some(b'=')) => (Token::NotEqual, 2),
            ('<', Some(b'=')) => (Token::LessThanOrEqual, 2),
            ('<', _) => (Token::LessThan, 1),
            ('>', Some(b'=')) => (Token::GreaterThanOrEqual, 2),
            ('>', _) => (Token::GreaterThan, 1),
            ('.', Some(b'.')) => (Token::DotDot, 2),
            ('.', _) => (Token::Dot, 1),
            ('=', _) => (Token::Equal, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('/', _) => (Token::Slash, 1),
            (',', _) => (Token::Comma, 1),
            (':', _) => (Token::Colon, 1),
            ('(', _) => (Token::LeftParen, 1),
            (')', _) => (Token::RightParen, 1),
            ('[', _) => (Token::LeftBracket, 1),
            (']', _) => (Token::RightBracket, 1),
            ('{', _) => (Token::LeftBrace, 1),
            ('}', _) => (Token::RightBrace, 1),
            ('?', _) => (Token::Question, 1),
            (other, _) => {
                return Err(ParseError::UnexpectedToken {
                    token: other.to_string(),
                    position: self.pos,
                });
            }
        };
        self.pos += len;
        Ok(token)
    }

    /// Read the next token, `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token<'input>>> {
        self.skip_whitespace_and_comments()?;

        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '0'..='9' => self.scan_number(),
            '.' if self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit()) => self.scan_number(),
            '"' => Token::String(self.scan_string()?),
            '@' => {
                let position = self.pos;
                self.pos += 1;
                if self.peek_char() != Some('"') {
                    return Err(ParseError::ExpectedToken {
                        expected: "string after '@'".to_string(),
                        position,
                    });
                }
                Token::TemporalLiteral(self.scan_string()?)
            }
            c if Self::is_name_start(c) => {
                let name = self.scan_name();
                KEYWORD_TABLE
                    .get(name)
                    .cloned()
                    .unwrap_or(Token::Name(name))
            }
            c => self.operator(c)?,
        };

        Ok(Some(token))
    }

    /// Tokenize the whole input with spans
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(32);
        loop {
            self.skip_whitespace_and_comments()?;
            let start = self.pos;
            match self.next_token()? {
                Some(token) => tokens.push(Spanned::new(token, start, self.pos)),
                None => return Ok(tokens),
            }
        }
    }
}

/// Tokenize an expression
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_tokenizer_basic() {
        let mut tokenizer = Tokenizer::new("Applicant.age >= 18");
        assert_eq!(tokenizer.next_token().unwrap().unwrap(), Token::Name("Applicant"));
        assert_eq!(tokenizer.next_token().unwrap().unwrap(), Token::Dot);
        assert_eq!(tokenizer.next_token().unwrap().unwrap(), Token::Name("age"));
        assert_eq!(tokenizer.next_token().unwrap().unwrap(), Token::GreaterThanOrEqual);
        assert_eq!(tokenizer.next_token().unwrap().unwrap(), Token::Number("18"));
        assert_eq!(tokenizer.next_token().unwrap(), None);
    }

    #[test]
    fn test_range_numbers() {
        assert_eq!(
            tokens("[1..10.5]"),
            vec![
                Token::LeftBracket,
                Token::Number("1"),
                Token::DotDot,
                Token::Number("10.5"),
                Token::RightBracket,
            ]
        );
        assert_eq!(tokens(".5"), vec![Token::Number(".5")]);
    }

    #[test]
    fn test_keywords_and_words() {
        let toks = tokens("date and time(x) instance of number");
        assert_eq!(toks[0], Token::Name("date"));
        assert_eq!(toks[1], Token::And);
        assert_eq!(toks[1].word(), Some("and"));
        assert_eq!(toks[5], Token::RightParen);
        assert_eq!(toks[6], Token::Instance);
    }

    #[test]
    fn test_question_mark_in_names() {
        assert_eq!(
            tokens("is valid? and a?b"),
            vec![
                Token::Name("is"),
                Token::Name("valid?"),
                Token::And,
                Token::Name("a?b"),
            ]
        );
        assert_eq!(tokens("? > x"), vec![Token::Question, Token::GreaterThan, Token::Name("x")]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""a\"b\né""#),
            vec![Token::String("a\"b\n\u{e9}".to_string())]
        );
        assert!(matches!(
            tokenize(r#""\q""#),
            Err(ParseError::InvalidEscape { .. })
        ));
        assert_eq!(tokens(r#""\u00e9""#), vec![Token::String("\u{e9}".to_string())]);
        for bad in [r#""\u+123""#, r#""\u-0ff""#, r#""\u12""#] {
            assert!(
                matches!(tokenize(bad), Err(ParseError::InvalidEscape { .. })),
                "{bad} should be rejected"
            );
        }
        assert!(matches!(
            tokenize(r#""open"#),
            Err(ParseError::UnclosedString { position: 0 })
        ));
    }

    #[test]
    fn test_temporal_literal() {
        assert_eq!(
            tokens(r#"@"2020-01-01T10:00@Europe/Berlin""#),
            vec![Token::TemporalLiteral("2020-01-01T10:00@Europe/Berlin".to_string())]
        );
        assert!(tokenize("@2020").is_err());
    }

    #[test]
    fn test_operators_and_comments() {
        assert_eq!(
            tokens("a ** 2 != b // trailing\n/* block */ <= ?"),
            vec![
                Token::Name("a"),
                Token::StarStar,
                Token::Number("2"),
                Token::NotEqual,
                Token::Name("b"),
                Token::LessThanOrEqual,
                Token::Question,
            ]
        );
        assert!(matches!(
            tokenize("1 /* open"),
            Err(ParseError::UnclosedComment { .. })
        ));
        assert!(tokenize("a ! b").is_err());
    }

    #[test]
    fn test_spans() {
        let spanned = tokenize("ab + \"x\"").unwrap();
        assert_eq!((spanned[0].start, spanned[0].end), (0, 2));
        assert_eq!((spanned[1].start, spanned[1].end), (3, 4));
        assert_eq!((spanned[2].start, spanned[2].end), (5, 8));
    }
}
