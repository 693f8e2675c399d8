//! Hand-rolled lexer with byte-accurate spans.
//!
//! Skips whitespace, `//` line comments, and `/* */` block comments.
//! Strings accept single or double quotes with the usual escapes.

use crate::parser::SyntaxError;
use crate::token::{Span, Token, TokenKind};

/// Tokenizes a whole source text, ending with an `Eof` token whose span
/// sits at the end of the input.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_trivia()?;

        let start = self.pos;
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
        };

        let kind = match byte {
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semi),
            b'.' => self.single(TokenKind::Dot),
            b'%' => self.single(TokenKind::Percent),
            b'+' => {
                if self.peek_at(1) == Some(b'+') {
                    self.advance_n(2, TokenKind::PlusPlus)
                } else if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::PlusAssign)
                } else {
                    self.single(TokenKind::Plus)
                }
            }
            b'-' => {
                if self.peek_at(1) == Some(b'-') {
                    self.advance_n(2, TokenKind::MinusMinus)
                } else if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::MinusAssign)
                } else {
                    self.single(TokenKind::Minus)
                }
            }
            b'*' => {
                if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::StarAssign)
                } else {
                    self.single(TokenKind::Star)
                }
            }
            b'/' => {
                if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::SlashAssign)
                } else {
                    self.single(TokenKind::Slash)
                }
            }
            b'=' => {
                if self.peek_at(1) == Some(b'=') && self.peek_at(2) == Some(b'=') {
                    self.advance_n(3, TokenKind::EqEqEq)
                } else if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::EqEq)
                } else {
                    self.single(TokenKind::Assign)
                }
            }
            b'!' => {
                if self.peek_at(1) == Some(b'=') && self.peek_at(2) == Some(b'=') {
                    self.advance_n(3, TokenKind::NotEqEq)
                } else if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::NotEq)
                } else {
                    self.single(TokenKind::Bang)
                }
            }
            b'<' => {
                if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::Le)
                } else {
                    self.single(TokenKind::Lt)
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'=') {
                    self.advance_n(2, TokenKind::Ge)
                } else {
                    self.single(TokenKind::Gt)
                }
            }
            b'&' => {
                if self.peek_at(1) == Some(b'&') {
                    self.advance_n(2, TokenKind::AndAnd)
                } else {
                    return Err(self.error(start, "unexpected character '&'"));
                }
            }
            b'|' => {
                if self.peek_at(1) == Some(b'|') {
                    self.advance_n(2, TokenKind::OrOr)
                } else {
                    return Err(self.error(start, "unexpected character '|'"));
                }
            }
            b'"' | b'\'' => self.lex_string(byte)?,
            b'0'..=b'9' => self.lex_number()?,
            b if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => self.lex_ident_or_keyword(),
            other => {
                let ch = self.source[start..].chars().next().unwrap_or(other as char);
                return Err(self.error(start, format!("unexpected character '{ch}'")));
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(&b) = self.bytes.get(self.pos) {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let open = self.pos;
                    self.pos += 2;
                    loop {
                        match self.bytes.get(self.pos) {
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(_) => self.pos += 1,
                            None => return Err(self.error(open, "unterminated block comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn advance_n(&mut self, n: usize, kind: TokenKind) -> TokenKind {
        self.pos += n;
        kind
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.bytes.get(self.pos) {
                None | Some(b'\n') => return Err(self.error(open, "unterminated string literal")),
                Some(&b) if b == quote => {
                    self.pos += 1;
                    return Ok(TokenKind::Str(value));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let escaped = match self.bytes.get(self.pos) {
                        Some(b'n') => '\n',
                        Some(b't') => '\t',
                        Some(b'r') => '\r',
                        Some(b'\\') => '\\',
                        Some(b'\'') => '\'',
                        Some(b'"') => '"',
                        Some(b'0') => '\0',
                        _ => return Err(self.error(self.pos, "invalid escape sequence")),
                    };
                    value.push(escaped);
                    self.pos += 1;
                }
                Some(_) => {
                    // Consume a full UTF-8 character, not a single byte.
                    let ch = self.source[self.pos..].chars().next().unwrap();
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.bytes.get(self.pos) == Some(&b'.')
            && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit())
        {
            self.pos += 1;
            while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = &self.source[start..self.pos];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(start, format!("invalid number literal '{text}'")))
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(
            self.bytes.get(self.pos),
            Some(b) if b.is_ascii_alphanumeric() || *b == b'_' || *b == b'$'
        ) {
            self.pos += 1;
        }
        match &self.source[start..self.pos] {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            name => TokenKind::Ident(name.to_string()),
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(self.source, offset, message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_declaration_with_array_literal() {
        assert_eq!(
            kinds("let a = [2, 1];"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("a".to_string()),
                TokenKind::Assign,
                TokenKind::LBracket,
                TokenKind::Number(2.0),
                TokenKind::Comma,
                TokenKind::Number(1.0),
                TokenKind::RBracket,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_assignment_and_equality_operators() {
        assert_eq!(
            kinds("= == === != !=="),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::EqEqEq,
                TokenKind::NotEq,
                TokenKind::NotEqEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_increment_and_compound_assignment() {
        assert_eq!(
            kinds("i++ x += 1"),
            vec![
                TokenKind::Ident("i".to_string()),
                TokenKind::PlusPlus,
                TokenKind::Ident("x".to_string()),
                TokenKind::PlusAssign,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        assert_eq!(
            kinds("1 // comment\n/* block\n comment */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn string_escapes_and_both_quote_styles() {
        assert_eq!(
            kinds(r#""a\n" 'b\'c'"#),
            vec![
                TokenKind::Str("a\n".to_string()),
                TokenKind::Str("b'c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn spans_are_byte_accurate() {
        let tokens = tokenize("let ab = 12;").unwrap();
        assert_eq!(tokens[1].span, Span::new(4, 6)); // ab
        assert_eq!(tokens[3].span, Span::new(9, 11)); // 12
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("'oops").unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn fractional_numbers() {
        assert_eq!(kinds("3.25"), vec![TokenKind::Number(3.25), TokenKind::Eof]);
    }
}
