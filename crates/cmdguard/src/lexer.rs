// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lexer for remediation operation command lines.
//!
//! Tokenizes a single simple command: a program word followed by argument
//! words, with single/double quoting and `$VAR`/`${VAR}` interpolation.
//! Every shell metacharacter a full grammar would treat as an operator
//! (`|`, `&`, `;`, `<`, `>`, `` ` ``, parens, braces, globs) has no token
//! here at all, so encountering one is a lex error, not a later validation
//! failure — remediation commands are never chained, redirected, or
//! substituted.

use super::ast::{QuoteStyle, WordPart};
use super::token::{self, Span, Token, TokenKind};

pub use crate::error::LexerError;

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, chars: input.char_indices().peekable() }
    }

    pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::with_capacity(input.len() / 4 + 1);
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(' ' | '\t' | '\n' | '\r')) {
            self.chars.next();
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        if token::is_disallowed_metacharacter(ch) {
            return Err(LexerError::DisallowedMetacharacter { ch, span: Span::new(pos, pos + ch.len_utf8()) });
        }

        match ch {
            '\'' => Ok(Some(self.lex_single_quote(pos)?)),
            '"' => Ok(Some(self.lex_double_quote(pos)?)),
            '$' => Ok(Some(self.lex_variable(pos)?)),
            _ => Ok(Some(self.lex_word(pos)?)),
        }
    }

    fn lex_word(&mut self, start: usize) -> Result<Token, LexerError> {
        let mut word = String::new();
        let mut end = start;

        while let Some(&(pos, ch)) = self.chars.peek() {
            if token::is_word_boundary(ch) {
                break;
            }
            if token::is_disallowed_metacharacter(ch) {
                return Err(LexerError::DisallowedMetacharacter { ch, span: Span::new(pos, pos + ch.len_utf8()) });
            }
            word.push(ch);
            end = pos + ch.len_utf8();
            self.chars.next();
        }

        Ok(Token::new(TokenKind::Word(word), Span::new(start, end)))
    }

    fn lex_single_quote(&mut self, start: usize) -> Result<Token, LexerError> {
        self.chars.next(); // consume opening '
        let mut value = String::new();
        let mut end = start + 1;

        loop {
            match self.chars.next() {
                Some((pos, '\'')) => {
                    end = pos + 1;
                    break;
                }
                Some((pos, ch)) => {
                    value.push(ch);
                    end = pos + ch.len_utf8();
                }
                None => return Err(LexerError::UnterminatedSingleQuote { span: Span::new(start, end) }),
            }
        }

        Ok(Token::new(TokenKind::SingleQuoted(value), Span::new(start, end)))
    }

    fn lex_double_quote(&mut self, start: usize) -> Result<Token, LexerError> {
        self.chars.next(); // consume opening "
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut end = start + 1;

        loop {
            match self.chars.peek().copied() {
                Some((pos, '"')) => {
                    self.chars.next();
                    end = pos + 1;
                    break;
                }
                Some((_, '\\')) => {
                    self.chars.next();
                    let Some((pos, escaped)) = self.chars.next() else {
                        return Err(LexerError::TrailingBackslash { span: Span::new(start, end) });
                    };
                    let resolved = match escaped {
                        '\\' => '\\',
                        '"' => '"',
                        '$' => '$',
                        'n' => '\n',
                        't' => '\t',
                        other => return Err(LexerError::InvalidEscape { ch: other, span: Span::new(pos, pos + other.len_utf8()) }),
                    };
                    literal.push(resolved);
                    end = pos + escaped.len_utf8();
                }
                Some((_, '$')) => {
                    if !literal.is_empty() {
                        parts.push(WordPart::Literal { value: std::mem::take(&mut literal), quoted: QuoteStyle::Double });
                    }
                    let var_start = self.chars.peek().map(|&(p, _)| p).unwrap_or(end);
                    let var_token = self.lex_variable(var_start)?;
                    end = var_token.span.end;
                    if let TokenKind::Variable { name } = var_token.kind {
                        parts.push(WordPart::Variable { name });
                    }
                }
                Some((pos, ch)) => {
                    self.chars.next();
                    literal.push(ch);
                    end = pos + ch.len_utf8();
                }
                None => return Err(LexerError::UnterminatedDoubleQuote { span: Span::new(start, end) }),
            }
        }

        if !literal.is_empty() || parts.is_empty() {
            parts.push(WordPart::Literal { value: literal, quoted: QuoteStyle::Double });
        }

        Ok(Token::new(TokenKind::DoubleQuoted(parts), Span::new(start, end)))
    }

    /// Lex `$VAR` or `${VAR}`. Called with `$` as the next character.
    fn lex_variable(&mut self, start: usize) -> Result<Token, LexerError> {
        self.chars.next(); // consume $

        let Some(&(name_start, ch)) = self.chars.peek() else {
            return Err(LexerError::EmptyVariable { span: Span::new(start, start + 1) });
        };

        if ch == '{' {
            self.chars.next(); // consume {
            let Some(&(inner_start, first)) = self.chars.peek() else {
                return Err(LexerError::UnterminatedVariable { span: Span::new(start, start + 2) });
            };
            if first == '}' {
                self.chars.next();
                return Err(LexerError::EmptyVariable { span: Span::new(start, start + 3) });
            }
            let name = self.scan_variable_name(inner_start);
            if name.is_empty() || !token::is_valid_variable_name(&name) {
                return Err(LexerError::InvalidVariableName { name, span: Span::new(inner_start, inner_start) });
            }
            match self.chars.next() {
                Some((pos, '}')) => Ok(Token::new(TokenKind::Variable { name }, Span::new(start, pos + 1))),
                _ => Err(LexerError::UnterminatedVariable { span: Span::new(start, inner_start + name.len()) }),
            }
        } else {
            if !token::is_valid_variable_start(ch) {
                return Err(LexerError::EmptyVariable { span: Span::new(start, start + 1) });
            }
            let name = self.scan_variable_name(name_start);
            let end = name_start + name.len();
            Ok(Token::new(TokenKind::Variable { name }, Span::new(start, end)))
        }
    }

    fn scan_variable_name(&mut self, start: usize) -> String {
        let mut end = start;
        while let Some(&(pos, ch)) = self.chars.peek() {
            if !token::is_valid_variable_char(ch) {
                break;
            }
            end = pos + ch.len_utf8();
            self.chars.next();
        }
        self.input[start..end].to_string()
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
