//! Lexer (tokenizer) for source programs
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. `//` line comments and `/* ... */` block comments are skipped.

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that compile errors can
/// report an accurate line and column without a separate token→location
/// table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals and identifiers
    Number(i32, SourceLocation),
    Ident(String, SourceLocation),

    // Keywords
    Begin(SourceLocation),
    End(SourceLocation),
    If(SourceLocation),
    Then(SourceLocation),
    Else(SourceLocation),
    Fi(SourceLocation),
    While(SourceLocation),
    Do(SourceLocation),
    Od(SourceLocation),
    Write(SourceLocation),
    Read(SourceLocation),
    Array(SourceLocation),
    Delete(SourceLocation),

    // Assignment
    Assign(SourceLocation), // :=

    // Arithmetic
    Plus(SourceLocation),  // +
    Minus(SourceLocation), // -
    Star(SourceLocation),  // *
    Slash(SourceLocation), // /

    // Comparison
    Eq(SourceLocation), // =
    Ne(SourceLocation), // != or <>
    Lt(SourceLocation), // <
    Gt(SourceLocation), // >
    Le(SourceLocation), // <=
    Ge(SourceLocation), // >=

    // Array set operators
    Union(SourceLocation),     // |
    Intersect(SourceLocation), // &

    // Punctuation
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;

    // End of input
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::Ident(_, loc)
            | Token::Begin(loc)
            | Token::End(loc)
            | Token::If(loc)
            | Token::Then(loc)
            | Token::Else(loc)
            | Token::Fi(loc)
            | Token::While(loc)
            | Token::Do(loc)
            | Token::Od(loc)
            | Token::Write(loc)
            | Token::Read(loc)
            | Token::Array(loc)
            | Token::Delete(loc)
            | Token::Assign(loc)
            | Token::Plus(loc)
            | Token::Minus(loc)
            | Token::Star(loc)
            | Token::Slash(loc)
            | Token::Eq(loc)
            | Token::Ne(loc)
            | Token::Lt(loc)
            | Token::Gt(loc)
            | Token::Le(loc)
            | Token::Ge(loc)
            | Token::Union(loc)
            | Token::Intersect(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Begin(_) => write!(f, "'begin'"),
            Token::End(_) => write!(f, "'end'"),
            Token::If(_) => write!(f, "'if'"),
            Token::Then(_) => write!(f, "'then'"),
            Token::Else(_) => write!(f, "'else'"),
            Token::Fi(_) => write!(f, "'fi'"),
            Token::While(_) => write!(f, "'while'"),
            Token::Do(_) => write!(f, "'do'"),
            Token::Od(_) => write!(f, "'od'"),
            Token::Write(_) => write!(f, "'write'"),
            Token::Read(_) => write!(f, "'read'"),
            Token::Array(_) => write!(f, "'array'"),
            Token::Delete(_) => write!(f, "'delete'"),
            Token::Assign(_) => write!(f, "':='"),
            Token::Plus(_) => write!(f, "'+'"),
            Token::Minus(_) => write!(f, "'-'"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Slash(_) => write!(f, "'/'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::Ne(_) => write!(f, "'!='"),
            Token::Lt(_) => write!(f, "'<'"),
            Token::Gt(_) => write!(f, "'>'"),
            Token::Le(_) => write!(f, "'<='"),
            Token::Ge(_) => write!(f, "'>='"),
            Token::Union(_) => write!(f, "array operator '|'"),
            Token::Intersect(_) => write!(f, "array operator '&'"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Eof(_) => write!(f, "end of input"),
        }
    }
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for source text
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of input".to_string(),
            location: loc,
        })?;

        match ch {
            '0'..='9' => self.number_literal(ch),

            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier_or_keyword(ch)),

            ':' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Assign(loc))
                } else {
                    Err(LexError {
                        message: "Expected '=' after ':'".to_string(),
                        location: loc,
                    })
                }
            }
            '+' => Ok(Token::Plus(loc)),
            '-' => Ok(Token::Minus(loc)),
            '*' => Ok(Token::Star(loc)),
            '/' => Ok(Token::Slash(loc)),
            '=' => Ok(Token::Eq(loc)),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Ne(loc))
                } else {
                    Err(LexError {
                        message: "Expected '=' after '!'".to_string(),
                        location: loc,
                    })
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Le(loc))
                } else if self.peek() == Some('>') {
                    self.advance();
                    Ok(Token::Ne(loc))
                } else {
                    Ok(Token::Lt(loc))
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Ok(Token::Ge(loc))
                } else {
                    Ok(Token::Gt(loc))
                }
            }
            '|' => Ok(Token::Union(loc)),
            '&' => Ok(Token::Intersect(loc)),
            '(' => Ok(Token::LParen(loc)),
            ')' => Ok(Token::RParen(loc)),
            '[' => Ok(Token::LBracket(loc)),
            ']' => Ok(Token::RBracket(loc)),
            ';' => Ok(Token::Semicolon(loc)),

            _ => Err(LexError {
                message: format!("Unexpected character: '{}'", ch),
                location: loc,
            }),
        }
    }

    /// Parse numeric literal (integers only)
    fn number_literal(&mut self, first_digit: char) -> Result<Token, LexError> {
        let loc = SourceLocation::new(self.line, self.column - 1);
        let mut num_str = String::new();
        num_str.push(first_digit);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let value = num_str.parse::<i32>().map_err(|_| LexError {
            message: format!("Invalid integer literal: {}", num_str),
            location: loc,
        })?;

        Ok(Token::Number(value, loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char) -> Token {
        let loc = SourceLocation::new(self.line, self.column - 1);
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "begin" => Token::Begin(loc),
            "end" => Token::End(loc),
            "if" => Token::If(loc),
            "then" => Token::Then(loc),
            "else" => Token::Else(loc),
            "fi" => Token::Fi(loc),
            "while" => Token::While(loc),
            "do" => Token::Do(loc),
            "od" => Token::Od(loc),
            "write" => Token::Write(loc),
            "read" => Token::Read(loc),
            "array" => Token::Array(loc),
            "delete" => Token::Delete(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance(); // skip '*'
                self.advance(); // skip '/'
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    // ===== Character-level helpers =====

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().expect("lexing failed")
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = tokenize("begin x := 5 end");
        assert!(matches!(tokens[0], Token::Begin(_)));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "x"));
        assert!(matches!(tokens[2], Token::Assign(_)));
        assert!(matches!(tokens[3], Token::Number(5, _)));
        assert!(matches!(tokens[4], Token::End(_)));
        assert!(matches!(tokens[5], Token::Eof(_)));
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = tokenize("= != < > <= >= <>");
        assert!(matches!(tokens[0], Token::Eq(_)));
        assert!(matches!(tokens[1], Token::Ne(_)));
        assert!(matches!(tokens[2], Token::Lt(_)));
        assert!(matches!(tokens[3], Token::Gt(_)));
        assert!(matches!(tokens[4], Token::Le(_)));
        assert!(matches!(tokens[5], Token::Ge(_)));
        // '<>' is an alternate spelling of '!='
        assert!(matches!(tokens[6], Token::Ne(_)));
    }

    #[test]
    fn test_array_set_operators() {
        let tokens = tokenize("z := [ x | y ]");
        assert!(matches!(tokens[2], Token::LBracket(_)));
        assert!(matches!(tokens[4], Token::Union(_)));
        let tokens = tokenize("[ x & y ]");
        assert!(matches!(tokens[2], Token::Intersect(_)));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("begin // comment\n /* block\ncomment */ end");
        assert!(matches!(tokens[0], Token::Begin(_)));
        assert!(matches!(tokens[1], Token::End(_)));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_locations() {
        let tokens = tokenize("begin\n  write(1)\nend");
        assert_eq!(tokens[0].location(), SourceLocation::new(1, 1));
        assert_eq!(tokens[1].location(), SourceLocation::new(2, 3));
        assert_eq!(tokens[2].location(), SourceLocation::new(2, 8));
    }

    #[test]
    fn test_bad_character() {
        let err = Lexer::new("begin ?").tokenize().unwrap_err();
        assert!(err.message.contains("Unexpected character"));
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn test_lone_colon_is_an_error() {
        assert!(Lexer::new("x : 5").tokenize().is_err());
    }

    #[test]
    fn test_integer_overflow() {
        assert!(Lexer::new("99999999999").tokenize().is_err());
    }
}
