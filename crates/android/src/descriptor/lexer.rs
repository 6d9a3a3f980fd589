//! Tokenizer for the Kotlin Gradle DSL subset

use super::{Location, ParseError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eq,
    Elvis,
    /// Operator character outside the assignment subset (`+`, `!`, `:`, ...)
    Punct(char),
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier `{}`", s),
            Token::Str(_) => "string literal".to_string(),
            Token::Int(i) => format!("integer `{}`", i),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Dot => "`.`".to_string(),
            Token::Eq => "`=`".to_string(),
            Token::Elvis => "`?:`".to_string(),
            Token::Punct(c) => format!("`{}`", c),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub at: Location,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn here(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next()
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ';' => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(ParseError::syntax("unterminated block comment", start));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn string(&mut self, start: Location) -> Result<Token, ParseError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::Str(out)),
                Some('\\') => {
                    let esc = self.here();
                    match self.bump() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some(c @ ('\\' | '"' | '\'' | '$')) => out.push(c),
                        Some(c) => {
                            return Err(ParseError::syntax(
                                format!("unsupported escape sequence `\\{}`", c),
                                esc,
                            ));
                        }
                        None => return Err(ParseError::syntax("unterminated string literal", start)),
                    }
                }
                Some('\n') | None => {
                    return Err(ParseError::syntax("unterminated string literal", start));
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self, start: Location) -> Result<Token, ParseError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    digits.push(c);
                }
                self.bump();
            } else {
                break;
            }
        }
        // Kotlin long suffix
        if self.peek() == Some('L') {
            self.bump();
        }
        digits
            .parse()
            .map(Token::Int)
            .map_err(|_| ParseError::syntax(format!("integer literal `{}` out of range", digits), start))
    }

    fn ident(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Ident(name)
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_trivia()?;
        let at = self.here();
        let token = match self.peek() {
            None => Token::Eof,
            Some('"') => self.string(at)?,
            Some(c) if c.is_ascii_digit() => self.number(at)?,
            Some(c) if c.is_alphabetic() || c == '_' => self.ident(),
            Some('?') => {
                self.bump();
                if self.peek() == Some(':') {
                    self.bump();
                    Token::Elvis
                } else {
                    Token::Punct('?')
                }
            }
            Some(c) => {
                self.bump();
                match c {
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    '=' => Token::Eq,
                    ':' | '!' | '+' | '-' | '*' | '/' | '<' | '>' | '&' | '|' | '%' | '@' => Token::Punct(c),
                    other => {
                        return Err(ParseError::syntax(format!("unexpected character `{}`", other), at));
                    }
                }
            }
        };
        Ok(Spanned { token, at })
    }
}

/// Split descriptor text into tokens, ending with [`Token::Eof`]
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("minSdk = 21"),
            vec![
                Token::Ident("minSdk".into()),
                Token::Eq,
                Token::Int(21),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("// line\nminSdk /* inline */ = 21 // trailing");
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_windows_path_escapes() {
        let tokens = kinds(r#"file("C:\\Users\\dev\\key.jks")"#);
        assert_eq!(tokens[2], Token::Str(r"C:\Users\dev\key.jks".into()));
    }

    #[test]
    fn test_elvis_operator() {
        let tokens = kinds(r#"System.getenv("X") ?: "temp123""#);
        assert!(tokens.contains(&Token::Elvis));
    }

    #[test]
    fn test_locations_track_lines() {
        let tokens = tokenize("android {\n    namespace = \"a.b\"\n}").unwrap();
        assert_eq!(tokens[2].at, Location::new(2, 5));
        assert_eq!(tokens[5].at, Location::new(3, 1));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("namespace = \"com.example").unwrap_err();
        assert_eq!(err.location, Some(Location::new(1, 13)));
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("minSdk = 21 # 1").unwrap_err();
        assert!(err.message.contains("`#`"));
        assert_eq!(err.location, Some(Location::new(1, 13)));
    }

    #[test]
    fn test_kotlin_operators_tokenize() {
        let tokens = kinds(r#"keystoreProperties["storeFile"] as String?"#);
        assert_eq!(tokens[1], Token::LBracket);
        assert_eq!(tokens[3], Token::RBracket);
        assert_eq!(tokens[6], Token::Punct('?'));
        assert_eq!(kinds("a: Int")[1], Token::Punct(':'));
    }
}
