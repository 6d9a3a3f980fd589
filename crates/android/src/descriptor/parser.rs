//! Statement tree for the Kotlin Gradle DSL subset
//!
//! The grammar covers what app-module build scripts use in practice:
//!
//! ```text
//! statement := path ( '=' expr | '(' args ')' block? | block )
//!            | ( 'import' | 'val' | 'var' ) <tokens to end of line>
//! block     := '{' statement* '}'
//! expr      := primary ( '?:' expr )?
//! primary   := string | integer | 'true' | 'false'
//!            | path ( '(' args ')' | '[' string ']' )?
//! path      := ident ( '.' ident )*
//! ```
//!
//! `import` lines and local `val`/`var` declarations are skipped. Container
//! indexing (`signingConfigs["release"]`) reads as `getByName("release")`.

use super::lexer::{tokenize, Spanned, Token};
use super::{Location, ParseError};

/// Deepest block or expression nesting accepted
pub const MAX_NESTING: usize = 64;

/// An expression on the right-hand side of an assignment or in call arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Bool(bool),
    /// Dotted reference such as `flutter.compileSdkVersion`
    Path(Vec<String>),
    /// Call such as `System.getenv("X")` or `file("key.jks")`
    Call { callee: Vec<String>, args: Vec<Expr> },
    /// Kotlin elvis operator: `lhs ?: rhs`
    Elvis(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// True for a call whose dotted callee equals `name`
    pub fn is_call_to(&self, name: &str) -> bool {
        matches!(self, Expr::Call { callee, .. } if callee.join(".") == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Assign { target: Vec<String>, value: Expr },
    Call { name: Vec<String>, args: Vec<Expr> },
    Block { name: Vec<String>, args: Vec<Expr>, body: Vec<Statement> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub at: Location,
}

impl Statement {
    /// Dotted name of the statement's head
    pub fn name(&self) -> String {
        match &self.kind {
            StatementKind::Assign { target, .. } => target.join("."),
            StatementKind::Call { name, .. } | StatementKind::Block { name, .. } => name.join("."),
        }
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

/// True when a line ending after `token` cannot end the statement
fn continues_line(token: &Token) -> bool {
    matches!(token, Token::Eq | Token::Dot | Token::Elvis | Token::Comma)
        || matches!(token, Token::Punct(c) if !matches!(c, '?' | '!'))
}

impl Parser {
    fn peek(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<Location, ParseError> {
        let next = self.advance();
        if next.token == token {
            Ok(next.at)
        } else {
            Err(ParseError::syntax(
                format!("expected {}, found {}", token.describe(), next.token.describe()),
                next.at,
            ))
        }
    }

    fn descend(&mut self, at: Location) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::nesting_too_deep(MAX_NESTING, at));
        }
        Ok(())
    }

    fn path(&mut self) -> Result<(Vec<String>, Location), ParseError> {
        let first = self.advance();
        let head = match first.token {
            Token::Ident(head) => head,
            other => {
                return Err(ParseError::syntax(
                    format!("expected identifier, found {}", other.describe()),
                    first.at,
                ));
            }
        };
        let mut segments = vec![head];
        while self.peek().token == Token::Dot {
            self.advance();
            let next = self.advance();
            match next.token {
                Token::Ident(seg) => segments.push(seg),
                other => {
                    return Err(ParseError::syntax(
                        format!("expected identifier after `.`, found {}", other.describe()),
                        next.at,
                    ));
                }
            }
        }
        Ok((segments, first.at))
    }

    fn args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::Comma) {
                // trailing comma
                if self.eat(&Token::RParen) {
                    return Ok(args);
                }
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let next = self.peek().clone();
        match next.token {
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::Int(i) => {
                self.advance();
                Ok(Expr::Int(i))
            }
            Token::Ident(_) => {
                let (path, _) = self.path()?;
                if path.len() == 1 && (path[0] == "true" || path[0] == "false") {
                    return Ok(Expr::Bool(path[0] == "true"));
                }
                if self.peek().token == Token::LBracket {
                    return self.index(path);
                }
                if self.peek().token != Token::LParen {
                    return Ok(Expr::Path(path));
                }
                let args = self.args()?;
                if self.peek().token == Token::Dot {
                    return Err(ParseError::unsupported(
                        format!("chained call after `{}(...)`", path.join(".")),
                        self.peek().at,
                    ));
                }
                Ok(Expr::Call { callee: path, args })
            }
            other => Err(ParseError::syntax(
                format!("expected expression, found {}", other.describe()),
                next.at,
            )),
        }
    }

    /// `container["name"]` as `container.getByName("name")`
    fn index(&mut self, mut path: Vec<String>) -> Result<Expr, ParseError> {
        let open = self.expect(Token::LBracket)?;
        let key = self.advance();
        let Token::Str(name) = key.token else {
            return Err(ParseError::unsupported("non-string index", key.at));
        };
        self.expect(Token::RBracket)?;
        if matches!(self.peek().token, Token::Dot | Token::Punct('?') | Token::LBracket) {
            return Err(ParseError::unsupported(
                format!("chained access after `{}[...]`", path.join(".")),
                open,
            ));
        }
        path.push("getByName".to_string());
        Ok(Expr::Call {
            callee: path,
            args: vec![Expr::Str(name)],
        })
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let at = self.peek().at;
        self.descend(at)?;
        let lhs = self.primary()?;
        let out = if self.eat(&Token::Elvis) {
            let rhs = self.expr()?;
            Expr::Elvis(Box::new(lhs), Box::new(rhs))
        } else {
            lhs
        };
        self.depth -= 1;
        Ok(out)
    }

    fn block_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        let open = self.expect(Token::LBrace)?;
        self.descend(open)?;
        let mut body = Vec::new();
        loop {
            match self.peek().token {
                Token::RBrace => {
                    self.advance();
                    self.depth -= 1;
                    return Ok(body);
                }
                Token::Eof => return Err(ParseError::syntax("unclosed `{`", open)),
                _ => body.extend(self.statement()?),
            }
        }
    }

    /// Consume tokens up to the end of the current logical line
    ///
    /// Brackets are balanced along the way, so a declaration spanning several
    /// lines inside `(...)` or `{...}` is skipped whole. A closing brace at
    /// depth zero belongs to the enclosing block and is left in place.
    fn skip_line(&mut self, start: Location) -> Result<(), ParseError> {
        let mut open: Vec<(Token, Location)> = Vec::new();
        let mut last = self.advance();
        loop {
            let next = self.peek().clone();
            if open.is_empty() {
                let ends_line = next.at.line > last.at.line
                    && !continues_line(&last.token)
                    && !matches!(next.token, Token::Dot | Token::Elvis);
                if ends_line || matches!(next.token, Token::Eof | Token::RBrace) {
                    return Ok(());
                }
            }
            let closer = match next.token {
                Token::LParen => Some(Token::RParen),
                Token::LBracket => Some(Token::RBracket),
                Token::LBrace => Some(Token::RBrace),
                _ => None,
            };
            if let Some(closer) = closer {
                open.push((closer, next.at));
            } else if matches!(next.token, Token::RParen | Token::RBracket | Token::RBrace) {
                match open.pop() {
                    Some((expected, _)) if expected == next.token => {}
                    _ => {
                        return Err(ParseError::syntax(
                            format!("unmatched {}", next.token.describe()),
                            next.at,
                        ));
                    }
                }
            } else if next.token == Token::Eof {
                let at = open.last().map_or(start, |(_, at)| *at);
                return Err(ParseError::syntax("unclosed bracket", at));
            }
            last = self.advance();
        }
    }

    fn statement(&mut self) -> Result<Option<Statement>, ParseError> {
        if let Token::Ident(head) = &self.peek().token {
            if matches!(head.as_str(), "import" | "val" | "var") {
                let head = head.clone();
                let at = self.peek().at;
                self.skip_line(at)?;
                tracing::debug!(keyword = %head, at = %at, "Skipping declaration");
                return Ok(None);
            }
        }
        let (name, at) = self.path()?;
        let next = self.peek().clone();
        let kind = match next.token {
            Token::Eq => {
                self.advance();
                StatementKind::Assign {
                    target: name,
                    value: self.expr()?,
                }
            }
            Token::LParen => {
                let args = self.args()?;
                if self.peek().token == Token::LBrace {
                    StatementKind::Block {
                        name,
                        args,
                        body: self.block_body()?,
                    }
                } else {
                    StatementKind::Call { name, args }
                }
            }
            Token::LBrace => StatementKind::Block {
                name,
                args: Vec::new(),
                body: self.block_body()?,
            },
            other => {
                return Err(ParseError::syntax(
                    format!(
                        "expected `=`, `(` or `{{` after `{}`, found {}",
                        name.join("."),
                        other.describe()
                    ),
                    next.at,
                ));
            }
        };
        Ok(Some(Statement { kind, at }))
    }
}

/// Parse descriptor text into top-level statements
pub fn parse_document(source: &str) -> Result<Vec<Statement>, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        depth: 0,
    };
    let mut statements = Vec::new();
    while parser.peek().token != Token::Eof {
        if parser.peek().token == Token::RBrace {
            return Err(ParseError::syntax("unmatched `}`", parser.peek().at));
        }
        statements.extend(parser.statement()?);
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_blocks() {
        let doc = parse_document(
            r#"
            android {
                defaultConfig {
                    minSdk = 21
                }
            }
            "#,
        )
        .unwrap();
        assert_eq!(doc.len(), 1);
        let StatementKind::Block { body, .. } = &doc[0].kind else {
            panic!("expected block");
        };
        let StatementKind::Block { name, body, .. } = &body[0].kind else {
            panic!("expected nested block");
        };
        assert_eq!(name, &vec!["defaultConfig".to_string()]);
        assert_eq!(
            body[0].kind,
            StatementKind::Assign {
                target: vec!["minSdk".into()],
                value: Expr::Int(21)
            }
        );
    }

    #[test]
    fn test_elvis_expression() {
        let doc = parse_document(r#"storePassword = System.getenv("STORE_PW") ?: "temp123""#).unwrap();
        let StatementKind::Assign { value, .. } = &doc[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Elvis(lhs, rhs) = value else {
            panic!("expected elvis");
        };
        assert!(lhs.is_call_to("System.getenv"));
        assert_eq!(**rhs, Expr::Str("temp123".into()));
    }

    #[test]
    fn test_call_statement_with_multiple_args() {
        let doc = parse_document(
            r#"proguardFiles(getDefaultProguardFile("proguard-android-optimize.txt"), "proguard-rules.pro",)"#,
        )
        .unwrap();
        let StatementKind::Call { name, args } = &doc[0].kind else {
            panic!("expected call");
        };
        assert_eq!(name.join("."), "proguardFiles");
        assert_eq!(args.len(), 2);
        assert!(args[0].is_call_to("getDefaultProguardFile"));
    }

    #[test]
    fn test_named_block_with_args() {
        let doc = parse_document(r#"create("staging") { isDebuggable = false }"#).unwrap();
        let StatementKind::Block { args, body, .. } = &doc[0].kind else {
            panic!("expected block");
        };
        assert_eq!(args, &vec![Expr::Str("staging".into())]);
        assert_eq!(
            body[0].kind,
            StatementKind::Assign {
                target: vec!["isDebuggable".into()],
                value: Expr::Bool(false)
            }
        );
    }

    #[test]
    fn test_method_call_on_path() {
        let doc = parse_document("jvmTarget = JavaVersion.VERSION_11.toString()").unwrap();
        let StatementKind::Assign { value, .. } = &doc[0].kind else {
            panic!("expected assignment");
        };
        assert!(value.is_call_to("JavaVersion.VERSION_11.toString"));
    }

    #[test]
    fn test_unclosed_block_reports_open_brace() {
        let err = parse_document("android {\n  minSdk = 21\n").unwrap_err();
        assert_eq!(err.location, Some(Location::new(1, 9)));
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn test_missing_operator() {
        let err = parse_document("minSdk 21").unwrap_err();
        assert!(err.message.contains("after `minSdk`"));
        assert_eq!(err.location, Some(Location::new(1, 8)));
    }

    #[test]
    fn test_unmatched_close_brace() {
        let err = parse_document("}").unwrap_err();
        assert!(err.message.contains("unmatched"));
    }

    #[test]
    fn test_chained_call_rejected() {
        let err = parse_document(r#"x = foo("a").bar"#).unwrap_err();
        assert!(err.message.contains("chained call"));
    }

    #[test]
    fn test_nesting_limit_on_blocks() {
        let ok = format!("{}{}", "a {".repeat(MAX_NESTING), "}".repeat(MAX_NESTING));
        assert_eq!(parse_document(&ok).unwrap().len(), 1);

        let depth = 20_000;
        let deep = format!("{}{}", "a {".repeat(depth), "}".repeat(depth));
        let err = parse_document(&deep).unwrap_err();
        assert_eq!(err.kind, super::super::ParseErrorKind::LimitExceeded);
        assert!(err.message.contains("nesting too deep"));
        assert_eq!(err.location, Some(Location::new(1, 3 * MAX_NESTING + 3)));
    }

    #[test]
    fn test_nesting_limit_on_elvis_chain() {
        let chain = vec![r#"System.getenv("X")"#; 10_000].join(" ?: ");
        let err = parse_document(&format!("storePassword = {}", chain)).unwrap_err();
        assert_eq!(err.kind, super::super::ParseErrorKind::LimitExceeded);

        let nested_calls = format!("x = {}1{}", "f(".repeat(10_000), ")".repeat(10_000));
        let err = parse_document(&nested_calls).unwrap_err();
        assert!(err.message.contains("nesting too deep"));
    }

    #[test]
    fn test_import_and_local_declarations_are_skipped() {
        let doc = parse_document(
            r#"
            import java.util.Properties
            import java.io.FileInputStream

            val keystoreProperties = Properties()
            val keystorePropertiesFile: File = rootProject.file("key.properties")
            var flavor =
                "prod"
            val names = listOf(
                "a",
                "b",
            )

            android {
                val local = keystoreProperties["storeFile"] as String?
                compileSdk = 34
            }
            "#,
        )
        .unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc[0].name(), "android");
        let StatementKind::Block { body, .. } = &doc[0].kind else {
            panic!("expected block");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].name(), "compileSdk");
    }

    #[test]
    fn test_declaration_with_unclosed_bracket() {
        let err = parse_document("val x = listOf(\n  \"a\",\n").unwrap_err();
        assert!(err.message.contains("unclosed"));
        assert_eq!(err.location, Some(Location::new(1, 15)));
    }

    #[test]
    fn test_index_reads_as_get_by_name() {
        let doc = parse_document(r#"signingConfig = signingConfigs["release"]"#).unwrap();
        let StatementKind::Assign { value, .. } = &doc[0].kind else {
            panic!("expected assignment");
        };
        assert!(value.is_call_to("signingConfigs.getByName"));
        let Expr::Call { args, .. } = value else {
            panic!("expected call");
        };
        assert_eq!(args, &vec![Expr::Str("release".into())]);
    }

    #[test]
    fn test_operator_in_known_key_is_rejected() {
        let err = parse_document("minSdk = 21 + 1").unwrap_err();
        assert!(err.message.contains("`+`"));
    }
}
