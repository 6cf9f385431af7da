//! Tokenizer for predicate expressions.

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    True,
    False,
    LParen,
    RParen,
    Comma,
    Dot,
    And,
    Or,
    Not,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
}

impl TokenKind {
    /// Short description for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Number(n) => format!("number {n}"),
            Self::True => "`true`".into(),
            Self::False => "`false`".into(),
            Self::LParen => "`(`".into(),
            Self::RParen => "`)`".into(),
            Self::Comma => "`,`".into(),
            Self::Dot => "`.`".into(),
            Self::And => "`&&`".into(),
            Self::Or => "`||`".into(),
            Self::Not => "`!`".into(),
            Self::Minus => "`-`".into(),
            Self::Eq => "`==`".into(),
            Self::Ne => "`!=`".into(),
            Self::Lt => "`<`".into(),
            Self::Le => "`<=`".into(),
            Self::Gt => "`>`".into(),
            Self::Ge => "`>=`".into(),
            Self::Match => "`=~`".into(),
            Self::NotMatch => "`!~`".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Character offset of the token's first character.
    pub pos: usize,
}

/// Split an expression into tokens.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let two = chars.get(i + 1).copied();
        let kind = match (c, two) {
            ('(', _) => TokenKind::LParen,
            (')', _) => TokenKind::RParen,
            (',', _) => TokenKind::Comma,
            ('.', _) => TokenKind::Dot,
            ('-', _) => TokenKind::Minus,
            ('&', Some('&')) => TokenKind::And,
            ('|', Some('|')) => TokenKind::Or,
            ('=', Some('=')) => TokenKind::Eq,
            ('=', Some('~')) => TokenKind::Match,
            ('!', Some('=')) => TokenKind::Ne,
            ('!', Some('~')) => TokenKind::NotMatch,
            ('!', _) => TokenKind::Not,
            ('<', Some('=')) => TokenKind::Le,
            ('<', _) => TokenKind::Lt,
            ('>', Some('=')) => TokenKind::Ge,
            ('>', _) => TokenKind::Gt,
            ('=', _) => return Err(CompileError::new(start, "unexpected `=`, use `==`")),
            ('&', _) => return Err(CompileError::new(start, "unexpected `&`, use `&&`")),
            ('|', _) => return Err(CompileError::new(start, "unexpected `|`, use `||`")),
            ('\'' | '"', _) => {
                let (s, end) = lex_string(&chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Str(s),
                    pos: start,
                });
                i = end;
                continue;
            }
            (d, _) if d.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| CompileError::new(start, format!("invalid number `{text}`")))?;
                tokens.push(Token {
                    kind: TokenKind::Number(n),
                    pos: start,
                });
                continue;
            }
            (a, _) if a.is_alphabetic() || a == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let kind = match word.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    _ => TokenKind::Ident(word),
                };
                tokens.push(Token { kind, pos: start });
                continue;
            }
            (other, _) => {
                return Err(CompileError::new(
                    start,
                    format!("unexpected character `{other}`"),
                ))
            }
        };

        i += match kind {
            TokenKind::And
            | TokenKind::Or
            | TokenKind::Eq
            | TokenKind::Ne
            | TokenKind::Le
            | TokenKind::Ge
            | TokenKind::Match
            | TokenKind::NotMatch => 2,
            _ => 1,
        };
        tokens.push(Token { kind, pos: start });
    }

    Ok(tokens)
}

/// Read a quoted string starting at `start`; returns the text and the index past the closing quote.
fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), CompileError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((out, i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| CompileError::new(i, "unterminated escape"))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(CompileError::new(start, "unterminated string"))
}
