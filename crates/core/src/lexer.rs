use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords; the parser tells them apart
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal, kept as written until the parser converts it
    Float(String),
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// Character offset of the first character of the token.
    pub offset: usize,
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        // String literal, either quote style
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(ParseError::new("unterminated string literal", start));
                }
                let sc = chars[pos];
                if sc == quote {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    if pos >= chars.len() {
                        return Err(ParseError::new("unterminated escape in string", start));
                    }
                    match chars[pos] {
                        '"' => s.push('"'),
                        '\'' => s.push('\''),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                offset: start,
            });
            continue;
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit())
        {
            let mut is_float = false;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < chars.len() && chars[pos] == '.' {
                is_float = true;
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
                let mut look = pos + 1;
                if look < chars.len() && (chars[look] == '+' || chars[look] == '-') {
                    look += 1;
                }
                if look < chars.len() && chars[look].is_ascii_digit() {
                    is_float = true;
                    pos = look;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            if pos < chars.len() && (chars[pos].is_alphabetic() || chars[pos] == '_') {
                return Err(ParseError::new(
                    format!("invalid number literal near '{}'", chars[pos]),
                    start,
                ));
            }
            let s: String = chars[start..pos].iter().collect();
            if is_float {
                tokens.push(Spanned {
                    token: Token::Float(s),
                    offset: start,
                });
            } else {
                let n: i64 = s
                    .parse()
                    .map_err(|_| ParseError::new(format!("invalid integer '{}'", s), start))?;
                tokens.push(Spanned {
                    token: Token::Int(n),
                    offset: start,
                });
            }
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let op = match (c, next) {
            ('=', Some('=')) => Some((Token::Eq, 2)),
            ('=', _) => {
                return Err(ParseError::new(
                    "unexpected '=' (use '==' for equality)",
                    start,
                ))
            }
            ('!', Some('=')) => Some((Token::Neq, 2)),
            ('<', Some('=')) => Some((Token::Lte, 2)),
            ('<', Some('>')) => Some((Token::Neq, 2)),
            ('<', _) => Some((Token::Lt, 1)),
            ('>', Some('=')) => Some((Token::Gte, 2)),
            ('>', _) => Some((Token::Gt, 1)),
            ('+', _) => Some((Token::Plus, 1)),
            ('-', _) => Some((Token::Minus, 1)),
            ('*', _) => Some((Token::Star, 1)),
            ('/', _) => Some((Token::Slash, 1)),
            ('%', _) => Some((Token::Percent, 1)),
            ('(', _) => Some((Token::LParen, 1)),
            (')', _) => Some((Token::RParen, 1)),
            ('[', _) => Some((Token::LBracket, 1)),
            (']', _) => Some((Token::RBracket, 1)),
            (',', _) => Some((Token::Comma, 1)),
            _ => None,
        };
        if let Some((token, width)) = op {
            tokens.push(Spanned {
                token,
                offset: start,
            });
            pos += width;
            continue;
        }

        // Identifier / keyword
        if c.is_alphabetic() || c == '_' {
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                offset: start,
            });
            continue;
        }

        return Err(ParseError::new(
            format!("unexpected character '{}'", c),
            start,
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: chars.len(),
    });
    Ok(tokens)
}
