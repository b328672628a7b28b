use logos::Logos;
use std::fmt;

/// Token type for state bodies.
///
/// The lexer only finds tag boundaries. Tag arguments are kept as raw text
/// and interpreted by the parser, which knows which tag expects what.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Opening `<if EXPR>`; holds the raw expression.
    IfOpen(String),
    /// Closing `</if>`.
    IfClose,
    /// Self-closing inline tag such as `<mod key/>`; holds the name and raw arguments.
    Tag {
        /// Tag name, e.g. `mod`.
        name: String,
        /// Everything between the name and `/>`, trimmed.
        args: String,
    },
    /// Literal text between tags.
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IfOpen(cond) => write!(f, "<if {cond}>"),
            Token::IfClose => write!(f, "</if>"),
            Token::Tag { name, args } if args.is_empty() => write!(f, "<{name}/>"),
            Token::Tag { name, args } => write!(f, "<{name} {args}/>"),
            Token::Text(_) => write!(f, "text"),
        }
    }
}

/// Internal logos token. Converted to owned `Token` after lexing.
#[derive(Logos, Debug)]
enum RawToken {
    #[regex(r"<if[ \t][^>]*>")]
    IfOpen,

    #[token("</if>")]
    IfClose,

    #[regex(r"<(mod|input|mb|money)([ \t][^/>]*)?/>")]
    Tag,

    #[regex(r"[^<]+")]
    Text,

    // A `<` that does not open a known tag is plain text.
    #[token("<")]
    Lt,
}

/// Lex a state body into `(Token, Span)` pairs.
///
/// `base` is the byte offset of `body` within the whole script, so spans point
/// into the input. Adjacent text runs are merged into a single
/// [`Token::Text`]. Every input byte belongs to some token, so lexing cannot fail.
pub fn lex(body: &str, base: usize) -> Vec<(Token, std::ops::Range<usize>)> {
    let mut tokens: Vec<(Token, std::ops::Range<usize>)> = Vec::new();
    let mut lexer = RawToken::lexer(body);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let global = base + span.start..base + span.end;

        let token = match result {
            Ok(RawToken::IfOpen) => Token::IfOpen(slice[3..slice.len() - 1].trim().to_string()),
            Ok(RawToken::IfClose) => Token::IfClose,
            Ok(RawToken::Tag) => {
                let inner = slice[1..slice.len() - 2].trim();
                let (name, args) = inner.split_once([' ', '\t']).unwrap_or((inner, ""));
                Token::Tag {
                    name: name.to_string(),
                    args: args.trim().to_string(),
                }
            }
            Ok(RawToken::Text) | Ok(RawToken::Lt) | Err(()) => {
                if let Some((Token::Text(prev), prev_span)) = tokens.last_mut() {
                    prev.push_str(slice);
                    prev_span.end = global.end;
                    continue;
                }
                Token::Text(slice.to_string())
            }
        };
        tokens.push((token, global));
    }

    tokens
}
