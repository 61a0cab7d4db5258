//! Reader for the DOT documents Graphviz writes back in `-Txdot` mode.
//!
//! Only the subset `dot` actually emits is handled: one (di)graph with
//! attribute, node and edge statements, optionally nested in subgraphs.

use std::collections::BTreeMap;

use crate::LayoutError;

pub type Attrs = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Node { id: String, attrs: Attrs },
    Edge { from: String, to: String, attrs: Attrs },
}

/// A parsed xdot document: the merged graph attributes plus node and edge
/// statements in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XdotDocument {
    pub graph: Attrs,
    pub statements: Vec<Statement>,
}

pub fn parse_xdot(src: &str) -> Result<XdotDocument, LayoutError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        doc: XdotDocument::default(),
    };
    parser.document()?;
    Ok(parser.doc)
}

// ── Tokens ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Id(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Comma,
    Semi,
    Colon,
    Arrow,
}

fn parse_error(msg: impl Into<String>) -> LayoutError {
    LayoutError::Parse(msg.into())
}

fn tokenize(src: &str) -> Result<Vec<Token>, LayoutError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line_start = true;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line_start = true;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // `#` lines are preprocessor output and ignored.
        if c == '#' && line_start {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        line_start = false;

        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Equals);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '-' if matches!(chars.get(i + 1), Some('>') | Some('-')) => {
                tokens.push(Token::Arrow);
                i += 2;
            }
            '"' => {
                let (text, next) = quoted(&chars, i + 1)?;
                i = next;
                tokens.push(Token::Id(text));
            }
            '+' => {
                // `"a" + "b"` concatenates quoted strings.
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                if chars.get(i) != Some(&'"') {
                    return Err(parse_error("`+` must be followed by a quoted string"));
                }
                let (text, next) = quoted(&chars, i + 1)?;
                i = next;
                match tokens.last_mut() {
                    Some(Token::Id(prev)) => prev.push_str(&text),
                    _ => return Err(parse_error("`+` must follow a quoted string")),
                }
            }
            '<' => {
                let (text, next) = html(&chars, i)?;
                i = next;
                tokens.push(Token::Id(text));
            }
            c if is_id_char(c) || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && is_id_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Id(chars[start..i].iter().collect()));
            }
            other => return Err(parse_error(format!("unexpected character {other:?}"))),
        }
    }

    Ok(tokens)
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || !c.is_ascii()
}

/// Reads a quoted string whose opening quote sits just before `start`.
/// Returns the text and the index after the closing quote.
fn quoted(chars: &[char], start: usize) -> Result<(String, usize), LayoutError> {
    let mut out = String::new();
    let mut i = start;
    loop {
        match chars.get(i) {
            None => return Err(parse_error("unterminated quoted string")),
            Some('"') => return Ok((out, i + 1)),
            Some('\\') => match chars.get(i + 1) {
                Some('"') => {
                    out.push('"');
                    i += 2;
                }
                // Line continuation.
                Some('\n') => i += 2,
                Some('\r') if chars.get(i + 2) == Some(&'\n') => i += 3,
                Some(other) => {
                    out.push('\\');
                    out.push(*other);
                    i += 2;
                }
                None => return Err(parse_error("unterminated quoted string")),
            },
            Some(c) => {
                out.push(*c);
                i += 1;
            }
        }
    }
}

/// Reads a `<...>` HTML string with balanced angle brackets, keeping the
/// inner text.
fn html(chars: &[char], start: usize) -> Result<(String, usize), LayoutError> {
    let mut depth = 0usize;
    let mut i = start;
    while let Some(c) = chars.get(i) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    let text = chars[start + 1..i].iter().collect();
                    return Ok((text, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(parse_error("unterminated html string"))
}

// ── Statements ──────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    doc: XdotDocument,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, want: Token) -> Result<(), LayoutError> {
        match self.next() {
            Some(token) if token == want => Ok(()),
            Some(token) => Err(parse_error(format!("expected {want:?}, found {token:?}"))),
            None => Err(parse_error(format!("expected {want:?}, found end of input"))),
        }
    }

    fn id(&mut self) -> Result<String, LayoutError> {
        match self.next() {
            Some(Token::Id(id)) => Ok(id),
            Some(token) => Err(parse_error(format!("expected identifier, found {token:?}"))),
            None => Err(parse_error("expected identifier, found end of input")),
        }
    }

    fn keyword_is(&self, offset: usize, word: &str) -> bool {
        matches!(self.peek_at(offset), Some(Token::Id(id)) if id.eq_ignore_ascii_case(word))
    }

    fn document(&mut self) -> Result<(), LayoutError> {
        if self.keyword_is(0, "strict") {
            self.pos += 1;
        }
        if self.keyword_is(0, "digraph") || self.keyword_is(0, "graph") {
            self.pos += 1;
        } else {
            return Err(parse_error("expected `digraph` or `graph`"));
        }
        if matches!(self.peek(), Some(Token::Id(_))) {
            self.pos += 1;
        }
        self.expect(Token::LBrace)?;
        self.statement_list()
    }

    /// Statements up to and including the closing brace.
    fn statement_list(&mut self) -> Result<(), LayoutError> {
        loop {
            match self.peek() {
                None => return Err(parse_error("missing closing brace")),
                Some(Token::RBrace) => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(Token::Semi) => self.pos += 1,
                _ => self.statement()?,
            }
        }
    }

    fn statement(&mut self) -> Result<(), LayoutError> {
        if self.keyword_is(0, "subgraph") {
            self.pos += 1;
            if matches!(self.peek(), Some(Token::Id(_))) {
                self.pos += 1;
            }
            self.expect(Token::LBrace)?;
            return self.statement_list();
        }
        if self.peek() == Some(&Token::LBrace) {
            self.pos += 1;
            return self.statement_list();
        }

        let is_attr_stmt = matches!(self.peek_at(1), Some(Token::LBracket))
            && (self.keyword_is(0, "graph") || self.keyword_is(0, "node") || self.keyword_is(0, "edge"));
        if is_attr_stmt {
            let kind = self.id()?.to_ascii_lowercase();
            let attrs = self.attr_lists()?;
            if kind == "graph" {
                self.doc.graph.extend(attrs);
            }
            return Ok(());
        }

        let first = self.node_id()?;
        if self.peek() == Some(&Token::Equals) {
            self.pos += 1;
            let value = self.id()?;
            self.doc.graph.insert(first, value);
            return Ok(());
        }

        let mut chain = vec![first];
        while self.peek() == Some(&Token::Arrow) {
            self.pos += 1;
            chain.push(self.node_id()?);
        }
        let attrs = self.attr_lists()?;

        if chain.len() == 1 {
            let id = chain.remove(0);
            self.doc.statements.push(Statement::Node { id, attrs });
        } else {
            for pair in chain.windows(2) {
                self.doc.statements.push(Statement::Edge {
                    from: pair[0].clone(),
                    to: pair[1].clone(),
                    attrs: attrs.clone(),
                });
            }
        }
        Ok(())
    }

    /// A node id, dropping any `:port[:compass]` suffix.
    fn node_id(&mut self) -> Result<String, LayoutError> {
        let id = self.id()?;
        while self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            self.id()?;
        }
        Ok(id)
    }

    fn attr_lists(&mut self) -> Result<Attrs, LayoutError> {
        let mut attrs = Attrs::new();
        while self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            loop {
                match self.peek() {
                    Some(Token::RBracket) => {
                        self.pos += 1;
                        break;
                    }
                    Some(Token::Comma) | Some(Token::Semi) => self.pos += 1,
                    _ => {
                        let key = self.id()?;
                        self.expect(Token::Equals)?;
                        let value = self.id()?;
                        attrs.insert(key, value);
                    }
                }
            }
        }
        Ok(attrs)
    }
}

/// Parses a comma-separated list of floats, as in `bb` or `pos`.
pub(crate) fn parse_floats(value: &str) -> Result<Vec<f64>, LayoutError> {
    value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| parse_error(format!("bad number {part:?}: {e}")))
        })
        .collect()
}
