//! Parser and serializer for line-oriented, block-structured service
//! configuration text (the `dhcpd.conf` family).
//!
//! The grammar is small: a `;`-terminated statement is a directive, a
//! `keyword name { ... }` span is a block (nested to arbitrary depth), and
//! `#` comment lines and blank runs are opaque spans kept verbatim. Every
//! byte of the input belongs to exactly one item's source span, so
//! serializing an unmodified document reproduces the input byte-for-byte.
//! Items constructed in code carry no source span and render normalized
//! (single-space arguments, four-space nested indent).

use crate::error::Error;

/// One entry of a [`ConfigDocument`] or of a [`Block`] body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Directive(Directive),
    Block(Block),
    /// Comment lines, blank runs and other text preserved verbatim.
    Opaque(String),
}

impl Item {
    fn render(&self, out: &mut String, depth: usize) {
        match self {
            Item::Directive(d) => d.render(out, depth),
            Item::Block(b) => b.render(out, depth),
            Item::Opaque(raw) => out.push_str(raw),
        }
    }
}

/// A single terminated statement: a key and its argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    key: String,
    args: Vec<String>,
    raw: Option<String>,
}

impl Directive {
    /// A directive constructed in code; renders normalized.
    pub fn new(key: &str, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Directive {
            key: key.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            raw: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// True when the directive's leading words equal `words`, e.g.
    /// `["option", "routers"]` matches `option routers 192.168.1.1;`.
    #[must_use]
    pub fn starts_with_words(&self, words: &[&str]) -> bool {
        let mut own = std::iter::once(self.key.as_str()).chain(self.args.iter().map(String::as_str));
        words.iter().all(|w| own.next() == Some(*w))
    }

    fn render(&self, out: &mut String, depth: usize) {
        if let Some(raw) = &self.raw {
            out.push_str(raw);
            return;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        push_indent(out, depth);
        out.push_str(&self.key);
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out.push(';');
    }
}

/// A named, brace-delimited group of nested items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    keyword: String,
    name: String,
    items: Vec<Item>,
    raw_open: Option<String>,
    raw_close: Option<String>,
}

impl Block {
    /// A block constructed in code; renders normalized.
    pub fn new(keyword: &str, name: &str) -> Self {
        Block {
            keyword: keyword.to_string(),
            name: name.to_string(),
            items: Vec::new(),
            raw_open: None,
            raw_close: None,
        }
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The header tokens after the keyword, joined by single spaces.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// First nested directive whose leading words equal `words`.
    #[must_use]
    pub fn directive(&self, words: &[&str]) -> Option<&Directive> {
        self.items.iter().find_map(|item| match item {
            Item::Directive(d) if d.starts_with_words(words) => Some(d),
            _ => None,
        })
    }

    /// Replace the first nested directive matching `words` in place, or
    /// append the replacement at the end of the body. Only the touched
    /// directive loses its original formatting.
    pub fn set_directive(&mut self, words: &[&str], directive: Directive) {
        let pos = self.items.iter().position(|item| {
            matches!(item, Item::Directive(d) if d.starts_with_words(words))
        });
        match pos {
            Some(i) => self.items[i] = Item::Directive(directive),
            None => self.items.push(Item::Directive(directive)),
        }
    }

    fn render(&self, out: &mut String, depth: usize) {
        match &self.raw_open {
            Some(raw) => out.push_str(raw),
            None => {
                if !out.is_empty() {
                    out.push('\n');
                    // blank line between generated top-level blocks
                    if depth == 0 {
                        out.push('\n');
                    }
                }
                push_indent(out, depth);
                out.push_str(&self.keyword);
                if !self.name.is_empty() {
                    out.push(' ');
                    out.push_str(&self.name);
                }
                out.push_str(" {");
            }
        }
        for item in &self.items {
            item.render(out, depth + 1);
        }
        match &self.raw_close {
            Some(raw) => out.push_str(raw),
            None => {
                out.push('\n');
                push_indent(out, depth);
                out.push('}');
            }
        }
    }
}

/// An ordered sequence of top-level items with exact-round-trip
/// serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    items: Vec<Item>,
}

impl ConfigDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config text into a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] with the 1-based line number for an
    /// unterminated directive or block, an unterminated string, or a stray
    /// `}`. A syntax error aborts the whole parse.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut cur = Cursor::new(text);
        let (items, _) = parse_items(&mut cur, None)?;
        Ok(ConfigDocument { items })
    }

    /// Serialize the document. Unmodified items re-emit their source bytes
    /// verbatim; `serialize(parse(text))` equals `text`.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            item.render(&mut out, 0);
        }
        out
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.items
    }

    /// Top-level blocks with the given keyword.
    pub fn blocks<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Block> {
        self.items.iter().filter_map(move |item| match item {
            Item::Block(b) if b.keyword() == keyword => Some(b),
            _ => None,
        })
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { text, pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn consume_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }
}

/// Parse items until end of input (top level) or the enclosing block's `}`.
/// `open_line` is the line the enclosing block opened on, used for the
/// unterminated-block error.
fn parse_items(
    cur: &mut Cursor<'_>,
    open_line: Option<usize>,
) -> Result<(Vec<Item>, Option<String>), Error> {
    let mut items = Vec::new();
    loop {
        let mark = cur.pos;
        cur.skip_trivia();
        match cur.peek() {
            None => {
                if let Some(line) = open_line {
                    return Err(Error::Syntax {
                        line,
                        message: "unterminated block".to_string(),
                    });
                }
                if cur.pos > mark {
                    items.push(Item::Opaque(cur.text[mark..cur.pos].to_string()));
                }
                return Ok((items, None));
            }
            Some('#') => {
                cur.consume_line();
                items.push(Item::Opaque(cur.text[mark..cur.pos].to_string()));
            }
            Some('}') => {
                if open_line.is_none() {
                    return Err(Error::Syntax {
                        line: cur.line,
                        message: "unexpected \"}\"".to_string(),
                    });
                }
                cur.bump();
                return Ok((items, Some(cur.text[mark..cur.pos].to_string())));
            }
            Some(_) => items.push(parse_statement(cur, mark)?),
        }
    }
}

/// Parse one directive or block. `mark` is where the item's source span
/// starts (including the trivia that preceded it).
fn parse_statement(cur: &mut Cursor<'_>, mark: usize) -> Result<Item, Error> {
    let stmt_line = cur.line;
    let stmt_start = cur.pos;
    loop {
        match cur.peek() {
            None => {
                return Err(Error::Syntax {
                    line: stmt_line,
                    message: "directive not terminated with \";\"".to_string(),
                })
            }
            Some('"') => {
                cur.bump();
                loop {
                    match cur.bump() {
                        None => {
                            return Err(Error::Syntax {
                                line: stmt_line,
                                message: "unterminated string".to_string(),
                            })
                        }
                        Some('"') => break,
                        Some(_) => {}
                    }
                }
            }
            Some(';') => {
                let body = &cur.text[stmt_start..cur.pos];
                cur.bump();
                let raw = cur.text[mark..cur.pos].to_string();
                let mut tokens = tokenize(body);
                if tokens.is_empty() {
                    // a bare ";" carries no content; keep it verbatim
                    return Ok(Item::Opaque(raw));
                }
                let key = tokens.remove(0);
                return Ok(Item::Directive(Directive {
                    key,
                    args: tokens,
                    raw: Some(raw),
                }));
            }
            Some('{') => {
                let header = &cur.text[stmt_start..cur.pos];
                cur.bump();
                let raw_open = cur.text[mark..cur.pos].to_string();
                let mut tokens = tokenize(header);
                if tokens.is_empty() {
                    return Err(Error::Syntax {
                        line: stmt_line,
                        message: "block missing keyword".to_string(),
                    });
                }
                let keyword = tokens.remove(0);
                let name = tokens.join(" ");
                let (items, raw_close) = parse_items(cur, Some(stmt_line))?;
                return Ok(Item::Block(Block {
                    keyword,
                    name,
                    items,
                    raw_open: Some(raw_open),
                    raw_close,
                }));
            }
            Some('}') => {
                return Err(Error::Syntax {
                    line: stmt_line,
                    message: "directive not terminated with \";\"".to_string(),
                })
            }
            Some(_) => {
                cur.bump();
            }
        }
    }
}

/// Split statement text into tokens; a quoted string is one token and keeps
/// its quotes.
fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for c in s.chars() {
        if in_string {
            current.push(c);
            if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            current.push(c);
            in_string = true;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
