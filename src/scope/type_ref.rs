//! Written type references
//!
//! Types are kept in the shape they were written in source (`List<Order>`,
//! `int?[]`, `global::Shop.Order`) and resolved against the scope graph on
//! demand.

use std::fmt;

/// C# keywords that name built-in types
pub const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "nint", "nuint",
    "long", "ulong", "short", "ushort", "object", "string", "void", "dynamic",
];

/// One `Name<Args>` segment of a dotted type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSegment {
    pub name: String,
    pub args: Vec<TypeRef>,
}

impl TypeSegment {
    /// Lookup key: the name plus its generic arity (`List`1`)
    pub fn key(&self) -> String {
        segment_key(&self.name, self.args.len())
    }
}

/// Key of a type segment with the given generic arity
pub fn segment_key(name: &str, arity: usize) -> String {
    if arity == 0 {
        name.to_string()
    } else {
        format!("{}`{}", name, arity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `int`, `string`, ...
    Predefined(String),
    /// `A.B<C>.D`
    Named(Vec<TypeSegment>),
    /// `T[]`, `T[,]`
    Array { element: Box<TypeRef>, rank: usize },
    /// `T?`
    Nullable(Box<TypeRef>),
    /// `T*`
    Pointer(Box<TypeRef>),
    /// `(int Id, string Name)`
    Tuple(Vec<(TypeRef, Option<String>)>),
    /// Anything the parser does not understand, whitespace-normalized
    Unparsed(String),
}

impl TypeRef {
    /// Parse a type as written in source. Never fails; unknown shapes
    /// become [`TypeRef::Unparsed`].
    pub fn parse(text: &str) -> TypeRef {
        let tokens = tokenize(text);
        let mut parser = TypeParser { tokens: &tokens, pos: 0 };
        match parser.parse_type() {
            Some(ty) if parser.pos == tokens.len() => ty,
            _ => TypeRef::Unparsed(normalize_type_text(text)),
        }
    }

    /// A plain (possibly dotted) name without generic arguments
    pub fn simple(name: &str) -> TypeRef {
        TypeRef::Named(
            name.split('.')
                .map(|s| TypeSegment {
                    name: s.to_string(),
                    args: Vec::new(),
                })
                .collect(),
        )
    }

    /// The named type under `?` and array/pointer wrappers, if any
    pub fn named_core(&self) -> Option<&[TypeSegment]> {
        match self {
            TypeRef::Named(segments) => Some(segments),
            TypeRef::Nullable(inner) | TypeRef::Pointer(inner) => inner.named_core(),
            _ => None,
        }
    }

    /// `var` as the declared type of a local
    pub fn is_var(&self) -> bool {
        matches!(self, TypeRef::Named(segments) if segments.len() == 1 && segments[0].name == "var" && segments[0].args.is_empty())
    }

    /// Render the type, asking `resolve` for the display name of each named
    /// type. `resolve` gets the segments as written and returns `None` to
    /// keep the written form.
    pub fn render_with<F>(&self, resolve: &F) -> String
    where
        F: Fn(&[TypeSegment]) -> Option<String>,
    {
        match self {
            TypeRef::Predefined(name) => name.clone(),
            TypeRef::Named(segments) => resolve(segments).unwrap_or_else(|| {
                segments
                    .iter()
                    .map(|s| render_segment(s, resolve))
                    .collect::<Vec<_>>()
                    .join(".")
            }),
            TypeRef::Array { element, rank } => {
                format!("{}[{}]", element.render_with(resolve), ",".repeat(rank.saturating_sub(1)))
            }
            TypeRef::Nullable(inner) => format!("{}?", inner.render_with(resolve)),
            TypeRef::Pointer(inner) => format!("{}*", inner.render_with(resolve)),
            TypeRef::Tuple(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|(ty, name)| match name {
                        Some(name) => format!("{} {}", ty.render_with(resolve), name),
                        None => ty.render_with(resolve),
                    })
                    .collect();
                format!("({})", items.join(", "))
            }
            TypeRef::Unparsed(text) => text.clone(),
        }
    }
}

/// Render one segment in written form (`Name<A, B>`)
pub fn render_segment<F>(segment: &TypeSegment, resolve: &F) -> String
where
    F: Fn(&[TypeSegment]) -> Option<String>,
{
    if segment.args.is_empty() {
        segment.name.clone()
    } else {
        let args: Vec<String> = segment.args.iter().map(|a| a.render_with(resolve)).collect();
        format!("{}<{}>", segment.name, args.join(", "))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_with(&|_: &[TypeSegment]| None))
    }
}

/// Collapse whitespace the way types are displayed: no spaces around
/// `<`, `>`, `[`, `]`, `.`, `?`, one space after `,`
pub fn normalize_type_text(text: &str) -> String {
    let collapsed: Vec<&str> = text.split_whitespace().collect();
    let joined = collapsed.join(" ");
    let mut out = String::with_capacity(joined.len());
    let chars: Vec<char> = joined.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = if i > 0 { chars[i - 1] } else { ' ' };
            let next = chars.get(i + 1).copied().unwrap_or(' ');
            if "<>[].?,(".contains(prev) && prev != ',' {
                continue;
            }
            if "<>[].?,)".contains(next) {
                continue;
            }
        }
        out.push(c);
        if c == ',' && chars.get(i + 1).is_some_and(|n| *n != ' ') {
            out.push(' ');
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Punct(char),
    ColonColon,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphanumeric() || c == '_' || c == '@' {
            let mut ident = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '@' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident.trim_start_matches('@').to_string()));
        } else if c == ':' {
            chars.next();
            if chars.peek() == Some(&':') {
                chars.next();
                tokens.push(Token::ColonColon);
            } else {
                tokens.push(Token::Punct(':'));
            }
        } else {
            tokens.push(Token::Punct(c));
            chars.next();
        }
    }
    tokens
}

struct TypeParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl TypeParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Some(name)
            }
            _ => None,
        }
    }

    fn parse_type(&mut self) -> Option<TypeRef> {
        // Modifiers that do not change the type's identity
        while let Some(Token::Ident(word)) = self.peek() {
            if matches!(word.as_str(), "ref" | "readonly" | "scoped") {
                self.pos += 1;
            } else {
                break;
            }
        }

        let mut ty = if self.eat_punct('(') {
            let mut items = Vec::new();
            loop {
                let item = self.parse_type()?;
                let name = self.ident();
                items.push((item, name));
                if self.eat_punct(',') {
                    continue;
                }
                if self.eat_punct(')') {
                    break;
                }
                return None;
            }
            TypeRef::Tuple(items)
        } else {
            self.parse_named()?
        };

        loop {
            if self.eat_punct('?') {
                ty = TypeRef::Nullable(Box::new(ty));
            } else if self.eat_punct('*') {
                ty = TypeRef::Pointer(Box::new(ty));
            } else if self.eat_punct('[') {
                let mut rank = 1;
                while self.eat_punct(',') {
                    rank += 1;
                }
                if !self.eat_punct(']') {
                    return None;
                }
                ty = TypeRef::Array {
                    element: Box::new(ty),
                    rank,
                };
            } else {
                break;
            }
        }
        Some(ty)
    }

    fn parse_named(&mut self) -> Option<TypeRef> {
        let first = self.ident()?;
        let first = if self.peek() == Some(&Token::ColonColon) {
            // `global::X` and `alias::X` both qualify the next identifier
            self.pos += 1;
            let next = self.ident()?;
            if first == "global" { next } else { format!("{}.{}", first, next) }
        } else {
            first
        };

        let args = self.parse_type_args()?;
        if args.is_empty() && PREDEFINED_TYPES.contains(&first.as_str()) && self.peek() != Some(&Token::Punct('.')) {
            return Some(TypeRef::Predefined(first));
        }

        let mut segments: Vec<TypeSegment> = first
            .split('.')
            .map(|s| TypeSegment {
                name: s.to_string(),
                args: Vec::new(),
            })
            .collect();
        if let Some(last) = segments.last_mut() {
            last.args = args;
        }

        while self.eat_punct('.') {
            let name = self.ident()?;
            let args = self.parse_type_args()?;
            segments.push(TypeSegment { name, args });
        }
        Some(TypeRef::Named(segments))
    }

    fn parse_type_args(&mut self) -> Option<Vec<TypeRef>> {
        let mut args = Vec::new();
        if !self.eat_punct('<') {
            return Some(args);
        }
        // Unbound generic `Foo<,>`
        if self.peek() == Some(&Token::Punct(',')) || self.peek() == Some(&Token::Punct('>')) {
            let mut arity = 1;
            while self.eat_punct(',') {
                arity += 1;
            }
            if !self.eat_punct('>') {
                return None;
            }
            return Some(vec![TypeRef::Unparsed(String::new()); arity]);
        }
        loop {
            args.push(self.parse_type()?);
            if self.eat_punct(',') {
                continue;
            }
            if self.eat_punct('>') {
                break;
            }
            return None;
        }
        Some(args)
    }
}
