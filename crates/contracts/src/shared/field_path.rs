//! Typed addressing into a JSON record
//!
//! A [`FieldPath`] is a sequence of object keys and array indices parsed from
//! the notation form widgets use (`sectors[2].percentage`, `sectors.2.percentage`,
//! `[0].value` for array-rooted records). The empty string is the root path.
//!
//! A [`PathPattern`] additionally allows `[*]` to address every element of a
//! sequence; validation rules are attached to patterns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ошибки разбора пути
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty segment at position {pos} in '{path}'")]
    EmptySegment { pos: usize, path: String },

    #[error("unclosed bracket in '{0}'")]
    UnclosedBracket(String),

    #[error("invalid index '{index}' in '{path}'")]
    InvalidIndex { index: String, path: String },

    #[error("unexpected character '{ch}' at position {pos} in '{path}'")]
    UnexpectedChar { ch: char, pos: usize, path: String },
}

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathToken {
    Key(String),
    Index(usize),
}

impl PathToken {
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(k) => k.parse().ok(),
        }
    }
}

// ============================================================================
// Tokenizer (shared by FieldPath and PathPattern)
// ============================================================================

enum RawToken {
    Key(String),
    Bracket(String),
}

fn tokenize(input: &str) -> Result<Vec<RawToken>, PathError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut current = String::new();
    let mut after_dot = false;
    let mut after_bracket = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if current.is_empty() && !after_bracket {
                    return Err(PathError::EmptySegment {
                        pos: i,
                        path: input.to_string(),
                    });
                }
                if !current.is_empty() {
                    tokens.push(RawToken::Key(std::mem::take(&mut current)));
                }
                after_dot = true;
                after_bracket = false;
                i += 1;
            }
            '[' => {
                if !current.is_empty() {
                    tokens.push(RawToken::Key(std::mem::take(&mut current)));
                } else if after_dot {
                    return Err(PathError::EmptySegment {
                        pos: i,
                        path: input.to_string(),
                    });
                }
                let close = chars[i + 1..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| PathError::UnclosedBracket(input.to_string()))?;
                let inner: String = chars[i + 1..close].iter().collect();
                tokens.push(RawToken::Bracket(inner.trim().to_string()));
                after_dot = false;
                after_bracket = true;
                i = close + 1;
            }
            ch @ ']' => {
                return Err(PathError::UnexpectedChar {
                    ch,
                    pos: i,
                    path: input.to_string(),
                });
            }
            ch => {
                if after_bracket {
                    return Err(PathError::UnexpectedChar {
                        ch,
                        pos: i,
                        path: input.to_string(),
                    });
                }
                current.push(ch);
                after_dot = false;
                i += 1;
            }
        }
    }

    if after_dot {
        return Err(PathError::EmptySegment {
            pos: chars.len(),
            path: input.to_string(),
        });
    }
    if !current.is_empty() {
        tokens.push(RawToken::Key(current));
    }
    Ok(tokens)
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

fn write_tokens<'a>(
    f: &mut fmt::Formatter<'_>,
    tokens: impl Iterator<Item = (bool, &'a str, Option<String>)>,
) -> fmt::Result {
    for (position, (is_key, key, index)) in tokens.enumerate() {
        if is_key {
            if position > 0 {
                f.write_str(".")?;
            }
            f.write_str(key)?;
        } else if let Some(index) = index {
            write!(f, "[{}]", index)?;
        }
    }
    Ok(())
}

// ============================================================================
// FieldPath
// ============================================================================

/// Address of one location inside a record
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    tokens: Vec<PathToken>,
}

impl FieldPath {
    /// The root of the record
    pub fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Single top-level key, no parsing involved
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            tokens: vec![PathToken::Key(name.into())],
        }
    }

    pub fn from_tokens(tokens: Vec<PathToken>) -> Self {
        Self { tokens }
    }

    pub fn parse(input: &str) -> Result<Self, PathError> {
        let tokens = tokenize(input.trim())?
            .into_iter()
            .map(|raw| match raw {
                RawToken::Key(k) if is_numeric(&k) => k
                    .parse()
                    .map(PathToken::Index)
                    .map_err(|_| PathError::InvalidIndex {
                        index: k,
                        path: input.to_string(),
                    }),
                RawToken::Key(k) => Ok(PathToken::Key(k)),
                RawToken::Bracket(b) => b
                    .parse()
                    .map(PathToken::Index)
                    .map_err(|_| PathError::InvalidIndex {
                        index: b,
                        path: input.to_string(),
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(PathToken::Key(key.into()));
        Self { tokens }
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(PathToken::Index(index));
        Self { tokens }
    }

    pub fn join(&self, other: &FieldPath) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        Self { tokens }
    }

    pub fn parent(&self) -> Option<Self> {
        self.split_last().map(|(_, parent)| parent)
    }

    pub fn last(&self) -> Option<&PathToken> {
        self.tokens.last()
    }

    /// Last token and the path leading to it
    pub fn split_last(&self) -> Option<(&PathToken, Self)> {
        self.tokens.split_last().map(|(last, rest)| {
            (
                last,
                Self {
                    tokens: rest.to_vec(),
                },
            )
        })
    }

    /// First `len` tokens
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            tokens: self.tokens[..len.min(self.tokens.len())].to_vec(),
        }
    }

    /// True when `prefix` is this path or one of its ancestors
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.tokens.starts_with(&prefix.tokens)
    }

    /// Every non-root prefix, shortest first, ending with the path itself
    pub fn ancestors(&self) -> impl Iterator<Item = FieldPath> + '_ {
        (1..=self.tokens.len()).map(move |len| self.prefix(len))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tokens(
            f,
            self.tokens.iter().map(|t| match t {
                PathToken::Key(k) => (true, k.as_str(), None),
                PathToken::Index(i) => (false, "", Some(i.to_string())),
            }),
        )
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

// ============================================================================
// PathPattern
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternToken {
    Key(String),
    Index(usize),
    AnyIndex,
}

/// A field path where `[*]` matches any array index
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathPattern {
    tokens: Vec<PatternToken>,
}

impl PathPattern {
    pub fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    pub fn parse(input: &str) -> Result<Self, PathError> {
        let tokens = tokenize(input.trim())?
            .into_iter()
            .map(|raw| match raw {
                RawToken::Key(k) if k == "*" => Ok(PatternToken::AnyIndex),
                RawToken::Key(k) if is_numeric(&k) => k
                    .parse()
                    .map(PatternToken::Index)
                    .map_err(|_| PathError::InvalidIndex {
                        index: k,
                        path: input.to_string(),
                    }),
                RawToken::Key(k) => Ok(PatternToken::Key(k)),
                RawToken::Bracket(b) if b == "*" => Ok(PatternToken::AnyIndex),
                RawToken::Bracket(b) => b
                    .parse()
                    .map(PatternToken::Index)
                    .map_err(|_| PathError::InvalidIndex {
                        index: b,
                        path: input.to_string(),
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.tokens.push(PatternToken::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.tokens.push(PatternToken::Index(index));
        self
    }

    pub fn any(mut self) -> Self {
        self.tokens.push(PatternToken::AnyIndex);
        self
    }

    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    pub fn has_wildcard(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, PatternToken::AnyIndex))
    }

    /// The concrete path when the pattern has no wildcard
    pub fn to_field_path(&self) -> Option<FieldPath> {
        self.tokens
            .iter()
            .map(|t| match t {
                PatternToken::Key(k) => Some(PathToken::Key(k.clone())),
                PatternToken::Index(i) => Some(PathToken::Index(*i)),
                PatternToken::AnyIndex => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(FieldPath::from_tokens)
    }

    pub fn matches(&self, path: &FieldPath) -> bool {
        self.tokens.len() == path.len()
            && self
                .tokens
                .iter()
                .zip(path.tokens())
                .all(|(pattern, token)| match (pattern, token) {
                    (PatternToken::Key(a), PathToken::Key(b)) => a == b,
                    (PatternToken::Index(a), PathToken::Index(b)) => a == b,
                    (PatternToken::AnyIndex, PathToken::Index(_)) => true,
                    _ => false,
                })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tokens(
            f,
            self.tokens.iter().map(|t| match t {
                PatternToken::Key(k) => (true, k.as_str(), None),
                PatternToken::Index(i) => (false, "", Some(i.to_string())),
                PatternToken::AnyIndex => (false, "", Some("*".to_string())),
            }),
        )
    }
}

impl FromStr for PathPattern {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
