//! Provider Tokens
//!
//! A token is the identity a provider is bound to and requested by.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// Value Object: Provider Token
///
/// Identifies a provider inside a module scope. Three forms are supported:
///
/// - **Name**: a plain string, equal to any other name token with the same text
/// - **Symbol**: a unique identity allocated at runtime; two symbols with the
///   same description never compare equal
/// - **Type**: the identity of a Rust type, see [`Token::of`]
///
/// ## Example
///
/// ```rust
/// use modwire_domain::value_objects::Token;
///
/// struct Database;
///
/// assert_eq!(Token::name("db"), Token::from("db"));
/// assert_ne!(Token::symbol("db"), Token::symbol("db"));
/// assert_eq!(Token::of::<Database>(), Token::of::<Database>());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// String token
    Name(Cow<'static, str>),
    /// Unique runtime symbol
    Symbol {
        /// Process-unique symbol number
        id: u64,
        /// Human-readable description, not part of the identity
        description: Cow<'static, str>,
    },
    /// Type identity token
    Type {
        /// Type identifier
        id: TypeId,
        /// Type name for diagnostics
        name: &'static str,
    },
}

impl Token {
    /// Create a string token
    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Name(name.into())
    }

    /// Allocate a new unique symbol token
    pub fn symbol(description: impl Into<Cow<'static, str>>) -> Self {
        Self::Symbol {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    /// Token for the type identity of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Human-readable description of the token
    pub fn description(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Symbol { description, .. } => description,
            Self::Type { name, .. } => name,
        }
    }

    /// Whether this is a string token
    pub fn is_name(&self) -> bool {
        matches!(self, Self::Name(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Symbol { description, .. } => write!(f, "Symbol({description})"),
            Self::Type { name, .. } => write!(f, "{name}"),
        }
    }
}

impl From<&'static str> for Token {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}
