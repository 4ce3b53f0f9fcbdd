use std::fmt;

/// Marker separating a generic type's name from its arity (`List`1`).
pub const ARITY_MARKER: char = '`';

/// Dotted qualified name of a foreign type.
///
/// The last segment is the type name, the rest its namespace. Generic
/// definitions keep their arity suffix in `name` (`List`1`); constructed
/// generic names keep their bracketed argument list, whose inner dots are
/// not treated as separators.
///
/// # Examples
///
/// ```
/// use dynbridge_core::QualifiedName;
///
/// let list = QualifiedName::from_qualified_string("System.Collections.Generic.List`1");
/// assert_eq!(list.namespace_string(), "System.Collections.Generic");
/// assert_eq!(list.open_name(), "List");
/// assert_eq!(list.generic_arity(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Simple name, including any arity suffix.
    pub name: String,
    /// Namespace segments; empty for the global namespace.
    pub namespace: Vec<String>,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>, namespace: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    /// Create a qualified name in the global namespace.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Vec::new(),
        }
    }

    /// Create a name from a namespace string and a simple name.
    pub fn in_namespace(namespace: &str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: split_dotted(namespace),
        }
    }

    /// Parse a dotted string such as `Acme.Tools.Widget`.
    pub fn from_qualified_string(s: &str) -> Self {
        let mut parts = split_dotted(s);
        match parts.pop() {
            Some(name) => Self {
                name,
                namespace: parts,
            },
            None => Self::global(""),
        }
    }

    pub fn is_global(&self) -> bool {
        self.namespace.is_empty()
    }

    pub fn simple_name(&self) -> &str {
        &self.name
    }

    pub fn namespace_path(&self) -> &[String] {
        &self.namespace
    }

    /// Get the namespace as a dotted string.
    pub fn namespace_string(&self) -> String {
        self.namespace.join(".")
    }

    /// Every dotted prefix of the namespace, shortest first.
    ///
    /// `A.B.C` yields `A`, `A.B`, `A.B.C`.
    pub fn namespace_prefixes(&self) -> Vec<String> {
        let mut prefixes = Vec::with_capacity(self.namespace.len());
        let mut current = String::new();
        for segment in &self.namespace {
            if !current.is_empty() {
                current.push('.');
            }
            current.push_str(segment);
            prefixes.push(current.clone());
        }
        prefixes
    }

    /// The name with its arity suffix removed (`List`1` -> `List`).
    pub fn open_name(&self) -> &str {
        match self.name.find(ARITY_MARKER) {
            Some(pos) => &self.name[..pos],
            None => &self.name,
        }
    }

    /// Declared generic arity, zero for non-generic names.
    pub fn generic_arity(&self) -> usize {
        self.name
            .find(ARITY_MARKER)
            .map(|pos| {
                self.name[pos + 1..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
            })
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_generic(&self) -> bool {
        self.name.contains(ARITY_MARKER)
    }

    /// The same name with the arity suffix stripped, keeping the namespace.
    pub fn to_open(&self) -> Self {
        Self {
            name: self.open_name().to_string(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn to_type_hash(&self) -> crate::TypeHash {
        crate::TypeHash::from_name(&self.to_string())
    }

    /// Create a child name within this name treated as a namespace.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut child_ns = self.namespace.clone();
        child_ns.push(self.name.clone());
        Self {
            name: name.into(),
            namespace: child_ns,
        }
    }

    /// Get the enclosing namespace as a name, if any.
    pub fn parent(&self) -> Option<Self> {
        let (last, rest) = self.namespace.split_last()?;
        Some(Self {
            name: last.clone(),
            namespace: rest.to_vec(),
        })
    }
}

fn split_dotted(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '.' if depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace.join("."), self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::from_qualified_string(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::from_qualified_string(&s)
    }
}
