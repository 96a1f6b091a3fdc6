use serde::{Deserialize, Serialize};

/// Byte range in the source text (end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Root document node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub imports: Vec<ImportDecl>,
    pub root: ObjectDef,
}

/// Import statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub target: ImportTarget,
    pub version: Option<String>,
    pub alias: Option<String>,
    pub span: Span,
}

/// What an import refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportTarget {
    /// Dotted library name (`Mosaic.Controls`)
    Library(String),
    /// Quoted file or directory path, stored without quotes
    File(String),
}

/// Object definition (`Type { members }`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub type_name: String,
    pub type_span: Span,
    /// From the opening brace to just past the closing brace
    pub body: Span,
    pub members: Vec<Member>,
    /// From the type name to just past the closing brace
    pub span: Span,
}

/// Member of an object body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Member {
    /// `id: name`
    Id {
        value: String,
        value_span: Span,
        span: Span,
    },

    /// `name: <script>` (literal, expression or signal handler)
    Script {
        name: String,
        value: ScriptValue,
        value_span: Span,
        span: Span,
    },

    /// `signal name(params)`
    Signal {
        name: String,
        params: String,
        span: Span,
    },

    /// `name: Type { ... }`
    Object {
        name: String,
        object: ObjectDef,
        span: Span,
    },

    /// `name: [ Type {}, Type {} ]`
    Array {
        name: String,
        objects: Vec<ObjectDef>,
        /// From `[` to just past `]`
        brackets: Span,
        span: Span,
    },

    /// Child object in the default property
    Child(ObjectDef),
}

/// Right-hand side of a script binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptValue {
    Literal(Literal),
    Expression(String),
}

/// Literal values that map onto model variant properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    String(String),
}

impl ObjectDef {
    /// Offset of the opening brace
    pub fn lbrace(&self) -> usize {
        self.body.start
    }

    /// Offset of the closing brace
    pub fn rbrace(&self) -> usize {
        self.body.end - 1
    }

    /// Value of the `id` member, if any
    pub fn id(&self) -> Option<&str> {
        self.members.iter().find_map(|member| match member {
            Member::Id { value, .. } => Some(value.as_str()),
            _ => None,
        })
    }

    /// Find a named member (`id` included)
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.name() == Some(name))
    }

    /// Child objects of the default property, in source order
    pub fn children(&self) -> impl Iterator<Item = &ObjectDef> {
        self.members.iter().filter_map(|member| match member {
            Member::Child(object) => Some(object),
            _ => None,
        })
    }
}

impl Member {
    /// Property name; `None` for default-property children
    pub fn name(&self) -> Option<&str> {
        match self {
            Member::Id { .. } => Some("id"),
            Member::Script { name, .. }
            | Member::Signal { name, .. }
            | Member::Object { name, .. }
            | Member::Array { name, .. } => Some(name),
            Member::Child(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Member::Id { span, .. }
            | Member::Script { span, .. }
            | Member::Signal { span, .. }
            | Member::Object { span, .. }
            | Member::Array { span, .. } => *span,
            Member::Child(object) => object.span,
        }
    }

    pub fn is_child(&self) -> bool {
        matches!(self, Member::Child(_))
    }

    /// Members holding objects (object bindings and arrays)
    pub fn is_object_binding(&self) -> bool {
        matches!(self, Member::Object { .. } | Member::Array { .. })
    }
}

/// Signal handlers are bindings named `onSomething`
pub fn is_signal_handler_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('o')
        && chars.next() == Some('n')
        && chars.next().map(|c| c.is_ascii_uppercase()).unwrap_or(false)
}
