//! Type registry of the simulated debuggee.
//!
//! Pointers (`T *`) and arrays (`T[n]`) are derived from their spelling;
//! primitives are built in; structs, classes and enums are registered
//! explicitly. Lookups normalise the spelling first, so `QString *`,
//! `QString*` and `class QString *` all name the same type.

use std::collections::HashMap;

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive
{
    Bool,
    Char,
    UChar,
    WChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Int64,
    UInt64,
    SizeT,
    Float,
    Double,
}

impl Primitive
{
    /// Look up a normalised primitive spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self>
    {
        let primitive = match name {
            "bool" => Self::Bool,
            "char" | "signed char" => Self::Char,
            "unsigned char" | "uchar" => Self::UChar,
            "wchar_t" => Self::WChar,
            "short" | "signed short" => Self::Short,
            "unsigned short" | "ushort" => Self::UShort,
            "int" | "signed int" => Self::Int,
            "unsigned int" | "uint" => Self::UInt,
            "long" => Self::Long,
            "unsigned long" => Self::ULong,
            "__int64" | "long long" | "int64" | "qint64" => Self::Int64,
            "unsigned __int64" | "unsigned long long" | "quint64" => Self::UInt64,
            "size_t" | "unsigned int64" => Self::SizeT,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        };
        Some(primitive)
    }

    /// Size in bytes. `long` is 4 bytes as on Windows.
    #[must_use]
    pub fn size(self, pointer_size: u64) -> u64
    {
        match self {
            Self::Bool | Self::Char | Self::UChar => 1,
            Self::WChar | Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Long | Self::ULong | Self::Float => 4,
            Self::Int64 | Self::UInt64 | Self::Double => 8,
            Self::SizeT => pointer_size,
        }
    }

    #[must_use]
    pub fn is_signed(self) -> bool
    {
        matches!(self, Self::Char | Self::Short | Self::Int | Self::Long | Self::Int64)
    }

    #[must_use]
    pub fn is_character(self) -> bool
    {
        matches!(self, Self::Char | Self::UChar | Self::WChar)
    }
}

/// `class` or `struct`; decides the engine's value text (`class QString`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword
{
    Class,
    #[default]
    Struct,
}

impl Keyword
{
    #[must_use]
    pub fn as_str(self) -> &'static str
    {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
        }
    }
}

/// A data member or base class at a fixed offset.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Field
{
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: u64,
}

/// A registered class or struct.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct StructDef
{
    pub name: String,
    #[serde(default)]
    pub keyword: Keyword,
    pub size: u64,
    /// Base classes; `name` and `type_name` are both the base's type name
    #[serde(default)]
    pub bases: Vec<Field>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl StructDef
{
    /// A `struct` of the given size without members.
    #[must_use]
    pub fn new_struct(name: impl Into<String>, size: u64) -> Self
    {
        Self {
            name: name.into(),
            keyword: Keyword::Struct,
            size,
            bases: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// A `class` of the given size without members.
    #[must_use]
    pub fn new_class(name: impl Into<String>, size: u64) -> Self
    {
        Self {
            keyword: Keyword::Class,
            ..Self::new_struct(name, size)
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, type_name: &str, offset: u64) -> Self
    {
        self.fields.push(Field {
            name: name.to_string(),
            type_name: type_name.to_string(),
            offset,
        });
        self
    }

    #[must_use]
    pub fn with_base(mut self, type_name: &str, offset: u64) -> Self
    {
        self.bases.push(Field {
            name: type_name.to_string(),
            type_name: type_name.to_string(),
            offset,
        });
        self
    }

    /// Offset of a member, searching base classes recursively.
    fn member_offset(&self, registry: &TypeRegistry, member: &str, depth: usize) -> Option<u64>
    {
        if let Some(field) = self.fields.iter().find(|f| f.name == member) {
            return Some(field.offset);
        }
        if depth > 16 {
            return None;
        }
        self.bases.iter().find_map(|base| {
            let def = registry.struct_def(&base.type_name)?;
            def.member_offset(registry, member, depth + 1).map(|o| base.offset + o)
        })
    }
}

/// A registered enumeration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct EnumDef
{
    pub name: String,
    #[serde(default = "default_enum_size")]
    pub size: u64,
    #[serde(default)]
    pub values: Vec<Enumerator>,
}

fn default_enum_size() -> u64
{
    4
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Enumerator
{
    pub name: String,
    pub value: i64,
}

/// What a type name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum TypeShape<'a>
{
    Primitive(Primitive),
    /// Pointer; carries the normalised pointee spelling
    Pointer(&'a str),
    /// Array of `count` elements
    Array
    {
        element: &'a str,
        count: u64,
    },
    Struct(&'a StructDef),
    Enum(&'a EnumDef),
}

/// All types known to the simulated debuggee.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry
{
    structs: HashMap<String, StructDef>,
    enums: HashMap<String, EnumDef>,
}

impl TypeRegistry
{
    pub fn add_struct(&mut self, def: StructDef)
    {
        self.structs.insert(normalize_type(&def.name), def);
    }

    pub fn add_enum(&mut self, def: EnumDef)
    {
        self.enums.insert(normalize_type(&def.name), def);
    }

    #[must_use]
    pub fn struct_def(&self, type_name: &str) -> Option<&StructDef>
    {
        self.structs.get(&normalize_type(type_name))
    }

    /// Classify a type. `normalized` must come from [`normalize_type`].
    #[must_use]
    pub fn shape<'a>(&'a self, normalized: &'a str) -> Option<TypeShape<'a>>
    {
        let unqualified = normalized.strip_prefix("const ").unwrap_or(normalized);
        if let Some(pointee) = unqualified.strip_suffix('*') {
            return Some(TypeShape::Pointer(pointee.trim_end()));
        }
        if let Some(without_bracket) = unqualified.strip_suffix(']') {
            let open = without_bracket.rfind('[')?;
            let count = without_bracket[open + 1..].parse().ok()?;
            return Some(TypeShape::Array {
                element: &without_bracket[..open],
                count,
            });
        }
        if let Some(primitive) = Primitive::from_name(unqualified) {
            return Some(TypeShape::Primitive(primitive));
        }
        if let Some(def) = self.structs.get(unqualified) {
            return Some(TypeShape::Struct(def));
        }
        self.enums.get(unqualified).map(TypeShape::Enum)
    }

    /// Size of a type, `None` if unknown.
    #[must_use]
    pub fn size_of(&self, type_name: &str, pointer_size: u64) -> Option<u64>
    {
        let normalized = normalize_type(type_name);
        self.size_of_normalized(&normalized, pointer_size, 0)
    }

    fn size_of_normalized(&self, normalized: &str, pointer_size: u64, depth: usize) -> Option<u64>
    {
        if depth > 16 {
            return None;
        }
        match self.shape(normalized)? {
            TypeShape::Primitive(p) => Some(p.size(pointer_size)),
            TypeShape::Pointer(_) => Some(pointer_size),
            TypeShape::Array { element, count } => {
                Some(self.size_of_normalized(element, pointer_size, depth + 1)? * count)
            }
            TypeShape::Struct(def) => Some(def.size),
            TypeShape::Enum(def) => Some(def.size),
        }
    }

    /// Offset of a member of a struct (including inherited members).
    #[must_use]
    pub fn field_offset(&self, type_name: &str, member: &str) -> Option<u64>
    {
        self.struct_def(type_name)?.member_offset(self, member, 0)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool
    {
        let normalized = normalize_type(type_name);
        self.shape(&normalized).is_some()
    }
}

/// Canonical spelling of a type name.
///
/// Drops a leading `class `/`struct `/`enum ` keyword and a `module!`
/// qualifier, collapses whitespace and removes spaces next to punctuation.
#[must_use]
pub fn normalize_type(name: &str) -> String
{
    let mut name = name.trim();
    for keyword in ["class ", "struct ", "enum ", "union "] {
        if let Some(rest) = name.strip_prefix(keyword) {
            name = rest.trim_start();
        }
    }
    if let Some((_, rest)) = name.split_once('!') {
        name = rest;
    }

    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && out.chars().next_back().is_some_and(is_word_char) && is_word_char(c) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

fn is_word_char(c: char) -> bool
{
    c.is_alphanumeric() || c == '_' || c == ':'
}
