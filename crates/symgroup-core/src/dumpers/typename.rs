//! Helpers for picking apart type names as the engine spells them.

/// Drop a leading `class `, `struct `, `enum ` or `union ` keyword.
#[must_use]
pub fn strip_keywords(type_name: &str) -> &str
{
    let mut name = type_name.trim();
    for keyword in ["class ", "struct ", "enum ", "union "] {
        if let Some(rest) = name.strip_prefix(keyword) {
            name = rest.trim_start();
        }
    }
    name
}

/// Drop a `module!` qualifier.
#[must_use]
pub fn strip_module(type_name: &str) -> &str
{
    type_name.split_once('!').map_or(type_name, |(_, rest)| rest)
}

#[must_use]
pub fn is_pointer_type(type_name: &str) -> bool
{
    type_name.trim_end().ends_with('*')
}

/// The pointee of a pointer type (exactly one `*` removed).
#[must_use]
pub fn strip_pointer(type_name: &str) -> Option<&str>
{
    type_name.trim_end().strip_suffix('*').map(str::trim_end)
}

/// The part before the template argument list: `QList` for `QList<int>`.
#[must_use]
pub fn template_base(type_name: &str) -> &str
{
    type_name.split_once('<').map_or(type_name, |(base, _)| base).trim()
}

/// Top-level template arguments: `["int", "QList<int>"]` for
/// `QMap<int,QList<int> >`.
#[must_use]
pub fn template_arguments(type_name: &str) -> Vec<String>
{
    let Some(open) = type_name.find('<') else {
        return Vec::new();
    };
    let Some(close) = type_name.rfind('>') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in type_name[open + 1..close].chars() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                arguments.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        arguments.push(current.trim().to_string());
    }
    arguments
}

/// Remove a library namespace prefix (`ns::QString` → `QString`).
#[must_use]
pub fn strip_namespace<'a>(type_name: &'a str, namespace: &str) -> &'a str
{
    if namespace.is_empty() {
        return type_name;
    }
    type_name
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(type_name)
}

const INTEGRAL_TYPES: &[&str] = &[
    "char",
    "signed char",
    "unsigned char",
    "wchar_t",
    "short",
    "unsigned short",
    "int",
    "unsigned int",
    "long",
    "unsigned long",
    "__int64",
    "unsigned __int64",
    "long long",
    "unsigned long long",
    "int64",
    "unsigned int64",
    "size_t",
    "qint64",
    "quint64",
    "uint",
    "ushort",
    "uchar",
];

/// True for built-in integer types (after keyword stripping).
#[must_use]
pub fn is_integral_type(type_name: &str) -> bool
{
    let name = strip_keywords(type_name);
    let name = name.strip_prefix("const ").unwrap_or(name);
    INTEGRAL_TYPES.contains(&name)
}

/// True for built-in scalars: integers, floating point, `bool` and pointers.
#[must_use]
pub fn is_primitive_type(type_name: &str) -> bool
{
    is_pointer_type(type_name) || is_integral_type(type_name) || matches!(strip_keywords(type_name), "bool" | "float" | "double")
}

/// `class ` / `struct ` prefix in a value text marks an aggregate (and, as a
/// child, a base class).
#[must_use]
pub fn is_aggregate_value(value_text: &str) -> bool
{
    value_text.starts_with("class ") || value_text.starts_with("struct ")
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_template_arguments()
    {
        assert_eq!(template_arguments("QMap<int,QList<int> >"), vec!["int", "QList<int>"]);
        assert_eq!(
            template_arguments("std::map<int,double,std::less<int>,std::allocator<std::pair<int const ,double> > >"),
            vec![
                "int",
                "double",
                "std::less<int>",
                "std::allocator<std::pair<int const ,double> >"
            ]
        );
        assert!(template_arguments("QString").is_empty());
    }

    #[test]
    fn test_strip_helpers()
    {
        assert_eq!(strip_keywords("class QString"), "QString");
        assert_eq!(strip_module("Qt5Cored!QString"), "QString");
        assert_eq!(strip_pointer("QString *"), Some("QString"));
        assert_eq!(strip_pointer("QString"), None);
        assert_eq!(template_base("QList<int>"), "QList");
        assert_eq!(strip_namespace("qt::QString", "qt"), "QString");
        assert_eq!(strip_namespace("QString", "qt"), "QString");
    }

    #[test]
    fn test_primitive_detection()
    {
        assert!(is_integral_type("unsigned int"));
        assert!(!is_integral_type("float"));
        assert!(is_primitive_type("double"));
        assert!(is_primitive_type("Foo *"));
        assert!(!is_primitive_type("QString"));
    }
}
