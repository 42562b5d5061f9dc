//! Display names and path segments for freshly inserted nodes.
//!
//! Engine names are not usable as path segments as is: unnamed members have
//! empty names, template instantiations contain characters the IDE splits on,
//! and a scope may declare the same name twice (an inner block shadowing an
//! outer variable). Every batch of siblings goes through [`fix_names`].

use std::collections::HashMap;

/// Display name and path segment of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedName
{
    pub name: String,
    pub iname: String,
}

/// Compute names for a batch of siblings given their engine names.
///
/// - empty names become `<unnamed N>` with segment `unnamedN` (`N` is the
///   position in the batch)
/// - template names become `Base<>` with segment `Base@tN` (`N` counts the
///   template names of the batch, starting at 1)
/// - array elements `[i]` get segment `i`
/// - duplicates get segments `x`, `x#1`, `x#2` in order; with `top_level`,
///   all but the last occurrence are displayed as `x <shadowed K>` where `K`
///   counts how many later declarations hide it
#[must_use]
pub fn fix_names<'a>(raw: impl IntoIterator<Item = &'a str>, top_level: bool) -> Vec<FixedName>
{
    let mut template_count = 0usize;
    let mut fixed: Vec<FixedName> = raw
        .into_iter()
        .enumerate()
        .map(|(position, name)| {
            let name = name.trim();
            if name.is_empty() || name == "<unnamed>" {
                return FixedName {
                    name: format!("<unnamed {position}>"),
                    iname: format!("unnamed{position}"),
                };
            }
            if let Some(index) = name.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                if index.bytes().all(|b| b.is_ascii_digit()) {
                    return FixedName {
                        name: name.to_string(),
                        iname: index.to_string(),
                    };
                }
            }
            if let Some((base, _)) = name.split_once('<') {
                template_count += 1;
                let base = base.trim();
                return FixedName {
                    name: format!("{base}<>"),
                    iname: format!("{}@t{template_count}", sanitize(base)),
                };
            }
            FixedName {
                name: name.to_string(),
                iname: sanitize(name),
            }
        })
        .collect();

    let mut totals: HashMap<String, usize> = HashMap::new();
    for entry in &fixed {
        *totals.entry(entry.iname.clone()).or_default() += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    for entry in &mut fixed {
        let total = totals.get(&entry.iname).copied().unwrap_or(1);
        if total < 2 {
            continue;
        }
        let occurrence = seen.entry(entry.iname.clone()).or_default();
        let index = *occurrence;
        *occurrence += 1;
        if top_level && index + 1 < total {
            entry.name = format!("{} <shadowed {}>", entry.name, total - 1 - index);
        }
        if index > 0 {
            entry.iname = format!("{}#{index}", entry.iname);
        }
    }
    fixed
}

/// Path segments must not contain the separator.
fn sanitize(name: &str) -> String
{
    name.chars()
        .map(|c| match c {
            '.' => '@',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn inames(fixed: &[FixedName]) -> Vec<&str>
    {
        fixed.iter().map(|f| f.iname.as_str()).collect()
    }

    fn names(fixed: &[FixedName]) -> Vec<&str>
    {
        fixed.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_shadowed_locals()
    {
        let fixed = fix_names(["x", "y", "x"], true);
        assert_eq!(inames(&fixed), vec!["x", "y", "x#1"]);
        assert_eq!(names(&fixed), vec!["x <shadowed 1>", "y", "x"]);
    }

    #[test]
    fn test_three_declarations()
    {
        let fixed = fix_names(["i", "i", "i"], true);
        assert_eq!(inames(&fixed), vec!["i", "i#1", "i#2"]);
        assert_eq!(names(&fixed), vec!["i <shadowed 2>", "i <shadowed 1>", "i"]);
    }

    #[test]
    fn test_nested_duplicates_keep_display_name()
    {
        let fixed = fix_names(["a", "a"], false);
        assert_eq!(inames(&fixed), vec!["a", "a#1"]);
        assert_eq!(names(&fixed), vec!["a", "a"]);
    }

    #[test]
    fn test_unnamed_and_templates()
    {
        let fixed = fix_names(["", "QList<int>", "value", "QMap<int,int>"], false);
        assert_eq!(inames(&fixed), vec!["unnamed0", "QList@t1", "value", "QMap@t2"]);
        assert_eq!(names(&fixed), vec!["<unnamed 0>", "QList<>", "value", "QMap<>"]);
    }

    #[test]
    fn test_array_elements()
    {
        let fixed = fix_names(["[0]", "[1]"], false);
        assert_eq!(inames(&fixed), vec!["0", "1"]);
        assert_eq!(names(&fixed), vec!["[0]", "[1]"]);
    }
}
