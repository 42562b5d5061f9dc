//! Known-type classification.
//!
//! A node's type name is reduced to its template base (keywords, module
//! qualifier, library namespace and optionally one pointer level stripped)
//! and looked up in a static table. The resulting [`KnownType`] decides which
//! simple dumper, container decoder and assignment routine apply.

use std::collections::HashMap;

use bitflags::bitflags;
use once_cell::sync::Lazy;

use super::typename::{
    is_pointer_type, strip_keywords, strip_module, strip_namespace, strip_pointer, template_arguments, template_base,
};

bitflags! {
    /// Properties of a known type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KnownTypeFlags: u32 {
        /// Plain old data
        const POD = 1 << 0;
        /// Library type that behaves like a primitive (stored inline in lists)
        const LIBRARY_PRIMITIVE = 1 << 1;
        /// Library type declared movable (stored inline in lists if small)
        const LIBRARY_MOVABLE = 1 << 2;
        /// Holds a number of elements
        const CONTAINER = 1 << 3;
        /// Has an inline formatter
        const SIMPLE_DUMPER = 1 << 4;
        /// Has a structural formatter (synthetic children)
        const COMPLEX_DUMPER = 1 << 5;
        /// Can be assigned from a string
        const EDITABLE = 1 << 6;
    }
}

/// Closed set of library types the dumpers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KnownType
{
    #[default]
    Unknown,
    QChar,
    QString,
    QByteArray,
    QDate,
    QTime,
    QPoint,
    QPointF,
    QSize,
    QSizeF,
    QRect,
    QRectF,
    QLine,
    QFlags,
    QAtomicInt,
    QObject,
    QList,
    QStringList,
    QVector,
    QMap,
    QMultiMap,
    QHash,
    QMultiHash,
    QSet,
    QSharedPointer,
    QWeakPointer,
    QScopedPointer,
    QPointer,
    StdString,
    StdWString,
    StdVector,
    StdList,
    StdDeque,
    StdStack,
    StdMap,
    StdMultiMap,
    StdSet,
    StdMultiSet,
    StdPair,
    StdSharedPtr,
    StdUniquePtr,
}

static KNOWN_TYPES: Lazy<HashMap<&'static str, KnownType>> = Lazy::new(|| {
    HashMap::from([
        ("QChar", KnownType::QChar),
        ("QString", KnownType::QString),
        ("QByteArray", KnownType::QByteArray),
        ("QDate", KnownType::QDate),
        ("QTime", KnownType::QTime),
        ("QPoint", KnownType::QPoint),
        ("QPointF", KnownType::QPointF),
        ("QSize", KnownType::QSize),
        ("QSizeF", KnownType::QSizeF),
        ("QRect", KnownType::QRect),
        ("QRectF", KnownType::QRectF),
        ("QLine", KnownType::QLine),
        ("QFlags", KnownType::QFlags),
        ("QAtomicInt", KnownType::QAtomicInt),
        ("QBasicAtomicInt", KnownType::QAtomicInt),
        ("QObject", KnownType::QObject),
        ("QList", KnownType::QList),
        ("QStringList", KnownType::QStringList),
        ("QVector", KnownType::QVector),
        ("QMap", KnownType::QMap),
        ("QMultiMap", KnownType::QMultiMap),
        ("QHash", KnownType::QHash),
        ("QMultiHash", KnownType::QMultiHash),
        ("QSet", KnownType::QSet),
        ("QSharedPointer", KnownType::QSharedPointer),
        ("QWeakPointer", KnownType::QWeakPointer),
        ("QScopedPointer", KnownType::QScopedPointer),
        ("QPointer", KnownType::QPointer),
        ("std::string", KnownType::StdString),
        ("std::wstring", KnownType::StdWString),
        ("std::vector", KnownType::StdVector),
        ("std::list", KnownType::StdList),
        ("std::deque", KnownType::StdDeque),
        ("std::stack", KnownType::StdStack),
        ("std::map", KnownType::StdMap),
        ("std::multimap", KnownType::StdMultiMap),
        ("std::set", KnownType::StdSet),
        ("std::multiset", KnownType::StdMultiSet),
        ("std::pair", KnownType::StdPair),
        ("std::shared_ptr", KnownType::StdSharedPtr),
        ("std::unique_ptr", KnownType::StdUniquePtr),
    ])
});

impl KnownType
{
    #[must_use]
    pub fn flags(self) -> KnownTypeFlags
    {
        use KnownTypeFlags as F;
        let sequence = F::LIBRARY_MOVABLE | F::CONTAINER | F::SIMPLE_DUMPER | F::COMPLEX_DUMPER;
        match self {
            Self::Unknown => F::empty(),
            Self::QChar => F::LIBRARY_PRIMITIVE | F::LIBRARY_MOVABLE | F::SIMPLE_DUMPER,
            Self::QString | Self::QByteArray => F::LIBRARY_MOVABLE | F::SIMPLE_DUMPER | F::EDITABLE,
            Self::QDate
            | Self::QTime
            | Self::QPoint
            | Self::QPointF
            | Self::QSize
            | Self::QSizeF
            | Self::QRect
            | Self::QRectF
            | Self::QLine => F::POD | F::LIBRARY_MOVABLE | F::SIMPLE_DUMPER,
            Self::QFlags => F::LIBRARY_PRIMITIVE | F::SIMPLE_DUMPER,
            Self::QAtomicInt | Self::QObject | Self::StdPair => F::SIMPLE_DUMPER,
            Self::QList
            | Self::QStringList
            | Self::QVector
            | Self::QMap
            | Self::QMultiMap
            | Self::QHash
            | Self::QMultiHash
            | Self::QSet => sequence,
            Self::QSharedPointer | Self::QWeakPointer | Self::QScopedPointer | Self::QPointer => {
                F::LIBRARY_MOVABLE | F::SIMPLE_DUMPER | F::COMPLEX_DUMPER
            }
            Self::StdString | Self::StdWString => F::SIMPLE_DUMPER | F::EDITABLE,
            Self::StdVector
            | Self::StdList
            | Self::StdDeque
            | Self::StdStack
            | Self::StdMap
            | Self::StdMultiMap
            | Self::StdSet
            | Self::StdMultiSet => F::CONTAINER | F::SIMPLE_DUMPER | F::COMPLEX_DUMPER,
            Self::StdSharedPtr | Self::StdUniquePtr => F::SIMPLE_DUMPER | F::COMPLEX_DUMPER,
        }
    }

    #[must_use]
    pub fn is_container(self) -> bool
    {
        self.flags().contains(KnownTypeFlags::CONTAINER)
    }

    #[must_use]
    pub fn has_simple_dumper(self) -> bool
    {
        self.flags().contains(KnownTypeFlags::SIMPLE_DUMPER)
    }

    #[must_use]
    pub fn has_complex_dumper(self) -> bool
    {
        self.flags().contains(KnownTypeFlags::COMPLEX_DUMPER)
    }

    #[must_use]
    pub fn is_editable(self) -> bool
    {
        self.flags().contains(KnownTypeFlags::EDITABLE)
    }

    /// Movable or primitive library types are stored inline in a `QList`
    /// when they fit into a pointer.
    #[must_use]
    pub fn is_movable(self) -> bool
    {
        self.flags()
            .intersects(KnownTypeFlags::LIBRARY_MOVABLE | KnownTypeFlags::LIBRARY_PRIMITIVE | KnownTypeFlags::POD)
    }

    /// Smart-pointer-like types with a single synthetic `data` child.
    #[must_use]
    pub fn is_smart_pointer(self) -> bool
    {
        matches!(
            self,
            Self::QSharedPointer
                | Self::QWeakPointer
                | Self::QScopedPointer
                | Self::QPointer
                | Self::StdSharedPtr
                | Self::StdUniquePtr
        )
    }
}

/// Classify a type name.
///
/// `namespace` is the library namespace (empty for none). With
/// `allow_pointer`, one trailing pointer level is stripped first so that
/// `QString *` classifies as [`KnownType::QString`]; otherwise pointers are
/// always [`KnownType::Unknown`].
#[must_use]
pub fn classify(type_name: &str, namespace: &str, allow_pointer: bool) -> KnownType
{
    let mut name = strip_module(strip_keywords(type_name));
    if allow_pointer {
        if let Some(pointee) = strip_pointer(name) {
            name = pointee;
        }
    }
    if is_pointer_type(name) {
        return KnownType::Unknown;
    }
    let name = strip_namespace(name, namespace);
    let base = template_base(name);
    if base == "std::basic_string" {
        let arguments = template_arguments(name);
        return match arguments.first().map(String::as_str) {
            Some("char") => KnownType::StdString,
            Some("wchar_t" | "unsigned short") => KnownType::StdWString,
            _ => KnownType::Unknown,
        };
    }
    KNOWN_TYPES.get(base).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_classify_plain_and_templates()
    {
        assert_eq!(classify("class QString", "", false), KnownType::QString);
        assert_eq!(classify("QList<int>", "", false), KnownType::QList);
        assert_eq!(classify("Qt5Cored!QMap<int,QString>", "", false), KnownType::QMap);
        assert_eq!(
            classify("std::vector<int,std::allocator<int> >", "", false),
            KnownType::StdVector
        );
        assert_eq!(classify("Foo", "", false), KnownType::Unknown);
    }

    #[test]
    fn test_classify_basic_string()
    {
        assert_eq!(
            classify("std::basic_string<char,std::char_traits<char>,std::allocator<char> >", "", false),
            KnownType::StdString
        );
        assert_eq!(
            classify("std::basic_string<wchar_t,std::char_traits<wchar_t>,std::allocator<wchar_t> >", "", false),
            KnownType::StdWString
        );
    }

    #[test]
    fn test_classify_pointer_and_namespace()
    {
        assert_eq!(classify("QString *", "", false), KnownType::Unknown);
        assert_eq!(classify("QString *", "", true), KnownType::QString);
        assert_eq!(classify("QString **", "", true), KnownType::Unknown);
        assert_eq!(classify("myns::QString", "myns", false), KnownType::QString);
    }

    #[test]
    fn test_flags()
    {
        assert!(KnownType::QVector.has_complex_dumper());
        assert!(KnownType::QVector.is_container());
        assert!(KnownType::QString.is_editable());
        assert!(!KnownType::QDate.is_container());
        assert!(KnownType::StdUniquePtr.is_smart_pointer());
        assert!(KnownType::QPoint.is_movable());
        assert!(!KnownType::StdString.is_movable());
    }
}
