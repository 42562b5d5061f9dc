//! Formatters for small library value types: dates, times, geometry, flags,
//! atomics and the object name of `QObject`.

use chrono::{NaiveDate, NaiveTime};

use super::strings::read_qt5_string;
use super::{strings, KnownType, SimpleDump};
use crate::engine::memory::align_up;
use crate::error::{Result, SymbolGroupError};
use crate::types::Address;
use crate::value::{DumpContext, SymbolGroupValue};

/// Julian day number of 0001-01-01 minus one: `jd - JULIAN_DAY_OFFSET` is the
/// day count from the common era used by chrono.
const JULIAN_DAY_OFFSET: i64 = 1_721_425;

const MSECS_PER_DAY: i64 = 86_400_000;

/// Run the formatter for `known`; `Ok(None)` if `known` is not handled here.
///
/// ## Errors
///
/// [`SymbolGroupError::Dumper`] for missing members or unreadable memory.
pub fn dump(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, known: KnownType) -> Result<Option<SimpleDump>>
{
    let text = match known {
        KnownType::QDate => format_date(int_member(ctx, value, "jd")?),
        KnownType::QTime => format_time(int_member(ctx, value, "mds")?),
        KnownType::QPoint => {
            let x = int_member(ctx, value, "xp")?;
            let y = int_member(ctx, value, "yp")?;
            format!("({x}, {y})")
        }
        KnownType::QPointF => {
            let x = float_member(ctx, value, "xp")?;
            let y = float_member(ctx, value, "yp")?;
            format!("({x}, {y})")
        }
        KnownType::QSize => {
            let w = int_member(ctx, value, "wd")?;
            let h = int_member(ctx, value, "ht")?;
            format!("{w}x{h}")
        }
        KnownType::QSizeF => {
            let w = float_member(ctx, value, "wd")?;
            let h = float_member(ctx, value, "ht")?;
            format!("{w}x{h}")
        }
        KnownType::QRect => {
            let x1 = int_member(ctx, value, "x1")?;
            let y1 = int_member(ctx, value, "y1")?;
            let x2 = int_member(ctx, value, "x2")?;
            let y2 = int_member(ctx, value, "y2")?;
            let (Some(w), Some(h)) = (extent(x1, x2), extent(y1, y2)) else {
                return Err(SymbolGroupError::Dumper(format!("rect ({x1}, {y1})-({x2}, {y2}) out of range")));
            };
            format_rect(w, h, x1, y1)
        }
        KnownType::QRectF => {
            let x = float_member(ctx, value, "xp")?;
            let y = float_member(ctx, value, "yp")?;
            let w = float_member(ctx, value, "w")?;
            let h = float_member(ctx, value, "h")?;
            format_rect(w, h, x, y)
        }
        KnownType::QLine => {
            let p1 = value.member(ctx, "pt1");
            let p2 = value.member(ctx, "pt2");
            let x1 = int_member(ctx, &p1, "xp")?;
            let y1 = int_member(ctx, &p1, "yp")?;
            let x2 = int_member(ctx, &p2, "xp")?;
            let y2 = int_member(ctx, &p2, "yp")?;
            format!("({x1}, {y1}), ({x2}, {y2})")
        }
        KnownType::QFlags => {
            let flags = int_member(ctx, value, "i")?;
            format!("0x{:x}", flags & 0xffff_ffff)
        }
        KnownType::QAtomicInt => atomic_value(ctx, value)?.to_string(),
        KnownType::QObject => strings::quote(&object_name(ctx, value)?, ctx.settings.string_limit),
        _ => return Ok(None),
    };
    Ok(Some(SimpleDump::text(text)))
}

fn int_member(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, name: &str) -> Result<i64>
{
    let member = value.member(ctx, name);
    if !member.is_valid() {
        return Err(SymbolGroupError::Dumper(member.error().to_string()));
    }
    Ok(member.int_value(ctx.group, 0))
}

fn float_member(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue, name: &str) -> Result<f64>
{
    let member = value.member(ctx, name);
    if !member.is_valid() {
        return Err(SymbolGroupError::Dumper(member.error().to_string()));
    }
    Ok(member.float_value(ctx.group, 0.0))
}

/// Length of the inclusive range `from..=to`.
fn extent(from: i64, to: i64) -> Option<i64>
{
    to.checked_sub(from)?.checked_add(1)
}

fn format_rect<T: std::fmt::Display + PartialOrd + Default>(w: T, h: T, x: T, y: T) -> String
{
    let sign = |v: &T| if *v < T::default() { "" } else { "+" };
    format!("{w}x{h}{}{x}{}{y}", sign(&x), sign(&y))
}

/// `YYYY-MM-DD` for a Julian day number, `(invalid)` outside chrono's range.
#[must_use]
pub fn format_date(julian_day: i64) -> String
{
    julian_day
        .checked_sub(JULIAN_DAY_OFFSET)
        .filter(|_| julian_day > 0)
        .and_then(|days| i32::try_from(days).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map_or_else(|| "(invalid)".to_string(), |date| date.format("%Y-%m-%d").to_string())
}

/// `HH:MM:SS.mmm` for milliseconds since midnight, `(invalid)` otherwise.
#[must_use]
pub fn format_time(msecs: i64) -> String
{
    if !(0..MSECS_PER_DAY).contains(&msecs) {
        return "(invalid)".to_string();
    }
    let seconds = u32::try_from(msecs / 1000).unwrap_or_default();
    let nanos = u32::try_from((msecs % 1000) * 1_000_000).unwrap_or_default();
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
        .map_or_else(|| "(invalid)".to_string(), |time| time.format("%H:%M:%S%.3f").to_string())
}

fn atomic_value(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<i64>
{
    let member = value.find_member(ctx, "_q_value");
    if member.is_valid() && !super::typename::is_aggregate_value(&member.value_text(ctx.group)) {
        return Ok(member.int_value(ctx.group, 0));
    }
    let address = value
        .object_address(ctx.group)
        .ok_or_else(|| SymbolGroupError::Dumper("atomic without address".to_string()))?;
    Ok(i64::from(ctx.read_i32(address)?))
}

/// Offsets into the private object data of major version 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLayout
{
    /// Offset of the private data pointer in the object
    pub d_ptr: u64,
    /// Offset of the extra-data pointer in the private data
    pub extra_data: u64,
    /// Offset of the object name in the extra data
    pub object_name: u64,
}

impl ObjectLayout
{
    /// Layout for a pointer size. The private data starts with the public
    /// object data (vtable, back pointer, parent, children list, flag word).
    #[must_use]
    pub fn for_pointer_size(pointer_size: u64) -> Self
    {
        Self {
            d_ptr: pointer_size,
            extra_data: align_up(5 * pointer_size + 8, pointer_size),
            object_name: 4 * pointer_size,
        }
    }
}

fn object_name(ctx: &mut DumpContext<'_>, value: &SymbolGroupValue) -> Result<String>
{
    let library = ctx.library();
    if library.major_version != 5 {
        return Err(SymbolGroupError::Dumper(format!(
            "object layout of major version {} not supported",
            library.major_version
        )));
    }
    let object = value
        .object_address(ctx.group)
        .ok_or_else(|| SymbolGroupError::Dumper("object without address".to_string()))?;
    let layout = ObjectLayout::for_pointer_size(ctx.pointer_size());
    let d = ctx.read_pointer(object + layout.d_ptr)?;
    if d.is_null() {
        return Err(SymbolGroupError::Dumper("object without private data".to_string()));
    }
    let extra = ctx.read_pointer(d + layout.extra_data)?;
    if extra.is_null() {
        return Ok(String::new());
    }
    let name_d: Address = ctx.read_pointer(extra + layout.object_name)?;
    read_qt5_string(ctx, name_d)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_format_date()
    {
        assert_eq!(format_date(2_440_588), "1970-01-01");
        assert_eq!(format_date(2_451_545), "2000-01-01");
        assert_eq!(format_date(0), "(invalid)");
        assert_eq!(format_date(i64::MAX), "(invalid)");
        assert_eq!(format_date(i64::MIN), "(invalid)");
    }

    #[test]
    fn test_format_time()
    {
        assert_eq!(format_time(3_723_004), "01:02:03.004");
        assert_eq!(format_time(-1), "(invalid)");
    }

    #[test]
    fn test_format_rect()
    {
        assert_eq!(format_rect(10, 20, 1, -2), "10x20+1-2");
    }

    #[test]
    fn test_rect_extent()
    {
        assert_eq!(extent(0, 9), Some(10));
        assert_eq!(extent(5, 4), Some(0));
        assert_eq!(extent(i64::MIN, i64::MAX), None);
        assert_eq!(extent(0, i64::MAX), None);
    }

    #[test]
    fn test_object_layout()
    {
        let layout = ObjectLayout::for_pointer_size(8);
        assert_eq!(layout.d_ptr, 8);
        assert_eq!(layout.extra_data, 48);
        assert_eq!(layout.object_name, 32);
        assert_eq!(ObjectLayout::for_pointer_size(4).extra_data, 28);
    }
}
