//! Value records: one per displayed tree node.

use crate::encoding::ValueEncoding;
use crate::gdbmi::GdbmiWriter;

/// A single variable as sent to the IDE.
///
/// Records nest one level: a record for an expanded node carries its
/// children, but the children themselves never carry grandchildren. Deeper
/// levels are fetched with follow-up requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueRecord
{
    /// Absolute dotted path
    pub iname: String,
    /// Display name
    pub name: String,
    /// Type as reported by the engine
    pub type_name: String,
    /// Expression reproducing the value
    pub exp: Option<String>,
    /// Address of the value (pointee address for pointers)
    pub address: Option<u64>,
    /// Address of the symbol itself when `address` was dereferenced
    pub orig_address: Option<u64>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Value text, encoded according to `encoding`
    pub value: String,
    pub encoding: ValueEncoding,
    pub value_enabled: bool,
    pub value_editable: bool,
    /// Number of children the node has (or at least claims to have)
    pub num_child: usize,
    /// Full, untruncated value for display in a separate window
    pub edit_value: Option<(ValueEncoding, String)>,
    pub children: Option<Vec<ValueRecord>>,
}

impl ValueRecord
{
    /// Write this record as a GDBMI tuple.
    pub fn write(&self, writer: &mut GdbmiWriter)
    {
        self.write_impl(writer, true);
    }

    fn write_impl(&self, writer: &mut GdbmiWriter, with_children: bool)
    {
        writer.begin_tuple(None);
        writer.field("iname", &self.iname).field("name", &self.name);
        writer.field("type", &self.type_name);
        if let Some(exp) = &self.exp {
            writer.field("exp", exp);
        }
        if let Some(address) = self.address {
            writer.hex_field("addr", address);
        }
        if let Some(orig) = self.orig_address {
            writer.hex_field("origaddr", orig);
        }
        if let Some(size) = self.size {
            writer.field("size", size);
        }
        writer.field("value", &self.value);
        writer.field("valueencoded", self.encoding.code());
        writer.field("valueenabled", self.value_enabled);
        writer.field("valueeditable", self.value_editable);
        if let Some((encoding, text)) = &self.edit_value {
            writer.field("editformat", encoding.code()).field("editvalue", text);
        }
        writer.field("numchild", self.num_child);
        if with_children {
            if let Some(children) = &self.children {
                writer.begin_list(Some("children"));
                for child in children {
                    child.write_impl(writer, false);
                }
                writer.end_list();
            }
        }
        writer.end_tuple();
    }
}

/// Render `records` as a named GDBMI list, e.g. `locals=[{...},{...}]`.
#[must_use]
pub fn write_record_list(key: &str, records: &[ValueRecord]) -> String
{
    let mut writer = GdbmiWriter::new();
    writer.begin_list(Some(key));
    for record in records {
        record.write(&mut writer);
    }
    writer.end_list();
    writer.finish()
}
