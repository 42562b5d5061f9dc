//! Fixtures shared by the integration tests: a simulated debuggee with the
//! library layouts the dumpers decode, and helpers to pick records out of a
//! response payload.

#![allow(dead_code)]

use symgroup_core::engine::simulated::{SimulatedProcess, SimulatedTarget, StructDef};
use symgroup_core::events::{event_channel, EventQueue};
use symgroup_core::types::{Address, ThreadId};
use symgroup_core::Session;
use symgroup_utils::DumpSettings;

pub const POINTER_SIZE: u64 = 8;

pub const VECTOR_OF_INT: &str = "std::vector<int,std::allocator<int> >";
pub const STD_STRING: &str = "std::basic_string<char,std::char_traits<char>,std::allocator<char> >";
pub const MAP_OF_INT: &str = "std::map<int,int,std::less<int>,std::allocator<std::pair<int const ,int> > >";
pub const SHARED_POINT: &str = "std::shared_ptr<Point>";
pub const LIST_OF_INT: &str = "std::list<int,std::allocator<int> >";
pub const DEQUE_OF_INT: &str = "std::deque<int,std::allocator<int> >";
pub const STACK_OF_INT: &str = "std::stack<int,std::deque<int,std::allocator<int> > >";
pub const QLIST_OF_INT: &str = "QList<int>";
pub const QLIST_OF_POINT: &str = "QList<Point>";
pub const QVECTOR_OF_INT: &str = "QVector<int>";
pub const QMAP_OF_INT: &str = "QMap<int,int>";
pub const QHASH_OF_INT: &str = "QHash<int,int>";
pub const QSET_OF_INT: &str = "QSet<int>";
pub const QMULTIHASH_OF_INT: &str = "QMultiHash<int,int>";

/// Size of a `std::map<int,int>` node: three links, color and nil flag,
/// key at 28 and value at 32.
const MAP_NODE_SIZE: u64 = 40;

/// `std::list<int>` node: `_Next`, `_Prev`, value at 16.
const LIST_NODE_SIZE: u64 = 24;

/// Ints per `std::deque<int>` block.
const DEQUE_BLOCK: u64 = 4;

/// Library map node of `QMap<int,int>`: `p`, `left`, `right`, key at 24 and
/// value at 28.
const QMAP_NODE_SIZE: u64 = 32;

/// Hash node of `QHash<int,int>`: `next`, `h`, key at 12 and value at 16.
const QHASH_NODE_SIZE: u64 = 24;

pub fn ints(values: &[i32]) -> Vec<u8>
{
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn pointer(address: Address) -> [u8; 8]
{
    address.value().to_le_bytes()
}

/// A 64-bit process knowing `Point`, `QString` (major version 5) and the
/// standard library types used by the tests.
pub fn process() -> SimulatedProcess
{
    let mut process = SimulatedProcess::new(POINTER_SIZE);
    process.add_struct(StructDef::new_struct("Point", 8).with_field("x", "int", 0).with_field("y", "int", 4));
    process.add_struct(StructDef::new_class("QString", 8).with_field("d", "QArrayData *", 0));
    process.add_struct(
        StructDef::new_class(VECTOR_OF_INT, 24)
            .with_field("_Myfirst", "int *", 0)
            .with_field("_Mylast", "int *", 8)
            .with_field("_Myend", "int *", 16),
    );
    process.add_struct(
        StructDef::new_struct("std::_String_val_Bxty", 16)
            .with_field("_Buf", "char[16]", 0)
            .with_field("_Ptr", "char *", 0),
    );
    process.add_struct(
        StructDef::new_class(STD_STRING, 32)
            .with_field("_Bx", "std::_String_val_Bxty", 0)
            .with_field("_Mysize", "size_t", 16)
            .with_field("_Myres", "size_t", 24),
    );
    process.add_struct(
        StructDef::new_class(MAP_OF_INT, 16)
            .with_field("_Myhead", "std::_Tree_node<std::pair<int const ,int>,void *> *", 0)
            .with_field("_Mysize", "size_t", 8),
    );
    process.add_struct(
        StructDef::new_class(SHARED_POINT, 16)
            .with_field("_Ptr", "Point *", 0)
            .with_field("_Rep", "void *", 8),
    );
    process.add_struct(
        StructDef::new_class(LIST_OF_INT, 16)
            .with_field("_Myhead", "std::_List_node<int,void *> *", 0)
            .with_field("_Mysize", "size_t", 8),
    );
    process.add_struct(
        StructDef::new_class(DEQUE_OF_INT, 32)
            .with_field("_Map", "int * *", 0)
            .with_field("_Mapsize", "size_t", 8)
            .with_field("_Myoff", "size_t", 16)
            .with_field("_Mysize", "size_t", 24),
    );
    process.add_struct(StructDef::new_class(STACK_OF_INT, 32).with_field("c", DEQUE_OF_INT, 0));
    process.add_struct(StructDef::new_class(QLIST_OF_INT, 8).with_field("d", "QListData::Data *", 0));
    process.add_struct(StructDef::new_class(QLIST_OF_POINT, 8).with_field("d", "QListData::Data *", 0));
    process.add_struct(StructDef::new_class(QVECTOR_OF_INT, 8).with_field("d", "QTypedArrayData<int> *", 0));
    process.add_struct(StructDef::new_class(QMAP_OF_INT, 8).with_field("d", "QMapData<int,int> *", 0));
    process.add_struct(StructDef::new_class(QHASH_OF_INT, 8).with_field("d", "QHashData *", 0));
    process.add_struct(StructDef::new_class("QHash<int,QHashDummyValue>", 8).with_field("d", "QHashData *", 0));
    process.add_struct(StructDef::new_class(QSET_OF_INT, 8).with_field("q_hash", "QHash<int,QHashDummyValue>", 0));
    process.add_struct(StructDef::new_class(QMULTIHASH_OF_INT, 8).with_base(QHASH_OF_INT, 0));
    process
}

/// Wire the process's events into a new session.
pub fn session(process: SimulatedProcess) -> (Session, SimulatedTarget)
{
    session_with(process, DumpSettings::default())
}

pub fn session_with(mut process: SimulatedProcess, settings: DumpSettings) -> (Session, SimulatedTarget)
{
    let (sender, receiver) = event_channel();
    process.set_event_sender(sender);
    let target = process.into_target();
    let session = Session::new(Box::new(target.clone()), EventQueue::new(receiver), settings);
    (session, target)
}

/// Single frame 0 of thread 1 running `main`.
pub fn main_frame(process: &mut SimulatedProcess, locals: &[(&str, &str, Address)])
{
    process.add_frame(ThreadId(1), 0, "main", locals);
}

pub fn int(process: &mut SimulatedProcess, value: i32) -> Address
{
    process.alloc_bytes(&value.to_le_bytes())
}

pub fn point(process: &mut SimulatedProcess, x: i32, y: i32) -> Address
{
    process.alloc_bytes(&ints(&[x, y]))
}

/// Shared string data of major version 5 with room for `alloc` characters
/// (terminator included).
pub fn qt5_string_data(process: &mut SimulatedProcess, text: &str, alloc: u32) -> Address
{
    let units: Vec<u16> = text.encode_utf16().collect();
    let size = i32::try_from(units.len()).unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&alloc.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&24i64.to_le_bytes());
    bytes.resize(24 + alloc as usize * 2, 0);
    for (i, unit) in units.iter().enumerate() {
        bytes[24 + 2 * i..26 + 2 * i].copy_from_slice(&unit.to_le_bytes());
    }
    process.alloc_bytes(&bytes)
}

/// A `QString` object pointing at fresh string data.
pub fn qstring(process: &mut SimulatedProcess, text: &str, alloc: u32) -> Address
{
    let d = qt5_string_data(process, text, alloc);
    process.alloc_bytes(&pointer(d))
}

/// A `std::string` using its inline buffer.
pub fn std_string(process: &mut SimulatedProcess, text: &str) -> Address
{
    assert!(text.len() < 16, "inline buffer holds 15 characters");
    let mut bytes = vec![0u8; 32];
    bytes[..text.len()].copy_from_slice(text.as_bytes());
    bytes[16..24].copy_from_slice(&(text.len() as u64).to_le_bytes());
    bytes[24..32].copy_from_slice(&15u64.to_le_bytes());
    process.alloc_bytes(&bytes)
}

/// A `std::vector<int>` holding `values`.
pub fn int_vector(process: &mut SimulatedProcess, values: &[i32]) -> Address
{
    let data = process.alloc_bytes(&ints(values));
    let end = data + 4 * values.len() as u64;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&pointer(data));
    bytes.extend_from_slice(&pointer(end));
    bytes.extend_from_slice(&pointer(end));
    process.alloc_bytes(&bytes)
}

/// A `std::map<int,int>` built as a right-leaning chain of nodes below the
/// head node.
pub fn int_map(process: &mut SimulatedProcess, entries: &[(i32, i32)]) -> Address
{
    let head = process.alloc(MAP_NODE_SIZE);
    let nodes: Vec<Address> = entries.iter().map(|_| process.alloc(MAP_NODE_SIZE)).collect();
    let root = nodes.first().copied().unwrap_or(head);
    process.write_pointer(head, head).unwrap();
    process.write_pointer(head + 8, root).unwrap();
    process.write_pointer(head + 16, head).unwrap();
    process.write_unsigned(head + 25, 1, 1).unwrap();
    for (i, (node, (key, value))) in nodes.iter().zip(entries).enumerate() {
        let parent = if i == 0 { head } else { nodes[i - 1] };
        let right = nodes.get(i + 1).copied().unwrap_or(head);
        process.write_pointer(*node, head).unwrap();
        process.write_pointer(*node + 8, parent).unwrap();
        process.write_pointer(*node + 16, right).unwrap();
        process.write(*node + 28, &key.to_le_bytes()).unwrap();
        process.write(*node + 32, &value.to_le_bytes()).unwrap();
    }
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&pointer(head));
    bytes.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    process.alloc_bytes(&bytes)
}

/// A `std::list<int>`: a ring of nodes through the head node.
pub fn int_list(process: &mut SimulatedProcess, values: &[i32]) -> Address
{
    let mut ring = vec![process.alloc(LIST_NODE_SIZE)];
    ring.extend(values.iter().map(|_| process.alloc(LIST_NODE_SIZE)));
    let len = ring.len();
    for (i, node) in ring.iter().enumerate() {
        process.write_pointer(*node, ring[(i + 1) % len]).unwrap();
        process.write_pointer(*node + 8, ring[(i + len - 1) % len]).unwrap();
    }
    for (node, value) in ring[1..].iter().zip(values) {
        process.write(*node + 16, &value.to_le_bytes()).unwrap();
    }
    let mut bytes = pointer(ring[0]).to_vec();
    bytes.extend_from_slice(&(values.len() as u64).to_le_bytes());
    process.alloc_bytes(&bytes)
}

/// A `std::deque<int>` whose first element sits at slot `offset` of the
/// first block. A `std::stack<int>` has the same layout (its deque `c` is
/// at offset 0).
pub fn int_deque(process: &mut SimulatedProcess, values: &[i32], offset: u64) -> Address
{
    let blocks = (offset + values.len() as u64).div_ceil(DEQUE_BLOCK).max(1);
    let block_addresses: Vec<Address> = (0..blocks).map(|_| process.alloc(4 * DEQUE_BLOCK)).collect();
    for (i, value) in values.iter().enumerate() {
        let position = offset + i as u64;
        let block = block_addresses[usize::try_from(position / DEQUE_BLOCK).unwrap()];
        process.write(block + 4 * (position % DEQUE_BLOCK), &value.to_le_bytes()).unwrap();
    }
    let map_bytes: Vec<u8> = block_addresses.iter().flat_map(|block| pointer(*block)).collect();
    let map = process.alloc_bytes(&map_bytes);
    let mut bytes = pointer(map).to_vec();
    bytes.extend_from_slice(&blocks.to_le_bytes());
    bytes.extend_from_slice(&offset.to_le_bytes());
    bytes.extend_from_slice(&(values.len() as u64).to_le_bytes());
    process.alloc_bytes(&bytes)
}

/// A `QList` whose data block starts its pointer array at `array_offset`
/// (16 for major version 5, 24 for major version 4) and uses slots
/// `begin..begin + slots.len()`.
pub fn qlist(process: &mut SimulatedProcess, slots: &[u64], begin: i32, array_offset: u64) -> Address
{
    let first = usize::try_from(array_offset).unwrap() + 8 * usize::try_from(begin).unwrap();
    let end = begin + i32::try_from(slots.len()).unwrap();
    let mut bytes = vec![0u8; first + 8 * slots.len()];
    bytes[0..4].copy_from_slice(&1i32.to_le_bytes());
    bytes[4..8].copy_from_slice(&end.to_le_bytes());
    bytes[8..12].copy_from_slice(&begin.to_le_bytes());
    bytes[12..16].copy_from_slice(&end.to_le_bytes());
    for (i, slot) in slots.iter().enumerate() {
        bytes[first + 8 * i..first + 8 * i + 8].copy_from_slice(&slot.to_le_bytes());
    }
    let d = process.alloc_bytes(&bytes);
    process.alloc_bytes(&pointer(d))
}

/// Inline `QList` slots holding ints.
pub fn int_slots(values: &[i32]) -> Vec<u64>
{
    values.iter().map(|v| u64::from(u32::from_le_bytes(v.to_le_bytes()))).collect()
}

/// A `QVector<int>` of major version 5: array header with the data offset
/// at 16, elements at 24.
pub fn qt5_int_vector(process: &mut SimulatedProcess, values: &[i32]) -> Address
{
    let size = i32::try_from(values.len()).unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&24i64.to_le_bytes());
    bytes.extend_from_slice(&ints(values));
    let d = process.alloc_bytes(&bytes);
    process.alloc_bytes(&pointer(d))
}

/// A `QVector<int>` of major version 4: `ref`, `alloc`, `size`, `capacity`,
/// elements at 16.
pub fn qt4_int_vector(process: &mut SimulatedProcess, values: &[i32]) -> Address
{
    let size = i32::try_from(values.len()).unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&ints(values));
    let d = process.alloc_bytes(&bytes);
    process.alloc_bytes(&pointer(d))
}

/// A `QMap<int,int>` of major version 5: the header node at `d + 8` has the
/// root as its left link; entries form a right-leaning chain ending at null.
pub fn qmap(process: &mut SimulatedProcess, entries: &[(i32, i32)]) -> Address
{
    let d = process.alloc(32);
    let header = d + 8;
    let nodes: Vec<Address> = entries.iter().map(|_| process.alloc(QMAP_NODE_SIZE)).collect();
    process.write(d, &1i32.to_le_bytes()).unwrap();
    process.write(d + 4, &i32::try_from(entries.len()).unwrap().to_le_bytes()).unwrap();
    if let Some(root) = nodes.first() {
        process.write_pointer(header + 8, *root).unwrap();
    }
    for (i, (node, (key, value))) in nodes.iter().zip(entries).enumerate() {
        let parent = if i == 0 { header } else { nodes[i - 1] };
        process.write_pointer(*node, parent).unwrap();
        if let Some(right) = nodes.get(i + 1) {
            process.write_pointer(*node + 16, *right).unwrap();
        }
        process.write(*node + 24, &key.to_le_bytes()).unwrap();
        process.write(*node + 28, &value.to_le_bytes()).unwrap();
    }
    process.alloc_bytes(&pointer(d))
}

/// A hash object (`QHash<int,int>`, or a `QSet<int>`/`QMultiHash<int,int>`
/// sharing its layout) with one bucket per chain. Every chain, empty ones
/// included, ends at the data block.
pub fn qhash(process: &mut SimulatedProcess, chains: &[Vec<(i32, i32)>]) -> Address
{
    let d = process.alloc(40);
    let buckets = process.alloc(8 * chains.len() as u64);
    let size: usize = chains.iter().map(Vec::len).sum();
    process.write_pointer(d + 8, buckets).unwrap();
    process.write(d + 16, &1i32.to_le_bytes()).unwrap();
    process.write(d + 20, &i32::try_from(size).unwrap().to_le_bytes()).unwrap();
    process.write(d + 32, &i32::try_from(chains.len()).unwrap().to_le_bytes()).unwrap();
    for (bucket, chain) in chains.iter().enumerate() {
        let nodes: Vec<Address> = chain.iter().map(|_| process.alloc(QHASH_NODE_SIZE)).collect();
        process.write_pointer(buckets + 8 * bucket as u64, nodes.first().copied().unwrap_or(d)).unwrap();
        for (i, (node, (key, value))) in nodes.iter().zip(chain).enumerate() {
            process.write_pointer(*node, nodes.get(i + 1).copied().unwrap_or(d)).unwrap();
            process.write(*node + 12, &key.to_le_bytes()).unwrap();
            process.write(*node + 16, &value.to_le_bytes()).unwrap();
        }
    }
    process.alloc_bytes(&pointer(d))
}

/// The record tuple with the given iname, children included.
pub fn record<'a>(payload: &'a str, iname: &str) -> &'a str
{
    let needle = format!("{{iname=\"{iname}\"");
    let start = payload
        .find(&needle)
        .unwrap_or_else(|| panic!("no record {iname} in {payload}"));
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    for (offset, c) in payload[start..].char_indices() {
        if quoted {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                quoted = false;
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &payload[start..=start + offset];
                }
            }
            _ => {}
        }
    }
    panic!("unterminated record {iname} in {payload}");
}

/// First value of `key` in a record (still escaped).
pub fn field<'a>(record: &'a str, key: &str) -> Option<&'a str>
{
    let needle = format!("{key}=\"");
    let mut search = 0;
    while let Some(found) = record[search..].find(&needle) {
        let start = search + found;
        let preceded_ok = start == 0 || matches!(record.as_bytes()[start - 1], b',' | b'{');
        let value_start = start + needle.len();
        if preceded_ok {
            let mut escaped = false;
            for (offset, c) in record[value_start..].char_indices() {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    return Some(&record[value_start..value_start + offset]);
                }
            }
            return None;
        }
        search = value_start;
    }
    None
}
