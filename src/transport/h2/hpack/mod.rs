//! HPACK (RFC 7541): header compression for the H/2 engine.
//!
//! Grounded on `examples/carllerche-h2/src/frame/headers.rs` for how a `Headers` frame's field
//! list maps onto pseudo-headers plus a regular [`crate::header::HeaderMap`]; this retrieval
//! pack's excerpt of that crate does not carry its `hpack`/`huffman` submodules, so there is no
//! in-pack source to ground a Huffman table against. Rather than hand-write a 257-entry bit
//! table with no way to verify it, Huffman coding is out of scope here: [`Encoder`] always
//! emits plain (unencoded) string literals, and [`Decoder`] returns a `ProtocolError` if it
//! receives a string with the Huffman flag set. This is a real interoperability gap against
//! servers that always Huffman-encode (which is most of them) and is the first thing a
//! production follow-up should close.
//!
//! Decode does enforce RFC 7540 §8.1.2's ban on uppercase header field names, independent of
//! the Huffman gap above.

mod table;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    error::{Error, Result},
    header::HeaderMap,
};

/// Per RFC 7541 §4.1: 32 bytes of bookkeeping overhead charged against every dynamic table
/// entry's size, on top of the raw name/value byte lengths.
const ENTRY_OVERHEAD: usize = 32;

/// Default `SETTINGS_HEADER_TABLE_SIZE` per RFC 7540 §6.5.2, used until a peer's SETTINGS
/// frame says otherwise.
pub const DEFAULT_DYNAMIC_TABLE_SIZE: usize = 4096;

/// Caps the total decoded size of a single header list (sum of name + value + overhead across
/// every field), guarding against a peer building a huge header list out of many small,
/// individually-legal HPACK instructions — the "HPACK bomb" class of attack.
pub const DEFAULT_MAX_HEADER_LIST_SIZE: usize = 16 * 1024;

/// Caps the number of individual header fields decoded from one header list, independent of
/// their combined byte size — a second guard against a pathologically long but byte-cheap
/// field list.
const MAX_HEADER_FIELDS: usize = 256;

struct DynamicEntry {
    name: Bytes,
    value: Bytes,
}

impl DynamicEntry {
    fn size(&self) -> usize {
        self.name.len() + self.value.len() + ENTRY_OVERHEAD
    }
}

/// The dynamic table shared by an [`Encoder`] or [`Decoder`] across an H/2 connection's
/// lifetime: entries are inserted at the front and evicted from the back once the running
/// size exceeds `max_size`.
struct DynamicTable {
    entries: std::collections::VecDeque<DynamicEntry>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    fn new(max_size: usize) -> Self {
        Self {
            entries: std::collections::VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_to_fit();
    }

    fn evict_to_fit(&mut self) {
        while self.size > self.max_size {
            let Some(evicted) = self.entries.pop_back() else { break };
            self.size -= evicted.size();
        }
    }

    fn insert(&mut self, name: Bytes, value: Bytes) {
        let entry = DynamicEntry { name, value };
        self.size += entry.size();
        self.entries.push_front(entry);
        self.evict_to_fit();
    }

    fn get(&self, index: usize) -> Option<(&[u8], &[u8])> {
        self.entries.get(index).map(|e| (&e.name[..], &e.value[..]))
    }
}

/// Encodes header lists as HPACK field blocks.
///
/// Always emits "Literal Header Field without Indexing" (RFC 7541 §6.2.2), using an indexed
/// name when the static table has a match and a literal name otherwise. This is a simpler,
/// still wire-correct subset of what a full encoder would do (a full encoder would also insert
/// into its own dynamic table and emit indexed/incrementally-indexed fields for repeats); it
/// trades a little header-compression efficiency for an encoder with no dynamic-table state to
/// keep synchronized against a peer's SETTINGS-driven size changes.
pub struct Encoder {
    max_dynamic_size: usize,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            max_dynamic_size: DEFAULT_DYNAMIC_TABLE_SIZE,
        }
    }

    /// Encodes an ordered list of pseudo-headers followed by regular fields into one field
    /// block. `fields` is `(name, value)` in emission order.
    pub fn encode<'a, I>(&mut self, fields: I) -> Bytes
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut dst = BytesMut::with_capacity(256);
        for (name, value) in fields {
            if let Some(index) = table::find_name_value(name, value) {
                encode_integer(&mut dst, 0b1000_0000, 7, index as u64);
                continue;
            }
            match table::find_name(name) {
                Some(index) => {
                    encode_integer(&mut dst, 0b0000_0000, 4, index as u64);
                    encode_string(&mut dst, value);
                }
                None => {
                    dst.put_u8(0b0000_0000);
                    encode_string(&mut dst, name);
                    encode_string(&mut dst, value);
                }
            }
        }
        dst.freeze()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes HPACK field blocks back into header lists, maintaining the dynamic table a peer's
/// encoder assumes is shared.
pub struct Decoder {
    dynamic: DynamicTable,
    max_header_list_size: usize,
}

/// One decoded field: either a pseudo-header (`:method`, `:path`, `:scheme`, `:authority`, or
/// `:status`) or a regular header, kept separate because pseudo-headers don't belong in a
/// [`HeaderMap`].
pub enum Field {
    Pseudo { name: &'static str, value: String },
    Header { name: String, value: String },
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            dynamic: DynamicTable::new(DEFAULT_DYNAMIC_TABLE_SIZE),
            max_header_list_size: DEFAULT_MAX_HEADER_LIST_SIZE,
        }
    }

    /// Overrides the decompression-bomb guard (default [`DEFAULT_MAX_HEADER_LIST_SIZE`]).
    pub fn with_max_header_list_size(mut self, max_header_list_size: usize) -> Self {
        self.max_header_list_size = max_header_list_size;
        self
    }

    /// Decodes one complete field block (already reassembled across any CONTINUATION frames).
    pub fn decode(&mut self, mut block: &[u8]) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        let mut total_size = 0usize;

        while block.has_remaining() {
            let first = block[0];
            if first & 0b1000_0000 != 0 {
                let index = decode_integer(&mut block, 7)?;
                let (name, value) = self.lookup(index as usize)?;
                total_size = charge(total_size, &name, &value, self.max_header_list_size)?;
                fields.push(to_field(name, value));
            } else if first & 0b1100_0000 == 0b0100_0000 {
                let index = decode_integer(&mut block, 6)?;
                let (name, value) = self.read_literal(&mut block, index as usize)?;
                total_size = charge(total_size, &name, &value, self.max_header_list_size)?;
                self.dynamic.insert(Bytes::from(name.clone()), Bytes::from(value.clone()));
                fields.push(to_field(name, value));
            } else if first & 0b1111_0000 == 0b0010_0000 {
                let new_size = decode_integer(&mut block, 4)? as usize;
                self.dynamic.set_max_size(new_size.min(DEFAULT_DYNAMIC_TABLE_SIZE));
                continue;
            } else {
                // Literal without indexing (0b0000_xxxx) or never-indexed (0b0001_xxxx): both
                // decode identically, differing only in whether an intermediary may cache them,
                // which has no bearing on a leaf decoder.
                let index = decode_integer(&mut block, 4)?;
                let (name, value) = self.read_literal(&mut block, index as usize)?;
                total_size = charge(total_size, &name, &value, self.max_header_list_size)?;
                fields.push(to_field(name, value));
            }

            if fields.len() > MAX_HEADER_FIELDS {
                return Err(Error::protocol(format!(
                    "header list exceeded {MAX_HEADER_FIELDS} fields"
                )));
            }
        }

        Ok(fields)
    }

    fn lookup(&self, index: usize) -> Result<(String, String)> {
        if index == 0 {
            return Err(Error::protocol("HPACK index 0 is not a valid table reference"));
        }
        if index <= table::STATIC_TABLE.len() {
            let (name, value) = table::STATIC_TABLE[index - 1];
            return Ok((name.to_string(), value.to_string()));
        }
        let dynamic_index = index - table::STATIC_TABLE.len() - 1;
        self.dynamic
            .get(dynamic_index)
            .map(|(n, v)| (String::from_utf8_lossy(n).into_owned(), String::from_utf8_lossy(v).into_owned()))
            .ok_or_else(|| Error::protocol(format!("HPACK index {index} is out of range")))
    }

    fn read_literal(&self, block: &mut &[u8], name_index: usize) -> Result<(String, String)> {
        let name = if name_index == 0 {
            let name = decode_string(block)?;
            if name.bytes().any(|b| b.is_ascii_uppercase()) {
                return Err(Error::protocol("HPACK header name contains uppercase letters"));
            }
            name
        } else {
            self.lookup(name_index)?.0
        };
        let value = decode_string(block)?;
        Ok((name, value))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn charge(total_size: usize, name: &str, value: &str, max_header_list_size: usize) -> Result<usize> {
    let total = total_size + name.len() + value.len() + ENTRY_OVERHEAD;
    if total > max_header_list_size {
        return Err(Error::protocol(format!(
            "decoded header list exceeded the {max_header_list_size} byte cap"
        )));
    }
    Ok(total)
}

fn to_field(name: String, value: String) -> Field {
    match name.as_str() {
        ":method" => Field::Pseudo { name: ":method", value },
        ":path" => Field::Pseudo { name: ":path", value },
        ":scheme" => Field::Pseudo { name: ":scheme", value },
        ":authority" => Field::Pseudo { name: ":authority", value },
        ":status" => Field::Pseudo { name: ":status", value },
        _ => Field::Header { name, value },
    }
}

/// Collects the non-pseudo fields of a decoded block into a [`HeaderMap`].
pub fn fields_into_header_map(fields: &[Field]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for field in fields {
        if let Field::Header { name, value } = field {
            let _ = headers.append(name.as_str(), value);
        }
    }
    headers
}

/// RFC 7541 §5.1 integer encoding: `prefix_bits` of `prefix` are reused as-is, and the low
/// `prefix_len` bits carry the value (or the all-ones sentinel if it doesn't fit).
fn encode_integer(dst: &mut BytesMut, prefix: u8, prefix_len: u8, value: u64) {
    let max_prefix = (1u64 << prefix_len) - 1;
    if value < max_prefix {
        dst.put_u8(prefix | value as u8);
        return;
    }
    dst.put_u8(prefix | max_prefix as u8);
    let mut remaining = value - max_prefix;
    while remaining >= 128 {
        dst.put_u8((remaining % 128) as u8 | 0x80);
        remaining /= 128;
    }
    dst.put_u8(remaining as u8);
}

fn decode_integer(block: &mut &[u8], prefix_len: u8) -> Result<u64> {
    if block.is_empty() {
        return Err(Error::protocol("truncated HPACK integer"));
    }
    let max_prefix = (1u64 << prefix_len) - 1;
    let mut value = (block[0] as u64) & max_prefix;
    *block = &block[1..];
    if value < max_prefix {
        return Ok(value);
    }
    let mut shift = 0u32;
    loop {
        let Some(&byte) = block.first() else {
            return Err(Error::protocol("truncated HPACK integer continuation"));
        };
        *block = &block[1..];
        value += ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 56 {
            return Err(Error::protocol("HPACK integer too large"));
        }
    }
    Ok(value)
}

/// Encodes `value` as a plain (non-Huffman) HPACK string literal: an H=0 length prefix
/// followed by the raw bytes.
fn encode_string(dst: &mut BytesMut, value: &str) {
    encode_integer(dst, 0x00, 7, value.len() as u64);
    dst.put_slice(value.as_bytes());
}

/// Decodes an HPACK string literal. Rejects Huffman-encoded strings (H=1) — see the module doc
/// for why Huffman coding isn't implemented here.
fn decode_string(block: &mut &[u8]) -> Result<String> {
    if block.is_empty() {
        return Err(Error::protocol("truncated HPACK string"));
    }
    let huffman = block[0] & 0x80 != 0;
    let len = decode_integer(block, 7)? as usize;
    if huffman {
        return Err(Error::protocol(
            "Huffman-encoded HPACK strings are not supported",
        ));
    }
    if block.len() < len {
        return Err(Error::protocol("truncated HPACK string literal"));
    }
    let bytes = &block[..len];
    *block = &block[len..];
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::protocol("non-UTF-8 HPACK string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_literal_fields() {
        let mut encoder = Encoder::new();
        let block = encoder.encode([(":method", "GET"), ("x-custom", "value")]);

        let mut decoder = Decoder::new();
        let fields = decoder.decode(&block).unwrap();
        assert_eq!(fields.len(), 2);
        match &fields[0] {
            Field::Pseudo { name, value } => {
                assert_eq!(*name, ":method");
                assert_eq!(value, "GET");
            }
            _ => panic!("expected pseudo field"),
        }
        match &fields[1] {
            Field::Header { name, value } => {
                assert_eq!(name, "x-custom");
                assert_eq!(value, "value");
            }
            _ => panic!("expected header field"),
        }
    }

    #[test]
    fn fully_indexed_static_entry_round_trips() {
        let mut encoder = Encoder::new();
        let block = encoder.encode([(":method", "GET")]);
        // fully-indexed (:method, GET) is static index 2 -> single byte 0x82
        assert_eq!(&block[..], &[0x82]);
    }

    #[test]
    fn literal_with_incremental_indexing_populates_dynamic_table() {
        let mut dst = BytesMut::new();
        dst.put_u8(0b0100_0000); // literal with incremental indexing, new name
        encode_string(&mut dst, "x-custom");
        encode_string(&mut dst, "first");
        let mut decoder = Decoder::new();
        let fields = decoder.decode(&dst).unwrap();
        assert_eq!(fields.len(), 1);

        // index 62 is the first (most recent) dynamic-table entry
        let mut dst2 = BytesMut::new();
        encode_integer(&mut dst2, 0b1000_0000, 7, 62);
        let fields2 = decoder.decode(&dst2).unwrap();
        match &fields2[0] {
            Field::Header { name, value } => {
                assert_eq!(name, "x-custom");
                assert_eq!(value, "first");
            }
            _ => panic!("expected header field"),
        }
    }

    #[test]
    fn huffman_encoded_strings_are_rejected() {
        let mut dst = BytesMut::new();
        dst.put_u8(0b0000_0000); // literal without indexing, new name
        dst.put_u8(0x81); // H=1, length=1 string for the name
        dst.put_u8(0x00);
        let mut decoder = Decoder::new();
        let err = decoder.decode(&dst).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProtocolError);
    }

    #[test]
    fn oversized_header_list_is_rejected() {
        let mut encoder = Encoder::new();
        let huge_value = "x".repeat(100);
        let mut fields = Vec::new();
        for i in 0..200 {
            fields.push((format!("x-header-{i}"), huge_value.clone()));
        }
        let borrowed: Vec<(&str, &str)> = fields.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
        let block = encoder.encode(borrowed);
        let mut decoder = Decoder::new().with_max_header_list_size(1024);
        assert!(decoder.decode(&block).is_err());
    }

    #[test]
    fn uppercase_header_names_are_rejected() {
        let mut dst = BytesMut::new();
        dst.put_u8(0b0000_0000); // literal without indexing, new name
        encode_string(&mut dst, "X-Custom");
        encode_string(&mut dst, "value");
        let mut decoder = Decoder::new();
        let err = decoder.decode(&dst).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ProtocolError);
    }

    #[test]
    fn dynamic_table_size_update_is_honored() {
        let mut dst = BytesMut::new();
        encode_integer(&mut dst, 0b0010_0000, 4, 0);
        let mut decoder = Decoder::new();
        assert!(decoder.decode(&dst).unwrap().is_empty());
        assert_eq!(decoder.dynamic.max_size, 0);
    }
}
