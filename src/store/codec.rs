//! Serialized form used by DUMP/RESTORE and by RENAME to move a value.
//!
//! Layout: `type tag (u8) | payload | version (u16 LE) | CRC-64 (u64 LE)`.
//! The checksum covers every byte before it. Lengths use the compact 6/14/32/64
//! bit prefix encoding of the RDB format.

use bytes::{BufMut, Bytes, BytesMut};

use super::{DataType, HashValue, ListValue, SetValue, SortedSet, StoreError, StoreResult};

pub const DUMP_VERSION: u16 = 1;

const TRAILER_LEN: usize = 2 + 8;

struct Crc64 {
    crc: u64,
    table: [u64; 256],
}

impl Crc64 {
    fn new() -> Self {
        let mut table = [0u64; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let mut c = i as u64;
            for _ in 0..8 {
                if c & 1 != 0 {
                    c = 0xC96C5795D7870F42 ^ (c >> 1);
                } else {
                    c >>= 1;
                }
            }
            *slot = c;
        }
        Crc64 { crc: 0, table }
    }

    fn update(&mut self, data: &[u8]) {
        for &b in data {
            let idx = ((self.crc ^ b as u64) & 0xFF) as usize;
            self.crc = self.table[idx] ^ (self.crc >> 8);
        }
    }

    fn digest(&self) -> u64 {
        self.crc
    }
}

fn checksum(data: &[u8]) -> u64 {
    let mut crc = Crc64::new();
    crc.update(data);
    crc.digest()
}

pub struct DumpWriter {
    buf: BytesMut,
}

impl DumpWriter {
    fn new(data_type: DataType) -> Self {
        let mut buf = BytesMut::new();
        buf.put_u8(data_type.tag());
        Self { buf }
    }

    pub fn write_len(&mut self, len: usize) {
        let len = len as u64;
        if len < 64 {
            self.buf.put_u8((len as u8) & 0x3F);
        } else if len < 16384 {
            self.buf.put_u8((((len >> 8) as u8) & 0x3F) | 0x40);
            self.buf.put_u8(len as u8);
        } else if len <= u32::MAX as u64 {
            self.buf.put_u8(0x80);
            self.buf.put_u32(len as u32);
        } else {
            self.buf.put_u8(0x81);
            self.buf.put_u64(len);
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_len(data.len());
        self.buf.put_slice(data);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.put_u64_le(v.to_bits());
    }

    fn finish(mut self) -> Bytes {
        self.buf.put_u16_le(DUMP_VERSION);
        let crc = checksum(&self.buf);
        self.buf.put_u64_le(crc);
        self.buf.freeze()
    }
}

pub struct DumpReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DumpReader<'a> {
    fn take(&mut self, n: usize) -> StoreResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(StoreError::Corrupt)?;
        let out = self.data.get(self.pos..end).ok_or(StoreError::Corrupt)?;
        self.pos = end;
        Ok(out)
    }

    fn read_u8(&mut self) -> StoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_len(&mut self) -> StoreResult<usize> {
        let b = self.read_u8()?;
        let len = match (b & 0xC0) >> 6 {
            0 => (b & 0x3F) as u64,
            1 => (((b & 0x3F) as u64) << 8) | self.read_u8()? as u64,
            2 if b == 0x80 => {
                let raw = self.take(4)?;
                u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64
            }
            2 if b == 0x81 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                u64::from_be_bytes(raw)
            }
            _ => return Err(StoreError::Corrupt),
        };
        // A length can never exceed what is left of the payload.
        if len > (self.data.len() - self.pos) as u64 {
            return Err(StoreError::Corrupt);
        }
        Ok(len as usize)
    }

    pub fn read_bytes(&mut self) -> StoreResult<Bytes> {
        let len = self.read_len()?;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    pub fn read_f64(&mut self) -> StoreResult<f64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(f64::from_bits(u64::from_le_bytes(raw)))
    }
}

/// A value that can be turned into a dump payload and back.
pub trait DumpValue: Sized {
    const DATA_TYPE: DataType;

    fn encode(&self, w: &mut DumpWriter);

    fn decode(r: &mut DumpReader<'_>) -> StoreResult<Self>;
}

impl DumpValue for Bytes {
    const DATA_TYPE: DataType = DataType::Kv;

    fn encode(&self, w: &mut DumpWriter) {
        w.write_bytes(self);
    }

    fn decode(r: &mut DumpReader<'_>) -> StoreResult<Self> {
        r.read_bytes()
    }
}

impl DumpValue for ListValue {
    const DATA_TYPE: DataType = DataType::List;

    fn encode(&self, w: &mut DumpWriter) {
        w.write_len(self.len());
        for item in self {
            w.write_bytes(item);
        }
    }

    fn decode(r: &mut DumpReader<'_>) -> StoreResult<Self> {
        let n = r.read_len()?;
        let mut list = ListValue::with_capacity(n);
        for _ in 0..n {
            list.push_back(r.read_bytes()?);
        }
        Ok(list)
    }
}

impl DumpValue for SetValue {
    const DATA_TYPE: DataType = DataType::Set;

    fn encode(&self, w: &mut DumpWriter) {
        let mut members: Vec<&Bytes> = self.iter().collect();
        members.sort();
        w.write_len(members.len());
        for m in members {
            w.write_bytes(m);
        }
    }

    fn decode(r: &mut DumpReader<'_>) -> StoreResult<Self> {
        let n = r.read_len()?;
        let mut set = SetValue::with_capacity(n);
        for _ in 0..n {
            set.insert(r.read_bytes()?);
        }
        Ok(set)
    }
}

impl DumpValue for HashValue {
    const DATA_TYPE: DataType = DataType::Hash;

    fn encode(&self, w: &mut DumpWriter) {
        let mut fields: Vec<(&Bytes, &Bytes)> = self.iter().collect();
        fields.sort();
        w.write_len(fields.len());
        for (f, v) in fields {
            w.write_bytes(f);
            w.write_bytes(v);
        }
    }

    fn decode(r: &mut DumpReader<'_>) -> StoreResult<Self> {
        let n = r.read_len()?;
        let mut hash = HashValue::with_capacity(n);
        for _ in 0..n {
            let field = r.read_bytes()?;
            let value = r.read_bytes()?;
            hash.insert(field, value);
        }
        Ok(hash)
    }
}

impl DumpValue for SortedSet {
    const DATA_TYPE: DataType = DataType::ZSet;

    fn encode(&self, w: &mut DumpWriter) {
        w.write_len(self.len());
        for (member, score) in self.iter() {
            w.write_bytes(member);
            w.write_f64(score);
        }
    }

    fn decode(r: &mut DumpReader<'_>) -> StoreResult<Self> {
        let n = r.read_len()?;
        let mut zset = SortedSet::default();
        for _ in 0..n {
            let member = r.read_bytes()?;
            let score = r.read_f64()?;
            if score.is_nan() {
                return Err(StoreError::Corrupt);
            }
            zset.insert(member, score);
        }
        Ok(zset)
    }
}

pub(crate) fn dump_value<V: DumpValue>(value: &V) -> Bytes {
    let mut w = DumpWriter::new(V::DATA_TYPE);
    value.encode(&mut w);
    w.finish()
}

pub(crate) fn restore_value<V: DumpValue>(blob: &[u8]) -> StoreResult<V> {
    if blob.len() < 1 + TRAILER_LEN {
        return Err(StoreError::BadPayload);
    }
    let (body, crc_raw) = blob.split_at(blob.len() - 8);
    let mut crc = [0u8; 8];
    crc.copy_from_slice(crc_raw);
    if checksum(body) != u64::from_le_bytes(crc) {
        return Err(StoreError::BadPayload);
    }
    let (body, version) = body.split_at(body.len() - 2);
    if u16::from_le_bytes([version[0], version[1]]) > DUMP_VERSION {
        return Err(StoreError::BadPayload);
    }
    if body[0] != V::DATA_TYPE.tag() {
        return Err(StoreError::TypeMismatch);
    }
    let mut r = DumpReader { data: body, pos: 1 };
    let value = V::decode(&mut r)?;
    if r.pos != body.len() {
        return Err(StoreError::Corrupt);
    }
    Ok(value)
}
