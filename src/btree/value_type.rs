//! The key/value codec capability set the owning map provides. The
//! page never introspects the concrete type; it only calls
//! `memory_of`/`read`/`write`, one value at a time, since a page's
//! payload encodes its whole key (and, for leaves, value) array in
//! one pass.

use crate::btree::write_buffer::WriteBuffer;

/// A type usable as a page key or leaf value.
pub trait ValueType: Clone {
    /// Estimated in-memory footprint of `value`, used by
    /// `recalculate_memory`.
    fn memory_of(value: &Self) -> usize;

    /// Append the on-disk encoding of `value` to `buf`.
    fn write(buf: &mut WriteBuffer, value: &Self);

    /// Read one value back from `buf`.
    fn read(buf: &mut &[u8]) -> Self;
}

/// Fixed-width signed 64-bit key, the common case for an ordered
/// integer key space.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct IntKey(pub i64);

impl ValueType for IntKey {
    fn memory_of(_value: &Self) -> usize {
        8
    }

    fn write(buf: &mut WriteBuffer, value: &Self) {
        buf.put_long(value.0);
    }

    fn read(buf: &mut &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[..8]);
        *buf = &buf[8..];
        IntKey(i64::from_le_bytes(bytes))
    }
}

/// Length-prefixed byte blob, the common case for an opaque leaf
/// value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Bytes(pub Vec<u8>);

impl ValueType for Bytes {
    fn memory_of(value: &Self) -> usize {
        24 + value.0.len()
    }

    fn write(buf: &mut WriteBuffer, value: &Self) {
        buf.put_var_int(value.0.len() as u64);
        buf.put_bytes(&value.0);
    }

    fn read(buf: &mut &[u8]) -> Self {
        let len = crate::btree::write_buffer::get_var_int(buf) as usize;
        let data = buf[..len].to_vec();
        *buf = &buf[len..];
        Bytes(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_key_round_trips() {
        let mut buf = WriteBuffer::new();
        IntKey::write(&mut buf, &IntKey(-42));
        let bytes = buf.into_vec();
        let mut slice = bytes.as_slice();
        assert_eq!(IntKey::read(&mut slice), IntKey(-42));
    }

    #[test]
    fn bytes_round_trips() {
        let mut buf = WriteBuffer::new();
        let v = Bytes(b"hello world".to_vec());
        Bytes::write(&mut buf, &v);
        let bytes = buf.into_vec();
        let mut slice = bytes.as_slice();
        assert_eq!(Bytes::read(&mut slice), v);
    }
}
