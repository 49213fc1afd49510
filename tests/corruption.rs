//! Flipping a byte inside the checksum region of a serialized page
//! must surface as `FileCorrupt`, never silently accepted data.

use mvpage::btree::{Bytes, Chunk, FileStore, InMemoryFileStore, IntKey, Page, SimpleMapContext, WriteBuffer};
use mvpage::error::StoreError;

#[test]
fn flipped_checksum_byte_is_rejected() {
    let map = SimpleMapContext::<IntKey, Bytes>::new(7, 0, true);

    let mut page = Page::<IntKey, Bytes>::create_empty(7, 1, &*map.store);
    page.insert_leaf(0, IntKey(42), Bytes(b"hello".to_vec()));

    let mut buf = WriteBuffer::new();
    let mut chunk = Chunk::new(1);
    let (pos, _) = page.write(&mut buf, &mut chunk, &*map.store).unwrap();

    let mut bytes = buf.into_vec();
    // Bytes [4, 6) hold the checksum, patched in absolute-position
    // mode after the page length.
    bytes[4] ^= 0xff;

    let mut file = InMemoryFileStore::new();
    file.append(&bytes).unwrap();
    let max_pos = file.len();

    let err = Page::<IntKey, Bytes>::read(&mut file, pos, &map, 0, max_pos).unwrap_err();
    assert!(matches!(err, StoreError::FileCorrupt(_)));
}

#[test]
fn unaffected_page_still_reads_back() {
    let map = SimpleMapContext::<IntKey, Bytes>::new(7, 0, true);

    let mut page = Page::<IntKey, Bytes>::create_empty(7, 1, &*map.store);
    page.insert_leaf(0, IntKey(1), Bytes(b"x".to_vec()));

    let mut buf = WriteBuffer::new();
    let mut chunk = Chunk::new(1);
    let (pos, _) = page.write(&mut buf, &mut chunk, &*map.store).unwrap();

    let bytes = buf.into_vec();
    map.file.borrow_mut().append(&bytes).unwrap();
    let max_pos = map.file.borrow().len();

    let read_back =
        Page::<IntKey, Bytes>::read(&mut *map.file.borrow_mut(), pos, &map, 0, max_pos).unwrap();
    assert_eq!(read_back.total_count(), 1);
}
