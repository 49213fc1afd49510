//! Proves the binary codec survives an actual file, not just an
//! in-memory buffer: write a small tree through `DiskFileStore`,
//! close it out, and read every page back through a fresh handle on
//! the same path.

use std::cell::RefCell;
use std::fs::OpenOptions;
use std::rc::Rc;

use mvpage::btree::{
    write_end, write_unsaved_recursive, Bytes, Chunk, DiskFileStore, FileStore, InMemoryStore,
    IntKey, MapContext, Page, PageReference, PagePos, StoreContext,
};

struct DiskMap {
    id: u32,
    store: Rc<InMemoryStore<IntKey, Bytes>>,
    file: RefCell<DiskFileStore>,
}

impl MapContext<IntKey, Bytes> for DiskMap {
    fn compare(&self, a: &IntKey, b: &IntKey) -> std::cmp::Ordering {
        a.0.cmp(&b.0)
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn read_page(
        &self,
        pos: PagePos,
    ) -> Result<Rc<RefCell<Page<IntKey, Bytes>>>, mvpage::error::StoreError> {
        if let Some(cached) = self.store.get_cached(pos) {
            return Ok(cached);
        }
        let max_pos = self.file.borrow().len();
        let page = Page::read(&mut *self.file.borrow_mut(), pos, self, 0, max_pos)?;
        let rc = Rc::new(RefCell::new(page));
        self.store.cache_page(pos, Rc::clone(&rc));
        Ok(rc)
    }

    fn remove_page(&self, _pos: PagePos, memory: usize) {
        self.store.deregister_unsaved_page(memory);
    }
}

#[test]
fn writes_and_reads_a_tree_through_a_real_file() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(tmp.path())
        .unwrap();

    let map = DiskMap {
        id: 11,
        store: Rc::new(InMemoryStore::new(1, true)),
        file: RefCell::new(DiskFileStore::new(file)),
    };

    let mut left = Page::<IntKey, Bytes>::create_empty(11, 1, &*map.store);
    for (i, (k, v)) in [(1, "a"), (2, "b"), (3, "c")].into_iter().enumerate() {
        left.insert_leaf(i, IntKey(k), Bytes(v.as_bytes().to_vec()));
    }
    let left = Rc::new(RefCell::new(left));

    let mut right = Page::<IntKey, Bytes>::create_empty(11, 1, &*map.store);
    for (i, (k, v)) in [(10, "x"), (20, "y")].into_iter().enumerate() {
        right.insert_leaf(i, IntKey(k), Bytes(v.as_bytes().to_vec()));
    }
    let right = Rc::new(RefCell::new(right));

    let left_count = left.borrow().total_count();
    let right_count = right.borrow().total_count();
    let root = Page::new_internal(
        11,
        1,
        vec![IntKey(10)],
        vec![
            PageReference::unsaved(Rc::clone(&left), left_count),
            PageReference::unsaved(Rc::clone(&right), right_count),
        ],
        &*map.store,
    );
    let root = Rc::new(RefCell::new(root));

    let mut buf = mvpage::btree::WriteBuffer::new();
    let mut chunk = Chunk::new(1);
    let root_pos = write_unsaved_recursive(&root, &mut buf, &mut chunk, &*map.store).unwrap();
    write_end(&root).unwrap();

    let bytes = buf.into_vec();
    map.file.borrow_mut().append(&bytes).unwrap();

    let max_pos = map.file.borrow().len();
    let read_root =
        Page::<IntKey, Bytes>::read(&mut *map.file.borrow_mut(), root_pos, &map, 0, max_pos)
            .unwrap();
    assert!(!read_root.is_leaf());
    assert_eq!(read_root.total_count(), 5);

    let children = read_root.children().unwrap();
    assert_eq!(children.len(), 2);

    let left_loaded = map.read_page(children[0].position).unwrap();
    assert_eq!(left_loaded.borrow().total_count(), 3);

    let right_loaded = map.read_page(children[1].position).unwrap();
    assert_eq!(right_loaded.borrow().total_count(), 2);
}
