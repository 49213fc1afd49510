//! The two-phase write-out protocol: a tree is written bottom-up so
//! each parent can patch in its children's positions once they exist,
//! then walked a second time (`write_end`) to confirm every position
//! landed and release in-memory handles that are no longer needed.
//! This is what lets a parent reference a child before the child's
//! final offset in the chunk is known.

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::btree::chunk::Chunk;
use crate::btree::page::{Page, PageBody};
use crate::btree::position::PagePos;
use crate::btree::store::StoreContext;
use crate::btree::value_type::ValueType;
use crate::btree::write_buffer::WriteBuffer;
use crate::error::{StoreError, StoreResult};

const CHILD_POS_SIZE: usize = 8;

/// Write `page` and, recursively, every still-unsaved child, patching
/// each parent's child-position table as each child returns its
/// position. Already-positioned pages (shared, unchanged subtrees)
/// are left untouched. Returns the position assigned to `page`.
pub fn write_unsaved_recursive<K: ValueType, V: ValueType>(
    page: &Rc<RefCell<Page<K, V>>>,
    buf: &mut WriteBuffer,
    chunk: &mut Chunk,
    store: &dyn StoreContext<K, V>,
) -> StoreResult<PagePos> {
    if !page.borrow().position().is_unsaved() {
        return Ok(page.borrow().position());
    }

    let (pos, child_table_offset) = {
        let p = page.borrow();
        p.write(buf, chunk, store)?
    };

    let unsaved_children: Vec<(usize, Rc<RefCell<Page<K, V>>>)> = match page.borrow().body() {
        PageBody::Internal(children) => children
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                r.page
                    .as_ref()
                    .filter(|_| r.position.is_unsaved())
                    .map(|p| (i, Rc::clone(p)))
            })
            .collect(),
        PageBody::Leaf(_) => Vec::new(),
    };

    for (index, child) in unsaved_children {
        let child_pos = write_unsaved_recursive(&child, buf, chunk, store)?;
        let child_count = child.borrow().total_count();
        page.borrow_mut().patch_child(index, child_pos, child_count);

        let save = buf.position();
        buf.set_position(child_table_offset + index * CHILD_POS_SIZE);
        buf.put_long(child_pos.0 as i64);
        buf.set_position(save);
    }

    store.cache_page(pos, Rc::clone(page));
    if !page.borrow().is_leaf() {
        // Internal pages are consulted on every descent; cache them a
        // second time as an LIRS-style promotion hint.
        // A store without an LIRS-aware cache may treat this as a
        // harmless duplicate insert.
        store.cache_page(pos, Rc::clone(page));
    }

    trace!("write_unsaved_recursive finished at {:?}", pos.0);
    Ok(pos)
}

/// Walk `page`'s subtree confirming every child received a position,
/// then drop in-memory handles that are no longer needed since the
/// position-only reference now suffices.
pub fn write_end<K: ValueType, V: ValueType>(page: &Rc<RefCell<Page<K, V>>>) -> StoreResult<()> {
    let children: Vec<Rc<RefCell<Page<K, V>>>> = match page.borrow().body() {
        PageBody::Internal(children) => children
            .iter()
            .filter_map(|r| r.page.as_ref().map(Rc::clone))
            .collect(),
        PageBody::Leaf(_) => Vec::new(),
    };

    for child in &children {
        write_end(child)?;
    }

    if let PageBody::Internal(children) = page.borrow().body() {
        for (i, r) in children.iter().enumerate() {
            if r.page.is_some() && r.position.is_unsaved() {
                return Err(StoreError::Internal(format!(
                    "child {i} still unsaved after write-out"
                )));
            }
        }
    }

    page.borrow_mut().drop_saved_child_handles();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::map::SimpleMapContext;
    use crate::btree::page_reference::PageReference;
    use crate::btree::value_type::{Bytes, IntKey};

    #[test]
    fn writes_internal_tree_bottom_up() {
        let m = SimpleMapContext::<IntKey, Bytes>::new(3, 0, true);

        let mut left = Page::<IntKey, Bytes>::create_empty(3, 1, &*m.store);
        left.insert_leaf(0, IntKey(1), Bytes(b"a".to_vec()));
        let left = Rc::new(RefCell::new(left));

        let mut right = Page::<IntKey, Bytes>::create_empty(3, 1, &*m.store);
        right.insert_leaf(0, IntKey(5), Bytes(b"b".to_vec()));
        let right = Rc::new(RefCell::new(right));

        let left_count = left.borrow().total_count();
        let right_count = right.borrow().total_count();
        let root = Page::new_internal(
            3,
            1,
            vec![IntKey(5)],
            vec![
                PageReference::unsaved(Rc::clone(&left), left_count),
                PageReference::unsaved(Rc::clone(&right), right_count),
            ],
            &*m.store,
        );
        let root = Rc::new(RefCell::new(root));

        let mut buf = WriteBuffer::new();
        let mut chunk = Chunk::new(9);
        let root_pos = write_unsaved_recursive(&root, &mut buf, &mut chunk, &*m.store).unwrap();
        write_end(&root).unwrap();

        assert!(!root_pos.is_unsaved());
        assert!(!left.borrow().position().is_unsaved());
        assert!(!right.borrow().position().is_unsaved());

        if let PageBody::Internal(children) = root.borrow().body() {
            for child in children.iter() {
                assert!(!child.position.is_unsaved());
                assert!(child.page.is_none());
            }
        } else {
            panic!("root should be internal");
        }

        let bytes = buf.into_vec();
        m.file.borrow_mut().append(&bytes).unwrap();
        let max_pos = m.file.borrow().len();
        let read_back =
            Page::<IntKey, Bytes>::read(&mut *m.file.borrow_mut(), root_pos, &m, 0, max_pos)
                .unwrap();
        assert!(!read_back.is_leaf());
        assert_eq!(read_back.total_count(), 2);
    }
}
