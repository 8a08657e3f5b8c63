use anyhow::Result;
use tarndb::storage::buffer::PageGuard;

mod common;
use common::{create_test_buffer_pool, page_pattern};

#[test]
fn test_basic_guard_unpins_on_drop() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let page_id = {
        let (_guard, page_id) = buffer_pool.new_page_guarded()?;
        page_id
    };

    // delete_page refuses pinned pages, so success proves the guard
    // returned its pin
    buffer_pool.delete_page(page_id)?;

    Ok(())
}

#[test]
fn test_basic_guard_dirty_propagation() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(3)?;

    let pattern = page_pattern(1, 128);
    let page_id = {
        let (mut guard, page_id) = buffer_pool.new_page_guarded()?;
        let mut page = guard.write();
        page.data[..pattern.len()].copy_from_slice(&pattern);
        page_id
    };

    // Evict the page; the guard's dirty mark must have forced a
    // write-back
    for _ in 0..3 {
        let (_, new_id) = buffer_pool.new_page()?;
        buffer_pool.unpin_page(new_id, false)?;
    }

    let guard = buffer_pool.fetch_page_basic(page_id)?;
    assert_eq!(&guard.read().data[..pattern.len()], pattern.as_slice());

    Ok(())
}

#[test]
fn test_write_guard_marks_dirty_through_deref() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(3)?;

    let (_, page_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(page_id, false)?;

    let pattern = page_pattern(2, 64);
    {
        let mut guard = buffer_pool.fetch_page_write(page_id)?;
        guard.data[..pattern.len()].copy_from_slice(&pattern);
    }

    for _ in 0..3 {
        let (_, new_id) = buffer_pool.new_page()?;
        buffer_pool.unpin_page(new_id, false)?;
    }

    let guard = buffer_pool.fetch_page_read(page_id)?;
    assert_eq!(&guard.data[..pattern.len()], pattern.as_slice());

    Ok(())
}

#[test]
fn test_read_guard_blocks_writers() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let (page, page_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(page_id, false)?;

    {
        let _read_guard = buffer_pool.fetch_page_read(page_id)?;
        assert!(page.try_write().is_none());
        // Additional readers are fine
        assert!(page.try_read().is_some());
    }

    // Latch released with the guard
    assert!(page.try_write().is_some());

    Ok(())
}

#[test]
fn test_write_guard_excludes_readers() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let (page, page_id) = buffer_pool.new_page()?;
    buffer_pool.unpin_page(page_id, false)?;

    {
        let _write_guard = buffer_pool.fetch_page_write(page_id)?;
        assert!(page.try_read().is_none());
        assert!(page.try_write().is_none());
    }

    assert!(page.try_read().is_some());

    Ok(())
}

#[test]
fn test_guard_move_keeps_single_pin() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    fn pass_through(guard: PageGuard<'_>) -> PageGuard<'_> {
        guard
    }

    let (guard, page_id) = buffer_pool.new_page_guarded()?;
    let moved = pass_through(guard);
    drop(moved);

    // Exactly one unpin happened: the page is deletable, and a second
    // unpin would have already underflowed
    buffer_pool.delete_page(page_id)?;

    Ok(())
}

#[test]
fn test_read_guards_share_a_page() -> Result<()> {
    let (buffer_pool, _temp_file) = create_test_buffer_pool(10)?;

    let pattern = page_pattern(5, 32);
    {
        let (mut guard, _) = buffer_pool.new_page_guarded()?;
        guard.write().data[..pattern.len()].copy_from_slice(&pattern);
    }

    let first = buffer_pool.fetch_page_read(0)?;
    let second = buffer_pool.fetch_page_read(0)?;
    assert_eq!(&first.data[..pattern.len()], pattern.as_slice());
    assert_eq!(&second.data[..pattern.len()], pattern.as_slice());
    assert_eq!(first.page_id(), second.page_id());

    Ok(())
}
