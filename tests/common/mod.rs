use std::sync::Arc;
use tempfile::NamedTempFile;
use tarndb::storage::buffer::BufferPoolManager;
use anyhow::Result;

/// History depth used by the tests unless a scenario needs otherwise
pub const TEST_REPLACER_K: usize = 2;

// Create a temporary database file for testing
#[allow(dead_code)]
pub fn create_temp_db_file() -> Result<(NamedTempFile, String)> {
    let file = NamedTempFile::new()?;
    let path = file.path().to_str().unwrap().to_string();
    Ok((file, path))
}

// Create a buffer pool manager with a temporary database
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let (file, path) = create_temp_db_file()?;
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, TEST_REPLACER_K, path)?);
    Ok((buffer_pool, file))
}

// Deterministic per-page byte pattern, used to detect corruption
#[allow(dead_code)]
pub fn page_pattern(page_id: u32, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (page_id as usize).wrapping_mul(31).wrapping_add(i) as u8)
        .collect()
}
