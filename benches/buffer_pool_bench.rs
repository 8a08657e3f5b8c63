use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId};
use rand::prelude::*;

use std::sync::Arc;
use tarndb::storage::buffer::BufferPoolManager;

const REPLACER_K: usize = 2;

// Create temporary db for benchmarking
fn create_bench_buffer_pool(pool_size: usize) -> Arc<BufferPoolManager> {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, REPLACER_K, path).unwrap());

    // Keep the temp file alive
    std::mem::forget(temp_file);

    buffer_pool
}

fn seed_pages(buffer_pool: &BufferPoolManager, count: usize) -> Vec<u32> {
    let mut page_ids = Vec::with_capacity(count);
    for _ in 0..count {
        let (page, page_id) = buffer_pool.new_page().unwrap();
        {
            let mut page_guard = page.write();
            page_guard.data[..8].copy_from_slice(&(page_id as u64).to_le_bytes());
        }
        buffer_pool.unpin_page(page_id, true).unwrap();
        page_ids.push(page_id);
    }
    page_ids
}

fn buffer_pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BufferPool");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("sequential_access", size), size, |b, &size| {
            let buffer_pool = create_bench_buffer_pool(size as usize);
            let page_ids = seed_pages(&buffer_pool, size as usize);

            b.iter(|| {
                for &page_id in &page_ids {
                    let page = buffer_pool.fetch_page(page_id).unwrap();
                    {
                        let page_guard = page.read();
                        assert_eq!(&page_guard.data[..8], &(page_id as u64).to_le_bytes());
                    }
                    buffer_pool.unpin_page(page_id, false).unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("random_access", size), size, |b, &size| {
            // Twice as many pages as frames, so half the fetches evict
            let buffer_pool = create_bench_buffer_pool(size as usize);
            let page_ids = seed_pages(&buffer_pool, (size * 2) as usize);
            let mut rng = StdRng::seed_from_u64(42);

            b.iter(|| {
                let &page_id = page_ids.choose(&mut rng).unwrap();
                let page = buffer_pool.fetch_page(page_id).unwrap();
                {
                    let page_guard = page.read();
                    assert_eq!(&page_guard.data[..8], &(page_id as u64).to_le_bytes());
                }
                buffer_pool.unpin_page(page_id, false).unwrap();
            });
        });
    }

    group.finish();
}

fn guarded_fetch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("PageGuards");

    group.bench_function("fetch_page_read", |b| {
        let buffer_pool = create_bench_buffer_pool(100);
        let page_ids = seed_pages(&buffer_pool, 100);

        b.iter(|| {
            for &page_id in &page_ids {
                let guard = buffer_pool.fetch_page_read(page_id).unwrap();
                assert_eq!(&guard.data[..8], &(page_id as u64).to_le_bytes());
            }
        });
    });

    group.bench_function("fetch_page_write", |b| {
        let buffer_pool = create_bench_buffer_pool(100);
        let page_ids = seed_pages(&buffer_pool, 100);

        b.iter(|| {
            for &page_id in &page_ids {
                let mut guard = buffer_pool.fetch_page_write(page_id).unwrap();
                guard.data[8..16].copy_from_slice(&(page_id as u64).to_le_bytes());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, buffer_pool_benchmark, guarded_fetch_benchmark);
criterion_main!(benches);
