//! Benchmark tests for the store and the change feed
//!
//! Run with: cargo test --release bench -- --ignored --nocapture

use std::time::Instant;

use tempfile::NamedTempFile;

use bookmarks::client::Client;
use bookmarks::database::init_db;
use bookmarks::list::BookmarkList;
use bookmarks::model::{NewBookmark, User};
use bookmarks::store::Store;

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(usize),
{
    let start = Instant::now();

    for i in 0..iterations {
        f(i);
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_secs_f64() * 1000.0 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn setup_store() -> (Store, NamedTempFile) {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    (Store::new(db, 1024), temp_db)
}

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: None,
    }
}

fn row(user_id: &str, i: usize) -> NewBookmark {
    NewBookmark {
        user_id: user_id.to_string(),
        url: format!("https://example.com/bench{}", i),
        title: format!("Bench {}", i),
    }
}

#[test]
#[ignore]
fn bench_insert_bookmarks() {
    println!("\n=== Benchmark: Insert Bookmarks ===\n");

    let (store, _temp_db) = setup_store();
    let owner = user("bench_user");

    benchmark("Insert", 1000, |i| {
        store.insert(Some(&owner), row("bench_user", i)).unwrap();
    });
}

#[test]
#[ignore]
fn bench_select_by_owner_scaling() {
    println!("\n=== Benchmark: Select By Owner ===\n");

    let (store, _temp_db) = setup_store();
    let sizes = [100, 1000, 10000];
    let mut filled = 0;

    for &size in &sizes {
        let owner = user("scale_user");
        let other = user("noise_user");
        while filled < size {
            store.insert(Some(&owner), row("scale_user", filled)).unwrap();
            store.insert(Some(&other), row("noise_user", filled)).unwrap();
            filled += 1;
        }

        benchmark(&format!("Select with {} rows per owner", size), 100, |_| {
            let rows = store.select_by_owner(Some(&owner), "scale_user").unwrap();
            assert_eq!(rows.len(), size);
        });
    }
}

#[tokio::test]
#[ignore]
async fn bench_feed_fan_out() {
    println!("\n=== Benchmark: Change Feed Fan-out ===\n");

    let (store, _temp_db) = setup_store();
    let num_sessions = 100;
    let writes = 10;

    let mut handles = vec![];
    for n in 0..num_sessions {
        let token = store.issue_session(&user(&format!("user_{}", n))).unwrap();
        let client = Client::new(store.clone(), Some(token));
        let mut list = BookmarkList::new();
        list.mount(&client).await;

        handles.push(tokio::spawn(async move {
            for _ in 0..writes {
                assert!(list.next_change(&client).await);
            }
        }));
    }

    let start = Instant::now();
    let writer = user("writer");
    for i in 0..writes {
        store.insert(Some(&writer), row("writer", i)).unwrap();
    }
    for handle in handles {
        handle.await.unwrap();
    }
    let duration = start.elapsed();

    println!("  Sessions: {}", num_sessions);
    println!("  Writes: {}", writes);
    println!("  Reloads: {}", num_sessions * writes);
    println!("  Total time: {:?}\n", duration);
}

#[test]
fn bench_summary() {
    println!("\n{}", "=".repeat(60));
    println!("Benchmark Test Suite");
    println!("{}", "=".repeat(60));
    println!("\nTo run benchmarks, use:");
    println!("  cargo test --release bench -- --ignored --nocapture");
    println!("\nAvailable benchmarks:");
    println!("  • bench_insert_bookmarks        - Row insert performance");
    println!("  • bench_select_by_owner_scaling - Owner query at different sizes");
    println!("  • bench_feed_fan_out            - Reloads triggered across sessions");
    println!("\n{}\n", "=".repeat(60));
}
