//! Client-side table example.
//!
//! Run with: cargo run --example local_table
//!
//! Loads a fixed list of planets, then walks through sorting and paging
//! while printing each page. Debug logging goes to `local_table.log`.

use std::fs::File;

use futures::StreamExt;
use serde_json::Value;
use serde_json::json;
use simplelog::{Config, LevelFilter, WriteLogger};
use tablefeed_lib::FetchCoordinator;
use tablefeed_lib::controls::{PageControl, Paginator, SortDirection, SortHandle, TableSurface};
use tablefeed_lib::error::FetchError;
use tablefeed_lib::fetch::{FetchRequest, LocalFetch};
use tablefeed_lib::trigger;

fn planets() -> Vec<Value> {
    vec![
        json!({ "name": "Mercury", "moons": 0 }),
        json!({ "name": "Venus", "moons": 0 }),
        json!({ "name": "Earth", "moons": 1 }),
        json!({ "name": "Mars", "moons": 2 }),
        json!({ "name": "Jupiter", "moons": 95 }),
        json!({ "name": "Saturn", "moons": 146 }),
        json!({ "name": "Uranus", "moons": 28 }),
        json!({ "name": "Neptune", "moons": 16 }),
    ]
}

fn print_page(label: &str, rows: &[Value], paginator: &Paginator) {
    println!(
        "{label} (page {} of {}):",
        paginator.index() + 1,
        paginator.page_count()
    );
    for row in rows {
        println!("  {:<10} {:>4}", row["name"].as_str().unwrap_or("?"), row["moons"]);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = File::create("local_table.log")?;
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
        .expect("Failed to initialize logger");

    let surface = TableSurface::new();
    let sort = SortHandle::new();
    let paginator = Paginator::new(3);

    let coordinator = FetchCoordinator::builder()
        .operation(LocalFetch::new(|_request: FetchRequest<()>| async move {
            Ok::<_, FetchError>(planets())
        }))
        .trigger(trigger::immediate())
        .surface(surface.clone())
        .sort(sort.clone())
        .paginator(paginator.clone())
        .build();

    let mut rows = coordinator.rows();
    coordinator.activate()?;

    let page = rows.next().await.unwrap_or_default();
    print_page("Unsorted", &page, &paginator);

    sort.set_sort("moons", SortDirection::Descending);
    let page = rows.next().await.unwrap_or_default();
    print_page("Most moons first", &page, &paginator);

    paginator.next_page();
    let page = rows.next().await.unwrap_or_default();
    print_page("Most moons first", &page, &paginator);

    sort.toggle("name");
    let page = rows.next().await.unwrap_or_default();
    print_page("By name", &page, &paginator);

    println!("\nSurface holds {} row(s)", surface.len());
    coordinator.teardown();
    Ok(())
}
