//! End-to-end scanner + loader scenarios over real directories.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use sieve_filters::{
    DeclarativeFilter, DefaultFactory, FilterLoader, FilterScanner, LoaderContext, LoadStatus,
    YamlCompiler,
};

fn new_loader() -> Arc<FilterLoader> {
    Arc::new(FilterLoader::new(LoaderContext::new(
        Arc::new(YamlCompiler),
        Arc::new(DefaultFactory),
    )))
}

fn write_with_mtime(path: &Path, yaml: &str, secs: u64) {
    fs::write(path, yaml).unwrap();
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs))
        .unwrap();
}

fn dir_str(dir: &TempDir) -> String {
    dir.path().to_str().unwrap().to_string()
}

fn pre_names(loader: &FilterLoader) -> Vec<String> {
    loader
        .filters_by_type("pre")
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

#[test]
fn scenario_a_priority_orders_across_roots() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    fs::write(dir_a.path().join("F1.yml"), "type: pre\npriority: 5\n").unwrap();
    fs::write(dir_b.path().join("F2.yml"), "type: pre\npriority: 1\n").unwrap();

    let loader = new_loader();
    let scanner =
        FilterScanner::init(Arc::clone(&loader), 60, [dir_str(&dir_a), dir_str(&dir_b)]).unwrap();

    assert_eq!(pre_names(&loader), vec!["F2", "F1"]);
    scanner.join();
}

#[test]
fn scenario_b_edit_between_cycles_replaces_filter() {
    let dir = TempDir::new().unwrap();
    let f1 = dir.path().join("F1.yml");
    write_with_mtime(&f1, "type: pre\npriority: 5\nparams:\n  version: 1\n", 0);
    fs::write(dir.path().join("F2.yml"), "type: pre\npriority: 1\n").unwrap();

    let loader = new_loader();
    let scanner = FilterScanner::init(Arc::clone(&loader), 3600, [dir_str(&dir)]).unwrap();
    let stale = loader.filters_by_type("pre")[1].clone();

    write_with_mtime(&f1, "type: pre\npriority: 0\nparams:\n  version: 2\n", 60);
    let report = scanner.scan_now();
    assert_eq!(report.loaded(), 1);

    let live = loader.filters_by_type("pre");
    assert_eq!(pre_names(&loader), vec!["F1", "F2"]);
    let f1_live = live[0]
        .as_any()
        .downcast_ref::<DeclarativeFilter>()
        .unwrap();
    assert_eq!(f1_live.params()["version"].as_i64(), Some(2));
    assert!(live.iter().all(|f| !Arc::ptr_eq(f, &stale)));
    assert_eq!(loader.len(), 2);
    scanner.join();
}

#[test]
fn scenario_c_compile_failure_is_isolated() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("F1.yml"), "type: pre\npriority: 5\n").unwrap();
    fs::write(dir.path().join("F2.yml"), "type: pre\npriority: 1\n").unwrap();
    fs::write(dir.path().join("F3.yml"), "type: pre\npriority: {{ not yaml").unwrap();

    let loader = new_loader();
    let scanner = FilterScanner::init(Arc::clone(&loader), 3600, [dir_str(&dir)]).unwrap();

    assert_eq!(pre_names(&loader), vec!["F2", "F1"]);
    let report = scanner.last_report().unwrap();
    let f3 = report
        .results
        .iter()
        .find(|r| r.path.ends_with("F3.yml"))
        .unwrap();
    assert!(matches!(f3.status, LoadStatus::Failed { .. }));

    scanner.shutdown();
    scanner.join();
    assert!(!scanner.is_running());
    assert_eq!(pre_names(&loader), vec!["F2", "F1"]);
}

#[test]
fn equal_priorities_follow_discovery_order() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("b.yml"), "type: pre\npriority: 3\n").unwrap();
    fs::write(dir.path().join("a.yml"), "type: pre\npriority: 3\n").unwrap();
    fs::write(dir.path().join("nested/0.yml"), "type: pre\npriority: 3\n").unwrap();

    let loader = new_loader();
    let scanner = FilterScanner::init(Arc::clone(&loader), 3600, [dir_str(&dir)]).unwrap();

    assert_eq!(pre_names(&loader), vec!["a", "b", "0"]);
    scanner.join();
}

#[test]
fn hot_reload_keeps_equal_priority_order() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.yml");
    write_with_mtime(&a, "type: pre\npriority: 3\n", 0);
    write_with_mtime(&dir.path().join("b.yml"), "type: pre\npriority: 3\n", 0);

    let loader = new_loader();
    let scanner = FilterScanner::init(Arc::clone(&loader), 3600, [dir_str(&dir)]).unwrap();
    assert_eq!(pre_names(&loader), vec!["a", "b"]);

    write_with_mtime(&a, "type: pre\npriority: 3\nparams:\n  version: 2\n", 60);
    assert_eq!(scanner.scan_now().loaded(), 1);

    assert_eq!(pre_names(&loader), vec!["a", "b"]);
    scanner.join();
}

#[test]
fn concurrent_scans_and_pushes_keep_one_instance_per_identity() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        let yaml = format!("type: pre\npriority: {i}\n");
        fs::write(dir.path().join(format!("f{i}.yml")), yaml).unwrap();
    }

    let loader = new_loader();
    let scanner = FilterScanner::init(Arc::clone(&loader), 3600, [dir_str(&dir)]).unwrap();

    const THREADS: usize = 8;
    let barrier = Barrier::new(THREADS);
    std::thread::scope(|s| {
        for t in 0..THREADS {
            let scanner = &scanner;
            let loader = &loader;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                if t % 2 == 0 {
                    scanner.scan_now();
                } else {
                    loader
                        .load_from_source("type: pre\npriority: 100\n", "pushed")
                        .unwrap();
                }
                loader.filters_by_type("pre");
            });
        }
    });

    assert_eq!(loader.len(), 6);
    let pre = loader.filters_by_type("pre");
    assert_eq!(pre.len(), 6);
    assert!(pre.windows(2).all(|w| w[0].priority() <= w[1].priority()));
    assert_eq!(pre.last().unwrap().name(), "pushed");
    scanner.join();
}
