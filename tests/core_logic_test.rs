use checkrc::builders::coverage::{FileMeasurement, Measurement, account};
use checkrc::builders::reporter::{assemble, format_line_ranges};
use checkrc::core::config::{ConfigManager, ConfigProvider};
use checkrc::core::engine::StyleEngine;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = "\
[style]
max-line-length = 99
exclude = vendored
extend-ignore = W50

[coverage:run]
branch = false
source = pkg
parallel = true

[coverage:report]
show_missing = true
skip_covered = true
omit = */generated/*
";

fn setup_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("checkrc.cfg"), CONFIG).unwrap();

    fs::create_dir_all(dir.path().join("pkg/generated")).unwrap();
    fs::create_dir_all(dir.path().join("vendored")).unwrap();

    fs::write(
        dir.path().join("pkg/api.py"),
        "\
def add(a, b):
    return a + b

def cli():
    raise NotImplementedError

if __name__ == \"__main__\":
    cli()
",
    )
    .unwrap();
    fs::write(
        dir.path().join("pkg/util.py"),
        "\
def mul(a, b):
    return a * b

def unused():
    return None
",
    )
    .unwrap();
    fs::write(
        dir.path().join("pkg/generated/stub.py"),
        "def stub():\n    return None\n",
    )
    .unwrap();
    fs::write(dir.path().join("vendored/lib.py"), "v".repeat(200)).unwrap();

    dir
}

fn measurement(entries: &[(&str, &[usize])]) -> Measurement {
    let mut files = BTreeMap::new();
    for (path, executed) in entries {
        files.insert(
            path.to_string(),
            FileMeasurement {
                executed: executed.iter().copied().collect(),
                arcs: BTreeSet::new(),
            },
        );
    }
    Measurement { files }
}

#[test]
fn test_discovery_and_load() {
    let dir = setup_project();

    // Discovery walks upward, so starting inside pkg/ finds the root file.
    let manager = ConfigManager::new_at(dir.path().join("pkg")).unwrap();
    assert_eq!(manager.root(), dir.path());

    let outcome = manager.load_config().unwrap();
    assert_eq!(outcome.style.max_line_length, 99);
    assert_eq!(outcome.style.exclude, vec!["vendored"]);
    assert!(outcome.coverage.parallel);
    assert!(outcome.coverage.report.skip_covered);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_style_check_workflow() {
    let dir = setup_project();

    // A 100-character line in a scanned file, and a much longer one in an
    // excluded directory.
    fs::write(
        dir.path().join("pkg/wide.py"),
        format!("ok = 1\n{}\n", "x".repeat(100)),
    )
    .unwrap();

    let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
    let outcome = manager.load_config().unwrap();
    let engine = StyleEngine::new(outcome.style).unwrap();

    let diagnostics = engine.check_path(dir.path()).unwrap();
    assert_eq!(diagnostics.len(), 1, "diagnostics: {diagnostics:?}");
    assert!(diagnostics[0].path.ends_with("pkg/wide.py"));
    assert_eq!(diagnostics[0].line, 2);
    assert_eq!(diagnostics[0].code, "E501");
}

#[test]
fn test_parallel_coverage_report_workflow() {
    let dir = setup_project();

    // Two per-process artifacts, as a parallel run would leave behind.
    let first = measurement(&[("pkg/api.py", &[1, 2]), ("pkg/util.py", &[1])]);
    let second = measurement(&[
        ("pkg/api.py", &[1, 4, 8]),
        ("pkg/util.py", &[2]),
        ("pkg/generated/stub.py", &[1]),
    ]);
    let first_path = dir.path().join("run-1.json");
    let second_path = dir.path().join("run-2.json");
    first.save(&first_path).unwrap();
    second.save(&second_path).unwrap();

    let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
    let outcome = manager.load_config().unwrap();

    // Merge order must not matter.
    let forward = Measurement::merged([
        Measurement::load(&first_path).unwrap(),
        Measurement::load(&second_path).unwrap(),
    ]);
    let backward = Measurement::merged([
        Measurement::load(&second_path).unwrap(),
        Measurement::load(&first_path).unwrap(),
    ]);
    assert_eq!(forward, backward);

    let accountings = account(&forward, &outcome.coverage, dir.path()).unwrap();
    let report = assemble(accountings, &outcome.coverage.report).unwrap();

    // api.py reaches 100% because its unexecuted lines (the bare raise and
    // the entry-point guard) are built-in exclusions; skip_covered hides it.
    assert_eq!(report.skipped_covered, 1);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].path, "pkg/util.py");
    assert_eq!(report.rows[0].missed, vec![4, 5]);
    assert_eq!(format_line_ranges(&report.rows[0].missed), "4-5");

    // The hidden file still counts toward the aggregate: 4 statements from
    // each file, 2 missed in util.py.
    assert_eq!(report.total_statements, 8);
    assert_eq!(report.total_missed, 2);
    assert!((report.total_percent() - 75.0).abs() < f64::EPSILON);
}

#[test]
fn test_omitted_file_never_reported() {
    let dir = setup_project();
    let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
    let outcome = manager.load_config().unwrap();

    // Only the generated stub was measured, and it matches an omit pattern.
    let merged = measurement(&[("pkg/generated/stub.py", &[1])]);
    let accountings = account(&merged, &outcome.coverage, dir.path()).unwrap();
    let report = assemble(accountings, &outcome.coverage.report).unwrap();

    assert!(report.rows.is_empty());
    assert_eq!(report.total_statements, 0);
}
