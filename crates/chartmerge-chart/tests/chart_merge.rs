//! Chart-to-chart merges on disk.

use chartmerge_chart::{
    ApplyMode, ConsolidateOptions, FilterConfig, Outcome, PathFilter, apply_to_chart, consolidate_chart,
    copy_beside,
};
use chartmerge_yaml::{Value, parse};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn source_chart(root: &Path) {
    write(
        root,
        &[
            (
                "Chart.yaml",
                "apiVersion: v2\nname: platform\nappVersion: \"24.2\"\ndependencies:\n  - name: web\n  - name: search\n",
            ),
            ("templates/deployment.yaml", "replicas: 99\n"),
            (
                "values.yaml",
                "web:\n  replicas: 3\n  image:\n    tag: '24.2.0'\nsearch:\n  enabled: false\n  replicas: 5\n",
            ),
            ("config/production.yaml", "web:\n  replicas: 4\n"),
            ("dockerimages-values.yaml", "web:\n  image:\n    tag: ignored\n"),
        ],
    );
}

const TARGET_VALUES: &str = "# platform values\nweb:\n  replicas: \"2\"   # per zone\n  image:\n    tag: \"24.1.0\"\nsearch:\n  enabled: true\n  replicas: 1\n";

fn target_chart(root: &Path) {
    write(
        root,
        &[
            ("Chart.yaml", "apiVersion: v2\nname: platform\nappVersion: \"24.1\"\n"),
            ("templates/deployment.yaml", "replicas: 1\n"),
            ("values.yaml", TARGET_VALUES),
            ("config/production.yaml", "web:\n  replicas: 2\n"),
            ("config/broken.yaml", "web: [unclosed\n"),
        ],
    );
}

fn default_options() -> ConsolidateOptions {
    ConsolidateOptions {
        filter: PathFilter::new(&FilterConfig::default()).unwrap(),
        ..Default::default()
    }
}

#[test]
fn folder_merge_updates_targets_and_isolates_failures() {
    let temp = TempDir::new().unwrap();
    let (source, target) = (temp.path().join("source"), temp.path().join("target"));
    source_chart(&source);
    target_chart(&target);

    let consolidated = consolidate_chart(&source, &default_options()).unwrap();
    assert_eq!(consolidated.app_version.as_deref(), Some("24.2"));
    assert_eq!(consolidated.documents, vec!["config/production.yaml", "values.yaml"]);
    assert_eq!(consolidated.removed_components, vec!["search"]);

    let filter = PathFilter::new(&FilterConfig::default()).unwrap();
    let summary = apply_to_chart(&consolidated.desired, &target, &filter, ApplyMode::Write).unwrap();

    let outcomes: Vec<(&str, bool)> = summary
        .documents
        .iter()
        .map(|d| (d.identifier.as_str(), matches!(d.outcome, Outcome::Failed(_))))
        .collect();
    assert_eq!(
        outcomes,
        vec![("config/broken.yaml", true), ("config/production.yaml", false), ("values.yaml", false)]
    );
    assert_eq!(summary.updated(), 2);
    assert!(summary.has_failures());

    let values = fs::read_to_string(target.join("values.yaml")).unwrap();
    assert_eq!(
        values,
        "# platform values\nweb:\n  replicas: 3   # per zone\n  image:\n    tag: \"24.2.0\"\nsearch:\n  enabled: true\n  replicas: 1\n"
    );
    assert_eq!(fs::read_to_string(target.join("config/production.yaml")).unwrap(), "web:\n  replicas: 3\n");
    assert_eq!(fs::read_to_string(target.join("config/broken.yaml")).unwrap(), "web: [unclosed\n");
    assert_eq!(fs::read_to_string(target.join("templates/deployment.yaml")).unwrap(), "replicas: 1\n");
}

#[test]
fn disabled_components_can_be_kept() {
    let temp = TempDir::new().unwrap();
    let (source, target) = (temp.path().join("source"), temp.path().join("target"));
    source_chart(&source);
    target_chart(&target);

    let options = ConsolidateOptions {
        merge_disabled_components: true,
        ..default_options()
    };
    let consolidated = consolidate_chart(&source, &options).unwrap();
    assert!(consolidated.removed_components.is_empty());

    let filter = PathFilter::new(&FilterConfig::default()).unwrap();
    apply_to_chart(&consolidated.desired, &target, &filter, ApplyMode::Write).unwrap();

    let doc = parse(&fs::read_to_string(target.join("values.yaml")).unwrap()).unwrap();
    assert_eq!(doc.get("search.enabled"), Some(Value::Bool(false)));
    assert_eq!(doc.get("search.replicas"), Some(Value::Integer(5)));
}

#[test]
fn values_order_selects_and_orders_documents() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    source_chart(&source);

    let options = ConsolidateOptions {
        values_order: Some(vec!["values.yaml".into(), "config/production.yaml".into()]),
        ..default_options()
    };
    let consolidated = consolidate_chart(&source, &options).unwrap();
    let replicas = consolidated.desired.get("web").and_then(|web| web.get("replicas"));
    assert_eq!(replicas.map(|r| r.to_value()), Some(Value::Integer(4)));
}

#[test]
fn dry_run_and_copies_leave_the_target_alone() {
    let temp = TempDir::new().unwrap();
    let (source, target) = (temp.path().join("source"), temp.path().join("target"));
    source_chart(&source);
    target_chart(&target);
    let consolidated = consolidate_chart(&source, &default_options()).unwrap();
    let filter = PathFilter::new(&FilterConfig::default()).unwrap();

    let summary = apply_to_chart(&consolidated.desired, &target, &filter, ApplyMode::DryRun).unwrap();
    assert_eq!(summary.updated(), 2);
    assert_eq!(fs::read_to_string(target.join("values.yaml")).unwrap(), TARGET_VALUES);

    let copy = copy_beside(&target).unwrap();
    apply_to_chart(&consolidated.desired, &copy, &filter, ApplyMode::Write).unwrap();
    assert_eq!(fs::read_to_string(target.join("values.yaml")).unwrap(), TARGET_VALUES);
    assert_ne!(fs::read_to_string(copy.join("values.yaml")).unwrap(), TARGET_VALUES);
}

#[test]
fn source_must_be_a_chart() {
    let temp = TempDir::new().unwrap();
    assert!(consolidate_chart(temp.path(), &default_options()).is_err());
}
