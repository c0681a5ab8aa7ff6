//! End-to-end merge behaviour: source documents in, rewritten targets out.

use chartmerge_core::{AnnotatedNode, Route, annotate, consolidate, reconcile};
use chartmerge_yaml::{Value, parse};
use indexmap::IndexMap;

fn desired(sources: &[(&str, &str)]) -> AnnotatedNode {
    let documents: IndexMap<String, AnnotatedNode> = sources
        .iter()
        .map(|(id, text)| (id.to_string(), annotate(&parse(text).unwrap(), id)))
        .collect();
    consolidate(&documents, None)
}

const TARGET: &str = r#"# Target chart values
global:
  registry: &registry "registry.example.com"

defaults: &defaults
  timeout: 30
  retries: 3

web:
  <<: *defaults
  replicas: "2"
  registry: *registry
  image:
    tag: '1.0.0'   # pinned
  hosts:
    - web.example.com
    - www.example.com

worker:
  registry: *registry
  queues: [default]
"#;

#[test]
fn replicas_keep_the_target_quoting() {
    let desired = desired(&[("values.yaml", "web:\n  replicas: '3'\n")]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();
    assert!(result.text.contains("  replicas: \"3\"\n"));
    assert_eq!(result.report.paths()[0].to_string(), "web.replicas");
    assert_eq!(result.report.changes[0].route, Route::Positional);
}

#[test]
fn merge_key_update_lands_on_the_anchor() {
    let desired = desired(&[("values.yaml", "web:\n  timeout: 60\n")]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();

    let doc = parse(&result.text).unwrap();
    assert_eq!(doc.get("defaults.timeout"), Some(Value::Integer(60)));
    assert_eq!(doc.get("web.timeout"), Some(Value::Integer(60)));
    assert!(result.text.contains("  <<: *defaults\n"));
}

#[test]
fn anchored_value_propagates_to_every_alias() {
    let desired = desired(&[(
        "values.yaml",
        "global:\n  registry: &registry mirror.example.com\nweb:\n  registry: *registry\n",
    )]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();

    assert_eq!(result.report.len(), 1);
    assert_eq!(result.report.changes[0].route, Route::InPlace);
    let doc = parse(&result.text).unwrap();
    for path in ["global.registry", "web.registry", "worker.registry"] {
        assert_eq!(doc.get(path), Some(Value::from("mirror.example.com")), "{path}");
    }
    assert_eq!(result.text.matches("*registry").count(), 2);
}

#[test]
fn keys_absent_from_the_target_stay_absent() {
    let desired = desired(&[(
        "values.yaml",
        "web:\n  replicas: '2'\n  resources:\n    cpu: 1\nnewSection:\n  enabled: true\n",
    )]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();
    assert!(result.report.is_empty());
    assert_eq!(result.text, TARGET);
}

#[test]
fn longer_sequences_are_appended_at_the_tail() {
    let desired = desired(&[(
        "values.yaml",
        "web:\n  hosts:\n    - web.example.com\n    - www2.example.com\n    - api.example.com\n    - cdn.example.com\nworker:\n  queues: [default, mail]\n",
    )]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();

    let paths: Vec<String> = result.report.paths().iter().map(ToString::to_string).collect();
    assert_eq!(
        paths,
        vec!["web.hosts[1]", "web.hosts[2]", "web.hosts[3]", "worker.queues[1]"]
    );
    assert!(result.text.contains(
        "  hosts:\n    - web.example.com\n    - www2.example.com\n    - api.example.com\n    - cdn.example.com\n"
    ));
    assert!(result.text.contains("  queues: [default, mail]\n"));
}

#[test]
fn second_application_is_a_no_op() {
    let desired = desired(&[
        ("values.yaml", "web:\n  replicas: 4\n  timeout: 45\n  image:\n    tag: 2.0.0\n"),
        ("override.yaml", "web:\n  hosts: [a.example.com, b.example.com, c.example.com]\n"),
    ]);
    let first = reconcile(&desired, TARGET, "values.yaml").unwrap();
    assert!(first.is_changed());

    let second = reconcile(&desired, &first.text, "values.yaml").unwrap();
    assert!(second.report.is_empty(), "{:?}", second.report);
    assert_eq!(second.text, first.text);
}

#[test]
fn untouched_text_survives_edits() {
    let desired = desired(&[("values.yaml", "web:\n  image:\n    tag: 1.1.0\n")]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();
    assert_eq!(
        result.text,
        TARGET.replace("tag: '1.0.0'   # pinned", "tag: '1.1.0'   # pinned")
    );
}

#[test]
fn later_sources_win() {
    let desired = desired(&[
        ("values.yaml", "web:\n  replicas: 5\n"),
        ("production.yaml", "web:\n  replicas: 7\n"),
    ]);
    let result = reconcile(&desired, TARGET, "values.yaml").unwrap();
    // An integer replaces the quoted string, and is written plain to stay an integer.
    assert!(result.text.contains("  replicas: 7\n"));
}

#[test]
fn block_scalars_are_rewritten_whole() {
    for (source, target, expected) in [
        (
            "a: \"x\\ny\\n\"\n",
            "a: |\n  one\n  two\nb: 1\n",
            "a: |\n  x\n  y\nb: 1\n",
        ),
        ("a: new\n", "a: |-\n  old\nb: 1\n", "a: |-\n  new\nb: 1\n"),
        (
            "a: \"new text\\n\"\n",
            "a: >\n  old text\nb: 1\n",
            "a: >\n  new text\nb: 1\n",
        ),
        (
            "a: \"x\\ny\\n\"\n",
            "list:\n  - |\n    one\n    two\na: |\n  z\n",
            "list:\n  - |\n    one\n    two\na: |\n  x\n  y\n",
        ),
    ] {
        let desired = desired(&[("values.yaml", source)]);
        let result = reconcile(&desired, target, "values.yaml").unwrap();
        assert_eq!(result.text, expected);
        assert!(reconcile(&desired, &result.text, "values.yaml").unwrap().report.is_empty());
    }
}

#[test]
fn sequence_items_written_as_block_mappings_are_replaced_whole() {
    let renamed = desired(&[("values.yaml", "c: [{name: z}]\n")]);
    let result = reconcile(&renamed, "c:\n  - name: x\n  - name: y\n", "values.yaml").unwrap();
    assert_eq!(result.text, "c:\n  - {name: z}\n  - name: y\n");
    assert_eq!(result.report.paths()[0].to_string(), "c[0]");
    assert_eq!(result.report.changes[0].route, Route::Positional);

    let extended = desired(&[("values.yaml", "c:\n  - name: x\n    ports: [80, 81]\n")]);
    let target = "c:\n  - name: x\n    ports:\n      - 80\nd: 1\n";
    let result = reconcile(&extended, target, "values.yaml").unwrap();
    assert_eq!(result.text, "c:\n  - {name: x, ports: [80, 81]}\nd: 1\n");
    assert!(reconcile(&extended, &result.text, "values.yaml").unwrap().report.is_empty());
}

#[test]
fn appended_items_keep_crlf_line_breaks() {
    let desired = desired(&[("values.yaml", "list: [a, b, c]\n")]);
    let result = reconcile(&desired, "list:\r\n  - a\r\n  - b\r\nz: 1\r\n", "values.yaml").unwrap();
    assert_eq!(result.text, "list:\r\n  - a\r\n  - b\r\n  - c\r\nz: 1\r\n");
}

#[test]
fn self_referencing_target_is_an_error() {
    let desired = desired(&[("values.yaml", "b: 2\n")]);
    assert!(reconcile(&desired, "a: &a [*a, *a]\nb: 1\n", "values.yaml").is_err());
}
