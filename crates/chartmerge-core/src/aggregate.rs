//! Combining annotated documents into one desired-state tree.

use crate::annotate::AnnotatedNode;
use indexmap::IndexMap;

/// Merge `incoming` into `acc`.
///
/// Where both sides hold a mapping under the same key the merge recurses;
/// otherwise the incoming side replaces what was there. A replaced key keeps
/// its original position.
pub fn deep_merge(acc: &mut IndexMap<String, AnnotatedNode>, incoming: &IndexMap<String, AnnotatedNode>) {
    for (key, value) in incoming {
        match (acc.get_mut(key), value) {
            (Some(AnnotatedNode::Mapping(existing)), AnnotatedNode::Mapping(nested)) => {
                deep_merge(existing, nested);
            }
            _ => {
                acc.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fold annotated documents into a single tree.
///
/// Without an `order` every document is folded in, in map order. With one,
/// only the named documents are folded, left to right; a name is matched
/// against the full identifier first and then against its file name. A name
/// with no loaded document is skipped.
///
/// Documents whose root is not a mapping contribute nothing.
pub fn consolidate(documents: &IndexMap<String, AnnotatedNode>, order: Option<&[String]>) -> AnnotatedNode {
    let mut acc = IndexMap::new();
    let mut fold = |identifier: &str, tree: &AnnotatedNode| match tree {
        AnnotatedNode::Mapping(map) => {
            tracing::debug!(document = identifier, keys = map.len(), "folding document");
            deep_merge(&mut acc, map);
        }
        _ => tracing::warn!(document = identifier, "document root is not a mapping, skipped"),
    };

    match order {
        None => {
            for (identifier, tree) in documents {
                fold(identifier, tree);
            }
        }
        Some(order) => {
            for name in order {
                match find_document(documents, name) {
                    Some((identifier, tree)) => fold(identifier, tree),
                    None => tracing::warn!(document = %name, "no such document, nothing to fold"),
                }
            }
        }
    }

    AnnotatedNode::Mapping(acc)
}

fn find_document<'a>(
    documents: &'a IndexMap<String, AnnotatedNode>,
    name: &str,
) -> Option<(&'a String, &'a AnnotatedNode)> {
    documents.get_key_value(name).or_else(|| {
        documents
            .iter()
            .find(|(identifier, _)| identifier.rsplit('/').next() == Some(name))
    })
}

/// Drop top-level sections from a desired-state tree. Returns the keys that
/// were present and removed.
pub fn remove_sections(tree: &mut AnnotatedNode, keys: &[String]) -> Vec<String> {
    let AnnotatedNode::Mapping(map) = tree else {
        return Vec::new();
    };
    keys.iter()
        .filter(|key| map.shift_remove(key.as_str()).is_some())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::annotate;
    use chartmerge_yaml::{Value, parse};

    fn tree(text: &str, origin: &str) -> AnnotatedNode {
        annotate(&parse(text).unwrap(), origin)
    }

    fn documents(items: &[(&str, &str)]) -> IndexMap<String, AnnotatedNode> {
        items
            .iter()
            .map(|(id, text)| (id.to_string(), tree(text, id)))
            .collect()
    }

    #[test]
    fn test_deep_merge_recurses_into_mappings() {
        let docs = documents(&[
            ("a.yaml", "image:\n  repository: web\n  tag: '1.0'\nreplicas: 1\n"),
            ("b.yaml", "image:\n  tag: '2.0'\nreplicas: 3\n"),
        ]);
        let merged = consolidate(&docs, None).to_value();
        assert_eq!(merged.get("replicas"), Some(&Value::Integer(3)));
        let image = merged.get("image").unwrap();
        assert_eq!(image.get("repository"), Some(&Value::from("web")));
        assert_eq!(image.get("tag"), Some(&Value::from("2.0")));
    }

    #[test]
    fn test_incoming_non_mapping_replaces() {
        let docs = documents(&[("a.yaml", "ports:\n  http: 80\n"), ("b.yaml", "ports: [80, 443]\n")]);
        let merged = consolidate(&docs, None).to_value();
        assert_eq!(
            merged.get("ports"),
            Some(&Value::Sequence(vec![Value::Integer(80), Value::Integer(443)]))
        );
    }

    #[test]
    fn test_winning_leaf_keeps_origin() {
        let docs = documents(&[("a.yaml", "replicas: 1\n"), ("b.yaml", "replicas: 3\n")]);
        let merged = consolidate(&docs, None);
        let leaf = merged.get("replicas").and_then(AnnotatedNode::as_leaf).unwrap();
        assert_eq!(leaf.origin, "b.yaml");
    }

    #[test]
    fn test_explicit_order() {
        let docs = documents(&[
            ("values.yaml", "size: small\n"),
            ("config/large.yaml", "size: large\n"),
            ("config/unused.yaml", "size: unused\n"),
        ]);
        let order = vec!["config/large.yaml".to_string(), "values.yaml".to_string()];
        let merged = consolidate(&docs, Some(&order)).to_value();
        assert_eq!(merged.get("size"), Some(&Value::from("small")));

        let order = vec!["values.yaml".to_string(), "large.yaml".to_string()];
        let merged = consolidate(&docs, Some(&order)).to_value();
        assert_eq!(merged.get("size"), Some(&Value::from("large")));
    }

    #[test]
    fn test_missing_document_in_order_is_a_no_op() {
        let docs = documents(&[("values.yaml", "size: small\n")]);
        let order = vec!["missing.yaml".to_string(), "values.yaml".to_string()];
        let merged = consolidate(&docs, Some(&order)).to_value();
        assert_eq!(merged.get("size"), Some(&Value::from("small")));
    }

    #[test]
    fn test_non_mapping_root_is_skipped() {
        let docs = documents(&[("list.yaml", "- a\n- b\n"), ("values.yaml", "a: 1\n")]);
        let merged = consolidate(&docs, None).to_value();
        assert_eq!(merged.as_mapping().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_sections() {
        let docs = documents(&[("values.yaml", "web: {enabled: true}\nworker: {enabled: false}\n")]);
        let mut merged = consolidate(&docs, None);
        let removed = remove_sections(&mut merged, &["worker".to_string(), "absent".to_string()]);
        assert_eq!(removed, vec!["worker".to_string()]);
        assert!(merged.get("worker").is_none());
        assert!(merged.get("web").is_some());
    }
}
