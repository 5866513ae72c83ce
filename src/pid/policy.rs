//! Collection policies and namespace resolution
//!
//! A parent container may carry a collection-policy document declaring which
//! content models apply inside it and which identifier namespace each one
//! implies. Resolution intersects an item's content models with those
//! declarations; the first policy entry that matches, in declared order,
//! wins. Everything else falls back silently to the item's own namespace.

use crate::ingest::{ImportItem, IngestError};
use crate::repository::RepositoryClient;
use crate::types::{ContentModel, Namespace, Pid};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One declaration in a collection policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    pub content_model: ContentModel,
    pub namespace: Namespace,
}

/// Parsed collection-policy document, entry order as declared
#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    entries: Vec<PolicyEntry>,
}

impl PolicyDocument {
    /// Parse a policy from its XML datastream
    ///
    /// Expected shape:
    /// `<collection_policy><content_models><content_model pid=".." namespace=".."/>…`
    /// Entries missing either attribute are skipped.
    pub fn parse(xml: &str) -> Result<Self, IngestError> {
        let mut reader = Reader::from_str(xml);
        let mut entries = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| IngestError::Policy(e.to_string()))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    if e.local_name().as_ref() == b"content_model" {
                        let mut pid = None;
                        let mut namespace = None;
                        for attr in e.attributes().flatten() {
                            let value = attr
                                .unescape_value()
                                .map_err(|e| IngestError::Policy(e.to_string()))?
                                .into_owned();
                            match attr.key.as_ref() {
                                b"pid" => pid = Some(value),
                                b"namespace" => namespace = Some(value),
                                _ => {}
                            }
                        }
                        if let (Some(pid), Some(ns)) = (pid, namespace) {
                            entries.push(PolicyEntry {
                                content_model: ContentModel::new(pid),
                                namespace: Namespace::new(ns),
                            });
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { entries })
    }

    /// Declared applicable content models, in policy order
    pub fn applicable_models(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// Namespace of the first entry whose model appears in `models`
    pub fn namespace_for(&self, models: &[ContentModel]) -> Option<&Namespace> {
        self.entries
            .iter()
            .find(|entry| models.contains(&entry.content_model))
            .map(|entry| &entry.namespace)
    }
}

/// Per-run cache of parsed policies, keyed by parent container id
///
/// An explicit instance threaded through the pipeline run; a parent whose
/// policy is absent or unparseable caches `None` so the store is asked at
/// most once per parent per run.
#[derive(Default)]
pub struct CollectionPolicyCache {
    policies: HashMap<Pid, Option<PolicyDocument>>,
}

impl CollectionPolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct parents consulted so far
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Determines which namespace an item draws identifiers from
pub struct NamespaceResolver {
    client: Arc<dyn RepositoryClient>,
    cache: CollectionPolicyCache,
}

impl NamespaceResolver {
    pub fn new(client: Arc<dyn RepositoryClient>) -> Self {
        Self {
            client,
            cache: CollectionPolicyCache::new(),
        }
    }

    /// Resolve the namespace for `item` under the given parent container
    ///
    /// Never fails: an absent parent policy or an empty intersection falls
    /// back to the item's default namespace.
    pub fn resolve(&mut self, item: &ImportItem, parent: &Pid) -> Namespace {
        if let Some(policy) = self.policy_for(parent) {
            if let Some(ns) = policy.namespace_for(item.content_models()) {
                debug!("Policy of '{}' maps item into namespace '{}'", parent, ns);
                return ns.clone();
            }
        }
        item.default_namespace().clone()
    }

    fn policy_for(&mut self, parent: &Pid) -> Option<&PolicyDocument> {
        let client = &self.client;
        self.cache
            .policies
            .entry(parent.clone())
            .or_insert_with(|| match client.load_policy(parent) {
                Ok(Some(xml)) => match PolicyDocument::parse(&xml) {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        warn!("Unparseable collection policy on '{}': {}", parent, e);
                        None
                    }
                },
                Ok(None) => None,
                Err(e) => {
                    warn!("Could not load collection policy of '{}': {}", parent, e);
                    None
                }
            })
            .as_ref()
    }

    pub fn cache(&self) -> &CollectionPolicyCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TransformRegistry;
    use crate::ingest::item::{ImportItem, XmlRecordVariant};
    use crate::repository::MemoryRepository;

    const POLICY_XML: &str = r#"<collection_policy>
  <content_models>
    <content_model pid="model:audio" namespace="audio"/>
    <content_model pid="model:x" namespace="ns1"/>
    <content_model pid="model:generic" namespace="gen"/>
    <content_model pid="model:broken"/>
  </content_models>
</collection_policy>"#;

    fn item_with_models(models: &[&str]) -> ImportItem {
        ImportItem::new(
            Box::new(XmlRecordVariant::new(
                "<record><title>T</title></record>".to_string(),
                models.iter().map(|m| ContentModel::new(*m)).collect(),
                Namespace::new("ir"),
            )),
            Arc::new(TransformRegistry::with_builtins()),
            "simplify",
        )
    }

    #[test]
    fn test_parse_preserves_declared_order() {
        let policy = PolicyDocument::parse(POLICY_XML).unwrap();
        let models = policy.applicable_models();
        // The attribute-less entry is dropped
        assert_eq!(models.len(), 3);
        assert_eq!(models[0].content_model.as_str(), "model:audio");
        assert_eq!(models[1].namespace.as_str(), "ns1");
    }

    #[test]
    fn test_first_declared_match_wins() {
        let policy = PolicyDocument::parse(POLICY_XML).unwrap();
        // Item carries both generic and x; x is declared earlier in the policy
        let models = vec![ContentModel::new("model:generic"), ContentModel::new("model:x")];
        assert_eq!(policy.namespace_for(&models).unwrap().as_str(), "ns1");
    }

    #[test]
    fn test_policy_overrides_item_default() {
        let repo = Arc::new(MemoryRepository::new());
        let parent = Pid::from("collection:root");
        repo.set_policy(parent.clone(), POLICY_XML);

        let mut resolver = NamespaceResolver::new(repo);
        let item = item_with_models(&["model:x"]);
        assert_eq!(resolver.resolve(&item, &parent).as_str(), "ns1");
    }

    #[test]
    fn test_empty_intersection_falls_back() {
        let repo = Arc::new(MemoryRepository::new());
        let parent = Pid::from("collection:root");
        repo.set_policy(parent.clone(), POLICY_XML);

        let mut resolver = NamespaceResolver::new(repo);
        let item = item_with_models(&["model:unlisted"]);
        assert_eq!(resolver.resolve(&item, &parent).as_str(), "ir");
    }

    #[test]
    fn test_absent_policy_falls_back() {
        let repo = Arc::new(MemoryRepository::new());
        let mut resolver = NamespaceResolver::new(repo);
        let item = item_with_models(&["model:x"]);
        assert_eq!(
            resolver.resolve(&item, &Pid::from("collection:bare")).as_str(),
            "ir"
        );
    }

    #[test]
    fn test_policy_loaded_once_per_parent() {
        let repo = Arc::new(MemoryRepository::new());
        let parent = Pid::from("collection:root");
        repo.set_policy(parent.clone(), POLICY_XML);

        let mut resolver = NamespaceResolver::new(repo.clone());
        let item = item_with_models(&["model:x"]);
        for _ in 0..5 {
            resolver.resolve(&item, &parent);
        }
        resolver.resolve(&item, &Pid::from("collection:other"));

        assert_eq!(repo.policy_load_count(&parent), 1);
        assert_eq!(resolver.cache().len(), 2);
    }
}
