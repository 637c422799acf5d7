//! Subtype disambiguation
//!
//! Picks which subtype of an element type currently applies, and rewrites the
//! discriminating attributes when the user switches to another subtype.

use log::{debug, warn};

use super::resolver::Resolver;
use crate::domain::{BusinessObject, ElementConfig, SubtypeDefinition};
use crate::host::{ApplyError, NodeFactory, PropertyUpdate};

/// Scores subtypes against a business object
#[derive(Debug, Clone, Copy)]
pub struct Disambiguator<'a> {
    resolver: Resolver<'a>,
}

impl<'a> Disambiguator<'a> {
    pub fn new(resolver: Resolver<'a>) -> Self {
        Self { resolver }
    }

    /// Returns the best matching subtype
    ///
    /// Only subtypes whose criteria all match are candidates. The highest
    /// specificity wins; on a tie the first declared subtype is kept.
    pub fn determine<'c>(
        &self,
        element: &'c ElementConfig,
        node: &BusinessObject,
    ) -> Option<&'c SubtypeDefinition> {
        let mut best: Option<(&SubtypeDefinition, u32)> = None;

        for subtype in &element.subtypes {
            let all_match = subtype
                .criteria
                .iter()
                .all(|criterion| self.resolver.matches(node, criterion));
            if !all_match {
                continue;
            }

            let score = subtype.specificity();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((subtype, score));
            }
        }

        let chosen = best.map(|(subtype, _)| subtype);
        debug!(
            node_type = node.type_tag(),
            subtype = chosen.map_or("-", |s| s.name.as_str());
            "Determined subtype"
        );
        chosen
    }

    /// Rewrites discriminating attributes so that `target` matches
    ///
    /// Valued attribute criteria of the other subtypes are cleared first,
    /// unless `target` requires the same id and location; then every valued
    /// criterion of `target` is written. Returns the writes performed, in
    /// order; clearing an absent attribute is not a write. An unknown subtype
    /// is a logged no-op.
    pub fn switch_to(
        &self,
        element: &ElementConfig,
        node: &mut BusinessObject,
        factory: &dyn NodeFactory,
        target: &str,
    ) -> Result<Vec<PropertyUpdate>, ApplyError> {
        let Some(wanted) = element.subtype(target) else {
            warn!(subtype = target; "Unknown subtype");
            return Ok(Vec::new());
        };

        let mut updates = Vec::new();

        let stale = element
            .subtypes
            .iter()
            .filter(|subtype| subtype.name != wanted.name)
            .flat_map(|subtype| &subtype.criteria)
            .filter(|criterion| criterion.value.is_some())
            .filter(|criterion| self.resolver.is_attribute(&criterion.location))
            .filter(|criterion| !wanted.requires(criterion));

        for criterion in stale {
            // Nothing to clear
            if self.resolver.read(node, &criterion.id, &criterion.location).is_none() {
                continue;
            }
            self.resolver
                .write(node, factory, &criterion.id, &criterion.location, None)?;
            updates.push(PropertyUpdate {
                field: criterion.id.clone(),
                location: criterion.location.clone(),
                value: None,
            });
        }

        for criterion in &wanted.criteria {
            let Some(value) = &criterion.value else {
                continue;
            };
            self.resolver
                .write(node, factory, &criterion.id, &criterion.location, Some(value))?;
            updates.push(PropertyUpdate {
                field: criterion.id.clone(),
                location: criterion.location.clone(),
                value: Some(value.clone()),
            });
        }

        debug!(subtype = target, writes = updates.len(); "Switched subtype");
        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PanelConfig, Scalar};
    use crate::host::TypeRegistry;

    const TIE_CONFIG: &str = r#"{
        "locations": { "attribute": [{ "property": "$id" }] },
        "elements": {
            "bpmn:Task": {
                "first": {
                    "criteria": [{ "id": "kind", "location": "attribute", "value": "x" }],
                    "fields": {}
                },
                "second": {
                    "criteria": [{ "id": "mode", "location": "attribute", "value": "y" }],
                    "fields": {}
                },
                "open": {
                    "criteria": [],
                    "fields": {}
                }
            }
        }
    }"#;

    fn service_task(config: &PanelConfig) -> &ElementConfig {
        config.element("bpmn:ServiceTask").unwrap()
    }

    fn name_of(subtype: Option<&SubtypeDefinition>) -> Option<&str> {
        subtype.map(|s| s.name.as_str())
    }

    #[test]
    fn exact_value_beats_presence() {
        let config = PanelConfig::builtin().unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));

        let ai = BusinessObject::new("bpmn:ServiceTask")
            .with("flowable:delegateExpression", "${aiDelegate}");
        let java = BusinessObject::new("bpmn:ServiceTask")
            .with("flowable:delegateExpression", "${myBean}");

        assert_eq!(name_of(disambiguator.determine(service_task(&config), &ai)), Some("ai"));
        assert_eq!(name_of(disambiguator.determine(service_task(&config), &java)), Some("java"));
    }

    #[test]
    fn no_match_yields_none() {
        let config = PanelConfig::builtin().unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));
        let plain = BusinessObject::new("bpmn:ServiceTask");

        assert!(disambiguator.determine(service_task(&config), &plain).is_none());
    }

    #[test]
    fn ties_keep_declaration_order() {
        let config = PanelConfig::from_json_str(TIE_CONFIG).unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));
        let element = config.element("bpmn:Task").unwrap();

        let both = BusinessObject::new("bpmn:Task").with("kind", "x").with("mode", "y");
        assert_eq!(name_of(disambiguator.determine(element, &both)), Some("first"));

        // Empty criteria always match, with score zero
        let neither = BusinessObject::new("bpmn:Task");
        assert_eq!(name_of(disambiguator.determine(element, &neither)), Some("open"));
    }

    #[test]
    fn determine_is_deterministic() {
        let config = PanelConfig::builtin().unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));
        let node = BusinessObject::new("bpmn:ServiceTask").with("flowable:type", "http");

        let first = name_of(disambiguator.determine(service_task(&config), &node));
        for _ in 0..10 {
            assert_eq!(name_of(disambiguator.determine(service_task(&config), &node)), first);
        }
    }

    #[test]
    fn switch_clears_then_applies() {
        let config = PanelConfig::builtin().unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));
        let mut node = BusinessObject::new("bpmn:ServiceTask").with("flowable:type", "http");

        let updates = disambiguator
            .switch_to(service_task(&config), &mut node, &TypeRegistry::permissive(), "ai")
            .unwrap();

        assert!(node.get("flowable:type").is_none());
        assert_eq!(
            node.scalar("flowable:delegateExpression"),
            Some(&Scalar::text("${aiDelegate}"))
        );
        assert_eq!(updates.first().map(|u| u.field.as_str()), Some("flowable:type"));
        assert_eq!(updates.first().and_then(|u| u.value.clone()), None);
        assert_eq!(
            updates.last().and_then(|u| u.value.clone()),
            Some(Scalar::text("${aiDelegate}"))
        );
        assert_eq!(
            name_of(disambiguator.determine(service_task(&config), &node)),
            Some("ai")
        );
    }

    #[test]
    fn switch_keeps_criteria_the_target_requires() {
        let config = PanelConfig::builtin().unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));
        let mut node = BusinessObject::new("bpmn:ServiceTask")
            .with("flowable:delegateExpression", "${aiDelegate}");

        // java only tests presence of the same attribute, so nothing is cleared
        // and nothing is written
        let updates = disambiguator
            .switch_to(service_task(&config), &mut node, &TypeRegistry::permissive(), "java")
            .unwrap();

        assert!(updates.is_empty());
        assert_eq!(
            node.scalar("flowable:delegateExpression"),
            Some(&Scalar::text("${aiDelegate}"))
        );
    }

    #[test]
    fn switch_to_unknown_subtype_is_a_noop() {
        let config = PanelConfig::builtin().unwrap();
        let disambiguator = Disambiguator::new(Resolver::new(config.locations()));
        let mut node = BusinessObject::new("bpmn:ServiceTask").with("flowable:type", "http");
        let before = node.clone();

        let updates = disambiguator
            .switch_to(service_task(&config), &mut node, &TypeRegistry::permissive(), "mail")
            .unwrap();

        assert!(updates.is_empty());
        assert_eq!(node, before);
    }
}
