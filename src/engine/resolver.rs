//! Location resolution
//!
//! Interprets location descriptors against a business-object tree: reads leaf
//! values, writes them (creating missing intermediate nodes), tests criteria
//! and prunes nodes left empty by a cleared value.

use log::{debug, warn};

use crate::domain::{BusinessObject, Criterion, LocationDescriptor, LocationTable, Property, Scalar, Step};
use crate::host::{ApplyError, NodeFactory};

/// Separator used when several leaves match one location
pub const LEAF_SEPARATOR: &str = "\n";

/// Reads and writes field values through named locations
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    locations: &'a LocationTable,
}

impl<'a> Resolver<'a> {
    pub fn new(locations: &'a LocationTable) -> Self {
        Self { locations }
    }

    /// Looks up a location, logging unknown names
    fn descriptor(&self, location: &str) -> Option<&'a LocationDescriptor> {
        match self.locations.get(location) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Returns true if `location` is a single attribute on the element itself
    pub fn is_attribute(&self, location: &str) -> bool {
        self.locations
            .get(location)
            .is_ok_and(LocationDescriptor::is_attribute)
    }

    /// Reads the value of `field` at `location`
    ///
    /// Returns `None` when any step selects nothing or the location is
    /// unknown. Several matching leaves are joined with [`LEAF_SEPARATOR`].
    pub fn read(&self, node: &BusinessObject, field: &str, location: &str) -> Option<Scalar> {
        let descriptor = self.descriptor(location)?;
        let (terminal, path) = descriptor.steps().split_last()?;

        let mut items = vec![node];
        for step in path {
            items = step.collect(&items, field);
            if items.is_empty() {
                return None;
            }
        }

        let leaves: Vec<Scalar> = match terminal {
            Step::Attribute { property } => {
                let name = property.resolve(field);
                items
                    .iter()
                    .filter_map(|item| item.get(name))
                    .flat_map(leaves_of)
                    .collect()
            }
            typed => typed
                .collect(&items, field)
                .into_iter()
                .filter_map(body_of)
                .collect(),
        };

        join_leaves(leaves)
    }

    /// Writes `value` for `field` at `location`
    ///
    /// Missing typed nodes are created through `factory` with their
    /// where-clause applied; existing matches are reused. A missing untyped
    /// step cannot be created and fails with [`ApplyError::Unreachable`].
    /// `None` clears the leaf and never creates structure. Unknown locations
    /// are a logged no-op.
    pub fn write(
        &self,
        node: &mut BusinessObject,
        factory: &dyn NodeFactory,
        field: &str,
        location: &str,
        value: Option<&Scalar>,
    ) -> Result<(), ApplyError> {
        let Some(descriptor) = self.descriptor(location) else {
            return Ok(());
        };

        let steps = descriptor.steps();
        let mut item = node;
        for (position, step) in steps.iter().enumerate() {
            let name = step.property().resolve(field);

            let index = match step {
                Step::Attribute { .. } => {
                    item.set_scalar(name, value.cloned());
                    return Ok(());
                }
                Step::Navigate { .. } => match (step.find_index(item, field), value) {
                    (Some(index), _) => index,
                    (None, None) => return Ok(()),
                    (None, Some(_)) => return Err(unreachable_step(location, name)),
                },
                Step::Child { many, .. } => match (step.find_index(item, field), value) {
                    (Some(index), _) => index,
                    (None, None) => return Ok(()),
                    (None, Some(value)) => {
                        // Attached only once every missing node exists
                        let chain = create_chain(factory, step, &steps[position + 1..], field, location, value)?;
                        item.attach(name, chain, *many);
                        debug!(location = location, property = name; "Created missing nodes");
                        return Ok(());
                    }
                },
            };

            item = match item.children_mut(name).get_mut(index) {
                Some(child) => child,
                None => return Ok(()),
            };
        }

        // The last step was typed: the value is the node body
        item.set_body(value.map(ToString::to_string));
        Ok(())
    }

    /// Tests a criterion: exact value when it has one, presence otherwise
    pub fn matches(&self, node: &BusinessObject, criterion: &Criterion) -> bool {
        let actual = self.read(node, &criterion.id, &criterion.location);
        match (&criterion.value, actual) {
            (Some(expected), Some(actual)) => *expected == actual,
            (Some(_), None) => false,
            (None, actual) => actual.is_some(),
        }
    }

    /// Removes nodes along `location` that hold nothing but their selectors
    ///
    /// Walks from the deepest matched node upward and stops at the first node
    /// that still carries content. Returns true if anything was removed.
    pub fn prune(&self, node: &mut BusinessObject, field: &str, location: &str) -> bool {
        let Some(descriptor) = self.descriptor(location) else {
            return false;
        };

        let mut trail: Vec<(&Step, usize)> = Vec::new();
        let mut item: &BusinessObject = node;
        for step in descriptor.steps() {
            if step.is_attribute() {
                break;
            }
            let Some(index) = step.find_index(item, field) else {
                break;
            };
            trail.push((step, index));
            item = &item.children(step.property().resolve(field))[index];
        }

        let mut pruned = false;
        while let Some((step, index)) = trail.pop() {
            let Some(parent) = descend_mut(node, &trail, field) else {
                break;
            };
            let name = step.property().resolve(field);
            let vacant = parent
                .children(name)
                .get(index)
                .is_some_and(|child| step.is_vacant(child));
            if !vacant {
                break;
            }
            parent.detach(name, index);
            pruned = true;
        }

        if pruned {
            debug!(location = location, field = field; "Pruned empty nodes");
        }
        pruned
    }
}

/// Builds the missing part of a location, from `step` down to the leaf
///
/// Nothing is attached to the model here, so a rejected node type leaves
/// the tree untouched.
fn create_chain(
    factory: &dyn NodeFactory,
    step: &Step,
    rest: &[Step],
    field: &str,
    location: &str,
    value: &Scalar,
) -> Result<BusinessObject, ApplyError> {
    let Step::Child {
        node_type, filter, ..
    } = step
    else {
        return Err(unreachable_step(location, step.property().resolve(field)));
    };

    let mut node = factory.create(node_type, filter.assignments(field))?;
    match rest.split_first() {
        None => node.set_body(Some(value.to_string())),
        Some((Step::Attribute { property }, _)) => {
            node.set_scalar(property.resolve(field), Some(value.clone()));
        }
        Some((next, tail)) => {
            let child = create_chain(factory, next, tail, field, location, value)?;
            let many = matches!(next, Step::Child { many: true, .. });
            node.attach(next.property().resolve(field), child, many);
        }
    }
    Ok(node)
}

fn unreachable_step(location: &str, property: &str) -> ApplyError {
    warn!(location = location, property = property; "Cannot create an untyped step");
    ApplyError::Unreachable {
        location: location.to_string(),
        property: property.to_string(),
    }
}

fn descend_mut<'n>(
    node: &'n mut BusinessObject,
    trail: &[(&Step, usize)],
    field: &str,
) -> Option<&'n mut BusinessObject> {
    let mut item = node;
    for (step, index) in trail {
        item = item
            .children_mut(step.property().resolve(field))
            .get_mut(*index)?;
    }
    Some(item)
}

fn body_of(node: &BusinessObject) -> Option<Scalar> {
    node.body().filter(|b| !b.is_empty()).map(Scalar::text)
}

fn leaves_of(property: &Property) -> Vec<Scalar> {
    match property {
        Property::Scalar(s) if !s.is_empty() => vec![s.clone()],
        Property::Scalar(_) => Vec::new(),
        Property::Node(node) => body_of(node).into_iter().collect(),
        Property::Nodes(nodes) => nodes.iter().filter_map(body_of).collect(),
    }
}

fn join_leaves(mut leaves: Vec<Scalar>) -> Option<Scalar> {
    match leaves.len() {
        0 => None,
        1 => leaves.pop(),
        _ => {
            let texts: Vec<String> = leaves.iter().map(ToString::to_string).collect();
            Some(Scalar::Text(texts.join(LEAF_SEPARATOR)))
        }
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::PanelConfig;
    use crate::host::TypeRegistry;

    // ===================
    // Strategies
    // ===================

    fn value_strategy() -> impl Strategy<Value = Scalar> {
        prop_oneof![
            "[a-zA-Z0-9:/. ]{1,24}".prop_map(Scalar::Text),
            any::<i64>().prop_map(Scalar::Integer),
            any::<bool>().prop_map(Scalar::Bool),
        ]
    }

    fn field_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z]{0,15}"
    }

    fn location_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("attribute"), Just("flowable:field")]
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Reading back a written value yields that value
    fn check_read_after_write(field: String, location: &str, value: Scalar) -> Result<(), TestCaseError> {
        let config = PanelConfig::builtin().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let resolver = Resolver::new(config.locations());
        let mut node = BusinessObject::new("bpmn:ServiceTask");

        resolver
            .write(&mut node, &TypeRegistry::permissive(), &field, location, Some(&value))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(resolver.read(&node, &field, location), Some(value));
        Ok(())
    }

    /// Writing the same value twice leaves the tree as after one write
    fn check_write_is_idempotent(field: String, location: &str, value: Scalar) -> Result<(), TestCaseError> {
        let config = PanelConfig::builtin().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let resolver = Resolver::new(config.locations());
        let types = TypeRegistry::permissive();

        let mut once = BusinessObject::new("bpmn:ServiceTask");
        resolver
            .write(&mut once, &types, &field, location, Some(&value))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut twice = once.clone();
        resolver
            .write(&mut twice, &types, &field, location, Some(&value))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(once, twice);
        Ok(())
    }

    /// Clearing a written value and pruning restores the original tree
    fn check_clear_and_prune_restores(field: String, location: &str, value: Scalar) -> Result<(), TestCaseError> {
        let config = PanelConfig::builtin().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let resolver = Resolver::new(config.locations());
        let types = TypeRegistry::permissive();
        let original = BusinessObject::new("bpmn:ServiceTask").with("id", "task");

        let mut node = original.clone();
        resolver
            .write(&mut node, &types, &field, location, Some(&value))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        resolver
            .write(&mut node, &types, &field, location, None)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        resolver.prune(&mut node, &field, location);

        prop_assert_eq!(resolver.read(&node, &field, location), None);
        if field != "id" {
            prop_assert_eq!(node, original);
        }
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn read_after_write(field in field_strategy(), location in location_strategy(), value in value_strategy()) {
            check_read_after_write(field, location, value)?;
        }

        #[test]
        fn write_is_idempotent(field in field_strategy(), location in location_strategy(), value in value_strategy()) {
            check_write_is_idempotent(field, location, value)?;
        }

        #[test]
        fn clear_and_prune_restores(field in field_strategy(), location in location_strategy(), value in value_strategy()) {
            check_clear_and_prune_restores(field, location, value)?;
        }
    }
}
