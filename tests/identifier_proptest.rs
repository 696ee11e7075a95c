//! Property-based tests using proptest
//!
//! These tests check identifier parsing, equality and type guards, and
//! OData filter quoting, using randomized inputs.

use armkit::resource::{ResourceIdentifier, ResourceOperations, ResourceType};
use armkit::services::compute::VirtualMachineOperations;
use armkit::services::generic::ResourceFilter;
use armkit::{ArmError, ClientConfig};
use proptest::prelude::*;
use std::sync::Arc;

const RESERVED: [&str; 4] = ["providers", "subscriptions", "resourcegroups", "locations"];

/// Path segment that is never a structural keyword
fn arb_segment() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9._-]{0,15}"
        .prop_filter("reserved keyword", |s| !RESERVED.contains(&s.to_ascii_lowercase().as_str()))
}

fn arb_namespace() -> impl Strategy<Value = String> {
    ("[A-Z][a-z]{2,8}", "[A-Z][a-z]{2,10}").prop_map(|(a, b)| format!("{}.{}", a, b))
}

/// Type/name pairs under one provider
fn arb_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_segment(), arb_segment()), 1..4)
}

/// Canonical id string at subscription, resource group or provider depth
fn arb_id_string() -> impl Strategy<Value = String> {
    (
        arb_segment(),
        prop::option::of(arb_segment()),
        prop::option::of((arb_namespace(), arb_pairs())),
    )
        .prop_map(|(sub, rg, provider)| {
            let mut id = format!("/subscriptions/{}", sub);
            if let Some(rg) = rg {
                id.push_str(&format!("/resourceGroups/{}", rg));
            }
            if let Some((namespace, pairs)) = provider {
                id.push_str(&format!("/providers/{}", namespace));
                for (t, n) in pairs {
                    id.push_str(&format!("/{}/{}", t, n));
                }
            }
            id
        })
}

/// Virtual machine id with a UUID-shaped subscription
fn arb_vm_id() -> impl Strategy<Value = ResourceIdentifier> {
    ("[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}", arb_segment(), arb_segment())
        .prop_map(|(sub, rg, name)| {
            ResourceIdentifier::parse(&format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
                sub, rg, name
            ))
            .unwrap()
        })
}

fn config() -> Arc<ClientConfig> {
    Arc::new(ClientConfig::builder().build().unwrap())
}

fn is_type_mismatch<T>(result: Result<T, ArmError>) -> bool {
    matches!(result, Err(ArmError::ResourceTypeMismatch { .. }))
}

fn flip_case(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Parsing then displaying gives back the canonical text
    #[test]
    fn test_parse_display_round_trip(input in arb_id_string()) {
        let id = ResourceIdentifier::parse(&input).unwrap();
        prop_assert_eq!(id.to_string(), input.clone());
        prop_assert_eq!(ResourceIdentifier::parse(&id.to_string()).unwrap(), id);
    }

    /// Identifiers compare case-insensitively
    #[test]
    fn test_equality_ignores_case(input in arb_id_string()) {
        let a = ResourceIdentifier::parse(&input).unwrap();
        let b = ResourceIdentifier::parse(&flip_case(&input)).unwrap();
        prop_assert_eq!(a, b);
    }

    /// The parent of a child built from an id is that id
    #[test]
    fn test_child_then_parent(input in arb_id_string(), child_type in arb_segment(), name in arb_segment()) {
        let id = ResourceIdentifier::parse(&input).unwrap();
        let child = id.child(Some("Microsoft.Test"), &child_type, &name).unwrap();
        prop_assert_eq!(child.name(), name.as_str());
        prop_assert_eq!(child.parent(), Some(id));
    }

    /// An id always matches its own type and rejects a type with another namespace
    #[test]
    fn test_type_guard(input in arb_id_string()) {
        let id = ResourceIdentifier::parse(&input).unwrap();
        prop_assert!(id.ensure_type(&id.resource_type()).is_ok());

        let other = ResourceType::parse("Other.Namespace/things").unwrap();
        let is_mismatch = matches!(id.ensure_type(&other), Err(ArmError::ResourceTypeMismatch { .. }));
        prop_assert!(is_mismatch);
    }

    /// Virtual machine operations refuse any id of another type
    #[test]
    fn test_vm_operations_reject_other_types(input in arb_id_string()) {
        let id = ResourceIdentifier::parse(&input).unwrap();
        prop_assume!(id.ensure_type(&VirtualMachineOperations::resource_type()).is_err());
        prop_assert!(is_type_mismatch(VirtualMachineOperations::new(config(), id)));
    }

    /// Virtual machine operations accept VM ids in any casing, and refuse
    /// the group above and a child below
    #[test]
    fn test_vm_operations_guard_neighbours(id in arb_vm_id()) {
        let vm = VirtualMachineOperations::new(config(), id.clone()).unwrap();
        prop_assert_eq!(vm.id(), &id);

        let shouted = ResourceIdentifier::parse(&flip_case(&id.to_string())).unwrap();
        prop_assert!(VirtualMachineOperations::new(config(), shouted).is_ok());

        let group = id.parent().unwrap();
        prop_assert!(is_type_mismatch(VirtualMachineOperations::new(config(), group)));

        let extension = id.child(None, "extensions", "ext1").unwrap();
        prop_assert!(is_type_mismatch(VirtualMachineOperations::new(config(), extension)));
    }

    /// Text that does not start with '/' never parses
    #[test]
    fn test_relative_text_rejected(input in "[A-Za-z0-9][A-Za-z0-9/]{0,40}") {
        let is_malformed = matches!(
            ResourceIdentifier::parse(&input),
            Err(ArmError::MalformedIdentifier { .. })
        );
        prop_assert!(is_malformed);
    }

    /// Quotes in filter values are doubled, so each literal stays balanced
    #[test]
    fn test_filter_literals_are_escaped(fragment in "[a-z' ]{0,20}", tag in "[a-z']{1,10}") {
        let filter = ResourceFilter::new().name_contains(&fragment).tag(&tag, None);
        let text = filter.to_filter_string().unwrap();
        let expected_name = format!("substringof('{}', name)", fragment.replace('\'', "''"));
        let expected_tag = format!("tagName eq '{}'", tag.replace('\'', "''"));
        prop_assert!(text.contains(&expected_name));
        prop_assert!(text.ends_with(&expected_tag));
        prop_assert_eq!(text.matches('\'').count() % 2, 0);
    }
}

#[test]
fn test_vm_operations_from_known_ids() {
    let vm_id = ResourceIdentifier::parse(
        "/subscriptions/11111111-1111-1111-1111-111111111111/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1",
    )
    .unwrap();
    let vm = VirtualMachineOperations::new(config(), vm_id).unwrap();
    assert_eq!(vm.id().name(), "vm1");

    let rg_id = ResourceIdentifier::parse(
        "/subscriptions/11111111-1111-1111-1111-111111111111/resourceGroups/rg1",
    )
    .unwrap();
    assert!(is_type_mismatch(VirtualMachineOperations::new(config(), rg_id)));
}
