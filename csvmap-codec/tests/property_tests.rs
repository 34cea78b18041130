//! Property tests for plan adaptation

use csvmap_codec::{Binding, MappingPlan, OverrideMapping};
use csvmap_format::CsvRecord;
use proptest::prelude::*;

#[derive(Debug, Default, CsvRecord)]
pub struct Address {
    pub street: String,
    #[csv("Town")]
    pub town: String,
}

#[derive(Debug, Default, CsvRecord)]
pub struct Person {
    #[csv("[line]")]
    pub line: usize,
    pub id: u32,
    #[csv("Name")]
    pub name: String,
    pub age: Option<u8>,
    pub address: Address,
    #[csv("-")]
    pub notes: String,
}

const FIELDS: &[&str] = &["line", "id", "name", "age", "address.street", "address.town", "notes"];

fn override_strategy() -> impl Strategy<Value = OverrideMapping> {
    let field = prop::sample::select(FIELDS).prop_map(str::to_string);
    let name = prop::sample::select(vec!["A", "B", "Town", "Name"]);
    prop_oneof![
        (field.clone(), 1usize..8).prop_map(|(f, i)| OverrideMapping::index(f, i)),
        (field.clone(), name.clone()).prop_map(|(f, n)| OverrideMapping::name(f, n)),
        field.clone().prop_map(OverrideMapping::remove_index),
        (field, name).prop_map(|(f, n)| OverrideMapping::remove_name(f, n)),
    ]
}

fn assert_consistent(plan: &MappingPlan<Person>) -> Result<(), TestCaseError> {
    let mappings = plan.mappings();
    let mut indices = Vec::new();
    let mut names = Vec::new();
    for mapping in &mappings {
        if mapping.index > 0 {
            indices.push(mapping.index);
            prop_assert!(plan.column(mapping.index as usize).is_some());
        } else {
            names.push(mapping.name.clone());
        }
    }
    let unique_indices: std::collections::BTreeSet<_> = indices.iter().collect();
    let unique_names: std::collections::BTreeSet<_> = names.iter().collect();
    prop_assert_eq!(unique_indices.len(), indices.len());
    prop_assert_eq!(unique_names.len(), names.len());
    prop_assert_eq!(plan.has_named(), !names.is_empty());
    Ok(())
}

proptest! {
    #[test]
    fn test_adapt_without_overrides_round_trips(clear_options in any::<bool>()) {
        let plan = MappingPlan::<Person>::new().unwrap();
        let options = clear_options.then(Default::default);
        let adapted = plan.adapt(false, &[], options).unwrap();
        prop_assert_eq!(adapted.mappings(), plan.mappings());
    }

    #[test]
    fn test_adapt_is_idempotent(mapping in override_strategy()) {
        let plan = MappingPlan::<Person>::new().unwrap();
        let once = plan.adapt(false, std::slice::from_ref(&mapping), None).unwrap();
        let twice = plan.adapt(false, &[mapping.clone(), mapping.clone()], None).unwrap();
        let again = once.adapt(false, &[mapping], None).unwrap();
        prop_assert_eq!(once.mappings(), twice.mappings());
        prop_assert_eq!(once.mappings(), again.mappings());
    }

    #[test]
    fn test_adapt_keeps_bindings_unique(
        clear in any::<bool>(),
        overrides in prop::collection::vec(override_strategy(), 0..12),
    ) {
        let plan = MappingPlan::<Person>::new().unwrap();
        let before = plan.mappings();
        let adapted = plan.adapt(clear, &overrides, None).unwrap();
        assert_consistent(&adapted)?;
        prop_assert_eq!(plan.mappings(), before);
    }

    #[test]
    fn test_mappings_replay_reproduces_plan(
        overrides in prop::collection::vec(override_strategy(), 0..12),
    ) {
        let plan = MappingPlan::<Person>::new().unwrap();
        let adapted = plan.adapt(false, &overrides, None).unwrap();
        let replayed = plan.adapt(true, &adapted.mappings(), None).unwrap();
        prop_assert_eq!(replayed.mappings(), adapted.mappings());
    }
}

#[test]
fn test_nested_identities() {
    let plan = MappingPlan::<Person>::new().unwrap();
    assert_eq!(plan.binding("address.street"), Some(&Binding::Index(3)));
    assert_eq!(
        plan.binding("address.town"),
        Some(&Binding::Name("Town".to_string()))
    );
    assert_eq!(plan.binding("age"), Some(&Binding::Index(2)));
}
