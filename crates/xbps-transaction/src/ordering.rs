//! Turns the resolver's unordered steps bag into the single sequence the
//! run phase executes.
//!
//! A single dependency-respecting order is computed over the whole bag
//! (an edge `a -> b` exists iff some `DepAtom` of `a` names a step `b`
//! also in the bag); `remove` steps are then reversed in place so a
//! dependent is removed before its dependency, while install/update/
//! configure steps keep the forward order. Removals are placed ahead of
//! installs in the combined sequence — a deliberate simplification of
//! the run phase's single pass, since the common case (removes and
//! installs touching disjoint package sets) has no ordering
//! interaction between the two groups anyway.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use xbps_core::version::DepAtom;
use xbps_resolver::{StepAction, TransactionStep};

pub fn order_steps(steps: &[TransactionStep]) -> Result<Vec<TransactionStep>> {
    let names: Vec<String> = steps.iter().map(|s| s.record.key.name.clone()).collect();
    let by_name: BTreeMap<&str, &TransactionStep> =
        steps.iter().map(|s| (s.record.key.name.as_str(), s)).collect();

    let order = xbps_toposort::toposort(&names, |n| {
        by_name
            .get(n)
            .map(|s| s.record.dependencies.iter().filter_map(DepAtom::name).map(String::from).collect())
            .unwrap_or_default()
    })
    .map_err(|xbps_toposort::Error::Cycle(nodes)| Error::Cycle(nodes))?;

    let mut removes = Vec::new();
    let mut rest = Vec::new();
    for name in &order {
        let step = by_name[name.as_str()];
        if step.action == StepAction::Remove {
            removes.push(step.clone());
        } else {
            rest.push(step.clone());
        }
    }
    removes.reverse();
    removes.extend(rest);
    Ok(removes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use xbps_core::package::{PackageKey, PackageRecord};

    fn record(name: &str, deps: &[&str]) -> PackageRecord {
        PackageRecord {
            key: PackageKey { name: name.to_string(), version: "1.0".to_string(), revision: 0 },
            dependencies: deps.iter().map(|d| DepAtom::Name((*d).to_string())).collect(),
            provides: BTreeSet::new(),
            conflicts: vec![],
            files: vec![],
            dirs: vec![],
            links: vec![],
            conf_files: vec![],
            installed_size: 0,
            filename_size: 0,
            arch: None,
            repository: None,
        }
    }

    fn step(name: &str, deps: &[&str], action: StepAction) -> TransactionStep {
        TransactionStep { record: record(name, deps), action, reason: "test".to_string() }
    }

    #[test]
    fn installs_follow_dependency_order() {
        let steps = vec![
            step("app", &["base"], StepAction::Install),
            step("base", &[], StepAction::Install),
        ];
        let ordered = order_steps(&steps).unwrap();
        let names: Vec<_> = ordered.iter().map(|s| s.record.key.name.clone()).collect();
        assert_eq!(names, vec!["base".to_string(), "app".to_string()]);
    }

    #[test]
    fn removes_are_reversed_relative_to_dependency_order() {
        let steps = vec![
            step("app", &["base"], StepAction::Remove),
            step("base", &[], StepAction::Remove),
        ];
        let ordered = order_steps(&steps).unwrap();
        let names: Vec<_> = ordered.iter().map(|s| s.record.key.name.clone()).collect();
        assert_eq!(names, vec!["app".to_string(), "base".to_string()]);
    }

    #[test]
    fn removes_precede_installs_in_combined_order() {
        let steps = vec![
            step("new-pkg", &[], StepAction::Install),
            step("old-pkg", &[], StepAction::Remove),
        ];
        let ordered = order_steps(&steps).unwrap();
        let names: Vec<_> = ordered.iter().map(|s| s.record.key.name.clone()).collect();
        assert_eq!(names, vec!["old-pkg".to_string(), "new-pkg".to_string()]);
    }

    #[test]
    fn cycle_is_reported() {
        let steps = vec![
            step("a", &["b"], StepAction::Install),
            step("b", &["a"], StepAction::Install),
        ];
        assert!(matches!(order_steps(&steps), Err(Error::Cycle(_))));
    }
}
