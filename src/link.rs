//! Navigation graph.
//!
//! Stage 3 of the pipeline. Builds two circular orderings over the pruned
//! catalog:
//!
//! - **Group chain**: groups sorted by path. A group declaring `next_group`
//!   pulls its target out of the sequence and re-inserts it directly after
//!   itself. Overrides apply in ascending source-path order, so with groups
//!   `x/a`, `x/b`, `x/c` and `x/a → x/c` the chain becomes a → c → b → a.
//! - **Species chain**: groups flattened in chain order, members sorted by
//!   slug. Because the species chain follows the final group order, the last
//!   species of an override source always links to the first species of its
//!   target.
//!
//! Both chains wrap around; a single element links to itself.

use crate::diagnostics::Diagnostics;
use crate::types::{Catalog, GroupId, SpeciesId};

/// Sort members, apply overrides and write `prev`/`next` on every linked
/// group and species.
pub fn link(catalog: &mut Catalog, diags: &mut Diagnostics) {
    let species = &catalog.species;
    for group in &mut catalog.groups {
        group
            .species
            .sort_by(|a, b| species[a.0].slug.cmp(&species[b.0].slug));
    }

    let order = group_order(catalog, diags);
    for (id, prev, next) in ring(&order) {
        catalog[id].prev = Some(prev);
        catalog[id].next = Some(next);
    }

    let chain: Vec<SpeciesId> = order
        .iter()
        .flat_map(|&g| catalog[g].species.iter().copied())
        .collect();
    for species in &mut catalog.species {
        species.prev = None;
        species.next = None;
    }
    for (id, prev, next) in ring(&chain) {
        catalog[id].prev = Some(prev);
        catalog[id].next = Some(next);
    }

    tracing::debug!(groups = order.len(), species = chain.len(), "linked navigation");
    catalog.group_order = order;
    catalog.species_order = chain;
}

/// Groups sorted by path with `next_group` overrides applied.
pub fn group_order(catalog: &Catalog, diags: &mut Diagnostics) -> Vec<GroupId> {
    let mut order: Vec<GroupId> = (0..catalog.groups.len()).map(GroupId).collect();
    order.sort_by(|a, b| catalog[*a].path.cmp(&catalog[*b].path));

    let sources: Vec<GroupId> = order
        .iter()
        .copied()
        .filter(|&g| catalog[g].next_group.is_some())
        .collect();
    for source in sources {
        let group = &catalog[source];
        let Some(target_path) = group.next_group.as_deref() else {
            continue;
        };
        match catalog.group_by_path(target_path) {
            None => diags.warning(
                &group.path,
                format!("next group path does not exist: {target_path}"),
            ),
            Some(target) if target == source => {
                diags.warning(&group.path, "next group points at itself")
            }
            Some(target) => splice_after(&mut order, source, target),
        }
    }
    order
}

/// Move `target` so that it directly follows `source`.
fn splice_after(order: &mut Vec<GroupId>, source: GroupId, target: GroupId) {
    let Some(from) = order.iter().position(|&g| g == target) else {
        return;
    };
    order.remove(from);
    let Some(at) = order.iter().position(|&g| g == source) else {
        return;
    };
    order.insert(at + 1, target);
}

/// `(item, prev, next)` for every item of a circular sequence.
fn ring<T: Copy>(items: &[T]) -> Vec<(T, T, T)> {
    let n = items.len();
    (0..n)
        .map(|i| (items[i], items[(i + n - 1) % n], items[(i + 1) % n]))
        .collect()
}
