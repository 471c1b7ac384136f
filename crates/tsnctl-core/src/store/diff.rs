// ── Change detection between project revisions ──
//
// Compares the stored project with the incoming one and yields the patch
// messages listeners need to converge.

use std::collections::BTreeMap;

use crate::model::Project;
use crate::notify::{PatchAction, PatchData};

/// Create for new keys, Update for changed values, Delete (carrying the
/// last known value) for keys that disappeared.
fn diff_map<T: Clone + PartialEq>(
    old: &BTreeMap<i64, T>,
    new: &BTreeMap<i64, T>,
    wrap: impl Fn(T) -> PatchData,
    out: &mut Vec<(PatchAction, PatchData)>,
) {
    for (id, value) in new {
        match old.get(id) {
            None => out.push((PatchAction::Create, wrap(value.clone()))),
            Some(prev) if prev != value => out.push((PatchAction::Update, wrap(value.clone()))),
            Some(_) => {}
        }
    }
    for (id, value) in old {
        if !new.contains_key(id) {
            out.push((PatchAction::Delete, wrap(value.clone())));
        }
    }
}

pub(crate) fn project_changes(old: &Project, new: &Project) -> Vec<(PatchAction, PatchData)> {
    let mut out = Vec::new();
    diff_map(&old.devices, &new.devices, PatchData::Device, &mut out);
    diff_map(&old.links, &new.links, PatchData::Link, &mut out);
    diff_map(
        &old.streams,
        &new.streams,
        |s| PatchData::Stream(Box::new(s)),
        &mut out,
    );

    if old.cycle_setting != new.cycle_setting {
        out.push((
            PatchAction::Update,
            PatchData::CycleSetting(new.cycle_setting.clone()),
        ));
    }
    if old.device_config != new.device_config {
        out.push((
            PatchAction::Update,
            PatchData::DeviceConfig(new.device_config.clone()),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{project, stream};

    #[test]
    fn detects_create_update_delete() {
        let old = project();
        let mut new = old.clone();
        new.devices.remove(&4);
        if let Some(link) = new.links.get_mut(&1) {
            link.speed = 100;
        }
        let mut s = stream("s", (1, 1), (3, 1));
        s.id = 50_001;
        new.streams.insert(s.id, s);

        let changes = project_changes(&old, &new);
        let summary: Vec<(PatchAction, String)> = changes
            .iter()
            .map(|(a, d)| (*a, d.path(old.id)))
            .collect();

        assert_eq!(
            summary,
            vec![
                (PatchAction::Delete, "Projects/1/Devices/4".to_owned()),
                (PatchAction::Update, "Projects/1/Links/1".to_owned()),
                (PatchAction::Create, "Projects/1/Streams/50001".to_owned()),
            ]
        );
    }

    #[test]
    fn identical_projects_produce_nothing() {
        let p = project();
        assert!(project_changes(&p, &p.clone()).is_empty());
    }
}
