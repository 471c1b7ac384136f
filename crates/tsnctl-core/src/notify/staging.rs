// ── Notification staging buffer ──

use indexmap::IndexMap;

use super::message::{MessageBody, Notification, PatchData};

/// Pending messages for one project, at most one per entity path.
///
/// Drains devices first, then links, then streams, then everything else.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    devices: IndexMap<String, Notification>,
    links: IndexMap<String, Notification>,
    streams: IndexMap<String, Notification>,
    other: IndexMap<String, Notification>,
}

impl StagingBuffer {
    /// Insert or replace the pending message for the notification's path.
    pub fn stage(&mut self, notification: Notification) {
        let key = notification.staging_key();
        let bucket = match &notification.body {
            MessageBody::Patch(p) => match p.data {
                PatchData::Device(_) => &mut self.devices,
                PatchData::Link(_) => &mut self.links,
                PatchData::Stream(_) => &mut self.streams,
                _ => &mut self.other,
            },
            _ => &mut self.other,
        };
        bucket.insert(key, notification);
    }

    pub fn len(&self) -> usize {
        self.devices.len() + self.links.len() + self.streams.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_ordered(self) -> impl Iterator<Item = Notification> {
        self.devices
            .into_values()
            .chain(self.links.into_values())
            .chain(self.streams.into_values())
            .chain(self.other.into_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{device, stream};
    use crate::model::{DeviceType, ProjectId};
    use crate::notify::message::PatchAction;

    const PID: ProjectId = ProjectId(1);

    #[test]
    fn same_path_keeps_last_write() {
        let mut buf = StagingBuffer::default();
        let mut d = device(7, DeviceType::EndStation, 1);
        buf.stage(Notification::patch(PID, PatchAction::Create, PatchData::Device(d.clone()), true));
        d.name = "renamed".into();
        let second = Notification::patch(PID, PatchAction::Update, PatchData::Device(d), true);
        buf.stage(second.clone());

        assert_eq!(buf.len(), 1);
        let drained: Vec<_> = buf.into_ordered().collect();
        assert_eq!(drained, vec![second]);
    }

    #[test]
    fn drains_devices_before_streams() {
        let mut buf = StagingBuffer::default();
        let mut s = stream("s", (1, 1), (3, 1));
        s.id = 3;
        buf.stage(Notification::patch(PID, PatchAction::Create, PatchData::Stream(Box::new(s)), true));
        buf.stage(Notification::patch(
            PID,
            PatchAction::Create,
            PatchData::Device(device(9, DeviceType::Switch, 2)),
            true,
        ));

        let keys: Vec<String> = buf.into_ordered().map(|n| n.staging_key()).collect();
        assert_eq!(keys, ["Projects/1/Devices/9", "Projects/1/Streams/3"]);
    }
}
