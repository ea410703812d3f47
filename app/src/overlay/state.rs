//! Live instance table
//!
//! Every live instance pairs its state publisher with the surface currently
//! presenting it and the subscription that pushes state into that surface.

use hashbrown::HashMap;
use perch_core::{StatePublisher, Subscription};
use perch_overlay::{StateSink, SurfaceHandle};
use perch_types::{InstanceId, InstanceRecord, ToolKind};

pub(crate) struct LiveInstance {
    state: StatePublisher<InstanceRecord>,
    surface: SurfaceHandle,
    subscription: Option<Subscription>,
}

impl LiveInstance {
    pub fn attach(record: InstanceRecord, surface: SurfaceHandle, sink: StateSink) -> Self {
        let state = StatePublisher::new(record);
        let subscription = Some(subscribe(&state, sink));
        Self {
            state,
            surface,
            subscription,
        }
    }

    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    pub fn record(&self) -> InstanceRecord {
        self.state.current()
    }

    /// Mutate the record; the surface is only notified when `f` reports a change
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut InstanceRecord) -> bool,
    {
        self.state.modify_if(f)
    }

    /// Stop pushing state into the surface. Returns once no delivery is running.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    /// Point the instance at a freshly created surface
    pub fn reattach(&mut self, surface: SurfaceHandle, sink: StateSink) {
        self.detach();
        self.surface = surface;
        self.subscription = Some(subscribe(&self.state, sink));
    }
}

fn subscribe(state: &StatePublisher<InstanceRecord>, sink: StateSink) -> Subscription {
    state.subscribe(move |record| sink.apply(record))
}

type Key = (ToolKind, InstanceId);

#[derive(Default)]
pub(crate) struct InstanceTable {
    live: HashMap<Key, LiveInstance>,
}

impl InstanceTable {
    pub fn get(&self, tool: ToolKind, id: InstanceId) -> Option<&LiveInstance> {
        self.live.get(&(tool, id))
    }

    pub fn get_mut(&mut self, tool: ToolKind, id: InstanceId) -> Option<&mut LiveInstance> {
        self.live.get_mut(&(tool, id))
    }

    pub fn contains(&self, tool: ToolKind, id: InstanceId) -> bool {
        self.live.contains_key(&(tool, id))
    }

    pub fn insert(&mut self, tool: ToolKind, id: InstanceId, instance: LiveInstance) {
        self.live.insert((tool, id), instance);
    }

    pub fn remove(&mut self, tool: ToolKind, id: InstanceId) -> Option<LiveInstance> {
        self.live.remove(&(tool, id))
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Current records, ordered by tool kind then id
    pub fn records(&self) -> Vec<InstanceRecord> {
        let mut records: Vec<InstanceRecord> =
            self.live.values().map(LiveInstance::record).collect();
        records.sort_by_key(|r| (r.tool, r.id));
        records
    }

    /// Take every instance out of the table, ordered by tool kind then id
    pub fn drain(&mut self) -> Vec<LiveInstance> {
        let mut drained: Vec<(Key, LiveInstance)> = self.live.drain().collect();
        drained.sort_by_key(|(key, _)| *key);
        drained.into_iter().map(|(_, instance)| instance).collect()
    }
}
