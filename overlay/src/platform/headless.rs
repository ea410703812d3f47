//! Headless presentation backend
//!
//! Keeps surfaces as plain records. Used by the CLI and the test suites; the
//! [`HeadlessProbe`] half can be held on any thread to inspect what the UI
//! thread did and to feed pointer events in.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use super::{PlatformError, PresentationBackend, SurfaceConfig, SurfaceFlags};
use crate::frame::Frame;
use crate::gesture::{PointerEvent, SurfaceRect};
use crate::surface::SurfaceHandle;

/// What the backend knows about one surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub namespace: String,
    pub rect: SurfaceRect,
    pub flags: SurfaceFlags,
    pub last_frame: Option<Frame>,
    pub geometry_updates: usize,
    pub presents: usize,
}

#[derive(Debug, Default)]
struct Shared {
    surfaces: HashMap<SurfaceHandle, SurfaceRecord>,
    pending: VecDeque<(SurfaceHandle, PointerEvent)>,
    fail_creates: usize,
    fail_geometry: usize,
    created: usize,
    destroyed: usize,
    flag_changes: Vec<(SurfaceHandle, SurfaceFlags)>,
}

/// Backend with no display server behind it
#[derive(Debug)]
pub struct HeadlessBackend {
    shared: Arc<Mutex<Shared>>,
}

/// Inspection and injection handle for a [`HeadlessBackend`]
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    shared: Arc<Mutex<Shared>>,
}

impl HeadlessBackend {
    pub fn new() -> (Self, HeadlessProbe) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            HeadlessProbe { shared },
        )
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PresentationBackend for HeadlessBackend {
    fn create_surface(
        &mut self,
        handle: SurfaceHandle,
        config: &SurfaceConfig,
    ) -> Result<(), PlatformError> {
        let mut shared = self.shared();
        if shared.fail_creates > 0 {
            shared.fail_creates -= 1;
            return Err(PlatformError::CreateFailed("injected failure".to_string()));
        }
        shared.created += 1;
        shared.surfaces.insert(
            handle,
            SurfaceRecord {
                namespace: config.namespace.clone(),
                rect: config.rect,
                flags: config.flags,
                last_frame: None,
                geometry_updates: 0,
                presents: 0,
            },
        );
        Ok(())
    }

    fn set_geometry(&mut self, handle: SurfaceHandle, rect: SurfaceRect) -> Result<(), PlatformError> {
        let mut shared = self.shared();
        if shared.fail_geometry > 0 {
            shared.fail_geometry -= 1;
            return Err(PlatformError::UpdateFailed("injected failure".to_string()));
        }
        let surface = shared
            .surfaces
            .get_mut(&handle)
            .ok_or(PlatformError::UnknownSurface(handle))?;
        surface.rect = rect;
        surface.geometry_updates += 1;
        Ok(())
    }

    fn set_flags(&mut self, handle: SurfaceHandle, flags: SurfaceFlags) -> Result<(), PlatformError> {
        let mut shared = self.shared();
        let surface = shared
            .surfaces
            .get_mut(&handle)
            .ok_or(PlatformError::UnknownSurface(handle))?;
        surface.flags = flags;
        shared.flag_changes.push((handle, flags));
        Ok(())
    }

    fn present(&mut self, handle: SurfaceHandle, frame: &Frame) -> Result<(), PlatformError> {
        let mut shared = self.shared();
        let surface = shared
            .surfaces
            .get_mut(&handle)
            .ok_or(PlatformError::UnknownSurface(handle))?;
        surface.last_frame = Some(frame.clone());
        surface.presents += 1;
        Ok(())
    }

    fn destroy_surface(&mut self, handle: SurfaceHandle) {
        let mut shared = self.shared();
        if shared.surfaces.remove(&handle).is_some() {
            shared.destroyed += 1;
        }
        shared.pending.retain(|(h, _)| *h != handle);
    }

    fn poll_events(&mut self) -> Vec<(SurfaceHandle, PointerEvent)> {
        self.shared().pending.drain(..).collect()
    }
}

impl HeadlessProbe {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` surface creations fail
    pub fn fail_next_creates(&self, count: usize) {
        self.shared().fail_creates = count;
    }

    /// Make the next `count` geometry updates fail
    pub fn fail_next_geometry_updates(&self, count: usize) {
        self.shared().fail_geometry = count;
    }

    /// Queue a raw pointer event for the UI thread to pick up
    pub fn push_pointer(&self, handle: SurfaceHandle, event: PointerEvent) {
        self.shared().pending.push_back((handle, event));
    }

    pub fn surface(&self, handle: SurfaceHandle) -> Option<SurfaceRecord> {
        self.shared().surfaces.get(&handle).cloned()
    }

    pub fn live_surfaces(&self) -> usize {
        self.shared().surfaces.len()
    }

    pub fn created(&self) -> usize {
        self.shared().created
    }

    pub fn destroyed(&self) -> usize {
        self.shared().destroyed
    }

    /// Every flag change applied so far, oldest first
    pub fn flag_changes(&self) -> Vec<(SurfaceHandle, SurfaceFlags)> {
        self.shared().flag_changes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SurfaceConfig {
        SurfaceConfig {
            rect: SurfaceRect::new(0, 0, 100, 50),
            namespace: "perch-test".to_string(),
            flags: SurfaceFlags::default(),
        }
    }

    #[test]
    fn records_surface_lifecycle() {
        let (mut backend, probe) = HeadlessBackend::new();
        let handle = SurfaceHandle::from_raw(1);
        backend.create_surface(handle, &config()).unwrap();
        backend
            .set_geometry(handle, SurfaceRect::new(5, 5, 100, 50))
            .unwrap();
        backend.present(handle, &Frame::new(100, 50)).unwrap();

        let record = probe.surface(handle).unwrap();
        assert_eq!(record.rect, SurfaceRect::new(5, 5, 100, 50));
        assert_eq!(record.geometry_updates, 1);
        assert_eq!(record.presents, 1);
        assert!(!record.flags.focusable);

        backend.destroy_surface(handle);
        backend.destroy_surface(handle);
        assert_eq!(probe.destroyed(), 1);
        assert!(matches!(
            backend.set_geometry(handle, SurfaceRect::new(0, 0, 1, 1)),
            Err(PlatformError::UnknownSurface(_))
        ));
    }

    #[test]
    fn injected_create_failure_is_one_shot() {
        let (mut backend, probe) = HeadlessBackend::new();
        probe.fail_next_creates(1);
        assert!(backend.create_surface(SurfaceHandle::from_raw(1), &config()).is_err());
        assert!(backend.create_surface(SurfaceHandle::from_raw(2), &config()).is_ok());
        assert_eq!(probe.created(), 1);
    }
}
