//! Null Backend - In-memory display for testing
//!
//! This backend keeps the window tree and properties in memory instead of
//! talking to a server. It records every request so tests can count round
//! trips, and it plays a cooperative window manager: `_NET_WM_STATE` client
//! messages and iconify requests are applied to the target's properties the
//! way a real window manager would.
//!
//! Structure notifications (map, unmap, configure, destroy) are only
//! generated after `set_notifications(true)`, so unit tests see a quiet event
//! stream unless they ask for one.

use super::*;
use crate::protocol::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

const ROOT_WINDOW: NativeHandle = NativeHandle(0x0000_0100);
const FIRST_WINDOW_ID: u32 = 0x0040_0001;
const FIRST_ATOM_ID: u32 = 0x0000_0200;

/// One client message as sent by the window core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: NativeHandle,
    pub window: NativeHandle,
    pub type_: Atom,
    pub data: [u32; 5],
    pub event_mask: u32,
}

/// Everything the window core asked the display to do
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    pub created: Vec<(NativeHandle, NativeWindowParams)>,
    pub destroyed: Vec<NativeHandle>,
    pub maps: Vec<NativeHandle>,
    pub raised_maps: Vec<NativeHandle>,
    pub unmaps: Vec<NativeHandle>,
    pub configures: Vec<(NativeHandle, WindowConfig)>,
    pub selected_input: Vec<(NativeHandle, u32)>,
    pub property_writes: Vec<(NativeHandle, Atom, PropertyValue)>,
    pub property_deletes: Vec<(NativeHandle, Atom)>,
    pub client_messages: Vec<SentMessage>,
    pub flushes: usize,
}

impl CallLog {
    /// Number of writes of `property` on `window`
    pub fn writes_of(&self, window: NativeHandle, property: Atom) -> usize {
        self.property_writes
            .iter()
            .filter(|(w, p, _)| *w == window && *p == property)
            .count()
    }

    /// Number of move/resize requests for `window`
    pub fn configures_of(&self, window: NativeHandle) -> usize {
        self.configures.iter().filter(|(w, _)| *w == window).count()
    }

    pub fn maps_of(&self, window: NativeHandle) -> usize {
        self.maps.iter().filter(|w| **w == window).count()
    }

    pub fn unmaps_of(&self, window: NativeHandle) -> usize {
        self.unmaps.iter().filter(|w| **w == window).count()
    }

    /// Client messages of the given type
    pub fn messages_of(&self, type_: Atom) -> Vec<&SentMessage> {
        self.client_messages
            .iter()
            .filter(|m| m.type_ == type_)
            .collect()
    }
}

struct NullWindow {
    parent: NativeHandle,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    mapped: bool,
    event_mask: u32,
    properties: HashMap<Atom, PropertyValue>,
}

impl NullWindow {
    fn new(parent: NativeHandle, x: i32, y: i32, width: u32, height: u32) -> Self {
        NullWindow {
            parent,
            x,
            y,
            width,
            height,
            mapped: false,
            event_mask: 0,
            properties: HashMap::new(),
        }
    }
}

struct NullState {
    next_window: u32,
    next_atom: u32,
    atom_ids: HashMap<String, Atom>,
    windows: HashMap<NativeHandle, NullWindow>,
    events: VecDeque<NativeEvent>,
    log: CallLog,
    /// Creation calls left before `create_window` starts returning `NONE`
    creates_until_failure: Option<usize>,
    active_window: NativeHandle,
    notifications: bool,
    closed: bool,
}

impl NullState {
    fn intern(&mut self, name: &str) -> Atom {
        if let Some(atom) = predefined_atom(name) {
            return atom;
        }
        if let Some(atom) = self.atom_ids.get(name) {
            return *atom;
        }
        let atom = Atom(self.next_atom);
        self.next_atom += 1;
        self.atom_ids.insert(name.to_string(), atom);
        atom
    }

    fn window(&self, window: NativeHandle) -> BackendResult<&NullWindow> {
        self.windows
            .get(&window)
            .ok_or_else(|| format!("BadWindow: {}", window).into())
    }

    fn window_mut(&mut self, window: NativeHandle) -> BackendResult<&mut NullWindow> {
        self.windows
            .get_mut(&window)
            .ok_or_else(|| format!("BadWindow: {}", window).into())
    }

    /// Absolute position of a window's origin
    fn origin(&self, mut window: NativeHandle) -> (i32, i32) {
        let (mut x, mut y) = (0, 0);
        while let Some(w) = self.windows.get(&window) {
            x += w.x;
            y += w.y;
            window = w.parent;
        }
        (x, y)
    }

    fn state_atoms(&self, window: NativeHandle, atoms: &Atoms) -> Vec<Atom> {
        self.windows
            .get(&window)
            .and_then(|w| w.properties.get(&atoms._NET_WM_STATE))
            .map(|p| p.to_atoms())
            .unwrap_or_default()
    }

    fn set_state_atoms(&mut self, window: NativeHandle, atoms: &Atoms, state: &[Atom]) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.properties
                .insert(atoms._NET_WM_STATE, PropertyValue::from_atoms(state));
        }
    }

    /// Queue a structure notification for the window itself and for its
    /// parent, honoring the selected masks.
    fn notify<F>(&mut self, window: NativeHandle, make: F)
    where
        F: Fn(NativeHandle) -> NativeEvent,
    {
        if !self.notifications {
            return;
        }
        let (mask, parent) = match self.windows.get(&window) {
            Some(w) => (w.event_mask, w.parent),
            None => return,
        };
        if mask & event_mask::STRUCTURE_NOTIFY != 0 {
            self.events.push_back(make(window));
        }
        let parent_mask = self.windows.get(&parent).map_or(0, |p| p.event_mask);
        if parent_mask & event_mask::SUBSTRUCTURE_NOTIFY != 0 {
            self.events.push_back(make(parent));
        }
    }
}

fn predefined_atom(name: &str) -> Option<Atom> {
    Some(match name {
        "ATOM" => Atom::ATOM,
        "CARDINAL" => Atom::CARDINAL,
        "STRING" => Atom::STRING,
        "WINDOW" => Atom::WINDOW,
        "WM_HINTS" => Atom::WM_HINTS,
        "WM_NAME" => Atom::WM_NAME,
        "WM_NORMAL_HINTS" => Atom::WM_NORMAL_HINTS,
        "WM_SIZE_HINTS" => Atom::WM_SIZE_HINTS,
        "WM_ZOOM_HINTS" => Atom::WM_ZOOM_HINTS,
        "WM_TRANSIENT_FOR" => Atom::WM_TRANSIENT_FOR,
        _ => return None,
    })
}

pub struct NullDisplay {
    atoms: Atoms,
    root: NativeHandle,
    foster: NativeHandle,
    custom_visual: bool,
    state: Mutex<NullState>,
    event_ready: Condvar,
}

impl NullDisplay {
    pub fn new() -> Self {
        let mut state = NullState {
            next_window: FIRST_WINDOW_ID,
            next_atom: FIRST_ATOM_ID,
            atom_ids: HashMap::new(),
            windows: HashMap::new(),
            events: VecDeque::new(),
            log: CallLog::default(),
            creates_until_failure: None,
            active_window: NativeHandle::NONE,
            notifications: false,
            closed: false,
        };

        let mut root = NullWindow::new(NativeHandle::NONE, 0, 0, 1920, 1080);
        root.mapped = true;
        state.windows.insert(ROOT_WINDOW, root);

        let foster = NativeHandle(state.next_window);
        state.next_window += 1;
        state
            .windows
            .insert(foster, NullWindow::new(ROOT_WINDOW, 0, 0, 1, 1));

        let mut atom_state = |name: &str| -> BackendResult<Atom> { Ok(state.intern(name)) };
        // Interning into the in-memory table cannot fail
        let atoms = Atoms::intern(&mut atom_state).unwrap_or_default();

        NullDisplay {
            atoms,
            root: ROOT_WINDOW,
            foster,
            custom_visual: false,
            state: Mutex::new(state),
            event_ready: Condvar::new(),
        }
    }

    /// Pretend the display was opened with its own visual and colormap
    pub fn with_custom_visual(mut self) -> Self {
        self.custom_visual = true;
        self
    }

    /// Generate structure notifications for map/unmap/configure/destroy
    pub fn set_notifications(&self, enabled: bool) {
        self.state.lock().unwrap().notifications = enabled;
    }

    /// Let `successes` more windows be created, then refuse the next ones
    pub fn fail_create_after(&self, successes: usize) {
        self.state.lock().unwrap().creates_until_failure = Some(successes);
    }

    /// Snapshot of the recorded calls
    pub fn calls(&self) -> CallLog {
        self.state.lock().unwrap().log.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().log = CallLog::default();
    }

    /// Inject a native event, as if it had come from the server
    pub fn push_event(&self, event: NativeEvent) {
        self.state.lock().unwrap().events.push_back(event);
        self.event_ready.notify_all();
    }

    /// Make blocked readers fail, the way a dropped connection would
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.event_ready.notify_all();
    }

    pub fn exists(&self, window: NativeHandle) -> bool {
        self.state.lock().unwrap().windows.contains_key(&window)
    }

    pub fn is_mapped(&self, window: NativeHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&window)
            .map_or(false, |w| w.mapped)
    }

    /// Current value of a property, whoever wrote it
    pub fn property(&self, window: NativeHandle, property: Atom) -> Option<PropertyValue> {
        self.state
            .lock()
            .unwrap()
            .windows
            .get(&window)
            .and_then(|w| w.properties.get(&property).cloned())
    }

    /// Write a property as the window manager would; not recorded
    pub fn wm_set_property(&self, window: NativeHandle, property: Atom, value: PropertyValue) {
        let mut state = self.state.lock().unwrap();
        if let Some(w) = state.windows.get_mut(&window) {
            w.properties.insert(property, value);
        }
    }

    /// Reparent a window into a new parent as a reparenting window manager
    /// would, and report it
    pub fn wm_reparent(&self, window: NativeHandle, new_parent: NativeHandle) {
        let mut state = self.state.lock().unwrap();
        let old_parent = match state.windows.get_mut(&window) {
            Some(w) => std::mem::replace(&mut w.parent, new_parent),
            None => return,
        };
        state.events.push_back(NativeEvent::ReparentNotify {
            event: window,
            window,
            parent: new_parent,
        });
        log::debug!(
            "Null display: reparented {} from {} to {}",
            window,
            old_parent,
            new_parent
        );
        drop(state);
        self.event_ready.notify_all();
    }

    /// Create a bare window outside the window core (e.g. a WM frame)
    pub fn wm_create_window(&self, parent: NativeHandle, x: i32, y: i32) -> NativeHandle {
        let mut state = self.state.lock().unwrap();
        let id = NativeHandle(state.next_window);
        state.next_window += 1;
        let mut w = NullWindow::new(parent, x, y, 1, 1);
        w.mapped = true;
        state.windows.insert(id, w);
        id
    }

    pub fn active_window(&self) -> NativeHandle {
        self.state.lock().unwrap().active_window
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }

    fn apply_net_wm_state(&self, state: &mut NullState, window: NativeHandle, data: &[u32; 5]) {
        let mut current = state.state_atoms(window, &self.atoms);
        for raw in &data[1..3] {
            if *raw == 0 {
                continue;
            }
            let atom = Atom(*raw);
            let present = current.contains(&atom);
            let add = match data[0] {
                NET_WM_STATE_ADD => true,
                NET_WM_STATE_REMOVE => false,
                NET_WM_STATE_TOGGLE => !present,
                _ => continue,
            };
            if add && !present {
                current.push(atom);
            } else if !add {
                current.retain(|a| *a != atom);
            }
        }
        state.set_state_atoms(window, &self.atoms, &current);
    }
}

impl Default for NullDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayConnection for NullDisplay {
    fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn root_window(&self) -> NativeHandle {
        self.root
    }

    fn foster_parent(&self) -> NativeHandle {
        self.foster
    }

    fn has_custom_visual(&self) -> bool {
        self.custom_visual
    }

    fn intern_atom(&self, name: &str) -> BackendResult<Atom> {
        Ok(self.state.lock().unwrap().intern(name))
    }

    fn create_window(&self, params: &NativeWindowParams) -> BackendResult<NativeHandle> {
        let mut state = self.state.lock().unwrap();
        state.window(params.parent)?;

        if let Some(left) = state.creates_until_failure.as_mut() {
            if *left == 0 {
                log::debug!("Null display: refusing window creation");
                return Ok(NativeHandle::NONE);
            }
            *left -= 1;
        }

        let id = NativeHandle(state.next_window);
        state.next_window += 1;
        state.windows.insert(
            id,
            NullWindow::new(params.parent, params.x, params.y, params.width, params.height),
        );
        state.log.created.push((id, params.clone()));
        Ok(id)
    }

    fn destroy_window(&self, window: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.window(window)?;
        state.log.destroyed.push(window);
        state.notify(window, |event| NativeEvent::DestroyNotify { event, window });

        let mut doomed = vec![window];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                state
                    .windows
                    .iter()
                    .filter(|(_, w)| w.parent == parent)
                    .map(|(id, _)| *id),
            );
            i += 1;
        }
        for id in doomed {
            state.windows.remove(&id);
        }
        drop(state);
        self.event_ready.notify_all();
        Ok(())
    }

    fn map_window(&self, window: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.window_mut(window)?.mapped = true;
        state.log.maps.push(window);

        // A mapped window is no longer iconic
        let hidden = self.atoms._NET_WM_STATE_HIDDEN;
        let mut current = state.state_atoms(window, &self.atoms);
        if current.contains(&hidden) {
            current.retain(|a| *a != hidden);
            state.set_state_atoms(window, &self.atoms, &current);
        }

        state.notify(window, |event| NativeEvent::MapNotify { event, window });
        drop(state);
        self.event_ready.notify_all();
        Ok(())
    }

    fn map_raised(&self, window: NativeHandle) -> BackendResult<()> {
        self.state.lock().unwrap().log.raised_maps.push(window);
        self.map_window(window)
    }

    fn unmap_window(&self, window: NativeHandle) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.window_mut(window)?.mapped = false;
        state.log.unmaps.push(window);
        state.notify(window, |event| NativeEvent::UnmapNotify { event, window });
        drop(state);
        self.event_ready.notify_all();
        Ok(())
    }

    fn configure_window(&self, window: NativeHandle, config: WindowConfig) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let w = state.window_mut(window)?;
        if let Some(x) = config.x {
            w.x = x;
        }
        if let Some(y) = config.y {
            w.y = y;
        }
        if let Some(width) = config.width {
            w.width = width;
        }
        if let Some(height) = config.height {
            w.height = height;
        }
        let event = NativeEvent::Configure {
            window,
            x: w.x,
            y: w.y,
            width: w.width as i32,
            height: w.height as i32,
            synthetic: false,
        };
        let wants_notify = w.event_mask & event_mask::STRUCTURE_NOTIFY != 0;
        state.log.configures.push((window, config));
        if state.notifications && wants_notify {
            state.events.push_back(event);
        }
        drop(state);
        self.event_ready.notify_all();
        Ok(())
    }

    fn select_input(&self, window: NativeHandle, event_mask: u32) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.window_mut(window)?.event_mask = event_mask;
        state.log.selected_input.push((window, event_mask));
        Ok(())
    }

    fn get_geometry(&self, window: NativeHandle) -> BackendResult<Geometry> {
        let state = self.state.lock().unwrap();
        let w = state.window(window)?;
        Ok(Geometry {
            root: self.root,
            x: w.x,
            y: w.y,
            width: w.width as i32,
            height: w.height as i32,
            border_width: 0,
            depth: 24,
        })
    }

    fn get_map_state(&self, window: NativeHandle) -> BackendResult<MapState> {
        let state = self.state.lock().unwrap();
        let w = state.window(window)?;
        if !w.mapped {
            return Ok(MapState::Unmapped);
        }
        let mut parent = w.parent;
        while let Some(p) = state.windows.get(&parent) {
            if !p.mapped {
                return Ok(MapState::Unviewable);
            }
            parent = p.parent;
        }
        Ok(MapState::Viewable)
    }

    fn query_parent(&self, window: NativeHandle) -> BackendResult<NativeHandle> {
        Ok(self.state.lock().unwrap().window(window)?.parent)
    }

    fn translate_coordinates(
        &self,
        src: NativeHandle,
        dst: NativeHandle,
        x: i32,
        y: i32,
    ) -> BackendResult<(i32, i32)> {
        let state = self.state.lock().unwrap();
        state.window(src)?;
        state.window(dst)?;
        let (sx, sy) = state.origin(src);
        let (dx, dy) = state.origin(dst);
        Ok((sx + x - dx, sy + y - dy))
    }

    fn change_property(
        &self,
        window: NativeHandle,
        property: Atom,
        value: &PropertyValue,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .window_mut(window)?
            .properties
            .insert(property, value.clone());
        state
            .log
            .property_writes
            .push((window, property, value.clone()));
        Ok(())
    }

    fn get_property(
        &self,
        window: NativeHandle,
        property: Atom,
        type_: Atom,
    ) -> BackendResult<Option<PropertyValue>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .window(window)?
            .properties
            .get(&property)
            .filter(|p| type_ == Atom::NONE || p.type_ == type_)
            .cloned())
    }

    fn delete_property(&self, window: NativeHandle, property: Atom) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.window_mut(window)?.properties.remove(&property);
        state.log.property_deletes.push((window, property));
        Ok(())
    }

    fn send_client_message(
        &self,
        destination: NativeHandle,
        window: NativeHandle,
        type_: Atom,
        data: [u32; 5],
        event_mask: u32,
    ) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.client_messages.push(SentMessage {
            destination,
            window,
            type_,
            data,
            event_mask,
        });

        if destination != self.root {
            state.events.push_back(NativeEvent::ClientMessage {
                window,
                type_,
                data,
            });
            drop(state);
            self.event_ready.notify_all();
            return Ok(());
        }

        if type_ == self.atoms._NET_WM_STATE {
            self.apply_net_wm_state(&mut state, window, &data);
        } else if type_ == self.atoms.WM_CHANGE_STATE && data[0] == wm_hints::ICONIC_STATE {
            let hidden = self.atoms._NET_WM_STATE_HIDDEN;
            let mut current = state.state_atoms(window, &self.atoms);
            if !current.contains(&hidden) {
                current.push(hidden);
            }
            state.set_state_atoms(window, &self.atoms, &current);
            if let Some(w) = state.windows.get_mut(&window) {
                w.mapped = false;
            }
        } else if type_ == self.atoms._NET_ACTIVE_WINDOW {
            state.active_window = window;
        }
        Ok(())
    }

    fn wait_for_event(&self) -> BackendResult<NativeEvent> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Ok(event);
            }
            if state.closed {
                return Err("display connection closed".into());
            }
            state = self.event_ready.wait(state).unwrap();
        }
    }

    fn poll_event(&self, timeout: Duration) -> BackendResult<Option<NativeEvent>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Ok(Some(event));
            }
            if state.closed {
                return Err("display connection closed".into());
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            state = self.event_ready.wait_timeout(state, deadline - now).unwrap().0;
        }
    }

    fn flush(&self) -> BackendResult<()> {
        self.state.lock().unwrap().log.flushes += 1;
        Ok(())
    }
}
