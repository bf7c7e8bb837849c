//! Native windows
//!
//! A `NativeWindow` wraps the pair of native windows behind one toolkit
//! window: the frame the window manager decorates and the client window
//! inside it. It caches geometry and window manager state, tracks invalid
//! regions, and feeds paint and configure work into its thread queue.
//!
//! Messages produced while the window is locked go to an outbox;
//! `WindowRegistry` delivers them once the lock is released.

pub mod message;
pub mod paint;
pub mod registry;
pub mod styles;

pub use message::*;
pub use paint::PaintState;
pub use registry::WindowRegistry;
pub use styles::*;

use crate::backend::{DisplayConnection, NativeWindowParams, WindowConfig};
use crate::error::{CreateStage, Error, Result};
use crate::protocol::*;
use crate::queue::ThreadQueue;
use std::fmt;
use std::sync::Arc;

/// Position sentinel: let the system pick
pub const USE_DEFAULT: i32 = i32::MIN;

/// Where un-parented top-levels go when no position was requested
pub const DEFAULT_TOPLEVEL_POSITION: (i32, i32) = (50, 50);

/// Smallest minimum size advertised to the window manager
pub const MINIMUM_WINDOW_SIZE: (i32, i32) = (110, 22);

/// Toolkit-side window identifier, stable for the life of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WindowId(pub u32);

impl WindowId {
    pub const NONE: WindowId = WindowId(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Normal,
    Minimized,
    Maximized,
    /// Not mapped yet, the window manager has not said anything
    Unknown,
}

/// Which of the two native windows a map/unmap applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapTarget {
    Frame,
    Client,
    Both,
}

impl MapTarget {
    fn frame(self) -> bool {
        matches!(self, MapTarget::Frame | MapTarget::Both)
    }

    fn client(self) -> bool {
        matches!(self, MapTarget::Client | MapTarget::Both)
    }
}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CreateParams {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub style: u32,
    pub ex_style: u32,
    pub parent: Option<WindowId>,
    pub owner: Option<WindowId>,
    pub caption: String,
    pub modal: bool,
}

impl CreateParams {
    pub fn new(caption: impl Into<String>) -> Self {
        CreateParams {
            x: USE_DEFAULT,
            y: USE_DEFAULT,
            width: 300,
            height: 200,
            style: 0,
            ex_style: 0,
            parent: None,
            owner: None,
            caption: caption.into(),
            modal: false,
        }
    }

    pub fn with_bounds(mut self, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_style(mut self, style: u32) -> Self {
        self.style = style;
        self
    }

    pub fn with_ex_style(mut self, ex_style: u32) -> Self {
        self.ex_style = ex_style;
        self
    }

    pub fn with_parent(mut self, parent: WindowId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_owner(mut self, owner: WindowId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn modal(mut self) -> Self {
        self.modal = true;
        self
    }
}

/// Native handles of a parent window, resolved by the registry.
///
/// Windows refer to each other by id; the handles are a snapshot used for
/// native parenting and transient-for hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParentLink {
    pub id: WindowId,
    pub frame: NativeHandle,
    pub client: NativeHandle,
}

pub struct NativeWindow {
    id: WindowId,
    display: Arc<dyn DisplayConnection>,
    queue: Arc<ThreadQueue>,
    policy: Arc<dyn StylePolicy>,
    paint: Arc<PaintState>,

    frame: NativeHandle,
    client: NativeHandle,
    created: bool,
    zombie: bool,

    x: i32,
    y: i32,
    width: i32,
    height: i32,
    client_rect: Rect,

    parent: Option<ParentLink>,
    owner_frame: NativeHandle,

    style: u32,
    ex_style: u32,
    modal: bool,
    derived: DerivedStyles,
    text: String,

    mapped: bool,
    visible: bool,
    enabled: bool,
    fixed_size: bool,
    reparented: bool,
    zero_sized: bool,
    configure_pending: bool,
    allow_drop: bool,

    wm_state: Vec<Atom>,
    window_type: Vec<Atom>,
    opacity: f64,

    outbox: Vec<Message>,
}

impl NativeWindow {
    pub fn new(
        id: WindowId,
        display: Arc<dyn DisplayConnection>,
        queue: Arc<ThreadQueue>,
        policy: Arc<dyn StylePolicy>,
    ) -> Self {
        NativeWindow {
            id,
            display,
            queue,
            policy,
            paint: Arc::new(PaintState::new(id)),
            frame: NativeHandle::NONE,
            client: NativeHandle::NONE,
            created: false,
            zombie: false,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            client_rect: Rect::EMPTY,
            parent: None,
            owner_frame: NativeHandle::NONE,
            style: 0,
            ex_style: 0,
            modal: false,
            derived: DerivedStyles::default(),
            text: String::new(),
            mapped: false,
            visible: false,
            enabled: true,
            fixed_size: false,
            reparented: false,
            zero_sized: false,
            configure_pending: false,
            allow_drop: false,
            wm_state: Vec::new(),
            window_type: Vec::new(),
            opacity: 1.0,
            outbox: Vec::new(),
        }
    }

    // Accessors

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn frame(&self) -> NativeHandle {
        self.frame
    }

    pub fn client(&self) -> NativeHandle {
        self.client
    }

    pub fn queue(&self) -> &Arc<ThreadQueue> {
        &self.queue
    }

    pub fn paint_state(&self) -> &Arc<PaintState> {
        &self.paint
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Client area relative to the frame; empty until the next NC pass
    /// after a configure notification.
    pub fn client_rect(&self) -> Rect {
        self.client_rect
    }

    pub fn parent(&self) -> Option<WindowId> {
        self.parent.map(|p| p.id)
    }

    pub fn style(&self) -> u32 {
        self.style
    }

    pub fn ex_style(&self) -> u32 {
        self.ex_style
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size
    }

    pub fn is_reparented(&self) -> bool {
        self.reparented
    }

    pub fn is_zero_sized(&self) -> bool {
        self.zero_sized
    }

    pub fn configure_pending(&self) -> bool {
        self.configure_pending
    }

    pub fn is_zombie(&self) -> bool {
        self.zombie
    }

    pub fn allows_drop(&self) -> bool {
        self.allow_drop
    }

    /// Last `_NET_WM_STATE` list written or read back, unsorted
    pub fn wm_state(&self) -> &[Atom] {
        &self.wm_state
    }

    /// Last `_NET_WM_WINDOW_TYPE` list written, unsorted
    pub fn window_type(&self) -> &[Atom] {
        &self.window_type
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Top-level windows have no parent and are not children of the foster
    /// parent
    pub fn is_toplevel(&self) -> bool {
        self.parent.is_none() && !style_set(self.style, WS_CHILD)
    }

    /// Drain the messages produced since the last call
    pub fn take_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    fn post(&mut self, msg: Msg, wparam: usize, lparam: isize) {
        self.outbox.push(Message::new(self.id, msg, wparam, lparam));
    }

    fn require_created(&self) -> Result<()> {
        if self.frame.is_none() || self.client.is_none() {
            return Err(Error::NotCreated);
        }
        Ok(())
    }

    // Lifecycle

    /// Create both native windows and negotiate the initial window manager
    /// state.
    ///
    /// # Panics
    ///
    /// If called a second time on the same window.
    pub fn create(
        &mut self,
        params: &CreateParams,
        parent: Option<ParentLink>,
        owner: NativeHandle,
    ) -> Result<()> {
        self.create_handles(params, parent, owner)?;
        self.finish_create(params)
    }

    /// First half of `create`: the native frame and client windows.
    ///
    /// The registry records the handles between the two halves so events
    /// the server sends during the rest of the negotiation can be routed.
    pub fn create_handles(
        &mut self,
        params: &CreateParams,
        parent: Option<ParentLink>,
        owner: NativeHandle,
    ) -> Result<()> {
        assert!(!self.created, "window {} created twice", self.id);
        self.created = true;

        self.style = params.style;
        self.ex_style = params.ex_style;
        self.modal = params.modal;
        self.parent = parent;
        self.owner_frame = owner;
        self.enabled = !style_set(params.style, WS_DISABLED);

        let native_parent = match parent {
            Some(link) => link.client,
            None if style_set(params.style, WS_CHILD) => self.display.foster_parent(),
            None => self.display.root_window(),
        };

        let toplevel = self.is_toplevel();
        let (default_x, default_y) = if toplevel {
            DEFAULT_TOPLEVEL_POSITION
        } else {
            (0, 0)
        };
        self.x = if params.x == USE_DEFAULT { default_x } else { params.x };
        self.y = if params.y == USE_DEFAULT { default_y } else { params.y };
        self.width = params.width.max(1);
        self.height = params.height.max(1);

        self.derived = self.policy.derive(self.style, self.ex_style);
        self.client_rect = self.compute_client_rect();

        let frame = self.display.create_window(&NativeWindowParams {
            parent: native_parent,
            x: self.x,
            y: self.y,
            width: self.width as u32,
            height: self.height as u32,
            gravity_north_west: true,
            save_under: style_set(self.ex_style, WS_EX_TOOLWINDOW),
            override_redirect: style_set(self.style, WS_POPUP)
                && !style_set(self.style, WS_CAPTION),
            custom_visual: false,
        })?;
        if frame.is_none() {
            return Err(Error::CreateFailed {
                stage: CreateStage::Frame,
            });
        }

        let client_params = NativeWindowParams {
            parent: frame,
            x: self.client_rect.x,
            y: self.client_rect.y,
            width: self.client_rect.width as u32,
            height: self.client_rect.height as u32,
            gravity_north_west: true,
            save_under: false,
            override_redirect: false,
            custom_visual: self.display.has_custom_visual(),
        };
        let client = match self.display.create_window(&client_params) {
            Ok(client) if !client.is_none() => client,
            result => {
                // Do not leak the frame
                if let Err(e) = self.display.destroy_window(frame) {
                    log::warn!("Failed to destroy orphaned frame {}: {}", frame, e);
                }
                return Err(match result {
                    Err(e) => Error::Backend(e),
                    Ok(_) => Error::CreateFailed {
                        stage: CreateStage::Client,
                    },
                });
            }
        };

        self.frame = frame;
        self.client = client;
        self.paint.set_handles(frame, client);

        log::debug!(
            "Created window {} frame {} client {} parent {} style 0x{:08x} ex 0x{:08x}",
            self.id,
            frame,
            client,
            native_parent,
            self.style,
            self.ex_style
        );
        Ok(())
    }

    /// Second half of `create`: hints, input selection, mapping and title.
    pub fn finish_create(&mut self, params: &CreateParams) -> Result<()> {
        self.require_created()?;
        let atoms = *self.display.atoms();
        let root = self.display.root_window();

        // Position-only hints so the first map honors the request
        if !style_set(self.style, WS_CHILD) && params.x != USE_DEFAULT && params.y != USE_DEFAULT
        {
            let hints = SizeHints {
                flags: size_hints::US_POSITION | size_hints::P_POSITION,
                x: self.x,
                y: self.y,
                ..Default::default()
            };
            self.display.set_wm_normal_hints(self.frame, &hints)?;
        }

        self.display.select_input(
            self.frame,
            event_mask::STANDARD_INPUT | event_mask::FRAME_EXTRA,
        )?;
        self.display
            .select_input(self.client, event_mask::STANDARD_INPUT)?;

        if style_set(self.style, WS_VISIBLE) {
            self.visible = true;
            self.map(MapTarget::Both)?;
        }

        if style_set(self.ex_style, WS_EX_TOPMOST) {
            self.set_window_type(&[atoms._NET_WM_WINDOW_TYPE_NORMAL])?;
            self.display.set_transient_for(self.frame, root)?;
        }

        self.apply_wm_styles(&params.caption)?;

        let native_parent = match self.parent {
            Some(link) => link.client,
            None if style_set(self.style, WS_CHILD) => self.display.foster_parent(),
            None => root,
        };
        let hints = WmHints {
            flags: wm_hints::INPUT | wm_hints::STATE | wm_hints::WINDOW_GROUP,
            input: self.enabled,
            initial_state: if style_set(self.style, WS_MINIMIZE) {
                wm_hints::ICONIC_STATE
            } else {
                wm_hints::NORMAL_STATE
            },
            window_group: if native_parent == root {
                native_parent
            } else {
                self.frame
            },
            ..Default::default()
        };
        self.display.set_wm_hints(self.frame, &hints)?;

        if style_set(self.style, WS_MINIMIZE) {
            self.set_window_state(WindowState::Minimized)?;
        } else if style_set(self.style, WS_MAXIMIZE) {
            self.set_window_state(WindowState::Maximized)?;
        }

        self.allow_drop = true;
        self.set_text(Some(&params.caption))?;

        self.post(Msg::CREATE, 0, 0);
        if self.visible {
            self.post(Msg::SHOWWINDOW, 1, 0);
        }
        Ok(())
    }

    /// Release the native windows. Safe to call any number of times, and on
    /// a window that was never created.
    pub fn destroy(&mut self) -> Result<()> {
        let target = if !self.frame.is_none() {
            self.frame
        } else if !self.client.is_none() {
            self.client
        } else {
            return Ok(());
        };

        self.post(Msg::DESTROY, 0, 0);
        self.frame = NativeHandle::NONE;
        self.client = NativeHandle::NONE;
        self.zombie = true;
        self.mapped = false;
        self.visible = false;

        self.paint.clear();
        self.queue.remove_paint(&self.paint);
        self.paint.set_handles(NativeHandle::NONE, NativeHandle::NONE);

        log::debug!("Destroying window {} ({})", self.id, target);
        self.display.destroy_window(target)?;
        Ok(())
    }

    // Mapping

    pub fn map(&mut self, target: MapTarget) -> Result<()> {
        if self.mapped {
            return Ok(());
        }
        self.map_native(target)
    }

    /// Map without looking at the cached flag. Restoring an iconified window
    /// needs this: the window manager unmapped the frame behind our back.
    fn map_native(&mut self, target: MapTarget) -> Result<()> {
        self.require_created()?;
        let topmost = style_set(self.ex_style, WS_EX_TOPMOST);
        if target.frame() {
            if topmost {
                self.display.map_raised(self.frame)?;
            } else {
                self.display.map_window(self.frame)?;
            }
        }
        if target.client() {
            self.display.map_window(self.client)?;
        }
        self.mapped = true;
        Ok(())
    }

    pub fn unmap(&mut self, target: MapTarget) -> Result<()> {
        if !self.mapped {
            return Ok(());
        }
        self.require_created()?;
        if target.frame() {
            self.display.unmap_window(self.frame)?;
        }
        if target.client() {
            self.display.unmap_window(self.client)?;
        }
        self.mapped = false;
        Ok(())
    }

    /// Show or hide the window
    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        if visible == self.visible {
            return Ok(());
        }
        self.visible = visible;
        if visible {
            if !self.zero_sized {
                self.map(MapTarget::Both)?;
            }
            self.post(Msg::SHOWWINDOW, 1, 0);
        } else {
            self.unmap(MapTarget::Both)?;
            self.post(Msg::SHOWWINDOW, 0, 0);
        }
        Ok(())
    }

    /// Record a map state change reported by the server for the frame
    pub(crate) fn set_mapped_from_server(&mut self, mapped: bool) {
        self.mapped = mapped;
    }

    // Painting

    /// Invalidate `area` of the client, or all of it when `clear_first` is
    /// set.
    pub fn invalidate(&mut self, area: Rect, clear_first: bool) {
        if clear_first {
            self.add_expose(true, 0, 0, self.width, self.height);
        } else {
            self.add_expose(true, area.x, area.y, area.width, area.height);
        }
    }

    /// Invalidate the whole non-client area
    pub fn invalidate_nc(&mut self) {
        self.add_expose(false, 0, 0, self.width, self.height);
    }

    /// Accumulate an exposed rectangle and put the window on its queue's
    /// paint list if nothing was pending yet.
    pub fn add_expose(&mut self, client: bool, x: i32, y: i32, width: i32, height: i32) {
        if self.frame.is_none() {
            return;
        }
        let bounds = Rect::new(0, 0, self.width, self.height);
        let area = match bounds.intersect(&Rect::new(x, y, width, height)) {
            Some(area) => area,
            None => return,
        };
        if self.paint.add_invalid(client, area) {
            log::trace!("Window {} queued for paint ({})", self.id, area);
            self.queue.add_paint(&self.paint);
        }
    }

    /// Deliver a pending client paint right away instead of waiting for the
    /// pump
    pub fn update(&mut self) {
        if !self.visible || !self.mapped || !self.paint.expose_pending() {
            return;
        }
        self.post(Msg::PAINT, 0, 0);
        self.paint.mark_delivered(true);
        self.queue.remove_paint(&self.paint);
    }

    /// Start painting one kind of area: returns what had been invalidated
    /// and drops the obligation.
    pub fn begin_paint(&mut self, client: bool) -> Rect {
        let area = self.paint.take(client);
        self.queue.remove_paint(&self.paint);
        area
    }

    /// Drop a paint obligation that was delivered but not painted
    pub(crate) fn validate(&mut self, client: bool) {
        let pending = if client {
            self.paint.expose_pending()
        } else {
            self.paint.nc_expose_pending()
        };
        if pending {
            self.begin_paint(client);
        }
    }

    // Geometry

    pub fn set_position(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        if self.frame.is_none() {
            return Err(Error::NotCreated);
        }

        if self.zero_sized && width > 0 && height > 0 {
            if self.visible {
                self.map(MapTarget::Frame)?;
            }
            self.zero_sized = false;
        }
        if width < 1 || height < 1 {
            self.zero_sized = true;
            self.unmap(MapTarget::Frame)?;
        }

        if (x, y, width, height) == (self.x, self.y, self.width, self.height) {
            return Ok(());
        }
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;

        if !self.zero_sized {
            self.post(Msg::WINDOWPOSCHANGED, 0, 0);
            if self.fixed_size {
                let size = (width, height);
                self.set_min_max(self.bounds(), Some(size), Some(size))?;
            }
            self.display.configure_window(
                self.frame,
                WindowConfig::move_resize(x, y, width as u32, height as u32),
            )?;
            self.perform_nc_calc()?;
        }
        Ok(())
    }

    fn compute_client_rect(&self) -> Rect {
        let border = self.derived.border_style.width();
        let caption = self.derived.caption_height;
        Rect::new(
            border,
            border + caption,
            (self.width - 2 * border).max(1),
            (self.height - 2 * border - caption).max(1),
        )
    }

    /// Recompute the client rectangle from the border and caption metrics,
    /// move the client there and repaint the non-client area.
    pub fn perform_nc_calc(&mut self) -> Result<()> {
        self.require_created()?;
        self.client_rect = self.compute_client_rect();
        if self.visible {
            let r = self.client_rect;
            self.display.configure_window(
                self.client,
                WindowConfig::move_resize(r.x, r.y, r.width as u32, r.height as u32),
            )?;
        }
        self.add_expose(false, 0, 0, self.width, self.height);
        Ok(())
    }

    /// Window manager frame extents, zero when the window manager does not
    /// publish them
    pub fn frame_extents(&self) -> Result<Borders> {
        self.require_created()?;
        let atoms = self.display.atoms();
        let value =
            self.display
                .get_property(self.frame, atoms._NET_FRAME_EXTENTS, Atom::CARDINAL)?;
        let extents = value.map(|v| v.to_u32s()).unwrap_or_default();
        if extents.len() < 4 {
            log::debug!("No frame extents for window {}", self.id);
            return Ok(Borders::default());
        }
        Ok(Borders {
            left: extents[0] as i32,
            right: extents[1] as i32,
            top: extents[2] as i32,
            bottom: extents[3] as i32,
        })
    }

    /// Screen position of the outer edge of the window manager frame
    pub fn toplevel_location(&self) -> Result<(i32, i32)> {
        self.require_created()?;
        let root = self.display.root_window();
        let (x, y) = self.display.translate_coordinates(self.frame, root, 0, 0)?;
        let extents = self.frame_extents()?;
        Ok((x - extents.left, y - extents.top))
    }

    pub fn client_to_screen(&self, x: i32, y: i32) -> Result<(i32, i32)> {
        self.require_created()?;
        let root = self.display.root_window();
        Ok(self.display.translate_coordinates(self.client, root, x, y)?)
    }

    pub fn screen_to_client(&self, x: i32, y: i32) -> Result<(i32, i32)> {
        self.require_created()?;
        let root = self.display.root_window();
        Ok(self.display.translate_coordinates(root, self.client, x, y)?)
    }

    /// Merge min/max size into the normal hints and publish the maximized
    /// rectangle as zoom hints.
    pub fn set_min_max(
        &mut self,
        maximized: Rect,
        min: Option<(i32, i32)>,
        max: Option<(i32, i32)>,
    ) -> Result<()> {
        self.require_created()?;
        let mut hints = self.display.get_wm_normal_hints(self.frame)?;

        if let Some((w, h)) = min {
            let (w, h) = (w.max(MINIMUM_WINDOW_SIZE.0), h.max(MINIMUM_WINDOW_SIZE.1));
            hints.flags |= size_hints::P_MIN_SIZE;
            hints.min_width = w;
            hints.min_height = h;
        }
        if let Some((w, h)) = max {
            if w > 0 && h > 0 {
                hints.flags |= size_hints::P_MAX_SIZE;
                hints.max_width = w;
                hints.max_height = h;
            }
        }
        if hints.flags != 0 {
            self.display.set_wm_normal_hints(self.frame, &hints)?;
        }

        if !maximized.is_empty() {
            let zoom = SizeHints {
                flags: size_hints::P_POSITION,
                x: maximized.x,
                y: maximized.y,
                width: maximized.width,
                height: maximized.height,
                ..Default::default()
            };
            self.display.set_zoom_hints(self.frame, &zoom)?;
        }
        Ok(())
    }

    // Window manager state

    pub fn window_state(&self) -> Result<WindowState> {
        self.require_created()?;
        if self.display.get_map_state(self.client)? == MapState::Unmapped {
            return Ok(WindowState::Unknown);
        }

        let atoms = self.display.atoms();
        let state = self
            .display
            .get_property(self.frame, atoms._NET_WM_STATE, Atom::ATOM)?
            .map(|v| v.to_atoms())
            .unwrap_or_default();

        let mut maximized = 0;
        let mut minimized = false;
        for atom in state {
            if atom == atoms._NET_WM_STATE_MAXIMIZED_HORZ
                || atom == atoms._NET_WM_STATE_MAXIMIZED_VERT
            {
                maximized += 1;
            } else if atom == atoms._NET_WM_STATE_HIDDEN {
                minimized = true;
            }
        }

        Ok(if minimized {
            WindowState::Minimized
        } else if maximized == 2 {
            WindowState::Maximized
        } else {
            WindowState::Normal
        })
    }

    pub fn set_window_state(&mut self, state: WindowState) -> Result<()> {
        let current = self.window_state()?;
        if current == state {
            return Ok(());
        }
        let atoms = *self.display.atoms();
        log::debug!("Window {} state {:?} -> {:?}", self.id, current, state);

        match state {
            WindowState::Normal => {
                if current == WindowState::Minimized {
                    self.map_native(MapTarget::Both)?;
                } else if current == WindowState::Maximized {
                    self.send_net_wm_state(
                        NET_WM_STATE_TOGGLE,
                        atoms._NET_WM_STATE_MAXIMIZED_HORZ,
                        atoms._NET_WM_STATE_MAXIMIZED_VERT,
                    )?;
                }
                self.activate()?;
            }
            WindowState::Minimized => {
                if current == WindowState::Maximized {
                    self.send_net_wm_state(
                        NET_WM_STATE_TOGGLE,
                        atoms._NET_WM_STATE_MAXIMIZED_HORZ,
                        atoms._NET_WM_STATE_MAXIMIZED_VERT,
                    )?;
                }
                self.display.iconify_window(self.frame)?;
            }
            WindowState::Maximized => {
                if current == WindowState::Minimized {
                    self.map_native(MapTarget::Both)?;
                }
                self.send_net_wm_state(
                    NET_WM_STATE_ADD,
                    atoms._NET_WM_STATE_MAXIMIZED_HORZ,
                    atoms._NET_WM_STATE_MAXIMIZED_VERT,
                )?;
                self.activate()?;
            }
            WindowState::Unknown => {}
        }
        Ok(())
    }

    fn send_net_wm_state(&self, action: u32, first: Atom, second: Atom) -> Result<()> {
        let net_wm_state = self.display.atoms()._NET_WM_STATE;
        self.display.send_client_message(
            self.display.root_window(),
            self.frame,
            net_wm_state,
            [action, first.get(), second.get(), 0, 0],
            event_mask::SUBSTRUCTURE_REDIRECT | event_mask::SUBSTRUCTURE_NOTIFY,
        )?;
        Ok(())
    }

    /// Ask the window manager to activate a top-level window
    pub fn activate(&mut self) -> Result<()> {
        self.require_created()?;
        if !self.is_toplevel() {
            return Ok(());
        }
        let active = self.display.atoms()._NET_ACTIVE_WINDOW;
        // Source indication 1: request from an application
        self.display.send_client_message(
            self.display.root_window(),
            self.frame,
            active,
            [1, 0, 0, 0, 0],
            event_mask::SUBSTRUCTURE_REDIRECT | event_mask::SUBSTRUCTURE_NOTIFY,
        )?;
        Ok(())
    }

    pub fn set_topmost(&mut self, enabled: bool) -> Result<()> {
        self.require_created()?;
        let atoms = *self.display.atoms();
        if enabled {
            self.ex_style |= WS_EX_TOPMOST;
            self.send_net_wm_state(NET_WM_STATE_ADD, atoms._NET_WM_STATE_ABOVE, Atom::NONE)
        } else {
            self.ex_style &= !WS_EX_TOPMOST;
            self.send_net_wm_state(NET_WM_STATE_REMOVE, atoms._NET_WM_STATE_ABOVE, Atom::NONE)
        }
    }

    /// Change the style bits and renegotiate decorations
    pub fn set_styles(&mut self, style: u32, ex_style: u32) -> Result<()> {
        self.style = style;
        self.ex_style = ex_style;
        self.derived = self.policy.derive(style, ex_style);
        self.set_wm_styles()?;
        self.perform_nc_calc()
    }

    /// Push decorations, window type, transient-for, state and protocols for
    /// the current styles
    pub fn set_wm_styles(&mut self) -> Result<()> {
        let caption = self.text.clone();
        self.apply_wm_styles(&caption)
    }

    fn apply_wm_styles(&mut self, caption: &str) -> Result<()> {
        self.require_created()?;
        let atoms = *self.display.atoms();
        let hints = self.policy.wm_hints(self.style, self.ex_style, caption);

        self.fixed_size = hints.fixed_size;
        if self.fixed_size {
            let size = (self.width, self.height);
            self.set_min_max(self.bounds(), Some(size), Some(size))?;
        }

        let tool_window = style_set(self.ex_style, WS_EX_TOOLWINDOW);
        let mut transient_for = NativeHandle::NONE;
        if tool_window && !self.reparented && !self.owner_frame.is_none() {
            transient_for = self.owner_frame;
        }
        if style_set(self.style, WS_POPUP) {
            if let Some(parent) = self.parent.filter(|p| !p.frame.is_none()) {
                transient_for = parent.frame;
            }
        }

        let mut current = self.window_state()?;
        if current == WindowState::Unknown {
            current = WindowState::Normal;
        }

        let window_type = if tool_window {
            atoms._NET_WM_WINDOW_TYPE_UTILITY
        } else {
            atoms._NET_WM_WINDOW_TYPE_NORMAL
        };
        self.set_window_type(&[window_type])?;

        self.display.change_property(
            self.frame,
            atoms._MOTIF_WM_HINTS,
            &hints.motif.to_property(atoms._MOTIF_WM_HINTS),
        )?;

        if !transient_for.is_none() {
            self.display.set_transient_for(self.frame, transient_for)?;
        }

        let r = self.client_rect;
        self.display.configure_window(
            self.client,
            WindowConfig::move_resize(r.x, r.y, r.width.max(1) as u32, r.height.max(1) as u32),
        )?;

        let mut state = Vec::new();
        if !style_set(self.ex_style, WS_EX_APPWINDOW) {
            state.push(atoms._NET_WM_STATE_SKIP_TASKBAR);
        }
        // Keep the window maximized across a style change
        if current == WindowState::Maximized {
            state.push(atoms._NET_WM_STATE_MAXIMIZED_HORZ);
            state.push(atoms._NET_WM_STATE_MAXIMIZED_VERT);
        }
        if self.modal {
            state.push(atoms._NET_WM_STATE_MODAL);
        }
        self.set_wm_state(&state)?;

        let mut protocols = vec![atoms.WM_DELETE_WINDOW];
        if style_set(self.ex_style, WS_EX_CONTEXTHELP) {
            protocols.push(atoms._NET_WM_CONTEXT_HELP);
        }
        self.display.set_wm_protocols(self.frame, &protocols)?;
        Ok(())
    }

    /// Write `_NET_WM_STATE` unless it holds the same set already
    pub fn set_wm_state(&mut self, atoms: &[Atom]) -> Result<()> {
        self.require_created()?;
        let property = self.display.atoms()._NET_WM_STATE;
        let written = write_atom_list(&*self.display, self.frame, property, &self.wm_state, atoms)?;
        if !written {
            log::trace!("Window {} _NET_WM_STATE unchanged", self.id);
        }
        self.wm_state = atoms.to_vec();
        Ok(())
    }

    /// Write `_NET_WM_WINDOW_TYPE` unless it holds the same set already
    pub fn set_window_type(&mut self, atoms: &[Atom]) -> Result<()> {
        self.require_created()?;
        let property = self.display.atoms()._NET_WM_WINDOW_TYPE;
        write_atom_list(&*self.display, self.frame, property, &self.window_type, atoms)?;
        self.window_type = atoms.to_vec();
        Ok(())
    }

    /// Set the title. `None` counts as the empty string.
    ///
    /// Both `_NET_WM_NAME` (UTF-8) and the legacy `WM_NAME` are written; the
    /// legacy one only carries Latin-1.
    pub fn set_text(&mut self, text: Option<&str>) -> Result<()> {
        let text = text.unwrap_or("");
        if self.text == text {
            return Ok(());
        }
        self.require_created()?;
        let atoms = self.display.atoms();
        self.display.change_property(
            self.frame,
            atoms._NET_WM_NAME,
            &PropertyValue::from_bytes(atoms.UTF8_STRING, text.as_bytes()),
        )?;
        self.display.store_name(self.frame, text)?;
        self.text = text.to_string();
        Ok(())
    }

    /// Window opacity in `0.0..=1.0`; fully opaque removes the property.
    pub fn set_opacity(&mut self, opacity: f64) -> Result<()> {
        self.require_created()?;
        self.opacity = opacity.clamp(0.0, 1.0);
        self.write_opacity(self.frame)?;
        if self.reparented {
            let wm_frame = self.display.query_parent(self.frame)?;
            if !wm_frame.is_none() && wm_frame != self.display.root_window() {
                self.write_opacity(wm_frame)?;
            }
        }
        Ok(())
    }

    fn write_opacity(&self, window: NativeHandle) -> Result<()> {
        let property = self.display.atoms()._NET_WM_WINDOW_OPACITY;
        let value = opacity_to_cardinal(self.opacity);
        if value == u32::MAX {
            self.display.delete_property(window, property)?;
        } else {
            self.display.change_property(
                window,
                property,
                &PropertyValue::from_u32s(Atom::CARDINAL, &[value]),
            )?;
        }
        Ok(())
    }

    pub fn set_icon(&mut self, icon: Option<&Icon>) -> Result<()> {
        self.require_created()?;
        let property = self.display.atoms()._NET_WM_ICON;
        match icon {
            Some(icon) => self.display.change_property(
                self.frame,
                property,
                &PropertyValue::from_u32s(Atom::CARDINAL, &icon.to_cardinals()),
            )?,
            None => self.display.delete_property(self.frame, property)?,
        }
        Ok(())
    }

    // Server notifications

    /// Fold a configure notification for the frame into the cached geometry
    /// and queue it once. Returns false when the event was ignored.
    pub fn handle_configure_notify(&mut self, event: &NativeEvent) -> Result<bool> {
        let (window, mut x, mut y, width, height) = match *event {
            NativeEvent::Configure {
                window,
                x,
                y,
                width,
                height,
                ..
            } => (window, x, y, width, height),
            _ => return Ok(false),
        };
        if self.zombie || window.is_none() || window != self.frame {
            return Ok(false);
        }

        if self.parent.is_none() {
            let (tx, ty) = self.toplevel_location()?;
            x = tx;
            y = ty;
        }
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self.client_rect = Rect::EMPTY;

        let mut queue = self.queue.lock();
        if !self.configure_pending {
            queue.enqueue(event.clone());
            self.configure_pending = true;
        }
        Ok(true)
    }

    /// The pump took the queued configure event: allow the next one and lay
    /// the client out again
    pub fn configure_dispatched(&mut self) -> Result<()> {
        self.configure_pending = false;
        self.perform_nc_calc()
    }

    pub fn handle_property_notify(&mut self, atom: Atom) -> Result<()> {
        if self.zombie {
            return Ok(());
        }
        let atoms = *self.display.atoms();
        if atom == atoms._NET_WM_STATE {
            self.wm_state = self
                .display
                .get_property(self.frame, atoms._NET_WM_STATE, Atom::ATOM)?
                .map(|v| v.to_atoms())
                .unwrap_or_default();
        } else if atom == atoms._NET_FRAME_EXTENTS {
            self.perform_nc_calc()?;
        }
        Ok(())
    }

    /// The window manager moved the frame into (or out of) its decoration
    /// window. Returns true when this changed how a top-level is parented.
    pub fn handle_reparent_notify(&mut self, new_parent: NativeHandle) -> Result<bool> {
        if self.zombie || self.parent.is_some() || !self.is_toplevel() {
            return Ok(false);
        }
        if new_parent == self.display.root_window() {
            self.reparented = false;
        } else {
            self.reparented = true;
            if self.opacity < 1.0 {
                self.write_opacity(new_parent)?;
            }
        }
        Ok(true)
    }
}

/// Replace an atom-list property unless the new list holds the same atoms as
/// `cached`, ignoring order. Returns whether a write was issued.
fn write_atom_list(
    display: &dyn DisplayConnection,
    window: NativeHandle,
    property: Atom,
    cached: &[Atom],
    atoms: &[Atom],
) -> Result<bool> {
    let mut new_sorted = atoms.to_vec();
    new_sorted.sort();
    let mut old_sorted = cached.to_vec();
    old_sorted.sort();
    if new_sorted == old_sorted {
        return Ok(false);
    }
    display.change_property(window, property, &PropertyValue::from_atoms(atoms))?;
    Ok(true)
}

impl fmt::Debug for NativeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeWindow")
            .field("id", &self.id)
            .field("frame", &self.frame)
            .field("client", &self.client)
            .field("bounds", &self.bounds())
            .field("mapped", &self.mapped)
            .field("visible", &self.visible)
            .field("zombie", &self.zombie)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullDisplay;

    fn setup() -> (Arc<NullDisplay>, NativeWindow) {
        let display = Arc::new(NullDisplay::new());
        let queue = Arc::new(ThreadQueue::for_current_thread());
        let window = NativeWindow::new(
            WindowId(1),
            display.clone(),
            queue,
            Arc::new(DefaultStylePolicy),
        );
        (display, window)
    }

    fn create_visible(window: &mut NativeWindow) {
        let params = CreateParams::new("test")
            .with_bounds(10, 10, 100, 100)
            .with_style(WS_VISIBLE | WS_THICKFRAME);
        window.create(&params, None, NativeHandle::NONE).unwrap();
    }

    #[test]
    fn test_create_sets_both_handles() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        assert!(!window.frame().is_none());
        assert!(!window.client().is_none());
        assert!(display.is_mapped(window.frame()));
        assert!(display.is_mapped(window.client()));
        let messages = window.take_messages();
        assert_eq!(messages[0].msg, Msg::CREATE);
        assert_eq!(messages[1].msg, Msg::SHOWWINDOW);
    }

    #[test]
    fn test_create_defaults_and_clamps() {
        let (display, mut window) = setup();
        let params = CreateParams::new("")
            .with_bounds(USE_DEFAULT, USE_DEFAULT, 0, -4)
            .with_style(WS_THICKFRAME);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        assert_eq!(window.bounds(), Rect::new(50, 50, 1, 1));
        // No explicit position, no position hints
        assert_eq!(
            display.calls().writes_of(window.frame(), Atom::WM_NORMAL_HINTS),
            0
        );
    }

    #[test]
    fn test_create_explicit_position_hints() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let hints = display
            .property(window.frame(), Atom::WM_NORMAL_HINTS)
            .map(|p| SizeHints::from_property(&p))
            .unwrap();
        assert_eq!(
            hints.flags & (size_hints::US_POSITION | size_hints::P_POSITION),
            size_hints::US_POSITION | size_hints::P_POSITION
        );
        assert_eq!((hints.x, hints.y), (10, 10));
    }

    #[test]
    fn test_child_without_parent_uses_foster() {
        let (display, mut window) = setup();
        let params = CreateParams::new("").with_style(WS_CHILD);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        let calls = display.calls();
        assert_eq!(calls.created[0].1.parent, display.foster_parent());
        assert_eq!(window.bounds().x, 0);
    }

    #[test]
    fn test_caption_less_popup_overrides_redirect() {
        let (display, mut window) = setup();
        let params = CreateParams::new("").with_style(WS_POPUP);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        assert!(display.calls().created[0].1.override_redirect);
    }

    #[test]
    #[should_panic(expected = "created twice")]
    fn test_double_create_panics() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        create_visible(&mut window);
    }

    #[test]
    fn test_client_failure_destroys_frame() {
        let (display, mut window) = setup();
        display.fail_create_after(1);
        let err = window
            .create(&CreateParams::new(""), None, NativeHandle::NONE)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CreateFailed {
                stage: CreateStage::Client
            }
        ));
        let calls = display.calls();
        assert_eq!(calls.destroyed, vec![calls.created[0].0]);
        assert!(window.frame().is_none());
        window.destroy().unwrap();
    }

    #[test]
    fn test_destroy_idempotent() {
        let (display, mut window) = setup();
        window.destroy().unwrap();
        create_visible(&mut window);
        let frame = window.frame();
        window.destroy().unwrap();
        window.destroy().unwrap();
        assert_eq!(display.calls().destroyed, vec![frame]);
        assert!(window.is_zombie());
    }

    #[test]
    fn test_invalidate_enqueues_once() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.invalidate(Rect::new(0, 0, 10, 10), false);
        window.invalidate(Rect::new(5, 5, 10, 10), false);
        assert_eq!(window.queue().paint_count(), 1);
        let invalid = window.paint_state().invalid(true);
        assert!(invalid.contains_rect(&Rect::new(0, 0, 15, 15)));
    }

    #[test]
    fn test_expose_outside_rejected() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.add_expose(true, 200, 200, 10, 10);
        assert_eq!(window.queue().paint_count(), 0);
        window.add_expose(true, 95, 95, 10, 10);
        assert_eq!(window.paint_state().invalid(true), Rect::new(95, 95, 5, 5));
    }

    #[test]
    fn test_update_sends_paint_directly() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.take_messages();
        window.update();
        assert!(window.take_messages().is_empty());

        window.invalidate(Rect::EMPTY, true);
        window.update();
        let messages = window.take_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].msg, Msg::PAINT);
    }

    #[test]
    fn test_update_takes_window_off_paint_list() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.invalidate(Rect::new(0, 0, 10, 10), false);
        assert_eq!(window.queue().paint_count(), 1);

        window.update();
        assert_eq!(window.queue().paint_count(), 0);
        assert!(!window.paint_state().expose_pending());
        // The region is still there for the handler
        assert_eq!(window.begin_paint(true), Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_update_keeps_owed_frame_paint() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.invalidate(Rect::new(0, 0, 10, 10), false);
        window.invalidate_nc();
        window.update();
        assert_eq!(window.queue().paint_count(), 1);
        assert!(window.paint_state().nc_expose_pending());
    }

    #[test]
    fn test_begin_paint_clears_entry() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.invalidate(Rect::new(1, 2, 3, 4), false);
        assert_eq!(window.begin_paint(true), Rect::new(1, 2, 3, 4));
        assert_eq!(window.queue().paint_count(), 0);
    }

    #[test]
    fn test_same_geometry_skips_move_resize() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        display.clear_calls();
        window.set_position(10, 10, 100, 100).unwrap();
        assert_eq!(display.calls().configures_of(window.frame()), 0);
        assert_eq!(window.bounds(), Rect::new(10, 10, 100, 100));
    }

    #[test]
    fn test_zero_size_unmaps_then_remaps() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        display.clear_calls();

        window.set_position(10, 10, 0, 100).unwrap();
        assert!(window.is_zero_sized());
        assert_eq!(display.calls().unmaps_of(window.frame()), 1);
        assert!(!display.is_mapped(window.frame()));

        window.set_position(10, 10, 50, 50).unwrap();
        assert!(!window.is_zero_sized());
        assert_eq!(display.calls().maps_of(window.frame()), 1);
        assert_eq!(display.calls().configures_of(window.frame()), 1);
        assert!(display.is_mapped(window.frame()));
    }

    #[test]
    fn test_move_posts_position_changed() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        window.take_messages();
        window.set_position(20, 20, 100, 100).unwrap();
        let messages = window.take_messages();
        assert!(messages.iter().any(|m| m.msg == Msg::WINDOWPOSCHANGED));
        // NC recalculation repaints the frame
        assert!(window.paint_state().nc_expose_pending());
    }

    #[test]
    fn test_wm_state_write_suppressed_for_same_set() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        let a = atoms._NET_WM_STATE_ABOVE;
        let b = atoms._NET_WM_STATE_MODAL;
        display.clear_calls();

        window.set_wm_state(&[a, b]).unwrap();
        window.set_wm_state(&[b, a]).unwrap();
        assert_eq!(
            display.calls().writes_of(window.frame(), atoms._NET_WM_STATE),
            1
        );
        assert_eq!(window.wm_state(), &[b, a]);
    }

    #[test]
    fn test_window_type_write_suppressed() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        display.clear_calls();
        window
            .set_window_type(&[atoms._NET_WM_WINDOW_TYPE_NORMAL])
            .unwrap();
        assert_eq!(
            display
                .calls()
                .writes_of(window.frame(), atoms._NET_WM_WINDOW_TYPE),
            0
        );
    }

    #[test]
    fn test_maximize_twice_sends_once() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        display.clear_calls();

        window.set_window_state(WindowState::Maximized).unwrap();
        window.set_window_state(WindowState::Maximized).unwrap();
        let calls = display.calls();
        let requests = calls.messages_of(atoms._NET_WM_STATE);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].data[0], NET_WM_STATE_ADD);
        assert_eq!(window.window_state().unwrap(), WindowState::Maximized);
    }

    #[test]
    fn test_minimize_then_restore() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();

        window.set_window_state(WindowState::Maximized).unwrap();
        window.set_window_state(WindowState::Minimized).unwrap();
        assert_eq!(window.window_state().unwrap(), WindowState::Minimized);
        // Leaving maximized toggles both axes off first
        let calls = display.calls();
        let toggles = calls.messages_of(atoms._NET_WM_STATE);
        assert_eq!(toggles.last().unwrap().data[0], NET_WM_STATE_TOGGLE);

        display.clear_calls();
        window.set_window_state(WindowState::Normal).unwrap();
        assert_eq!(display.calls().maps_of(window.frame()), 1);
        assert_eq!(window.window_state().unwrap(), WindowState::Normal);
        assert_eq!(display.active_window(), window.frame());
    }

    #[test]
    fn test_unmapped_state_unknown() {
        let (_display, mut window) = setup();
        window
            .create(&CreateParams::new(""), None, NativeHandle::NONE)
            .unwrap();
        assert_eq!(window.window_state().unwrap(), WindowState::Unknown);
    }

    #[test]
    fn test_initial_minimize() {
        let (display, mut window) = setup();
        let params = CreateParams::new("").with_style(WS_VISIBLE | WS_MINIMIZE);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        let atoms = *display.atoms();
        assert_eq!(display.calls().messages_of(atoms.WM_CHANGE_STATE).len(), 1);
        let hints = display.property(window.frame(), Atom::WM_HINTS).unwrap();
        assert_eq!(hints.to_u32s()[2], wm_hints::ICONIC_STATE);
    }

    #[test]
    fn test_text_dual_write() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        display.clear_calls();

        window.set_text(Some("caf\u{e9} \u{263a}")).unwrap();
        let net = display.property(window.frame(), atoms._NET_WM_NAME).unwrap();
        assert_eq!(net.data, "caf\u{e9} \u{263a}".as_bytes());
        let legacy = display.property(window.frame(), Atom::WM_NAME).unwrap();
        assert_eq!(legacy.data, b"caf\xe9 ?");

        window.set_text(Some("caf\u{e9} \u{263a}")).unwrap();
        assert_eq!(display.calls().property_writes.len(), 2);
    }

    #[test]
    fn test_none_text_is_empty() {
        let (display, mut window) = setup();
        window
            .create(&CreateParams::new(""), None, NativeHandle::NONE)
            .unwrap();
        display.clear_calls();
        window.set_text(None).unwrap();
        assert!(display.calls().property_writes.is_empty());
    }

    #[test]
    fn test_tool_window_styles() {
        let (display, mut window) = setup();
        let owner = NativeHandle(0x1234);
        let params = CreateParams::new("tools")
            .with_style(WS_CAPTION)
            .with_ex_style(WS_EX_TOOLWINDOW | WS_EX_CONTEXTHELP);
        window.create(&params, None, owner).unwrap();
        let atoms = *display.atoms();

        assert_eq!(window.window_type(), &[atoms._NET_WM_WINDOW_TYPE_UTILITY]);
        let transient = display
            .property(window.frame(), Atom::WM_TRANSIENT_FOR)
            .unwrap();
        assert_eq!(transient.to_u32s(), vec![owner.get()]);
        let protocols = display
            .property(window.frame(), atoms.WM_PROTOCOLS)
            .unwrap();
        assert_eq!(
            protocols.to_atoms(),
            vec![atoms.WM_DELETE_WINDOW, atoms._NET_WM_CONTEXT_HELP]
        );
        assert!(display.calls().created[0].1.save_under);
    }

    #[test]
    fn test_app_window_not_skipped_from_taskbar() {
        let (display, mut window) = setup();
        let params = CreateParams::new("").with_ex_style(WS_EX_APPWINDOW);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        assert!(window.wm_state().is_empty());
        let atoms = *display.atoms();
        assert!(display.property(window.frame(), atoms._NET_WM_STATE).is_none());
    }

    #[test]
    fn test_style_change_keeps_maximized() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        window.set_window_state(WindowState::Maximized).unwrap();
        window.set_styles(WS_VISIBLE | WS_CAPTION, 0).unwrap();
        assert!(window
            .wm_state()
            .contains(&atoms._NET_WM_STATE_MAXIMIZED_HORZ));
        assert_eq!(window.window_state().unwrap(), WindowState::Maximized);
    }

    #[test]
    fn test_min_max_hints() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        window
            .set_min_max(Rect::new(0, 0, 800, 600), Some((10, 10)), Some((400, 300)))
            .unwrap();
        let hints = display.calls();
        let normal = display
            .property(window.frame(), Atom::WM_NORMAL_HINTS)
            .map(|p| SizeHints::from_property(&p))
            .unwrap();
        assert_eq!(
            (normal.min_width, normal.min_height),
            MINIMUM_WINDOW_SIZE
        );
        assert_eq!((normal.max_width, normal.max_height), (400, 300));
        // Position bits from creation survive the merge
        assert_ne!(normal.flags & size_hints::P_POSITION, 0);
        assert_eq!(hints.writes_of(window.frame(), Atom::WM_ZOOM_HINTS), 1);
    }

    #[test]
    fn test_fixed_size_pins_min_max() {
        let (display, mut window) = setup();
        let params = CreateParams::new("").with_bounds(10, 10, 200, 150);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        assert!(window.is_fixed_size());

        window.set_position(10, 10, 300, 200).unwrap();
        let normal = display
            .property(window.frame(), Atom::WM_NORMAL_HINTS)
            .map(|p| SizeHints::from_property(&p))
            .unwrap();
        assert_eq!((normal.min_width, normal.min_height), (300, 200));
        assert_eq!((normal.max_width, normal.max_height), (300, 200));
    }

    #[test]
    fn test_frame_extents_missing_is_zero() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        assert!(window.frame_extents().unwrap().is_zero());

        let atoms = *display.atoms();
        display.wm_set_property(
            window.frame(),
            atoms._NET_FRAME_EXTENTS,
            PropertyValue::from_u32s(Atom::CARDINAL, &[2, 2, 20, 2]),
        );
        let extents = window.frame_extents().unwrap();
        assert_eq!((extents.left, extents.top), (2, 20));
        assert_eq!(window.toplevel_location().unwrap(), (8, -10));
    }

    #[test]
    fn test_configure_notify_enqueued_once() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        let event = |w| NativeEvent::Configure {
            window: window.frame(),
            x: 0,
            y: 0,
            width: w,
            height: 80,
            synthetic: false,
        };
        let first = event(120);
        let second = event(140);
        assert!(window.handle_configure_notify(&first).unwrap());
        assert!(window.handle_configure_notify(&second).unwrap());
        assert_eq!(window.queue().event_count(), 1);
        assert_eq!(window.bounds().width, 140);
        assert_eq!(window.client_rect(), Rect::EMPTY);

        window.configure_dispatched().unwrap();
        assert!(!window.configure_pending());
        assert_eq!(window.client_rect(), Rect::new(0, 0, 140, 80));
    }

    #[test]
    fn test_configure_for_client_ignored() {
        let (_display, mut window) = setup();
        create_visible(&mut window);
        let event = NativeEvent::Configure {
            window: window.client(),
            x: 0,
            y: 0,
            width: 5,
            height: 5,
            synthetic: false,
        };
        assert!(!window.handle_configure_notify(&event).unwrap());
        assert_eq!(window.queue().event_count(), 0);
    }

    #[test]
    fn test_property_notify_resyncs_state() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        display.wm_set_property(
            window.frame(),
            atoms._NET_WM_STATE,
            PropertyValue::from_atoms(&[atoms._NET_WM_STATE_ABOVE]),
        );
        window.handle_property_notify(atoms._NET_WM_STATE).unwrap();
        assert_eq!(window.wm_state(), &[atoms._NET_WM_STATE_ABOVE]);
    }

    #[test]
    fn test_opacity_follows_reparent() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();

        window.set_opacity(0.5).unwrap();
        assert!(display
            .property(window.frame(), atoms._NET_WM_WINDOW_OPACITY)
            .is_some());

        let wm_frame = display.wm_create_window(display.root_window(), 0, 0);
        display.wm_reparent(window.frame(), wm_frame);
        assert!(window.handle_reparent_notify(wm_frame).unwrap());
        assert!(window.is_reparented());
        assert!(display
            .property(wm_frame, atoms._NET_WM_WINDOW_OPACITY)
            .is_some());

        window.set_opacity(1.0).unwrap();
        assert!(display
            .property(window.frame(), atoms._NET_WM_WINDOW_OPACITY)
            .is_none());
    }

    #[test]
    fn test_icon_written_and_cleared() {
        let (display, mut window) = setup();
        create_visible(&mut window);
        let atoms = *display.atoms();
        let icon = Icon {
            width: 1,
            height: 1,
            argb: vec![0xff00_ff00],
        };
        window.set_icon(Some(&icon)).unwrap();
        let value = display.property(window.frame(), atoms._NET_WM_ICON).unwrap();
        assert_eq!(value.to_u32s(), vec![1, 1, 0xff00_ff00]);
        window.set_icon(None).unwrap();
        assert!(display.property(window.frame(), atoms._NET_WM_ICON).is_none());
    }

    #[test]
    fn test_topmost_creation() {
        let (display, mut window) = setup();
        let params = CreateParams::new("")
            .with_style(WS_VISIBLE)
            .with_ex_style(WS_EX_TOPMOST);
        window.create(&params, None, NativeHandle::NONE).unwrap();
        let calls = display.calls();
        assert_eq!(calls.raised_maps, vec![window.frame()]);
        let transient = display
            .property(window.frame(), Atom::WM_TRANSIENT_FOR)
            .unwrap();
        assert_eq!(transient.to_u32s(), vec![display.root_window().get()]);
    }

    #[test]
    fn test_operations_before_create() {
        let (_display, mut window) = setup();
        assert!(matches!(
            window.set_position(0, 0, 10, 10),
            Err(Error::NotCreated)
        ));
        assert!(matches!(window.window_state(), Err(Error::NotCreated)));
    }
}
