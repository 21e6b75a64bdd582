use eframe::egui;

use crate::model::{Category, CategoryRegistry, Color4, Marker, MarkerId, RegisterError};
use crate::upload::{DecodedImage, UploadTicket};

// ── Interaction State ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        marker: MarkerId,
        /// Pointer position relative to the marker's top-left at grab time.
        grab_offset: egui::Vec2,
    },
}

/// Everything the UI knows when the user asks for a marker.
#[derive(Clone, Debug)]
pub struct PlacementRequest {
    pub pos: egui::Pos2,
    pub category: String,
    /// Overrides the category's default diameter.
    pub size: Option<f32>,
    /// Only honoured when the annotator allows color overrides.
    pub color: Option<Color4>,
}

pub struct Background {
    pub image: DecodedImage,
    pub generation: u64,
}

// ── Annotator ───────────────────────────────────────────────────────────────

pub struct Annotator {
    background: Option<Background>,
    markers: Vec<Marker>,
    registry: CategoryRegistry,
    drag: DragState,
    allow_color_override: bool,
    next_marker_id: MarkerId,
    upload_generation: u64,
    scatter_counter: u32,
}

impl Annotator {
    pub fn new(registry: CategoryRegistry, allow_color_override: bool) -> Self {
        Self {
            background: None,
            markers: Vec::new(),
            registry,
            drag: DragState::Idle,
            allow_color_override,
            next_marker_id: 1,
            upload_generation: 0,
            scatter_counter: 0,
        }
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn allows_color_override(&self) -> bool {
        self.allow_color_override
    }

    pub fn dragged_marker(&self) -> Option<MarkerId> {
        match self.drag {
            DragState::Dragging { marker, .. } => Some(marker),
            DragState::Idle => None,
        }
    }

    // ── Background upload ───────────────────────────────────────────────────

    pub fn begin_upload(&mut self) -> UploadTicket {
        self.upload_generation += 1;
        UploadTicket(self.upload_generation)
    }

    /// Whether `ticket` belongs to the newest upload request.
    pub fn is_current(&self, ticket: UploadTicket) -> bool {
        ticket.0 == self.upload_generation
    }

    /// Installs a decoded background if `ticket` is the newest request.
    /// Replacing the background discards every marker.
    pub fn finish_upload(&mut self, ticket: UploadTicket, image: DecodedImage) -> bool {
        if !self.is_current(ticket) {
            log::debug!(
                "dropping stale decode of {} (generation {}, latest {})",
                image.name,
                ticket.0,
                self.upload_generation
            );
            return false;
        }
        log::info!(
            "background set to {} ({}x{}), {} markers cleared",
            image.name,
            image.size[0],
            image.size[1],
            self.markers.len()
        );
        self.markers.clear();
        self.drag = DragState::Idle;
        self.background = Some(Background {
            image,
            generation: ticket.0,
        });
        true
    }

    // ── Placement ───────────────────────────────────────────────────────────

    /// Resolves size and color from the request and registry and appends a
    /// marker, clamped into `bounds`. Unknown categories place nothing.
    pub fn place_marker(&mut self, req: PlacementRequest, bounds: egui::Vec2) -> Option<MarkerId> {
        let Some(category) = self.registry.get(&req.category) else {
            log::warn!("cannot place marker: unknown category '{}'", req.category);
            return None;
        };
        let diameter = req.size.unwrap_or(category.size).max(1.0);
        let color = match req.color {
            Some(c) if self.allow_color_override => c,
            _ => category.color,
        };

        let id = self.next_marker_id;
        self.next_marker_id += 1;
        self.markers.push(Marker {
            id,
            category: req.category,
            pos: clamp_to(req.pos, bounds),
            diameter,
            color,
        });
        log::debug!("placed marker {id} at {:?}", req.pos);
        Some(id)
    }

    /// A scattered position inside `bounds`, different on every call.
    pub fn scatter_position(&mut self, bounds: egui::Vec2) -> egui::Pos2 {
        self.scatter_counter = self.scatter_counter.wrapping_add(1);
        let n = self.scatter_counter;
        let fx = scatter_hash(n, 0x9e37_79b9) as f32 / u32::MAX as f32;
        let fy = scatter_hash(n, 0x85eb_ca6b) as f32 / u32::MAX as f32;
        egui::pos2(fx * bounds.x.max(0.0), fy * bounds.y.max(0.0))
    }

    /// Topmost marker under `screen_pos`.
    pub fn marker_at(&self, container: egui::Rect, screen_pos: egui::Pos2) -> Option<MarkerId> {
        self.markers
            .iter()
            .rev()
            .find(|m| m.contains(container, screen_pos))
            .map(|m| m.id)
    }

    // ── Dragging ────────────────────────────────────────────────────────────

    pub fn begin_drag(
        &mut self,
        marker: MarkerId,
        pointer: egui::Pos2,
        container: egui::Rect,
    ) -> bool {
        let Some(m) = self.markers.iter().find(|m| m.id == marker) else {
            return false;
        };
        let grab_offset = pointer - m.screen_rect(container).min;
        self.drag = DragState::Dragging {
            marker,
            grab_offset,
        };
        true
    }

    /// Moves the dragged marker so the grab point follows the pointer.
    /// Depends only on the current pointer, never on earlier moves.
    pub fn update_drag(&mut self, pointer: egui::Pos2, container: egui::Rect) -> Option<egui::Pos2> {
        let DragState::Dragging {
            marker,
            grab_offset,
        } = self.drag
        else {
            return None;
        };
        let Some(m) = self.markers.iter_mut().find(|m| m.id == marker) else {
            self.drag = DragState::Idle;
            return None;
        };
        let local = (pointer - container.min - grab_offset).to_pos2();
        m.pos = clamp_to(local, container.size());
        Some(m.pos)
    }

    pub fn end_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    // ── Clearing ────────────────────────────────────────────────────────────

    pub fn clear_all(&mut self) {
        log::info!("clearing {} markers and background", self.markers.len());
        self.markers.clear();
        self.background = None;
        self.drag = DragState::Idle;
    }

    pub fn clear_category(&mut self, category: &str) -> usize {
        let before = self.markers.len();
        self.markers.retain(|m| m.category != category);
        if let Some(id) = self.dragged_marker() {
            if !self.markers.iter().any(|m| m.id == id) {
                self.drag = DragState::Idle;
            }
        }
        let removed = before - self.markers.len();
        log::info!("cleared {removed} '{category}' markers");
        removed
    }

    // ── Categories ──────────────────────────────────────────────────────────

    pub fn register_category(
        &mut self,
        name: &str,
        color: Color4,
        size: f32,
    ) -> Result<(), RegisterError> {
        self.registry.insert(name, Category { color, size })?;
        log::info!("registered category '{}'", name.trim());
        Ok(())
    }
}

fn clamp_to(pos: egui::Pos2, bounds: egui::Vec2) -> egui::Pos2 {
    egui::pos2(
        pos.x.clamp(0.0, bounds.x.max(0.0)),
        pos.y.clamp(0.0, bounds.y.max(0.0)),
    )
}

fn scatter_hash(n: u32, salt: u32) -> u32 {
    let mut h = n.wrapping_mul(374_761_393).wrapping_add(salt);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}
