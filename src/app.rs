use eframe::egui;
use std::path::Path;
use std::time::Duration;

use crate::annotator::{Annotator, DragState, PlacementRequest};
use crate::config::{PlacementMode, WidgetConfig};
use crate::legend::render_legend;
use crate::model::Color4;
use crate::upload::{BackgroundLoader, UploadSource};

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "ico", "tga", "qoi",
];

// ── App ─────────────────────────────────────────────────────────────────────

pub struct PlotApp {
    annotator: Annotator,
    loader: BackgroundLoader,
    config: WidgetConfig,
    texture: Option<(u64, egui::TextureHandle)>,

    // controls
    selected_category: String,
    size: f32,
    use_custom_color: bool,
    custom_color: [f32; 3],
    new_category_name: String,
    new_category_color: [f32; 3],

    status: Option<String>,
}

impl PlotApp {
    pub fn new(annotator: Annotator, config: WidgetConfig) -> Self {
        let selected_category = annotator
            .registry()
            .names()
            .next()
            .unwrap_or_default()
            .to_string();
        let size = annotator
            .registry()
            .get(&selected_category)
            .map(|c| c.size)
            .unwrap_or(config.default_size);
        Self {
            annotator,
            loader: BackgroundLoader::new(),
            size: config.clamp_size(size),
            config,
            texture: None,
            selected_category,
            use_custom_color: false,
            custom_color: [1.0, 0.0, 0.0],
            new_category_name: String::new(),
            new_category_color: [0.0, 1.0, 1.0],
            status: None,
        }
    }

    pub fn open_path(&mut self, path: &Path) {
        match UploadSource::from_path(path) {
            Ok(source) => self.request_upload(source),
            Err(e) => self.reject(format!("{e:#}")),
        }
    }

    fn open_dropped(&mut self, file: &egui::DroppedFile) {
        if let Some(path) = &file.path {
            self.open_path(path);
        } else if let Some(bytes) = &file.bytes {
            match UploadSource::from_bytes(&file.name, &file.mime, bytes.clone()) {
                Ok(source) => self.request_upload(source),
                Err(e) => self.reject(format!("{e:#}")),
            }
        }
    }

    fn request_upload(&mut self, source: UploadSource) {
        let ticket = self.annotator.begin_upload();
        self.status = Some(format!("Loading {}…", source.name));
        self.loader.request(ticket, source);
    }

    fn poll_uploads(&mut self, ctx: &egui::Context) {
        for (ticket, result) in self.loader.poll() {
            match result {
                Ok(image) => {
                    if self.annotator.finish_upload(ticket, image) {
                        self.status = None;
                    }
                }
                Err(e) if self.annotator.is_current(ticket) => self.reject(format!("{e:#}")),
                Err(e) => log::debug!(
                    "ignoring failed decode from superseded upload {}: {e:#}",
                    ticket.generation()
                ),
            }
        }
        if self.loader.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(30));
        }
    }

    /// Rejections never interrupt the widget; they only show up here and in the log.
    fn reject(&mut self, message: String) {
        log::warn!("{message}");
        self.status = Some(message);
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(bg) = self.annotator.background() else {
            self.texture = None;
            return;
        };
        if matches!(&self.texture, Some((generation, _)) if *generation == bg.generation) {
            return;
        }
        let color_image = egui::ColorImage::from_rgba_unmultiplied(bg.image.size, &bg.image.rgba);
        let handle = ctx.load_texture("background", color_image, egui::TextureOptions::LINEAR);
        self.texture = Some((bg.generation, handle));
    }

    fn place_at(&mut self, pos: egui::Pos2, bounds: egui::Vec2) {
        let color = (self.annotator.allows_color_override() && self.use_custom_color)
            .then(|| Color4::from_rgb(self.custom_color));
        let req = PlacementRequest {
            pos,
            category: self.selected_category.clone(),
            size: Some(self.size),
            color,
        };
        if self.annotator.place_marker(req, bounds).is_none() {
            self.reject(format!("No category named '{}'", self.selected_category));
        }
    }

    fn add_category(&mut self) {
        let name = self.new_category_name.trim().to_string();
        let color = Color4::from_rgb(self.new_category_color);
        match self.annotator.register_category(&name, color, self.size) {
            Ok(()) => {
                self.new_category_name.clear();
                self.status = None;
            }
            Err(e) => self.reject(format!("Cannot add category: {e}")),
        }
    }

    fn select_category(&mut self, name: String) {
        if let Some(cat) = self.annotator.registry().get(&name) {
            self.size = self.config.clamp_size(cat.size);
        }
        self.selected_category = name;
    }

    fn draw_markers(&self, painter: &egui::Painter, container: egui::Rect) {
        let dragged = self.annotator.dragged_marker();
        for m in self.annotator.markers() {
            let rect = m.screen_rect(container);
            let radius = m.diameter * 0.5;
            painter.circle_filled(rect.center(), radius, m.color.to_egui());
            painter.circle_stroke(
                rect.center(),
                radius,
                egui::Stroke::new(1.0, egui::Color32::from_black_alpha(160)),
            );
            if dragged == Some(m.id) {
                painter.circle_stroke(
                    rect.center(),
                    radius + 3.0,
                    egui::Stroke::new(1.5, egui::Color32::from_rgb(0, 120, 255)),
                );
            }
        }
    }
}

/// Largest rect with the image's aspect ratio that fits in `container`.
fn fit_rect(image_size: egui::Vec2, container: egui::Rect) -> egui::Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return container;
    }
    let scale = (container.width() / image_size.x).min(container.height() / image_size.y);
    egui::Rect::from_center_size(container.center(), image_size * scale)
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for PlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(file) = dropped.first() {
            self.open_dropped(file);
        }
        self.poll_uploads(ctx);
        self.ensure_texture(ctx);

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Escape)
                && matches!(self.annotator.drag(), DragState::Dragging { .. })
            {
                log::debug!("drag cancelled");
                self.annotator.end_drag();
            }
        });

        let legend = render_legend(self.annotator.registry());
        let mut add_random = false;

        // Top toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open image…").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("images", IMAGE_EXTENSIONS)
                        .pick_file()
                    {
                        self.open_path(&path);
                    }
                }
                ui.separator();

                ui.label("Category:");
                let selected_label = legend
                    .iter()
                    .find(|e| e.key == self.selected_category)
                    .map(|e| e.label.clone())
                    .unwrap_or_default();
                let mut picked = None;
                egui::ComboBox::from_id_salt("category")
                    .selected_text(selected_label)
                    .show_ui(ui, |ui| {
                        for entry in &legend {
                            let selected = entry.key == self.selected_category;
                            if ui.selectable_label(selected, &entry.label).clicked() {
                                picked = Some(entry.key.clone());
                            }
                        }
                    });
                if let Some(name) = picked {
                    self.select_category(name);
                }

                ui.separator();
                ui.label("Size:");
                ui.add(egui::Slider::new(
                    &mut self.size,
                    self.config.min_size..=self.config.max_size,
                ));

                if self.annotator.allows_color_override() {
                    ui.separator();
                    ui.checkbox(&mut self.use_custom_color, "Custom color");
                    if self.use_custom_color {
                        ui.color_edit_button_rgb(&mut self.custom_color);
                    }
                }

                ui.separator();
                if ui.button("Add marker").clicked() {
                    add_random = true;
                }
                if ui.button("Clear map").clicked() {
                    self.annotator.clear_all();
                }
            });
            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::from_rgb(230, 160, 40), status);
            }
        });

        // Legend and category management
        let mut clear_category = None;
        egui::SidePanel::right("legend")
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("Legend");
                for entry in &legend {
                    ui.horizontal(|ui| {
                        let (swatch, _) =
                            ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                        ui.painter().rect_filled(swatch, 0.0, entry.swatch.to_egui());
                        ui.label(&entry.label);
                        if ui.small_button("Clear").clicked() {
                            clear_category = Some(entry.key.clone());
                        }
                    });
                }
                ui.separator();

                ui.label("New category");
                let name_edit = ui.text_edit_singleline(&mut self.new_category_name);
                let submitted =
                    name_edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut self.new_category_color);
                    if ui.button("Add").clicked() || submitted {
                        self.add_category();
                    }
                });
                ui.separator();
                ui.label(format!("{} markers", self.annotator.markers().len()));
            });
        if let Some(category) = clear_category {
            self.annotator.clear_category(&category);
        }

        // Canvas
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let container = response.rect;

            painter.rect_filled(container, 0.0, egui::Color32::from_gray(40));
            if let Some((_, tex)) = &self.texture {
                painter.image(
                    tex.id(),
                    fit_rect(tex.size_vec2(), container),
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            } else {
                painter.text(
                    container.center(),
                    egui::Align2::CENTER_CENTER,
                    "Open or drop an image",
                    egui::FontId::proportional(18.0),
                    egui::Color32::from_gray(140),
                );
            }
            self.draw_markers(&painter, container);

            if add_random {
                let pos = self.annotator.scatter_position(container.size());
                self.place_at(pos, container.size());
            }

            // Touch input arrives as pointer events too.
            if response.drag_started_by(egui::PointerButton::Primary) {
                let grab = ctx
                    .input(|i| i.pointer.press_origin())
                    .or(response.interact_pointer_pos());
                if let Some(pos) = grab {
                    if let Some(id) = self.annotator.marker_at(container, pos) {
                        self.annotator.begin_drag(id, pos, container);
                    }
                }
            }

            if response.dragged_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.annotator.update_drag(pos, container);
                }
            }

            if response.drag_stopped() || !ctx.input(|i| i.pointer.any_down()) {
                self.annotator.end_drag();
            }

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    if self.annotator.marker_at(container, pos).is_none() {
                        let local = match self.config.placement {
                            PlacementMode::Pointer => {
                                (pos - container.min - egui::Vec2::splat(self.size * 0.5))
                                    .to_pos2()
                            }
                            PlacementMode::Random => {
                                self.annotator.scatter_position(container.size())
                            }
                        };
                        self.place_at(local, container.size());
                    }
                }
            }
        });
    }
}
