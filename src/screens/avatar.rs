use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{Receiver, TryRecvError};

use eframe::egui;
use tracing::{debug, info, warn};

use crate::services::avatar_cache::{AvatarEvent, DecodedImageData, spawn_avatar_decode};

/// Avatar textures keyed by URL. `None` marks an avatar that failed to load.
pub struct AvatarTextures {
    max_dimension: u32,
    textures: HashMap<String, Option<egui::TextureHandle>>,
    requested: HashSet<String>,
    queued: Vec<String>,
    decode_rx: Option<Receiver<AvatarEvent>>,
}

impl AvatarTextures {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(16),
            textures: HashMap::new(),
            requested: HashSet::new(),
            queued: Vec::new(),
            decode_rx: None,
        }
    }

    pub fn request<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) {
        for url in urls {
            if self.requested.insert(url.to_string()) {
                self.queued.push(url.to_string());
            }
        }
        self.start_queued();
    }

    fn start_queued(&mut self) {
        if self.decode_rx.is_some() || self.queued.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.queued);
        info!("Starting avatar decode for {} image(s)", batch.len());
        self.decode_rx = Some(spawn_avatar_decode(batch, self.max_dimension));
    }

    /// Uploads finished decodes. Returns true while work is still in flight.
    pub fn pump(&mut self, ctx: &egui::Context) -> bool {
        let Some(rx) = self.decode_rx.as_ref() else {
            return false;
        };

        loop {
            match rx.try_recv() {
                Ok(AvatarEvent::Decoded { url, image }) => {
                    let texture = image
                        .as_ref()
                        .map(|image| load_texture_from_decoded(ctx, &format!("avatar_{url}"), image));
                    self.textures.insert(url, texture);
                }
                Ok(AvatarEvent::Finished { ok, miss }) => {
                    debug!("Avatar batch done: ok={ok}, miss={miss}");
                    self.decode_rx = None;
                    break;
                }
                Ok(AvatarEvent::Failed { message }) => {
                    warn!("Avatar decode failed: {message}");
                    self.decode_rx = None;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Avatar decode channel closed");
                    self.decode_rx = None;
                    break;
                }
            }
        }

        self.start_queued();
        self.decode_rx.is_some()
    }

    pub fn get(&self, url: &str) -> Option<&egui::TextureHandle> {
        self.textures.get(url).and_then(Option::as_ref)
    }
}

fn load_texture_from_decoded(
    ctx: &egui::Context,
    texture_id: &str,
    image: &DecodedImageData,
) -> egui::TextureHandle {
    let color_image =
        egui::ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.rgba);
    ctx.load_texture(
        texture_id.to_string(),
        color_image,
        egui::TextureOptions::LINEAR,
    )
}

/// Round avatar: the decoded image when available, initials otherwise.
pub fn draw_avatar(
    ui: &mut egui::Ui,
    avatars: &AvatarTextures,
    url: Option<&str>,
    initials: &str,
    diameter: f32,
    ring: egui::Color32,
) -> egui::Response {
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(diameter, diameter), egui::Sense::hover());
    let radius = diameter * 0.5;

    if let Some(texture) = url.and_then(|url| avatars.get(url)) {
        let image = egui::Image::new(texture)
            .fit_to_exact_size(rect.size())
            .corner_radius(egui::CornerRadius::same(radius as u8));
        ui.put(rect, image);
    } else {
        ui.painter()
            .circle_filled(rect.center(), radius, ring.gamma_multiply(0.25));
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            initials,
            egui::FontId::proportional(diameter * 0.36),
            ui.visuals().strong_text_color(),
        );
    }
    ui.painter().circle_stroke(
        rect.center(),
        radius,
        egui::Stroke::new((diameter * 0.04).max(1.5), ring),
    );

    response
}
