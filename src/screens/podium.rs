use eframe::egui;

use crate::models::RankedAdmin;
use crate::screens::avatar::{AvatarTextures, draw_avatar};
use crate::services::leaderboard::{RankBadge, format_points, place_label};

pub const GOLD: egui::Color32 = egui::Color32::from_rgb(212, 175, 55);
pub const SILVER: egui::Color32 = egui::Color32::from_rgb(192, 192, 192);
pub const BRONZE: egui::Color32 = egui::Color32::from_rgb(205, 127, 50);

pub fn badge_color(badge: RankBadge) -> Option<egui::Color32> {
    match badge {
        RankBadge::Gold => Some(GOLD),
        RankBadge::Silver => Some(SILVER),
        RankBadge::Bronze => Some(BRONZE),
        RankBadge::Plain(_) => None,
    }
}

/// Rank cell of the ranking table.
pub fn rank_badge(ui: &mut egui::Ui, rank: usize) {
    let badge = RankBadge::for_rank(rank);
    match badge_color(badge) {
        Some(color) => {
            let icon = if badge == RankBadge::Gold { "🏆" } else { "🏅" };
            egui::Frame::new()
                .fill(color.gamma_multiply(0.2))
                .stroke(egui::Stroke::new(1.0, color.gamma_multiply(0.6)))
                .corner_radius(egui::CornerRadius::same(8))
                .inner_margin(egui::Margin::symmetric(8, 2))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(format!("{icon} {}", badge.label()))
                            .color(color)
                            .strong(),
                    );
                });
        }
        None => {
            ui.label(
                egui::RichText::new(badge.label())
                    .color(ui.visuals().weak_text_color())
                    .strong(),
            );
        }
    }
}

pub fn podium_card(ui: &mut egui::Ui, entry: &RankedAdmin, avatars: &AvatarTextures) {
    let color = badge_color(RankBadge::for_rank(entry.rank)).unwrap_or(SILVER);
    let is_winner = entry.rank == 1;
    if !is_winner {
        ui.add_space(28.0);
    }

    egui::Frame::group(ui.style())
        .fill(color.gamma_multiply(0.12))
        .stroke(egui::Stroke::new(if is_winner { 3.0 } else { 2.0 }, color.gamma_multiply(0.5)))
        .corner_radius(egui::CornerRadius::same(14))
        .inner_margin(egui::Margin::same(16))
        .show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("👑").size(if is_winner { 40.0 } else { 30.0 }).color(color));
                ui.add_space(6.0);
                let diameter = if is_winner { 108.0 } else { 92.0 };
                draw_avatar(
                    ui,
                    avatars,
                    entry.admin.avatar(),
                    &entry.admin.display_initials(),
                    diameter,
                    color,
                );
                ui.add_space(8.0);
                ui.label(egui::RichText::new(&entry.admin.name).size(22.0).strong());
                ui.label(egui::RichText::new(place_label(entry.rank)).color(color).strong());
                ui.add_space(6.0);
                ui.label(
                    egui::RichText::new(format_points(entry.admin.total_points))
                        .size(if is_winner { 44.0 } else { 36.0 })
                        .color(color)
                        .strong(),
                );
                ui.label(egui::RichText::new("points").weak());
                ui.add_space(4.0);
                let bar_width = match entry.rank {
                    1 => 80.0,
                    2 => 64.0,
                    _ => 48.0,
                };
                let (bar, _) = ui.allocate_exact_size(egui::vec2(bar_width, 4.0), egui::Sense::hover());
                ui.painter().rect_filled(bar, 2.0, color);
            });
        });
}
