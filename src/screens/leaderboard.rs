use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use chrono::{DateTime, Local};
use eframe::egui;
use tracing::{debug, info, warn};

use crate::models::{AdminUpdate, RankedAdmin};
use crate::screens::avatar::{AvatarTextures, draw_avatar};
use crate::screens::edit_admin::{self, EditAction, EditDialog};
use crate::screens::podium::{self, GOLD};
use crate::services::admin_source::{
    AdminSource, FetchEvent, UpdateEvent, spawn_admin_fetch, spawn_admin_update,
};
use crate::services::config_loader::{CompetitionConfig, LeaderboardConfig};
use crate::services::cycle::{self, CycleStatus};
use crate::services::leaderboard::{
    self, FilterMode, aggregates, filter_admins, format_points, format_points_short, rank_admins,
};

enum LoadState {
    Idle,
    Loading(Receiver<FetchEvent>),
    Loaded,
}

/// Everything the leaderboard page owns for as long as it is shown.
pub struct LeaderboardPage {
    source: Arc<AdminSource>,
    competition: CompetitionConfig,
    epoch: DateTime<Local>,
    editing_enabled: bool,
    board: Vec<RankedAdmin>,
    load: LoadState,
    search_query: String,
    filter_mode: FilterMode,
    edit_dialog: EditDialog,
    update_rx: Option<Receiver<UpdateEvent>>,
    pending_updates: VecDeque<AdminUpdate>,
    refetch_pending: bool,
    avatars: AvatarTextures,
}

impl LeaderboardPage {
    pub fn new(source: Arc<AdminSource>, config: &LeaderboardConfig) -> Self {
        Self {
            source,
            competition: config.competition.clone(),
            epoch: cycle::local_epoch(config.competition.start),
            editing_enabled: config.editing.enabled,
            board: Vec::new(),
            load: LoadState::Idle,
            search_query: String::new(),
            filter_mode: FilterMode::All,
            edit_dialog: EditDialog::default(),
            update_rx: None,
            pending_updates: VecDeque::new(),
            refetch_pending: false,
            avatars: AvatarTextures::new(config.presentation.avatar_max_dimension),
        }
    }

    /// Starts the fetch for this activation. Refused while one is already running.
    pub fn activate(&mut self) -> bool {
        if self.is_loading() {
            warn!("Fetch already in flight, ignoring activation");
            return false;
        }
        info!("Fetching admins from {}", self.source.describe());
        self.load = LoadState::Loading(spawn_admin_fetch(Arc::clone(&self.source)));
        true
    }

    pub fn needs_activation(&self) -> bool {
        matches!(self.load, LoadState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load, LoadState::Loading(_))
    }

    pub fn board(&self) -> &[RankedAdmin] {
        &self.board
    }

    pub fn visible(&self) -> Vec<&RankedAdmin> {
        filter_admins(&self.board, &self.search_query, self.filter_mode)
    }

    /// Updates run one at a time in submission order.
    pub fn submit_update(&mut self, update: AdminUpdate) {
        if self.update_rx.is_some() {
            info!(
                "Queueing update for admin {} ({} already waiting)",
                update.id,
                self.pending_updates.len()
            );
        }
        self.pending_updates.push_back(update);
        self.start_next_update();
    }

    fn start_next_update(&mut self) {
        if self.update_rx.is_some() {
            return;
        }
        if let Some(update) = self.pending_updates.pop_front() {
            self.update_rx = Some(spawn_admin_update(Arc::clone(&self.source), update));
        }
    }

    /// A fetch already in flight may predate the write, so another one follows it.
    fn refetch(&mut self) {
        if self.is_loading() {
            debug!("Fetch in flight, refreshing again once it lands");
            self.refetch_pending = true;
        } else {
            self.activate();
        }
    }

    /// Drains finished background work. Returns true while any is still running.
    pub fn pump(&mut self) -> bool {
        if let LoadState::Loading(rx) = &self.load {
            let landed = match rx.try_recv() {
                Ok(FetchEvent::Finished { admins }) => {
                    info!("Transition: Loading -> Loaded ({} admins)", admins.len());
                    self.board = rank_admins(admins);
                    true
                }
                Ok(FetchEvent::Failed { message }) => {
                    warn!("Leaderboard left unchanged after failed fetch: {message}");
                    true
                }
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Disconnected) => {
                    warn!("Fetch worker disconnected");
                    true
                }
            };
            if landed {
                self.load = LoadState::Loaded;
                if std::mem::take(&mut self.refetch_pending) {
                    self.activate();
                }
            }
        }

        if let Some(rx) = &self.update_rx {
            match rx.try_recv() {
                Ok(UpdateEvent::Finished { id }) => {
                    info!("Admin {id} saved, refreshing leaderboard");
                    self.update_rx = None;
                    self.refetch();
                    self.start_next_update();
                }
                Ok(UpdateEvent::Failed { id, message }) => {
                    warn!("Admin {id} was not saved: {message}");
                    self.update_rx = None;
                    self.start_next_update();
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    warn!("Update worker disconnected");
                    self.update_rx = None;
                    self.start_next_update();
                }
            }
        }

        self.is_loading() || self.update_rx.is_some()
    }

    pub fn cycle_status(&self, now: DateTime<Local>) -> CycleStatus {
        cycle::cycle_status(&now, &self.epoch, self.competition.cycle_days)
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        if self.needs_activation() {
            self.activate();
        }
        let busy = self.pump();
        self.avatars
            .request(self.board.iter().filter_map(|entry| entry.admin.avatar()));
        let decoding = self.avatars.pump(ctx);

        let status = self.cycle_status(Local::now());

        egui::TopBottomPanel::top("leaderboard_header").show(ctx, |ui| {
            self.render_header(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("leaderboard_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add_space(8.0);
                    self.render_hero(ui, &status);
                    ui.add_space(16.0);
                    self.render_stats(ui, &status);
                    ui.add_space(16.0);
                    self.render_podium(ui);
                    ui.add_space(16.0);
                    self.render_rewards(ui);
                    ui.add_space(16.0);
                    self.render_ranking(ui);
                    ui.add_space(16.0);
                    self.render_notes(ui);
                    ui.add_space(16.0);
                });
        });

        if let EditAction::Submit(update) =
            edit_admin::ui(ctx, &mut self.edit_dialog, &mut self.avatars)
        {
            self.submit_update(update);
        }

        if busy || decoding {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            // Keeps the day counter current.
            ctx.request_repaint_after(Duration::from_secs(60));
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("🏅").size(30.0));
            ui.vertical(|ui| {
                ui.label(egui::RichText::new("Competition Board").size(24.0).strong());
                ui.label(egui::RichText::new(&self.competition.subtitle).weak());
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::widgets::global_theme_preference_switch(ui);
                if ui
                    .add_enabled(!self.is_loading(), egui::Button::new("Refresh"))
                    .clicked()
                {
                    self.activate();
                }
            });
        });
        ui.add_space(6.0);
    }

    fn render_hero(&self, ui: &mut egui::Ui, status: &CycleStatus) {
        let accent = ui.visuals().selection.bg_fill;
        egui::Frame::group(ui.style())
            .fill(accent.gamma_multiply(0.08))
            .stroke(egui::Stroke::new(2.0, accent.gamma_multiply(0.3)))
            .corner_radius(egui::CornerRadius::same(16))
            .inner_margin(egui::Margin::same(24))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new(format!("✨ {} ✨", self.competition.title))
                            .size(32.0)
                            .strong(),
                    );
                    ui.label(
                        egui::RichText::new(format!(
                            "Compete for the top places and win valuable prizes every {}",
                            cycle::days_label(i64::from(self.competition.cycle_days))
                        ))
                        .size(18.0)
                        .weak(),
                    );
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        let boxes_width = 2.0 * 220.0 + ui.spacing().item_spacing.x;
                        ui.add_space(((ui.available_width() - boxes_width) * 0.5).max(0.0));
                        hero_box(ui, "Time remaining", &status.label(), accent);
                        hero_box(
                            ui,
                            "Grand prize",
                            &format!("{} points", format_points(self.competition.grand_prize_points)),
                            GOLD,
                        );
                    });
                    if status.is_final_day() {
                        ui.add_space(8.0);
                        ui.label(
                            egui::RichText::new("Last day of this cycle: final rankings decide the rewards")
                                .color(GOLD)
                                .strong(),
                        );
                    }
                });
            });
    }

    fn render_stats(&self, ui: &mut egui::Ui, status: &CycleStatus) {
        let totals = aggregates(&self.board);
        ui.columns(4, |columns| {
            stats_card(
                &mut columns[0],
                "Total admins",
                &totals.total_admins.to_string(),
                "active",
            );
            stats_card(
                &mut columns[1],
                "Total points",
                &format_points(totals.total_points),
                "distributed",
            );
            stats_card(&mut columns[2], "Active period", &status.label(), "remaining");
            stats_card(
                &mut columns[3],
                "Next prize",
                &format_points_short(self.competition.grand_prize_points),
                "points",
            );
        });
    }

    fn render_podium(&self, ui: &mut egui::Ui) {
        section(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("🏆 Top three").size(28.0).strong().color(GOLD));
            });
            ui.add_space(12.0);

            if self.is_loading() && self.board.is_empty() {
                ui.vertical_centered(|ui| ui.add(egui::Spinner::new()));
                return;
            }

            match leaderboard::podium(&self.board) {
                Some(places) => {
                    ui.columns(3, |columns| {
                        for (column, entry) in columns.iter_mut().zip(places) {
                            column.vertical_centered(|ui| {
                                podium::podium_card(ui, entry, &self.avatars);
                            });
                        }
                    });
                }
                None => {
                    ui.vertical_centered(|ui| {
                        ui.add_space(24.0);
                        ui.label(
                            egui::RichText::new("Not enough admins to show the podium").weak(),
                        );
                        ui.add_space(24.0);
                    });
                }
            }
        });
    }

    fn render_rewards(&self, ui: &mut egui::Ui) {
        section(ui, |ui| {
            ui.label(egui::RichText::new("🎁 Rewards").size(24.0).strong());
            ui.add_space(8.0);
            let mut rewards = self.competition.rewards.clone();
            rewards.sort_by_key(|reward| reward.place);
            if rewards.is_empty() {
                ui.label(egui::RichText::new("No rewards announced for this cycle").weak());
            }
            for reward in rewards {
                let color = podium::badge_color(leaderboard::RankBadge::for_rank(reward.place))
                    .unwrap_or_else(|| ui.visuals().text_color());
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(leaderboard::place_label(reward.place))
                            .color(color)
                            .strong(),
                    );
                    ui.label(format!("{} points", format_points(reward.points)));
                    if let Some(title) = &reward.title {
                        ui.label(egui::RichText::new(title).weak());
                    }
                });
            }
            ui.add_space(4.0);
            ui.label(
                egui::RichText::new(format!(
                    "Winners may compete again from cycle {} onward after winning this one",
                    cycle::reentry_cycle(
                        self.cycle_status(Local::now()).cycle_index(),
                        self.competition.winner_cooldown_days,
                        self.competition.cycle_days,
                    ) + 1
                ))
                .weak(),
            );
        });
    }

    fn render_ranking(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Full ranking").size(28.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::ComboBox::from_id_salt("leaderboard_filter")
                    .selected_text(self.filter_mode.label())
                    .show_ui(ui, |ui| {
                        for mode in FilterMode::ALL {
                            ui.selectable_value(&mut self.filter_mode, mode, mode.label());
                        }
                    });
                ui.add_sized(
                    [240.0, 26.0],
                    egui::TextEdit::singleline(&mut self.search_query)
                        .hint_text("🔍 Search for an admin..."),
                );
            });
        });
        ui.add_space(8.0);

        let mut edit_target = None;
        section(ui, |ui| {
            if self.is_loading() && self.board.is_empty() {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label("Loading...");
                });
                return;
            }

            let visible = self.visible();
            if visible.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(24.0);
                    ui.label(egui::RichText::new("No results").weak());
                    ui.add_space(24.0);
                });
                return;
            }

            egui::Grid::new("leaderboard_table")
                .num_columns(if self.editing_enabled { 4 } else { 3 })
                .striped(true)
                .spacing([24.0, 10.0])
                .min_col_width(80.0)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new("Rank").strong());
                    ui.label(egui::RichText::new("Admin").strong());
                    ui.label(egui::RichText::new("Total points").strong());
                    if self.editing_enabled {
                        ui.label("");
                    }
                    ui.end_row();

                    for entry in visible {
                        podium::rank_badge(ui, entry.rank);
                        ui.horizontal(|ui| {
                            let ring = ui.visuals().selection.bg_fill;
                            draw_avatar(
                                ui,
                                &self.avatars,
                                entry.admin.avatar(),
                                &entry.admin.display_initials(),
                                44.0,
                                ring,
                            );
                            ui.label(egui::RichText::new(&entry.admin.name).size(18.0).strong());
                        });
                        ui.horizontal(|ui| {
                            ui.label(
                                egui::RichText::new(format_points(entry.admin.total_points))
                                    .size(26.0)
                                    .strong()
                                    .color(GOLD),
                            );
                            ui.label(egui::RichText::new("points").weak());
                        });
                        if self.editing_enabled
                            && ui
                                .add_enabled(!self.edit_dialog.is_open(), egui::Button::new("Edit"))
                                .clicked()
                        {
                            edit_target = Some(entry.admin.clone());
                        }
                        ui.end_row();
                    }
                });
        });

        if let Some(admin) = edit_target {
            self.edit_dialog.open(&admin);
        }
    }

    fn render_notes(&self, ui: &mut egui::Ui) {
        if self.competition.notes.is_empty() {
            return;
        }
        section(ui, |ui| {
            ui.label(egui::RichText::new("✨ Important notes").size(20.0).strong());
            ui.add_space(6.0);
            for note in &self.competition.notes {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new("•").color(ui.visuals().selection.bg_fill));
                    ui.label(note);
                });
            }
        });
    }
}

fn section(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::group(ui.style())
        .corner_radius(egui::CornerRadius::same(14))
        .inner_margin(egui::Margin::same(18))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add_contents(ui);
        });
}

fn hero_box(ui: &mut egui::Ui, caption: &str, value: &str, color: egui::Color32) {
    egui::Frame::group(ui.style())
        .corner_radius(egui::CornerRadius::same(12))
        .inner_margin(egui::Margin::symmetric(24, 12))
        .show(ui, |ui| {
            ui.set_width(172.0);
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(caption).weak());
                ui.label(egui::RichText::new(value).size(24.0).strong().color(color));
            });
        });
}

fn stats_card(ui: &mut egui::Ui, title: &str, value: &str, trend: &str) {
    egui::Frame::group(ui.style())
        .corner_radius(egui::CornerRadius::same(12))
        .inner_margin(egui::Margin::same(16))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(title).weak());
            ui.label(egui::RichText::new(value).size(28.0).strong());
            ui.label(
                egui::RichText::new(trend)
                    .small()
                    .color(ui.visuals().selection.bg_fill),
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::config_loader::SourceConfig;
    use std::path::PathBuf;
    use std::time::Instant;

    fn write_admins(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "admin-leaderboard-page-{}-{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn page_for(path: PathBuf) -> LeaderboardPage {
        let config = LeaderboardConfig {
            source: SourceConfig::File { path: path.clone() },
            ..LeaderboardConfig::default()
        };
        LeaderboardPage::new(Arc::new(AdminSource::File(path)), &config)
    }

    fn settle(page: &mut LeaderboardPage) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while page.pump() {
            assert!(Instant::now() < deadline, "background work did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    const FOUR_ADMINS: &str = r#"[
        {"id": "1", "name": "Ali Reza", "initials": "AR", "total_points": 400},
        {"id": "2", "name": "Sara Ahmed", "initials": "SA", "total_points": 300},
        {"id": "3", "name": "Omar Ali", "initials": "OA", "total_points": 200},
        {"id": "4", "name": "Mona Saleh", "initials": "MS", "total_points": 100}
    ]"#;

    #[test]
    fn activation_loads_the_board_once() {
        let path = write_admins("load", FOUR_ADMINS);
        let mut page = page_for(path.clone());
        assert!(page.needs_activation());
        assert!(page.activate());
        assert!(page.is_loading());
        assert!(!page.activate());

        settle(&mut page);
        assert!(!page.needs_activation());
        let ranks: Vec<(usize, &str)> = page
            .board()
            .iter()
            .map(|entry| (entry.rank, entry.admin.id.as_str()))
            .collect();
        assert_eq!(ranks, vec![(1, "1"), (2, "2"), (3, "3"), (4, "4")]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn failed_fetch_leaves_the_board_empty() {
        let path = std::env::temp_dir().join("admin-leaderboard-page-missing.json");
        let _ = std::fs::remove_file(&path);
        let mut page = page_for(path);
        page.activate();
        settle(&mut page);
        assert!(page.board().is_empty());
        assert!(!page.is_loading());
        assert!(page.visible().is_empty());
    }

    #[test]
    fn filtering_keeps_board_ranks() {
        let path = write_admins("filter", FOUR_ADMINS);
        let mut page = page_for(path.clone());
        page.activate();
        settle(&mut page);

        page.search_query = "ali".to_string();
        let hits: Vec<usize> = page.visible().iter().map(|entry| entry.rank).collect();
        assert_eq!(hits, vec![1, 3]);

        page.filter_mode = FilterMode::Top3;
        page.search_query = "mona".to_string();
        assert!(page.visible().is_empty());

        page.filter_mode = FilterMode::All;
        let hits: Vec<usize> = page.visible().iter().map(|entry| entry.rank).collect();
        assert_eq!(hits, vec![4]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn saved_update_triggers_a_fresh_fetch() {
        let path = write_admins("update", FOUR_ADMINS);
        let mut page = page_for(path.clone());
        page.activate();
        settle(&mut page);

        let sara = page.board()[1].admin.clone();
        page.edit_dialog.open(&sara);
        let mut pending = None;
        if let EditDialog::Open(form) = &mut page.edit_dialog {
            form.name = " Sara A. ".to_string();
        }
        assert!(page.edit_dialog.submit(|update| pending = Some(update)));
        page.submit_update(pending.unwrap());
        settle(&mut page);

        assert_eq!(page.board()[1].admin.name, "Sara A.");
        assert_eq!(page.board()[1].rank, 2);
        let _ = std::fs::remove_file(path);
    }

    fn save_name(page: &mut LeaderboardPage, row: usize, name: &str) {
        let admin = page.board()[row].admin.clone();
        page.edit_dialog.open(&admin);
        if let EditDialog::Open(form) = &mut page.edit_dialog {
            form.name = name.to_string();
        }
        let mut pending = None;
        assert!(page.edit_dialog.submit(|update| pending = Some(update)));
        page.submit_update(pending.unwrap());
    }

    #[test]
    fn back_to_back_saves_are_all_applied() {
        let path = write_admins("queue", FOUR_ADMINS);
        let mut page = page_for(path.clone());
        page.activate();
        settle(&mut page);

        save_name(&mut page, 0, "First Edit");
        save_name(&mut page, 1, "Second Edit");
        save_name(&mut page, 2, "Third Edit");
        assert_eq!(page.pending_updates.len(), 2);
        settle(&mut page);

        let names: Vec<&str> = page
            .board()
            .iter()
            .map(|entry| entry.admin.name.as_str())
            .collect();
        assert_eq!(names, vec!["First Edit", "Second Edit", "Third Edit", "Mona Saleh"]);
        assert!(page.pending_updates.is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn update_during_refresh_fetches_again_after_it() {
        let path = write_admins("stale", FOUR_ADMINS);
        let mut page = page_for(path.clone());
        page.activate();
        settle(&mut page);
        let stale: Vec<_> = page.board().iter().map(|entry| entry.admin.clone()).collect();

        let (fetch_tx, fetch_rx) = std::sync::mpsc::channel();
        page.load = LoadState::Loading(fetch_rx);
        save_name(&mut page, 1, "Sara A.");

        let deadline = Instant::now() + Duration::from_secs(10);
        while page.update_rx.is_some() {
            assert!(Instant::now() < deadline, "update did not finish");
            page.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(page.refetch_pending);
        assert!(page.is_loading());

        fetch_tx.send(FetchEvent::Finished { admins: stale }).unwrap();
        settle(&mut page);

        assert!(!page.refetch_pending);
        assert_eq!(page.board()[1].admin.name, "Sara A.");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn failed_update_still_runs_the_next_one() {
        let path = write_admins("failed-update", FOUR_ADMINS);
        let mut page = page_for(path.clone());
        page.activate();
        settle(&mut page);

        page.submit_update(AdminUpdate {
            id: "missing".to_string(),
            name: "Nobody".to_string(),
            admin_id: None,
            avatar_url: None,
        });
        save_name(&mut page, 3, "Mona S.");
        settle(&mut page);

        assert_eq!(page.board()[3].admin.name, "Mona S.");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn cycle_status_uses_configured_start() {
        let path = std::env::temp_dir().join("admin-leaderboard-page-cycle.json");
        let page = page_for(path);
        let start = cycle::local_epoch(CompetitionConfig::default().start);
        assert_eq!(page.cycle_status(start).days_remaining, 10);
        assert_eq!(
            page.cycle_status(start + chrono::Duration::days(25)).days_remaining,
            5
        );
    }
}
