use eframe::egui;
use rfd::FileDialog;
use tracing::{debug, info};

use crate::models::{Admin, AdminUpdate, initials_or};
use crate::screens::avatar::{AvatarTextures, draw_avatar};

pub struct EditForm {
    pub id: String,
    pub stored_initials: String,
    pub name: String,
    pub admin_id: String,
    pub avatar_url: String,
}

impl EditForm {
    pub fn from_admin(admin: &Admin) -> Self {
        Self {
            id: admin.id.clone(),
            stored_initials: admin.initials.clone(),
            name: admin.name.clone(),
            admin_id: admin.admin_id.clone().unwrap_or_default(),
            avatar_url: admin.avatar_url.clone().unwrap_or_default(),
        }
    }

    pub fn preview_initials(&self) -> String {
        initials_or(&self.name, &self.stored_initials)
    }

    /// `None` while the trimmed name is empty.
    pub fn build_update(&self) -> Option<AdminUpdate> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        let admin_id = self.admin_id.trim();
        let avatar_url = self.avatar_url.trim();
        Some(AdminUpdate {
            id: self.id.clone(),
            name: name.to_string(),
            admin_id: (!admin_id.is_empty()).then(|| admin_id.to_string()),
            avatar_url: (!avatar_url.is_empty()).then(|| avatar_url.to_string()),
        })
    }
}

#[derive(Default)]
pub enum EditDialog {
    #[default]
    Closed,
    Open(EditForm),
}

impl EditDialog {
    pub fn open(&mut self, admin: &Admin) {
        info!("Opening edit dialog for admin {}", admin.id);
        *self = EditDialog::Open(EditForm::from_admin(admin));
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EditDialog::Open(_))
    }

    pub fn close(&mut self) {
        *self = EditDialog::Closed;
    }

    /// Hands the update to `on_update` and closes. A blank name keeps the dialog open.
    pub fn submit(&mut self, on_update: impl FnOnce(AdminUpdate)) -> bool {
        let EditDialog::Open(form) = self else {
            return false;
        };
        let Some(update) = form.build_update() else {
            debug!("Ignoring edit submission with an empty name");
            return false;
        };
        on_update(update);
        self.close();
        true
    }
}

pub enum EditAction {
    Stay,
    Submit(AdminUpdate),
}

pub fn ui(ctx: &egui::Context, dialog: &mut EditDialog, avatars: &mut AvatarTextures) -> EditAction {
    let EditDialog::Open(form) = dialog else {
        return EditAction::Stay;
    };

    let mut window_open = true;
    let mut submit_clicked = false;
    let mut cancel_clicked = false;

    egui::Window::new("Edit admin")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .open(&mut window_open)
        .show(ctx, |ui| {
            ui.set_min_width(420.0);

            ui.label("Admin name");
            let name_response = ui.add_sized(
                [400.0, 28.0],
                egui::TextEdit::singleline(&mut form.name).hint_text("Enter the admin name"),
            );
            if name_response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter)) {
                submit_clicked = true;
            }
            ui.add_space(6.0);

            ui.label("Admin ID (optional)");
            ui.add_sized(
                [400.0, 28.0],
                egui::TextEdit::singleline(&mut form.admin_id).hint_text("e.g. ADM001"),
            );
            ui.add_space(6.0);

            ui.label("Avatar (optional)");
            ui.horizontal(|ui| {
                let current = form.avatar_url.trim();
                let url = (!current.is_empty()).then_some(current);
                if let Some(url) = url {
                    avatars.request([url]);
                }
                let ring = ui.visuals().selection.bg_fill;
                draw_avatar(ui, avatars, url, &form.preview_initials(), 72.0, ring);
                ui.vertical(|ui| {
                    ui.add_sized(
                        [300.0, 28.0],
                        egui::TextEdit::singleline(&mut form.avatar_url)
                            .hint_text("Image URL or path"),
                    );
                    ui.horizontal(|ui| {
                        if ui.button("Choose image").clicked()
                            && let Some(path) = FileDialog::new()
                                .add_filter("image", &["png", "jpg", "jpeg", "webp", "gif"])
                                .pick_file()
                        {
                            form.avatar_url = path.display().to_string();
                        }
                        if !form.avatar_url.is_empty() && ui.button("Remove").clicked() {
                            form.avatar_url.clear();
                        }
                    });
                });
            });

            ui.add_space(12.0);
            ui.horizontal(|ui| {
                if ui.button("Save changes").clicked() {
                    submit_clicked = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel_clicked = true;
                }
            });
        });

    if cancel_clicked || !window_open {
        info!("Edit dialog closed without saving");
        dialog.close();
        return EditAction::Stay;
    }

    if submit_clicked {
        let mut submitted = None;
        dialog.submit(|update| submitted = Some(update));
        if let Some(update) = submitted {
            return EditAction::Submit(update);
        }
    }

    EditAction::Stay
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Admin {
        Admin {
            id: "a1".to_string(),
            name: "Ali Reza".to_string(),
            admin_id: Some("ADM001".to_string()),
            avatar_url: None,
            initials: "AR".to_string(),
            total_points: 40,
        }
    }

    fn open_dialog() -> EditDialog {
        let mut dialog = EditDialog::default();
        dialog.open(&admin());
        dialog
    }

    fn form(dialog: &mut EditDialog) -> &mut EditForm {
        match dialog {
            EditDialog::Open(form) => form,
            EditDialog::Closed => panic!("dialog is closed"),
        }
    }

    #[test]
    fn opening_prefills_from_record() {
        let mut dialog = open_dialog();
        let form = form(&mut dialog);
        assert_eq!(form.name, "Ali Reza");
        assert_eq!(form.admin_id, "ADM001");
        assert_eq!(form.avatar_url, "");
    }

    #[test]
    fn whitespace_name_does_not_submit() {
        let mut dialog = open_dialog();
        form(&mut dialog).name = "  ".to_string();

        let mut calls = 0;
        let submitted = dialog.submit(|_| calls += 1);
        assert!(!submitted);
        assert_eq!(calls, 0);
        assert!(dialog.is_open());
    }

    #[test]
    fn submit_trims_and_normalizes_optionals() {
        let mut dialog = open_dialog();
        {
            let form = form(&mut dialog);
            form.name = "  Sara Ahmed ".to_string();
            form.admin_id = "   ".to_string();
            form.avatar_url = String::new();
        }

        let mut received = None;
        assert!(dialog.submit(|update| received = Some(update)));
        assert!(!dialog.is_open());
        assert_eq!(
            received,
            Some(AdminUpdate {
                id: "a1".to_string(),
                name: "Sara Ahmed".to_string(),
                admin_id: None,
                avatar_url: None,
            })
        );
    }

    #[test]
    fn submit_keeps_set_optionals() {
        let mut dialog = open_dialog();
        {
            let form = form(&mut dialog);
            form.admin_id = " ADM009 ".to_string();
            form.avatar_url = " https://cdn.example/ali.png\n".to_string();
        }
        let mut received = None;
        dialog.submit(|update| received = Some(update));
        let update = received.unwrap();
        assert_eq!(update.admin_id.as_deref(), Some("ADM009"));
        assert_eq!(update.avatar_url.as_deref(), Some("https://cdn.example/ali.png"));
    }

    #[test]
    fn closed_dialog_ignores_submit() {
        let mut dialog = EditDialog::default();
        let mut calls = 0;
        assert!(!dialog.submit(|_| calls += 1));
        assert_eq!(calls, 0);
    }

    #[test]
    fn preview_initials_track_the_name_field() {
        let mut dialog = open_dialog();
        let form = form(&mut dialog);
        assert_eq!(form.preview_initials(), "AR");
        form.name = "Mona Saleh Omar".to_string();
        assert_eq!(form.preview_initials(), "MSO");
        form.name.clear();
        assert_eq!(form.preview_initials(), "AR");
    }
}
