use super::presenter::{self, SuccessView, View};
use super::DatasetMultiplierApp;
use crate::upload::Multiplier;
use crate::utils::file_size::format_size;
use eframe::egui::{self, Align, Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(37, 99, 235);
const SUCCESS: Color32 = Color32::from_rgb(0, 150, 60);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);

/// Clicks collected during a frame, applied once rendering is done.
enum UiAction {
    PickFile,
    Submit,
    SetMultiplier(u8),
    OpenLink(String),
    SaveResult(String),
    StartOver,
}

impl DatasetMultiplierApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        let view = presenter::present(self.workflow.state(), Some(self.client.api().base_url()));
        let mut actions = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = ui.available_height() - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Process Your Images");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new(
                                "Upload a ZIP file of images to classify them and generate synthetic ones",
                            )
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);
                    self.render_file_picker(ctx, ui, &view, &mut actions);
                    ui.add_space(20.0);
                    self.render_multiplier(ui, &mut actions);
                    ui.add_space(20.0);
                    self.render_submit(ui, &mut actions);
                    ui.add_space(20.0);

                    match &view {
                        View::Progress { percent, phase } => {
                            ui.group(|ui| {
                                ui.horizontal(|ui| {
                                    ui.label("Processing");
                                    if let Some(job) = self.workflow.job() {
                                        ui.label(
                                            RichText::new(format!("job {job}"))
                                                .color(ui.visuals().text_color().gamma_multiply(0.6)),
                                        );
                                    }
                                });
                                let bar = egui::ProgressBar::new(f32::from(*percent) / 100.0)
                                    .show_percentage()
                                    .animate(self.workflow.state().is_active())
                                    .fill(ACCENT);
                                ui.add(bar);
                                ui.label(phase.message());
                            });
                        }
                        View::Success(success) => self.render_success(ui, success, &mut actions),
                        View::Failure(reason) => {
                            ui.group(|ui| {
                                ui.colored_label(ERROR, format!("❌ {reason}"));
                                ui.label("You can submit the file again.");
                            });
                        }
                        View::Empty | View::Notice(_) => {}
                    }

                    if self.workflow.state().is_terminal() {
                        ui.add_space(10.0);
                        ui.vertical_centered(|ui| {
                            if ui.button("🗑 Start over").clicked() {
                                actions.push(UiAction::StartOver);
                            }
                        });
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });

        for action in actions {
            match action {
                UiAction::PickFile => {
                    if let Some(path) = FileDialog::new().add_filter("ZIP archive", &["zip"]).pick_file() {
                        self.select_path(path);
                    }
                }
                UiAction::Submit => self.start_submission(ctx),
                UiAction::SetMultiplier(value) => {
                    let _ = self.workflow.set_multiplier(i64::from(value));
                }
                UiAction::OpenLink(url) => {
                    if let Err(e) = open::that(&url) {
                        tracing::warn!("Could not open {url}: {e}");
                    }
                }
                UiAction::SaveResult(url) => self.start_download(ctx, &url),
                UiAction::StartOver => self.reset(),
            }
        }
    }

    fn render_file_picker(&self, ctx: &egui::Context, ui: &mut egui::Ui, view: &View, actions: &mut Vec<UiAction>) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());

        ui.group(|ui| {
            ui.label(RichText::new("Upload your zipped images").strong());
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let picker = ui.add_enabled(
                    !self.workflow.state().is_active(),
                    egui::Button::new("📁 Select ZIP"),
                );
                if picker.clicked() {
                    actions.push(UiAction::PickFile);
                }
                match self.workflow.candidate() {
                    Some(candidate) => {
                        ui.colored_label(SUCCESS, "✔");
                        ui.label(format!(
                            "{} ({})",
                            candidate.name,
                            format_size(candidate.size_bytes)
                        ));
                    }
                    None if hovering => {
                        ui.label("Drop the file to select it");
                    }
                    None => {
                        ui.label(
                            RichText::new("or drag and drop a ZIP of .png, .jpg or .jpeg images")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    }
                }
            });
            ui.label(
                RichText::new(format!(
                    "Maximum file size: {}",
                    format_size(self.workflow.limits().max_upload_bytes)
                ))
                .small(),
            );

            if let View::Notice(reason) = view {
                ui.add_space(4.0);
                ui.colored_label(ERROR, reason);
            }
        });
    }

    fn render_multiplier(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.group(|ui| {
            ui.label(RichText::new("Multiplication factor").strong());
            let mut value = self.workflow.multiplier().get();
            let slider = egui::Slider::new(&mut value, Multiplier::MIN..=Multiplier::MAX).suffix("x");
            let response = ui.add_enabled(!self.workflow.state().is_active(), slider);
            if response.changed() {
                actions.push(UiAction::SetMultiplier(value));
            }
            ui.label(
                RichText::new("Number of times to multiply your image dataset")
                    .color(ui.visuals().text_color().gamma_multiply(0.7)),
            );
        });
    }

    fn render_submit(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.vertical_centered(|ui| {
            if self.workflow.state().is_active() {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label("Processing...");
                });
                return;
            }

            ui.add_enabled_ui(self.workflow.can_submit(), |ui| {
                let button = egui::Button::new("📤 Process Images").min_size(egui::vec2(200.0, 40.0));
                if ui.add(button).clicked() {
                    actions.push(UiAction::Submit);
                }
            });
        });
    }

    fn render_success(&self, ui: &mut egui::Ui, success: &SuccessView, actions: &mut Vec<UiAction>) {
        ui.group(|ui| {
            ui.colored_label(SUCCESS, RichText::new("✅ Processing complete!").strong());
            ui.label("Your images have been classified and synthetic images generated.");
            ui.add_space(8.0);

            ui.label(RichText::new("Classification summary").strong());
            egui::Grid::new("classification_summary")
                .striped(true)
                .show(ui, |ui| {
                    for (label, value) in &success.summary {
                        ui.label(label);
                        ui.label(RichText::new(value).monospace());
                        ui.end_row();
                    }
                });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("GAN used:");
                ui.label(RichText::new(&success.gan_used).strong());
            });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("🌐 Open download link").clicked() {
                    actions.push(UiAction::OpenLink(success.download_url.clone()));
                }
                let save = ui.add_enabled(!self.download.is_busy(), egui::Button::new("💾 Save as..."));
                if save.clicked() {
                    actions.push(UiAction::SaveResult(success.download_url.clone()));
                }
            });

            let download_text = self.download.get_status_text();
            if !download_text.is_empty() {
                ui.label(download_text);
            }
        });
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            ui.label(
                RichText::new(format!("Server: {}", self.client.api().base_url()))
                    .small()
                    .color(ui.visuals().text_color().gamma_multiply(0.6)),
            );
        });
    }
}
