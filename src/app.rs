use std::time::{Duration, Instant};

use eframe::{
    App, CreationContext, Frame,
    egui::{self, Align, Context, Layout, RichText},
};

use crate::{
    api::ApiClient,
    jobs::PollScheduler,
    panels::{HealthPanel, PullRequestPanel},
    view_models::{
        ApiHealthView, LOADING_PULL_REQUESTS, NO_PULL_REQUESTS, PullRequestCard,
        PullRequestListView, rest_status_line,
    },
};

pub const APP_NAME: &str = "Renovate Platform";
const APP_SUBTITLE: &str = "Manage your self-hosted Renovate installation";
const AVATAR_SIZE: f32 = 40.0;
const REPAINT_INTERVAL: Duration = Duration::from_millis(500);

pub struct DashboardApp {
    health: HealthPanel,
    pull_requests: PullRequestPanel,
}

impl DashboardApp {
    pub fn new(cc: &CreationContext<'_>, api: ApiClient, scheduler: PollScheduler) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        Self {
            health: HealthPanel::mount(api.clone()),
            pull_requests: PullRequestPanel::mount(api, scheduler, Instant::now()),
        }
    }

    fn poll_jobs(&mut self) {
        self.health.poll_job();
        self.pull_requests.tick(Instant::now());
    }

    fn render_header(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|header| {
            header.heading(APP_NAME);
            header.label(APP_SUBTITLE);
            header.add_space(8.0);
        });
        ui.columns(2, |columns| {
            columns[0].group(|group| {
                group.label(rest_status_line(self.health.rest_status()));
            });
            columns[1].group(|group| {
                render_api_health(group, &ApiHealthView::from_state(self.health.api()))
            });
        });
    }

    fn render_pull_requests(&mut self, ui: &mut egui::Ui) {
        let mut refresh_clicked = false;
        ui.horizontal(|row| {
            row.heading("Open Pull Requests");
            if !self.pull_requests.is_loading() {
                row.with_layout(Layout::right_to_left(Align::Center), |lane| {
                    refresh_clicked = lane.button("Refresh").clicked();
                });
            }
        });
        ui.separator();

        match PullRequestListView::from_state(self.pull_requests.state()) {
            PullRequestListView::Loading => {
                ui.label(LOADING_PULL_REQUESTS);
            }
            PullRequestListView::Failed(message) => {
                ui.colored_label(ui.visuals().error_fg_color, message);
            }
            PullRequestListView::Empty { synced } => {
                ui.weak(synced);
                ui.add_space(12.0);
                ui.weak(NO_PULL_REQUESTS);
            }
            PullRequestListView::Cards {
                synced,
                banner,
                cards,
            } => render_pull_request_list(ui, &synced, &banner, &cards),
        }

        if refresh_clicked {
            self.pull_requests.refresh(Instant::now());
        }
    }
}

impl App for DashboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        self.poll_jobs();

        egui::TopBottomPanel::top("health_panel").show(ctx, |ui| {
            self.render_header(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_pull_requests(ui);
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

// -----------------------------------------------------------------------------
// UI helpers
// -----------------------------------------------------------------------------

fn render_api_health(ui: &mut egui::Ui, view: &ApiHealthView) {
    for line in &view.lines {
        if view.is_error {
            ui.colored_label(ui.visuals().error_fg_color, line);
        } else {
            ui.label(line);
        }
    }
}

fn render_pull_request_list(
    ui: &mut egui::Ui,
    synced: &str,
    banner: &str,
    cards: &[PullRequestCard],
) {
    ui.weak(synced);
    ui.strong(banner);
    ui.add_space(4.0);
    egui::ScrollArea::vertical().show(ui, |area| {
        for card in cards {
            area.push_id(card.id, |ui| render_pull_request_card(ui, card));
        }
    });
}

fn render_pull_request_card(ui: &mut egui::Ui, pr: &PullRequestCard) {
    ui.group(|card| {
        card.set_width(card.available_width());
        card.horizontal(|header| {
            header
                .add(
                    egui::Image::new(pr.avatar_url.as_str())
                        .fit_to_exact_size(egui::vec2(AVATAR_SIZE, AVATAR_SIZE))
                        .corner_radius(AVATAR_SIZE / 2.0),
                )
                .on_hover_text(&pr.user_login);
            header.vertical(|title| {
                title
                    .add(
                        egui::Hyperlink::from_label_and_url(
                            RichText::new(&pr.title).strong(),
                            &pr.html_url,
                        )
                        .open_in_new_tab(true),
                    )
                    .on_hover_text(pr.state);
                title.horizontal(|meta| {
                    meta.label(&pr.repo);
                    meta.weak(&pr.number);
                });
            });
        });
        card.horizontal(|details| {
            details.monospace(&pr.branch);
            details.with_layout(Layout::right_to_left(Align::Center), |lane| {
                lane.weak(&pr.opened).on_hover_text(&pr.updated);
                lane.label(&pr.author);
            });
        });
    });
    ui.add_space(8.0);
}
