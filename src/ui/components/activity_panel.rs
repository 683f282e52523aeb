use eframe::egui;

use crate::common::ChannelState;
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Activity");
    ui.separator();

    ui.horizontal(|ui| {
        ui.label("Channel:");
        let (color, text) = match state.channel_state {
            Some(ChannelState::Open) => (egui::Color32::GREEN, "open"),
            Some(ChannelState::Connecting) => (egui::Color32::YELLOW, "connecting"),
            Some(ChannelState::Closed) => (egui::Color32::RED, "closed"),
            None => (egui::Color32::GRAY, "idle"),
        };
        ui.colored_label(color, text);
    });

    if let Some(user) = &state.current_user {
        ui.horizontal(|ui| {
            ui.label("User:");
            ui.label(format!("{} (#{})", user.name, user.id));
        });
    }

    ui.separator();
    ui.label("Recent Events:");
    egui::ScrollArea::vertical()
        .max_height(300.0)
        .show(ui, |ui| {
            for event in state.activity.iter().rev().take(30) {
                let time_str = event.timestamp.format("%H:%M:%S");
                let color = match event.kind {
                    "CHANNEL" => egui::Color32::LIGHT_BLUE,
                    "SEND" => egui::Color32::RED,
                    "USER" => egui::Color32::GREEN,
                    _ => egui::Color32::WHITE,
                };

                ui.horizontal(|ui| {
                    ui.colored_label(color, format!("[{time_str}]"));
                    ui.label(&event.message);
                });
            }
        });
}
