use eframe::egui;

use crate::common::ChatPeer;
use crate::ui::render::{Direction, MessagePane};

pub fn render_header(ui: &mut egui::Ui, chat: Option<&ChatPeer>) {
    match chat {
        Some(chat) => {
            let heading = ui.heading(&chat.name);
            if let Some(avatar) = &chat.avatar {
                heading.on_hover_text(avatar);
            }
        }
        None => {
            ui.heading("BitTalk");
            ui.label(egui::RichText::new("Select a chat to start messaging").weak());
        }
    }
}

pub fn render(ui: &mut egui::Ui, pane: &MessagePane) {
    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            if pane.is_empty() {
                ui.label(egui::RichText::new("No messages yet").weak());
            }
            for node in pane.nodes() {
                let layout = match node.direction {
                    Direction::Sent => egui::Layout::right_to_left(egui::Align::TOP),
                    Direction::Received => egui::Layout::left_to_right(egui::Align::TOP),
                };
                ui.with_layout(layout, |ui| {
                    let text = egui::RichText::new(&node.content);
                    match node.direction {
                        Direction::Sent => ui.colored_label(egui::Color32::LIGHT_BLUE, text),
                        Direction::Received => ui.label(text),
                    };
                    let marker = if node.read { " ✓✓" } else { "" };
                    ui.label(egui::RichText::new(format!("{}{marker}", node.time)).small().weak());
                });
            }
        });
}
