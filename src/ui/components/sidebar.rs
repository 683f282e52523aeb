use eframe::egui;

use crate::common::ChatPeer;
use crate::ui::state::AppState;

#[derive(Default)]
pub struct SidebarActions {
    pub selected: Option<ChatPeer>,
    pub remote_search: Option<String>,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> SidebarActions {
    let mut actions = SidebarActions::default();

    ui.heading("Chats");
    ui.separator();

    // Typing filters the list locally; Enter asks the server.
    let response = ui.text_edit_singleline(&mut state.search_input);
    if response.changed() {
        state.chats.apply_filter(&state.search_input);
    }
    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
        actions.remote_search = Some(state.search_input.clone());
    }

    ui.separator();

    let current_id = state.current_chat.as_ref().map(|chat| chat.id);
    if state.chats.rows().is_empty() {
        ui.label("No chats yet");
    }
    for row in state.chats.visible_rows() {
        let selected = current_id == Some(row.chat.id);
        if ui.selectable_label(selected, &row.chat.name).clicked() {
            actions.selected = Some(ChatPeer::from(&row.chat));
        }
        if let Some(last) = &row.chat.last_message_content {
            ui.label(egui::RichText::new(last).small().weak());
        }
    }

    if !state.search_results.is_empty() {
        ui.separator();
        ui.label("Search results:");
        for user in &state.search_results {
            if ui.button(&user.name).clicked() {
                actions.selected = Some(ChatPeer::from(user));
            }
        }
    }

    actions
}
