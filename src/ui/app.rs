use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{ClientCommand, ClientEvent};

use super::components::{
    activity_panel, chat_area, input_bar,
    sidebar::{self, SidebarActions},
};
use super::state::AppState;

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<ClientCommand>,
    event_receiver: mpsc::Receiver<ClientEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<ClientCommand>,
        event_receiver: mpsc::Receiver<ClientEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_client_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            if let Some(follow_up) = self.state.apply_event(event) {
                self.send_command(follow_up);
            }
        }
    }

    fn send_command(&mut self, command: ClientCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to session: {err}");
            self.state
                .add_activity("COMMAND", format!("Command dropped: {err}"));
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_client_events();

        egui::SidePanel::left("chat_sidebar")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                let actions: SidebarActions = sidebar::render(ui, &mut self.state);
                if let Some(query) = actions.remote_search {
                    self.send_command(ClientCommand::SearchUsers(query));
                }
                if let Some(peer) = actions.selected {
                    self.send_command(ClientCommand::SelectChat(peer));
                }
            });

        egui::SidePanel::right("activity_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                activity_panel::render(ui, &self.state);
            });

        egui::TopBottomPanel::bottom("input_panel").show(ctx, |ui| {
            if let Some(notice) = &self.state.notice {
                ui.colored_label(egui::Color32::YELLOW, notice);
            }
            if let Some(content) = input_bar::render(ui, &mut self.state.input_text) {
                self.send_command(ClientCommand::SendMessage(content));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            chat_area::render_header(ui, self.state.current_chat.as_ref());
            ui.separator();
            chat_area::render(ui, &self.state.pane);
        });

        ctx.request_repaint();
    }
}
