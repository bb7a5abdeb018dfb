// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::SampleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Create,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Form(FormKind),
    ConfirmDelete(SampleId),
    ColumnConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardVisibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub dashboard: DashboardVisibility,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            dashboard: DashboardVisibility::Hidden,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    OpenForm(FormKind),
    ExitToNav,
    RequestDelete(SampleId),
    OpenColumnConfig,
    ShowDashboard,
    HideDashboard,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    DashboardVisibilityChanged(DashboardVisibility),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode.clone())]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode.clone()), self.set_status("nav")]
            }
            AppCommand::RequestDelete(id) => {
                self.mode = AppMode::ConfirmDelete(id);
                vec![AppEvent::ModeChanged(self.mode.clone())]
            }
            AppCommand::OpenColumnConfig => {
                self.mode = AppMode::ColumnConfig;
                vec![AppEvent::ModeChanged(self.mode.clone())]
            }
            AppCommand::ShowDashboard => {
                self.dashboard = DashboardVisibility::Visible;
                vec![
                    AppEvent::DashboardVisibilityChanged(self.dashboard),
                    self.set_status("dashboard shown"),
                ]
            }
            AppCommand::HideDashboard => {
                self.dashboard = DashboardVisibility::Hidden;
                vec![
                    AppEvent::DashboardVisibilityChanged(self.dashboard),
                    self.set_status("dashboard hidden"),
                ]
            }
            AppCommand::SetStatus(message) => {
                vec![self.set_status(&message)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
