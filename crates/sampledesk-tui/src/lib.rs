// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::collections::BTreeMap;
use std::io;
use std::time::Duration;
use time::{Date, OffsetDateTime};

use sampledesk_app::{
    AccountId, AppCommand, AppMode, AppState, CellField, ColumnKey, ComboOption, Combobox,
    ComboboxCommand, ComboboxEvent, ComboboxKey, CommitOutcome, CURRENCIES, DashboardVisibility,
    DeleteOutcome, EditState, EntityDirectory, EntityKind, FormKind, GridState, MutationSink,
    NavTarget, Navigator, OpportunityId, QuickCreateKind, RecordSource, Sample, SampleDraft,
    SampleId, SortDirection, SortKey, UNITS_OF_MEASURE,
};

const SORT_MARK_ASC: &str = "▲";
const SORT_MARK_DESC: &str = "▼";
const FIELD_CURSOR: &str = "▸";

/// Everything the terminal shell needs from its collaborators: the
/// sample service and the CRM lookups, plus outbound navigation.
pub trait AppRuntime: RecordSource + MutationSink + EntityDirectory + Navigator {}

impl<T: RecordSource + MutationSink + EntityDirectory + Navigator> AppRuntime for T {}

/// The fields of the create/edit form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Name,
    Status,
    SampleType,
    DueDate,
    ShipTo,
    Cost,
    Currency,
    Quantity,
    Uom,
    Account,
    Product,
    Employee,
    Opportunity,
    ServiceCase,
    Hazardous,
    HazardousReason,
    PackagingWidth,
    PackagingHeight,
    PackagingMaterial,
}

impl FormField {
    const ALL: [Self; 19] = [
        Self::Name,
        Self::Status,
        Self::SampleType,
        Self::DueDate,
        Self::ShipTo,
        Self::Cost,
        Self::Currency,
        Self::Quantity,
        Self::Uom,
        Self::Account,
        Self::Product,
        Self::Employee,
        Self::Opportunity,
        Self::ServiceCase,
        Self::Hazardous,
        Self::HazardousReason,
        Self::PackagingWidth,
        Self::PackagingHeight,
        Self::PackagingMaterial,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::Name => "sample name",
            Self::Status => "status",
            Self::SampleType => "sample type",
            Self::DueDate => "due date",
            Self::ShipTo => "ship to",
            Self::Cost => "cost",
            Self::Currency => "currency",
            Self::Quantity => "number of samples",
            Self::Uom => "unit",
            Self::Account => "account",
            Self::Product => "product",
            Self::Employee => "employee",
            Self::Opportunity => "opportunity",
            Self::ServiceCase => "service case",
            Self::Hazardous => "hazardous",
            Self::HazardousReason => "hazardous reason",
            Self::PackagingWidth => "packaging width",
            Self::PackagingHeight => "packaging height",
            Self::PackagingMaterial => "packaging material",
        }
    }

    const fn is_combo(self) -> bool {
        matches!(
            self,
            Self::Currency
                | Self::Uom
                | Self::Account
                | Self::Product
                | Self::Employee
                | Self::Opportunity
                | Self::ServiceCase
        )
    }
}

struct FormUiState {
    kind: FormKind,
    editing_id: Option<SampleId>,
    draft: SampleDraft,
    field: usize,
    account: Combobox,
    product: Combobox,
    employee: Combobox,
    opportunity: Combobox,
    service_case: Combobox,
    currency: Combobox,
    uom: Combobox,
}

impl FormUiState {
    fn active_field(&self) -> FormField {
        FormField::ALL[self.field]
    }

    fn combo(&self, field: FormField) -> Option<&Combobox> {
        match field {
            FormField::Account => Some(&self.account),
            FormField::Product => Some(&self.product),
            FormField::Employee => Some(&self.employee),
            FormField::Opportunity => Some(&self.opportunity),
            FormField::ServiceCase => Some(&self.service_case),
            FormField::Currency => Some(&self.currency),
            FormField::Uom => Some(&self.uom),
            _ => None,
        }
    }

    fn combo_mut(&mut self, field: FormField) -> Option<&mut Combobox> {
        match field {
            FormField::Account => Some(&mut self.account),
            FormField::Product => Some(&mut self.product),
            FormField::Employee => Some(&mut self.employee),
            FormField::Opportunity => Some(&mut self.opportunity),
            FormField::ServiceCase => Some(&mut self.service_case),
            FormField::Currency => Some(&mut self.currency),
            FormField::Uom => Some(&mut self.uom),
            _ => None,
        }
    }

    fn text_buffer_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Name => Some(&mut self.draft.sample_name),
            FormField::Status => Some(&mut self.draft.status),
            FormField::SampleType => Some(&mut self.draft.sample_type),
            FormField::DueDate => Some(&mut self.draft.due_date),
            FormField::ShipTo => Some(&mut self.draft.ship_to_address),
            FormField::Cost => Some(&mut self.draft.cost_amount),
            FormField::Quantity => Some(&mut self.draft.quantity_amount),
            FormField::HazardousReason => Some(&mut self.draft.hazardous_reason),
            FormField::PackagingWidth => Some(&mut self.draft.packaging_width),
            FormField::PackagingHeight => Some(&mut self.draft.packaging_height),
            FormField::PackagingMaterial => Some(&mut self.draft.packaging_material),
            _ => None,
        }
    }

    fn move_field(&mut self, delta: isize) {
        let len = FormField::ALL.len() as isize;
        let next = (self.field as isize + delta).rem_euclid(len);
        self.field = next as usize;
    }
}

struct ViewData {
    samples: Vec<Sample>,
    grid: GridState,
    cursor_row: usize,
    cursor_col: usize,
    search_active: bool,
    column_cursor: usize,
    help_visible: bool,
    form: Option<FormUiState>,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            grid: GridState::new(),
            cursor_row: 0,
            cursor_col: 0,
            search_active: false,
            column_cursor: 0,
            help_visible: false,
            form: None,
        }
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    if let Err(error) = refresh_view_data(runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error:#}")));
    }

    let mut result = Ok(());
    loop {
        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn refresh_view_data<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    view_data.samples = runtime.fetch_all()?;
    clamp_cursor(view_data);
    Ok(())
}

fn clamp_cursor(view_data: &mut ViewData) {
    let rows = view_data.grid.derive_view(&view_data.samples).len();
    if rows == 0 {
        view_data.cursor_row = 0;
    } else if view_data.cursor_row >= rows {
        view_data.cursor_row = rows - 1;
    }
    let columns = view_data.grid.visible_columns().count();
    if columns == 0 {
        view_data.cursor_col = 0;
    } else if view_data.cursor_col >= columns {
        view_data.cursor_col = columns - 1;
    }
}

fn selected_sample_id(view_data: &ViewData) -> Option<SampleId> {
    view_data
        .grid
        .derive_view(&view_data.samples)
        .get(view_data.cursor_row)
        .map(|sample| sample.id.clone())
}

fn selected_column(view_data: &ViewData) -> Option<ColumnKey> {
    view_data.grid.visible_columns().nth(view_data.cursor_col)
}

const fn editable_field(column: ColumnKey) -> Option<CellField> {
    match column {
        ColumnKey::Name => Some(CellField::Name),
        ColumnKey::Status => Some(CellField::Status),
        ColumnKey::ShipTo => Some(CellField::ShipTo),
        _ => None,
    }
}

fn set_status(state: &mut AppState, message: impl Into<String>) {
    state.dispatch(AppCommand::SetStatus(message.into()));
}

/// Returns true when the app should exit.
fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> bool {
    if view_data.help_visible {
        view_data.help_visible = false;
        return false;
    }

    match state.mode.clone() {
        AppMode::Form(_) => {
            handle_form_key(state, runtime, view_data, key);
            false
        }
        AppMode::ConfirmDelete(id) => {
            handle_confirm_delete_key(state, runtime, view_data, &id, key);
            false
        }
        AppMode::ColumnConfig => {
            handle_column_config_key(state, view_data, key);
            false
        }
        AppMode::Nav => {
            if matches!(view_data.grid.edit(), EditState::Editing { .. }) {
                handle_cell_edit_key(state, runtime, view_data, key);
                return false;
            }
            if view_data.search_active {
                handle_search_key(view_data, key);
                return false;
            }
            handle_nav_key(state, runtime, view_data, key)
        }
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Down | KeyCode::Char('j') => {
            let rows = view_data.grid.derive_view(&view_data.samples).len();
            if rows > 0 {
                view_data.cursor_row = (view_data.cursor_row + 1).min(rows - 1);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.cursor_row = view_data.cursor_row.saturating_sub(1);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            let columns = view_data.grid.visible_columns().count();
            if columns > 0 {
                view_data.cursor_col = (view_data.cursor_col + 1).min(columns - 1);
            }
        }
        KeyCode::Left | KeyCode::Char('h') => {
            view_data.cursor_col = view_data.cursor_col.saturating_sub(1);
        }
        KeyCode::Char('/') => {
            view_data.search_active = true;
        }
        KeyCode::Char('s') => match selected_column(view_data).and_then(ColumnKey::sort_key) {
            Some(sort_key) => {
                let status = view_data.grid.toggle_sort(sort_key);
                clamp_cursor(view_data);
                set_status(state, status.message());
            }
            None => set_status(state, "column is not sortable"),
        },
        KeyCode::Char('e') => begin_inline_edit(state, view_data),
        KeyCode::Enter | KeyCode::Char('E') => {
            if let Some(id) = selected_sample_id(view_data) {
                open_edit_form(state, runtime, view_data, &id);
            }
        }
        KeyCode::Char('n') => open_create_form(state, runtime, view_data),
        KeyCode::Char('d') => {
            if let Some(id) = selected_sample_id(view_data) {
                state.dispatch(AppCommand::RequestDelete(id));
            }
        }
        KeyCode::Char('c') => {
            view_data.column_cursor = 0;
            state.dispatch(AppCommand::OpenColumnConfig);
        }
        KeyCode::Char('D') => {
            let command = match state.dashboard {
                DashboardVisibility::Hidden => AppCommand::ShowDashboard,
                DashboardVisibility::Visible => AppCommand::HideDashboard,
            };
            state.dispatch(command);
        }
        KeyCode::Char('o') => {
            let status = view_data.grid.clear_external_filters();
            clamp_cursor(view_data);
            set_status(state, status.message());
        }
        KeyCode::Char('a') => {
            let account = view_data
                .grid
                .derive_view(&view_data.samples)
                .get(view_data.cursor_row)
                .map(|sample| sample.account.account_id.clone());
            if let Some(account_id) = account {
                view_data.grid.set_account_filter(Some(account_id));
                clamp_cursor(view_data);
                set_status(state, "filtered to selected account");
            }
        }
        KeyCode::Char('O') => {
            let opportunity = view_data
                .grid
                .derive_view(&view_data.samples)
                .get(view_data.cursor_row)
                .and_then(|sample| sample.opportunity.as_ref())
                .map(|opp| opp.opportunity_id.clone());
            match opportunity {
                Some(opportunity_id) => {
                    view_data.grid.set_opportunity_filter(Some(opportunity_id));
                    clamp_cursor(view_data);
                    set_status(state, "filtered to selected opportunity");
                }
                None => set_status(state, "selected sample has no opportunity"),
            }
        }
        KeyCode::Char('g') => {
            if let Some(id) = selected_sample_id(view_data) {
                navigate(state, runtime, &NavTarget::Sample(id));
            }
        }
        KeyCode::Char('b') => {
            let account = view_data
                .grid
                .derive_view(&view_data.samples)
                .get(view_data.cursor_row)
                .map(|sample| sample.account.account_id.clone());
            if let Some(account_id) = account {
                navigate(state, runtime, &NavTarget::Account(account_id));
            }
        }
        KeyCode::Char('u') => navigate(state, runtime, &NavTarget::OpportunityList),
        KeyCode::Char('1') => quick_create(state, runtime, QuickCreateKind::Opportunity),
        KeyCode::Char('2') => quick_create(state, runtime, QuickCreateKind::Sample),
        KeyCode::Char('3') => quick_create(state, runtime, QuickCreateKind::Product),
        KeyCode::Char('4') => quick_create(state, runtime, QuickCreateKind::Account),
        KeyCode::Char('5') => quick_create(state, runtime, QuickCreateKind::ServiceCase),
        KeyCode::Char('r') => match refresh_view_data(runtime, view_data) {
            Ok(()) => set_status(state, "refreshed"),
            Err(error) => set_status(state, format!("refresh failed: {error:#}")),
        },
        KeyCode::Char('?') => {
            view_data.help_visible = true;
        }
        _ => {}
    }
    false
}

fn navigate<R: AppRuntime>(state: &mut AppState, runtime: &mut R, target: &NavTarget) {
    match runtime.navigate(target) {
        Ok(()) => set_status(state, "opened in CRM"),
        Err(error) => set_status(state, format!("navigation failed: {error:#}")),
    }
}

fn quick_create<R: AppRuntime>(state: &mut AppState, runtime: &mut R, kind: QuickCreateKind) {
    navigate(state, runtime, &NavTarget::QuickCreate(kind));
}

fn begin_inline_edit(state: &mut AppState, view_data: &mut ViewData) {
    let Some(column) = selected_column(view_data) else {
        return;
    };
    let Some(field) = editable_field(column) else {
        set_status(state, "column is not editable");
        return;
    };
    let Some(id) = selected_sample_id(view_data) else {
        return;
    };
    let status = view_data.grid.begin_cell_edit(&view_data.samples, &id, field);
    set_status(state, status.message());
}

fn handle_search_key(view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            view_data.search_active = false;
        }
        KeyCode::Backspace => {
            let mut term = view_data.grid.search_term().to_owned();
            term.pop();
            view_data.grid.set_search_term(&term);
            view_data.cursor_row = 0;
        }
        KeyCode::Char(ch) => {
            let mut term = view_data.grid.search_term().to_owned();
            term.push(ch);
            view_data.grid.set_search_term(&term);
            view_data.cursor_row = 0;
        }
        _ => {}
    }
}

fn handle_cell_edit_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            let status = view_data.grid.cancel_cell_edit();
            set_status(state, status.message());
        }
        KeyCode::Enter => {
            let outcome = view_data.grid.commit_cell_edit(&view_data.samples, runtime);
            match outcome {
                CommitOutcome::Saved => {
                    match refresh_view_data(runtime, view_data) {
                        Ok(()) => set_status(state, "saved"),
                        Err(error) => {
                            set_status(state, format!("saved, refresh failed: {error:#}"));
                        }
                    }
                }
                CommitOutcome::Failed(message) => {
                    set_status(state, format!("save failed: {message}"));
                }
                CommitOutcome::NoActiveEdit => {}
            }
        }
        KeyCode::Backspace => {
            let mut buffer = view_data.grid.edit_buffer().to_owned();
            buffer.pop();
            view_data.grid.set_edit_buffer(buffer);
        }
        KeyCode::Char(ch) => {
            let mut buffer = view_data.grid.edit_buffer().to_owned();
            buffer.push(ch);
            view_data.grid.set_edit_buffer(buffer);
        }
        _ => {}
    }
}

fn handle_confirm_delete_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    id: &SampleId,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            let outcome = view_data.grid.delete_record(id, runtime);
            state.dispatch(AppCommand::ExitToNav);
            match outcome {
                DeleteOutcome::Deleted => match refresh_view_data(runtime, view_data) {
                    Ok(()) => set_status(state, "sample deleted"),
                    Err(error) => {
                        set_status(state, format!("deleted, refresh failed: {error:#}"));
                    }
                },
                DeleteOutcome::Failed(message) => {
                    set_status(state, format!("delete failed: {message}"));
                }
            }
        }
        KeyCode::Char('n') | KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
        }
        _ => {}
    }
}

fn handle_column_config_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('c') => {
            clamp_cursor(view_data);
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_data.column_cursor = (view_data.column_cursor + 1).min(ColumnKey::ALL.len() - 1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.column_cursor = view_data.column_cursor.saturating_sub(1);
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            let column = ColumnKey::ALL[view_data.column_cursor];
            let status = view_data.grid.toggle_column(column);
            set_status(state, status.message());
        }
        KeyCode::Char('a') => {
            let status = view_data.grid.show_all_columns();
            set_status(state, status.message());
        }
        KeyCode::Char('z') => {
            let status = view_data.grid.hide_all_columns();
            set_status(state, status.message());
        }
        _ => {}
    }
}

/// Loads one lookup collection, degrading a failure to an empty list so
/// the form still opens.
fn load_lookup<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    kind: EntityKind,
) -> Vec<ComboOption> {
    match runtime.list_entities(kind) {
        Ok(entries) => entries.iter().map(ComboOption::entity).collect(),
        Err(error) => {
            set_status(
                state,
                format!("{} lookup unavailable: {error:#}", kind.label()),
            );
            Vec::new()
        }
    }
}

fn code_options(codes: &[(&str, &str)]) -> Vec<ComboOption> {
    codes
        .iter()
        .map(|(code, name)| ComboOption::code(code, name))
        .collect()
}

fn build_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    kind: FormKind,
    draft: SampleDraft,
    editing_id: Option<SampleId>,
) -> FormUiState {
    let mut form = FormUiState {
        kind,
        editing_id,
        field: 0,
        account: Combobox::new(load_lookup(state, runtime, EntityKind::Account)),
        product: Combobox::new(load_lookup(state, runtime, EntityKind::Product)),
        employee: Combobox::new(load_lookup(state, runtime, EntityKind::Employee)),
        opportunity: Combobox::new(load_lookup(state, runtime, EntityKind::Opportunity)),
        service_case: Combobox::new(load_lookup(state, runtime, EntityKind::ServiceCase)),
        currency: Combobox::new(code_options(&CURRENCIES)),
        uom: Combobox::new(code_options(&UNITS_OF_MEASURE)),
        draft,
    };
    form.account.set_selected_key(Some(&form.draft.account_id));
    form.product.set_selected_key(Some(&form.draft.product_id));
    form.employee.set_selected_key(Some(&form.draft.employee_id));
    form.opportunity
        .set_selected_key(Some(&form.draft.opportunity_id));
    form.service_case
        .set_selected_key(Some(&form.draft.service_case_id));
    form.currency
        .set_selected_key(Some(&form.draft.currency_code));
    form.uom.set_selected_key(Some(&form.draft.uom_code));
    form
}

fn open_create_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    let mut form = build_form(state, runtime, FormKind::Create, SampleDraft::blank(), None);
    if let Some(opportunity_id) = view_data.grid.filters.opportunity_id.clone() {
        apply_opportunity_context(state, runtime, &mut form, &opportunity_id);
    }
    view_data.form = Some(form);
    state.dispatch(AppCommand::OpenForm(FormKind::Create));
}

fn open_edit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    id: &SampleId,
) {
    let Some(sample) = view_data.samples.iter().find(|sample| sample.id == *id) else {
        return;
    };
    let draft = SampleDraft::from_sample(sample);
    let form = build_form(state, runtime, FormKind::Edit, draft, Some(id.clone()));
    view_data.form = Some(form);
    state.dispatch(AppCommand::OpenForm(FormKind::Edit));
}

/// Pre-fills a create form from a linked opportunity: the opportunity
/// itself, its account (plus that account's address as the ship-to),
/// and the first product on the opportunity. Edit forms never re-run
/// this path.
fn apply_opportunity_context<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    form: &mut FormUiState,
    opportunity_id: &OpportunityId,
) {
    form.draft.opportunity_id = opportunity_id.as_str().to_owned();
    form.opportunity
        .set_selected_key(Some(opportunity_id.as_str()));

    let snapshot = match runtime.fetch_opportunity(opportunity_id) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            set_status(state, "linked opportunity not found");
            return;
        }
        Err(error) => {
            set_status(state, format!("opportunity lookup failed: {error:#}"));
            return;
        }
    };

    // The linked opportunity may not be in the first page of options.
    let missing = !form
        .opportunity
        .options()
        .iter()
        .any(|option| option.key == opportunity_id.as_str());
    if missing {
        let mut options = form.opportunity.options().to_vec();
        options.insert(
            0,
            ComboOption {
                key: opportunity_id.as_str().to_owned(),
                primary_label: snapshot.name.clone().unwrap_or_default(),
                secondary_label: snapshot.display_id.clone(),
            },
        );
        form.opportunity.set_options(options);
    }

    if let Some(account) = &snapshot.account {
        form.draft.account_id = account.id.clone();
        let account_missing = !form
            .account
            .options()
            .iter()
            .any(|option| option.key == account.id);
        if account_missing {
            let mut options = form.account.options().to_vec();
            options.insert(0, ComboOption::entity(account));
            form.account.set_options(options);
        }
        form.account.set_selected_key(Some(&account.id));
        prefill_ship_to(state, runtime, form, &AccountId::new(account.id.clone()));
    }

    // The product list narrows to the opportunity's items, de-duplicated.
    let mut product_options: Vec<ComboOption> = Vec::new();
    for item in &snapshot.items {
        let Some(product_id) = &item.product_id else {
            continue;
        };
        if product_options
            .iter()
            .any(|option| option.key == product_id.as_str())
        {
            continue;
        }
        product_options.push(ComboOption {
            key: product_id.as_str().to_owned(),
            primary_label: item.product_description.clone().unwrap_or_default(),
            secondary_label: item.product_display_id.clone(),
        });
    }
    if !product_options.is_empty() {
        form.product.set_options(product_options);
    }
}

fn prefill_ship_to<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    form: &mut FormUiState,
    account_id: &AccountId,
) {
    match runtime.fetch_account(account_id) {
        Ok(Some(details)) => {
            if let Some(address) = details.formatted_address {
                form.draft.ship_to_address = address;
            }
        }
        Ok(None) => {}
        Err(error) => {
            set_status(state, format!("account lookup failed: {error:#}"));
        }
    }
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        submit_form(state, runtime, view_data);
        return;
    }

    let field = form.active_field();
    if field.is_combo() {
        let open = form.combo(field).is_some_and(Combobox::is_open);
        if key.code == KeyCode::Esc && !open {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        handle_combo_field_key(state, runtime, form, field, key);
        return;
    }

    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down | KeyCode::Enter => form.move_field(1),
        KeyCode::BackTab | KeyCode::Up => form.move_field(-1),
        KeyCode::Char(' ') if field == FormField::Hazardous => {
            form.draft.hazardous = !form.draft.hazardous;
        }
        KeyCode::Backspace => {
            if let Some(buffer) = form.text_buffer_mut(field) {
                buffer.pop();
            }
        }
        KeyCode::Char(ch) => {
            if let Some(buffer) = form.text_buffer_mut(field) {
                buffer.push(ch);
            }
        }
        _ => {}
    }
}

fn handle_combo_field_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    form: &mut FormUiState,
    field: FormField,
    key: KeyEvent,
) {
    let events = {
        let Some(combo) = form.combo_mut(field) else {
            return;
        };
        match key.code {
            KeyCode::Esc => combo.dispatch(ComboboxCommand::Key(ComboboxKey::Escape)),
            KeyCode::Down => combo.dispatch(ComboboxCommand::Key(ComboboxKey::Down)),
            KeyCode::Up => combo.dispatch(ComboboxCommand::Key(ComboboxKey::Up)),
            KeyCode::Enter => {
                if combo.is_open() {
                    combo.dispatch(ComboboxCommand::Key(ComboboxKey::Enter))
                } else {
                    combo.dispatch(ComboboxCommand::Focus)
                }
            }
            KeyCode::Tab => {
                let events = combo.dispatch(ComboboxCommand::Blur);
                form.move_field(1);
                events
            }
            KeyCode::BackTab => {
                let events = combo.dispatch(ComboboxCommand::Blur);
                form.move_field(-1);
                events
            }
            KeyCode::Backspace => {
                let mut search = combo.search_text().to_owned();
                search.pop();
                combo.dispatch(ComboboxCommand::Input(search))
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                combo.dispatch(ComboboxCommand::Clear)
            }
            KeyCode::Char(ch) => {
                let mut search = combo.search_text().to_owned();
                search.push(ch);
                combo.dispatch(ComboboxCommand::Input(search))
            }
            _ => return,
        }
    };

    for event in events {
        let ComboboxEvent::SelectionChanged(selected_key) = event;
        apply_combo_selection(state, runtime, form, field, &selected_key);
    }
}

/// Reflects a combobox selection back into the draft and the widget,
/// then runs the field's side effects.
fn apply_combo_selection<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    form: &mut FormUiState,
    field: FormField,
    selected_key: &str,
) {
    let key = (!selected_key.is_empty()).then(|| selected_key.to_owned());
    if let Some(combo) = form.combo_mut(field) {
        combo.set_selected_key(key.as_deref());
    }
    let value = key.clone().unwrap_or_default();

    match field {
        FormField::Account => {
            form.draft.account_id = value;
            if let Some(account_key) = key {
                prefill_ship_to(state, runtime, form, &AccountId::new(account_key));
            }
        }
        FormField::Product => form.draft.product_id = value,
        FormField::Employee => form.draft.employee_id = value,
        FormField::Opportunity => {
            form.draft.opportunity_id = value;
            if form.kind == FormKind::Create
                && let Some(opportunity_key) = key
            {
                apply_opportunity_context(
                    state,
                    runtime,
                    form,
                    &OpportunityId::new(opportunity_key),
                );
            }
        }
        FormField::ServiceCase => form.draft.service_case_id = value,
        FormField::Currency => {
            if !value.is_empty() {
                form.draft.currency_code = value;
            }
        }
        FormField::Uom => {
            if !value.is_empty() {
                form.draft.uom_code = value;
            }
        }
        _ => {}
    }
}

fn submit_form<R: AppRuntime>(state: &mut AppState, runtime: &mut R, view_data: &mut ViewData) {
    let Some(form) = view_data.form.as_ref() else {
        return;
    };
    let kind = form.kind;
    let editing_id = form.editing_id.clone();
    let draft = form.draft.clone();

    let validation = match kind {
        FormKind::Create => draft.validate_create(),
        FormKind::Edit => draft.validate_edit(),
    };
    if let Err(error) = validation {
        set_status(state, format!("{error:#}"));
        return;
    }

    let payload = draft.to_payload();
    let result = match (&kind, &editing_id) {
        (FormKind::Edit, Some(id)) => runtime.update(id, &payload),
        _ => runtime.create(&payload),
    };

    match result {
        Ok(()) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            match refresh_view_data(runtime, view_data) {
                Ok(()) => set_status(
                    state,
                    match kind {
                        FormKind::Create => "sample created",
                        FormKind::Edit => "sample saved",
                    },
                ),
                Err(error) => set_status(state, format!("saved, refresh failed: {error:#}")),
            }
        }
        Err(error) => set_status(state, format!("save failed: {error:#}")),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(view_data))
        .block(Block::default().title("sampledesk").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    if let Some(form) = &view_data.form {
        let title = match form.kind {
            FormKind::Create => "new sample",
            FormKind::Edit => "edit sample",
        };
        let body = Paragraph::new(render_form_text(form))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(body, layout[1]);
    } else {
        render_grid(frame, layout[1], view_data);
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if state.dashboard == DashboardVisibility::Visible {
        let area = centered_rect(80, 70, frame.area());
        frame.render_widget(Clear, area);
        let dashboard = Paragraph::new(render_dashboard_text(
            &view_data.samples,
            OffsetDateTime::now_utc().date(),
        ))
        .block(
            Block::default()
                .title("dashboard")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(dashboard, area);
    }

    if let AppMode::ConfirmDelete(id) = &state.mode {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let confirm = Paragraph::new(render_confirm_delete_text(view_data, id))
            .block(Block::default().title("delete").borders(Borders::ALL));
        frame.render_widget(confirm, area);
    }

    if state.mode == AppMode::ColumnConfig {
        let area = centered_rect(50, 75, frame.area());
        frame.render_widget(Clear, area);
        let columns = Paragraph::new(render_column_config_text(view_data))
            .block(Block::default().title("columns").borders(Borders::ALL));
        frame.render_widget(columns, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn header_text(view_data: &ViewData) -> String {
    let mut parts = Vec::new();
    let term = view_data.grid.search_term();
    if view_data.search_active {
        parts.push(format!("search: {term}▏"));
    } else if !term.is_empty() {
        parts.push(format!("search: {term}"));
    }
    if view_data.grid.filters.account_id.is_some() {
        parts.push("account filter".to_owned());
    }
    if view_data.grid.filters.opportunity_id.is_some() {
        parts.push("opportunity filter".to_owned());
    }
    if parts.is_empty() {
        "press / to search, ? for help".to_owned()
    } else {
        parts.join("  |  ")
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let today = OffsetDateTime::now_utc().date();
    let visible: Vec<ColumnKey> = view_data.grid.visible_columns().collect();
    let rows_data = view_data.grid.derive_view(&view_data.samples);

    let widths = vec![Constraint::Min(8); visible.len().max(1)];
    let header_cells = visible.iter().map(|column| {
        Cell::from(header_label(view_data.grid.sort(), *column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells);

    let rows = rows_data.iter().enumerate().map(|(row_index, sample)| {
        let selected_row = row_index == view_data.cursor_row;
        let cells = visible
            .iter()
            .enumerate()
            .map(|(col_index, column)| {
                let editing_here = editable_field(*column)
                    .is_some_and(|field| view_data.grid.is_editing(&sample.id, field));
                let text = if editing_here {
                    format!("{}▏", view_data.grid.edit_buffer())
                } else {
                    cell_text(sample, *column, today)
                };

                let mut style = Style::default();
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && col_index == view_data.cursor_col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                if editing_here {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(text).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let title = format!("samples ({})", rows_data.len());
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn header_label(sort: Option<(SortKey, SortDirection)>, column: ColumnKey) -> String {
    let mut label = column.label().to_owned();
    if let Some((active, direction)) = sort
        && column.sort_key() == Some(active)
    {
        label.push(' ');
        label.push_str(match direction {
            SortDirection::Asc => SORT_MARK_ASC,
            SortDirection::Desc => SORT_MARK_DESC,
        });
    }
    label
}

fn cell_text(sample: &Sample, column: ColumnKey, today: Date) -> String {
    match column {
        ColumnKey::Name => sample.sample_name.clone(),
        ColumnKey::Status => sample.status.clone(),
        ColumnKey::DueDate => sample.due_date.clone(),
        ColumnKey::Cost => {
            let amount = sample.cost_of_sample.amount.trim();
            if amount.is_empty() {
                String::new()
            } else {
                format!("{amount} {}", sample.cost_of_sample.currency_code)
            }
        }
        ColumnKey::Account => sample.account.name.clone().unwrap_or_default(),
        ColumnKey::Product => sample.product.name.clone().unwrap_or_default(),
        ColumnKey::Employee => sample.employee.name.clone().unwrap_or_default(),
        ColumnKey::ShipTo => sample.ship_to_address.clone(),
        ColumnKey::Overdue => {
            if sample.is_overdue(today) {
                "overdue".to_owned()
            } else {
                String::new()
            }
        }
        ColumnKey::Hazardous => {
            if sample.hazardous {
                "yes".to_owned()
            } else {
                "no".to_owned()
            }
        }
        ColumnKey::HazardousReason => sample.hazardous_reason.clone().unwrap_or_default(),
        ColumnKey::SampleType => sample.sample_type.clone(),
        ColumnKey::PackagingWidth => sample.packaging_width.clone().unwrap_or_default(),
        ColumnKey::PackagingHeight => sample.packaging_height.clone().unwrap_or_default(),
        ColumnKey::PackagingMaterial => sample.packaging_material.clone().unwrap_or_default(),
        ColumnKey::Quantity => {
            let amount = sample.number_of_samples.amount.trim();
            if amount.is_empty() {
                String::new()
            } else {
                format!("{amount} {}", sample.number_of_samples.uom_code)
            }
        }
        ColumnKey::Opportunity => sample
            .opportunity
            .as_ref()
            .and_then(|opp| opp.name.clone())
            .unwrap_or_default(),
        ColumnKey::ServiceCase => sample
            .service_case
            .as_ref()
            .and_then(|case| case.name.clone())
            .unwrap_or_default(),
        ColumnKey::CreatedAt => sample.created_at.clone().unwrap_or_default(),
        ColumnKey::CreatedBy => sample.created_by.clone().unwrap_or_default(),
        ColumnKey::ModifiedAt => sample.modified_at.clone().unwrap_or_default(),
        ColumnKey::ModifiedBy => sample.modified_by.clone().unwrap_or_default(),
    }
}

fn render_form_text(form: &FormUiState) -> String {
    let mut lines = Vec::new();
    for (index, field) in FormField::ALL.iter().enumerate() {
        let marker = if index == form.field { FIELD_CURSOR } else { " " };
        let value = form_field_value(form, *field);
        lines.push(format!("{marker} {:<18} {value}", field.label()));

        if let Some(combo) = form.combo(*field)
            && index == form.field
            && combo.is_open()
        {
            if !combo.search_text().is_empty() {
                lines.push(format!("    search: {}", combo.search_text()));
            }
            for (option_index, option) in combo.filtered().iter().take(8).enumerate() {
                let focus = if combo.focused_index() == Some(option_index) {
                    FIELD_CURSOR
                } else {
                    " "
                };
                let secondary = option
                    .secondary_label
                    .as_ref()
                    .map(|label| format!(" ({label})"))
                    .unwrap_or_default();
                lines.push(format!("    {focus} {}{secondary}", option.primary_label));
            }
        }
    }
    lines.push(String::new());
    lines.push("tab/shift-tab fields, enter opens lists, ctrl-s saves, esc cancels".to_owned());
    lines.join("\n")
}

fn form_field_value(form: &FormUiState, field: FormField) -> String {
    if let Some(combo) = form.combo(field) {
        if combo.is_open() {
            return format!("{}▏", combo.search_text());
        }
        return combo.display_value();
    }
    match field {
        FormField::Name => form.draft.sample_name.clone(),
        FormField::Status => form.draft.status.clone(),
        FormField::SampleType => form.draft.sample_type.clone(),
        FormField::DueDate => form.draft.due_date.clone(),
        FormField::ShipTo => form.draft.ship_to_address.clone(),
        FormField::Cost => form.draft.cost_amount.clone(),
        FormField::Quantity => form.draft.quantity_amount.clone(),
        FormField::Hazardous => {
            if form.draft.hazardous {
                "yes".to_owned()
            } else {
                "no".to_owned()
            }
        }
        FormField::HazardousReason => form.draft.hazardous_reason.clone(),
        FormField::PackagingWidth => form.draft.packaging_width.clone(),
        FormField::PackagingHeight => form.draft.packaging_height.clone(),
        FormField::PackagingMaterial => form.draft.packaging_material.clone(),
        _ => String::new(),
    }
}

fn render_confirm_delete_text(view_data: &ViewData, id: &SampleId) -> String {
    let name = view_data
        .samples
        .iter()
        .find(|sample| sample.id == *id)
        .map(|sample| sample.sample_name.clone())
        .unwrap_or_else(|| id.to_string());
    format!("delete {name:?}?\n\ny confirms, n cancels")
}

fn render_column_config_text(view_data: &ViewData) -> String {
    let mut lines = Vec::new();
    for (index, column) in ColumnKey::ALL.iter().enumerate() {
        let marker = if index == view_data.column_cursor {
            FIELD_CURSOR
        } else {
            " "
        };
        let check = if view_data.grid.is_column_visible(*column) {
            "[x]"
        } else {
            "[ ]"
        };
        lines.push(format!("{marker} {check} {}", column.label()));
    }
    lines.push(String::new());
    lines.push("space toggles, a shows all, z hides all, esc closes".to_owned());
    lines.join("\n")
}

/// Plain-text aggregates over the current snapshot.
fn render_dashboard_text(samples: &[Sample], today: Date) -> String {
    let mut by_currency: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_account: BTreeMap<String, usize> = BTreeMap::new();
    let mut overdue = 0usize;

    for sample in samples {
        if let Ok(amount) = sample.cost_of_sample.amount.trim().parse::<f64>() {
            *by_currency
                .entry(sample.cost_of_sample.currency_code.clone())
                .or_default() += amount;
        }
        *by_status.entry(sample.status.clone()).or_default() += 1;
        if let Some(account) = &sample.account.name {
            *by_account.entry(account.clone()).or_default() += 1;
        }
        if sample.is_overdue(today) {
            overdue += 1;
        }
    }

    let mut lines = vec![
        format!("samples: {}", samples.len()),
        format!("overdue: {overdue}"),
        String::new(),
        "cost by currency:".to_owned(),
    ];
    for (currency, total) in &by_currency {
        lines.push(format!("  {currency}: {total:.2}"));
    }
    lines.push(String::new());
    lines.push("by status:".to_owned());
    for (status, count) in &by_status {
        lines.push(format!("  {status}: {count}"));
    }
    lines.push(String::new());
    lines.push("by account:".to_owned());
    for (account, count) in &by_account {
        lines.push(format!("  {account}: {count}"));
    }
    lines.join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if let Some(line) = &state.status_line {
        return line.clone();
    }
    if matches!(view_data.grid.edit(), EditState::Editing { .. }) {
        return "enter saves, esc cancels".to_owned();
    }
    match state.mode {
        AppMode::Nav => "e edits cell, n new, enter opens, d deletes, q quits".to_owned(),
        AppMode::Form(_) => "ctrl-s saves, esc cancels".to_owned(),
        AppMode::ConfirmDelete(_) => "y confirms, n cancels".to_owned(),
        AppMode::ColumnConfig => "space toggles, esc closes".to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "  j/k, h/l   move cursor\n  \
       /          search\n  \
       s          sort by column\n  \
       e          edit cell in place\n  \
       enter/E    open edit form\n  \
       n          new sample\n  \
       d          delete sample\n  \
       c          configure columns\n  \
       a/O        filter to account / opportunity\n  \
       o          clear context filters\n  \
       D          dashboard\n  \
       g/b/u      open sample / account / opportunities in CRM\n  \
       1-5        quick create in CRM\n  \
       r          refresh\n  \
       q          quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        FormField, ViewData, cell_text, handle_key_event, header_label, refresh_view_data,
        render_dashboard_text, status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use sampledesk_app::{
        AppMode, AppState, ColumnKey, FormKind, OpportunityId, SortDirection, SortKey,
    };
    use sampledesk_testkit::InMemoryCrm;
    use time::{Date, Month};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn setup() -> (AppState, InMemoryCrm, ViewData) {
        let mut state = AppState::default();
        let mut runtime = InMemoryCrm::demo(11, 12);
        let mut view_data = ViewData::default();
        refresh_view_data(&mut runtime, &mut view_data).expect("initial load should succeed");
        state.status_line = None;
        (state, runtime, view_data)
    }

    fn type_text(
        state: &mut AppState,
        runtime: &mut InMemoryCrm,
        view_data: &mut ViewData,
        text: &str,
    ) {
        for ch in text.chars() {
            handle_key_event(state, runtime, view_data, key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn sort_key_toggles_from_the_selected_column() {
        let (mut state, mut runtime, mut view_data) = setup();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('s')));
        assert_eq!(
            view_data.grid.sort(),
            Some((SortKey::Name, SortDirection::Asc))
        );

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('s')));
        assert_eq!(
            view_data.grid.sort(),
            Some((SortKey::Name, SortDirection::Desc))
        );

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('s')));
        assert_eq!(view_data.grid.sort(), None);
    }

    #[test]
    fn search_typing_narrows_the_view() {
        let (mut state, mut runtime, mut view_data) = setup();
        let target = view_data.samples[0].sample_name.clone();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('/')));
        assert!(view_data.search_active);
        type_text(&mut state, &mut runtime, &mut view_data, &target);
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter));

        assert!(!view_data.search_active);
        let view = view_data.grid.derive_view(&view_data.samples);
        assert!(!view.is_empty());
        assert!(
            view.iter()
                .all(|sample| sample.sample_name.contains(&target))
        );
    }

    #[test]
    fn inline_edit_commit_updates_the_record_and_refetches() {
        let (mut state, mut runtime, mut view_data) = setup();
        let target = view_data.samples[0].id.clone();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('e')));
        assert!(view_data.grid.active_edit().is_some());

        for _ in 0..64 {
            handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Backspace));
        }
        type_text(&mut state, &mut runtime, &mut view_data, "Renamed batch");
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter));

        assert!(view_data.grid.active_edit().is_none());
        let updated = view_data
            .samples
            .iter()
            .find(|sample| sample.id == target)
            .expect("sample should survive the edit");
        assert_eq!(updated.sample_name, "Renamed batch");
        assert_eq!(state.status_line.as_deref(), Some("saved"));
    }

    #[test]
    fn inline_edit_failure_reports_and_keeps_the_snapshot() {
        let (mut state, mut runtime, mut view_data) = setup();
        let before = view_data.samples.clone();
        runtime.fail_mutations = true;

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('e')));
        type_text(&mut state, &mut runtime, &mut view_data, "x");
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter));

        assert!(view_data.grid.active_edit().is_none());
        assert_eq!(view_data.samples, before);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.starts_with("save failed"))
        );
    }

    #[test]
    fn delete_flow_requires_confirmation() {
        let (mut state, mut runtime, mut view_data) = setup();
        let before = view_data.samples.len();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('d')));
        assert!(matches!(state.mode, AppMode::ConfirmDelete(_)));

        // Declining leaves everything in place.
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(view_data.samples.len(), before);

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('d')));
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('y')));
        assert_eq!(view_data.samples.len(), before - 1);
        assert_eq!(state.status_line.as_deref(), Some("sample deleted"));
    }

    #[test]
    fn create_form_opens_with_defaults_and_lookups() {
        let (mut state, mut runtime, mut view_data) = setup();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));
        assert_eq!(state.mode, AppMode::Form(FormKind::Create));

        let form = view_data.form.as_ref().expect("form should be open");
        assert_eq!(form.draft.status, "OPEN");
        assert_eq!(form.draft.currency_code, "EUR");
        assert!(!form.account.options().is_empty());
        assert!(!form.currency.options().is_empty());
    }

    #[test]
    fn account_selection_prefills_the_ship_to_address() {
        let (mut state, mut runtime, mut view_data) = setup();
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));

        let account_field = FormField::ALL
            .iter()
            .position(|field| *field == FormField::Account)
            .expect("account field should exist");
        view_data.form.as_mut().expect("form should be open").field = account_field;

        // Open the list and take the first entry.
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Down));
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter));

        let form = view_data.form.as_ref().expect("form should be open");
        assert!(!form.draft.account_id.is_empty());
        let expected = runtime.accounts[0]
            .formatted_address
            .clone()
            .expect("demo accounts carry addresses");
        assert_eq!(form.draft.ship_to_address, expected);
    }

    #[test]
    fn opportunity_context_prefills_the_create_form() {
        let (mut state, mut runtime, mut view_data) = setup();
        let opportunity = runtime.opportunities[0].clone();
        view_data
            .grid
            .set_opportunity_filter(Some(opportunity.id.clone()));

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));

        let form = view_data.form.as_ref().expect("form should be open");
        assert_eq!(form.draft.opportunity_id, opportunity.id.as_str());
        let account = opportunity.account.expect("demo opportunities have accounts");
        assert_eq!(form.draft.account_id, account.id);
        assert!(!form.draft.ship_to_address.is_empty());
        // The product list narrows to the opportunity's items, but no
        // product is chosen for the user.
        assert!(form.draft.product_id.is_empty());
        assert!(!form.product.options().is_empty());
        assert!(form.product.options().iter().all(|option| {
            opportunity.items.iter().any(|item| {
                item.product_id
                    .as_ref()
                    .is_some_and(|id| id.as_str() == option.key)
            })
        }));
    }

    #[test]
    fn opportunity_context_restores_a_missing_account_option() {
        let (mut state, mut runtime, mut view_data) = setup();
        let opportunity = runtime.opportunities[0].clone();
        let account = opportunity
            .account
            .clone()
            .expect("demo opportunities have accounts");
        runtime
            .accounts
            .retain(|details| details.id.as_str() != account.id);
        view_data
            .grid
            .set_opportunity_filter(Some(opportunity.id.clone()));

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));

        let form = view_data.form.as_ref().expect("form should be open");
        assert_eq!(form.account.options()[0].key, account.id);
        assert_eq!(form.draft.account_id, account.id);
        assert!(!form.account.display_value().is_empty());
    }

    #[test]
    fn edit_form_submit_saves_through_the_runtime() {
        let (mut state, mut runtime, mut view_data) = setup();
        let target = view_data.samples[0].id.clone();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter));
        assert_eq!(state.mode, AppMode::Form(FormKind::Edit));

        {
            let form = view_data.form.as_mut().expect("form should be open");
            form.draft.sample_name = "Edited via form".to_owned();
        }
        handle_key_event(&mut state, &mut runtime, &mut view_data, ctrl('s'));

        assert_eq!(state.mode, AppMode::Nav);
        assert!(view_data.form.is_none());
        let updated = view_data
            .samples
            .iter()
            .find(|sample| sample.id == target)
            .expect("sample should survive the edit");
        assert_eq!(updated.sample_name, "Edited via form");
    }

    #[test]
    fn invalid_draft_keeps_the_form_open_with_a_message() {
        let (mut state, mut runtime, mut view_data) = setup();
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));

        handle_key_event(&mut state, &mut runtime, &mut view_data, ctrl('s'));

        assert!(view_data.form.is_some());
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|line| line.contains("required"))
        );
    }

    #[test]
    fn lookup_failure_degrades_to_empty_option_lists() {
        let (mut state, mut runtime, mut view_data) = setup();
        runtime.samples.clear();
        // An empty directory still opens the form.
        runtime.accounts.clear();
        runtime.products.clear();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')));
        let form = view_data.form.as_ref().expect("form should be open");
        assert!(form.account.options().is_empty());
        assert!(form.product.options().is_empty());
        assert!(!form.employee.options().is_empty());
    }

    #[test]
    fn column_config_hide_all_keeps_the_name_column() {
        let (mut state, mut runtime, mut view_data) = setup();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('c')));
        assert_eq!(state.mode, AppMode::ColumnConfig);

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('z')));
        assert!(view_data.grid.is_column_visible(ColumnKey::Name));
        assert_eq!(view_data.grid.visible_columns().count(), 1);

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Esc));
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(view_data.cursor_col, 0);
    }

    #[test]
    fn quick_create_routes_through_the_navigator() {
        let (mut state, mut runtime, mut view_data) = setup();

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('1')));
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('g')));

        assert_eq!(runtime.nav_log.len(), 2);
        assert!(matches!(
            runtime.nav_log[0],
            sampledesk_app::NavTarget::QuickCreate(sampledesk_app::QuickCreateKind::Opportunity)
        ));
        assert!(matches!(
            runtime.nav_log[1],
            sampledesk_app::NavTarget::Sample(_)
        ));
    }

    #[test]
    fn opportunity_filter_scopes_the_view() {
        let (mut state, mut runtime, mut view_data) = setup();
        let linked = view_data
            .samples
            .iter()
            .find(|sample| sample.opportunity.is_some())
            .expect("demo data links some samples to opportunities")
            .clone();
        view_data.cursor_row = view_data
            .grid
            .derive_view(&view_data.samples)
            .iter()
            .position(|sample| sample.id == linked.id)
            .expect("linked sample should be visible");

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('O')));
        let expected: OpportunityId = linked
            .opportunity
            .expect("linked sample carries an opportunity")
            .opportunity_id;
        let view = view_data.grid.derive_view(&view_data.samples);
        assert!(!view.is_empty());
        assert!(view.iter().all(|sample| {
            sample
                .opportunity
                .as_ref()
                .is_some_and(|opp| opp.opportunity_id == expected)
        }));

        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('o')));
        assert!(!view_data.grid.has_external_filters());
    }

    #[test]
    fn dashboard_text_aggregates_the_snapshot() {
        let (_state, _runtime, view_data) = setup();
        let today = Date::from_calendar_date(2026, Month::June, 15).expect("valid date");
        let text = render_dashboard_text(&view_data.samples, today);

        assert!(text.contains(&format!("samples: {}", view_data.samples.len())));
        assert!(text.contains("cost by currency:"));
        assert!(text.contains("by status:"));
    }

    #[test]
    fn header_labels_carry_sort_markers() {
        let (mut state, mut runtime, mut view_data) = setup();
        handle_key_event(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('s')));

        let label = header_label(view_data.grid.sort(), ColumnKey::Name);
        assert!(label.ends_with('▲'));
        let other = header_label(view_data.grid.sort(), ColumnKey::Cost);
        assert_eq!(other, "Cost");
    }

    #[test]
    fn overdue_cell_reflects_due_date_and_status() {
        let (_state, _runtime, view_data) = setup();
        let mut sample = view_data.samples[0].clone();
        sample.due_date = "2026-01-01".to_owned();
        sample.status = "OPEN".to_owned();
        let today = Date::from_calendar_date(2026, Month::June, 15).expect("valid date");
        assert_eq!(cell_text(&sample, ColumnKey::Overdue, today), "overdue");

        sample.status = "DELIVERED".to_owned();
        assert_eq!(cell_text(&sample, ColumnKey::Overdue, today), "");
    }

    #[test]
    fn status_line_falls_back_to_a_contextual_hint() {
        let (state, _runtime, view_data) = setup();
        let text = status_text(&state, &view_data);
        assert!(text.contains("q quits"));
    }
}
