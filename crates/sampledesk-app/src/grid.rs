// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::ids::{AccountId, OpportunityId, SampleId};
use crate::model::{MutationSink, Sample, SamplePayload, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Status,
    DueDate,
    Cost,
    Account,
    Product,
    Employee,
}

impl SortKey {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Status => "status",
            Self::DueDate => "due date",
            Self::Cost => "cost",
            Self::Account => "account",
            Self::Product => "product",
            Self::Employee => "employee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnKey {
    Name,
    Status,
    DueDate,
    Cost,
    Account,
    Product,
    Employee,
    ShipTo,
    Overdue,
    Hazardous,
    HazardousReason,
    SampleType,
    PackagingWidth,
    PackagingHeight,
    PackagingMaterial,
    Quantity,
    Opportunity,
    ServiceCase,
    CreatedAt,
    CreatedBy,
    ModifiedAt,
    ModifiedBy,
}

impl ColumnKey {
    pub const ALL: [Self; 22] = [
        Self::Name,
        Self::Status,
        Self::DueDate,
        Self::Cost,
        Self::Account,
        Self::Product,
        Self::Employee,
        Self::ShipTo,
        Self::Overdue,
        Self::Hazardous,
        Self::HazardousReason,
        Self::SampleType,
        Self::PackagingWidth,
        Self::PackagingHeight,
        Self::PackagingMaterial,
        Self::Quantity,
        Self::Opportunity,
        Self::ServiceCase,
        Self::CreatedAt,
        Self::CreatedBy,
        Self::ModifiedAt,
        Self::ModifiedBy,
    ];

    pub const DEFAULT_VISIBLE: [Self; 9] = [
        Self::Name,
        Self::Status,
        Self::DueDate,
        Self::Cost,
        Self::Account,
        Self::Product,
        Self::Employee,
        Self::ShipTo,
        Self::Overdue,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Sample Name",
            Self::Status => "Status",
            Self::DueDate => "Due Date",
            Self::Cost => "Cost",
            Self::Account => "Account",
            Self::Product => "Product",
            Self::Employee => "Employee",
            Self::ShipTo => "Ship To",
            Self::Overdue => "Overdue",
            Self::Hazardous => "Hazardous",
            Self::HazardousReason => "Hazardous Reason",
            Self::SampleType => "Sample Type",
            Self::PackagingWidth => "Packaging Width",
            Self::PackagingHeight => "Packaging Height",
            Self::PackagingMaterial => "Packaging Material",
            Self::Quantity => "Number of Samples",
            Self::Opportunity => "Opportunity",
            Self::ServiceCase => "Service Case",
            Self::CreatedAt => "Created At",
            Self::CreatedBy => "Created By",
            Self::ModifiedAt => "Modified At",
            Self::ModifiedBy => "Modified By",
        }
    }

    pub const fn sort_key(self) -> Option<SortKey> {
        match self {
            Self::Name => Some(SortKey::Name),
            Self::Status => Some(SortKey::Status),
            Self::DueDate => Some(SortKey::DueDate),
            Self::Cost => Some(SortKey::Cost),
            Self::Account => Some(SortKey::Account),
            Self::Product => Some(SortKey::Product),
            Self::Employee => Some(SortKey::Employee),
            _ => None,
        }
    }
}

/// The fields that support edit-in-place inside a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellField {
    Name,
    Status,
    ShipTo,
}

impl CellField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "sample name",
            Self::Status => "status",
            Self::ShipTo => "ship-to address",
        }
    }

    pub fn current_value(self, sample: &Sample) -> String {
        match self {
            Self::Name => sample.sample_name.clone(),
            Self::Status => sample.status.clone(),
            Self::ShipTo => sample.ship_to_address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Editing {
        sample_id: SampleId,
        field: CellField,
    },
    Submitting,
}

/// Filters derived from context outside user search input (a linked
/// account or opportunity), matched by exact id equality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalFilters {
    pub account_id: Option<AccountId>,
    pub opportunity_id: Option<OpportunityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridStatus {
    SortAsc(&'static str),
    SortDesc(&'static str),
    SortCleared,
    EditStarted(&'static str),
    EditCancelled,
    ColumnShown(&'static str),
    ColumnHidden(&'static str),
    ColumnsShown,
    ColumnsHidden,
    FiltersCleared,
}

impl GridStatus {
    pub fn message(&self) -> String {
        match self {
            Self::SortAsc(column) => format!("sort {column} asc"),
            Self::SortDesc(column) => format!("sort {column} desc"),
            Self::SortCleared => "sort cleared".to_owned(),
            Self::EditStarted(field) => format!("editing {field}"),
            Self::EditCancelled => "edit cancelled".to_owned(),
            Self::ColumnShown(column) => format!("column {column} shown"),
            Self::ColumnHidden(column) => format!("column {column} hidden"),
            Self::ColumnsShown => "all columns shown".to_owned(),
            Self::ColumnsHidden => "columns hidden (name kept)".to_owned(),
            Self::FiltersCleared => "context filters cleared".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Mutation accepted; the caller must refetch the snapshot.
    Saved,
    /// Mutation rejected; edit state is back at Idle, no refetch.
    Failed(String),
    NoActiveEdit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deletion confirmed remotely; the caller must refetch.
    Deleted,
    Failed(String),
}

/// Owns the working view over the fetched sample snapshot: search,
/// external filters, sort, column visibility, and the single in-flight
/// cell edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    search_term: String,
    sort: Option<(SortKey, SortDirection)>,
    edit: EditState,
    edit_buffer: String,
    visible_columns: BTreeSet<ColumnKey>,
    pub filters: ExternalFilters,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort: None,
            edit: EditState::Idle,
            edit_buffer: String::new(),
            visible_columns: ColumnKey::DEFAULT_VISIBLE.into_iter().collect(),
            filters: ExternalFilters::default(),
        }
    }
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_owned();
    }

    pub fn set_account_filter(&mut self, id: Option<AccountId>) {
        self.filters.account_id = id;
    }

    pub fn set_opportunity_filter(&mut self, id: Option<OpportunityId>) {
        self.filters.opportunity_id = id;
    }

    pub fn clear_external_filters(&mut self) -> GridStatus {
        self.filters = ExternalFilters::default();
        GridStatus::FiltersCleared
    }

    pub fn has_external_filters(&self) -> bool {
        self.filters.account_id.is_some() || self.filters.opportunity_id.is_some()
    }

    pub fn sort(&self) -> Option<(SortKey, SortDirection)> {
        self.sort
    }

    /// Tri-state cycle per column: unsorted -> asc -> desc -> unsorted.
    /// Toggling a different column always restarts at ascending.
    pub fn toggle_sort(&mut self, key: SortKey) -> GridStatus {
        self.sort = match self.sort {
            Some((current, SortDirection::Asc)) if current == key => {
                Some((key, SortDirection::Desc))
            }
            Some((current, SortDirection::Desc)) if current == key => None,
            _ => Some((key, SortDirection::Asc)),
        };
        match self.sort {
            Some((key, SortDirection::Asc)) => GridStatus::SortAsc(key.label()),
            Some((key, SortDirection::Desc)) => GridStatus::SortDesc(key.label()),
            None => GridStatus::SortCleared,
        }
    }

    /// Recomputes the display-ready sequence: external filters, then the
    /// search term, then the active sort. The sort is stable and ranks
    /// records without the sort value last under both directions.
    pub fn derive_view<'a>(&self, samples: &'a [Sample]) -> Vec<&'a Sample> {
        let mut result: Vec<&Sample> = samples
            .iter()
            .filter(|sample| self.matches_external_filters(sample))
            .filter(|sample| self.matches_search(sample))
            .collect();

        if let Some((key, direction)) = self.sort {
            result.sort_by(|left, right| compare_samples(left, right, key, direction));
        }

        result
    }

    fn matches_external_filters(&self, sample: &Sample) -> bool {
        if let Some(account_id) = &self.filters.account_id
            && sample.account.account_id != *account_id
        {
            return false;
        }
        if let Some(opportunity_id) = &self.filters.opportunity_id {
            let matched = sample
                .opportunity
                .as_ref()
                .is_some_and(|opp| opp.opportunity_id == *opportunity_id);
            if !matched {
                return false;
            }
        }
        true
    }

    fn matches_search(&self, sample: &Sample) -> bool {
        let term = self.search_term.to_lowercase();
        if term.is_empty() {
            return true;
        }
        let hit = |value: &str| value.to_lowercase().contains(&term);
        hit(&sample.sample_name)
            || hit(&sample.status)
            || sample.account.name.as_deref().is_some_and(hit)
            || sample.product.name.as_deref().is_some_and(hit)
            || sample.employee.name.as_deref().is_some_and(hit)
    }

    pub fn edit(&self) -> &EditState {
        &self.edit
    }

    pub fn active_edit(&self) -> Option<(&SampleId, CellField)> {
        match &self.edit {
            EditState::Editing { sample_id, field } => Some((sample_id, *field)),
            _ => None,
        }
    }

    pub fn is_editing(&self, id: &SampleId, field: CellField) -> bool {
        matches!(
            &self.edit,
            EditState::Editing { sample_id, field: active }
                if sample_id == id && *active == field
        )
    }

    pub fn edit_buffer(&self) -> &str {
        &self.edit_buffer
    }

    pub fn set_edit_buffer(&mut self, value: String) {
        self.edit_buffer = value;
    }

    /// Starts editing one cell, abandoning any prior uncommitted edit
    /// without saving it. The buffer is seeded from the current value.
    pub fn begin_cell_edit(
        &mut self,
        samples: &[Sample],
        id: &SampleId,
        field: CellField,
    ) -> GridStatus {
        let seed = samples
            .iter()
            .find(|sample| sample.id == *id)
            .map(|sample| field.current_value(sample))
            .unwrap_or_default();
        self.edit = EditState::Editing {
            sample_id: id.clone(),
            field,
        };
        self.edit_buffer = seed;
        GridStatus::EditStarted(field.label())
    }

    pub fn cancel_cell_edit(&mut self) -> GridStatus {
        self.edit = EditState::Idle;
        self.edit_buffer.clear();
        GridStatus::EditCancelled
    }

    /// Submits the full-record payload with the edited field replaced by
    /// the buffer value. Both outcomes return to Idle; only success asks
    /// for a refetch, since the row must reflect confirmed remote state.
    pub fn commit_cell_edit<S: MutationSink>(
        &mut self,
        samples: &[Sample],
        sink: &mut S,
    ) -> CommitOutcome {
        let EditState::Editing { sample_id, field } = self.edit.clone() else {
            return CommitOutcome::NoActiveEdit;
        };
        let Some(sample) = samples.iter().find(|sample| sample.id == sample_id) else {
            self.edit = EditState::Idle;
            self.edit_buffer.clear();
            return CommitOutcome::NoActiveEdit;
        };

        let mut payload = SamplePayload::from_sample(sample);
        let value = self.edit_buffer.clone();
        match field {
            CellField::Name => payload.sample_name = value,
            CellField::Status => payload.status = value,
            CellField::ShipTo => payload.ship_to_address = value,
        }

        self.edit = EditState::Submitting;
        let result = sink.update(&sample_id, &payload);
        self.edit = EditState::Idle;
        self.edit_buffer.clear();

        match result {
            Ok(()) => CommitOutcome::Saved,
            Err(error) => CommitOutcome::Failed(format!("{error:#}")),
        }
    }

    /// Remote deletion. The destructive-action confirmation is the
    /// host's job; this only talks to the sink. The view is left
    /// untouched on failure.
    pub fn delete_record<S: MutationSink>(&mut self, id: &SampleId, sink: &mut S) -> DeleteOutcome {
        if let Some((editing, _)) = self.active_edit()
            && editing == id
        {
            self.cancel_cell_edit();
        }
        match sink.delete(id) {
            Ok(()) => DeleteOutcome::Deleted,
            Err(error) => DeleteOutcome::Failed(format!("{error:#}")),
        }
    }

    pub fn is_column_visible(&self, key: ColumnKey) -> bool {
        self.visible_columns.contains(&key)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        ColumnKey::ALL
            .into_iter()
            .filter(|key| self.visible_columns.contains(key))
    }

    pub fn toggle_column(&mut self, key: ColumnKey) -> GridStatus {
        if self.visible_columns.remove(&key) {
            GridStatus::ColumnHidden(key.label())
        } else {
            self.visible_columns.insert(key);
            GridStatus::ColumnShown(key.label())
        }
    }

    pub fn show_all_columns(&mut self) -> GridStatus {
        self.visible_columns = ColumnKey::ALL.into_iter().collect();
        GridStatus::ColumnsShown
    }

    /// Hides everything except the sample name, which stays visible so
    /// the grid is never fully empty.
    pub fn hide_all_columns(&mut self) -> GridStatus {
        self.visible_columns = [ColumnKey::Name].into_iter().collect();
        GridStatus::ColumnsHidden
    }
}

enum SortValue {
    Number(f64),
    Text(String),
}

fn sort_value(sample: &Sample, key: SortKey) -> Option<SortValue> {
    match key {
        SortKey::Name => Some(SortValue::Text(sample.sample_name.clone())),
        SortKey::Status => Some(SortValue::Text(sample.status.clone())),
        SortKey::DueDate => {
            let due = sample.due_date.trim();
            (!due.is_empty()).then(|| SortValue::Text(due.to_owned()))
        }
        SortKey::Cost => sample
            .cost_of_sample
            .amount
            .trim()
            .parse::<f64>()
            .ok()
            .map(SortValue::Number),
        SortKey::Account => sample.account.name.clone().map(SortValue::Text),
        SortKey::Product => sample.product.name.clone().map(SortValue::Text),
        SortKey::Employee => sample.employee.name.clone().map(SortValue::Text),
    }
}

fn compare_samples(left: &Sample, right: &Sample, key: SortKey, direction: SortDirection) -> Ordering {
    match (sort_value(left, key), sort_value(right, key)) {
        (None, None) => Ordering::Equal,
        // Missing values rank last regardless of direction.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left_value), Some(right_value)) => {
            let ordering = match (left_value, right_value) {
                (SortValue::Number(left), SortValue::Number(right)) => left.total_cmp(&right),
                (SortValue::Text(left), SortValue::Text(right)) => {
                    left.to_lowercase().cmp(&right.to_lowercase())
                }
                (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
                (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
            };
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}
