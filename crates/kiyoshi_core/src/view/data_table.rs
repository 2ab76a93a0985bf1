//! Selectable data table model.
//!
//! # Responsibility
//! - Track the local set of selected row keys.
//! - Derive the select-all checkbox state and the `selectedRows` form value.
//! - Describe what to draw: header, rows, or a loading indicator.
//!
//! # Invariants
//! - Replacing rows always clears the selection.
//! - The selection only ever holds distinct keys of current rows, in
//!   selection order.

use crate::model::kiyoshi::Kiyoshi;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// Form field receiving the comma-joined selected keys.
pub const SELECTED_ROWS_FIELD: &str = "selectedRows";

/// Column titles of the Kiyoshi listing.
pub const KIYOSHI_TABLE_COLUMNS: [&str; 2] = ["Said at", "Made by"];

/// One table row: a stable key plus display values in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    pub key: String,
    pub col_values: Vec<String>,
}

impl DataRow {
    pub fn new(key: impl Into<String>, col_values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            col_values,
        }
    }
}

/// Form data submitted by the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTableFormData {
    /// Comma-separated keys of selected rows.
    pub selected_rows: String,
}

/// Registered form fields and their current values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` or overwrites its value.
    pub fn register(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// State of the header "select all" checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// First cell of a row, rendered as the row header.
    RowHeader,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    /// `<row key>_<column>`, unique within the table.
    pub key: String,
    pub kind: CellKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub key: String,
    pub selected: bool,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    /// A fetch is in progress; draw a progress indicator instead of rows.
    Loading,
    Rows(Vec<RowView>),
}

/// Render description of the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub select_all: SelectAllState,
    pub columns: Vec<String>,
    pub body: TableBody,
}

type InfoClickHandler = Box<dyn FnMut(&str)>;

/// Selectable table with local selection state.
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<DataRow>,
    fetching: bool,
    selected: Vec<String>,
    on_info_click: Option<InfoClickHandler>,
}

impl Debug for DataTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .field("fetching", &self.fetching)
            .field("selected", &self.selected)
            .field("on_info_click", &self.on_info_click.is_some())
            .finish()
    }
}

impl DataTable {
    pub fn new(columns: Vec<String>, rows: Vec<DataRow>) -> Self {
        Self {
            columns,
            rows,
            fetching: false,
            selected: Vec::new(),
            on_info_click: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Replaces the rows and clears the selection, even for equal rows.
    pub fn set_rows(&mut self, rows: Vec<DataRow>) {
        self.rows = rows;
        self.selected.clear();
    }

    pub fn set_fetching(&mut self, fetching: bool) {
        self.fetching = fetching;
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Installs the callback invoked by `click_info`.
    pub fn set_on_info_click(&mut self, handler: impl FnMut(&str) + 'static) {
        self.on_info_click = Some(Box::new(handler));
    }

    /// Header checkbox change: select every row or none.
    pub fn select_all(&mut self, checked: bool) {
        self.selected = if checked {
            self.distinct_row_keys()
        } else {
            Vec::new()
        };
    }

    /// Row checkbox click: flips membership of `key`.
    ///
    /// Returns whether the row is selected afterwards. Keys of rows not in
    /// the table are ignored.
    pub fn toggle_row(&mut self, key: &str) -> bool {
        if !self.rows.iter().any(|row| row.key == key) {
            return false;
        }
        if let Some(position) = self.selected.iter().position(|selected| selected == key) {
            self.selected.remove(position);
            false
        } else {
            self.selected.push(key.to_string());
            true
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.iter().any(|selected| selected == key)
    }

    /// Selected keys in selection order.
    pub fn selected_keys(&self) -> &[String] {
        &self.selected
    }

    pub fn select_all_state(&self) -> SelectAllState {
        let selected = self.selected.len();
        if selected == 0 {
            SelectAllState::Unchecked
        } else if selected == self.distinct_row_keys().len() {
            SelectAllState::Checked
        } else {
            SelectAllState::Indeterminate
        }
    }

    /// Comma-joined selected keys, as bound to `selectedRows`.
    pub fn selected_rows_value(&self) -> String {
        self.selected.join(",")
    }

    /// Binds the current selection to the `selectedRows` field of `form`.
    pub fn register(&self, form: &mut FormFields) {
        form.register(SELECTED_ROWS_FIELD, self.selected_rows_value());
    }

    pub fn form_data(&self) -> DataTableFormData {
        DataTableFormData {
            selected_rows: self.selected_rows_value(),
        }
    }

    /// Info button click on row `key`; returns whether a handler ran.
    pub fn click_info(&mut self, key: &str) -> bool {
        match self.on_info_click.as_mut() {
            Some(handler) => {
                handler(key);
                true
            }
            None => false,
        }
    }

    pub fn render(&self) -> TableView {
        let body = if self.fetching {
            TableBody::Loading
        } else {
            TableBody::Rows(self.rows.iter().map(|row| self.render_row(row)).collect())
        };

        TableView {
            select_all: self.select_all_state(),
            columns: self.columns.clone(),
            body,
        }
    }

    /// Row keys in row order, each key once.
    fn distinct_row_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            if !keys.contains(&row.key) {
                keys.push(row.key.clone());
            }
        }
        keys
    }

    fn render_row(&self, row: &DataRow) -> RowView {
        let cells = row
            .col_values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let column = self.columns.get(index).map_or("", String::as_str);
                CellView {
                    key: format!("{}_{column}", row.key),
                    kind: if index == 0 {
                        CellKind::RowHeader
                    } else {
                        CellKind::Data
                    },
                    text: value.clone(),
                }
            })
            .collect();

        RowView {
            key: row.key.clone(),
            selected: self.is_selected(&row.key),
            cells,
        }
    }
}

/// Builds listing rows (`said at`, `made by`) keyed by Kiyoshi id.
pub fn kiyoshi_table_rows(kiyoshies: &[Kiyoshi]) -> Vec<DataRow> {
    kiyoshies
        .iter()
        .map(|kiyoshi| {
            DataRow::new(
                kiyoshi.id.to_string(),
                vec![
                    kiyoshi.said_at.as_str().to_string(),
                    kiyoshi.made_by.name.clone(),
                ],
            )
        })
        .collect()
}

/// Column titles of the Kiyoshi listing as owned strings.
pub fn kiyoshi_table_columns() -> Vec<String> {
    KIYOSHI_TABLE_COLUMNS
        .iter()
        .map(|column| (*column).to_string())
        .collect()
}
