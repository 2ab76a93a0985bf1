use kiyoshi_core::view::data_table::{CellKind, SELECTED_ROWS_FIELD};
use kiyoshi_core::{
    denormalize_kiyoshies, kiyoshi_samples, kiyoshi_table_columns, kiyoshi_table_rows,
    normalize_kiyoshies, DataRow, DataTable, FormFields, SelectAllState, TableBody,
};
use std::cell::RefCell;
use std::rc::Rc;

fn three_row_table() -> DataTable {
    DataTable::new(
        vec!["name".to_string(), "score".to_string()],
        vec![
            DataRow::new("a", vec!["Alpha".to_string(), "1".to_string()]),
            DataRow::new("b", vec!["Beta".to_string(), "2".to_string()]),
            DataRow::new("c", vec!["Gamma".to_string(), "3".to_string()]),
        ],
    )
}

#[test]
fn select_all_then_uncheck_one_row() {
    let mut table = three_row_table();
    let mut form = FormFields::new();

    table.select_all(true);
    table.register(&mut form);
    assert_eq!(form.value(SELECTED_ROWS_FIELD), Some("a,b,c"));
    assert_eq!(table.select_all_state(), SelectAllState::Checked);

    assert!(!table.toggle_row("b"));
    table.register(&mut form);
    assert_eq!(form.value(SELECTED_ROWS_FIELD), Some("a,c"));
    assert_eq!(table.form_data().selected_rows, "a,c");
    assert_eq!(table.select_all_state(), SelectAllState::Indeterminate);
}

#[test]
fn select_all_unchecked_clears_selection() {
    let mut table = three_row_table();
    table.toggle_row("a");
    table.toggle_row("c");

    table.select_all(false);
    assert!(table.selected_keys().is_empty());
    assert_eq!(table.select_all_state(), SelectAllState::Unchecked);
    assert_eq!(table.selected_rows_value(), "");
}

#[test]
fn toggle_keeps_selection_order_and_ignores_unknown_keys() {
    let mut table = three_row_table();

    assert!(table.toggle_row("c"));
    assert!(table.toggle_row("a"));
    assert!(!table.toggle_row("zzz"));
    assert_eq!(table.selected_rows_value(), "c,a");
    assert!(table.is_selected("a"));
    assert!(!table.is_selected("b"));
}

#[test]
fn replacing_rows_resets_selection() {
    let mut table = three_row_table();
    table.select_all(true);

    let same_rows = table.rows().to_vec();
    table.set_rows(same_rows);
    assert!(table.selected_keys().is_empty());
}

#[test]
fn empty_table_is_never_checked() {
    let mut table = DataTable::new(vec!["name".to_string()], Vec::new());
    table.select_all(true);
    assert_eq!(table.select_all_state(), SelectAllState::Unchecked);
}

#[test]
fn fetching_renders_loading_instead_of_rows() {
    let mut table = three_row_table();
    table.set_fetching(true);
    assert_eq!(table.render().body, TableBody::Loading);

    table.set_fetching(false);
    table.toggle_row("b");
    let view = table.render();
    let TableBody::Rows(rows) = view.body else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 3);
    assert!(rows[1].selected);
    assert_eq!(rows[1].cells[0].kind, CellKind::RowHeader);
    assert_eq!(rows[1].cells[1].kind, CellKind::Data);
    assert_eq!(rows[1].cells[1].key, "b_score");
    assert_eq!(view.columns, vec!["name".to_string(), "score".to_string()]);
}

#[test]
fn info_click_reaches_handler() {
    let mut table = three_row_table();
    assert!(!table.click_info("a"));

    let clicked = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&clicked);
    table.set_on_info_click(move |key| sink.borrow_mut().push(key.to_string()));

    assert!(table.click_info("b"));
    assert_eq!(*clicked.borrow(), vec!["b".to_string()]);
}

#[test]
fn kiyoshi_rows_follow_listing_columns() {
    let rows = kiyoshi_table_rows(kiyoshi_samples());
    assert_eq!(kiyoshi_table_columns(), vec!["Said at", "Made by"]);
    assert_eq!(rows.len(), kiyoshi_samples().len());
    assert_eq!(rows[0].key, "015dd491-1b2f-4009-96d3-ae96c05b5f88");
    assert_eq!(
        rows[0].col_values,
        vec!["2019-10-28T06:21:21.355+0900".to_string(), "Hikawa".to_string()]
    );
}

#[test]
fn duplicate_row_keys_are_selected_once() {
    let samples = kiyoshi_samples();
    let records = vec![samples[0].clone(), samples[0].clone(), samples[1].clone()];
    let restored = denormalize_kiyoshies(&normalize_kiyoshies(&records)).unwrap();
    let mut table = DataTable::new(kiyoshi_table_columns(), kiyoshi_table_rows(&restored));
    let first = samples[0].id.to_string();
    let second = samples[1].id.to_string();

    table.select_all(true);
    assert_eq!(table.selected_rows_value(), format!("{first},{second}"));
    assert_eq!(table.select_all_state(), SelectAllState::Checked);

    assert!(!table.toggle_row(&first));
    assert!(!table.is_selected(&first));
    assert_eq!(table.selected_rows_value(), second);
    assert_eq!(table.select_all_state(), SelectAllState::Indeterminate);

    assert!(table.toggle_row(&first));
    assert_eq!(table.select_all_state(), SelectAllState::Checked);
}
