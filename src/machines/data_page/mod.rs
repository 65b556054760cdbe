//! Searchable table with role-based row editing.
//!
//! `FETCH` loads rows through the [`DataBackend`]; users with an editing
//! role may open a row, change the columns their role allows, and save it.
//! A failed save returns to `editingRow` with the edits intact; a successful
//! one merges the stored fields into the table.

mod backend;

pub use backend::{sample_posts, DataBackend, InMemoryBackend, InMemoryBackendBuilder, Post, SearchQuery};

use crate::core::{Context, Event, Partial};
use crate::definition::{Invocation, MachineDefinition, ServiceError, StateNode, Transition};
use crate::{patch, state_enum};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

state_enum! {
    /// States of the data page machine.
    pub enum DataPageState {
        Idle = "idle",
        Loading = "loading",
        DisplayingData = "displayingData",
        EditingRow = "editingRow",
        SavingData = "savingData",
    }
}

pub const FETCH_FAILED: &str = "Failed to fetch data";
pub const SAVE_FAILED: &str = "Failed to save data";
pub const SAVE_SUCCEEDED: &str = "Data saved successfully!";

/// Rows shown after a fetch.
pub const MAX_ROWS: usize = 5;

const TITLE_CHARS: usize = 20;
const BODY_CHARS: usize = 50;

/// What the signed-in user may do with the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    #[default]
    Readonly,
    EditSomeColumn,
    EditWholeData,
}

impl Role {
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "readonly" => Some(Self::Readonly),
            "editSomeColumn" => Some(Self::EditSomeColumn),
            "editWholeData" => Some(Self::EditWholeData),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Readonly => "readonly",
            Self::EditSomeColumn => "editSomeColumn",
            Self::EditWholeData => "editWholeData",
        }
    }

    /// Whether rows may be opened for editing and saved.
    pub fn can_edit_rows(self) -> bool {
        matches!(self, Self::EditSomeColumn | Self::EditWholeData)
    }

    /// Whether `field` of an open row may be changed. The id never may.
    pub fn can_edit_field(self, field: &str) -> bool {
        match field {
            "id" => false,
            "columnA" => self.can_edit_rows(),
            _ => self == Self::EditWholeData,
        }
    }

    /// The part of `fields` this role is allowed to submit. The id is always kept.
    pub fn permitted(self, fields: &Map<String, Value>) -> Map<String, Value> {
        fields
            .iter()
            .filter(|(field, _)| field.as_str() == "id" || self.can_edit_field(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

/// One table row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub column_a: String,
    pub column_b: String,
}

impl Row {
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: post.id,
            title: truncate(&post.title, TITLE_CHARS),
            body: truncate(&post.body, BODY_CHARS),
            column_a: format!("valueA-{}", post.id),
            column_b: format!("valueB-{}", post.id),
        }
    }
}

fn truncate(text: &str, chars: usize) -> String {
    let mut short: String = text.chars().take(chars).collect();
    short.push_str("...");
    short
}

/// The signed-in role; unknown values count as read-only.
pub fn role(context: &Context) -> Role {
    context
        .str("userRole")
        .and_then(Role::parse)
        .unwrap_or_default()
}

/// Rows currently in the table.
pub fn rows(context: &Context) -> Vec<Map<String, Value>> {
    context.get_as("data").unwrap_or_default()
}

fn row_id(row: &Map<String, Value>) -> Option<u64> {
    row.get("id").and_then(Value::as_u64)
}

fn initial_context() -> Partial {
    patch! {
        "data" => Vec::<Value>::new(),
        "currentSearchKeyword" => "",
        "currentSearchId" => "",
        "editingRowId" => Value::Null,
        "editingFormData" => Map::new(),
        "userRole" => Role::Readonly.as_str(),
        "error" => Value::Null,
        "message" => Value::Null,
    }
}

fn search_query(context: &Context) -> SearchQuery {
    SearchQuery {
        keyword: context.str("currentSearchKeyword").unwrap_or_default().to_string(),
        id: context.str("currentSearchId").unwrap_or_default().to_string(),
    }
}

/// Payload ids may arrive as numbers or numeric strings.
fn payload_text(event: &Event, key: &str) -> String {
    match event.payload_field(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn store_search(_: &Context, event: &Event) -> Partial {
    patch! {
        "currentSearchKeyword" => payload_text(event, "keyword"),
        "currentSearchId" => payload_text(event, "id"),
        "error" => Value::Null,
        "message" => Value::Null,
    }
}

fn fetch() -> Transition<DataPageState> {
    Transition::to(DataPageState::Loading).assign(store_search)
}

fn login() -> Transition<DataPageState> {
    Transition::internal()
        .when(|_, event| event.payload_str("role").and_then(Role::parse).is_some())
        .assign(|_, event| patch! { "userRole" => event.payload_str("role") })
}

fn failure_message(event: &Event, fallback: &str) -> String {
    event
        .payload_str("message")
        .filter(|message| !message.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn fetch_data(backend: Arc<dyn DataBackend>) -> Invocation<DataPageState> {
    Invocation::new("fetchData", move |context: &Context| {
        let request = backend.fetch_rows(search_query(context));
        async move {
            let posts = request.await?;
            let rows: Vec<Row> = posts.iter().take(MAX_ROWS).map(Row::from_post).collect();
            serde_json::to_value(rows).map_err(|error| ServiceError::new(error.to_string()))
        }
    })
    .on_done(Transition::to(DataPageState::DisplayingData).assign(|_, event| {
        patch! { "data" => event.payload.clone(), "error" => Value::Null }
    }))
    .on_error(Transition::to(DataPageState::Idle).assign(|_, event| {
        patch! { "error" => failure_message(event, FETCH_FAILED), "data" => Vec::<Value>::new() }
    }))
}

fn can_edit_row(context: &Context, event: &Event) -> bool {
    role(context).can_edit_rows() && event.payload_u64("id").is_some()
}

fn open_row(context: &Context, event: &Event) -> Partial {
    let id = event.payload_u64("id");
    let row = rows(context)
        .into_iter()
        .find(|row| id.is_some() && row_id(row) == id)
        .unwrap_or_default();
    patch! {
        "editingRowId" => id,
        "editingFormData" => row,
        "error" => Value::Null,
        "message" => Value::Null,
    }
}

fn can_update_field(context: &Context, event: &Event) -> bool {
    event
        .payload_str("field")
        .is_some_and(|field| role(context).can_edit_field(field))
}

fn update_field(context: &Context, event: &Event) -> Partial {
    let mut form = context.object("editingFormData").cloned().unwrap_or_default();
    if let Some(field) = event.payload_str("field") {
        let value = event.payload_field("value").cloned().unwrap_or(Value::Null);
        form.insert(field.to_string(), value);
    }
    patch! { "editingFormData" => form }
}

fn close_row() -> Partial {
    patch! { "editingRowId" => Value::Null, "editingFormData" => Map::new() }
}

/// Submits only the fields the current role may change.
fn save_data(backend: Arc<dyn DataBackend>) -> Invocation<DataPageState> {
    Invocation::new("saveData", move |context: &Context| {
        let id = context.get("editingRowId").and_then(Value::as_u64);
        let form = context.object("editingFormData").cloned().unwrap_or_default();
        let submitted = role(context).permitted(&form);
        let request = id.map(|id| backend.save_row(id, submitted.clone()));
        async move {
            let Some(request) = request else {
                return Err(ServiceError::new(SAVE_FAILED));
            };
            let saved = request.await?;
            let mut merged = submitted;
            merged.extend(saved);
            Ok(Value::Object(merged))
        }
    })
    .on_done(Transition::to(DataPageState::DisplayingData).assign(merge_saved_row))
    .on_error(Transition::to(DataPageState::EditingRow).assign(|_, event| {
        patch! { "error" => failure_message(event, SAVE_FAILED), "message" => Value::Null }
    }))
}

fn merge_saved_row(context: &Context, event: &Event) -> Partial {
    let id = context.get("editingRowId").and_then(Value::as_u64);
    let saved = event.payload.as_object().cloned().unwrap_or_default();
    let data: Vec<Map<String, Value>> = rows(context)
        .into_iter()
        .map(|mut row| {
            if id.is_some() && row_id(&row) == id {
                row.extend(saved.clone());
            }
            row
        })
        .collect();

    let mut partial = close_row();
    partial.extend(patch! {
        "data" => data,
        "error" => Value::Null,
        "message" => SAVE_SUCCEEDED,
    });
    partial
}

/// Build the data page machine on top of `backend`.
pub fn machine(backend: Arc<dyn DataBackend>) -> MachineDefinition<DataPageState> {
    MachineDefinition::builder("dataPage")
        .initial(DataPageState::Idle)
        .context(initial_context())
        .state(
            StateNode::build(DataPageState::Idle)
                .on(
                    "FETCH",
                    fetch().assign(|_, _| patch! { "data" => Vec::<Value>::new() }),
                )
                .on("LOGIN", login()),
        )
        .state(StateNode::build(DataPageState::Loading).invoke(fetch_data(Arc::clone(&backend))))
        .state(
            StateNode::build(DataPageState::DisplayingData)
                .on("FETCH", fetch())
                .on(
                    "EDIT_ROW",
                    Transition::to(DataPageState::EditingRow)
                        .when(can_edit_row)
                        .assign(open_row),
                )
                .on("LOGIN", login()),
        )
        .state(
            StateNode::build(DataPageState::EditingRow)
                .on(
                    "UPDATE_FIELD",
                    Transition::internal().when(can_update_field).assign(update_field),
                )
                .on(
                    "SAVE",
                    Transition::to(DataPageState::SavingData)
                        .when(|context, _| role(context).can_edit_rows())
                        .assign(|_, _| patch! { "error" => Value::Null, "message" => Value::Null }),
                )
                .on(
                    "CANCEL",
                    Transition::to(DataPageState::DisplayingData).assign(|_, _| close_row()),
                ),
        )
        .state(StateNode::build(DataPageState::SavingData).invoke(save_data(backend)))
        .build()
        .expect("data page machine is statically valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Snapshot;
    use serde_json::json;

    fn send(
        machine: &MachineDefinition<DataPageState>,
        snapshot: &Snapshot<DataPageState>,
        kind: &str,
        payload: Value,
    ) -> Snapshot<DataPageState> {
        machine.transition(snapshot, &Event::new(kind, payload)).snapshot
    }

    fn sample_rows() -> Value {
        let rows: Vec<Row> = sample_posts().iter().take(MAX_ROWS).map(Row::from_post).collect();
        serde_json::to_value(rows).unwrap()
    }

    fn displaying(role: Role) -> (MachineDefinition<DataPageState>, Snapshot<DataPageState>) {
        let machine = machine(Arc::new(InMemoryBackend::new()));
        let mut snapshot = machine.initial_snapshot(None);
        snapshot = send(&machine, &snapshot, "LOGIN", json!({ "role": role.as_str() }));
        snapshot = send(&machine, &snapshot, "FETCH", json!({ "keyword": "", "id": "" }));
        snapshot = send(&machine, &snapshot, "done.invoke.fetchData", sample_rows());
        (machine, snapshot)
    }

    #[test]
    fn rows_are_truncated_posts() {
        let row = Row::from_post(&Post {
            id: 7,
            title: "x".repeat(30),
            body: "y".repeat(80),
        });

        assert_eq!(row.title, format!("{}...", "x".repeat(20)));
        assert_eq!(row.body, format!("{}...", "y".repeat(50)));
        assert_eq!(row.column_a, "valueA-7");
        assert_eq!(row.column_b, "valueB-7");

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["columnA"], "valueA-7");
    }

    #[test]
    fn roles_gate_fields() {
        assert!(!Role::Readonly.can_edit_rows());
        assert!(!Role::Readonly.can_edit_field("columnA"));
        assert!(Role::EditSomeColumn.can_edit_field("columnA"));
        assert!(!Role::EditSomeColumn.can_edit_field("title"));
        assert!(Role::EditWholeData.can_edit_field("title"));
        assert!(!Role::EditWholeData.can_edit_field("id"));

        let form = patch! { "id" => 1, "title" => "t", "columnA" => "a" };
        assert_eq!(
            Role::EditSomeColumn.permitted(&form),
            patch! { "id" => 1, "columnA" => "a" }
        );
        assert_eq!(Role::EditWholeData.permitted(&form), form);
    }

    #[test]
    fn fetch_stores_the_search_and_clears_data() {
        let machine = machine(Arc::new(InMemoryBackend::new()));
        let start = machine.initial_snapshot(None);

        let loading = send(&machine, &start, "FETCH", json!({ "keyword": "rust", "id": 3 }));

        assert_eq!(loading.state, DataPageState::Loading);
        assert_eq!(loading.context.str("currentSearchKeyword"), Some("rust"));
        assert_eq!(loading.context.str("currentSearchId"), Some("3"));
        assert_eq!(search_query(&loading.context).id, "3");
    }

    #[test]
    fn failed_fetch_returns_to_idle() {
        let machine = machine(Arc::new(InMemoryBackend::new()));
        let loading = send(&machine, &machine.initial_snapshot(None), "FETCH", Value::Null);

        let idle = send(&machine, &loading, "error.invoke.fetchData", json!({ "message": "" }));

        assert_eq!(idle.state, DataPageState::Idle);
        assert_eq!(idle.context.str("error"), Some(FETCH_FAILED));
    }

    #[test]
    fn login_ignores_unknown_roles() {
        let machine = machine(Arc::new(InMemoryBackend::new()));
        let start = machine.initial_snapshot(None);

        let same = send(&machine, &start, "LOGIN", json!({ "role": "admin" }));
        assert_eq!(role(&same.context), Role::Readonly);

        let editor = send(&machine, &start, "LOGIN", json!({ "role": "editWholeData" }));
        assert_eq!(role(&editor.context), Role::EditWholeData);
    }

    #[test]
    fn readonly_cannot_open_rows() {
        let (machine, snapshot) = displaying(Role::Readonly);

        let after = send(&machine, &snapshot, "EDIT_ROW", json!({ "id": 1 }));

        assert_eq!(after.state, DataPageState::DisplayingData);
        assert_eq!(after.context.get("editingRowId"), Some(&Value::Null));
    }

    #[test]
    fn editor_opens_a_copy_of_the_row() {
        let (machine, snapshot) = displaying(Role::EditWholeData);

        let editing = send(&machine, &snapshot, "EDIT_ROW", json!({ "id": 2 }));

        assert_eq!(editing.state, DataPageState::EditingRow);
        assert_eq!(editing.context.get("editingRowId"), Some(&json!(2)));
        assert_eq!(
            editing.context.get("editingFormData"),
            Some(&sample_rows()[1])
        );
    }

    #[test]
    fn some_column_editor_only_changes_column_a() {
        let (machine, snapshot) = displaying(Role::EditSomeColumn);
        let editing = send(&machine, &snapshot, "EDIT_ROW", json!({ "id": 1 }));

        let title = send(&machine, &editing, "UPDATE_FIELD", json!({ "field": "title", "value": "new" }));
        let column = send(&machine, &title, "UPDATE_FIELD", json!({ "field": "columnA", "value": "new" }));

        let form = column.context.object("editingFormData").cloned().unwrap();
        assert_eq!(form["title"], sample_rows()[0]["title"]);
        assert_eq!(form["columnA"], "new");
    }

    #[test]
    fn cancel_discards_the_edit() {
        let (machine, snapshot) = displaying(Role::EditWholeData);
        let editing = send(&machine, &snapshot, "EDIT_ROW", json!({ "id": 1 }));

        let back = send(&machine, &editing, "CANCEL", Value::Null);

        assert_eq!(back.state, DataPageState::DisplayingData);
        assert_eq!(back.context.get("editingRowId"), Some(&Value::Null));
        assert_eq!(back.context.object("editingFormData").map(Map::len), Some(0));
    }

    #[test]
    fn failed_save_keeps_the_edits() {
        let (machine, snapshot) = displaying(Role::EditWholeData);
        let editing = send(&machine, &snapshot, "EDIT_ROW", json!({ "id": 1 }));
        let edited = send(&machine, &editing, "UPDATE_FIELD", json!({ "field": "columnB", "value": "B!" }));
        let saving = send(&machine, &edited, "SAVE", Value::Null);
        assert_eq!(saving.state, DataPageState::SavingData);

        let back = send(&machine, &saving, "error.invoke.saveData", json!({ "message": "Conflict" }));

        assert_eq!(back.state, DataPageState::EditingRow);
        assert_eq!(back.context.str("error"), Some("Conflict"));
        assert_eq!(back.context.get("editingFormData"), edited.context.get("editingFormData"));
    }

    #[test]
    fn successful_save_merges_the_row() {
        let (machine, snapshot) = displaying(Role::EditWholeData);
        let editing = send(&machine, &snapshot, "EDIT_ROW", json!({ "id": 3 }));
        let saving = send(&machine, &editing, "SAVE", Value::Null);

        let done = send(
            &machine,
            &saving,
            "done.invoke.saveData",
            json!({ "id": 3, "columnA": "saved" }),
        );

        assert_eq!(done.state, DataPageState::DisplayingData);
        assert_eq!(done.context.str("message"), Some(SAVE_SUCCEEDED));
        assert_eq!(done.context.get("editingRowId"), Some(&Value::Null));
        let rows = rows(&done.context);
        assert_eq!(rows[2]["columnA"], "saved");
        assert_eq!(rows[2]["columnB"], "valueB-3");
        assert_eq!(rows[0]["columnA"], "valueA-1");
    }
}
