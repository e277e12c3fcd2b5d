//! Demonstration of Store for managing a todo list

use icebox::{path, value, Store, StoreConfig, StoreResult, Value};
use tracing_subscriber::EnvFilter;

fn add_todo(store: &Store, title: &str) -> StoreResult<()> {
    let title = title.to_string();
    store.mutate(move |draft| {
        let id = draft.get("todos").and_then(Value::as_array).map_or(0, <[Value]>::len);
        draft.push("todos", value!({"id": id, "title": title, "completed": false}))
    })
}

fn toggle_todo(store: &Store, id: usize) -> StoreResult<()> {
    store.store_for(path!("todos", id)).mutate(|todo| {
        let completed = todo.get("completed").and_then(Value::as_bool).unwrap_or(false);
        todo.set("completed", !completed)
    })
}

fn visible_titles(state: &Value) -> Vec<String> {
    let filter = state["filter"].as_str().unwrap_or("all");
    state["todos"]
        .as_array()
        .unwrap_or_default()
        .iter()
        .filter(|todo| match filter {
            "active" => todo["completed"].as_bool() != Some(true),
            "completed" => todo["completed"].as_bool() == Some(true),
            _ => true,
        })
        .filter_map(|todo| todo["title"].as_str().map(str::to_string))
        .collect()
}

fn stats(state: &Value) -> (usize, usize, usize) {
    let todos = state["todos"].as_array().unwrap_or_default();
    let total = todos.len();
    let completed = todos
        .iter()
        .filter(|todo| todo["completed"].as_bool() == Some(true))
        .count();
    (total, total - completed, completed)
}

fn main() -> StoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Store Example: Todo App ===\n");

    let store = Store::with_config(
        value!({"todos": [], "filter": "all"}),
        StoreConfig::default().with_label("todos"),
    );

    println!("1. Setting up subscriber");
    let reader = store.clone();
    let subscription = store.subscribe(move || {
        let (total, active, completed) = stats(&reader.get_state());
        println!("   [Store Update] Total: {total}, Active: {active}, Completed: {completed}");
    });

    println!("\n2. Adding todos");
    add_todo(&store, "Learn Rust")?;
    add_todo(&store, "Build a state store")?;
    add_todo(&store, "Write documentation")?;

    println!("\n3. Completing the first todo");
    let before = store.get_state();
    toggle_todo(&store, 0)?;
    let after = store.get_state();
    println!(
        "   second todo shared with previous snapshot: {}",
        after["todos"][1].ptr_eq(&before["todos"][1])
    );

    println!("\n4. Setting the filter to its current value (no notification)");
    store.merge(value!({"filter": "all"}))?;

    println!("\n5. Filtering to show only active todos");
    store.merge(value!({"filter": "active"}))?;
    for title in visible_titles(&store.get_state()) {
        println!("   [ ] {title}");
    }

    println!("\n6. Unsubscribing and clearing completed todos");
    subscription.unsubscribe();
    store.mutate(|draft| {
        let remaining: Value = draft
            .get("todos")
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter(|todo| todo["completed"].as_bool() != Some(true))
            .cloned()
            .collect();
        draft.set("todos", remaining)
    })?;

    let (total, active, completed) = store.read(stats);
    println!("\n7. Final statistics:");
    println!("   Total: {total}");
    println!("   Active: {active}");
    println!("   Completed: {completed}");

    println!("\n✓ Example complete!");
    Ok(())
}
