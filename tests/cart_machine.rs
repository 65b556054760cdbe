//! Cart machine driven through the interpreter.

use serde_json::{json, Value};
use statecraft::core::Event;
use statecraft::machines::cart::{self, CartState, CHECKOUT_DELAY};
use statecraft::runtime::{HistoryRecorder, Inspector, Interpreter, InterpreterOptions};
use std::sync::Arc;
use std::time::Duration;

fn item(id: u64, price: f64) -> Event {
    Event::new("ADD_ITEM", json!({ "id": id, "name": format!("item-{id}"), "price": price }))
}

async fn active_cart() -> Interpreter<CartState> {
    let interpreter = Interpreter::create(cart::machine());
    interpreter.dispatch(item(1, 12.0)).await.unwrap();
    interpreter.dispatch(item(2, 3.5)).await.unwrap();
    interpreter
}

#[tokio::test(start_paused = true)]
async fn checkout_succeeds_after_exactly_two_seconds() {
    let cart = active_cart().await;

    let processing = cart.dispatch(Event::named("CHECKOUT")).await.unwrap();
    assert_eq!(processing.state, CartState::Processing);

    tokio::time::sleep(CHECKOUT_DELAY - Duration::from_millis(1)).await;
    assert_eq!(cart.get_snapshot().state, CartState::Processing);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(cart.get_snapshot().state, CartState::Success);
}

#[tokio::test(start_paused = true)]
async fn checkout_again_while_processing_changes_nothing() {
    let cart = active_cart().await;
    let processing = cart.dispatch(Event::named("CHECKOUT")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!cart.can_transition("CHECKOUT", None));
    let again = cart.dispatch(Event::named("CHECKOUT")).await.unwrap();
    assert_eq!(again, processing);

    // The first timer still fires on schedule.
    tokio::time::sleep(Duration::from_millis(501)).await;
    assert_eq!(cart.get_snapshot().state, CartState::Success);
}

#[tokio::test(start_paused = true)]
async fn clearing_during_processing_cancels_checkout() {
    let cart = active_cart().await;
    cart.dispatch(Event::named("CHECKOUT")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let cleared = cart.dispatch(Event::named("CLEAR_CART")).await.unwrap();
    assert_eq!(cleared.state, CartState::Empty);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snapshot = cart.get_snapshot();
    assert_eq!(snapshot.state, CartState::Empty);
    assert_eq!(snapshot.context.f64("total"), Some(0.0));
    assert_eq!(snapshot.context.get("items"), Some(&json!([])));
}

#[tokio::test(start_paused = true)]
async fn discounted_checkout_and_restart() {
    let recorder = Arc::new(HistoryRecorder::<CartState>::new());
    let inspector: Arc<dyn Inspector<CartState>> = recorder.clone();
    let cart = Interpreter::create_with(cart::machine(), InterpreterOptions::new().inspector(inspector));

    cart.dispatch(item(1, 50.0)).await.unwrap();
    let discounted = cart
        .dispatch(Event::new("APPLY_DISCOUNT", json!("VIPFIRST")))
        .await
        .unwrap();
    assert_eq!(discounted.state, CartState::WithDiscount);
    assert!((cart::discounted_total(&discounted.context) - 35.0).abs() < 1e-9);

    cart.dispatch(Event::named("CHECKOUT")).await.unwrap();
    tokio::time::sleep(CHECKOUT_DELAY + Duration::from_millis(1)).await;
    assert_eq!(cart.get_snapshot().state, CartState::Success);

    let restarted = cart.dispatch(Event::named("RESTART")).await.unwrap();
    assert_eq!(restarted.state, CartState::Empty);
    assert_eq!(restarted.context.str("discountCode"), Some(""));

    let history = recorder.history();
    assert_eq!(
        history.get_path(),
        vec![
            &CartState::Empty,
            &CartState::Active,
            &CartState::WithDiscount,
            &CartState::Processing,
            &CartState::Success,
            &CartState::Empty,
        ]
    );
    assert_eq!(history.transitions()[3].event, "after.2000.processing");
}

#[tokio::test]
async fn snapshot_reads_are_idempotent() {
    let cart = active_cart().await;

    let first = cart.get_snapshot();
    let second = cart.get_snapshot();

    assert_eq!(first, second);
    assert!(first.context.same_as(&second.context));
}

#[tokio::test]
async fn watchers_see_the_latest_total() {
    let cart = active_cart().await;
    let mut watcher = cart.watch();
    let _ = watcher.borrow_and_update();

    cart.send(Event::new("REMOVE_ITEM", json!(1))).unwrap();
    watcher.changed().await.unwrap();

    let snapshot = watcher.borrow().clone();
    assert_eq!(snapshot.context.f64("total"), Some(3.5));
    assert_eq!(snapshot.context.get("items").and_then(Value::as_array).map(Vec::len), Some(1));
}

#[tokio::test]
async fn oversized_quantities_leave_the_cart_running() {
    let cart = Interpreter::create(cart::machine());
    cart.dispatch(item(1, 2.0)).await.unwrap();

    let refused = cart
        .dispatch(Event::new("UPDATE_QUANTITY", json!({ "itemId": 1, "quantity": u64::MAX })))
        .await
        .unwrap();
    let added = cart.dispatch(item(1, 2.0)).await.unwrap();

    assert_eq!(cart::items(&refused.context)[0].quantity, 1);
    assert_eq!(cart::items(&added.context)[0].quantity, 2);
    assert_eq!(added.context.f64("total"), Some(4.0));
    assert!(cart.is_running());

    let cleared = cart.dispatch(Event::named("CLEAR_CART")).await.unwrap();
    assert_eq!(cleared.state, CartState::Empty);
}
