//! Shopping cart.
//!
//! ```text
//! empty --ADD_ITEM--> active --APPLY_DISCOUNT--> withDiscount
//!                       |  ^                         |
//!                       |  +--ADD_ITEM/REMOVE_DISCOUNT+
//!                       +--CHECKOUT--> processing --2000ms--> success --RESTART--> empty
//! ```
//!
//! `total` is maintained incrementally and always equals the sum of
//! `price * quantity` over `items`.

use crate::core::{Action, Context, Event, Partial};
use crate::definition::{MachineDefinition, StateNode, Transition};
use crate::{patch, state_enum};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

state_enum! {
    /// States of the cart machine.
    pub enum CartState {
        Empty = "empty",
        Active = "active",
        WithDiscount = "withDiscount",
        Processing = "processing",
        Success = "success",
    }
}

/// How long checkout processing takes.
pub const CHECKOUT_DELAY: Duration = Duration::from_millis(2000);

/// Largest quantity one line may hold.
pub const MAX_QUANTITY: u64 = 999;

/// One line of the cart.
///
/// Fields of the `ADD_ITEM` payload other than the known ones are kept in
/// `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartItem {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// Parse an `ADD_ITEM` payload. `None` when a known field has the wrong type.
    fn from_payload(payload: &Map<String, Value>) -> Option<Self> {
        let mut item: CartItem = serde_json::from_value(Value::Object(payload.clone())).ok()?;
        item.quantity = 1;
        Some(item)
    }
}

/// Fraction taken off the total for a discount code. Unknown codes give 0.
pub fn discount_rate(code: &str) -> f64 {
    match code {
        "SUMMER20" => 0.2,
        "VIPFIRST" => 0.3,
        "WELCOME10" => 0.1,
        _ => 0.0,
    }
}

/// Items currently in the cart.
pub fn items(context: &Context) -> Vec<CartItem> {
    context.get_as("items").unwrap_or_default()
}

/// Amount due after the applied discount.
pub fn discounted_total(context: &Context) -> f64 {
    let total = context.f64("total").unwrap_or(0.0);
    let discount = context.f64("appliedDiscount").unwrap_or(0.0);
    total * (1.0 - discount)
}

fn initial_context() -> Partial {
    patch! {
        "items" => Vec::<Value>::new(),
        "total" => 0.0,
        "discountCode" => "",
        "appliedDiscount" => 0.0,
    }
}

fn cleared_discount() -> Partial {
    patch! { "discountCode" => "", "appliedDiscount" => 0.0 }
}

/// The payload is a well-formed item and its line still has room for one more.
fn can_add_item(context: &Context, event: &Event) -> bool {
    let Some(incoming) = event.payload.as_object().and_then(CartItem::from_payload) else {
        return false;
    };
    items(context)
        .iter()
        .find(|item| !incoming.id.is_null() && item.id == incoming.id)
        .is_none_or(|existing| existing.quantity < MAX_QUANTITY)
}

fn has_quantity_payload(_: &Context, event: &Event) -> bool {
    event
        .payload_u64("quantity")
        .is_some_and(|quantity| quantity <= MAX_QUANTITY)
}

fn has_code_payload(_: &Context, event: &Event) -> bool {
    event.payload.is_string()
}

fn with_items(items: Vec<CartItem>, total: f64) -> Partial {
    patch! { "items" => items, "total" => total }
}

/// Add one unit of the payload item, merging by id.
fn add_item(context: &Context, event: &Event) -> Partial {
    let Some(mut incoming) = event.payload.as_object().and_then(CartItem::from_payload) else {
        return Partial::new();
    };
    if incoming.id.is_null() {
        incoming.id = Value::String(Uuid::new_v4().to_string());
    }
    let mut items = items(context);
    let total = context.f64("total").unwrap_or(0.0);

    let added_price = match items.iter_mut().find(|item| item.id == incoming.id) {
        Some(existing) if existing.quantity < MAX_QUANTITY => {
            existing.quantity += 1;
            existing.price
        }
        Some(_) => return Partial::new(),
        None => {
            let price = incoming.price;
            items.push(incoming);
            price
        }
    };

    with_items(items, total + added_price)
}

/// Remove the line whose id is the payload.
fn remove_item(context: &Context, event: &Event) -> Partial {
    let id = event.payload_field("id").unwrap_or(&event.payload);
    let mut items = items(context);
    let total = context.f64("total").unwrap_or(0.0);

    let removed: f64 = items
        .iter()
        .filter(|item| item.id == *id)
        .map(CartItem::subtotal)
        .sum();
    items.retain(|item| item.id != *id);

    with_items(items, total - removed)
}

/// Set a line's quantity; zero removes the line.
fn update_quantity(context: &Context, event: &Event) -> Partial {
    let (Some(id), Some(quantity)) = (event.payload_field("itemId"), event.payload_u64("quantity")) else {
        return Partial::new();
    };
    let mut items = items(context);
    let mut total = context.f64("total").unwrap_or(0.0);

    if let Some(item) = items.iter_mut().find(|item| item.id == *id) {
        total += item.price * (quantity as f64 - item.quantity as f64);
        item.quantity = quantity;
    }
    items.retain(|item| item.quantity > 0);

    with_items(items, total)
}

fn apply_discount(_: &Context, event: &Event) -> Partial {
    let code = event.payload.as_str().unwrap_or_default();
    patch! { "discountCode" => code, "appliedDiscount" => discount_rate(code) }
}

fn reset() -> Action {
    Action::reset(initial_context())
}

fn clear_cart() -> Transition<CartState> {
    Transition::to(CartState::Empty).action(reset())
}

fn checkout() -> Transition<CartState> {
    Transition::to(CartState::Processing)
}

/// Build the cart machine definition.
pub fn machine() -> MachineDefinition<CartState> {
    MachineDefinition::builder("cart")
        .initial(CartState::Empty)
        .context(initial_context())
        .state(
            StateNode::build(CartState::Empty)
                .on(
                    "ADD_ITEM",
                    Transition::to(CartState::Active)
                        .when(can_add_item)
                        .assign(add_item),
                )
                .on("CLEAR_CART", clear_cart()),
        )
        .state(
            StateNode::build(CartState::Active)
                .on(
                    "ADD_ITEM",
                    Transition::internal().when(can_add_item).assign(add_item),
                )
                .on("REMOVE_ITEM", Transition::internal().assign(remove_item))
                .on(
                    "UPDATE_QUANTITY",
                    Transition::internal()
                        .when(has_quantity_payload)
                        .assign(update_quantity),
                )
                .on(
                    "APPLY_DISCOUNT",
                    Transition::to(CartState::WithDiscount)
                        .when(has_code_payload)
                        .assign(apply_discount),
                )
                .on("CHECKOUT", checkout())
                .on("CLEAR_CART", clear_cart()),
        )
        .state(
            StateNode::build(CartState::WithDiscount)
                .on(
                    "ADD_ITEM",
                    Transition::to(CartState::Active)
                        .when(can_add_item)
                        .assign(add_item)
                        .action(Action::reset(cleared_discount())),
                )
                .on(
                    "REMOVE_DISCOUNT",
                    Transition::to(CartState::Active).action(Action::reset(cleared_discount())),
                )
                .on("CHECKOUT", checkout())
                .on("CLEAR_CART", clear_cart()),
        )
        .state(
            StateNode::build(CartState::Processing)
                .after(CHECKOUT_DELAY, Transition::to(CartState::Success))
                .on("CLEAR_CART", clear_cart()),
        )
        .state(StateNode::build(CartState::Success).on("RESTART", Transition::to(CartState::Empty).action(reset())))
        .build()
        .expect("cart machine is statically valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Snapshot;
    use crate::definition::Resolution;
    use serde_json::json;

    fn send(
        machine: &MachineDefinition<CartState>,
        snapshot: &Snapshot<CartState>,
        kind: &str,
        payload: Value,
    ) -> Snapshot<CartState> {
        machine.transition(snapshot, &Event::new(kind, payload)).snapshot
    }

    fn tea() -> Value {
        json!({ "id": 1, "name": "Tea", "price": 4.5, "emoji": "🍵" })
    }

    fn cake() -> Value {
        json!({ "id": 2, "name": "Cake", "price": 10.0 })
    }

    fn filled() -> (MachineDefinition<CartState>, Snapshot<CartState>) {
        let machine = machine();
        let start = machine.initial_snapshot(None);
        let one = send(&machine, &start, "ADD_ITEM", tea());
        let two = send(&machine, &one, "ADD_ITEM", tea());
        let three = send(&machine, &two, "ADD_ITEM", cake());
        (machine, three)
    }

    #[test]
    fn first_item_activates_the_cart() {
        let machine = machine();
        let start = machine.initial_snapshot(None);

        let active = send(&machine, &start, "ADD_ITEM", tea());

        assert_eq!(active.state, CartState::Active);
        assert_eq!(active.context.f64("total"), Some(4.5));
        let items = items(&active.context);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].emoji.as_deref(), Some("🍵"));
    }

    #[test]
    fn adding_the_same_id_merges_quantity() {
        let (_, snapshot) = filled();

        let items = items(&snapshot.context);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(snapshot.context.f64("total"), Some(19.0));
    }

    #[test]
    fn missing_id_gets_a_generated_one() {
        let machine = machine();
        let start = machine.initial_snapshot(None);

        let active = send(&machine, &start, "ADD_ITEM", json!({ "name": "Mystery", "price": 1.0 }));

        let items = items(&active.context);
        assert!(items[0].id.as_str().is_some_and(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn non_object_item_is_rejected() {
        let machine = machine();
        let start = machine.initial_snapshot(None);

        let step = machine.transition(&start, &Event::new("ADD_ITEM", json!(42)));

        assert_eq!(step.resolution, Resolution::Rejected);
        assert_eq!(step.snapshot.state, CartState::Empty);
    }

    #[test]
    fn mistyped_item_is_rejected() {
        let (machine, snapshot) = filled();

        let step = machine.transition(
            &snapshot,
            &Event::new("ADD_ITEM", json!({ "id": 1, "name": "Tea", "price": "4.5" })),
        );

        assert_eq!(step.resolution, Resolution::Rejected);
        assert_eq!(items(&step.snapshot.context).len(), 2);
        assert_eq!(step.snapshot.context.f64("total"), Some(19.0));
    }

    #[test]
    fn quantity_above_the_cap_is_rejected() {
        let (machine, snapshot) = filled();

        let step = machine.transition(
            &snapshot,
            &Event::new("UPDATE_QUANTITY", json!({ "itemId": 1, "quantity": u64::MAX })),
        );

        assert_eq!(step.resolution, Resolution::Rejected);
        assert_eq!(items(&step.snapshot.context)[0].quantity, 2);
    }

    #[test]
    fn full_line_refuses_another_unit() {
        let (machine, snapshot) = filled();
        let full = send(
            &machine,
            &snapshot,
            "UPDATE_QUANTITY",
            json!({ "itemId": 1, "quantity": MAX_QUANTITY }),
        );
        assert_eq!(items(&full.context)[0].quantity, MAX_QUANTITY);

        let step = machine.transition(&full, &Event::new("ADD_ITEM", tea()));

        assert_eq!(step.resolution, Resolution::Rejected);
        assert_eq!(items(&step.snapshot.context)[0].quantity, MAX_QUANTITY);
        let expected: f64 = items(&full.context).iter().map(CartItem::subtotal).sum();
        assert_eq!(step.snapshot.context.f64("total"), Some(expected));
    }

    #[test]
    fn remove_item_subtracts_the_whole_line() {
        let (machine, snapshot) = filled();

        let removed = send(&machine, &snapshot, "REMOVE_ITEM", json!(1));

        assert_eq!(items(&removed.context).len(), 1);
        assert_eq!(removed.context.f64("total"), Some(10.0));
        assert_eq!(removed.state, CartState::Active);
    }

    #[test]
    fn update_quantity_adjusts_total_incrementally() {
        let (machine, snapshot) = filled();

        let updated = send(
            &machine,
            &snapshot,
            "UPDATE_QUANTITY",
            json!({ "itemId": 2, "quantity": 3 }),
        );

        assert_eq!(updated.context.f64("total"), Some(39.0));
    }

    #[test]
    fn update_quantity_to_zero_removes_the_line() {
        let (machine, snapshot) = filled();

        let updated = send(
            &machine,
            &snapshot,
            "UPDATE_QUANTITY",
            json!({ "itemId": 1, "quantity": 0 }),
        );

        assert_eq!(items(&updated.context).len(), 1);
        assert_eq!(updated.context.f64("total"), Some(10.0));
    }

    #[test]
    fn update_quantity_requires_a_whole_quantity() {
        let (machine, snapshot) = filled();

        let step = machine.transition(
            &snapshot,
            &Event::new("UPDATE_QUANTITY", json!({ "itemId": 1, "quantity": -2 })),
        );

        assert_eq!(step.resolution, Resolution::Rejected);
    }

    #[test]
    fn discount_codes_map_to_fixed_rates() {
        assert_eq!(discount_rate("SUMMER20"), 0.2);
        assert_eq!(discount_rate("VIPFIRST"), 0.3);
        assert_eq!(discount_rate("WELCOME10"), 0.1);
        assert_eq!(discount_rate("FREESTUFF"), 0.0);
    }

    #[test]
    fn applying_a_discount_enters_with_discount() {
        let (machine, snapshot) = filled();

        let discounted = send(&machine, &snapshot, "APPLY_DISCOUNT", json!("SUMMER20"));

        assert_eq!(discounted.state, CartState::WithDiscount);
        assert_eq!(discounted.context.str("discountCode"), Some("SUMMER20"));
        assert_eq!(discounted.context.f64("appliedDiscount"), Some(0.2));
        assert!((discounted_total(&discounted.context) - 15.2).abs() < 1e-9);
    }

    #[test]
    fn adding_with_a_discount_clears_it() {
        let (machine, snapshot) = filled();
        let discounted = send(&machine, &snapshot, "APPLY_DISCOUNT", json!("VIPFIRST"));

        let active = send(&machine, &discounted, "ADD_ITEM", cake());

        assert_eq!(active.state, CartState::Active);
        assert_eq!(active.context.f64("appliedDiscount"), Some(0.0));
        assert_eq!(active.context.str("discountCode"), Some(""));
        assert_eq!(items(&active.context)[1].quantity, 2);
        assert_eq!(active.context.f64("total"), Some(29.0));
    }

    #[test]
    fn remove_discount_returns_to_active() {
        let (machine, snapshot) = filled();
        let discounted = send(&machine, &snapshot, "APPLY_DISCOUNT", json!("WELCOME10"));

        let active = send(&machine, &discounted, "REMOVE_DISCOUNT", Value::Null);

        assert_eq!(active.state, CartState::Active);
        assert_eq!(discounted_total(&active.context), 19.0);
    }

    #[test]
    fn clear_cart_resets_from_every_non_success_state() {
        let (machine, active) = filled();
        let discounted = send(&machine, &active, "APPLY_DISCOUNT", json!("SUMMER20"));
        let processing = send(&machine, &active, "CHECKOUT", Value::Null);
        let empty = machine.initial_snapshot(None);

        for snapshot in [empty, active, discounted, processing] {
            let cleared = send(&machine, &snapshot, "CLEAR_CART", Value::Null);
            assert_eq!(cleared.state, CartState::Empty);
            assert_eq!(cleared.context, Context::from(initial_context()));
        }
    }

    #[test]
    fn checkout_is_unhandled_while_processing() {
        let (machine, active) = filled();
        let processing = send(&machine, &active, "CHECKOUT", Value::Null);

        let step = machine.transition(&processing, &Event::named("CHECKOUT"));

        assert_eq!(processing.state, CartState::Processing);
        assert_eq!(step.resolution, Resolution::Unhandled);
    }

    #[test]
    fn checkout_delay_leads_to_success_and_restart_resets() {
        let (machine, active) = filled();
        let processing = send(&machine, &active, "CHECKOUT", Value::Null);

        let success = send(&machine, &processing, "after.2000.processing", Value::Null);
        assert_eq!(success.state, CartState::Success);

        let restarted = send(&machine, &success, "RESTART", Value::Null);
        assert_eq!(restarted.state, CartState::Empty);
        assert_eq!(restarted.context.f64("total"), Some(0.0));
        assert!(items(&restarted.context).is_empty());
    }
}
