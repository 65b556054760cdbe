//! Sign-up form with field-level and whole-form validation.
//!
//! Field validation events (`VALIDATE_EMAIL`, `VALIDATE_PASSWORD`,
//! `VALIDATE_CONFIRM_PASSWORD`) toggle one entry of `errors` each. `SUBMIT`
//! either enters `submitting` or replaces `errors` with every problem found
//! in the current context.

use crate::core::{Action, Context, Event, Partial};
use crate::definition::{MachineDefinition, StateNode, Transition};
use crate::{patch, state_enum};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

state_enum! {
    /// States of the form machine.
    pub enum FormState {
        Idle = "idle",
        Editing = "editing",
        Submitting = "submitting",
        Success = "success",
    }
}

/// How long a submission takes.
pub const SUBMIT_DELAY: Duration = Duration::from_millis(2000);

pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PASSWORD_MESSAGE: &str =
    "Password must be at least 8 characters long and contain uppercase letters and numbers";
pub const CONFIRM_PASSWORD_MESSAGE: &str = "The two passwords do not match";
pub const TERMS_MESSAGE: &str = "Please agree to the terms of service";

/// Context fields `FIELD_CHANGED` may write.
pub const EDITABLE_FIELDS: [&str; 4] = ["email", "password", "confirmPassword", "agreeToTerms"];

/// A validation problem attached to one key of `errors`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// At least 8 characters with an uppercase letter and a digit.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn check(ok: bool, field: &'static str, message: &'static str) -> Validation<(), NonEmptyVec<FieldError>> {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(FieldError { field, message })
    }
}

/// Validate the whole form, accumulating every failing field.
pub fn validate_form(context: &Context) -> Validation<(), NonEmptyVec<FieldError>> {
    let email = context.str("email").unwrap_or_default();
    let password = context.str("password").unwrap_or_default();
    let confirm = context.str("confirmPassword").unwrap_or_default();

    let checks = vec![
        check(is_valid_email(email), "email", EMAIL_MESSAGE),
        check(is_valid_password(password), "password", PASSWORD_MESSAGE),
        check(password == confirm, "confirmPassword", CONFIRM_PASSWORD_MESSAGE),
        check(context.bool("agreeToTerms") == Some(true), "terms", TERMS_MESSAGE),
    ];

    Validation::all_vec(checks).map(|_| ())
}

/// Errors currently shown for the form.
pub fn errors(context: &Context) -> Map<String, Value> {
    context.object("errors").cloned().unwrap_or_default()
}

fn initial_context() -> Partial {
    patch! {
        "email" => "",
        "password" => "",
        "confirmPassword" => "",
        "agreeToTerms" => false,
        "errors" => Map::new(),
        "submitting" => false,
    }
}

fn edits_known_field(_: &Context, event: &Event) -> bool {
    event
        .payload_str("field")
        .is_some_and(|field| EDITABLE_FIELDS.contains(&field))
}

fn change_field(_: &Context, event: &Event) -> Partial {
    let mut partial = Partial::new();
    if let Some(field) = event.payload_str("field") {
        let value = event.payload_field("value").cloned().unwrap_or(Value::Null);
        partial.insert(field.to_string(), value);
    }
    partial
}

fn set_error(field: &'static str, message: &'static str) -> impl Fn(&Context, &Event) -> Partial {
    move |context: &Context, _: &Event| {
        let mut errors = errors(context);
        errors.insert(field.to_string(), Value::from(message));
        patch! { "errors" => errors }
    }
}

fn clear_error(field: &'static str) -> impl Fn(&Context, &Event) -> Partial {
    move |context: &Context, _: &Event| {
        let mut errors = errors(context);
        errors.remove(field);
        patch! { "errors" => errors }
    }
}

fn confirm_password(context: &Context, event: &Event) -> Partial {
    let password = context.str("password").unwrap_or_default();
    let confirmation = event.payload.as_str().unwrap_or_default();
    if password == confirmation {
        clear_error("confirmPassword")(context, event)
    } else {
        set_error("confirmPassword", CONFIRM_PASSWORD_MESSAGE)(context, event)
    }
}

fn form_is_valid(context: &Context, _: &Event) -> bool {
    validate_form(context).is_success() && errors(context).is_empty()
}

fn collect_errors(context: &Context, _: &Event) -> Partial {
    let mut errors = Map::new();
    if let Validation::Failure(failures) = validate_form(context) {
        for failure in failures.iter() {
            errors.insert(failure.field.to_string(), Value::from(failure.message));
        }
    }
    patch! { "errors" => errors }
}

fn reset() -> Transition<FormState> {
    Transition::to(FormState::Idle).action(Action::reset(initial_context()))
}

/// Build the form machine definition.
pub fn machine() -> MachineDefinition<FormState> {
    MachineDefinition::builder("form")
        .initial(FormState::Idle)
        .context(initial_context())
        .state(
            StateNode::build(FormState::Idle).on(
                "FIELD_CHANGED",
                Transition::to(FormState::Editing)
                    .when(edits_known_field)
                    .assign(change_field),
            ),
        )
        .state(
            StateNode::build(FormState::Editing)
                .on(
                    "FIELD_CHANGED",
                    Transition::internal().when(edits_known_field).assign(change_field),
                )
                .on_first(
                    "VALIDATE_EMAIL",
                    vec![
                        Transition::internal()
                            .when(|_, event| event.payload.as_str().is_some_and(is_valid_email))
                            .assign(clear_error("email")),
                        Transition::internal().assign(set_error("email", EMAIL_MESSAGE)),
                    ],
                )
                .on_first(
                    "VALIDATE_PASSWORD",
                    vec![
                        Transition::internal()
                            .when(|_, event| event.payload.as_str().is_some_and(is_valid_password))
                            .assign(clear_error("password")),
                        Transition::internal().assign(set_error("password", PASSWORD_MESSAGE)),
                    ],
                )
                .on("VALIDATE_CONFIRM_PASSWORD", Transition::internal().assign(confirm_password))
                .on(
                    "AGREE_TO_TERMS",
                    Transition::internal().assign(|_, event| {
                        patch! { "agreeToTerms" => event.payload.as_bool().unwrap_or(false) }
                    }),
                )
                .on_first(
                    "SUBMIT",
                    vec![
                        Transition::to(FormState::Submitting).when(form_is_valid),
                        Transition::internal().assign(collect_errors),
                    ],
                )
                .on("RESET", reset()),
        )
        .state(
            StateNode::build(FormState::Submitting)
                .entry(Action::set("submitting", true))
                .after(SUBMIT_DELAY, Transition::to(FormState::Success)),
        )
        .state(
            StateNode::build(FormState::Success)
                .entry(Action::set("submitting", false))
                .on("RESET", reset()),
        )
        .build()
        .expect("form machine is statically valid")
}
