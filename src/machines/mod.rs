//! Ready-made machines.
//!
//! - [`cart`]: shopping cart with discounts and a timed checkout
//! - [`form`]: sign-up form with field and whole-form validation
//! - [`data_page`]: searchable table with role-based editing over an async backend

pub mod cart;
pub mod data_page;
pub mod form;
