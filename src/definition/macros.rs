//! Macros for ergonomic machine construction.

/// Generate a state enum and its `State` implementation.
///
/// Each variant may carry a label used by `State::name`, `Display` and
/// serde; unlabelled variants use their identifier.
///
/// # Example
///
/// ```
/// use statecraft::core::State;
/// use statecraft::state_enum;
///
/// state_enum! {
///     pub enum CheckoutState {
///         Cart = "cart",
///         Paying = "paying",
///         Done,
///     }
/// }
///
/// assert_eq!(CheckoutState::Paying.name(), "paying");
/// assert_eq!(CheckoutState::Done.to_string(), "Done");
/// ```
#[macro_export]
macro_rules! state_enum {
    (@name $variant:ident) => {
        stringify!($variant)
    };
    (@name $variant:ident $label:literal) => {
        $label
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $label:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $(#[serde(rename = $label)])?
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@name $variant $($label)?)),*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::core::State::name(self))
            }
        }
    };
}

/// Build a [`Partial`](crate::core::Partial) context update.
///
/// Values are converted with `serde_json::json!`, so any `Serialize` value
/// works.
///
/// # Example
///
/// ```
/// use statecraft::patch;
///
/// let partial = patch! { "total" => 0.0, "discountCode" => "" };
/// assert_eq!(partial.len(), 2);
/// ```
#[macro_export]
macro_rules! patch {
    () => {
        $crate::core::Partial::new()
    };
    ($($key:literal => $value:expr),+ $(,)?) => {{
        let mut partial = $crate::core::Partial::new();
        $(
            partial.insert(::std::string::String::from($key), $crate::__private::json!($value));
        )+
        partial
    }};
}

#[cfg(test)]
mod tests {
    use crate::core::State;
    use serde_json::json;

    state_enum! {
        enum TestState {
            Initial = "initial",
            Processing,
            Complete = "complete",
        }
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(TestState::Initial.name(), "initial");
        assert_eq!(TestState::Processing.name(), "Processing");
        assert_eq!(TestState::Complete.to_string(), "complete");
    }

    #[test]
    fn state_enum_labels_drive_serde() {
        let json = serde_json::to_string(&TestState::Initial).unwrap();
        assert_eq!(json, r#""initial""#);

        let back: TestState = serde_json::from_str(r#""complete""#).unwrap();
        assert_eq!(back, TestState::Complete);
    }

    #[test]
    fn state_enum_supports_visibility() {
        state_enum! {
            pub enum PublicState {
                A,
                B,
            }
        }

        assert_eq!(PublicState::B.name(), "B");
    }

    #[test]
    fn patch_converts_expressions() {
        let items = vec![1, 2, 3];
        let partial = patch! { "items" => items, "total" => 1.5 + 1.0, "label" => "x" };

        assert_eq!(partial["items"], json!([1, 2, 3]));
        assert_eq!(partial["total"], json!(2.5));
        assert_eq!(partial["label"], json!("x"));
    }

    #[test]
    fn empty_patch_is_empty() {
        let partial = patch! {};
        assert!(partial.is_empty());
    }
}
