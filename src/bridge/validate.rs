//! Optional validation.
//!
//! A type opts in by implementing [`Validate`]. Types that can check
//! themselves return their [`Validator`]; the rest keep the default and
//! validate trivially.

use crate::request::Request;
use crate::rpc::BoxError;
use crate::rpc::message::Empty;

/// Something that can check itself.
pub trait Validator {
    fn validate(&self) -> Result<(), BoxError>;
}

/// Exposes an optional [`Validator`].
pub trait Validate {
    fn validator(&self) -> Option<&dyn Validator> {
        None
    }
}

/// Runs `value`'s validator if it has one and returns its verdict unchanged.
pub fn validate<T: Validate + ?Sized>(value: &T) -> Result<(), BoxError> {
    match value.validator() {
        Some(validator) => validator.validate(),
        None => Ok(()),
    }
}

impl Validate for () {}
impl Validate for str {}
impl Validate for String {}
impl Validate for serde_json::Value {}
impl Validate for Request {}
impl Validate for Empty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("name must not be empty")]
    struct EmptyName;

    struct CreateUser {
        name: String,
    }

    impl Validator for CreateUser {
        fn validate(&self) -> Result<(), BoxError> {
            if self.name.is_empty() {
                return Err(Box::new(EmptyName));
            }
            Ok(())
        }
    }

    impl Validate for CreateUser {
        fn validator(&self) -> Option<&dyn Validator> {
            Some(self)
        }
    }

    struct Ping;
    impl Validate for Ping {}

    #[test]
    fn no_capability_is_ok() {
        assert!(validate(&Ping).is_ok());
        assert!(validate("anything").is_ok());
        assert!(validate(&serde_json::json!({"x": 1})).is_ok());
    }

    #[test]
    fn failing_validator_error_is_returned_as_is() {
        let err = validate(&CreateUser { name: String::new() }).unwrap_err();
        assert_eq!(err.downcast_ref::<EmptyName>(), Some(&EmptyName));
    }

    #[test]
    fn passing_validator_is_ok() {
        assert!(validate(&CreateUser { name: "ada".into() }).is_ok());
    }
}
