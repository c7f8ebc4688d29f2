use std::fmt;

use crate::response::ApiResponse;

/// The first rule a request violated.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Ordered field checks. Rules run in call order and stop at the first
/// violation; later calls become no-ops once an error is recorded.
#[derive(Debug, Default)]
pub struct Validation {
    error: Option<FieldError>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&FieldError> {
        self.error.as_ref()
    }

    fn fail(&mut self, field: &'static str, message: String) {
        if self.error.is_none() {
            self.error = Some(FieldError { field, message });
        }
    }

    /// Present and not blank.
    pub fn required(&mut self, field: &'static str, value: Option<&str>) -> &mut Self {
        if !self.has_errors() && value.map(|v| v.trim().is_empty()).unwrap_or(true) {
            self.fail(field, "cannot be empty".to_string());
        }
        self
    }

    /// At most `max` characters. Absent values pass.
    pub fn max_size(&mut self, field: &'static str, value: Option<&str>, max: usize) -> &mut Self {
        if self.has_errors() {
            return self;
        }
        if let Some(v) = value {
            if v.chars().count() > max {
                self.fail(field, format!("maximum size is {}", max));
            }
        }
        self
    }

    pub fn min(&mut self, field: &'static str, value: Option<i64>, min: i64) -> &mut Self {
        if self.has_errors() {
            return self;
        }
        if let Some(v) = value {
            if v < min {
                self.fail(field, format!("minimum is {}", min));
            }
        }
        self
    }

    pub fn range(&mut self, field: &'static str, value: Option<i64>, min: i64, max: i64) -> &mut Self {
        if self.has_errors() {
            return self;
        }
        if let Some(v) = value {
            if v < min || v > max {
                self.fail(field, format!("range is {} to {}", min, max));
            }
        }
        self
    }

    /// Parse an optional integer field. Blank counts as absent; anything
    /// else that is not an integer is a violation.
    pub fn integer(&mut self, field: &'static str, value: Option<&str>) -> Option<i64> {
        let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
        match raw.parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                self.fail(field, "must be an integer".to_string());
                None
            }
        }
    }
}

/// Turns a raw request form into a typed value, recording rule violations.
pub trait Bind {
    type Output;

    fn bind(&self, v: &mut Validation) -> Self::Output;
}

/// Bind `form` and run its rules. On the first violation the error is
/// logged and the standard invalid-params response is returned.
pub fn bind_and_valid<B: Bind>(form: &B) -> Result<B::Output, ApiResponse> {
    let mut v = Validation::new();
    let out = form.bind(&mut v);
    match v.error() {
        Some(err) => {
            log::info!("{}", err);
            Err(ApiResponse::invalid_params())
        }
        None => Ok(out),
    }
}

/// Borrow an optional form string, treating blank as absent.
pub fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_blank() {
        let mut v = Validation::new();
        v.required("name", None);
        assert_eq!(v.error().unwrap().field, "name");

        let mut v = Validation::new();
        v.required("name", Some("   "));
        assert!(v.has_errors());

        let mut v = Validation::new();
        v.required("name", Some("go"));
        assert!(!v.has_errors());
    }

    #[test]
    fn max_size_counts_chars_not_bytes() {
        let mut v = Validation::new();
        v.max_size("name", Some("标签标签"), 4);
        assert!(!v.has_errors());
        v.max_size("name", Some("标签标签标"), 4);
        assert!(v.has_errors());
    }

    #[test]
    fn first_violation_wins() {
        let mut v = Validation::new();
        v.required("name", None)
            .max_size("created_by", Some("xxxxx"), 2)
            .range("state", Some(7), 0, 1);
        let err = v.error().unwrap();
        assert_eq!(err.field, "name");
        assert_eq!(err.to_string(), "name: cannot be empty");
    }

    #[test]
    fn numeric_rules() {
        let mut v = Validation::new();
        v.min("id", Some(1), 1).range("state", Some(0), 0, 1);
        assert!(!v.has_errors());

        let mut v = Validation::new();
        v.min("id", Some(0), 1);
        assert_eq!(v.error().unwrap().message, "minimum is 1");

        let mut v = Validation::new();
        v.range("state", Some(2), 0, 1);
        assert_eq!(v.error().unwrap().field, "state");

        // absent values are left to `required`
        let mut v = Validation::new();
        v.min("id", None, 1).range("state", None, 0, 1);
        assert!(!v.has_errors());
    }

    #[test]
    fn integer_parsing() {
        let mut v = Validation::new();
        assert_eq!(v.integer("state", Some(" 1 ")), Some(1));
        assert_eq!(v.integer("state", Some("")), None);
        assert_eq!(v.integer("state", None), None);
        assert!(!v.has_errors());

        assert_eq!(v.integer("state", Some("one")), None);
        assert_eq!(v.error().unwrap().message, "must be an integer");
    }

    struct ShortName {
        name: Option<String>,
    }

    impl Bind for ShortName {
        type Output = String;

        fn bind(&self, v: &mut Validation) -> String {
            v.required("name", text(&self.name)).max_size("name", text(&self.name), 3);
            self.name.clone().unwrap_or_default()
        }
    }

    #[test]
    fn bind_and_valid_maps_to_invalid_params() {
        let ok = bind_and_valid(&ShortName { name: Some("go".into()) });
        assert_eq!(ok.unwrap(), "go");

        let err = bind_and_valid(&ShortName { name: Some("rust".into()) }).unwrap_err();
        assert_eq!(err.status, rocket::http::Status::BadRequest);
        assert_eq!(err.code, crate::codes::Code::InvalidParams);
    }
}
