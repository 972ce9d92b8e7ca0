//! The validation pass.
//!
//! A pass never fails: token problems and field errors become error text,
//! and the outcome is cached as a [`Verdict`] until revalidation.

use tracing::{debug, warn};

use crate::request::Request;
use crate::session::SessionStore;

use super::TOKEN_FIELD;
use super::csrf::verify_token;
use super::types::{Form, Verdict};

impl Form {
    /// Whether the submission is valid, validating first if needed.
    ///
    /// The cached verdict is reused unless `revalidate` is set.
    pub fn is_correct(&mut self, request: &Request, session: &dyn SessionStore, revalidate: bool) -> bool {
        if self.verdict == Verdict::Unvalidated || revalidate {
            self.validate(request, session);
        }
        self.verdict == Verdict::Valid
    }

    /// Run one validation pass.
    ///
    /// Token errors come first (at most one per pass), then field errors in
    /// registration order, then form-level errors added by the caller.
    pub fn validate(&mut self, request: &Request, session: &dyn SessionStore) -> &mut Self {
        let mut errors = Vec::new();

        if self.use_token {
            let submitted = request.params(self.method).get_str(TOKEN_FIELD);
            if let Err(rejection) = verify_token(session, submitted) {
                warn!(form = %self.name, reason = rejection.reason(), "form token rejected");
                errors.push(self.token_error.clone());
            }
        }

        for (_, field) in self.registry.iter() {
            if let Some(checked) = field.as_errors() {
                let error = checked.errors();
                if !error.trim().is_empty() {
                    errors.push(error);
                }
            }
        }

        self.collected = errors;

        let failed = !self.collected.is_empty() || !self.errors().trim().is_empty();
        self.verdict = if failed {
            Verdict::Invalid
        } else {
            Verdict::Valid
        };

        debug!(
            form = %self.name,
            errors = self.collected.len() + self.form_errors.len(),
            valid = !failed,
            "form validated"
        );

        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::form::csrf::get_token;
    use crate::form::{Form, Verdict};
    use crate::request::Request;
    use crate::session::MemorySession;

    #[test]
    fn test_form_without_fields_is_valid() {
        let mut form = Form::new("f");
        let session = MemorySession::new();
        assert!(form.is_correct(&Request::post([("form", "f")]), &session, false));
        assert_eq!(form.verdict(), Verdict::Valid);
        assert_eq!(form.errors(), "");
    }

    #[test]
    fn test_missing_token_yields_one_error() {
        let mut plain = MemorySession::new();
        let mut form = Form::builder("f").build_with_token(&mut plain);

        let empty_session = MemorySession::new();
        form.validate(&Request::post([("form", "f")]), &empty_session);

        assert_eq!(form.verdict(), Verdict::Invalid);
        assert_eq!(form.errors(), "Invalid token");
    }

    #[test]
    fn test_matching_token_is_valid() {
        let mut session = MemorySession::new();
        let mut form = Form::builder("f")
            .token_error("Stale form")
            .build_with_token(&mut session);
        let token = get_token(&mut session);

        let request = Request::post([("form", "f"), ("form_token", token.as_str())]);
        assert!(form.is_correct(&request, &session, false));
    }

    #[test]
    fn test_wrong_token_uses_custom_message() {
        let mut session = MemorySession::new();
        let mut form = Form::builder("f")
            .token_error("Stale form")
            .build_with_token(&mut session);

        let request = Request::post([("form", "f"), ("form_token", "forged")]);
        assert!(!form.is_correct(&request, &session, false));
        assert_eq!(form.errors(), "Stale form");
    }

    #[test]
    fn test_field_errors_are_joined_in_order() {
        let mut form = Form::new("f");
        form.add_text("a", None).unwrap();
        form.add_text("b", None).unwrap();
        let request = Request::post([("form", "f")]);

        form.element_mut("b").unwrap().is_filled(&request, "B missing");
        form.element_mut("a").unwrap().is_filled(&request, "A missing");

        assert!(!form.is_correct(&request, &MemorySession::new(), false));
        assert_eq!(form.errors(), "A missing\nB missing");
    }

    #[test]
    fn test_caller_errors_are_kept_and_appended() {
        let mut form = Form::new("f");
        form.add_text("a", None).unwrap();
        let request = Request::post([("form", "f")]);

        form.add_error("Account locked");
        form.element_mut("a").unwrap().is_filled(&request, "A missing");

        assert!(!form.is_correct(&request, &MemorySession::new(), false));
        assert_eq!(form.errors(), "A missing\nAccount locked");
    }

    #[test]
    fn test_caller_error_alone_forces_invalid() {
        let mut form = Form::new("f");
        form.add_error("Nope");
        assert!(!form.is_correct(&Request::post([("form", "f")]), &MemorySession::new(), false));
    }

    #[test]
    fn test_error_after_validation_flips_verdict() {
        let mut form = Form::new("f");
        let session = MemorySession::new();
        let request = Request::post([("form", "f")]);
        assert!(form.is_correct(&request, &session, false));

        form.add_error("Duplicate e-mail address");
        assert!(!form.is_correct(&request, &session, false));
        assert!(!form.is_correct(&request, &session, true));
    }

    #[test]
    fn test_revalidate_recollects_field_errors() {
        let mut form = Form::new("f");
        form.add_text("a", None).unwrap();
        let session = MemorySession::new();
        let request = Request::post([("form", "f")]);

        assert!(form.is_correct(&request, &session, false));
        form.element_mut("a").unwrap().add_error("late error");

        assert!(form.is_correct(&request, &session, false));
        assert!(!form.is_correct(&request, &session, true));
        assert_eq!(form.errors(), "late error");
    }
}
