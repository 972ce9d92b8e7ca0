//! Submission detection and request cleanup.

use tracing::debug;

use crate::request::Request;

use super::types::Form;

impl Form {
    /// Whether `request` is a submission of this form.
    ///
    /// Named forms look for their identity key in the store of their method.
    /// Anonymous forms can only compare the HTTP method, so any request with
    /// the right method counts as submitted.
    pub fn is_submitted(&self, request: &Request) -> bool {
        if self.name.is_empty() {
            self.method.matches(&request.method)
        } else {
            self.binding().is_submitted(request)
        }
    }

    /// Restrict the method's parameter store to the keys this form declares.
    ///
    /// Undeclared keys are removed and missing ones set to an empty string.
    /// Running it twice leaves the store unchanged the second time.
    pub fn cleanup_fields(&self, request: &mut Request) {
        let report = self.registry.cleanup(request.params_mut(self.method));
        debug!(
            form = %self.name,
            removed = report.removed,
            inserted = report.inserted,
            "request parameters cleaned up"
        );
    }
}
