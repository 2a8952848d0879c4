//! crates/folio_core/src/validation.rs
//!
//! Local input checks that run before anything is sent to a remote service.

use crate::domain::{ItemDraft, Upload};

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
#[error("{}", render(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field,
                message: message.into(),
            }],
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn push(&mut self, field: &'static str, message: &str) {
        self.errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn render(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

const MIN_PASSWORD_LEN: usize = 6;

/// Checks the registration form.
pub fn validate_registration(email: &str, password: &str, name: &str) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    let email = email.trim();
    if email.is_empty() {
        errors.push("email", "Email is required");
    } else if !email.contains('@') {
        errors.push("email", "Email is invalid");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", "Password must be at least 6 characters");
    }
    if name.trim().is_empty() {
        errors.push("name", "Name is required");
    }
    errors.into_result()
}

impl ItemDraft {
    /// Checks the draft the way the publishing form does.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        if self.title.trim().is_empty() {
            errors.push("title", "Title is required");
        }
        if self.author.trim().is_empty() {
            errors.push("author", "Author name is required");
        }
        if self.description.trim().is_empty() {
            errors.push("description", "Description is required");
        }
        if self.total_pages == 0 {
            errors.push("pages", "Page count must be greater than 0");
        }
        match &self.cover {
            None => errors.push("cover", "Cover image is required"),
            Some(upload) if !upload.mime_type.starts_with("image/") => {
                errors.push("cover", "Please select a valid image file")
            }
            Some(upload) if is_empty(upload) => errors.push("cover", "Cover image is empty"),
            Some(_) => {}
        }
        match &self.content {
            None => errors.push("pdf", "PDF file is required"),
            Some(upload) if upload.mime_type != "application/pdf" => {
                errors.push("pdf", "Please select a valid PDF file")
            }
            Some(upload) if is_empty(upload) => errors.push("pdf", "PDF file is empty"),
            Some(_) => {}
        }
        errors.into_result()
    }
}

fn is_empty(upload: &Upload) -> bool {
    upload.data.is_empty()
}
