use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, FieldError};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(
        length(min = 1, message = "Email field has to be filled."),
        email(message = "This is not a valid email.")
    )]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 32,
        message = "Password should contain between 1 and 32 characters."
    ))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, message = "First name field has to be filled."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name field has to be filled."))]
    pub last_name: String,
    #[validate(
        length(min = 1, message = "Email field has to be filled."),
        email(message = "This is not a valid email.")
    )]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 32,
        message = "Password should contain between 1 and 32 characters."
    ))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewPayload {
    #[validate(length(
        min = 1,
        max = 13,
        message = "ISBN should contain between 1 and 13 characters."
    ))]
    pub isbn: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title should contain between 1 and 100 characters."
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Author should contain between 1 and 100 characters."
    ))]
    pub author: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i64,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Review should contain between 1 and 1000 characters."
    ))]
    pub review: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewPayload {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title should contain between 1 and 100 characters."
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Author should contain between 1 and 100 characters."
    ))]
    pub author: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i64,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Review should contain between 1 and 1000 characters."
    ))]
    pub review: String,
}

/// Runs the declared checks and turns failures into the field-level 400 body.
pub fn check<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(into_field_errors)
}

fn into_field_errors(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                // Report fields under their wire names (camelCase).
                field: camel_case(field),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}.", camel_case(field))),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    AppError::Validation(fields)
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
