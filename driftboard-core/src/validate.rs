//! Entity validation applied at the intent boundary and by the HTTP
//! server's 400 path. Returns every violation, not just the first.

use crate::types::{CARD_DESCRIPTION_MAX, CARD_TITLE_MAX, LIST_TITLE_MAX};

/// Validate a list title. Empty vec means valid.
pub fn validate_list_title(title: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push("List title is required".to_string());
    }
    if title.len() > LIST_TITLE_MAX {
        errors.push(format!("List title must be less than {LIST_TITLE_MAX} characters"));
    }
    errors
}

/// Validate card title and description. Empty vec means valid.
pub fn validate_card_fields(title: &str, description: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }
    if title.len() > CARD_TITLE_MAX {
        errors.push(format!("Title must be less than {CARD_TITLE_MAX} characters"));
    }
    if description.len() > CARD_DESCRIPTION_MAX {
        errors.push(format!(
            "Description must be less than {CARD_DESCRIPTION_MAX} characters"
        ));
    }
    errors
}
