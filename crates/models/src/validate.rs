//! Field rules shared by registration, profile and listing forms.

use crate::errors::ModelError;

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ModelError::invalid("email", "invalid email"));
    };
    if local.is_empty() || domain.len() < 3 || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ModelError::invalid("email", "invalid email"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ModelError::invalid("email", "invalid email"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    char_len_between("name", name.trim(), 3, 100)
}

/// Phone is optional; when given it must be 10–20 characters.
pub fn validate_phone(phone: &str) -> Result<(), ModelError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Ok(());
    }
    char_len_between("phone", phone, 10, 20)
}

pub fn validate_password(password: &str) -> Result<(), ModelError> {
    char_len_between("password", password, 6, 100)
}

pub fn char_len_between(field: &str, value: &str, min: usize, max: usize) -> Result<(), ModelError> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(ModelError::invalid(field, &format!("must be {min}-{max} characters")));
    }
    Ok(())
}

pub fn char_len_at_most(field: &str, value: &str, max: usize) -> Result<(), ModelError> {
    if value.chars().count() > max {
        return Err(ModelError::invalid(field, &format!("must be at most {max} characters")));
    }
    Ok(())
}

pub fn number_between(field: &str, value: i64, min: i64, max: i64) -> Result<(), ModelError> {
    if value < min || value > max {
        return Err(ModelError::invalid(field, &format!("must be between {min} and {max}")));
    }
    Ok(())
}

/// Accepts only `name.ext` where `ext` (case-insensitive) is in `allowed`.
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("ahmet@360ev.com").is_ok());
        assert!(validate_email("  ahmet@360ev.com ").is_ok());
        assert!(validate_email("ahmet").is_err());
        assert!(validate_email("@360ev.com").is_err());
        assert!(validate_email("ahmet@com").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }

    #[test]
    fn name_counts_characters_not_bytes() {
        assert!(validate_name("Ali").is_ok());
        assert!(validate_name("Şİ").is_err());
        assert!(validate_name("Ahmet Yılmaz").is_ok());
    }

    #[test]
    fn phone_is_optional() {
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("+90 532 123 45 67").is_ok());
        assert!(validate_phone("123").is_err());
    }

    #[test]
    fn allowed_file_checks_extension() {
        let allowed = vec!["jpg".to_string(), "png".to_string()];
        assert!(allowed_file("pano.JPG", &allowed));
        assert!(!allowed_file("pano.gif", &allowed));
        assert!(!allowed_file("jpg", &allowed));
        assert!(!allowed_file(".jpg", &allowed));
    }
}
