use super::ApiError;

const MAX_NAME_LEN: usize = 100;

/// Trims and checks a display name. Returns the trimmed value.
pub fn validate_name<'a>(field: &str, value: &'a str) -> Result<&'a str, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }

    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!(
            "{field} must be {MAX_NAME_LEN} characters or less"
        ));
    }

    Ok(trimmed)
}

/// Shape check only: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<&str, String> {
    let trimmed = email.trim();
    let valid = trimmed.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split('.')
                .filter(|part| !part.is_empty())
                .count()
                >= 2
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !trimmed.chars().any(char::is_whitespace)
    });

    if valid {
        Ok(trimmed)
    } else {
        Err(format!("Invalid email address: {trimmed}"))
    }
}

pub fn validate_password(password: &str, min_len: usize) -> Result<(), String> {
    if password.chars().count() < min_len {
        return Err(format!(
            "Password must be at least {min_len} characters"
        ));
    }
    Ok(())
}

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Name", "  Site A "), Ok("Site A"));
        assert!(validate_name("Name", "").is_err());
        assert!(validate_name("Name", "   ").is_err());
        assert!(validate_name("Name", &"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.org").is_ok());
        assert!(validate_email("admin@localhost").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@@example.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret", 6).is_ok());
        assert!(validate_password("short", 6).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("device", 1).is_ok());
        assert!(validate_id("device", 0).is_err());
        assert!(validate_id("device", -3).is_err());
    }
}
