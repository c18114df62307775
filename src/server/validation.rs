use lazy_regex::{Lazy, Regex, lazy_regex};

use crate::error::{Error, Result};

static EMAIL_REGEX: Lazy<Regex> =
    lazy_regex!(r"^[A-Za-z0-9]{1}[A-Za-z0-9._%+-]*@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$");

/// A single declarative check on a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
    /// Absolute http(s) URL with a host.
    Url,
}

impl Rule {
    fn check(self, label: &str, value: &str) -> std::result::Result<(), String> {
        match self {
            Rule::Required if value.is_empty() => Err(format!("{label} is required")),
            Rule::Required => Ok(()),
            Rule::Email if EMAIL_REGEX.is_match(value) => Ok(()),
            Rule::Email => Err(format!("{label} must be a valid email address")),
            Rule::MinLength(min) if value.chars().count() < min => {
                Err(format!("{label} must be at least {min} characters"))
            }
            Rule::MaxLength(max) if value.chars().count() > max => {
                Err(format!("{label} cannot exceed {max} characters"))
            }
            Rule::MinLength(_) | Rule::MaxLength(_) => Ok(()),
            Rule::Url => match url::Url::parse(value) {
                Ok(parsed)
                    if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() =>
                {
                    Ok(())
                }
                _ => Err(format!("{label} must be a valid http or https URL")),
            },
        }
    }
}

/// A form field together with the rules it must satisfy.
#[derive(Debug)]
pub struct Field<'a> {
    pub label: &'static str,
    pub value: &'a str,
    pub rules: &'a [Rule],
}

impl<'a> Field<'a> {
    #[must_use]
    pub fn new(label: &'static str, value: &'a str, rules: &'a [Rule]) -> Self {
        Self {
            label,
            value,
            rules,
        }
    }
}

/// Runs every field's rules in order and reports the first failure.
/// Rules other than `Required` are skipped for an empty value.
pub fn validate_fields(fields: &[Field<'_>]) -> Result<()> {
    for field in fields {
        for rule in field.rules {
            if field.value.is_empty() && *rule != Rule::Required {
                continue;
            }
            rule.check(field.label, field.value)
                .map_err(Error::ValidationFailed)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: &str, rules: &[Rule]) -> Result<()> {
        validate_fields(&[Field::new("Field", value, rules)])
    }

    #[test]
    fn test_required() {
        assert!(check("x", &[Rule::Required]).is_ok());
        let err = check("", &[Rule::Required]).unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(m) if m == "Field is required"));
    }

    #[test]
    fn test_email() {
        for valid in ["a@x.com", "user.name+tag@gmail.com", "support@sub.domain.org"] {
            assert!(check(valid, &[Rule::Email]).is_ok(), "{valid}");
        }
        for invalid in ["plainaddress", "@x.com", "a@x", "a b@x.com"] {
            assert!(check(invalid, &[Rule::Email]).is_err(), "{invalid}");
        }
    }

    #[test]
    fn test_lengths_count_characters() {
        assert!(check("héllo", &[Rule::MaxLength(5)]).is_ok());
        assert!(check("héllo!", &[Rule::MaxLength(5)]).is_err());
        assert!(check("abc", &[Rule::MinLength(6)]).is_err());
    }

    #[test]
    fn test_url() {
        assert!(check("https://example.com/a.png", &[Rule::Url]).is_ok());
        assert!(check("http://localhost:8080/img", &[Rule::Url]).is_ok());
        assert!(check("javascript:alert(1)", &[Rule::Url]).is_err());
        assert!(check("not a url", &[Rule::Url]).is_err());
    }

    #[test]
    fn test_optional_empty_skips_format_rules() {
        assert!(check("", &[Rule::Email, Rule::Url]).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let result = validate_fields(&[
            Field::new("Title", "", &[Rule::Required]),
            Field::new("Email", "bad", &[Rule::Email]),
        ]);
        assert!(matches!(result, Err(Error::ValidationFailed(m)) if m == "Title is required"));
    }
}
