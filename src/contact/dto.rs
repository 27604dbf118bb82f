use serde::{Deserialize, Serialize};

/// Contact-form submission. All fields optional at the wire level so missing
/// ones produce the dedicated message instead of a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub desc: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub send_copy: bool,
}

/// The four required fields, once validated.
pub struct ContactFields<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub desc: &'a str,
    pub phone: &'a str,
}

impl ContactForm {
    pub fn required_fields(&self) -> Option<ContactFields<'_>> {
        fn filled(field: &Option<String>) -> Option<&str> {
            field.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        Some(ContactFields {
            name: filled(&self.name)?,
            email: filled(&self.email)?,
            desc: filled(&self.desc)?,
            phone: filled(&self.phone)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub status: &'static str,
    pub message: String,
}

#[cfg(test)]
mod form_tests {
    use super::*;

    fn form(name: &str, email: &str, desc: &str, phone: &str) -> ContactForm {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        ContactForm {
            name: opt(name),
            email: opt(email),
            desc: opt(desc),
            phone: opt(phone),
            send_copy: false,
        }
    }

    #[test]
    fn complete_form_yields_all_fields() {
        let form = form("Bob", "bob@example.com", "hello", "555-0100");
        let fields = form.required_fields().expect("all present");
        assert_eq!(fields.name, "Bob");
        assert_eq!(fields.phone, "555-0100");
    }

    #[test]
    fn missing_or_blank_fields_fail_validation() {
        assert!(form("", "bob@example.com", "hello", "555-0100")
            .required_fields()
            .is_none());
        assert!(form("Bob", "bob@example.com", "   ", "555-0100")
            .required_fields()
            .is_none());
        assert!(form("Bob", "bob@example.com", "hello", "")
            .required_fields()
            .is_none());
    }
}
