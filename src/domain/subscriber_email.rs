use validator::ValidateEmail;

/// A trimmed, lowercased address that passed [`SubscriberEmail::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(s: &str) -> Result<SubscriberEmail, String> {
        let email = s.trim().to_lowercase();
        if email.validate_email() && has_dotted_domain(&email) {
            Ok(Self(email))
        } else {
            tracing::warn!("`{s}` is not a valid subscriber email.");
            Err(format!("`{s}` is not a valid subscriber email."))
        }
    }
}

/// `validator` accepts dotless hosts such as `user@localhost`; the store
/// only takes addresses whose domain has at least two labels.
fn has_dotted_domain(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
