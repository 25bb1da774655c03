use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use std::fmt;
use tracing::debug;

use crate::errors::{RentalError, Result};
use crate::requests::normalize_rut;

/// source of bearer tokens for backend calls
pub trait TokenProvider {
    /// a token still valid for at least `min_validity`, or none
    fn bearer_token(&self, time: &SafeTimeProvider, min_validity: Duration) -> Option<String>;
}

/// a fixed token with an optional expiry
#[derive(Debug, Clone, PartialEq)]
pub struct StaticToken {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            expires_at: None,
        }
    }

    pub fn expiring(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: Some(token.into()),
            expires_at: Some(expires_at),
        }
    }

    /// signed out
    pub fn none() -> Self {
        Self {
            token: None,
            expires_at: None,
        }
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self, time: &SafeTimeProvider, min_validity: Duration) -> Option<String> {
        let token = self.token.as_ref().filter(|t| !t.is_empty())?;
        match self.expires_at {
            Some(expires_at) if time.now() + min_validity >= expires_at => None,
            _ => Some(token.clone()),
        }
    }
}

/// bearer credentials attached to a single backend call
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// ask the provider for a token; missing or stale tokens are `Unauthorized`
    pub fn acquire<T: TokenProvider + ?Sized>(
        provider: &T,
        time: &SafeTimeProvider,
        min_validity: Duration,
    ) -> Result<Self> {
        provider
            .bearer_token(time, min_validity)
            .map(Self::bearer)
            .ok_or(RentalError::Unauthorized)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

/// the signed-in user as the client sees them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    /// registered RUT, if the profile has one
    pub rut: Option<String>,
    /// realm roles from the identity token
    pub roles: Vec<String>,
}

impl Viewer {
    pub fn new(rut: Option<&str>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            rut: rut.map(normalize_rut).filter(|r| !r.is_empty()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role.eq_ignore_ascii_case("ADMIN"))
    }

    /// own RUT, or an error when the profile has none
    pub fn own_rut(&self) -> Result<&str> {
        self.rut.as_deref().ok_or_else(|| RentalError::MissingField {
            field: "rut".to_string(),
        })
    }

    /// RUT to query loans for: admins may filter or see everyone, users only see themselves
    pub fn scope_rut(&self, filter: Option<&str>) -> Result<Option<String>> {
        if self.is_admin() {
            return Ok(filter.map(normalize_rut).filter(|r| !r.is_empty()));
        }
        self.own_rut().map(|rut| Some(rut.to_string()))
    }
}

/// proof that a request was issued during a given screen generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// drops responses that arrive after their screen was left or reloaded
#[derive(Debug, Default)]
pub struct ScreenLifetime {
    generation: u64,
    active: bool,
}

impl ScreenLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// start a new generation; tickets from earlier ones go stale
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.active = true;
        Ticket(self.generation)
    }

    /// ticket for another request in the current generation
    pub fn ticket(&self) -> Option<Ticket> {
        self.active.then_some(Ticket(self.generation))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.active && ticket.0 == self.generation
    }

    /// hand back `value` only if its ticket is still current
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(ticket = ticket.0, generation = self.generation, "dropping stale response");
            None
        }
    }

    pub fn end(&mut self) {
        self.generation += 1;
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()))
    }

    #[test]
    fn test_token_refresh_window() {
        let time = clock();
        let control = time.test_control().unwrap();
        let expires = Utc.with_ymd_and_hms(2024, 1, 1, 12, 1, 0).unwrap();
        let provider = StaticToken::expiring("abc", expires);

        let creds = Credentials::acquire(&provider, &time, Duration::seconds(30)).unwrap();
        assert_eq!(creds.authorization_header(), "Bearer abc");

        control.advance(Duration::seconds(31));
        assert_eq!(
            Credentials::acquire(&provider, &time, Duration::seconds(30)).unwrap_err(),
            RentalError::Unauthorized
        );
    }

    #[test]
    fn test_signed_out_is_unauthorized() {
        let time = clock();
        assert_eq!(
            Credentials::acquire(&StaticToken::none(), &time, Duration::zero()).unwrap_err(),
            RentalError::Unauthorized
        );
        assert!(StaticToken::new("").bearer_token(&time, Duration::zero()).is_none());
    }

    #[test]
    fn test_credentials_debug_hides_token() {
        let creds = Credentials::bearer("secret");
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_admin_scope() {
        let admin = Viewer::new(Some("1.111.111-1"), ["user", "admin"]);
        assert!(admin.is_admin());
        assert_eq!(admin.scope_rut(None).unwrap(), None);
        assert_eq!(admin.scope_rut(Some(" ")).unwrap(), None);
        assert_eq!(admin.scope_rut(Some("22.222.222-2")).unwrap(), Some("22222222-2".to_string()));
    }

    #[test]
    fn test_user_scope_is_own_rut() {
        let user = Viewer::new(Some("11111111-1"), ["USER"]);
        assert!(!user.is_admin());
        assert_eq!(user.scope_rut(Some("22222222-2")).unwrap(), Some("11111111-1".to_string()));

        let unregistered = Viewer::new(None, ["USER"]);
        assert!(matches!(unregistered.scope_rut(None), Err(RentalError::MissingField { .. })));
    }

    #[test]
    fn test_stale_response_dropped() {
        let mut screen = ScreenLifetime::new();
        let first = screen.begin();
        let second = screen.begin();

        assert_eq!(screen.accept(first, "old"), None);
        assert_eq!(screen.accept(second, "new"), Some("new"));
        assert_eq!(screen.ticket(), Some(second));

        screen.end();
        assert_eq!(screen.accept(second, "late"), None);
        assert_eq!(screen.ticket(), None);
    }
}
