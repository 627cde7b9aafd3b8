//! Optional external capabilities
//!
//! Tuning, sentiment scoring and version control are each either ready to use
//! or explicitly not configured. Factories decide which at startup so handlers
//! never probe for them at request time.

/// A capability that is either available or not configured
#[derive(Debug, Clone)]
pub enum Capability<T> {
    /// Capability is configured and usable
    Ready(T),
    /// Capability is absent, with the reason shown to callers
    NotConfigured(String),
}

impl<T> Capability<T> {
    /// Build a not-configured capability
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::NotConfigured(reason.into())
    }

    /// Check if the capability is ready
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Borrow the ready value or the not-configured reason
    pub fn as_result(&self) -> std::result::Result<&T, &str> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::NotConfigured(reason) => Err(reason.as_str()),
        }
    }
}
