/// Why an attempt ended in [`SubscriptionStatus::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Duplicate,
    Permission,
    Transient,
    // no endpoint or token at startup
    NotConfigured,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Permission => "permission",
            ErrorKind::Transient => "transient",
            ErrorKind::NotConfigured => "not_configured",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed {
        reason: ErrorKind,
    },
}

impl SubscriptionStatus {
    pub fn accepts_submit(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    // empty for `Idle`
    pub fn message(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Submitting => "Subscribing...",
            Self::Succeeded => "Thanks! You are now subscribed to our newsletter.",
            Self::Failed { reason } => match reason {
                ErrorKind::Validation => "Please enter a valid email address.",
                ErrorKind::Duplicate => "This email address is already subscribed.",
                ErrorKind::Permission => {
                    "We are not allowed to record your subscription right now. Please contact us."
                }
                ErrorKind::Transient => "Something went wrong. Please try again.",
                ErrorKind::NotConfigured => "Newsletter signup is temporarily unavailable.",
            },
        }
    }
}
