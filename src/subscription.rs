use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    domain::{ErrorKind, SubscriberEmail, SubscriptionStatus},
    store_client::{InsertError, Record, SubscriberStore},
    util::error_chain_fmt,
};

// the lock is never held across the store call
pub struct SubscriptionForm<S> {
    store: S,
    revert_after: Option<Duration>,
    pending: Option<Arc<PendingEmails>>,
    state: Mutex<FormState>,
}

#[derive(Debug, Default)]
struct FormState {
    email: String,
    status: SubscriptionStatus,
    succeeded_at: Option<Instant>,
}

impl FormState {
    // timed `succeeded -> idle`
    fn settle(&mut self, revert_after: Option<Duration>) {
        if let (SubscriptionStatus::Succeeded, Some(at), Some(after)) =
            (self.status, self.succeeded_at, revert_after)
        {
            if at.elapsed() >= after {
                self.status = SubscriptionStatus::Idle;
                self.succeeded_at = None;
            }
        }
    }

    fn fail(&mut self, reason: ErrorKind) {
        self.status = SubscriptionStatus::Failed { reason };
    }
}

/// Addresses with an insert in flight, shared by every form of the process.
#[derive(Debug, Default)]
pub struct PendingEmails(Mutex<HashSet<String>>);

impl PendingEmails {
    fn emails(&self) -> MutexGuard<'_, HashSet<String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `None` when `email` is already claimed.
    fn claim(&self, email: &SubscriberEmail) -> Option<PendingClaim<'_>> {
        self.emails()
            .insert(email.as_ref().to_owned())
            .then(|| PendingClaim {
                pending: self,
                email: email.as_ref().to_owned(),
            })
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails().contains(email)
    }
}

struct PendingClaim<'a> {
    pending: &'a PendingEmails,
    email: String,
}

impl Drop for PendingClaim<'_> {
    fn drop(&mut self) {
        self.pending.emails().remove(&self.email);
    }
}

#[derive(thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),
    #[error("the form is not accepting a submission right now.")]
    Busy,
    #[error(transparent)]
    Store(#[from] InsertError),
}

impl SubmitError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SubmitError::Validation(_) => Some(ErrorKind::Validation),
            SubmitError::Busy => None,
            SubmitError::Store(e) => Some(insert_error_kind(e)),
        }
    }
}

impl std::fmt::Debug for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

fn insert_error_kind(e: &InsertError) -> ErrorKind {
    match e {
        InsertError::Duplicate => ErrorKind::Duplicate,
        InsertError::Permission(_) => ErrorKind::Permission,
        InsertError::NotConfigured => ErrorKind::NotConfigured,
        InsertError::Transient(_) => ErrorKind::Transient,
    }
}

impl<S: SubscriberStore> SubscriptionForm<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            revert_after: None,
            pending: None,
            state: Mutex::new(FormState::default()),
        }
    }

    pub fn revert_after(mut self, after: Option<Duration>) -> Self {
        self.revert_after = after;
        self
    }

    /// Refuse to submit an address another form is still inserting.
    pub fn share_pending(mut self, pending: Arc<PendingEmails>) -> Self {
        self.pending = Some(pending);
        self
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.settle(self.revert_after);
        state
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_configured()
    }

    pub fn email(&self) -> String {
        self.state().email.clone()
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.state().status
    }

    pub fn message(&self) -> &'static str {
        self.status().message()
    }

    pub fn can_submit(&self) -> bool {
        self.store.is_configured() && self.status().accepts_submit()
    }

    pub fn edit(&self, input: &str) {
        let mut state = self.state();
        match state.status {
            SubscriptionStatus::Submitting => {}
            SubscriptionStatus::Failed { .. } => {
                state.status = SubscriptionStatus::Idle;
                state.email = input.to_owned();
            }
            SubscriptionStatus::Idle | SubscriptionStatus::Succeeded => {
                state.email = input.to_owned();
            }
        }
    }

    /// At most one insert attempt, never retried. An address another form is
    /// inserting returns `Busy` and leaves this form `Submitting`.
    #[tracing::instrument(
        name = "submitting newsletter subscription",
        skip(self),
        fields(subscriber_email = tracing::field::Empty)
    )]
    pub async fn submit(&self) -> Result<Record, SubmitError> {
        let (email, _claim) = {
            let mut state = self.state();
            if !state.status.accepts_submit() {
                tracing::info!(status = state.status.as_str(), "submission refused.");
                return Err(SubmitError::Busy);
            }
            state.status = SubscriptionStatus::Submitting;

            let email = match SubscriberEmail::parse(&state.email) {
                Ok(email) => email,
                Err(e) => {
                    state.fail(ErrorKind::Validation);
                    return Err(SubmitError::Validation(e));
                }
            };
            if !self.store.is_configured() {
                state.fail(ErrorKind::NotConfigured);
                return Err(InsertError::NotConfigured.into());
            }
            let claim = match &self.pending {
                Some(pending) => match pending.claim(&email) {
                    Some(claim) => Some(claim),
                    None => {
                        tracing::info!(subscriber_email = %email, "already being submitted.");
                        return Err(SubmitError::Busy);
                    }
                },
                None => None,
            };
            (email, claim)
        };
        tracing::Span::current().record("subscriber_email", tracing::field::display(&email));

        let result = self.store.insert_email(&email).await;

        let mut state = self.state();
        match result {
            Ok(record) => {
                state.status = SubscriptionStatus::Succeeded;
                state.succeeded_at = Some(Instant::now());
                state.email.clear();
                tracing::info!("subscriber email stored.");
                Ok(record)
            }
            Err(e) => {
                let reason = insert_error_kind(&e);
                state.fail(reason);
                match reason {
                    ErrorKind::Transient => {
                        tracing::error!(error.cause_chain = ?e, "failed to store subscriber email.")
                    }
                    _ => tracing::warn!(
                        error.cause_chain = ?e,
                        reason = reason.as_str(),
                        "subscriber email rejected."
                    ),
                }
                Err(e.into())
            }
        }
    }
}
