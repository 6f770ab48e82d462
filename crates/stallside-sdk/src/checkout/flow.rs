use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::listing::Listing;

use super::config::CheckoutConfig;
use super::method::PaymentMethod;

/// Where the linear payment flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    ItemChosen,
    MethodChosen,
    Confirmed,
    Submitted,
    Failed,
}

/// Immutable record of a completed purchase intent.
///
/// `price` is a denormalized copy taken from the chosen listing at
/// confirmation time, not a live reference; the record must not change if
/// the catalog later does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub username: String,
    pub listing_id: String,
    pub payment_method: PaymentMethod,
    pub price: String,
    pub timestamp: String,
}

/// Serializable snapshot of the flow, pushed to the frontend after every
/// checkout command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSnapshot {
    pub state: CheckoutState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Listing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub submission_in_flight: bool,
}

/// Linear multi-step transaction flow.
///
/// Idle → ItemChosen → MethodChosen → Confirmed → Submitted | Failed.
/// The draft (chosen item, method, constructed transaction) lives here and
/// only here; it is discarded on success or cancellation and never partially
/// persisted.
pub struct CheckoutFlow {
    config: CheckoutConfig,
    state: CheckoutState,
    item: Option<Listing>,
    method: Option<PaymentMethod>,
    transaction: Option<Transaction>,
    in_flight: bool,
    last_error: Option<String>,
}

impl CheckoutFlow {
    pub fn new(config: CheckoutConfig) -> Self {
        Self {
            config,
            state: CheckoutState::Idle,
            item: None,
            method: None,
            transaction: None,
            in_flight: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// The payment methods offered to the user.
    pub fn allowed_methods(&self) -> &[PaymentMethod] {
        &self.config.allowed_methods
    }

    /// The item staged for payment, if any.
    pub fn item(&self) -> Option<&Listing> {
        self.item.as_ref()
    }

    pub fn snapshot(&self) -> CheckoutSnapshot {
        CheckoutSnapshot {
            state: self.state,
            item: self.item.clone(),
            method: self.method,
            transaction: self.transaction.clone(),
            last_error: self.last_error.clone(),
            submission_in_flight: self.in_flight,
        }
    }

    /// Stage a listing for payment. The caller resolves the id against the
    /// catalog first; this method only accepts an existing listing.
    pub fn choose_item(&mut self, listing: Listing) -> Result<()> {
        match self.state {
            CheckoutState::Idle | CheckoutState::ItemChosen => {
                self.item = Some(listing);
                self.state = CheckoutState::ItemChosen;
                Ok(())
            }
            state => Err(Error::Transition {
                state,
                action: "choose an item",
            }),
        }
    }

    /// Pick a payment method from the configured allowed set. Re-picking
    /// while MethodChosen replaces the earlier choice.
    pub fn choose_method(&mut self, method: PaymentMethod) -> Result<()> {
        match self.state {
            CheckoutState::ItemChosen | CheckoutState::MethodChosen => {
                if !self.config.allows(method) {
                    return Err(Error::UnknownPaymentMethod(method.as_str().to_string()));
                }
                self.method = Some(method);
                self.state = CheckoutState::MethodChosen;
                Ok(())
            }
            state => Err(Error::Transition {
                state,
                action: "choose a payment method",
            }),
        }
    }

    /// Explicit user confirmation. Requires a chosen method and an active
    /// session; constructs the transaction record, denormalizing the price
    /// from the chosen item now.
    pub fn confirm(&mut self, username: &str) -> Result<Transaction> {
        if self.state != CheckoutState::MethodChosen {
            return Err(Error::Transition {
                state: self.state,
                action: "confirm",
            });
        }
        if username.trim().is_empty() {
            return Err(Error::AuthRequired);
        }

        // Both are guaranteed by the MethodChosen state.
        let item = self.item.as_ref().ok_or(Error::Transition {
            state: self.state,
            action: "confirm",
        })?;
        let method = self.method.ok_or(Error::Transition {
            state: self.state,
            action: "confirm",
        })?;

        let transaction = Transaction {
            username: username.to_string(),
            listing_id: item.id.clone(),
            payment_method: method,
            price: item.price.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.transaction = Some(transaction.clone());
        self.state = CheckoutState::Confirmed;
        self.last_error = None;
        Ok(transaction)
    }

    /// Mark the submission as issued and hand back the record to send.
    /// From this point the flow can no longer be cancelled; the call runs
    /// to completion one way or the other.
    pub fn begin_submission(&mut self) -> Result<Transaction> {
        if self.state != CheckoutState::Confirmed || self.in_flight {
            return Err(Error::Transition {
                state: self.state,
                action: "submit",
            });
        }
        let transaction = self.transaction.clone().ok_or(Error::Transition {
            state: self.state,
            action: "submit",
        })?;
        self.in_flight = true;
        Ok(transaction)
    }

    /// The remote call succeeded: terminal success, draft discarded.
    pub fn submission_succeeded(&mut self) -> Result<()> {
        if self.state != CheckoutState::Confirmed || !self.in_flight {
            return Err(Error::Transition {
                state: self.state,
                action: "record a successful submission",
            });
        }
        log::info!(
            "transaction submitted for listing {}",
            self.transaction
                .as_ref()
                .map(|t| t.listing_id.as_str())
                .unwrap_or("?")
        );
        self.reset();
        self.state = CheckoutState::Submitted;
        Ok(())
    }

    /// The remote call failed: the draft is retained for a manual retry,
    /// never retried automatically.
    pub fn submission_failed(&mut self, message: impl Into<String>) -> Result<()> {
        if self.state != CheckoutState::Confirmed || !self.in_flight {
            return Err(Error::Transition {
                state: self.state,
                action: "record a failed submission",
            });
        }
        let message = message.into();
        log::warn!("transaction submission failed: {message}");
        self.in_flight = false;
        self.last_error = Some(message);
        self.state = CheckoutState::Failed;
        Ok(())
    }

    /// Go back from Failed to MethodChosen, keeping the chosen item and
    /// method. A fresh `confirm` rebuilds the record (and re-denormalizes
    /// the price).
    pub fn retry(&mut self) -> Result<()> {
        if self.state != CheckoutState::Failed {
            return Err(Error::Transition {
                state: self.state,
                action: "retry",
            });
        }
        self.transaction = None;
        self.state = CheckoutState::MethodChosen;
        Ok(())
    }

    /// Abandon the flow and discard the draft. Permitted until the
    /// submission is actually in flight.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            CheckoutState::ItemChosen | CheckoutState::MethodChosen | CheckoutState::Failed => {
                self.reset();
                self.state = CheckoutState::Idle;
                Ok(())
            }
            CheckoutState::Confirmed if !self.in_flight => {
                self.reset();
                self.state = CheckoutState::Idle;
                Ok(())
            }
            state => Err(Error::Transition {
                state,
                action: "cancel",
            }),
        }
    }

    /// Back to Idle after a terminal Submitted, ready for the next purchase.
    pub fn acknowledge_success(&mut self) -> Result<()> {
        if self.state != CheckoutState::Submitted {
            return Err(Error::Transition {
                state: self.state,
                action: "acknowledge",
            });
        }
        self.state = CheckoutState::Idle;
        Ok(())
    }

    fn reset(&mut self) {
        self.item = None;
        self.method = None;
        self.transaction = None;
        self.in_flight = false;
        self.last_error = None;
    }
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new(CheckoutConfig::default())
    }
}
