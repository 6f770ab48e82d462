use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of payment method identifiers the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank-transfer",
            PaymentMethod::CashOnDelivery => "cash-on-delivery",
        }
    }

    /// All known methods, in display order.
    pub fn all() -> Vec<PaymentMethod> {
        vec![
            PaymentMethod::Card,
            PaymentMethod::BankTransfer,
            PaymentMethod::CashOnDelivery,
        ]
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "bank-transfer" => Ok(PaymentMethod::BankTransfer),
            "cash-on-delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(Error::UnknownPaymentMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_identifier() {
        for method in PaymentMethod::all() {
            assert_eq!(PaymentMethod::from_str(method.as_str()).unwrap(), method);
        }
    }

    #[test]
    fn unknown_identifier_rejected() {
        assert!(matches!(
            PaymentMethod::from_str("paypal"),
            Err(Error::UnknownPaymentMethod(_))
        ));
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(json, "\"cash-on-delivery\"");
    }
}
