use super::method::PaymentMethod;

/// Configuration for the checkout flow.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Payment methods offered to the user. Chosen methods are validated
    /// against this list before confirmation.
    pub allowed_methods: Vec<PaymentMethod>,
}

impl CheckoutConfig {
    pub fn allows(&self, method: PaymentMethod) -> bool {
        self.allowed_methods.contains(&method)
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            allowed_methods: PaymentMethod::all(),
        }
    }
}
