use storefront_core::CustomerId;

/// Authenticated customer context for a request.
///
/// Identity is established upstream (site gateway); this carries the verified
/// identity headers into handlers. Immutable for the request lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CustomerContext {
    customer_id: CustomerId,
    staff: bool,
}

impl CustomerContext {
    pub fn new(customer_id: CustomerId, staff: bool) -> Self {
        Self { customer_id, staff }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn is_staff(&self) -> bool {
        self.staff
    }

    /// Resource access rule: owners see their own records, staff see all.
    pub fn can_access(&self, owner: CustomerId) -> bool {
        self.staff || self.customer_id == owner
    }
}
