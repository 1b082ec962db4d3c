use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainError, OrderId};

/// Consumer-protection document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalDocument {
    TermsOfSale,
    PrivacyPolicy,
    LegalNotice,
    CookiePolicy,
}

/// Documents whose acceptance must be recorded for every checkout attempt.
pub const REQUIRED_AT_CHECKOUT: &[LegalDocument] =
    &[LegalDocument::TermsOfSale, LegalDocument::PrivacyPolicy];

impl LegalDocument {
    pub fn as_str(self) -> &'static str {
        match self {
            LegalDocument::TermsOfSale => "terms_of_sale",
            LegalDocument::PrivacyPolicy => "privacy_policy",
            LegalDocument::LegalNotice => "legal_notice",
            LegalDocument::CookiePolicy => "cookie_policy",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "terms_of_sale" => Ok(LegalDocument::TermsOfSale),
            "privacy_policy" => Ok(LegalDocument::PrivacyPolicy),
            "legal_notice" => Ok(LegalDocument::LegalNotice),
            "cookie_policy" => Ok(LegalDocument::CookiePolicy),
            other => Err(DomainError::validation(format!(
                "unknown legal document: {other}"
            ))),
        }
    }

    /// Version currently in force for this document.
    pub fn current_version(self) -> &'static str {
        match self {
            LegalDocument::TermsOfSale => "2024-03",
            LegalDocument::PrivacyPolicy => "2024-03",
            LegalDocument::LegalNotice => "2023-11",
            LegalDocument::CookiePolicy => "2023-11",
        }
    }
}

/// Immutable proof of consent, captured per checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalAcceptance {
    pub customer_id: CustomerId,
    pub document: LegalDocument,
    pub version: String,
    /// Caller IP as seen at checkout time (propagated through the gateway
    /// callback context where no client IP exists server-side).
    pub ip_address: String,
    pub user_agent: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub accepted_at: DateTime<Utc>,
}

impl LegalAcceptance {
    pub fn for_order(
        customer_id: CustomerId,
        order_id: OrderId,
        document: LegalDocument,
        ip_address: String,
        user_agent: String,
        accepted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            document,
            version: document.current_version().to_string(),
            ip_address,
            user_agent,
            order_id: Some(order_id),
            accepted_at,
        }
    }

    /// Whether this record satisfies the current version of `document` for
    /// the given order.
    pub fn satisfies(&self, order_id: OrderId, document: LegalDocument) -> bool {
        self.order_id == Some(order_id)
            && self.document == document
            && self.version == document.current_version()
    }
}

/// Required documents not yet satisfied for this order by `existing`.
pub fn missing_required(order_id: OrderId, existing: &[LegalAcceptance]) -> Vec<LegalDocument> {
    REQUIRED_AT_CHECKOUT
        .iter()
        .copied()
        .filter(|doc| !existing.iter().any(|a| a.satisfies(order_id, *doc)))
        .collect()
}

/// Whether every required document is satisfied for this order.
pub fn all_required_accepted(order_id: OrderId, existing: &[LegalAcceptance]) -> bool {
    missing_required(order_id, existing).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(order_id: OrderId, doc: LegalDocument) -> LegalAcceptance {
        LegalAcceptance::for_order(
            CustomerId::new(),
            order_id,
            doc,
            "203.0.113.9".to_string(),
            "test-agent".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn missing_starts_with_full_required_set() {
        let order_id = OrderId::new();
        assert_eq!(missing_required(order_id, &[]), REQUIRED_AT_CHECKOUT);
        assert!(!all_required_accepted(order_id, &[]));
    }

    #[test]
    fn acceptances_satisfy_only_their_own_order() {
        let order_a = OrderId::new();
        let order_b = OrderId::new();
        let existing = vec![
            accept(order_a, LegalDocument::TermsOfSale),
            accept(order_a, LegalDocument::PrivacyPolicy),
        ];

        assert!(all_required_accepted(order_a, &existing));
        // A fresh trail is required per checkout attempt.
        assert!(!all_required_accepted(order_b, &existing));
    }

    #[test]
    fn outdated_version_does_not_satisfy() {
        let order_id = OrderId::new();
        let mut stale = accept(order_id, LegalDocument::TermsOfSale);
        stale.version = "2019-01".to_string();
        let existing = vec![stale, accept(order_id, LegalDocument::PrivacyPolicy)];

        assert_eq!(
            missing_required(order_id, &existing),
            vec![LegalDocument::TermsOfSale]
        );
    }

    #[test]
    fn document_round_trips_through_strings() {
        for doc in [
            LegalDocument::TermsOfSale,
            LegalDocument::PrivacyPolicy,
            LegalDocument::LegalNotice,
            LegalDocument::CookiePolicy,
        ] {
            assert_eq!(LegalDocument::parse(doc.as_str()).unwrap(), doc);
        }
        assert!(LegalDocument::parse("eula").is_err());
    }
}
