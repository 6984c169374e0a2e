//! Return requests raised against received line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult, Entity, UserId};

use crate::ids::{LineItemId, ReturnRequestId};

/// Return request state.
///
/// `ReturnRequested` is the only initial state; both decisions are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    ReturnRequested,
    ReturnApproved,
    ReturnRejected,
}

impl ReturnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnStatus::ReturnRequested => "RETURN_REQUESTED",
            ReturnStatus::ReturnApproved => "RETURN_APPROVED",
            ReturnStatus::ReturnRejected => "RETURN_REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            ReturnStatus::ReturnRequested => false,
            ReturnStatus::ReturnApproved | ReturnStatus::ReturnRejected => true,
        }
    }

    pub fn can_transition_to(self, next: ReturnStatus) -> bool {
        matches!(
            (self, next),
            (
                ReturnStatus::ReturnRequested,
                ReturnStatus::ReturnApproved | ReturnStatus::ReturnRejected
            )
        )
    }
}

impl core::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to send back part of a line item's received quantity.
///
/// Owned by its line item; `line_item_id` is an index back to the owner, not a
/// live reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub id: ReturnRequestId,
    pub line_item_id: LineItemId,
    pub return_quantity: Decimal,
    pub status: ReturnStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub requested_by: Option<UserId>,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub decided_by: Option<UserId>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl ReturnRequest {
    /// New request in `ReturnRequested`.
    pub fn new(
        id: ReturnRequestId,
        line_item_id: LineItemId,
        return_quantity: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            line_item_id,
            return_quantity,
            status: ReturnStatus::ReturnRequested,
            reason: None,
            requested_by: None,
            requested_at,
            decided_at: None,
            decided_by: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReturnStatus::ReturnRequested
    }

    pub fn is_approved(&self) -> bool {
        self.status == ReturnStatus::ReturnApproved
    }

    pub fn approve(&mut self, by: Option<UserId>, at: DateTime<Utc>) -> DomainResult<()> {
        self.decide(ReturnStatus::ReturnApproved, by, at)
    }

    pub fn reject(
        &mut self,
        reason: Option<String>,
        by: Option<UserId>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.decide(ReturnStatus::ReturnRejected, by, at)?;
        self.rejection_reason = reason;
        Ok(())
    }

    fn decide(
        &mut self,
        next: ReturnStatus,
        by: Option<UserId>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "return request {} is already {}",
                self.id, self.status
            )));
        }
        self.status = next;
        self.decided_by = by;
        self.decided_at = Some(at);
        Ok(())
    }
}

impl Entity for ReturnRequest {
    type Id = ReturnRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(quantity: i64) -> ReturnRequest {
        ReturnRequest::new(
            ReturnRequestId::generate(),
            LineItemId::generate(),
            Decimal::from(quantity),
            Utc::now(),
        )
    }

    #[test]
    fn only_requested_has_outgoing_transitions() {
        use ReturnStatus::*;

        assert!(ReturnRequested.can_transition_to(ReturnApproved));
        assert!(ReturnRequested.can_transition_to(ReturnRejected));
        assert!(!ReturnRequested.can_transition_to(ReturnRequested));

        for terminal in [ReturnApproved, ReturnRejected] {
            assert!(terminal.is_terminal());
            for next in [ReturnRequested, ReturnApproved, ReturnRejected] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!ReturnRequested.is_terminal());
    }

    #[test]
    fn approve_records_decision() {
        let mut request = pending(4);
        let approver = UserId::new();
        let at = Utc::now();

        request.approve(Some(approver), at).unwrap();

        assert!(request.is_approved());
        assert!(!request.is_pending());
        assert_eq!(request.decided_by, Some(approver));
        assert_eq!(request.decided_at, Some(at));
    }

    #[test]
    fn reject_keeps_reason() {
        let mut request = pending(4);
        request
            .reject(Some("damaged in transit".to_string()), None, Utc::now())
            .unwrap();

        assert_eq!(request.status, ReturnStatus::ReturnRejected);
        assert_eq!(request.rejection_reason.as_deref(), Some("damaged in transit"));
    }

    #[test]
    fn decided_request_cannot_be_decided_again() {
        let mut request = pending(4);
        request.approve(None, Utc::now()).unwrap();

        let err = request.reject(None, None, Utc::now()).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("already RETURN_APPROVED") => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
        assert!(request.is_approved());
        assert_eq!(request.rejection_reason, None);
    }

    #[test]
    fn status_serializes_in_screaming_snake_case() {
        let json = serde_json::to_string(&ReturnStatus::ReturnApproved).unwrap();
        assert_eq!(json, "\"RETURN_APPROVED\"");
        let back: ReturnStatus = serde_json::from_str("\"RETURN_REJECTED\"").unwrap();
        assert_eq!(back, ReturnStatus::ReturnRejected);
    }
}
