//! Return-lifecycle rules for a line item.
//!
//! How received quantity, approved returns and line status combine into the
//! quantities callers gate on. Every query here is a total function: absent
//! quantities read as zero and nothing is validated. In particular a line whose
//! approved returns exceed its receipt reports a *negative* effective quantity;
//! the value is passed through unchanged so callers can treat it as an anomaly.
//!
//! `total_returned_quantity` and `has_returns` are a cache of a fold over the
//! return requests. They are recomputed in full by [`recompute_return_totals`]
//! at every mutation of the return set, never patched incrementally.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::line_item::{LineItem, LineItemStatus};

/// Aggregate return fields of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnTotals {
    pub total_returned_quantity: Decimal,
    pub has_returns: bool,
}

impl ReturnTotals {
    pub const NONE: ReturnTotals = ReturnTotals {
        total_returned_quantity: Decimal::ZERO,
        has_returns: false,
    };

    pub fn from_total(total_returned_quantity: Decimal) -> Self {
        Self {
            total_returned_quantity,
            has_returns: total_returned_quantity > Decimal::ZERO,
        }
    }
}

/// Received quantity minus approved returns; zero before receipt.
pub fn effective_quantity(item: &LineItem) -> Decimal {
    match item.actual_quantity {
        None => Decimal::ZERO,
        Some(actual) => actual - item.total_returned_quantity,
    }
}

/// Whether a new return request may be raised against the line.
pub fn can_be_returned(item: &LineItem) -> bool {
    item.status == LineItemStatus::Received
        && item.actual_quantity.is_some_and(|q| q > Decimal::ZERO)
        && effective_quantity(item) > Decimal::ZERO
}

/// Upper bound for the quantity of a new return request.
pub fn max_returnable_quantity(item: &LineItem) -> Decimal {
    effective_quantity(item)
}

/// Whether any return request is still awaiting a decision.
pub fn has_pending_returns(item: &LineItem) -> bool {
    item.return_requests.iter().any(|r| r.is_pending())
}

/// Fold the return requests into totals without touching the line item.
pub fn return_totals(item: &LineItem) -> ReturnTotals {
    if item.return_requests.is_empty() {
        return ReturnTotals::NONE;
    }

    let approved: Decimal = item
        .return_requests
        .iter()
        .filter(|r| r.is_approved())
        .map(|r| r.return_quantity)
        .sum();

    ReturnTotals::from_total(approved)
}

/// Rewrite the cached return fields from the current return set.
///
/// Must run after any return request is added, removed, approved or rejected.
/// Idempotent.
pub fn recompute_return_totals(item: &mut LineItem) -> ReturnTotals {
    let totals = return_totals(item);
    item.total_returned_quantity = totals.total_returned_quantity;
    item.has_returns = totals.has_returns;

    tracing::debug!(
        line_item_id = %item.id,
        total_returned_quantity = %totals.total_returned_quantity,
        has_returns = totals.has_returns,
        "recomputed return totals"
    );

    let received = item.actual_quantity.unwrap_or(Decimal::ZERO);
    if totals.total_returned_quantity > received {
        tracing::warn!(
            line_item_id = %item.id,
            received = %received,
            total_returned_quantity = %totals.total_returned_quantity,
            "approved returns exceed received quantity"
        );
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{LineItemId, ReturnRequestId};
    use crate::returns::{ReturnRequest, ReturnStatus};
    use chrono::Utc;
    use proptest::prelude::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn line(status: LineItemStatus, actual: Option<i64>) -> LineItem {
        let mut item = LineItem::empty(LineItemId::generate());
        item.created = true;
        item.status = status;
        item.requested_quantity = dec(100);
        item.actual_quantity = actual.map(dec);
        item
    }

    fn with_returns(mut item: LineItem, returns: &[(i64, ReturnStatus)]) -> LineItem {
        for (qty, status) in returns {
            let mut request =
                ReturnRequest::new(ReturnRequestId::generate(), item.id, dec(*qty), Utc::now());
            request.status = *status;
            item.return_requests.push(request);
        }
        item
    }

    #[test]
    fn approved_and_pending_mix() {
        let mut item = with_returns(
            line(LineItemStatus::Received, Some(100)),
            &[(20, ReturnStatus::ReturnApproved), (5, ReturnStatus::ReturnRequested)],
        );

        let totals = recompute_return_totals(&mut item);

        assert_eq!(totals, ReturnTotals::from_total(dec(20)));
        assert!(totals.has_returns);
        assert_eq!(item.total_returned_quantity, dec(20));
        assert!(item.has_returns);
        assert_eq!(effective_quantity(&item), dec(80));
        assert_eq!(max_returnable_quantity(&item), dec(80));
        assert!(can_be_returned(&item));
        assert!(has_pending_returns(&item));
    }

    #[test]
    fn returns_exceeding_receipt_go_negative() {
        let mut item = with_returns(
            line(LineItemStatus::Received, Some(10)),
            &[(15, ReturnStatus::ReturnApproved)],
        );
        recompute_return_totals(&mut item);

        assert_eq!(effective_quantity(&item), dec(-5));
        assert_eq!(max_returnable_quantity(&item), dec(-5));
        assert!(!can_be_returned(&item));
    }

    #[test]
    fn pending_line_without_receipt() {
        let item = line(LineItemStatus::Pending, None);

        assert!(!can_be_returned(&item));
        assert_eq!(max_returnable_quantity(&item), Decimal::ZERO);
        assert_eq!(effective_quantity(&item), Decimal::ZERO);
    }

    #[test]
    fn empty_return_set() {
        let mut item = line(LineItemStatus::Received, Some(10));
        item.total_returned_quantity = dec(3);
        item.has_returns = true;

        assert!(!has_pending_returns(&item));
        assert_eq!(recompute_return_totals(&mut item), ReturnTotals::NONE);
        assert_eq!(item.total_returned_quantity, Decimal::ZERO);
        assert!(!item.has_returns);
    }

    #[test]
    fn single_requested_return_is_pending() {
        let item = with_returns(
            line(LineItemStatus::Received, Some(10)),
            &[(3, ReturnStatus::ReturnRequested)],
        );
        assert!(has_pending_returns(&item));
    }

    #[test]
    fn rejected_returns_are_neither_pending_nor_counted() {
        let mut item = with_returns(
            line(LineItemStatus::Received, Some(10)),
            &[(4, ReturnStatus::ReturnRejected), (6, ReturnStatus::ReturnRejected)],
        );

        assert!(!has_pending_returns(&item));
        assert_eq!(recompute_return_totals(&mut item), ReturnTotals::NONE);
        assert_eq!(effective_quantity(&item), dec(10));
    }

    #[test]
    fn zero_receipt_is_not_returnable() {
        let item = line(LineItemStatus::Received, Some(0));
        assert!(!can_be_returned(&item));
    }

    #[test]
    fn fully_returned_line_is_not_returnable() {
        let mut item = with_returns(
            line(LineItemStatus::Received, Some(8)),
            &[(5, ReturnStatus::ReturnApproved), (3, ReturnStatus::ReturnApproved)],
        );
        recompute_return_totals(&mut item);

        assert_eq!(effective_quantity(&item), Decimal::ZERO);
        assert!(!can_be_returned(&item));
    }

    /// Collects formatted log output from a scoped subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warnings_during<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .without_time()
            .finish();

        let out = tracing::subscriber::with_default(subscriber, f);
        let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (out, logged)
    }

    #[test]
    fn returns_exceeding_receipt_are_logged_without_altering_totals() {
        let mut item = with_returns(
            line(LineItemStatus::Received, Some(10)),
            &[(15, ReturnStatus::ReturnApproved)],
        );

        let (totals, logged) = warnings_during(|| recompute_return_totals(&mut item));

        assert!(logged.contains("WARN"));
        assert!(logged.contains("approved returns exceed received quantity"));
        assert!(logged.contains(&item.id.to_string()));
        assert_eq!(totals.total_returned_quantity, dec(15));
        assert_eq!(item.total_returned_quantity, dec(15));
        assert_eq!(effective_quantity(&item), dec(-5));
    }

    #[test]
    fn returns_within_receipt_log_no_warning() {
        let mut item = with_returns(
            line(LineItemStatus::Received, Some(10)),
            &[(10, ReturnStatus::ReturnApproved)],
        );

        let (_, logged) = warnings_during(|| recompute_return_totals(&mut item));

        assert!(logged.is_empty(), "unexpected output: {logged}");
        assert_eq!(effective_quantity(&item), Decimal::ZERO);
    }

    #[test]
    fn fractional_quantities_are_exact() {
        let mut item = line(LineItemStatus::Received, None);
        item.actual_quantity = Some(Decimal::new(105, 1));
        let mut request = ReturnRequest::new(
            ReturnRequestId::generate(),
            item.id,
            Decimal::new(25, 2),
            Utc::now(),
        );
        request.status = ReturnStatus::ReturnApproved;
        item.return_requests.push(request);

        recompute_return_totals(&mut item);
        assert_eq!(effective_quantity(&item), Decimal::new(1025, 2));
    }

    fn any_status() -> impl Strategy<Value = LineItemStatus> {
        prop_oneof![
            Just(LineItemStatus::Pending),
            Just(LineItemStatus::Ordered),
            Just(LineItemStatus::Received),
            Just(LineItemStatus::ShortClosed),
            Just(LineItemStatus::Closed),
        ]
    }

    fn any_return_status() -> impl Strategy<Value = ReturnStatus> {
        prop_oneof![
            Just(ReturnStatus::ReturnRequested),
            Just(ReturnStatus::ReturnApproved),
            Just(ReturnStatus::ReturnRejected),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: without a recorded receipt the effective quantity is zero.
        #[test]
        fn no_receipt_means_zero_effective(
            status in any_status(),
            returns in prop::collection::vec((0i64..1_000, any_return_status()), 0..8),
        ) {
            let mut item = with_returns(line(status, None), &returns);
            recompute_return_totals(&mut item);
            prop_assert_eq!(effective_quantity(&item), Decimal::ZERO);
            prop_assert!(!can_be_returned(&item));
        }

        /// Property: with nothing approved, effective equals received.
        #[test]
        fn nothing_approved_means_effective_is_actual(
            actual in 0i64..1_000_000,
            returns in prop::collection::vec(
                (0i64..1_000, prop_oneof![
                    Just(ReturnStatus::ReturnRequested),
                    Just(ReturnStatus::ReturnRejected),
                ]),
                0..8,
            ),
        ) {
            let mut item = with_returns(line(LineItemStatus::Received, Some(actual)), &returns);
            recompute_return_totals(&mut item);
            prop_assert_eq!(effective_quantity(&item), dec(actual));
        }

        /// Property: only RECEIVED lines can be returned, whatever the quantities.
        #[test]
        fn only_received_lines_are_returnable(
            status in any_status(),
            actual in prop::option::of(0i64..1_000),
        ) {
            let item = line(status, actual);
            if status != LineItemStatus::Received {
                prop_assert!(!can_be_returned(&item));
            }
        }

        /// Property: recompute sums approved quantities only and is idempotent.
        #[test]
        fn recompute_counts_approved_and_is_idempotent(
            actual in 0i64..10_000,
            returns in prop::collection::vec((0i64..1_000, any_return_status()), 0..12),
        ) {
            let mut item = with_returns(line(LineItemStatus::Received, Some(actual)), &returns);

            let expected: i64 = returns
                .iter()
                .filter(|(_, s)| *s == ReturnStatus::ReturnApproved)
                .map(|(q, _)| *q)
                .sum();

            let first = recompute_return_totals(&mut item);
            let after_first = item.clone();
            let second = recompute_return_totals(&mut item);

            prop_assert_eq!(first, second);
            prop_assert_eq!(&after_first, &item);
            prop_assert_eq!(first.total_returned_quantity, dec(expected));
            prop_assert_eq!(first.has_returns, expected > 0);
            prop_assert_eq!(effective_quantity(&item), dec(actual - expected));
            prop_assert_eq!(max_returnable_quantity(&item), effective_quantity(&item));
        }
    }
}
