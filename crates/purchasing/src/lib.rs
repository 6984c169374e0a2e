//! Purchasing domain module: procurement line items and their returns.
//!
//! Deterministic domain logic only (no IO, no HTTP, no storage). The
//! [`lifecycle`] module holds the return rules; [`LineItem`] is the
//! event-sourced aggregate that applies them at every change of the return set.

pub mod ids;
pub mod lifecycle;
pub mod line_item;
pub mod returns;
pub mod snapshot;

pub use ids::{LineItemId, MaterialId, PurchaseRequestId, ReturnRequestId, VendorId};
pub use lifecycle::{
    ReturnTotals, can_be_returned, effective_quantity, has_pending_returns,
    max_returnable_quantity, recompute_return_totals, return_totals,
};
pub use line_item::{
    ApproveReturn, Close, CreateLineItem, LineItem, LineItemClosed, LineItemCommand,
    LineItemCreated, LineItemEvent, LineItemOrdered, LineItemShortClosed, LineItemStatus,
    MarkOrdered, ReceiptRecorded, RecordReceipt, RejectReturn, RequestReturn, ReturnApproved,
    ReturnRejected, ReturnRequested, ShortClose,
};
pub use returns::{ReturnRequest, ReturnStatus};
pub use snapshot::LineItemSnapshot;
