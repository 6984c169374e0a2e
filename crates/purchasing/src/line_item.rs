//! Line item aggregate: receipt, return and close workflow for one line.
//!
//! Every event that changes the return set recomputes the cached return totals
//! before the version is bumped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateRoot, DomainError, Event, TenantId, UserId};

use crate::ids::{LineItemId, MaterialId, PurchaseRequestId, ReturnRequestId, VendorId};
use crate::lifecycle::{self, ReturnTotals};
use crate::returns::ReturnRequest;

/// Line item status lifecycle.
///
/// `Pending -> Ordered -> Received -> Closed`, with `ShortClosed` reachable
/// from `Ordered` or `Received` when delivery stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Pending,
    Ordered,
    Received,
    ShortClosed,
    Closed,
}

impl LineItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LineItemStatus::Pending => "PENDING",
            LineItemStatus::Ordered => "ORDERED",
            LineItemStatus::Received => "RECEIVED",
            LineItemStatus::ShortClosed => "SHORT_CLOSED",
            LineItemStatus::Closed => "CLOSED",
        }
    }
}

impl core::fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: LineItem, together with the return requests it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub(crate) id: LineItemId,
    pub(crate) tenant_id: Option<TenantId>,
    pub(crate) purchase_request_id: Option<PurchaseRequestId>,
    pub(crate) material_id: Option<MaterialId>,
    pub(crate) vendor_id: Option<VendorId>,
    pub(crate) line_no: u32,
    pub(crate) requested_quantity: Decimal,
    pub(crate) actual_quantity: Option<Decimal>,
    pub(crate) status: LineItemStatus,
    pub(crate) total_returned_quantity: Decimal,
    pub(crate) has_returns: bool,
    pub(crate) return_requests: Vec<ReturnRequest>,
    pub(crate) version: u64,
    pub(crate) created: bool,
}

impl LineItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: LineItemId) -> Self {
        Self {
            id,
            tenant_id: None,
            purchase_request_id: None,
            material_id: None,
            vendor_id: None,
            line_no: 0,
            requested_quantity: Decimal::ZERO,
            actual_quantity: None,
            status: LineItemStatus::Pending,
            total_returned_quantity: Decimal::ZERO,
            has_returns: false,
            return_requests: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LineItemId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn purchase_request_id(&self) -> Option<PurchaseRequestId> {
        self.purchase_request_id
    }

    pub fn material_id(&self) -> Option<MaterialId> {
        self.material_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn line_no(&self) -> u32 {
        self.line_no
    }

    pub fn requested_quantity(&self) -> Decimal {
        self.requested_quantity
    }

    pub fn actual_quantity(&self) -> Option<Decimal> {
        self.actual_quantity
    }

    pub fn status(&self) -> LineItemStatus {
        self.status
    }

    pub fn total_returned_quantity(&self) -> Decimal {
        self.total_returned_quantity
    }

    pub fn has_returns(&self) -> bool {
        self.has_returns
    }

    pub fn return_requests(&self) -> &[ReturnRequest] {
        &self.return_requests
    }

    pub fn return_request(&self, id: ReturnRequestId) -> Option<&ReturnRequest> {
        self.return_requests.iter().find(|r| r.id == id)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn effective_quantity(&self) -> Decimal {
        lifecycle::effective_quantity(self)
    }

    pub fn can_be_returned(&self) -> bool {
        lifecycle::can_be_returned(self)
    }

    pub fn max_returnable_quantity(&self) -> Decimal {
        lifecycle::max_returnable_quantity(self)
    }

    pub fn has_pending_returns(&self) -> bool {
        lifecycle::has_pending_returns(self)
    }

    pub fn recompute_return_totals(&mut self) -> ReturnTotals {
        lifecycle::recompute_return_totals(self)
    }

    /// Whether the cached return fields match the return set.
    ///
    /// Can only be false for records restored from a snapshot.
    pub fn return_totals_consistent(&self) -> bool {
        let totals = lifecycle::return_totals(self);
        totals.total_returned_quantity == self.total_returned_quantity
            && totals.has_returns == self.has_returns
    }

    fn return_request_mut(&mut self, id: ReturnRequestId) -> Option<&mut ReturnRequest> {
        self.return_requests.iter_mut().find(|r| r.id == id)
    }
}

impl AggregateRoot for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLineItem {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub purchase_request_id: PurchaseRequestId,
    pub material_id: MaterialId,
    pub line_no: u32,
    pub requested_quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkOrdered (only from Pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOrdered {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub vendor_id: Option<VendorId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReceipt {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub actual_quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestReturn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReturn {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub return_id: ReturnRequestId,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub requested_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveReturn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveReturn {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub return_id: ReturnRequestId,
    pub approved_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectReturn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectReturn {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub return_id: ReturnRequestId,
    pub reason: Option<String>,
    pub rejected_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ShortClose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortClose {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Close {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineItemCommand {
    CreateLineItem(CreateLineItem),
    MarkOrdered(MarkOrdered),
    RecordReceipt(RecordReceipt),
    RequestReturn(RequestReturn),
    ApproveReturn(ApproveReturn),
    RejectReturn(RejectReturn),
    ShortClose(ShortClose),
    Close(Close),
}

/// Event: LineItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemCreated {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub purchase_request_id: PurchaseRequestId,
    pub material_id: MaterialId,
    pub line_no: u32,
    pub requested_quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemOrdered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemOrdered {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub vendor_id: Option<VendorId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptRecorded.
///
/// Carries the material and received quantity so an inventory projection can
/// book the stock movement without loading the line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecorded {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub material_id: MaterialId,
    pub actual_quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequested {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub return_id: ReturnRequestId,
    pub quantity: Decimal,
    pub reason: Option<String>,
    pub requested_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnApproved {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub return_id: ReturnRequestId,
    pub material_id: MaterialId,
    pub quantity: Decimal,
    pub approved_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReturnRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRejected {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub return_id: ReturnRequestId,
    pub reason: Option<String>,
    pub rejected_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemShortClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemShortClosed {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemClosed {
    pub tenant_id: TenantId,
    pub line_item_id: LineItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineItemEvent {
    LineItemCreated(LineItemCreated),
    LineItemOrdered(LineItemOrdered),
    ReceiptRecorded(ReceiptRecorded),
    ReturnRequested(ReturnRequested),
    ReturnApproved(ReturnApproved),
    ReturnRejected(ReturnRejected),
    LineItemShortClosed(LineItemShortClosed),
    LineItemClosed(LineItemClosed),
}

impl Event for LineItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LineItemEvent::LineItemCreated(_) => "purchasing.line_item.created",
            LineItemEvent::LineItemOrdered(_) => "purchasing.line_item.ordered",
            LineItemEvent::ReceiptRecorded(_) => "purchasing.line_item.receipt_recorded",
            LineItemEvent::ReturnRequested(_) => "purchasing.line_item.return_requested",
            LineItemEvent::ReturnApproved(_) => "purchasing.line_item.return_approved",
            LineItemEvent::ReturnRejected(_) => "purchasing.line_item.return_rejected",
            LineItemEvent::LineItemShortClosed(_) => "purchasing.line_item.short_closed",
            LineItemEvent::LineItemClosed(_) => "purchasing.line_item.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LineItemEvent::LineItemCreated(e) => e.occurred_at,
            LineItemEvent::LineItemOrdered(e) => e.occurred_at,
            LineItemEvent::ReceiptRecorded(e) => e.occurred_at,
            LineItemEvent::ReturnRequested(e) => e.occurred_at,
            LineItemEvent::ReturnApproved(e) => e.occurred_at,
            LineItemEvent::ReturnRejected(e) => e.occurred_at,
            LineItemEvent::LineItemShortClosed(e) => e.occurred_at,
            LineItemEvent::LineItemClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for LineItem {
    type Command = LineItemCommand;
    type Event = LineItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LineItemEvent::LineItemCreated(e) => {
                self.id = e.line_item_id;
                self.tenant_id = Some(e.tenant_id);
                self.purchase_request_id = Some(e.purchase_request_id);
                self.material_id = Some(e.material_id);
                self.line_no = e.line_no;
                self.requested_quantity = e.requested_quantity;
                self.actual_quantity = None;
                self.status = LineItemStatus::Pending;
                self.return_requests.clear();
                self.recompute_return_totals();
                self.created = true;
            }
            LineItemEvent::LineItemOrdered(e) => {
                self.vendor_id = e.vendor_id;
                self.status = LineItemStatus::Ordered;
            }
            LineItemEvent::ReceiptRecorded(e) => {
                self.actual_quantity = Some(e.actual_quantity);
                self.status = LineItemStatus::Received;
            }
            LineItemEvent::ReturnRequested(e) => {
                let mut request =
                    ReturnRequest::new(e.return_id, self.id, e.quantity, e.occurred_at);
                request.reason = e.reason.clone();
                request.requested_by = e.requested_by;
                self.return_requests.push(request);
                self.recompute_return_totals();
            }
            LineItemEvent::ReturnApproved(e) => {
                self.decide_return(e.return_id, |r| r.approve(e.approved_by, e.occurred_at));
                self.recompute_return_totals();
            }
            LineItemEvent::ReturnRejected(e) => {
                self.decide_return(e.return_id, |r| {
                    r.reject(e.reason.clone(), e.rejected_by, e.occurred_at)
                });
                self.recompute_return_totals();
            }
            LineItemEvent::LineItemShortClosed(_) => {
                self.status = LineItemStatus::ShortClosed;
            }
            LineItemEvent::LineItemClosed(_) => {
                self.status = LineItemStatus::Closed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LineItemCommand::CreateLineItem(cmd) => self.handle_create(cmd),
            LineItemCommand::MarkOrdered(cmd) => self.handle_mark_ordered(cmd),
            LineItemCommand::RecordReceipt(cmd) => self.handle_record_receipt(cmd),
            LineItemCommand::RequestReturn(cmd) => self.handle_request_return(cmd),
            LineItemCommand::ApproveReturn(cmd) => self.handle_approve_return(cmd),
            LineItemCommand::RejectReturn(cmd) => self.handle_reject_return(cmd),
            LineItemCommand::ShortClose(cmd) => self.handle_short_close(cmd),
            LineItemCommand::Close(cmd) => self.handle_close(cmd),
        }
    }
}

impl LineItem {
    /// Apply a decision event to one return request.
    ///
    /// `handle` has already validated the transition; a failure here means the
    /// stored stream disagrees with the rules and is logged, not applied.
    fn decide_return<F>(&mut self, return_id: ReturnRequestId, decide: F)
    where
        F: FnOnce(&mut ReturnRequest) -> Result<(), DomainError>,
    {
        let line_item_id = self.id;
        match self.return_request_mut(return_id) {
            Some(request) => {
                if let Err(err) = decide(request) {
                    tracing::warn!(%line_item_id, %return_id, error = %err, "ignored return decision");
                }
            }
            None => {
                tracing::warn!(%line_item_id, %return_id, "decision for unknown return request");
            }
        }
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_line_item_id(&self, line_item_id: LineItemId) -> Result<(), DomainError> {
        if self.id != line_item_id {
            return Err(DomainError::invariant("line_item_id mismatch"));
        }
        Ok(())
    }

    fn ensure_target(&self, tenant_id: TenantId, line_item_id: LineItemId) -> Result<(), DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(tenant_id)?;
        self.ensure_line_item_id(line_item_id)
    }

    fn ensure_no_pending_returns(&self, action: &str) -> Result<(), DomainError> {
        if self.has_pending_returns() {
            return Err(DomainError::conflict(format!(
                "cannot {action} line item with pending return requests"
            )));
        }
        Ok(())
    }

    fn pending_return(&self, return_id: ReturnRequestId) -> Result<&ReturnRequest, DomainError> {
        let request = self
            .return_request(return_id)
            .ok_or_else(DomainError::not_found)?;
        if !request.is_pending() {
            return Err(DomainError::invariant(format!(
                "return request {return_id} is already {}",
                request.status
            )));
        }
        Ok(request)
    }

    fn material(&self) -> Result<MaterialId, DomainError> {
        self.material_id
            .ok_or_else(|| DomainError::invariant("material must be set"))
    }

    fn handle_create(&self, cmd: &CreateLineItem) -> Result<Vec<LineItemEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("line item already exists"));
        }
        self.ensure_line_item_id(cmd.line_item_id)?;

        if cmd.requested_quantity < Decimal::ZERO {
            return Err(DomainError::validation(
                "requested quantity must not be negative",
            ));
        }

        Ok(vec![LineItemEvent::LineItemCreated(LineItemCreated {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            purchase_request_id: cmd.purchase_request_id,
            material_id: cmd.material_id,
            line_no: cmd.line_no,
            requested_quantity: cmd.requested_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_ordered(&self, cmd: &MarkOrdered) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;

        if self.status != LineItemStatus::Pending {
            return Err(DomainError::invariant(format!(
                "only pending line items can be ordered (status: {})",
                self.status
            )));
        }

        Ok(vec![LineItemEvent::LineItemOrdered(LineItemOrdered {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            vendor_id: cmd.vendor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_receipt(
        &self,
        cmd: &RecordReceipt,
    ) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;

        match self.status {
            LineItemStatus::Pending | LineItemStatus::Ordered => {}
            LineItemStatus::Received => {
                return Err(DomainError::invariant("receipt already recorded"));
            }
            LineItemStatus::ShortClosed | LineItemStatus::Closed => {
                return Err(DomainError::invariant(format!(
                    "cannot receive goods for a {} line item",
                    self.status
                )));
            }
        }

        if cmd.actual_quantity < Decimal::ZERO {
            return Err(DomainError::validation(
                "received quantity must not be negative",
            ));
        }

        Ok(vec![LineItemEvent::ReceiptRecorded(ReceiptRecorded {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            material_id: self.material()?,
            actual_quantity: cmd.actual_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_return(
        &self,
        cmd: &RequestReturn,
    ) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;

        if cmd.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("return quantity must be positive"));
        }

        if self.return_request(cmd.return_id).is_some() {
            return Err(DomainError::conflict(format!(
                "return request {} already exists",
                cmd.return_id
            )));
        }

        if !self.can_be_returned() {
            return Err(DomainError::invariant(format!(
                "line item is not eligible for return (status: {}, effective quantity: {})",
                self.status,
                self.effective_quantity()
            )));
        }

        let max = self.max_returnable_quantity();
        if cmd.quantity > max {
            return Err(DomainError::validation(format!(
                "return quantity {} exceeds returnable quantity {max}",
                cmd.quantity
            )));
        }

        Ok(vec![LineItemEvent::ReturnRequested(ReturnRequested {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            return_id: cmd.return_id,
            quantity: cmd.quantity,
            reason: cmd.reason.clone(),
            requested_by: cmd.requested_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve_return(
        &self,
        cmd: &ApproveReturn,
    ) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;
        let request = self.pending_return(cmd.return_id)?;

        // Another return may have been approved since this one was requested.
        let max = self.max_returnable_quantity();
        if request.return_quantity > max {
            return Err(DomainError::invariant(format!(
                "approving return of {} would exceed returnable quantity {max}",
                request.return_quantity
            )));
        }

        Ok(vec![LineItemEvent::ReturnApproved(ReturnApproved {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            return_id: cmd.return_id,
            material_id: self.material()?,
            quantity: request.return_quantity,
            approved_by: cmd.approved_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject_return(
        &self,
        cmd: &RejectReturn,
    ) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;
        self.pending_return(cmd.return_id)?;

        Ok(vec![LineItemEvent::ReturnRejected(ReturnRejected {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            return_id: cmd.return_id,
            reason: cmd.reason.clone(),
            rejected_by: cmd.rejected_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_short_close(&self, cmd: &ShortClose) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;

        if !matches!(
            self.status,
            LineItemStatus::Ordered | LineItemStatus::Received
        ) {
            return Err(DomainError::invariant(format!(
                "only ordered or received line items can be short-closed (status: {})",
                self.status
            )));
        }
        self.ensure_no_pending_returns("short-close")?;

        Ok(vec![LineItemEvent::LineItemShortClosed(
            LineItemShortClosed {
                tenant_id: cmd.tenant_id,
                line_item_id: cmd.line_item_id,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_close(&self, cmd: &Close) -> Result<Vec<LineItemEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.line_item_id)?;

        if !matches!(
            self.status,
            LineItemStatus::Received | LineItemStatus::ShortClosed
        ) {
            return Err(DomainError::invariant(format!(
                "only received or short-closed line items can be closed (status: {})",
                self.status
            )));
        }
        self.ensure_no_pending_returns("close")?;

        Ok(vec![LineItemEvent::LineItemClosed(LineItemClosed {
            tenant_id: cmd.tenant_id,
            line_item_id: cmd.line_item_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
