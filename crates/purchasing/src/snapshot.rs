//! Plain line item records exchanged with persistence.
//!
//! A snapshot is restored exactly as stored, cached return totals included, so
//! the return rules can be evaluated over records that were written by other
//! systems (and may carry anomalies such as returns exceeding receipt).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::TenantId;

use crate::ids::{LineItemId, MaterialId, PurchaseRequestId, VendorId};
use crate::line_item::{LineItem, LineItemStatus};
use crate::returns::ReturnRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemSnapshot {
    pub id: LineItemId,
    pub tenant_id: TenantId,
    pub purchase_request_id: PurchaseRequestId,
    pub material_id: MaterialId,
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    pub line_no: u32,
    pub requested_quantity: Decimal,
    #[serde(default)]
    pub actual_quantity: Option<Decimal>,
    pub status: LineItemStatus,
    /// Absent in older records; read as zero.
    #[serde(default)]
    pub total_returned_quantity: Decimal,
    #[serde(default)]
    pub has_returns: bool,
    #[serde(default)]
    pub return_requests: Vec<ReturnRequest>,
    #[serde(default)]
    pub version: u64,
}

impl LineItem {
    pub fn from_snapshot(snapshot: LineItemSnapshot) -> Self {
        Self {
            id: snapshot.id,
            tenant_id: Some(snapshot.tenant_id),
            purchase_request_id: Some(snapshot.purchase_request_id),
            material_id: Some(snapshot.material_id),
            vendor_id: snapshot.vendor_id,
            line_no: snapshot.line_no,
            requested_quantity: snapshot.requested_quantity,
            actual_quantity: snapshot.actual_quantity,
            status: snapshot.status,
            total_returned_quantity: snapshot.total_returned_quantity,
            has_returns: snapshot.has_returns,
            return_requests: snapshot.return_requests,
            version: snapshot.version,
            created: true,
        }
    }

    /// `None` until the line item has been created.
    pub fn snapshot(&self) -> Option<LineItemSnapshot> {
        if !self.created {
            return None;
        }

        Some(LineItemSnapshot {
            id: self.id,
            tenant_id: self.tenant_id?,
            purchase_request_id: self.purchase_request_id?,
            material_id: self.material_id?,
            vendor_id: self.vendor_id,
            line_no: self.line_no,
            requested_quantity: self.requested_quantity,
            actual_quantity: self.actual_quantity,
            status: self.status,
            total_returned_quantity: self.total_returned_quantity,
            has_returns: self.has_returns,
            return_requests: self.return_requests.clone(),
            version: self.version,
        })
    }
}
