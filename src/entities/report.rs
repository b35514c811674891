//! Report entity type - customer defect reports and their handling

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::actor::ActivityEntry;
use crate::core::entity::Entity;

/// Handling status of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ReportStatus {
    /// Just received
    #[default]
    New,
    /// Under investigation
    Processing,
    /// Waiting for replacement goods
    AwaitingExchange,
    /// Closed out
    Completed,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::New => write!(f, "Mới"),
            ReportStatus::Processing => write!(f, "Đang xử lý"),
            ReportStatus::AwaitingExchange => write!(f, "Chờ đổi hàng"),
            ReportStatus::Completed => write!(f, "Hoàn thành"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ReportStatus::New),
            "processing" => Ok(ReportStatus::Processing),
            "awaiting_exchange" => Ok(ReportStatus::AwaitingExchange),
            "completed" => Ok(ReportStatus::Completed),
            _ => Err(format!(
                "Invalid report status: {}. Use new, processing, awaiting_exchange, or completed",
                s
            )),
        }
    }
}

/// A defect report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// `<year>-<sequence>`, see [`ReportId`](crate::core::identity::ReportId)
    pub id: String,

    /// Business date of the report; its year scopes the id
    pub date: NaiveDate,

    #[serde(default)]
    pub customer_code: String,

    #[serde(default)]
    pub customer_name: String,

    #[serde(default)]
    pub product_code: String,

    #[serde(default)]
    pub product_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,

    /// Quantity reported defective
    #[serde(default)]
    pub quantity: u32,

    /// What the customer reported
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: ReportStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_analysis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanged_quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,

    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Report {
    /// A blank report dated `date`; the id is assigned on creation
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: String::new(),
            date,
            customer_code: String::new(),
            customer_name: String::new(),
            product_code: String::new(),
            product_name: String::new(),
            lot_number: None,
            quantity: 0,
            description: String::new(),
            status: ReportStatus::default(),
            cause_analysis: None,
            remediation: None,
            exchanged_quantity: None,
            completion_date: None,
            activity_log: Vec::new(),
            created_by: None,
            created_at: Utc::now(),
        }
    }
}

/// Partial update of a report's mutable fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_analysis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanged_quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
}

impl Entity for Report {
    const COLLECTION: &'static str = "reports";
    const LABEL: &'static str = "phiếu";

    type Patch = ReportPatch;

    fn key(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: &ReportPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(ref cause) = patch.cause_analysis {
            self.cause_analysis = Some(cause.clone());
        }
        if let Some(ref remediation) = patch.remediation {
            self.remediation = Some(remediation.clone());
        }
        if let Some(exchanged) = patch.exchanged_quantity {
            self.exchanged_quantity = Some(exchanged);
        }
        if let Some(date) = patch.completion_date {
            self.completion_date = Some(date);
        }
    }

    fn describe_patch(patch: &ReportPatch) -> Option<String> {
        patch.status.map(|status| format!("Trạng thái: {}", status))
    }

    fn activity_log_mut(&mut self) -> Option<&mut Vec<ActivityEntry>> {
        Some(&mut self.activity_log)
    }
}
