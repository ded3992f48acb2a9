use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    Consumable,
    Reusable,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::Consumable => "consumable",
            UsageType::Reusable => "reusable",
        }
    }
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consumable" => Ok(UsageType::Consumable),
            "reusable" => Ok(UsageType::Reusable),
            other => Err(format!("unknown usage type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialStock {
    pub material_id: Uuid,
    pub name: String,
    pub usage_type: UsageType,
    pub available: i32,
    pub in_use: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialUsageRecord {
    pub appointment_id: Uuid,
    pub material_id: Uuid,
    pub quantity: i32,
    pub usage_type: UsageType,
    pub deducted_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl MaterialUsageRecord {
    pub fn is_outstanding(&self) -> bool {
        self.usage_type == UsageType::Reusable && self.returned_at.is_none()
    }
}

/// One line of a multi-item deduction request. Deduction is
/// all-or-nothing across the whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionLine {
    pub material_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductMaterialsRequest {
    pub lines: Vec<DeductionLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMaterialRequest {
    pub material_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub material_id: Uuid,
    pub available: i32,
    pub in_use: i32,
}
