use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    analytics::{AnalyticsRecord, AnalyticsSummary},
    render::{Color, ErrorCorrection},
};

/// `size` as sent by browsers: a number, or a numeric string.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SizeInput {
    Number(f64),
    Text(String),
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub text: Option<String>,
    pub size: Option<SizeInput>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub error_correction: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct FormatRequest {
    #[serde(flatten)]
    pub generate: GenerateRequest,
    pub format: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrackScanRequest {
    pub qr_id: Option<String>,
    pub text: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub qr_code: String,
    pub qr_id: String,
    pub text: String,
    pub size: u32,
    pub color: Color,
    pub background_color: Color,
    pub error_correction: ErrorCorrection,
    pub analytics: AnalyticsRecord,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FormatResponse {
    pub success: bool,
    pub qr_code: String,
    pub format: &'static str,
    pub content_type: &'static str,
    pub filename: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TrackScanResponse {
    pub success: bool,
    pub qr_id: String,
    pub scans: u64,
    pub last_scanned: Option<DateTime<Utc>>,
}

impl From<AnalyticsRecord> for TrackScanResponse {
    fn from(record: AnalyticsRecord) -> Self {
        Self {
            success: true,
            qr_id: record.qr_id,
            scans: record.scans,
            last_scanned: record.last_scanned,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub analytics: AnalyticsRecord,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsListResponse {
    pub success: bool,
    #[serde(rename = "totalQRCodes")]
    pub total_qr_codes: usize,
    pub total_scans: u64,
    pub qr_codes: Vec<AnalyticsRecord>,
}

impl From<AnalyticsSummary> for AnalyticsListResponse {
    fn from(summary: AnalyticsSummary) -> Self {
        Self {
            success: true,
            total_qr_codes: summary.total_qr_codes,
            total_scans: summary.total_scans,
            qr_codes: summary.qr_codes,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
}
