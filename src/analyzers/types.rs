//! Row types of the summary reports.

use serde::Serialize;

/// Label used for records without a category or hour.
pub const UNKNOWN: &str = "Unknown";

/// Mean headline pollutants for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSummary {
    pub location: String,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub ozone: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub sulphur_dioxide: Option<f64>,
}

/// Number of records carrying one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Mean particulate levels for one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyTrend {
    /// Hour `0..=23`, or [`UNKNOWN`].
    pub hour: String,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
}

/// One named grouped aggregation over the whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryReport {
    LocationSummary(Vec<LocationSummary>),
    CategoryDistribution(Vec<LabelCount>),
    RiskDistribution(Vec<LabelCount>),
    HourlyTrend(Vec<HourlyTrend>),
}

impl SummaryReport {
    pub fn file_name(&self) -> &'static str {
        match self {
            SummaryReport::LocationSummary(_) => "city_pollution_summary.csv",
            SummaryReport::CategoryDistribution(_) => "aqi_distribution.csv",
            SummaryReport::RiskDistribution(_) => "risk_distribution.csv",
            SummaryReport::HourlyTrend(_) => "hourly_pollution_trends.csv",
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            SummaryReport::LocationSummary(_) => &[
                "location",
                "pm2_5",
                "pm10",
                "ozone",
                "nitrogen_dioxide",
                "sulphur_dioxide",
            ],
            SummaryReport::CategoryDistribution(_) => &["aqi", "count"],
            SummaryReport::RiskDistribution(_) => &["risk", "count"],
            SummaryReport::HourlyTrend(_) => &["hour", "pm2_5", "pm10"],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SummaryReport::LocationSummary(rows) => rows.len(),
            SummaryReport::CategoryDistribution(rows) | SummaryReport::RiskDistribution(rows) => {
                rows.len()
            }
            SummaryReport::HourlyTrend(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
