//! Severity scoring and categorical labels.
//!
//! Severity is a crude linear proxy over the six core pollutants. It is not an
//! official air-quality index and the weights and thresholds below are kept
//! exactly as the downstream reports expect them.

use crate::model::{AqiCategory, Measurements, Observation, Record, RiskTier};

/// Multipliers applied to each core pollutant when computing severity.
pub const PM2_5_WEIGHT: f64 = 5.0;
pub const PM10_WEIGHT: f64 = 3.0;
pub const NITROGEN_DIOXIDE_WEIGHT: f64 = 4.0;
pub const SULPHUR_DIOXIDE_WEIGHT: f64 = 4.0;
pub const CARBON_MONOXIDE_WEIGHT: f64 = 2.0;
pub const OZONE_WEIGHT: f64 = 3.0;

/// Weighted sum of the core pollutants. Missing readings contribute zero.
pub fn severity(m: &Measurements) -> f64 {
    m.pm2_5.unwrap_or(0.0) * PM2_5_WEIGHT
        + m.pm10.unwrap_or(0.0) * PM10_WEIGHT
        + m.nitrogen_dioxide.unwrap_or(0.0) * NITROGEN_DIOXIDE_WEIGHT
        + m.sulphur_dioxide.unwrap_or(0.0) * SULPHUR_DIOXIDE_WEIGHT
        + m.carbon_monoxide.unwrap_or(0.0) * CARBON_MONOXIDE_WEIGHT
        + m.ozone.unwrap_or(0.0) * OZONE_WEIGHT
}

/// Maps a severity score onto a risk tier.
///
/// | Severity      | Tier          |
/// |---------------|---------------|
/// | > 400         | High Risk     |
/// | > 200         | Moderate Risk |
/// | otherwise     | Low Risk      |
pub fn risk_tier(severity: f64) -> RiskTier {
    match severity {
        s if s > 400.0 => RiskTier::High,
        s if s > 200.0 => RiskTier::Moderate,
        _ => RiskTier::Low,
    }
}

/// Maps a PM2.5 reading onto an air-quality category. Bands are inclusive on
/// their upper bound.
pub fn aqi_category(pm2_5: Option<f64>) -> Option<AqiCategory> {
    let pm = pm2_5?;
    Some(match pm {
        p if p <= 50.0 => AqiCategory::Good,
        p if p <= 100.0 => AqiCategory::Moderate,
        p if p <= 200.0 => AqiCategory::Unhealthy,
        p if p <= 300.0 => AqiCategory::VeryUnhealthy,
        _ => AqiCategory::Hazardous,
    })
}

/// Completes an observation with its derived score and labels.
pub fn classify(obs: Observation) -> Record {
    let m = obs.measurements;
    let severity = severity(&m);

    Record {
        location: obs.location,
        timestamp: obs.timestamp,
        hour: obs.hour,
        pm10: m.pm10,
        pm2_5: m.pm2_5,
        carbon_monoxide: m.carbon_monoxide,
        nitrogen_dioxide: m.nitrogen_dioxide,
        sulphur_dioxide: m.sulphur_dioxide,
        ozone: m.ozone,
        uv_index: m.uv_index,
        aqi: aqi_category(m.pm2_5),
        severity,
        risk: risk_tier(severity),
    }
}
