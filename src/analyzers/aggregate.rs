use std::collections::{BTreeMap, HashMap};

use crate::analyzers::types::{HourlyTrend, LabelCount, LocationSummary, SummaryReport, UNKNOWN};
use crate::analyzers::utility::rounded_mean;
use crate::model::Record;
use crate::store::Dataset;

/// Computes every report whose input columns exist in `dataset`.
///
/// A missing column only skips the reports that read it. Records still carry
/// defaulted values for such columns, and they are never reported.
pub fn aggregate(dataset: &Dataset) -> Vec<SummaryReport> {
    let records = &dataset.records;
    let mut reports = Vec::new();

    if dataset.has_column("location") {
        reports.push(SummaryReport::LocationSummary(location_summary(records)));
    }
    if dataset.has_column("aqi") {
        reports.push(SummaryReport::CategoryDistribution(count_labels(
            records
                .iter()
                .map(|r| r.aqi.map(|c| c.label()).unwrap_or(UNKNOWN)),
        )));
    }
    if dataset.has_column("risk") {
        reports.push(SummaryReport::RiskDistribution(count_labels(
            records.iter().map(|r| r.risk.label()),
        )));
    }
    if dataset.has_column("hour") {
        reports.push(SummaryReport::HourlyTrend(hourly_trend(records)));
    }

    reports
}

/// Mean headline pollutants per location, sorted by location.
pub fn location_summary(records: &[Record]) -> Vec<LocationSummary> {
    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for r in records {
        groups.entry(r.location.as_str()).or_default().push(r);
    }

    groups
        .into_iter()
        .map(|(location, rows)| LocationSummary {
            location: location.to_string(),
            pm2_5: rounded_mean(rows.iter().map(|r| r.pm2_5)),
            pm10: rounded_mean(rows.iter().map(|r| r.pm10)),
            ozone: rounded_mean(rows.iter().map(|r| r.ozone)),
            nitrogen_dioxide: rounded_mean(rows.iter().map(|r| r.nitrogen_dioxide)),
            sulphur_dioxide: rounded_mean(rows.iter().map(|r| r.sulphur_dioxide)),
        })
        .collect()
}

/// Frequency of each label, most frequent first. Ties are ordered by label.
pub fn count_labels<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut rows: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows
}

/// Mean PM2.5 and PM10 per hour of day. Records without an hour are grouped
/// last under [`UNKNOWN`].
pub fn hourly_trend(records: &[Record]) -> Vec<HourlyTrend> {
    let mut by_hour: BTreeMap<u32, Vec<&Record>> = BTreeMap::new();
    let mut unknown: Vec<&Record> = Vec::new();
    for r in records {
        match r.hour {
            Some(h) => by_hour.entry(h).or_default().push(r),
            None => unknown.push(r),
        }
    }

    let trend = |hour: String, rows: &[&Record]| HourlyTrend {
        hour,
        pm2_5: rounded_mean(rows.iter().map(|r| r.pm2_5)),
        pm10: rounded_mean(rows.iter().map(|r| r.pm10)),
    };

    let mut rows: Vec<HourlyTrend> = by_hour
        .iter()
        .map(|(hour, rows)| trend(hour.to_string(), rows))
        .collect();
    if !unknown.is_empty() {
        rows.push(trend(UNKNOWN.to_string(), &unknown));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::model::{Measurements, Observation};

    fn rec(location: &str, hour: Option<u32>, pm2_5: Option<f64>, pm10: Option<f64>) -> Record {
        classify(Observation {
            location: location.to_string(),
            timestamp: None,
            hour,
            measurements: Measurements {
                pm2_5,
                pm10,
                ..Default::default()
            },
        })
    }

    fn count(label: &str, count: usize) -> LabelCount {
        LabelCount {
            label: label.into(),
            count,
        }
    }

    fn dataset(records: Vec<Record>) -> Dataset {
        Dataset {
            columns: [
                "location", "timestamp", "hour", "pm10", "pm2_5", "carbon_monoxide",
                "nitrogen_dioxide", "sulphur_dioxide", "ozone", "uv_index", "aqi", "severity",
                "risk",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            records,
        }
    }

    #[test]
    fn test_single_record_per_location_mean_is_the_value() {
        let summary = location_summary(&[
            rec("Delhi", Some(0), Some(40.0), None),
            rec("Mumbai", Some(0), Some(60.0), None),
        ]);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].location, "Delhi");
        assert_eq!(summary[0].pm2_5, Some(40.0));
        assert_eq!(summary[1].location, "Mumbai");
        assert_eq!(summary[1].pm2_5, Some(60.0));
        assert_eq!(summary[1].pm10, None);
    }

    #[test]
    fn test_location_means_are_rounded_and_skip_missing() {
        let summary = location_summary(&[
            rec("Delhi", Some(0), Some(10.0), Some(1.0)),
            rec("Delhi", Some(1), Some(10.0), None),
            rec("Delhi", Some(2), Some(11.0), Some(2.0)),
        ]);
        assert_eq!(summary[0].pm2_5, Some(10.33));
        assert_eq!(summary[0].pm10, Some(1.5));
    }

    #[test]
    fn test_category_counts_bucket_unknown_and_sort_desc() {
        let records = vec![
            rec("Delhi", Some(0), Some(10.0), None),
            rec("Delhi", Some(1), Some(20.0), None),
            rec("Delhi", Some(2), Some(350.0), None),
            rec("Delhi", Some(3), None, Some(5.0)),
            rec("Delhi", Some(4), None, Some(5.0)),
            rec("Delhi", Some(5), None, Some(5.0)),
        ];
        let reports = aggregate(&dataset(records));
        let SummaryReport::CategoryDistribution(counts) = &reports[1] else {
            panic!("expected category distribution, got {:?}", reports[1]);
        };

        assert_eq!(
            counts,
            &vec![count("Unknown", 3), count("Good", 2), count("Hazardous", 1)]
        );
    }

    #[test]
    fn test_risk_counts() {
        let records = vec![
            rec("Delhi", Some(0), Some(10.0), None),
            rec("Delhi", Some(1), Some(100.0), None),
            rec("Delhi", Some(2), Some(30.0), None),
        ];
        let counts = count_labels(records.iter().map(|r| r.risk.label()));
        assert_eq!(counts, vec![count("Low Risk", 2), count("High Risk", 1)]);
    }

    #[test]
    fn test_hourly_trend_orders_hours_with_unknown_last() {
        let trend = hourly_trend(&[
            rec("Delhi", Some(13), Some(10.0), Some(20.0)),
            rec("Mumbai", Some(13), Some(20.0), None),
            rec("Delhi", None, Some(5.0), None),
            rec("Delhi", Some(2), Some(1.0), Some(1.0)),
        ]);

        let hours: Vec<&str> = trend.iter().map(|t| t.hour.as_str()).collect();
        assert_eq!(hours, vec!["2", "13", "Unknown"]);
        assert_eq!(trend[1].pm2_5, Some(15.0));
        assert_eq!(trend[1].pm10, Some(20.0));
    }

    #[test]
    fn test_missing_column_skips_only_its_report() {
        let mut ds = dataset(vec![rec("Delhi", Some(0), Some(10.0), None)]);
        ds.columns.retain(|c| c != "aqi");

        let reports = aggregate(&ds);
        assert_eq!(reports.len(), 3);
        assert!(
            !reports
                .iter()
                .any(|r| matches!(r, SummaryReport::CategoryDistribution(_)))
        );
    }

    #[test]
    fn test_empty_dataset_without_header_has_no_reports() {
        assert!(aggregate(&Dataset::default()).is_empty());
    }
}
