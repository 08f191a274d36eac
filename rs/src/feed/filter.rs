use crate::core::types::{DisasterType, Priority, Report, Status};
use serde::Deserialize;

/// Client-side narrowing of the report list. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFilter {
    pub disaster_type: Option<DisasterType>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub min_priority: Option<Priority>,
    pub search: Option<String>,
    pub locatable_only: bool,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        if self.disaster_type.is_some_and(|t| t != report.disaster_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != report.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != report.priority) {
            return false;
        }
        if self.min_priority.is_some_and(|p| report.priority < p) {
            return false;
        }
        if self.locatable_only && !report.is_locatable() {
            return false;
        }

        match &self.search {
            Some(search) => matches_search(report, search),
            None => true,
        }
    }

    pub fn apply(&self, reports: &[Report]) -> Vec<Report> {
        reports
            .iter()
            .filter(|report| self.matches(report))
            .cloned()
            .collect()
    }
}

/// Every whitespace-separated term must occur in the address, type or id.
fn matches_search(report: &Report, search: &str) -> bool {
    let lowercase_search = search.to_lowercase();
    let haystack = format!(
        "{} {} {}",
        report.address.to_lowercase(),
        report.disaster_type.label(),
        report.id
    );

    lowercase_search
        .split_whitespace()
        .all(|term| haystack.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GeoPoint;

    fn report(id: u64, disaster_type: DisasterType, priority: Priority, address: &str) -> Report {
        Report {
            id,
            disaster_type,
            priority,
            status: Status::Pending,
            location: Some(GeoPoint {
                latitude: 19.0760,
                longitude: 72.8777,
            }),
            address: address.to_string(),
            created_at: None,
            media: Vec::new(),
        }
    }

    #[test]
    fn search_terms_are_conjunctive_and_case_insensitive() {
        let reports = vec![
            report(1, DisasterType::Flood, Priority::High, "Andheri East, Mumbai"),
            report(2, DisasterType::Fire, Priority::Low, "Bandra West, Mumbai"),
        ];
        let filter = ReportFilter {
            search: Some("MUMBAI flood".to_string()),
            ..Default::default()
        };
        let ids: Vec<u64> = filter.apply(&reports).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn min_priority_keeps_higher_levels() {
        let reports = vec![
            report(1, DisasterType::Flood, Priority::Low, ""),
            report(2, DisasterType::Flood, Priority::High, ""),
            report(3, DisasterType::Flood, Priority::Critical, ""),
        ];
        let filter: ReportFilter = serde_json::from_str(r#"{"minPriority": "HIGH"}"#).unwrap();
        let ids: Vec<u64> = filter.apply(&reports).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn empty_filter_matches_all() {
        let mut unlocatable = report(9, DisasterType::Other, Priority::Medium, "");
        unlocatable.location = None;
        assert!(ReportFilter::default().matches(&unlocatable));
        let filter = ReportFilter {
            locatable_only: true,
            ..Default::default()
        };
        assert!(!filter.matches(&unlocatable));
    }
}
