//! Post-run diagnostics. A detector only appends error strings; it never
//! changes whether the run succeeded.

use super::job::Job;
use crate::workflow::{AggregateResult, FORM_DATA_PREFIX};

pub trait AnomalyDetector: Send + Sync {
    fn inspect(&self, job: &Job, result: &AggregateResult) -> Vec<String>;
}

/// Flags successful runs that are worth a human look.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicAnomalyDetector;

impl AnomalyDetector for BasicAnomalyDetector {
    fn inspect(&self, _job: &Job, result: &AggregateResult) -> Vec<String> {
        if !result.success {
            return Vec::new();
        }

        let mut findings = Vec::new();

        if result.screenshot().is_none() {
            findings.push("Run succeeded but no screenshot was captured".to_string());
        }

        for (key, fields) in &result.data {
            let Some(segment) = key.strip_prefix(FORM_DATA_PREFIX) else {
                continue;
            };
            let Some(fields) = fields.as_object() else {
                continue;
            };
            for (label, entry) in fields {
                let status = entry["outcome"]["status"].as_str().unwrap_or_default();
                let value = entry["outcome"]["value"].as_str().unwrap_or_default();
                match status {
                    "typed_fallback" => findings.push(format!(
                        "{segment}: '{label}' had no dropdown options; typed text '{value}' was kept"
                    )),
                    "first_option" => findings.push(format!(
                        "{segment}: '{label}' had no close match; first option '{value}' was taken"
                    )),
                    _ => {}
                }
            }
        }

        let skipped: Vec<&str> = result
            .data
            .get("skippedProcesses")
            .and_then(|v| v.as_array())
            .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
            .unwrap_or_default();
        if !skipped.is_empty() {
            findings.push(format!("Optional processes skipped: {}", skipped.join(", ")));
        }

        findings
    }
}
