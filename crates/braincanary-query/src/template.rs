//! The monitor's trace query template

use chrono::{DateTime, Utc};

/// Literal values are escaped by doubling embedded single quotes; callers never
/// interpolate free-form user text here beyond the project/deployment identifiers the
/// controller itself generated.
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build the bind-safe trace query for one (deployment, version) pair.
pub fn build_query(project: &str, deployment_id: &str, version: &str, watermark: DateTime<Utc>) -> String {
    format!(
        "SELECT id, scores, metadata, created, error\nFROM project_logs('{}', shape => 'traces')\nWHERE metadata.\"braincanary.deployment_id\" = '{}'\n  AND metadata.\"braincanary.version\" = '{}'\n  AND created > '{}'\nORDER BY created ASC",
        escape(project),
        escape(deployment_id),
        escape(version),
        watermark.to_rfc3339(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_expected_shape() {
        let watermark = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let sql = build_query("proj", "deploy-1", "canary", watermark);
        assert!(sql.contains("metadata.\"braincanary.deployment_id\" = 'deploy-1'"));
        assert!(sql.contains("metadata.\"braincanary.version\" = 'canary'"));
        assert!(sql.contains("2026-01-01"));
    }

    #[test]
    fn escapes_embedded_quotes() {
        let watermark = Utc::now();
        let sql = build_query("proj's", "id", "canary", watermark);
        assert!(sql.contains("proj''s"));
    }
}
