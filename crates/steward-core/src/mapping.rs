//! Value translation between steward vocabulary and Splunk API vocabulary.
//!
//! Each pair of functions is an exact inverse of the other over the declared
//! value domain. Unknown values pass through unchanged in both directions;
//! the API occasionally grows codes we do not know about, and dropping them
//! would corrupt the diff.

/// Status values accepted on findings and investigations.
pub const STATUS_VALUES: &[&str] = &[
    "unassigned",
    "new",
    "in_progress",
    "pending",
    "resolved",
    "closed",
];

/// Disposition values accepted on findings and investigations.
pub const DISPOSITION_VALUES: &[&str] = &[
    "unassigned",
    "true_positive",
    "benign_positive",
    "false_positive",
    "false_positive_inaccurate_data",
    "other",
    "undetermined",
];

/// Sensitivity (TLP-style) values accepted on investigations.
pub const SENSITIVITY_VALUES: &[&str] = &["white", "green", "amber", "red", "unassigned"];

/// Urgency values accepted on findings and investigations.
pub const URGENCY_VALUES: &[&str] = &[
    "informational",
    "low",
    "medium",
    "high",
    "critical",
    "unknown",
];

/// Task status values on applied response plans.
pub const TASK_STATUS_VALUES: &[&str] = &["pending", "started", "ended", "reopened"];

/// Translates a status value to the API's numeric code.
pub fn status_to_api(value: &str) -> &str {
    match value {
        "unassigned" => "0",
        "new" => "1",
        "in_progress" => "2",
        "pending" => "3",
        "resolved" => "4",
        "closed" => "5",
        other => other,
    }
}

/// Translates an API status code back to the steward value.
pub fn status_from_api(value: &str) -> &str {
    match value {
        "0" => "unassigned",
        "1" => "new",
        "2" => "in_progress",
        "3" => "pending",
        "4" => "resolved",
        "5" => "closed",
        other => other,
    }
}

/// Translates a disposition value to the API's `disposition:N` code.
pub fn disposition_to_api(value: &str) -> &str {
    match value {
        "unassigned" => "disposition:0",
        "true_positive" => "disposition:1",
        "benign_positive" => "disposition:2",
        "false_positive" => "disposition:3",
        "false_positive_inaccurate_data" => "disposition:4",
        "other" => "disposition:5",
        "undetermined" => "disposition:6",
        other => other,
    }
}

/// Translates an API disposition code back to the steward value.
pub fn disposition_from_api(value: &str) -> &str {
    match value {
        "disposition:0" => "unassigned",
        "disposition:1" => "true_positive",
        "disposition:2" => "benign_positive",
        "disposition:3" => "false_positive",
        "disposition:4" => "false_positive_inaccurate_data",
        "disposition:5" => "other",
        "disposition:6" => "undetermined",
        other => other,
    }
}

/// Translates a sensitivity value to the API's capitalized form.
pub fn sensitivity_to_api(value: &str) -> &str {
    match value {
        "white" => "White",
        "green" => "Green",
        "amber" => "Amber",
        "red" => "Red",
        "unassigned" => "Unassigned",
        other => other,
    }
}

/// Translates an API sensitivity value back to the steward value.
pub fn sensitivity_from_api(value: &str) -> &str {
    match value {
        "White" => "white",
        "Green" => "green",
        "Amber" => "amber",
        "Red" => "red",
        "Unassigned" => "unassigned",
        other => other,
    }
}

/// Translates a task status to the API's capitalized form.
pub fn task_status_to_api(value: &str) -> &str {
    match value {
        "pending" => "Pending",
        "started" => "Started",
        "ended" => "Ended",
        "reopened" => "Reopened",
        other => other,
    }
}

/// Translates an API task status back to the steward value.
pub fn task_status_from_api(value: &str) -> &str {
    match value {
        "Pending" => "pending",
        "Started" => "started",
        "Ended" => "ended",
        "Reopened" => "reopened",
        other => other,
    }
}
