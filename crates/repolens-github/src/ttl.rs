//! Per-resource cache lifetimes
//!
//! Volatile resources (issues, timelines) live half an hour; structural
//! data an hour; dependency health six hours because registry metadata
//! moves slowly and the report is the most expensive fan-out we run.

use std::time::Duration;

pub const REPO: Duration = Duration::from_secs(3600);
pub const TREE: Duration = Duration::from_secs(3600);
pub const CONTRIBUTORS: Duration = Duration::from_secs(3600);
pub const DEPLOYMENTS: Duration = Duration::from_secs(3600);
pub const ISSUES: Duration = Duration::from_secs(1800);
pub const GOOD_FIRST_ISSUES: Duration = Duration::from_secs(1800);
pub const ISSUE_TIMELINE: Duration = Duration::from_secs(1800);
pub const FILE_COMMITS: Duration = Duration::from_secs(3600);
pub const HOTSPOTS: Duration = Duration::from_secs(3600);
pub const REPO_TIMELINE: Duration = Duration::from_secs(3600);
pub const DEPENDENCY_HEALTH: Duration = Duration::from_secs(21600);
