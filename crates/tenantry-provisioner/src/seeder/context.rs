use std::collections::HashMap;

use tenantry_core::models::SeedReport;

/// Identity maps and report of one seeding run.
///
/// Owned by the run and passed to each step in turn; later steps read the ids
/// earlier steps recorded.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Group code to remote team id.
    groups: HashMap<String, String>,
    /// (group code, sub-channel code) to remote channel id.
    sub_channels: HashMap<(String, String), String>,
    /// Every channel the run touched, in insertion order, for noise cleanup.
    channels: Vec<(String, String)>,
    pub report: SeedReport,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_group(&mut self, code: &str, team_id: String) {
        self.groups.insert(code.to_string(), team_id);
    }

    pub fn group_id(&self, code: &str) -> Option<&str> {
        self.groups.get(code).map(String::as_str)
    }

    pub fn record_sub_channel(&mut self, group_code: &str, channel_code: &str, channel_id: String) {
        self.record_channel(format!("{}/{}", group_code, channel_code), channel_id.clone());
        self.sub_channels
            .insert((group_code.to_string(), channel_code.to_string()), channel_id);
    }

    pub fn sub_channel_id(&self, group_code: &str, channel_code: &str) -> Option<&str> {
        self.sub_channels
            .get(&(group_code.to_string(), channel_code.to_string()))
            .map(String::as_str)
    }

    /// Track a channel for noise cleanup.
    pub fn record_channel(&mut self, label: String, channel_id: String) {
        if !self.channels.iter().any(|(_, id)| *id == channel_id) {
            self.channels.push((label, channel_id));
        }
    }

    /// (label, channel id) pairs for every channel the run touched.
    pub fn channels(&self) -> &[(String, String)] {
        &self.channels
    }

    pub fn into_report(self) -> SeedReport {
        self.report
    }
}
