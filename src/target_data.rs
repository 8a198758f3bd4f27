//! Data the target reports about itself, kept for the console's viewing
//! commands (`*profile`, `*timestamps`, `*freemem`, `*mapinfo`,
//! `*resources`).

use std::collections::{BTreeMap, VecDeque};

use crate::remote::{ResourceKind, TimeStamp};

pub const MAX_TIMESTAMPS: usize = 1000;
pub const MAX_FREE_MEMORY_SAMPLES: usize = 120;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Default)]
pub struct TargetData {
    profile_labels: Vec<String>,
    profile_samples: Vec<f32>,
    timestamps: VecDeque<TimeStamp>,
    free_memory: VecDeque<u64>,
    resources: BTreeMap<ResourceKind, Vec<String>>,
    map_info: Vec<(String, String)>,
    last_dump: Option<String>,
}

impl TargetData {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_profile_labels(&mut self, labels: Vec<String>) {
        self.profile_labels = labels;
    }

    pub fn set_profile_samples(&mut self, samples: Vec<f32>) {
        self.profile_samples = samples;
    }

    pub fn push_timestamp(&mut self, stamp: TimeStamp) {
        if self.timestamps.len() == MAX_TIMESTAMPS {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(stamp);
    }

    pub fn push_free_memory(&mut self, bytes: u64) {
        if self.free_memory.len() == MAX_FREE_MEMORY_SAMPLES {
            self.free_memory.pop_front();
        }
        self.free_memory.push_back(bytes);
    }

    pub fn set_resources(&mut self, kind: ResourceKind, entries: Vec<String>) {
        self.resources.insert(kind, entries);
    }

    pub fn set_map_info(&mut self, pairs: Vec<(String, String)>) {
        self.map_info = pairs;
    }

    pub fn set_last_dump(&mut self, path: String) {
        self.last_dump = Some(path);
    }

    pub fn last_dump(&self) -> Option<&str> {
        self.last_dump.as_deref()
    }

    pub fn latest_free_memory(&self) -> Option<u64> {
        self.free_memory.back().copied()
    }

    pub fn profile_lines(&self) -> Vec<String> {
        if self.profile_samples.is_empty() {
            return vec!["No profile data.".to_string()];
        }
        self.profile_samples
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                let label = self
                    .profile_labels
                    .get(i)
                    .map(String::as_str)
                    .unwrap_or("?");
                format!("{:<24} {:>8.2} ms", label, ms)
            })
            .collect()
    }

    pub fn timestamp_lines(&self) -> Vec<String> {
        if self.timestamps.is_empty() {
            return vec!["No time stamps.".to_string()];
        }
        self.timestamps
            .iter()
            .map(|t| {
                format!(
                    "{:>10.3}s {:>10.2} MB  {}",
                    t.time,
                    t.memory as f64 / MB,
                    t.label
                )
            })
            .collect()
    }

    pub fn free_memory_lines(&self) -> Vec<String> {
        let Some(latest) = self.latest_free_memory() else {
            return vec!["No free memory samples.".to_string()];
        };
        let min = self.free_memory.iter().copied().min().unwrap_or(latest);
        let max = self.free_memory.iter().copied().max().unwrap_or(latest);
        vec![format!(
            "Free memory: {:.2} MB (min {:.2} MB, max {:.2} MB over {} samples)",
            latest as f64 / MB,
            min as f64 / MB,
            max as f64 / MB,
            self.free_memory.len()
        )]
    }

    pub fn map_info_lines(&self) -> Vec<String> {
        if self.map_info.is_empty() {
            return vec!["No map info.".to_string()];
        }
        self.map_info
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect()
    }

    /// One section per kind, or only `kind` when given.
    pub fn resource_lines(&self, kind: Option<ResourceKind>) -> Vec<String> {
        let kinds: Vec<ResourceKind> = match kind {
            Some(kind) => vec![kind],
            None => ResourceKind::ALL.to_vec(),
        };
        let mut lines = Vec::new();
        for kind in kinds {
            let entries = self.resources.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
            lines.push(format!("{}: ( {} )", kind.as_str(), entries.len()));
            lines.extend(entries.iter().map(|e| format!("  {}", e)));
        }
        lines
    }
}
