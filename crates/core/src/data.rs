//! Turbine data manager
//!
//! Loads the turbine inventory CSV that drives every analysis view, and
//! synthesizes a minimal inventory when no usable file exists.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::instrument;

use crate::error::{Error, Result};

/// Park name used for synthesized default data
pub const DEFAULT_PARK: &str = "Default Park";

/// One turbine row of the inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turbine {
    pub park: String,
    pub turbine_id: String,
    pub model: String,
    pub rated_power_kw: f64,
    #[serde(default)]
    pub hub_height_m: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Where the current dataset came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Empty,
    File(PathBuf),
    Default,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub turbines: Vec<Turbine>,
    pub source: DataSource,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            turbines: Vec::new(),
            source: DataSource::Empty,
        }
    }
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.turbines.is_empty()
    }

    /// Distinct park names in first-seen order
    pub fn parks(&self) -> Vec<String> {
        let mut parks: Vec<String> = Vec::new();
        for turbine in &self.turbines {
            if !parks.iter().any(|p| p == &turbine.park) {
                parks.push(turbine.park.clone());
            }
        }
        parks
    }

    /// One-line description of a park for the dashboard
    pub fn summary(&self, park: &str) -> Option<String> {
        let turbines: Vec<&Turbine> = self.turbines.iter().filter(|t| t.park == park).collect();
        if turbines.is_empty() {
            return None;
        }
        let capacity_mw: f64 = turbines.iter().map(|t| t.rated_power_kw).sum::<f64>() / 1000.0;
        Some(format!(
            "{park}: {} turbine(s), {:.1} MW installed",
            turbines.len(),
            capacity_mw
        ))
    }

    /// Rough in-memory footprint
    pub fn estimated_bytes(&self) -> u64 {
        self.turbines
            .iter()
            .map(|t| {
                std::mem::size_of::<Turbine>() + t.park.len() + t.turbine_id.len() + t.model.len()
            })
            .sum::<usize>() as u64
    }

    /// Minimal placeholder inventory
    pub fn minimal_default() -> Self {
        Self {
            turbines: vec![Turbine {
                park: DEFAULT_PARK.to_string(),
                turbine_id: "WTG-01".to_string(),
                model: "Unknown".to_string(),
                rated_power_kw: 0.0,
                hub_height_m: None,
                latitude: None,
                longitude: None,
            }],
            source: DataSource::Default,
        }
    }
}

/// Memory diagnostics sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub process_bytes: u64,
    pub dataset_bytes: u64,
    pub system_used_bytes: u64,
    pub system_total_bytes: u64,
}

impl std::fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "process {}, dataset {}, system {} / {}",
            format_bytes(self.process_bytes),
            format_bytes(self.dataset_bytes),
            format_bytes(self.system_used_bytes),
            format_bytes(self.system_total_bytes),
        )
    }
}

pub fn format_bytes(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Data manager used by the startup pipeline
pub trait DataManager {
    /// Replace the dataset with the contents of `path`
    fn load(&mut self, path: &Path, chunk_size: Option<usize>) -> Result<()>;

    /// Replace the dataset with the minimal default
    fn create_default_data(&mut self);

    /// Write the current dataset to `path`
    fn persist(&self, path: &Path) -> Result<()>;

    fn dataset(&self) -> &Dataset;

    fn memory_usage(&self) -> Result<MemoryReport>;
}

/// CSV-backed turbine inventory
#[derive(Debug, Default)]
pub struct TurbineDataManager {
    dataset: Dataset,
}

impl TurbineDataManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataManager for TurbineDataManager {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn load(&mut self, path: &Path, chunk_size: Option<usize>) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let chunk = chunk_size.filter(|&n| n > 0);
        let mut turbines = Vec::new();
        for (index, row) in reader.deserialize::<Turbine>().enumerate() {
            turbines.push(row?);
            if let Some(n) = chunk {
                if (index + 1) % n == 0 {
                    tracing::debug!(rows = index + 1, "Loaded turbine data chunk");
                }
            }
        }

        if turbines.is_empty() {
            return Err(Error::InvalidData(format!(
                "no turbine rows in {}",
                path.display()
            )));
        }

        tracing::info!(rows = turbines.len(), "Turbine data loaded");
        self.dataset = Dataset {
            turbines,
            source: DataSource::File(path.to_path_buf()),
        };
        Ok(())
    }

    fn create_default_data(&mut self) {
        self.dataset = Dataset::minimal_default();
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for turbine in &self.dataset.turbines {
            writer.serialize(turbine)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn memory_usage(&self) -> Result<MemoryReport> {
        let system = System::new_all();
        let pid = sysinfo::get_current_pid().map_err(|e| Error::NotFound(e.to_string()))?;
        let process_bytes = system.process(pid).map(|p| p.memory()).unwrap_or(0);

        Ok(MemoryReport {
            process_bytes,
            dataset_bytes: self.dataset.estimated_bytes(),
            system_used_bytes: system.used_memory(),
            system_total_bytes: system.total_memory(),
        })
    }
}
