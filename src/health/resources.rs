//! Host resource checks for the discovery agent.
//!
//! `/sd/disk`, `/sd/cpu` and `/sd/ram` answer with a one-line plain text
//! report. The status code carries the verdict: 200 OK, 429 WARNING,
//! 500 CRITICAL.
//!
//! # Thresholds
//! - Disk and RAM: warning at 90% used, critical at 95%
//! - CPU: warning once the 5-minute load average reaches `cores - 2`,
//!   critical at `cores - 1`
//!
//! # Design Decisions
//! - Sampling runs on the blocking pool; sysinfo reads procfs synchronously
//! - Verdicts are computed from plain samples so they test without a host

use axum::{http::StatusCode, response::IntoResponse};
use std::path::Path;
use sysinfo::{Disks, System};

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * MB;

const WARNING_PERCENT: u64 = 90;
const CRITICAL_PERCENT: u64 = 95;

/// Outcome of one resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Warning,
    Critical,
}

impl Verdict {
    pub fn status(self) -> StatusCode {
        match self {
            Verdict::Ok => StatusCode::OK,
            Verdict::Warning => StatusCode::TOO_MANY_REQUESTS,
            Verdict::Critical => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Warning => "WARNING",
            Verdict::Critical => "CRITICAL",
        }
    }

    fn from_used_percent(used: u64) -> Self {
        if used >= CRITICAL_PERCENT {
            Verdict::Critical
        } else if used >= WARNING_PERCENT {
            Verdict::Warning
        } else {
            Verdict::Ok
        }
    }
}

/// Capacity of a disk or of memory, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceUsage {
    pub total: u64,
    pub free: u64,
}

impl SpaceUsage {
    pub fn used_percent(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        let used = u128::from(self.total.saturating_sub(self.free));
        (used * 100 / u128::from(self.total)) as u64
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_used_percent(self.used_percent())
    }

    pub fn report(&self) -> (StatusCode, String) {
        let verdict = self.verdict();
        let message = format!(
            "{} - Free space: {}MB ({}GB) / {}MB ({}GB) | Used: {}%",
            verdict.label(),
            self.free / MB,
            self.free / GB,
            self.total / MB,
            self.total / GB,
            self.used_percent()
        );
        (verdict.status(), message)
    }
}

/// Load averages together with the number of cores they spread over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
    pub cores: usize,
}

impl LoadSample {
    pub fn verdict(&self) -> Verdict {
        let cores = self.cores as f64;
        if self.five >= cores - 1.0 {
            Verdict::Critical
        } else if self.five >= cores - 2.0 {
            Verdict::Warning
        } else {
            Verdict::Ok
        }
    }

    pub fn report(&self) -> (StatusCode, String) {
        let verdict = self.verdict();
        let message = format!(
            "{} - Load average: {:.2}, {:.2}, {:.2} | Cores: {}",
            verdict.label(),
            self.one,
            self.five,
            self.fifteen,
            self.cores
        );
        (verdict.status(), message)
    }
}

/// Space on the disk mounted at `mount`, or on the first disk if none is.
pub fn sample_disk(mount: &Path) -> Option<SpaceUsage> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == mount)
        .or_else(|| disks.list().first())?;
    Some(SpaceUsage {
        total: disk.total_space(),
        free: disk.available_space(),
    })
}

pub fn sample_memory() -> SpaceUsage {
    let mut sys = System::new();
    sys.refresh_memory();
    SpaceUsage {
        total: sys.total_memory(),
        free: sys.available_memory(),
    }
}

pub fn sample_load() -> LoadSample {
    let load = System::load_average();
    let mut sys = System::new();
    sys.refresh_cpu_all();
    LoadSample {
        one: load.one,
        five: load.five,
        fifteen: load.fifteen,
        cores: sys.cpus().len(),
    }
}

async fn sampled<T, F>(resource: &'static str, sample: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(sample).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(resource, error = %e, "Resource sampling failed");
            None
        }
    }
}

fn unavailable(resource: &str) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("CRITICAL - {resource} usage unavailable"),
    )
}

/// `GET /sd/disk`: usage of the root filesystem.
pub async fn disk_check() -> impl IntoResponse {
    match sampled("disk", || sample_disk(Path::new("/"))).await.flatten() {
        Some(usage) => usage.report(),
        None => unavailable("Disk"),
    }
}

/// `GET /sd/cpu`: 5-minute load against the core count.
pub async fn cpu_check() -> impl IntoResponse {
    match sampled("cpu", sample_load).await {
        Some(load) => load.report(),
        None => unavailable("CPU"),
    }
}

/// `GET /sd/ram`: memory in use.
pub async fn ram_check() -> impl IntoResponse {
    match sampled("ram", sample_memory).await {
        Some(usage) => usage.report(),
        None => unavailable("RAM"),
    }
}
