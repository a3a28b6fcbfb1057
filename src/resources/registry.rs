//! Windows registry value resource.
//!
//! State probes are batched: one `PowerShell` process checks every value in
//! the run, instead of one process per entry.

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{Context as _, Result};

use super::{Applicable, ResourceChange, ResourceState};
use crate::config::registry::RegistryKind;
use crate::exec::Executor;

/// A registry value that should hold specific data.
#[derive(Debug)]
pub struct RegistryValueResource<'a> {
    pub key: String,
    pub name: String,
    pub data: String,
    pub kind: RegistryKind,
    executor: &'a dyn Executor,
}

impl<'a> RegistryValueResource<'a> {
    #[must_use]
    pub const fn new(
        key: String,
        name: String,
        data: String,
        kind: RegistryKind,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            key,
            name,
            data,
            kind,
            executor,
        }
    }

    /// Lookup key in the map produced by [`batch_check_values`].
    #[must_use]
    pub fn map_key(&self) -> String {
        format!("{}\\{}", self.key, self.name)
    }

    /// State from a pre-fetched observed value; `None` means not present.
    #[must_use]
    pub fn state_from_observed(&self, observed: Option<&str>) -> ResourceState {
        observed.map_or(ResourceState::Missing, |value| {
            if value == self.data {
                ResourceState::Correct
            } else {
                ResourceState::Incorrect {
                    observed: value.to_string(),
                }
            }
        })
    }
}

impl Applicable for RegistryValueResource<'_> {
    fn description(&self) -> String {
        format!("{}\\{} = {}", self.key, self.name, self.data)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let kind = match self.kind {
            RegistryKind::String => "String",
            RegistryKind::Dword => "DWord",
        };
        let key = self.key.replace('\'', "''");
        let name = self.name.replace('\'', "''");
        let data = self.data.replace('\'', "''");
        let script = format!(
            "if (-not (Test-Path '{key}')) {{ New-Item -Path '{key}' -Force | Out-Null }}\n\
             Set-ItemProperty -Path '{key}' -Name '{name}' -Value '{data}' -Type {kind}"
        );
        self.executor
            .run("powershell", &["-NoProfile", "-Command", &script])
            .with_context(|| format!("set registry: {}", self.map_key()))?;
        Ok(ResourceChange::Applied)
    }
}

/// Probe every value with a single `PowerShell` script.
///
/// Returns `map_key() -> observed value`, with `None` for absent values.
///
/// # Errors
///
/// Returns an error if `PowerShell` cannot be spawned or the probe script
/// itself fails; the caller decides what one broken probe means for the
/// whole batch.
pub fn batch_check_values(
    resources: &[RegistryValueResource<'_>],
    executor: &dyn Executor,
) -> Result<HashMap<String, Option<String>>> {
    if resources.is_empty() {
        return Ok(HashMap::new());
    }

    let sentinel = "::ABSENT::";
    let separator = "::SEP::";

    let mut script = String::from("$ErrorActionPreference='SilentlyContinue'\n");
    for (i, res) in resources.iter().enumerate() {
        let key = res.key.replace('\'', "''");
        let name = res.name.replace('\'', "''");
        if i > 0 {
            let _ = writeln!(script, "Write-Output '{separator}'");
        }
        let _ = write!(
            script,
            "$v = (Get-ItemProperty -Path '{key}' -Name '{name}' -ErrorAction SilentlyContinue).'{name}'\n\
             if ($null -eq $v) {{ Write-Output '{sentinel}' }} else {{ Write-Output $v }}\n"
        );
    }

    let result = executor.run_unchecked("powershell", &["-NoProfile", "-Command", &script])?;
    if !result.success {
        anyhow::bail!("registry probe failed: {}", result.stderr.trim());
    }

    let mut map = HashMap::with_capacity(resources.len());
    let chunks: Vec<&str> = result.stdout.split(separator).collect();
    for (i, res) in resources.iter().enumerate() {
        let value = chunks.get(i).and_then(|chunk| {
            let trimmed = chunk.trim();
            if trimmed == sentinel {
                None
            } else {
                Some(trimmed.to_string())
            }
        });
        map.insert(res.map_key(), value);
    }
    Ok(map)
}
