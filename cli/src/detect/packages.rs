//! Installed-package inventory, fetched once per run.
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::settings::PackageManagerSpec;
use crate::exec::Executor;
use crate::logging::Log;

/// Union of package names reported by every available package manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInventory {
    installed: BTreeSet<String>,
    queried: Vec<String>,
    failed: Vec<String>,
}

/// Outcome of querying one manager.
enum Listing {
    NotInstalled,
    Names(Vec<String>),
    Failed(String),
}

impl PackageInventory {
    /// Query each manager present on the search path, concurrently, each
    /// bounded by `timeout`.
    ///
    /// A manager that times out or exits non-zero is recorded as failed;
    /// it makes the package signal inconclusive rather than negative.
    #[must_use]
    pub fn query(
        managers: &[PackageManagerSpec],
        executor: &dyn Executor,
        timeout: Duration,
        log: &dyn Log,
    ) -> Self {
        let listings: Vec<(String, Listing)> = std::thread::scope(|scope| {
            let handles: Vec<_> = managers
                .iter()
                .map(|pm| {
                    let handle = scope.spawn(move || list_manager(pm, executor, timeout));
                    (pm.name.clone(), handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, h)| {
                    let listing = h
                        .join()
                        .unwrap_or_else(|_| Listing::Failed("query thread panicked".to_string()));
                    (name, listing)
                })
                .collect()
        });

        let mut inventory = Self::default();
        for (name, listing) in listings {
            match listing {
                Listing::NotInstalled => log.debug(&format!("package manager {name} not found")),
                Listing::Names(names) => {
                    log.debug(&format!("package manager {name}: {} packages", names.len()));
                    inventory.installed.extend(names);
                    inventory.queried.push(name);
                }
                Listing::Failed(reason) => {
                    log.warn(&format!(
                        "package manager {name} is inconclusive: {reason}"
                    ));
                    inventory.queried.push(name.clone());
                    inventory.failed.push(name);
                }
            }
        }
        inventory
    }

    /// An inventory with a fixed set of installed names.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            installed: names.into_iter().map(|n| n.as_ref().to_lowercase()).collect(),
            queried: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Mark a manager as failed.
    #[must_use]
    pub fn with_failed(mut self, manager: &str) -> Self {
        self.failed.push(manager.to_string());
        self
    }

    /// Whether `name` is installed (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.installed.contains(&name.to_lowercase())
    }

    /// Managers that timed out or failed.
    #[must_use]
    pub fn failed_managers(&self) -> &[String] {
        &self.failed
    }

    /// Managers that were found and queried.
    #[must_use]
    pub fn queried_managers(&self) -> &[String] {
        &self.queried
    }

    /// Number of distinct installed names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.installed.len()
    }

    /// Whether no names were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

fn list_manager(pm: &PackageManagerSpec, executor: &dyn Executor, timeout: Duration) -> Listing {
    if executor.which(&pm.program).is_none() {
        return Listing::NotInstalled;
    }
    let args: Vec<&str> = pm.args.iter().map(String::as_str).collect();
    match executor.run(&pm.program, &args, timeout) {
        Ok(result) if result.success => Listing::Names(parse_listing(&result.stdout)),
        Ok(result) => Listing::Failed(format!(
            "exit {}: {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        )),
        Err(e) => Listing::Failed(e.to_string()),
    }
}

/// One package per line, name first. Versioned names (`python@3.12`) also
/// contribute their base name.
fn parse_listing(stdout: &str) -> Vec<String> {
    let mut names = Vec::new();
    for token in stdout.lines().filter_map(|l| l.split_whitespace().next()) {
        let name = token.to_lowercase();
        if let Some((base, _)) = name.split_once('@')
            && !base.is_empty()
        {
            names.push(base.to_string());
        }
        names.push(name);
    }
    names
}
