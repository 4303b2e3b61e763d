//! Sequential batch driver over a slice of the package-name universe.
//!
//! Each package runs resolve → download gate → clone → install → check →
//! upsert to completion before the next one starts. Per-package failures are
//! logged and counted as zero findings; only a failing store write stops the
//! batch.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tracing::{debug, info};

use crate::analyzer::checkout::Checkout;
use crate::analyzer::depcheck::Depcheck;
use crate::config::Config;
use crate::error::{ScanError, StoreError};
use crate::registry::{self, downloads, npm, repository::UrlRules};
use crate::retry::RetryPolicy;
use crate::store::FindingsStore;

/// Totals reported at the end of a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    /// Packages with at least one phantom dependency.
    pub with_phantoms: usize,
    pub failed: usize,
}

pub struct Scanner<'a> {
    client: Client,
    config: &'a Config,
    store: &'a FindingsStore,
    rules: UrlRules,
    retry: RetryPolicy,
    verbose: bool,
    quiet: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a Config, store: &'a FindingsStore, verbose: bool, quiet: bool) -> Result<Self> {
        Ok(Self {
            client: registry::client(&config.registry.user_agent)?,
            config,
            store,
            rules: UrlRules::new()?,
            retry: config.registry.retry_policy(),
            verbose,
            quiet,
        })
    }

    /// Write `<name>: <count>` to `out` for every package with downloads in
    /// the window.
    pub async fn report_downloads<W: Write>(
        &self,
        names: &[String],
        out: &mut W,
    ) -> Result<BatchSummary> {
        let pb = self.progress_bar(names.len());
        let mut summary = BatchSummary::default();

        for name in names {
            match self.count_downloads(name).await {
                Ok(0) => {}
                Ok(count) => pb.suspend(|| writeln!(out, "{name}: {count}"))?,
                Err(err) => {
                    debug!(package = %name, "Download count failed: {err}");
                    summary.failed += 1;
                }
            }
            summary.processed += 1;
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(summary)
    }

    /// Collect phantom dependencies for every package in `names`, writing a
    /// progress line to `out` every `progress_every` packages.
    ///
    /// A failing store write aborts the batch with that [`StoreError`].
    pub async fn collect<W: Write>(&self, names: &[String], out: &mut W) -> Result<BatchSummary> {
        let pb = self.progress_bar(names.len());
        let every = self.config.batch.progress_every;
        let mut summary = BatchSummary::default();

        for name in names {
            pb.set_message(name.clone());
            let outcome = self.process(name).await;
            if let Err(err) = tally(&mut summary, name, outcome) {
                pb.abandon();
                return Err(err.into());
            }
            pb.inc(1);

            if !self.quiet && progress_due(summary.processed, names.len(), every) {
                pb.suspend(|| {
                    writeln!(
                        out,
                        "{} {:.1}%. Number phantom found: {}",
                        "Processed:".cyan(),
                        percent(summary.processed, names.len()),
                        summary.with_phantoms
                    )
                })?;
            }
        }

        pb.finish_with_message("Done");
        Ok(summary)
    }

    /// Returns the number of phantom dependencies found for `name`.
    async fn process(&self, name: &str) -> Result<usize, ScanError> {
        debug!("--> Working on {name}");

        let packument = npm::fetch_packument(
            &self.client,
            &self.config.registry.metadata_url,
            name,
            &self.retry,
        )
        .await?;

        if npm::latest_version(&packument).is_none() {
            return Err(ScanError::Unresolvable {
                package: name.to_string(),
                reason: "no dist-tags.latest".to_string(),
            });
        }

        let threshold = self.config.downloads.threshold;
        let gate_count = if threshold > 0 {
            let count = self.count_downloads(name).await?;
            if below_threshold(count, threshold) {
                debug!(package = %name, download_count = count, threshold, "Below download threshold");
                return Ok(0);
            }
            Some(count)
        } else {
            None
        };

        let resolved = npm::resolve(&packument, name, &self.rules)?;
        debug!(package = %name, version = %resolved.version, repository = %resolved.repository);

        let checkout = Checkout::for_package(&self.config.batch.repos_dir, name);
        let outcome = self.check(&checkout, &resolved.repository).await;
        if !self.config.batch.keep_checkouts {
            checkout.remove().await;
        }
        let missing = outcome?;

        if !missing.is_empty() {
            debug!(
                "Package: {name}. Number phantom: {}. Phantom dependencies: {}",
                missing.len(),
                missing.iter().cloned().collect::<Vec<_>>().join(", ")
            );
            let download_count = match gate_count {
                Some(count) => Some(count),
                None => self
                    .count_downloads(name)
                    .await
                    .inspect_err(|err| debug!(package = %name, "Download count unavailable: {err}"))
                    .ok(),
            };
            self.store.upsert(name, &missing, download_count)?;
        }
        Ok(missing.len())
    }

    async fn check(
        &self,
        checkout: &Checkout,
        repository: &str,
    ) -> Result<std::collections::BTreeSet<String>, ScanError> {
        checkout.prepare(repository, self.verbose).await?;
        Depcheck::new(&self.config.checker).missing(&checkout.dir).await
    }

    async fn count_downloads(&self, name: &str) -> Result<u64, ScanError> {
        downloads::count_downloads(
            &self.client,
            &self.config.registry.downloads_url,
            &self.config.downloads.period(),
            name,
            &self.retry,
        )
        .await
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Fold one package outcome into `summary`. Only a store failure is returned.
fn tally(
    summary: &mut BatchSummary,
    name: &str,
    outcome: Result<usize, ScanError>,
) -> Result<(), StoreError> {
    match outcome {
        Ok(0) => {}
        Ok(found) => {
            summary.with_phantoms += 1;
            info!(package = %name, found, "Recorded phantom dependencies");
        }
        Err(ScanError::Store(err)) => return Err(err),
        Err(err) => {
            debug!(package = %name, "Skipped: {err}");
            summary.failed += 1;
        }
    }
    summary.processed += 1;
    Ok(())
}

/// Packages at or below `threshold` downloads are skipped; `0` disables the gate.
fn below_threshold(count: u64, threshold: u64) -> bool {
    threshold > 0 && count <= threshold
}

/// Report after every `every` packages and once at the end.
fn progress_due(done: usize, total: usize, every: usize) -> bool {
    done == total || (every > 0 && done % every == 0)
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * done as f64 / total as f64
    }
}
