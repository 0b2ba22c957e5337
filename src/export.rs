// ABOUTME: Orchestrates the notebook → section → page walk and output commits
// ABOUTME: Records per-item failures; only fatal auth errors abort the run

use crate::api::GraphClient;
use crate::media::{self, ResolvedMedia};
use crate::model::{Notebook, Page, Section};
use crate::paginate::Paged;
use crate::report::{ExportReport, Scope};
use crate::transform::transform;
use crate::writer::{sanitize_name, ExportWriter, NameAllocator};
use crate::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// What to do with items already yielded when a listing dies mid-cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialListings {
    /// Keep and export the items the cursor walk produced before failing.
    #[default]
    Keep,
    /// Skip the whole branch; a listing is either complete or not used.
    Discard,
}

#[derive(Debug, Default)]
pub struct ExportOptions {
    pub notebook_filter: Option<String>,
    pub section_filter: Option<String>,
    pub partial_listings: PartialListings,
    pub quiet: bool,
}

/// Shared interrupt flag, set from the Ctrl+C handler and checked between
/// work units. Already-written pages stay on disk.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn matches_filter(name: &str, filter: &Option<String>) -> bool {
    match filter {
        Some(wanted) => name.eq_ignore_ascii_case(wanted),
        None => true,
    }
}

pub struct Exporter<'a> {
    client: &'a GraphClient,
    writer: ExportWriter,
    options: ExportOptions,
    cancel: CancelFlag,
    progress: ProgressBar,
}

impl<'a> Exporter<'a> {
    pub fn new(
        client: &'a GraphClient,
        writer: ExportWriter,
        options: ExportOptions,
        cancel: CancelFlag,
    ) -> Self {
        let progress = if options.quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg}")
                    .unwrap(),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        };

        Exporter {
            client,
            writer,
            options,
            cancel,
            progress,
        }
    }

    /// Walk the whole hierarchy. Returns the report on completion (possibly
    /// degraded); errors out only on fatal credential/permission failures
    /// or interruption.
    pub fn run(&mut self) -> Result<ExportReport> {
        let result = self.walk();
        // Single clear point so no exit path leaves spinner residue
        self.progress.finish_and_clear();
        let report = result?;
        self.print_summary(&report);
        Ok(report)
    }

    fn walk(&mut self) -> Result<ExportReport> {
        let mut report = ExportReport::new();

        let notebooks: Vec<Notebook> = self.take_listing(
            self.client.notebooks(),
            Scope::Notebook,
            "notebooks",
            &mut report,
        )?;

        let mut notebook_names = NameAllocator::new();
        for notebook in notebooks {
            self.check_cancelled()?;
            if !matches_filter(notebook.name(), &self.options.notebook_filter) {
                continue;
            }

            let dir_name = notebook_names.allocate(&sanitize_name(notebook.name()));
            if let Err(e) = self.export_notebook(&notebook, &dir_name, &mut report) {
                if e.is_fatal() || matches!(e, Error::Interrupted) {
                    return Err(e);
                }
                warn!(notebook = notebook.name(), error = %e, "notebook export degraded");
                report.record(Scope::Notebook, notebook.name(), &e);
            }
        }

        Ok(report)
    }

    fn export_notebook(
        &mut self,
        notebook: &Notebook,
        dir_name: &str,
        report: &mut ExportReport,
    ) -> Result<()> {
        let sections: Vec<Section> = self.take_listing(
            self.client.sections(&notebook.id),
            Scope::Notebook,
            notebook.name(),
            report,
        )?;

        let mut section_names = NameAllocator::new();
        for section in sections {
            self.check_cancelled()?;
            if !matches_filter(section.name(), &self.options.section_filter) {
                continue;
            }

            let breadcrumb = format!("{}/{}", notebook.name(), section.name());
            let section_dir = self
                .writer
                .root()
                .join(dir_name)
                .join(section_names.allocate(&sanitize_name(section.name())));

            if let Err(e) = self.export_section(&section, &section_dir, &breadcrumb, report) {
                if e.is_fatal() || matches!(e, Error::Interrupted) {
                    return Err(e);
                }
                warn!(section = %breadcrumb, error = %e, "section export degraded");
                report.record(Scope::Section, breadcrumb, &e);
                continue;
            }
            report.sections += 1;
        }

        report.notebooks += 1;
        Ok(())
    }

    fn export_section(
        &mut self,
        section: &Section,
        section_dir: &std::path::Path,
        breadcrumb: &str,
        report: &mut ExportReport,
    ) -> Result<()> {
        let pages: Vec<Page> =
            self.take_listing(self.client.pages(&section.id), Scope::Section, breadcrumb, report)?;

        let mut page_names = NameAllocator::new();
        for page in pages {
            self.check_cancelled()?;
            let identity = format!("{}/{}", breadcrumb, page.name());
            self.progress.set_message(identity.clone());

            if let Err(e) = self.export_page(&page, section_dir, &mut page_names, &identity, report)
            {
                if e.is_fatal() || matches!(e, Error::Interrupted) {
                    return Err(e);
                }
                warn!(page = %identity, error = %e, "page export degraded");
                report.record(Scope::Page, identity, &e);
                continue;
            }
            report.pages += 1;
        }

        Ok(())
    }

    fn export_page(
        &mut self,
        page: &Page,
        section_dir: &std::path::Path,
        page_names: &mut NameAllocator,
        identity: &str,
        report: &mut ExportReport,
    ) -> Result<()> {
        let html = self.client.page_content(page)?;
        let transformed = transform(&html);

        let mut resolved = Vec::with_capacity(transformed.media.len());
        for (n, reference) in transformed.media.into_iter().enumerate() {
            match media::fetch(self.client, &reference) {
                Ok(data) => {
                    report.images += 1;
                    resolved.push(ResolvedMedia::fetched(reference, data));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.record(Scope::Image, format!("{} image {}", identity, n + 1), &e);
                    resolved.push(ResolvedMedia::placeholder(reference));
                }
            }
        }

        let stem = page_names.allocate(&sanitize_name(page.name()));
        self.writer
            .commit_page(section_dir, &stem, page, &transformed.markdown, &resolved)?;
        Ok(())
    }

    /// Drain one listing according to the partial-listings policy. Fatal
    /// errors propagate; a non-fatal pagination failure is recorded here.
    fn take_listing<T: DeserializeOwned>(
        &self,
        paged: Paged<'a, T>,
        scope: Scope,
        identity: &str,
        report: &mut ExportReport,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for item in paged {
            match item {
                Ok(value) => items.push(value),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(listing = identity, error = %e, "listing failed mid-cursor");
                    report.record(scope, identity, &e);
                    if self.options.partial_listings == PartialListings::Discard {
                        items.clear();
                    }
                    break;
                }
            }
        }
        Ok(items)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    fn print_summary(&self, report: &ExportReport) {
        if !self.options.quiet {
            println!(
                "exported {} pages across {} sections in {} notebooks ({} images)",
                report.pages, report.sections, report.notebooks, report.images
            );
        }
        for failure in report.failures() {
            eprintln!(
                "degraded: {:?} {}: {}",
                failure.scope, failure.identity, failure.reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_shared_across_clones() {
        let flag = CancelFlag::default();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_filter_matching_is_case_insensitive() {
        assert!(matches_filter("Work Notes", &None));
        assert!(matches_filter("Work Notes", &Some("work notes".into())));
        assert!(!matches_filter("Work Notes", &Some("Personal".into())));
    }

    #[test]
    fn test_partial_listings_default_keeps() {
        assert_eq!(PartialListings::default(), PartialListings::Keep);
    }
}
