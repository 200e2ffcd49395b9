//! Output dispatch: saving label documents and sending labels to a printer.
//!
//! Downloads go through a [`DownloadSink`] under a deterministic filename.
//! Printing renders the label surface itself as a vector document (not the
//! rasterized, paginated one) and hands it to a [`PrintSink`].

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::builder::render_surface_pdf;
use crate::config::LabelConfig;
use crate::error::{LabelError, Result};
use crate::surface::Surface;

/// File extension of every generated document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// `shipping-label-<ORDERNUMBER>.pdf`
pub fn single_label_filename(order_number: &str) -> String {
    format!("shipping-label-{}.{}", sanitize(order_number), DOCUMENT_EXTENSION)
}

/// `shipping-labels-batch-<YYYY-MM-DD>.pdf`, dated in UTC.
pub fn batch_filename(now: DateTime<Utc>) -> String {
    format!(
        "shipping-labels-batch-{}.{}",
        now.format("%Y-%m-%d"),
        DOCUMENT_EXTENSION
    )
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Destination for finished documents.
pub trait DownloadSink {
    /// Stores `bytes` under `filename`. Any intermediate resource must be
    /// released before returning, whether or not the save succeeded.
    fn save(&mut self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Saves documents into a directory.
///
/// Each document is written to `<name>.part` and renamed into place, so a
/// reader never observes a partially written file.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Final location of `filename` inside the sink directory.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.directory.join(filename)
    }
}

impl DownloadSink for DirectorySink {
    fn save(&mut self, filename: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.directory).map_err(|err| {
            LabelError::OutputSink(format!(
                "cannot create output directory {}: {err}",
                self.directory.display()
            ))
        })?;

        let target = self.path_for(filename);
        let partial = PartialFile::new(self.directory.join(format!("{filename}.part")));
        partial.write_and_commit(bytes, &target)?;
        info!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

/// Temporary file that is removed unless it was renamed into place.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn write_and_commit(mut self, bytes: &[u8], target: &Path) -> Result<()> {
        let sink_error = |err: std::io::Error| {
            LabelError::OutputSink(format!("cannot write {}: {err}", target.display()))
        };

        let mut file = File::create(&self.path).map_err(sink_error)?;
        file.write_all(bytes).map_err(sink_error)?;
        file.sync_all().map_err(sink_error)?;
        drop(file);

        fs::rename(&self.path, target).map_err(sink_error)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            if let Err(err) = fs::remove_file(&self.path) {
                warn!("Could not remove partial file {}: {}", self.path.display(), err);
            }
        }
    }
}

/// An opened print destination.
pub trait PrintSurface {
    /// Loads the rendered document into the surface.
    fn write_document(&mut self, pdf: &[u8]) -> Result<()>;

    /// Asks the destination to print what was loaded.
    fn request_print(&mut self) -> Result<()>;
}

/// Opens print surfaces.
pub trait PrintSink {
    /// Opens a new surface for a job named `title`. Failure to open is
    /// reported as [`LabelError::PopupBlocked`].
    fn open(&mut self, title: &str) -> Result<Box<dyn PrintSurface>>;
}

/// Prints through the CUPS `lp` command.
#[derive(Clone, Debug, Default)]
pub struct LpPrinter {
    printer: Option<String>,
    program: Option<PathBuf>,
}

impl LpPrinter {
    /// Prints to the default destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints to the named destination instead of the default one.
    pub fn with_printer(mut self, printer: impl Into<String>) -> Self {
        self.printer = Some(printer.into());
        self
    }

    /// Uses a different spooler executable than `lp`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    fn command(&self, title: &str) -> Command {
        let program = self
            .program
            .clone()
            .unwrap_or_else(|| PathBuf::from("lp"));
        let mut command = Command::new(program);
        if let Some(printer) = &self.printer {
            command.arg("-d").arg(printer);
        }
        command.arg("-t").arg(title).arg("-");
        command
    }
}

impl PrintSink for LpPrinter {
    fn open(&mut self, title: &str) -> Result<Box<dyn PrintSurface>> {
        let child = self
            .command(title)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                LabelError::PopupBlocked(format!("failed to start print spooler: {err}"))
            })?;
        debug!("Opened print job '{}' (pid {})", title, child.id());
        Ok(Box::new(LpJob {
            child: Some(child),
            title: title.to_owned(),
        }))
    }
}

struct LpJob {
    child: Option<Child>,
    title: String,
}

impl PrintSurface for LpJob {
    fn write_document(&mut self, pdf: &[u8]) -> Result<()> {
        let stdin = self
            .child
            .as_mut()
            .and_then(|child| child.stdin.as_mut())
            .ok_or_else(|| LabelError::OutputSink("print job is no longer open".to_owned()))?;
        stdin
            .write_all(pdf)
            .map_err(|err| {
                LabelError::OutputSink(format!("print spooler rejected document: {err}"))
            })
    }

    fn request_print(&mut self) -> Result<()> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| LabelError::OutputSink("print job already submitted".to_owned()))?;
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .map_err(|err| LabelError::OutputSink(format!("print spooler did not finish: {err}")))?;
        if output.status.success() {
            info!("Submitted print job '{}'", self.title);
            Ok(())
        } else {
            Err(LabelError::OutputSink(format!(
                "print spooler exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl Drop for LpJob {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!("Abandoning print job '{}'", self.title);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Renders `surface` as a vector document and prints it through `sink`.
///
/// The configured settle delay elapses between loading the document and
/// requesting the print.
pub fn print_surface(
    surface: &Surface,
    config: &LabelConfig,
    sink: &mut dyn PrintSink,
) -> Result<()> {
    let pdf = render_surface_pdf(surface)?;
    let mut job = sink.open(surface.title())?;
    job.write_document(&pdf)?;
    let delay = config.print_settle_delay();
    if !delay.is_zero() {
        thread::sleep(delay);
    }
    job.request_print()
}
