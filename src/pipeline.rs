//! One disc from tray to library: identify, name, rip, record.

use std::path::PathBuf;

use crate::cddb::{self, CddbClient, DiscDatabase};
use crate::config::AppConfig;
use crate::disc::{CdDiscid, DriveControl, EjectDrive, FingerprintSource};
use crate::encoding::EncodingNormalizer;
use crate::error::PipelineError;
use crate::layout::{LayoutPlanner, OverwritePolicy};
use crate::models::{DiscLayout, Fingerprint, ResolvedRecord};
use crate::prompt::{Operator, TerminalOperator};
use crate::provenance;
use crate::rip::{self, Cdparanoia, FlacEncoder, Reencoder, RipEngine};
use crate::select::CandidateSelector;
use crate::titles::{ExternalEditor, TextEditor, TitleEditor};

/// External collaborators of a run.
pub struct Collaborators {
    pub drive: Box<dyn DriveControl>,
    pub fingerprints: Box<dyn FingerprintSource>,
    pub database: Box<dyn DiscDatabase>,
    pub operator: Box<dyn Operator>,
    pub editor: Box<dyn TextEditor>,
    pub engine: Box<dyn RipEngine>,
    pub encoder: Option<Box<dyn Reencoder>>,
}

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub library_root: PathBuf,
    pub overwrite: OverwritePolicy,
    /// Close the tray before and open it after the run.
    pub eject: bool,
}

impl RunOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            library_root: config.library_root(),
            overwrite: config.overwrite_policy(),
            eject: true,
        }
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub record: ResolvedRecord,
    pub layout: DiscLayout,
    pub files: Vec<PathBuf>,
    pub sidecar: PathBuf,
}

pub struct Pipeline {
    parts: Collaborators,
    normalizer: EncodingNormalizer,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(parts: Collaborators, normalizer: EncodingNormalizer, options: RunOptions) -> Self {
        Self {
            parts,
            normalizer,
            options,
        }
    }

    /// Production collaborators built from the configuration.
    pub fn from_config(config: &AppConfig, options: RunOptions) -> Result<Self, PipelineError> {
        let normalizer = EncodingNormalizer::from_config(&config.encoding)?;
        let database = CddbClient::new(&config.database, normalizer.carrier())?;
        let encoder: Option<Box<dyn Reencoder>> = if config.encode.enabled {
            Some(Box::new(FlacEncoder::new(
                &config.encode.command,
                config.encode.verify,
                config.encode.delete_source,
            )))
        } else {
            None
        };

        let parts = Collaborators {
            drive: Box::new(EjectDrive::new(&config.drive.eject_command, &config.drive.device)),
            fingerprints: Box::new(CdDiscid::new(&config.drive.discid_command, &config.drive.device)),
            database: Box::new(database),
            operator: Box::new(TerminalOperator::stdio()),
            editor: Box::new(ExternalEditor::new(config.editor_command())),
            engine: Box::new(Cdparanoia::new(&config.rip.command, config.rip.read_speed)),
            encoder,
        };
        Ok(Self::new(parts, normalizer, options))
    }

    pub fn fingerprint(&mut self) -> Result<Fingerprint, PipelineError> {
        Ok(self.parts.fingerprints.read()?)
    }

    /// Fingerprint the disc and fetch every database candidate.
    pub fn identify(&mut self) -> Result<ResolvedRecord, PipelineError> {
        let fingerprint = self.fingerprint()?;
        Ok(cddb::resolve(self.parts.database.as_mut(), &fingerprint)?)
    }

    /// Run the whole pipeline for the inserted disc.
    pub fn run(&mut self) -> Result<RunOutcome, PipelineError> {
        if self.options.eject {
            self.parts.drive.close()?;
        }

        let mut record = self.identify()?;

        let operator = self.parts.operator.as_mut();
        for candidate in record.candidates.iter_mut() {
            *candidate = self.normalizer.confirm(candidate, operator)?;
        }
        CandidateSelector::apply(&mut record, operator)?;

        let raw_extension = self.parts.engine.raw_extension().to_string();
        let titles = TitleEditor::new(self.parts.editor.as_mut(), raw_extension).edit(&record)?;

        let planner = LayoutPlanner::new(&self.options.library_root, self.options.overwrite);
        let layout = planner.plan(&titles, &record.fingerprint, self.parts.engine.as_ref())?;

        // Everything above only reads the library; from here on it changes
        layout.prepare()?;
        self.parts.engine.rip(&layout.directory_path)?;
        let tracks = rip::commit_names(&layout, self.parts.engine.as_ref())?;

        let files = match self.parts.encoder.as_mut() {
            Some(encoder) => rip::encode_all(encoder.as_mut(), &tracks)?,
            None => tracks,
        };

        let sidecar = provenance::write(&record, &layout.directory_path)?;

        if self.options.eject {
            self.parts.drive.open()?;
        }
        if titles.unnamed {
            log::warn!(
                "No CDDB record was used for {}; rename the disc directory {} and its tracks manually",
                record.fingerprint.hex(),
                layout.directory_path.display()
            );
        }

        Ok(RunOutcome {
            record,
            layout,
            files,
            sidecar,
        })
    }
}
