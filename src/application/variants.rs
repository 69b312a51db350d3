//! Tool variants.
//!
//! Every variant shares the same pipeline (pair discovery, manifest
//! load, payload decode, per-record validation, report aggregation) and
//! differs only in its nesting policy, page-shape rules, and field
//! comparison table. The default `check_pair` drives the shared flow;
//! a variant overrides it only when its output differs structurally
//! (the `mi` comparison-table workflow).

pub mod civitek;
pub mod civitek_new;
pub mod flager;
pub mod md;
pub mod md_new;
pub mod mi;

use crate::application::pipeline::{CheckSettings, FilePair};
use crate::application::report::ReportBuilder;
use crate::domain::{Discrepancy, Lead};
use crate::infrastructure::content::ContentFile;
use crate::infrastructure::manifest::Manifest;
use crate::infrastructure::payload::Nesting;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error};

/// The supported tool variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Civitek,
    CivitekNew,
    Flager,
    Mi,
    Md,
    MdNew,
}

impl Variant {
    pub const ALL: [Variant; 6] = [
        Variant::Civitek,
        Variant::CivitekNew,
        Variant::Flager,
        Variant::Mi,
        Variant::Md,
        Variant::MdNew,
    ];

    /// Parse a command keyword (`civitek`, `civitek-new`, `civitek new`, ...).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_lowercase().replace(' ', "-").as_str() {
            "civitek" => Some(Self::Civitek),
            "civitek-new" => Some(Self::CivitekNew),
            "flager" => Some(Self::Flager),
            "mi" => Some(Self::Mi),
            "md" => Some(Self::Md),
            "md-new" => Some(Self::MdNew),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Civitek => "civitek",
            Self::CivitekNew => "civitek-new",
            Self::Flager => "flager",
            Self::Mi => "mi",
            Self::Md => "md",
            Self::MdNew => "md-new",
        }
    }

    pub(crate) fn rules(self) -> Box<dyn VariantCheck> {
        match self {
            Self::Civitek => Box::new(civitek::CivitekCheck),
            Self::CivitekNew => Box::new(civitek_new::CivitekNewCheck),
            Self::Flager => Box::new(flager::FlagerCheck),
            Self::Mi => Box::new(mi::MiCheck),
            Self::Md => Box::new(md::MdCheck),
            Self::MdNew => Box::new(md_new::MdNewCheck),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-variant rule set. `validate_record` carries the field comparison
/// table; everything else has shared defaults.
pub(crate) trait VariantCheck {
    /// How many encoding layers this variant's producer applies.
    fn nesting(&self) -> Nesting;

    /// File-level checks run before per-record validation.
    fn file_checks(
        &self,
        _pair: &FilePair,
        _content: &ContentFile,
        _settings: &CheckSettings,
    ) -> Vec<Discrepancy> {
        Vec::new()
    }

    /// Validate one record's decoded document against its manifest lead.
    fn validate_record(
        &self,
        lead: &Lead,
        html: &str,
        settings: &CheckSettings,
    ) -> Vec<Discrepancy>;

    /// Process one manifest/content pair. The default flow covers every
    /// variant that reports record-by-record.
    fn check_pair(&self, pair: &FilePair, settings: &CheckSettings, report: &mut ReportBuilder) {
        report.begin_file(&pair.base_name);

        let manifest = match Manifest::load(&pair.manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                report.file_error(&format!("Could not read manifest: {e}"));
                report.end_file();
                return;
            }
        };
        let content = match ContentFile::load(&pair.content_path) {
            Ok(content) => content,
            Err(e) => {
                report.file_error(&format!("Could not read content file: {e}"));
                report.end_file();
                return;
            }
        };

        // File-level findings go straight to the report; record-level
        // ones merge into that record's section below.
        let mut per_record: std::collections::HashMap<String, Vec<Discrepancy>> =
            std::collections::HashMap::new();
        for d in self.file_checks(pair, &content, settings) {
            if d.record_id == crate::domain::discrepancy::FILE_LEVEL_ID {
                report.discrepancy(&d);
            } else {
                per_record.entry(d.record_id.clone()).or_default().push(d);
            }
        }

        let decoded = content.decode(self.nesting());
        for lead in &manifest.leads {
            let mut discrepancies = per_record.remove(&lead.id).unwrap_or_default();
            match decoded.get(&lead.id) {
                None => discrepancies.push(Discrepancy::hard(
                    &lead.id,
                    "content",
                    "No decoded document found for this record",
                )),
                Some(Err(e)) => discrepancies.push(Discrepancy::hard(
                    &lead.id,
                    "decode",
                    format!("Payload decode failed: {e}"),
                )),
                Some(Ok(html)) => {
                    discrepancies.extend(validate_contained(self, lead, html, settings));
                }
            }
            report.record(&lead.id, &discrepancies);
        }

        // Content-only identifiers are discrepancies too: every record
        // must be accounted for in both directions.
        for id in decoded.ids() {
            if manifest.lead_by_id(id).is_none() {
                let mut discrepancies = per_record.remove(id).unwrap_or_default();
                discrepancies.push(Discrepancy::hard(
                    id,
                    "manifest",
                    "Record not present in manifest",
                ));
                report.record(id, &discrepancies);
            }
        }

        report.end_file();
    }
}

/// Run one record's validation with panic containment: a fault in one
/// record's extraction must never abort the batch.
pub(crate) fn validate_contained<V: VariantCheck + ?Sized>(
    rules: &V,
    lead: &Lead,
    html: &str,
    settings: &CheckSettings,
) -> Vec<Discrepancy> {
    debug!(id = %lead.id, "validating record");
    match catch_unwind(AssertUnwindSafe(|| {
        rules.validate_record(lead, html, settings)
    })) {
        Ok(discrepancies) => discrepancies,
        Err(_) => {
            error!(id = %lead.id, "internal fault during record validation");
            vec![Discrepancy::hard(
                &lead.id,
                "internal",
                "Internal fault while validating this record",
            )]
        }
    }
}
