//! Lead manifest reading.
//!
//! Manifests are XML documents with repeating `Lead` elements keyed by
//! an `ID` attribute. Expected values live either in a composite
//! `CaseKey` attribute or in `InputValue` children keyed by `FieldID`.
//! The root element may or may not carry a namespace; matching is done
//! on local names so both layouts parse identically.

use crate::domain::Lead;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest is not valid XML: {0}")]
    Parse(#[from] roxmltree::Error),
}

/// All leads from one manifest file, in document order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub leads: Vec<Lead>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(xml: &str) -> Result<Self, ManifestError> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut leads = Vec::new();
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "Lead")
        {
            let Some(id) = node.attribute("ID") else {
                debug!("skipping Lead element without ID attribute");
                continue;
            };
            let mut fields = BTreeMap::new();
            for input in node
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "InputValue")
            {
                let Some(field_id) = input.attribute("FieldID").and_then(|v| v.parse::<u8>().ok())
                else {
                    continue;
                };
                fields.insert(field_id, input.text().unwrap_or("").trim().to_string());
            }
            leads.push(Lead {
                id: id.trim().to_string(),
                case_key: node.attribute("CaseKey").map(|k| k.trim().to_string()),
                fields,
            });
        }
        debug!(leads = leads.len(), "parsed manifest");
        Ok(Self { leads })
    }

    /// Lookup by record identifier: exact match first, then
    /// case-insensitive (content files and manifests disagree on ID
    /// casing in some captures).
    pub fn lead_by_id(&self, id: &str) -> Option<&Lead> {
        self.leads
            .iter()
            .find(|l| l.id == id)
            .or_else(|| self.leads.iter().find(|l| l.id.eq_ignore_ascii_case(id)))
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}
