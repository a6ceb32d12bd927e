use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::generator::GeneratedFields;

/// Name of the per-product record file. Its presence is the idempotence
/// signal: products that already have one are never reprocessed.
pub const METADATA_FILENAME: &str = "metadata.txt";

/// The fully assembled record for one product. Built in memory, persisted in
/// one shot, never mutated afterwards.
#[derive(Debug)]
pub struct MetadataRecord {
    pub fields: GeneratedFields,
    pub code: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

impl MetadataRecord {
    pub fn new(
        fields: GeneratedFields,
        code: String,
        images: Vec<String>,
        videos: Vec<String>,
    ) -> Self {
        MetadataRecord {
            fields,
            code,
            images,
            videos,
        }
    }

    /// Six `key: value` lines in fixed order. Media lists are joined with
    /// ", "; an empty list renders as an empty value.
    pub fn render(&self) -> String {
        format!(
            "title: {}\nsubtitle: {}\ndescription: {}\ncode: {}\nimages: {}\nvideos: {}",
            self.fields.title,
            self.fields.subtitle,
            self.fields.description,
            self.code,
            self.images.join(", "),
            self.videos.join(", "),
        )
    }

    /// Write the record as `metadata.txt` inside the product directory.
    ///
    /// Goes through a temp file plus rename so a crash mid-write cannot leave
    /// a partial metadata.txt behind; a partial file would be taken as
    /// already-processed on the next run.
    pub fn write(&self, product_dir: &Path) -> Result<()> {
        let target = product_dir.join(METADATA_FILENAME);
        let staging = product_dir.join(".metadata.txt.tmp");

        fs::write(&staging, self.render())
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, &target).with_context(|| {
            format!("Failed to move record into place at {}", target.display())
        })?;

        Ok(())
    }
}
