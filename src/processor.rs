use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::generator::{GenerateError, MetadataGenerator};
use crate::media::{collect_media, ProductMedia};
use crate::record::{MetadataRecord, METADATA_FILENAME};

/// Counters reported at the end of a run. Observational only; they never
/// drive control flow.
#[derive(Debug, Default)]
pub struct RunStats {
    pub processed: usize,
    pub skipped: usize,
    pub no_media: usize,
    pub failed: usize,
}

/// Why one product produced no record. Local to that product; the traversal
/// always continues.
enum ProductError {
    NoImages,
    Generate(GenerateError),
    Io(anyhow::Error),
}

pub struct Processor<G> {
    config: Config,
    generator: G,
    code_counter: u32,
    stats: RunStats,
}

impl<G: MetadataGenerator> Processor<G> {
    pub fn new(config: Config, generator: G) -> Self {
        Processor {
            config,
            generator,
            code_counter: 1,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Walk root/<category>/<product> and generate a record for every product
    /// that does not have one yet. Aborts only when the root is missing;
    /// every other failure is local to one product.
    pub fn run(&mut self) -> Result<()> {
        if !self.config.root.is_dir() {
            bail!(
                "Root directory does not exist: {}",
                self.config.root.display()
            );
        }

        println!("Scanning products under: {}", self.config.root.display());

        let categories = subdirectories(&self.config.root)?;
        for category in categories {
            println!();
            println!("Category: {}", dir_name(&category));

            for product in subdirectories(&category)? {
                self.process_product(&product);
            }
        }

        self.print_summary();
        Ok(())
    }

    fn process_product(&mut self, product_dir: &Path) {
        let product_name = dir_name(product_dir);

        if product_dir.join(METADATA_FILENAME).exists() {
            println!("  - Skipped ({} exists): {}", METADATA_FILENAME, product_name);
            self.stats.skipped += 1;
            return;
        }

        println!("  Processing product: {}", product_name);

        // Every product reaching this branch consumes one code, even when
        // generation then fails. Skipped products never do.
        let code = format_code(self.code_counter);
        self.code_counter += 1;

        match self.generate_record(product_dir, &code) {
            Ok(()) => {
                self.stats.processed += 1;
                println!("    ✓ Wrote {} (code {})", METADATA_FILENAME, code);
            }
            Err(ProductError::NoImages) => {
                self.stats.no_media += 1;
                println!("    - No images in this folder, nothing generated");
            }
            Err(ProductError::Generate(e)) => {
                self.stats.failed += 1;
                eprintln!("    ✗ Generation failed for {}: {}", product_name, e);
            }
            Err(ProductError::Io(e)) => {
                self.stats.failed += 1;
                eprintln!("    ✗ Failed to process {}: {:#}", product_name, e);
            }
        }
    }

    fn generate_record(&self, product_dir: &Path, code: &str) -> Result<(), ProductError> {
        let ProductMedia { images, videos } =
            collect_media(product_dir, &self.config).map_err(ProductError::Io)?;

        if images.is_empty() {
            return Err(ProductError::NoImages);
        }

        println!(
            "    Found {} image(s), {} video(s)",
            images.len(),
            videos.len()
        );

        // Only the first max_images go to the model; the record still lists
        // every image found.
        let send_count = images.len().min(self.config.max_images_per_product);
        let fields = self
            .generator
            .generate(product_dir, &images[..send_count])
            .map_err(ProductError::Generate)?;

        let record = MetadataRecord::new(fields, code.to_string(), images, videos);
        record.write(product_dir).map_err(ProductError::Io)
    }

    fn print_summary(&self) {
        println!();
        println!("=== PROCESSING COMPLETE ===");
        println!("Products processed: {}", self.stats.processed);
        println!(
            "Products skipped (metadata already present): {}",
            self.stats.skipped
        );
        if self.stats.no_media > 0 {
            println!("Products without images: {}", self.stats.no_media);
        }
        if self.stats.failed > 0 {
            println!("Products failed: {}", self.stats.failed);
        }
    }
}

/// Two-digit-minimum zero-padded sequential code: "01", "02", ... "100".
pub fn format_code(n: u32) -> String {
    format!("{n:02}")
}

/// Immediate subdirectories of `dir`, sorted by name. Non-directory entries
/// are ignored.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();

    for entry_result in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry_result
            .with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
