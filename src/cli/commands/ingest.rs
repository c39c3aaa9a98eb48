//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Index a course file or every course file in a folder.
pub async fn run_ingest(path: Option<&str>, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = match path {
        Some(p) => Settings::expand_path(p),
        None => settings.docs_dir(),
    };

    if !path.exists() {
        Output::error(&format!("Path not found: {}", path.display()));
        anyhow::bail!("Path not found: {}", path.display());
    }

    let orchestrator = Orchestrator::new(settings)?;

    if path.is_file() {
        if clear {
            Output::warning("--clear only applies to folders; ignoring.");
        }

        let spinner = Output::spinner(&format!("Indexing {}...", display_name(&path)));
        let result = orchestrator.add_course_document(&path).await;
        spinner.finish_and_clear();

        let (course, chunks) = result?;
        Output::success(&format!(
            "Indexed '{}' ({} lessons, {} chunks)",
            course.title,
            course.lessons.len(),
            chunks
        ));
        return Ok(());
    }

    let spinner = Output::spinner(&format!("Indexing courses in {}...", path.display()));
    let result = orchestrator.add_course_folder(&path, clear).await;
    spinner.finish_and_clear();

    let (courses, chunks) = result?;
    if courses == 0 {
        Output::info("No new courses found.");
    } else {
        Output::success(&format!("Added {} courses with {} chunks", courses, chunks));
    }

    let analytics = orchestrator.course_analytics().await?;
    Output::kv("Total courses", &analytics.total_courses.to_string());

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
