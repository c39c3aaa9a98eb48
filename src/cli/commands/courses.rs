//! Courses command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// List the indexed courses.
pub async fn run_courses(settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;
    let analytics = orchestrator.course_analytics().await?;

    if analytics.total_courses == 0 {
        Output::info("No courses indexed yet.");
        Output::info("Use 'kurs ingest <folder>' to index course documents.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", analytics.total_courses));
    println!();

    for title in &analytics.course_titles {
        Output::list_item(title);
    }

    Ok(())
}
