//! Proctoring Demo - Main Entry Point
//!
//! Runs one proctored sitting against a synthetic host: a scripted candidate
//! answers a few questions, lets a second person into view, switches tabs,
//! and finally submits.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use proctor::synthetic::SyntheticEnvironment;
use proctor::{init_logging, Proctor, ProctorConfig, ProctorHandle, SessionEnd, TracingSink};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = ProctorConfig::load(path.as_deref()).context("loading proctoring config")?;
    init_logging(&config.logging)?;

    info!("=== Exam Proctoring Demo v{} ===", env!("CARGO_PKG_VERSION"));

    let (env, mut deps) = SyntheticEnvironment::with_candidate();
    deps.sink = Box::new(TracingSink);
    let (proctor, handle) = Proctor::new(config, deps)?;
    let session = tokio::spawn(proctor.run());

    candidate_script(&handle, &env).await?;

    let report = session.await.context("proctoring task panicked")??;
    match report.end {
        SessionEnd::Submitted(reason) => info!("Session {} submitted ({:?})", report.session_id, reason),
        SessionEnd::Abandoned => info!("Session {} abandoned", report.session_id),
    }
    info!(
        "Violations: {}/{}, detection cycles: {}",
        report.violations.total, report.violations.termination_threshold, report.detection_cycles
    );
    if let Some(record) = report.record {
        info!("Submission record: {}", record.to_json()?);
    }

    Ok(())
}

async fn candidate_script(handle: &ProctorHandle, env: &SyntheticEnvironment) -> anyhow::Result<()> {
    let pause = |ms| tokio::time::sleep(Duration::from_millis(ms));

    handle.answer_current("A").await?;
    handle.next_question().await?;
    handle.answer_current("C").await?;
    handle.toggle_flag("aptitude-2").await?;
    pause(1000).await;

    info!("Someone walks into view");
    env.show_faces(2);
    pause(2000).await;
    env.show_faces(1);

    info!("Candidate switches tabs");
    env.switch_tab();
    pause(1000).await;

    let snapshot = handle.snapshot();
    info!(
        "Time left {} in {}, {} answered, escalation {:?}",
        snapshot.time_label, snapshot.section_name, snapshot.answered_in_section, snapshot.escalation
    );

    handle.complete_section().await?;
    pause(500).await;
    handle.submit().await?;
    Ok(())
}
