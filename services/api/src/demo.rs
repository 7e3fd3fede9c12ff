use crate::infra::{seed_demo_data, InMemoryPlacementStore, LoggingNotificationDispatcher};
use chrono::Utc;
use clap::Args;
use placement_core::error::AppError;
use placement_core::placements::{
    Actor, ActorRole, ApplicationStatus, DriveId, DriveView, PlacementEngine, StudentId,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Student id to walk through the demo (defaults to the seeded topper)
    #[arg(long)]
    pub(crate) student: Option<String>,
    /// Drive id to apply to (defaults to the first open drive)
    #[arg(long)]
    pub(crate) drive: Option<String>,
    /// Stop after printing the annotated drive listing
    #[arg(long)]
    pub(crate) list_only: bool,
}

/// Console walkthrough of the whole lifecycle against seeded data: the HOD
/// approval queue, the annotated drive listing, one application moving from
/// applied to selected, and a deliberately ineligible student for contrast.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        student,
        drive,
        list_only,
    } = args;

    let store = Arc::new(InMemoryPlacementStore::default());
    seed_demo_data(&store)?;
    let dispatcher = Arc::new(LoggingNotificationDispatcher::default());
    let engine = PlacementEngine::new(store, dispatcher);

    let now = Utc::now();
    let hod = Actor {
        role: ActorRole::Hod,
        id: "hod-cs".to_string(),
    };
    let tpo = Actor {
        role: ActorRole::Tpo,
        id: "tpo-office".to_string(),
    };

    println!("Placement drive engine demo");

    println!("\nHOD approval queue");
    let pending = engine.approvals.pending()?;
    if pending.is_empty() {
        println!("  (empty)");
    }
    for entry in &pending {
        println!("  {} — {} ({})", entry.id.0, entry.name, entry.department);
    }
    for entry in pending {
        let approved = engine.approvals.approve(&entry.id, &hod)?;
        println!("  approved {}", approved.id.0);
    }

    let student_id = StudentId(student.unwrap_or_else(|| "stu-asha".to_string()));
    println!("\nOpen drives for {}", student_id.0);
    let drives = engine.visibility.list_open_drives(&student_id, now)?;
    for view in &drives {
        render_drive_view(view);
    }
    if list_only {
        return Ok(());
    }

    let drive_id = drive
        .map(DriveId)
        .or_else(|| {
            drives
                .iter()
                .find(|view| view.is_eligible)
                .map(|view| view.drive_id.clone())
        })
        .ok_or_else(|| {
            AppError::Placement(placement_core::placements::PlacementError::NotFound("drive"))
        })?;

    println!("\nApplying {} to {}", student_id.0, drive_id.0);
    let application = engine.lifecycle.apply(&student_id, &drive_id, now)?;
    println!(
        "  created {} with status {}",
        application.id.0,
        application.status.label()
    );

    let outcome = engine.lifecycle.update_status(
        &application.id,
        ApplicationStatus::Shortlisted,
        tpo.clone(),
        Some("cleared the aptitude round".to_string()),
        Some("technical interview".to_string()),
    )?;
    println!(
        "  shortlisted (notified: {}), next round: {}",
        outcome.notified,
        outcome
            .application
            .current_round
            .as_deref()
            .unwrap_or("n/a")
    );

    let outcome = engine.lifecycle.update_status(
        &application.id,
        ApplicationStatus::Selected,
        tpo,
        Some("offer rolled out".to_string()),
        None,
    )?;
    println!("  selected (notified: {})", outcome.notified);

    println!("\nStatus history for {}", outcome.application.id.0);
    for change in &outcome.application.status_history {
        println!(
            "  {} by {} {}",
            change.status.label(),
            change.actor.role.label(),
            change.actor.id
        );
    }

    // The seeded mechanical student shows the reason codes in action.
    let contrast = StudentId("stu-ravi".to_string());
    println!("\nOpen drives for {}", contrast.0);
    for view in engine.visibility.list_open_drives(&contrast, now)? {
        render_drive_view(&view);
    }

    Ok(())
}

fn render_drive_view(view: &DriveView) {
    let verdict = if view.is_eligible {
        "eligible".to_string()
    } else {
        let reasons: Vec<&str> = view
            .failing_reasons
            .iter()
            .map(|reason| reason.label())
            .collect();
        format!("ineligible: {}", reasons.join(", "))
    };
    println!(
        "  {} | {} {} | {} | deadline {} | {}{}",
        view.drive_id.0,
        view.company_id,
        view.job_role,
        view.package,
        view.application_deadline.format("%Y-%m-%d %H:%M"),
        verdict,
        if view.has_applied { " | applied" } else { "" }
    );
}
