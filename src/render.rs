//! Console rendering of sync plans.

use owo_colors::OwoColorize;

use icsync_core::EventResource;
use icsync_core::sync::SyncPlan;

/// Trace inserts and patches that carry recurrence lines; these are the
/// mutations worth eyeballing when a feed misbehaves.
pub fn print_recurrence_mutations(plan: &SyncPlan) {
    for resource in &plan.to_insert {
        if let Some(ref lines) = resource.recurrence {
            println!(
                "{} {} {}",
                "insert".green(),
                resource.uid(),
                lines.join(" ").dimmed()
            );
        }
    }
    for (_, resource) in &plan.to_patch {
        if let Some(ref lines) = resource.recurrence {
            println!(
                "{} {} {}",
                "patch".yellow(),
                resource.uid(),
                lines.join(" ").dimmed()
            );
        }
    }
}

/// Full plan listing for `icsync status`.
pub fn render_plan(plan: &SyncPlan) -> String {
    if plan.is_empty() {
        return format!("Up to date ({} unchanged)", plan.unchanged);
    }

    let mut lines = Vec::new();

    for resource in &plan.to_insert {
        lines.push(format!("   {} {}", "+".green(), render_event(resource)));
    }
    for (_, resource) in &plan.to_patch {
        lines.push(format!("   {} {}", "~".yellow(), render_event(resource)));
    }
    for (_, uid) in &plan.to_delete {
        lines.push(format!("   {} {}", "-".red(), uid));
    }

    lines.push(format!(
        "\nWould apply: {} created, {} updated, {} deleted, {} unchanged",
        plan.to_insert.len(),
        plan.to_patch.len(),
        plan.to_delete.len(),
        plan.unchanged
    ));

    lines.join("\n")
}

fn render_event(resource: &EventResource) -> String {
    let summary = if resource.summary.is_empty() {
        "(No title)"
    } else {
        &resource.summary
    };
    format!("{} {}", summary, resource.uid().dimmed())
}
