//! `devplan order` - show the resolved phase order

use anyhow::{Context as AnyhowContext, Result};
use phasekit::ExecutionPlan;

use crate::Context;
use crate::cli::OrderArgs;
use crate::commands::Project;
use crate::ui;

pub fn run(ctx: &Context, args: OrderArgs) -> Result<()> {
    let project = Project::open(ctx)?;
    let plan_path = project.plan_path(args.plan.as_deref());
    let plan = project
        .executor()
        .resolve(&plan_path)
        .with_context(|| format!("Could not resolve {}", plan_path.display()))?;

    if args.json {
        let value = serde_json::json!({
            "project": plan.document.project_name(),
            "source": plan.document.source(),
            "order": plan.phase_names(),
            "phases": plan.phases,
            "graph": plan.execution_graph(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_order(&plan, ctx.verbose > 0);
    if args.graph {
        print_graph(&plan);
    }
    Ok(())
}

fn print_order(plan: &ExecutionPlan, detailed: bool) {
    let title = match plan.document.project_name() {
        Some(name) => format!("Execution order: {}", name),
        None => "Execution order".to_string(),
    };
    ui::header(&title);

    if plan.is_empty() {
        ui::info("Plan declares no phases");
        return;
    }

    let total = plan.phases.len();
    for (index, phase) in plan.phases.iter().enumerate() {
        ui::step(index + 1, total, &phase.name);
        if !phase.dependencies.is_empty() {
            ui::dim(&format!("after: {}", phase.dependencies.join(", ")));
        }
        if detailed {
            ui::dim(&format!(
                "priority {}, tasks: {}",
                phase.priority,
                if phase.tasks.is_empty() {
                    "none".to_string()
                } else {
                    phase.tasks.join(", ")
                }
            ));
        }
    }
}

fn print_graph(plan: &ExecutionPlan) {
    ui::section("Dependents");
    for name in plan.phase_names() {
        let dependents = plan.dependents_of(name);
        let value = if dependents.is_empty() {
            "-".to_string()
        } else {
            dependents.join(", ")
        };
        ui::kv(name, &value);
    }
}
