// Demo board used when nothing has been persisted yet

use crate::filter::Filters;
use crate::models::{Column, Document, Priority, Task, now_ms};

/// Four example tasks, one per column, with no filters applied
pub fn seed_document() -> Document {
    let now = now_ms();
    let task = |id: &str, title: &str, description: &str, assignee: &str, priority, column| Task {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        assignee: assignee.to_string(),
        priority,
        due: String::new(),
        column,
        created_at: now,
        updated_at: now,
    };

    Document {
        tasks: vec![
            task(
                "seed-1",
                "Sketch the roadmap",
                "Collect ideas for the next quarter",
                "",
                Priority::Low,
                Column::Backlog,
            ),
            task(
                "seed-2",
                "Write onboarding guide",
                "Cover setup, conventions and first tasks",
                "alex",
                Priority::Normal,
                Column::Todo,
            ),
            task(
                "seed-3",
                "Fix login redirect",
                "Users land on a blank page after signing in",
                "sam",
                Priority::High,
                Column::InProgress,
            ),
            task(
                "seed-4",
                "Set up CI",
                "Build and test on every push",
                "alex",
                Priority::Normal,
                Column::Done,
            ),
        ],
        filters: Filters::default(),
    }
}
