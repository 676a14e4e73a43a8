use std::fmt::Write;

use super::{Row, View};

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// List region, empty-state region and statistics region. The empty state
/// is visible exactly when the list is hidden.
pub fn render_body(view: &View<'_>) -> String {
    let mut out = String::new();
    let (list_hidden, empty_hidden) = if view.is_empty() {
        (" hidden", "")
    } else {
        ("", " hidden")
    };

    let _ = writeln!(out, r#"<ul id="todoList" class="todo-list{list_hidden}" role="list">"#);
    for row in &view.rows {
        render_row(&mut out, row);
    }
    out.push_str("</ul>\n");
    let _ = writeln!(
        out,
        r#"<div id="emptyState" class="empty-state{empty_hidden}">No tasks yet. Add one above.</div>"#
    );
    let _ = writeln!(
        out,
        r#"<div class="stats"><span id="totalTasks">{}</span> <span id="completedTasks">{}</span></div>"#,
        view.stats.total_label(),
        view.stats.completed_label()
    );
    out
}

fn render_row(out: &mut String, row: &Row<'_>) {
    let completed = row.completed();
    let state = if completed { " completed" } else { "" };
    let checked = if completed { " checked" } else { "" };
    let id = escape_html(row.id().as_str());
    let _ = writeln!(out, r#"  <li class="todo-item{state}" role="listitem">"#);
    let _ = writeln!(
        out,
        r#"    <div class="todo-checkbox{checked}" role="checkbox" aria-checked="{completed}" tabindex="0" aria-label="{}" data-id="{id}"></div>"#,
        row.toggle_label()
    );
    let _ = writeln!(
        out,
        r#"    <span class="todo-text">{}</span>"#,
        escape_html(row.text())
    );
    let _ = writeln!(
        out,
        r#"    <button class="delete-btn" aria-label="{}" tabindex="0" data-id="{id}">Delete</button>"#,
        escape_html(&row.delete_label())
    );
    out.push_str("  </li>\n");
}

/// Standalone page around [`render_body`].
pub fn render_document(view: &View<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Tasks</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }}
.hidden {{ display: none; }}
.todo-list {{ list-style: none; padding: 0; }}
.todo-item {{ display: flex; gap: 0.75rem; align-items: center; padding: 0.5rem 0; }}
.todo-item.completed .todo-text {{ text-decoration: line-through; color: #888; }}
.todo-checkbox {{ width: 1rem; height: 1rem; border: 2px solid #4a5568; border-radius: 4px; }}
.todo-checkbox.checked {{ background: #48bb78; border-color: #48bb78; }}
.todo-text {{ flex: 1; }}
.stats {{ display: flex; justify-content: space-between; color: #4a5568; }}
</style>
</head>
<body>
<h1>Tasks</h1>
{}</body>
</html>
"#,
        render_body(view)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskCollection;
    use crate::view::project;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn task_text_is_rendered_literally() {
        let mut tasks = TaskCollection::default();
        tasks.add("<script>alert(1)</script>").unwrap();
        let html = render_body(&project(&tasks));

        assert!(!html.contains("<script>"));
        assert!(html.contains(
            r#"<span class="todo-text">&lt;script&gt;alert(1)&lt;/script&gt;</span>"#
        ));
        assert!(html.contains(r#"aria-label="Delete task: &lt;script&gt;"#));
    }

    #[test]
    fn empty_state_shown_only_without_tasks() {
        let mut tasks = TaskCollection::default();
        let html = render_body(&project(&tasks));
        assert!(html.contains(r#"class="todo-list hidden""#));
        assert!(html.contains(r#"class="empty-state""#));
        assert!(html.contains(">0 tasks<"));

        let id = tasks.add("walk dog").unwrap().id().clone();
        tasks.toggle(&id);
        let html = render_body(&project(&tasks));
        assert!(html.contains(r#"class="todo-list""#));
        assert!(html.contains(r#"class="empty-state hidden""#));
        assert!(html.contains(r#"<li class="todo-item completed""#));
        assert!(html.contains(r#"aria-checked="true""#));
        assert!(html.contains(">1 task<"));
        assert!(html.contains(">1 completed<"));
    }

    #[test]
    fn document_wraps_body() {
        let tasks = TaskCollection::default();
        let doc = render_document(&project(&tasks));
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(r#"<div id="emptyState""#));
        assert!(doc.trim_end().ends_with("</html>"));
    }
}
