use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use super::App;
use crate::apply::ApplySummary;
use crate::editor::{EditableField, FieldKey, FieldValue};
use crate::flow::{Controller, PreviewMode, Screen};

/// Render the full TUI frame.
pub fn render(f: &mut Frame, app: &App, controller: &Controller) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // breadcrumb
            Constraint::Min(5),    // screen
            Constraint::Length(1), // status bar
        ])
        .split(f.area());

    render_breadcrumb(f, controller, chunks[0]);
    match controller.state().screen {
        Screen::Orgs => render_orgs(f, app, controller, chunks[1]),
        Screen::Repos => render_repos(f, app, controller, chunks[1]),
        Screen::Branches => render_branches(f, app, controller, chunks[1]),
        Screen::Editor => render_editor(f, app, controller, chunks[1]),
        Screen::Preview => render_preview(f, controller, chunks[1]),
        Screen::Templates => render_templates(f, app, controller, chunks[1]),
    }
    render_status_bar(f, controller, chunks[2]);
}

fn render_breadcrumb(f: &mut Frame, controller: &Controller, area: Rect) {
    let state = controller.state();
    let mut parts = vec![" branch-guard".to_string()];
    if let Some(org) = &state.org {
        parts.push(org.login.clone());
    }
    if !state.repos.is_empty() {
        let names: Vec<&str> = state.repos.iter().map(|repo| repo.name.as_str()).collect();
        parts.push(names.join(", "));
    }
    if let Some(branch) = &state.branch {
        parts.push(format!("@{branch}"));
    }
    let line = Line::from(Span::styled(
        parts.join(" / "),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    f.render_widget(Paragraph::new(line), area);
}

fn highlighted_list<'a>(items: Vec<ListItem<'a>>, title: String) -> List<'a> {
    List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ")
}

fn render_list(f: &mut Frame, area: Rect, list: List<'_>, selected: usize, empty: bool) {
    let mut state = ListState::default().with_selected((!empty).then_some(selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_orgs(f: &mut Frame, app: &App, controller: &Controller, area: Rect) {
    let orgs = &controller.state().organizations;
    let items: Vec<ListItem> = orgs
        .iter()
        .map(|org| {
            let mut spans = vec![Span::raw(org.login.clone())];
            if org.is_personal {
                spans.push(Span::styled("  (personal)", Style::default().fg(Color::DarkGray)));
            }
            if let Some(description) = &org.description {
                spans.push(Span::styled(
                    format!("  {description}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let title = format!(" Owners ({}) ", orgs.len());
    render_list(f, area, highlighted_list(items, title), app.cursor, orgs.is_empty());
}

fn render_repos(f: &mut Frame, app: &App, controller: &Controller, area: Rect) {
    let repos = &controller.state().available_repos;
    let items: Vec<ListItem> = repos
        .iter()
        .enumerate()
        .map(|(index, repo)| {
            let mark = if app.marked.contains(&index) { "[x]" } else { "[ ]" };
            let mut spans = vec![Span::raw(format!("{mark} {}", repo.name))];
            if repo.private {
                spans.push(Span::styled("  private", Style::default().fg(Color::Yellow)));
            }
            if repo.permissions.is_some_and(|permissions| !permissions.admin) {
                spans.push(Span::styled("  no admin", Style::default().fg(Color::Red)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let title = format!(" Repositories ({}, {} marked) ", repos.len(), app.marked.len());
    render_list(f, area, highlighted_list(items, title), app.cursor, repos.is_empty());
}

fn render_branches(f: &mut Frame, app: &App, controller: &Controller, area: Rect) {
    let state = controller.state();
    let items: Vec<ListItem> = state
        .branches
        .iter()
        .map(|branch| {
            let mut spans = vec![Span::raw(branch.name.clone())];
            if branch.protected {
                spans.push(Span::styled("  protected", Style::default().fg(Color::Green)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let source = state
        .repos
        .first()
        .map(|repo| repo.full_name.as_str())
        .unwrap_or("?");
    let title = format!(" Branches of {source} ");
    render_list(f, area, highlighted_list(items, title), app.cursor, state.branches.is_empty());
}

fn field_line(field: &EditableField) -> Line<'static> {
    let indent = match (field.parent, field.key) {
        (_, FieldKey::SectionEnabled(_)) | (None, _) => "",
        (Some(_), _) => "    ",
    };
    let dim = Style::default().fg(Color::DarkGray);
    match &field.value {
        FieldValue::Boolean(value) => {
            let mark = if *value { "[x]" } else { "[ ]" };
            Line::from(format!("{indent}{mark} {}", field.label))
        }
        FieldValue::Integer(value) => Line::from(vec![
            Span::raw(format!("{indent}{}: ", field.label)),
            Span::styled(value.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        FieldValue::Text(text) => {
            let shown = if text.is_empty() { "(none)" } else { text.as_str() };
            Line::from(vec![
                Span::raw(format!("{indent}{}: ", field.label)),
                Span::styled(shown.to_string(), Style::default().fg(Color::Yellow)),
            ])
        }
        FieldValue::WorkflowPicker => Line::from(Span::styled(
            format!("{indent}+ {}", field.label),
            Style::default().fg(Color::Cyan),
        )),
        FieldValue::Action => Line::from(Span::styled(
            format!("▶ {}", field.label),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        FieldValue::Divider => Line::from(Span::styled("─".repeat(32), dim)),
    }
}

fn render_editor(f: &mut Frame, app: &App, controller: &Controller, area: Rect) {
    let editor = controller.editor();
    let (list_area, input_area) = if app.input.is_some() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let items: Vec<ListItem> = editor
        .fields()
        .iter()
        .map(|field| ListItem::new(field_line(field)))
        .collect();
    let title = match editor.external_checks().len() {
        0 => " Protection ".to_string(),
        n => format!(" Protection ({n} workflow checks) "),
    };
    let list = highlighted_list(items, title);
    render_list(f, list_area, list, editor.focus(), editor.fields().is_empty());

    if let (Some(area), Some(buffer)) = (input_area, &app.input) {
        let label = editor.focused_field().map(|field| field.label).unwrap_or("");
        let block = Block::default()
            .title(format!(" {label} (Enter to apply, Esc to cancel) "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        f.render_widget(Paragraph::new(format!("{buffer}_")).block(block), area);
    }

    if let Some(picker) = editor.picker() {
        let popup = centered(area, 60, 60);
        let items: Vec<ListItem> = picker
            .entries()
            .iter()
            .map(|entry| {
                let mark = if entry.selected { "[x]" } else { "[ ]" };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{mark} {}", entry.check.name)),
                    Span::styled(
                        format!("  {}", entry.check.path),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();
        f.render_widget(Clear, popup);
        let list = highlighted_list(items, " Workflows (Space to select) ".to_string());
        render_list(f, popup, list, picker.focus(), picker.entries().is_empty());
    }
}

fn render_preview(f: &mut Frame, controller: &Controller, area: Rect) {
    let state = controller.state();
    let mut lines: Vec<Line> = Vec::new();

    match state.preview_mode {
        PreviewMode::Diff => {
            let targets = state.targets().len();
            let branch = state.branch.as_deref().unwrap_or("?");
            lines.push(Line::from(format!(
                "Apply to {targets} repositories on {branch}?"
            )));
            lines.push(Line::default());

            match &state.diff {
                Some(diff) if !diff.is_empty() => {
                    let entries = [
                        ("+", Color::Green, &diff.added),
                        ("-", Color::Red, &diff.removed),
                        ("~", Color::Yellow, &diff.changed),
                    ];
                    for (marker, color, keys) in entries {
                        for key in keys.iter() {
                            lines.push(Line::from(Span::styled(
                                format!("{marker} {key}"),
                                Style::default().fg(color),
                            )));
                        }
                    }
                }
                _ => lines.push(Line::from(Span::styled(
                    "No changes against the live configuration.",
                    Style::default().fg(Color::DarkGray),
                ))),
            }

            if let Some(diff) = &state.diff {
                lines.push(Line::default());
                lines.extend(diff.rendered.lines().map(|line| Line::from(line.to_string())));
            }
        }
        PreviewMode::Results => {
            let batch = state.latest_batch();
            let summary = ApplySummary::from_results(batch);
            lines.push(Line::from(format!(
                "Total: {} | Succeeded: {} | Failed: {}",
                summary.total, summary.succeeded, summary.failed
            )));
            lines.push(Line::default());
            for result in batch {
                let line = match &result.error {
                    Some(error) => Line::from(vec![
                        Span::styled("✗ ", Style::default().fg(Color::Red)),
                        Span::raw(format!("{} ({}): {error}", result.full_name(), result.branch)),
                    ]),
                    None => Line::from(vec![
                        Span::styled("✓ ", Style::default().fg(Color::Green)),
                        Span::raw(format!("{} ({})", result.full_name(), result.branch)),
                    ]),
                };
                lines.push(line);
            }
        }
    }

    let title = match state.preview_mode {
        PreviewMode::Diff => " Preview ",
        PreviewMode::Results => " Results ",
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_templates(f: &mut Frame, app: &App, controller: &Controller, area: Rect) {
    let templates = &controller.state().templates;
    let items: Vec<ListItem> = templates
        .iter()
        .map(|template| {
            let mut spans = vec![
                Span::raw(template.name.clone()),
                Span::styled(
                    format!("  {}", template.updated_at.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if let Some(description) = &template.description {
                spans.push(Span::raw(format!("  {description}")));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let title = format!(" Templates ({}) ", templates.len());
    render_list(f, area, highlighted_list(items, title), app.cursor, templates.is_empty());
}

fn render_status_bar(f: &mut Frame, controller: &Controller, area: Rect) {
    let state = controller.state();
    let (text, style) = if state.loading {
        (
            " Loading...".to_string(),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )
    } else if let Some(err) = &state.error {
        (
            format!(" ERROR: {err}"),
            Style::default().fg(Color::White).bg(Color::Red),
        )
    } else if let Some(notice) = &state.notice {
        (
            format!(" {notice}"),
            Style::default().fg(Color::Black).bg(Color::Green),
        )
    } else {
        (
            format!(" {}", key_hints(controller)),
            Style::default().fg(Color::DarkGray),
        )
    };
    f.render_widget(Paragraph::new(Line::from(Span::styled(text, style))), area);
}

fn key_hints(controller: &Controller) -> &'static str {
    let state = controller.state();
    match state.screen {
        Screen::Orgs => "j/k:move  Enter:open  t:templates  q:quit",
        Screen::Repos => "j/k:move  Space:mark  Enter:continue  t:templates  Esc:back  q:quit",
        Screen::Branches => "j/k:move  Enter:edit protection  Esc:back  q:quit",
        Screen::Editor if controller.editor().picker().is_some() => {
            "j/k:move  Space:select  Enter:add  Esc:cancel"
        }
        Screen::Editor
            if !controller
                .editor()
                .focused_field()
                .is_some_and(|field| field.is_interactive()) =>
        {
            "j/k:move  p:preview  s:save template  t:templates  Esc:back"
        }
        Screen::Editor => "j/k:move  Enter:toggle/edit  p:preview  s:save template  t:templates  Esc:back",
        Screen::Preview => match state.preview_mode {
            PreviewMode::Diff => "Enter:apply  Esc:back to editor",
            PreviewMode::Results => "Enter:back to editor",
        },
        Screen::Templates => "j/k:move  Enter:load  d:delete  Esc:back",
    }
}

/// A rectangle of the given percentages centred in `area`.
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
