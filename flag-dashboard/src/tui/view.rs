use flag_overrides::dates::{format_last_modified, format_uptime};
use flag_overrides::edit::OverrideDraft;
use flag_overrides::flag::FeatureFlag;
use flag_overrides::store::{DashboardState, Dialog, Pane};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::output::status;

const PANE_WIDTH: u16 = 44;

pub fn draw(frame: &mut Frame, state: &DashboardState) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(header(state), outer[0]);
    frame.render_widget(search_bar(state), outer[1]);

    let body = if state.pane == Pane::Closed {
        vec![outer[2]]
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Fill(1), Constraint::Length(PANE_WIDTH)])
            .split(outer[2])
            .to_vec()
    };

    let mut table_state = TableState::default();
    if !state.visible().is_empty() {
        table_state.select(Some(state.cursor));
    }
    frame.render_stateful_widget(flag_table(state), body[0], &mut table_state);
    if let Some(area) = body.get(1) {
        frame.render_widget(side_pane(state), *area);
    }

    frame.render_widget(footer(state), outer[3]);

    if let Some(dialog) = &state.dialog {
        let area = centered(frame.area(), 52, 5);
        frame.render_widget(Clear, area);
        frame.render_widget(dialog_box(dialog), area);
    }
}

fn header(state: &DashboardState) -> Paragraph<'static> {
    let snapshot = &state.snapshot;
    let mut spans = if state.loaded() {
        let counters = &snapshot.counters;
        vec![
            Span::raw(format!("Flags {}", snapshot.flags.len())),
            Span::raw("  |  "),
            Span::raw(format!("Overridden {}", snapshot.overridden_count())).yellow(),
            Span::raw("  |  "),
            Span::raw(format!(
                "Requests {} ok / {} errored",
                counters.requests_ok, counters.requests_errored
            )),
            Span::raw("  |  "),
            Span::raw(format!("Up {}", format_uptime(counters.uptime))),
        ]
    } else {
        vec![Span::raw("Loading feature flags...").dim()]
    };
    if state.refreshing && state.loaded() {
        spans.push(Span::raw("  (refreshing)").light_blue());
    }

    Paragraph::new(Line::from(spans)).block(
        Block::bordered()
            .title_top("Feature flag overrides")
            .border_type(BorderType::Rounded)
            .title_alignment(Alignment::Center),
    )
}

fn search_bar(state: &DashboardState) -> Paragraph<'_> {
    let border_color = if state.search_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let text = if state.search.is_empty() && !state.search_focused {
        Line::from("Press / to search by name or treatment").dim()
    } else {
        Line::from(state.search.as_str())
    };

    Paragraph::new(text).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(Style::new().fg(border_color)),
    )
}

fn treatment_spans(flag: &FeatureFlag) -> Line<'_> {
    let mut spans = Vec::with_capacity(flag.treatments.len() * 2);
    for (i, treatment) in flag.treatments.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(", "));
        }
        if *treatment == flag.default_treatment {
            spans.push(Span::raw(treatment.as_str()).bold().underlined());
        } else {
            spans.push(Span::raw(treatment.as_str()));
        }
    }
    Line::from(spans)
}

fn flag_row<'a>(state: &DashboardState, flag: &'a FeatureFlag) -> Row<'a> {
    let marker = if state.is_pending(&flag.name) {
        Span::raw("~").light_blue()
    } else if flag.is_overridden {
        Span::raw("*").yellow().bold()
    } else {
        Span::raw(" ")
    };
    let status_style = if flag.killed {
        Style::new().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else if flag.active {
        Style::new().fg(Color::Green)
    } else {
        Style::new().fg(Color::DarkGray)
    };

    Row::new(vec![
        Line::from(marker),
        Line::from(flag.name.as_str()),
        Line::from(Span::styled(status(flag), status_style)),
        treatment_spans(flag),
        Line::from(flag.flag_sets.join(", ")),
        Line::from(format_last_modified(&flag.cn)),
    ])
}

fn flag_table(state: &DashboardState) -> Table<'_> {
    let visible = state.visible();
    let rows: Vec<Row> = visible.iter().map(|flag| flag_row(state, *flag)).collect();
    let title = if state.search.is_empty() {
        "Feature flags".to_string()
    } else {
        format!(
            "Feature flags ({} of {})",
            visible.len(),
            state.snapshot.flags.len()
        )
    };

    Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Fill(3),
            Constraint::Length(8),
            Constraint::Fill(3),
            Constraint::Fill(2),
            Constraint::Length(17),
        ],
    )
    .column_spacing(1)
    .header(
        Row::new(vec![
            "", "Name", "Status", "Treatments", "Flag sets", "Last modified",
        ])
        .style(Style::new().bold().bg(Color::LightBlue)),
    )
    .block(
        Block::default()
            .title(title)
            .title_style(Style::new().bold())
            .borders(Borders::ALL),
    )
    .row_highlight_style(Style::new().bold().bg(Color::DarkGray))
    .highlight_symbol(">")
}

fn field<'a>(label: &'a str, value: impl Into<Span<'a>>) -> Line<'a> {
    Line::from(vec![Span::raw(label).bold(), value.into()])
}

fn details_lines(flag: &FeatureFlag) -> Vec<Line<'_>> {
    let mut treatments = vec![Span::raw("Treatments: ").bold()];
    treatments.extend(treatment_spans(flag).spans);

    vec![
        field("Name: ", flag.name.as_str()),
        field("Status: ", status(flag)),
        field("Default: ", flag.default_treatment.as_str()),
        Line::from(treatments),
        field("Flag sets: ", flag.flag_sets.join(", ")),
        field("Last modified: ", format_last_modified(&flag.cn)),
        field("Change number: ", flag.change_number.to_string()),
        field("Overridden: ", if flag.is_overridden { "yes" } else { "no" }),
        Line::from(""),
        Line::from("e edit  k kill/restore  d discard").dim(),
    ]
}

fn edit_lines<'a>(flag: &'a FeatureFlag, draft: &'a OverrideDraft) -> Vec<Line<'a>> {
    let killed = if draft.killed { "[x] killed" } else { "[ ] killed" };
    let changed = |same: bool| {
        if same {
            Style::default()
        } else {
            Style::new().fg(Color::Yellow).bold()
        }
    };

    vec![
        field("Editing ", flag.name.as_str()),
        Line::from(""),
        Line::from(Span::styled(killed, changed(draft.killed == flag.killed))),
        Line::from(vec![
            Span::raw("Default: < "),
            Span::styled(
                draft.default_treatment.as_str(),
                changed(draft.default_treatment == flag.default_treatment),
            ),
            Span::raw(" >"),
        ]),
        Line::from(""),
        Line::from("space toggle kill  \u{2190}/\u{2192} treatment").dim(),
        Line::from("enter save  esc cancel").dim(),
    ]
}

fn side_pane(state: &DashboardState) -> Paragraph<'_> {
    let (title, lines) = match (&state.pane, state.pane_flag()) {
        (Pane::Editing { draft, .. }, Some(flag)) => ("Edit override", edit_lines(flag, draft)),
        (_, Some(flag)) => ("Details", details_lines(flag)),
        (_, None) => ("Details", vec![Line::from("Flag no longer reported").dim()]),
    };

    Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::bordered()
            .title(title)
            .border_type(BorderType::Rounded)
            .border_style(Style::new().fg(Color::Cyan)),
    )
}

fn footer(state: &DashboardState) -> Line<'static> {
    let help = if state.search_focused {
        "type to filter  enter/esc done"
    } else {
        "/ search  \u{2191}\u{2193} move  enter details  e edit  k kill/restore  d discard  r refresh  q quit"
    };
    Line::from(help).dim()
}

pub fn dialog_text(dialog: &Dialog) -> String {
    match dialog {
        Dialog::ConfirmKill { name, killed: true } => format!("Kill '{name}'?"),
        Dialog::ConfirmKill {
            name,
            killed: false,
        } => format!("Restore '{name}'?"),
        Dialog::ConfirmDiscard { name } => format!("Discard the override of '{name}'?"),
    }
}

fn dialog_box(dialog: &Dialog) -> Paragraph<'static> {
    Paragraph::new(vec![
        Line::from(dialog_text(dialog)).bold(),
        Line::from(""),
        Line::from("y confirm  n cancel").dim(),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::bordered()
            .title("Confirm")
            .border_type(BorderType::Rounded)
            .border_style(Style::new().fg(Color::Yellow)),
    )
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}
