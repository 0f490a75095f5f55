use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use delivery_routes::{
    carrier_codes, plan_route, AddressResolver, CarrierStops, DeliveryRecord, RouteSummary,
    RoutingClient, Session,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Carriers,
    Stops,
    Route,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Carriers => Page::Stops,
            Page::Stops => Page::Route,
            Page::Route => Page::Carriers,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Carriers => Page::Route,
            Page::Stops => Page::Carriers,
            Page::Route => Page::Stops,
        }
    }
}

/// Outcome of the last route computation, shown on the Route page
pub enum RouteView {
    NotComputed,
    Computed(RouteSummary),
    Failed(String),
}

pub struct App<'a> {
    pub records: Vec<DeliveryRecord>,
    pub carriers: Vec<String>,
    pub carrier_state: TableState,
    pub stops_state: TableState,
    pub current_page: Page,
    pub selection: Option<CarrierStops>,
    pub route: RouteView,
    pub busy: bool,
    pub session: Session,
    resolver: &'a AddressResolver,
    client: &'a dyn RoutingClient,
}

impl<'a> App<'a> {
    pub fn new(
        records: Vec<DeliveryRecord>,
        session: Session,
        resolver: &'a AddressResolver,
        client: &'a dyn RoutingClient,
    ) -> Self {
        let carriers = carrier_codes(&records);

        let mut carrier_state = TableState::default();
        if !carriers.is_empty() {
            carrier_state.select(Some(0));
        }

        let mut app = Self {
            records,
            carriers,
            carrier_state,
            stops_state: TableState::default(),
            current_page: Page::Carriers,
            selection: None,
            route: RouteView::NotComputed,
            busy: false,
            session,
            resolver,
            client,
        };
        app.refresh_selection();
        app
    }

    pub fn selected_carrier(&self) -> Option<&str> {
        self.carrier_state
            .selected()
            .and_then(|i| self.carriers.get(i))
            .map(|c| c.as_str())
    }

    /// Re-resolve stops for the highlighted carrier and drop any stale route
    pub fn refresh_selection(&mut self) {
        self.selection = self
            .selected_carrier()
            .map(|code| self.resolver.stops_for(&self.records, code));
        self.route = RouteView::NotComputed;

        let has_stops = self.selection.as_ref().map_or(false, |s| !s.stops.is_empty());
        self.stops_state.select(if has_stops { Some(0) } else { None });
    }

    pub fn compute_route(&mut self) {
        let selection = match &self.selection {
            Some(s) => s,
            None => return,
        };

        let waypoints = selection.destinations();
        self.route = match plan_route(self.client, &selection.origin.location, &waypoints) {
            Ok(plan) => RouteView::Computed(RouteSummary::from_plan(&plan)),
            Err(e) => {
                log::warn!("Route computation failed: {}", e);
                RouteView::Failed(e.to_string())
            }
        };
        self.current_page = Page::Route;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_state(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Stops => {
                let len = self.selection.as_ref().map_or(0, |s| s.stops.len());
                (&mut self.stops_state, len)
            }
            _ => (&mut self.carrier_state, self.carriers.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
        if self.current_page == Page::Carriers {
            self.refresh_selection();
        }
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
        if self.current_page == Page::Carriers {
            self.refresh_selection();
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Enter if app.current_page == Page::Carriers => {
                    app.current_page = Page::Stops;
                }
                KeyCode::Char('r') => {
                    // Draw the busy banner before blocking on the service
                    app.busy = true;
                    terminal.draw(|f| ui(f, app))?;
                    app.compute_route();
                    app.busy = false;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Length(3), // Origin banner
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_origin(f, chunks[1], app);

    match app.current_page {
        Page::Carriers => render_carriers(f, chunks[2], app),
        Page::Stops => render_stops(f, chunks[2], app),
        Page::Route => render_route(f, chunks[2], app),
    }

    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [
        (Page::Carriers, "Carriers"),
        (Page::Stops, "Stops"),
        (Page::Route, "Optimized Route"),
    ];

    let mut tab_spans = vec![];
    for (i, (page, name)) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(*name, style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", app.records.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Carriers: {}", app.carriers.len()),
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" 🚚 Delivery Routes "),
    );

    f.render_widget(header, area);
}

fn render_origin(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.selection {
        Some(sel) => Line::from(vec![
            Span::styled(
                format!(" {} ", sel.origin.carrier_code),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ),
            Span::raw("  📍 Start/end: "),
            Span::styled(
                sel.origin.location.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        None => Line::from(Span::styled(
            " No carrier in this file",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let banner = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(banner, area);
}

fn render_carriers(f: &mut Frame, area: Rect, app: &mut App) {
    let header = header_row(&["Carrier", "Home base", "Rows"]);

    let rows = app.carriers.iter().map(|code| {
        let count = app
            .records
            .iter()
            .filter(|r| r.carrier_code == *code)
            .count();

        Row::new(vec![
            Cell::from(code.clone()),
            Cell::from(app.resolver.carriers().home_city(code).to_string()),
            Cell::from(count.to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(10), Constraint::Length(24), Constraint::Length(8)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Select a carrier "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.carrier_state);
}

fn render_stops(f: &mut Frame, area: Rect, app: &mut App) {
    let (title, rows): (String, Vec<Row>) = match &app.selection {
        Some(sel) => (
            format!(" 📍 {} unique destinations ({} rows) ", sel.stops.len(), sel.deliveries),
            sel.stops
                .iter()
                .map(|s| {
                    Row::new(vec![
                        Cell::from(s.full_address.clone()),
                        Cell::from(s.deliveries.to_string()),
                    ])
                })
                .collect(),
        ),
        None => (" Destinations ".to_string(), vec![]),
    };

    let table = Table::new(rows, [Constraint::Min(40), Constraint::Length(10)])
        .header(header_row(&["Address", "Rows"]))
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.stops_state);
}

fn render_route(f: &mut Frame, area: Rect, app: &App) {
    let mut content = vec![Line::from("")];

    if app.busy {
        content.push(Line::from(Span::styled(
            "  ⏳ Computing the best route...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    } else {
        match &app.route {
            RouteView::NotComputed => content.push(Line::from(Span::styled(
                "  Press r to compute the optimized route",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))),
            RouteView::Failed(msg) => content.push(Line::from(Span::styled(
                format!("  ❌ {}", msg),
                Style::default().fg(Color::Red),
            ))),
            RouteView::Computed(summary) if summary.is_empty() => {
                content.push(Line::from(Span::styled(
                    "  No destinations to route for this carrier.",
                    Style::default().fg(Color::Red),
                )))
            }
            RouteView::Computed(summary) => {
                content.push(Line::from(vec![
                    Span::styled("  Estimated distance: ", label_style()),
                    Span::raw(format!("{} km", summary.distance_km)),
                    Span::raw("    "),
                    Span::styled("Estimated time: ", label_style()),
                    Span::raw(format!("~ {} min", summary.duration_min)),
                ]));
                content.push(Line::from(""));
                content.push(Line::from(Span::styled(
                    "  Suggested delivery order:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for label in &summary.stops {
                    content.push(Line::from(format!("    {}", label)));
                }
            }
        }
    }

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" ✅ Optimization result "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" Carrier: {} ", app.selected_carrier().unwrap_or("-")),
        Style::default().fg(Color::Cyan),
    )];

    if !app.session.is_authenticated() {
        status_spans.push(Span::styled(" LOCKED ", Style::default().fg(Color::Red)));
    }

    for (key, label) in [("↑/↓", " Nav | "), ("Enter", " Stops | "), ("r", " Route | "), ("Tab", " Page | ")] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn header_row<'a>(titles: &[&'a str]) -> Row<'a> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}
