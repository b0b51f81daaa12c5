use image::DynamicImage;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use ratatui_image::{Resize, StatefulImage, picker::Picker, protocol::StatefulProtocol};
use std::collections::HashMap;

use crate::backend::api::{
    CatalogEntry, ChapterContent, ComicDetail, LatestPage, SearchResult,
};
use crate::backend::error::ApiError;
use crate::backend::listing::{ListingController, PageRequest};
use crate::backend::slug::{Route, comic_slug_for_chapter};
use crate::backend::theme::{Palette, ThemePreference, ThemeService};
use crate::config::Config;
use crate::reader::reveal::{PLACEHOLDER_IMAGE, RevealEngine, RevealOptions};
use crate::reader::viewport::{PageId, ScrollViewport};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    Home,
    ComicDetail,
    Reader,
    Search,
}

/// Network work a navigation or result asks the event loop to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    Latest(PageRequest),
    Detail(String),
    Chapter(String),
    Search(String),
}

#[derive(Default)]
pub struct DetailState {
    pub slug: String,
    pub loading: bool,
    pub comic: Option<ComicDetail>,
    pub chapter_list_state: ListState,
}

impl DetailState {
    /// Chapter under the cursor; the list is shown newest first.
    pub fn selected_chapter(&self) -> Option<&str> {
        let comic = self.comic.as_ref()?;
        let selected = self.chapter_list_state.selected()?;
        comic
            .chapters_newest_first()
            .nth(selected)
            .map(|c| c.slug.as_str())
    }
}

/// What a reader slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Hidden,
    Loading,
    Image,
    Failed,
    /// Downloaded, but the terminal has no image protocol.
    NoImageSupport,
}

pub struct ReaderState {
    pub slug: String,
    pub comic_slug: String,
    pub loading: bool,
    pub error: Option<String>,
    pub content: Option<ChapterContent>,
    pub engine: Option<RevealEngine>,
    pub viewport: ScrollViewport,
    pub page_images: HashMap<PageId, StatefulProtocol>,
}

impl Default for ReaderState {
    fn default() -> Self {
        Self {
            slug: String::new(),
            comic_slug: String::new(),
            loading: false,
            error: None,
            content: None,
            engine: None,
            viewport: ScrollViewport::new(1, 0),
            page_images: HashMap::new(),
        }
    }
}

#[derive(Default)]
pub struct SearchState {
    pub input: String,
    pub editing: bool,
    pub query: String,
    pub loading: bool,
    pub results: Vec<SearchResult>,
    pub selected: usize,
}

pub struct App {
    pub route: Route,
    history: Vec<Route>,
    pub listing: ListingController,
    pub home_offset: usize,
    pub detail: DetailState,
    pub reader: ReaderState,
    pub search: SearchState,
    pub reveal: RevealOptions,
    pub picker: Option<Picker>,
    pub image_states: HashMap<String, StatefulProtocol>,
}

impl App {
    pub fn new(config: &Config, picker: Option<Picker>) -> Self {
        Self {
            route: Route::Home,
            history: Vec::new(),
            listing: ListingController::new(config.per_page),
            home_offset: 0,
            detail: DetailState::default(),
            reader: ReaderState::default(),
            search: SearchState::default(),
            reveal: config.reveal,
            picker,
            image_states: HashMap::new(),
        }
    }

    pub fn view(&self) -> View {
        match self.route {
            Route::Home => View::Home,
            Route::Comic(_) => View::ComicDetail,
            Route::Read(_) => View::Reader,
            Route::Search(_) => View::Search,
        }
    }

    /// Loads whatever the current route needs; used once at startup.
    pub fn start(&mut self) -> Option<Fetch> {
        self.enter(self.route.clone())
    }

    pub fn navigate(&mut self, route: Route) -> Option<Fetch> {
        log::info!("navigate {}", route.path());
        let previous = std::mem::replace(&mut self.route, route.clone());
        self.history.push(previous);
        self.enter(route)
    }

    pub fn go_back(&mut self) -> Option<Fetch> {
        let route = self.history.pop()?;
        log::info!("back to {}", route.path());
        self.route = route.clone();
        self.enter(route)
    }

    fn enter(&mut self, route: Route) -> Option<Fetch> {
        match route {
            Route::Home => self.listing.start().map(Fetch::Latest),
            Route::Comic(slug) => {
                self.detail = DetailState {
                    slug: slug.clone(),
                    loading: true,
                    ..DetailState::default()
                };
                Some(Fetch::Detail(slug))
            }
            Route::Read(slug) => {
                self.reader.comic_slug = comic_slug_for_chapter(&slug);
                self.reader.slug = slug.clone();
                self.reader.loading = true;
                self.reader.error = None;
                self.reader.content = None;
                self.reader.engine = None;
                self.reader.page_images.clear();
                self.reader.viewport.reset(0);
                Some(Fetch::Chapter(slug))
            }
            Route::Search(query) => {
                self.search.input = query.clone();
                self.search.query = query.clone();
                self.search.results.clear();
                self.search.selected = 0;
                self.search.loading = !query.trim().is_empty();
                self.search.loading.then_some(Fetch::Search(query))
            }
        }
    }

    pub fn refresh_listing(&mut self) -> Option<Fetch> {
        self.listing.reset();
        self.home_offset = 0;
        self.listing.start().map(Fetch::Latest)
    }

    pub fn load_more(&mut self) -> Option<Fetch> {
        self.listing.load_more().map(Fetch::Latest)
    }

    pub fn apply_latest(&mut self, request: PageRequest, result: Result<LatestPage, ApiError>) {
        self.listing.apply(request, result);
    }

    /// A failed detail load sends the user back to the listing.
    pub fn apply_detail(
        &mut self,
        slug: &str,
        result: Result<ComicDetail, ApiError>,
    ) -> Option<Fetch> {
        if self.route != Route::Comic(slug.to_string()) {
            log::debug!("dropping stale detail for {}", slug);
            return None;
        }

        match result {
            Ok(comic) => {
                self.detail.loading = false;
                let has_chapters = !comic.chapters.is_empty();
                self.detail.comic = Some(comic);
                self.detail
                    .chapter_list_state
                    .select(has_chapters.then_some(0));
                None
            }
            Err(e) => {
                log::error!("failed to load comic {}: {}", slug, e);
                self.navigate(Route::Home)
            }
        }
    }

    pub fn apply_chapter(&mut self, slug: &str, result: Result<ChapterContent, ApiError>) {
        if self.route != Route::Read(slug.to_string()) || self.reader.slug != slug {
            log::debug!("dropping stale chapter {}", slug);
            return;
        }

        self.reader.loading = false;
        match result {
            Ok(content) => {
                self.reader.content = Some(content);
                self.build_reveal_engine();
            }
            Err(e) => {
                log::error!("failed to load chapter {}: {}", slug, e);
                self.reader.error = Some(e.to_string());
            }
        }
    }

    /// Sizes the reader pane; one page fills it. A chapter that arrived
    /// before the pane was measured gets its reveal engine here.
    pub fn resize_reader(&mut self, pane_height: u16) {
        let height = pane_height.max(1);
        self.reader.viewport.resize(height, height);
        self.build_reveal_engine();
    }

    fn build_reveal_engine(&mut self) {
        let reveal = self.reveal;
        let reader = &mut self.reader;
        if reader.engine.is_some() || reader.viewport.height() == 0 {
            return;
        }
        let Some(content) = reader.content.as_ref() else {
            return;
        };

        reader.viewport.reset(content.images.len());
        let engine = RevealEngine::new(
            reader.slug.clone(),
            content.images.clone(),
            reveal,
            &mut reader.viewport,
        );
        log::info!("chapter {} has {} pages", reader.slug, engine.total());
        reader.engine = Some(engine);
    }

    pub fn page_slot(&self, id: PageId) -> PageSlot {
        let Some(unit) = self.reader.engine.as_ref().and_then(|e| e.unit(id)) else {
            return PageSlot::Hidden;
        };
        match unit.source() {
            None => PageSlot::Hidden,
            Some(PLACEHOLDER_IMAGE) => PageSlot::Failed,
            Some(_) if self.reader.page_images.contains_key(&id) => PageSlot::Image,
            Some(_) if unit.state().is_loaded => PageSlot::NoImageSupport,
            Some(_) => PageSlot::Loading,
        }
    }

    /// Page images that are near the viewport and not yet requested.
    pub fn pending_page_fetches(&mut self) -> Vec<(PageId, String)> {
        let reader = &mut self.reader;
        match reader.engine.as_mut() {
            Some(engine) => {
                engine.sync(&mut reader.viewport);
                engine.take_ready_fetches()
            }
            None => Vec::new(),
        }
    }

    pub fn apply_page_image(
        &mut self,
        chapter: &str,
        index: PageId,
        result: Result<DynamicImage, ApiError>,
    ) {
        let Some(engine) = self.reader.engine.as_mut() else {
            return;
        };
        if engine.chapter() != chapter {
            return;
        }

        match result {
            Ok(image) => {
                if engine.mark_loaded(index) {
                    if let Some(ref picker) = self.picker {
                        let protocol = picker.new_resize_protocol(image);
                        self.reader.page_images.insert(index, protocol);
                    }
                }
            }
            Err(e) => {
                log::warn!("page {} of {} failed: {}", index + 1, chapter, e);
                engine.mark_errored(index);
            }
        }
    }

    pub fn apply_search(&mut self, query: &str, result: Result<Vec<SearchResult>, ApiError>) {
        if self.search.query != query {
            log::debug!("dropping stale search results for {:?}", query);
            return;
        }

        self.search.loading = false;
        self.search.selected = 0;
        self.search.results = match result {
            Ok(results) => results,
            Err(e) => {
                log::error!("search for {:?} failed: {}", query, e);
                Vec::new()
            }
        };
    }

    pub fn add_cover_image(&mut self, url: &str, image: DynamicImage) {
        if let Some(ref picker) = self.picker {
            let protocol = picker.new_resize_protocol(image);
            self.image_states.insert(url.to_string(), protocol);
        }
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.listing.items().get(self.home_offset)
    }

    pub fn next_chapter_route(&self) -> Option<Route> {
        let nav = &self.reader.content.as_ref()?.navigation;
        nav.next_chapter_slug.clone().map(Route::Read)
    }

    pub fn previous_chapter_route(&self) -> Option<Route> {
        let nav = &self.reader.content.as_ref()?.navigation;
        nav.previous_chapter_slug.clone().map(Route::Read)
    }

    pub fn chapter_list_route(&self) -> Option<Route> {
        let content = self.reader.content.as_ref()?;
        content
            .navigation
            .has_chapter_list
            .then(|| Route::Comic(self.reader.comic_slug.clone()))
    }
}

const CARD_WIDTH: u16 = 30;

pub fn ui(f: &mut Frame, app: &mut App, theme: &ThemeService) {
    let palette = theme.palette();
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header/tabs
            Constraint::Min(10),   // content (fills remaining space)
            Constraint::Length(3), // footer
        ])
        .split(area);

    draw_header(f, root[0], app, theme, &palette);

    match app.view() {
        View::Home => draw_home(f, root[1], app, &palette),
        View::ComicDetail => draw_detail(f, root[1], app, &palette),
        View::Reader => draw_reader(f, root[1], app, &palette),
        View::Search => draw_search(f, root[1], app, &palette),
    }

    draw_footer(f, root[2], app.view(), &palette);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App, theme: &ThemeService, palette: &Palette) {
    let titles = vec!["Home", "Search"];
    let selected = match app.view() {
        View::Search => 1,
        _ => 0,
    };

    let mode = match theme.preference() {
        ThemePreference::Light => "light",
        ThemePreference::Dark => "dark",
        ThemePreference::System if theme.is_dark_mode() => "system (dark)",
        ThemePreference::System => "system (light)",
    };

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Komik")
                .title_bottom(Line::from(format!(" theme: {mode} ")).right_aligned())
                .border_style(Style::default().fg(palette.accent)),
        )
        .select(selected)
        .style(Style::default().fg(palette.muted))
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_loading(f: &mut Frame, area: Rect, message: &str, palette: &Palette) {
    let spinner_frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let frame_idx = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        / 100) as usize
        % spinner_frames.len();

    let center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(1),
            Constraint::Percentage(40),
        ])
        .split(area);

    let text = Line::from(vec![
        Span::styled(
            format!(" {} ", spinner_frames[frame_idx]),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(message.to_string(), Style::default().fg(palette.text)),
    ]);
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center), center[1]);
}

fn draw_home(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Latest Updates")
        .border_style(Style::default().fg(palette.text));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.listing.is_loading_initial() {
        draw_loading(f, inner, "Loading latest comics...", palette);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(1)])
        .split(inner);

    let items = app.listing.items();
    if items.is_empty() {
        let empty = Paragraph::new("No comics found.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(palette.muted));
        f.render_widget(empty, layout[0]);
    } else {
        // Clamp offset
        let max_offset = items.len().saturating_sub(1);
        if app.home_offset > max_offset {
            app.home_offset = max_offset;
        }

        let cards_visible = (layout[0].width as usize / CARD_WIDTH as usize).max(1);
        let card_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                (0..cards_visible)
                    .map(|_| Constraint::Length(CARD_WIDTH))
                    .collect::<Vec<_>>(),
            )
            .split(layout[0]);

        let items = app.listing.items();
        for (i, card_area) in card_areas.iter().enumerate() {
            let Some(entry) = items.get(app.home_offset + i) else {
                break;
            };
            draw_comic_card(
                f,
                *card_area,
                entry,
                i == 0,
                app.image_states.get_mut(&entry.image_url),
                palette,
            );
        }
    }

    let status = if app.listing.is_loading_more() {
        Span::styled("Loading more...", Style::default().fg(palette.accent))
    } else if app.listing.has_more() {
        Span::styled("m: Load More", Style::default().fg(palette.highlight))
    } else {
        Span::styled("", Style::default())
    };
    let total = app.listing.items().len();
    let count = Span::styled(
        format!("  {} / {}", (app.home_offset + 1).min(total), total),
        Style::default().fg(palette.muted),
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![status, count])).alignment(Alignment::Center),
        layout[1],
    );
}

fn draw_comic_card(
    f: &mut Frame,
    area: Rect,
    entry: &CatalogEntry,
    selected: bool,
    image_state: Option<&mut StatefulProtocol>,
    palette: &Palette,
) {
    let border_style = if selected {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.muted)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height < 4 || inner.width < 5 {
        return;
    }

    let card_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),    // cover
            Constraint::Length(2), // title
            Constraint::Length(1), // latest chapter
        ])
        .split(inner);

    draw_cover(f, card_layout[0], image_state, palette);

    let title = wrap_text(&entry.title, inner.width as usize, 2);
    f.render_widget(
        Paragraph::new(title.join("\n")).style(
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        ),
        card_layout[1],
    );

    let chapter = entry.latest_chapter.as_deref().unwrap_or("No chapters");
    f.render_widget(
        Paragraph::new(truncate_text(chapter, inner.width as usize))
            .style(Style::default().fg(palette.muted)),
        card_layout[2],
    );
}

fn draw_cover(
    f: &mut Frame,
    area: Rect,
    image_state: Option<&mut StatefulProtocol>,
    palette: &Palette,
) {
    if let Some(state) = image_state {
        let image_widget = StatefulImage::new().resize(Resize::Scale(None));
        f.render_stateful_widget(image_widget, area, state);
    } else {
        let placeholder = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("📚", Style::default().fg(palette.highlight))),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted)),
        )
        .alignment(Alignment::Center);
        f.render_widget(placeholder, area);
    }
}

fn draw_detail(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    let Some(comic) = app.detail.comic.as_ref() else {
        if app.detail.loading {
            draw_loading(f, area, "Loading comic...", palette);
        } else {
            draw_page_notice(f, area, "Comic not found", palette.muted, palette);
        }
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(14), Constraint::Min(5)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(CARD_WIDTH), Constraint::Min(20)])
        .split(layout[0]);

    draw_cover(f, top[0], app.image_states.get_mut(&comic.image_url), palette);

    let or = |value: &str, fallback: &'static str| -> String {
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };
    let label = Style::default().fg(palette.muted);
    let genres = comic
        .genres
        .iter()
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        Line::from(Span::styled(
            comic.title.clone(),
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(genres, Style::default().fg(palette.accent))),
        Line::from(vec![
            Span::styled("Author: ", label),
            Span::raw(or(&comic.author, "Unknown")),
            Span::styled("  Type: ", label),
            Span::raw(or(&comic.kind, "N/A")),
            Span::styled("  Status: ", label),
            Span::raw(or(&comic.status, "Unknown")),
            Span::styled("  Chapters: ", label),
            Span::raw(comic.chapters.len().to_string()),
        ]),
        Line::from(""),
    ];
    if !comic.synopsis.is_empty() {
        lines.push(Line::from(Span::styled(comic.synopsis.clone(), label)));
    }

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL)),
        top[1],
    );

    let chapters: Vec<ListItem> = comic
        .chapters_newest_first()
        .map(|c| ListItem::new(c.label().to_string()))
        .collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Chapters")
        .border_style(Style::default().fg(palette.accent));

    if chapters.is_empty() {
        f.render_widget(
            Paragraph::new("No chapters available.")
                .style(label)
                .block(block),
            layout[1],
        );
        return;
    }

    let list = List::new(chapters)
        .block(block)
        .style(Style::default().fg(palette.text))
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, layout[1], &mut app.detail.chapter_list_state);
}

fn draw_reader(f: &mut Frame, area: Rect, app: &mut App, palette: &Palette) {
    // Titles take two rows and the progress gauge one.
    app.resize_reader(area.height.saturating_sub(3));

    if let Some(error) = &app.reader.error {
        let panel = Paragraph::new(vec![
            Line::from(Span::styled(
                "Failed to load chapter",
                Style::default()
                    .fg(palette.error)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(error.clone(), Style::default().fg(palette.muted))),
            Line::from(""),
            Line::from(Span::styled("Esc: Go Back", Style::default().fg(palette.highlight))),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(panel, area);
        return;
    }

    let (Some(content), Some(engine)) = (&app.reader.content, &app.reader.engine) else {
        draw_loading(f, area, "Loading chapter...", palette);
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // titles
            Constraint::Length(1), // progress
            Constraint::Min(3),    // pages
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                content.comic_title.clone(),
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                content.chapter_title.clone(),
                Style::default().fg(palette.muted),
            )),
        ]),
        layout[0],
    );

    let total = engine.total();
    if total == 0 {
        f.render_widget(
            Paragraph::new("No pages available for this chapter.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted)),
            layout[2],
        );
        return;
    }

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(palette.accent))
        .ratio(engine.progress().clamp(0.0, 1.0))
        .label(format!("{} / {} pages loaded", engine.loaded_count(), total));
    f.render_widget(gauge, layout[1]);

    let pages = layout[2];

    for (id, offset) in app.reader.viewport.visible_slots() {
        let slot = app.reader.viewport.slot_height() as i64;
        let top = offset.max(0);
        let bottom = (offset + slot).min(pages.height as i64);
        if bottom <= top {
            continue;
        }
        let rect = Rect::new(
            pages.x,
            pages.y + top as u16,
            pages.width,
            (bottom - top) as u16,
        );

        let page_no = id + 1;
        match app.page_slot(id) {
            PageSlot::Failed => {
                let text = format!("Page {page_no} could not be loaded");
                draw_page_notice(f, rect, &text, palette.error, palette);
            }
            PageSlot::Image => {
                if let Some(state) = app.reader.page_images.get_mut(&id) {
                    let image_widget = StatefulImage::new().resize(Resize::Scale(None));
                    f.render_stateful_widget(image_widget, rect, state);
                }
            }
            PageSlot::NoImageSupport => {
                let text = format!("Page {page_no} loaded (images unsupported in this terminal)");
                draw_page_notice(f, rect, &text, palette.muted, palette);
            }
            PageSlot::Loading => {
                let text = format!("Loading page {page_no}...");
                draw_page_notice(f, rect, &text, palette.accent, palette);
            }
            PageSlot::Hidden => {
                let text = format!("Page {page_no}");
                draw_page_notice(f, rect, &text, palette.muted, palette);
            }
        }
    }
}

fn draw_page_notice(
    f: &mut Frame,
    area: Rect,
    text: &str,
    color: ratatui::style::Color,
    palette: &Palette,
) {
    let notice = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .style(Style::default().fg(color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted)),
        );
    f.render_widget(notice, area);
}

fn draw_search(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let input_style = if app.search.editing {
        Style::default().fg(palette.highlight)
    } else {
        Style::default().fg(palette.muted)
    };
    let cursor = if app.search.editing { "▏" } else { "" };
    f.render_widget(
        Paragraph::new(format!("{}{}", app.search.input, cursor))
            .style(Style::default().fg(palette.text))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Search comics")
                    .border_style(input_style),
            ),
        layout[0],
    );

    let title = if app.search.query.is_empty() {
        "Results".to_string()
    } else {
        format!("Search Results for \"{}\"", app.search.query)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(palette.text));

    if app.search.loading {
        let inner = block.inner(layout[1]);
        f.render_widget(block, layout[1]);
        draw_loading(f, inner, "Searching...", palette);
        return;
    }

    if app.search.results.is_empty() {
        let message = if app.search.query.trim().is_empty() {
            "Type a title and press Enter."
        } else {
            "No comics found."
        };
        f.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted))
                .block(block),
            layout[1],
        );
        return;
    }

    let width = layout[1].width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = app
        .search
        .results
        .iter()
        .map(|r| {
            let description = if r.description.is_empty() {
                "No Description"
            } else {
                r.description.as_str()
            };
            ListItem::new(vec![
                Line::from(Span::styled(
                    r.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    truncate_text(description, width),
                    Style::default().fg(palette.muted),
                )),
            ])
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.search.selected.min(app.search.results.len() - 1)));
    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(palette.text))
        .highlight_style(Style::default().fg(palette.highlight))
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, layout[1], &mut state);
}

fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        format!(
            "{}...",
            text.chars()
                .take(max_len.saturating_sub(3))
                .collect::<String>()
        )
    }
}

fn wrap_text(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    if width == 0 || max_lines == 0 {
        return vec![];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.chars().count() + 1 + word.chars().count() <= width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            if lines.len() >= max_lines {
                if let Some(last) = lines.last_mut() {
                    *last = truncate_text(&format!("{last} ..."), width);
                }
                return lines;
            }
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() && lines.len() < max_lines {
        lines.push(truncate_text(&current_line, width));
    }

    lines
}

fn draw_footer(f: &mut Frame, area: Rect, view: View, palette: &Palette) {
    let keys: &[(&str, &str)] = match view {
        View::Home => &[
            ("←/→", "browse"),
            ("Enter", "open"),
            ("m", "load more"),
            ("r", "refresh"),
            ("/", "search"),
            ("t", "theme"),
            ("q", "quit"),
        ],
        View::ComicDetail => &[
            ("↑/↓", "chapter"),
            ("Enter", "read"),
            ("l", "latest"),
            ("t", "theme"),
            ("Esc", "back"),
        ],
        View::Reader => &[
            ("↑/↓", "scroll"),
            ("PgUp/PgDn", "page"),
            ("p/n", "prev/next chapter"),
            ("c", "chapters"),
            ("b", "comic"),
            ("Esc", "back"),
        ],
        View::Search => &[
            ("Enter", "search/open"),
            ("Tab", "edit/results"),
            ("↑/↓", "select"),
            ("Esc", "back"),
        ],
    };

    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(*key, Style::default().fg(palette.highlight)));
        spans.push(Span::styled(
            format!(": {action}  "),
            Style::default().fg(palette.text),
        ));
    }

    let p = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .alignment(Alignment::Center);
    f.render_widget(p, area);
}
