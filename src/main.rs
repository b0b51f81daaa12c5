mod backend;
mod config;
mod reader;
mod ui;

use backend::api::{
    CatalogClient, Catalog, ChapterContent, ComicDetail, LatestPage, SearchResult,
};
use backend::error::ApiError;
use backend::listing::{PageRequest, fetch_page};
use backend::slug::Route;
use backend::theme::{
    FileStore, SystemScheme, ThemeService, detect_system_dark, spawn_scheme_watcher,
};
use config::Config;
use image::DynamicImage;
use reader::viewport::PageId;
use ui::ui::{App, Fetch, View, ui};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use ratatui_image::picker::Picker;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use std::{error::Error, fs, io};
use tokio::sync::mpsc;

enum BackgroundTask {
    LatestLoaded {
        request: PageRequest,
        result: Result<LatestPage, ApiError>,
    },
    CoverLoaded {
        url: String,
        result: Result<DynamicImage, ApiError>,
    },
    DetailLoaded {
        slug: String,
        result: Result<ComicDetail, ApiError>,
    },
    ChapterLoaded {
        slug: String,
        result: Result<ChapterContent, ApiError>,
    },
    PageImageLoaded {
        chapter: String,
        index: PageId,
        result: Result<DynamicImage, ApiError>,
    },
    SearchResults {
        query: String,
        result: Result<Vec<SearchResult>, ApiError>,
    },
}

enum Flow {
    Continue,
    Quit,
}

/// How many listing covers to keep loaded ahead of the cursor.
const COVER_WINDOW: usize = 8;
const SCROLL_STEP: i64 = 3;
const TICK: Duration = Duration::from_millis(100);
const SCHEME_POLL: Duration = Duration::from_secs(5);

struct Ctx {
    catalog: CatalogClient,
    tx: mpsc::UnboundedSender<BackgroundTask>,
    pending_covers: HashSet<String>,
}

impl Ctx {
    fn run(&self, fetch: Option<Fetch>) {
        let Some(fetch) = fetch else {
            return;
        };
        let catalog = self.catalog.clone();
        let tx = self.tx.clone();

        match fetch {
            Fetch::Latest(request) => {
                tokio::spawn(async move {
                    let result = fetch_page(&catalog, request).await;
                    let _ = tx.send(BackgroundTask::LatestLoaded { request, result });
                });
            }
            Fetch::Detail(slug) => {
                tokio::spawn(async move {
                    let result = catalog.fetch_detail(&slug).await;
                    let _ = tx.send(BackgroundTask::DetailLoaded { slug, result });
                });
            }
            Fetch::Chapter(slug) => {
                tokio::spawn(async move {
                    let result = catalog.fetch_chapter(&slug).await;
                    let _ = tx.send(BackgroundTask::ChapterLoaded { slug, result });
                });
            }
            Fetch::Search(query) => {
                tokio::spawn(async move {
                    let result = catalog.search(&query).await;
                    let _ = tx.send(BackgroundTask::SearchResults { query, result });
                });
            }
        }
    }

    fn spawn_page_image_loader(&self, chapter: String, index: PageId, url: String) {
        let catalog = self.catalog.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let result = catalog.fetch_image(&url).await;
            let _ = tx.send(BackgroundTask::PageImageLoaded {
                chapter,
                index,
                result,
            });
        });
    }

    fn preload_covers<'a>(
        &mut self,
        urls: impl Iterator<Item = &'a str>,
        loaded: &HashMap<String, ratatui_image::protocol::StatefulProtocol>,
    ) {
        for url in urls {
            if url.is_empty() || loaded.contains_key(url) || self.pending_covers.contains(url) {
                continue;
            }
            self.pending_covers.insert(url.to_string());

            let catalog = self.catalog.clone();
            let tx = self.tx.clone();
            let url = url.to_string();
            tokio::spawn(async move {
                let result = catalog.fetch_image(&url).await;
                let _ = tx.send(BackgroundTask::CoverLoaded { url, result });
            });
        }
    }

    fn preload_listing_covers(&mut self, app: &App) {
        let urls = app
            .listing
            .items()
            .iter()
            .skip(app.home_offset)
            .take(COVER_WINDOW)
            .map(|e| e.image_url.as_str());
        self.preload_covers(urls, &app.image_states);
    }
}

fn init_logging() {
    let path = config::log_path();
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    // The terminal belongs to the UI, so logs go to a file or nowhere.
    match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let config = Config::from_env();
    log::info!("using catalog at {}", config.api_base_url);
    let catalog = CatalogClient::new(&config.api_base_url)?;

    let system = SystemScheme::new(detect_system_dark().await.unwrap_or(false));
    spawn_scheme_watcher(system.clone(), SCHEME_POLL);
    let mut theme = ThemeService::new(Box::new(FileStore::new()), system);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let picker = Picker::from_query_stdio().ok();
    let mut app = App::new(&config, picker);

    // Create channel for background tasks
    let (task_tx, mut task_rx) = mpsc::unbounded_channel::<BackgroundTask>();
    let mut ctx = Ctx {
        catalog,
        tx: task_tx,
        pending_covers: HashSet::new(),
    };
    ctx.run(app.start());

    let res = run_app(&mut terminal, &mut app, &mut theme, &mut task_rx, &mut ctx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err}");
        eprintln!("{err}");
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    theme: &mut ThemeService,
    task_rx: &mut mpsc::UnboundedReceiver<BackgroundTask>,
    ctx: &mut Ctx,
) -> io::Result<()> {
    let mut event_stream = EventStream::new();

    loop {
        terminal.draw(|f| ui(f, app, theme))?;

        // Drawing updates the reader viewport, which may bring pages near.
        let chapter = app.reader.slug.clone();
        for (index, url) in app.pending_page_fetches() {
            ctx.spawn_page_image_loader(chapter.clone(), index, url);
        }

        tokio::select! {
            // Redraw for the spinner and OS theme changes
            _ = tokio::time::sleep(TICK) => {}

            // Handle keyboard events
            Some(Ok(event)) = event_stream.next() => {
                if let Event::Key(key) = event {
                    if key.kind == KeyEventKind::Press {
                        if let Flow::Quit = handle_input(app, theme, key.code, ctx) {
                            return Ok(());
                        }
                    }
                }
            }

            // Handle background task results
            Some(task) = task_rx.recv() => handle_task(app, task, ctx),
        }
    }
}

fn handle_task(app: &mut App, task: BackgroundTask, ctx: &mut Ctx) {
    match task {
        BackgroundTask::LatestLoaded { request, result } => {
            app.apply_latest(request, result);
            ctx.preload_listing_covers(app);
        }
        BackgroundTask::CoverLoaded { url, result } => {
            ctx.pending_covers.remove(&url);
            match result {
                Ok(image) => app.add_cover_image(&url, image),
                Err(e) => log::debug!("cover {} failed: {}", url, e),
            }
        }
        BackgroundTask::DetailLoaded { slug, result } => {
            let cover = result.as_ref().ok().map(|c| c.image_url.clone());
            let fetch = app.apply_detail(&slug, result);
            ctx.run(fetch);
            if let (Some(url), View::ComicDetail) = (cover, app.view()) {
                ctx.preload_covers(std::iter::once(url.as_str()), &app.image_states);
            }
        }
        BackgroundTask::ChapterLoaded { slug, result } => {
            app.apply_chapter(&slug, result);
        }
        BackgroundTask::PageImageLoaded {
            chapter,
            index,
            result,
        } => {
            app.apply_page_image(&chapter, index, result);
        }
        BackgroundTask::SearchResults { query, result } => {
            app.apply_search(&query, result);
        }
    }
}

fn handle_input(app: &mut App, theme: &mut ThemeService, key: KeyCode, ctx: &mut Ctx) -> Flow {
    if app.view() == View::Search && app.search.editing {
        handle_search_editing(app, key, ctx);
        return Flow::Continue;
    }

    match key {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char('t') => {
            theme.toggle_theme();
            return Flow::Continue;
        }
        KeyCode::Char('/') => {
            if app.view() != View::Search {
                ctx.run(app.navigate(Route::Search(String::new())));
            }
            app.search.editing = true;
            return Flow::Continue;
        }
        KeyCode::Esc => {
            ctx.run(app.go_back());
            if app.view() == View::Home {
                ctx.preload_listing_covers(app);
            }
            return Flow::Continue;
        }
        _ => {}
    }

    match app.view() {
        View::Home => handle_home_input(app, key, ctx),
        View::ComicDetail => handle_detail_input(app, key, ctx),
        View::Reader => handle_reader_input(app, key, ctx),
        View::Search => handle_search_input(app, key, ctx),
    }
    Flow::Continue
}

fn handle_home_input(app: &mut App, key: KeyCode, ctx: &mut Ctx) {
    match key {
        KeyCode::Left => {
            app.home_offset = app.home_offset.saturating_sub(1);
        }
        KeyCode::Right => {
            if app.home_offset + 1 < app.listing.items().len() {
                app.home_offset += 1;
                ctx.preload_listing_covers(app);
            } else {
                ctx.run(app.load_more());
            }
        }
        KeyCode::Char('m') => ctx.run(app.load_more()),
        KeyCode::Char('r') => ctx.run(app.refresh_listing()),
        KeyCode::Enter => {
            if let Some(entry) = app.selected_entry() {
                let slug = entry.slug();
                ctx.run(app.navigate(Route::Comic(slug)));
            }
        }
        _ => {}
    }
}

fn handle_detail_input(app: &mut App, key: KeyCode, ctx: &mut Ctx) {
    let chapters = app
        .detail
        .comic
        .as_ref()
        .map(|c| c.chapters.len())
        .unwrap_or(0);

    match key {
        KeyCode::Up => {
            let selected = app.detail.chapter_list_state.selected().unwrap_or(0);
            if selected > 0 {
                app.detail.chapter_list_state.select(Some(selected - 1));
            }
        }
        KeyCode::Down => {
            let selected = app.detail.chapter_list_state.selected().unwrap_or(0);
            if selected + 1 < chapters {
                app.detail.chapter_list_state.select(Some(selected + 1));
            }
        }
        KeyCode::Enter => {
            if let Some(slug) = app.detail.selected_chapter().map(str::to_string) {
                ctx.run(app.navigate(Route::Read(slug)));
            }
        }
        KeyCode::Char('l') => {
            let latest = app
                .detail
                .comic
                .as_ref()
                .and_then(|c| c.latest_chapter())
                .map(|c| c.slug.clone());
            if let Some(slug) = latest {
                ctx.run(app.navigate(Route::Read(slug)));
            }
        }
        _ => {}
    }
}

fn handle_reader_input(app: &mut App, key: KeyCode, ctx: &mut Ctx) {
    let page = app.reader.viewport.height().max(1) as i64;

    let route = match key {
        KeyCode::Up | KeyCode::Char('k') => {
            app.reader.viewport.scroll_by(-SCROLL_STEP);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.reader.viewport.scroll_by(SCROLL_STEP);
            None
        }
        KeyCode::PageUp => {
            app.reader.viewport.scroll_by(-page);
            None
        }
        KeyCode::PageDown | KeyCode::Char(' ') => {
            app.reader.viewport.scroll_by(page);
            None
        }
        KeyCode::Home => {
            app.reader.viewport.scroll_to(0);
            None
        }
        KeyCode::Char('n') => app.next_chapter_route(),
        KeyCode::Char('p') => app.previous_chapter_route(),
        KeyCode::Char('c') => app.chapter_list_route(),
        KeyCode::Char('b') if !app.reader.comic_slug.is_empty() => {
            Some(Route::Comic(app.reader.comic_slug.clone()))
        }
        _ => None,
    };

    if let Some(route) = route {
        ctx.run(app.navigate(route));
    }
}

fn handle_search_editing(app: &mut App, key: KeyCode, ctx: &mut Ctx) {
    match key {
        KeyCode::Char(c) => app.search.input.push(c),
        KeyCode::Backspace => {
            app.search.input.pop();
        }
        KeyCode::Enter => {
            app.search.editing = false;
            let query = app.search.input.clone();
            if !query.trim().is_empty() {
                ctx.run(app.navigate(Route::Search(query)));
            }
        }
        KeyCode::Esc | KeyCode::Tab => {
            app.search.editing = false;
        }
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyCode, ctx: &mut Ctx) {
    match key {
        KeyCode::Up => {
            app.search.selected = app.search.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.search.selected + 1 < app.search.results.len() {
                app.search.selected += 1;
            }
        }
        KeyCode::Enter => {
            if let Some(result) = app.search.results.get(app.search.selected) {
                let slug = result.slug.clone();
                ctx.run(app.navigate(Route::Comic(slug)));
            }
        }
        KeyCode::Tab | KeyCode::Char('i') => {
            app.search.editing = true;
        }
        _ => {}
    }
}
