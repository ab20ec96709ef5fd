use crate::backend::block_list::JsonBlockList;
use crate::backend::connectivity::{Fixed, TcpProbe};
use crate::backend::remote::GiphyClient;
use crate::backend::types::FeedItem;
use crate::backend::{Connectivity, PaginationController};
use crate::components::screen::{ItemSelected, MainScreen};
use crate::components::Component;
use crate::config::Config;
use crate::event::EventHandler;
use crate::types::{Action, Event};
use crate::utils::get_data_dir;
use color_eyre::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const HELP: &str = "\
commands:
  /<text>, search <text>   search
  /, clear                 back to trending
  more                     load the next page
  retry                    retry the failed page
  refresh                  reload from the first page
  blocked                  show hidden items
  <n>, tap <n>             show details of item n
  hide <id|n>              hide an item
  unhide <id>              show an item again
  help                     this text
  quit                     exit";

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        log::debug!("App::new({config:?})");
        Self { config }
    }
    fn block_list_path(&self) -> Result<PathBuf> {
        match &self.config.block_list {
            Some(path) => Ok(path.clone()),
            None => Ok(get_data_dir()?.join("blocked.json")),
        }
    }
    pub async fn run(&mut self, initial: Action) -> Result<()> {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();

        let block_list = Arc::new(JsonBlockList::open(self.block_list_path()?)?);
        let remote = Arc::new(GiphyClient::new(
            &self.config.feed,
            self.config.api_key.clone(),
        )?);
        let connectivity: Box<dyn Connectivity> = if self.config.offline {
            Box::new(Fixed(false))
        } else {
            Box::new(TcpProbe::new(
                self.config.connectivity.probe.clone(),
                Duration::from_millis(self.config.connectivity.timeout_ms),
            ))
        };
        let controller = PaginationController::new(
            remote,
            block_list,
            connectivity,
            self.config.paging.retry,
        );
        let mut screen = MainScreen::new(
            controller,
            &self.config.layout,
            self.config.paging.prefetch_distance,
            Box::new(PrintDetails),
            action_tx.clone(),
        );

        let mut events = EventHandler::new();
        action_tx.send(initial)?;
        loop {
            tokio::select! {
                Some(event) = events.next() => {
                    if let Some(action) = self.handle_events(event) {
                        action_tx.send(action)?;
                    }
                }
                Some(action) = action_rx.recv() => {
                    if !matches!(action, Action::Feed(..) | Action::Render) {
                        log::info!("Action {action:?}");
                    }
                    match action {
                        Action::Quit => break,
                        Action::Render => screen.draw(&mut io::stdout().lock())?,
                        Action::Help => println!("{HELP}"),
                        Action::Error(e) => {
                            log::error!("{e}");
                            eprintln!("error: {e}");
                        }
                        _ => {
                            if let Some(action) = screen.update(action)? {
                                action_tx.send(action)?;
                            }
                        }
                    }
                }
                else => break,
            }
        }
        Ok(())
    }
    fn handle_events(&mut self, event: Event) -> Option<Action> {
        match event {
            Event::Line(line) => parse_command(&line),
            Event::Eof => Some(Action::Quit),
            Event::Error(e) => Some(Action::Error(format!("failed to read input: {e}"))),
        }
    }
}

pub fn parse_command(line: &str) -> Option<Action> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(query) = line.strip_prefix('/') {
        return Some(match query.trim() {
            "" => Action::ClearSearch,
            query => Action::Search(query.to_string()),
        });
    }
    if let Ok(index) = line.parse() {
        return Some(Action::Tap(index));
    }
    let (command, arg) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(command, arg)| (command, arg.trim()));
    Some(match (command, arg) {
        ("search" | "s", query) if !query.is_empty() => Action::Search(query.to_string()),
        ("clear" | "c", _) => Action::ClearSearch,
        ("trending" | "t", _) => Action::Open,
        ("more" | "m", _) => Action::LoadMore,
        ("retry" | "r", _) => Action::Retry,
        ("refresh", _) => Action::Refresh,
        ("blocked" | "b", _) => Action::ShowBlocked,
        ("tap" | "open", index) => match index.parse() {
            Ok(index) => Action::Tap(index),
            Err(e) => Action::Error(format!("invalid index {index:?}: {e}")),
        },
        ("hide" | "h", target) if !target.is_empty() => Action::Hide(target.to_string()),
        ("unhide", id) if !id.is_empty() => Action::Unhide(id.to_string()),
        ("help" | "?", _) => Action::Help,
        ("quit" | "q" | "exit", _) => Action::Quit,
        _ => Action::Error(format!("unknown command: {line} (type `help`)")),
    })
}

struct PrintDetails;

impl ItemSelected for PrintDetails {
    fn on_item_selected(&self, item: &FeedItem) {
        if let Err(e) = write_details(&mut io::stdout().lock(), item) {
            log::error!("failed to print details: {e}");
        }
    }
}

fn write_details(out: &mut dyn Write, item: &FeedItem) -> io::Result<()> {
    writeln!(out, "id:     {}", item.id)?;
    if !item.title.trim().is_empty() {
        writeln!(out, "title:  {}", item.title)?;
    }
    if let Some(rating) = &item.rating {
        writeln!(out, "rating: {rating}")?;
    }
    if let Some(url) = &item.url {
        writeln!(out, "page:   {url}")?;
    }
    if let Some(preview) = &item.preview {
        writeln!(
            out,
            "image:  {} ({}x{})",
            preview.url, preview.width, preview.height
        )?;
    }
    out.flush()
}
