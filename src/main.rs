use anyhow::{bail, Context, Result};
use microweb::messaging::{InProcessTransport, MessageClient};
use microweb::overlay::{HeadlessSurface, PageSession, Request, Viewport};
use microweb::page::PageContext;
use microweb::storage::JsonFileStore;
use microweb::{config, logging};
use std::cell::RefCell;
use std::rc::Rc;

const DEFAULT_STORE_FILE: &str = "microweb_store.json";
const USAGE: &str = "usage: microweb <url> <width>x<height> [scroll_y] [--store <path>]";

struct Args {
    url: String,
    viewport: Viewport,
    scroll_y: f64,
    store: String,
}

fn parse_viewport(raw: &str) -> Result<Viewport> {
    let (width, height) = raw
        .split_once('x')
        .with_context(|| format!("viewport must look like 1280x720, got {raw}"))?;
    Ok(Viewport::new(
        width.trim().parse().context("viewport width")?,
        height.trim().parse().context("viewport height")?,
    ))
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut positional = Vec::new();
    let mut store = DEFAULT_STORE_FILE.to_string();
    while let Some(arg) = raw.next() {
        if arg == "--store" {
            store = raw.next().context("--store needs a path")?;
        } else {
            positional.push(arg);
        }
    }

    let (url, viewport, scroll_y) = match positional.as_slice() {
        [url, viewport] => (url.clone(), parse_viewport(viewport)?, 0.0),
        [url, viewport, scroll] => (
            url.clone(),
            parse_viewport(viewport)?,
            scroll.parse().context("scroll_y")?,
        ),
        _ => bail!(USAGE),
    };
    Ok(Args {
        url,
        viewport,
        scroll_y,
        store,
    })
}

fn main() -> Result<()> {
    let config = config::load().unwrap_or_else(|err| {
        eprintln!("microweb: using default config: {err:#}");
        config::EngineConfig::default()
    });
    logging::init(config.debug_logging, config.log_file.clone());

    let args = parse_args(std::env::args().skip(1))?;
    let store = Rc::new(RefCell::new(JsonFileStore::open(&args.store)));

    let (viewport, scroll_y) = (args.viewport, args.scroll_y);
    let session_config = config.clone();
    let transport = InProcessTransport::new(move |page: &PageContext| {
        PageSession::load(
            page.clone(),
            session_config.clone(),
            Rc::clone(&store),
            HeadlessSurface::default(),
            viewport,
            scroll_y,
        )
    });
    let mut client = MessageClient::from_config(transport, &config);

    let Some(response) = client.deliver(&args.url, &Request::Ping)? else {
        bail!("microweb cannot run on {}", args.url);
    };
    let session = client
        .transport()
        .session(response.page_key())
        .with_context(|| format!("no engine running for {}", response.page_key()))?;
    let json = serde_json::to_string_pretty(&session.surface().frame)
        .context("serialize overlay frame")?;
    println!("{json}");
    Ok(())
}
