use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use dungeonwatch::config::{Config, PatternConfig};
use dungeonwatch::entity::{filter_entities, EntityKind, EntityReconstructor};
use dungeonwatch::memory::{ModuleInfo, ProcessMemory, RemoteAddress, RemoteHandle, RemoteRead};
use dungeonwatch::names::NameResolver;
use dungeonwatch::pattern::{resolve_relative, Pattern, RemoteScanner};
use dungeonwatch::projection::Projector;
use dungeonwatch::runtime::{ScanTask, SnapshotBus};
use dungeonwatch::world::{LayoutResolver, WorldReader};

#[derive(Parser, Debug)]
#[command(version = "0.3.0")]
#[command(about = "Live entity monitor for a remote UE5 dungeon crawler", long_about = None)]
struct Args {
    /// Target process name (overrides the config)
    #[arg(short, long)]
    process: Option<String>,

    /// Attach to this pid instead of searching by name
    #[arg(long)]
    pid: Option<i32>,

    /// Shared-memory relay file; skips direct process reads
    #[arg(long)]
    relay: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Seconds to keep retrying process attach
    #[arg(long, default_value_t = 60)]
    attach_timeout: u64,

    #[arg(short, long)]
    verbose: bool,
}

static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    if let Some(path) = &args.write_config {
        if let Err(e) = Config::default().save(path) {
            eprintln!("{} Failed to write config: {}", "[!]".red(), e);
            std::process::exit(1);
        }
        println!("{} Default config written to {}", "[+]".green(), path.display());
        return;
    }

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{} Failed to load config: {:#}", "[!]".red(), e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(process) = args.process.clone() {
        config.process_name = process;
    }
    if let Some(relay) = args.relay.clone() {
        config.relay_path = Some(relay);
    }

    println!("{}", "dungeonwatch".cyan().bold());
    println!("{}", "=".repeat(50).cyan());

    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_sigint as libc::sighandler_t);
    }

    let handle = Arc::new(attach(&args, &config));
    let module = match handle.find_module(&config.process_name) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{} Failed to locate game module: {}", "[!]".red(), e);
            std::process::exit(1);
        }
    };
    println!(
        "{} Game module: base={} size=0x{:x}",
        "[+]".green(),
        module.base,
        module.size
    );

    let reader: Arc<dyn RemoteRead> = Arc::clone(&handle) as Arc<dyn RemoteRead>;

    let gworld = match resolve_gworld(reader.as_ref(), &module, &config) {
        Some(addr) => addr,
        None => {
            eprintln!("{} Could not resolve the world pointer.", "[!]".red());
            eprintln!("    Update gworld_offset or gworld_pattern in the config.");
            std::process::exit(1);
        }
    };
    println!("{} World pointer at {}", "[+]".green(), gworld);

    let names = match resolve_gnames(Arc::clone(&reader), &module, &config) {
        Some(n) => n,
        None => {
            eprintln!("{} Could not verify the name pool (index 0 != \"None\").", "[!]".red());
            eprintln!("    Update gnames_offset or gnames_pattern in the config.");
            std::process::exit(1);
        }
    };
    println!("{} Name pool verified at {}", "[+]".green(), names.pool_address());

    let layout = match config.level_actors_offset {
        Some(off) => LayoutResolver::with_level_actors(off),
        None => LayoutResolver::new(),
    };
    let world = WorldReader::new(Arc::clone(&reader), gworld, layout);
    if !world.initialize() {
        println!("{} World object not readable yet; waiting for a match to load", "[*]".blue());
    }
    let reconstructor = EntityReconstructor::new(Arc::clone(&reader));

    let bus = SnapshotBus::new();
    let task = match ScanTask::spawn(
        world,
        names,
        reconstructor,
        Arc::clone(&bus),
        Duration::from_millis(config.scan_interval_ms),
        config.filter.min_loot_rarity,
    ) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{} Failed to start scan thread: {}", "[!]".red(), e);
            std::process::exit(1);
        }
    };
    println!("{} Scanning every {}ms. Ctrl-C to stop.", "[*]".blue(), config.scan_interval_ms);
    println!();

    run_console_loop(&bus, &handle, &config);

    task.shutdown();
    println!("{} Stopped.", "[+]".green());
}

/// Attaches to the target, retrying while the process or relay is not up yet.
fn attach(args: &Args, config: &Config) -> RemoteHandle {
    let deadline = std::time::Instant::now() + Duration::from_secs(args.attach_timeout);
    let mut reported = false;
    loop {
        let attempt = match (&config.relay_path, args.pid) {
            (Some(path), _) => RemoteHandle::relay(path),
            (None, Some(pid)) => ProcessMemory::attach(pid).map(RemoteHandle::direct),
            (None, None) => {
                ProcessMemory::attach_by_name(&config.process_name).map(RemoteHandle::direct)
            }
        };
        match attempt {
            Ok(handle) => {
                println!("{} Attached to {}", "[+]".green(), config.process_name);
                return handle;
            }
            Err(e) => {
                if !reported {
                    println!("{} Waiting for target: {}", "[*]".blue(), e);
                    reported = true;
                }
            }
        }
        if STOP.load(Ordering::SeqCst) || std::time::Instant::now() >= deadline {
            eprintln!("{} Gave up attaching to '{}'", "[!]".red(), config.process_name);
            std::process::exit(1);
        }
        thread::sleep(Duration::from_secs(2));
    }
}

/// World pointer address: fixed offset first, verified by a plausible
/// dereference, pattern scan as fallback.
fn resolve_gworld(reader: &dyn RemoteRead, module: &ModuleInfo, config: &Config) -> Option<RemoteAddress> {
    if let Some(offset) = config.gworld_offset {
        let addr = module.base + offset;
        match reader.read_ptr(addr) {
            Ok(world) if world.is_plausible() => {
                log::info!("world pointer from config offset: base + {offset:#x} = {addr}");
                return Some(addr);
            }
            _ => log::warn!("config world offset {offset:#x} did not verify, trying pattern"),
        }
    }
    let addr = scan_for_global(reader, module, config.gworld_pattern.as_ref()?)?;
    log::info!("world pointer from pattern scan: {addr}");
    Some(addr)
}

/// Name pool resolver: every candidate address is verified by the "None"
/// check before use, config offset first, then the pattern scan.
fn resolve_gnames(
    reader: Arc<dyn RemoteRead>,
    module: &ModuleInfo,
    config: &Config,
) -> Option<NameResolver> {
    let mut candidates = Vec::new();
    if let Some(offset) = config.gnames_offset {
        candidates.push((module.base + offset, "config offset"));
    }
    if let Some(pattern) = &config.gnames_pattern {
        if let Some(addr) = scan_for_global(reader.as_ref(), module, pattern) {
            candidates.push((addr, "pattern scan"));
        }
    }

    for (addr, source) in candidates {
        let mut resolver = NameResolver::new(Arc::clone(&reader), addr);
        if resolver.initialize() {
            log::info!("name pool verified at {addr} ({source})");
            return Some(resolver);
        }
        log::warn!("name pool candidate {addr} ({source}) failed verification");
    }
    None
}

fn scan_for_global(
    reader: &dyn RemoteRead,
    module: &ModuleInfo,
    recipe: &PatternConfig,
) -> Option<RemoteAddress> {
    let pattern = match Pattern::from_hex(&recipe.pattern) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("bad pattern '{}': {}", recipe.pattern, e);
            return None;
        }
    };
    let hit = RemoteScanner::new(reader).scan(module.base, module.size, &pattern)?;
    resolve_relative(reader, hit, recipe.disp_offset as u64, recipe.instr_len as u64).ok()
}

/// Prints a compact snapshot summary whenever the scan thread publishes one.
fn run_console_loop(bus: &SnapshotBus, handle: &RemoteHandle, config: &Config) {
    let mut projector = Projector::new(config.screen_width, config.screen_height);
    let mut liveness_check = 0u32;

    while !STOP.load(Ordering::SeqCst) {
        liveness_check += 1;
        if liveness_check % 50 == 0 && !handle.is_alive() {
            println!("{} Target process exited", "[!]".red());
            return;
        }

        let snapshot = match bus.take_if_fresh() {
            Some(s) => s,
            None => {
                thread::sleep(Duration::from_millis(100));
                continue;
            }
        };

        let camera_ok = snapshot.camera.map(|pose| projector.set_camera(pose)).unwrap_or(false);
        let viewer = projector.camera_position();
        let kept = filter_entities(&snapshot.entities, &viewer, &config.filter);

        println!(
            "{} pass {}: {} entities, {} shown{}",
            "[*]".blue(),
            snapshot.pass,
            snapshot.entities.len(),
            kept.len(),
            if camera_ok { "" } else { " (no camera)" }
        );

        for &i in &kept {
            let e = &snapshot.entities[i];
            let dist = viewer.distance_to_meters(&e.position);
            let screen = if camera_ok {
                match projector.project(&e.position) {
                    Some(p) => format!(" @ ({:.0}, {:.0})", p.x, p.y),
                    None => " (off screen)".to_string(),
                }
            } else {
                String::new()
            };
            let label = describe(e);
            println!("    {:>5.0}m  {}{}", dist, label, screen);
        }
    }
}

fn describe(e: &dungeonwatch::entity::Entity) -> String {
    match &e.kind {
        EntityKind::Player(p) => {
            let status = if e.alive { format!("{:.0}hp", e.health.max(0.0)) } else { "dead".into() };
            format!(
                "{} [{} lvl {} {}]",
                e.display_name.red().bold(),
                p.class_name,
                p.level,
                status
            )
        }
        EntityKind::Monster(m) => {
            let name = format!("{} ({})", e.display_name, m.grade.label());
            if e.alive {
                name.yellow().to_string()
            } else {
                format!("{} +{} items", name.dimmed(), m.loot.len())
            }
        }
        EntityKind::Chest(c) => {
            if c.contents.is_empty() {
                e.display_name.magenta().to_string()
            } else {
                format!("{}: {}", e.display_name.magenta(), c.contents.join(", "))
            }
        }
        EntityKind::Loot(l) => {
            format!("{} ({} {})", e.display_name.green(), l.rarity, l.category)
        }
        EntityKind::Portal => e.display_name.cyan().to_string(),
        EntityKind::Interactable => e.display_name.white().to_string(),
    }
}
